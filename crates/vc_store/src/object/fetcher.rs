use super::Handle32;

// -----------------------------------------------------------------------------
// HandleFetcher

/// Recovers the handle of an object from the object itself.
///
/// [`ObjectStorage`](super::ObjectStorage) does not keep a reverse map from
/// dense index to handle. When a destroy moves the last object into the hole,
/// the storage asks the fetcher which handle that object was created under,
/// so the lookup entry can follow it. Usually the object stores its own
/// handle, and the fetcher simply reads it.
///
/// Any `Fn(&T) -> Handle32<T>` is a fetcher.
///
/// # Examples
///
/// ```
/// use vc_store::object::{Handle32, ObjectStorage};
///
/// struct Node {
///     handle: Handle32<Node>,
/// }
///
/// let mut nodes = ObjectStorage::<Node>::new();
/// let (a, node) = nodes.create_object(Node { handle: Handle32::NULL });
/// node.handle = a;
/// let (b, node) = nodes.create_object(Node { handle: Handle32::NULL });
/// node.handle = b;
///
/// nodes.destroy_object(a, &|node: &Node| node.handle);
/// assert_eq!(nodes.get_object(b).map(|n| n.handle), Some(b));
/// ```
pub trait HandleFetcher<T> {
    /// Returns the handle `object` was created under.
    fn fetch_handle(&self, object: &T) -> Handle32<T>;
}

impl<T, F> HandleFetcher<T> for F
where
    F: Fn(&T) -> Handle32<T>,
{
    #[inline]
    fn fetch_handle(&self, object: &T) -> Handle32<T> {
        self(object)
    }
}
