use core::cell::Cell;
use core::fmt;

/// The maximum exponent of the spin count.
const SPIN_LIMIT: u32 = 6;

/// Exponential backoff for busy-wait loops.
///
/// Every call to [`spin`](Backoff::spin) roughly doubles the number of
/// *PAUSE* instructions issued, up to `2^SPIN_LIMIT`. Once that ceiling is
/// reached, [`snooze`](Backoff::snooze) gives the time slice back to the OS
/// scheduler instead (when `std` is available).
pub struct Backoff {
    step: Cell<u32>,
}

impl Backoff {
    /// Creates a new `Backoff` at the first step.
    #[inline(always)]
    pub const fn new() -> Self {
        Self { step: Cell::new(0) }
    }

    /// Returns `true` once spinning has reached its ceiling.
    ///
    /// Callers waiting for a long operation may switch strategy here.
    #[inline]
    pub fn is_completed(&self) -> bool {
        self.step.get() >= SPIN_LIMIT
    }

    /// Backs off in a retry loop where another thread made progress.
    #[inline(always)]
    pub fn spin(&self) {
        let step = self.step.get();
        for _ in 0..(1_u32 << step) {
            core::hint::spin_loop();
        }
        if step < SPIN_LIMIT {
            self.step.set(step + 1);
        }
    }

    /// Backs off in a loop that waits for another thread to finish.
    ///
    /// Without `std` this keeps spinning at the ceiling.
    #[inline]
    pub fn snooze(&self) {
        if !self.is_completed() {
            self.spin();
            return;
        }

        #[cfg(feature = "std")]
        ::std::thread::yield_now();

        #[cfg(not(feature = "std"))]
        for _ in 0..(1_u32 << SPIN_LIMIT) {
            core::hint::spin_loop();
        }
    }

    /// Resets to the first step.
    #[inline]
    pub fn reset(&self) {
        self.step.set(0);
    }
}

impl fmt::Debug for Backoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backoff")
            .field("step", &self.step.get())
            .field("is_completed", &self.is_completed())
            .finish()
    }
}

impl Default for Backoff {
    #[inline(always)]
    fn default() -> Self {
        Self::new()
    }
}

// -----------------------------------------------------------------------------
// Tests
