// -----------------------------------------------------------------------------
// Modules

mod debug_unwrap;

// -----------------------------------------------------------------------------
// Exports

pub use debug_unwrap::DebugCheckedUnwrap;
