//! This library is an internal component of [`spherics`],
//! which defines some core mathematical types and utilities.
//! Do not depend on this library; use only [`spherics`] instead.
//!
//! [`spherics`]: ../spherics/index.html

/// Do not use this module directly; its contents are re-exported from `spherics`.
pub mod math;

/// Do not use this module directly; its contents are re-exported from `spherics`.
pub mod time;

/// Do not use this module directly; its contents are re-exported from `spherics`.
pub mod util;

// reexport for convenience of our tests
#[doc(hidden)]
pub use euclid;
