//! Mathematical utilities and decisions.

#[doc(inline)]
pub use spherics_base::math::*;
