//! Tools that we could imagine being in the Rust standard library, but aren't.

mod custom_format;
pub use custom_format::*;

pub mod log;

mod multi_failure;
#[doc(hidden)] // for tests
pub use multi_failure::MultiFailure;

#[doc(hidden)]
pub use error_chain::ErrorChain;
mod error_chain {
    use core::error::Error;
    use core::fmt;

    /// Formatting wrapper which prints an [`Error`] together with its
    /// `source()` chain, with at least one newline between each.
    ///
    /// The text begins with the [`fmt::Display`] format of the error.
    #[derive(Clone, Copy, Debug)]
    #[expect(clippy::exhaustive_structs)]
    pub struct ErrorChain<'a>(pub &'a (dyn Error + 'a));

    impl fmt::Display for ErrorChain<'_> {
        fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
            let mut error: &(dyn Error + '_) = self.0;
            write!(fmt, "{error}")?;
            while let Some(source) = error.source() {
                error = source;
                write!(fmt, "\n\nCaused by:\n    {error}")?;
            }
            Ok(())
        }
    }
}

#[doc(hidden)] // for use in internal tests only
pub fn assert_send_sync<T: Send + Sync>() {
    // We don't need to do anything in this function; the call to it having been successfully
    // compiled is the assertion.
}
