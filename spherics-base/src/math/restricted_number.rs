use core::fmt;
use core::hash;
use core::ops;

use ordered_float::NotNan;

// -------------------------------------------------------------------------------------------------

/// An `f64` which is not NaN and whose sign bit is positive.
///
/// Used for physical parameters that are meaningless when negative, such as mass, drag,
/// and time scale. Positive infinity is permitted.
///
/// Multiplication is closed: `0 * ∞` is zero rather than NaN.
#[derive(Clone, Copy, PartialEq, PartialOrd)]
pub struct PositiveSign(f64);

/// An `f64` within the range +0 to +1, inclusive.
///
/// Used for physical parameters that are fractions, such as air resistance.
#[derive(Clone, Copy, PartialEq, PartialOrd)]
pub struct ZeroOne(f64);

// --- Inherent implementations --------------------------------------------------------------------

impl PositiveSign {
    /// The number zero.
    pub const ZERO: Self = Self(0.0);
    /// The number one.
    pub const ONE: Self = Self(1.0);
    /// Positive infinity.
    pub const INFINITY: Self = Self(f64::INFINITY);

    /// Wraps the given value.
    ///
    /// * Zero of either sign becomes positive zero.
    /// * Negative non-zero values and NaN panic.
    #[track_caller]
    #[inline]
    pub const fn new_strict(value: f64) -> Self {
        match Self::try_new(value) {
            Ok(ps) => ps,
            Err(_) => panic!("PositiveSign value must not be NaN or negative"),
        }
    }

    /// Wraps the given value, replacing negative values with zero.
    ///
    /// NaN panics.
    #[track_caller]
    #[inline]
    pub const fn new_clamped(value: f64) -> Self {
        if value > 0. {
            Self(value)
        } else if value == value {
            Self(0.)
        } else {
            panic!("PositiveSign value must not be NaN")
        }
    }

    const fn try_new(value: f64) -> Result<Self, NotPositiveSign> {
        if value > 0. {
            Ok(Self(value))
        } else if value == 0. {
            // could be negative zero
            Ok(Self::ZERO)
        } else {
            Err(NotPositiveSign(value))
        }
    }

    /// Unwraps the value without modifying it.
    #[inline]
    pub const fn into_inner(self) -> f64 {
        self.0
    }

    /// Returns whether the value is finite (not positive infinity).
    #[inline]
    pub fn is_finite(self) -> bool {
        self.0 != f64::INFINITY
    }

    /// Returns whether the value is zero.
    #[inline]
    pub const fn is_zero(self) -> bool {
        self.0 == 0.
    }
}

impl ZeroOne {
    /// The number zero.
    pub const ZERO: Self = Self(0.0);
    /// The number one.
    pub const ONE: Self = Self(1.0);

    /// Wraps the given value.
    ///
    /// * Zero of either sign becomes positive zero.
    /// * Values out of range, and NaN, panic.
    #[track_caller]
    #[inline]
    pub const fn new_strict(value: f64) -> Self {
        match Self::try_new(value) {
            Ok(zo) => zo,
            Err(_) => panic!("ZeroOne value must be between zero and one"),
        }
    }

    /// Wraps the given value, replacing out-of-range values with the nearest of 0 or 1.
    ///
    /// NaN panics.
    #[track_caller]
    #[inline]
    pub const fn new_clamped(value: f64) -> Self {
        if value > 0. && value <= 1. {
            Self(value)
        } else if value <= 0. {
            Self(0.)
        } else if value > 1. {
            Self(1.)
        } else {
            panic!("ZeroOne value must not be NaN")
        }
    }

    const fn try_new(value: f64) -> Result<Self, NotZeroOne> {
        if value > 0. && value <= 1. {
            Ok(Self(value))
        } else if value == 0. {
            Ok(Self::ZERO)
        } else {
            Err(NotZeroOne(value))
        }
    }

    /// Unwraps the value without modifying it.
    #[inline]
    pub const fn into_inner(self) -> f64 {
        self.0
    }

    /// Returns `1.0 - self`, which is always in range.
    #[inline]
    #[must_use]
    pub fn complement(self) -> Self {
        Self(1. - self.0)
    }
}

// --- Trait implementations -----------------------------------------------------------------------

macro_rules! common_impls {
    ($ty:ident, $error:ident) => {
        impl fmt::Debug for $ty {
            // Don't print the wrapper, just the value.
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Debug::fmt(&self.0, f)
            }
        }
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        // NaN and negative zero are excluded, so these are lawful.
        impl Eq for $ty {}
        #[allow(clippy::derive_ord_xor_partial_ord)]
        impl Ord for $ty {
            #[inline]
            fn cmp(&self, other: &Self) -> core::cmp::Ordering {
                self.0.total_cmp(&other.0)
            }
        }
        impl hash::Hash for $ty {
            #[inline]
            fn hash<H: hash::Hasher>(&self, state: &mut H) {
                NotNan::from(*self).hash(state)
            }
        }

        impl Default for $ty {
            /// The default is zero.
            #[inline]
            fn default() -> Self {
                Self::ZERO
            }
        }

        impl From<$ty> for f64 {
            #[inline]
            fn from(value: $ty) -> Self {
                value.0
            }
        }
        impl From<$ty> for NotNan<f64> {
            #[inline]
            fn from(value: $ty) -> Self {
                // SAFETY: NaN is excluded by construction.
                unsafe { NotNan::new_unchecked(value.0) }
            }
        }
        impl TryFrom<f64> for $ty {
            type Error = $error;

            /// Checks that `value` is in range and not NaN.
            /// Zero of either sign becomes positive zero.
            #[inline]
            fn try_from(value: f64) -> Result<Self, Self::Error> {
                Self::try_new(value)
            }
        }

        impl AsRef<f64> for $ty {
            #[inline]
            fn as_ref(&self) -> &f64 {
                &self.0
            }
        }
    };
}

common_impls!(PositiveSign, NotPositiveSign);
common_impls!(ZeroOne, NotZeroOne);

impl ops::Add for PositiveSign {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl ops::Mul for PositiveSign {
    type Output = Self;

    /// Differs from float multiplication in that `0 * ∞` is zero instead of NaN.
    #[inline]
    fn mul(self, rhs: Self) -> Self::Output {
        let value = self.0 * rhs.0;
        if value.is_nan() { Self::ZERO } else { Self(value) }
    }
}

impl ops::Mul for ZeroOne {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: Self) -> Self::Output {
        Self(self.0 * rhs.0)
    }
}

impl From<ZeroOne> for PositiveSign {
    #[inline]
    fn from(value: ZeroOne) -> Self {
        Self(value.0)
    }
}

#[cfg(feature = "arbitrary")]
#[mutants::skip]
impl<'a> arbitrary::Arbitrary<'a> for PositiveSign {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        let value = <f64 as arbitrary::Arbitrary<'a>>::arbitrary(u)?;
        if value.is_nan() {
            Ok(Self::ZERO)
        } else {
            Ok(Self::new_clamped(value.abs()))
        }
    }

    fn size_hint(depth: usize) -> (usize, Option<usize>) {
        <f64 as arbitrary::Arbitrary<'a>>::size_hint(depth)
    }
}

#[cfg(feature = "arbitrary")]
#[mutants::skip]
impl<'a> arbitrary::Arbitrary<'a> for ZeroOne {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        let value = <f64 as arbitrary::Arbitrary<'a>>::arbitrary(u)?;
        if value.is_nan() {
            Ok(Self::ZERO)
        } else {
            Ok(Self::new_clamped(value.abs().fract()))
        }
    }

    fn size_hint(depth: usize) -> (usize, Option<usize>) {
        <f64 as arbitrary::Arbitrary<'a>>::size_hint(depth)
    }
}

// --- Errors --------------------------------------------------------------------------------------

/// Error from attempting to construct a [`PositiveSign`].
#[derive(Clone, Debug, PartialEq)]
pub struct NotPositiveSign(f64);

/// Error from attempting to construct a [`ZeroOne`].
#[derive(Clone, Debug, PartialEq)]
pub struct NotZeroOne(f64);

impl fmt::Display for NotPositiveSign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self.0;
        if value.is_nan() {
            write!(f, "value was NaN")
        } else {
            write!(f, "{value} was negative")
        }
    }
}

impl fmt::Display for NotZeroOne {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self.0;
        if value < 0. {
            write!(f, "{value} was less than zero")
        } else if value > 1. {
            write!(f, "{value} was greater than one")
        } else {
            write!(f, "value was NaN")
        }
    }
}

impl core::error::Error for NotPositiveSign {}
impl core::error::Error for NotZeroOne {}

// -------------------------------------------------------------------------------------------------

/// Convenient alias for [`PositiveSign::new_strict()`], to be used in tests and
/// pseudo-literals.
#[inline]
pub const fn ps64(value: f64) -> PositiveSign {
    PositiveSign::new_strict(value)
}

/// Convenient alias for [`ZeroOne::new_strict()`], to be used in tests and pseudo-literals.
#[inline]
pub const fn zo64(value: f64) -> ZeroOne {
    ZeroOne::new_strict(value)
}

// -------------------------------------------------------------------------------------------------
