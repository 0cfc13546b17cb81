use num_traits::{One, ToPrimitive, Zero};
use std::fmt::Debug;
use std::ops::{Add, AddAssign, Mul, MulAssign};

/// Arithmetic required of every element type.
///
/// Only ring operations are required: no subtraction, division or ordering.
/// `ToPrimitive` is used by diagnostics, which report norms as `f64`.
pub trait Scalar:
    Copy
    + Debug
    + PartialEq
    + Send
    + Sync
    + 'static
    + Zero
    + One
    + Add<Output = Self>
    + Mul<Output = Self>
    + AddAssign
    + MulAssign
    + ToPrimitive
{
}

impl<T> Scalar for T where
    T: Copy
        + Debug
        + PartialEq
        + Send
        + Sync
        + 'static
        + Zero
        + One
        + Add<Output = T>
        + Mul<Output = T>
        + AddAssign
        + MulAssign
        + ToPrimitive
{
}
