//! Native BLAS/LAPACK service for the accelerated element types.
//!
//! [`NativeBlas`] is the boundary between this crate and the numerical
//! library. Its methods take exactly the Fortran argument lists (order,
//! integer widths, transpose characters and the `info` sign convention), so a
//! call here is a call into the vendor routine.
//!
//! # Backends
//!
//! | Feature | Backend | Notes |
//! |---------|---------|-------|
//! | `openblas` | `dcopy_`, `dgemm_`, `dgetrf_`, ... from libopenblas | links the system library |
//! | (default) | `faer` | `matmul`, partial-pivoting LU and triangular solves |
//!
//! Both backends honor the full contract: `gemm` computes
//! `C := α·op(A)·op(B) + β·C` (with `β = 0` overwriting `C`), `getrf`
//! returns 1-based pivots, and `info` is `0`, `> 0` (singular pivot) or
//! `< 0` (negated illegal-argument position).
//!
//! The trait is sealed: only `f32` and `f64` are accelerated.

#[cfg(not(feature = "openblas"))]
mod dense;
#[cfg(feature = "openblas")]
mod ffi;

use crate::types::Scalar;

mod sealed {
    pub trait Sealed {}
    impl Sealed for f32 {}
    impl Sealed for f64 {}
}

/// BLAS/LAPACK routines for one floating-point type, in Fortran argument order.
#[allow(clippy::too_many_arguments)]
pub trait NativeBlas: Scalar + sealed::Sealed {
    /// Backend name, for logs.
    const BACKEND: &'static str;

    fn xcopy(n: i32, x: &[Self], incx: i32, y: &mut [Self], incy: i32);

    fn xdot(n: i32, x: &[Self], incx: i32, y: &[Self], incy: i32) -> Self;

    fn xaxpy(n: i32, alpha: Self, x: &[Self], incx: i32, y: &mut [Self], incy: i32);

    fn xscal(n: i32, alpha: Self, x: &mut [Self], incx: i32);

    fn xgemv(
        trans: u8,
        m: i32,
        n: i32,
        alpha: Self,
        a: &[Self],
        lda: i32,
        x: &[Self],
        incx: i32,
        beta: Self,
        y: &mut [Self],
        incy: i32,
    );

    fn xgemm(
        transa: u8,
        transb: u8,
        m: i32,
        n: i32,
        k: i32,
        alpha: Self,
        a: &[Self],
        lda: i32,
        b: &[Self],
        ldb: i32,
        beta: Self,
        c: &mut [Self],
        ldc: i32,
    );

    /// LU factorization with partial pivoting; returns `info`.
    fn xgetrf(m: i32, n: i32, a: &mut [Self], lda: i32, ipiv: &mut [i32]) -> i32;

    /// Inverse from `xgetrf` factors; returns `info`. `lwork == -1` is a
    /// workspace query that stores the optimal size in `work[0]`.
    fn xgetri(n: i32, a: &mut [Self], lda: i32, ipiv: &[i32], work: &mut [Self], lwork: i32)
        -> i32;
}

/// Convert a dimension to the BLAS integer type.
///
/// # Panics
/// If `v` does not fit in an `i32`.
#[inline]
pub(crate) fn blas_int(v: usize) -> i32 {
    i32::try_from(v).unwrap_or_else(|_| panic!("dimension {} exceeds the BLAS integer range", v))
}
