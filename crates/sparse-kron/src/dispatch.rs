//! Compile-time selection between native and reference kernels.
//!
//! [`Kernel`] is implemented once per element type. Its default methods are
//! the portable reference loops from [`crate::core::reference`]; `f32` and
//! `f64` override every method to delegate verbatim to [`NativeBlas`]. The
//! choice is made by trait resolution, so there is no runtime branch on the
//! element type.
//!
//! ```text
//! api::gemm::<f64>  ──▶ <f64 as Kernel>::gemm ──▶ NativeBlas::xgemm (OpenBLAS / faer)
//! api::gemm::<i64>  ──▶ <i64 as Kernel>::gemm ──▶ reference::gemm   (C += op(A)·op(B))
//! ```
//!
//! # Custom element types
//!
//! Any [`Scalar`] type joins the generic class with an empty impl:
//!
//! ```rust
//! use sparse_kron::dispatch::Kernel;
//! use std::ops::{Add, AddAssign, Mul, MulAssign};
//! use num_traits::{One, ToPrimitive, Zero};
//!
//! #[derive(Clone, Copy, Debug, PartialEq)]
//! struct Mod7(u8);
//!
//! impl Add for Mod7 { type Output = Self; fn add(self, o: Self) -> Self { Mod7((self.0 + o.0) % 7) } }
//! impl Mul for Mod7 { type Output = Self; fn mul(self, o: Self) -> Self { Mod7((self.0 * o.0) % 7) } }
//! impl AddAssign for Mod7 { fn add_assign(&mut self, o: Self) { *self = *self + o } }
//! impl MulAssign for Mod7 { fn mul_assign(&mut self, o: Self) { *self = *self * o } }
//! impl Zero for Mod7 { fn zero() -> Self { Mod7(0) } fn is_zero(&self) -> bool { self.0 == 0 } }
//! impl One for Mod7 { fn one() -> Self { Mod7(1) } }
//! impl ToPrimitive for Mod7 {
//!     fn to_i64(&self) -> Option<i64> { Some(self.0 as i64) }
//!     fn to_u64(&self) -> Option<u64> { Some(self.0 as u64) }
//! }
//!
//! impl Kernel for Mod7 {}
//!
//! let x = [Mod7(3), Mod7(4)];
//! assert_eq!(sparse_kron::dot(2, &x, 1, &x, 1), Mod7(4)); // 9 + 16 = 25 ≡ 4
//! ```

use crate::core::{reference, MatMut, MatRef, VecMut, VecRef};
use crate::error::LapackInfo;
use crate::native::{blas_int, NativeBlas};
use crate::types::Scalar;

/// Elementary linear-algebra operations for one element type.
///
/// Preconditions (matching lengths, view bounds, valid flags) are asserted;
/// a violation is a caller bug and panics.
pub trait Kernel: Scalar {
    /// `true` when the operations delegate to the native library.
    const ACCELERATED: bool = false;

    /// Name of the backend executing the operations.
    fn backend() -> &'static str {
        "reference"
    }

    /// `y[i] := x[i]`.
    fn copy(x: VecRef<'_, Self>, y: VecMut<'_, Self>) {
        reference::copy(x, y)
    }

    /// `Σ x[i]·y[i]`.
    fn dot(x: VecRef<'_, Self>, y: VecRef<'_, Self>) -> Self {
        reference::dot(x, y)
    }

    /// `y[i] += α·x[i]`.
    fn axpy(alpha: Self, x: VecRef<'_, Self>, y: VecMut<'_, Self>) {
        reference::axpy(alpha, x, y)
    }

    /// `x[i] *= α`.
    fn scal(alpha: Self, x: VecMut<'_, Self>) {
        reference::scal(alpha, x)
    }

    /// `y := α·op(A)·x + β·y`; the reference path computes `y += op(A)·x`.
    fn gemv(alpha: Self, a: MatRef<'_, Self>, x: VecRef<'_, Self>, beta: Self, y: VecMut<'_, Self>) {
        let _ = (alpha, beta);
        reference::gemv(a, x, y)
    }

    /// `C := α·op(A)·op(B) + β·C`; the reference path computes `C += op(A)·op(B)`.
    fn gemm(alpha: Self, a: MatRef<'_, Self>, b: MatRef<'_, Self>, beta: Self, c: MatMut<'_, Self>) {
        let _ = (alpha, beta);
        reference::gemm(a, b, c)
    }

    /// In-place LU factorization with partial pivoting.
    ///
    /// # Panics
    /// Always, for element types without a native library.
    fn getrf(a: MatMut<'_, Self>, ipiv: &mut [i32]) -> LapackInfo {
        let _ = (a, ipiv);
        panic!(
            "getrf is not implemented for non-floating type {}",
            std::any::type_name::<Self>()
        )
    }

    /// In-place inverse from the factors produced by [`Kernel::getrf`].
    ///
    /// # Panics
    /// Always, for element types without a native library.
    fn getri(a: MatMut<'_, Self>, ipiv: &[i32], work: &mut [Self]) -> LapackInfo {
        let _ = (a, ipiv, work);
        panic!(
            "getri is not implemented for non-floating type {}",
            std::any::type_name::<Self>()
        )
    }
}

macro_rules! impl_reference_kernel {
    ($($t:ty),*) => {
        $(impl Kernel for $t {})*
    };
}

impl_reference_kernel!(i32, i64, u32, u64);

macro_rules! impl_native_kernel {
    ($t:ty) => {
        impl Kernel for $t {
            const ACCELERATED: bool = true;

            fn backend() -> &'static str {
                <$t as NativeBlas>::BACKEND
            }

            fn copy(x: VecRef<'_, $t>, mut y: VecMut<'_, $t>) {
                assert_eq!(x.len(), y.len(), "copy: length mismatch");
                let incy = blas_int(y.inc());
                <$t as NativeBlas>::xcopy(
                    blas_int(x.len()),
                    x.as_slice(),
                    blas_int(x.inc()),
                    y.as_mut_slice(),
                    incy,
                )
            }

            fn dot(x: VecRef<'_, $t>, y: VecRef<'_, $t>) -> $t {
                assert_eq!(x.len(), y.len(), "dot: length mismatch");
                <$t as NativeBlas>::xdot(
                    blas_int(x.len()),
                    x.as_slice(),
                    blas_int(x.inc()),
                    y.as_slice(),
                    blas_int(y.inc()),
                )
            }

            fn axpy(alpha: $t, x: VecRef<'_, $t>, mut y: VecMut<'_, $t>) {
                assert_eq!(x.len(), y.len(), "axpy: length mismatch");
                let incy = blas_int(y.inc());
                <$t as NativeBlas>::xaxpy(
                    blas_int(x.len()),
                    alpha,
                    x.as_slice(),
                    blas_int(x.inc()),
                    y.as_mut_slice(),
                    incy,
                )
            }

            fn scal(alpha: $t, mut x: VecMut<'_, $t>) {
                let (n, incx) = (blas_int(x.len()), blas_int(x.inc()));
                <$t as NativeBlas>::xscal(n, alpha, x.as_mut_slice(), incx)
            }

            fn gemv(
                alpha: $t,
                a: MatRef<'_, $t>,
                x: VecRef<'_, $t>,
                beta: $t,
                mut y: VecMut<'_, $t>,
            ) {
                assert_eq!(x.len(), a.op_cols(), "gemv: x has the wrong length");
                assert_eq!(y.len(), a.op_rows(), "gemv: y has the wrong length");
                let incy = blas_int(y.inc());
                <$t as NativeBlas>::xgemv(
                    a.trans().as_flag(),
                    blas_int(a.rows()),
                    blas_int(a.cols()),
                    alpha,
                    a.as_slice(),
                    blas_int(a.ld()),
                    x.as_slice(),
                    blas_int(x.inc()),
                    beta,
                    y.as_mut_slice(),
                    incy,
                )
            }

            fn gemm(
                alpha: $t,
                a: MatRef<'_, $t>,
                b: MatRef<'_, $t>,
                beta: $t,
                mut c: MatMut<'_, $t>,
            ) {
                let (m, n, k) = (c.rows(), c.cols(), a.op_cols());
                assert_eq!(a.op_rows(), m, "gemm: A has the wrong row count");
                assert_eq!(b.op_rows(), k, "gemm: inner dimensions differ");
                assert_eq!(b.op_cols(), n, "gemm: B has the wrong column count");
                let ldc = blas_int(c.ld());
                <$t as NativeBlas>::xgemm(
                    a.trans().as_flag(),
                    b.trans().as_flag(),
                    blas_int(m),
                    blas_int(n),
                    blas_int(k),
                    alpha,
                    a.as_slice(),
                    blas_int(a.ld()),
                    b.as_slice(),
                    blas_int(b.ld()),
                    beta,
                    c.as_mut_slice(),
                    ldc,
                )
            }

            fn getrf(mut a: MatMut<'_, $t>, ipiv: &mut [i32]) -> LapackInfo {
                let (m, n) = (a.rows(), a.cols());
                assert!(
                    ipiv.len() >= m.min(n),
                    "getrf: ipiv holds {} entries, {} required",
                    ipiv.len(),
                    m.min(n)
                );
                let lda = blas_int(a.ld());
                LapackInfo(<$t as NativeBlas>::xgetrf(
                    blas_int(m),
                    blas_int(n),
                    a.as_mut_slice(),
                    lda,
                    ipiv,
                ))
            }

            fn getri(mut a: MatMut<'_, $t>, ipiv: &[i32], work: &mut [$t]) -> LapackInfo {
                let n = a.rows();
                assert_eq!(a.cols(), n, "getri: matrix must be square");
                assert!(
                    ipiv.len() >= n,
                    "getri: ipiv holds {} entries, {} required",
                    ipiv.len(),
                    n
                );
                let lda = blas_int(a.ld());
                let lwork = blas_int(work.len());
                LapackInfo(<$t as NativeBlas>::xgetri(
                    blas_int(n),
                    a.as_mut_slice(),
                    lda,
                    ipiv,
                    work,
                    lwork,
                ))
            }
        }
    };
}

impl_native_kernel!(f32);
impl_native_kernel!(f64);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Transpose;

    const A: [i64; 4] = [1, 3, 2, 4];
    const B: [i64; 4] = [5, 7, 6, 8];

    #[test]
    fn test_type_classes() {
        assert!(<f32 as Kernel>::ACCELERATED);
        assert!(<f64 as Kernel>::ACCELERATED);
        assert!(!<i32 as Kernel>::ACCELERATED);
        assert!(!<i64 as Kernel>::ACCELERATED);
        assert_eq!(<i64 as Kernel>::backend(), "reference");
    }

    #[test]
    fn test_paths_agree_for_unit_alpha_zero_beta() {
        let mut c_ref = [0i64; 4];
        i64::gemm(
            1,
            MatRef::new(&A, 2, 2, 2),
            MatRef::new(&B, 2, 2, 2).transposed(Transpose::Trans),
            0,
            MatMut::new(&mut c_ref, 2, 2, 2),
        );

        let af: Vec<f64> = A.iter().map(|&v| v as f64).collect();
        let bf: Vec<f64> = B.iter().map(|&v| v as f64).collect();
        let mut c_nat = [0.0f64; 4];
        f64::gemm(
            1.0,
            MatRef::new(&af, 2, 2, 2),
            MatRef::new(&bf, 2, 2, 2).transposed(Transpose::Trans),
            0.0,
            MatMut::new(&mut c_nat, 2, 2, 2),
        );

        for (r, n) in c_ref.iter().zip(&c_nat) {
            assert_eq!(*r as f64, *n);
        }
    }

    #[test]
    fn test_paths_diverge_on_alpha_beta() {
        // Reference ignores alpha/beta and accumulates into C.
        let mut c_ref = [1i64; 4];
        i64::gemm(
            2,
            MatRef::new(&A, 2, 2, 2),
            MatRef::new(&B, 2, 2, 2),
            3,
            MatMut::new(&mut c_ref, 2, 2, 2),
        );
        assert_eq!(c_ref, [20, 44, 23, 51]);

        // Native honors C := 2·A·B + 3·C.
        let af = [1.0, 3.0, 2.0, 4.0];
        let bf = [5.0, 7.0, 6.0, 8.0];
        let mut c_nat = [1.0f64; 4];
        f64::gemm(
            2.0,
            MatRef::new(&af, 2, 2, 2),
            MatRef::new(&bf, 2, 2, 2),
            3.0,
            MatMut::new(&mut c_nat, 2, 2, 2),
        );
        assert_eq!(c_nat, [41.0, 89.0, 47.0, 103.0]);
    }

    #[test]
    fn test_native_gemv() {
        let a = [1.0f32, 3.0, 2.0, 4.0];
        let x = [1.0f32, 2.0];
        let mut y = [0.0f32; 2];
        f32::gemv(
            1.0,
            MatRef::new(&a, 2, 2, 2),
            VecRef::contiguous(&x),
            0.0,
            VecMut::contiguous(&mut y),
        );
        assert_eq!(y, [5.0, 11.0]);
    }

    #[test]
    fn test_native_factor_and_invert() {
        let mut a = [4.0f64, 6.0, 3.0, 3.0];
        let mut ipiv = [0i32; 2];
        f64::getrf(MatMut::new(&mut a, 2, 2, 2), &mut ipiv)
            .into_result()
            .unwrap();
        let mut work = [0.0f64; 2];
        f64::getri(MatMut::new(&mut a, 2, 2, 2), &ipiv, &mut work)
            .into_result()
            .unwrap();
        let expected = [-0.5, 1.0, 0.5, -2.0 / 3.0];
        for (got, want) in a.iter().zip(&expected) {
            assert!((got - want).abs() < 1e-12);
        }
    }

    #[test]
    #[should_panic(expected = "getrf is not implemented for non-floating type")]
    fn test_getrf_generic_is_fatal() {
        let mut a = [1i64, 2, 3, 4];
        let mut ipiv = [0i32; 2];
        let _ = i64::getrf(MatMut::new(&mut a, 2, 2, 2), &mut ipiv);
    }

    #[test]
    #[should_panic(expected = "getri is not implemented for non-floating type")]
    fn test_getri_generic_is_fatal() {
        let mut a = [1i32, 0, 0, 1];
        let ipiv = [1i32, 2];
        let mut work = [0i32; 2];
        let _ = i32::getri(MatMut::new(&mut a, 2, 2, 2), &ipiv, &mut work);
    }
}
