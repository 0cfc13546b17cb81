//! OpenBLAS backend.
//!
//! Binds the Fortran BLAS/LAPACK symbols exported by libopenblas. Enable with
//! the `openblas` feature:
//!
//! ```toml
//! [dependencies]
//! sparse-kron = { version = "0.1", features = ["openblas"] }
//! ```
//!
//! Arguments are passed by reference as the Fortran ABI requires; slices are
//! checked by the dispatch layer before they reach this module.

use super::NativeBlas;
use std::os::raw::{c_char, c_int};

#[link(name = "openblas")]
extern "C" {
    fn dcopy_(n: *const c_int, x: *const f64, incx: *const c_int, y: *mut f64, incy: *const c_int);
    fn ddot_(
        n: *const c_int,
        x: *const f64,
        incx: *const c_int,
        y: *const f64,
        incy: *const c_int,
    ) -> f64;
    fn daxpy_(
        n: *const c_int,
        alpha: *const f64,
        x: *const f64,
        incx: *const c_int,
        y: *mut f64,
        incy: *const c_int,
    );
    fn dscal_(n: *const c_int, alpha: *const f64, x: *mut f64, incx: *const c_int);
    fn dgemv_(
        trans: *const c_char,
        m: *const c_int,
        n: *const c_int,
        alpha: *const f64,
        a: *const f64,
        lda: *const c_int,
        x: *const f64,
        incx: *const c_int,
        beta: *const f64,
        y: *mut f64,
        incy: *const c_int,
    );
    fn dgemm_(
        transa: *const c_char,
        transb: *const c_char,
        m: *const c_int,
        n: *const c_int,
        k: *const c_int,
        alpha: *const f64,
        a: *const f64,
        lda: *const c_int,
        b: *const f64,
        ldb: *const c_int,
        beta: *const f64,
        c: *mut f64,
        ldc: *const c_int,
    );
    fn dgetrf_(
        m: *const c_int,
        n: *const c_int,
        a: *mut f64,
        lda: *const c_int,
        ipiv: *mut c_int,
        info: *mut c_int,
    );
    fn dgetri_(
        n: *const c_int,
        a: *mut f64,
        lda: *const c_int,
        ipiv: *const c_int,
        work: *mut f64,
        lwork: *const c_int,
        info: *mut c_int,
    );

    fn scopy_(n: *const c_int, x: *const f32, incx: *const c_int, y: *mut f32, incy: *const c_int);
    fn sdot_(
        n: *const c_int,
        x: *const f32,
        incx: *const c_int,
        y: *const f32,
        incy: *const c_int,
    ) -> f32;
    fn saxpy_(
        n: *const c_int,
        alpha: *const f32,
        x: *const f32,
        incx: *const c_int,
        y: *mut f32,
        incy: *const c_int,
    );
    fn sscal_(n: *const c_int, alpha: *const f32, x: *mut f32, incx: *const c_int);
    fn sgemv_(
        trans: *const c_char,
        m: *const c_int,
        n: *const c_int,
        alpha: *const f32,
        a: *const f32,
        lda: *const c_int,
        x: *const f32,
        incx: *const c_int,
        beta: *const f32,
        y: *mut f32,
        incy: *const c_int,
    );
    fn sgemm_(
        transa: *const c_char,
        transb: *const c_char,
        m: *const c_int,
        n: *const c_int,
        k: *const c_int,
        alpha: *const f32,
        a: *const f32,
        lda: *const c_int,
        b: *const f32,
        ldb: *const c_int,
        beta: *const f32,
        c: *mut f32,
        ldc: *const c_int,
    );
    fn sgetrf_(
        m: *const c_int,
        n: *const c_int,
        a: *mut f32,
        lda: *const c_int,
        ipiv: *mut c_int,
        info: *mut c_int,
    );
    fn sgetri_(
        n: *const c_int,
        a: *mut f32,
        lda: *const c_int,
        ipiv: *const c_int,
        work: *mut f32,
        lwork: *const c_int,
        info: *mut c_int,
    );
}

macro_rules! impl_openblas {
    ($t:ty, $copy:ident, $dot:ident, $axpy:ident, $scal:ident, $gemv:ident, $gemm:ident, $getrf:ident, $getri:ident) => {
        impl NativeBlas for $t {
            const BACKEND: &'static str = "OpenBLAS";

            fn xcopy(n: i32, x: &[$t], incx: i32, y: &mut [$t], incy: i32) {
                unsafe { $copy(&n, x.as_ptr(), &incx, y.as_mut_ptr(), &incy) }
            }

            fn xdot(n: i32, x: &[$t], incx: i32, y: &[$t], incy: i32) -> $t {
                unsafe { $dot(&n, x.as_ptr(), &incx, y.as_ptr(), &incy) }
            }

            fn xaxpy(n: i32, alpha: $t, x: &[$t], incx: i32, y: &mut [$t], incy: i32) {
                unsafe { $axpy(&n, &alpha, x.as_ptr(), &incx, y.as_mut_ptr(), &incy) }
            }

            fn xscal(n: i32, alpha: $t, x: &mut [$t], incx: i32) {
                unsafe { $scal(&n, &alpha, x.as_mut_ptr(), &incx) }
            }

            fn xgemv(
                trans: u8,
                m: i32,
                n: i32,
                alpha: $t,
                a: &[$t],
                lda: i32,
                x: &[$t],
                incx: i32,
                beta: $t,
                y: &mut [$t],
                incy: i32,
            ) {
                let trans = trans as c_char;
                unsafe {
                    $gemv(
                        &trans,
                        &m,
                        &n,
                        &alpha,
                        a.as_ptr(),
                        &lda,
                        x.as_ptr(),
                        &incx,
                        &beta,
                        y.as_mut_ptr(),
                        &incy,
                    )
                }
            }

            fn xgemm(
                transa: u8,
                transb: u8,
                m: i32,
                n: i32,
                k: i32,
                alpha: $t,
                a: &[$t],
                lda: i32,
                b: &[$t],
                ldb: i32,
                beta: $t,
                c: &mut [$t],
                ldc: i32,
            ) {
                let (transa, transb) = (transa as c_char, transb as c_char);
                unsafe {
                    $gemm(
                        &transa,
                        &transb,
                        &m,
                        &n,
                        &k,
                        &alpha,
                        a.as_ptr(),
                        &lda,
                        b.as_ptr(),
                        &ldb,
                        &beta,
                        c.as_mut_ptr(),
                        &ldc,
                    )
                }
            }

            fn xgetrf(m: i32, n: i32, a: &mut [$t], lda: i32, ipiv: &mut [i32]) -> i32 {
                let mut info: c_int = 0;
                unsafe { $getrf(&m, &n, a.as_mut_ptr(), &lda, ipiv.as_mut_ptr(), &mut info) };
                info
            }

            fn xgetri(
                n: i32,
                a: &mut [$t],
                lda: i32,
                ipiv: &[i32],
                work: &mut [$t],
                lwork: i32,
            ) -> i32 {
                let mut info: c_int = 0;
                unsafe {
                    $getri(
                        &n,
                        a.as_mut_ptr(),
                        &lda,
                        ipiv.as_ptr(),
                        work.as_mut_ptr(),
                        &lwork,
                        &mut info,
                    )
                };
                info
            }
        }
    };
}

impl_openblas!(f64, dcopy_, ddot_, daxpy_, dscal_, dgemv_, dgemm_, dgetrf_, dgetri_);
impl_openblas!(f32, scopy_, sdot_, saxpy_, sscal_, sgemv_, sgemm_, sgetrf_, sgetri_);
