//! Default `f32`/`f64` backend on top of faer.
//!
//! Level 2/3 products go through `faer::linalg::matmul::matmul`, LU through
//! faer's partial-pivoting decomposition and triangular solves. This module
//! only translates between the Fortran argument contract and faer views:
//! argument checking follows the reference library (BLAS routines abort on an
//! illegal argument, LAPACK routines report it through a negative `info`),
//! and faer's row permutation is re-encoded as LAPACK's sequential `ipiv`.
//! Negative increments are not supported and are treated as illegal.

#![allow(clippy::too_many_arguments)]

use num_traits::{Float, NumCast};

/// Reference-BLAS style illegal-argument abort.
fn xerbla(name: &str, position: i32) -> ! {
    panic!(
        "** On entry to {} parameter number {} had an illegal value",
        name, position
    )
}

fn parse_trans(name: &str, flag: u8, position: i32) -> bool {
    match flag {
        b'n' | b'N' => false,
        b't' | b'T' | b'c' | b'C' => true,
        _ => xerbla(name, position),
    }
}

fn check_inc(name: &str, inc: i32, position: i32) -> usize {
    if inc < 0 {
        xerbla(name, position);
    }
    inc as usize
}

/// Slice length a column-major `rows x cols` view with stride `ld` reads.
fn extent(rows: usize, cols: usize, ld: usize) -> usize {
    if rows == 0 || cols == 0 {
        0
    } else {
        (cols - 1) * ld + rows
    }
}

// ============================================================================
// Level 1
// ============================================================================

pub fn copy<F: Float>(n: i32, x: &[F], incx: i32, y: &mut [F], incy: i32) {
    let incx = check_inc("COPY", incx, 3);
    let incy = check_inc("COPY", incy, 5);
    for i in 0..n.max(0) as usize {
        y[i * incy] = x[i * incx];
    }
}

pub fn dot<F: Float>(n: i32, x: &[F], incx: i32, y: &[F], incy: i32) -> F {
    let incx = check_inc("DOT", incx, 3);
    let incy = check_inc("DOT", incy, 5);
    (0..n.max(0) as usize).fold(F::zero(), |acc, i| acc + x[i * incx] * y[i * incy])
}

pub fn axpy<F: Float>(n: i32, alpha: F, x: &[F], incx: i32, y: &mut [F], incy: i32) {
    let incx = check_inc("AXPY", incx, 4);
    let incy = check_inc("AXPY", incy, 6);
    if n <= 0 || alpha == F::zero() {
        return;
    }
    for i in 0..n as usize {
        y[i * incy] = y[i * incy] + alpha * x[i * incx];
    }
}

pub fn scal<F: Float>(n: i32, alpha: F, x: &mut [F], incx: i32) {
    let incx = check_inc("SCAL", incx, 4);
    for i in 0..n.max(0) as usize {
        x[i * incx] = alpha * x[i * incx];
    }
}

/// Scale a strided column-major block by `beta`; `beta == 0` overwrites
/// (NaN in the destination does not survive).
fn scale_block<F: Float>(beta: F, c: &mut [F], rows: usize, cols: usize, ld: usize) {
    if beta == F::one() {
        return;
    }
    for j in 0..cols {
        for v in &mut c[j * ld..j * ld + rows] {
            *v = if beta == F::zero() { F::zero() } else { beta * *v };
        }
    }
}

// ============================================================================
// LAPACK helpers
// ============================================================================

/// Re-encode a row permutation as LAPACK interchanges.
///
/// `forward[i]` is the original row placed at position `i` of `P·A`. Row
/// `k` of the factors must be written to `placement[k]`: the first
/// `ipiv.len()` positions match `forward` exactly, trailing positions follow
/// wherever the interchanges leave the remaining rows.
fn interchanges(forward: &[usize], ipiv: &mut [i32]) -> Vec<usize> {
    let m = forward.len();
    let mut row_at: Vec<usize> = (0..m).collect();
    let mut pos_of: Vec<usize> = (0..m).collect();
    for (j, p) in ipiv.iter_mut().enumerate() {
        let q = pos_of[forward[j]];
        *p = (q + 1) as i32;
        row_at.swap(j, q);
        pos_of[row_at[j]] = j;
        pos_of[row_at[q]] = q;
    }

    let mut position_of_factor = vec![0; m];
    for (k, &row) in forward.iter().enumerate() {
        position_of_factor[k] = pos_of[row];
    }
    position_of_factor
}

/// Row order produced by applying `ipiv` to the identity.
fn permuted_rows(n: usize, ipiv: &[i32]) -> Vec<usize> {
    let mut rows: Vec<usize> = (0..n).collect();
    for (j, &p) in ipiv.iter().enumerate().take(n) {
        rows.swap(j, (p - 1) as usize);
    }
    rows
}

/// 1-based index of the first exactly-zero diagonal entry.
fn first_zero_pivot<F: Float>(a: &[F], size: usize, lda: usize) -> i32 {
    (0..size)
        .find(|&i| a[i * lda + i] == F::zero())
        .map_or(0, |i| (i + 1) as i32)
}

fn optimal_lwork<F: Float>(n: i32) -> F {
    <F as NumCast>::from(n.max(1)).unwrap_or_else(F::one)
}

macro_rules! impl_faer {
    ($t:ty) => {
        impl super::NativeBlas for $t {
            const BACKEND: &'static str = "faer";

            fn xcopy(n: i32, x: &[$t], incx: i32, y: &mut [$t], incy: i32) {
                copy(n, x, incx, y, incy)
            }

            fn xdot(n: i32, x: &[$t], incx: i32, y: &[$t], incy: i32) -> $t {
                dot(n, x, incx, y, incy)
            }

            fn xaxpy(n: i32, alpha: $t, x: &[$t], incx: i32, y: &mut [$t], incy: i32) {
                axpy(n, alpha, x, incx, y, incy)
            }

            fn xscal(n: i32, alpha: $t, x: &mut [$t], incx: i32) {
                scal(n, alpha, x, incx)
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
                use faer::linalg::matmul::matmul;
                use faer::{Accum, MatMut, MatRef, Par};

                let trans = parse_trans("GEMV", trans, 1);
                if m < 0 {
                    xerbla("GEMV", 2);
                }
                if n < 0 {
                    xerbla("GEMV", 3);
                }
                if lda < m.max(1) {
                    xerbla("GEMV", 6);
                }
                if incx <= 0 {
                    xerbla("GEMV", 8);
                }
                if incy <= 0 {
                    xerbla("GEMV", 11);
                }

                let (m, n, lda) = (m as usize, n as usize, lda as usize);
                let (incx, incy) = (incx as usize, incy as usize);
                if m == 0 || n == 0 || (alpha == 0.0 && beta == 1.0) {
                    return;
                }
                let (lenx, leny) = if trans { (m, n) } else { (n, m) };

                // x and y as 1 x len rows with column stride inc, transposed
                // into columns.
                let y_slice = &mut y[..extent(1, leny, incy)];
                if alpha == 0.0 || beta != 0.0 {
                    scale_block(beta, y_slice, 1, leny, incy);
                }
                if alpha == 0.0 {
                    return;
                }
                let accum = if beta == 0.0 { Accum::Replace } else { Accum::Add };

                let a_data = &a[..extent(m, n, lda)];
                let a_view = MatRef::from_column_major_slice_with_stride(a_data, m, n, lda);
                let a_op = if trans { a_view.transpose() } else { a_view };
                let x_data = &x[..extent(1, lenx, incx)];
                let x_view =
                    MatRef::from_column_major_slice_with_stride(x_data, 1, lenx, incx).transpose();
                let mut y_view =
                    MatMut::from_column_major_slice_with_stride_mut(y_slice, 1, leny, incy)
                        .transpose_mut();

                matmul(&mut y_view, accum, &a_op, &x_view, alpha, Par::Seq);
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
                use faer::linalg::matmul::matmul;
                use faer::{Accum, MatMut, MatRef, Par};

                let ta = parse_trans("GEMM", transa, 1);
                let tb = parse_trans("GEMM", transb, 2);
                let nrowa = if ta { k } else { m };
                let nrowb = if tb { n } else { k };
                if m < 0 {
                    xerbla("GEMM", 3);
                }
                if n < 0 {
                    xerbla("GEMM", 4);
                }
                if k < 0 {
                    xerbla("GEMM", 5);
                }
                if lda < nrowa.max(1) {
                    xerbla("GEMM", 8);
                }
                if ldb < nrowb.max(1) {
                    xerbla("GEMM", 10);
                }
                if ldc < m.max(1) {
                    xerbla("GEMM", 13);
                }

                let (m, n, k) = (m as usize, n as usize, k as usize);
                let (lda, ldb, ldc) = (lda as usize, ldb as usize, ldc as usize);
                if m == 0 || n == 0 || ((alpha == 0.0 || k == 0) && beta == 1.0) {
                    return;
                }

                let c_slice = &mut c[..extent(m, n, ldc)];
                if alpha == 0.0 || k == 0 || beta != 0.0 {
                    scale_block(beta, c_slice, m, n, ldc);
                }
                if alpha == 0.0 || k == 0 {
                    return;
                }
                let accum = if beta == 0.0 { Accum::Replace } else { Accum::Add };

                let (ar, ac) = if ta { (k, m) } else { (m, k) };
                let (br, bc) = if tb { (n, k) } else { (k, n) };
                let a_data = &a[..extent(ar, ac, lda)];
                let b_data = &b[..extent(br, bc, ldb)];
                let a_view = MatRef::from_column_major_slice_with_stride(a_data, ar, ac, lda);
                let b_view = MatRef::from_column_major_slice_with_stride(b_data, br, bc, ldb);
                let a_op = if ta { a_view.transpose() } else { a_view };
                let b_op = if tb { b_view.transpose() } else { b_view };
                let mut c_view =
                    MatMut::from_column_major_slice_with_stride_mut(c_slice, m, n, ldc);

                matmul(&mut c_view, accum, &a_op, &b_op, alpha, Par::Seq);
            }

            fn xgetrf(m: i32, n: i32, a: &mut [$t], lda: i32, ipiv: &mut [i32]) -> i32 {
                use faer::MatRef;

                if m < 0 {
                    return -1;
                }
                if n < 0 {
                    return -2;
                }
                if lda < m.max(1) {
                    return -4;
                }

                let (m, n, lda) = (m as usize, n as usize, lda as usize);
                if m == 0 || n == 0 {
                    return 0;
                }
                let size = m.min(n);

                let a_data = &a[..extent(m, n, lda)];
                let lu = MatRef::from_column_major_slice_with_stride(a_data, m, n, lda)
                    .partial_piv_lu();
                let (l, u) = (lu.L(), lu.U());
                let (forward, _) = lu.P().arrays();
                let placement = interchanges(forward, &mut ipiv[..size]);

                // LAPACK layout: unit-lower L strictly below the diagonal,
                // U on and above it.
                for col in 0..n {
                    for k in 0..m {
                        let value = if k <= col && k < size {
                            u[(k, col)]
                        } else if col < size {
                            l[(k, col)]
                        } else {
                            continue;
                        };
                        a[col * lda + placement[k]] = value;
                    }
                }

                first_zero_pivot(a, size, lda)
            }

            fn xgetri(
                n: i32,
                a: &mut [$t],
                lda: i32,
                ipiv: &[i32],
                work: &mut [$t],
                lwork: i32,
            ) -> i32 {
                use faer::linalg::triangular_solve::{
                    solve_unit_lower_triangular_in_place, solve_upper_triangular_in_place,
                };
                use faer::{Mat, MatRef, Par};

                if n < 0 {
                    return -1;
                }
                if lda < n.max(1) {
                    return -3;
                }
                if lwork == -1 {
                    if let Some(w) = work.first_mut() {
                        *w = optimal_lwork(n);
                    }
                    return 0;
                }
                if lwork < n.max(1) {
                    return -6;
                }

                let (n, lda) = (n as usize, lda as usize);
                if n == 0 {
                    return 0;
                }
                let info = first_zero_pivot(a, n, lda);
                if info != 0 {
                    return info;
                }

                // P·A = L·U, so inv(A) solves L·U·X = P.
                let rows = permuted_rows(n, ipiv);
                let mut inv =
                    Mat::<$t>::from_fn(n, n, |i, j| if rows[i] == j { 1.0 } else { 0.0 });
                {
                    let a_data = &a[..extent(n, n, lda)];
                    let factors = MatRef::from_column_major_slice_with_stride(a_data, n, n, lda);
                    solve_unit_lower_triangular_in_place(factors, inv.as_mut(), Par::Seq);
                    solve_upper_triangular_in_place(factors, inv.as_mut(), Par::Seq);
                }

                for j in 0..n {
                    for i in 0..n {
                        a[j * lda + i] = inv[(i, j)];
                    }
                }
                0
            }
        }
    };
}

impl_faer!(f32);
impl_faer!(f64);
