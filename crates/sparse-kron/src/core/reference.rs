//! Portable reference kernels.
//!
//! These loops back every element type that has no native library. They need
//! nothing beyond `+`, `*` and zero, so exact integer types run through the
//! same operator code as floating point.
//!
//! `gemm` and `gemv` here do **not** honor `alpha`/`beta`: the product is
//! accumulated into the destination (`C += op(A)·op(B)`). Callers that want
//! `C := op(A)·op(B)` zero the destination first, which is what the batch
//! layer does. With `alpha = 1`, `beta = 0` and a zeroed destination both
//! paths produce the same result.

use super::view::{MatMut, MatRef, VecMut, VecRef};
use crate::types::Scalar;

/// 2-D operand addressed as `data[i * rs + j * cs]`.
#[derive(Clone, Copy)]
struct Strided<'a, P> {
    data: &'a [P],
    rs: usize,
    cs: usize,
}

impl<'a, P: Copy> Strided<'a, P> {
    /// `op(A)` of a column-major matrix:
    /// `A(i, z)` is `z*lda + i`, `Aᵗ(i, z)` is `i*lda + z`.
    fn of_matrix(a: &MatRef<'a, P>) -> Self {
        if a.trans().is_trans() {
            Self {
                data: a.as_slice(),
                rs: a.ld(),
                cs: 1,
            }
        } else {
            Self {
                data: a.as_slice(),
                rs: 1,
                cs: a.ld(),
            }
        }
    }

    /// A strided vector as a single column.
    fn of_column(x: &VecRef<'a, P>) -> Self {
        Self {
            data: x.as_slice(),
            rs: x.inc(),
            cs: 0,
        }
    }

    #[inline(always)]
    fn at(&self, i: usize, j: usize) -> P {
        self.data[i * self.rs + j * self.cs]
    }
}

/// Triple loop over `i ∈ [0, m)`, `j ∈ [0, n)`, `z ∈ [0, k)`:
/// `C(i, j) += Σ_z A(i, z) · B(z, j)`.
fn basic_gemm<P: Scalar>(
    m: usize,
    n: usize,
    k: usize,
    a: Strided<'_, P>,
    b: Strided<'_, P>,
    c: &mut [P],
    c_rs: usize,
    c_cs: usize,
) {
    for i in 0..m {
        for j in 0..n {
            let mut result = P::zero();
            for z in 0..k {
                result += a.at(i, z) * b.at(z, j);
            }
            c[i * c_rs + j * c_cs] += result;
        }
    }
}

/// `y[i] := x[i]`.
pub fn copy<P: Scalar>(x: VecRef<'_, P>, mut y: VecMut<'_, P>) {
    assert_eq!(x.len(), y.len(), "copy: length mismatch");
    for i in 0..x.len() {
        *y.get_mut(i) = *x.get(i);
    }
}

/// `Σ x[i]·y[i]`, accumulated in `P`.
pub fn dot<P: Scalar>(x: VecRef<'_, P>, y: VecRef<'_, P>) -> P {
    assert_eq!(x.len(), y.len(), "dot: length mismatch");
    let mut ans = P::zero();
    for i in 0..x.len() {
        ans += *x.get(i) * *y.get(i);
    }
    ans
}

/// `y[i] += α·x[i]`, with `x` advancing by its own stride.
pub fn axpy<P: Scalar>(alpha: P, x: VecRef<'_, P>, mut y: VecMut<'_, P>) {
    assert_eq!(x.len(), y.len(), "axpy: length mismatch");
    for i in 0..x.len() {
        let yi = y.get_mut(i);
        *yi = *yi + *x.get(i) * alpha;
    }
}

/// `x[i] *= α`.
pub fn scal<P: Scalar>(alpha: P, mut x: VecMut<'_, P>) {
    for i in 0..x.len() {
        *x.get_mut(i) *= alpha;
    }
}

/// `C += op(A)·op(B)`; `alpha`/`beta` are not part of the reference contract.
pub fn gemm<P: Scalar>(a: MatRef<'_, P>, b: MatRef<'_, P>, mut c: MatMut<'_, P>) {
    let (m, k) = (a.op_rows(), a.op_cols());
    let n = b.op_cols();
    assert_eq!(b.op_rows(), k, "gemm: inner dimensions differ");
    assert_eq!((c.rows(), c.cols()), (m, n), "gemm: C has the wrong shape");

    let ldc = c.ld();
    basic_gemm(
        m,
        n,
        k,
        Strided::of_matrix(&a),
        Strided::of_matrix(&b),
        c.as_mut_slice(),
        1,
        ldc,
    );
}

/// `y += op(A)·x`, the general product with a one-column right operand.
pub fn gemv<P: Scalar>(a: MatRef<'_, P>, x: VecRef<'_, P>, mut y: VecMut<'_, P>) {
    let (m, k) = (a.op_rows(), a.op_cols());
    assert_eq!(x.len(), k, "gemv: x has the wrong length");
    assert_eq!(y.len(), m, "gemv: y has the wrong length");

    let incy = y.inc();
    basic_gemm(
        m,
        1,
        k,
        Strided::of_matrix(&a),
        Strided::of_column(&x),
        y.as_mut_slice(),
        incy,
        0,
    );
}
