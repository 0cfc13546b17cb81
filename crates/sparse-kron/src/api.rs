use crate::batch::{split_destinations, OperandTriple};
use crate::core::{matrix_extent, vector_extent, MatMut, MatRef, Transpose, VecMut, VecRef};
use crate::dispatch::Kernel;
use crate::error::LapackInfo;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Strided copy: `y[i*incy] := x[i*incx]` for `i < n`.
///
/// # Example
///
/// ```
/// let x = [1i64, 0, 2, 0, 3];
/// let mut y = [0i64; 3];
/// sparse_kron::copy(3, &x, 2, &mut y, 1);
/// assert_eq!(y, [1, 2, 3]);
/// ```
pub fn copy<P: Kernel>(n: usize, x: &[P], incx: usize, y: &mut [P], incy: usize) {
    P::copy(VecRef::new(x, n, incx), VecMut::new(y, n, incy));
}

/// Strided dot product `Σ x[i*incx]·y[i*incy]`, accumulated in `P`.
pub fn dot<P: Kernel>(n: usize, x: &[P], incx: usize, y: &[P], incy: usize) -> P {
    P::dot(VecRef::new(x, n, incx), VecRef::new(y, n, incy))
}

/// `y[i*incy] += α·x[i*incx]`.
pub fn axpy<P: Kernel>(n: usize, alpha: P, x: &[P], incx: usize, y: &mut [P], incy: usize) {
    P::axpy(alpha, VecRef::new(x, n, incx), VecMut::new(y, n, incy));
}

/// `x[i*incx] *= α`.
pub fn scal<P: Kernel>(n: usize, alpha: P, x: &mut [P], incx: usize) {
    P::scal(alpha, VecMut::new(x, n, incx));
}

/// BLAS-style matrix-vector product: `y := α·op(A)·x + β·y`.
///
/// `A` is the stored `m × n` matrix. For generic element types the product is
/// accumulated into `y` and `alpha`/`beta` are ignored.
#[allow(clippy::too_many_arguments)]
pub fn gemv<P: Kernel>(
    trans: Transpose,
    m: usize,
    n: usize,
    alpha: P,
    a: &[P],
    lda: usize,
    x: &[P],
    incx: usize,
    beta: P,
    y: &mut [P],
    incy: usize,
) {
    let a = MatRef::new(a, m, n, lda).transposed(trans);
    let x = VecRef::new(x, a.op_cols(), incx);
    let y = VecMut::new(y, a.op_rows(), incy);
    P::gemv(alpha, a, x, beta, y);
}

/// BLAS-style matrix multiplication: `C := α·op(A)·op(B) + β·C`.
///
/// `op(A)` is `m × k`, `op(B)` is `k × n`, `C` is `m × n`, all column-major.
/// For generic element types the product is accumulated into `C` and
/// `alpha`/`beta` are ignored; zero `C` first to get a plain product.
///
/// # Example
///
/// ```
/// use sparse_kron::{gemm, Transpose};
///
/// // [[1, 2], [3, 4]] · [[5, 6], [7, 8]], column-major
/// let a = [1i64, 3, 2, 4];
/// let b = [5i64, 7, 6, 8];
/// let mut c = [0i64; 4];
/// gemm(Transpose::NoTrans, Transpose::NoTrans, 2, 2, 2, 1, &a, 2, &b, 2, 0, &mut c, 2);
/// assert_eq!(c, [19, 43, 22, 50]);
/// ```
#[allow(clippy::too_many_arguments)]
pub fn gemm<P: Kernel>(
    trans_a: Transpose,
    trans_b: Transpose,
    m: usize,
    n: usize,
    k: usize,
    alpha: P,
    a: &[P],
    lda: usize,
    b: &[P],
    ldb: usize,
    beta: P,
    c: &mut [P],
    ldc: usize,
) {
    P::gemm(
        alpha,
        MatRef::with_op(a, trans_a, m, k, lda),
        MatRef::with_op(b, trans_b, k, n, ldb),
        beta,
        MatMut::new(c, m, n, ldc),
    );
}

/// In-place LU factorization with partial pivoting of the `m × n` matrix `A`.
///
/// `ipiv` receives `min(m, n)` 1-based pivot rows.
///
/// # Panics
/// For element types without a native library.
pub fn getrf<P: Kernel>(m: usize, n: usize, a: &mut [P], lda: usize, ipiv: &mut [i32]) -> LapackInfo {
    P::getrf(MatMut::new(a, m, n, lda), ipiv)
}

/// In-place inverse of the `n × n` matrix factored by [`getrf`].
///
/// `work` must hold at least [`getri_workspace_len`] elements; a shorter
/// workspace is reported as `info = -6`.
///
/// # Panics
/// For element types without a native library.
pub fn getri<P: Kernel>(
    n: usize,
    a: &mut [P],
    lda: usize,
    ipiv: &[i32],
    work: &mut [P],
) -> LapackInfo {
    P::getri(MatMut::new(a, n, n, lda), ipiv, work)
}

/// Minimal `getri` workspace length for an `n × n` matrix.
pub fn getri_workspace_len(n: usize) -> usize {
    n.max(1)
}

/// Builder for configuring GEMM operations.
///
/// Holds everything but the data pointers, so one value describes every
/// member of a same-shape batch.
///
/// # Example
///
/// ```
/// use sparse_kron::Gemm;
///
/// let a = vec![1.0f64; 6]; // 2x3
/// let b = vec![1.0f64; 6]; // 3x2
/// let mut c = vec![0.0f64; 4];
///
/// Gemm::new(2, 2, 3).execute(&a, &b, &mut c);
/// assert_eq!(c, vec![3.0; 4]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gemm<P> {
    m: usize,
    n: usize,
    k: usize,
    trans_a: Transpose,
    trans_b: Transpose,
    lda: Option<usize>,
    ldb: Option<usize>,
    ldc: Option<usize>,
    alpha: P,
    beta: P,
}

impl<P: Kernel> Gemm<P> {
    /// Create a new GEMM builder for `C(m×n) := op(A)(m×k) · op(B)(k×n)`.
    pub fn new(m: usize, n: usize, k: usize) -> Self {
        Self {
            m,
            n,
            k,
            trans_a: Transpose::NoTrans,
            trans_b: Transpose::NoTrans,
            lda: None,
            ldb: None,
            ldc: None,
            alpha: P::one(),
            beta: P::zero(),
        }
    }

    /// Transpose matrix A.
    pub fn trans_a(mut self) -> Self {
        self.trans_a = Transpose::Trans;
        self
    }

    /// Transpose matrix B.
    pub fn trans_b(mut self) -> Self {
        self.trans_b = Transpose::Trans;
        self
    }

    pub fn lda(mut self, lda: usize) -> Self {
        self.lda = Some(lda);
        self
    }

    pub fn ldb(mut self, ldb: usize) -> Self {
        self.ldb = Some(ldb);
        self
    }

    pub fn ldc(mut self, ldc: usize) -> Self {
        self.ldc = Some(ldc);
        self
    }

    pub fn alpha(mut self, alpha: P) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn beta(mut self, beta: P) -> Self {
        self.beta = beta;
        self
    }

    /// `(m, n, k)`.
    pub fn dims(&self) -> (usize, usize, usize) {
        (self.m, self.n, self.k)
    }

    /// Leading dimensions, defaulting to the tight stored row counts.
    pub fn leading_dims(&self) -> (usize, usize, usize) {
        let rows_a = if self.trans_a.is_trans() { self.k } else { self.m };
        let rows_b = if self.trans_b.is_trans() { self.n } else { self.k };
        (
            self.lda.unwrap_or(rows_a.max(1)),
            self.ldb.unwrap_or(rows_b.max(1)),
            self.ldc.unwrap_or(self.m.max(1)),
        )
    }

    /// Elements of `C` written by one execution.
    pub fn c_extent(&self) -> usize {
        matrix_extent(self.m, self.n, self.leading_dims().2)
    }

    /// Execute the GEMM operation on matrices starting at the slice heads.
    pub fn execute(&self, a: &[P], b: &[P], c: &mut [P]) {
        let (lda, ldb, ldc) = self.leading_dims();
        P::gemm(
            self.alpha,
            MatRef::with_op(a, self.trans_a, self.m, self.k, lda),
            MatRef::with_op(b, self.trans_b, self.k, self.n, ldb),
            self.beta,
            MatMut::new(c, self.m, self.n, ldc),
        );
    }

    /// Execute once per operand triple, reading `A` at `a[t.a..]`, `B` at
    /// `b[t.b..]` and writing `C` at `c[t.c..]`.
    ///
    /// Triples must be sorted by destination offset with non-overlapping
    /// destinations; they then run in parallel under the `parallel` feature.
    ///
    /// # Panics
    /// If two destinations overlap or an offset is out of range.
    pub fn execute_batched(&self, a: &[P], b: &[P], c: &mut [P], operands: &[OperandTriple]) {
        let targets = split_destinations(c, operands.iter().map(|t| t.c), self.c_extent());

        #[cfg(feature = "parallel")]
        {
            targets
                .into_par_iter()
                .zip(operands.par_iter())
                .for_each(|(c, t)| self.execute(&a[t.a..], &b[t.b..], c));
        }

        #[cfg(not(feature = "parallel"))]
        {
            for (c, t) in targets.into_iter().zip(operands) {
                self.execute(&a[t.a..], &b[t.b..], c);
            }
        }
    }
}

/// Builder for configuring GEMV operations on a stored `m × n` matrix.
///
/// # Example
///
/// ```
/// use sparse_kron::Gemv;
///
/// // column sums of [[1, 2], [3, 4]]
/// let a = [1i32, 3, 2, 4];
/// let ones = [1i32; 2];
/// let mut y = [0i32; 2];
/// Gemv::new(2, 2).trans().execute(&a, &ones, &mut y);
/// assert_eq!(y, [4, 6]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gemv<P> {
    m: usize,
    n: usize,
    trans: Transpose,
    lda: Option<usize>,
    incx: usize,
    incy: usize,
    alpha: P,
    beta: P,
}

impl<P: Kernel> Gemv<P> {
    pub fn new(m: usize, n: usize) -> Self {
        Self {
            m,
            n,
            trans: Transpose::NoTrans,
            lda: None,
            incx: 1,
            incy: 1,
            alpha: P::one(),
            beta: P::zero(),
        }
    }

    /// Multiply by `Aᵗ`.
    pub fn trans(mut self) -> Self {
        self.trans = Transpose::Trans;
        self
    }

    pub fn lda(mut self, lda: usize) -> Self {
        self.lda = Some(lda);
        self
    }

    pub fn incx(mut self, incx: usize) -> Self {
        self.incx = incx;
        self
    }

    pub fn incy(mut self, incy: usize) -> Self {
        self.incy = incy;
        self
    }

    pub fn alpha(mut self, alpha: P) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn beta(mut self, beta: P) -> Self {
        self.beta = beta;
        self
    }

    /// `(len x, len y)`.
    pub fn lens(&self) -> (usize, usize) {
        if self.trans.is_trans() {
            (self.m, self.n)
        } else {
            (self.n, self.m)
        }
    }

    /// Elements of `y` written by one execution.
    pub fn y_extent(&self) -> usize {
        vector_extent(self.lens().1, self.incy)
    }

    pub fn execute(&self, a: &[P], x: &[P], y: &mut [P]) {
        let lda = self.lda.unwrap_or(self.m.max(1));
        let (lenx, leny) = self.lens();
        P::gemv(
            self.alpha,
            MatRef::new(a, self.m, self.n, lda).transposed(self.trans),
            VecRef::new(x, lenx, self.incx),
            self.beta,
            VecMut::new(y, leny, self.incy),
        );
    }

    /// Execute once per operand triple: `A` at `a[t.a..]`, `x` at `x[t.b..]`,
    /// `y` at `y[t.c..]`. Same ordering rules as [`Gemm::execute_batched`].
    pub fn execute_batched(&self, a: &[P], x: &[P], y: &mut [P], operands: &[OperandTriple]) {
        let targets = split_destinations(y, operands.iter().map(|t| t.c), self.y_extent());

        #[cfg(feature = "parallel")]
        {
            targets
                .into_par_iter()
                .zip(operands.par_iter())
                .for_each(|(y, t)| self.execute(&a[t.a..], &x[t.b..], y));
        }

        #[cfg(not(feature = "parallel"))]
        {
            for (y, t) in targets.into_iter().zip(operands) {
                self.execute(&a[t.a..], &x[t.b..], y);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gemm_reference_example() {
        let a = [1i64, 3, 2, 4];
        let b = [5i64, 7, 6, 8];
        let mut c = [0i64; 4];
        gemm(
            Transpose::NoTrans,
            Transpose::NoTrans,
            2,
            2,
            2,
            1,
            &a,
            2,
            &b,
            2,
            0,
            &mut c,
            2,
        );
        assert_eq!(c, [19, 43, 22, 50]);

        // a second call accumulates
        gemm(
            Transpose::NoTrans,
            Transpose::NoTrans,
            2,
            2,
            2,
            1,
            &a,
            2,
            &b,
            2,
            0,
            &mut c,
            2,
        );
        assert_eq!(c, [38, 86, 44, 100]);
    }

    #[test]
    fn test_gemm_native_overwrites() {
        let a = [1.0f64, 3.0, 2.0, 4.0];
        let b = [5.0f64, 7.0, 6.0, 8.0];
        let mut c = [0.0f64; 4];
        for _ in 0..2 {
            gemm(
                Transpose::NoTrans,
                Transpose::NoTrans,
                2,
                2,
                2,
                1.0,
                &a,
                2,
                &b,
                2,
                0.0,
                &mut c,
                2,
            );
        }
        assert_eq!(c, [19.0, 43.0, 22.0, 50.0]);
    }

    #[test]
    fn test_builder_api_trans_a() {
        // A is stored 3x2; Aᵗ = [[1, 2, 3], [4, 5, 6]]
        let a = [1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0];
        // B = [[1, 2], [3, 4], [5, 6]] column-major
        let b = [1.0f32, 3.0, 5.0, 2.0, 4.0, 6.0];
        let mut c = [0.0f32; 4];

        Gemm::new(2, 2, 3).trans_a().execute(&a, &b, &mut c);

        // Aᵗ·B = [[22, 28], [49, 64]]
        assert_eq!(c, [22.0, 49.0, 28.0, 64.0]);
    }

    #[test]
    fn test_builder_api_trans_b() {
        // A = [[1, 2, 3], [4, 5, 6]] column-major
        let a = [1i32, 4, 2, 5, 3, 6];
        // B stored 2x3 = [[1, 3, 5], [2, 4, 6]], Bᵗ = [[1, 2], [3, 4], [5, 6]]
        let b = [1i32, 2, 3, 4, 5, 6];
        let mut c = [0i32; 4];

        Gemm::new(2, 2, 3).trans_b().execute(&a, &b, &mut c);

        assert_eq!(c, [22, 49, 28, 64]);
    }

    #[test]
    fn test_builder_leading_dims() {
        let g = Gemm::<f64>::new(3, 4, 5).trans_a();
        assert_eq!(g.leading_dims(), (5, 5, 3));
        assert_eq!(g.ldc(7).c_extent(), 3 * 7 + 3);
    }

    #[test]
    fn test_gemm_batched() {
        // Two 2x2 products sharing B, written into a padded destination.
        let a = [1i64, 3, 2, 4, 2, 0, 0, 2];
        let b = [5i64, 7, 6, 8];
        let mut c = [0i64; 10];
        let operands = [
            OperandTriple { a: 0, b: 0, c: 0 },
            OperandTriple { a: 4, b: 0, c: 6 },
        ];

        Gemm::new(2, 2, 2).execute_batched(&a, &b, &mut c, &operands);

        assert_eq!(&c[0..4], &[19, 43, 22, 50]);
        assert_eq!(&c[4..6], &[0, 0]);
        assert_eq!(&c[6..10], &[10, 14, 12, 16]);
    }

    #[test]
    fn test_gemm_batched_empty() {
        let mut c: [f64; 0] = [];
        Gemm::new(2, 2, 2).execute_batched(&[], &[], &mut c, &[]);
    }

    #[test]
    #[should_panic(expected = "overlaps")]
    fn test_gemm_batched_overlap_is_fatal() {
        let a = [1.0f64; 4];
        let mut c = [0.0f64; 8];
        let operands = [
            OperandTriple { a: 0, b: 0, c: 0 },
            OperandTriple { a: 0, b: 0, c: 2 },
        ];
        Gemm::new(2, 2, 2).execute_batched(&a, &a, &mut c, &operands);
    }

    #[test]
    fn test_gemv_batched_reduction() {
        // Row sums of two 2x3 blocks via a ones vector.
        let a = [1i64, 2, 3, 4, 5, 6, 1, 1, 1, 1, 1, 1];
        let ones = [1i64; 3];
        let mut y = [0i64; 4];
        let operands = [
            OperandTriple { a: 0, b: 0, c: 0 },
            OperandTriple { a: 6, b: 0, c: 2 },
        ];

        Gemv::new(2, 3).execute_batched(&a, &ones, &mut y, &operands);

        assert_eq!(y, [9, 12, 3, 3]);
    }

    #[test]
    fn test_gemv_api_strides() {
        let a = [1.0f64, 3.0, 2.0, 4.0];
        let x = [1.0f64, -1.0, 2.0];
        let mut y = [1.0f64, 0.0, 1.0];
        gemv(Transpose::NoTrans, 2, 2, 1.0, &a, 2, &x, 2, 1.0, &mut y, 2);
        assert_eq!(y, [6.0, 0.0, 12.0]);
    }

    #[test]
    fn test_factorization_api() {
        let mut a = [2.0f64, 1.0, 1.0, 3.0];
        let mut ipiv = [0i32; 2];
        assert!(getrf(2, 2, &mut a, 2, &mut ipiv).is_success());
        let mut work = vec![0.0f64; getri_workspace_len(2)];
        assert!(getri(2, &mut a, 2, &ipiv, &mut work).is_success());
        // inv([[2, 1], [1, 3]]) = [[0.6, -0.2], [-0.2, 0.4]]
        let expected = [0.6, -0.2, -0.2, 0.4];
        for (got, want) in a.iter().zip(&expected) {
            assert!((got - want).abs() < 1e-12);
        }
    }

    #[test]
    fn test_getri_short_workspace() {
        let mut a = [2.0f64, 1.0, 1.0, 3.0];
        let mut ipiv = [0i32; 2];
        assert!(getrf(2, 2, &mut a, 2, &mut ipiv).is_success());
        let mut work = [0.0f64; 1];
        assert_eq!(getri(2, &mut a, 2, &ipiv, &mut work).raw(), -6);
    }
}
