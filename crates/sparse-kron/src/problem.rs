//! Interfaces to the collaborators that describe a problem.
//!
//! The solver core consumes, but does not produce, an element table, the
//! per-(term, dimension) coefficient matrices, and source / analytic vectors
//! already projected into the solver basis. Each concern is a trait with a
//! plain in-memory implementation for tests and simple drivers.

use crate::core::MatRef;
use crate::dispatch::Kernel;

/// Active grid elements and their per-dimension cell coordinates.
pub trait ElementTable {
    fn num_dims(&self) -> usize;

    /// Number of active elements.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cell index of element `elem` along `dim`, i.e. the block row/column of
    /// that dimension's coefficient matrix the element occupies.
    fn cell(&self, elem: usize, dim: usize) -> usize;
}

/// Total degrees of freedom: `len · degree^num_dims`.
pub fn degrees_of_freedom<T: ElementTable + ?Sized>(table: &T, degree: usize) -> usize {
    table.len() * element_block(degree, table.num_dims())
}

/// Degrees of freedom carried by one element.
#[inline]
pub fn element_block(degree: usize, num_dims: usize) -> usize {
    (0..num_dims).fold(1, |acc, _| acc * degree)
}

/// Element table stored as a flat coordinate list, one row per element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementList {
    num_dims: usize,
    cells: Vec<usize>,
}

impl ElementList {
    pub fn new(num_dims: usize) -> Self {
        Self {
            num_dims,
            cells: Vec::new(),
        }
    }

    /// Every combination of `cells_per_dim` cells in each dimension, with
    /// dimension 0 varying fastest.
    pub fn full_grid(num_dims: usize, cells_per_dim: usize) -> Self {
        let mut list = Self::new(num_dims);
        let total = (0..num_dims).fold(1usize, |acc, _| acc * cells_per_dim);
        let mut coords = vec![0usize; num_dims];
        for flat in 0..total {
            let mut rest = flat;
            for c in coords.iter_mut() {
                *c = rest % cells_per_dim;
                rest /= cells_per_dim;
            }
            list.push(&coords);
        }
        list
    }

    /// Append an element.
    ///
    /// # Panics
    /// If `coords` does not have one entry per dimension.
    pub fn push(&mut self, coords: &[usize]) {
        assert_eq!(
            coords.len(),
            self.num_dims,
            "element has {} coordinates, table has {} dimensions",
            coords.len(),
            self.num_dims
        );
        self.cells.extend_from_slice(coords);
    }

    /// Coordinates of element `elem`.
    pub fn coords(&self, elem: usize) -> &[usize] {
        &self.cells[elem * self.num_dims..(elem + 1) * self.num_dims]
    }
}

impl ElementTable for ElementList {
    fn num_dims(&self) -> usize {
        self.num_dims
    }

    fn len(&self) -> usize {
        if self.num_dims == 0 {
            0
        } else {
            self.cells.len() / self.num_dims
        }
    }

    fn cell(&self, elem: usize, dim: usize) -> usize {
        self.cells[elem * self.num_dims + dim]
    }
}

/// Dense per-(term, dimension) coefficient matrices of the PDE operator.
///
/// Each matrix is square, column-major, and partitioned into
/// `degree × degree` blocks indexed by cell.
pub trait OperatorCoefficients<P> {
    fn num_terms(&self) -> usize;

    fn num_dims(&self) -> usize;

    /// Polynomial degree, i.e. the block size of every coefficient matrix.
    fn degree(&self) -> usize;

    /// The matrix for `(term, dim)`, or `None` if it has not been generated.
    fn coefficients(&self, term: usize, dim: usize) -> Option<MatRef<'_, P>>;
}

#[derive(Debug, Clone, PartialEq)]
struct Square<P> {
    data: Vec<P>,
    size: usize,
}

/// In-memory [`OperatorCoefficients`].
#[derive(Debug, Clone, PartialEq)]
pub struct CoefficientMatrices<P> {
    num_terms: usize,
    num_dims: usize,
    degree: usize,
    matrices: Vec<Option<Square<P>>>,
}

impl<P: Kernel> CoefficientMatrices<P> {
    /// An empty store; every matrix starts out missing.
    pub fn new(num_terms: usize, num_dims: usize, degree: usize) -> Self {
        Self {
            num_terms,
            num_dims,
            degree,
            matrices: vec![None; num_terms * num_dims],
        }
    }

    /// Store the `size × size` column-major matrix for `(term, dim)`.
    ///
    /// # Panics
    /// If `data.len() != size * size` or the pair is out of range.
    pub fn set(&mut self, term: usize, dim: usize, data: Vec<P>, size: usize) {
        assert!(
            term < self.num_terms && dim < self.num_dims,
            "(term {}, dim {}) is outside a {}x{} operator",
            term,
            dim,
            self.num_terms,
            self.num_dims
        );
        assert_eq!(data.len(), size * size, "coefficient matrix must be square");
        self.matrices[term * self.num_dims + dim] = Some(Square { data, size });
    }
}

impl<P: Kernel> OperatorCoefficients<P> for CoefficientMatrices<P> {
    fn num_terms(&self) -> usize {
        self.num_terms
    }

    fn num_dims(&self) -> usize {
        self.num_dims
    }

    fn degree(&self) -> usize {
        self.degree
    }

    fn coefficients(&self, term: usize, dim: usize) -> Option<MatRef<'_, P>> {
        if term >= self.num_terms || dim >= self.num_dims {
            return None;
        }
        self.matrices[term * self.num_dims + dim]
            .as_ref()
            .map(|m| MatRef::new(&m.data, m.size, m.size, m.size.max(1)))
    }
}

/// Time-dependent scalar coefficient `f(t)`.
pub type TimeFn<P> = Box<dyn Fn(P) -> P + Send + Sync>;

/// An unscaled source vector and its time-scaling function.
pub struct Source<P> {
    vector: Vec<P>,
    time_fn: TimeFn<P>,
}

impl<P: Kernel> Source<P> {
    pub fn new(vector: Vec<P>, time_fn: impl Fn(P) -> P + Send + Sync + 'static) -> Self {
        Self {
            vector,
            time_fn: Box::new(time_fn),
        }
    }

    pub fn vector(&self) -> &[P] {
        &self.vector
    }

    pub fn scale_at(&self, time: P) -> P {
        (self.time_fn)(time)
    }

    /// `out += f(time) · vector`.
    pub fn accumulate_into(&self, time: P, out: &mut [P]) {
        crate::api::axpy(self.vector.len(), self.scale_at(time), &self.vector, 1, out, 1);
    }
}

impl<P: std::fmt::Debug> std::fmt::Debug for Source<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Source")
            .field("len", &self.vector.len())
            .finish_non_exhaustive()
    }
}

/// Analytic solution: a projected vector times a time multiplier.
pub struct AnalyticSolution<P> {
    vector: Vec<P>,
    time_fn: TimeFn<P>,
}

impl<P: Kernel> AnalyticSolution<P> {
    pub fn new(vector: Vec<P>, time_fn: impl Fn(P) -> P + Send + Sync + 'static) -> Self {
        Self {
            vector,
            time_fn: Box::new(time_fn),
        }
    }

    pub fn vector(&self) -> &[P] {
        &self.vector
    }

    pub fn time_multiplier(&self, time: P) -> P {
        (self.time_fn)(time)
    }

    /// Euclidean norm of `v - multiplier(time) · vector`, in `f64`.
    ///
    /// Non-finite when a value cannot be represented as `f64`.
    pub fn error_norm(&self, v: &[P], time: P) -> f64 {
        assert_eq!(v.len(), self.vector.len(), "analytic solution length mismatch");
        let mult = self.time_multiplier(time).to_f64().unwrap_or(f64::NAN);
        v.iter()
            .zip(&self.vector)
            .map(|(got, exact)| {
                let got = got.to_f64().unwrap_or(f64::NAN);
                let exact = exact.to_f64().unwrap_or(f64::NAN);
                (got - exact * mult).powi(2)
            })
            .sum::<f64>()
            .sqrt()
    }
}

impl<P: std::fmt::Debug> std::fmt::Debug for AnalyticSolution<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyticSolution")
            .field("len", &self.vector.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_grid_order() {
        let table = ElementList::full_grid(2, 3);
        assert_eq!(table.len(), 9);
        assert_eq!(table.coords(0), &[0, 0]);
        assert_eq!(table.coords(1), &[1, 0]);
        assert_eq!(table.coords(3), &[0, 1]);
        assert_eq!(table.cell(8, 1), 2);
        assert_eq!(degrees_of_freedom(&table, 2), 36);
    }

    #[test]
    fn test_empty_table() {
        let table = ElementList::new(3);
        assert!(table.is_empty());
        assert_eq!(degrees_of_freedom(&table, 4), 0);
    }

    #[test]
    #[should_panic(expected = "coordinates")]
    fn test_push_wrong_arity() {
        ElementList::new(2).push(&[1]);
    }

    #[test]
    fn test_coefficients_missing_until_set() {
        let mut coeffs = CoefficientMatrices::<i64>::new(2, 1, 2);
        assert!(coeffs.coefficients(1, 0).is_none());
        coeffs.set(1, 0, vec![1, 2, 3, 4], 2);
        let m = coeffs.coefficients(1, 0).unwrap();
        assert_eq!((m.rows(), m.cols(), m.ld()), (2, 2, 2));
        assert!(coeffs.coefficients(0, 0).is_none());
        assert!(coeffs.coefficients(2, 0).is_none());
    }

    #[test]
    fn test_source_scaling() {
        let source = Source::new(vec![1.0f64, 2.0], |t| 2.0 * t);
        let mut out = vec![1.0, 1.0];
        source.accumulate_into(0.5, &mut out);
        assert_eq!(out, vec![2.0, 3.0]);
    }

    #[test]
    fn test_analytic_error_norm() {
        let exact = AnalyticSolution::new(vec![3i64, 0], |t| t);
        // multiplier 1: [3, 4] - [3, 0] = [0, 4]
        assert_eq!(exact.error_norm(&[3, 4], 1), 4.0);
        // multiplier 0: |[3, 4]| = 5
        assert_eq!(exact.error_norm(&[3, 4], 0), 5.0);
    }
}
