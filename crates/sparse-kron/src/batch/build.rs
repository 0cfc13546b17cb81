use super::{BatchOp, BatchOperandSet, Buffer, OperandTriple, Stage};
use crate::api::{Gemm, Gemv};
use crate::dispatch::Kernel;
use crate::error::{BatchError, Result};
use crate::problem::{element_block, ElementTable, OperatorCoefficients};
use tracing::{debug, info};

/// Sizes of the buffers an operator application needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkspaceLayout {
    pub num_elems: usize,
    pub num_terms: usize,
    pub num_dims: usize,
    pub degree: usize,
    /// Degrees of freedom per element, `degree^num_dims`.
    pub block: usize,
}

impl WorkspaceLayout {
    /// Length of the state vector and of `fx`.
    pub fn dofs(&self) -> usize {
        self.num_elems * self.block
    }

    /// Length of each ping-pong buffer: one block per element pair.
    pub fn stage_len(&self) -> usize {
        self.num_elems * self.num_elems * self.block
    }

    /// Length of the reduction buffer: one block per (element pair, term).
    pub fn reduction_len(&self) -> usize {
        self.stage_len() * self.num_terms
    }

    /// Length of the unit vector: one entry per reduced column.
    pub fn unit_len(&self) -> usize {
        self.num_elems * self.num_terms
    }

    /// Ping-pong buffers actually used; chains of one dimension write the
    /// reduction buffer directly.
    pub fn num_stage_buffers(&self) -> usize {
        self.num_dims.saturating_sub(1).min(2)
    }

    pub fn total_elements(&self) -> usize {
        self.num_stage_buffers() * self.stage_len() + self.reduction_len() + self.unit_len()
    }

    /// Workspace size in megabytes (10^6 bytes) for element type `P`.
    pub fn megabytes<P>(&self) -> f64 {
        (self.total_elements() * std::mem::size_of::<P>()) as f64 * 1e-6
    }
}

/// Every batch operand set of one operator, in execution order.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchPlan<P> {
    layout: WorkspaceLayout,
    sets: Vec<BatchOperandSet<P>>,
}

impl<P> BatchPlan<P> {
    pub fn layout(&self) -> &WorkspaceLayout {
        &self.layout
    }

    pub fn sets(&self) -> &[BatchOperandSet<P>] {
        &self.sets
    }

    /// Total operand triples across all sets.
    pub fn num_operands(&self) -> usize {
        self.sets.iter().map(|s| s.operands.len()).sum()
    }
}

/// Build the batch operand sets applying `coefficients` over every pair of
/// elements in `table`.
///
/// Sets are ordered term by term, dimension 0 first, followed by the
/// reduction. Coefficients are only inspected, never copied.
///
/// # Errors
/// [`BatchError::MissingCoefficients`] if a `(term, dimension)` matrix has not
/// been generated; [`BatchError::ShapeMismatch`] if the dimensions disagree,
/// a matrix is not a whole number of `degree × degree` blocks, or an element
/// refers to a cell outside its matrix.
pub fn build_batches<P, T, C>(table: &T, coefficients: &C) -> Result<BatchPlan<P>>
where
    P: Kernel,
    T: ElementTable + ?Sized,
    C: OperatorCoefficients<P> + ?Sized,
{
    let num_dims = table.num_dims();
    let num_terms = coefficients.num_terms();
    let degree = coefficients.degree();
    let num_elems = table.len();

    if num_dims == 0 {
        return Err(BatchError::ShapeMismatch(
            "element table has no dimensions".to_string(),
        ));
    }
    if coefficients.num_dims() != num_dims {
        return Err(BatchError::ShapeMismatch(format!(
            "coefficients have {} dimensions, element table has {}",
            coefficients.num_dims(),
            num_dims
        )));
    }
    if degree == 0 {
        return Err(BatchError::ShapeMismatch("degree must be positive".to_string()));
    }

    // Validate every coefficient matrix against the table before building.
    let mut coeff_ld = vec![0usize; num_terms * num_dims];
    for term in 0..num_terms {
        for dim in 0..num_dims {
            let m = coefficients
                .coefficients(term, dim)
                .ok_or(BatchError::MissingCoefficients { term, dim })?;
            if m.rows() != m.cols() || m.rows() % degree != 0 {
                return Err(BatchError::ShapeMismatch(format!(
                    "coefficient matrix ({}, {}) is {}x{}, not square in {}x{} blocks",
                    term,
                    dim,
                    m.rows(),
                    m.cols(),
                    degree,
                    degree
                )));
            }
            let cells = m.rows() / degree;
            if let Some(elem) = (0..num_elems).find(|&e| table.cell(e, dim) >= cells) {
                return Err(BatchError::ShapeMismatch(format!(
                    "element {} has cell {} in dimension {}, coefficients hold {} cells",
                    elem,
                    table.cell(elem, dim),
                    dim,
                    cells
                )));
            }
            coeff_ld[term * num_dims + dim] = m.ld();
        }
    }

    let layout = WorkspaceLayout {
        num_elems,
        num_terms,
        num_dims,
        degree,
        block: element_block(degree, num_dims),
    };
    let block = layout.block;

    let mut sets = Vec::with_capacity(num_terms * num_dims + 1);
    for term in 0..num_terms {
        for dim in 0..num_dims {
            let ld = coeff_ld[term * num_dims + dim];
            let coeff = Buffer::Coefficients { term, dim };
            let last = dim + 1 == num_dims;
            let dest = if last {
                Buffer::Reduction
            } else {
                Buffer::Workspace(dim % 2)
            };
            // destination block of pair p
            let dest_base = |p: usize| {
                if last {
                    (p * num_terms + term) * block
                } else {
                    p * block
                }
            };
            let coeff_offset = |i: usize, j: usize| {
                table.cell(j, dim) * degree * ld + table.cell(i, dim) * degree
            };

            let mut set = if dim == 0 {
                let gemm = Gemm::new(degree, block / degree, degree)
                    .lda(ld)
                    .ldb(degree)
                    .ldc(degree);
                BatchOperandSet::new(
                    Stage::Kron { term, dim },
                    BatchOp::Gemm(gemm),
                    coeff,
                    Buffer::State,
                    dest,
                )
            } else {
                let s = element_block(degree, dim);
                let gemm = Gemm::new(s, degree, degree).trans_b().lda(s).ldb(ld).ldc(s);
                BatchOperandSet::new(
                    Stage::Kron { term, dim },
                    BatchOp::Gemm(gemm),
                    Buffer::Workspace((dim - 1) % 2),
                    coeff,
                    dest,
                )
            };

            let s = element_block(degree, dim);
            let slabs = block / (s * degree);
            for i in 0..num_elems {
                for j in 0..num_elems {
                    let p = i * num_elems + j;
                    if dim == 0 {
                        set.push(OperandTriple {
                            a: coeff_offset(i, j),
                            b: j * block,
                            c: dest_base(p),
                        });
                    } else {
                        for r in 0..slabs {
                            let within = r * s * degree;
                            set.push(OperandTriple {
                                a: p * block + within,
                                b: coeff_offset(i, j),
                                c: dest_base(p) + within,
                            });
                        }
                    }
                }
            }
            debug_assert!(set.check_destinations().is_ok());
            debug!(term, dim, operands = set.len(), "built kron batch");
            sets.push(set);
        }
    }

    if num_terms > 0 && num_elems > 0 {
        let columns = num_elems * num_terms;
        let gemv = Gemv::new(block, columns).lda(block);
        let mut set = BatchOperandSet::new(
            Stage::Reduce,
            BatchOp::Gemv(gemv),
            Buffer::Reduction,
            Buffer::Unit,
            Buffer::Output,
        );
        for i in 0..num_elems {
            set.push(OperandTriple {
                a: i * columns * block,
                b: 0,
                c: i * block,
            });
        }
        debug!(operands = set.len(), "built reduction batch");
        sets.push(set);
    }

    let plan = BatchPlan { layout, sets };
    info!(
        sets = plan.sets.len(),
        operands = plan.num_operands(),
        elements = num_elems,
        dofs = layout.dofs(),
        workspace_mb = layout.megabytes::<P>(),
        "batch lists generated"
    );
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::{CoefficientMatrices, ElementList};

    fn identity_coefficients(
        terms: usize,
        dims: usize,
        degree: usize,
        cells: usize,
    ) -> CoefficientMatrices<f64> {
        let size = degree * cells;
        let mut coeffs = CoefficientMatrices::new(terms, dims, degree);
        for t in 0..terms {
            for d in 0..dims {
                let mut data = vec![0.0; size * size];
                for k in 0..size {
                    data[k * size + k] = 1.0;
                }
                coeffs.set(t, d, data, size);
            }
        }
        coeffs
    }

    #[test]
    fn test_set_counts_and_shapes() {
        let table = ElementList::full_grid(3, 2);
        let coeffs = identity_coefficients(2, 3, 2, 2);
        let plan = build_batches(&table, &coeffs).unwrap();

        // two terms x three dims, plus the reduction
        assert_eq!(plan.sets().len(), 7);
        let e = table.len();
        assert_eq!(plan.layout().block, 8);
        assert_eq!(plan.layout().dofs(), 64);

        // dim 0: one product per pair; dim 1: two slabs; dim 2: one slab
        assert_eq!(plan.sets()[0].len(), e * e);
        assert_eq!(plan.sets()[1].len(), e * e * 2);
        assert_eq!(plan.sets()[2].len(), e * e);
        assert_eq!(plan.sets()[6].len(), e);

        assert_eq!(plan.sets()[0].buffers().2, Buffer::Workspace(0));
        assert_eq!(
            plan.sets()[1].buffers(),
            (
                Buffer::Workspace(0),
                Buffer::Coefficients { term: 0, dim: 1 },
                Buffer::Workspace(1)
            )
        );
        assert_eq!(plan.sets()[2].buffers().2, Buffer::Reduction);
        assert_eq!(plan.sets()[6].stage(), Stage::Reduce);

        for set in plan.sets() {
            assert_eq!(set.check_destinations(), Ok(()));
        }
    }

    #[test]
    fn test_single_dimension_writes_reduction() {
        let table = ElementList::full_grid(1, 3);
        let coeffs = identity_coefficients(1, 1, 2, 3);
        let plan = build_batches(&table, &coeffs).unwrap();
        assert_eq!(plan.layout().num_stage_buffers(), 0);
        assert_eq!(plan.sets()[0].buffers().0, Buffer::Coefficients { term: 0, dim: 0 });
        assert_eq!(plan.sets()[0].buffers().2, Buffer::Reduction);
    }

    #[test]
    fn test_missing_coefficients() {
        let table = ElementList::full_grid(2, 2);
        let mut coeffs = CoefficientMatrices::<f64>::new(1, 2, 2);
        coeffs.set(0, 0, vec![0.0; 16], 4);
        assert_eq!(
            build_batches(&table, &coeffs).unwrap_err(),
            BatchError::MissingCoefficients { term: 0, dim: 1 }
        );
    }

    #[test]
    fn test_cell_out_of_range() {
        let table = ElementList::full_grid(1, 3);
        let coeffs = identity_coefficients(1, 1, 2, 2);
        assert!(matches!(
            build_batches(&table, &coeffs),
            Err(BatchError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_dimension_mismatch() {
        let table = ElementList::full_grid(2, 1);
        let coeffs = identity_coefficients(1, 3, 1, 1);
        assert!(matches!(
            build_batches(&table, &coeffs),
            Err(BatchError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_workspace_megabytes() {
        let layout = WorkspaceLayout {
            num_elems: 10,
            num_terms: 2,
            num_dims: 2,
            degree: 2,
            block: 4,
        };
        // one stage buffer of 400, reduction of 800, unit of 20
        assert_eq!(layout.total_elements(), 1220);
        assert!((layout.megabytes::<f64>() - 0.00976).abs() < 1e-12);
    }
}
