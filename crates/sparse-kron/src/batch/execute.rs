use super::{BatchOp, BatchOperandSet, BatchPlan, Buffer, WorkspaceLayout};
use crate::dispatch::Kernel;
use crate::error::{BatchError, Result};
use crate::problem::OperatorCoefficients;
use tracing::trace;

/// Scratch buffers for applying a [`BatchPlan`], allocated once per run.
#[derive(Debug, Clone, PartialEq)]
pub struct OperatorWorkspace<P> {
    stages: Vec<Vec<P>>,
    reduction: Vec<P>,
    unit: Vec<P>,
}

impl<P: Kernel> OperatorWorkspace<P> {
    pub fn new(layout: &WorkspaceLayout) -> Self {
        Self {
            stages: vec![vec![P::zero(); layout.stage_len()]; layout.num_stage_buffers()],
            reduction: vec![P::zero(); layout.reduction_len()],
            unit: vec![P::one(); layout.unit_len()],
        }
    }

    /// Total elements held.
    pub fn len(&self) -> usize {
        self.stages.iter().map(Vec::len).sum::<usize>() + self.reduction.len() + self.unit.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn fits(&self, layout: &WorkspaceLayout) -> bool {
        self.stages.len() == layout.num_stage_buffers()
            && self.stages.iter().all(|s| s.len() == layout.stage_len())
            && self.reduction.len() == layout.reduction_len()
            && self.unit.len() == layout.unit_len()
    }

    fn take(&mut self, buffer: Buffer) -> Result<Vec<P>> {
        let slot = match buffer {
            Buffer::Workspace(k) => self.stages.get_mut(k),
            Buffer::Reduction => Some(&mut self.reduction),
            _ => None,
        };
        slot.map(std::mem::take).ok_or_else(|| {
            BatchError::ShapeMismatch(format!("{:?} is not a writable workspace buffer", buffer))
        })
    }

    fn restore(&mut self, buffer: Buffer, data: Vec<P>) {
        match buffer {
            Buffer::Workspace(k) => self.stages[k] = data,
            Buffer::Reduction => self.reduction = data,
            _ => {}
        }
    }

    fn source(&self, buffer: Buffer) -> Option<&[P]> {
        match buffer {
            Buffer::Workspace(k) => self.stages.get(k).map(Vec::as_slice),
            Buffer::Reduction => Some(&self.reduction),
            Buffer::Unit => Some(&self.unit),
            _ => None,
        }
    }
}

fn resolve<'a, P, C>(
    buffer: Buffer,
    x: &'a [P],
    coefficients: &'a C,
    workspace: &'a OperatorWorkspace<P>,
) -> Result<&'a [P]>
where
    P: Kernel,
    C: OperatorCoefficients<P> + ?Sized,
{
    match buffer {
        Buffer::State => Ok(x),
        Buffer::Coefficients { term, dim } => coefficients
            .coefficients(term, dim)
            .map(|m| m.as_slice())
            .ok_or(BatchError::MissingCoefficients { term, dim }),
        other => workspace.source(other).ok_or_else(|| {
            BatchError::ShapeMismatch(format!("{:?} cannot be read by a batch", other))
        }),
    }
}

fn run_set<P: Kernel>(set: &BatchOperandSet<P>, a: &[P], b: &[P], dest: &mut [P]) {
    match set.op() {
        BatchOp::Gemm(g) => g.execute_batched(a, b, dest, set.operands()),
        BatchOp::Gemv(g) => g.execute_batched(a, b, dest, set.operands()),
    }
}

/// Compute `fx := Operator(x)` by running every set of `plan` in order.
///
/// `fx` is overwritten. Sets run one after another; the triples of one set
/// run concurrently under the `parallel` feature.
///
/// # Errors
/// [`BatchError::ShapeMismatch`] if `x`, `fx` or `workspace` do not match the
/// plan's layout, [`BatchError::MissingCoefficients`] if a matrix the plan
/// refers to is no longer available.
pub fn apply_operator<P, C>(
    plan: &BatchPlan<P>,
    coefficients: &C,
    x: &[P],
    workspace: &mut OperatorWorkspace<P>,
    fx: &mut [P],
) -> Result<()>
where
    P: Kernel,
    C: OperatorCoefficients<P> + ?Sized,
{
    let layout = plan.layout();
    if x.len() != layout.dofs() || fx.len() != layout.dofs() {
        return Err(BatchError::ShapeMismatch(format!(
            "operator acts on {} unknowns, got x of {} and fx of {}",
            layout.dofs(),
            x.len(),
            fx.len()
        )));
    }
    if !workspace.fits(layout) {
        return Err(BatchError::ShapeMismatch(
            "workspace was allocated for a different plan".to_string(),
        ));
    }

    // Stage buffers are fully rewritten by each set; the reduction buffer
    // and fx collect disjoint slots over several sets.
    fx.fill(P::zero());
    workspace.reduction.fill(P::zero());

    for set in plan.sets() {
        let (a, b, c) = set.buffers();
        trace!(stage = ?set.stage(), operands = set.len(), "applying batch");

        if c == Buffer::Output {
            let a = resolve(a, x, coefficients, workspace)?;
            let b = resolve(b, x, coefficients, workspace)?;
            run_set(set, a, b, fx);
            continue;
        }

        let mut dest = workspace.take(c)?;
        let outcome = resolve(a, x, coefficients, workspace).and_then(|a| {
            let b = resolve(b, x, coefficients, workspace)?;
            Ok((a, b))
        });
        match outcome {
            Ok((a, b)) => {
                if matches!(c, Buffer::Workspace(_)) {
                    dest.fill(P::zero());
                }
                run_set(set, a, b, &mut dest);
                workspace.restore(c, dest);
            }
            Err(e) => {
                workspace.restore(c, dest);
                return Err(e);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::build_batches;
    use crate::problem::{element_block, CoefficientMatrices, ElementList, ElementTable};

    fn coefficients(
        terms: usize,
        dims: usize,
        degree: usize,
        cells: usize,
    ) -> CoefficientMatrices<i64> {
        let size = degree * cells;
        let mut coeffs = CoefficientMatrices::new(terms, dims, degree);
        for t in 0..terms {
            for d in 0..dims {
                let data = (0..size * size)
                    .map(|k| ((k * 7 + t * 3 + d * 5) % 11) as i64 - 5)
                    .collect();
                coeffs.set(t, d, data, size);
            }
        }
        coeffs
    }

    /// Assemble every Kronecker block explicitly and multiply.
    fn dense_apply(
        table: &ElementList,
        coeffs: &CoefficientMatrices<i64>,
        x: &[i64],
    ) -> Vec<i64> {
        let degree = coeffs.degree();
        let dims = table.num_dims();
        let block = element_block(degree, dims);
        let mut y = vec![0i64; x.len()];
        for i in 0..table.len() {
            for j in 0..table.len() {
                for t in 0..coeffs.num_terms() {
                    for la in 0..block {
                        for lb in 0..block {
                            let mut v = 1i64;
                            for d in 0..dims {
                                let stride = degree.pow(d as u32);
                                let row = table.cell(i, d) * degree + (la / stride) % degree;
                                let col = table.cell(j, d) * degree + (lb / stride) % degree;
                                let m = coeffs.coefficients(t, d).unwrap();
                                v *= m.as_slice()[col * m.ld() + row];
                            }
                            y[i * block + la] += v * x[j * block + lb];
                        }
                    }
                }
            }
        }
        y
    }

    fn check_against_dense(table: ElementList, terms: usize, degree: usize, cells: usize) {
        let coeffs = coefficients(terms, table.num_dims(), degree, cells);
        let plan = build_batches(&table, &coeffs).unwrap();
        let dofs = plan.layout().dofs();
        let x: Vec<i64> = (0..dofs as i64).map(|v| v % 5 - 2).collect();
        let mut workspace = OperatorWorkspace::new(plan.layout());
        let mut fx = vec![0i64; dofs];

        apply_operator(&plan, &coeffs, &x, &mut workspace, &mut fx).unwrap();
        let expected = dense_apply(&table, &coeffs, &x);
        assert_eq!(fx, expected);

        // workspaces are reused without leaking the previous application
        apply_operator(&plan, &coeffs, &x, &mut workspace, &mut fx).unwrap();
        assert_eq!(fx, expected);
    }

    #[test]
    fn test_one_dimension_matches_dense() {
        check_against_dense(ElementList::full_grid(1, 4), 2, 3, 4);
    }

    #[test]
    fn test_two_dimensions_matches_dense() {
        check_against_dense(ElementList::full_grid(2, 2), 2, 2, 2);
    }

    #[test]
    fn test_three_dimensions_sparse_table_matches_dense() {
        let mut table = ElementList::new(3);
        table.push(&[0, 0, 0]);
        table.push(&[1, 0, 0]);
        table.push(&[0, 2, 1]);
        table.push(&[2, 1, 2]);
        check_against_dense(table, 3, 2, 3);
    }

    #[test]
    fn test_native_path_matches_dense() {
        let table = ElementList::full_grid(2, 2);
        let exact = coefficients(2, 2, 2, 2);
        let mut coeffs = CoefficientMatrices::<f64>::new(2, 2, 2);
        for t in 0..2 {
            for d in 0..2 {
                let m = exact.coefficients(t, d).unwrap();
                coeffs.set(t, d, m.as_slice().iter().map(|&v| v as f64).collect(), 4);
            }
        }
        let plan = build_batches(&table, &coeffs).unwrap();
        let dofs = plan.layout().dofs();
        let xi: Vec<i64> = (0..dofs as i64).map(|v| v % 5 - 2).collect();
        let x: Vec<f64> = xi.iter().map(|&v| v as f64).collect();
        let mut workspace = OperatorWorkspace::new(plan.layout());
        let mut fx = vec![f64::NAN; dofs];

        apply_operator(&plan, &coeffs, &x, &mut workspace, &mut fx).unwrap();

        let expected = dense_apply(&table, &exact, &xi);
        for (got, want) in fx.iter().zip(&expected) {
            assert!((got - *want as f64).abs() < 1e-9, "{} != {}", got, want);
        }
    }

    #[test]
    fn test_length_mismatch() {
        let table = ElementList::full_grid(1, 2);
        let coeffs = coefficients(1, 1, 2, 2);
        let plan = build_batches(&table, &coeffs).unwrap();
        let mut workspace = OperatorWorkspace::new(plan.layout());
        let mut fx = vec![0i64; 4];
        assert!(matches!(
            apply_operator(&plan, &coeffs, &[0i64; 3], &mut workspace, &mut fx),
            Err(BatchError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_foreign_workspace() {
        let table = ElementList::full_grid(2, 2);
        let coeffs = coefficients(1, 2, 2, 2);
        let plan = build_batches(&table, &coeffs).unwrap();
        let other = build_batches(&ElementList::full_grid(2, 1), &coeffs).unwrap();
        let mut workspace = OperatorWorkspace::new(other.layout());
        let dofs = plan.layout().dofs();
        let mut fx = vec![0i64; dofs];
        assert!(matches!(
            apply_operator(&plan, &coeffs, &vec![0i64; dofs], &mut workspace, &mut fx),
            Err(BatchError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_no_terms_gives_zero() {
        let table = ElementList::full_grid(2, 2);
        let coeffs = CoefficientMatrices::<i64>::new(0, 2, 2);
        let plan = build_batches(&table, &coeffs).unwrap();
        assert!(plan.sets().is_empty());
        let mut workspace = OperatorWorkspace::new(plan.layout());
        let mut fx = vec![7i64; 16];
        apply_operator(&plan, &coeffs, &[1i64; 16], &mut workspace, &mut fx).unwrap();
        assert_eq!(fx, vec![0; 16]);
    }
}
