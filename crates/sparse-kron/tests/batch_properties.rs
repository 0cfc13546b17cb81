//! Batch construction and application over randomly generated element tables.

use proptest::prelude::*;
use sparse_kron::problem::element_block;
use sparse_kron::{
    apply_operator, build_batches, BatchOp, Buffer, CoefficientMatrices, ElementList,
    ElementTable, OperatorCoefficients, OperatorWorkspace, Stage, WorkspaceLayout,
};

#[derive(Debug, Clone)]
struct Problem {
    dims: usize,
    degree: usize,
    cells: usize,
    terms: usize,
    elements: Vec<Vec<usize>>,
}

impl Problem {
    fn table(&self) -> ElementList {
        let mut table = ElementList::new(self.dims);
        for coords in &self.elements {
            table.push(coords);
        }
        table
    }

    fn coefficients(&self) -> CoefficientMatrices<i64> {
        let size = self.degree * self.cells;
        let mut coeffs = CoefficientMatrices::new(self.terms, self.dims, self.degree);
        for t in 0..self.terms {
            for d in 0..self.dims {
                let data = (0..size * size)
                    .map(|k| ((k * 5 + t * 7 + d * 3) % 13) as i64 - 6)
                    .collect();
                coeffs.set(t, d, data, size);
            }
        }
        coeffs
    }
}

fn problem() -> impl Strategy<Value = Problem> {
    (1usize..=3, 1usize..=3, 1usize..=3, 1usize..=2).prop_flat_map(
        |(dims, degree, cells, terms)| {
            let coords = prop::collection::vec(0..cells, dims);
            prop::collection::vec(coords, 0..6).prop_map(move |elements| Problem {
                dims,
                degree,
                cells,
                terms,
                elements,
            })
        },
    )
}

fn buffer_len(buffer: Buffer, layout: &WorkspaceLayout) -> usize {
    match buffer {
        Buffer::Workspace(_) => layout.stage_len(),
        Buffer::Reduction => layout.reduction_len(),
        Buffer::Output => layout.dofs(),
        other => panic!("{:?} is never a destination", other),
    }
}

fn dense_apply(table: &ElementList, coeffs: &CoefficientMatrices<i64>, x: &[i64]) -> Vec<i64> {
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

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn destinations_never_overlap(p in problem()) {
        let table = p.table();
        let coeffs = p.coefficients();
        let plan = build_batches(&table, &coeffs).unwrap();
        let layout = *plan.layout();

        for set in plan.sets() {
            prop_assert!(set.check_destinations().is_ok());

            let (_, _, dest) = set.buffers();
            let extent = set.destination_extent();
            let mut ranges: Vec<(usize, usize)> = set
                .operands()
                .iter()
                .map(|t| (t.c, t.c + extent))
                .collect();
            ranges.sort_unstable();
            for pair in ranges.windows(2) {
                prop_assert!(pair[0].1 <= pair[1].0, "{:?} overlaps {:?}", pair[0], pair[1]);
            }
            if let Some(&(_, end)) = ranges.last() {
                prop_assert!(end <= buffer_len(dest, &layout));
            }
        }
    }

    #[test]
    fn sets_follow_the_kronecker_chain(p in problem()) {
        let plan = build_batches(&p.table(), &p.coefficients()).unwrap();
        let n = p.elements.len();
        let block = element_block(p.degree, p.dims);

        let expected_sets = if n == 0 { p.terms * p.dims } else { p.terms * p.dims + 1 };
        prop_assert_eq!(plan.sets().len(), expected_sets);

        for set in plan.sets() {
            match (set.stage(), set.op()) {
                (Stage::Kron { dim, .. }, BatchOp::Gemm(g)) => {
                    let s = element_block(p.degree, dim);
                    let expected = if dim == 0 {
                        (p.degree, block / p.degree, p.degree)
                    } else {
                        (s, p.degree, p.degree)
                    };
                    prop_assert_eq!(g.dims(), expected);
                    let slabs = if dim == 0 { 1 } else { block / (s * p.degree) };
                    prop_assert_eq!(set.len(), n * n * slabs);
                }
                (Stage::Reduce, BatchOp::Gemv(_)) => prop_assert_eq!(set.len(), n),
                (stage, _) => prop_assert!(false, "unexpected operation for {:?}", stage),
            }
        }
    }

    #[test]
    fn batched_operator_matches_dense(p in problem()) {
        let table = p.table();
        let coeffs = p.coefficients();
        let plan = build_batches(&table, &coeffs).unwrap();
        let dofs = plan.layout().dofs();
        let x: Vec<i64> = (0..dofs as i64).map(|v| (v * 3) % 7 - 3).collect();
        let mut fx = vec![0i64; dofs];
        let mut workspace = OperatorWorkspace::new(plan.layout());

        apply_operator(&plan, &coeffs, &x, &mut workspace, &mut fx).unwrap();

        prop_assert_eq!(fx, dense_apply(&table, &coeffs, &x));
    }
}
