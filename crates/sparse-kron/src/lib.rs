//! Type-generic BLAS/LAPACK dispatch and batched Kronecker operator
//! application for explicit sparse-grid time stepping.
//!
//! The crate has two layers:
//!
//! - **Kernels** ([`copy`], [`dot`], [`axpy`], [`scal`], [`gemv`], [`gemm`],
//!   [`getrf`], [`getri`]): one contract for every element type, resolved at
//!   compile time through the [`Kernel`] trait. `f32`/`f64` go to a native
//!   BLAS/LAPACK; other types run portable reference loops.
//! - **Operator application** ([`build_batches`], [`apply_operator`],
//!   [`ExplicitDriver`]): the operator `Σ_t C[t, D-1] ⊗ ... ⊗ C[t, 0]` over
//!   every pair of grid elements is expanded once into batches of same-shape
//!   matrix products, then evaluated each time step.
//!
//! # Quick Start
//!
//! ```
//! use sparse_kron::{
//!     apply_operator, build_batches, CoefficientMatrices, ElementList, OperatorWorkspace,
//! };
//!
//! // Two dimensions, two cells per dimension, degree 2, one term.
//! let table = ElementList::full_grid(2, 2);
//! let mut coeffs = CoefficientMatrices::new(1, 2, 2);
//! for dim in 0..2 {
//!     let mut identity = vec![0i64; 16];
//!     for k in 0..4 {
//!         identity[k * 4 + k] = 1;
//!     }
//!     coeffs.set(0, dim, identity, 4);
//! }
//!
//! let plan = build_batches(&table, &coeffs).unwrap();
//! let x: Vec<i64> = (0..16).collect();
//! let mut fx = vec![0i64; 16];
//! let mut workspace = OperatorWorkspace::new(plan.layout());
//!
//! apply_operator(&plan, &coeffs, &x, &mut workspace, &mut fx).unwrap();
//!
//! // The identity couples each element only with itself.
//! assert_eq!(fx, x);
//! ```
//!
//! # Features
//!
//! | Feature | Default | Effect |
//! |---------|---------|--------|
//! | `parallel` | yes | operand triples of one batch run on the rayon pool |
//! | `openblas` | no | `f32`/`f64` kernels call the system OpenBLAS instead of faer |

pub mod api;
pub mod batch;
pub mod core;
pub mod dispatch;
pub mod error;
pub mod native;
pub mod problem;
pub mod system;
pub mod time_advance;
pub mod types;

pub use api::{
    axpy, copy, dot, gemm, gemv, getrf, getri, getri_workspace_len, scal, Gemm, Gemv,
};
pub use batch::{
    apply_operator, build_batches, BatchOp, BatchOperandSet, BatchPlan, Buffer, OperandTriple,
    OperatorWorkspace, Stage, WorkspaceLayout,
};
pub use crate::core::{MatMut, MatRef, Transpose, VecMut, VecRef};
pub use dispatch::Kernel;
pub use error::{BatchError, LapackError, LapackInfo, Result};
pub use native::NativeBlas;
pub use problem::{
    AnalyticSolution, CoefficientMatrices, ElementList, ElementTable, OperatorCoefficients,
    Source,
};
pub use system::ExplicitSystem;
pub use time_advance::{
    DriverState, ExplicitDriver, ExplicitScheme, ForwardEuler, SspRk3, StepReport,
    TimeAdvanceConfig,
};
pub use types::Scalar;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::api::{Gemm, Gemv};
    pub use crate::batch::{apply_operator, build_batches, OperatorWorkspace};
    pub use crate::dispatch::Kernel;
    pub use crate::problem::{ElementTable, OperatorCoefficients};
    pub use crate::time_advance::{ExplicitDriver, ExplicitScheme, TimeAdvanceConfig};
    pub use crate::types::Scalar;
}
