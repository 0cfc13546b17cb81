//! Strided operand views and the portable reference kernels.
//!
//! # Storage Convention
//!
//! All matrices are **column-major**: element `(i, j)` of a matrix with
//! leading dimension `ld` lives at `j * ld + i`. A transposed operand is
//! addressed at `i * ld + j` instead, so no data is ever moved to transpose.
//!
//! ```text
//!        ld
//!   ┌──────────┐
//!   │ a00  a01 │  rows
//!   │ a10  a11 │
//!   │  ·    ·  │  padding rows (ld > rows) are never read
//!   └──────────┘
//!   buffer: [a00, a10, ·, a01, a11, ·]
//! ```
//!
//! # Views
//!
//! | View | Describes | Invariant |
//! |------|-----------|-----------|
//! | [`MatRef`] / [`MatMut`] | `(rows, cols, ld, trans)` | `ld ≥ max(1, rows)` |
//! | [`VecRef`] / [`VecMut`] | `(len, inc)` | element `i` at `i * inc` |
//!
//! Views borrow a caller-supplied slice and never own memory. Every
//! constructor asserts that the addressed range fits the slice.
//!
//! # Reference Kernels
//!
//! [`reference`] holds the loops used for element types without a native
//! library. Its `gemm` is the triple loop
//!
//! ```text
//! for i in 0..m:
//!     for j in 0..n:
//!         C[j*ldc + i] += Σ_z op(A)(i, z) · op(B)(z, j)
//! ```
//!
//! and accumulates into `C` regardless of `alpha`/`beta`.

pub mod reference;
mod view;

pub use view::{matrix_extent, vector_extent, MatMut, MatRef, Transpose, VecMut, VecRef};
