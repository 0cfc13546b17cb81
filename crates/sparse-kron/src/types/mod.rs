//! Numeric element types accepted by the kernels.
//!
//! Every operation in this crate is generic over an element type `P`. Element
//! types fall into two disjoint classes, decided at compile time by the
//! [`Kernel`](crate::dispatch::Kernel) implementation of the type:
//!
//! | Class | Types | `gemm`/`gemv` | `getrf`/`getri` |
//! |-------|-------|---------------|-----------------|
//! | Accelerated | `f32`, `f64` | `C := α·op(A)·op(B) + β·C` (native BLAS) | native LAPACK |
//! | Generic | `i32`, `i64`, `u32`, `u64`, user types | `C += op(A)·op(B)` (reference loops) | fatal |
//!
//! The generic class exists so that the operator application can be run in
//! exact arithmetic and compared bit-for-bit across runs.
//!
//! # Core Traits
//!
//! - [`Scalar`]: the arithmetic every element type provides (`+`, `*`, zero, one)
//!
//! # Example
//!
//! ```rust
//! use sparse_kron::types::Scalar;
//!
//! fn sum_of_products<P: Scalar>(x: &[P], y: &[P]) -> P {
//!     x.iter().zip(y).fold(P::zero(), |acc, (&a, &b)| acc + a * b)
//! }
//!
//! assert_eq!(sum_of_products(&[1i64, 2, 3], &[4, 5, 6]), 32);
//! ```

mod scalar;

pub use scalar::Scalar;
