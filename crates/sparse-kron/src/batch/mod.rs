//! Batch operand sets for one application of a Kronecker-structured operator.
//!
//! For every pair of elements `(i, j)` and every term `t` the operator block is
//! `C[t, D-1] ⊗ ... ⊗ C[t, 0]`, restricted to the cells of `i` and `j`. Applying
//! it to the `degree^D` coefficients of element `j` is a chain of `D` small
//! matrix products, one per dimension, and all of these products that share a
//! `(term, dimension)` also share a shape. [`build_batches`] groups them into
//! one [`BatchOperandSet`] per `(term, dimension)`:
//!
//! ```text
//! stage 0       C[t,0] · X_j                     -> workspace 0
//! stage d > 0   W · C[t,d]ᵗ  per degree^(D-1-d)  -> workspace d % 2
//! last stage    ...                              -> reduction slot (i, j, t)
//! reduction     R_i · 1                          -> fx_i
//! ```
//!
//! A final gemv set sums every `(j, t)` slot of row element `i` into `fx`.
//!
//! Operand triples hold offsets, not borrows: a set names the buffers it reads
//! and writes with [`Buffer`], and [`apply_operator`] resolves them against an
//! [`OperatorWorkspace`] when the set runs. Within a set, destinations are
//! sorted and disjoint, so the triples can run in any order or concurrently.
//! Across sets, order matters: stage `d + 1` reads what stage `d` wrote.

mod build;
mod execute;

pub use build::{build_batches, BatchPlan, WorkspaceLayout};
pub use execute::{apply_operator, OperatorWorkspace};

use crate::api::{Gemm, Gemv};
use crate::error::{BatchError, Result};

/// Backing buffer an operand offset refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Buffer {
    /// The state vector the operator is applied to.
    State,
    /// The coefficient matrix of one `(term, dimension)` pair.
    Coefficients { term: usize, dim: usize },
    /// One of the two ping-pong buffers holding partial Kronecker chains.
    Workspace(usize),
    /// Per-(element pair, term) chain results awaiting reduction.
    Reduction,
    /// Vector of ones used by the reduction.
    Unit,
    /// The operator image `fx`.
    Output,
}

/// Element offsets of one product's operands within their buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct OperandTriple {
    pub a: usize,
    pub b: usize,
    pub c: usize,
}

/// Elementary operation shared by every triple of a set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BatchOp<P> {
    Gemm(Gemm<P>),
    Gemv(Gemv<P>),
}

/// Position of a set in the operator chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Dimension `dim` of term `term`'s Kronecker chain.
    Kron { term: usize, dim: usize },
    /// Sum of chain results into the operator image.
    Reduce,
}

/// Same-shape operand triples dispatched together.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOperandSet<P> {
    stage: Stage,
    op: BatchOp<P>,
    buffers: [Buffer; 3],
    operands: Vec<OperandTriple>,
}

impl<P: crate::dispatch::Kernel> BatchOperandSet<P> {
    /// # Panics
    /// If the destination buffer is also a source.
    pub fn new(stage: Stage, op: BatchOp<P>, a: Buffer, b: Buffer, c: Buffer) -> Self {
        assert!(
            a != c && b != c,
            "batch destination {:?} is also one of its sources",
            c
        );
        Self {
            stage,
            op,
            buffers: [a, b, c],
            operands: Vec::new(),
        }
    }

    pub fn push(&mut self, triple: OperandTriple) {
        self.operands.push(triple);
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn op(&self) -> &BatchOp<P> {
        &self.op
    }

    /// `(A, B, C)` buffers.
    pub fn buffers(&self) -> (Buffer, Buffer, Buffer) {
        let [a, b, c] = self.buffers;
        (a, b, c)
    }

    pub fn operands(&self) -> &[OperandTriple] {
        &self.operands
    }

    pub fn len(&self) -> usize {
        self.operands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operands.is_empty()
    }

    /// Elements of the destination buffer written by one triple.
    pub fn destination_extent(&self) -> usize {
        match &self.op {
            BatchOp::Gemm(g) => g.c_extent(),
            BatchOp::Gemv(g) => g.y_extent(),
        }
    }

    /// Check that destinations are sorted and pairwise disjoint.
    pub fn check_destinations(&self) -> Result<()> {
        let extent = self.destination_extent();
        for (second, pair) in self.operands.windows(2).enumerate() {
            if pair[1].c < pair[0].c + extent {
                return Err(BatchError::OverlappingDestinations {
                    first: second,
                    second: second + 1,
                });
            }
        }
        Ok(())
    }
}

/// Split `buf` into one `extent`-long destination per offset.
///
/// # Panics
/// If the offsets are not sorted with gaps of at least `extent`, or run past
/// the end of `buf`.
pub(crate) fn split_destinations<P>(
    mut buf: &mut [P],
    offsets: impl IntoIterator<Item = usize>,
    extent: usize,
) -> Vec<&mut [P]> {
    let mut out = Vec::new();
    let mut pos = 0;
    for (i, offset) in offsets.into_iter().enumerate() {
        assert!(
            offset >= pos,
            "operand {} destination overlaps its predecessor",
            i
        );
        let rest = std::mem::take(&mut buf);
        let (_, tail) = rest.split_at_mut(offset - pos);
        let (head, tail) = tail.split_at_mut(extent);
        out.push(head);
        buf = tail;
        pos = offset + extent;
    }
    out
}
