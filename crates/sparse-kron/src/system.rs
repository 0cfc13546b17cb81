//! State carried across explicit time steps.

use crate::dispatch::Kernel;

/// Solution vector `x` and operator image `fx`, fixed in length once built.
#[derive(Debug, Clone, PartialEq)]
pub struct ExplicitSystem<P> {
    pub(crate) x: Vec<P>,
    pub(crate) fx: Vec<P>,
}

impl<P: Kernel> ExplicitSystem<P> {
    /// A zero system of `dofs` unknowns.
    pub fn zeros(dofs: usize) -> Self {
        Self {
            x: vec![P::zero(); dofs],
            fx: vec![P::zero(); dofs],
        }
    }

    /// Start from an initial condition; `fx` starts at zero.
    pub fn from_initial(x: Vec<P>) -> Self {
        let fx = vec![P::zero(); x.len()];
        Self { x, fx }
    }

    pub fn dofs(&self) -> usize {
        self.x.len()
    }

    pub fn x(&self) -> &[P] {
        &self.x
    }

    pub fn fx(&self) -> &[P] {
        &self.fx
    }

    /// Split borrow of `(x, fx)` for the stepping schemes.
    pub(crate) fn split_mut(&mut self) -> (&mut [P], &mut [P]) {
        (&mut self.x, &mut self.fx)
    }
}
