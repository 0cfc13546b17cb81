//! Explicit time advance.
//!
//! Each step evaluates `fx = Operator(x) + Σ f_s(t)·source_s` through the batch
//! plan and updates `x` with an [`ExplicitScheme`]:
//!
//! - [`ForwardEuler`]: `x := x + dt·fx`, for every element type.
//! - [`SspRk3`]: three-stage strong-stability-preserving Runge-Kutta (Shu-Osher
//!   form) with stage times `t`, `t + dt`, `t + dt/2`, for floating types.
//!
//! The step size is `dt·cfl` and step `i` starts at `time = i·dt`. When an
//! analytic solution is known, the norm of `fx - analytic·multiplier(time)` is
//! reported after each step. The norm is a diagnostic only: a non-finite value
//! is logged and the loop carries on.
//!
//! # Example
//!
//! ```
//! use sparse_kron::{
//!     build_batches, CoefficientMatrices, ElementList, ExplicitDriver, ExplicitSystem,
//!     TimeAdvanceConfig,
//! };
//!
//! // dx/dt = -x on a single element of degree 1
//! let table = ElementList::full_grid(1, 1);
//! let mut coeffs = CoefficientMatrices::new(1, 1, 1);
//! coeffs.set(0, 0, vec![-1.0f64], 1);
//! let plan = build_batches(&table, &coeffs).unwrap();
//!
//! let config = TimeAdvanceConfig::new(0.1).steps(2);
//! let system = ExplicitSystem::from_initial(vec![1.0]);
//! let mut driver = ExplicitDriver::new(config, plan, coeffs, system).unwrap();
//! let reports = driver.run().unwrap();
//!
//! assert_eq!(reports.len(), 2);
//! assert!((driver.system().x()[0] - 0.81).abs() < 1e-12);
//! ```

use crate::api::{axpy, copy, scal};
use crate::batch::{apply_operator, BatchPlan, OperatorWorkspace};
use crate::dispatch::Kernel;
use crate::error::{BatchError, Result};
use crate::problem::{AnalyticSolution, OperatorCoefficients, Source};
use crate::system::ExplicitSystem;
use num_traits::{Float, FromPrimitive};
use tracing::{debug, info, warn};

/// Update rule `x(t) → x(t + dt)` given a right-hand side evaluator.
///
/// `rhs(x, t, fx)` overwrites `fx` with the right-hand side at `(x, t)`.
pub trait ExplicitScheme<P: Kernel> {
    const NAME: &'static str;

    /// State-sized scratch vectors [`advance`](Self::advance) expects.
    const SCRATCH_VECTORS: usize;

    fn advance<F>(
        &self,
        x: &mut [P],
        fx: &mut [P],
        scratch: &mut [Vec<P>],
        time: P,
        dt: P,
        rhs: F,
    ) -> Result<()>
    where
        F: FnMut(&[P], P, &mut [P]) -> Result<()>;
}

/// `x := x + dt·f(x, t)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForwardEuler;

impl<P: Kernel> ExplicitScheme<P> for ForwardEuler {
    const NAME: &'static str = "forward-euler";
    const SCRATCH_VECTORS: usize = 0;

    fn advance<F>(
        &self,
        x: &mut [P],
        fx: &mut [P],
        _scratch: &mut [Vec<P>],
        time: P,
        dt: P,
        mut rhs: F,
    ) -> Result<()>
    where
        F: FnMut(&[P], P, &mut [P]) -> Result<()>,
    {
        rhs(x, time, fx)?;
        axpy(x.len(), dt, fx, 1, x, 1);
        Ok(())
    }
}

/// Third-order SSP Runge-Kutta in Shu-Osher form:
///
/// ```text
/// u1    = u + dt·L(u, t)
/// u2    = 3/4·u + 1/4·(u1 + dt·L(u1, t + dt))
/// u_new = 1/3·u + 2/3·(u2 + dt·L(u2, t + dt/2))
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SspRk3;

impl<P: Kernel + Float> ExplicitScheme<P> for SspRk3 {
    const NAME: &'static str = "ssp-rk3";
    const SCRATCH_VECTORS: usize = 1;

    fn advance<F>(
        &self,
        x: &mut [P],
        fx: &mut [P],
        scratch: &mut [Vec<P>],
        time: P,
        dt: P,
        mut rhs: F,
    ) -> Result<()>
    where
        F: FnMut(&[P], P, &mut [P]) -> Result<()>,
    {
        let n = x.len();
        let x_orig = scratch.first_mut().ok_or_else(|| {
            BatchError::ShapeMismatch("ssp-rk3 needs one scratch vector".to_string())
        })?;
        if x_orig.len() != n {
            return Err(BatchError::ShapeMismatch(format!(
                "scratch vector holds {} values, state holds {}",
                x_orig.len(),
                n
            )));
        }

        let one = P::one();
        let two = one + one;
        let three = two + one;
        let four = two + two;

        copy(n, x, 1, x_orig, 1);

        rhs(x, time, fx)?;
        axpy(n, dt, fx, 1, x, 1);

        rhs(x, time + dt, fx)?;
        axpy(n, dt, fx, 1, x, 1);
        scal(n, one / four, x, 1);
        axpy(n, three / four, x_orig, 1, x, 1);

        rhs(x, time + dt / two, fx)?;
        axpy(n, dt, fx, 1, x, 1);
        scal(n, two / three, x, 1);
        axpy(n, one / three, x_orig, 1, x, 1);
        Ok(())
    }
}

/// Step count, step size and scheme of an explicit run.
///
/// # Example
///
/// ```
/// use sparse_kron::{SspRk3, TimeAdvanceConfig};
///
/// let config = TimeAdvanceConfig::new(0.5).cfl(0.2).steps(10).scheme(SspRk3);
/// assert_eq!(config.num_steps(), 10);
/// assert!((config.effective_dt() - 0.1f64).abs() < 1e-15);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeAdvanceConfig<P, S = ForwardEuler> {
    steps: usize,
    dt: P,
    cfl: P,
    scheme: S,
}

impl<P: Kernel> TimeAdvanceConfig<P, ForwardEuler> {
    /// Zero steps of forward Euler with CFL number 1.
    pub fn new(dt: P) -> Self {
        Self {
            steps: 0,
            dt,
            cfl: P::one(),
            scheme: ForwardEuler,
        }
    }
}

impl<P: Kernel, S> TimeAdvanceConfig<P, S> {
    pub fn steps(mut self, steps: usize) -> Self {
        self.steps = steps;
        self
    }

    pub fn cfl(mut self, cfl: P) -> Self {
        self.cfl = cfl;
        self
    }

    pub fn scheme<S2>(self, scheme: S2) -> TimeAdvanceConfig<P, S2> {
        TimeAdvanceConfig {
            steps: self.steps,
            dt: self.dt,
            cfl: self.cfl,
            scheme,
        }
    }

    pub fn num_steps(&self) -> usize {
        self.steps
    }

    /// `dt · cfl`.
    pub fn effective_dt(&self) -> P {
        self.dt * self.cfl
    }
}

/// Lifecycle of an [`ExplicitDriver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// No step taken yet.
    Idle,
    /// Some steps taken, or a step failed part way and will be retried.
    StepInProgress,
    /// Every configured step has completed.
    Done,
}

/// Outcome of one completed step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport<P> {
    pub step: usize,
    /// Time at the start of the step.
    pub time: P,
    /// Norm of `fx - analytic·multiplier(time)`, if an analytic solution is set.
    pub error: Option<f64>,
}

/// Runs the explicit time loop over a prebuilt [`BatchPlan`].
pub struct ExplicitDriver<P, C, S = ForwardEuler> {
    config: TimeAdvanceConfig<P, S>,
    plan: BatchPlan<P>,
    coefficients: C,
    sources: Vec<Source<P>>,
    analytic: Option<AnalyticSolution<P>>,
    system: ExplicitSystem<P>,
    workspace: OperatorWorkspace<P>,
    scaled_source: Vec<P>,
    scratch: Vec<Vec<P>>,
    state: DriverState,
    completed: usize,
}

impl<P, C, S> ExplicitDriver<P, C, S>
where
    P: Kernel + FromPrimitive,
    C: OperatorCoefficients<P>,
    S: ExplicitScheme<P>,
{
    /// Allocate the time loop workspace around `system`.
    ///
    /// # Errors
    /// [`BatchError::ShapeMismatch`] if `system` does not have the plan's
    /// degrees of freedom.
    pub fn new(
        config: TimeAdvanceConfig<P, S>,
        plan: BatchPlan<P>,
        coefficients: C,
        system: ExplicitSystem<P>,
    ) -> Result<Self> {
        let dofs = plan.layout().dofs();
        if system.dofs() != dofs {
            return Err(BatchError::ShapeMismatch(format!(
                "system holds {} unknowns, operator acts on {}",
                system.dofs(),
                dofs
            )));
        }

        let workspace = OperatorWorkspace::new(plan.layout());
        let scratch = vec![vec![P::zero(); dofs]; S::SCRATCH_VECTORS];
        let loop_mb =
            ((1 + S::SCRATCH_VECTORS) * dofs * std::mem::size_of::<P>()) as f64 * 1e-6;
        info!(
            scheme = S::NAME,
            steps = config.steps,
            dofs,
            loop_mb,
            operator_mb = plan.layout().megabytes::<P>(),
            "allocated time loop workspace"
        );

        Ok(Self {
            config,
            plan,
            coefficients,
            sources: Vec::new(),
            analytic: None,
            system,
            workspace,
            scaled_source: vec![P::zero(); dofs],
            scratch,
            state: DriverState::Idle,
            completed: 0,
        })
    }

    /// Add a time-scaled source term.
    pub fn with_source(mut self, source: Source<P>) -> Result<Self> {
        self.check_len("source", source.vector().len())?;
        self.sources.push(source);
        Ok(self)
    }

    /// Report the error against `analytic` after every step.
    pub fn with_analytic(mut self, analytic: AnalyticSolution<P>) -> Result<Self> {
        self.check_len("analytic solution", analytic.vector().len())?;
        self.analytic = Some(analytic);
        Ok(self)
    }

    fn check_len(&self, what: &str, len: usize) -> Result<()> {
        if len == self.system.dofs() {
            Ok(())
        } else {
            Err(BatchError::ShapeMismatch(format!(
                "{} holds {} values, system holds {}",
                what,
                len,
                self.system.dofs()
            )))
        }
    }

    fn time_at(&self, step: usize) -> P {
        let dt = self.config.effective_dt();
        match P::from_usize(step) {
            Some(i) => i * dt,
            // not representable: count up instead
            None => (0..step).fold(P::zero(), |t, _| t + dt),
        }
    }

    /// Take one step. Returns `None` once every configured step is done.
    ///
    /// # Errors
    /// Propagates [`apply_operator`] failures; the step is not counted and
    /// the driver stays in [`DriverState::StepInProgress`].
    pub fn step(&mut self) -> Result<Option<StepReport<P>>> {
        if self.state == DriverState::Done {
            return Ok(None);
        }
        if self.completed >= self.config.steps {
            self.state = DriverState::Done;
            info!(steps = self.completed, "time loop complete");
            return Ok(None);
        }

        self.state = DriverState::StepInProgress;
        let step = self.completed;
        let time = self.time_at(step);
        let dt = self.config.effective_dt();

        let Self {
            config,
            plan,
            coefficients,
            sources,
            system,
            workspace,
            scaled_source,
            scratch,
            ..
        } = self;
        let (x, fx) = system.split_mut();
        config.scheme.advance(x, fx, scratch, time, dt, |x, t, fx| {
            apply_operator(plan, &*coefficients, x, workspace, fx)?;
            scaled_source.fill(P::zero());
            for source in sources.iter() {
                source.accumulate_into(t, scaled_source);
            }
            axpy(fx.len(), P::one(), scaled_source, 1, fx, 1);
            Ok(())
        })?;

        let error = self
            .analytic
            .as_ref()
            .map(|exact| exact.error_norm(self.system.fx(), time));
        match error {
            Some(e) => {
                info!(step, ?time, error = e, "timestep complete");
                if !e.is_finite() {
                    warn!(step, error = e, "diagnostic norm is not finite");
                }
            }
            None => info!(step, ?time, "timestep complete"),
        }

        self.completed += 1;
        if self.completed == self.config.steps {
            self.state = DriverState::Done;
            debug!(steps = self.completed, "time loop complete");
        }
        Ok(Some(StepReport { step, time, error }))
    }

    /// Run the remaining steps.
    pub fn run(&mut self) -> Result<Vec<StepReport<P>>> {
        let mut reports = Vec::with_capacity(self.config.steps.saturating_sub(self.completed));
        while let Some(report) = self.step()? {
            reports.push(report);
        }
        Ok(reports)
    }
}

impl<P, C, S> ExplicitDriver<P, C, S> {
    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn completed_steps(&self) -> usize {
        self.completed
    }

    pub fn config(&self) -> &TimeAdvanceConfig<P, S> {
        &self.config
    }

    pub fn plan(&self) -> &BatchPlan<P> {
        &self.plan
    }

    pub fn system(&self) -> &ExplicitSystem<P> {
        &self.system
    }

    pub fn into_system(self) -> ExplicitSystem<P> {
        self.system
    }
}

impl<P: std::fmt::Debug, C, S: std::fmt::Debug> std::fmt::Debug for ExplicitDriver<P, C, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExplicitDriver")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("completed", &self.completed)
            .field("sources", &self.sources.len())
            .finish_non_exhaustive()
    }
}
