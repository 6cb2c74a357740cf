//! Thin layer over the LP backend.
//!
//! Formulation builders hand a finished clarabel problem to [`run`] and get
//! back a [`SolvedModel`]: the solver status plus accessors for primal
//! values and equality-constraint duals. Every accessor checks that the
//! status is `Optimal` first, so results can never be read from a failed or
//! partial solve.

use crate::error::MarketError;
use crate::types::MarketDesign;
use good_lp::constraint::ConstraintReference;
use good_lp::solvers::clarabel::{ClarabelProblem, ClarabelSolution};
use good_lp::{DualValues, ResolutionError, Solution, SolutionWithDual, SolverModel, Variable};
use std::time::Instant;
use tracing::debug;

/// Terminal state of one solver invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    /// Optimal solution found.
    Optimal,
    /// The problem is infeasible.
    Infeasible,
    /// The problem is unbounded.
    Unbounded,
    /// The solver stopped on a time limit.
    TimedOut,
    /// Any other solver failure.
    Error,
}

impl SolveStatus {
    pub fn is_optimal(&self) -> bool {
        matches!(self, SolveStatus::Optimal)
    }
}

impl std::fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SolveStatus::Optimal => "optimal",
            SolveStatus::Infeasible => "infeasible",
            SolveStatus::Unbounded => "unbounded",
            SolveStatus::TimedOut => "timed_out",
            SolveStatus::Error => "error",
        };
        f.write_str(name)
    }
}

/// A solved formulation with status-gated access to its values.
pub(crate) struct SolvedModel {
    status: SolveStatus,
    solution: Option<ClarabelSolution>,
    message: Option<String>,
}

impl SolvedModel {
    pub fn status(&self) -> SolveStatus {
        self.status
    }

    /// Map a non-optimal status to the matching error. `detail` describes
    /// the formulation for infeasibility diagnosis.
    pub fn ensure_optimal(&self, design: MarketDesign, detail: &str) -> Result<(), MarketError> {
        match self.status {
            SolveStatus::Optimal => Ok(()),
            SolveStatus::Infeasible => Err(MarketError::Infeasible {
                design,
                detail: detail.to_string(),
            }),
            SolveStatus::Unbounded => Err(MarketError::Unbounded { design }),
            SolveStatus::TimedOut => Err(MarketError::SolverTimeout),
            SolveStatus::Error => Err(MarketError::Solver(
                self.message
                    .clone()
                    .unwrap_or_else(|| "unspecified solver failure".to_string()),
            )),
        }
    }

    fn solution(&self) -> Result<&ClarabelSolution, MarketError> {
        match (&self.status, &self.solution) {
            (SolveStatus::Optimal, Some(solution)) => Ok(solution),
            _ => Err(MarketError::ResultNotAvailable),
        }
    }

    pub fn value(&self, var: Variable) -> Result<f64, MarketError> {
        Ok(self.solution()?.value(var))
    }

    pub fn values(&self, vars: &[Variable]) -> Result<Vec<f64>, MarketError> {
        let solution = self.solution()?;
        Ok(vars.iter().map(|v| solution.value(*v)).collect())
    }

    /// Duals of equality constraints, in the conventional shadow-price sign
    /// for a minimization (marginal objective increase per unit of
    /// right-hand side).
    pub fn shadow_prices(
        &mut self,
        refs: &[ConstraintReference],
    ) -> Result<Vec<f64>, MarketError> {
        if !self.status.is_optimal() {
            return Err(MarketError::ResultNotAvailable);
        }
        let solution = match self.solution.as_mut() {
            Some(solution) => solution,
            None => return Err(MarketError::ResultNotAvailable),
        };
        let duals = solution.compute_dual();
        Ok(refs.iter().map(|r| duals.dual(r.clone())).collect())
    }
}

/// Solve a finished problem and classify the outcome.
pub(crate) fn run(problem: ClarabelProblem, design: MarketDesign) -> SolvedModel {
    let start = Instant::now();
    let solved = match problem.solve() {
        Ok(solution) => SolvedModel {
            status: SolveStatus::Optimal,
            solution: Some(solution),
            message: None,
        },
        Err(ResolutionError::Infeasible) => SolvedModel {
            status: SolveStatus::Infeasible,
            solution: None,
            message: None,
        },
        Err(ResolutionError::Unbounded) => SolvedModel {
            status: SolveStatus::Unbounded,
            solution: None,
            message: None,
        },
        Err(other) => classify_failure(other.to_string()),
    };
    debug!(
        design = %design,
        status = %solved.status,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "market solve finished"
    );
    solved
}

/// Map an untyped backend failure onto the status taxonomy. Time-limit
/// stops must stay distinguishable from infeasibility.
fn classify_failure(message: String) -> SolvedModel {
    let lowered = message.to_lowercase();
    let status = if lowered.contains("time") {
        SolveStatus::TimedOut
    } else {
        SolveStatus::Error
    };
    SolvedModel {
        status,
        solution: None,
        message: Some(message),
    }
}
