//! Market clearing errors.
//!
//! Solver outcomes other than proven optimality become explicit errors at
//! the point results are requested; a failed clearing never degrades into a
//! partial or zero-filled outcome.

use crate::types::MarketDesign;
use emt_core::ModelError;
use thiserror::Error;

/// Errors raised while building, solving, or reading out a market clearing.
#[derive(Error, Debug)]
pub enum MarketError {
    /// The solver proved there is no feasible dispatch. `detail` describes
    /// the formulation (periods, entity counts, constraint families) for
    /// diagnosis.
    #[error("{design} market is infeasible ({detail})")]
    Infeasible {
        design: MarketDesign,
        detail: String,
    },

    /// The solver gave up on a time limit before reaching optimality.
    #[error("solver hit its time limit")]
    SolverTimeout,

    /// The formulation is unbounded, which indicates a modelling error such
    /// as a missing capacity bound.
    #[error("{design} market is unbounded")]
    Unbounded { design: MarketDesign },

    /// Results were requested before the solver reported optimality.
    #[error("results requested before an optimal solution was available")]
    ResultNotAvailable,

    /// Any other solver-side failure.
    #[error("solver failure: {0}")]
    Solver(String),

    /// Invalid model construction surfaced during formulation.
    #[error(transparent)]
    Model(#[from] ModelError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infeasible_display_names_design() {
        let err = MarketError::Infeasible {
            design: MarketDesign::Nodal,
            detail: "2 nodes, 1 period".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("nodal"));
        assert!(text.contains("infeasible"));
    }

    #[test]
    fn test_model_error_conversion() {
        fn build() -> Result<(), MarketError> {
            Err(ModelError::Other("bad input".to_string()))?;
            Ok(())
        }
        assert!(matches!(build(), Err(MarketError::Model(_))));
    }
}
