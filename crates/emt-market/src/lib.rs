//! # emt-market: Market Formulation Builders and Result Extraction
//!
//! Translates a validated [`MarketSystem`] into a linear (or, for unit
//! commitment, mixed-integer) program, solves it, and turns the primal and
//! dual solution into dispatch, clearing prices, profits, and
//! unserved-demand series.
//!
//! ## Market designs
//!
//! | Design | Balance granularity | Entry point |
//! |--------|--------------------|-------------|
//! | [`MarketDesign::SingleBus`] | one equality per period | [`single_bus::clear`] |
//! | [`MarketDesign::Nodal`] | per node per period (DC power flow) | [`nodal::clear`] |
//! | [`MarketDesign::Zonal`] | per zone per period | [`zonal::clear`] |
//! | [`MarketDesign::TwoSettlement`] | day-ahead, then balancing | [`two_settlement::clear`] |
//! | [`MarketDesign::Reserve`] | reserve auction, then day-ahead | [`reserve::clear`] |
//!
//! The single-stage designs share one facade, [`MarketClearing`], and one
//! set of constraint emitters (capacity bounds, ramps, storage coupling);
//! only the balance constraints differ per design. The two-stage pipelines
//! are hard-ordered: the second formulation is only built after the first
//! one has solved to optimality and its values have been read out.
//!
//! Every clearing invocation builds an independent formulation and discards
//! it after extraction; nothing is shared between runs.
//!
//! ## Prices
//!
//! All formulations are minimizations, with balance equalities written
//! generation-side, so the dual of a balance row is the clearing price at
//! that location in the conventional sign. Infeasibility, unboundedness,
//! solver timeouts, and reading results before optimality each surface as
//! distinct [`MarketError`] variants.
//!
//! ## Example
//!
//! ```ignore
//! use emt_market::{MarketClearing, MarketDesign};
//!
//! let outcome = MarketClearing::new(MarketDesign::SingleBus).clear(&system)?;
//! println!("price at t=0: {}", outcome.prices.at(0, 0));
//! ```

pub mod error;
pub mod merit;
pub mod nodal;
pub mod reserve;
pub mod results;
pub mod single_bus;
pub mod test_utils;
pub mod two_settlement;
pub mod types;
pub mod zonal;

#[cfg(feature = "solver-highs")]
pub mod commitment;

mod dispatch;
mod solve;
mod storage;

pub use error::MarketError;
pub use merit::{merit_order_curve, CurveStep, MeritOrderCurve};
pub use reserve::{
    ReserveMarketOutcome, ReserveOutcome, ReservePeriodRow, ReserveRequirements,
};
pub use results::{BatterySeries, EnergyOutcome, PeriodRow, Prices, ZonePairFlow};
pub use solve::SolveStatus;
pub use two_settlement::{
    BalancingBids, BalancingOutcome, Disturbance, TwoSettlementOutcome,
};
pub use types::{ClearingOptions, DemandModel, MarketDesign};

#[cfg(feature = "solver-highs")]
pub use commitment::CommitmentOutcome;

use emt_core::{MarketSystem, NodeId};

/// Unified entry point for the single-stage energy designs.
///
/// The two-stage pipelines compose these runs and live in
/// [`two_settlement`] and [`reserve`].
#[derive(Debug, Clone, Copy)]
pub struct MarketClearing {
    design: MarketDesign,
    options: ClearingOptions,
}

impl MarketClearing {
    pub fn new(design: MarketDesign) -> Self {
        Self {
            design,
            options: ClearingOptions::default(),
        }
    }

    /// Replace the full option set.
    pub fn with_options(mut self, options: ClearingOptions) -> Self {
        self.options = options;
        self
    }

    /// Select elastic or fixed demand.
    pub fn with_demand_model(mut self, model: DemandModel) -> Self {
        self.options.demand_model = model;
        self
    }

    /// Pin the nodal reference angle to a specific node.
    pub fn with_reference_node(mut self, node: NodeId) -> Self {
        self.options.reference_node = Some(node);
        self
    }

    pub fn design(&self) -> MarketDesign {
        self.design
    }

    /// Build, solve, and extract one clearing run.
    pub fn clear(&self, system: &MarketSystem) -> Result<EnergyOutcome, MarketError> {
        match self.design {
            MarketDesign::SingleBus => single_bus::clear(system, self.options),
            MarketDesign::Nodal => nodal::clear(system, self.options),
            MarketDesign::Zonal => zonal::clear(system, self.options),
            other => Err(MarketError::Solver(format!(
                "{other} clearing runs through its dedicated entry point"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_facade_rejects_pipeline_designs() {
        let system = test_utils::two_unit_single_bus(120.0, 50.0);
        let result = MarketClearing::new(MarketDesign::Reserve).clear(&system);
        assert!(matches!(result, Err(MarketError::Solver(_))));
    }

    #[test]
    fn test_builder_options() {
        let clearing = MarketClearing::new(MarketDesign::Nodal)
            .with_demand_model(DemandModel::Fixed)
            .with_reference_node(NodeId::new(1));
        assert_eq!(clearing.design(), MarketDesign::Nodal);
        assert_eq!(clearing.options.demand_model, DemandModel::Fixed);
        assert_eq!(clearing.options.reference_node, Some(NodeId::new(1)));
    }
}
