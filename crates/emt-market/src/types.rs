//! Shared configuration types for market clearing runs.

use emt_core::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The market design a formulation is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MarketDesign {
    /// Copper-plate: one system-wide balance per period.
    SingleBus,
    /// DC optimal power flow with per-node balances and angle variables.
    Nodal,
    /// Zonal balances with bounded inter-zonal flows.
    Zonal,
    /// Day-ahead plus balancing settlement.
    TwoSettlement,
    /// Stand-alone reserve capacity auction.
    Reserve,
    /// Single-bus unit commitment (mixed-integer).
    Commitment,
}

impl fmt::Display for MarketDesign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MarketDesign::SingleBus => "single-bus",
            MarketDesign::Nodal => "nodal",
            MarketDesign::Zonal => "zonal",
            MarketDesign::TwoSettlement => "two-settlement",
            MarketDesign::Reserve => "reserve",
            MarketDesign::Commitment => "unit-commitment",
        };
        f.write_str(name)
    }
}

/// How load enters the formulation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DemandModel {
    /// Demand served is a decision in `[0, needed]`, paid its bid price.
    #[default]
    Elastic,
    /// Demand served is pinned to the needed series; shortfalls make the
    /// formulation infeasible instead of curtailing.
    Fixed,
}

/// Options shared by the energy-market designs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClearingOptions {
    pub demand_model: DemandModel,
    /// Node whose voltage angle is pinned to zero in the nodal design.
    /// Defaults to the first registered node.
    pub reference_node: Option<NodeId>,
}
