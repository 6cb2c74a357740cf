//! Result extraction: dispatch, prices, profits, unserved demand.
//!
//! Clearing prices are the duals of the period balance equalities: one
//! scalar per period for the single-bus design, one per node or zone per
//! period for the network designs. Extraction goes exclusively through the
//! status-gated [`SolvedModel`](crate::solve::SolvedModel) accessors, so an
//! outcome can only be produced from a proven-optimal solve.

use crate::error::MarketError;
use crate::solve::SolvedModel;
use crate::storage::BatteryVars;
use crate::types::MarketDesign;
use emt_core::{BatterySite, MarketSystem, ModelError, NodeId, ZoneId};
use good_lp::constraint::ConstraintReference;
use good_lp::Variable;
use serde::Serialize;

/// Clearing prices of one run, indexed `[period]` or `[period][location]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Prices {
    /// One system price per period.
    System(Vec<f64>),
    /// One price per node per period.
    PerNode(Vec<Vec<f64>>),
    /// One price per zone per period.
    PerZone(Vec<Vec<f64>>),
}

impl Prices {
    /// Price at `location` in period `t`. The location index is ignored for
    /// system-wide prices.
    pub fn at(&self, t: usize, location: usize) -> f64 {
        match self {
            Prices::System(series) => series[t],
            Prices::PerNode(series) => series[t][location],
            Prices::PerZone(series) => series[t][location],
        }
    }

    /// Number of price locations per period.
    pub fn locations(&self) -> usize {
        match self {
            Prices::System(_) => 1,
            Prices::PerNode(series) => series.first().map_or(0, Vec::len),
            Prices::PerZone(series) => series.first().map_or(0, Vec::len),
        }
    }
}

/// Battery dispatch series of one run.
#[derive(Debug, Clone, Serialize)]
pub struct BatterySeries {
    /// Discharge minus charge per period (MW); positive when the battery
    /// feeds the grid.
    pub net_injection_mw: Vec<f64>,
    pub charge_mw: Vec<f64>,
    pub discharge_mw: Vec<f64>,
    /// State of charge at the end of each period (MWh).
    pub soc_mwh: Vec<f64>,
    /// State of charge as a fraction of capacity.
    pub soc_fraction: Vec<f64>,
    /// Per-period profit: clearing price at the battery's site times net
    /// injection.
    pub profit: Vec<f64>,
}

impl BatterySeries {
    pub fn total_profit(&self) -> f64 {
        self.profit.iter().sum()
    }
}

/// Flow series over one zone boundary; positive from `from_zone` to
/// `to_zone`, the reverse direction is its negation.
#[derive(Debug, Clone, Serialize)]
pub struct ZonePairFlow {
    pub from_zone: ZoneId,
    pub to_zone: ZoneId,
    pub flow_mw: Vec<f64>,
}

/// The extracted outcome of one energy-market clearing.
#[derive(Debug, Clone, Serialize)]
pub struct EnergyOutcome {
    pub design: MarketDesign,
    pub horizon: usize,
    /// Dispatch per period per generation unit (MW).
    pub production_mw: Vec<Vec<f64>>,
    /// Demand served per period per load unit (MW).
    pub demand_served_mw: Vec<Vec<f64>>,
    pub prices: Prices,
    /// Per-period per-unit profit: production × (price at the unit's
    /// location − marginal cost).
    pub profit: Vec<Vec<f64>>,
    /// Per-period per-load utility: served × (bid − price at the load's
    /// location).
    pub utility: Vec<Vec<f64>>,
    /// Total needed demand per period (MW).
    pub demand_needed_mw: Vec<f64>,
    /// Needed minus served, per period (MW).
    pub demand_unserved_mw: Vec<f64>,
    pub battery: Option<BatterySeries>,
    /// Inter-zonal flows (zonal design only).
    pub flows: Option<Vec<ZonePairFlow>>,
    /// Σ production × marginal cost over the horizon.
    pub total_production_cost: f64,
    /// Σ utility of served demand minus production cost.
    pub social_welfare: f64,
}

/// One row of the per-period result table.
#[derive(Debug, Clone, Serialize)]
pub struct PeriodRow {
    pub period: usize,
    /// Clearing price per location (one entry for single-bus).
    pub prices: Vec<f64>,
    pub production_mw: Vec<f64>,
    pub profit: Vec<f64>,
    pub demand_needed_mw: f64,
    pub demand_served_mw: f64,
    pub demand_unserved_mw: f64,
    pub battery_net_injection_mw: Option<f64>,
    pub battery_soc_mwh: Option<f64>,
}

impl EnergyOutcome {
    /// Flatten the outcome into one row per period for reporting.
    pub fn period_table(&self) -> Vec<PeriodRow> {
        (0..self.horizon)
            .map(|t| PeriodRow {
                period: t,
                prices: (0..self.prices.locations())
                    .map(|loc| self.prices.at(t, loc))
                    .collect(),
                production_mw: self.production_mw[t].clone(),
                profit: self.profit[t].clone(),
                demand_needed_mw: self.demand_needed_mw[t],
                demand_served_mw: self.demand_needed_mw[t] - self.demand_unserved_mw[t],
                demand_unserved_mw: self.demand_unserved_mw[t],
                battery_net_injection_mw: self
                    .battery
                    .as_ref()
                    .map(|b| b.net_injection_mw[t]),
                battery_soc_mwh: self.battery.as_ref().map(|b| b.soc_mwh[t]),
            })
            .collect()
    }
}

/// Balance-constraint references of one formulation, matching the price
/// granularity of its design.
pub(crate) enum BalanceRefs {
    System(Vec<ConstraintReference>),
    PerNode(Vec<Vec<ConstraintReference>>),
    PerZone(Vec<Vec<ConstraintReference>>),
}

/// Everything a design hands over for extraction.
pub(crate) struct EnergyExtraction {
    pub design: MarketDesign,
    pub production: Vec<Vec<Variable>>,
    pub demand: Vec<Vec<Variable>>,
    pub battery: Option<BatteryVars>,
    pub balance: BalanceRefs,
    pub flows: Option<Vec<(ZoneId, ZoneId, Vec<Variable>)>>,
}

pub(crate) fn extract_energy(
    system: &MarketSystem,
    solved: &mut SolvedModel,
    plan: EnergyExtraction,
) -> Result<EnergyOutcome, MarketError> {
    let horizon = system.horizon();
    let registry = system.registry();

    let prices = extract_prices(solved, &plan.balance)?;

    let mut production_mw = Vec::with_capacity(horizon);
    let mut demand_served_mw = Vec::with_capacity(horizon);
    for t in 0..horizon {
        production_mw.push(solved.values(&plan.production[t])?);
        demand_served_mw.push(solved.values(&plan.demand[t])?);
    }

    let gen_locations = registry
        .gens()
        .iter()
        .map(|unit| price_location(system, &prices, unit.node))
        .collect::<Result<Vec<_>, _>>()?;
    let load_locations = registry
        .loads()
        .iter()
        .map(|unit| price_location(system, &prices, unit.node))
        .collect::<Result<Vec<_>, _>>()?;

    let mut profit = Vec::with_capacity(horizon);
    let mut utility = Vec::with_capacity(horizon);
    let mut total_production_cost = 0.0;
    let mut social_welfare = 0.0;
    for t in 0..horizon {
        let profit_row: Vec<f64> = registry
            .gens()
            .iter()
            .enumerate()
            .map(|(g, unit)| {
                let price = prices.at(t, gen_locations[g]);
                production_mw[t][g] * (price - unit.marginal_cost)
            })
            .collect();
        let utility_row: Vec<f64> = registry
            .loads()
            .iter()
            .enumerate()
            .map(|(l, unit)| {
                let price = prices.at(t, load_locations[l]);
                demand_served_mw[t][l] * (unit.bid_price - price)
            })
            .collect();
        for (g, unit) in registry.gens().iter().enumerate() {
            total_production_cost += production_mw[t][g] * unit.marginal_cost;
            social_welfare -= production_mw[t][g] * unit.marginal_cost;
        }
        for (l, unit) in registry.loads().iter().enumerate() {
            social_welfare += demand_served_mw[t][l] * unit.bid_price;
        }
        profit.push(profit_row);
        utility.push(utility_row);
    }

    let demand_needed_mw = system.total_demand_mw();
    let demand_unserved_mw: Vec<f64> = (0..horizon)
        .map(|t| {
            let served: f64 = demand_served_mw[t].iter().sum();
            demand_needed_mw[t] - served
        })
        .collect();

    let battery = match (&plan.battery, system.battery()) {
        (Some(bvars), Some(parameters)) => {
            let location = battery_location(system, &prices, parameters.site)?;
            let charge_mw = solved.values(&bvars.charge)?;
            let discharge_mw = solved.values(&bvars.discharge)?;
            let soc_mwh = solved.values(&bvars.soc)?;
            let net_injection_mw: Vec<f64> = charge_mw
                .iter()
                .zip(&discharge_mw)
                .map(|(c, d)| d - c)
                .collect();
            let profit: Vec<f64> = net_injection_mw
                .iter()
                .enumerate()
                .map(|(t, net)| prices.at(t, location) * net)
                .collect();
            let soc_fraction = soc_mwh
                .iter()
                .map(|soc| {
                    if parameters.soc_max_mwh > 0.0 {
                        soc / parameters.soc_max_mwh
                    } else {
                        0.0
                    }
                })
                .collect();
            Some(BatterySeries {
                net_injection_mw,
                charge_mw,
                discharge_mw,
                soc_mwh,
                soc_fraction,
                profit,
            })
        }
        _ => None,
    };

    let flows = match plan.flows {
        Some(pairs) => {
            let mut series = Vec::with_capacity(pairs.len());
            for (from_zone, to_zone, vars) in pairs {
                series.push(ZonePairFlow {
                    from_zone,
                    to_zone,
                    flow_mw: solved.values(&vars)?,
                });
            }
            Some(series)
        }
        None => None,
    };

    Ok(EnergyOutcome {
        design: plan.design,
        horizon,
        production_mw,
        demand_served_mw,
        prices,
        profit,
        utility,
        demand_needed_mw,
        demand_unserved_mw,
        battery,
        flows,
        total_production_cost,
        social_welfare,
    })
}

fn extract_prices(
    solved: &mut SolvedModel,
    balance: &BalanceRefs,
) -> Result<Prices, MarketError> {
    match balance {
        BalanceRefs::System(refs) => Ok(Prices::System(solved.shadow_prices(refs)?)),
        BalanceRefs::PerNode(rows) => Ok(Prices::PerNode(shadow_price_rows(solved, rows)?)),
        BalanceRefs::PerZone(rows) => Ok(Prices::PerZone(shadow_price_rows(solved, rows)?)),
    }
}

fn shadow_price_rows(
    solved: &mut SolvedModel,
    rows: &[Vec<ConstraintReference>],
) -> Result<Vec<Vec<f64>>, MarketError> {
    rows.iter()
        .map(|row| solved.shadow_prices(row))
        .collect()
}

/// Index into the price vector that applies to a unit hosted at `node`.
fn price_location(
    system: &MarketSystem,
    prices: &Prices,
    node: NodeId,
) -> Result<usize, MarketError> {
    match prices {
        Prices::System(_) => Ok(0),
        Prices::PerNode(_) => Ok(node.value()),
        Prices::PerZone(_) => match system.topology().zone_of(node)? {
            Some(zone) => Ok(zone.value()),
            None => Err(MarketError::Model(ModelError::InvalidRange {
                entity: format!("node {}", node.value()),
                reason: "not assigned to any zone".to_string(),
            })),
        },
    }
}

fn battery_location(
    system: &MarketSystem,
    prices: &Prices,
    site: BatterySite,
) -> Result<usize, MarketError> {
    match site {
        BatterySite::System => Ok(0),
        BatterySite::Node(node) => price_location(system, prices, node),
        BatterySite::Zone(zone) => Ok(zone.value()),
    }
}
