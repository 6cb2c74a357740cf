//! Merit-order curve data.
//!
//! Supply offers sorted by ascending marginal cost and demand bids sorted
//! by descending willingness to pay, with cumulative quantities, for one
//! period of a system. This is the step-curve data a market report plots;
//! the clearing itself always goes through the optimization.

use emt_core::MarketSystem;
use serde::Serialize;

/// One step of a merit-order curve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurveStep {
    pub unit: String,
    /// Quantity offered or bid at this step (MW).
    pub quantity_mw: f64,
    /// Cumulative quantity including this step (MW).
    pub cumulative_mw: f64,
    /// Marginal cost (supply) or bid price (demand).
    pub price: f64,
}

/// Supply and demand step curves for one period.
#[derive(Debug, Clone, Serialize)]
pub struct MeritOrderCurve {
    pub period: usize,
    /// Ascending by price.
    pub supply: Vec<CurveStep>,
    /// Descending by price.
    pub demand: Vec<CurveStep>,
}

/// Build the merit-order curves for period `t`.
pub fn merit_order_curve(system: &MarketSystem, t: usize) -> MeritOrderCurve {
    let registry = system.registry();

    let mut supply: Vec<(String, f64, f64)> = registry
        .gens()
        .iter()
        .map(|unit| {
            (
                unit.name.clone(),
                unit.pmax_mw * unit.availability[t],
                unit.marginal_cost,
            )
        })
        .collect();
    supply.sort_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal));

    let mut demand: Vec<(String, f64, f64)> = registry
        .loads()
        .iter()
        .map(|unit| {
            (
                unit.name.clone(),
                unit.needed_demand_mw[t],
                unit.bid_price,
            )
        })
        .collect();
    demand.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));

    MeritOrderCurve {
        period: t,
        supply: accumulate(supply),
        demand: accumulate(demand),
    }
}

fn accumulate(entries: Vec<(String, f64, f64)>) -> Vec<CurveStep> {
    let mut cumulative = 0.0;
    entries
        .into_iter()
        .map(|(unit, quantity_mw, price)| {
            cumulative += quantity_mw;
            CurveStep {
                unit,
                quantity_mw,
                cumulative_mw: cumulative,
                price,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::two_unit_single_bus;

    #[test]
    fn test_supply_sorted_by_ascending_cost() {
        let system = two_unit_single_bus(120.0, 50.0);
        let curve = merit_order_curve(&system, 0);
        assert_eq!(curve.supply.len(), 2);
        assert!(curve.supply[0].price <= curve.supply[1].price);
        assert_eq!(curve.supply[1].cumulative_mw, 150.0);
    }

    #[test]
    fn test_demand_sorted_by_descending_bid() {
        let system = two_unit_single_bus(120.0, 50.0);
        let curve = merit_order_curve(&system, 0);
        assert_eq!(curve.demand.len(), 1);
        assert_eq!(curve.demand[0].cumulative_mw, 120.0);
    }
}
