//! Reserve capacity auction and the reserve-constrained day-ahead run.
//!
//! The reserve market clears up/down standby capacity per generator per
//! period against requirements stated as fractions of total demand,
//! minimizing procurement cost. The duals of the two coverage equalities
//! are the up and down reserve prices. Cleared reserve then tightens the
//! day-ahead production bounds: a unit holding upward reserve must keep
//! that headroom, a unit holding downward reserve must stay dispatched
//! above it.

use crate::error::MarketError;
use crate::results::EnergyOutcome;
use crate::single_bus;
use crate::solve;
use crate::types::{ClearingOptions, MarketDesign};
use emt_core::MarketSystem;
use good_lp::solvers::clarabel::clarabel;
use good_lp::{constraint, variable, variables, Expression, SolverModel, Variable};
use serde::Serialize;

/// Reserve requirements as fractions of total demand per period.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ReserveRequirements {
    pub up_fraction: f64,
    pub down_fraction: f64,
}

impl Default for ReserveRequirements {
    fn default() -> Self {
        Self {
            up_fraction: 0.15,
            down_fraction: 0.10,
        }
    }
}

/// Outcome of the reserve auction.
#[derive(Debug, Clone, Serialize)]
pub struct ReserveOutcome {
    /// Cleared upward reserve per period per unit (MW).
    pub up_reserve_mw: Vec<Vec<f64>>,
    /// Cleared downward reserve per period per unit (MW).
    pub down_reserve_mw: Vec<Vec<f64>>,
    /// Upward reserve price per period ($/MW), dual of the up-coverage
    /// equality.
    pub up_price: Vec<f64>,
    /// Downward reserve price per period ($/MW).
    pub down_price: Vec<f64>,
    /// Total procurement cost over the horizon.
    pub procurement_cost: f64,
}

/// One row of the per-period reserve table.
#[derive(Debug, Clone, Serialize)]
pub struct ReservePeriodRow {
    pub period: usize,
    pub up_price: f64,
    pub down_price: f64,
    /// Cleared upward reserve per unit (MW).
    pub up_reserve_mw: Vec<f64>,
    /// Cleared downward reserve per unit (MW).
    pub down_reserve_mw: Vec<f64>,
}

impl ReserveOutcome {
    /// Flatten the auction outcome into one row per period for reporting.
    pub fn period_table(&self) -> Vec<ReservePeriodRow> {
        (0..self.up_price.len())
            .map(|t| ReservePeriodRow {
                period: t,
                up_price: self.up_price[t],
                down_price: self.down_price[t],
                up_reserve_mw: self.up_reserve_mw[t].clone(),
                down_reserve_mw: self.down_reserve_mw[t].clone(),
            })
            .collect()
    }
}

/// Outcome of the reserve-then-energy pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct ReserveMarketOutcome {
    pub reserve: ReserveOutcome,
    pub energy: EnergyOutcome,
}

/// Clear the stand-alone reserve auction.
pub fn clear_reserve(
    system: &MarketSystem,
    requirements: ReserveRequirements,
) -> Result<ReserveOutcome, MarketError> {
    let design = MarketDesign::Reserve;
    let gens = system.registry().gens();
    let horizon = system.horizon();
    let total_demand = system.total_demand_mw();

    let offer = |g: usize| -> (f64, f64, f64, f64) {
        match &gens[g].reserve {
            Some(reserve) => (
                reserve.up_capacity_mw,
                reserve.down_capacity_mw,
                reserve.up_price,
                reserve.down_price,
            ),
            None => (0.0, 0.0, 0.0, 0.0),
        }
    };

    let mut vars = variables!();
    let up: Vec<Vec<Variable>> = (0..horizon)
        .map(|_| {
            (0..gens.len())
                .map(|g| vars.add(variable().min(0.0).max(offer(g).0)))
                .collect()
        })
        .collect();
    let down: Vec<Vec<Variable>> = (0..horizon)
        .map(|_| {
            (0..gens.len())
                .map(|g| vars.add(variable().min(0.0).max(offer(g).1)))
                .collect()
        })
        .collect();

    let mut cost = Expression::from(0.0);
    for t in 0..horizon {
        for g in 0..gens.len() {
            let (_, _, up_price, down_price) = offer(g);
            cost += up_price * up[t][g];
            cost += down_price * down[t][g];
        }
    }

    let mut model = vars.minimise(cost).using(clarabel);

    let mut up_coverage = Vec::with_capacity(horizon);
    let mut down_coverage = Vec::with_capacity(horizon);
    for t in 0..horizon {
        let mut up_total = Expression::from(0.0);
        let mut down_total = Expression::from(0.0);
        for g in 0..gens.len() {
            up_total += up[t][g];
            down_total += down[t][g];
        }
        let up_needed = total_demand[t] * requirements.up_fraction;
        let down_needed = total_demand[t] * requirements.down_fraction;
        up_coverage.push(model.add_constraint(constraint!(up_total == up_needed)));
        down_coverage.push(model.add_constraint(constraint!(down_total == down_needed)));

        // A unit's up and down reserve together may not exceed its capacity
        for (g, unit) in gens.iter().enumerate() {
            let up_g = up[t][g];
            let down_g = down[t][g];
            model.add_constraint(constraint!(up_g + down_g <= unit.pmax_mw));
        }
    }

    let mut solved = solve::run(model, design);
    solved.ensure_optimal(
        design,
        &format!(
            "{horizon} periods, {} offering units, up {:.0}% / down {:.0}% of demand; \
             constraint families: reserve coverage, joint reserve capacity",
            gens.len(),
            requirements.up_fraction * 100.0,
            requirements.down_fraction * 100.0,
        ),
    )?;

    let mut up_reserve_mw = Vec::with_capacity(horizon);
    let mut down_reserve_mw = Vec::with_capacity(horizon);
    for t in 0..horizon {
        up_reserve_mw.push(solved.values(&up[t])?);
        down_reserve_mw.push(solved.values(&down[t])?);
    }
    let up_price = solved.shadow_prices(&up_coverage)?;
    let down_price = solved.shadow_prices(&down_coverage)?;
    let procurement_cost = (0..horizon)
        .map(|t| {
            (0..gens.len())
                .map(|g| {
                    let (_, _, up_offer, down_offer) = offer(g);
                    up_reserve_mw[t][g] * up_offer + down_reserve_mw[t][g] * down_offer
                })
                .sum::<f64>()
        })
        .sum();

    Ok(ReserveOutcome {
        up_reserve_mw,
        down_reserve_mw,
        up_price,
        down_price,
        procurement_cost,
    })
}

/// Clear reserve first, then the day-ahead energy market with
/// reserve-tightened production bounds.
pub fn clear(
    system: &MarketSystem,
    options: ClearingOptions,
    requirements: ReserveRequirements,
) -> Result<ReserveMarketOutcome, MarketError> {
    let reserve = clear_reserve(system, requirements)?;
    let energy = single_bus::clear_with_reserve_bounds(system, options, Some(&reserve))?;
    Ok(ReserveMarketOutcome { reserve, energy })
}
