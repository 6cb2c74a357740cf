//! Two-settlement clearing: day-ahead dispatch plus a balancing market.
//!
//! The day-ahead market clears first; its dispatch and price are frozen
//! before the balancing formulation is built. The balancing market then
//! covers the realized deviation (outages and intermittent forecast error)
//! at one period with up/down regulation and, as a last resort, load
//! curtailment. The dual of the balancing-need equality is the balancing
//! price.
//!
//! Intermittent deviations settle two ways: a one-price scheme where every
//! deviation trades at the balancing price, and a two-price scheme where
//! only deviations that worsen the system imbalance trade at the balancing
//! price while helping deviations keep the day-ahead price.

use crate::error::MarketError;
use crate::results::{EnergyOutcome, Prices};
use crate::single_bus;
use crate::solve;
use crate::types::{ClearingOptions, MarketDesign};
use emt_core::{GenUnitId, MarketSystem};
use good_lp::solvers::clarabel::clarabel;
use good_lp::{constraint, variable, variables, Expression, SolverModel, Variable};
use serde::Serialize;

/// The realized deviation the balancing market must cover.
#[derive(Debug, Clone)]
pub struct Disturbance {
    /// Period of the balancing run.
    pub period: usize,
    /// Units that dropped out entirely; their day-ahead dispatch is lost.
    pub outages: Vec<GenUnitId>,
    /// Fractional deviation of intermittent units from their day-ahead
    /// dispatch (`+0.15` produces 15% above schedule).
    pub deviations: Vec<(GenUnitId, f64)>,
}

/// Balancing bid construction parameters.
#[derive(Debug, Clone, Serialize)]
pub struct BalancingBids {
    /// Price of involuntary load curtailment ($/MWh).
    pub curtailment_price: f64,
    /// Up-regulation offers at `day-ahead price + coef × marginal cost`.
    pub up_regulation_coef: f64,
    /// Down-regulation offers at `day-ahead price − coef × marginal cost`.
    pub down_regulation_coef: f64,
}

impl Default for BalancingBids {
    fn default() -> Self {
        Self {
            curtailment_price: 400.0,
            up_regulation_coef: 0.10,
            down_regulation_coef: 0.13,
        }
    }
}

/// Outcome of the balancing run at one period.
#[derive(Debug, Clone, Serialize)]
pub struct BalancingOutcome {
    pub period: usize,
    /// Power the balancing market had to procure; positive on shortfall.
    pub balancing_need_mw: f64,
    pub balancing_price: f64,
    pub day_ahead_price: f64,
    /// Upward regulation per generation unit (MW).
    pub up_regulation_mw: Vec<f64>,
    /// Downward regulation per generation unit (MW).
    pub down_regulation_mw: Vec<f64>,
    /// Curtailed demand per load unit (MW).
    pub curtailment_mw: Vec<f64>,
    /// Day-ahead + balancing profit per unit, one-price settlement.
    pub profit_one_price: Vec<f64>,
    /// Day-ahead + balancing profit per unit, two-price settlement.
    pub profit_two_price: Vec<f64>,
}

/// Outcome of the full two-settlement pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct TwoSettlementOutcome {
    pub day_ahead: EnergyOutcome,
    pub balancing: BalancingOutcome,
}

/// Run the day-ahead market, then clear the balancing market against the
/// given disturbance.
pub fn clear(
    system: &MarketSystem,
    options: ClearingOptions,
    disturbance: &Disturbance,
    bids: &BalancingBids,
) -> Result<TwoSettlementOutcome, MarketError> {
    let day_ahead = single_bus::clear(system, options)?;
    let balancing = clear_balancing(system, &day_ahead, disturbance, bids)?;
    Ok(TwoSettlementOutcome {
        day_ahead,
        balancing,
    })
}

/// Clear the balancing market for one period of an already-solved day-ahead
/// outcome. The day-ahead outcome must come first; its dispatch and price
/// are inputs here.
pub fn clear_balancing(
    system: &MarketSystem,
    day_ahead: &EnergyOutcome,
    disturbance: &Disturbance,
    bids: &BalancingBids,
) -> Result<BalancingOutcome, MarketError> {
    let design = MarketDesign::TwoSettlement;
    let registry = system.registry();
    let gens = registry.gens();
    let loads = registry.loads();
    let t = disturbance.period;
    if t >= system.horizon() {
        return Err(MarketError::Solver(format!(
            "disturbance period {t} outside horizon {}",
            system.horizon()
        )));
    }
    let day_ahead_price = match &day_ahead.prices {
        Prices::System(series) => series[t],
        _ => {
            return Err(MarketError::Solver(
                "balancing settles against a single-bus day-ahead price".to_string(),
            ))
        }
    };
    let dispatch = &day_ahead.production_mw[t];
    let served = &day_ahead.demand_served_mw[t];

    let outaged = |id: GenUnitId| disturbance.outages.contains(&id);

    // Net deviation: intermittent error minus outage losses. The balancing
    // need is its negation.
    let mut deviation_mw = vec![0.0; gens.len()];
    for (id, fraction) in &disturbance.deviations {
        deviation_mw[id.value()] = dispatch[id.value()] * fraction;
    }
    let delta_total: f64 = deviation_mw.iter().sum::<f64>()
        - disturbance
            .outages
            .iter()
            .map(|id| dispatch[id.value()])
            .sum::<f64>();
    let balancing_need_mw = -delta_total;

    // Regulation offers: headroom below capacity (up) or above zero (down),
    // further capped by the unit's reserve capability. Outaged units and
    // deviating intermittent units do not regulate.
    let mut vars = variables!();
    let mut up = Vec::with_capacity(gens.len());
    let mut down = Vec::with_capacity(gens.len());
    for (g, unit) in gens.iter().enumerate() {
        let excluded = outaged(unit.id) || deviation_mw[g] != 0.0;
        let (up_cap, down_cap) = match (&unit.reserve, excluded) {
            (Some(reserve), false) => (
                reserve
                    .up_capacity_mw
                    .min(unit.pmax_mw * unit.availability[t] - dispatch[g])
                    .max(0.0),
                reserve.down_capacity_mw.min(dispatch[g]).max(0.0),
            ),
            _ => (0.0, 0.0),
        };
        up.push(vars.add(variable().min(0.0).max(up_cap)));
        down.push(vars.add(variable().min(0.0).max(down_cap)));
    }
    let curtailment: Vec<Variable> = loads
        .iter()
        .enumerate()
        .map(|(l, _)| vars.add(variable().min(0.0).max(served[l])))
        .collect();

    // Minimize re-dispatch cost: up regulation is bought above the
    // day-ahead price, down regulation is sold back below it, curtailment
    // at the penalty price.
    let mut cost = Expression::from(0.0);
    for (g, unit) in gens.iter().enumerate() {
        let up_price = day_ahead_price + bids.up_regulation_coef * unit.marginal_cost;
        let down_price = day_ahead_price - bids.down_regulation_coef * unit.marginal_cost;
        cost += up_price * up[g];
        cost -= down_price * down[g];
    }
    for (l, _) in loads.iter().enumerate() {
        cost += bids.curtailment_price * curtailment[l];
    }

    let mut model = vars.minimise(cost).using(clarabel);
    let mut covered = Expression::from(0.0);
    for g in 0..gens.len() {
        covered += up[g];
        covered -= down[g];
    }
    for c in &curtailment {
        covered += *c;
    }
    let need = model.add_constraint(constraint!(covered == balancing_need_mw));

    let mut solved = solve::run(model, design);
    solved.ensure_optimal(
        design,
        &format!(
            "balancing at period {t}, need {balancing_need_mw:.3} MW, \
             {} regulating units; constraint families: balancing need",
            gens.len()
        ),
    )?;

    let up_regulation_mw = solved.values(&up)?;
    let down_regulation_mw = solved.values(&down)?;
    let curtailment_mw = solved.values(&curtailment)?;
    let balancing_price = solved.shadow_prices(&[need])?[0];

    // Settlement. Day-ahead positions settle at the day-ahead price;
    // regulation and outage shortfalls settle at the balancing price. In
    // the two-price scheme an intermittent deviation keeps the day-ahead
    // price when it opposes the system imbalance.
    let mut profit_one_price = Vec::with_capacity(gens.len());
    let mut profit_two_price = Vec::with_capacity(gens.len());
    for (g, unit) in gens.iter().enumerate() {
        let day_ahead_profit = (day_ahead_price - unit.marginal_cost) * dispatch[g];
        let balancing_profit = if outaged(unit.id) {
            (balancing_price - unit.marginal_cost) * (-dispatch[g])
        } else {
            (balancing_price - unit.marginal_cost)
                * (up_regulation_mw[g] - down_regulation_mw[g])
        };
        let deviation = deviation_mw[g];
        let (one_price, two_price) = if deviation != 0.0 {
            let worsens = deviation * delta_total > 0.0;
            let two_price_settle = if worsens {
                balancing_price
            } else {
                day_ahead_price
            };
            (
                (balancing_price - unit.marginal_cost) * deviation,
                (two_price_settle - unit.marginal_cost) * deviation,
            )
        } else {
            (balancing_profit, balancing_profit)
        };
        profit_one_price.push(day_ahead_profit + one_price);
        profit_two_price.push(day_ahead_profit + two_price);
    }

    Ok(BalancingOutcome {
        period: t,
        balancing_need_mw,
        balancing_price,
        day_ahead_price,
        up_regulation_mw,
        down_regulation_mw,
        curtailment_mw,
        profit_one_price,
        profit_two_price,
    })
}
