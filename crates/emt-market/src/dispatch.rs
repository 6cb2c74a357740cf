//! Variable and constraint emission shared by every market design.
//!
//! Each design builds the same production/demand decision space, the same
//! welfare objective, and the same ramp coupling; only the balance
//! constraints differ. Keeping the shared pieces here keeps the five
//! formulations from drifting apart.

use crate::error::MarketError;
use crate::reserve::ReserveOutcome;
use crate::types::{DemandModel, MarketDesign};
use emt_core::MarketSystem;
use good_lp::{constraint, variable, Expression, ProblemVariables, SolverModel, Variable};

/// Production variables, one per unit per period, bounded by
/// `[0, pmax * availability[t]]`. Cleared reserve, when present, tightens
/// the window to `[down_reserve, pmax * availability - up_reserve]`.
pub(crate) fn production_variables(
    vars: &mut ProblemVariables,
    system: &MarketSystem,
    design: MarketDesign,
    reserve: Option<&ReserveOutcome>,
) -> Result<Vec<Vec<Variable>>, MarketError> {
    let gens = system.registry().gens();
    let mut production = Vec::with_capacity(system.horizon());
    for t in 0..system.horizon() {
        let mut row = Vec::with_capacity(gens.len());
        for (g, unit) in gens.iter().enumerate() {
            let mut upper = unit.pmax_mw * unit.availability[t];
            let mut lower = 0.0;
            if let Some(reserve) = reserve {
                upper -= reserve.up_reserve_mw[t][g];
                lower = reserve.down_reserve_mw[t][g];
            }
            if lower > upper {
                return Err(MarketError::Infeasible {
                    design,
                    detail: format!(
                        "cleared reserve leaves unit {} an empty production window \
                         [{lower:.3}, {upper:.3}] in period {t}",
                        unit.name
                    ),
                });
            }
            row.push(vars.add(variable().min(lower).max(upper)));
        }
        production.push(row);
    }
    Ok(production)
}

/// Demand-served variables, one per load per period. Elastic demand lives
/// in `[0, needed]`; fixed demand is pinned to the needed series.
pub(crate) fn demand_variables(
    vars: &mut ProblemVariables,
    system: &MarketSystem,
    model: DemandModel,
) -> Vec<Vec<Variable>> {
    let loads = system.registry().loads();
    (0..system.horizon())
        .map(|t| {
            loads
                .iter()
                .map(|load| {
                    let needed = load.needed_demand_mw[t];
                    let lower = match model {
                        DemandModel::Elastic => 0.0,
                        DemandModel::Fixed => needed,
                    };
                    vars.add(variable().min(lower).max(needed))
                })
                .collect()
        })
        .collect()
}

/// The minimized objective: production cost minus consumption utility.
/// Social welfare is its negation.
pub(crate) fn dispatch_cost(
    system: &MarketSystem,
    production: &[Vec<Variable>],
    demand: &[Vec<Variable>],
) -> Expression {
    let gens = system.registry().gens();
    let loads = system.registry().loads();
    let mut cost = Expression::from(0.0);
    for t in 0..system.horizon() {
        for (g, unit) in gens.iter().enumerate() {
            cost += unit.marginal_cost * production[t][g];
        }
        for (l, load) in loads.iter().enumerate() {
            cost -= load.bid_price * demand[t][l];
        }
    }
    cost
}

/// Ramp coupling between consecutive periods. Period 0 ramps against the
/// unit's pre-horizon output. Infinite limits emit no row.
pub(crate) fn add_ramp_constraints<M: SolverModel>(
    model: &mut M,
    system: &MarketSystem,
    production: &[Vec<Variable>],
) {
    for (g, unit) in system.registry().gens().iter().enumerate() {
        for t in 0..system.horizon() {
            let p = production[t][g];
            if t == 0 {
                if unit.ramp_up_mw.is_finite() {
                    model.add_constraint(constraint!(
                        p <= unit.initial_output_mw + unit.ramp_up_mw
                    ));
                }
                if unit.ramp_down_mw.is_finite() {
                    model.add_constraint(constraint!(
                        p >= unit.initial_output_mw - unit.ramp_down_mw
                    ));
                }
            } else {
                let previous = production[t - 1][g];
                if unit.ramp_up_mw.is_finite() {
                    model.add_constraint(constraint!(p - previous <= unit.ramp_up_mw));
                }
                if unit.ramp_down_mw.is_finite() {
                    model.add_constraint(constraint!(previous - p <= unit.ramp_down_mw));
                }
            }
        }
    }
}
