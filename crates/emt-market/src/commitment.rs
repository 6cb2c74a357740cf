//! Single-bus unit commitment (mixed-integer, HiGHS backend).
//!
//! Minimizes production plus startup cost against a fixed demand profile
//! with per-unit on/off and startup binaries. An integer program carries no
//! meaningful duals, so this variant reports dispatch, commitment, and cost
//! but no clearing prices.

use crate::dispatch::add_ramp_constraints;
use crate::error::MarketError;
use crate::storage::{add_soc_constraints, battery_variables};
use crate::types::MarketDesign;
use emt_core::MarketSystem;
use good_lp::solvers::highs::highs;
use good_lp::{
    constraint, variable, variables, Expression, ResolutionError, Solution, SolverModel, Variable,
};
use serde::Serialize;

/// Outcome of a unit-commitment run.
#[derive(Debug, Clone, Serialize)]
pub struct CommitmentOutcome {
    /// Commitment state per period per unit.
    pub on: Vec<Vec<bool>>,
    /// Startup indicator per period per unit.
    pub started: Vec<Vec<bool>>,
    /// Dispatch per period per unit (MW).
    pub production_mw: Vec<Vec<f64>>,
    /// Production plus startup cost over the horizon.
    pub total_cost: f64,
}

/// Solve the unit-commitment problem for a fixed demand profile.
pub fn clear(system: &MarketSystem) -> Result<CommitmentOutcome, MarketError> {
    let design = MarketDesign::Commitment;
    let gens = system.registry().gens();
    let horizon = system.horizon();
    let total_demand = system.total_demand_mw();

    let mut vars = variables!();
    let production: Vec<Vec<Variable>> = (0..horizon)
        .map(|t| {
            gens.iter()
                .map(|unit| {
                    vars.add(
                        variable()
                            .min(0.0)
                            .max(unit.pmax_mw * unit.availability[t]),
                    )
                })
                .collect()
        })
        .collect();
    let on: Vec<Vec<Variable>> = (0..horizon)
        .map(|_| gens.iter().map(|_| vars.add(variable().binary())).collect())
        .collect();
    let started: Vec<Vec<Variable>> = (0..horizon)
        .map(|_| gens.iter().map(|_| vars.add(variable().binary())).collect())
        .collect();
    let battery = system
        .battery()
        .map(|b| battery_variables(&mut vars, b, horizon));

    let mut cost = Expression::from(0.0);
    for t in 0..horizon {
        for (g, unit) in gens.iter().enumerate() {
            cost += unit.marginal_cost * production[t][g];
            cost += unit.startup_cost * started[t][g];
        }
    }

    let mut model = vars.minimise(cost).using(highs);

    for t in 0..horizon {
        // Fixed demand balance
        let mut net = Expression::from(0.0);
        for p in &production[t] {
            net += *p;
        }
        if let Some(bvars) = &battery {
            net += bvars.net_injection(t);
        }
        model.add_constraint(constraint!(net == total_demand[t]));

        for (g, unit) in gens.iter().enumerate() {
            let p = production[t][g];
            let u = on[t][g];
            let v = started[t][g];
            let cap = unit.pmax_mw * unit.availability[t];
            model.add_constraint(constraint!(cap * u - p >= 0.0));
            model.add_constraint(constraint!(unit.pmin_mw * u - p <= 0.0));
            // Startup indicator: forced to one when the unit switches on
            if t == 0 {
                let initial = if unit.initially_on { 1.0 } else { 0.0 };
                model.add_constraint(constraint!(v - u >= -initial));
            } else {
                let u_prev = on[t - 1][g];
                model.add_constraint(constraint!(v - u + u_prev >= 0.0));
            }
        }
    }

    add_ramp_constraints(&mut model, system, &production);
    if let (Some(parameters), Some(bvars)) = (system.battery(), &battery) {
        add_soc_constraints(&mut model, parameters, bvars);
    }

    let solution = model.solve().map_err(|error| match error {
        ResolutionError::Infeasible => MarketError::Infeasible {
            design,
            detail: format!(
                "{horizon} periods, {} units, fixed demand; \
                 constraint families: balance, commitment coupling, ramp",
                gens.len()
            ),
        },
        ResolutionError::Unbounded => MarketError::Unbounded { design },
        other => {
            let message = other.to_string();
            if message.to_lowercase().contains("time") {
                MarketError::SolverTimeout
            } else {
                MarketError::Solver(message)
            }
        }
    })?;

    let production_mw: Vec<Vec<f64>> = production
        .iter()
        .map(|row| row.iter().map(|v| solution.value(*v)).collect())
        .collect();
    let on_states: Vec<Vec<bool>> = on
        .iter()
        .map(|row| row.iter().map(|v| solution.value(*v) > 0.5).collect())
        .collect();
    let started_states: Vec<Vec<bool>> = started
        .iter()
        .map(|row| row.iter().map(|v| solution.value(*v) > 0.5).collect())
        .collect();

    let mut total_cost = 0.0;
    for t in 0..horizon {
        for (g, unit) in gens.iter().enumerate() {
            total_cost += production_mw[t][g] * unit.marginal_cost;
            if started_states[t][g] {
                total_cost += unit.startup_cost;
            }
        }
    }

    Ok(CommitmentOutcome {
        on: on_states,
        started: started_states,
        production_mw,
        total_cost,
    })
}
