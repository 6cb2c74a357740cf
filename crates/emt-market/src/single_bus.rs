//! Single-bus (copper-plate) market clearing.
//!
//! One balance equality per period: total production plus battery net
//! injection equals total demand served. The dual of that equality is the
//! system clearing price of the period.

use crate::dispatch::{add_ramp_constraints, demand_variables, dispatch_cost, production_variables};
use crate::error::MarketError;
use crate::results::{extract_energy, BalanceRefs, EnergyExtraction, EnergyOutcome};
use crate::reserve::ReserveOutcome;
use crate::solve;
use crate::storage::{add_soc_constraints, battery_variables};
use crate::types::{ClearingOptions, MarketDesign};
use emt_core::MarketSystem;
use good_lp::solvers::clarabel::clarabel;
use good_lp::{constraint, variables, Expression, SolverModel};

/// Clear the single-bus market.
pub fn clear(
    system: &MarketSystem,
    options: ClearingOptions,
) -> Result<EnergyOutcome, MarketError> {
    clear_with_reserve_bounds(system, options, None)
}

/// Clear the single-bus market with production bounds tightened by a
/// previously cleared reserve auction.
pub(crate) fn clear_with_reserve_bounds(
    system: &MarketSystem,
    options: ClearingOptions,
    reserve: Option<&ReserveOutcome>,
) -> Result<EnergyOutcome, MarketError> {
    let design = MarketDesign::SingleBus;
    let horizon = system.horizon();

    let mut vars = variables!();
    let production = production_variables(&mut vars, system, design, reserve)?;
    let demand = demand_variables(&mut vars, system, options.demand_model);
    let battery = system
        .battery()
        .map(|b| battery_variables(&mut vars, b, horizon));

    let objective = dispatch_cost(system, &production, &demand);
    let mut model = vars.minimise(objective).using(clarabel);

    let mut balance = Vec::with_capacity(horizon);
    for t in 0..horizon {
        let mut net = Expression::from(0.0);
        for p in &production[t] {
            net += *p;
        }
        if let Some(bvars) = &battery {
            net += bvars.net_injection(t);
        }
        for d in &demand[t] {
            net -= *d;
        }
        balance.push(model.add_constraint(constraint!(net == 0.0)));
    }

    add_ramp_constraints(&mut model, system, &production);
    if let (Some(parameters), Some(bvars)) = (system.battery(), &battery) {
        add_soc_constraints(&mut model, parameters, bvars);
    }

    let mut solved = solve::run(model, design);
    solved.ensure_optimal(
        design,
        &format!(
            "{horizon} periods, {} generation units, {} load units, demand {:?}; \
             constraint families: balance, ramp{}",
            system.registry().num_gens(),
            system.registry().num_loads(),
            options.demand_model,
            if battery.is_some() { ", storage" } else { "" },
        ),
    )?;

    extract_energy(
        system,
        &mut solved,
        EnergyExtraction {
            design,
            production,
            demand,
            battery,
            balance: BalanceRefs::System(balance),
            flows: None,
        },
    )
}
