//! Battery variables and state-of-charge coupling.

use emt_core::{Battery, TerminalSoc};
use good_lp::{constraint, variable, Expression, ProblemVariables, SolverModel, Variable};

/// Decision variables of one battery across the horizon.
pub(crate) struct BatteryVars {
    /// State of charge at the end of each period (MWh).
    pub soc: Vec<Variable>,
    /// Power drawn from the grid while charging (MW), non-negative.
    pub charge: Vec<Variable>,
    /// Power injected into the grid while discharging (MW), non-negative.
    pub discharge: Vec<Variable>,
}

impl BatteryVars {
    /// Grid-side net injection in period `t`: discharge minus charge.
    pub fn net_injection(&self, t: usize) -> Expression {
        self.discharge[t] - self.charge[t]
    }
}

pub(crate) fn battery_variables(
    vars: &mut ProblemVariables,
    battery: &Battery,
    horizon: usize,
) -> BatteryVars {
    let soc = (0..horizon)
        .map(|_| {
            vars.add(
                variable()
                    .min(battery.soc_min_mwh)
                    .max(battery.soc_max_mwh),
            )
        })
        .collect();
    let bounded_power = |vars: &mut ProblemVariables| {
        (0..horizon)
            .map(|_| vars.add(variable().min(0.0).max(battery.power_limit_mw)))
            .collect()
    };
    let charge = bounded_power(vars);
    let discharge = bounded_power(vars);
    BatteryVars {
        soc,
        charge,
        discharge,
    }
}

/// Couple consecutive states of charge:
/// `soc[t] = soc[t-1] + (charge[t]·η − discharge[t]/η)·Δt`, with `soc[-1]`
/// the configured initial value, and close the horizon per the battery's
/// terminal mode.
///
/// Charge and discharge are separate non-negative variables; the LP
/// relaxation admits both being non-zero in the same period (a lossy
/// round trip inside one period). Nothing here forbids that.
pub(crate) fn add_soc_constraints<M: SolverModel>(
    model: &mut M,
    battery: &Battery,
    bvars: &BatteryVars,
) {
    let eta = battery.efficiency;
    let dt = battery.period_hours;
    let horizon = bvars.soc.len();
    for t in 0..horizon {
        let soc_t = bvars.soc[t];
        let stored = (dt * eta) * bvars.charge[t] - (dt / eta) * bvars.discharge[t];
        if t == 0 {
            model.add_constraint(constraint!(soc_t - stored == battery.soc_initial_mwh));
        } else {
            let soc_prev = bvars.soc[t - 1];
            model.add_constraint(constraint!(soc_t - soc_prev - stored == 0.0));
        }
    }
    let last = bvars.soc[horizon - 1];
    match battery.terminal {
        TerminalSoc::AtLeastInitial => {
            model.add_constraint(constraint!(last >= battery.soc_initial_mwh));
        }
        TerminalSoc::ExactlyInitial => {
            model.add_constraint(constraint!(last == battery.soc_initial_mwh));
        }
    }
}
