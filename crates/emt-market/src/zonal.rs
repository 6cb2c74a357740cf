//! Zonal market clearing.
//!
//! Zones trade over aggregated corridors instead of individual lines. One
//! flow variable exists per unordered zone pair; the reverse direction is
//! its negation, so flow antisymmetry holds by construction. Corridor
//! capacity is the sum of line capacities crossing the zone boundary, and a
//! pair without connecting lines has its flow pinned to zero.

use crate::dispatch::{add_ramp_constraints, demand_variables, dispatch_cost, production_variables};
use crate::error::MarketError;
use crate::results::{extract_energy, BalanceRefs, EnergyExtraction, EnergyOutcome};
use crate::solve;
use crate::storage::{add_soc_constraints, battery_variables};
use crate::types::{ClearingOptions, MarketDesign};
use emt_core::{BatterySite, MarketSystem, ModelError, ZoneId};
use good_lp::solvers::clarabel::clarabel;
use good_lp::{constraint, variable, variables, Expression, SolverModel, Variable};

/// Clear the zonal market.
pub fn clear(
    system: &MarketSystem,
    options: ClearingOptions,
) -> Result<EnergyOutcome, MarketError> {
    let design = MarketDesign::Zonal;
    let topology = system.topology();
    let horizon = system.horizon();
    let zones = topology.zones();

    if zones.is_empty() {
        return Err(MarketError::Model(ModelError::InvalidRange {
            entity: "topology".to_string(),
            reason: "zonal clearing requires at least one zone".to_string(),
        }));
    }
    for node in topology.node_ids() {
        if topology.zone_of(node)?.is_none() {
            return Err(MarketError::Model(ModelError::InvalidRange {
                entity: format!("node {}", node.value()),
                reason: "not assigned to any zone".to_string(),
            }));
        }
    }
    let battery_zone = match system.battery() {
        None => None,
        Some(parameters) => match parameters.site {
            BatterySite::Zone(zone) => Some(zone),
            site => {
                return Err(MarketError::Model(ModelError::InvalidRange {
                    entity: "battery".to_string(),
                    reason: format!(
                        "zonal clearing requires a zone-sited battery, got {site:?}"
                    ),
                }))
            }
        },
    };

    // Per-zone unit id sets (union over member nodes)
    let mut zone_gens = Vec::with_capacity(zones.len());
    let mut zone_loads = Vec::with_capacity(zones.len());
    for zone in zones {
        zone_gens.push(system.zone_gen_ids(zone.id)?);
        zone_loads.push(system.zone_load_ids(zone.id)?);
    }

    // One corridor per unordered zone pair, bounded by the aggregate
    // boundary capacity. Positive flow moves energy from the lower-indexed
    // zone to the higher-indexed one.
    struct Corridor {
        from_zone: ZoneId,
        to_zone: ZoneId,
        capacity_mw: f64,
    }
    let mut corridors = Vec::new();
    for z1 in 0..zones.len() {
        for z2 in (z1 + 1)..zones.len() {
            corridors.push(Corridor {
                from_zone: zones[z1].id,
                to_zone: zones[z2].id,
                capacity_mw: topology.transfer_capacity_between(zones[z1].id, zones[z2].id)?,
            });
        }
    }

    let mut vars = variables!();
    let production = production_variables(&mut vars, system, design, None)?;
    let demand = demand_variables(&mut vars, system, options.demand_model);
    let battery = system
        .battery()
        .map(|b| battery_variables(&mut vars, b, horizon));
    let flow: Vec<Vec<Variable>> = corridors
        .iter()
        .map(|corridor| {
            (0..horizon)
                .map(|_| {
                    vars.add(
                        variable()
                            .min(-corridor.capacity_mw)
                            .max(corridor.capacity_mw),
                    )
                })
                .collect()
        })
        .collect();

    let objective = dispatch_cost(system, &production, &demand);
    let mut model = vars.minimise(objective).using(clarabel);

    // Per-zone balance:
    // Σ zone production − Σ zone demand served + battery net injection
    //   − Σ exports over the zone's corridors = 0
    let mut balance = Vec::with_capacity(horizon);
    for t in 0..horizon {
        let mut rows = Vec::with_capacity(zones.len());
        for (z, zone) in zones.iter().enumerate() {
            let mut net = Expression::from(0.0);
            for id in &zone_gens[z] {
                net += production[t][id.value()];
            }
            for id in &zone_loads[z] {
                net -= demand[t][id.value()];
            }
            if let (Some(bvars), Some(site)) = (&battery, battery_zone) {
                if site == zone.id {
                    net += bvars.net_injection(t);
                }
            }
            for (c, corridor) in corridors.iter().enumerate() {
                if corridor.from_zone == zone.id {
                    net -= flow[c][t];
                } else if corridor.to_zone == zone.id {
                    net += flow[c][t];
                }
            }
            rows.push(model.add_constraint(constraint!(net == 0.0)));
        }
        balance.push(rows);
    }

    add_ramp_constraints(&mut model, system, &production);
    if let (Some(parameters), Some(bvars)) = (system.battery(), &battery) {
        add_soc_constraints(&mut model, parameters, bvars);
    }

    let mut solved = solve::run(model, design);
    solved.ensure_optimal(
        design,
        &format!(
            "{horizon} periods, {} zones, {} corridors, demand {:?}; \
             constraint families: zonal balance, corridor bounds, ramp{}",
            zones.len(),
            corridors.len(),
            options.demand_model,
            if battery.is_some() { ", storage" } else { "" },
        ),
    )?;

    let flow_pairs = corridors
        .iter()
        .zip(flow)
        .map(|(corridor, vars)| (corridor.from_zone, corridor.to_zone, vars))
        .collect();

    extract_energy(
        system,
        &mut solved,
        EnergyExtraction {
            design,
            production,
            demand,
            battery,
            balance: BalanceRefs::PerZone(balance),
            flows: Some(flow_pairs),
        },
    )
}
