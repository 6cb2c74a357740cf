//! Nodal market clearing with DC power flow.
//!
//! Linearized network model:
//! - Flat voltage magnitudes, angles as decision variables
//! - Branch flow `P_ij = b_ij · (θ_i − θ_j)`
//! - One balance equality per node per period; its dual is the locational
//!   marginal price
//!
//! The nodal balance uses the B' susceptance matrix: row `n` of B' times
//! the angle vector is the net flow out of node `n`.

use crate::dispatch::{add_ramp_constraints, demand_variables, dispatch_cost, production_variables};
use crate::error::MarketError;
use crate::results::{extract_energy, BalanceRefs, EnergyExtraction, EnergyOutcome};
use crate::solve;
use crate::storage::{add_soc_constraints, battery_variables};
use crate::types::{ClearingOptions, MarketDesign};
use emt_core::{BatterySite, MarketSystem, ModelError, NodeId, Topology};
use good_lp::solvers::clarabel::clarabel;
use good_lp::{constraint, variable, variables, Expression, SolverModel, Variable};
use sprs::{CsMat, TriMat};

// Angles can be large in the MW-scaled formulation, so use wide bounds
// instead of unbounded variables.
const ANGLE_BOUND: f64 = 1e6;

/// Build the B' susceptance matrix (sparse).
///
/// B'[i,j] = -b_ij for i ≠ j (off-diagonal = -susceptance of line i-j)
/// B'[i,i] = Σ b_ik over all lines at node i
fn susceptance_matrix(topology: &Topology) -> CsMat<f64> {
    let n = topology.num_nodes();
    let mut triplets = TriMat::new((n, n));
    for line in topology.lines() {
        let i = line.from.value();
        let j = line.to.value();
        let b = line.susceptance;
        triplets.add_triplet(i, j, -b);
        triplets.add_triplet(j, i, -b);
        triplets.add_triplet(i, i, b);
        triplets.add_triplet(j, j, b);
    }
    triplets.to_csr()
}

/// Clear the nodal market.
pub fn clear(
    system: &MarketSystem,
    options: ClearingOptions,
) -> Result<EnergyOutcome, MarketError> {
    let design = MarketDesign::Nodal;
    let topology = system.topology();
    let registry = system.registry();
    let horizon = system.horizon();
    let n_nodes = topology.num_nodes();

    let reference = options.reference_node.unwrap_or(NodeId::new(0));
    if reference.value() >= n_nodes {
        return Err(ModelError::UnknownNode(reference).into());
    }
    let battery_node = match system.battery() {
        None => None,
        Some(parameters) => match parameters.site {
            BatterySite::Node(node) => Some(node),
            site => {
                return Err(MarketError::Model(ModelError::InvalidRange {
                    entity: "battery".to_string(),
                    reason: format!(
                        "nodal clearing requires a node-sited battery, got {site:?}"
                    ),
                }))
            }
        },
    };

    let b_prime = susceptance_matrix(topology);

    let mut vars = variables!();
    let production = production_variables(&mut vars, system, design, None)?;
    let demand = demand_variables(&mut vars, system, options.demand_model);
    let battery = system
        .battery()
        .map(|b| battery_variables(&mut vars, b, horizon));
    let angles: Vec<Vec<Variable>> = (0..horizon)
        .map(|_| {
            (0..n_nodes)
                .map(|_| vars.add(variable().min(-ANGLE_BOUND).max(ANGLE_BOUND)))
                .collect()
        })
        .collect();

    let objective = dispatch_cost(system, &production, &demand);
    let mut model = vars.minimise(objective).using(clarabel);

    // Reference angle pinned each period
    for t in 0..horizon {
        let theta_ref = angles[t][reference.value()];
        model.add_constraint(constraint!(theta_ref == 0.0));
    }

    // Per-node power balance:
    // Σ local production − Σ local demand served + battery net injection
    //   − Σ_j B'[n,j]·θ[j] = 0
    let mut balance = Vec::with_capacity(horizon);
    for t in 0..horizon {
        let mut rows = Vec::with_capacity(n_nodes);
        for node in topology.node_ids() {
            let n = node.value();
            let mut net = Expression::from(0.0);
            for id in registry.gen_ids_at_node(node) {
                net += production[t][id.value()];
            }
            for id in registry.load_ids_at_node(node) {
                net -= demand[t][id.value()];
            }
            if let (Some(bvars), Some(site)) = (&battery, battery_node) {
                if site == node {
                    net += bvars.net_injection(t);
                }
            }
            if let Some(row) = b_prime.outer_view(n) {
                for (j, &b_nj) in row.iter() {
                    net -= b_nj * angles[t][j];
                }
            }
            rows.push(model.add_constraint(constraint!(net == 0.0)));
        }
        balance.push(rows);
    }

    // Flow corridor per physical line: −capacity ≤ b·(θ_from − θ_to) ≤ capacity
    for line in topology.lines() {
        for t in 0..horizon {
            let theta_from = angles[t][line.from.value()];
            let theta_to = angles[t][line.to.value()];
            let flow = line.susceptance * theta_from - line.susceptance * theta_to;
            model.add_constraint(constraint!(flow.clone() <= line.capacity_mw));
            model.add_constraint(constraint!(flow >= -line.capacity_mw));
        }
    }

    add_ramp_constraints(&mut model, system, &production);
    if let (Some(parameters), Some(bvars)) = (system.battery(), &battery) {
        add_soc_constraints(&mut model, parameters, bvars);
    }

    let mut solved = solve::run(model, design);
    solved.ensure_optimal(
        design,
        &format!(
            "{horizon} periods, {n_nodes} nodes, {} lines, demand {:?}; \
             constraint families: nodal balance, flow corridor, reference angle, ramp{}",
            topology.num_lines(),
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
            balance: BalanceRefs::PerNode(balance),
            flows: None,
        },
    )
}
