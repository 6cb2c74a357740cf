//! Shared scenario builders for tests.
//!
//! Small, fully-specified systems with hand-checkable optima. Kept in the
//! library so unit tests, integration tests, and downstream experiments
//! build the same fixtures.

use emt_core::{
    Battery, BatterySite, GenCategory, GenerationUnitSpec, LoadUnitSpec, MarketSystem, NodeId,
    Registry, ReserveOffer, TerminalSoc, Topology,
};

/// A dispatchable unit with unconstrained ramps and full availability.
pub fn dispatchable(
    name: &str,
    node: NodeId,
    cost: f64,
    pmax_mw: f64,
    horizon: usize,
) -> GenerationUnitSpec {
    GenerationUnitSpec {
        name: name.to_string(),
        node,
        category: GenCategory::Dispatchable,
        marginal_cost: cost,
        pmin_mw: 0.0,
        pmax_mw,
        availability: vec![1.0; horizon],
        ramp_up_mw: f64::INFINITY,
        ramp_down_mw: f64::INFINITY,
        initial_output_mw: 0.0,
        startup_cost: 0.0,
        initially_on: true,
        reserve: None,
    }
}

/// An intermittent unit whose output is capped by `availability`.
pub fn intermittent(
    name: &str,
    node: NodeId,
    pmax_mw: f64,
    availability: Vec<f64>,
) -> GenerationUnitSpec {
    GenerationUnitSpec {
        name: name.to_string(),
        node,
        category: GenCategory::Intermittent,
        marginal_cost: 0.0,
        pmin_mw: 0.0,
        pmax_mw,
        availability,
        ramp_up_mw: f64::INFINITY,
        ramp_down_mw: f64::INFINITY,
        initial_output_mw: 0.0,
        startup_cost: 0.0,
        initially_on: true,
        reserve: None,
    }
}

fn single_load(name: &str, node: NodeId, bid_price: f64) -> LoadUnitSpec {
    LoadUnitSpec {
        name: name.to_string(),
        node,
        bid_price,
        demand_share: 1.0,
    }
}

/// One node, two generators (cost 10 / cap 50, cost 20 / cap 100), one load
/// carrying all demand, one period.
///
/// With inelastic demand of 120 the optimum is dispatch [50, 70] at a
/// clearing price of 20 and a production cost of 1900.
pub fn two_unit_single_bus(demand_mw: f64, bid_price: f64) -> MarketSystem {
    let mut topology = Topology::new();
    let node = topology.add_node("bus").unwrap();
    let mut registry = Registry::new();
    registry
        .add_generation_unit(dispatchable("g1", node, 10.0, 50.0, 1))
        .unwrap();
    registry
        .add_generation_unit(dispatchable("g2", node, 20.0, 100.0, 1))
        .unwrap();
    registry
        .add_load_unit(single_load("l1", node, bid_price), &[demand_mw])
        .unwrap();
    MarketSystem::new(registry, topology, None, 1).unwrap()
}

/// Two nodes joined by one line (susceptance 5, the given capacity):
/// node A hosts a cheap generator (cost 10, cap 100), node B a 50 MW load
/// and nothing else.
pub fn two_node_system(line_capacity_mw: f64) -> MarketSystem {
    let mut topology = Topology::new();
    let a = topology.add_node("a").unwrap();
    let b = topology.add_node("b").unwrap();
    topology.add_line(a, b, 5.0, line_capacity_mw).unwrap();
    let mut registry = Registry::new();
    registry
        .add_generation_unit(dispatchable("gen_a", a, 10.0, 100.0, 1))
        .unwrap();
    registry
        .add_load_unit(single_load("load_b", b, 50.0), &[50.0])
        .unwrap();
    MarketSystem::new(registry, topology, None, 1).unwrap()
}

/// Same two-node network plus a local generator at node B (cost 40,
/// cap 100), so constrained imports are topped up locally.
pub fn two_node_system_with_local_generation(line_capacity_mw: f64) -> MarketSystem {
    let mut topology = Topology::new();
    let a = topology.add_node("a").unwrap();
    let b = topology.add_node("b").unwrap();
    topology.add_line(a, b, 5.0, line_capacity_mw).unwrap();
    let mut registry = Registry::new();
    registry
        .add_generation_unit(dispatchable("gen_a", a, 10.0, 100.0, 1))
        .unwrap();
    registry
        .add_generation_unit(dispatchable("gen_b", b, 40.0, 100.0, 1))
        .unwrap();
    registry
        .add_load_unit(single_load("load_b", b, 50.0), &[50.0])
        .unwrap();
    MarketSystem::new(registry, topology, None, 1).unwrap()
}

/// Two single-node zones with a 30 MW corridor: zone 1 exports cheap power
/// (cost 10, cap 100), zone 2 carries an 80 MW load backed by a local
/// generator at cost 50.
pub fn two_zone_system() -> MarketSystem {
    let mut topology = Topology::new();
    let n1 = topology.add_node("n1").unwrap();
    let n2 = topology.add_node("n2").unwrap();
    topology.add_line(n1, n2, 5.0, 30.0).unwrap();
    let z1 = topology.add_zone("z1").unwrap();
    let z2 = topology.add_zone("z2").unwrap();
    topology.assign_zone(n1, z1).unwrap();
    topology.assign_zone(n2, z2).unwrap();
    let mut registry = Registry::new();
    registry
        .add_generation_unit(dispatchable("cheap", n1, 10.0, 100.0, 1))
        .unwrap();
    registry
        .add_generation_unit(dispatchable("local", n2, 50.0, 100.0, 1))
        .unwrap();
    registry
        .add_load_unit(single_load("load", n2, 100.0), &[80.0])
        .unwrap();
    MarketSystem::new(registry, topology, None, 1).unwrap()
}

/// Two-period arbitrage scenario: a cheap generator that disappears in the
/// second period, an expensive backstop, and a battery that can move energy
/// between the periods.
pub fn battery_arbitrage_system(
    efficiency: f64,
    terminal: TerminalSoc,
) -> MarketSystem {
    let mut topology = Topology::new();
    let node = topology.add_node("bus").unwrap();
    let mut registry = Registry::new();
    let mut cheap = dispatchable("cheap", node, 1.0, 200.0, 2);
    cheap.availability = vec![1.0, 0.0];
    registry.add_generation_unit(cheap).unwrap();
    registry
        .add_generation_unit(dispatchable("backstop", node, 100.0, 200.0, 2))
        .unwrap();
    registry
        .add_load_unit(single_load("load", node, 200.0), &[20.0, 100.0])
        .unwrap();
    let battery = Battery {
        name: "battery".to_string(),
        site: BatterySite::System,
        soc_min_mwh: 0.0,
        soc_max_mwh: 100.0,
        power_limit_mw: 50.0,
        efficiency,
        soc_initial_mwh: 0.0,
        terminal,
        period_hours: 1.0,
    };
    MarketSystem::new(registry, topology, Some(battery), 2).unwrap()
}

/// One-period system with reserve offers: g1 (cost 10) offers cheap
/// reserve, g2 (cost 20) expensive reserve; a 100 MW inelastic load sets
/// the requirements.
pub fn reserve_system() -> MarketSystem {
    let mut topology = Topology::new();
    let node = topology.add_node("bus").unwrap();
    let mut registry = Registry::new();
    let mut g1 = dispatchable("g1", node, 10.0, 100.0, 1);
    g1.reserve = Some(ReserveOffer {
        up_capacity_mw: 20.0,
        down_capacity_mw: 20.0,
        up_price: 2.0,
        down_price: 1.5,
    });
    let mut g2 = dispatchable("g2", node, 20.0, 100.0, 1);
    g2.reserve = Some(ReserveOffer {
        up_capacity_mw: 30.0,
        down_capacity_mw: 30.0,
        up_price: 5.0,
        down_price: 4.0,
    });
    registry.add_generation_unit(g1).unwrap();
    registry.add_generation_unit(g2).unwrap();
    registry
        .add_load_unit(single_load("load", node, 80.0), &[100.0])
        .unwrap();
    MarketSystem::new(registry, topology, None, 1).unwrap()
}

/// One-period system for balancing runs: two conventional units with
/// regulation capability and two intermittent units that will deviate.
pub fn balancing_system() -> MarketSystem {
    let mut topology = Topology::new();
    let node = topology.add_node("bus").unwrap();
    let mut registry = Registry::new();
    let mut g1 = dispatchable("g1", node, 10.0, 100.0, 1);
    g1.reserve = Some(ReserveOffer {
        up_capacity_mw: 50.0,
        down_capacity_mw: 50.0,
        up_price: 0.0,
        down_price: 0.0,
    });
    let mut g2 = dispatchable("g2", node, 20.0, 100.0, 1);
    g2.reserve = Some(ReserveOffer {
        up_capacity_mw: 30.0,
        down_capacity_mw: 30.0,
        up_price: 0.0,
        down_price: 0.0,
    });
    registry.add_generation_unit(g1).unwrap();
    registry.add_generation_unit(g2).unwrap();
    registry
        .add_generation_unit(intermittent("w1", node, 50.0, vec![1.0]))
        .unwrap();
    registry
        .add_generation_unit(intermittent("w2", node, 30.0, vec![1.0]))
        .unwrap();
    registry
        .add_load_unit(single_load("load", node, 60.0), &[200.0])
        .unwrap();
    MarketSystem::new(registry, topology, None, 1).unwrap()
}
