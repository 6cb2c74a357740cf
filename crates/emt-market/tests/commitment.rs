//! Unit commitment tests (HiGHS backend)
#![cfg(feature = "solver-highs")]

use emt_core::{LoadUnitSpec, MarketSystem, Registry, Topology};
use emt_market::commitment;
use emt_market::test_utils::dispatchable;

const TOL: f64 = 1e-3;

/// g1: cheap but with a minimum stable level and a startup cost, initially
/// off. g2: expensive peaker, always available.
fn commitment_system(demand: &[f64]) -> MarketSystem {
    let horizon = demand.len();
    let mut topology = Topology::new();
    let node = topology.add_node("bus").unwrap();
    let mut registry = Registry::new();
    let mut base = dispatchable("base", node, 10.0, 100.0, horizon);
    base.pmin_mw = 50.0;
    base.startup_cost = 1000.0;
    base.initially_on = false;
    registry.add_generation_unit(base).unwrap();
    registry
        .add_generation_unit(dispatchable("peaker", node, 30.0, 100.0, horizon))
        .unwrap();
    registry
        .add_load_unit(
            LoadUnitSpec {
                name: "load".to_string(),
                node,
                bid_price: 500.0,
                demand_share: 1.0,
            },
            demand,
        )
        .unwrap();
    MarketSystem::new(registry, topology, None, horizon).unwrap()
}

#[test]
fn test_startup_cost_weighed_against_cheaper_energy() {
    let system = commitment_system(&[80.0]);
    let outcome = commitment::clear(&system).expect("commitment should solve");

    // paying the 1000 startup still beats the peaker: 800 + 1000 < 2400
    assert!(outcome.on[0][0]);
    assert!(outcome.started[0][0]);
    assert!((outcome.production_mw[0][0] - 80.0).abs() < TOL);
    assert!(outcome.production_mw[0][1].abs() < TOL);
    assert!((outcome.total_cost - 1800.0).abs() < 1.0);
}

#[test]
fn test_startup_paid_once_across_periods() {
    let system = commitment_system(&[80.0, 80.0]);
    let outcome = commitment::clear(&system).unwrap();

    assert!(outcome.on[0][0] && outcome.on[1][0]);
    assert!(outcome.started[0][0]);
    assert!(!outcome.started[1][0], "no second startup while running");
    // 2 * 800 energy + one startup
    assert!((outcome.total_cost - 2600.0).abs() < 1.0);
}

#[test]
fn test_minimum_stable_level_respected() {
    // demand below pmin: committing the base unit would force 50 MW out of
    // a 40 MW demand, so the peaker must carry it
    let system = commitment_system(&[40.0]);
    let outcome = commitment::clear(&system).unwrap();

    assert!(!outcome.on[0][0]);
    assert!((outcome.production_mw[0][1] - 40.0).abs() < TOL);
    assert!((outcome.total_cost - 1200.0).abs() < 1.0);
}
