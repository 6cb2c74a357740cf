//! Nodal DC power flow clearing tests

use emt_market::test_utils::{two_node_system, two_node_system_with_local_generation};
use emt_market::{DemandModel, MarketClearing, MarketDesign, MarketError, Prices};

const TOL: f64 = 1e-3;

#[test]
fn test_congested_line_separates_nodal_prices() {
    // 30 MW corridor, 50 MW load: imports cap out, the local unit tops up
    let system = two_node_system_with_local_generation(30.0);
    let outcome = MarketClearing::new(MarketDesign::Nodal)
        .clear(&system)
        .expect("nodal clearing should solve");

    let lmp_a = outcome.prices.at(0, 0);
    let lmp_b = outcome.prices.at(0, 1);
    assert!((lmp_a - 10.0).abs() < TOL, "exporting node LMP {lmp_a}");
    assert!((lmp_b - 40.0).abs() < TOL, "importing node LMP {lmp_b}");

    // local generator covers what the corridor cannot carry
    assert!((outcome.production_mw[0][1] - 20.0).abs() < TOL);
    assert!(outcome.demand_unserved_mw[0].abs() < TOL);
}

#[test]
fn test_infeasible_when_import_capacity_below_fixed_demand() {
    // no local generation at node B, line capacity 30 < demand 50
    let system = two_node_system(30.0);
    let result = MarketClearing::new(MarketDesign::Nodal)
        .with_demand_model(DemandModel::Fixed)
        .clear(&system);
    match result {
        Err(MarketError::Infeasible { design, .. }) => {
            assert_eq!(design, MarketDesign::Nodal);
        }
        other => panic!("expected infeasibility, got {other:?}"),
    }
}

#[test]
fn test_elastic_demand_curtails_behind_congestion() {
    let system = two_node_system(30.0);
    let outcome = MarketClearing::new(MarketDesign::Nodal)
        .clear(&system)
        .unwrap();
    // only the corridor's 30 MW can be served
    assert!((outcome.demand_unserved_mw[0] - 20.0).abs() < TOL);
    // curtailed load's bid sets the importing node's price
    assert!((outcome.prices.at(0, 1) - 50.0).abs() < TOL);
}

#[test]
fn test_uncongested_network_matches_single_bus_price() {
    let system = two_node_system_with_local_generation(1e6);
    let nodal = MarketClearing::new(MarketDesign::Nodal)
        .clear(&system)
        .unwrap();
    // copper-plate clearing of the same units is the reference
    let reference = MarketClearing::new(MarketDesign::SingleBus)
        .clear(&system)
        .unwrap();
    let reference_price = reference.prices.at(0, 0);
    assert!((reference_price - 10.0).abs() < TOL);

    // flow bounds stay slack, so no price separation survives
    match &nodal.prices {
        Prices::PerNode(series) => {
            for (n, lmp) in series[0].iter().enumerate() {
                assert!(
                    (lmp - reference_price).abs() < TOL,
                    "node {n} LMP {lmp} vs single-bus {reference_price}"
                );
            }
        }
        other => panic!("expected nodal prices, got {other:?}"),
    }
}
