//! Reserve market tests

use emt_market::reserve::{self, ReserveRequirements};
use emt_market::test_utils::reserve_system;
use emt_market::{ClearingOptions, MarketDesign, MarketError};

const TOL: f64 = 1e-3;

#[test]
fn test_reserve_clears_cheapest_offers_first() {
    let system = reserve_system();
    let outcome = reserve::clear_reserve(&system, ReserveRequirements::default())
        .expect("reserve auction should solve");

    // requirements: 15% up / 10% down of the 100 MW demand
    // g1's 20 MW at $2 covers the whole upward requirement
    assert!((outcome.up_reserve_mw[0][0] - 15.0).abs() < TOL);
    assert!(outcome.up_reserve_mw[0][1].abs() < TOL);
    assert!((outcome.down_reserve_mw[0][0] - 10.0).abs() < TOL);

    // requirement duals price the reserve
    assert!((outcome.up_price[0] - 2.0).abs() < TOL);
    assert!((outcome.down_price[0] - 1.5).abs() < TOL);
    assert!((outcome.procurement_cost - 45.0).abs() < 1e-2);
}

#[test]
fn test_cleared_reserve_tightens_day_ahead_bounds() {
    let system = reserve_system();
    let outcome = reserve::clear(
        &system,
        ClearingOptions::default(),
        ReserveRequirements::default(),
    )
    .expect("reserve pipeline should solve");

    let energy = &outcome.energy;
    // g1 must hold 15 MW of headroom and stay above its 10 MW of downward
    // reserve: dispatch window [10, 85]
    let g1 = energy.production_mw[0][0];
    assert!(g1 <= 85.0 + TOL, "g1 dispatched {g1} above its tightened cap");
    assert!(g1 >= 10.0 - TOL, "g1 dispatched {g1} below its down reserve");
    // the cheap unit runs to its tightened cap, g2 covers the rest
    assert!((g1 - 85.0).abs() < TOL);
    assert!((energy.production_mw[0][1] - 15.0).abs() < TOL);
    assert!((energy.prices.at(0, 0) - 20.0).abs() < TOL);
}

#[test]
fn test_requirement_beyond_offers_is_infeasible() {
    let system = reserve_system();
    // 60% of 100 MW demand exceeds the 50 MW of offered upward reserve
    let result = reserve::clear_reserve(
        &system,
        ReserveRequirements {
            up_fraction: 0.6,
            down_fraction: 0.1,
        },
    );
    match result {
        Err(MarketError::Infeasible { design, .. }) => {
            assert_eq!(design, MarketDesign::Reserve);
        }
        other => panic!("expected infeasibility, got {other:?}"),
    }
}
