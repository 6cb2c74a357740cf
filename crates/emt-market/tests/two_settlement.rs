//! Two-settlement (day-ahead + balancing) tests

use emt_core::GenUnitId;
use emt_market::test_utils::balancing_system;
use emt_market::two_settlement::{self, BalancingBids, Disturbance};
use emt_market::{ClearingOptions, MarketError};

const TOL: f64 = 1e-3;

// Unit order in the fixture: g1, g2, w1, w2
const G1: usize = 0;
const G2: usize = 1;
const W1: usize = 2;
const W2: usize = 3;

#[test]
fn test_wind_shortfall_clears_at_up_regulation_price() {
    let system = balancing_system();
    let outcome = two_settlement::clear(
        &system,
        ClearingOptions::default(),
        &Disturbance {
            period: 0,
            outages: vec![],
            deviations: vec![
                (GenUnitId::new(W1), -0.2),
                (GenUnitId::new(W2), 0.1),
            ],
        },
        &BalancingBids::default(),
    )
    .expect("two-settlement clearing should solve");

    // day-ahead: wind 80 free, g1 full, g2 marginal at 20 MW
    let day_ahead = &outcome.day_ahead;
    assert!((day_ahead.prices.at(0, 0) - 20.0).abs() < TOL);
    assert!((day_ahead.production_mw[0][G1] - 100.0).abs() < TOL);
    assert!((day_ahead.production_mw[0][G2] - 20.0).abs() < TOL);

    let balancing = &outcome.balancing;
    // w1 loses 10 MW, w2 gains 3 MW: 7 MW shortfall to cover
    assert!((balancing.balancing_need_mw - 7.0).abs() < TOL);
    // g1 has no headroom, so g2's up-regulation offer sets the price:
    // 20 + 0.1 * 20 = 22
    assert!((balancing.balancing_price - 22.0).abs() < TOL);
    assert!((balancing.up_regulation_mw[G2] - 7.0).abs() < TOL);
    assert!(balancing.curtailment_mw.iter().sum::<f64>() < TOL);

    // settlements
    // g1: day-ahead rent only
    assert!((balancing.profit_one_price[G1] - 1000.0).abs() < TOL);
    // g2: no day-ahead rent, regulation margin (22 - 20) * 7
    assert!((balancing.profit_one_price[G2] - 14.0).abs() < TOL);
    // w1 worsened the imbalance: both schemes settle its -10 MW at 22
    assert!((balancing.profit_one_price[W1] - 780.0).abs() < TOL);
    assert!((balancing.profit_two_price[W1] - 780.0).abs() < TOL);
    // w2 helped: one-price pays 22, two-price only the day-ahead 20
    assert!((balancing.profit_one_price[W2] - 666.0).abs() < TOL);
    assert!((balancing.profit_two_price[W2] - 660.0).abs() < TOL);
}

#[test]
fn test_outage_falls_back_to_curtailment() {
    let system = balancing_system();
    let outcome = two_settlement::clear(
        &system,
        ClearingOptions::default(),
        &Disturbance {
            period: 0,
            outages: vec![GenUnitId::new(G2)],
            deviations: vec![],
        },
        &BalancingBids::default(),
    )
    .unwrap();

    let balancing = &outcome.balancing;
    // g2's 20 MW day-ahead position is lost; g1 is already at capacity and
    // the wind cannot regulate, so load pays the curtailment penalty
    assert!((balancing.balancing_need_mw - 20.0).abs() < TOL);
    assert!((balancing.balancing_price - 400.0).abs() < TOL);
    assert!((balancing.curtailment_mw.iter().sum::<f64>() - 20.0).abs() < TOL);

    // the outaged unit buys its whole position back at the balancing price
    let expected = (400.0 - 20.0) * (-20.0);
    assert!((balancing.profit_one_price[G2] - expected).abs() < TOL);
}

#[test]
fn test_disturbance_period_must_be_inside_horizon() {
    let system = balancing_system();
    let result = two_settlement::clear(
        &system,
        ClearingOptions::default(),
        &Disturbance {
            period: 7,
            outages: vec![],
            deviations: vec![],
        },
        &BalancingBids::default(),
    );
    assert!(matches!(result, Err(MarketError::Solver(_))));
}
