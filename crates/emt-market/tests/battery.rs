//! Battery storage coupling tests

use emt_core::TerminalSoc;
use emt_market::test_utils::battery_arbitrage_system;
use emt_market::{MarketClearing, MarketDesign};

const TOL: f64 = 1e-3;

#[test]
fn test_round_trip_loses_energy() {
    // one-way efficiency 0.9: a full cycle returns 81% of the charged energy
    let system = battery_arbitrage_system(0.9, TerminalSoc::AtLeastInitial);
    let outcome = MarketClearing::new(MarketDesign::SingleBus)
        .clear(&system)
        .expect("arbitrage clearing should solve");

    let battery = outcome.battery.as_ref().expect("battery series present");
    let charged: f64 = battery.charge_mw.iter().sum();
    let discharged: f64 = battery.discharge_mw.iter().sum();
    assert!(charged > 1.0, "battery should charge in the cheap period");
    assert!(
        discharged < charged - TOL,
        "strict loss expected: discharged {discharged}, charged {charged}"
    );
    // power limit 50 and efficiency 0.81 end to end
    assert!((charged - 50.0).abs() < TOL);
    assert!((discharged - 40.5).abs() < TOL);
}

#[test]
fn test_price_spread_drives_arbitrage_profit() {
    let system = battery_arbitrage_system(0.9, TerminalSoc::AtLeastInitial);
    let outcome = MarketClearing::new(MarketDesign::SingleBus)
        .clear(&system)
        .unwrap();

    // cheap period priced at the cheap unit, scarce period at the backstop
    assert!((outcome.prices.at(0, 0) - 1.0).abs() < TOL);
    assert!((outcome.prices.at(1, 0) - 100.0).abs() < TOL);

    let battery = outcome.battery.as_ref().unwrap();
    assert!((battery.net_injection_mw[0] + 50.0).abs() < TOL);
    assert!((battery.net_injection_mw[1] - 40.5).abs() < TOL);
    // buys 50 MWh at 1, sells 40.5 MWh at 100
    assert!((battery.total_profit() - 4000.0).abs() < 1.0);
}

#[test]
fn test_exact_terminal_closes_the_cycle() {
    let system = battery_arbitrage_system(0.9, TerminalSoc::ExactlyInitial);
    let outcome = MarketClearing::new(MarketDesign::SingleBus)
        .clear(&system)
        .unwrap();

    let battery = outcome.battery.as_ref().unwrap();
    // initial state of charge is zero; the strict mode must return to it
    assert!(battery.soc_mwh[1].abs() < TOL);
    // mid-horizon state reflects the charging loss: 50 MW charged stores 45
    assert!((battery.soc_mwh[0] - 45.0).abs() < TOL);
    assert!((battery.soc_fraction[0] - 0.45).abs() < TOL);
}
