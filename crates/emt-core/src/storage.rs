//! Battery storage parameters.
//!
//! The battery couples consecutive periods through its state of charge; the
//! constraint emission itself lives next to the market formulations. This
//! module only holds the validated parameter set.

use crate::error::{ModelError, ModelResult};
use crate::{NodeId, ZoneId};
use serde::{Deserialize, Serialize};

/// Where the battery injects into and draws from the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatterySite {
    /// Single-bus systems: the battery sits on the one system bus.
    System,
    /// Nodal systems: the battery's host node.
    Node(NodeId),
    /// Zonal systems: the battery's host zone.
    Zone(ZoneId),
}

/// Closing condition on the final state of charge.
///
/// Both forms appear in practice; which one applies is an explicit per-
/// battery choice rather than something inferred from the market design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalSoc {
    /// `soc[last] >= soc_initial`: the horizon may not drain the battery.
    AtLeastInitial,
    /// `soc[last] == soc_initial`: strict closed cycle.
    ExactlyInitial,
}

/// Battery storage parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Battery {
    pub name: String,
    pub site: BatterySite,
    /// Minimum state of charge (MWh).
    pub soc_min_mwh: f64,
    /// Maximum state of charge (MWh); the battery capacity.
    pub soc_max_mwh: f64,
    /// Charge and discharge power limit (MW), applied to each direction.
    pub power_limit_mw: f64,
    /// One-way efficiency in (0, 1]; charging multiplies by it, discharging
    /// divides by it, so a full cycle loses efficiency² of the energy.
    pub efficiency: f64,
    /// State of charge before the first period (MWh).
    pub soc_initial_mwh: f64,
    pub terminal: TerminalSoc,
    /// Length of one period in hours.
    pub period_hours: f64,
}

impl Default for Battery {
    fn default() -> Self {
        Self {
            name: "battery".to_string(),
            site: BatterySite::System,
            soc_min_mwh: 0.0,
            soc_max_mwh: 0.0,
            power_limit_mw: 0.0,
            efficiency: 1.0,
            soc_initial_mwh: 0.0,
            terminal: TerminalSoc::AtLeastInitial,
            period_hours: 1.0,
        }
    }
}

impl Battery {
    /// Check parameter invariants.
    pub fn validate(&self) -> ModelResult<()> {
        let entity = format!("battery {}", self.name);
        if self.soc_min_mwh < 0.0 || self.soc_max_mwh < self.soc_min_mwh {
            return Err(ModelError::invalid(
                entity,
                format!(
                    "state-of-charge window must satisfy 0 <= min <= max, got [{}, {}]",
                    self.soc_min_mwh, self.soc_max_mwh
                ),
            ));
        }
        if self.soc_initial_mwh < self.soc_min_mwh || self.soc_initial_mwh > self.soc_max_mwh {
            return Err(ModelError::invalid(
                entity,
                format!(
                    "initial state of charge {} outside [{}, {}]",
                    self.soc_initial_mwh, self.soc_min_mwh, self.soc_max_mwh
                ),
            ));
        }
        if self.power_limit_mw < 0.0 {
            return Err(ModelError::invalid(entity, "negative power limit"));
        }
        if !(self.efficiency > 0.0 && self.efficiency <= 1.0) {
            return Err(ModelError::invalid(
                entity,
                format!("efficiency {} outside (0, 1]", self.efficiency),
            ));
        }
        if !(self.period_hours > 0.0) {
            return Err(ModelError::invalid(entity, "period length must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_battery_is_valid() {
        assert!(Battery::default().validate().is_ok());
    }

    #[test]
    fn test_initial_soc_outside_window_rejected() {
        let battery = Battery {
            soc_max_mwh: 600.0,
            soc_initial_mwh: 700.0,
            power_limit_mw: 150.0,
            ..Default::default()
        };
        assert!(matches!(
            battery.validate(),
            Err(ModelError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_efficiency_above_one_rejected() {
        let battery = Battery {
            efficiency: 1.1,
            ..Default::default()
        };
        assert!(battery.validate().is_err());
    }
}
