//! The assembled market system: registry, topology, storage, horizon.
//!
//! `MarketSystem::new` is the single choke point where cross-entity
//! invariants are checked, so formulation builders can index freely without
//! re-validating.

use crate::error::{ModelError, ModelResult};
use crate::registry::Registry;
use crate::storage::{Battery, BatterySite};
use crate::topology::Topology;
use crate::{GenUnitId, LoadUnitId, ZoneId};

/// An immutable, validated snapshot of everything one clearing run needs.
#[derive(Debug, Clone)]
pub struct MarketSystem {
    registry: Registry,
    topology: Topology,
    battery: Option<Battery>,
    horizon: usize,
}

impl MarketSystem {
    /// Assemble and cross-validate a system.
    ///
    /// Checks that every unit's host node is registered, that every
    /// per-period series has exactly `horizon` entries, and that battery
    /// parameters are well formed and sited on known locations.
    pub fn new(
        registry: Registry,
        topology: Topology,
        battery: Option<Battery>,
        horizon: usize,
    ) -> ModelResult<Self> {
        if horizon == 0 {
            return Err(ModelError::invalid("system", "horizon must be at least 1"));
        }
        for unit in registry.gens() {
            if unit.node.value() >= topology.num_nodes() {
                return Err(ModelError::UnknownNode(unit.node));
            }
            if unit.availability.len() != horizon {
                return Err(ModelError::invalid(
                    format!("generation unit {}", unit.name),
                    format!(
                        "availability series has {} entries, horizon is {horizon}",
                        unit.availability.len()
                    ),
                ));
            }
        }
        for unit in registry.loads() {
            if unit.node.value() >= topology.num_nodes() {
                return Err(ModelError::UnknownNode(unit.node));
            }
            if unit.needed_demand_mw.len() != horizon {
                return Err(ModelError::invalid(
                    format!("load unit {}", unit.name),
                    format!(
                        "needed-demand series has {} entries, horizon is {horizon}",
                        unit.needed_demand_mw.len()
                    ),
                ));
            }
        }
        if let Some(battery) = &battery {
            battery.validate()?;
            match battery.site {
                BatterySite::System => {}
                BatterySite::Node(node) => {
                    if node.value() >= topology.num_nodes() {
                        return Err(ModelError::UnknownNode(node));
                    }
                }
                BatterySite::Zone(zone) => {
                    topology.zone(zone)?;
                }
            }
        }
        Ok(Self {
            registry,
            topology,
            battery,
            horizon,
        })
    }

    /// Attach (or replace) a battery, revalidating its siting.
    pub fn with_battery(self, battery: Battery) -> ModelResult<Self> {
        Self::new(self.registry, self.topology, Some(battery), self.horizon)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn battery(&self) -> Option<&Battery> {
        self.battery.as_ref()
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    /// Total needed demand per period, summed over all load units.
    pub fn total_demand_mw(&self) -> Vec<f64> {
        let mut total = vec![0.0; self.horizon];
        for load in self.registry.loads() {
            for (t, d) in load.needed_demand_mw.iter().enumerate() {
                total[t] += d;
            }
        }
        total
    }

    /// Generation units hosted in a zone (union over its member nodes).
    pub fn zone_gen_ids(&self, zone: ZoneId) -> ModelResult<Vec<GenUnitId>> {
        let zone = self.topology.zone(zone)?;
        let mut ids = Vec::new();
        for node in &zone.members {
            ids.extend(self.registry.gen_ids_at_node(*node));
        }
        ids.sort_by_key(|id| id.value());
        Ok(ids)
    }

    /// Load units hosted in a zone (union over its member nodes).
    pub fn zone_load_ids(&self, zone: ZoneId) -> ModelResult<Vec<LoadUnitId>> {
        let zone = self.topology.zone(zone)?;
        let mut ids = Vec::new();
        for node in &zone.members {
            ids.extend(self.registry.load_ids_at_node(*node));
        }
        ids.sort_by_key(|id| id.value());
        Ok(ids)
    }
}
