//! Typed tabular inputs and system assembly.
//!
//! Rows mirror the upstream parameter tables (generation units, load
//! locations, transmission lines, zone membership, the system demand
//! profile, and per-unit availability scenarios). Parsing files into these
//! rows is the caller's concern; `assemble` only applies the registry and
//! topology invariants.

use crate::error::{ModelError, ModelResult};
use crate::registry::{GenCategory, GenerationUnitSpec, LoadUnitSpec, Registry, ReserveOffer};
use crate::system::MarketSystem;
use crate::topology::Topology;
use crate::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One generation unit row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRow {
    pub name: String,
    /// Host node, by name.
    pub node: String,
    pub category: GenCategory,
    pub cost: f64,
    pub pmax_mw: f64,
    pub pmin_mw: f64,
    #[serde(default = "unbounded")]
    pub ramp_up_mw: f64,
    #[serde(default = "unbounded")]
    pub ramp_down_mw: f64,
    #[serde(default)]
    pub initial_output_mw: f64,
    #[serde(default)]
    pub startup_cost: f64,
    #[serde(default = "default_on")]
    pub initially_on: bool,
    #[serde(default)]
    pub reserve: Option<ReserveOffer>,
}

fn unbounded() -> f64 {
    f64::INFINITY
}

fn default_on() -> bool {
    true
}

/// One load-location row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadRow {
    pub name: String,
    /// Host node, by name.
    pub node: String,
    pub bid_price: f64,
    /// Fraction of system demand carried by this load.
    pub demand_share: f64,
}

/// One transmission line row. The table carries reactance; susceptance is
/// its reciprocal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineRow {
    pub from: String,
    pub to: String,
    pub reactance: f64,
    pub capacity_mw: f64,
}

/// Zone membership row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneRow {
    pub zone: String,
    pub nodes: Vec<String>,
}

/// Availability scenario for one intermittent unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityRow {
    pub unit: String,
    pub factors: Vec<f64>,
}

/// The full tabular input of one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemTables {
    pub nodes: Vec<String>,
    #[serde(default)]
    pub lines: Vec<LineRow>,
    #[serde(default)]
    pub zones: Vec<ZoneRow>,
    pub generators: Vec<GenerationRow>,
    pub loads: Vec<LoadRow>,
    /// Total system demand per period (MW); its length is the horizon.
    pub demand_mw: Vec<f64>,
    /// Availability series per unit. Units without a row get full
    /// availability.
    #[serde(default)]
    pub availability: Vec<AvailabilityRow>,
}

/// Build a validated [`MarketSystem`] from tabular inputs. Attach a battery
/// afterwards with [`MarketSystem::with_battery`].
pub fn assemble(tables: &SystemTables) -> ModelResult<MarketSystem> {
    let horizon = tables.demand_mw.len();
    let mut topology = Topology::new();
    let mut node_ids: HashMap<&str, NodeId> = HashMap::new();
    for name in &tables.nodes {
        let id = topology.add_node(name.clone())?;
        node_ids.insert(name.as_str(), id);
    }

    let lookup = |name: &str| -> ModelResult<NodeId> {
        node_ids
            .get(name)
            .copied()
            .ok_or_else(|| ModelError::invalid(format!("node {name:?}"), "not in the node table"))
    };

    for row in &tables.lines {
        if !(row.reactance > 0.0) {
            return Err(ModelError::invalid(
                format!("line {}-{}", row.from, row.to),
                format!("reactance {} must be positive", row.reactance),
            ));
        }
        topology.add_line(
            lookup(&row.from)?,
            lookup(&row.to)?,
            1.0 / row.reactance,
            row.capacity_mw,
        )?;
    }

    for row in &tables.zones {
        let zone = topology.add_zone(row.zone.clone())?;
        for node in &row.nodes {
            topology.assign_zone(lookup(node)?, zone)?;
        }
    }

    let availability: HashMap<&str, &[f64]> = tables
        .availability
        .iter()
        .map(|row| (row.unit.as_str(), row.factors.as_slice()))
        .collect();

    let mut registry = Registry::new();
    for row in &tables.generators {
        let factors = match availability.get(row.name.as_str()) {
            Some(series) => series.to_vec(),
            None => vec![1.0; horizon],
        };
        registry.add_generation_unit(GenerationUnitSpec {
            name: row.name.clone(),
            node: lookup(&row.node)?,
            category: row.category,
            marginal_cost: row.cost,
            pmin_mw: row.pmin_mw,
            pmax_mw: row.pmax_mw,
            availability: factors,
            ramp_up_mw: row.ramp_up_mw,
            ramp_down_mw: row.ramp_down_mw,
            initial_output_mw: row.initial_output_mw,
            startup_cost: row.startup_cost,
            initially_on: row.initially_on,
            reserve: row.reserve.clone(),
        })?;
    }
    for row in &tables.loads {
        registry.add_load_unit(
            LoadUnitSpec {
                name: row.name.clone(),
                node: lookup(&row.node)?,
                bid_price: row.bid_price,
                demand_share: row.demand_share,
            },
            &tables.demand_mw,
        )?;
    }

    MarketSystem::new(registry, topology, None, horizon)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables() -> SystemTables {
        SystemTables {
            nodes: vec!["n1".to_string(), "n2".to_string()],
            lines: vec![LineRow {
                from: "n1".to_string(),
                to: "n2".to_string(),
                reactance: 0.2,
                capacity_mw: 30.0,
            }],
            zones: vec![],
            generators: vec![GenerationRow {
                name: "g1".to_string(),
                node: "n1".to_string(),
                category: GenCategory::Dispatchable,
                cost: 10.0,
                pmax_mw: 100.0,
                pmin_mw: 0.0,
                ramp_up_mw: f64::INFINITY,
                ramp_down_mw: f64::INFINITY,
                initial_output_mw: 0.0,
                startup_cost: 0.0,
                initially_on: true,
                reserve: None,
            }],
            loads: vec![LoadRow {
                name: "l1".to_string(),
                node: "n2".to_string(),
                bid_price: 50.0,
                demand_share: 1.0,
            }],
            demand_mw: vec![50.0, 60.0],
            availability: vec![],
        }
    }

    #[test]
    fn test_assemble_round_trip() {
        let system = assemble(&tables()).unwrap();
        assert_eq!(system.horizon(), 2);
        assert_eq!(system.registry().num_gens(), 1);
        let susceptance = system
            .topology()
            .line_between(NodeId::new(0), NodeId::new(1))
            .unwrap()
            .unwrap()
            .susceptance;
        assert!((susceptance - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_node_name_rejected() {
        let mut bad = tables();
        bad.loads[0].node = "nowhere".to_string();
        assert!(assemble(&bad).is_err());
    }

    #[test]
    fn test_rows_deserialize_with_defaults() {
        let row: GenerationRow = serde_json::from_str(
            r#"{
                "name": "g1",
                "node": "n1",
                "category": "dispatchable",
                "cost": 10.0,
                "pmax_mw": 100.0,
                "pmin_mw": 0.0
            }"#,
        )
        .unwrap();
        assert!(row.ramp_up_mw.is_infinite());
        assert!(row.initially_on);
        assert!(row.reserve.is_none());
    }
}
