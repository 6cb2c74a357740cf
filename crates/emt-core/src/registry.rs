//! Flat, id-indexed storage for generation and load units.
//!
//! Units are appended once during input assembly and looked up by copyable
//! ids afterwards. All attribute validation happens on insert; a rejected
//! unit leaves the registry untouched.

use crate::error::{ModelError, ModelResult};
use crate::{GenUnitId, LoadUnitId, NodeId};
use serde::{Deserialize, Serialize};

/// Bid/offer category of a generation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenCategory {
    /// Conventional thermal unit, fully dispatchable.
    Dispatchable,
    /// Weather-driven unit whose output is capped by an availability series.
    Intermittent,
}

/// Standing reserve offer of a generation unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReserveOffer {
    /// Maximum upward reserve capacity (MW).
    pub up_capacity_mw: f64,
    /// Maximum downward reserve capacity (MW).
    pub down_capacity_mw: f64,
    /// Offer price for upward reserve ($/MW).
    pub up_price: f64,
    /// Offer price for downward reserve ($/MW).
    pub down_price: f64,
}

/// A generation unit as stored in the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationUnit {
    pub id: GenUnitId,
    pub name: String,
    /// Host node.
    pub node: NodeId,
    pub category: GenCategory,
    /// Marginal production cost ($/MWh).
    pub marginal_cost: f64,
    pub pmin_mw: f64,
    pub pmax_mw: f64,
    /// Per-period fraction of `pmax_mw` actually available.
    pub availability: Vec<f64>,
    /// Maximum output increase per period (MW). Infinite means unconstrained.
    pub ramp_up_mw: f64,
    /// Maximum output decrease per period (MW). Infinite means unconstrained.
    pub ramp_down_mw: f64,
    /// Output in the period before the horizon starts, for the period-0 ramp.
    pub initial_output_mw: f64,
    /// Cost of switching the unit on ($), used by unit commitment.
    pub startup_cost: f64,
    /// Commitment state in the period before the horizon starts.
    pub initially_on: bool,
    pub reserve: Option<ReserveOffer>,
}

/// Attributes for [`Registry::add_generation_unit`].
#[derive(Debug, Clone)]
pub struct GenerationUnitSpec {
    pub name: String,
    pub node: NodeId,
    pub category: GenCategory,
    pub marginal_cost: f64,
    pub pmin_mw: f64,
    pub pmax_mw: f64,
    pub availability: Vec<f64>,
    pub ramp_up_mw: f64,
    pub ramp_down_mw: f64,
    pub initial_output_mw: f64,
    pub startup_cost: f64,
    pub initially_on: bool,
    pub reserve: Option<ReserveOffer>,
}

/// A load unit as stored in the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadUnit {
    pub id: LoadUnitId,
    pub name: String,
    /// Host node.
    pub node: NodeId,
    /// Willingness to pay ($/MWh).
    pub bid_price: f64,
    /// Fraction of total system demand carried by this unit.
    pub demand_share: f64,
    /// Per-period demand of this unit (MW), system demand times share.
    pub needed_demand_mw: Vec<f64>,
}

/// Attributes for [`Registry::add_load_unit`]. The needed-demand series is
/// derived from the system demand series and the unit's share.
#[derive(Debug, Clone)]
pub struct LoadUnitSpec {
    pub name: String,
    pub node: NodeId,
    pub bid_price: f64,
    pub demand_share: f64,
}

/// Flat storage for all generation and load units of one system.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Registry {
    gens: Vec<GenerationUnit>,
    loads: Vec<LoadUnit>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and append a generation unit, returning its id.
    pub fn add_generation_unit(&mut self, spec: GenerationUnitSpec) -> ModelResult<GenUnitId> {
        if self.gens.iter().any(|g| g.name == spec.name) {
            return Err(ModelError::DuplicateId {
                kind: "generation unit",
                name: spec.name,
            });
        }
        validate_generation_spec(&spec)?;

        let id = GenUnitId::new(self.gens.len());
        self.gens.push(GenerationUnit {
            id,
            name: spec.name,
            node: spec.node,
            category: spec.category,
            marginal_cost: spec.marginal_cost,
            pmin_mw: spec.pmin_mw,
            pmax_mw: spec.pmax_mw,
            availability: spec.availability,
            ramp_up_mw: spec.ramp_up_mw,
            ramp_down_mw: spec.ramp_down_mw,
            initial_output_mw: spec.initial_output_mw,
            startup_cost: spec.startup_cost,
            initially_on: spec.initially_on,
            reserve: spec.reserve,
        });
        Ok(id)
    }

    /// Validate and append a load unit, deriving its needed-demand series
    /// from the system demand series.
    pub fn add_load_unit(
        &mut self,
        spec: LoadUnitSpec,
        system_demand_mw: &[f64],
    ) -> ModelResult<LoadUnitId> {
        if self.loads.iter().any(|l| l.name == spec.name) {
            return Err(ModelError::DuplicateId {
                kind: "load unit",
                name: spec.name,
            });
        }
        let entity = format!("load unit {}", spec.name);
        if !(0.0..=1.0).contains(&spec.demand_share) {
            return Err(ModelError::invalid(
                entity,
                format!("demand share {} outside [0, 1]", spec.demand_share),
            ));
        }
        if spec.bid_price < 0.0 {
            return Err(ModelError::invalid(
                entity,
                format!("negative bid price {}", spec.bid_price),
            ));
        }
        if let Some(d) = system_demand_mw.iter().find(|d| !d.is_finite() || **d < 0.0) {
            return Err(ModelError::invalid(
                entity,
                format!("system demand value {d} is not a finite non-negative quantity"),
            ));
        }

        let id = LoadUnitId::new(self.loads.len());
        self.loads.push(LoadUnit {
            id,
            name: spec.name,
            node: spec.node,
            bid_price: spec.bid_price,
            demand_share: spec.demand_share,
            needed_demand_mw: system_demand_mw
                .iter()
                .map(|d| d * spec.demand_share)
                .collect(),
        });
        Ok(id)
    }

    pub fn gen(&self, id: GenUnitId) -> &GenerationUnit {
        &self.gens[id.value()]
    }

    pub fn load(&self, id: LoadUnitId) -> &LoadUnit {
        &self.loads[id.value()]
    }

    pub fn gens(&self) -> &[GenerationUnit] {
        &self.gens
    }

    pub fn loads(&self) -> &[LoadUnit] {
        &self.loads
    }

    pub fn num_gens(&self) -> usize {
        self.gens.len()
    }

    pub fn num_loads(&self) -> usize {
        self.loads.len()
    }

    /// Generation units hosted at `node`.
    pub fn gen_ids_at_node(&self, node: NodeId) -> Vec<GenUnitId> {
        self.gens
            .iter()
            .filter(|g| g.node == node)
            .map(|g| g.id)
            .collect()
    }

    /// Load units hosted at `node`.
    pub fn load_ids_at_node(&self, node: NodeId) -> Vec<LoadUnitId> {
        self.loads
            .iter()
            .filter(|l| l.node == node)
            .map(|l| l.id)
            .collect()
    }
}

fn validate_generation_spec(spec: &GenerationUnitSpec) -> ModelResult<()> {
    let entity = format!("generation unit {}", spec.name);
    if spec.pmin_mw < 0.0 || spec.pmax_mw < spec.pmin_mw {
        return Err(ModelError::invalid(
            entity,
            format!(
                "capacity bounds must satisfy 0 <= pmin <= pmax, got [{}, {}]",
                spec.pmin_mw, spec.pmax_mw
            ),
        ));
    }
    if spec.marginal_cost < 0.0 {
        return Err(ModelError::invalid(
            entity,
            format!("negative marginal cost {}", spec.marginal_cost),
        ));
    }
    if let Some(a) = spec
        .availability
        .iter()
        .find(|a| !(0.0..=1.0).contains(*a))
    {
        return Err(ModelError::invalid(
            entity,
            format!("availability factor {a} outside [0, 1]"),
        ));
    }
    if spec.ramp_up_mw < 0.0 || spec.ramp_down_mw < 0.0 {
        return Err(ModelError::invalid(entity, "negative ramp limit"));
    }
    if spec.initial_output_mw < 0.0 {
        return Err(ModelError::invalid(entity, "negative initial output"));
    }
    if spec.startup_cost < 0.0 {
        return Err(ModelError::invalid(entity, "negative startup cost"));
    }
    if let Some(reserve) = &spec.reserve {
        if reserve.up_capacity_mw < 0.0
            || reserve.down_capacity_mw < 0.0
            || reserve.up_price < 0.0
            || reserve.down_price < 0.0
        {
            return Err(ModelError::invalid(
                entity,
                "reserve capacities and offer prices must be non-negative",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gen_spec(name: &str) -> GenerationUnitSpec {
        GenerationUnitSpec {
            name: name.to_string(),
            node: NodeId::new(0),
            category: GenCategory::Dispatchable,
            marginal_cost: 12.0,
            pmin_mw: 0.0,
            pmax_mw: 100.0,
            availability: vec![1.0; 4],
            ramp_up_mw: 50.0,
            ramp_down_mw: 50.0,
            initial_output_mw: 0.0,
            startup_cost: 0.0,
            initially_on: true,
            reserve: None,
        }
    }

    #[test]
    fn test_add_and_lookup() {
        let mut registry = Registry::new();
        let id = registry.add_generation_unit(gen_spec("g1")).unwrap();
        assert_eq!(registry.gen(id).name, "g1");
        assert_eq!(registry.num_gens(), 1);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = Registry::new();
        registry.add_generation_unit(gen_spec("g1")).unwrap();
        let err = registry.add_generation_unit(gen_spec("g1")).unwrap_err();
        assert!(matches!(err, ModelError::DuplicateId { .. }));
        // failed insert leaves the registry unchanged
        assert_eq!(registry.num_gens(), 1);
    }

    #[test]
    fn test_inverted_capacity_bounds_rejected() {
        let mut registry = Registry::new();
        let mut spec = gen_spec("g1");
        spec.pmin_mw = 50.0;
        spec.pmax_mw = 20.0;
        assert!(matches!(
            registry.add_generation_unit(spec),
            Err(ModelError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_availability_outside_unit_interval_rejected() {
        let mut registry = Registry::new();
        let mut spec = gen_spec("g1");
        spec.availability = vec![1.0, 1.2];
        assert!(matches!(
            registry.add_generation_unit(spec),
            Err(ModelError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_load_demand_share_derives_series() {
        let mut registry = Registry::new();
        let id = registry
            .add_load_unit(
                LoadUnitSpec {
                    name: "l1".to_string(),
                    node: NodeId::new(0),
                    bid_price: 50.0,
                    demand_share: 0.25,
                },
                &[100.0, 200.0],
            )
            .unwrap();
        assert_eq!(registry.load(id).needed_demand_mw, vec![25.0, 50.0]);
    }

    #[test]
    fn test_negative_system_demand_rejected() {
        let mut registry = Registry::new();
        let err = registry
            .add_load_unit(
                LoadUnitSpec {
                    name: "l1".to_string(),
                    node: NodeId::new(0),
                    bid_price: 50.0,
                    demand_share: 0.5,
                },
                &[100.0, -1.0],
            )
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidRange { .. }));
    }

    #[test]
    fn test_units_at_node() {
        let mut registry = Registry::new();
        let mut near = gen_spec("g1");
        near.node = NodeId::new(3);
        let mut far = gen_spec("g2");
        far.node = NodeId::new(5);
        let near_id = registry.add_generation_unit(near).unwrap();
        registry.add_generation_unit(far).unwrap();
        assert_eq!(registry.gen_ids_at_node(NodeId::new(3)), vec![near_id]);
        assert!(registry.gen_ids_at_node(NodeId::new(9)).is_empty());
    }
}
