//! # emt-core: Electricity Market Modeling Core
//!
//! Provides the data structures an electricity-market clearing run is built
//! from: generation and load units, the transmission network, bidding zones,
//! and battery storage parameters.
//!
//! ## Design Philosophy
//!
//! Entities live in flat arrays inside an explicit [`Registry`] and are
//! referenced by copyable newtype ids. The transmission network is an
//! undirected petgraph graph whose edge weights are [`TransmissionLine`]
//! records, so traversal works from either endpoint of a line without
//! storing a mirror record. Nodes and zones hold id lists, never embedded
//! copies of units, which keeps ownership acyclic.
//!
//! Registries and topologies are built once per run from validated inputs
//! and are immutable afterwards; market formulations borrow them and are
//! rebuilt fresh for every clearing invocation.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use emt_core::*;
//!
//! let mut topology = Topology::new();
//! let n1 = topology.add_node("n1")?;
//! let n2 = topology.add_node("n2")?;
//! topology.add_line(n1, n2, 5.0, 30.0)?;
//!
//! let mut registry = Registry::new();
//! registry.add_generation_unit(GenerationUnitSpec {
//!     name: "g1".to_string(),
//!     node: n1,
//!     category: GenCategory::Dispatchable,
//!     marginal_cost: 10.0,
//!     pmin_mw: 0.0,
//!     pmax_mw: 100.0,
//!     availability: vec![1.0; 24],
//!     ramp_up_mw: f64::INFINITY,
//!     ramp_down_mw: f64::INFINITY,
//!     initial_output_mw: 0.0,
//!     startup_cost: 0.0,
//!     initially_on: true,
//!     reserve: None,
//! })?;
//!
//! let system = MarketSystem::new(registry, topology, None, 24)?;
//! # Ok::<(), emt_core::ModelError>(())
//! ```
//!
//! ## Modules
//!
//! - [`registry`] - Generation and load unit storage
//! - [`topology`] - Nodes, transmission lines, zones
//! - [`storage`] - Battery parameters
//! - [`system`] - Assembled, cross-validated market system
//! - [`inputs`] - Typed tabular input rows and assembly
//! - [`error`] - Construction and validation errors

use serde::{Deserialize, Serialize};

pub mod error;
pub mod inputs;
pub mod registry;
pub mod storage;
pub mod system;
pub mod topology;

pub use error::{ModelError, ModelResult};
pub use inputs::{
    assemble, AvailabilityRow, GenerationRow, LineRow, LoadRow, SystemTables, ZoneRow,
};
pub use registry::{
    GenCategory, GenerationUnit, GenerationUnitSpec, LoadUnit, LoadUnitSpec, Registry,
    ReserveOffer,
};
pub use storage::{Battery, BatterySite, TerminalSoc};
pub use system::MarketSystem;
pub use topology::{Topology, TransmissionLine, Zone};

// Newtype wrappers for IDs for type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(usize);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneId(usize);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineId(usize);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GenUnitId(usize);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoadUnitId(usize);

impl NodeId {
    #[inline]
    pub fn new(value: usize) -> Self {
        NodeId(value)
    }
    #[inline]
    pub fn value(&self) -> usize {
        self.0
    }
}

impl ZoneId {
    #[inline]
    pub fn new(value: usize) -> Self {
        ZoneId(value)
    }
    #[inline]
    pub fn value(&self) -> usize {
        self.0
    }
}

impl LineId {
    #[inline]
    pub fn new(value: usize) -> Self {
        LineId(value)
    }
    #[inline]
    pub fn value(&self) -> usize {
        self.0
    }
}

impl GenUnitId {
    #[inline]
    pub fn new(value: usize) -> Self {
        GenUnitId(value)
    }
    #[inline]
    pub fn value(&self) -> usize {
        self.0
    }
}

impl LoadUnitId {
    #[inline]
    pub fn new(value: usize) -> Self {
        LoadUnitId(value)
    }
    #[inline]
    pub fn value(&self) -> usize {
        self.0
    }
}
