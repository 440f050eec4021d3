#![doc = include_str!("../README.md")]
use std::hash::BuildHasherDefault;

use indexmap::IndexMap;
use rustc_hash::FxHasher;

mod macros;

pub mod agent;
pub mod amphibious;
pub mod block;
pub mod cache;
pub mod context;
pub mod dir;
pub mod evaluator;
pub mod fly;
mod open_set;
pub mod node;
pub mod path;
pub mod path_type;
pub mod pathfind;
pub mod plugin;
pub mod settings;
pub mod swim;
pub mod terrain;
pub mod walk;
pub mod world;

pub mod prelude {
    pub use crate::agent::{Aabb, Agent};
    pub use crate::amphibious::AmphibiousNodeEvaluator;
    pub use crate::block::{BlockKind, BlockState, Fluid};
    pub use crate::cache::PathTypeCache;
    pub use crate::context::PathfindingContext;
    pub use crate::evaluator::{Capabilities, NavError, NodeEvaluator};
    pub use crate::fly::FlyNodeEvaluator;
    pub use crate::node::{Node, NodePool, Target};
    pub use crate::path::Path;
    pub use crate::path_type::{MalusTable, PathType};
    pub use crate::pathfind::{PathFinder, PathRequest};
    #[cfg(feature = "parallel")]
    pub use crate::pathfind::find_paths_parallel;
    pub use crate::plugin::{BlockChanged, MobNavPlugin};
    pub use crate::settings::{SearchSettings, SearchSettingsBuilder};
    pub use crate::swim::SwimNodeEvaluator;
    pub use crate::terrain::{Terrain, VoxelTerrain};
    pub use crate::walk::WalkNodeEvaluator;
    pub use crate::world::VoxelWorld;
    pub use crate::NodeId;
}

/// Index of a [`node::Node`] in the [`node::NodePool`] of the current search.
pub type NodeId = usize;

/// Upper bound on the neighbours any evaluator reports for one node.
pub const MAX_NEIGHBORS: usize = 32;

type FxIndexMap<K, V> = IndexMap<K, V, BuildHasherDefault<FxHasher>>;
