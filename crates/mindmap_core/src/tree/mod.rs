//! In-memory mind-map trees: assembly, browsing and restore from disk.

pub mod assembly;
pub mod node_store;
pub mod restore;

pub use assembly::{
    apply_radial_layout, apply_tree_layout, assemble_outline, OutlineEntry, MAX_OUTLINE_DEPTH,
};
pub use node_store::{NodeExpansion, NodeStore};
pub use restore::{restore_mind_map, RestoreError, RestoredTree};
