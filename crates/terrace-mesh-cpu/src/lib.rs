//! CPU ridge meshing: break detection, tile classification, seam synthesis and
//! per-cut part storage (engine-only, no renderer dependency).
#![forbid(unsafe_code)]

pub mod break_field;
pub mod classify;
pub mod connect;
pub mod edge_chain;
mod emit;
mod error;
pub mod ground;
mod mesh_build;
pub mod part;
mod ridge_cut;
mod store;
pub mod tile;

pub use break_field::{BreakField, BreakFlags, edge_breaks};
pub use classify::{Diagonal, TileClass, classify};
pub use connect::{StripSide, connect, stitch};
pub use edge_chain::{ChainArena, ChainId, EdgeChain};
pub use emit::{CountingSink, MeshSink};
pub use error::BuildError;
pub use ground::{flat_tile, split_quad};
pub use mesh_build::{MeshBuild, MeshVertex};
pub use part::{MeshPart, RidgePart};
pub use ridge_cut::{ClassCounts, CutMeshCpu, RidgeCut, emit_ground, emit_ridge};
pub use store::{PartId, PartStore, TileRecord};
pub use tile::TileGeometry;
