//! Map addressing, height-field access, and mesher configuration.
#![forbid(unsafe_code)]

pub mod config;
mod coord;
mod field;
pub mod seeds;

pub use config::{MaterialTag, MeshConfig};
pub use coord::{Axis, CutCoord, Dir, EdgeId, GridCoord};
pub use field::{Deferred, GridRect, HeightField, HeightGrid, MapWindow, TileKind};
pub use seeds::{CutRandom, WorldSeed, edge_rng};
