//! Water meshing: flow relaxation, bottom depth smoothing and per-tile water
//! fragments for a cut.
#![forbid(unsafe_code)]

pub mod depth;
pub mod flow;
mod orchestrator;
pub mod transition;

pub use depth::{DepthField, DepthSummary};
pub use flow::{FlowField, FlowSummary};
pub use orchestrator::{BottomPart, FoamPart, WaterCut, WaterTile};
pub use transition::{BottomTransition, GroundTransition, ShoreEdge, TransitionFace, TransitionHandler, select_handler};
