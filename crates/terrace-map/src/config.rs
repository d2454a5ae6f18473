use serde::Deserialize;
use std::error::Error;
use std::fs;
use std::path::Path;

/// Material slot handed to the mesh sink alongside each triangle batch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
pub struct MaterialTag(pub u16);

#[derive(Clone, Debug, Deserialize)]
pub struct MeshConfig {
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default)]
    pub grid: Grid,
    #[serde(default)]
    pub ridge: Ridge,
    #[serde(default)]
    pub flow: Flow,
    #[serde(default)]
    pub bottom: Bottom,
    #[serde(default)]
    pub materials: Materials,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            grid: Grid::default(),
            ridge: Ridge::default(),
            flow: Flow::default(),
            bottom: Bottom::default(),
            materials: Materials::default(),
        }
    }
}

impl MeshConfig {
    pub fn from_toml_str(toml_str: &str) -> Result<Self, Box<dyn Error>> {
        let cfg: MeshConfig = toml::from_str(toml_str)?;
        if cfg.grid.cut_size == 0 {
            return Err("grid.cut_size must be positive".into());
        }
        if cfg.ridge.segment_height <= 0.0 {
            return Err("ridge.segment_height must be positive".into());
        }
        Ok(cfg)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Box<dyn Error>> {
        let s = fs::read_to_string(path)?;
        Self::from_toml_str(&s)
    }
}

fn default_seed() -> u64 {
    0x5eed_7e44
}

#[derive(Clone, Debug, Deserialize)]
pub struct Grid {
    #[serde(default = "default_cut_size")]
    pub cut_size: usize,
    #[serde(default = "default_tile_size")]
    pub tile_size: f32,
}
fn default_cut_size() -> usize {
    16
}
fn default_tile_size() -> f32 {
    11.0
}
impl Default for Grid {
    fn default() -> Self {
        Self {
            cut_size: default_cut_size(),
            tile_size: default_tile_size(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Ridge {
    /// Vertical drop covered by one edge-chain segment.
    #[serde(default = "default_segment_height")]
    pub segment_height: f32,
    /// Largest lateral offset of a chain end, as a fraction of the tile size.
    #[serde(default = "default_lateral_jitter")]
    pub lateral_jitter: f32,
    /// Largest mid-height bow, as a fraction of the tile size.
    #[serde(default = "default_belly")]
    pub belly: f32,
    /// Vertical jitter of interior chain points, as a fraction of one segment.
    #[serde(default = "default_height_jitter")]
    pub height_jitter: f32,
    /// Physical height covered by one repeat of the ridge texture.
    #[serde(default = "default_texture_height")]
    pub texture_height: f32,
}
fn default_segment_height() -> f32 {
    8.0
}
fn default_lateral_jitter() -> f32 {
    0.25
}
fn default_belly() -> f32 {
    0.1
}
fn default_height_jitter() -> f32 {
    0.15
}
fn default_texture_height() -> f32 {
    16.0
}
impl Default for Ridge {
    fn default() -> Self {
        Self {
            segment_height: default_segment_height(),
            lateral_jitter: default_lateral_jitter(),
            belly: default_belly(),
            height_jitter: default_height_jitter(),
            texture_height: default_texture_height(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Flow {
    #[serde(default = "default_flow_passes")]
    pub passes: usize,
    /// Extra corners solved around the cut so border corners see their neighbours.
    #[serde(default = "default_flow_margin")]
    pub margin: usize,
    #[serde(default = "default_slope_max")]
    pub slope_max: f32,
    #[serde(default = "default_pressure_fraction")]
    pub pressure_fraction: f32,
    /// Velocities at or below this magnitude count as still water.
    #[serde(default = "default_foam_epsilon")]
    pub foam_epsilon: f32,
}
fn default_flow_passes() -> usize {
    10
}
fn default_flow_margin() -> usize {
    11
}
fn default_slope_max() -> f32 {
    4.0
}
fn default_pressure_fraction() -> f32 {
    0.25
}
fn default_foam_epsilon() -> f32 {
    1e-4
}
impl Default for Flow {
    fn default() -> Self {
        Self {
            passes: default_flow_passes(),
            margin: default_flow_margin(),
            slope_max: default_slope_max(),
            pressure_fraction: default_pressure_fraction(),
            foam_epsilon: default_foam_epsilon(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Bottom {
    #[serde(default = "default_bottom_passes")]
    pub passes: usize,
    #[serde(default = "default_bottom_margin")]
    pub margin: usize,
}
fn default_bottom_passes() -> usize {
    8
}
fn default_bottom_margin() -> usize {
    8
}
impl Default for Bottom {
    fn default() -> Self {
        Self {
            passes: default_bottom_passes(),
            margin: default_bottom_margin(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Materials {
    #[serde(default = "default_ground_mat")]
    pub ground: MaterialTag,
    #[serde(default = "default_ridge_mat")]
    pub ridge: MaterialTag,
    #[serde(default = "default_water_mat")]
    pub water: MaterialTag,
    #[serde(default = "default_foam_mat")]
    pub foam: MaterialTag,
    #[serde(default = "default_bottom_mat")]
    pub bottom: MaterialTag,
    #[serde(default = "default_ground_transition_mat")]
    pub ground_transition: MaterialTag,
    /// Declaring this gives the bottom material its own shoreline transition.
    #[serde(default)]
    pub bottom_transition: Option<MaterialTag>,
}
fn default_ground_mat() -> MaterialTag {
    MaterialTag(0)
}
fn default_ridge_mat() -> MaterialTag {
    MaterialTag(1)
}
fn default_water_mat() -> MaterialTag {
    MaterialTag(2)
}
fn default_foam_mat() -> MaterialTag {
    MaterialTag(3)
}
fn default_bottom_mat() -> MaterialTag {
    MaterialTag(4)
}
fn default_ground_transition_mat() -> MaterialTag {
    MaterialTag(5)
}
impl Default for Materials {
    fn default() -> Self {
        Self {
            ground: default_ground_mat(),
            ridge: default_ridge_mat(),
            water: default_water_mat(),
            foam: default_foam_mat(),
            bottom: default_bottom_mat(),
            ground_transition: default_ground_transition_mat(),
            bottom_transition: None,
        }
    }
}
