//! Layout engine configuration.
//!
//! Every field has a default; a JSON file only needs the keys it overrides.

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::color::Palette;
use crate::error::LayoutError;
use crate::measure::TextMetrics;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LayoutConfig {
    /// Margin around single packings and the cross
    #[serde(default = "default_margin")]
    pub margin: f64,

    /// Margin around grouped packings and bar charts
    #[serde(default = "default_grouped_margin")]
    pub grouped_margin: f64,

    /// Minimum gap between packed circles, in pixels
    #[serde(default = "default_circle_padding")]
    pub circle_padding: f64,

    #[serde(default = "default_grid_columns")]
    pub grid_columns: usize,

    /// Compaction passes run after the front-chain placement
    #[serde(default = "default_relax_passes")]
    pub relax_passes: usize,

    /// Vertical gap between a cluster disk and its title
    #[serde(default = "default_title_gap")]
    pub title_gap: f64,

    /// Amount represented by one square pixel of a summary badge
    #[serde(default = "default_badge_amount_per_px2")]
    pub badge_amount_per_px2: f64,

    #[serde(default)]
    pub palette: Palette,

    #[serde(default)]
    pub cross: CrossConfig,

    #[serde(default)]
    pub barplot: BarplotConfig,

    #[serde(default)]
    pub text: TextMetrics,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            margin: default_margin(),
            grouped_margin: default_grouped_margin(),
            circle_padding: default_circle_padding(),
            grid_columns: default_grid_columns(),
            relax_passes: default_relax_passes(),
            title_gap: default_title_gap(),
            badge_amount_per_px2: default_badge_amount_per_px2(),
            palette: Palette::default(),
            cross: CrossConfig::default(),
            barplot: BarplotConfig::default(),
            text: TextMetrics::default(),
        }
    }
}

fn default_margin() -> f64 {
    15.0
}

fn default_grouped_margin() -> f64 {
    20.0
}

fn default_circle_padding() -> f64 {
    3.0
}

fn default_grid_columns() -> usize {
    6
}

fn default_relax_passes() -> usize {
    2
}

fn default_title_gap() -> f64 {
    12.0
}

fn default_badge_amount_per_px2() -> f64 {
    100_000.0
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CrossConfig {
    /// Arm thickness as a share of the cross side
    #[serde(default = "default_arm_ratio")]
    pub arm_ratio: f64,

    /// Share of the cross area covered by circles
    #[serde(default = "default_fill_ratio")]
    pub fill_ratio: f64,

    #[serde(default = "default_cross_iterations")]
    pub iterations: usize,

    #[serde(default = "default_seed")]
    pub seed: u64,

    #[serde(default = "default_cross_padding")]
    pub padding: f64,

    #[serde(default = "default_boundary_strength")]
    pub boundary_strength: f64,
}

impl Default for CrossConfig {
    fn default() -> Self {
        Self {
            arm_ratio: default_arm_ratio(),
            fill_ratio: default_fill_ratio(),
            iterations: default_cross_iterations(),
            seed: default_seed(),
            padding: default_cross_padding(),
            boundary_strength: default_boundary_strength(),
        }
    }
}

fn default_arm_ratio() -> f64 {
    0.3
}

fn default_fill_ratio() -> f64 {
    0.55
}

fn default_cross_iterations() -> usize {
    200
}

fn default_seed() -> u64 {
    2024
}

fn default_cross_padding() -> f64 {
    2.0
}

fn default_boundary_strength() -> f64 {
    0.1
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BarplotConfig {
    /// Space left of the first bar for the value axis
    #[serde(default = "default_axis_margin")]
    pub axis_margin: f64,

    #[serde(default = "default_band_padding")]
    pub band_padding: f64,

    /// Share of the bounds height available to bars
    #[serde(default = "default_height_share")]
    pub height_share: f64,

    #[serde(default = "default_pixels_per_tick")]
    pub pixels_per_tick: f64,

    /// Gap between the baseline and the bar labels
    #[serde(default = "default_label_offset")]
    pub label_offset: f64,
}

impl Default for BarplotConfig {
    fn default() -> Self {
        Self {
            axis_margin: default_axis_margin(),
            band_padding: default_band_padding(),
            height_share: default_height_share(),
            pixels_per_tick: default_pixels_per_tick(),
            label_offset: default_label_offset(),
        }
    }
}

fn default_axis_margin() -> f64 {
    70.0
}

fn default_band_padding() -> f64 {
    0.3
}

fn default_height_share() -> f64 {
    2.0 / 3.0
}

fn default_pixels_per_tick() -> f64 {
    70.0
}

fn default_label_offset() -> f64 {
    10.0
}

impl LayoutConfig {
    pub fn from_json(json: &str) -> Result<Self, LayoutError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, LayoutError> {
        let json = fs::read_to_string(path).map_err(|e| {
            LayoutError::config("config", format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }
}
