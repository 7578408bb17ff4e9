//! Data structures produced by the layout stages.

use serde::Serialize;

use crate::grant::{Category, GrantRecord};
use crate::scale::{BandScale, LinearScale, SqrtScale};

/// Drawable area, after margins.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn min_side(&self) -> f64 {
        self.width.min(self.height)
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Input to the packers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedItem {
    pub id: i64,
    pub weight: f64,
}

/// Bare packing result, before decoration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PackedCircle {
    pub id: i64,
    pub cx: f64,
    pub cy: f64,
    pub r: f64,
}

/// A circle ready for rendering, with its tooltip fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircleDatum {
    pub id: i64,
    pub cx: f64,
    pub cy: f64,
    pub r: f64,
    pub fill: String,
    pub title: String,
    pub amount: f64,
    pub category: Category,
    pub field: String,
}

impl CircleDatum {
    pub fn from_grant(grant: &GrantRecord, cx: f64, cy: f64, r: f64, fill: impl Into<String>) -> Self {
        Self {
            id: grant.id,
            cx,
            cy,
            r: r.max(0.0),
            fill: fill.into(),
            title: grant.title.clone(),
            amount: grant.amount,
            category: grant.category,
            field: grant.field.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterSummary {
    pub key: String,
    pub total_amount: f64,
    pub item_count: usize,
    /// Center of the cluster's grid cell
    pub anchor: Point,
    /// Radius of the packed cluster disk
    pub radius: f64,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RectangleDatum {
    /// Left edge
    pub x: f64,
    /// Top edge
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub fill: String,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAnchor {
    Start,
    Middle,
    End,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelDatum {
    pub text: String,
    /// `text` wrapped for display
    pub lines: Vec<String>,
    pub x: f64,
    pub y: f64,
    pub anchor: TextAnchor,
    pub fill: String,
    /// Clockwise rotation in degrees around (x, y)
    pub rotation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisTick {
    pub value: f64,
    /// Pixel offset from the baseline, growing upward
    pub offset: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisDescriptor {
    pub title: String,
    pub ticks: Vec<AxisTick>,
    /// X coordinate of the value axis
    pub origin_x: f64,
    /// Y coordinate of the category axis
    pub baseline_y: f64,
    /// Center of each band, in domain order
    pub band_centers: Vec<f64>,
}

/// Bars and their axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarLayout {
    pub rectangles: Vec<RectangleDatum>,
    pub labels: Vec<LabelDatum>,
    pub axis: AxisDescriptor,
    /// `None` when there is no cluster to draw
    pub x_scale: Option<BandScale>,
    pub y_scale: LinearScale,
}

/// Output of a grouped packing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterLayout {
    pub circles: Vec<CircleDatum>,
    pub clusters: Vec<ClusterSummary>,
    pub labels: Vec<LabelDatum>,
}

/// Everything a renderer needs for one chart state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    pub mode: String,
    pub bounds: Bounds,
    /// Offset of the bounds inside the container
    pub margin: f64,
    pub circles: Vec<CircleDatum>,
    pub rectangles: Vec<RectangleDatum>,
    pub labels: Vec<LabelDatum>,
    pub clusters: Vec<ClusterSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radius_scale: Option<SqrtScale>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_scale: Option<BandScale>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_scale: Option<LinearScale>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub axis: Option<AxisDescriptor>,
}
