//! Layout engine: one pipeline per chart mode.

use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::color::{DEFAULT_FILL, category_color};
use crate::config::LayoutConfig;
use crate::error::{LayoutError, ensure_finite, ensure_positive};
use crate::grant::{GrantRecord, validate_grants};
use crate::scale::{DEFAULT_TICK_COUNT, SqrtScale};

use super::barplot::{Metric, project_bars, square_badges};
use super::cluster::ClusterGrouper;
use super::cross::{CrossPacker, CrossShape};
use super::pack::CirclePacker;
use super::types::{
    Bounds, CircleDatum, ClusterLayout, ClusterSummary, LabelDatum, Layout, Point,
    RectangleDatum, TextAnchor, WeightedItem,
};

const CAPTION_FILL: &str = "#333333";

/// Chart states of the story, in scroll order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LayoutMode {
    Cross,
    Packed,
    PackedColored,
    MultiplePacked,
    MultiplePackedByRow,
    MultiplePackedByRowToSquare,
    BarplotAmount,
    BarplotCount,
}

impl LayoutMode {
    pub const ALL: [LayoutMode; 8] = [
        Self::Cross,
        Self::Packed,
        Self::PackedColored,
        Self::MultiplePacked,
        Self::MultiplePackedByRow,
        Self::MultiplePackedByRowToSquare,
        Self::BarplotAmount,
        Self::BarplotCount,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Cross => "cross",
            Self::Packed => "packed",
            Self::PackedColored => "packedColored",
            Self::MultiplePacked => "multiplePacked",
            Self::MultiplePackedByRow => "multiplePackedByRow",
            Self::MultiplePackedByRowToSquare => "multiplePackedByRowToSquare",
            Self::BarplotAmount => "barplotAmount",
            Self::BarplotCount => "barplotCount",
        }
    }

    fn margin(self, config: &LayoutConfig) -> f64 {
        match self {
            Self::Cross | Self::Packed | Self::PackedColored => config.margin,
            _ => config.grouped_margin,
        }
    }
}

impl FromStr for LayoutMode {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cross" => Ok(Self::Cross),
            "packed" => Ok(Self::Packed),
            "packedColored" => Ok(Self::PackedColored),
            "multiplePacked" => Ok(Self::MultiplePacked),
            "multiplePackedByRow" => Ok(Self::MultiplePackedByRow),
            "multiplePackedByRowToSquare" | "multiplePackedByRowSquared" => {
                Ok(Self::MultiplePackedByRowToSquare)
            }
            "barplotAmount" | "barplot" => Ok(Self::BarplotAmount),
            "barplotCount" | "barplotGrantCounts" => Ok(Self::BarplotCount),
            _ => Err(LayoutError::UnknownMode(s.to_string())),
        }
    }
}

impl fmt::Display for LayoutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Layout engine configuration and computation.
#[derive(Debug, Clone, Default)]
pub struct LayoutEngine {
    pub(crate) config: LayoutConfig,
}

impl LayoutEngine {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Compute the layout of `grants` for `mode` in a `width` x `height`
    /// container.
    pub fn layout(
        &self,
        mode: LayoutMode,
        grants: &[GrantRecord],
        width: f64,
        height: f64,
    ) -> Result<Layout, LayoutError> {
        ensure_finite("width", width)?;
        ensure_finite("height", height)?;
        validate_grants(grants)?;

        let margin = mode.margin(&self.config);
        let bounds = Bounds::new(width - 2.0 * margin, height - 2.0 * margin);
        ensure_positive("bounds width", bounds.width)?;
        ensure_positive("bounds height", bounds.height)?;

        let mut layout = Layout {
            mode: mode.name().to_string(),
            bounds,
            margin,
            circles: vec![],
            rectangles: vec![],
            labels: vec![],
            clusters: vec![],
            radius_scale: None,
            x_scale: None,
            y_scale: None,
            axis: None,
        };

        match mode {
            LayoutMode::Cross => self.cross(grants, bounds, &mut layout)?,
            LayoutMode::Packed => self.packed(grants, bounds, false, &mut layout)?,
            LayoutMode::PackedColored => self.packed(grants, bounds, true, &mut layout)?,
            LayoutMode::MultiplePacked => self.multiple_packed(grants, bounds, &mut layout)?,
            LayoutMode::MultiplePackedByRow => {
                let rows = self.by_row(grants, bounds)?;
                layout.rectangles = rows
                    .clusters
                    .iter()
                    .map(|c| RectangleDatum {
                        x: c.anchor.x,
                        y: c.anchor.y,
                        width: 0.0,
                        height: 0.0,
                        fill: c.color.clone(),
                        label: c.key.clone(),
                    })
                    .collect();
                layout.radius_scale = radius_scale(grants, &rows.circles)?;
                layout.circles = rows.circles;
                layout.clusters = rows.clusters;
                layout.labels = rows.labels;
            }
            LayoutMode::MultiplePackedByRowToSquare => {
                let (rows, scale) = self.to_square(grants, bounds)?;
                layout.rectangles = square_badges(&rows.clusters, self.config.badge_amount_per_px2)?;
                layout.radius_scale = scale;
                layout.circles = rows.circles;
                layout.clusters = rows.clusters;
                layout.labels = rows.labels;
            }
            LayoutMode::BarplotAmount => {
                self.barplot(grants, bounds, Metric::TotalAmount, &mut layout)?
            }
            LayoutMode::BarplotCount => {
                self.barplot(grants, bounds, Metric::ItemCount, &mut layout)?
            }
        }

        tracing::debug!(
            mode = %mode,
            circles = layout.circles.len(),
            rectangles = layout.rectangles.len(),
            clusters = layout.clusters.len(),
            "Computed layout"
        );
        Ok(layout)
    }

    fn packer(&self) -> CirclePacker {
        CirclePacker {
            padding: self.config.circle_padding,
            relax_passes: self.config.relax_passes,
        }
    }

    fn cross(
        &self,
        grants: &[GrantRecord],
        bounds: Bounds,
        layout: &mut Layout,
    ) -> Result<(), LayoutError> {
        let settings = &self.config.cross;
        let side = bounds.min_side();
        let cross = CrossShape::new(side, side, settings.arm_ratio * side)?;

        let mut ordered: Vec<&GrantRecord> = grants.iter().collect();
        ordered.sort_by_key(|g| g.id);

        // Radii proportional to sqrt(amount), covering `fill_ratio` of the cross.
        let total: f64 = ordered.iter().map(|g| g.amount).sum();
        let k = if total > 0.0 {
            (settings.fill_ratio * cross.area() / (std::f64::consts::PI * total)).sqrt()
        } else {
            0.0
        };
        let radii: Vec<f64> = ordered.iter().map(|g| k * g.amount.sqrt()).collect();

        let packer = CrossPacker {
            padding: settings.padding,
            iterations: settings.iterations,
            seed: settings.seed,
            boundary_strength: settings.boundary_strength,
        };
        let centers = packer.pack(&radii, &cross)?;

        let (ox, oy) = (bounds.width / 2.0, bounds.height / 2.0);
        layout.circles = ordered
            .iter()
            .zip(&centers)
            .zip(&radii)
            .map(|((g, p), &r)| CircleDatum::from_grant(g, ox + p.x, oy + p.y, r, DEFAULT_FILL))
            .collect();
        layout.labels = cross_captions(&layout.circles);
        Ok(())
    }

    fn packed(
        &self,
        grants: &[GrantRecord],
        bounds: Bounds,
        colored: bool,
        layout: &mut Layout,
    ) -> Result<(), LayoutError> {
        let items: Vec<WeightedItem> = grants
            .iter()
            .map(|g| WeightedItem {
                id: g.id,
                weight: g.amount,
            })
            .collect();
        let packed = self.packer().pack(&items, bounds)?;

        let mut by_id: Vec<&GrantRecord> = grants.iter().collect();
        by_id.sort_by_key(|g| g.id);

        layout.circles = by_id
            .iter()
            .zip(&packed)
            .map(|(g, c)| {
                let fill = if colored {
                    category_color(g.category)
                } else {
                    DEFAULT_FILL
                };
                CircleDatum::from_grant(g, c.cx, c.cy, c.r, fill)
            })
            .collect();
        layout.radius_scale = radius_scale(grants, &layout.circles)?;
        Ok(())
    }

    /// Two-level packing by category, largest categories and grants first.
    fn multiple_packed(
        &self,
        grants: &[GrantRecord],
        bounds: Bounds,
        layout: &mut Layout,
    ) -> Result<(), LayoutError> {
        let mut by_category: IndexMap<_, Vec<&GrantRecord>> = IndexMap::new();
        for grant in grants {
            by_category.entry(grant.category).or_default().push(grant);
        }

        let mut groups: Vec<(_, f64, Vec<&GrantRecord>)> = by_category
            .into_iter()
            .map(|(category, mut members)| {
                members.sort_by(|a, b| b.amount.total_cmp(&a.amount).then(a.id.cmp(&b.id)));
                let total = members.iter().map(|g| g.amount).sum();
                (category, total, members)
            })
            .collect();
        groups.sort_by(|a, b| b.1.total_cmp(&a.1));

        let items: Vec<Vec<WeightedItem>> = groups
            .iter()
            .map(|(_, _, members)| {
                members
                    .iter()
                    .map(|g| WeightedItem {
                        id: g.id,
                        weight: g.amount,
                    })
                    .collect()
            })
            .collect();
        let packed = self.packer().pack_groups(&items, bounds)?;

        let mut by_id: Vec<&GrantRecord> = grants.iter().collect();
        by_id.sort_by_key(|g| g.id);

        layout.circles = by_id
            .iter()
            .zip(&packed.circles)
            .map(|(g, c)| CircleDatum::from_grant(g, c.cx, c.cy, c.r, category_color(g.category)))
            .collect();
        layout.clusters = groups
            .iter()
            .zip(&packed.groups)
            .map(|((category, total, members), disk)| ClusterSummary {
                key: category.label().to_string(),
                total_amount: *total,
                item_count: members.len(),
                anchor: Point {
                    x: disk.cx,
                    y: disk.cy,
                },
                radius: disk.r,
                color: category_color(*category).to_string(),
            })
            .collect();
        Ok(())
    }

    fn by_row(&self, grants: &[GrantRecord], bounds: Bounds) -> Result<ClusterLayout, LayoutError> {
        let grouper = ClusterGrouper {
            columns: self.config.grid_columns,
            packer: self.packer(),
            palette: self.config.palette.clone(),
            text: self.config.text.clone(),
            title_gap: self.config.title_gap,
        };
        grouper.layout(grants, |g| g.field.clone(), bounds)
    }

    /// The by-row layout with circles collapsed into their cluster badge,
    /// plus the radius scale of the by-row circles before the collapse.
    fn to_square(
        &self,
        grants: &[GrantRecord],
        bounds: Bounds,
    ) -> Result<(ClusterLayout, Option<SqrtScale>), LayoutError> {
        let mut rows = self.by_row(grants, bounds)?;
        let scale = radius_scale(grants, &rows.circles)?;
        for circle in rows.circles.iter_mut() {
            circle.r = 0.0;
        }
        Ok((rows, scale))
    }

    fn barplot(
        &self,
        grants: &[GrantRecord],
        bounds: Bounds,
        metric: Metric,
        layout: &mut Layout,
    ) -> Result<(), LayoutError> {
        let (rows, scale) = self.to_square(grants, bounds)?;
        let bars = project_bars(&rows.clusters, bounds, metric, &self.config.barplot)?;

        layout.circles = rows.circles;
        layout.clusters = rows.clusters;
        layout.rectangles = bars.rectangles;
        layout.labels = bars.labels;
        layout.axis = Some(bars.axis);
        layout.x_scale = bars.x_scale;
        layout.y_scale = Some(bars.y_scale);
        layout.radius_scale = scale;
        Ok(())
    }
}

/// Square-root scale from grant amounts to the radii they were drawn with,
/// for bubble legends.
fn radius_scale(
    grants: &[GrantRecord],
    circles: &[CircleDatum],
) -> Result<Option<SqrtScale>, LayoutError> {
    let Some((min_amount, max_amount)) = extent(grants.iter().map(|g| g.amount)) else {
        return Ok(None);
    };
    let Some((min_r, max_r)) = extent(circles.iter().map(|c| c.r)) else {
        return Ok(None);
    };
    let scale = SqrtScale::new(min_amount, max_amount, min_r, max_r)?;
    Ok(Some(scale.nice(DEFAULT_TICK_COUNT)))
}

fn extent(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

/// Captions in three of the gaps between the cross arms, placed from the
/// extremes of the packed circles.
fn cross_captions(circles: &[CircleDatum]) -> Vec<LabelDatum> {
    let Some((left, right)) = extent(circles.iter().map(|c| c.cx)) else {
        return vec![];
    };
    let Some((top, bottom)) = extent(circles.iter().map(|c| c.cy)) else {
        return vec![];
    };

    let mid_x = (left + right) / 2.0;
    let mid_y = (top + bottom) / 2.0;
    let caption = |text: &str, x: f64, y: f64, anchor: TextAnchor| LabelDatum {
        text: text.to_string(),
        lines: vec![text.to_string()],
        x,
        y,
        anchor,
        fill: CAPTION_FILL.to_string(),
        rotation: 0.0,
    };

    vec![
        caption("SNSF", (left + mid_x) / 2.0, (mid_y + top) / 2.0, TextAnchor::End),
        caption("SNF", (right + mid_x) / 2.0, (mid_y + top) / 2.0, TextAnchor::Start),
        caption("FNS", (left + mid_x) / 2.0, (mid_y + bottom) / 2.0, TextAnchor::End),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grant::Category;

    fn grant(id: i64, amount: f64, category: Category, field: &str) -> GrantRecord {
        GrantRecord {
            id,
            title: format!("Grant {id}"),
            amount,
            category,
            field: field.to_string(),
            year: 2024,
        }
    }

    fn dataset() -> Vec<GrantRecord> {
        let categories = Category::ALL;
        let fields = ["Physics", "Biology", "History", "Law", "Medicine", "Chemistry", "Art"];
        (0..60)
            .map(|i| {
                grant(
                    1000 - i,
                    50_000.0 + ((i * 7919) % 23) as f64 * 40_000.0,
                    categories[i as usize % categories.len()],
                    fields[i as usize % fields.len()],
                )
            })
            .collect()
    }

    #[test]
    fn test_mode_names() {
        for mode in LayoutMode::ALL {
            assert_eq!(mode.name().parse::<LayoutMode>().unwrap(), mode);
        }
        assert_eq!(
            "multiplePackedByRowSquared".parse::<LayoutMode>().unwrap(),
            LayoutMode::MultiplePackedByRowToSquare
        );
        assert_eq!("barplot".parse::<LayoutMode>().unwrap(), LayoutMode::BarplotAmount);
        assert_eq!(
            "barplotGrantCounts".parse::<LayoutMode>().unwrap(),
            LayoutMode::BarplotCount
        );
        assert!(matches!(
            "pie".parse::<LayoutMode>(),
            Err(LayoutError::UnknownMode(m)) if m == "pie"
        ));
    }

    #[test]
    fn test_margins() {
        let engine = LayoutEngine::default();
        let grants = dataset();
        let packed = engine.layout(LayoutMode::Packed, &grants, 800.0, 600.0).unwrap();
        assert_eq!(packed.bounds, Bounds::new(770.0, 570.0));
        let rows = engine
            .layout(LayoutMode::MultiplePackedByRow, &grants, 800.0, 600.0)
            .unwrap();
        assert_eq!(rows.bounds, Bounds::new(760.0, 560.0));
    }

    #[test]
    fn test_packed_fill() {
        let engine = LayoutEngine::default();
        let grants = dataset();
        let plain = engine.layout(LayoutMode::Packed, &grants, 800.0, 600.0).unwrap();
        assert!(plain.circles.iter().all(|c| c.fill == DEFAULT_FILL));
        assert!(plain.radius_scale.is_some());

        let colored = engine
            .layout(LayoutMode::PackedColored, &grants, 800.0, 600.0)
            .unwrap();
        for c in &colored.circles {
            assert_eq!(c.fill, category_color(c.category));
        }
        // Same geometry, different colors.
        for (a, b) in plain.circles.iter().zip(&colored.circles) {
            assert_eq!((a.cx, a.cy, a.r), (b.cx, b.cy, b.r));
        }
    }

    #[test]
    fn test_multiple_packed_groups_by_category() {
        let engine = LayoutEngine::default();
        let layout = engine
            .layout(LayoutMode::MultiplePacked, &dataset(), 800.0, 600.0)
            .unwrap();

        assert_eq!(layout.circles.len(), 60);
        assert_eq!(layout.clusters.len(), Category::ALL.len());
        for summary in &layout.clusters {
            for c in layout.circles.iter().filter(|c| c.category.label() == summary.key) {
                let d = ((c.cx - summary.anchor.x).powi(2) + (c.cy - summary.anchor.y).powi(2)).sqrt();
                assert!(d + c.r <= summary.radius + 1e-6);
            }
        }
    }

    #[test]
    fn test_by_row_clusters() {
        let engine = LayoutEngine::default();
        let layout = engine
            .layout(LayoutMode::MultiplePackedByRow, &dataset(), 900.0, 600.0)
            .unwrap();

        assert_eq!(layout.clusters.len(), 7);
        assert_eq!(layout.labels.len(), 7);
        assert_eq!(layout.rectangles.len(), 7);
        assert!(layout.rectangles.iter().all(|r| r.width == 0.0 && r.height == 0.0));
        // 7 clusters over 6 columns: two rows.
        let rows: Vec<f64> = layout.clusters.iter().map(|c| c.anchor.y).collect();
        assert!(rows[..6].iter().all(|&y| y == rows[0]));
        assert!(rows[6] > rows[0]);
    }

    #[test]
    fn test_to_square_collapses_circles() {
        let engine = LayoutEngine::default();
        let grants = dataset();
        let rows = engine
            .layout(LayoutMode::MultiplePackedByRow, &grants, 900.0, 600.0)
            .unwrap();
        let square = engine
            .layout(LayoutMode::MultiplePackedByRowToSquare, &grants, 900.0, 600.0)
            .unwrap();

        assert!(square.circles.iter().all(|c| c.r == 0.0));
        assert_eq!(square.clusters, rows.clusters);
        assert!(rows.radius_scale.is_some());
        assert_eq!(square.radius_scale, rows.radius_scale);
        for (badge, summary) in square.rectangles.iter().zip(&square.clusters) {
            let side = (summary.total_amount / 100_000.0).sqrt();
            assert!((badge.width - side).abs() < 1e-9);
        }
    }

    #[test]
    fn test_barplots() {
        let engine = LayoutEngine::default();
        let grants = dataset();
        let amount = engine
            .layout(LayoutMode::BarplotAmount, &grants, 900.0, 600.0)
            .unwrap();
        let count = engine
            .layout(LayoutMode::BarplotCount, &grants, 900.0, 600.0)
            .unwrap();

        assert_eq!(amount.rectangles.len(), 7);
        assert_eq!(amount.axis.as_ref().unwrap().title, "Total Amount (M CHF)");
        assert_eq!(count.axis.as_ref().unwrap().title, "Number of grants");
        assert!(amount.x_scale.is_some() && amount.y_scale.is_some());
        assert!(amount.circles.iter().all(|c| c.r == 0.0));

        let rows = engine
            .layout(LayoutMode::MultiplePackedByRow, &grants, 900.0, 600.0)
            .unwrap();
        assert!(rows.radius_scale.is_some());
        assert_eq!(amount.radius_scale, rows.radius_scale);
        assert_eq!(count.radius_scale, rows.radius_scale);
    }

    #[test]
    fn test_cross_layout() {
        let engine = LayoutEngine::default();
        let layout = engine.layout(LayoutMode::Cross, &dataset(), 600.0, 600.0).unwrap();

        assert_eq!(layout.circles.len(), 60);
        let captions: Vec<&str> = layout.labels.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(captions, vec!["SNSF", "SNF", "FNS"]);

        let covered: f64 = layout
            .circles
            .iter()
            .map(|c| std::f64::consts::PI * c.r * c.r)
            .sum();
        let side = 570.0;
        let arm = 0.3 * side;
        let area = 2.0 * side * arm - arm * arm;
        assert!((covered - 0.55 * area).abs() < 1e-6 * area);
    }

    #[test]
    fn test_every_mode_sorted_by_id() {
        let engine = LayoutEngine::default();
        let grants = dataset();
        for mode in LayoutMode::ALL {
            let layout = engine.layout(mode, &grants, 900.0, 600.0).unwrap();
            assert_eq!(layout.circles.len(), grants.len(), "{mode}");
            assert!(layout.circles.windows(2).all(|w| w[0].id < w[1].id), "{mode}");
            assert!(layout.circles.iter().all(|c| c.r >= 0.0), "{mode}");
        }
    }

    #[test]
    fn test_idempotent_json() {
        let engine = LayoutEngine::default();
        let grants = dataset();
        for mode in LayoutMode::ALL {
            let a = engine.layout(mode, &grants, 900.0, 600.0).unwrap();
            let b = engine.layout(mode, &grants, 900.0, 600.0).unwrap();
            assert_eq!(a, b);
            assert_eq!(
                serde_json::to_string(&a).unwrap(),
                serde_json::to_string(&b).unwrap()
            );
        }
    }

    #[test]
    fn test_empty_dataset() {
        let engine = LayoutEngine::default();
        for mode in LayoutMode::ALL {
            let layout = engine.layout(mode, &[], 400.0, 300.0).unwrap();
            assert!(layout.circles.is_empty(), "{mode}");
        }
    }

    #[test]
    fn test_container_too_small() {
        let engine = LayoutEngine::default();
        let err = engine.layout(LayoutMode::Packed, &dataset(), 20.0, 600.0);
        assert!(matches!(err, Err(LayoutError::Configuration { .. })));
    }

    #[test]
    fn test_invalid_records_rejected() {
        let engine = LayoutEngine::default();
        let grants = vec![
            grant(1, 10.0, Category::Careers, "Law"),
            grant(1, 20.0, Category::Careers, "Law"),
        ];
        assert!(matches!(
            engine.layout(LayoutMode::Packed, &grants, 400.0, 400.0),
            Err(LayoutError::InvalidRecord { id: 1, .. })
        ));
    }
}
