//! Bar charts and summary badges over cluster summaries.

use serde::Serialize;

use crate::config::BarplotConfig;
use crate::error::{LayoutError, ensure_positive};
use crate::scale::{BandScale, LinearScale};

use super::types::{
    AxisDescriptor, AxisTick, BarLayout, Bounds, ClusterSummary, LabelDatum, RectangleDatum,
    TextAnchor,
};

/// Bar labels are turned almost vertical, reading bottom to top.
const LABEL_ROTATION: f64 = -180.0 / 2.1;

/// Quantity shown by the bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Metric {
    TotalAmount,
    ItemCount,
}

impl Metric {
    pub fn value(self, cluster: &ClusterSummary) -> f64 {
        match self {
            Self::TotalAmount => cluster.total_amount,
            Self::ItemCount => cluster.item_count as f64,
        }
    }

    pub fn axis_title(self) -> &'static str {
        match self {
            Self::TotalAmount => "Total Amount (M CHF)",
            Self::ItemCount => "Number of grants",
        }
    }

    pub fn format_tick(self, value: f64) -> String {
        match self {
            Self::TotalAmount => format!("{}M", value / 1e6),
            Self::ItemCount => format!("{value}"),
        }
    }
}

/// One bar per cluster, in cluster order, standing on the baseline.
pub fn project_bars(
    clusters: &[ClusterSummary],
    bounds: Bounds,
    metric: Metric,
    settings: &BarplotConfig,
) -> Result<BarLayout, LayoutError> {
    ensure_positive("bounds width", bounds.width)?;
    ensure_positive("bounds height", bounds.height)?;
    if !(settings.height_share > 0.0 && settings.height_share <= 1.0) {
        return Err(LayoutError::config(
            "height share",
            format!("{} is outside (0, 1]", settings.height_share),
        ));
    }
    ensure_positive("pixels per tick", settings.pixels_per_tick)?;

    let baseline = bounds.height * settings.height_share;
    let max_value = clusters
        .iter()
        .map(|c| metric.value(c))
        .fold(0.0, f64::max);
    let domain_max = if max_value > 0.0 { max_value } else { 1.0 };
    let y_scale = LinearScale::new(0.0, domain_max, 0.0, baseline)?;

    let tick_count = (baseline / settings.pixels_per_tick).floor() as usize;
    let ticks = y_scale
        .ticks(tick_count)
        .into_iter()
        .map(|value| AxisTick {
            value,
            offset: y_scale.scale(value),
            label: metric.format_tick(value),
        })
        .collect();

    let mut axis = AxisDescriptor {
        title: metric.axis_title().to_string(),
        ticks,
        origin_x: settings.axis_margin,
        baseline_y: baseline,
        band_centers: vec![],
    };

    if clusters.is_empty() {
        return Ok(BarLayout {
            rectangles: vec![],
            labels: vec![],
            axis,
            x_scale: None,
            y_scale,
        });
    }

    let keys: Vec<String> = clusters.iter().map(|c| c.key.clone()).collect();
    let x_scale = BandScale::new(
        keys,
        settings.axis_margin,
        bounds.width,
        settings.band_padding,
    )?;
    let bandwidth = x_scale.bandwidth();

    let mut rectangles = Vec::with_capacity(clusters.len());
    let mut labels = Vec::with_capacity(clusters.len());

    for cluster in clusters {
        let x = x_scale.position(&cluster.key).unwrap_or(settings.axis_margin);
        let height = y_scale.scale(metric.value(cluster)).clamp(0.0, baseline);
        let center = x + bandwidth / 2.0;

        rectangles.push(RectangleDatum {
            x,
            y: baseline - height,
            width: bandwidth,
            height,
            fill: cluster.color.clone(),
            label: cluster.key.clone(),
        });
        labels.push(LabelDatum {
            text: cluster.key.clone(),
            lines: vec![cluster.key.clone()],
            x: center,
            y: baseline + settings.label_offset,
            anchor: TextAnchor::End,
            fill: cluster.color.clone(),
            rotation: LABEL_ROTATION,
        });
        axis.band_centers.push(center);
    }

    tracing::debug!(bars = rectangles.len(), ?metric, max_value, "Projected bars");

    Ok(BarLayout {
        rectangles,
        labels,
        axis,
        x_scale: Some(x_scale),
        y_scale,
    })
}

/// One square per cluster, its area proportional to the cluster total,
/// centered on the cluster anchor.
pub fn square_badges(
    clusters: &[ClusterSummary],
    amount_per_px2: f64,
) -> Result<Vec<RectangleDatum>, LayoutError> {
    ensure_positive("badge amount per pixel", amount_per_px2)?;

    Ok(clusters
        .iter()
        .map(|c| {
            let side = (c.total_amount.max(0.0) / amount_per_px2).sqrt();
            RectangleDatum {
                x: c.anchor.x - side / 2.0,
                y: c.anchor.y - side / 2.0,
                width: side,
                height: side,
                fill: c.color.clone(),
                label: c.key.clone(),
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::types::Point;

    fn summary(key: &str, total: f64, count: usize) -> ClusterSummary {
        ClusterSummary {
            key: key.to_string(),
            total_amount: total,
            item_count: count,
            anchor: Point { x: 100.0, y: 50.0 },
            radius: 10.0,
            color: "#123456".to_string(),
        }
    }

    fn clusters() -> Vec<ClusterSummary> {
        vec![
            summary("Physics", 6_000_000.0, 3),
            summary("Biology", 3_000_000.0, 12),
            summary("Law", 1_500_000.0, 1),
        ]
    }

    #[test]
    fn test_bars_within_reserved_height() {
        let bounds = Bounds::new(470.0, 300.0);
        let bars = project_bars(&clusters(), bounds, Metric::TotalAmount, &BarplotConfig::default())
            .unwrap();

        assert_eq!(bars.rectangles.len(), 3);
        let baseline = 200.0;
        assert!((bars.axis.baseline_y - baseline).abs() < 1e-9);
        for rect in &bars.rectangles {
            assert!(rect.height <= baseline + 1e-9);
            assert!((rect.y + rect.height - baseline).abs() < 1e-9);
        }
        assert!((bars.rectangles[0].height - baseline).abs() < 1e-9);
        assert!((bars.rectangles[1].height - baseline / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_band_layout() {
        // 400px for 3 bands with padding 0.3: bandwidth 400 / 3.6.
        let bounds = Bounds::new(470.0, 300.0);
        let bars = project_bars(&clusters(), bounds, Metric::TotalAmount, &BarplotConfig::default())
            .unwrap();

        let bandwidth = 400.0 / 3.6;
        assert!((bars.rectangles[0].x - 70.0).abs() < 1e-9);
        assert!((bars.rectangles[0].width - bandwidth).abs() < 1e-9);
        assert!((bars.rectangles[1].x - (70.0 + 1.3 * bandwidth)).abs() < 1e-9);
        assert!((bars.axis.band_centers[2] - (70.0 + 2.6 * bandwidth + bandwidth / 2.0)).abs() < 1e-9);
    }

    #[test]
    fn test_amount_axis() {
        let bars = project_bars(
            &clusters(),
            Bounds::new(470.0, 300.0),
            Metric::TotalAmount,
            &BarplotConfig::default(),
        )
        .unwrap();

        assert_eq!(bars.axis.title, "Total Amount (M CHF)");
        // floor(200 / 70) = 2 ticks requested
        let labels: Vec<&str> = bars.axis.ticks.iter().map(|t| t.label.as_str()).collect();
        assert_eq!(labels, vec!["0M", "2M", "4M", "6M"]);
        assert!((bars.axis.ticks[1].offset - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_count_axis() {
        let bars = project_bars(
            &clusters(),
            Bounds::new(470.0, 600.0),
            Metric::ItemCount,
            &BarplotConfig::default(),
        )
        .unwrap();

        assert_eq!(bars.axis.title, "Number of grants");
        assert!((bars.rectangles[1].height - 400.0).abs() < 1e-9);
        let labels: Vec<&str> = bars.axis.ticks.iter().map(|t| t.label.as_str()).collect();
        assert_eq!(labels, vec!["0", "2", "4", "6", "8", "10", "12"]);
    }

    #[test]
    fn test_all_zero_values() {
        let zeros = vec![summary("A", 0.0, 0), summary("B", 0.0, 0)];
        let bars = project_bars(
            &zeros,
            Bounds::new(300.0, 300.0),
            Metric::TotalAmount,
            &BarplotConfig::default(),
        )
        .unwrap();

        assert_eq!(bars.y_scale.domain(), [0.0, 1.0]);
        assert!(bars.rectangles.iter().all(|r| r.height == 0.0));
    }

    #[test]
    fn test_no_clusters() {
        let bars = project_bars(
            &[],
            Bounds::new(300.0, 300.0),
            Metric::ItemCount,
            &BarplotConfig::default(),
        )
        .unwrap();
        assert!(bars.rectangles.is_empty());
        assert!(bars.x_scale.is_none());
    }

    #[test]
    fn test_labels_under_bars() {
        let bars = project_bars(
            &clusters(),
            Bounds::new(470.0, 300.0),
            Metric::TotalAmount,
            &BarplotConfig::default(),
        )
        .unwrap();

        for (label, rect) in bars.labels.iter().zip(&bars.rectangles) {
            assert_eq!(label.text, rect.label);
            assert!((label.x - (rect.x + rect.width / 2.0)).abs() < 1e-9);
            assert!((label.y - 210.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_square_badges() {
        let badges = square_badges(&clusters(), 100_000.0).unwrap();
        assert_eq!(badges.len(), 3);
        // 6M / 100k = 60 px², side sqrt(60)
        let side = 60f64.sqrt();
        assert!((badges[0].width - side).abs() < 1e-9);
        assert_eq!(badges[0].width, badges[0].height);
        assert!((badges[0].x + side / 2.0 - 100.0).abs() < 1e-9);
        assert!((badges[0].y + side / 2.0 - 50.0).abs() < 1e-9);

        assert!(square_badges(&clusters(), 0.0).is_err());
    }
}
