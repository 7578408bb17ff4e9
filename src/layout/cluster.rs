//! Grid of per-cluster circle packings.
//!
//! Records are partitioned by a key, clusters are ranked by total amount and
//! laid out row by row in equal cells. Each cluster is packed into its own
//! cell, so disks of different clusters never touch.

use indexmap::IndexMap;

use crate::color::Palette;
use crate::error::LayoutError;
use crate::grant::{GrantRecord, validate_grants};
use crate::measure::TextMetrics;

use super::enclose::{Circle, enclose};
use super::pack::CirclePacker;
use super::types::{
    Bounds, CircleDatum, ClusterLayout, ClusterSummary, LabelDatum, Point, TextAnchor,
    WeightedItem,
};

const LABEL_FILL: &str = "#333333";

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterGrouper {
    pub columns: usize,
    pub packer: CirclePacker,
    pub palette: Palette,
    pub text: TextMetrics,
    /// Gap between a cluster disk and its title
    pub title_gap: f64,
}

impl Default for ClusterGrouper {
    fn default() -> Self {
        Self {
            columns: 6,
            packer: CirclePacker::default(),
            palette: Palette::default(),
            text: TextMetrics::default(),
            title_gap: 12.0,
        }
    }
}

/// Partition `records` by `key_fn` and pack each cluster in a grid cell.
pub fn group_and_pack<F>(
    records: &[GrantRecord],
    key_fn: F,
    bounds: Bounds,
    columns: usize,
    padding: f64,
    palette: &Palette,
) -> Result<ClusterLayout, LayoutError>
where
    F: Fn(&GrantRecord) -> String,
{
    ClusterGrouper {
        columns,
        packer: CirclePacker {
            padding,
            ..CirclePacker::default()
        },
        palette: palette.clone(),
        ..ClusterGrouper::default()
    }
    .layout(records, key_fn, bounds)
}

struct Cluster<'a> {
    key: String,
    total: f64,
    members: Vec<&'a GrantRecord>,
}

impl ClusterGrouper {
    pub fn layout<F>(
        &self,
        records: &[GrantRecord],
        key_fn: F,
        bounds: Bounds,
    ) -> Result<ClusterLayout, LayoutError>
    where
        F: Fn(&GrantRecord) -> String,
    {
        if self.columns == 0 {
            return Err(LayoutError::config("grid columns", "must be at least 1"));
        }
        validate_grants(records)?;

        let clusters = partition(records, key_fn);
        let count = clusters.len();
        if count == 0 {
            return Ok(ClusterLayout {
                circles: vec![],
                clusters: vec![],
                labels: vec![],
            });
        }

        let rows = count.div_ceil(self.columns);
        let cell_w = bounds.width / self.columns as f64;
        let cell_h = bounds.height / rows as f64;
        let cell = Bounds::new(cell_w, cell_h);
        tracing::debug!(clusters = count, rows, cell_w, cell_h, "Cluster grid");

        let mut circles = Vec::with_capacity(records.len());
        let mut summaries = Vec::with_capacity(count);
        let mut labels = Vec::with_capacity(count);

        for (rank, cluster) in clusters.iter().enumerate() {
            let row = rank / self.columns;
            let col = rank % self.columns;
            let in_row = if row + 1 == rows {
                count - row * self.columns
            } else {
                self.columns
            };
            let x_start = (bounds.width - in_row as f64 * cell_w) / 2.0;
            let origin_x = x_start + col as f64 * cell_w;
            let origin_y = row as f64 * cell_h;

            let mut ordered = cluster.members.clone();
            ordered.sort_by(|a, b| b.amount.total_cmp(&a.amount).then(a.id.cmp(&b.id)));
            let items: Vec<WeightedItem> = ordered
                .iter()
                .map(|g| WeightedItem {
                    id: g.id,
                    weight: g.amount,
                })
                .collect();
            let packed = self.packer.pack(&items, cell)?;

            let color = self.palette.color(rank, count);
            let mut by_id = cluster.members.clone();
            by_id.sort_by_key(|g| g.id);

            let placed: Vec<CircleDatum> = by_id
                .iter()
                .zip(&packed)
                .map(|(grant, c)| {
                    CircleDatum::from_grant(grant, origin_x + c.cx, origin_y + c.cy, c.r, &color)
                })
                .collect();

            let anchor = Point {
                x: origin_x + cell_w / 2.0,
                y: origin_y + cell_h / 2.0,
            };
            let disk: Vec<Circle> = placed
                .iter()
                .map(|c| Circle::new(c.cx, c.cy, c.r))
                .collect();
            let radius = enclose(&disk).map_or(0.0, |e| e.r);

            // Title under the disk, pulled up so its last line stays in the
            // cell, but never onto the disk.
            let lines = self.text.wrap(&cluster.key);
            let below_disk = anchor.y + radius;
            let trailing = self.text.block_height(lines.len().saturating_sub(1));
            let last_line = origin_y + cell_h - trailing;
            let title_y = (below_disk + self.title_gap).min(last_line).max(below_disk);

            labels.push(LabelDatum {
                text: cluster.key.clone(),
                lines,
                x: anchor.x,
                y: title_y,
                anchor: TextAnchor::Middle,
                fill: LABEL_FILL.to_string(),
                rotation: 0.0,
            });
            summaries.push(ClusterSummary {
                key: cluster.key.clone(),
                total_amount: cluster.total,
                item_count: cluster.members.len(),
                anchor,
                radius,
                color,
            });
            circles.extend(placed);
        }

        circles.sort_by_key(|c| c.id);

        Ok(ClusterLayout {
            circles,
            clusters: summaries,
            labels,
        })
    }
}

/// Clusters in first-seen key order, then ranked by total amount.
fn partition<'a, F>(records: &'a [GrantRecord], key_fn: F) -> Vec<Cluster<'a>>
where
    F: Fn(&GrantRecord) -> String,
{
    let mut by_key: IndexMap<String, Vec<&'a GrantRecord>> = IndexMap::new();
    for record in records {
        by_key.entry(key_fn(record)).or_default().push(record);
    }

    let mut clusters: Vec<Cluster<'a>> = by_key
        .into_iter()
        .map(|(key, members)| Cluster {
            total: members.iter().map(|g| g.amount).sum(),
            key,
            members,
        })
        .collect();
    clusters.sort_by(|a, b| b.total.total_cmp(&a.total));
    clusters
}
