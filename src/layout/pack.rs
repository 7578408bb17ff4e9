//! Circle packing: circle areas proportional to weights, no overlaps,
//! scaled to fit the bounds.
//!
//! Circles are first laid out with the front-chain heuristic: each new
//! circle is placed tangent to two neighbours on the current front chain,
//! the pair closest to the centroid. A compaction pass then slides circles
//! toward the weighted centroid of the others as far as they can go without
//! touching. The arrangement is finally scaled so its smallest enclosing
//! circle spans the shorter side of the bounds.
//!
//! Padding is measured in output pixels. Because the scale factor depends on
//! the packed size, the inflation applied while packing is refined over a few
//! rounds and any remaining shortfall is taken off the output radii.

use crate::error::{LayoutError, ensure_non_negative, ensure_positive};

use super::enclose::{Circle, enclose};
use super::types::{Bounds, PackedCircle, WeightedItem};

/// Rounds of padding refinement.
const PADDING_ROUNDS: usize = 4;

/// Flat and grouped circle packer.
#[derive(Debug, Clone, PartialEq)]
pub struct CirclePacker {
    pub padding: f64,
    pub relax_passes: usize,
}

impl Default for CirclePacker {
    fn default() -> Self {
        Self {
            padding: 3.0,
            relax_passes: 2,
        }
    }
}

/// Result of [`CirclePacker::pack_groups`].
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedPacking {
    /// Leaves of every group, sorted by id
    pub circles: Vec<PackedCircle>,
    /// One disk per input group, `id` being the group index
    pub groups: Vec<PackedCircle>,
}

/// Pack `items` into `bounds` with the default compaction settings.
pub fn pack_circles(
    items: &[WeightedItem],
    bounds: Bounds,
    padding: f64,
) -> Result<Vec<PackedCircle>, LayoutError> {
    CirclePacker {
        padding,
        ..CirclePacker::default()
    }
    .pack(items, bounds)
}

/// Pack pre-grouped items: each group becomes a disk of its own.
pub fn pack_groups(
    groups: &[Vec<WeightedItem>],
    bounds: Bounds,
    padding: f64,
) -> Result<GroupedPacking, LayoutError> {
    CirclePacker {
        padding,
        ..CirclePacker::default()
    }
    .pack_groups(groups, bounds)
}

impl CirclePacker {
    pub fn pack(
        &self,
        items: &[WeightedItem],
        bounds: Bounds,
    ) -> Result<Vec<PackedCircle>, LayoutError> {
        self.validate(items.iter(), bounds)?;
        if items.is_empty() {
            return Ok(vec![]);
        }

        let radii: Vec<f64> = items.iter().map(|it| it.weight.sqrt()).collect();
        if radii.iter().all(|&r| r == 0.0) {
            return Ok(grid_placement(items, bounds));
        }

        let arrange = |inflation: f64| {
            let mut circles: Vec<Circle> = radii
                .iter()
                .map(|&r| Circle::new(0.0, 0.0, r + inflation))
                .collect();
            let radius = self.arrange_siblings(&mut circles);
            (circles, radius)
        };

        let fit = self.fit(bounds, arrange);
        let mut packed: Vec<PackedCircle> = items
            .iter()
            .zip(&fit.circles)
            .zip(&radii)
            .map(|((item, c), &r)| PackedCircle {
                id: item.id,
                cx: fit.origin.0 + c.x * fit.scale,
                cy: fit.origin.1 + c.y * fit.scale,
                r: (r * fit.scale - fit.shrink).max(0.0),
            })
            .collect();
        packed.sort_by_key(|c| c.id);

        tracing::trace!(count = packed.len(), scale = fit.scale, "Packed circles");
        Ok(packed)
    }

    pub fn pack_groups(
        &self,
        groups: &[Vec<WeightedItem>],
        bounds: Bounds,
    ) -> Result<GroupedPacking, LayoutError> {
        self.validate(groups.iter().flatten(), bounds)?;
        if groups.iter().all(|g| g.is_empty()) {
            return Ok(GroupedPacking {
                circles: vec![],
                groups: vec![],
            });
        }

        let radii: Vec<Vec<f64>> = groups
            .iter()
            .map(|g| g.iter().map(|it| it.weight.sqrt()).collect())
            .collect();
        if radii.iter().flatten().all(|&r| r == 0.0) {
            let flat: Vec<WeightedItem> = groups.iter().flatten().copied().collect();
            return Ok(GroupedPacking {
                circles: grid_placement(&flat, bounds),
                groups: vec![],
            });
        }

        // Leaves of every group followed by the group disks, all in root
        // coordinates.
        let arrange = |inflation: f64| {
            let mut leaves: Vec<Vec<Circle>> = Vec::with_capacity(radii.len());
            let mut disks: Vec<Circle> = Vec::with_capacity(radii.len());
            for group in &radii {
                let mut circles: Vec<Circle> = group
                    .iter()
                    .map(|&r| Circle::new(0.0, 0.0, r + inflation))
                    .collect();
                let r = if circles.is_empty() {
                    0.0
                } else {
                    self.arrange_siblings(&mut circles)
                };
                leaves.push(circles);
                disks.push(Circle::new(0.0, 0.0, r + inflation + inflation));
            }

            let radius = self.arrange_siblings(&mut disks);

            let mut all = Vec::new();
            for (group, disk) in leaves.iter().zip(&disks) {
                all.extend(
                    group
                        .iter()
                        .map(|c| Circle::new(disk.x + c.x, disk.y + c.y, c.r)),
                );
            }
            all.extend(
                disks
                    .iter()
                    .map(|d| Circle::new(d.x, d.y, d.r - inflation)),
            );
            (all, radius)
        };

        let fit = self.fit(bounds, arrange);
        let leaf_count: usize = radii.iter().map(Vec::len).sum();

        let mut circles: Vec<PackedCircle> = groups
            .iter()
            .flatten()
            .zip(radii.iter().flatten())
            .zip(&fit.circles[..leaf_count])
            .map(|((item, &r), c)| PackedCircle {
                id: item.id,
                cx: fit.origin.0 + c.x * fit.scale,
                cy: fit.origin.1 + c.y * fit.scale,
                r: (r * fit.scale - fit.shrink).max(0.0),
            })
            .collect();
        circles.sort_by_key(|c| c.id);

        let disks = fit.circles[leaf_count..]
            .iter()
            .enumerate()
            .map(|(i, d)| PackedCircle {
                id: i as i64,
                cx: fit.origin.0 + d.x * fit.scale,
                cy: fit.origin.1 + d.y * fit.scale,
                r: d.r * fit.scale,
            })
            .collect();

        Ok(GroupedPacking {
            circles,
            groups: disks,
        })
    }

    fn validate<'a>(
        &self,
        items: impl Iterator<Item = &'a WeightedItem>,
        bounds: Bounds,
    ) -> Result<(), LayoutError> {
        ensure_positive("bounds width", bounds.width)?;
        ensure_positive("bounds height", bounds.height)?;
        ensure_non_negative("padding", self.padding)?;
        for item in items {
            if !item.weight.is_finite() || item.weight < 0.0 {
                return Err(LayoutError::InvalidRecord {
                    id: item.id,
                    reason: format!("weight {} must be a non-negative number", item.weight),
                });
            }
        }
        Ok(())
    }

    /// Front chain, compaction, then recentre on the enclosing circle.
    /// Returns the enclosing radius.
    fn arrange_siblings(&self, circles: &mut [Circle]) -> f64 {
        pack_siblings(circles);
        relax(circles, self.relax_passes)
    }

    /// Refine the inflation until the scaled gap reaches the padding.
    fn fit<F>(&self, bounds: Bounds, arrange: F) -> Fit
    where
        F: Fn(f64) -> (Vec<Circle>, f64),
    {
        let side = bounds.min_side();
        let (mut circles, mut radius) = arrange(0.0);
        let mut inflation = 0.0;

        if self.padding > 0.0 {
            for _ in 0..PADDING_ROUNDS {
                inflation = self.padding * radius / side;
                (circles, radius) = arrange(inflation);
            }
        }

        let scale = if radius > 0.0 { side / (2.0 * radius) } else { 0.0 };
        let shrink = (self.padding / 2.0 - inflation * scale).max(0.0);

        Fit {
            circles,
            scale,
            shrink,
            origin: (bounds.width / 2.0, bounds.height / 2.0),
        }
    }
}

struct Fit {
    circles: Vec<Circle>,
    scale: f64,
    shrink: f64,
    origin: (f64, f64),
}

/// Zero-size circles on a centered grid, for all-zero weights.
fn grid_placement(items: &[WeightedItem], bounds: Bounds) -> Vec<PackedCircle> {
    let n = items.len();
    let cols = (n as f64).sqrt().ceil().max(1.0) as usize;
    let rows = n.div_ceil(cols);
    let cell_w = bounds.width / cols as f64;
    let cell_h = bounds.height / rows as f64;

    let mut placed: Vec<PackedCircle> = items
        .iter()
        .enumerate()
        .map(|(i, item)| PackedCircle {
            id: item.id,
            cx: (i % cols) as f64 * cell_w + cell_w / 2.0,
            cy: (i / cols) as f64 * cell_h + cell_h / 2.0,
            r: 0.0,
        })
        .collect();
    placed.sort_by_key(|c| c.id);
    placed
}

/// Front-chain placement. Leaves the circles centered on their enclosing
/// circle when there are at most two; callers recentre otherwise.
fn pack_siblings(circles: &mut [Circle]) {
    let n = circles.len();
    if n == 0 {
        return;
    }

    circles[0].x = 0.0;
    circles[0].y = 0.0;
    if n == 1 {
        return;
    }

    circles[0].x = -circles[1].r;
    circles[1].x = circles[0].r;
    circles[1].y = 0.0;
    if n == 2 {
        return;
    }

    let (first, second) = (circles[0], circles[1]);
    place(&second, &first, &mut circles[2]);

    // Front chain as a circular doubly linked list over circle indices.
    let mut next = vec![0usize; n];
    let mut prev = vec![0usize; n];
    next[0] = 1;
    prev[1] = 0;
    next[1] = 2;
    prev[2] = 1;
    next[2] = 0;
    prev[0] = 2;

    let (mut a, mut b) = (0usize, 1usize);
    let mut i = 3;

    'pack: while i < n {
        let (ca, cb) = (circles[a], circles[b]);
        place(&ca, &cb, &mut circles[i]);
        let c = i;

        // Closest intersecting circle on the chain, walking both ways.
        let (mut j, mut k) = (next[b], prev[a]);
        let (mut sj, mut sk) = (circles[b].r, circles[a].r);
        loop {
            if sj <= sk {
                if intersects(&circles[j], &circles[c]) {
                    b = j;
                    next[a] = b;
                    prev[b] = a;
                    continue 'pack;
                }
                sj += circles[j].r;
                j = next[j];
            } else {
                if intersects(&circles[k], &circles[c]) {
                    a = k;
                    next[a] = b;
                    prev[b] = a;
                    continue 'pack;
                }
                sk += circles[k].r;
                k = prev[k];
            }
            if j == next[k] {
                break;
            }
        }

        prev[c] = a;
        next[c] = b;
        next[a] = c;
        prev[b] = c;
        b = c;

        // New pair closest to the centroid.
        let mut best = score(circles, &next, a);
        let mut node = next[c];
        while node != b {
            let s = score(circles, &next, node);
            if s < best {
                a = node;
                best = s;
            }
            node = next[node];
        }
        b = next[a];
        i += 1;
    }
}

/// Put `c` tangent to both `p` and `q`.
fn place(p: &Circle, q: &Circle, c: &mut Circle) {
    let dx = p.x - q.x;
    let dy = p.y - q.y;
    let d2 = dx * dx + dy * dy;

    if d2 > 0.0 {
        let a2 = (q.r + c.r).powi(2);
        let b2 = (p.r + c.r).powi(2);
        if a2 > b2 {
            let x = (d2 + b2 - a2) / (2.0 * d2);
            let y = (b2 / d2 - x * x).max(0.0).sqrt();
            c.x = p.x - x * dx - y * dy;
            c.y = p.y - x * dy + y * dx;
        } else {
            let x = (d2 + a2 - b2) / (2.0 * d2);
            let y = (a2 / d2 - x * x).max(0.0).sqrt();
            c.x = q.x + x * dx - y * dy;
            c.y = q.y + x * dy + y * dx;
        }
    } else {
        c.x = q.x + c.r;
        c.y = q.y;
    }
}

fn intersects(a: &Circle, b: &Circle) -> bool {
    let dr = a.r + b.r - 1e-6;
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    dr > 0.0 && dr * dr > dx * dx + dy * dy
}

/// Squared distance from the origin to the weighted midpoint of a chain link.
fn score(circles: &[Circle], next: &[usize], node: usize) -> f64 {
    let a = circles[node];
    let b = circles[next[node]];
    let ab = a.r + b.r;
    let (dx, dy) = if ab > 0.0 {
        ((a.x * b.r + b.x * a.r) / ab, (a.y * b.r + b.y * a.r) / ab)
    } else {
        ((a.x + b.x) / 2.0, (a.y + b.y) / 2.0)
    };
    dx * dx + dy * dy
}

/// Compaction passes. Each pass is kept only if the enclosing circle does
/// not grow. Returns the final enclosing radius, circles recentred on it.
fn relax(circles: &mut [Circle], passes: usize) -> f64 {
    let mut radius = recentre(circles);
    if circles.len() < 3 {
        return radius;
    }

    for _ in 0..passes {
        let before = circles.to_vec();
        settle(circles);
        separate(circles);

        let Some(e) = enclose(circles) else {
            break;
        };
        if e.r <= radius {
            radius = e.r;
            for c in circles.iter_mut() {
                c.x -= e.x;
                c.y -= e.y;
            }
        } else {
            circles.copy_from_slice(&before);
            break;
        }
    }

    radius
}

fn recentre(circles: &mut [Circle]) -> f64 {
    let Some(e) = enclose(circles) else {
        return 0.0;
    };
    for c in circles.iter_mut() {
        c.x -= e.x;
        c.y -= e.y;
    }
    e.r
}

/// Slide each circle toward the area-weighted centroid of the others,
/// stopping at first contact.
fn settle(circles: &mut [Circle]) {
    let mut total_w = 0.0;
    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    for c in circles.iter() {
        let w = c.r * c.r;
        total_w += w;
        sum_x += w * c.x;
        sum_y += w * c.y;
    }

    for i in 0..circles.len() {
        let ci = circles[i];
        let wi = ci.r * ci.r;
        let others_w = total_w - wi;
        if others_w <= 0.0 {
            continue;
        }
        let tx = (sum_x - wi * ci.x) / others_w;
        let ty = (sum_y - wi * ci.y) / others_w;
        let (dx, dy) = (tx - ci.x, ty - ci.y);
        let dd = dx * dx + dy * dy;
        if dd < 1e-18 {
            continue;
        }

        let mut t_max: f64 = 1.0;
        for (j, cj) in circles.iter().enumerate() {
            if j == i {
                continue;
            }
            let (qx, qy) = (cj.x - ci.x, cj.y - ci.y);
            let dq = dx * qx + dy * qy;
            if dq <= 0.0 {
                continue;
            }
            let reach = ci.r + cj.r;
            let gap = qx * qx + qy * qy - reach * reach;
            let disc = dq * dq - dd * gap;
            if disc < 0.0 {
                continue;
            }
            let t_enter = (dq - disc.sqrt()) / dd;
            t_max = t_max.min(t_enter.max(0.0));
            if t_max == 0.0 {
                break;
            }
        }

        if t_max > 0.0 {
            let (nx, ny) = (ci.x + dx * t_max, ci.y + dy * t_max);
            sum_x += wi * (nx - ci.x);
            sum_y += wi * (ny - ci.y);
            circles[i].x = nx;
            circles[i].y = ny;
        }
    }
}

/// Push apart pairs left overlapping by rounding.
fn separate(circles: &mut [Circle]) {
    for _ in 0..3 {
        let mut moved = false;
        for i in 0..circles.len() {
            for j in i + 1..circles.len() {
                let (a, b) = (circles[i], circles[j]);
                let reach = a.r + b.r;
                let (dx, dy) = (b.x - a.x, b.y - a.y);
                let d = (dx * dx + dy * dy).sqrt();
                if d >= reach * (1.0 - 1e-12) || reach == 0.0 {
                    continue;
                }
                let (ux, uy) = if d > 0.0 { (dx / d, dy / d) } else { (1.0, 0.0) };
                let push = (reach - d) / 2.0 * (1.0 + 1e-9);
                circles[i].x -= ux * push;
                circles[i].y -= uy * push;
                circles[j].x += ux * push;
                circles[j].y += uy * push;
                moved = true;
            }
        }
        if !moved {
            break;
        }
    }
}
