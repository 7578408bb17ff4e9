//! Force-style packing of circles into a Swiss-cross region.
//!
//! The simulation follows the usual velocity-Verlet scheme with a cooling
//! `alpha`: pairwise collision resolution on predicted positions, a nudge
//! toward the nearest admissible position, then velocity decay.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::error::{LayoutError, ensure_non_negative, ensure_positive};

use super::types::Point;

const ALPHA_MIN: f64 = 0.001;
/// Ticks for alpha to cool from 1 to `ALPHA_MIN`.
const COOLING_TICKS: f64 = 300.0;
const VELOCITY_DECAY: f64 = 0.4;
/// Initial spread as a share of the cross extent.
const INITIAL_SPREAD: f64 = 0.1;

/// Union of a horizontal and a vertical bar, centered at the origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CrossShape {
    pub width: f64,
    pub height: f64,
    pub arm_thickness: f64,
}

impl CrossShape {
    pub fn new(width: f64, height: f64, arm_thickness: f64) -> Result<Self, LayoutError> {
        ensure_positive("cross width", width)?;
        ensure_positive("cross height", height)?;
        ensure_positive("cross arm thickness", arm_thickness)?;
        if arm_thickness > width.min(height) {
            return Err(LayoutError::config(
                "cross arm thickness",
                format!("{arm_thickness} exceeds the cross extent"),
            ));
        }
        Ok(Self {
            width,
            height,
            arm_thickness,
        })
    }

    pub fn area(&self) -> f64 {
        let t = self.arm_thickness;
        self.width * t + self.height * t - t * t
    }

    /// A circle is admissible when it lies inside one of the bars. Touching
    /// a bar edge is allowed.
    pub fn is_admissible(&self, x: f64, y: f64, r: f64) -> bool {
        let half_arm = self.arm_thickness / 2.0;
        let in_horizontal = x.abs() + r <= self.width / 2.0 && y.abs() + r <= half_arm;
        let in_vertical = x.abs() + r <= half_arm && y.abs() + r <= self.height / 2.0;
        in_horizontal || in_vertical
    }

    /// Closest center at which a circle of radius `r` fits in one of the bars.
    pub fn nearest_admissible(&self, x: f64, y: f64, r: f64) -> Point {
        let half_arm = self.arm_thickness / 2.0;
        let horizontal = Point {
            x: clamp_centered(x, self.width / 2.0 - r),
            y: clamp_centered(y, half_arm - r),
        };
        let vertical = Point {
            x: clamp_centered(x, half_arm - r),
            y: clamp_centered(y, self.height / 2.0 - r),
        };

        let dh = (horizontal.x - x).powi(2) + (horizontal.y - y).powi(2);
        let dv = (vertical.x - x).powi(2) + (vertical.y - y).powi(2);
        if dh <= dv { horizontal } else { vertical }
    }
}

/// Clamp to `[-half, half]`; a negative extent collapses to the axis.
fn clamp_centered(value: f64, half: f64) -> f64 {
    let half = half.max(0.0);
    value.clamp(-half, half)
}

#[derive(Debug, Clone, PartialEq)]
pub struct CrossPacker {
    pub padding: f64,
    pub iterations: usize,
    pub seed: u64,
    pub boundary_strength: f64,
}

impl Default for CrossPacker {
    fn default() -> Self {
        Self {
            padding: 2.0,
            iterations: 200,
            seed: 2024,
            boundary_strength: 0.1,
        }
    }
}

/// Relax circles of the given radii into `cross`. Returns one center per
/// radius, relative to the cross center.
pub fn pack_in_cross(
    radii: &[f64],
    cross: &CrossShape,
    padding: f64,
    iterations: usize,
    seed: u64,
) -> Result<Vec<Point>, LayoutError> {
    CrossPacker {
        padding,
        iterations,
        seed,
        ..CrossPacker::default()
    }
    .pack(radii, cross)
}

#[derive(Debug, Clone, Copy)]
struct Body {
    x: f64,
    y: f64,
    vx: f64,
    vy: f64,
    r: f64,
}

impl CrossPacker {
    pub fn pack(&self, radii: &[f64], cross: &CrossShape) -> Result<Vec<Point>, LayoutError> {
        ensure_non_negative("cross padding", self.padding)?;
        ensure_non_negative("boundary strength", self.boundary_strength)?;
        for &r in radii {
            ensure_non_negative("circle radius", r)?;
        }
        if radii.is_empty() {
            return Ok(vec![]);
        }

        let covered: f64 = radii.iter().map(|r| std::f64::consts::PI * r * r).sum();
        if covered > cross.area() {
            tracing::warn!(
                covered,
                available = cross.area(),
                "Circles cover more than the cross area"
            );
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let spread_x = INITIAL_SPREAD * cross.width;
        let spread_y = INITIAL_SPREAD * cross.height;
        let mut bodies: Vec<Body> = radii
            .iter()
            .map(|&r| Body {
                x: rng.gen_range(-spread_x..=spread_x),
                y: rng.gen_range(-spread_y..=spread_y),
                vx: 0.0,
                vy: 0.0,
                r,
            })
            .collect();

        let alpha_decay = 1.0 - ALPHA_MIN.powf(1.0 / COOLING_TICKS);
        let mut alpha = 1.0;

        for _ in 0..self.iterations {
            alpha -= alpha * alpha_decay;
            self.collide(&mut bodies, &mut rng);
            self.confine(&mut bodies, cross, alpha);
            for b in bodies.iter_mut() {
                b.vx *= 1.0 - VELOCITY_DECAY;
                b.vy *= 1.0 - VELOCITY_DECAY;
                b.x += b.vx;
                b.y += b.vy;
            }
        }

        let outside = bodies
            .iter()
            .filter(|b| !cross.is_admissible(b.x, b.y, b.r))
            .count();
        tracing::debug!(
            count = bodies.len(),
            outside,
            iterations = self.iterations,
            "Cross packing settled"
        );

        Ok(bodies.iter().map(|b| Point { x: b.x, y: b.y }).collect())
    }

    /// One collision pass on predicted positions, larger circles moving less.
    fn collide(&self, bodies: &mut [Body], rng: &mut StdRng) {
        for i in 0..bodies.len() {
            let ri = bodies[i].r + self.padding;
            let xi = bodies[i].x + bodies[i].vx;
            let yi = bodies[i].y + bodies[i].vy;
            let ri2 = ri * ri;

            for j in i + 1..bodies.len() {
                let rj = bodies[j].r + self.padding;
                let reach = ri + rj;
                let mut dx = xi - bodies[j].x - bodies[j].vx;
                let mut dy = yi - bodies[j].y - bodies[j].vy;
                let mut l = dx * dx + dy * dy;
                if l >= reach * reach {
                    continue;
                }

                if dx == 0.0 {
                    dx = jiggle(rng);
                    l += dx * dx;
                }
                if dy == 0.0 {
                    dy = jiggle(rng);
                    l += dy * dy;
                }
                let dist = l.sqrt();
                let push = (reach - dist) / dist;
                dx *= push;
                dy *= push;

                let rj2 = rj * rj;
                let share = if ri2 + rj2 > 0.0 { rj2 / (ri2 + rj2) } else { 0.5 };
                bodies[i].vx += dx * share;
                bodies[i].vy += dy * share;
                bodies[j].vx -= dx * (1.0 - share);
                bodies[j].vy -= dy * (1.0 - share);
            }
        }
    }

    /// Pull each circle toward the nearest position inside the cross, inset by
    /// the padding.
    fn confine(&self, bodies: &mut [Body], cross: &CrossShape, alpha: f64) {
        let k = alpha * self.boundary_strength;
        for b in bodies.iter_mut() {
            let target = cross.nearest_admissible(b.x, b.y, b.r + self.padding);
            b.vx += (target.x - b.x) * k;
            b.vy += (target.y - b.y) * k;
        }
    }
}

fn jiggle(rng: &mut StdRng) -> f64 {
    rng.gen_range(-5e-7..5e-7)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outside_share(points: &[Point], radii: &[f64], cross: &CrossShape) -> f64 {
        let outside = points
            .iter()
            .zip(radii)
            .filter(|(p, r)| !cross.is_admissible(p.x, p.y, **r))
            .count();
        outside as f64 / points.len() as f64
    }

    #[test]
    fn test_admissible_region() {
        let cross = CrossShape::new(100.0, 100.0, 30.0).unwrap();
        assert!(cross.is_admissible(0.0, 0.0, 10.0));
        assert!(cross.is_admissible(40.0, 0.0, 5.0));
        assert!(cross.is_admissible(0.0, -40.0, 5.0));
        // Corner gap between the arms.
        assert!(!cross.is_admissible(30.0, 30.0, 1.0));
        // Touching the edge counts as inside, crossing it does not.
        assert!(cross.is_admissible(45.0, 0.0, 5.0));
        assert!(!cross.is_admissible(45.5, 0.0, 5.0));
    }

    #[test]
    fn test_nearest_admissible() {
        let cross = CrossShape::new(100.0, 100.0, 30.0).unwrap();
        let p = cross.nearest_admissible(30.0, 25.0, 5.0);
        assert_eq!(p, Point { x: 30.0, y: 10.0 });
        let q = cross.nearest_admissible(20.0, 45.0, 5.0);
        assert_eq!(q, Point { x: 10.0, y: 45.0 });
        let inside = cross.nearest_admissible(-40.0, 2.0, 5.0);
        assert_eq!(inside, Point { x: -40.0, y: 2.0 });
    }

    #[test]
    fn test_area() {
        let cross = CrossShape::new(100.0, 100.0, 30.0).unwrap();
        assert_eq!(cross.area(), 100.0 * 30.0 * 2.0 - 900.0);
    }

    #[test]
    fn test_invalid_shape() {
        assert!(CrossShape::new(100.0, 100.0, 0.0).is_err());
        assert!(CrossShape::new(100.0, 50.0, 60.0).is_err());
        assert!(CrossShape::new(f64::NAN, 100.0, 10.0).is_err());
    }

    #[test]
    fn test_iterations_reduce_violations() {
        let cross = CrossShape::new(1000.0, 1000.0, 60.0).unwrap();
        let radii = vec![4.0; 30];

        let shares: Vec<f64> = [0, 10, 25, 50, 100, 300]
            .iter()
            .map(|&iterations| {
                let points = pack_in_cross(&radii, &cross, 2.0, iterations, 7).unwrap();
                outside_share(&points, &radii, &cross)
            })
            .collect();

        assert!(shares[0] > 0.0);
        for pair in shares.windows(2) {
            assert!(pair[1] <= pair[0], "outside shares {shares:?}");
        }
        assert!(shares[5] < shares[0], "outside shares {shares:?}");
    }

    #[test]
    fn test_seeded_determinism() {
        let cross = CrossShape::new(400.0, 400.0, 120.0).unwrap();
        let radii: Vec<f64> = (0..25).map(|i| 2.0 + (i % 4) as f64).collect();
        let a = pack_in_cross(&radii, &cross, 1.0, 120, 42).unwrap();
        let b = pack_in_cross(&radii, &cross, 1.0, 120, 42).unwrap();
        assert_eq!(a, b);
        let c = pack_in_cross(&radii, &cross, 1.0, 120, 43).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_overflow_is_not_an_error() {
        let cross = CrossShape::new(50.0, 50.0, 10.0).unwrap();
        let radii = vec![20.0; 5];
        let points = pack_in_cross(&radii, &cross, 0.0, 10, 1).unwrap();
        assert_eq!(points.len(), 5);
        assert!(points.iter().all(|p| p.x.is_finite() && p.y.is_finite()));
    }

    #[test]
    fn test_empty_and_invalid_radii() {
        let cross = CrossShape::new(50.0, 50.0, 10.0).unwrap();
        assert!(pack_in_cross(&[], &cross, 1.0, 10, 1).unwrap().is_empty());
        assert!(pack_in_cross(&[1.0, -1.0], &cross, 1.0, 10, 1).is_err());
    }
}
