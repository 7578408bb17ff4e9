//! Fill colors: category colors, the Spectral ramp and cluster palettes.

use serde::{Deserialize, Serialize};

use crate::grant::Category;

/// Fill used when circles are not colored by category.
pub const DEFAULT_FILL: &str = "#dc2626";

/// Spectral diverging scheme, 11 stops from red to blue.
const SPECTRAL: [u32; 11] = [
    0x9e0142, 0xd53e4f, 0xf46d43, 0xfdae61, 0xfee08b, 0xffffbf, 0xe6f598, 0xabdda4, 0x66c2a5,
    0x3288bd, 0x5e4fa2,
];

pub fn category_color(category: Category) -> &'static str {
    match category {
        Category::Projects => "#A3BFA8",
        Category::ScienceCommunication => "#33658A",
        Category::Careers => "#F26419",
        Category::Programmes => "#F6AE2D",
        Category::Infrastructure => "#FF88DC",
    }
}

/// Sample the Spectral ramp at `t` in [0, 1] using a uniform B-spline
/// through the scheme stops.
pub fn interpolate_spectral(t: f64) -> String {
    let channel = |shift: u32| -> Vec<f64> {
        SPECTRAL
            .iter()
            .map(|c| ((c >> shift) & 0xff) as f64)
            .collect()
    };
    let r = basis_spline(&channel(16), t);
    let g = basis_spline(&channel(8), t);
    let b = basis_spline(&channel(0), t);
    format!("rgb({}, {}, {})", to_byte(r), to_byte(g), to_byte(b))
}

fn to_byte(v: f64) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

fn basis_spline(values: &[f64], t: f64) -> f64 {
    let n = values.len() - 1;
    let (t, i) = if t <= 0.0 || t.is_nan() {
        (0.0, 0)
    } else if t >= 1.0 {
        (1.0, n - 1)
    } else {
        (t, (t * n as f64).floor() as usize)
    };

    let v1 = values[i];
    let v2 = values[i + 1];
    let v0 = if i > 0 { values[i - 1] } else { 2.0 * v1 - v2 };
    let v3 = if i < n - 1 { values[i + 2] } else { 2.0 * v2 - v1 };

    let t1 = (t - i as f64 / n as f64) * n as f64;
    let t2 = t1 * t1;
    let t3 = t2 * t1;
    ((1.0 - 3.0 * t1 + 3.0 * t2 - t3) * v0
        + (4.0 - 6.0 * t2 + 3.0 * t3) * v1
        + (1.0 + 3.0 * t1 + 3.0 * t2 - 3.0 * t3) * v2
        + t3 * v3)
        / 6.0
}

/// Colors assigned to clusters by rank.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Palette {
    /// Fixed list of colors, reused cyclically
    Cyclic(Vec<String>),
    /// Samples of the Spectral ramp, skipping its darkest ends
    #[default]
    Spectral,
}

impl Palette {
    /// Color of the cluster ranked `rank` out of `count`.
    pub fn color(&self, rank: usize, count: usize) -> String {
        match self {
            Self::Cyclic(colors) if colors.is_empty() => DEFAULT_FILL.to_string(),
            Self::Cyclic(colors) => colors[rank % colors.len()].clone(),
            Self::Spectral => {
                let t = (2 + rank) as f64 / (count as f64 + 4.0);
                interpolate_spectral(t)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spectral_endpoints() {
        assert_eq!(interpolate_spectral(0.0), "rgb(158, 1, 66)");
        assert_eq!(interpolate_spectral(1.0), "rgb(94, 79, 162)");
    }

    #[test]
    fn test_spectral_is_deterministic() {
        assert_eq!(interpolate_spectral(0.37), interpolate_spectral(0.37));
        assert_ne!(interpolate_spectral(0.2), interpolate_spectral(0.8));
    }

    #[test]
    fn test_cyclic_palette_wraps() {
        let palette = Palette::Cyclic(vec!["#111".into(), "#222".into()]);
        assert_eq!(palette.color(0, 5), "#111");
        assert_eq!(palette.color(3, 5), "#222");
        assert_eq!(Palette::Cyclic(vec![]).color(1, 2), DEFAULT_FILL);
    }

    #[test]
    fn test_spectral_palette_distinct_ranks() {
        let palette = Palette::Spectral;
        assert_ne!(palette.color(0, 6), palette.color(1, 6));
    }
}
