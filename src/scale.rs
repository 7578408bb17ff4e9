//! Scales mapping data domains onto pixel ranges.
//!
//! Continuous scales (linear and square-root) extrapolate outside their
//! domain. Band scales split a range into equal-width slots, one per
//! category, separated by a gap of `padding * bandwidth`.

use serde::Serialize;
use std::collections::HashSet;

use crate::error::{LayoutError, ensure_finite};

const E10: f64 = 7.0710678118654755; // sqrt(50)
const E5: f64 = 3.1622776601683795; // sqrt(10)
const E2: f64 = std::f64::consts::SQRT_2;

/// Default tick count used when nicing a domain.
pub const DEFAULT_TICK_COUNT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ScaleKind {
    Linear,
    Sqrt,
    Band,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Domain {
    Continuous(f64, f64),
    Categorical(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScaleOptions {
    /// Band gap as a fraction of the bandwidth, in [0, 1)
    pub padding: f64,
    /// Extend a continuous domain to round tick values
    pub nice: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinearScale {
    domain: [f64; 2],
    range: [f64; 2],
}

impl LinearScale {
    pub fn new(d0: f64, d1: f64, r0: f64, r1: f64) -> Result<Self, LayoutError> {
        check_continuous(d0, d1, r0, r1)?;
        Ok(Self {
            domain: [d0, d1],
            range: [r0, r1],
        })
    }

    pub fn scale(&self, value: f64) -> f64 {
        interpolate(self.domain[0], self.domain[1], self.range, value)
    }

    pub fn domain(&self) -> [f64; 2] {
        self.domain
    }

    pub fn range(&self) -> [f64; 2] {
        self.range
    }

    pub fn ticks(&self, count: usize) -> Vec<f64> {
        ticks(self.domain[0], self.domain[1], count)
    }

    pub fn nice(mut self, count: usize) -> Self {
        self.domain = nice_domain(self.domain, count);
        self
    }
}

/// Power scale with exponent 0.5: output grows with the square root of the
/// input, so areas stay proportional to values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqrtScale {
    domain: [f64; 2],
    range: [f64; 2],
}

impl SqrtScale {
    pub fn new(d0: f64, d1: f64, r0: f64, r1: f64) -> Result<Self, LayoutError> {
        check_continuous(d0, d1, r0, r1)?;
        Ok(Self {
            domain: [d0, d1],
            range: [r0, r1],
        })
    }

    pub fn scale(&self, value: f64) -> f64 {
        interpolate(
            signed_sqrt(self.domain[0]),
            signed_sqrt(self.domain[1]),
            self.range,
            signed_sqrt(value),
        )
    }

    pub fn domain(&self) -> [f64; 2] {
        self.domain
    }

    pub fn range(&self) -> [f64; 2] {
        self.range
    }

    pub fn ticks(&self, count: usize) -> Vec<f64> {
        ticks(self.domain[0], self.domain[1], count)
    }

    pub fn nice(mut self, count: usize) -> Self {
        self.domain = nice_domain(self.domain, count);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandScale {
    domain: Vec<String>,
    range: [f64; 2],
    padding: f64,
    bandwidth: f64,
    step: f64,
}

impl BandScale {
    pub fn new(
        categories: Vec<String>,
        r0: f64,
        r1: f64,
        padding: f64,
    ) -> Result<Self, LayoutError> {
        if categories.is_empty() {
            return Err(LayoutError::config("categories", "band scale needs at least one category"));
        }
        let mut seen = HashSet::with_capacity(categories.len());
        if let Some(dup) = categories.iter().find(|c| !seen.insert(c.as_str())) {
            return Err(LayoutError::config("categories", format!("duplicate category {dup:?}")));
        }
        ensure_finite("padding", padding)?;
        if !(0.0..1.0).contains(&padding) {
            return Err(LayoutError::config("padding", format!("{padding} is outside [0, 1)")));
        }
        ensure_finite("range", r0)?;
        ensure_finite("range", r1)?;
        if r1 < r0 {
            return Err(LayoutError::config("range", format!("[{r0}, {r1}] is reversed")));
        }

        let n = categories.len() as f64;
        let bandwidth = (r1 - r0) / (n * (1.0 + padding) - padding);

        Ok(Self {
            domain: categories,
            range: [r0, r1],
            padding,
            bandwidth,
            step: bandwidth * (1.0 + padding),
        })
    }

    /// Start of the band assigned to `category`.
    pub fn position(&self, category: &str) -> Option<f64> {
        self.domain
            .iter()
            .position(|c| c == category)
            .map(|i| self.range[0] + i as f64 * self.step)
    }

    pub fn center(&self, category: &str) -> Option<f64> {
        self.position(category).map(|x| x + self.bandwidth / 2.0)
    }

    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn domain(&self) -> &[String] {
        &self.domain
    }

    pub fn range(&self) -> [f64; 2] {
        self.range
    }
}

/// A scale of any kind, as handed to renderers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ScaleDescriptor {
    Linear(LinearScale),
    Sqrt(SqrtScale),
    Band(BandScale),
}

impl ScaleDescriptor {
    pub fn kind(&self) -> ScaleKind {
        match self {
            Self::Linear(_) => ScaleKind::Linear,
            Self::Sqrt(_) => ScaleKind::Sqrt,
            Self::Band(_) => ScaleKind::Band,
        }
    }

    /// Map a continuous value; `None` for band scales.
    pub fn map_value(&self, value: f64) -> Option<f64> {
        match self {
            Self::Linear(s) => Some(s.scale(value)),
            Self::Sqrt(s) => Some(s.scale(value)),
            Self::Band(_) => None,
        }
    }

    /// Map a category to its band start; `None` for continuous scales.
    pub fn map_category(&self, category: &str) -> Option<f64> {
        match self {
            Self::Band(s) => s.position(category),
            _ => None,
        }
    }
}

/// Build a scale of the requested kind.
pub fn build_scale(
    kind: ScaleKind,
    domain: Domain,
    range: (f64, f64),
    options: ScaleOptions,
) -> Result<ScaleDescriptor, LayoutError> {
    let (r0, r1) = range;
    match (kind, domain) {
        (ScaleKind::Linear, Domain::Continuous(d0, d1)) => {
            let scale = LinearScale::new(d0, d1, r0, r1)?;
            Ok(ScaleDescriptor::Linear(match options.nice {
                Some(count) => scale.nice(count),
                None => scale,
            }))
        }
        (ScaleKind::Sqrt, Domain::Continuous(d0, d1)) => {
            let scale = SqrtScale::new(d0, d1, r0, r1)?;
            Ok(ScaleDescriptor::Sqrt(match options.nice {
                Some(count) => scale.nice(count),
                None => scale,
            }))
        }
        (ScaleKind::Band, Domain::Categorical(categories)) => Ok(ScaleDescriptor::Band(
            BandScale::new(categories, r0, r1, options.padding)?,
        )),
        (kind, _) => Err(LayoutError::config(
            "domain",
            format!("{kind:?} scale does not accept this domain"),
        )),
    }
}

/// Round tick values covering `[start, stop]`, roughly `count` of them,
/// spaced by 1, 2 or 5 times a power of ten.
pub fn ticks(start: f64, stop: f64, count: usize) -> Vec<f64> {
    if count == 0 || !start.is_finite() || !stop.is_finite() {
        return vec![];
    }
    if start == stop {
        return vec![start];
    }

    let reverse = stop < start;
    let (lo, hi) = if reverse { (stop, start) } else { (start, stop) };
    let (i1, i2, inc) = tick_spec(lo, hi, count as f64);
    if !(i2 >= i1) {
        return vec![];
    }

    let n = (i2 - i1 + 1.0) as usize;
    let mut values: Vec<f64> = (0..n)
        .map(|i| {
            let k = i1 + i as f64;
            if inc < 0.0 { k / -inc } else { k * inc }
        })
        .collect();

    if reverse {
        values.reverse();
    }
    values
}

/// Tick step for `[start, stop]`; negative values encode `1 / step`.
pub fn tick_increment(start: f64, stop: f64, count: usize) -> f64 {
    tick_spec(start, stop, count as f64).2
}

fn tick_spec(start: f64, stop: f64, count: f64) -> (f64, f64, f64) {
    let step = (stop - start) / count.max(0.0);
    let power = step.log10().floor();
    let error = step / 10f64.powf(power);
    let factor = if error >= E10 {
        10.0
    } else if error >= E5 {
        5.0
    } else if error >= E2 {
        2.0
    } else {
        1.0
    };

    let (mut i1, mut i2, inc);
    if power < 0.0 {
        let k = 10f64.powf(-power) / factor;
        i1 = (start * k).round();
        i2 = (stop * k).round();
        if i1 / k < start {
            i1 += 1.0;
        }
        if i2 / k > stop {
            i2 -= 1.0;
        }
        inc = -k;
    } else {
        let k = 10f64.powf(power) * factor;
        i1 = (start / k).round();
        i2 = (stop / k).round();
        if i1 * k < start {
            i1 += 1.0;
        }
        if i2 * k > stop {
            i2 -= 1.0;
        }
        inc = k;
    }

    if i2 < i1 && (0.5..2.0).contains(&count) {
        return tick_spec(start, stop, count * 2.0);
    }
    (i1, i2, inc)
}

/// Extend a domain outward to tick-aligned values.
fn nice_domain(domain: [f64; 2], count: usize) -> [f64; 2] {
    let reversed = domain[1] < domain[0];
    let (mut start, mut stop) = if reversed {
        (domain[1], domain[0])
    } else {
        (domain[0], domain[1])
    };
    if start == stop || !start.is_finite() || !stop.is_finite() || count == 0 {
        return domain;
    }

    let mut prestep: Option<f64> = None;
    for _ in 0..10 {
        let step = tick_increment(start, stop, count);
        if prestep == Some(step) {
            return if reversed { [stop, start] } else { [start, stop] };
        } else if step > 0.0 {
            start = (start / step).floor() * step;
            stop = (stop / step).ceil() * step;
        } else if step < 0.0 {
            start = (start * step).ceil() / step;
            stop = (stop * step).floor() / step;
        } else {
            break;
        }
        prestep = Some(step);
    }

    domain
}

fn check_continuous(d0: f64, d1: f64, r0: f64, r1: f64) -> Result<(), LayoutError> {
    ensure_finite("domain", d0)?;
    ensure_finite("domain", d1)?;
    ensure_finite("range", r0)?;
    ensure_finite("range", r1)
}

fn interpolate(t0: f64, t1: f64, range: [f64; 2], t: f64) -> f64 {
    let span = t1 - t0;
    let u = if span == 0.0 { 0.5 } else { (t - t0) / span };
    range[0] + u * (range[1] - range[0])
}

fn signed_sqrt(x: f64) -> f64 {
    if x < 0.0 { -(-x).sqrt() } else { x.sqrt() }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_linear_extrapolates() {
        let s = LinearScale::new(0.0, 10.0, 0.0, 100.0).unwrap();
        assert!(close(s.scale(5.0), 50.0));
        assert!(close(s.scale(20.0), 200.0));
        assert!(close(s.scale(-1.0), -10.0));
    }

    #[test]
    fn test_linear_flat_domain_maps_to_middle() {
        let s = LinearScale::new(3.0, 3.0, 0.0, 80.0).unwrap();
        assert!(close(s.scale(3.0), 40.0));
    }

    #[test]
    fn test_sqrt_area_law() {
        let s = SqrtScale::new(0.0, 1_000_000.0, 0.0, 50.0).unwrap();
        for v in [1.0, 250.0, 12_345.0, 200_000.0] {
            assert!(close(s.scale(4.0 * v), 2.0 * s.scale(v)));
        }
    }

    #[test]
    fn test_sqrt_monotonic() {
        let s = SqrtScale::new(100.0, 900.0, 2.0, 30.0).unwrap();
        assert!(close(s.scale(100.0), 2.0));
        assert!(close(s.scale(900.0), 30.0));
        assert!(s.scale(400.0) > s.scale(200.0));
    }

    #[test]
    fn test_band_scale_without_padding() {
        let cats = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        let s = BandScale::new(cats, 0.0, 90.0, 0.0).unwrap();
        assert!(close(s.bandwidth(), 30.0));
        assert!(close(s.position("A").unwrap(), 0.0));
        assert!(close(s.position("B").unwrap(), 30.0));
        assert!(close(s.position("C").unwrap(), 60.0));
        assert_eq!(s.position("D"), None);
    }

    #[test]
    fn test_band_scale_padding_fills_range() {
        let cats: Vec<String> = (0..4).map(|i| format!("c{i}")).collect();
        let s = BandScale::new(cats, 10.0, 110.0, 0.25).unwrap();
        let last = s.position("c3").unwrap() + s.bandwidth();
        assert!(close(last, 110.0));
        assert!(close(s.step() - s.bandwidth(), 0.25 * s.bandwidth()));
    }

    #[test]
    fn test_band_scale_rejects_bad_input() {
        assert!(BandScale::new(vec![], 0.0, 10.0, 0.1).is_err());
        assert!(BandScale::new(vec!["a".into()], 0.0, 10.0, 1.0).is_err());
        assert!(BandScale::new(vec!["a".into()], 0.0, 10.0, -0.1).is_err());
        assert!(BandScale::new(vec!["a".into(), "a".into()], 0.0, 10.0, 0.0).is_err());
    }

    #[test]
    fn test_ticks() {
        assert_eq!(ticks(0.0, 10.0, 5), vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
        assert_eq!(ticks(0.0, 1.0, 5), vec![0.0, 0.2, 0.4, 0.6, 0.8, 1.0]);
        assert_eq!(ticks(0.0, 2_600_000.0, 4).len(), 6);
        assert_eq!(ticks(1.0, 1.0, 5), vec![1.0]);
        assert!(ticks(0.0, 10.0, 0).is_empty());
    }

    #[test]
    fn test_nice_domain() {
        let s = LinearScale::new(0.13, 9.7, 0.0, 1.0).unwrap().nice(10);
        assert_eq!(s.domain(), [0.0, 10.0]);

        let s = SqrtScale::new(1_234.0, 987_654.0, 0.0, 1.0).unwrap().nice(10);
        assert_eq!(s.domain(), [0.0, 1_000_000.0]);
    }

    #[test]
    fn test_build_scale_kind_mismatch() {
        let err = build_scale(
            ScaleKind::Band,
            Domain::Continuous(0.0, 1.0),
            (0.0, 1.0),
            ScaleOptions::default(),
        );
        assert!(err.is_err());

        let ok = build_scale(
            ScaleKind::Sqrt,
            Domain::Continuous(0.0, 100.0),
            (0.0, 10.0),
            ScaleOptions::default(),
        )
        .unwrap();
        assert_eq!(ok.kind(), ScaleKind::Sqrt);
        assert!(close(ok.map_value(25.0).unwrap(), 5.0));
        assert_eq!(ok.map_category("x"), None);
    }
}
