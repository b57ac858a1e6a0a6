//! Easing laws and path interpolation for animations.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::KernelError;

/// Easing law of an animation, spelled like the classic effect flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Effect {
    /// `==`
    Linear,
    /// `<`: cubic ease-in.
    EaseIn,
    /// `>`: cubic ease-out.
    EaseOut,
    /// `<>`: squared sine over a half period.
    #[default]
    EaseInOut,
}

impl Effect {
    /// Progress in `[0, 1]` after the fraction `x` of the duration.
    pub fn ease(&self, x: f64) -> f64 {
        match self {
            Effect::Linear => x,
            Effect::EaseIn => x * x * x,
            Effect::EaseOut => {
                let y = x - 1.0;
                y * y * y + 1.0
            }
            Effect::EaseInOut => (x * std::f64::consts::FRAC_PI_2).sin().powi(2),
        }
    }

    pub fn flag(&self) -> &'static str {
        match self {
            Effect::Linear => "==",
            Effect::EaseIn => "<",
            Effect::EaseOut => ">",
            Effect::EaseInOut => "<>",
        }
    }
}

impl FromStr for Effect {
    type Err = KernelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "==" => Ok(Effect::Linear),
            "<" => Ok(Effect::EaseIn),
            ">" => Ok(Effect::EaseOut),
            "<>" | "--" => Ok(Effect::EaseInOut),
            other => Err(KernelError::InvalidEffect {
                effect: other.to_string(),
            }),
        }
    }
}

/// Polynomial through equidistant nodes `0, 1, ..., n-1`, evaluated in
/// barycentric form.
#[derive(Debug, Clone, PartialEq)]
pub struct Neville {
    points: Vec<[f64; 2]>,
    weights: Vec<f64>,
}

impl Neville {
    pub fn new(points: Vec<[f64; 2]>) -> Result<Self, KernelError> {
        if points.is_empty() {
            return Err(KernelError::EmptyPath);
        }
        let n = points.len() - 1;
        let mut weights = Vec::with_capacity(points.len());
        let mut sign = 1.0;
        for i in 0..=n {
            weights.push(binomial(n, i) * sign);
            sign = -sign;
        }
        Ok(Self { points, weights })
    }

    /// Largest parameter value; the curve passes node `i` at `t == i`.
    pub fn max_param(&self) -> f64 {
        (self.points.len() - 1) as f64
    }

    pub fn evaluate(&self, t: f64) -> [f64; 2] {
        let mut num = [0.0, 0.0];
        let mut denom = 0.0;
        let mut d = t;
        for (p, w) in self.points.iter().zip(&self.weights) {
            if d == 0.0 {
                return *p;
            }
            let s = w / d;
            d -= 1.0;
            num[0] += p[0] * s;
            num[1] += p[1] * s;
            denom += s;
        }
        [num[0] / denom, num[1] / denom]
    }
}

fn binomial(n: usize, k: usize) -> f64 {
    let k = k.min(n - k);
    (0..k).fold(1.0, |acc, i| acc * (n - i) as f64 / (i + 1) as f64)
}

/// Piecewise-linear position along `points` at fraction `x` of the total.
///
/// The fraction is split evenly across segments, independent of their length.
pub fn polyline_at(points: &[[f64; 2]], x: f64) -> Option<[f64; 2]> {
    let last = points.len().checked_sub(1)?;
    if last == 0 {
        return Some(points[0]);
    }
    let scaled = x.clamp(0.0, 1.0) * last as f64;
    let i = (scaled.floor() as usize).min(last - 1);
    let part = scaled - i as f64;
    let (a, b) = (points[i], points[i + 1]);
    Some([(1.0 - part) * a[0] + part * b[0], (1.0 - part) * a[1] + part * b[1]])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effects_hit_endpoints() {
        for effect in [Effect::Linear, Effect::EaseIn, Effect::EaseOut, Effect::EaseInOut] {
            assert!(effect.ease(0.0).abs() < 1e-12, "{:?}", effect);
            assert!((effect.ease(1.0) - 1.0).abs() < 1e-12, "{:?}", effect);
        }
    }

    #[test]
    fn test_ease_in_out_is_symmetric() {
        let e = Effect::EaseInOut;
        for k in 0..=10 {
            let x = k as f64 / 10.0;
            assert!((e.ease(x) + e.ease(1.0 - x) - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_effect_flags_parse() {
        assert_eq!("<>".parse::<Effect>().unwrap(), Effect::EaseInOut);
        assert_eq!("==".parse::<Effect>().unwrap(), Effect::Linear);
        assert!(matches!(
            "~".parse::<Effect>(),
            Err(KernelError::InvalidEffect { .. })
        ));
    }

    #[test]
    fn test_neville_passes_through_nodes() {
        let n = Neville::new(vec![[0.0, 0.0], [1.0, 1.0], [2.0, 4.0]]).unwrap();
        assert_eq!(n.evaluate(1.0), [1.0, 1.0]);
        let mid = n.evaluate(1.5);
        // Quadratic through the nodes: y = x^2, x = t.
        assert!((mid[0] - 1.5).abs() < 1e-12);
        assert!((mid[1] - 2.25).abs() < 1e-12);
        assert_eq!(n.max_param(), 2.0);
    }

    #[test]
    fn test_neville_rejects_empty_path() {
        assert_eq!(Neville::new(vec![]), Err(KernelError::EmptyPath));
    }

    #[test]
    fn test_polyline_at() {
        let pts = [[0.0, 0.0], [2.0, 0.0], [2.0, 4.0]];
        assert_eq!(polyline_at(&pts, 0.25), Some([1.0, 0.0]));
        assert_eq!(polyline_at(&pts, 1.0), Some([2.0, 4.0]));
        assert_eq!(polyline_at(&[], 0.5), None);
    }
}
