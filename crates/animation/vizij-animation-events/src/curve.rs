//! One-dimensional keyframed curve used to drive parameters continuously.
//!
//! Model:
//! - Keyframes are ordered by time; each carries in/out tangents (value per unit time).
//! - Segment [Ki -> K(i+1)] is a cubic Hermite spline using Ki.out_tangent and K(i+1).in_tangent.
//! - An infinite tangent on either side makes the segment hold the left value (step).
//! - Outside the keyed range the curve clamps to the first/last value.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Keyframe {
    pub time: f32,
    pub value: f32,
    #[serde(default)]
    pub in_tangent: f32,
    #[serde(default)]
    pub out_tangent: f32,
}

impl Keyframe {
    pub fn new(time: f32, value: f32) -> Self {
        Self {
            time,
            value,
            in_tangent: 0.0,
            out_tangent: 0.0,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Curve {
    #[serde(default)]
    pub keys: Vec<Keyframe>,
}

/// Positive remainder; zero divisor maps everything to 0.
fn fmod(a: f32, b: f32) -> f32 {
    if b == 0.0 {
        return 0.0;
    }
    let m = a % b;
    if (m < 0.0 && b > 0.0) || (m > 0.0 && b < 0.0) {
        m + b
    } else {
        m
    }
}

/// Find the segment [i, i+1] containing t, returning (i, i+1, local_s) with
/// local_s in [0, 1]. Returns (i, i, 0) when t is outside the keyed range.
fn find_segment(keys: &[Keyframe], t: f32) -> (usize, usize, f32) {
    let n = keys.len();
    if n == 1 || t <= keys[0].time {
        return (0, 0, 0.0);
    }
    if t >= keys[n - 1].time {
        return (n - 1, n - 1, 0.0);
    }
    // First key strictly after t; keys[0].time < t < keys[n - 1].time here.
    let i1 = keys.partition_point(|k| k.time <= t).clamp(1, n - 1);
    let i0 = i1 - 1;
    let (t0, t1) = (keys[i0].time, keys[i1].time);
    let denom = (t1 - t0).max(f32::EPSILON);
    (i0, i1, ((t - t0) / denom).clamp(0.0, 1.0))
}

impl Curve {
    pub fn new(keys: Vec<Keyframe>) -> Self {
        Self { keys }
    }

    /// Piecewise-linear curve through `points` (tangents set to segment slopes).
    pub fn linear(points: &[(f32, f32)]) -> Self {
        let mut keys: Vec<Keyframe> = points.iter().map(|(t, v)| Keyframe::new(*t, *v)).collect();
        for i in 0..keys.len().saturating_sub(1) {
            let dt = keys[i + 1].time - keys[i].time;
            let slope = if dt > 0.0 {
                (keys[i + 1].value - keys[i].value) / dt
            } else {
                0.0
            };
            keys[i].out_tangent = slope;
            keys[i + 1].in_tangent = slope;
        }
        Self { keys }
    }

    pub fn constant(value: f32) -> Self {
        Self {
            keys: vec![Keyframe::new(0.0, value)],
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Time of the last keyframe, if any.
    pub fn last_time(&self) -> Option<f32> {
        self.keys.last().map(|k| k.time)
    }

    /// Keyframe times must be finite and non-decreasing.
    pub fn validate(&self, param: &str) -> Result<(), ConfigError> {
        let mut last = -f32::INFINITY;
        for k in &self.keys {
            if !k.time.is_finite() || k.time < last {
                return Err(ConfigError::UnsortedCurve {
                    param: param.to_string(),
                });
            }
            last = k.time;
        }
        Ok(())
    }

    /// Sample at `t`. An empty curve samples as 0.0.
    pub fn evaluate(&self, t: f32) -> f32 {
        match self.keys.len() {
            0 => 0.0,
            1 => self.keys[0].value,
            _ => {
                let (i0, i1, s) = find_segment(&self.keys, t);
                let left = &self.keys[i0];
                if i0 == i1 {
                    return left.value;
                }
                let right = &self.keys[i1];
                if !left.out_tangent.is_finite() || !right.in_tangent.is_finite() {
                    return left.value;
                }
                let dt = right.time - left.time;
                let m0 = left.out_tangent * dt;
                let m1 = right.in_tangent * dt;

                let s2 = s * s;
                let s3 = s2 * s;
                let h00 = 2.0 * s3 - 3.0 * s2 + 1.0;
                let h10 = s3 - 2.0 * s2 + s;
                let h01 = -2.0 * s3 + 3.0 * s2;
                let h11 = s3 - s2;
                h00 * left.value + h10 * m0 + h01 * right.value + h11 * m1
            }
        }
    }

    /// Sample at `t`, wrapped modulo the last keyframe time when `repeat` is set.
    pub fn evaluate_wrapped(&self, t: f32, repeat: bool) -> f32 {
        if repeat {
            let period = self.last_time().unwrap_or(0.0);
            self.evaluate(fmod(t, period))
        } else {
            self.evaluate(t)
        }
    }
}
