//! Monotone interpolation curves.
//!
//! Maps a normalized heat sample onto a real-world quantity (people per km²,
//! GDP per capita). Control points are joined with cubic Hermite segments
//! whose tangents are limited (Fritsch–Carlson) so the curve never overshoots
//! between points: a monotone set of points gives a monotone curve. Samples
//! outside the defined domain clamp to the nearest endpoint.

use serde::{Deserialize, Serialize};

/// A single control point.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub time: f32,
    pub value: f32,
}

impl CurvePoint {
    pub const fn new(time: f32, value: f32) -> Self {
        Self { time, value }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<CurvePoint>", into = "Vec<CurvePoint>")]
pub struct InterpolationCurve {
    points: Vec<CurvePoint>,
    tangents: Vec<f32>,
}

impl From<Vec<CurvePoint>> for InterpolationCurve {
    fn from(points: Vec<CurvePoint>) -> Self {
        Self::new(points)
    }
}

impl From<InterpolationCurve> for Vec<CurvePoint> {
    fn from(curve: InterpolationCurve) -> Self {
        curve.points
    }
}

impl InterpolationCurve {
    /// Build a curve; points are sorted by time and duplicate times keep the last value.
    pub fn new(mut points: Vec<CurvePoint>) -> Self {
        points.retain(|p| p.time.is_finite() && p.value.is_finite());
        points.sort_by(|a, b| a.time.total_cmp(&b.time));

        let mut unique: Vec<CurvePoint> = Vec::with_capacity(points.len());
        for point in points {
            match unique.last_mut() {
                Some(last) if last.time == point.time => *last = point,
                _ => unique.push(point),
            }
        }

        let tangents = monotone_tangents(&unique);
        Self {
            points: unique,
            tangents,
        }
    }

    /// Straight line from (0, from) to (1, to).
    pub fn linear(from: f32, to: f32) -> Self {
        Self::new(vec![CurvePoint::new(0.0, from), CurvePoint::new(1.0, to)])
    }

    pub fn points(&self) -> &[CurvePoint] {
        &self.points
    }

    pub fn evaluate(&self, t: f32) -> f32 {
        let (first, last) = match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return 0.0,
        };
        if t <= first.time {
            return first.value;
        }
        if t >= last.time {
            return last.value;
        }

        // Index of the segment's right end: first point strictly after t.
        let k = self.points.partition_point(|p| p.time <= t);
        let p0 = self.points[k - 1];
        let p1 = self.points[k];
        let h = p1.time - p0.time;
        let s = (t - p0.time) / h;

        hermite(p0.value, p1.value, self.tangents[k - 1] * h, self.tangents[k] * h, s)
    }
}

/// Cubic Hermite basis evaluation on a unit segment.
fn hermite(y0: f32, y1: f32, m0: f32, m1: f32, s: f32) -> f32 {
    let s2 = s * s;
    let s3 = s2 * s;

    (2.0 * s3 - 3.0 * s2 + 1.0) * y0
        + (s3 - 2.0 * s2 + s) * m0
        + (-2.0 * s3 + 3.0 * s2) * y1
        + (s3 - s2) * m1
}

/// Fritsch–Carlson tangents for a sorted point list.
fn monotone_tangents(points: &[CurvePoint]) -> Vec<f32> {
    let n = points.len();
    if n < 2 {
        return vec![0.0; n];
    }

    let secants: Vec<f32> = points
        .windows(2)
        .map(|w| (w[1].value - w[0].value) / (w[1].time - w[0].time))
        .collect();

    let mut tangents = vec![0.0f32; n];
    tangents[0] = secants[0];
    tangents[n - 1] = secants[n - 2];
    for k in 1..n - 1 {
        let (a, b) = (secants[k - 1], secants[k]);
        tangents[k] = if a * b > 0.0 { (a + b) / 2.0 } else { 0.0 };
    }

    for k in 0..n - 1 {
        let delta = secants[k];
        if delta == 0.0 {
            tangents[k] = 0.0;
            tangents[k + 1] = 0.0;
            continue;
        }
        let alpha = tangents[k] / delta;
        let beta = tangents[k + 1] / delta;
        let magnitude = alpha * alpha + beta * beta;
        if magnitude > 9.0 {
            let tau = 3.0 / magnitude.sqrt();
            tangents[k] = tau * alpha * delta;
            tangents[k + 1] = tau * beta * delta;
        }
    }

    tangents
}
