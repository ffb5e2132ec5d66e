//! Planar polyline helpers used by lanelet rules and repairs.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn lerp(self, other: Point, t: f64) -> Point {
        Point::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }

    pub fn midpoint(self, other: Point) -> Point {
        self.lerp(other, 0.5)
    }
}

pub fn polyline_length(polyline: &[Point]) -> f64 {
    polyline.windows(2).map(|w| w[0].distance(w[1])).sum()
}

/// Resample `polyline` to exactly `count` vertices evenly spaced by arc length.
///
/// The first and last vertices are preserved. An empty input stays empty.
pub fn resample(polyline: &[Point], count: usize) -> Vec<Point> {
    if polyline.is_empty() || count == 0 {
        return Vec::new();
    }
    if polyline.len() == 1 || count == 1 {
        return vec![polyline[0]; count];
    }

    let total = polyline_length(polyline);
    if total == 0.0 {
        return vec![polyline[0]; count];
    }

    let mut out = Vec::with_capacity(count);
    let mut seg = 0usize;
    let mut seg_start = 0.0f64;
    for i in 0..count {
        let target = total * (i as f64) / ((count - 1) as f64);
        while seg + 1 < polyline.len() - 1 {
            let seg_len = polyline[seg].distance(polyline[seg + 1]);
            if seg_start + seg_len >= target {
                break;
            }
            seg_start += seg_len;
            seg += 1;
        }
        let seg_len = polyline[seg].distance(polyline[seg + 1]);
        let t = if seg_len == 0.0 {
            0.0
        } else {
            ((target - seg_start) / seg_len).clamp(0.0, 1.0)
        };
        out.push(polyline[seg].lerp(polyline[seg + 1], t));
    }
    if let (Some(last_out), Some(last_in)) = (out.last_mut(), polyline.last()) {
        *last_out = *last_in;
    }
    out
}

/// Pairwise midpoints of two boundaries, resampling to a common vertex count
/// when their sizes differ.
pub fn centerline(left: &[Point], right: &[Point]) -> Vec<Point> {
    if left.is_empty() || right.is_empty() {
        return Vec::new();
    }
    if left.len() == right.len() {
        return left
            .iter()
            .zip(right)
            .map(|(l, r)| l.midpoint(*r))
            .collect();
    }
    let n = left.len().max(right.len());
    let l = resample(left, n);
    let r = resample(right, n);
    l.iter().zip(&r).map(|(a, b)| a.midpoint(*b)).collect()
}

fn cross(o: Point, a: Point, b: Point) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

fn on_segment(p: Point, a: Point, b: Point) -> bool {
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

/// Intersection point of the closed segments `p1p2` and `q1q2`, if any.
///
/// For collinear overlapping segments one of the shared endpoints is returned.
pub fn segment_intersection(p1: Point, p2: Point, q1: Point, q2: Point) -> Option<Point> {
    let d1 = cross(q1, q2, p1);
    let d2 = cross(q1, q2, p2);
    let d3 = cross(p1, p2, q1);
    let d4 = cross(p1, p2, q2);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        let t = d1 / (d1 - d2);
        return Some(p1.lerp(p2, t));
    }

    if d1 == 0.0 && on_segment(p1, q1, q2) {
        return Some(p1);
    }
    if d2 == 0.0 && on_segment(p2, q1, q2) {
        return Some(p2);
    }
    if d3 == 0.0 && on_segment(q1, p1, p2) {
        return Some(q1);
    }
    if d4 == 0.0 && on_segment(q2, p1, p2) {
        return Some(q2);
    }
    None
}

/// First pair of non-adjacent segments `(i, j)` (segment `i` runs from vertex
/// `i` to `i + 1`) that intersect, with the intersection point.
pub fn first_self_intersection(polyline: &[Point]) -> Option<(usize, usize, Point)> {
    let segments = polyline.len().saturating_sub(1);
    for i in 0..segments {
        for j in (i + 2)..segments {
            if let Some(p) = segment_intersection(
                polyline[i],
                polyline[i + 1],
                polyline[j],
                polyline[j + 1],
            ) {
                return Some((i, j, p));
            }
        }
    }
    None
}

pub fn is_self_intersecting(polyline: &[Point]) -> bool {
    first_self_intersection(polyline).is_some()
}

/// Number of intersecting non-adjacent segment pairs.
pub fn self_intersection_count(polyline: &[Point]) -> usize {
    let segments = polyline.len().saturating_sub(1);
    let mut count = 0;
    for i in 0..segments {
        for j in (i + 2)..segments {
            if segment_intersection(polyline[i], polyline[i + 1], polyline[j], polyline[j + 1])
                .is_some()
            {
                count += 1;
            }
        }
    }
    count
}

/// Cut the first loop of a self-intersecting polyline at its crossing point.
///
/// Vertices strictly between the two crossing segments are replaced by the
/// crossing point. The new segments lie on the old ones, so the number of
/// crossings strictly decreases. Returns `false` when there is no loop.
pub fn remove_first_loop(polyline: &mut Vec<Point>) -> bool {
    let Some((i, j, crossing)) = first_self_intersection(polyline) else {
        return false;
    };
    polyline.splice(i + 1..=j, std::iter::once(crossing));
    polyline.dedup();
    true
}

fn point_segment_distance(p: Point, a: Point, b: Point) -> f64 {
    let len2 = (b.x - a.x).powi(2) + (b.y - a.y).powi(2);
    if len2 == 0.0 {
        return p.distance(a);
    }
    let t = (((p.x - a.x) * (b.x - a.x) + (p.y - a.y) * (b.y - a.y)) / len2).clamp(0.0, 1.0);
    p.distance(a.lerp(b, t))
}

/// Distance from `p` to the closest point of `polyline` (`None` if empty).
pub fn distance_to_polyline(p: Point, polyline: &[Point]) -> Option<f64> {
    match polyline {
        [] => None,
        [only] => Some(p.distance(*only)),
        _ => polyline
            .windows(2)
            .map(|w| point_segment_distance(p, w[0], w[1]))
            .min_by(f64::total_cmp),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn pts(raw: &[(f64, f64)]) -> Vec<Point> {
        raw.iter().map(|&(x, y)| Point::new(x, y)).collect()
    }

    #[test]
    fn resample_keeps_endpoints_and_spacing() {
        let line = pts(&[(0.0, 0.0), (10.0, 0.0)]);
        let out = resample(&line, 5);
        assert_eq!(out.len(), 5);
        assert_relative_eq!(out[0].x, 0.0);
        assert_relative_eq!(out[2].x, 5.0);
        assert_relative_eq!(out[4].x, 10.0);
    }

    #[test]
    fn resample_follows_corners() {
        let line = pts(&[(0.0, 0.0), (2.0, 0.0), (2.0, 2.0)]);
        let out = resample(&line, 3);
        assert_relative_eq!(out[1].x, 2.0);
        assert_relative_eq!(out[1].y, 0.0);
        assert_relative_eq!(out[2].y, 2.0);
    }

    #[test]
    fn crossing_segments_intersect_at_expected_point() {
        let p = segment_intersection(
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(2.0, 2.0),
            Point::new(2.0, -2.0),
        )
        .expect("crossing");
        assert_relative_eq!(p.x, 2.0);
        assert_relative_eq!(p.y, 0.0);
    }

    #[test]
    fn parallel_segments_do_not_intersect() {
        assert!(segment_intersection(
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(0.0, 1.0),
            Point::new(4.0, 1.0),
        )
        .is_none());
    }

    #[test]
    fn loop_removal_untangles_one_loop_at_a_time() {
        let mut line = pts(&[
            (0.0, 0.0),
            (4.0, 0.0),
            (4.0, 2.0),
            (2.0, 2.0),
            (2.0, -2.0),
            (6.0, -2.0),
            (10.0, -2.0),
            (10.0, 0.0),
            (8.0, 0.0),
            (8.0, -4.0),
            (12.0, -4.0),
        ]);
        assert_eq!(self_intersection_count(&line), 2);
        assert!(remove_first_loop(&mut line));
        assert_eq!(self_intersection_count(&line), 1);
        assert!(remove_first_loop(&mut line));
        assert!(!is_self_intersecting(&line));
        assert!(!remove_first_loop(&mut line));
    }

    #[test]
    fn distance_to_polyline_projects_onto_segments() {
        let line = pts(&[(0.0, 0.0), (10.0, 0.0)]);
        assert_relative_eq!(
            distance_to_polyline(Point::new(5.0, 3.0), &line).expect("non-empty"),
            3.0
        );
        assert!(distance_to_polyline(Point::new(0.0, 0.0), &[]).is_none());
    }

    #[test]
    fn centerline_of_unequal_boundaries() {
        let left = pts(&[(0.0, 1.0), (5.0, 1.0), (10.0, 1.0)]);
        let right = pts(&[(0.0, -1.0), (10.0, -1.0)]);
        let center = centerline(&left, &right);
        assert_eq!(center.len(), 3);
        assert_relative_eq!(center[1].x, 5.0);
        assert_relative_eq!(center[1].y, 0.0);
    }
}
