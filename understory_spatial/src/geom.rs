// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rectangle helpers with closed-boundary semantics.
//!
//! Kurbo's [`Rect::contains`] is half-open; picking wants a point on the edge of
//! a box to hit it, so the indexes use these helpers instead.

use core::cmp::Ordering;

use kurbo::{Point, Rect};

/// Whether `r` contains `p`, boundary included.
#[inline]
pub fn contains_point(r: &Rect, p: Point) -> bool {
    r.x0 <= p.x && p.x <= r.x1 && r.y0 <= p.y && p.y <= r.y1
}

/// Whether `outer` fully contains `inner`, boundaries included.
#[inline]
pub fn contains_rect(outer: &Rect, inner: &Rect) -> bool {
    outer.x0 <= inner.x0 && outer.y0 <= inner.y0 && inner.x1 <= outer.x1 && inner.y1 <= outer.y1
}

/// Whether two rectangles touch or overlap.
#[inline]
pub fn overlaps(a: &Rect, b: &Rect) -> bool {
    a.x0 <= b.x1 && b.x0 <= a.x1 && a.y0 <= b.y1 && b.y0 <= a.y1
}

/// Area of a rectangle, zero when it is empty or inverted.
#[inline]
pub fn area(r: &Rect) -> f64 {
    (r.x1 - r.x0).max(0.0) * (r.y1 - r.y0).max(0.0)
}

/// Half perimeter, used as a tie-breaker for degenerate (zero-area) boxes.
#[inline]
pub fn margin(r: &Rect) -> f64 {
    (r.x1 - r.x0).max(0.0) + (r.y1 - r.y0).max(0.0)
}

/// Growth in area needed for `r` to also cover `add`.
#[inline]
pub fn enlargement(r: &Rect, add: &Rect) -> f64 {
    area(&r.union(*add)) - area(r)
}

/// Squared distance from `p` to the closest point of `r`; zero inside.
#[inline]
pub fn distance_sq_to_rect(r: &Rect, p: Point) -> f64 {
    let dx = (r.x0 - p.x).max(p.x - r.x1).max(0.0);
    let dy = (r.y0 - p.y).max(p.y - r.y1).max(0.0);
    dx * dx + dy * dy
}

/// Squared distance from `p` to the closed segment `a`-`b`.
///
/// A degenerate segment behaves like the point `a`.
#[inline]
pub fn distance_sq_to_segment(a: Point, b: Point, p: Point) -> f64 {
    let ab = b - a;
    let len2 = ab.hypot2();
    if !(len2 > 0.0) {
        return (p - a).hypot2();
    }
    let t = ((p - a).dot(ab) / len2).clamp(0.0, 1.0);
    (p - (a + ab * t)).hypot2()
}

/// Union of a sequence of rectangles, `None` when the sequence is empty.
pub fn union_all(mut rects: impl Iterator<Item = Rect>) -> Option<Rect> {
    let first = rects.next()?;
    Some(rects.fold(first, |acc, r| acc.union(r)))
}

/// Whether two rectangles agree on every edge within `eps`.
#[inline]
pub fn approx_eq(a: &Rect, b: &Rect, eps: f64) -> bool {
    close(a.x0, b.x0, eps) && close(a.y0, b.y0, eps) && close(a.x1, b.x1, eps) && close(a.y1, b.y1, eps)
}

#[inline]
fn close(a: f64, b: f64, eps: f64) -> bool {
    a - b <= eps && b - a <= eps
}

/// Total order on floats for sorting; NaN compares equal to everything.
#[inline]
pub(crate) fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_containment_includes_edges() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(contains_point(&r, Point::new(10.0, 10.0)));
        assert!(contains_point(&r, Point::new(0.0, 5.0)));
        assert!(!contains_point(&r, Point::new(10.5, 5.0)));
        // Kurbo's own test is half-open.
        assert!(!r.contains(Point::new(10.0, 10.0)));
    }

    #[test]
    fn distance_to_rect_is_zero_inside() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(distance_sq_to_rect(&r, Point::new(5.0, 5.0)), 0.0);
        assert_eq!(distance_sq_to_rect(&r, Point::new(13.0, 14.0)), 9.0 + 16.0);
        assert_eq!(distance_sq_to_rect(&r, Point::new(-2.0, 5.0)), 4.0);
    }

    #[test]
    fn segment_distance_clamps_to_the_ends() {
        let (a, b) = (Point::new(0.0, 0.0), Point::new(10.0, 0.0));
        assert_eq!(distance_sq_to_segment(a, b, Point::new(5.0, 3.0)), 9.0);
        assert_eq!(distance_sq_to_segment(a, b, Point::new(-3.0, 4.0)), 25.0);
        assert_eq!(distance_sq_to_segment(a, b, Point::new(13.0, 0.0)), 9.0);
        assert_eq!(distance_sq_to_segment(a, a, Point::new(0.0, 2.0)), 4.0);
    }

    #[test]
    fn enlargement_of_contained_box_is_zero() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(enlargement(&r, &Rect::new(2.0, 2.0, 3.0, 3.0)), 0.0);
        assert_eq!(enlargement(&r, &Rect::new(0.0, 0.0, 20.0, 10.0)), 100.0);
    }
}
