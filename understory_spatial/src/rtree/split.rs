// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node-splitting heuristics for the R-tree.
//!
//! A splitter receives the `M + 1` entries of an overflowing node and returns
//! two groups, each holding at least `min_entries`. Three strategies ship:
//!
//! - [`SplitStrategy::Quadratic`]: Guttman's quadratic split. Seeds are the
//!   pair that would waste the most area together; remaining entries go, most
//!   decisive first, to the group they enlarge least.
//! - [`SplitStrategy::Linear`]: Guttman's linear split. Seeds are the pair with
//!   the greatest normalized separation along either axis; the rest are
//!   assigned in order by least enlargement.
//! - [`SplitStrategy::SurfaceArea`]: sort by centroid along each axis and
//!   choose the cut `k` minimizing `area(L_k) * k + area(R_k) * (n - k)`,
//!   evaluated in O(n) per axis with prefix and suffix unions.

use alloc::vec::Vec;

use kurbo::Rect;

use crate::geom::{area, cmp_f64, enlargement, margin};

/// Partitions the entries of an overflowing node into two groups.
pub trait Splitter {
    /// Split `entries` into two groups of at least `min_entries` each.
    ///
    /// `bounds_of` yields the bounding box of an entry. `entries` holds at
    /// least two items.
    fn split<E>(
        &self,
        entries: Vec<E>,
        min_entries: usize,
        bounds_of: &dyn Fn(&E) -> Rect,
    ) -> (Vec<E>, Vec<E>);
}

/// Built-in splitting heuristics.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum SplitStrategy {
    /// Guttman's quadratic split.
    #[default]
    Quadratic,
    /// Guttman's linear split.
    Linear,
    /// Centroid sweep minimizing area weighted by entry count.
    SurfaceArea,
}

impl Splitter for SplitStrategy {
    fn split<E>(
        &self,
        entries: Vec<E>,
        min_entries: usize,
        bounds_of: &dyn Fn(&E) -> Rect,
    ) -> (Vec<E>, Vec<E>) {
        let boxes: Vec<Rect> = entries.iter().map(bounds_of).collect();
        let min_entries = min_entries.clamp(1, boxes.len() / 2);
        let left = match self {
            Self::Quadratic => quadratic(&boxes, min_entries),
            Self::Linear => linear(&boxes, min_entries),
            Self::SurfaceArea => surface_area(&boxes, min_entries),
        };
        distribute(entries, &left)
    }
}

/// Move entries into (left, right) according to a membership mask.
fn distribute<E>(entries: Vec<E>, left_mask: &[bool]) -> (Vec<E>, Vec<E>) {
    let mut left = Vec::new();
    let mut right = Vec::new();
    for (e, &is_left) in entries.into_iter().zip(left_mask) {
        if is_left {
            left.push(e);
        } else {
            right.push(e);
        }
    }
    (left, right)
}

fn quadratic(boxes: &[Rect], min_entries: usize) -> Vec<bool> {
    let n = boxes.len();
    let (mut seed_a, mut seed_b, mut worst) = (0, 1, f64::NEG_INFINITY);
    for i in 0..n {
        for j in i + 1..n {
            let waste = area(&boxes[i].union(boxes[j])) - area(&boxes[i]) - area(&boxes[j]);
            if waste > worst {
                (seed_a, seed_b, worst) = (i, j, waste);
            }
        }
    }
    let mut groups = Groups::seeded(boxes, seed_a, seed_b);
    let mut remaining: Vec<usize> = (0..n).filter(|&i| i != seed_a && i != seed_b).collect();
    while !remaining.is_empty() {
        if groups.fill_if_forced(&remaining, min_entries) {
            break;
        }
        // Most decisive entry first.
        let (pos, _) = remaining
            .iter()
            .enumerate()
            .map(|(pos, &i)| {
                let da = enlargement(&groups.bounds[0], &boxes[i]);
                let db = enlargement(&groups.bounds[1], &boxes[i]);
                (pos, (da - db).max(db - da))
            })
            .fold((0, f64::NEG_INFINITY), |best, cur| {
                if cur.1 > best.1 { cur } else { best }
            });
        let i = remaining.remove(pos);
        groups.assign(i, boxes);
    }
    groups.left
}

fn linear(boxes: &[Rect], min_entries: usize) -> Vec<bool> {
    let n = boxes.len();
    let span = boxes[1..].iter().fold(boxes[0], |acc, b| acc.union(*b));
    let mut best: Option<(f64, usize, usize)> = None;
    for axis in 0..2 {
        let lo = |b: &Rect| if axis == 0 { b.x0 } else { b.y0 };
        let hi = |b: &Rect| if axis == 0 { b.x1 } else { b.y1 };
        // Entry with the highest low side and the one with the lowest high side.
        let highest_low = (0..n).fold(0, |m, i| if lo(&boxes[i]) > lo(&boxes[m]) { i } else { m });
        let lowest_high = (0..n).fold(0, |m, i| if hi(&boxes[i]) < hi(&boxes[m]) { i } else { m });
        if highest_low == lowest_high {
            continue;
        }
        let width = hi(&span) - lo(&span);
        let sep = lo(&boxes[highest_low]) - hi(&boxes[lowest_high]);
        let normalized = if width > 0.0 { sep / width } else { 0.0 };
        if best.is_none_or(|(s, _, _)| normalized > s) {
            best = Some((normalized, lowest_high, highest_low));
        }
    }
    let (_, seed_a, seed_b) = best.unwrap_or((0.0, 0, 1));
    let mut groups = Groups::seeded(boxes, seed_a, seed_b);
    let remaining: Vec<usize> = (0..n).filter(|&i| i != seed_a && i != seed_b).collect();
    for (k, &i) in remaining.iter().enumerate() {
        if groups.fill_if_forced(&remaining[k..], min_entries) {
            break;
        }
        groups.assign(i, boxes);
    }
    groups.left
}

#[allow(clippy::cast_precision_loss, reason = "Node sizes are tiny.")]
fn surface_area(boxes: &[Rect], min_entries: usize) -> Vec<bool> {
    let n = boxes.len();
    let mut best: Option<(f64, Vec<usize>, usize)> = None;
    for axis in 0..2 {
        let centroid = |b: &Rect| {
            let c = b.center();
            if axis == 0 { c.x } else { c.y }
        };
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| cmp_f64(centroid(&boxes[a]), centroid(&boxes[b])));

        // Prefix and suffix unions make each candidate cut O(1).
        let mut prefix: Vec<Rect> = Vec::with_capacity(n);
        for &i in &order {
            let next = prefix.last().map_or(boxes[i], |p| p.union(boxes[i]));
            prefix.push(next);
        }
        let mut suffix: Vec<Rect> = Vec::with_capacity(n);
        for &i in order.iter().rev() {
            let next = suffix.last().map_or(boxes[i], |s| s.union(boxes[i]));
            suffix.push(next);
        }
        suffix.reverse();

        for k in min_entries..=(n - min_entries) {
            let cost = area(&prefix[k - 1]) * k as f64 + area(&suffix[k]) * (n - k) as f64;
            // Degenerate boxes have no area; fall back to perimeter so the cut still means something.
            let cost = if cost > 0.0 {
                cost
            } else {
                margin(&prefix[k - 1]) * k as f64 + margin(&suffix[k]) * (n - k) as f64
            };
            if best.as_ref().is_none_or(|(c, _, _)| cost < *c) {
                best = Some((cost, order.clone(), k));
            }
        }
    }
    let mut left = alloc::vec![false; n];
    if let Some((_, order, k)) = best {
        for &i in &order[..k] {
            left[i] = true;
        }
    } else {
        for flag in left.iter_mut().take(n / 2) {
            *flag = true;
        }
    }
    left
}

/// Two growing groups during a Guttman split.
struct Groups {
    left: Vec<bool>,
    bounds: [Rect; 2],
    counts: [usize; 2],
}

impl Groups {
    fn seeded(boxes: &[Rect], a: usize, b: usize) -> Self {
        let mut left = alloc::vec![false; boxes.len()];
        left[a] = true;
        Self {
            left,
            bounds: [boxes[a], boxes[b]],
            counts: [1, 1],
        }
    }

    /// If one group needs every remaining entry to reach the minimum, hand them
    /// all over and report `true`.
    fn fill_if_forced(&mut self, remaining: &[usize], min_entries: usize) -> bool {
        for g in 0..2 {
            if self.counts[g] + remaining.len() <= min_entries {
                for &i in remaining {
                    self.left[i] = g == 0;
                }
                self.counts[g] += remaining.len();
                return true;
            }
        }
        false
    }

    /// Least enlargement, then smaller area, then fewer entries, then left.
    fn assign(&mut self, i: usize, boxes: &[Rect]) {
        let b = &boxes[i];
        let da = enlargement(&self.bounds[0], b);
        let db = enlargement(&self.bounds[1], b);
        let g = if da != db {
            usize::from(db < da)
        } else if area(&self.bounds[0]) != area(&self.bounds[1]) {
            usize::from(area(&self.bounds[1]) < area(&self.bounds[0]))
        } else {
            usize::from(self.counts[1] < self.counts[0])
        };
        self.left[i] = g == 0;
        self.bounds[g] = self.bounds[g].union(*b);
        self.counts[g] += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(clippy::cast_precision_loss, reason = "Small test values.")]
    fn row_of_boxes(n: usize) -> Vec<Rect> {
        (0..n)
            .map(|i| {
                let x = i as f64 * 10.0;
                Rect::new(x, 0.0, x + 5.0, 5.0)
            })
            .collect()
    }

    fn check(strategy: SplitStrategy) {
        let boxes = row_of_boxes(9);
        let (l, r) = strategy.split(boxes.clone(), 3, &|b: &Rect| *b);
        assert_eq!(l.len() + r.len(), 9, "{strategy:?} lost entries");
        assert!(l.len() >= 3 && r.len() >= 3, "{strategy:?} under-filled a group");
        // A row of boxes should be cut into a left run and a right run.
        let max_l = l.iter().map(|b| b.x1).fold(f64::NEG_INFINITY, f64::max);
        let min_r = r.iter().map(|b| b.x0).fold(f64::INFINITY, f64::min);
        let max_r = r.iter().map(|b| b.x1).fold(f64::NEG_INFINITY, f64::max);
        let min_l = l.iter().map(|b| b.x0).fold(f64::INFINITY, f64::min);
        assert!(max_l < min_r || max_r < min_l, "{strategy:?} interleaved groups");
    }

    #[test]
    fn quadratic_cuts_a_row() {
        check(SplitStrategy::Quadratic);
    }

    #[test]
    fn linear_cuts_a_row() {
        check(SplitStrategy::Linear);
    }

    #[test]
    fn surface_area_cuts_a_row() {
        check(SplitStrategy::SurfaceArea);
    }

    #[test]
    fn identical_boxes_still_split_evenly_enough() {
        let boxes = alloc::vec![Rect::new(1.0, 1.0, 2.0, 2.0); 5];
        for s in [
            SplitStrategy::Quadratic,
            SplitStrategy::Linear,
            SplitStrategy::SurfaceArea,
        ] {
            let (l, r) = s.split(boxes.clone(), 2, &|b: &Rect| *b);
            assert!(l.len() >= 2 && r.len() >= 2, "{s:?} produced {} / {}", l.len(), r.len());
        }
    }
}
