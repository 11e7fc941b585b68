// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Strategies for the first position a node gets.

use std::sync::Arc;

use crate::point::PointModel;
use crate::types::LayoutSize;

/// Signature of a caller-supplied initializer.
pub type InitFn<N, P> = dyn Fn(&N, LayoutSize) -> P + Send + Sync;

/// Decides where a node sits the first time the model is asked about it.
pub enum Initializer<N, P> {
    /// Every node starts at the same point.
    Fixed(P),
    /// Uniformly scattered within the current bounds.
    ///
    /// Positions depend only on `seed` and on the order in which nodes are
    /// first touched, so runs are reproducible.
    Random {
        /// Generator seed.
        seed: u64,
    },
    /// Caller-defined placement.
    ///
    /// The closure runs with no model lock held, so it may read the model it
    /// places nodes for (through a `Weak` handle, say). Asking that model for
    /// the position of the node being placed recurses.
    Custom(Arc<InitFn<N, P>>),
}

impl<N, P> Initializer<N, P> {
    /// Wrap a closure.
    pub fn custom(f: impl Fn(&N, LayoutSize) -> P + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(f))
    }
}

impl<N, P: PointModel> Initializer<N, P> {
    /// Position for `node`, the `ordinal`-th node to be placed under `size`.
    #[allow(clippy::cast_precision_loss, reason = "Exactly 53 bits survive.")]
    pub fn place(&self, node: &N, size: LayoutSize, ordinal: u64) -> P {
        match self {
            Self::Fixed(p) => *p,
            Self::Random { seed } => {
                let mut state = mix(*seed ^ mix(ordinal.wrapping_add(1)));
                let mut unit = || {
                    state = xorshift(state);
                    // Top 53 bits as a fraction in [0, 1).
                    (state >> 11) as f64 / (1_u64 << 53) as f64
                };
                let (x, y, z) = (unit(), unit(), unit());
                P::new_point(x * size.width, y * size.height, z * size.depth)
            }
            Self::Custom(f) => f(node, size),
        }
    }
}

impl<N, P: PointModel> Default for Initializer<N, P> {
    fn default() -> Self {
        Self::Random { seed: 0x5eed }
    }
}

impl<N, P: Clone> Clone for Initializer<N, P> {
    fn clone(&self) -> Self {
        match self {
            Self::Fixed(p) => Self::Fixed(p.clone()),
            Self::Random { seed } => Self::Random { seed: *seed },
            Self::Custom(f) => Self::Custom(Arc::clone(f)),
        }
    }
}

impl<N, P: core::fmt::Debug> core::fmt::Debug for Initializer<N, P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Fixed(p) => f.debug_tuple("Fixed").field(p).finish(),
            Self::Random { seed } => f.debug_struct("Random").field("seed", seed).finish(),
            Self::Custom(_) => f.debug_tuple("Custom").finish_non_exhaustive(),
        }
    }
}

fn xorshift(mut x: u64) -> u64 {
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    x
}

/// `SplitMix64` finalizer; spreads nearby inputs and never maps to zero for
/// nonzero input.
fn mix(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9e37_79b9_7f4a_7c15);
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    (x ^ (x >> 31)) | 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Point;

    #[test]
    fn random_stays_inside_bounds_and_repeats() {
        let init: Initializer<u32, Point> = Initializer::Random { seed: 7 };
        let size = LayoutSize::new(200.0, 50.0);
        for i in 0..500 {
            let p = init.place(&0, size, i);
            assert!((0.0..200.0).contains(&p.x) && (0.0..50.0).contains(&p.y), "{p:?}");
            assert_eq!(p, init.place(&0, size, i));
        }
        assert_ne!(init.place(&0, size, 0), init.place(&0, size, 1));
    }

    #[test]
    fn fixed_and_custom() {
        let size = LayoutSize::new(10.0, 10.0);
        let fixed: Initializer<u32, Point> = Initializer::Fixed(Point::new(3.0, 4.0));
        assert_eq!(fixed.place(&9, size, 0), Point::new(3.0, 4.0));
        let diag: Initializer<u32, Point> =
            Initializer::custom(|n, s| Point::new(f64::from(*n), s.height - f64::from(*n)));
        assert_eq!(diag.place(&2, size, 0), Point::new(2.0, 8.0));
    }
}
