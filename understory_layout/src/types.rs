// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types for the layout model: bounds, per-node flags and change events.

use kurbo::{Rect, Size};

use crate::error::LayoutError;

/// Bounds of the layout area. `depth` is `0.0` for flat layouts.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct LayoutSize {
    /// Extent along x.
    pub width: f64,
    /// Extent along y.
    pub height: f64,
    /// Extent along z.
    pub depth: f64,
}

impl LayoutSize {
    /// Flat bounds.
    pub const fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            depth: 0.0,
        }
    }

    /// Volumetric bounds.
    pub const fn new_3d(width: f64, height: f64, depth: f64) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }

    /// Reject negative or non-finite extents.
    pub fn validate(&self) -> Result<(), LayoutError> {
        for (name, v) in [
            ("width", self.width),
            ("height", self.height),
            ("depth", self.depth),
        ] {
            if !(v.is_finite() && v >= 0.0) {
                return Err(LayoutError::invalid(format!(
                    "layout {name} must be finite and non-negative, got {v}"
                )));
            }
        }
        Ok(())
    }

    /// The 2D extent.
    pub fn to_size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// The 2D area as a rectangle anchored at the origin.
    pub fn to_rect(&self) -> Rect {
        Rect::from_origin_size((0.0, 0.0), self.to_size())
    }
}

impl From<Size> for LayoutSize {
    fn from(s: Size) -> Self {
        Self::new(s.width, s.height)
    }
}

bitflags::bitflags! {
    /// Per-node flags controlling relaxation and picking.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct NodeFlags: u8 {
        /// Layout writes are ignored while set.
        const LOCKED   = 0b0000_0001;
        /// Node takes part in picking.
        const PICKABLE = 0b0000_0010;
    }
}

impl Default for NodeFlags {
    fn default() -> Self {
        Self::PICKABLE
    }
}

/// Change notification delivered to listeners of a layout model.
#[derive(Clone, Debug, PartialEq)]
pub enum LayoutEvent<N> {
    /// A node's position was written.
    Moved(N),
    /// Every position was discarded.
    Reset,
    /// The layout bounds changed.
    Resized(LayoutSize),
}
