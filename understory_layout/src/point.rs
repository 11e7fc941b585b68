// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Coordinate access over 2D and 3D point types.
//!
//! Layout code is written against [`PointModel`] so the same model and relaxer
//! drive flat and volumetric embeddings. The spatial indexes only ever see the
//! projection returned by [`PointModel::to_2d`].

use core::fmt::Debug;

use kurbo::Point;

/// A point type the layout model can store.
pub trait PointModel: Copy + Debug + PartialEq + Send + Sync + 'static {
    /// Build a point. 2D types ignore `z`.
    fn new_point(x: f64, y: f64, z: f64) -> Self;

    /// Horizontal coordinate.
    fn x(&self) -> f64;

    /// Vertical coordinate.
    fn y(&self) -> f64;

    /// Depth coordinate; always `0.0` for 2D types.
    fn z(&self) -> f64 {
        0.0
    }

    /// Overwrite every coordinate in place. 2D types ignore `z`.
    fn set_location(&mut self, x: f64, y: f64, z: f64);

    /// Move by a delta in place.
    fn offset(&mut self, dx: f64, dy: f64, dz: f64) {
        self.set_location(self.x() + dx, self.y() + dy, self.z() + dz);
    }

    /// Whether every coordinate is finite.
    fn is_finite(&self) -> bool {
        self.x().is_finite() && self.y().is_finite() && self.z().is_finite()
    }

    /// Projection onto the `z = 0` plane.
    fn to_2d(&self) -> Point {
        Point::new(self.x(), self.y())
    }

    /// Squared Euclidean distance over all coordinates.
    fn distance_squared(&self, other: &Self) -> f64 {
        let (dx, dy, dz) = (self.x() - other.x(), self.y() - other.y(), self.z() - other.z());
        dx * dx + dy * dy + dz * dz
    }
}

impl PointModel for Point {
    fn new_point(x: f64, y: f64, _z: f64) -> Self {
        Self::new(x, y)
    }

    fn x(&self) -> f64 {
        self.x
    }

    fn y(&self) -> f64 {
        self.y
    }

    fn set_location(&mut self, x: f64, y: f64, _z: f64) {
        self.x = x;
        self.y = y;
    }

    fn to_2d(&self) -> Point {
        *self
    }
}

/// A point in three dimensions.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Point3 {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
    /// Depth coordinate.
    pub z: f64,
}

impl Point3 {
    /// The origin.
    pub const ORIGIN: Self = Self::new(0.0, 0.0, 0.0);

    /// Build a point.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

impl From<Point> for Point3 {
    fn from(p: Point) -> Self {
        Self::new(p.x, p.y, 0.0)
    }
}

impl PointModel for Point3 {
    fn new_point(x: f64, y: f64, z: f64) -> Self {
        Self::new(x, y, z)
    }

    fn x(&self) -> f64 {
        self.x
    }

    fn y(&self) -> f64 {
        self.y
    }

    fn z(&self) -> f64 {
        self.z
    }

    fn set_location(&mut self, x: f64, y: f64, z: f64) {
        *self = Self::new(x, y, z);
    }
}
