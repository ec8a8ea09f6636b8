//! Core geometric primitives for connectivity analysis
//!
//! Coordinates are f32 millimeters. Every shape reports an axis-aligned
//! bounding box used as its envelope in the spatial index.

use serde::Serialize;

/// A 2D point
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: [f32; 2],
    pub max: [f32; 2],
}

impl BoundingBox {
    pub fn new(min: [f32; 2], max: [f32; 2]) -> Self {
        Self { min, max }
    }

    /// Degenerate box at a single point
    pub fn from_point(p: Point) -> Self {
        Self {
            min: [p.x, p.y],
            max: [p.x, p.y],
        }
    }

    /// Smallest box enclosing all points; degenerate at origin for an empty slice
    pub fn from_points(points: &[Point]) -> Self {
        let mut bbox = match points.first() {
            Some(p) => Self::from_point(*p),
            None => Self::from_point(Point::new(0.0, 0.0)),
        };

        for p in points.iter().skip(1) {
            bbox.expand_to(*p);
        }

        bbox
    }

    pub fn expand_to(&mut self, p: Point) {
        self.min[0] = self.min[0].min(p.x);
        self.min[1] = self.min[1].min(p.y);
        self.max[0] = self.max[0].max(p.x);
        self.max[1] = self.max[1].max(p.y);
    }

    pub fn merge(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min: [self.min[0].min(other.min[0]), self.min[1].min(other.min[1])],
            max: [self.max[0].max(other.max[0]), self.max[1].max(other.max[1])],
        }
    }

    pub fn inflate(&self, margin: f32) -> BoundingBox {
        BoundingBox {
            min: [self.min[0] - margin, self.min[1] - margin],
            max: [self.max[0] + margin, self.max[1] + margin],
        }
    }

    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min[0] <= other.max[0]
            && self.max[0] >= other.min[0]
            && self.min[1] <= other.max[1]
            && self.max[1] >= other.min[1]
    }

    pub fn contains_point(&self, p: &Point) -> bool {
        p.x >= self.min[0] && p.x <= self.max[0] && p.y >= self.min[1] && p.y <= self.max[1]
    }
}

/// Effective collision shape of a board entity on one layer
///
/// A closed set: circles (vias, round pads), capsules (track segments, oval
/// pads), and filled polygon outlines (custom pads, zone islands).
#[derive(Debug, Clone)]
pub enum Shape {
    Circle {
        center: Point,
        radius: f32,
    },
    /// Stadium shape: a segment swept by a radius
    Capsule {
        start: Point,
        end: Point,
        radius: f32,
    },
    Polygon {
        outline: Vec<Point>,
    },
}

impl Shape {
    pub fn bbox(&self) -> BoundingBox {
        match self {
            Shape::Circle { center, radius } => {
                BoundingBox::from_point(*center).inflate(*radius)
            }
            Shape::Capsule { start, end, radius } => {
                BoundingBox::from_points(&[*start, *end]).inflate(*radius)
            }
            Shape::Polygon { outline } => BoundingBox::from_points(outline),
        }
    }
}
