//! Geometry module for connectivity analysis
//!
//! Provides the geometric primitives and collision tests the connectivity
//! core needs: points, bounding boxes, effective shapes, and shape-to-shape
//! collision.
//!
//! # Submodules
//! - `types` - Core geometric primitives (Point, BoundingBox, Shape)
//! - `collide` - Distance and collision algorithms

mod collide;
mod types;

pub use types::{BoundingBox, Point, Shape};

pub use collide::{
    point_in_polygon, point_segment_distance, polygons_collide, segment_segment_distance,
    segments_intersect, shape_polygon_collides, shapes_collide,
};
