//! Distance and collision primitives
//!
//! Contains segment/point distance calculations, ray-cast point-in-polygon,
//! and the shape-to-shape collision tests used by the collision visitor.

use super::types::{Point, Shape};

/// Point-to-segment minimum distance
pub fn point_segment_distance(p: Point, a: Point, b: Point) -> f32 {
    let ab = [b.x - a.x, b.y - a.y];
    let ap = [p.x - a.x, p.y - a.y];
    let ab_len2 = ab[0] * ab[0] + ab[1] * ab[1];

    if ab_len2 < 1e-10 {
        // Degenerate segment
        return p.distance(&a);
    }

    let t = ((ap[0] * ab[0] + ap[1] * ab[1]) / ab_len2).clamp(0.0, 1.0);
    let closest = Point::new(a.x + t * ab[0], a.y + t * ab[1]);

    p.distance(&closest)
}

fn orient(a: Point, b: Point, c: Point) -> f32 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Proper or touching intersection of two segments
pub fn segments_intersect(a1: Point, a2: Point, b1: Point, b2: Point) -> bool {
    let d1 = orient(b1, b2, a1);
    let d2 = orient(b1, b2, a2);
    let d3 = orient(a1, a2, b1);
    let d4 = orient(a1, a2, b2);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }

    // Collinear / endpoint-touching cases
    let on_segment = |a: Point, b: Point, p: Point| -> bool {
        p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
    };

    (d1 == 0.0 && on_segment(b1, b2, a1))
        || (d2 == 0.0 && on_segment(b1, b2, a2))
        || (d3 == 0.0 && on_segment(a1, a2, b1))
        || (d4 == 0.0 && on_segment(a1, a2, b2))
}

/// Segment-to-segment minimum distance (zero when they intersect)
pub fn segment_segment_distance(a1: Point, a2: Point, b1: Point, b2: Point) -> f32 {
    if segments_intersect(a1, a2, b1, b2) {
        return 0.0;
    }

    point_segment_distance(a1, b1, b2)
        .min(point_segment_distance(a2, b1, b2))
        .min(point_segment_distance(b1, a1, a2))
        .min(point_segment_distance(b2, a1, a2))
}

/// Ray-cast point-in-polygon test on a closed outline
pub fn point_in_polygon(p: Point, outline: &[Point]) -> bool {
    if outline.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = outline.len() - 1;

    for i in 0..outline.len() {
        let vi = outline[i];
        let vj = outline[j];

        if (vi.y > p.y) != (vj.y > p.y)
            && p.x < (vj.x - vi.x) * (p.y - vi.y) / (vj.y - vi.y) + vi.x
        {
            inside = !inside;
        }

        j = i;
    }

    inside
}

/// Minimum distance from a point to a polygon boundary
fn point_outline_distance(p: Point, outline: &[Point]) -> f32 {
    let mut min_d = f32::MAX;
    let mut j = outline.len() - 1;

    for i in 0..outline.len() {
        min_d = min_d.min(point_segment_distance(p, outline[j], outline[i]));
        j = i;
    }

    min_d
}

/// Collision between a circle/capsule shape and a filled polygon outline
pub fn shape_polygon_collides(shape: &Shape, outline: &[Point]) -> bool {
    if outline.len() < 3 {
        return false;
    }

    match shape {
        Shape::Circle { center, radius } => {
            point_in_polygon(*center, outline)
                || point_outline_distance(*center, outline) <= *radius
        }
        Shape::Capsule { start, end, radius } => {
            if point_in_polygon(*start, outline) || point_in_polygon(*end, outline) {
                return true;
            }

            let mut j = outline.len() - 1;
            for i in 0..outline.len() {
                if segment_segment_distance(*start, *end, outline[j], outline[i]) <= *radius {
                    return true;
                }
                j = i;
            }

            false
        }
        Shape::Polygon { outline: other } => polygons_collide(other, outline),
    }
}

/// Collision between two filled polygon outlines
pub fn polygons_collide(a: &[Point], b: &[Point]) -> bool {
    if a.len() < 3 || b.len() < 3 {
        return false;
    }

    // Vertex containment either way catches full overlap
    if point_in_polygon(a[0], b) || point_in_polygon(b[0], a) {
        return true;
    }

    // Edge crossings catch partial overlap
    let mut ja = a.len() - 1;
    for ia in 0..a.len() {
        let mut jb = b.len() - 1;
        for ib in 0..b.len() {
            if segments_intersect(a[ja], a[ia], b[jb], b[ib]) {
                return true;
            }
            jb = ib;
        }
        ja = ia;
    }

    false
}

/// Collision between two effective shapes
pub fn shapes_collide(a: &Shape, b: &Shape) -> bool {
    // AABB prefilter: cheap rejection before exact math
    if !a.bbox().intersects(&b.bbox()) {
        return false;
    }

    match (a, b) {
        (
            Shape::Circle { center: ca, radius: ra },
            Shape::Circle { center: cb, radius: rb },
        ) => ca.distance(cb) <= ra + rb,

        (
            Shape::Circle { center, radius },
            Shape::Capsule { start, end, radius: rc },
        )
        | (
            Shape::Capsule { start, end, radius: rc },
            Shape::Circle { center, radius },
        ) => point_segment_distance(*center, *start, *end) <= radius + rc,

        (
            Shape::Capsule { start: a1, end: a2, radius: ra },
            Shape::Capsule { start: b1, end: b2, radius: rb },
        ) => segment_segment_distance(*a1, *a2, *b1, *b2) <= ra + rb,

        (Shape::Polygon { outline }, other) | (other, Shape::Polygon { outline }) => {
            shape_polygon_collides(other, outline)
        }
    }
}
