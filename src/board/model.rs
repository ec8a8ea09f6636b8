//! Board entity arena
//!
//! The connectivity core consumes the board through a narrow surface: type
//! tag, layer set, copper predicate, effective shape per layer, net code
//! get/set, footprint pads, and zone fill islands. Entities live in an arena
//! and are addressed by `EntityId`; ids are never reused.
//!
//! The connectable kinds are a closed set, exhaustively matched in the
//! collision visitor.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::geometry::{Point, Shape};

use super::layers::{LayerId, LayerSet};

/// Net code: 0 is "no net", positive values are real nets
pub type NetCode = i32;

pub const NET_NONE: NetCode = 0;

/// Index of an entity in the board arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EntityId(pub usize);

/// Closed set of board entity kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Pad,
    Track,
    Arc,
    Via,
    Zone,
    Footprint,
}

/// Chord count used to approximate arcs for collision
const ARC_CHORDS: usize = 8;

#[derive(Debug, Clone)]
pub struct Pad {
    pub shape: Shape,
    pub layers: LayerSet,
    pub net: NetCode,
    pub footprint: Option<EntityId>,
}

#[derive(Debug, Clone)]
pub struct Track {
    pub start: Point,
    pub end: Point,
    pub width: f32,
    pub layer: LayerId,
    pub net: NetCode,
}

#[derive(Debug, Clone)]
pub struct ArcTrack {
    /// Chord-sampled polyline along the arc
    pub points: Vec<Point>,
    pub width: f32,
    pub layer: LayerId,
    pub net: NetCode,
}

#[derive(Debug, Clone)]
pub struct Via {
    pub position: Point,
    pub diameter: f32,
    pub drill: f32,
    pub layers: LayerSet,
    pub net: NetCode,
}

#[derive(Debug, Clone)]
pub struct Zone {
    /// Filled islands per layer; one outline per disjoint filled region
    pub fills: BTreeMap<LayerId, Vec<Vec<Point>>>,
    pub net: NetCode,
}

#[derive(Debug, Clone)]
pub struct Footprint {
    pub pads: Vec<EntityId>,
    /// Set during bulk placement; gates incremental Add until the full build
    pub freshly_added: bool,
}

#[derive(Debug, Clone)]
pub enum BoardEntity {
    Pad(Pad),
    Track(Track),
    Arc(ArcTrack),
    Via(Via),
    Zone(Zone),
    Footprint(Footprint),
}

/// Arena of board entities
#[derive(Debug, Default)]
pub struct Board {
    entities: Vec<BoardEntity>,
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, entity: BoardEntity) -> EntityId {
        let id = EntityId(self.entities.len());
        self.entities.push(entity);
        id
    }

    pub fn add_pad(&mut self, shape: Shape, layers: LayerSet, net: NetCode) -> EntityId {
        self.push(BoardEntity::Pad(Pad {
            shape,
            layers,
            net,
            footprint: None,
        }))
    }

    pub fn add_track(
        &mut self,
        start: Point,
        end: Point,
        width: f32,
        layer: LayerId,
        net: NetCode,
    ) -> EntityId {
        self.push(BoardEntity::Track(Track {
            start,
            end,
            width,
            layer,
            net,
        }))
    }

    /// Arc segment approximated by chords; angles in degrees, counterclockwise
    pub fn add_arc(
        &mut self,
        center: Point,
        radius: f32,
        start_angle: f32,
        end_angle: f32,
        width: f32,
        layer: LayerId,
        net: NetCode,
    ) -> EntityId {
        let mut points = Vec::with_capacity(ARC_CHORDS + 1);

        for i in 0..=ARC_CHORDS {
            let t = i as f32 / ARC_CHORDS as f32;
            let angle = (start_angle + (end_angle - start_angle) * t).to_radians();
            points.push(Point::new(
                center.x + radius * angle.cos(),
                center.y + radius * angle.sin(),
            ));
        }

        self.push(BoardEntity::Arc(ArcTrack {
            points,
            width,
            layer,
            net,
        }))
    }

    pub fn add_via(
        &mut self,
        position: Point,
        diameter: f32,
        drill: f32,
        layers: LayerSet,
        net: NetCode,
    ) -> EntityId {
        self.push(BoardEntity::Via(Via {
            position,
            diameter,
            drill,
            layers,
            net,
        }))
    }

    pub fn add_zone(
        &mut self,
        fills: BTreeMap<LayerId, Vec<Vec<Point>>>,
        net: NetCode,
    ) -> EntityId {
        self.push(BoardEntity::Zone(Zone { fills, net }))
    }

    /// Groups existing pads under one footprint and back-links them
    pub fn add_footprint(&mut self, pads: Vec<EntityId>) -> EntityId {
        let id = self.push(BoardEntity::Footprint(Footprint {
            pads: pads.clone(),
            freshly_added: false,
        }));

        for pad in pads {
            if let BoardEntity::Pad(p) = &mut self.entities[pad.0] {
                p.footprint = Some(id);
            }
        }

        id
    }

    pub fn get(&self, id: EntityId) -> &BoardEntity {
        &self.entities[id.0]
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter_ids(&self) -> impl Iterator<Item = EntityId> {
        (0..self.entities.len()).map(EntityId)
    }

    pub fn kind(&self, id: EntityId) -> EntityKind {
        match self.get(id) {
            BoardEntity::Pad(_) => EntityKind::Pad,
            BoardEntity::Track(_) => EntityKind::Track,
            BoardEntity::Arc(_) => EntityKind::Arc,
            BoardEntity::Via(_) => EntityKind::Via,
            BoardEntity::Zone(_) => EntityKind::Zone,
            BoardEntity::Footprint(_) => EntityKind::Footprint,
        }
    }

    /// Layers the entity occupies; footprints report the union of their pads
    pub fn layers(&self, id: EntityId) -> LayerSet {
        match self.get(id) {
            BoardEntity::Pad(p) => p.layers,
            BoardEntity::Track(t) => LayerSet::single(t.layer),
            BoardEntity::Arc(a) => LayerSet::single(a.layer),
            BoardEntity::Via(v) => v.layers,
            BoardEntity::Zone(z) => {
                let mut set = LayerSet::EMPTY;
                for layer in z.fills.keys() {
                    set.insert(*layer);
                }
                set
            }
            BoardEntity::Footprint(f) => {
                let mut set = LayerSet::EMPTY;
                for pad in &f.pads {
                    set = set.union(self.layers(*pad));
                }
                set
            }
        }
    }

    pub fn is_on_copper(&self, id: EntityId) -> bool {
        !self.layers(id).copper().is_empty()
    }

    /// Net code; footprints themselves carry no net
    pub fn net(&self, id: EntityId) -> NetCode {
        match self.get(id) {
            BoardEntity::Pad(p) => p.net,
            BoardEntity::Track(t) => t.net,
            BoardEntity::Arc(a) => a.net,
            BoardEntity::Via(v) => v.net,
            BoardEntity::Zone(z) => z.net,
            BoardEntity::Footprint(_) => NET_NONE,
        }
    }

    pub fn set_net(&mut self, id: EntityId, net: NetCode) {
        match &mut self.entities[id.0] {
            BoardEntity::Pad(p) => p.net = net,
            BoardEntity::Track(t) => t.net = net,
            BoardEntity::Arc(a) => a.net = net,
            BoardEntity::Via(v) => v.net = net,
            BoardEntity::Zone(z) => z.net = net,
            BoardEntity::Footprint(_) => {}
        }
    }

    /// Whether propagation may reassign this entity's net
    ///
    /// Pads and zones carry netlist-assigned nets; tracks, arcs and vias
    /// inherit theirs from whatever they touch.
    pub fn can_change_net(&self, id: EntityId) -> bool {
        matches!(
            self.kind(id),
            EntityKind::Track | EntityKind::Arc | EntityKind::Via
        )
    }

    pub fn footprint_pads(&self, id: EntityId) -> &[EntityId] {
        match self.get(id) {
            BoardEntity::Footprint(f) => &f.pads,
            _ => &[],
        }
    }

    pub fn set_freshly_added(&mut self, id: EntityId, value: bool) {
        if let BoardEntity::Footprint(f) = &mut self.entities[id.0] {
            f.freshly_added = value;
        }
    }

    /// True for a freshly added footprint, or a pad belonging to one
    pub fn freshly_added(&self, id: EntityId) -> bool {
        match self.get(id) {
            BoardEntity::Footprint(f) => f.freshly_added,
            BoardEntity::Pad(p) => match p.footprint {
                Some(fp) => self.freshly_added(fp),
                None => false,
            },
            _ => false,
        }
    }

    /// Filled islands of a zone on one layer; empty for anything else
    pub fn zone_islands(&self, id: EntityId, layer: LayerId) -> &[Vec<Point>] {
        match self.get(id) {
            BoardEntity::Zone(z) => z.fills.get(&layer).map(|v| v.as_slice()).unwrap_or(&[]),
            _ => &[],
        }
    }

    /// Effective collision shapes of an entity on one layer
    ///
    /// Zones are excluded: their islands collide through the per-island items
    /// in the connectivity index, never through this accessor.
    pub fn effective_shapes(&self, id: EntityId, layer: LayerId) -> Vec<Shape> {
        match self.get(id) {
            BoardEntity::Pad(p) if p.layers.contains(layer) => vec![p.shape.clone()],
            BoardEntity::Track(t) if t.layer == layer => vec![Shape::Capsule {
                start: t.start,
                end: t.end,
                radius: t.width / 2.0,
            }],
            BoardEntity::Arc(a) if a.layer == layer => a
                .points
                .windows(2)
                .map(|w| Shape::Capsule {
                    start: w[0],
                    end: w[1],
                    radius: a.width / 2.0,
                })
                .collect(),
            BoardEntity::Via(v) if v.layers.contains(layer) => vec![Shape::Circle {
                center: v.position,
                radius: v.diameter / 2.0,
            }],
            _ => Vec::new(),
        }
    }
}
