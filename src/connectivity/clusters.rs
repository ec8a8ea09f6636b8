//! Connectivity clusters
//!
//! A cluster is one maximal connected component of valid items, built fresh
//! on every search and never persisted. Its origin net, conflict flag and
//! orphan flag are maintained incrementally as members are added.

use crate::board::{EntityId, NetCode, NET_NONE};

use super::items::{CnItem, CnItemList, ItemId, ItemKind};

#[derive(Debug, Default)]
pub struct CnCluster {
    items: Vec<ItemId>,
    /// Lowest positive net among members, or NET_NONE
    origin_net: NetCode,
    conflicting: bool,
    /// Cleared once a pad with a real net joins; pads are the only
    /// legitimately net-assigned anchors
    has_net_anchor: bool,
}

impl CnCluster {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            origin_net: NET_NONE,
            conflicting: false,
            has_net_anchor: false,
        }
    }

    pub(crate) fn add(&mut self, item: &CnItem) {
        self.items.push(item.id());

        let net = item.net();
        if net <= 0 {
            return;
        }

        if self.origin_net <= 0 {
            self.origin_net = net;
        } else if net != self.origin_net {
            self.conflicting = true;
            if net < self.origin_net {
                self.origin_net = net;
            }
        }

        if matches!(item.kind(), ItemKind::Pad) {
            self.has_net_anchor = true;
        }
    }

    pub fn items(&self) -> &[ItemId] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Net propagated to all members
    pub fn origin_net(&self) -> NetCode {
        self.origin_net
    }

    pub fn has_valid_net(&self) -> bool {
        self.origin_net > 0
    }

    /// Members carry more than one distinct pre-existing net
    pub fn is_conflicting(&self) -> bool {
        self.conflicting
    }

    /// No member has a legitimately assigned net identity
    pub fn is_orphaned(&self) -> bool {
        !self.has_net_anchor
    }

    pub fn contains_entity(&self, list: &CnItemList, entity: EntityId) -> bool {
        self.items.iter().any(|id| list.get(*id).parent() == entity)
    }
}
