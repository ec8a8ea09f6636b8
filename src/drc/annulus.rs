//! Annular-ring width check
//!
//! Verifies there is sufficient copper ring around plated via holes:
//! `(outer diameter - drill) / 2` against an optional min/max constraint.
//! The one rule check shipped with the connectivity core; it consumes the
//! board's item and net data but no clustering.

use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::board::{Board, BoardEntity, EntityId, EntityKind, NetCode};
use crate::geometry::Point;
use crate::progress::ProgressReporter;

/// Progress/cancellation checks happen every this many vias
const REPORT_DELTA: usize = 250;

/// Annular-ring constraint; both bounds optional
#[derive(Debug, Clone, Copy, Default)]
pub struct AnnulusConstraint {
    pub min_width: Option<f32>,
    pub max_width: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AnnulusViolationKind {
    BelowMin,
    AboveMax,
}

/// One via failing the annular-ring constraint
#[derive(Debug, Clone, Serialize)]
pub struct AnnulusViolation {
    pub entity: EntityId,
    pub net: NetCode,
    pub position: Point,
    /// Measured ring width in mm
    pub annulus_width: f32,
    /// The violated bound
    pub required_width: f32,
    pub kind: AnnulusViolationKind,
}

/// Checks every via's annular ring against the constraint
///
/// Returns violations in board order. An unconstrained check (no min, no
/// max) short-circuits to an empty report.
pub fn check_annular_rings(
    board: &Board,
    constraint: &AnnulusConstraint,
    progress: Option<&dyn ProgressReporter>,
) -> Vec<AnnulusViolation> {
    if constraint.min_width.is_none() && constraint.max_width.is_none() {
        debug!("no annulus constraints found; skipping check");
        return Vec::new();
    }

    let vias: Vec<EntityId> = board
        .iter_ids()
        .filter(|id| board.kind(*id) == EntityKind::Via)
        .collect();

    if let Some(p) = progress {
        p.set_max_progress(vias.len());
    }

    let checked = AtomicUsize::new(0);

    let mut violations: Vec<AnnulusViolation> = vias
        .par_iter()
        .filter_map(|&id| {
            let count = checked.fetch_add(1, Ordering::Relaxed);

            if count % REPORT_DELTA == 0 {
                if let Some(p) = progress {
                    if p.is_cancelled() {
                        return None;
                    }
                    p.keep_refreshing();
                }
            }

            let BoardEntity::Via(via) = board.get(id) else {
                return None;
            };

            let annulus = (via.diameter - via.drill) / 2.0;

            if let Some(min) = constraint.min_width {
                if annulus < min {
                    return Some(AnnulusViolation {
                        entity: id,
                        net: via.net,
                        position: via.position,
                        annulus_width: annulus,
                        required_width: min,
                        kind: AnnulusViolationKind::BelowMin,
                    });
                }
            }

            if let Some(max) = constraint.max_width {
                if annulus > max {
                    return Some(AnnulusViolation {
                        entity: id,
                        net: via.net,
                        position: via.position,
                        annulus_width: annulus,
                        required_width: max,
                        kind: AnnulusViolationKind::AboveMax,
                    });
                }
            }

            None
        })
        .collect();

    violations.sort_by_key(|v| v.entity);

    debug!(
        vias = vias.len(),
        violations = violations.len(),
        "annular ring check completed"
    );

    violations
}
