// Net propagation behavior: inheritance from pad anchors, conflict
// policies, orphan handling, dirty-net bookkeeping, and cancellation.

use std::sync::Arc;

use pcb_connectivity::geometry::{Point, Shape};
use pcb_connectivity::{
    Board, BoardCommit, ClusterSearchMode, ConnectivityAlgo, EntityId, LayerId, LayerSet,
    ProgressReporter, PropagateMode,
};

fn round_pad(board: &mut Board, x: f32, net: i32) -> EntityId {
    board.add_pad(
        Shape::Circle {
            center: Point::new(x, 0.0),
            radius: 0.5,
        },
        LayerSet::single(LayerId::F_CU),
        net,
    )
}

/// Commit sink recording which entities were modified
#[derive(Default)]
struct RecordingCommit {
    modified: Vec<EntityId>,
}

impl BoardCommit for RecordingCommit {
    fn modify(&mut self, entity: EntityId) {
        self.modified.push(entity);
    }
}

/// Reporter that cancels immediately
struct CancelledReporter;

impl ProgressReporter for CancelledReporter {
    fn set_max_progress(&self, _max: usize) {}

    fn set_current_progress(&self, _fraction: f64) {}

    fn advance_progress(&self) {}

    fn is_cancelled(&self) -> bool {
        true
    }

    fn keep_refreshing(&self) -> bool {
        false
    }
}

#[test]
fn test_track_inherits_pad_net() {
    let mut board = Board::new();
    let pad = round_pad(&mut board, 0.0, 5);
    let track = board.add_track(
        Point::new(0.0, 0.0),
        Point::new(3.0, 0.0),
        0.3,
        LayerId::F_CU,
        0,
    );

    let mut algo = ConnectivityAlgo::new();
    algo.build_items(&board, &[pad, track]);
    algo.clear_dirty_nets();

    let mut commit = RecordingCommit::default();
    algo.propagate_nets(&mut board, Some(&mut commit), PropagateMode::SkipConflicts);

    assert_eq!(board.net(track), 5);
    assert_eq!(board.net(pad), 5);
    assert_eq!(commit.modified, vec![track]);

    // Both the vacated and the adopted net were flagged for recomputation
    assert_eq!(algo.dirty_nets(), vec![0, 5]);
    assert!(algo.is_net_dirty(5));
    assert!(!algo.is_net_dirty(3));

    // A second pass finds nothing left to change
    algo.clear_dirty_nets();
    let mut commit = RecordingCommit::default();
    algo.propagate_nets(&mut board, Some(&mut commit), PropagateMode::SkipConflicts);

    assert!(commit.modified.is_empty());
    assert!(algo.dirty_nets().is_empty());
}

#[test]
fn test_conflicting_cluster_is_skipped() {
    let mut board = Board::new();
    let pad_a = round_pad(&mut board, 0.0, 1);
    let pad_b = round_pad(&mut board, 0.6, 2);
    let via = board.add_via(
        Point::new(0.3, 0.0),
        0.6,
        0.3,
        LayerSet::all_copper(),
        0,
    );

    let mut algo = ConnectivityAlgo::new();
    algo.build_items(&board, &[pad_a, pad_b, via]);

    let clusters = algo.search_clusters(&board, ClusterSearchMode::Propagate);
    assert_eq!(clusters.len(), 1);
    assert!(clusters[0].is_conflicting());
    assert_eq!(clusters[0].origin_net(), 1);

    let mut commit = RecordingCommit::default();
    algo.propagate_nets(&mut board, Some(&mut commit), PropagateMode::SkipConflicts);

    assert_eq!(board.net(via), 0);
    assert!(commit.modified.is_empty());
}

#[test]
fn test_conflict_resolution_adopts_lowest_net() {
    let mut board = Board::new();
    let pad_a = round_pad(&mut board, 0.0, 2);
    let pad_b = round_pad(&mut board, 0.6, 7);
    let via = board.add_via(
        Point::new(0.3, 0.0),
        0.6,
        0.3,
        LayerSet::all_copper(),
        0,
    );

    let mut algo = ConnectivityAlgo::new();
    algo.build_items(&board, &[pad_a, pad_b, via]);

    algo.propagate_nets(&mut board, None, PropagateMode::ResolveConflicts);

    assert_eq!(board.net(via), 2);
    // Pads carry netlist-assigned nets and are never rewritten
    assert_eq!(board.net(pad_a), 2);
    assert_eq!(board.net(pad_b), 7);
}

#[test]
fn test_orphaned_cluster_keeps_its_nets() {
    let mut board = Board::new();
    // A track with a leftover net code but no pad anchor
    let stale = board.add_track(
        Point::new(0.0, 0.0),
        Point::new(3.0, 0.0),
        0.3,
        LayerId::F_CU,
        9,
    );
    let bare = board.add_track(
        Point::new(0.0, 10.0),
        Point::new(3.0, 10.0),
        0.3,
        LayerId::F_CU,
        0,
    );

    let mut algo = ConnectivityAlgo::new();
    algo.build_items(&board, &[stale, bare]);

    let mut commit = RecordingCommit::default();
    algo.propagate_nets(&mut board, Some(&mut commit), PropagateMode::SkipConflicts);

    assert_eq!(board.net(stale), 9);
    assert_eq!(board.net(bare), 0);
    assert!(commit.modified.is_empty());
}

#[test]
fn test_cancelled_search_yields_no_clusters_and_no_changes() {
    let mut board = Board::new();
    let pad = round_pad(&mut board, 0.0, 5);
    let track = board.add_track(
        Point::new(0.0, 0.0),
        Point::new(3.0, 0.0),
        0.3,
        LayerId::F_CU,
        0,
    );

    let mut algo = ConnectivityAlgo::new();
    algo.build_items(&board, &[pad, track]);
    algo.set_progress_reporter(Some(Arc::new(CancelledReporter)));

    let clusters = algo.search_clusters(&board, ClusterSearchMode::Propagate);
    assert!(clusters.is_empty());

    algo.propagate_nets(&mut board, None, PropagateMode::SkipConflicts);
    assert_eq!(board.net(track), 0);

    // Dirty state survives a cancelled pass; the next uncancelled one
    // completes the deferred work
    algo.set_progress_reporter(None);
    algo.propagate_nets(&mut board, None, PropagateMode::SkipConflicts);
    assert_eq!(board.net(track), 5);
}
