use tsugihagi_core::{Board, SeedStream, ShapeGrid, ShapeKind};

const PW: f32 = 100.0;
const PH: f32 = 80.0;

fn board(nx: usize, ny: usize) -> Board {
    let mut rng = SeedStream::new(5);
    let shape = ShapeGrid::build(nx, ny, 0.1, ShapeKind::Straight, &mut rng);
    Board::build(&shape, PW, PH)
}

fn partition(board: &Board) -> Vec<Vec<usize>> {
    let mut groups: Vec<Vec<usize>> = board
        .groups
        .iter()
        .map(|g| {
            let mut ids = g.pieces.clone();
            ids.sort_unstable();
            ids
        })
        .collect();
    groups.sort();
    groups
}

#[test]
fn fresh_board_has_one_solo_group_per_piece() {
    let board = board(4, 3);
    assert_eq!(board.groups.len(), 12);
    for group in &board.groups {
        assert_eq!(group.pieces.len(), 1);
        assert_eq!(group.rot, 0);
        assert_eq!((group.x, group.y), board.solved_position(group));
        assert_eq!(group.loops.len(), 1);
        assert_eq!(group.loops[0].len(), 4);
    }
}

#[test]
fn solved_neighbors_are_near_and_merge_to_one_loop() {
    let mut board = board(4, 3);
    let connect = board.connect_distance();
    assert!(board.is_near(0, 1, connect));
    let (survivor, released) = board.merge(0, 1);
    assert_eq!(released, 1);
    let group = &board.groups[survivor];
    assert_eq!(group.pieces, vec![0, 1]);
    assert_eq!(board.rotated_size(group), (2.0 * PW, PH));
    assert_eq!(group.loops.len(), 1);
    assert_eq!(group.loops[0].len(), 6);
}

#[test]
fn rotated_groups_never_match() {
    let mut board = board(2, 1);
    board.groups[1].rot = 1;
    assert!(!board.is_near(0, 1, board.connect_distance()));
}

#[test]
fn distant_groups_never_match() {
    let mut board = board(2, 1);
    board.groups[1].x += 10.0 * PW;
    assert!(!board.is_near(0, 1, board.connect_distance()));
}

#[test]
fn diagonal_neighbors_never_match() {
    // Both parked at solved positions, so the reference corners agree, but
    // the cells only touch at a corner.
    let board = board(2, 2);
    let a = board.group_index(0).unwrap();
    let d = board.group_index(3).unwrap();
    assert!(!board.is_near(a, d, board.connect_distance()));
}

#[test]
fn larger_group_survives_a_merge() {
    let mut board = board(3, 1);
    let connect = board.connect_distance();
    let (pair, _) = board.merge(1, 2);
    assert_eq!(board.groups[pair].pieces, vec![1, 2]);
    let solo = board.group_index(0).unwrap();
    assert!(board.is_near(solo, pair, connect));
    let (survivor, released) = board.merge(solo, pair);
    assert_eq!(released, 0);
    assert_eq!(board.groups[survivor].id, 1);
    assert_eq!(board.groups[survivor].pieces, vec![0, 1, 2]);
}

#[test]
fn merging_leftward_moves_the_anchor_back() {
    let mut board = board(3, 1);
    board.merge(1, 2);
    let pair = board.group_index(1).unwrap();
    assert_eq!(board.groups[pair].x, PW);
    let solo = board.group_index(0).unwrap();
    let (survivor, _) = board.merge(pair, solo);
    assert_eq!(board.groups[survivor].x, 0.0);
    assert_eq!(board.groups[survivor].y, 0.0);
}

#[test]
fn merge_keeps_every_point_visually_fixed_under_rotation() {
    for rot in 0..4u8 {
        let mut board = board(4, 3);
        let a = board.group_index(0).unwrap();
        let b = board.group_index(1).unwrap();
        board.groups[a].rot = rot;
        board.groups[b].rot = rot;
        board.groups[a].x = 37.0;
        board.groups[a].y = 11.0;
        // Place b exactly joined to a: reference corners must coincide.
        let ref_a = board.screen_of_board_point(&board.groups[a], 0.0, 0.0);
        board.groups[b].x = 0.0;
        board.groups[b].y = 0.0;
        let off_b = board.screen_of_board_point(&board.groups[b], 0.0, 0.0);
        board.groups[b].x = ref_a.0 - off_b.0;
        board.groups[b].y = ref_a.1 - off_b.1;

        let probe = (1.5 * PW, 0.25 * PH);
        let before_a = board.screen_of_board_point(&board.groups[a], probe.0, probe.1);
        let before_b = board.screen_of_board_point(&board.groups[b], probe.0, probe.1);
        assert!((before_a.0 - before_b.0).abs() < 1e-3);
        assert!((before_a.1 - before_b.1).abs() < 1e-3);
        assert!(board.is_near(a, b, board.connect_distance()));

        let (survivor, _) = board.merge(a, b);
        let after = board.screen_of_board_point(&board.groups[survivor], probe.0, probe.1);
        assert!(
            (after.0 - before_a.0).abs() < 1e-3 && (after.1 - before_a.1).abs() < 1e-3,
            "rot {rot}: {after:?} vs {before_a:?}"
        );
    }
}

#[test]
fn merge_scan_chains_in_one_release() {
    let mut board = board(3, 1);
    let (survivor, released) = board.merge_scan(0, board.connect_distance());
    assert_eq!(released.len(), 2);
    assert_eq!(board.groups.len(), 1);
    assert_eq!(board.groups[survivor].pieces, vec![0, 1, 2]);
}

#[test]
fn fixpoint_partition_matches_equal_rotation_components() {
    let mut board = board(3, 3);
    let last = board.group_index(8).unwrap();
    board.groups[last].rot = 1;
    board.merge_all(board.connect_distance());
    let parts = partition(&board);
    assert_eq!(parts, vec![vec![0, 1, 2, 3, 4, 5, 6, 7], vec![8]]);
}

#[test]
fn fixpoint_partition_is_scan_order_independent() {
    let mut forward = board(3, 3);
    let tilted = forward.group_index(4).unwrap();
    forward.groups[tilted].rot = 2;
    let mut backward = board(3, 3);
    let tilted = backward.group_index(4).unwrap();
    backward.groups[tilted].rot = 2;

    forward.merge_all(forward.connect_distance());
    // Seed the other board from the far corner before running to fixpoint.
    let connect = backward.connect_distance();
    let start = backward.group_index(8).unwrap();
    backward.merge_scan(start, connect);
    backward.merge_all(connect);

    assert_eq!(partition(&forward), partition(&backward));
}

#[test]
fn won_only_with_a_single_unrotated_group() {
    let mut board = board(2, 1);
    assert!(!board.is_won());
    board.merge_all(board.connect_distance());
    assert_eq!(board.groups.len(), 1);
    assert!(board.is_won());
    board.groups[0].rot = 1;
    assert!(!board.is_won());
}

#[test]
fn progress_tracks_joins() {
    let mut board = board(2, 2);
    assert_eq!(board.progress(), 0.0);
    board.merge(0, 1);
    assert!((board.progress() - 1.0 / 3.0).abs() < 1e-6);
    board.merge_all(board.connect_distance());
    assert_eq!(board.progress(), 1.0);
}

#[test]
fn rotation_preserves_the_visual_center() {
    let mut board = board(3, 1);
    board.merge(0, 1);
    let index = board.group_index(0).unwrap();
    let (w, h) = board.rotated_size(&board.groups[index]);
    let center = (
        board.groups[index].x + w * 0.5,
        board.groups[index].y + h * 0.5,
    );
    board.rotate_cw(index);
    let (w2, h2) = board.rotated_size(&board.groups[index]);
    assert_eq!((w2, h2), (h, w));
    let center2 = (
        board.groups[index].x + w2 * 0.5,
        board.groups[index].y + h2 * 0.5,
    );
    assert!((center.0 - center2.0).abs() < 1e-4);
    assert!((center.1 - center2.1).abs() < 1e-4);
}

#[test]
fn group_contains_respects_rotation_and_holes() {
    let mut board = board(3, 3);
    // Park the center piece far away, then let the ring assemble itself.
    let center = board.group_index(4).unwrap();
    board.groups[center].x = 30.0 * PW;
    board.merge_all(board.connect_distance());
    let ring_index = board.group_index(0).unwrap();
    let ring_group = &board.groups[ring_index];
    assert_eq!(ring_group.pieces.len(), 8);
    assert_eq!(ring_group.loops.len(), 2);
    assert!(board.group_contains(ring_group, 0.5 * PW, 0.5 * PH));
    assert!(!board.group_contains(ring_group, 1.5 * PW, 1.5 * PH));

    let mut board = board_rotated_domino();
    let index = board.group_index(0).unwrap();
    board.groups[index].x = 500.0;
    board.groups[index].y = 200.0;
    let group = &board.groups[index];
    // rot 1 footprint is PH wide and 2*PW tall.
    assert!(board.group_contains(group, 500.0 + PH * 0.5, 200.0 + PW));
    assert!(!board.group_contains(group, 500.0 + PH * 0.5, 200.0 - PW * 0.5));
}

fn board_rotated_domino() -> Board {
    let mut board = board(2, 1);
    board.merge(0, 1);
    let index = board.group_index(0).unwrap();
    board.rotate_cw(index);
    board
}
