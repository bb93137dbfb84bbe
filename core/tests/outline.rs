use tsugihagi_core::list_loops;
use tsugihagi_core::outline::{neighbor_cell, BoundaryEdge};
use tsugihagi_core::shape::{EDGE_BOTTOM, EDGE_LEFT, EDGE_RIGHT, EDGE_TOP};

fn assert_closed(loop_edges: &[BoundaryEdge]) {
    assert!(!loop_edges.is_empty());
    for pair in loop_edges.windows(2) {
        assert_eq!(pair[0].trail_corner(), pair[1].lead_corner());
    }
    let first = loop_edges.first().unwrap();
    let last = loop_edges.last().unwrap();
    assert_eq!(last.trail_corner(), first.lead_corner());
}

fn expected_boundary(cells: &[(u32, u32)]) -> Vec<(u32, u32, usize)> {
    let set: std::collections::HashSet<_> = cells.iter().copied().collect();
    let mut edges = Vec::new();
    for &(kx, ky) in cells {
        for slot in [EDGE_TOP, EDGE_RIGHT, EDGE_BOTTOM, EDGE_LEFT] {
            let outside = match neighbor_cell(kx, ky, slot) {
                Some(neighbor) => !set.contains(&neighbor),
                None => true,
            };
            if outside {
                edges.push((kx, ky, slot));
            }
        }
    }
    edges.sort_unstable();
    edges
}

fn flatten(loops: &[Vec<BoundaryEdge>]) -> Vec<(u32, u32, usize)> {
    let mut edges: Vec<_> = loops
        .iter()
        .flatten()
        .map(|e| (e.kx, e.ky, e.slot))
        .collect();
    edges.sort_unstable();
    edges
}

#[test]
fn single_cell_is_one_four_edge_loop() {
    let loops = list_loops(&[(0, 0)]);
    assert_eq!(loops.len(), 1);
    assert_eq!(loops[0].len(), 4);
    assert_closed(&loops[0]);
}

#[test]
fn domino_collapses_to_one_outer_loop() {
    let loops = list_loops(&[(0, 0), (1, 0)]);
    assert_eq!(loops.len(), 1);
    assert_eq!(loops[0].len(), 6);
    assert_closed(&loops[0]);
}

#[test]
fn l_shape_boundary_covers_exactly_the_boundary_edges() {
    let cells = [(0, 0), (0, 1), (1, 1)];
    let loops = list_loops(&cells);
    assert_eq!(loops.len(), 1);
    assert_closed(&loops[0]);
    assert_eq!(flatten(&loops), expected_boundary(&cells));
}

#[test]
fn ring_yields_an_outer_loop_and_a_hole() {
    let cells: Vec<(u32, u32)> = (0..3u32)
        .flat_map(|ky| (0..3u32).map(move |kx| (kx, ky)))
        .filter(|&cell| cell != (1, 1))
        .collect();
    let loops = list_loops(&cells);
    assert_eq!(loops.len(), 2);
    let mut lens: Vec<usize> = loops.iter().map(|l| l.len()).collect();
    lens.sort_unstable();
    assert_eq!(lens, vec![4, 12]);
    for loop_edges in &loops {
        assert_closed(loop_edges);
    }
    assert_eq!(flatten(&loops), expected_boundary(&cells));
}

#[test]
fn rederiving_loops_is_idempotent() {
    let cells = [(0, 0), (1, 0), (1, 1), (2, 1), (2, 2)];
    let first = list_loops(&cells);
    let second = list_loops(&cells);
    assert_eq!(first, second);
}

#[test]
fn membership_order_does_not_matter() {
    let a = list_loops(&[(0, 0), (1, 0), (1, 1)]);
    let b = list_loops(&[(1, 1), (0, 0), (1, 0)]);
    assert_eq!(a, b);
}

#[test]
fn full_block_has_no_interior_edges() {
    let cells: Vec<(u32, u32)> = (0..4u32)
        .flat_map(|ky| (0..4u32).map(move |kx| (kx, ky)))
        .collect();
    let loops = list_loops(&cells);
    assert_eq!(loops.len(), 1);
    assert_eq!(loops[0].len(), 16);
    assert_closed(&loops[0]);
}
