use std::collections::{HashMap, HashSet};

use crate::shape::{EDGE_BOTTOM, EDGE_LEFT, EDGE_RIGHT, EDGE_TOP};

/// One edge of one grid cell on the boundary of a group, oriented clockwise
/// around the group (top edges head right, right edges head down, and so on).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundaryEdge {
    pub kx: u32,
    pub ky: u32,
    pub slot: usize,
}

impl BoundaryEdge {
    pub fn lead_corner(&self) -> (u32, u32) {
        match self.slot {
            EDGE_TOP => (self.kx, self.ky),
            EDGE_RIGHT => (self.kx + 1, self.ky),
            EDGE_BOTTOM => (self.kx + 1, self.ky + 1),
            _ => (self.kx, self.ky + 1),
        }
    }

    pub fn trail_corner(&self) -> (u32, u32) {
        match self.slot {
            EDGE_TOP => (self.kx + 1, self.ky),
            EDGE_RIGHT => (self.kx + 1, self.ky + 1),
            EDGE_BOTTOM => (self.kx, self.ky + 1),
            _ => (self.kx, self.ky),
        }
    }
}

pub fn neighbor_cell(kx: u32, ky: u32, slot: usize) -> Option<(u32, u32)> {
    match slot {
        EDGE_TOP => ky.checked_sub(1).map(|ny| (kx, ny)),
        EDGE_RIGHT => Some((kx + 1, ky)),
        EDGE_BOTTOM => Some((kx, ky + 1)),
        _ => kx.checked_sub(1).map(|nx| (nx, ky)),
    }
}

/// Derive the closed boundary loops of a cell set: the outer silhouette plus
/// one loop per hole. An edge is on the boundary iff the adjacent cell in
/// that direction is not in the set. From each edge's trailing corner the
/// walk continues straight first, then turns into the cell, then around the
/// outer corner. Deterministic for a given membership, and idempotent.
pub fn list_loops(cells: &[(u32, u32)]) -> Vec<Vec<BoundaryEdge>> {
    let set: HashSet<(u32, u32)> = cells.iter().copied().collect();
    let mut ordered: Vec<(u32, u32)> = set.iter().copied().collect();
    ordered.sort_unstable_by_key(|&(kx, ky)| (ky, kx));

    let mut pool = Vec::new();
    for &(kx, ky) in &ordered {
        for slot in [EDGE_TOP, EDGE_RIGHT, EDGE_BOTTOM, EDGE_LEFT] {
            let outside = match neighbor_cell(kx, ky, slot) {
                Some(neighbor) => !set.contains(&neighbor),
                None => true,
            };
            if outside {
                pool.push(BoundaryEdge { kx, ky, slot });
            }
        }
    }

    let mut by_lead: HashMap<(u32, u32), Vec<usize>> = HashMap::new();
    for (index, edge) in pool.iter().enumerate() {
        by_lead.entry(edge.lead_corner()).or_default().push(index);
    }

    let mut alive = vec![true; pool.len()];
    let mut loops = Vec::new();
    for start in 0..pool.len() {
        if !alive[start] {
            continue;
        }
        alive[start] = false;
        let mut current = pool[start];
        let mut loop_edges = vec![current];
        loop {
            let corner = current.trail_corner();
            let preference = [
                current.slot,
                (current.slot + 1) % 4,
                (current.slot + 3) % 4,
            ];
            let mut next = None;
            'search: for want in preference {
                if let Some(candidates) = by_lead.get(&corner) {
                    for &index in candidates {
                        if alive[index] && pool[index].slot == want {
                            next = Some(index);
                            break 'search;
                        }
                    }
                }
            }
            match next {
                Some(index) => {
                    alive[index] = false;
                    current = pool[index];
                    loop_edges.push(current);
                }
                None => break,
            }
        }
        loops.push(loop_edges);
    }
    loops
}
