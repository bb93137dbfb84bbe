use thiserror::Error;

use crate::geom::Point;
use crate::outline::{list_loops, BoundaryEdge};
use crate::shape::ShapeGrid;

pub const CONNECT_DISTANCE_RATIO: f32 = 0.2;

pub type PieceId = usize;
pub type GroupId = usize;

/// Immutable grid cell. Sides are resolved through the shared edge store in
/// `ShapeGrid`; only group ownership ever changes after generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Piece {
    pub id: PieceId,
    pub kx: u32,
    pub ky: u32,
}

/// A polyomino of joined pieces sharing one screen position and rotation.
/// The outline loops are recomputed on every membership change.
#[derive(Clone, Debug)]
pub struct PolyPiece {
    pub id: GroupId,
    pub pieces: Vec<PieceId>,
    pub kxmin: u32,
    pub kxmax: u32,
    pub kymin: u32,
    pub kymax: u32,
    pub x: f32,
    pub y: f32,
    pub rot: u8,
    pub loops: Vec<Vec<BoundaryEdge>>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoardRect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

#[derive(Debug, Error)]
pub enum BoardError {
    #[error("group {0} has no pieces")]
    EmptyGroup(usize),
    #[error("cell ({0}, {1}) outside the grid")]
    CellOutOfRange(u32, u32),
    #[error("cell ({0}, {1}) owned by two groups")]
    CellOwnedTwice(u32, u32),
    #[error("{0} cells not owned by any group")]
    CellsMissing(usize),
}

pub struct Board {
    pub nx: usize,
    pub ny: usize,
    pub piece_w: f32,
    pub piece_h: f32,
    pub shape: ShapeGrid,
    pub pieces: Vec<Piece>,
    pub groups: Vec<PolyPiece>,
    owner: Vec<GroupId>,
}

impl Board {
    /// Fresh board: one solo group per piece, parked at its solved position.
    /// The shape grid arrives in piece units and is scaled here.
    pub fn build(shape: &ShapeGrid, piece_w: f32, piece_h: f32) -> Board {
        let nx = shape.nx;
        let ny = shape.ny;
        let total = nx * ny;
        let mut pieces = Vec::with_capacity(total);
        let mut groups = Vec::with_capacity(total);
        let mut owner = Vec::with_capacity(total);
        for id in 0..total {
            let kx = (id % nx) as u32;
            let ky = (id / nx) as u32;
            pieces.push(Piece { id, kx, ky });
            groups.push(PolyPiece {
                id,
                pieces: vec![id],
                kxmin: kx,
                kxmax: kx,
                kymin: ky,
                kymax: ky,
                x: kx as f32 * piece_w,
                y: ky as f32 * piece_h,
                rot: 0,
                loops: list_loops(&[(kx, ky)]),
            });
            owner.push(id);
        }
        Board {
            nx,
            ny,
            piece_w,
            piece_h,
            shape: shape.scaled(piece_w, piece_h),
            pieces,
            groups,
            owner,
        }
    }

    /// Rebuild from a saved partition. Every cell must be owned exactly once.
    pub fn from_groups(
        shape: &ShapeGrid,
        piece_w: f32,
        piece_h: f32,
        saved: &[(f32, f32, u8, Vec<(u32, u32)>)],
    ) -> Result<Board, BoardError> {
        let mut board = Board::build(shape, piece_w, piece_h);
        let total = board.nx * board.ny;
        let mut seen = vec![false; total];
        let mut groups = Vec::with_capacity(saved.len());
        for (index, (x, y, rot, cells)) in saved.iter().enumerate() {
            if cells.is_empty() {
                return Err(BoardError::EmptyGroup(index));
            }
            let mut ids = Vec::with_capacity(cells.len());
            for &(kx, ky) in cells {
                if kx as usize >= board.nx || ky as usize >= board.ny {
                    return Err(BoardError::CellOutOfRange(kx, ky));
                }
                let id = ky as usize * board.nx + kx as usize;
                if seen[id] {
                    return Err(BoardError::CellOwnedTwice(kx, ky));
                }
                seen[id] = true;
                ids.push(id);
            }
            ids.sort_unstable();
            let kxmin = cells.iter().map(|c| c.0).min().unwrap_or(0);
            let kxmax = cells.iter().map(|c| c.0).max().unwrap_or(0);
            let kymin = cells.iter().map(|c| c.1).min().unwrap_or(0);
            let kymax = cells.iter().map(|c| c.1).max().unwrap_or(0);
            groups.push(PolyPiece {
                id: ids[0],
                pieces: ids,
                kxmin,
                kxmax,
                kymin,
                kymax,
                x: *x,
                y: *y,
                rot: rot % 4,
                loops: list_loops(cells),
            });
        }
        let missing = seen.iter().filter(|s| !**s).count();
        if missing > 0 {
            return Err(BoardError::CellsMissing(missing));
        }
        let mut owner = vec![0; total];
        for group in &groups {
            for &id in &group.pieces {
                owner[id] = group.id;
            }
        }
        board.groups = groups;
        board.owner = owner;
        Ok(board)
    }

    pub fn total_pieces(&self) -> usize {
        self.nx * self.ny
    }

    pub fn connect_distance(&self) -> f32 {
        CONNECT_DISTANCE_RATIO * self.piece_w.min(self.piece_h)
    }

    pub fn owner_of(&self, piece: PieceId) -> GroupId {
        self.owner[piece]
    }

    pub fn group_index(&self, id: GroupId) -> Option<usize> {
        self.groups.iter().position(|g| g.id == id)
    }

    fn bbox_size(&self, group: &PolyPiece) -> (f32, f32) {
        (
            (group.kxmax - group.kxmin + 1) as f32 * self.piece_w,
            (group.kymax - group.kymin + 1) as f32 * self.piece_h,
        )
    }

    /// Footprint of the group on screen: its bounding box after rotation.
    pub fn rotated_size(&self, group: &PolyPiece) -> (f32, f32) {
        let (w, h) = self.bbox_size(group);
        if group.rot % 2 == 1 {
            (h, w)
        } else {
            (w, h)
        }
    }

    fn rotated_offset(&self, group: &PolyPiece, lx: f32, ly: f32) -> (f32, f32) {
        let (w, h) = self.bbox_size(group);
        match group.rot % 4 {
            0 => (lx, ly),
            1 => (h - ly, lx),
            2 => (w - lx, h - ly),
            _ => (ly, w - lx),
        }
    }

    /// Screen position of a point given in solved-board pixel coordinates,
    /// under the group's current transform. Linear, so it extrapolates past
    /// the bounding box; two perfectly joined groups agree on every point.
    pub fn screen_of_board_point(&self, group: &PolyPiece, px: f32, py: f32) -> (f32, f32) {
        let lx = px - group.kxmin as f32 * self.piece_w;
        let ly = py - group.kymin as f32 * self.piece_h;
        let (ox, oy) = self.rotated_offset(group, lx, ly);
        (group.x + ox, group.y + oy)
    }

    fn reference_corner(&self, group: &PolyPiece) -> (f32, f32) {
        self.screen_of_board_point(group, 0.0, 0.0)
    }

    pub fn solved_position(&self, group: &PolyPiece) -> (f32, f32) {
        (
            group.kxmin as f32 * self.piece_w,
            group.kymin as f32 * self.piece_h,
        )
    }

    /// Point-in-group test in board coordinates, against the cell polygon of
    /// the outline loops (knob overhangs are ignored).
    pub fn group_contains(&self, group: &PolyPiece, px: f32, py: f32) -> bool {
        let (w, h) = self.bbox_size(group);
        let (lx, ly) = match group.rot % 4 {
            0 => (px - group.x, py - group.y),
            1 => (py - group.y, h - (px - group.x)),
            2 => (w - (px - group.x), h - (py - group.y)),
            _ => (w - (py - group.y), px - group.x),
        };
        let ox = group.kxmin as f32 * self.piece_w;
        let oy = group.kymin as f32 * self.piece_h;
        let mut inside = false;
        for loop_edges in &group.loops {
            let polygon: Vec<(f32, f32)> = loop_edges
                .iter()
                .map(|edge| {
                    let (cx, cy) = edge.lead_corner();
                    (
                        cx as f32 * self.piece_w - ox,
                        cy as f32 * self.piece_h - oy,
                    )
                })
                .collect();
            if point_in_polygon(lx, ly, &polygon) {
                inside = !inside;
            }
        }
        inside
    }

    /// Quarter-turn clockwise about the group's visual center.
    pub fn rotate_cw(&mut self, index: usize) {
        let (w, h) = self.rotated_size(&self.groups[index]);
        let group = &mut self.groups[index];
        let cx = group.x + w * 0.5;
        let cy = group.y + h * 0.5;
        group.rot = (group.rot + 1) % 4;
        group.x = cx - h * 0.5;
        group.y = cy - w * 0.5;
    }

    pub fn clamp_into(&mut self, index: usize, bounds: BoardRect) {
        let (w, h) = self.rotated_size(&self.groups[index]);
        let group = &mut self.groups[index];
        let max_x = (bounds.x + bounds.w - w).max(bounds.x);
        let max_y = (bounds.y + bounds.h - h).max(bounds.y);
        group.x = group.x.clamp(bounds.x, max_x);
        group.y = group.y.clamp(bounds.y, max_y);
    }

    /// Can these two groups fuse? Same rotation, reference corners within
    /// the connect distance, and at least one edge-adjacent piece pair.
    pub fn is_near(&self, a: usize, b: usize, connect_dist: f32) -> bool {
        let ga = &self.groups[a];
        let gb = &self.groups[b];
        if ga.rot != gb.rot {
            return false;
        }
        let (ax, ay) = self.reference_corner(ga);
        let (bx, by) = self.reference_corner(gb);
        let dx = bx - ax;
        let dy = by - ay;
        if (dx * dx + dy * dy).sqrt() > connect_dist {
            return false;
        }
        let (small, other) = if ga.pieces.len() <= gb.pieces.len() {
            (ga, gb)
        } else {
            (gb, ga)
        };
        for &id in &small.pieces {
            let piece = self.pieces[id];
            let neighbors = [
                (piece.kx.checked_sub(1), Some(piece.ky)),
                (Some(piece.kx + 1), Some(piece.ky)),
                (Some(piece.kx), piece.ky.checked_sub(1)),
                (Some(piece.kx), Some(piece.ky + 1)),
            ];
            for (nkx, nky) in neighbors {
                let (Some(nkx), Some(nky)) = (nkx, nky) else {
                    continue;
                };
                if nkx as usize >= self.nx || nky as usize >= self.ny {
                    continue;
                }
                let nid = nky as usize * self.nx + nkx as usize;
                if self.owner[nid] == other.id {
                    return true;
                }
            }
        }
        false
    }

    /// Fuse two groups. The larger one survives (tie: the first argument);
    /// the absorbed group's id is returned so its render layer can be
    /// released. The survivor's screen position is corrected so its visual
    /// top-left corner stays fixed under the current rotation.
    pub fn merge(&mut self, a: usize, b: usize) -> (usize, GroupId) {
        let (survivor, absorbed) = if self.groups[b].pieces.len() > self.groups[a].pieces.len() {
            (b, a)
        } else {
            (a, b)
        };
        let old_kxmin = self.groups[survivor].kxmin;
        let old_kxmax = self.groups[survivor].kxmax;
        let old_kymin = self.groups[survivor].kymin;
        let old_kymax = self.groups[survivor].kymax;

        let absorbed_group = self.groups.remove(absorbed);
        let survivor = if absorbed < survivor {
            survivor - 1
        } else {
            survivor
        };
        let released = absorbed_group.id;
        let pw = self.piece_w;
        let ph = self.piece_h;

        let group = &mut self.groups[survivor];
        group.kxmin = group.kxmin.min(absorbed_group.kxmin);
        group.kxmax = group.kxmax.max(absorbed_group.kxmax);
        group.kymin = group.kymin.min(absorbed_group.kymin);
        group.kymax = group.kymax.max(absorbed_group.kymax);
        group.pieces.extend_from_slice(&absorbed_group.pieces);
        group.pieces.sort_unstable();

        // Bounding-box growth, mapped to screen axes through the rotation.
        let gx = (old_kxmin - group.kxmin) as f32 * pw;
        let gy = (old_kymin - group.kymin) as f32 * ph;
        let hx = (group.kxmax - old_kxmax) as f32 * pw;
        let hy = (group.kymax - old_kymax) as f32 * ph;
        match group.rot % 4 {
            0 => {
                group.x -= gx;
                group.y -= gy;
            }
            1 => {
                group.x -= hy;
                group.y -= gx;
            }
            2 => {
                group.x -= hx;
                group.y -= hy;
            }
            _ => {
                group.x -= gy;
                group.y -= hx;
            }
        }

        let group_id = group.id;
        for &id in &absorbed_group.pieces {
            self.owner[id] = group_id;
        }
        let cells: Vec<(u32, u32)> = self.groups[survivor]
            .pieces
            .iter()
            .map(|&id| (self.pieces[id].kx, self.pieces[id].ky))
            .collect();
        self.groups[survivor].loops = list_loops(&cells);
        (survivor, released)
    }

    /// Chain-merge the given group against every other until no candidate
    /// remains. Returns the survivor's index plus the released group ids.
    pub fn merge_scan(&mut self, start: usize, connect_dist: f32) -> (usize, Vec<GroupId>) {
        let mut current = start;
        let mut released = Vec::new();
        loop {
            let candidate = (0..self.groups.len())
                .find(|&other| other != current && self.is_near(current, other, connect_dist));
            match candidate {
                Some(other) => {
                    let (next, freed) = self.merge(current, other);
                    released.push(freed);
                    current = next;
                }
                None => break,
            }
        }
        (current, released)
    }

    /// Merge every adjacent same-rotation pair to fixpoint, scanning the
    /// whole board. The resulting partition is the connected components of
    /// the equal-rotation adjacency graph, independent of scan order.
    pub fn merge_all(&mut self, connect_dist: f32) -> Vec<GroupId> {
        let mut released = Vec::new();
        let mut index = 0;
        while index < self.groups.len() {
            let (_, freed) = self.merge_scan(index, connect_dist);
            if freed.is_empty() {
                index += 1;
            } else {
                released.extend(freed);
                index = 0;
            }
        }
        released
    }

    /// Solved iff a single group remains and it sits unrotated.
    pub fn is_won(&self) -> bool {
        self.groups.len() == 1 && self.groups[0].rot == 0
    }

    /// Fraction of the piece joins already made, for progress reporting.
    pub fn progress(&self) -> f32 {
        let total = self.total_pieces();
        if total <= 1 {
            return 1.0;
        }
        let joined = total - self.groups.len();
        joined as f32 / (total - 1) as f32
    }

    pub fn cells_of(&self, group: &PolyPiece) -> Vec<(u32, u32)> {
        group
            .pieces
            .iter()
            .map(|&id| (self.pieces[id].kx, self.pieces[id].ky))
            .collect()
    }

    pub fn corner_point(&self, cx: u32, cy: u32) -> Point {
        self.shape.corners[cy as usize][cx as usize]
    }
}

fn point_in_polygon(x: f32, y: f32, polygon: &[(f32, f32)]) -> bool {
    let mut inside = false;
    let n = polygon.len();
    if n < 3 {
        return false;
    }
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = polygon[i];
        let (xj, yj) = polygon[j];
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}
