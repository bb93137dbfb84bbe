use crate::geom::Point;
use crate::model::{Board, PolyPiece};
use crate::shape::SideKind;

/// Pure draw commands. The rendering collaborator replays them against
/// whatever surface it has; nothing in the core touches a canvas.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PathCmd {
    MoveTo(Point),
    LineTo(Point),
    CubicTo(Point, Point, Point),
    Close,
}

/// Source/destination pair for blitting one piece's image region. The source
/// rectangle is padded so knob overhangs survive the clip; coordinates are
/// board pixels, destination local to the group's unrotated bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlitRect {
    pub sx: f32,
    pub sy: f32,
    pub sw: f32,
    pub sh: f32,
    pub dx: f32,
    pub dy: f32,
}

/// Resolve one outline loop of a group into drawing commands, local to the
/// group's unrotated bounding box. Sides come back from the edge store
/// already oriented for clockwise traversal.
pub fn loop_path(board: &Board, group: &PolyPiece, loop_index: usize) -> Vec<PathCmd> {
    let offset_x = group.kxmin as f32 * board.piece_w;
    let offset_y = group.kymin as f32 * board.piece_h;
    let local = |p: Point| Point::new(p.x - offset_x, p.y - offset_y);

    let mut cmds = Vec::new();
    let edges = &group.loops[loop_index];
    for (index, edge) in edges.iter().enumerate() {
        let side = board
            .shape
            .piece_side(edge.kx as usize, edge.ky as usize, edge.slot);
        if index == 0 {
            cmds.push(PathCmd::MoveTo(local(side.start())));
        }
        match side.kind {
            SideKind::Straight => {
                for point in &side.points[1..] {
                    cmds.push(PathCmd::LineTo(local(*point)));
                }
            }
            SideKind::Curved => {
                let mut chunk = side.points[1..].chunks_exact(3);
                for triple in &mut chunk {
                    cmds.push(PathCmd::CubicTo(
                        local(triple[0]),
                        local(triple[1]),
                        local(triple[2]),
                    ));
                }
                for point in chunk.remainder() {
                    cmds.push(PathCmd::LineTo(local(*point)));
                }
            }
        }
    }
    cmds.push(PathCmd::Close);
    cmds
}

pub fn group_paths(board: &Board, group: &PolyPiece) -> Vec<Vec<PathCmd>> {
    (0..group.loops.len())
        .map(|index| loop_path(board, group, index))
        .collect()
}

/// Image blit rectangles for every piece of the group, padded by the knob
/// overhang and clamped to the board.
pub fn group_blits(board: &Board, group: &PolyPiece) -> Vec<BlitRect> {
    let pad_x = board.piece_w * 0.25;
    let pad_y = board.piece_h * 0.25;
    let board_w = board.nx as f32 * board.piece_w;
    let board_h = board.ny as f32 * board.piece_h;
    let offset_x = group.kxmin as f32 * board.piece_w;
    let offset_y = group.kymin as f32 * board.piece_h;
    group
        .pieces
        .iter()
        .map(|&id| {
            let piece = board.pieces[id];
            let sx = (piece.kx as f32 * board.piece_w - pad_x).max(0.0);
            let sy = (piece.ky as f32 * board.piece_h - pad_y).max(0.0);
            let sw = (piece.kx as f32 * board.piece_w + board.piece_w + pad_x).min(board_w) - sx;
            let sh = (piece.ky as f32 * board.piece_h + board.piece_h + pad_y).min(board_h) - sy;
            BlitRect {
                sx,
                sy,
                sw,
                sh,
                dx: sx - offset_x,
                dy: sy - offset_y,
            }
        })
        .collect()
}
