use serde::{Deserialize, Serialize};

use crate::geom::{Point, Segment};
use crate::rng::SeedStream;

pub const COEFF_DECENTR_DEFAULT: f32 = 0.12;
pub const COEFF_DECENTR_MAX: f32 = 0.3;

pub const TAB_SHIFT_MAX: f32 = 0.1;
pub const TAB_DEPTH_MIN: f32 = 0.15;
pub const TAB_DEPTH_MAX: f32 = 0.22;
pub const WAVE_SHIFT_MAX: f32 = 0.05;
pub const WAVE_AMP_MAX: f32 = 0.08;
pub const NOTCH_SHIFT_MAX: f32 = 0.15;
pub const NOTCH_DEPTH_MIN: f32 = 0.06;
pub const NOTCH_DEPTH_MAX: f32 = 0.18;

// Knob profile for tab edges, as (along, across) fractions of the edge
// length. Groups of three are cubic control pairs plus the segment end;
// negative "across" bulges toward the protrusion side.
const TAB_TEMPLATE: [(f32, f32); 18] = [
    (0.0, 0.0),
    (0.35, 0.15),
    (0.37, 0.05),
    (0.37, 0.05),
    (0.40, 0.0),
    (0.38, -0.05),
    (0.38, -0.05),
    (0.20, -0.20),
    (0.50, -0.20),
    (0.50, -0.20),
    (0.80, -0.20),
    (0.62, -0.05),
    (0.62, -0.05),
    (0.60, 0.0),
    (0.63, 0.05),
    (0.63, 0.05),
    (0.65, 0.15),
    (1.0, 0.0),
];
const TAB_TEMPLATE_DEPTH: f32 = 0.20;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShapeKind {
    Tab,
    Wave,
    Notch,
    Straight,
}

impl ShapeKind {
    pub fn from_index(index: u32) -> Option<ShapeKind> {
        match index {
            0 => Some(ShapeKind::Tab),
            1 => Some(ShapeKind::Wave),
            2 => Some(ShapeKind::Notch),
            3 => Some(ShapeKind::Straight),
            _ => None,
        }
    }

    pub fn index(self) -> u32 {
        match self {
            ShapeKind::Tab => 0,
            ShapeKind::Wave => 1,
            ShapeKind::Notch => 2,
            ShapeKind::Straight => 3,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SideKind {
    Straight,
    Curved,
}

/// One edge of one piece. Straight sides are polylines; curved sides are an
/// anchor point followed by cubic control triples. Endpoints are fixed at
/// generation time, and `reversed` is the exact mirror sequence consumed by
/// the piece on the other side of the edge.
#[derive(Clone, Debug, PartialEq)]
pub struct Side {
    pub kind: SideKind,
    pub points: Vec<Point>,
}

impl Side {
    pub fn straight(a: Point, b: Point) -> Self {
        Self {
            kind: SideKind::Straight,
            points: vec![a, b],
        }
    }

    pub fn start(&self) -> Point {
        self.points[0]
    }

    pub fn end(&self) -> Point {
        self.points[self.points.len() - 1]
    }

    pub fn reversed(&self) -> Side {
        let mut points = self.points.clone();
        points.reverse();
        Side {
            kind: self.kind,
            points,
        }
    }

    pub fn scaled(&self, sx: f32, sy: f32) -> Side {
        Side {
            kind: self.kind,
            points: self.points.iter().map(|p| p.scaled(sx, sy)).collect(),
        }
    }
}

pub const EDGE_TOP: usize = 0;
pub const EDGE_RIGHT: usize = 1;
pub const EDGE_BOTTOM: usize = 2;
pub const EDGE_LEFT: usize = 3;

/// Corner grid plus the shared edge store. Each interior edge is generated
/// exactly once and held in canonical orientation (horizontal left-to-right,
/// vertical top-to-bottom); pieces on either side resolve it through
/// `piece_side`, one of them as a reversed view.
#[derive(Clone, Debug)]
pub struct ShapeGrid {
    pub nx: usize,
    pub ny: usize,
    pub corners: Vec<Vec<Point>>,
    pub horizontal: Vec<Vec<Side>>,
    pub vertical: Vec<Vec<Side>>,
}

impl ShapeGrid {
    pub fn build(
        nx: usize,
        ny: usize,
        coeff_decentr: f32,
        kind: ShapeKind,
        rng: &mut SeedStream,
    ) -> ShapeGrid {
        let nx = nx.max(1);
        let ny = ny.max(1);
        let jitter = coeff_decentr.clamp(0.0, COEFF_DECENTR_MAX);

        let mut corners = Vec::with_capacity(ny + 1);
        for j in 0..=ny {
            let mut row = Vec::with_capacity(nx + 1);
            for i in 0..=nx {
                // Border corners stay exactly on the image border along the
                // snapped axis; everything else wanders.
                let x = if i == 0 || i == nx {
                    i as f32
                } else {
                    i as f32 + rng.range(-jitter, jitter)
                };
                let y = if j == 0 || j == ny {
                    j as f32
                } else {
                    j as f32 + rng.range(-jitter, jitter)
                };
                row.push(Point::new(x, y));
            }
            corners.push(row);
        }

        let placeholder = Side::straight(Point::new(0.0, 0.0), Point::new(0.0, 0.0));
        let mut horizontal = vec![vec![placeholder.clone(); nx]; ny + 1];
        let mut vertical = vec![vec![placeholder; nx + 1]; ny];

        // Row-major over pieces: each piece contributes its right and bottom
        // edges; its top and left were already built by the neighbors above
        // and to the left (or are border edges seeded here).
        for ky in 0..ny {
            for kx in 0..nx {
                if ky == 0 {
                    horizontal[0][kx] = Side::straight(corners[0][kx], corners[0][kx + 1]);
                }
                if kx == 0 {
                    vertical[ky][0] = Side::straight(corners[ky][0], corners[ky + 1][0]);
                }
                vertical[ky][kx + 1] = if kx + 1 == nx {
                    Side::straight(corners[ky][nx], corners[ky + 1][nx])
                } else {
                    perturbed_side(
                        kind,
                        corners[ky][kx + 1],
                        corners[ky + 1][kx + 1],
                        corners[ky][kx],
                        corners[ky + 1][kx],
                        rng,
                    )
                };
                horizontal[ky + 1][kx] = if ky + 1 == ny {
                    Side::straight(corners[ny][kx], corners[ny][kx + 1])
                } else {
                    perturbed_side(
                        kind,
                        corners[ky + 1][kx],
                        corners[ky + 1][kx + 1],
                        corners[ky][kx],
                        corners[ky][kx + 1],
                        rng,
                    )
                };
            }
        }

        ShapeGrid {
            nx,
            ny,
            corners,
            horizontal,
            vertical,
        }
    }

    /// Side of piece (kx, ky) in outline traversal order: clockwise, so the
    /// bottom and left slots are reversed views of the stored edges.
    pub fn piece_side(&self, kx: usize, ky: usize, slot: usize) -> Side {
        match slot {
            EDGE_TOP => self.horizontal[ky][kx].clone(),
            EDGE_RIGHT => self.vertical[ky][kx + 1].clone(),
            EDGE_BOTTOM => self.horizontal[ky + 1][kx].reversed(),
            _ => self.vertical[ky][kx].reversed(),
        }
    }

    pub fn scaled(&self, sx: f32, sy: f32) -> ShapeGrid {
        ShapeGrid {
            nx: self.nx,
            ny: self.ny,
            corners: self
                .corners
                .iter()
                .map(|row| row.iter().map(|p| p.scaled(sx, sy)).collect())
                .collect(),
            horizontal: self
                .horizontal
                .iter()
                .map(|row| row.iter().map(|s| s.scaled(sx, sy)).collect())
                .collect(),
            vertical: self
                .vertical
                .iter()
                .map(|row| row.iter().map(|s| s.scaled(sx, sy)).collect())
                .collect(),
        }
    }
}

fn perturbed_side(
    kind: ShapeKind,
    a: Point,
    b: Point,
    ca: Point,
    cb: Point,
    rng: &mut SeedStream,
) -> Side {
    match kind {
        ShapeKind::Straight => Side::straight(a, b),
        ShapeKind::Tab => tab_side(a, b, ca, cb, rng),
        ShapeKind::Wave => wave_side(a, b, ca, cb, rng),
        ShapeKind::Notch => notch_side(a, b, ca, cb, rng),
    }
}

// Reference axis for all perturbations: from the edge midpoint toward the
// midpoint of the opposite corners (ca, cb). Anchors amplitude and direction
// the same way whether the edge was generated looking down or right.
fn perp_axis(a: Point, b: Point, ca: Point, cb: Point) -> (f32, f32) {
    let edge_mid = Segment::new(a, b).midpoint();
    let opp_mid = Segment::new(ca, cb).midpoint();
    let dx = opp_mid.x - edge_mid.x;
    let dy = opp_mid.y - edge_mid.y;
    let len = (dx * dx + dy * dy).sqrt();
    if len <= f32::EPSILON {
        return (0.0, 0.0);
    }
    (dx / len, dy / len)
}

fn tab_side(a: Point, b: Point, ca: Point, cb: Point, rng: &mut SeedStream) -> Side {
    let seg = Segment::new(a, b);
    let len = seg.length();
    let (ux, uy) = seg.direction();
    let (vx, vy) = perp_axis(a, b, ca, cb);

    // One fair flip per edge decides the protrusion side, independent of any
    // neighbor. Knob position and size jitter as fractions of the edge.
    let sign = if rng.int_below(2) == 1 { 1.0 } else { -1.0 };
    let shift = rng.range(-TAB_SHIFT_MAX, TAB_SHIFT_MAX);
    let depth = rng.range(TAB_DEPTH_MIN, TAB_DEPTH_MAX);
    let depth_scale = depth / TAB_TEMPLATE_DEPTH;

    let mut points = Vec::with_capacity(TAB_TEMPLATE.len() + 1);
    points.push(a);
    for (t, h) in TAB_TEMPLATE {
        // Shift fades to zero at the endpoints so they never move.
        let tj = t + shift * 4.0 * t * (1.0 - t);
        let hj = -h * depth_scale * sign;
        points.push(Point::new(
            a.x + (ux * tj + vx * hj) * len,
            a.y + (uy * tj + vy * hj) * len,
        ));
    }
    // The chain lands exactly on the far corner, untouched by rounding.
    let last = points.len() - 1;
    points[last] = b;
    Side {
        kind: SideKind::Curved,
        points,
    }
}

fn wave_side(a: Point, b: Point, ca: Point, cb: Point, rng: &mut SeedStream) -> Side {
    let seg = Segment::new(a, b);
    let len = seg.length();
    let (ux, uy) = seg.direction();
    let (vx, vy) = perp_axis(a, b, ca, cb);

    let mut knots = Vec::with_capacity(5);
    knots.push(a);
    for base_t in [0.25, 0.5, 0.75] {
        let t = base_t + rng.range(-WAVE_SHIFT_MAX, WAVE_SHIFT_MAX);
        let off = rng.range(-WAVE_AMP_MAX, WAVE_AMP_MAX);
        knots.push(Point::new(
            a.x + (ux * t + vx * off) * len,
            a.y + (uy * t + vy * off) * len,
        ));
    }
    knots.push(b);

    // Catmull-Rom through the knots, clamped so the duplicated endpoints act
    // as corner weights.
    let mut points = Vec::with_capacity(1 + (knots.len() - 1) * 3);
    points.push(a);
    for i in 0..knots.len() - 1 {
        let p0 = knots[i.saturating_sub(1)];
        let p1 = knots[i];
        let p2 = knots[i + 1];
        let p3 = knots[(i + 2).min(knots.len() - 1)];
        points.push(Point::new(
            p1.x + (p2.x - p0.x) / 6.0,
            p1.y + (p2.y - p0.y) / 6.0,
        ));
        points.push(Point::new(
            p2.x - (p3.x - p1.x) / 6.0,
            p2.y - (p3.y - p1.y) / 6.0,
        ));
        points.push(p2);
    }
    Side {
        kind: SideKind::Curved,
        points,
    }
}

fn notch_side(a: Point, b: Point, ca: Point, cb: Point, rng: &mut SeedStream) -> Side {
    let seg = Segment::new(a, b);
    let len = seg.length();
    let (ux, uy) = seg.direction();
    let (vx, vy) = perp_axis(a, b, ca, cb);

    let shift = rng.range(-NOTCH_SHIFT_MAX, NOTCH_SHIFT_MAX);
    let depth = rng.range(NOTCH_DEPTH_MIN, NOTCH_DEPTH_MAX);
    let sign = if rng.int_below(2) == 1 { 1.0 } else { -1.0 };

    let t = 0.5 + shift;
    let foot = Point::new(a.x + ux * t * len, a.y + uy * t * len);
    let apex = Point::new(
        foot.x + vx * depth * sign * len,
        foot.y + vy * depth * sign * len,
    );
    Side {
        kind: SideKind::Straight,
        points: vec![a, foot, apex, b],
    }
}
