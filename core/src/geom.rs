use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: Point) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn scaled(&self, sx: f32, sy: f32) -> Point {
        Point::new(self.x * sx, self.y * sy)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Segment {
    pub a: Point,
    pub b: Point,
}

impl Segment {
    pub fn new(a: Point, b: Point) -> Self {
        Self { a, b }
    }

    pub fn length(&self) -> f32 {
        self.a.distance(self.b)
    }

    pub fn direction(&self) -> (f32, f32) {
        let len = self.length();
        if len <= f32::EPSILON {
            return (0.0, 0.0);
        }
        ((self.b.x - self.a.x) / len, (self.b.y - self.a.y) / len)
    }

    pub fn point_on_relative(&self, t: f32) -> Point {
        Point::new(
            self.a.x + (self.b.x - self.a.x) * t,
            self.a.y + (self.b.y - self.a.y) * t,
        )
    }

    pub fn midpoint(&self) -> Point {
        self.point_on_relative(0.5)
    }
}

/// Rotate a vector by quarter turns, clockwise in screen coordinates
/// (y grows downward).
pub fn quarter_rotate(x: f32, y: f32, quarter: u8) -> (f32, f32) {
    match quarter % 4 {
        0 => (x, y),
        1 => (-y, x),
        2 => (-x, -y),
        _ => (y, -x),
    }
}
