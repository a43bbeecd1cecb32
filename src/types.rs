use serde::Deserialize;

/// Axis-aligned rectangle in page space with a top-left origin: `y0` is the
/// top edge and grows downward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Rect {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    pub fn union(self, other: Rect) -> Rect {
        Rect {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Left edge, vertically centred on the box.
    pub fn anchor(&self) -> Point {
        Point {
            x: self.x0,
            y: self.y0 + (self.y1 - self.y0) / 2.0,
        }
    }

    /// Exact coordinate identity, usable as a set key.
    pub fn key(&self) -> RectKey {
        RectKey([
            self.x0.to_bits(),
            self.y0.to_bits(),
            self.x1.to_bits(),
            self.y1.to_bits(),
        ])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RectKey([u32; 4]);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };
}

/// PDF affine matrix `[a b c d e f]`, applied to row vectors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn translate(tx: f32, ty: f32) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// `self` applied first, then `next`.
    pub fn then(self, next: Matrix) -> Matrix {
        Matrix {
            a: self.a * next.a + self.b * next.c,
            b: self.a * next.b + self.b * next.d,
            c: self.c * next.a + self.d * next.c,
            d: self.c * next.b + self.d * next.d,
            e: self.e * next.a + self.f * next.c + next.e,
            f: self.e * next.b + self.f * next.d + next.f,
        }
    }

    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            x * self.a + y * self.c + self.e,
            x * self.b + y * self.d + self.f,
        )
    }

    /// Vertical scale of a unit square after transformation.
    pub fn vertical_extent(&self) -> f32 {
        (self.c * self.c + self.d * self.d).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchor_is_left_edge_vertical_centre() {
        let rect = Rect::new(100.0, 100.0, 150.0, 110.0);
        assert_eq!(rect.anchor(), Point::new(100.0, 105.0));
    }

    #[test]
    fn rect_keys_distinguish_exact_coordinates() {
        let a = Rect::new(1.0, 2.0, 3.0, 4.0);
        let b = Rect::new(1.0, 2.0, 3.0, 4.000_001);
        assert_eq!(a.key(), Rect::new(1.0, 2.0, 3.0, 4.0).key());
        assert_ne!(a.key(), b.key());
    }

    #[test]
    fn union_covers_both_rects() {
        let a = Rect::new(0.0, 5.0, 10.0, 15.0);
        let b = Rect::new(8.0, 2.0, 20.0, 12.0);
        assert_eq!(a.union(b), Rect::new(0.0, 2.0, 20.0, 15.0));
    }

    #[test]
    fn matrix_then_applies_left_to_right() {
        let scale = Matrix::new(2.0, 0.0, 0.0, 2.0, 0.0, 0.0);
        let shift = Matrix::translate(10.0, 20.0);
        let m = scale.then(shift);
        assert_eq!(m.apply(1.0, 1.0), (12.0, 22.0));
        let m = shift.then(scale);
        assert_eq!(m.apply(1.0, 1.0), (22.0, 42.0));
    }
}
