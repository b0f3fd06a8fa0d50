//! The drawing surface the interpreter paints onto.
//!
//! The interpreter only ever writes to a surface. Implementations keep their
//! own transform and style stack; every `push_transform` is paired with a
//! `pop_transform` on the same control path (see [`TransformGuard`]).

use std::ops::{Deref, DerefMut};

/// RGB colour with components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Color {
    pub const BLACK: Color = Color::gray(0.0);
    pub const WHITE: Color = Color::gray(1.0);

    pub const fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    pub const fn gray(level: f64) -> Self {
        Self {
            r: level,
            g: level,
            b: level,
        }
    }

    /// `#rrggbb` notation.
    pub fn to_hex(&self) -> String {
        let c = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!("#{:02x}{:02x}{:02x}", c(self.r), c(self.g), c(self.b))
    }
}

/// Primitive drawing requests issued by the interpreter.
///
/// Coordinates are in the surface's current user space (millimetres, after
/// whatever translate/rotate calls are in effect).
pub trait DrawingSurface {
    fn stroke_line(&mut self, from: [f64; 2], to: [f64; 2], width: f64, round_cap: bool);
    /// Filled rectangle centred on `center`, rotated by `rotation` degrees
    /// counter-clockwise around its centre.
    fn fill_rect(&mut self, center: [f64; 2], width: f64, height: f64, rotation: f64);
    fn fill_circle(&mut self, center: [f64; 2], radius: f64);
    fn fill_polygon(&mut self, points: &[[f64; 2]]);
    fn push_transform(&mut self);
    fn pop_transform(&mut self);
    fn translate(&mut self, dx: f64, dy: f64);
    fn rotate(&mut self, degrees: f64);
    /// Pen width for surfaces that keep stroke state. The interpreter passes
    /// the width with every `stroke_line` and does not call this itself.
    fn set_line_width(&mut self, width: f64);
    fn set_colors(&mut self, foreground: Color, background: Color);
}

/// Saves the surface transform on creation and restores it on drop.
///
/// Derefs to the surface, so drawing calls go through the guard. Early
/// returns and `continue`s inside the guarded scope still restore.
pub struct TransformGuard<'a, S: DrawingSurface + ?Sized> {
    surface: &'a mut S,
}

impl<'a, S: DrawingSurface + ?Sized> TransformGuard<'a, S> {
    pub fn new(surface: &'a mut S) -> Self {
        surface.push_transform();
        Self { surface }
    }
}

impl<S: DrawingSurface + ?Sized> Deref for TransformGuard<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.surface
    }
}

impl<S: DrawingSurface + ?Sized> DerefMut for TransformGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.surface
    }
}

impl<S: DrawingSurface + ?Sized> Drop for TransformGuard<'_, S> {
    fn drop(&mut self) {
        self.surface.pop_transform();
    }
}

// ─── Affine transform ───────────────────────────────────────────────

/// 2D affine transform: `x' = a*x + c*y + e`, `y' = b*x + d*y + f`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine {
    a: f64,
    b: f64,
    c: f64,
    d: f64,
    e: f64,
    f: f64,
}

impl Default for Affine {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Affine {
    pub const IDENTITY: Affine = Affine {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.e += self.a * dx + self.c * dy;
        self.f += self.b * dx + self.d * dy;
    }

    pub fn rotate(&mut self, degrees: f64) {
        let (sin, cos) = degrees.to_radians().sin_cos();
        let (a, b, c, d) = (self.a, self.b, self.c, self.d);
        self.a = a * cos + c * sin;
        self.b = b * cos + d * sin;
        self.c = c * cos - a * sin;
        self.d = d * cos - b * sin;
    }

    pub fn apply(&self, p: [f64; 2]) -> [f64; 2] {
        [
            self.a * p[0] + self.c * p[1] + self.e,
            self.b * p[0] + self.d * p[1] + self.f,
        ]
    }

    /// Rotation component in degrees.
    pub fn angle(&self) -> f64 {
        self.b.atan2(self.a).to_degrees()
    }
}

// ─── Recording surface ──────────────────────────────────────────────

/// A drawing request as seen in world coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    StrokeLine {
        from: [f64; 2],
        to: [f64; 2],
        width: f64,
        round_cap: bool,
    },
    FillRect {
        center: [f64; 2],
        width: f64,
        height: f64,
        rotation: f64,
    },
    FillCircle {
        center: [f64; 2],
        radius: f64,
    },
    FillPolygon {
        points: Vec<[f64; 2]>,
    },
    LineWidth(f64),
    Colors {
        foreground: Color,
        background: Color,
    },
}

/// Surface that records every request with the current transform applied.
///
/// Used for extents-only passes and as the test double for real surfaces.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    ops: Vec<DrawOp>,
    current: Affine,
    stack: Vec<Affine>,
    unbalanced_pops: usize,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    /// Number of geometry requests (lines, rects, circles, polygons).
    pub fn shape_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| !matches!(op, DrawOp::LineWidth(_) | DrawOp::Colors { .. }))
            .count()
    }

    /// Current transform nesting depth; zero when every push was popped.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Pops issued with nothing on the stack.
    pub fn unbalanced_pops(&self) -> usize {
        self.unbalanced_pops
    }
}

impl DrawingSurface for RecordingSurface {
    fn stroke_line(&mut self, from: [f64; 2], to: [f64; 2], width: f64, round_cap: bool) {
        self.ops.push(DrawOp::StrokeLine {
            from: self.current.apply(from),
            to: self.current.apply(to),
            width,
            round_cap,
        });
    }

    fn fill_rect(&mut self, center: [f64; 2], width: f64, height: f64, rotation: f64) {
        self.ops.push(DrawOp::FillRect {
            center: self.current.apply(center),
            width,
            height,
            rotation: rotation + self.current.angle(),
        });
    }

    fn fill_circle(&mut self, center: [f64; 2], radius: f64) {
        self.ops.push(DrawOp::FillCircle {
            center: self.current.apply(center),
            radius,
        });
    }

    fn fill_polygon(&mut self, points: &[[f64; 2]]) {
        let points = points.iter().map(|p| self.current.apply(*p)).collect();
        self.ops.push(DrawOp::FillPolygon { points });
    }

    fn push_transform(&mut self) {
        self.stack.push(self.current);
    }

    fn pop_transform(&mut self) {
        match self.stack.pop() {
            Some(t) => self.current = t,
            None => self.unbalanced_pops += 1,
        }
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        self.current.translate(dx, dy);
    }

    fn rotate(&mut self, degrees: f64) {
        self.current.rotate(degrees);
    }

    fn set_line_width(&mut self, width: f64) {
        self.ops.push(DrawOp::LineWidth(width));
    }

    fn set_colors(&mut self, foreground: Color, background: Color) {
        self.ops.push(DrawOp::Colors {
            foreground,
            background,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_color_hex() {
        assert_eq!(Color::BLACK.to_hex(), "#000000");
        assert_eq!(Color::WHITE.to_hex(), "#ffffff");
        assert_eq!(Color::gray(0.5).to_hex(), "#808080");
    }

    #[test]
    fn test_affine_translate_then_rotate() {
        let mut t = Affine::IDENTITY;
        t.translate(10.0, 5.0);
        t.rotate(90.0);
        let p = t.apply([1.0, 0.0]);
        assert_relative_eq!(p[0], 10.0, epsilon = 1e-9);
        assert_relative_eq!(p[1], 6.0, epsilon = 1e-9);
        assert_relative_eq!(t.angle(), 90.0, epsilon = 1e-9);
    }

    #[test]
    fn test_guard_restores_on_drop() {
        let mut surface = RecordingSurface::new();
        {
            let mut guard = TransformGuard::new(&mut surface);
            guard.translate(3.0, 4.0);
            guard.fill_circle([0.0, 0.0], 1.0);
        }
        surface.fill_circle([0.0, 0.0], 1.0);
        assert_eq!(surface.depth(), 0);
        assert_eq!(surface.unbalanced_pops(), 0);
        assert_eq!(
            surface.ops()[0],
            DrawOp::FillCircle {
                center: [3.0, 4.0],
                radius: 1.0
            }
        );
        assert_eq!(
            surface.ops()[1],
            DrawOp::FillCircle {
                center: [0.0, 0.0],
                radius: 1.0
            }
        );
    }

    #[test]
    fn test_guard_restores_on_early_return() {
        fn draw(surface: &mut RecordingSurface, bail: bool) {
            let mut guard = TransformGuard::new(surface);
            guard.translate(1.0, 1.0);
            if bail {
                return;
            }
            guard.fill_circle([0.0, 0.0], 0.5);
        }

        let mut surface = RecordingSurface::new();
        draw(&mut surface, true);
        draw(&mut surface, false);
        assert_eq!(surface.depth(), 0);
        assert_eq!(surface.shape_count(), 1);
    }

    #[test]
    fn test_unbalanced_pop_counted() {
        let mut surface = RecordingSurface::new();
        surface.pop_transform();
        assert_eq!(surface.unbalanced_pops(), 1);
    }

    #[test]
    fn test_rect_rotation_accumulates() {
        let mut surface = RecordingSurface::new();
        surface.push_transform();
        surface.rotate(30.0);
        surface.fill_rect([0.0, 0.0], 2.0, 1.0, 15.0);
        surface.pop_transform();
        match &surface.ops()[0] {
            DrawOp::FillRect { rotation, .. } => assert_relative_eq!(*rotation, 45.0, epsilon = 1e-9),
            other => panic!("expected FillRect, got: {other:?}"),
        }
    }
}
