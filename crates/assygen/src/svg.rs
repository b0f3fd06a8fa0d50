//! SVG output for the command line tool.

use std::fmt::Write;

use crate::surface::{Affine, Color, DrawingSurface};
use crate::types::BBox;

/// Writes drawing requests as SVG elements.
///
/// Shapes are emitted in board coordinates (millimetres, Y up) with the
/// surface's own transform stack already applied; [`SvgSurface::finish`]
/// flips the Y axis so the board reads upright.
#[derive(Debug)]
pub struct SvgSurface {
    body: String,
    current: Affine,
    stack: Vec<Affine>,
    fill: Color,
    background: Color,
}

impl Default for SvgSurface {
    fn default() -> Self {
        Self {
            body: String::new(),
            current: Affine::IDENTITY,
            stack: Vec::new(),
            fill: Color::BLACK,
            background: Color::WHITE,
        }
    }
}

impl SvgSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Elements written so far, without the document wrapper.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Wrap the body in an `<svg>` document sized to `extents` plus `margin`.
    pub fn finish(&self, extents: &BBox, margin: f64) -> String {
        let b = extents.valid().unwrap_or(BBox {
            minx: 0.0,
            miny: 0.0,
            maxx: 1.0,
            maxy: 1.0,
        });
        let x = b.minx - margin;
        let y = -(b.maxy + margin);
        let w = b.width() + 2.0 * margin;
        let h = b.height() + 2.0 * margin;

        let mut svg = String::new();
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="{x:.4} {y:.4} {w:.4} {h:.4}" width="{w:.4}mm" height="{h:.4}mm">"#
        );
        let _ = writeln!(
            svg,
            r#"  <rect x="{x:.4}" y="{y:.4}" width="{w:.4}" height="{h:.4}" fill="{}"/>"#,
            self.background.to_hex()
        );
        let _ = writeln!(svg, r#"  <g transform="scale(1 -1)">"#);
        svg.push_str(&self.body);
        let _ = writeln!(svg, "  </g>");
        svg.push_str("</svg>\n");
        svg
    }

    fn fill_attr(&self) -> String {
        format!(r#"fill="{}" stroke="none""#, self.fill.to_hex())
    }
}

impl DrawingSurface for SvgSurface {
    fn stroke_line(&mut self, from: [f64; 2], to: [f64; 2], width: f64, round_cap: bool) {
        let [x1, y1] = self.current.apply(from);
        let [x2, y2] = self.current.apply(to);
        let cap = if round_cap { "round" } else { "butt" };
        let _ = writeln!(
            self.body,
            r#"    <line x1="{x1:.4}" y1="{y1:.4}" x2="{x2:.4}" y2="{y2:.4}" stroke="{}" stroke-width="{width:.4}" stroke-linecap="{cap}"/>"#,
            self.fill.to_hex()
        );
    }

    fn fill_rect(&mut self, center: [f64; 2], width: f64, height: f64, rotation: f64) {
        let [cx, cy] = self.current.apply(center);
        let angle = rotation + self.current.angle();
        let transform = if angle.abs() > 1e-9 {
            format!(r#" transform="rotate({angle:.4} {cx:.4} {cy:.4})""#)
        } else {
            String::new()
        };
        let _ = writeln!(
            self.body,
            r#"    <rect x="{:.4}" y="{:.4}" width="{width:.4}" height="{height:.4}"{transform} {}/>"#,
            cx - width / 2.0,
            cy - height / 2.0,
            self.fill_attr()
        );
    }

    fn fill_circle(&mut self, center: [f64; 2], radius: f64) {
        let [cx, cy] = self.current.apply(center);
        let _ = writeln!(
            self.body,
            r#"    <circle cx="{cx:.4}" cy="{cy:.4}" r="{radius:.4}" {}/>"#,
            self.fill_attr()
        );
    }

    fn fill_polygon(&mut self, points: &[[f64; 2]]) {
        if points.len() < 3 {
            return;
        }
        let mut coords = String::new();
        for p in points {
            let [x, y] = self.current.apply(*p);
            let _ = write!(coords, "{x:.4},{y:.4} ");
        }
        let _ = writeln!(
            self.body,
            r#"    <polygon points="{}" {}/>"#,
            coords.trim_end(),
            self.fill_attr()
        );
    }

    fn push_transform(&mut self) {
        self.stack.push(self.current);
    }

    fn pop_transform(&mut self) {
        if let Some(t) = self.stack.pop() {
            self.current = t;
        }
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        self.current.translate(dx, dy);
    }

    fn rotate(&mut self, degrees: f64) {
        self.current.rotate(degrees);
    }

    // Every stroke carries its own width
    fn set_line_width(&mut self, _width: f64) {}

    fn set_colors(&mut self, foreground: Color, background: Color) {
        self.fill = foreground;
        self.background = background;
    }
}
