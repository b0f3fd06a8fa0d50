use std::f64::consts::PI;

use log::{debug, warn};

use crate::error::GerberError;
use crate::surface::DrawingSurface;
use crate::types::BBox;

use super::apertures::{Aperture, ApertureTable};
use super::commands::{self, ApertureTemplate, LineKind, OpCode, Operation};
use super::coord::{Axis, CoordinateConverter};
use super::diagnostics::Diagnostics;
use super::extents::Extents;
use super::lexer::Statement;
use super::macros::{self, MacroBuilder, MacroStatus, MacroTable};

/// Minimum number of chords used for any arc.
pub const MIN_ARC_SEGMENTS: usize = 8;
/// Largest sweep covered by a single chord, in degrees.
pub const MAX_DEGREES_PER_SEGMENT: f64 = 5.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InterpolationMode {
    #[default]
    Linear,
    ClockwiseArc,
    CounterClockwiseArc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArcDirection {
    Clockwise,
    CounterClockwise,
}

/// Pen state for one pass. Position is in millimetres.
#[derive(Debug, Default)]
pub struct DrawState {
    pub position: [f64; 2],
    pub aperture: Option<u32>,
    pub mode: InterpolationMode,
    pub converter: CoordinateConverter,
    /// Inside G36/G37: contour data moves the pen but is not rendered.
    pub in_region: bool,
}

/// Gerber state machine. Walks statements and issues drawing requests.
#[derive(Debug, Default)]
pub struct Interpreter {
    state: DrawState,
    apertures: ApertureTable,
    macros: MacroTable,
    extents: Extents,
    open_macro: Option<MacroBuilder>,
    finished: bool,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything from the previous pass.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn state(&self) -> &DrawState {
        &self.state
    }

    pub fn apertures(&self) -> &ApertureTable {
        &self.apertures
    }

    pub fn macros(&self) -> &MacroTable {
        &self.macros
    }

    pub fn bbox(&self) -> BBox {
        self.extents.bbox()
    }

    /// True once M02 has been seen.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Process statements in order until the end of the program.
    ///
    /// A statement that fails is recorded in `diag` and skipped; it never
    /// stops the pass.
    pub fn run<S: DrawingSurface + ?Sized>(
        &mut self,
        statements: &[Statement],
        surface: &mut S,
        diag: &mut Diagnostics,
    ) {
        for stmt in statements {
            if self.finished {
                break;
            }
            if let Err(e) = self.execute(stmt, surface, diag) {
                match e.at_line(stmt.line) {
                    GerberError::LineDecode { line, reason } => diag.issue(line, &stmt.text, reason),
                    other => diag.issue(stmt.line, &stmt.text, other.to_string()),
                }
            }
        }
        if let Some(builder) = self.open_macro.take() {
            debug!("Gerber: macro '{}' not closed before end of file", builder.name());
        }
    }

    /// Process a single statement.
    pub fn execute<S: DrawingSurface + ?Sized>(
        &mut self,
        stmt: &Statement,
        surface: &mut S,
        diag: &mut Diagnostics,
    ) -> Result<(), GerberError> {
        if let Some(builder) = self.open_macro.as_mut() {
            if builder.feed(&stmt.text, stmt.line, diag) == MacroStatus::Closed {
                if let Some(builder) = self.open_macro.take() {
                    self.macros.define(builder.finish());
                }
            }
            return Ok(());
        }

        match commands::classify(&stmt.text)? {
            LineKind::FormatSpec(format) => {
                if format.incremental {
                    debug!("Gerber: incremental coordinates are treated as absolute");
                }
                self.state.converter.format = format;
            }
            LineKind::Units(units) => {
                self.state.converter.units = units;
            }
            LineKind::ApertureDefine { code, template } => {
                let scale = self.state.converter.units.scale();
                self.apertures.define(code, aperture_from_template(&template, scale));
            }
            LineKind::MacroApertureRef { code, name, params } => {
                let scale = self.state.converter.units.scale();
                self.apertures.define_macro_ref(code, &name, params, scale);
            }
            LineKind::MacroStart { name, body } => {
                let mut builder = MacroBuilder::new(&name);
                if builder.feed(&body, stmt.line, diag) == MacroStatus::Closed {
                    self.macros.define(builder.finish());
                } else {
                    self.open_macro = Some(builder);
                }
            }
            LineKind::SelectAperture(code) => {
                if self.apertures.get(code).is_none() {
                    debug!("Gerber: selected undefined aperture D{code}");
                }
                self.state.aperture = Some(code);
            }
            LineKind::Mode(mode) => {
                self.state.mode = mode;
            }
            LineKind::Operation(op) => self.operate(&op, surface)?,
            LineKind::Region(active) => {
                self.state.in_region = active;
            }
            LineKind::EndOfProgram => {
                self.finished = true;
            }
            LineKind::Comment | LineKind::Ignored => {}
            LineKind::Unrecognized => diag.unrecognized(&stmt.text),
        }
        Ok(())
    }

    fn operate<S: DrawingSurface + ?Sized>(
        &mut self,
        op: &Operation,
        surface: &mut S,
    ) -> Result<(), GerberError> {
        // Decode everything first so a bad field leaves the state untouched
        let conv = &self.state.converter;
        let start = self.state.position;
        let decode = |value: &Option<String>, axis: Axis, default: f64| match value {
            Some(v) => conv.decode(v, axis),
            None => Ok(default),
        };
        let target = [
            decode(&op.x, Axis::X, start[0])?,
            decode(&op.y, Axis::Y, start[1])?,
        ];
        let offset = [decode(&op.i, Axis::X, 0.0)?, decode(&op.j, Axis::Y, 0.0)?];

        if let Some(mode) = op.mode {
            self.state.mode = mode;
        }
        self.state.position = target;

        if self.state.in_region || op.op == OpCode::Move {
            return Ok(());
        }

        let Some(code) = self.state.aperture else {
            debug!("Gerber: {:?} with no aperture selected", op.op);
            return Ok(());
        };
        let Some(aperture) = self.apertures.get(code) else {
            warn!("Gerber: {:?} with undefined aperture D{code}", op.op);
            return Ok(());
        };

        let drawn = match op.op {
            OpCode::Interpolate => match self.state.mode {
                InterpolationMode::Linear => draw_line(surface, aperture, start, target),
                InterpolationMode::ClockwiseArc => {
                    draw_arc(surface, aperture, start, target, offset, ArcDirection::Clockwise)
                }
                InterpolationMode::CounterClockwiseArc => draw_arc(
                    surface,
                    aperture,
                    start,
                    target,
                    offset,
                    ArcDirection::CounterClockwise,
                ),
            },
            OpCode::Flash => flash(surface, aperture, target, &self.macros),
            OpCode::Move => false,
        };

        if drawn {
            if op.op == OpCode::Interpolate {
                self.extents.update(start[0], start[1], Some(aperture));
            }
            self.extents.update(target[0], target[1], Some(aperture));
        }
        Ok(())
    }
}

/// Convert an %AD template in file units to an aperture in millimetres.
fn aperture_from_template(template: &ApertureTemplate, scale: f64) -> Aperture {
    match *template {
        ApertureTemplate::Circle { diameter } => Aperture::Circle {
            diameter: diameter * scale,
        },
        ApertureTemplate::Rectangle { width, height } => Aperture::Rectangle {
            width: width * scale,
            height: height * scale,
        },
        ApertureTemplate::Obround { width, height } => Aperture::Obround {
            width: width * scale,
            height: height * scale,
        },
        ApertureTemplate::Polygon {
            diameter,
            vertices,
            rotation,
        } => Aperture::Polygon {
            diameter: diameter * scale,
            vertices,
            rotation,
        },
    }
}

/// Draw a straight D01 segment. Returns whether anything was drawn.
fn draw_line<S: DrawingSurface + ?Sized>(
    surface: &mut S,
    aperture: &Aperture,
    from: [f64; 2],
    to: [f64; 2],
) -> bool {
    match aperture {
        Aperture::Circle { diameter } => {
            surface.stroke_line(from, to, *diameter, true);
        }
        Aperture::Rectangle { width, height } => {
            let dx = to[0] - from[0];
            let dy = to[1] - from[1];
            let length = dx.hypot(dy);
            if length < 1e-12 {
                surface.fill_rect(from, *width, *height, 0.0);
            } else {
                let center = [(from[0] + to[0]) / 2.0, (from[1] + to[1]) / 2.0];
                surface.fill_rect(center, length, *width, dy.atan2(dx).to_degrees());
            }
        }
        Aperture::Obround { width, height } => {
            surface.stroke_line(from, to, width.min(*height), true);
        }
        Aperture::Polygon { diameter, .. } => {
            surface.stroke_line(from, to, *diameter, true);
        }
        Aperture::MacroRef { name, .. } => {
            debug!("Gerber: line drawn with macro aperture '{name}' not rendered");
            return false;
        }
    }
    true
}

fn draw_arc<S: DrawingSurface + ?Sized>(
    surface: &mut S,
    aperture: &Aperture,
    from: [f64; 2],
    to: [f64; 2],
    offset: [f64; 2],
    direction: ArcDirection,
) -> bool {
    let Aperture::Circle { diameter } = aperture else {
        debug!("Gerber: arc with non-circular aperture not rendered");
        return false;
    };
    let points = arc_points(from, to, offset, direction);
    for chord in points.windows(2) {
        surface.stroke_line(chord[0], chord[1], *diameter, true);
    }
    true
}

/// Approximate a circular arc as a polyline.
///
/// `offset` is the centre relative to `start` (the I/J values). The sweep
/// follows `direction`, wrapping across 0° as needed; coincident start and
/// end angles give a zero sweep. The first and last points are exactly
/// `start` and `end`. A zero radius yields the straight segment.
pub fn arc_points(
    start: [f64; 2],
    end: [f64; 2],
    offset: [f64; 2],
    direction: ArcDirection,
) -> Vec<[f64; 2]> {
    let center = [start[0] + offset[0], start[1] + offset[1]];
    let radius = offset[0].hypot(offset[1]);
    if radius < 1e-9 {
        return vec![start, end];
    }

    let start_angle = (start[1] - center[1]).atan2(start[0] - center[0]).to_degrees();
    let mut end_angle = (end[1] - center[1]).atan2(end[0] - center[0]).to_degrees();

    match direction {
        ArcDirection::Clockwise => {
            if end_angle > start_angle {
                end_angle -= 360.0;
            }
        }
        ArcDirection::CounterClockwise => {
            if end_angle < start_angle {
                end_angle += 360.0;
            }
        }
    }

    let sweep = end_angle - start_angle;
    let segments = ((sweep.abs() / MAX_DEGREES_PER_SEGMENT).ceil() as usize).max(MIN_ARC_SEGMENTS);

    let mut points = Vec::with_capacity(segments + 1);
    points.push(start);
    for k in 1..segments {
        let angle = (start_angle + sweep * (k as f64) / (segments as f64)).to_radians();
        points.push([
            center[0] + radius * angle.cos(),
            center[1] + radius * angle.sin(),
        ]);
    }
    points.push(end);
    points
}

/// Stamp the aperture at `at`. Returns whether anything was drawn.
fn flash<S: DrawingSurface + ?Sized>(
    surface: &mut S,
    aperture: &Aperture,
    at: [f64; 2],
    macro_table: &MacroTable,
) -> bool {
    match aperture {
        Aperture::Circle { diameter } => surface.fill_circle(at, diameter / 2.0),
        Aperture::Rectangle { width, height } => surface.fill_rect(at, *width, *height, 0.0),
        Aperture::Obround { width, height } => flash_obround(surface, at, *width, *height),
        Aperture::Polygon {
            diameter,
            vertices,
            rotation,
        } => {
            let r = diameter / 2.0;
            let n = *vertices as usize;
            let rot_rad = rotation.to_radians();
            let points: Vec<[f64; 2]> = (0..n)
                .map(|k| {
                    let angle = rot_rad + 2.0 * PI * (k as f64) / (n as f64);
                    [at[0] + r * angle.cos(), at[1] + r * angle.sin()]
                })
                .collect();
            surface.fill_polygon(&points);
        }
        Aperture::MacroRef {
            name,
            params,
            scale,
        } => match macro_table.get(name) {
            Some(mac) => macros::render_macro(mac, params, *scale, at, surface),
            None => {
                warn!("Gerber: D03 flash with undefined macro aperture '{name}'");
                return false;
            }
        },
    }
    true
}

/// Obround (stadium): a rectangle body with semicircular caps on the
/// shorter ends.
fn flash_obround<S: DrawingSurface + ?Sized>(surface: &mut S, at: [f64; 2], width: f64, height: f64) {
    if width >= height {
        let r = height / 2.0;
        let body = width - height;
        if body > 0.0 {
            surface.fill_rect(at, body, height, 0.0);
        }
        surface.fill_circle([at[0] - body / 2.0, at[1]], r);
        surface.fill_circle([at[0] + body / 2.0, at[1]], r);
    } else {
        let r = width / 2.0;
        let body = height - width;
        surface.fill_rect(at, width, body, 0.0);
        surface.fill_circle([at[0], at[1] - body / 2.0], r);
        surface.fill_circle([at[0], at[1] + body / 2.0], r);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gerber::lexer::split_statements;
    use crate::surface::{DrawOp, RecordingSurface};

    const HEADER: &str = "%FSLAX24Y24*%\n%MOMM*%\n";

    fn run(body: &str) -> (Interpreter, RecordingSurface, Diagnostics) {
        let mut interp = Interpreter::new();
        let mut surface = RecordingSurface::new();
        let mut diag = Diagnostics::new(true);
        let source = format!("{HEADER}{body}");
        interp.run(&split_statements(&source), &mut surface, &mut diag);
        (interp, surface, diag)
    }

    fn assert_point(p: [f64; 2], x: f64, y: f64) {
        assert!((p[0] - x).abs() < 1e-9 && (p[1] - y).abs() < 1e-9, "{p:?} != ({x}, {y})");
    }

    #[test]
    fn test_linear_segment_circle() {
        let (interp, surface, _) = run("%ADD10C,0.1*%\nD10*\nG01*\nX0Y0D02*\nX10000Y0D01*\n");
        assert_eq!(
            surface.ops(),
            &[DrawOp::StrokeLine {
                from: [0.0, 0.0],
                to: [1.0, 0.0],
                width: 0.1,
                round_cap: true
            }]
        );
        let b = interp.bbox();
        assert!((b.minx + 0.05).abs() < 1e-9);
        assert!((b.maxx - 1.05).abs() < 1e-9);
        assert!((b.maxy - 0.05).abs() < 1e-9);
    }

    #[test]
    fn test_linear_segment_rectangle() {
        let (_, surface, _) = run("%ADD11R,0.2X0.4*%\nD11*\nX0Y0D02*\nX0Y20000D01*\n");
        match &surface.ops()[0] {
            DrawOp::FillRect {
                center,
                width,
                height,
                rotation,
            } => {
                assert_point(*center, 0.0, 1.0);
                assert!((width - 2.0).abs() < 1e-9);
                assert!((height - 0.2).abs() < 1e-9);
                assert!((rotation - 90.0).abs() < 1e-9);
            }
            other => panic!("expected FillRect, got: {other:?}"),
        }
    }

    #[test]
    fn test_zero_length_rectangle_line_stamps_aperture() {
        let (interp, surface, _) = run("%ADD11R,0.2X0.4*%\nD11*\nX10000Y10000D02*\nX10000Y10000D01*\n");
        assert_eq!(
            surface.ops(),
            &[DrawOp::FillRect {
                center: [1.0, 1.0],
                width: 0.2,
                height: 0.4,
                rotation: 0.0
            }]
        );
        assert!(interp.bbox().valid().is_some());
    }

    #[test]
    fn test_flash_circle_extents() {
        let (interp, surface, _) = run("%ADD10C,0.5*%\nD10*\nX0010000Y0020000D03*\n");
        assert_eq!(
            surface.ops(),
            &[DrawOp::FillCircle {
                center: [1.0, 2.0],
                radius: 0.25
            }]
        );
        let b = interp.bbox();
        assert!((b.minx - 0.75).abs() < 1e-9);
        assert!((b.miny - 1.75).abs() < 1e-9);
        assert!((b.maxx - 1.25).abs() < 1e-9);
        assert!((b.maxy - 2.25).abs() < 1e-9);
    }

    #[test]
    fn test_flash_rectangle() {
        let (_, surface, _) = run("%ADD11R,1.0X0.5*%\nD11*\nX10000Y0D03*\n");
        assert_eq!(
            surface.ops(),
            &[DrawOp::FillRect {
                center: [1.0, 0.0],
                width: 1.0,
                height: 0.5,
                rotation: 0.0
            }]
        );
    }

    #[test]
    fn test_flash_obround_wider() {
        let (_, surface, _) = run("%ADD12O,2.0X1.0*%\nD12*\nX0Y0D03*\n");
        assert_eq!(
            surface.ops(),
            &[
                DrawOp::FillRect {
                    center: [0.0, 0.0],
                    width: 1.0,
                    height: 1.0,
                    rotation: 0.0
                },
                DrawOp::FillCircle {
                    center: [-0.5, 0.0],
                    radius: 0.5
                },
                DrawOp::FillCircle {
                    center: [0.5, 0.0],
                    radius: 0.5
                },
            ]
        );
    }

    #[test]
    fn test_flash_obround_taller() {
        let (_, surface, _) = run("%ADD12O,1.0X3.0*%\nD12*\nX0Y0D03*\n");
        match &surface.ops()[2] {
            DrawOp::FillCircle { center, radius } => {
                assert_point(*center, 0.0, 1.0);
                assert!((radius - 0.5).abs() < 1e-9);
            }
            other => panic!("expected FillCircle, got: {other:?}"),
        }
    }

    #[test]
    fn test_flash_polygon() {
        let (_, surface, _) = run("%ADD13P,2.0X4*%\nD13*\nX0Y0D03*\n");
        match &surface.ops()[0] {
            DrawOp::FillPolygon { points } => {
                assert_eq!(points.len(), 4);
                assert_point(points[0], 1.0, 0.0);
                assert_point(points[1], 0.0, 1.0);
            }
            other => panic!("expected FillPolygon, got: {other:?}"),
        }
    }

    #[test]
    fn test_arc_points_cw_vs_ccw() {
        // Quarter from (1,0) to (0,1) around the origin
        let cw = arc_points([1.0, 0.0], [0.0, 1.0], [-1.0, 0.0], ArcDirection::Clockwise);
        let ccw = arc_points([1.0, 0.0], [0.0, 1.0], [-1.0, 0.0], ArcDirection::CounterClockwise);

        // 270° clockwise vs 90° counter-clockwise
        assert_eq!(cw.len(), 54 + 1);
        assert_eq!(ccw.len(), 18 + 1);
        assert!(cw[1][1] < 0.0, "clockwise goes below the x axis first");
        assert!(ccw[1][1] > 0.0, "counter-clockwise goes above the x axis first");
        assert_point(cw[0], 1.0, 0.0);
        assert_point(*cw.last().unwrap(), 0.0, 1.0);
    }

    #[test]
    fn test_arc_points_min_segments() {
        // 10° sweep still uses 8 chords
        let end = [10f64.to_radians().cos(), 10f64.to_radians().sin()];
        let pts = arc_points([1.0, 0.0], end, [-1.0, 0.0], ArcDirection::CounterClockwise);
        assert_eq!(pts.len(), MIN_ARC_SEGMENTS + 1);
    }

    #[test]
    fn test_arc_points_crossing_zero() {
        // CCW from 350° to 10° must sweep 20°, not 340°
        let a = |deg: f64| [deg.to_radians().cos(), deg.to_radians().sin()];
        let start = a(350.0);
        let pts = arc_points(
            start,
            a(10.0),
            [-start[0], -start[1]],
            ArcDirection::CounterClockwise,
        );
        assert_eq!(pts.len(), MIN_ARC_SEGMENTS + 1);
        assert!(pts.iter().all(|p| p[0] > 0.9));
    }

    #[test]
    fn test_arc_points_coincident_angles_zero_sweep() {
        for direction in [ArcDirection::Clockwise, ArcDirection::CounterClockwise] {
            let pts = arc_points([1.0, 0.0], [1.0, 0.0], [-1.0, 0.0], direction);
            assert_eq!(pts.len(), MIN_ARC_SEGMENTS + 1);
            for p in &pts {
                assert_point(*p, 1.0, 0.0);
            }
        }
    }

    #[test]
    fn test_arc_points_zero_radius() {
        let pts = arc_points([0.0, 0.0], [1.0, 1.0], [0.0, 0.0], ArcDirection::Clockwise);
        assert_eq!(pts, vec![[0.0, 0.0], [1.0, 1.0]]);
    }

    #[test]
    fn test_arc_draws_chords() {
        let (interp, surface, _) =
            run("%ADD10C,0.1*%\nD10*\nX10000Y0D02*\nG03*\nX0Y10000I-10000J0D01*\n");
        assert_eq!(surface.shape_count(), 18);
        assert!(surface.ops().iter().all(|op| matches!(
            op,
            DrawOp::StrokeLine { round_cap: true, width, .. } if (*width - 0.1).abs() < 1e-9
        )));
        assert_point(interp.state().position, 0.0, 1.0);
    }

    #[test]
    fn test_arc_mode_prefix_on_coordinate() {
        let (interp, surface, _) = run("%ADD10C,0.1*%\nD10*\nX10000Y0D02*\nG02X0Y10000I-10000J0D01*\n");
        assert_eq!(surface.shape_count(), 54);
        assert_eq!(interp.state().mode, InterpolationMode::ClockwiseArc);
    }

    #[test]
    fn test_arc_with_rectangle_not_rendered() {
        let (interp, surface, diag) =
            run("%ADD11R,0.2X0.2*%\nD11*\nX10000Y0D02*\nG03*\nX0Y10000I-10000J0D01*\n");
        assert_eq!(surface.shape_count(), 0);
        assert!(interp.bbox().is_empty());
        assert!(diag.issues().is_empty());
        assert_point(interp.state().position, 0.0, 1.0);
    }

    #[test]
    fn test_no_aperture_moves_only() {
        let (interp, surface, _) = run("X10000Y20000D01*\nX30000Y0D03*\n");
        assert_eq!(surface.shape_count(), 0);
        assert!(interp.bbox().is_empty());
        assert_point(interp.state().position, 3.0, 0.0);
    }

    #[test]
    fn test_undefined_aperture_selected() {
        let (interp, surface, _) = run("D42*\nX10000Y0D03*\n");
        assert_eq!(surface.shape_count(), 0);
        assert!(interp.bbox().is_empty());
        assert_eq!(interp.state().aperture, Some(42));
    }

    #[test]
    fn test_move_never_updates_extents() {
        let (interp, _, _) = run("%ADD10C,0.5*%\nD10*\nX500000Y500000D02*\n");
        assert!(interp.bbox().is_empty());
    }

    #[test]
    fn test_coordinate_persistence() {
        let (interp, surface, _) =
            run("%ADD10C,0.1*%\nD10*\nX10000Y20000D02*\nX30000D01*\nY0D01*\nD03*\n");
        assert_eq!(surface.shape_count(), 3);
        match &surface.ops()[0] {
            DrawOp::StrokeLine { to, .. } => assert_point(*to, 3.0, 2.0),
            other => panic!("expected StrokeLine, got: {other:?}"),
        }
        match &surface.ops()[2] {
            DrawOp::FillCircle { center, .. } => assert_point(*center, 3.0, 0.0),
            other => panic!("expected FillCircle, got: {other:?}"),
        }
        assert_point(interp.state().position, 3.0, 0.0);
    }

    #[test]
    fn test_bad_coordinate_skipped() {
        let (interp, surface, diag) =
            run("%ADD10C,0.1*%\nD10*\nX10000Y10000D02*\nX1.5Y0D01*\nX20000Y10000D01*\n");
        assert_eq!(diag.issues().len(), 1);
        assert_eq!(diag.issues()[0].line, 6);
        // The bad line did not move the pen; the next one draws from (1,1)
        match surface.ops() {
            [DrawOp::StrokeLine { from, to, .. }] => {
                assert_point(*from, 1.0, 1.0);
                assert_point(*to, 2.0, 1.0);
            }
            other => panic!("expected one StrokeLine, got: {other:?}"),
        }
        assert_point(interp.state().position, 2.0, 1.0);
    }

    #[test]
    fn test_inches_conversion() {
        let (_, surface, _) = run("%MOIN*%\n%ADD10C,0.01*%\nD10*\nX10000Y0D03*\n");
        match &surface.ops()[0] {
            DrawOp::FillCircle { center, radius } => {
                assert_point(*center, 25.4, 0.0);
                assert!((radius - 0.127).abs() < 1e-9);
            }
            other => panic!("expected FillCircle, got: {other:?}"),
        }
    }

    #[test]
    fn test_redefinition_not_retroactive() {
        let (interp, surface, _) =
            run("%ADD10C,0.5*%\nD10*\nX0Y0D03*\n%ADD10C,1.0*%\nX0Y0D03*\n");
        let radii: Vec<f64> = surface
            .ops()
            .iter()
            .filter_map(|op| match op {
                DrawOp::FillCircle { radius, .. } => Some(*radius),
                _ => None,
            })
            .collect();
        assert_eq!(radii, vec![0.25, 0.5]);
        assert_eq!(interp.apertures().len(), 1);
    }

    #[test]
    fn test_macro_flash() {
        let (interp, surface, diag) = run(
            "%AMDONUT*\n0 two dots*\n1,1,$1,0,0*\n1,1,$1,$2,\n0*\n%\n%ADD20DONUT,0.4X1.0*%\nD20*\nX10000Y10000D03*\n",
        );
        assert!(diag.issues().is_empty());
        assert_eq!(interp.macros().len(), 1);
        assert_eq!(surface.depth(), 0);
        assert_eq!(
            surface.ops(),
            &[
                DrawOp::FillCircle {
                    center: [1.0, 1.0],
                    radius: 0.2
                },
                DrawOp::FillCircle {
                    center: [2.0, 1.0],
                    radius: 0.2
                },
            ]
        );
        let b = interp.bbox();
        assert!((b.minx - 0.5).abs() < 1e-9);
        assert!((b.maxx - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_one_line_macro() {
        let (interp, surface, _) = run("%AMC1*1,1,$1,0,0*%\n%ADD20C1,0.6*%\nD20*\nX0Y0D03*\n");
        assert_eq!(interp.macros().len(), 1);
        assert_eq!(surface.shape_count(), 1);
    }

    #[test]
    fn test_macro_scale_from_definition_time() {
        let (_, surface, _) = run("%MOIN*%\n%AMC1*1,1,$1,0,0*%\n%ADD20C1,0.1*%\nD20*\nX0Y0D03*\n");
        match &surface.ops()[0] {
            DrawOp::FillCircle { radius, .. } => assert!((radius - 1.27).abs() < 1e-9),
            other => panic!("expected FillCircle, got: {other:?}"),
        }
    }

    #[test]
    fn test_undefined_macro_flash_is_noop() {
        let (interp, surface, diag) = run("%ADD20MISSING,0.5*%\nD20*\nX10000Y0D03*\n");
        assert_eq!(surface.shape_count(), 0);
        assert_eq!(surface.depth(), 0);
        assert!(interp.bbox().is_empty());
        assert!(diag.issues().is_empty());
        assert_point(interp.state().position, 1.0, 0.0);
    }

    #[test]
    fn test_macro_line_not_rendered() {
        let (interp, surface, _) = run("%AMC1*1,1,$1,0,0*%\n%ADD20C1,0.6*%\nD20*\nX0Y0D02*\nX10000Y0D01*\n");
        assert_eq!(surface.shape_count(), 0);
        assert!(interp.bbox().is_empty());
    }

    #[test]
    fn test_unsupported_macro_primitive_recorded() {
        let (interp, _, diag) = run("%AMTH*\n7,0,0,1,0.8,0.1,0*\n1,1,$1,0,0*\n%\n");
        assert_eq!(diag.issues().len(), 1);
        assert_eq!(diag.issues()[0].line, 4);
        assert_eq!(interp.macros().get("TH").map(|m| m.primitives.len()), Some(1));
    }

    #[test]
    fn test_unclosed_macro_discarded() {
        let (interp, _, _) = run("%AMOPEN*\n1,1,$1,0,0*\n");
        assert!(interp.macros().is_empty());
    }

    #[test]
    fn test_region_contour_not_rendered() {
        let (interp, surface, diag) = run(
            "%ADD10C,0.1*%\nD10*\nG36*\nX0Y0D02*\nX10000Y0D01*\nX10000Y10000D01*\nG37*\nX20000Y0D03*\n",
        );
        assert_eq!(surface.shape_count(), 1);
        assert!(diag.issues().is_empty());
        let b = interp.bbox();
        assert!((b.minx - 1.95).abs() < 1e-9);
    }

    #[test]
    fn test_end_of_program_stops() {
        let (interp, surface, _) = run("%ADD10C,0.1*%\nD10*\nM02*\nX10000Y0D03*\n");
        assert!(interp.is_finished());
        assert_eq!(surface.shape_count(), 0);
    }

    #[test]
    fn test_unrecognized_and_ignored() {
        let (_, _, diag) = run("%LPD*%\nG75*\nFOO*\nFOO*\n%TF.FileFunction,Copper*%\n");
        assert_eq!(diag.unrecognized_lines().collect::<Vec<_>>(), vec!["FOO*"]);
        assert!(diag.issues().is_empty());
    }

    #[test]
    fn test_bad_aperture_definition_recorded() {
        let (interp, _, diag) = run("%ADD10C,abc*%\n");
        assert_eq!(diag.issues().len(), 1);
        assert_eq!(diag.issues()[0].line, 3);
        assert!(interp.apertures().is_empty());
    }

    #[test]
    fn test_reset() {
        let (mut interp, _, _) = run("%ADD10C,0.5*%\nD10*\nX10000Y0D03*\nM02*\n");
        interp.reset();
        assert!(interp.bbox().is_empty());
        assert!(interp.apertures().is_empty());
        assert!(!interp.is_finished());
        assert_eq!(interp.state().aperture, None);
    }
}
