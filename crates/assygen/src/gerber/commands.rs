use crate::error::GerberError;

use super::coord::{CoordinateFormat, Units, ZeroSuppression};
use super::interpreter::InterpolationMode;

/// Aperture shape template from an %AD command, in file units.
#[derive(Debug, Clone, PartialEq)]
pub enum ApertureTemplate {
    Circle {
        diameter: f64,
    },
    Rectangle {
        width: f64,
        height: f64,
    },
    Obround {
        width: f64,
        height: f64,
    },
    Polygon {
        diameter: f64,
        vertices: u32,
        rotation: f64,
    },
}

/// D01 / D02 / D03.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    Interpolate,
    Move,
    Flash,
}

/// A coordinate word such as `G02X100Y200I50J0D01*`.
///
/// Coordinate values are kept as written; the draw state decodes them with
/// the format in force when the statement executes.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    /// Interpolation mode set by a leading G01/G02/G03.
    pub mode: Option<InterpolationMode>,
    pub x: Option<String>,
    pub y: Option<String>,
    pub i: Option<String>,
    pub j: Option<String>,
    pub op: OpCode,
}

/// What a single statement means.
#[derive(Debug, Clone, PartialEq)]
pub enum LineKind {
    /// %FS - Format specification
    FormatSpec(CoordinateFormat),
    /// %MO (or legacy G70/G71) - Unit mode
    Units(Units),
    /// %AD with a standard template
    ApertureDefine {
        code: u32,
        template: ApertureTemplate,
    },
    /// %AD naming an aperture macro
    MacroApertureRef {
        code: u32,
        name: String,
        params: Vec<f64>,
    },
    /// %AM - start of a macro block. `body` is whatever followed the name
    /// on the same line.
    MacroStart { name: String, body: String },
    /// Dnn (n >= 10) - Select aperture
    SelectAperture(u32),
    /// G01/G02/G03 on its own
    Mode(InterpolationMode),
    Operation(Operation),
    /// G04
    Comment,
    /// M02
    EndOfProgram,
    /// G36 (true) / G37 (false)
    Region(bool),
    /// Understood and deliberately not rendered
    Ignored,
    Unrecognized,
}

type ClassifyFn = fn(&str) -> Option<Result<LineKind, GerberError>>;

/// Statement classifiers in priority order. The first one that matches wins.
///
/// Several patterns are prefix-compatible: a standard aperture definition
/// must be tried before the macro reference, and the coordinate shapes go
/// from most to least specific.
pub const CLASSIFIERS: &[(&str, ClassifyFn)] = &[
    ("format_spec", format_spec),
    ("unit_spec", unit_spec),
    ("aperture_define", aperture_define),
    ("macro_aperture_ref", macro_aperture_ref),
    ("macro_start", macro_start),
    ("aperture_select", aperture_select),
    ("interpolation_mode", interpolation_mode),
    ("coordinate_arc", coordinate_arc),
    ("coordinate", coordinate),
    ("x_only", x_only),
    ("y_only", y_only),
    ("bare_operation", bare_operation),
    ("comment", comment),
    ("end_of_program", end_of_program),
    ("region", region),
    ("ignored", ignored),
];

/// Classify one statement.
///
/// A statement that matches a pattern but carries bad numbers is an error;
/// one that matches nothing is `Unrecognized`.
pub fn classify(text: &str) -> Result<LineKind, GerberError> {
    match matching_classifier(text) {
        Some((_, result)) => result,
        None => Ok(LineKind::Unrecognized),
    }
}

/// The first classifier that accepts `text`, with its result.
pub fn matching_classifier(text: &str) -> Option<(&'static str, Result<LineKind, GerberError>)> {
    let text = text.trim();
    CLASSIFIERS
        .iter()
        .find_map(|(name, f)| f(text).map(|result| (*name, result)))
}

/// Contents of a `%...*%` parameter block starting with `code`.
fn param_block<'a>(text: &'a str, code: &str) -> Option<&'a str> {
    text.strip_prefix('%')?
        .strip_prefix(code)?
        .strip_suffix('%')?
        .strip_suffix('*')
}

fn parse_f64(s: &str, what: &str) -> Result<f64, GerberError> {
    s.trim()
        .parse::<f64>()
        .map_err(|_| GerberError::ParseError(format!("{what}: bad number: {s:?}")))
}

/// Parse `X`-separated modifiers as used by %AD (`0.040X0.020`).
fn parse_modifiers(s: &str, what: &str) -> Result<Vec<f64>, GerberError> {
    if s.trim().is_empty() {
        return Ok(Vec::new());
    }
    s.split('X').map(|p| parse_f64(p, what)).collect()
}

/// %FS command. Example: `%FSLAX24Y24*%`
fn format_spec(text: &str) -> Option<Result<LineKind, GerberError>> {
    let s = param_block(text, "FS")?;
    Some(parse_format_spec(s))
}

fn parse_format_spec(s: &str) -> Result<LineKind, GerberError> {
    let x_pos = s
        .find('X')
        .ok_or_else(|| GerberError::ParseError("FS: missing X".into()))?;
    let y_pos = s
        .find('Y')
        .filter(|&y| y > x_pos)
        .ok_or_else(|| GerberError::ParseError("FS: missing Y".into()))?;

    let flags = &s[..x_pos];
    if !flags.chars().all(|c| matches!(c, 'L' | 'T' | 'A' | 'I' | 'D')) {
        return Err(GerberError::ParseError(format!("FS: bad flags: {flags}")));
    }

    let (x_integer, x_decimal) = parse_digit_split(&s[x_pos + 1..y_pos], 'X')?;
    let (y_integer, y_decimal) = parse_digit_split(&s[y_pos + 1..], 'Y')?;

    Ok(LineKind::FormatSpec(CoordinateFormat {
        zero_suppression: if flags.contains('T') {
            ZeroSuppression::Trailing
        } else {
            ZeroSuppression::Leading
        },
        incremental: flags.contains('I'),
        x_integer,
        x_decimal,
        y_integer,
        y_decimal,
    }))
}

/// `24` -> (2, 4): the last digit is the decimal count.
fn parse_digit_split(part: &str, axis: char) -> Result<(u8, u8), GerberError> {
    if part.len() < 2 || !part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(GerberError::ParseError(format!(
            "FS: invalid {axis} format digits: {part:?}"
        )));
    }
    let split = part.len() - 1;
    let integer = part[..split]
        .parse::<u8>()
        .map_err(|_| GerberError::ParseError(format!("FS: bad {axis} integer: {part}")))?;
    let decimal = part[split..]
        .parse::<u8>()
        .map_err(|_| GerberError::ParseError(format!("FS: bad {axis} decimal: {part}")))?;
    Ok((integer, decimal))
}

/// %MOMM*% / %MOIN*%, and the legacy G71* / G70* words.
fn unit_spec(text: &str) -> Option<Result<LineKind, GerberError>> {
    match text {
        "G71*" => return Some(Ok(LineKind::Units(Units::Millimeters))),
        "G70*" => return Some(Ok(LineKind::Units(Units::Inches))),
        _ => {}
    }
    let s = param_block(text, "MO")?;
    Some(match s {
        "MM" => Ok(LineKind::Units(Units::Millimeters)),
        "IN" => Ok(LineKind::Units(Units::Inches)),
        other => Err(GerberError::ParseError(format!("MO: unknown unit {other:?}"))),
    })
}

/// Split `D10C,0.5` into the aperture code and the text after it.
fn aperture_code(s: &str) -> Option<(u32, &str)> {
    let s = s.strip_prefix('D')?;
    let end = s.find(|c: char| !c.is_ascii_digit())?;
    let code = s[..end].parse().ok()?;
    Some((code, &s[end..]))
}

/// %AD with a single-letter standard template. Example: `%ADD11R,0.040X0.020*%`
fn aperture_define(text: &str) -> Option<Result<LineKind, GerberError>> {
    let (code, rest) = aperture_code(param_block(text, "AD")?)?;
    let mut chars = rest.chars();
    let shape = chars.next()?;
    let params = match chars.as_str() {
        "" => "",
        p => p.strip_prefix(',')?,
    };
    if !matches!(shape, 'C' | 'R' | 'O' | 'P') {
        return None;
    }
    Some(parse_aperture_template(shape, params).map(|template| LineKind::ApertureDefine { code, template }))
}

fn parse_aperture_template(shape: char, params: &str) -> Result<ApertureTemplate, GerberError> {
    let what = format!("AD {shape}");
    let params = parse_modifiers(params, &what)?;
    let need = |n: usize, names: &str| {
        if params.len() < n {
            Err(GerberError::ParseError(format!("{what}: need {names}")))
        } else {
            Ok(())
        }
    };

    match shape {
        'C' => {
            need(1, "diameter")?;
            Ok(ApertureTemplate::Circle {
                diameter: params[0],
            })
        }
        'R' => {
            need(2, "width and height")?;
            Ok(ApertureTemplate::Rectangle {
                width: params[0],
                height: params[1],
            })
        }
        'O' => {
            need(2, "width and height")?;
            Ok(ApertureTemplate::Obround {
                width: params[0],
                height: params[1],
            })
        }
        _ => {
            need(2, "diameter and vertex count")?;
            let vertices = params[1];
            if !(3.0..=12.0).contains(&vertices) {
                return Err(GerberError::ParseError(format!(
                    "{what}: vertex count out of range: {vertices}"
                )));
            }
            Ok(ApertureTemplate::Polygon {
                diameter: params[0],
                vertices: vertices as u32,
                rotation: params.get(2).copied().unwrap_or(0.0),
            })
        }
    }
}

/// %AD naming a macro. Example: `%ADD10RoundRect,0.25X-0.5X0.5*%`
fn macro_aperture_ref(text: &str) -> Option<Result<LineKind, GerberError>> {
    let (code, rest) = aperture_code(param_block(text, "AD")?)?;
    let (name, params) = match rest.split_once(',') {
        Some((name, params)) => (name, params),
        None => (rest, ""),
    };
    if !is_macro_name(name) {
        return None;
    }
    Some(
        parse_modifiers(params, "AD macro").map(|params| LineKind::MacroApertureRef {
            code,
            name: name.to_string(),
            params,
        }),
    )
}

fn is_macro_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || matches!(c, '_' | '.' | '$'))
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '$' | '-'))
}

/// %AM<name>* with an optional body on the same line.
fn macro_start(text: &str) -> Option<Result<LineKind, GerberError>> {
    let s = text.strip_prefix("%AM")?;
    let (name, body) = match s.split_once('*') {
        Some((name, body)) => (name, body),
        None => (s.trim_end_matches('%'), ""),
    };
    if name.is_empty() {
        return Some(Err(GerberError::ParseError("AM: missing macro name".into())));
    }
    Some(Ok(LineKind::MacroStart {
        name: name.to_string(),
        body: body.to_string(),
    }))
}

/// `D10*`, optionally with the legacy `G54` prefix.
fn aperture_select(text: &str) -> Option<Result<LineKind, GerberError>> {
    let s = text.strip_prefix("G54").unwrap_or(text);
    let (code, rest) = aperture_code(s)?;
    if rest != "*" || code < 10 {
        return None;
    }
    Some(Ok(LineKind::SelectAperture(code)))
}

fn mode_from_code(code: &str) -> Option<InterpolationMode> {
    match code {
        "1" | "01" => Some(InterpolationMode::Linear),
        "2" | "02" => Some(InterpolationMode::ClockwiseArc),
        "3" | "03" => Some(InterpolationMode::CounterClockwiseArc),
        _ => None,
    }
}

/// `G01*`, `G02*`, `G03*`.
fn interpolation_mode(text: &str) -> Option<Result<LineKind, GerberError>> {
    let code = text.strip_prefix('G')?.strip_suffix('*')?;
    mode_from_code(code).map(|mode| Ok(LineKind::Mode(mode)))
}

/// Split `X100Y-200D01*` into its fields.
///
/// Fields must appear in X, Y, I, J, D order, each at most once, and the
/// word must end with D01, D02 or D03. An optional G01/G02/G03 prefix is
/// accepted.
fn scan_operation(text: &str) -> Option<Operation> {
    const LETTERS: &str = "XYIJD";

    let mut body = text.strip_suffix('*')?;
    let mut mode = None;
    if let Some(after_g) = body.strip_prefix('G') {
        let end = after_g
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(after_g.len());
        mode = Some(mode_from_code(&after_g[..end])?);
        body = &after_g[end..];
    }

    let mut fields: [Option<&str>; 5] = [None; 5];
    let mut last: Option<usize> = None;
    let mut rest = body;
    while let Some(letter) = rest.chars().next() {
        let slot = LETTERS.find(letter)?;
        if last.is_some_and(|l| slot <= l) {
            return None;
        }
        let value_end = rest[1..]
            .find(|c: char| c.is_ascii_alphabetic())
            .map_or(rest.len(), |p| p + 1);
        let value = &rest[1..value_end];
        if value.is_empty() {
            return None;
        }
        fields[slot] = Some(value);
        last = Some(slot);
        rest = &rest[value_end..];
    }

    let op = match fields[4]? {
        "1" | "01" => OpCode::Interpolate,
        "2" | "02" => OpCode::Move,
        "3" | "03" => OpCode::Flash,
        _ => return None,
    };
    let owned = |k: usize| fields[k].map(str::to_string);
    Some(Operation {
        mode,
        x: owned(0),
        y: owned(1),
        i: owned(2),
        j: owned(3),
        op,
    })
}

fn operation_where(
    text: &str,
    accept: impl Fn(&Operation) -> bool,
) -> Option<Result<LineKind, GerberError>> {
    scan_operation(text)
        .filter(|op| accept(op))
        .map(|op| Ok(LineKind::Operation(op)))
}

/// Coordinate word carrying an arc centre offset.
fn coordinate_arc(text: &str) -> Option<Result<LineKind, GerberError>> {
    operation_where(text, |op| op.i.is_some() || op.j.is_some())
}

fn coordinate(text: &str) -> Option<Result<LineKind, GerberError>> {
    operation_where(text, |op| op.x.is_some() && op.y.is_some())
}

fn x_only(text: &str) -> Option<Result<LineKind, GerberError>> {
    operation_where(text, |op| op.x.is_some() && op.y.is_none())
}

fn y_only(text: &str) -> Option<Result<LineKind, GerberError>> {
    operation_where(text, |op| op.x.is_none() && op.y.is_some())
}

/// `D01*` / `D02*` / `D03*` at the current position.
fn bare_operation(text: &str) -> Option<Result<LineKind, GerberError>> {
    operation_where(text, |op| op.x.is_none() && op.y.is_none())
}

fn comment(text: &str) -> Option<Result<LineKind, GerberError>> {
    let rest = text.strip_prefix("G04").or_else(|| {
        text.strip_prefix("G4")
            .filter(|r| !r.starts_with(|c: char| c.is_ascii_digit()))
    })?;
    rest.ends_with('*').then_some(Ok(LineKind::Comment))
}

fn end_of_program(text: &str) -> Option<Result<LineKind, GerberError>> {
    matches!(text, "M02*" | "M2*" | "M00*" | "M0*").then_some(Ok(LineKind::EndOfProgram))
}

fn region(text: &str) -> Option<Result<LineKind, GerberError>> {
    match text {
        "G36*" => Some(Ok(LineKind::Region(true))),
        "G37*" => Some(Ok(LineKind::Region(false))),
        _ => None,
    }
}

/// Quadrant mode, legacy absolute/incremental words, polarity, attributes
/// and any other `%` parameter.
fn ignored(text: &str) -> Option<Result<LineKind, GerberError>> {
    let known_word = matches!(
        text,
        "G74*" | "G75*" | "G90*" | "G91*" | "G54*" | "G55*" | "M01*" | "M1*"
    );
    (known_word || text.starts_with('%')).then_some(Ok(LineKind::Ignored))
}
