use std::collections::HashMap;
use std::f64::consts::PI;

use log::debug;

use crate::error::GerberError;
use crate::surface::{DrawingSurface, TransformGuard};

use super::diagnostics::Diagnostics;

/// Primitive codes this interpreter knows how to render.
pub mod codes {
    pub const COMMENT: u32 = 0;
    pub const CIRCLE: u32 = 1;
    pub const VECTOR_LINE_LEGACY: u32 = 2;
    pub const OUTLINE: u32 = 4;
    pub const POLYGON: u32 = 5;
    pub const VECTOR_LINE: u32 = 20;
    pub const CENTER_LINE: u32 = 21;

    pub const SUPPORTED: [u32; 6] = [
        CIRCLE,
        VECTOR_LINE_LEGACY,
        OUTLINE,
        POLYGON,
        VECTOR_LINE,
        CENTER_LINE,
    ];
}

/// A primitive parameter, resolved only when an aperture instantiates the macro.
#[derive(Debug, Clone, PartialEq)]
pub enum MacroParam {
    Literal(f64),
    Expression(String),
}

impl MacroParam {
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        match text.parse::<f64>() {
            Ok(v) if v.is_finite() => MacroParam::Literal(v),
            _ => MacroParam::Expression(text.to_string()),
        }
    }

    pub fn resolve(&self, params: &[f64]) -> f64 {
        match self {
            MacroParam::Literal(v) => *v,
            MacroParam::Expression(expr) => evaluate(expr, params),
        }
    }
}

/// A single primitive within an aperture macro definition.
#[derive(Debug, Clone, PartialEq)]
pub struct MacroPrimitive {
    pub code: u32,
    pub params: Vec<MacroParam>,
}

/// An aperture macro definition (from %AM...% blocks).
#[derive(Debug, Clone, PartialEq)]
pub struct ApertureMacro {
    pub name: String,
    pub primitives: Vec<MacroPrimitive>,
}

/// Table of macro definitions, keyed by name.
#[derive(Debug, Default)]
pub struct MacroTable {
    macros: HashMap<String, ApertureMacro>,
}

impl MacroTable {
    pub fn define(&mut self, mac: ApertureMacro) {
        self.macros.insert(mac.name.clone(), mac);
    }

    pub fn get(&self, name: &str) -> Option<&ApertureMacro> {
        self.macros.get(name)
    }

    pub fn len(&self) -> usize {
        self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }
}

// ─── Expression Parser ──────────────────────────────────────────────

/// Expression node for macro parameter evaluation.
/// Supports: literals, variable references ($1, $2, ...), and arithmetic.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(f64),
    Variable(u32), // $1 = Variable(1)
    Neg(Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Evaluate the expression with the given parameter bindings.
    pub fn eval(&self, params: &[f64]) -> f64 {
        match self {
            Expr::Literal(v) => *v,
            Expr::Variable(idx) => {
                if *idx == 0 || *idx as usize > params.len() {
                    0.0
                } else {
                    params[*idx as usize - 1]
                }
            }
            Expr::Neg(a) => -a.eval(params),
            Expr::Add(a, b) => a.eval(params) + b.eval(params),
            Expr::Sub(a, b) => a.eval(params) - b.eval(params),
            Expr::Mul(a, b) => a.eval(params) * b.eval(params),
            Expr::Div(a, b) => {
                let denom = b.eval(params);
                if denom.abs() < 1e-15 {
                    0.0
                } else {
                    a.eval(params) / denom
                }
            }
        }
    }
}

/// Evaluate a macro parameter expression against instantiation parameters.
///
/// Only numbers, `$k` references and `+ - * / ( )` are accepted. Anything
/// else, including a syntax error, evaluates to 0.
pub fn evaluate(expr: &str, params: &[f64]) -> f64 {
    match parse_expr(expr) {
        Ok(e) => e.eval(params),
        Err(err) => {
            debug!("Gerber: macro expression {expr:?} evaluates to 0: {err}");
            0.0
        }
    }
}

/// Parse a macro expression string into an Expr tree.
pub fn parse_expr(s: &str) -> Result<Expr, GerberError> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(Expr::Literal(0.0));
    }
    let tokens = tokenize_expr(s)?;
    let (expr, rest) = parse_add_sub(&tokens)?;
    if !rest.is_empty() {
        return Err(GerberError::ParseError(format!(
            "AM expr: unexpected tokens after expression: {s}"
        )));
    }
    Ok(expr)
}

#[derive(Debug, Clone)]
enum ExprToken {
    Num(f64),
    Var(u32),
    Plus,
    Minus,
    Mul,
    Div,
    LParen,
    RParen,
}

fn tokenize_expr(s: &str) -> Result<Vec<ExprToken>, GerberError> {
    let mut tokens = Vec::new();
    let mut chars = s.char_indices().peekable();

    while let Some(&(start, ch)) = chars.peek() {
        match ch {
            ' ' | '\t' => {
                chars.next();
            }
            '+' => {
                chars.next();
                tokens.push(ExprToken::Plus);
            }
            '-' => {
                chars.next();
                tokens.push(ExprToken::Minus);
            }
            '*' => {
                chars.next();
                tokens.push(ExprToken::Mul);
            }
            '/' => {
                chars.next();
                tokens.push(ExprToken::Div);
            }
            '(' => {
                chars.next();
                tokens.push(ExprToken::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(ExprToken::RParen);
            }
            '$' => {
                chars.next(); // consume '$'
                let mut end = start + 1;
                while let Some(&(i, c)) = chars.peek() {
                    if !c.is_ascii_digit() {
                        break;
                    }
                    end = i + 1;
                    chars.next();
                }
                let digits = &s[start + 1..end];
                let idx: u32 = digits.parse().map_err(|_| {
                    GerberError::ParseError(format!("AM expr: bad variable: ${digits}"))
                })?;
                tokens.push(ExprToken::Var(idx));
            }
            c if c.is_ascii_digit() || c == '.' => {
                let mut end = start;
                while let Some(&(i, c)) = chars.peek() {
                    if !(c.is_ascii_digit() || c == '.') {
                        break;
                    }
                    end = i + 1;
                    chars.next();
                }
                let num_str = &s[start..end];
                let val: f64 = num_str.parse().map_err(|_| {
                    GerberError::ParseError(format!("AM expr: bad number: {num_str}"))
                })?;
                tokens.push(ExprToken::Num(val));
            }
            _ => {
                return Err(GerberError::ParseError(format!(
                    "AM expr: unexpected char '{ch}' in: {s}"
                )));
            }
        }
    }

    Ok(tokens)
}

// Recursive descent: add/sub -> mul/div -> unary -> atom
fn parse_add_sub(tokens: &[ExprToken]) -> Result<(Expr, &[ExprToken]), GerberError> {
    let (mut left, mut rest) = parse_mul_div(tokens)?;
    loop {
        match rest.first() {
            Some(ExprToken::Plus) => {
                let (right, r) = parse_mul_div(&rest[1..])?;
                left = Expr::Add(Box::new(left), Box::new(right));
                rest = r;
            }
            Some(ExprToken::Minus) => {
                let (right, r) = parse_mul_div(&rest[1..])?;
                left = Expr::Sub(Box::new(left), Box::new(right));
                rest = r;
            }
            _ => break,
        }
    }
    Ok((left, rest))
}

fn parse_mul_div(tokens: &[ExprToken]) -> Result<(Expr, &[ExprToken]), GerberError> {
    let (mut left, mut rest) = parse_unary(tokens)?;
    loop {
        match rest.first() {
            Some(ExprToken::Mul) => {
                let (right, r) = parse_unary(&rest[1..])?;
                left = Expr::Mul(Box::new(left), Box::new(right));
                rest = r;
            }
            Some(ExprToken::Div) => {
                let (right, r) = parse_unary(&rest[1..])?;
                left = Expr::Div(Box::new(left), Box::new(right));
                rest = r;
            }
            _ => break,
        }
    }
    Ok((left, rest))
}

fn parse_unary(tokens: &[ExprToken]) -> Result<(Expr, &[ExprToken]), GerberError> {
    match tokens.first() {
        Some(ExprToken::Minus) => {
            let (expr, rest) = parse_unary(&tokens[1..])?;
            Ok((Expr::Neg(Box::new(expr)), rest))
        }
        Some(ExprToken::Plus) => parse_unary(&tokens[1..]),
        _ => parse_atom(tokens),
    }
}

fn parse_atom(tokens: &[ExprToken]) -> Result<(Expr, &[ExprToken]), GerberError> {
    match tokens.first() {
        Some(ExprToken::Num(v)) => Ok((Expr::Literal(*v), &tokens[1..])),
        Some(ExprToken::Var(idx)) => Ok((Expr::Variable(*idx), &tokens[1..])),
        Some(ExprToken::LParen) => {
            let (expr, rest) = parse_add_sub(&tokens[1..])?;
            match rest.first() {
                Some(ExprToken::RParen) => Ok((expr, &rest[1..])),
                _ => Err(GerberError::ParseError(
                    "AM expr: missing closing paren".into(),
                )),
            }
        }
        _ => Err(GerberError::ParseError(
            "AM expr: unexpected end of expression".into(),
        )),
    }
}

// ─── Macro Definition Parser ────────────────────────────────────────

/// Parse one `*`-terminated macro record.
///
/// Returns `Ok(None)` for comments and empty records. Unknown primitive codes
/// are an error so the caller can report them.
pub fn parse_record(record: &str) -> Result<Option<MacroPrimitive>, GerberError> {
    let record = record.trim();
    if record.is_empty() {
        return Ok(None);
    }

    let mut fields = record.split(',');
    let head = fields.next().unwrap_or("").trim();
    if head.split_whitespace().next() == Some("0") {
        return Ok(None);
    }
    if head.starts_with('$') {
        return Err(GerberError::ParseError(format!(
            "AM: variable definitions are not supported: {record}"
        )));
    }

    let code: u32 = head
        .parse()
        .map_err(|_| GerberError::ParseError(format!("AM: bad primitive code: {head}")))?;
    if code == codes::COMMENT {
        return Ok(None);
    }
    if !codes::SUPPORTED.contains(&code) {
        return Err(GerberError::ParseError(format!(
            "AM: unsupported primitive code {code}"
        )));
    }

    Ok(Some(MacroPrimitive {
        code,
        params: fields.map(MacroParam::parse).collect(),
    }))
}

/// Continuation state for a primitive record spread over several lines.
#[derive(Debug, Default)]
enum PrimitiveBuffer {
    #[default]
    NotInPrimitive,
    Accumulating(String),
}

impl PrimitiveBuffer {
    fn push(&mut self, text: &str) {
        match self {
            PrimitiveBuffer::NotInPrimitive => {
                *self = PrimitiveBuffer::Accumulating(text.to_string());
            }
            PrimitiveBuffer::Accumulating(buf) => buf.push_str(text),
        }
    }

    /// Complete the pending record with `tail` and reset.
    fn finish(&mut self, tail: &str) -> String {
        match std::mem::take(self) {
            PrimitiveBuffer::NotInPrimitive => tail.to_string(),
            PrimitiveBuffer::Accumulating(mut buf) => {
                buf.push_str(tail);
                buf
            }
        }
    }

    fn is_accumulating(&self) -> bool {
        matches!(self, PrimitiveBuffer::Accumulating(_))
    }
}

/// Whether a macro block is still collecting lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacroStatus {
    Open,
    Closed,
}

/// Builds an [`ApertureMacro`] from the lines of an `%AM` block.
#[derive(Debug)]
pub struct MacroBuilder {
    name: String,
    primitives: Vec<MacroPrimitive>,
    buffer: PrimitiveBuffer,
}

impl MacroBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            primitives: Vec::new(),
            buffer: PrimitiveBuffer::NotInPrimitive,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Feed one physical line of the block body.
    ///
    /// Records end at `*`; text without a terminator is buffered and joined
    /// with the following lines. A `%` closes the block.
    pub fn feed(&mut self, text: &str, line: usize, diag: &mut Diagnostics) -> MacroStatus {
        let mut rest = text.trim();
        while let Some(pos) = rest.find(['*', '%']) {
            let piece = &rest[..pos];
            if rest.as_bytes()[pos] == b'%' {
                if !piece.trim().is_empty() || self.buffer.is_accumulating() {
                    let record = self.buffer.finish(piece);
                    self.add_record(&record, line, diag);
                }
                return MacroStatus::Closed;
            }
            let record = self.buffer.finish(piece);
            self.add_record(&record, line, diag);
            rest = &rest[pos + 1..];
        }
        if !rest.is_empty() {
            self.buffer.push(rest);
        }
        MacroStatus::Open
    }

    fn add_record(&mut self, record: &str, line: usize, diag: &mut Diagnostics) {
        match parse_record(record) {
            Ok(Some(prim)) => self.primitives.push(prim),
            Ok(None) => {}
            Err(e) => diag.issue(line, record.trim(), e.to_string()),
        }
    }

    pub fn finish(self) -> ApertureMacro {
        ApertureMacro {
            name: self.name,
            primitives: self.primitives,
        }
    }
}

// ─── Macro Rendering (flash-time) ───────────────────────────────────

/// Render a macro instance with its origin at `origin`.
///
/// `params` are the aperture's instantiation values; length-valued results
/// are multiplied by `scale` to reach millimetres.
pub fn render_macro<S: DrawingSurface + ?Sized>(
    mac: &ApertureMacro,
    params: &[f64],
    scale: f64,
    origin: [f64; 2],
    surface: &mut S,
) {
    let mut surface = TransformGuard::new(surface);
    surface.translate(origin[0], origin[1]);
    for prim in &mac.primitives {
        render_primitive(prim, params, scale, &mut *surface);
    }
}

/// Largest vertex count accepted for a regular polygon primitive.
pub const MAX_POLYGON_VERTICES: usize = 12;

fn render_primitive<S: DrawingSurface + ?Sized>(
    prim: &MacroPrimitive,
    params: &[f64],
    scale: f64,
    surface: &mut S,
) {
    let value = |k: usize| prim.params.get(k).map_or(0.0, |p| p.resolve(params));
    let length = |k: usize| value(k) * scale;

    if value(0) <= 0.0 {
        return; // exposure off
    }

    // Primitive rotation is about the macro origin
    let mut surface = TransformGuard::new(surface);
    match prim.code {
        codes::CIRCLE => {
            surface.rotate(value(4));
            surface.fill_circle([length(2), length(3)], length(1).abs() / 2.0);
        }
        codes::VECTOR_LINE | codes::VECTOR_LINE_LEGACY => {
            surface.rotate(value(6));
            surface.stroke_line([length(2), length(3)], [length(4), length(5)], length(1), false);
        }
        codes::CENTER_LINE => {
            surface.rotate(value(5));
            surface.fill_rect([length(3), length(4)], length(1), length(2), 0.0);
        }
        codes::OUTLINE => {
            let Some(n) = outline_vertex_count(value(1), prim.params.len()) else {
                debug!(
                    "Gerber: outline primitive with {} vertices and {} params skipped",
                    value(1),
                    prim.params.len()
                );
                return;
            };
            let points: Vec<[f64; 2]> = (0..=n)
                .map(|k| [length(2 + 2 * k), length(3 + 2 * k)])
                .collect();
            surface.rotate(value(2 + 2 * (n + 1)));
            surface.fill_polygon(&points);
        }
        codes::POLYGON => {
            let count = value(1);
            if !(3.0..=MAX_POLYGON_VERTICES as f64).contains(&count) {
                debug!("Gerber: polygon primitive with {count} vertices skipped");
                return;
            }
            let n = count as usize;
            let (cx, cy) = (length(2), length(3));
            let r = length(4) / 2.0;
            let points: Vec<[f64; 2]> = (0..n)
                .map(|k| {
                    let angle = 2.0 * PI * (k as f64) / (n as f64);
                    [cx + r * angle.cos(), cy + r * angle.sin()]
                })
                .collect();
            surface.rotate(value(5));
            surface.fill_polygon(&points);
        }
        other => debug!("Gerber: macro primitive code {other} not rendered"),
    }
}

/// Vertex count of an outline whose record holds `available` parameters.
///
/// The record is exposure, count, then `count + 1` coordinate pairs; `None`
/// when the count is not a usable number or the pairs are missing.
fn outline_vertex_count(count: f64, available: usize) -> Option<usize> {
    if !count.is_finite() || count < 1.0 || count > available as f64 {
        return None;
    }
    let n = count as usize;
    let needed = n.checked_add(1)?.checked_mul(2)?.checked_add(2)?;
    (available >= needed).then_some(n)
}
