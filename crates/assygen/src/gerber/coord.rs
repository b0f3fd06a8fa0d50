use crate::error::GerberError;

/// Which zeros a coordinate literal may omit (`L` or `T` in `%FS`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ZeroSuppression {
    #[default]
    Leading,
    Trailing,
}

/// Coordinate format from the %FS (Format Specification) command.
///
/// Example: `%FSLAX24Y24*%` means leading-zero suppression, absolute mode,
/// 2 integer digits + 4 decimal digits for both X and Y.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateFormat {
    pub zero_suppression: ZeroSuppression,
    pub incremental: bool,
    pub x_integer: u8,
    pub x_decimal: u8,
    pub y_integer: u8,
    pub y_decimal: u8,
}

impl Default for CoordinateFormat {
    fn default() -> Self {
        // Common default: 2.4 format (FSLAX24Y24)
        Self {
            zero_suppression: ZeroSuppression::Leading,
            incremental: false,
            x_integer: 2,
            x_decimal: 4,
            y_integer: 2,
            y_decimal: 4,
        }
    }
}

impl CoordinateFormat {
    /// Same digit split on both axes.
    pub fn uniform(integer: u8, decimal: u8) -> Self {
        Self {
            x_integer: integer,
            x_decimal: decimal,
            y_integer: integer,
            y_decimal: decimal,
            ..Self::default()
        }
    }

    fn digits(&self, axis: Axis) -> (u8, u8) {
        match axis {
            Axis::X => (self.x_integer, self.x_decimal),
            Axis::Y => (self.y_integer, self.y_decimal),
        }
    }
}

/// Unit system from the %MO command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Units {
    #[default]
    Millimeters,
    Inches,
}

impl Units {
    /// Multiplier from file units to millimetres.
    pub fn scale(self) -> f64 {
        match self {
            Units::Millimeters => 1.0,
            Units::Inches => 25.4,
        }
    }
}

/// Coordinate axis. I offsets use the X format, J offsets the Y format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

/// Converts raw Gerber integer coordinates to millimeters.
#[derive(Debug, Clone, Default)]
pub struct CoordinateConverter {
    pub format: CoordinateFormat,
    pub units: Units,
}

impl CoordinateConverter {
    /// Convert a raw Gerber coordinate integer to mm.
    ///
    /// The raw value is an integer where the last N digits are the decimal part,
    /// as specified by the format. For example, with X24 format, the value 1234567
    /// means 123.4567 in the file's units.
    pub fn to_mm(&self, raw: i64, axis: Axis) -> f64 {
        let (_, decimal_digits) = self.format.digits(axis);
        let divisor = 10f64.powi(decimal_digits as i32);
        raw as f64 / divisor * self.units.scale()
    }

    /// Decode a coordinate literal as written in the file (`-0012500`).
    ///
    /// Only an optional sign followed by ASCII digits is accepted. With
    /// trailing-zero suppression the digits are right-padded to the declared
    /// width before the fixed-point split.
    pub fn decode(&self, literal: &str, axis: Axis) -> Result<f64, GerberError> {
        let (negative, digits) = match literal.as_bytes().first() {
            Some(b'-') => (true, &literal[1..]),
            Some(b'+') => (false, &literal[1..]),
            _ => (false, literal),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(GerberError::ParseError(format!(
                "bad coordinate literal: {literal:?}"
            )));
        }

        let (integer, decimal) = self.format.digits(axis);
        let width = integer as usize + decimal as usize;
        let mut padded = digits.to_string();
        if self.format.zero_suppression == ZeroSuppression::Trailing && padded.len() < width {
            padded.extend(std::iter::repeat('0').take(width - padded.len()));
        }

        let raw: i64 = padded.parse().map_err(|_| {
            GerberError::ParseError(format!("coordinate out of range: {literal:?}"))
        })?;
        let raw = if negative { -raw } else { raw };
        Ok(self.to_mm(raw, axis))
    }
}
