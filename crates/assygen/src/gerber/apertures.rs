use std::collections::HashMap;

/// Padding used for macro apertures, whose geometry is not analysed for a
/// tighter bound.
pub const MACRO_MARGIN_MM: f64 = 0.5;

/// An aperture in the aperture table. Dimensions are in millimetres.
#[derive(Debug, Clone, PartialEq)]
pub enum Aperture {
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
    /// Reference to a user-defined aperture macro.
    ///
    /// `params` are the raw instantiation values from the file; `scale` is the
    /// unit multiplier in force when the aperture was defined.
    MacroRef {
        name: String,
        params: Vec<f64>,
        scale: f64,
    },
}

impl Aperture {
    /// Half-size padding applied around points drawn with this aperture.
    pub fn margin(&self) -> f64 {
        match self {
            Aperture::Circle { diameter } => diameter / 2.0,
            Aperture::Rectangle { width, height } | Aperture::Obround { width, height } => {
                width.max(*height) / 2.0
            }
            Aperture::Polygon { diameter, .. } => diameter / 2.0,
            Aperture::MacroRef { .. } => MACRO_MARGIN_MM,
        }
    }
}

/// Aperture table built from %AD commands.
#[derive(Debug, Default)]
pub struct ApertureTable {
    apertures: HashMap<u32, Aperture>,
}

impl ApertureTable {
    /// Define or replace the aperture with this code.
    pub fn define(&mut self, code: u32, aperture: Aperture) {
        self.apertures.insert(code, aperture);
    }

    pub fn define_macro_ref(&mut self, code: u32, name: &str, params: Vec<f64>, scale: f64) {
        self.define(
            code,
            Aperture::MacroRef {
                name: name.to_string(),
                params,
                scale,
            },
        );
    }

    pub fn get(&self, code: u32) -> Option<&Aperture> {
        self.apertures.get(&code)
    }

    pub fn len(&self) -> usize {
        self.apertures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apertures.is_empty()
    }
}
