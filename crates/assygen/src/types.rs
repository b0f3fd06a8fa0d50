use serde::ser::Serializer;
use serde::Serialize;

use crate::gerber::diagnostics::LineIssue;

/// Round a float to N decimal places.
pub fn round_f64(v: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (v * factor).round() / factor
}

/// Wrapper that rounds f64 to 6 decimal places on serialization.
fn serialize_f64_rounded<S: Serializer>(v: &f64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(round_f64(*v, 6))
}

// ─── Bounding Box ────────────────────────────────────────────────────

/// Axis-aligned bounding box in millimetres.
///
/// A freshly created box holds the sentinel `(+inf, +inf, -inf, -inf)`; a box
/// still in that state means "no geometry observed". Use [`BBox::valid`] to
/// turn it into an `Option` before doing arithmetic on it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BBox {
    #[serde(serialize_with = "serialize_f64_rounded")]
    pub minx: f64,
    #[serde(serialize_with = "serialize_f64_rounded")]
    pub miny: f64,
    #[serde(serialize_with = "serialize_f64_rounded")]
    pub maxx: f64,
    #[serde(serialize_with = "serialize_f64_rounded")]
    pub maxy: f64,
}

impl Default for BBox {
    fn default() -> Self {
        Self::empty()
    }
}

impl BBox {
    pub fn empty() -> Self {
        Self {
            minx: f64::INFINITY,
            miny: f64::INFINITY,
            maxx: f64::NEG_INFINITY,
            maxy: f64::NEG_INFINITY,
        }
    }

    pub fn expand_point(&mut self, x: f64, y: f64) {
        self.minx = self.minx.min(x);
        self.miny = self.miny.min(y);
        self.maxx = self.maxx.max(x);
        self.maxy = self.maxy.max(y);
    }

    /// Expand to include a square of half-size `margin` centred on (x, y).
    pub fn expand_with_margin(&mut self, x: f64, y: f64, margin: f64) {
        self.expand_point(x - margin, y - margin);
        self.expand_point(x + margin, y + margin);
    }

    pub fn is_empty(&self) -> bool {
        !(self.minx.is_finite()
            && self.miny.is_finite()
            && self.maxx.is_finite()
            && self.maxy.is_finite())
    }

    /// `None` for the "no geometry" sentinel, otherwise a copy of the box.
    pub fn valid(&self) -> Option<BBox> {
        if self.is_empty() {
            None
        } else {
            Some(*self)
        }
    }

    /// Smallest box containing both. Empty boxes contribute nothing.
    pub fn union(&self, other: &BBox) -> BBox {
        match (self.valid(), other.valid()) {
            (Some(a), Some(b)) => BBox {
                minx: a.minx.min(b.minx),
                miny: a.miny.min(b.miny),
                maxx: a.maxx.max(b.maxx),
                maxy: a.maxy.max(b.maxy),
            },
            (Some(a), None) => a,
            (None, Some(b)) => b,
            (None, None) => BBox::empty(),
        }
    }

    pub fn width(&self) -> f64 {
        self.maxx - self.minx
    }

    pub fn height(&self) -> f64 {
        self.maxy - self.miny
    }
}

/// Combine the boxes of several processing passes into one.
pub fn combine_extents<'a, I>(boxes: I) -> BBox
where
    I: IntoIterator<Item = &'a BBox>,
{
    boxes
        .into_iter()
        .fold(BBox::empty(), |acc, bbox| acc.union(bbox))
}

// ─── Page orientation ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PageOrientation {
    Portrait,
    Landscape,
}

impl PageOrientation {
    /// Landscape for boards wider than tall; portrait otherwise, including
    /// when no geometry was found.
    pub fn for_extents(bbox: &BBox) -> Self {
        match bbox.valid() {
            Some(b) if b.width() > b.height() => PageOrientation::Landscape,
            _ => PageOrientation::Portrait,
        }
    }
}

// ─── Report ──────────────────────────────────────────────────────────

/// Result of one file-processing pass, as printed by the CLI.
#[derive(Debug, Clone, Serialize)]
pub struct LayerReport {
    pub path: String,
    pub bbox: Option<BBox>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unrecognized: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<LineIssue>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub layers: Vec<LayerReport>,
    pub combined: Option<BBox>,
    pub orientation: PageOrientation,
}

impl Report {
    pub fn new(layers: Vec<LayerReport>) -> Self {
        let boxes: Vec<BBox> = layers
            .iter()
            .map(|l| l.bbox.unwrap_or_else(BBox::empty))
            .collect();
        let combined = combine_extents(&boxes);
        Self {
            layers,
            combined: combined.valid(),
            orientation: PageOrientation::for_extents(&combined),
        }
    }
}
