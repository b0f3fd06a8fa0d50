use std::path::{Path, PathBuf};

use log::debug;

use crate::surface::Color;

/// Board side of an assembly drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerSide {
    Top,
    Bottom,
}

impl LayerSide {
    pub const ALL: [LayerSide; 2] = [LayerSide::Top, LayerSide::Bottom];

    pub fn name(self) -> &'static str {
        match self {
            LayerSide::Top => "Top",
            LayerSide::Bottom => "Bottom",
        }
    }
}

/// What a Gerber file contributes to the drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerRole {
    Copper,
    Silkscreen,
}

impl LayerRole {
    /// Foreground colour the layer is painted with.
    pub fn color(self) -> Color {
        match self {
            LayerRole::Copper => Color::gray(0.85),
            LayerRole::Silkscreen => Color::gray(0.5),
        }
    }
}

/// The copper and overlay files found for one side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerFiles {
    pub copper: Option<PathBuf>,
    pub overlay: Option<PathBuf>,
}

impl LayerFiles {
    pub fn is_empty(&self) -> bool {
        self.copper.is_none() && self.overlay.is_none()
    }

    /// Present files in drawing order (copper first).
    pub fn iter(&self) -> impl Iterator<Item = (LayerRole, &Path)> {
        [
            (LayerRole::Copper, self.copper.as_deref()),
            (LayerRole::Silkscreen, self.overlay.as_deref()),
        ]
        .into_iter()
        .filter_map(|(role, path)| path.map(|p| (role, p)))
    }
}

/// Suffixes appended to the board base name, old convention first.
fn candidates(side: LayerSide, role: LayerRole) -> [&'static str; 2] {
    match (side, role) {
        (LayerSide::Top, LayerRole::Copper) => [".GTL", "-F_Cu.gbr"],
        (LayerSide::Top, LayerRole::Silkscreen) => [".GTO", "-F_Silkscreen.gbr"],
        (LayerSide::Bottom, LayerRole::Copper) => [".GBL", "-B_Cu.gbr"],
        (LayerSide::Bottom, LayerRole::Silkscreen) => [".GBO", "-B_Silkscreen.gbr"],
    }
}

fn find_one(base: &str, side: LayerSide, role: LayerRole) -> Option<PathBuf> {
    candidates(side, role)
        .iter()
        .map(|suffix| PathBuf::from(format!("{base}{suffix}")))
        .find(|path| path.exists())
}

/// Find the copper and overlay files for `side`.
///
/// `base` is the board path without suffix (`boards/demo`). The Protel
/// style names (`demo.GTL`) win over the KiCad ones (`demo-F_Cu.gbr`).
pub fn find_layer_files(base: &str, side: LayerSide) -> LayerFiles {
    let files = LayerFiles {
        copper: find_one(base, side, LayerRole::Copper),
        overlay: find_one(base, side, LayerRole::Silkscreen),
    };
    debug!("Gerber: {} layers for {base}: {files:?}", side.name());
    files
}

/// Identify side and role from a filename. All comparisons are
/// case-insensitive.
pub fn identify_from_filename(filename: &str) -> Option<(LayerSide, LayerRole)> {
    // Extract just the filename (strip directory path)
    let name = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);
    let lower = name.to_lowercase();

    if let Some((_, ext)) = lower.rsplit_once('.') {
        match ext {
            "gtl" => return Some((LayerSide::Top, LayerRole::Copper)),
            "gbl" => return Some((LayerSide::Bottom, LayerRole::Copper)),
            "gto" => return Some((LayerSide::Top, LayerRole::Silkscreen)),
            "gbo" => return Some((LayerSide::Bottom, LayerRole::Silkscreen)),
            _ => {}
        }
    }

    // KiCad naming patterns
    if lower.contains("f_cu") || lower.contains("f.cu") {
        return Some((LayerSide::Top, LayerRole::Copper));
    }
    if lower.contains("b_cu") || lower.contains("b.cu") {
        return Some((LayerSide::Bottom, LayerRole::Copper));
    }
    if lower.contains("f_silks") || lower.contains("f.silks") {
        return Some((LayerSide::Top, LayerRole::Silkscreen));
    }
    if lower.contains("b_silks") || lower.contains("b.silks") {
        return Some((LayerSide::Bottom, LayerRole::Silkscreen));
    }
    None
}
