pub mod error;
pub mod gerber;
pub mod surface;
pub mod svg;
pub mod types;

use std::path::{Path, PathBuf};

use gerber::layers::{find_layer_files, identify_from_filename, LayerRole, LayerSide};
use surface::{Color, DrawingSurface};
use types::Report;

pub use error::GerberError;
pub use gerber::{GerberMachine, GerberOptions};
pub use types::{BBox, PageOrientation};

/// A Gerber file and the role it is drawn in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerInput {
    pub role: LayerRole,
    pub path: PathBuf,
}

impl LayerInput {
    /// Guess the role from the filename; unknown names are drawn as copper.
    pub fn from_path(path: &Path) -> Self {
        let role = identify_from_filename(&path.to_string_lossy())
            .map(|(_, role)| role)
            .unwrap_or(LayerRole::Copper);
        Self {
            role,
            path: path.to_path_buf(),
        }
    }
}

/// All copper and overlay files found for `base`, top side first.
pub fn discover_layers(base: &str) -> Vec<LayerInput> {
    LayerSide::ALL
        .iter()
        .flat_map(|side| {
            find_layer_files(base, *side)
                .iter()
                .map(|(role, path)| LayerInput {
                    role,
                    path: path.to_path_buf(),
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Process each layer in turn onto `surface` and summarise the passes.
///
/// Every file is its own pass; the report combines their extents and picks
/// the page orientation from the combined box.
pub fn process_layers<S: DrawingSurface + ?Sized>(
    surface: &mut S,
    layers: &[LayerInput],
    options: &GerberOptions,
) -> Report {
    let mut machine = GerberMachine::new(surface, options.clone());
    let reports = layers
        .iter()
        .map(|layer| {
            machine.set_colors(layer.role.color(), Color::WHITE);
            let bbox = machine.process_file(&layer.path);
            machine.report(&layer.path.display().to_string(), bbox)
        })
        .collect();
    Report::new(reports)
}
