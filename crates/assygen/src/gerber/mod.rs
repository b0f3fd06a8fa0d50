pub mod apertures;
pub mod commands;
pub mod coord;
pub mod diagnostics;
pub mod extents;
pub mod interpreter;
pub mod layers;
pub mod lexer;
pub mod macros;

use std::path::Path;

use log::{info, warn};

use crate::surface::{Color, DrawingSurface};
use crate::types::{BBox, LayerReport};

use self::diagnostics::Diagnostics;
use self::interpreter::Interpreter;
use self::lexer::split_statements;

#[derive(Debug, Clone, Default)]
pub struct GerberOptions {
    /// Record lines that match no known command.
    pub verbose: bool,
}

/// Processes Gerber files onto a drawing surface, one pass per file.
///
/// Each pass starts from fresh state and returns the extents of what it
/// drew; combining passes is left to the caller (see [`BBox::union`]).
pub struct GerberMachine<'s, S: DrawingSurface + ?Sized> {
    surface: &'s mut S,
    interpreter: Interpreter,
    diagnostics: Diagnostics,
}

impl<'s, S: DrawingSurface + ?Sized> GerberMachine<'s, S> {
    pub fn new(surface: &'s mut S, options: GerberOptions) -> Self {
        Self {
            surface,
            interpreter: Interpreter::new(),
            diagnostics: Diagnostics::new(options.verbose),
        }
    }

    /// Reset all per-pass state.
    pub fn initialize(&mut self) {
        self.interpreter.reset();
        self.diagnostics.clear();
    }

    pub fn set_colors(&mut self, foreground: Color, background: Color) {
        self.surface.set_colors(foreground, background);
    }

    /// Run one pass over a file.
    ///
    /// A missing or unreadable file is logged and yields an empty box.
    pub fn process_file(&mut self, path: impl AsRef<Path>) -> BBox {
        let path = path.as_ref();
        self.initialize();
        info!("Gerber: processing {}", path.display());
        match std::fs::read(path) {
            Ok(bytes) => {
                let content = String::from_utf8_lossy(&bytes);
                self.run(&content, &path.display().to_string())
            }
            Err(e) => {
                warn!("Gerber: cannot read {}, skipping: {e}", path.display());
                BBox::empty()
            }
        }
    }

    /// Run one pass over in-memory content.
    pub fn process_str(&mut self, content: &str) -> BBox {
        self.initialize();
        self.run(content, "<input>")
    }

    fn run(&mut self, content: &str, source: &str) -> BBox {
        let statements = split_statements(content);
        self.interpreter
            .run(&statements, &mut *self.surface, &mut self.diagnostics);

        let bbox = self.interpreter.bbox();
        match bbox.valid() {
            Some(b) => info!(
                "Gerber: {source} extents: ({:.2}, {:.2}) to ({:.2}, {:.2})",
                b.minx, b.miny, b.maxx, b.maxy
            ),
            None => info!("Gerber: {source} produced no geometry"),
        }
        bbox
    }

    /// Diagnostics of the most recent pass.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Summarise the most recent pass.
    pub fn report(&self, path: &str, bbox: BBox) -> LayerReport {
        LayerReport {
            path: path.to_string(),
            bbox: bbox.valid(),
            unrecognized: self
                .diagnostics
                .unrecognized_lines()
                .map(str::to_string)
                .collect(),
            issues: self.diagnostics.issues().to_vec(),
        }
    }
}
