use clap::Parser;
use assygen::gerber::GerberOptions;
use assygen::surface::RecordingSurface;
use assygen::svg::SvgSurface;
use assygen::{discover_layers, process_layers, BBox, GerberError, LayerInput};
use std::path::{Path, PathBuf};

/// Blank border around the board in the SVG, in millimetres.
const SVG_MARGIN_MM: f64 = 2.0;

#[derive(Parser)]
#[command(name = "assygen", about = "Measure and render Gerber layers")]
struct Cli {
    /// Gerber files to process (.GTL, .GTO, -F_Cu.gbr, ...)
    inputs: Vec<PathBuf>,

    /// Board base name; its copper and silkscreen layers are added
    #[arg(short, long)]
    base: Option<String>,

    /// Render all layers into this SVG file
    #[arg(long)]
    svg: Option<PathBuf>,

    /// Output JSON file (stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,

    /// Report lines that match no known command
    #[arg(short, long)]
    verbose: bool,
}

fn write_file(path: &Path, contents: &str) -> Result<(), GerberError> {
    std::fs::write(path, contents)?;
    eprintln!("Written to {}", path.display());
    Ok(())
}

fn run(cli: Cli) -> Result<(), GerberError> {
    let mut layers: Vec<LayerInput> = cli
        .base
        .as_deref()
        .map(discover_layers)
        .unwrap_or_default();
    layers.extend(cli.inputs.iter().map(|p| LayerInput::from_path(p)));
    if layers.is_empty() {
        return Err(GerberError::ParseError(
            "no Gerber files given or found".to_string(),
        ));
    }

    let options = GerberOptions {
        verbose: cli.verbose,
    };

    let report = match &cli.svg {
        Some(svg_path) => {
            let mut surface = SvgSurface::new();
            let report = process_layers(&mut surface, &layers, &options);
            let extents = report.combined.unwrap_or_else(BBox::empty);
            write_file(svg_path, &surface.finish(&extents, SVG_MARGIN_MM))?;
            report
        }
        None => process_layers(&mut RecordingSurface::new(), &layers, &options),
    };

    let json = if cli.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };

    match cli.output {
        Some(output_path) => write_file(&output_path, &json)?,
        None => println!("{json}"),
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
