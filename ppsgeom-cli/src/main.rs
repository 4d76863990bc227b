//! ppsgeom CLI
//!
//! Inspect, align and query the proton spectrometer geometry.
#![allow(
    clippy::uninlined_format_args,
    clippy::doc_markdown,
    clippy::too_many_lines
)]

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::io::{self, Write};
use std::path::PathBuf;
use thiserror::Error;

use ppsgeom_core::PixelTopology;
use ppsgeom_tree::{AlignmentCorrections, Flavor, GeometryConfig, GeometryNode};
use ppsgeom_trigger::{StubAlgorithmConfig, StubAlgorithmProducer, UniformField};

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Geometry error: {0}")]
    Tree(#[from] ppsgeom_tree::Error),

    #[error("Trigger error: {0}")]
    Trigger(#[from] ppsgeom_trigger::Error),

    #[error("either --config or --description is required")]
    NoGeometry,
}

/// Back-end selection on the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum FlavorArg {
    /// Legacy description (mm, copy numbers root first)
    Legacy,
    /// DD4hep description (cm, copy numbers leaf first)
    Dd4hep,
}

impl From<FlavorArg> for Flavor {
    fn from(arg: FlavorArg) -> Self {
        match arg {
            FlavorArg::Legacy => Flavor::Legacy,
            FlavorArg::Dd4hep => Flavor::Dd4hep,
        }
    }
}

/// Pixel read-out layout.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Layout {
    #[value(name = "3x2")]
    ThreeByTwo,
    #[value(name = "2x2")]
    TwoByTwo,
}

/// Where to read the geometry from.
#[derive(Args, Debug)]
struct GeometryArgs {
    /// Configuration file with a `geometry` section
    #[arg(short, long, conflicts_with = "description")]
    config: Option<PathBuf>,

    /// Description JSON file
    #[arg(short, long)]
    description: Option<PathBuf>,

    /// Override the back-end convention of the description
    #[arg(short, long, value_enum)]
    flavor: Option<FlavorArg>,

    /// Alignment corrections JSON file
    #[arg(short, long)]
    alignment: Option<PathBuf>,
}

impl GeometryArgs {
    fn to_config(&self) -> Result<GeometryConfig> {
        let mut config = match (&self.config, &self.description) {
            (Some(path), _) => GeometryConfig::from_file(path)?,
            (None, Some(description)) => GeometryConfig::new(description),
            (None, None) => return Err(CliError::NoGeometry),
        };
        if let Some(flavor) = self.flavor {
            config.flavor = Some(flavor.into());
        }
        if let Some(alignment) = &self.alignment {
            config.alignment = Some(alignment.clone());
        }
        Ok(config)
    }

    fn load(&self) -> Result<GeometryNode> {
        Self::load_sorted(&self.to_config()?)
    }

    /// Loads the tree without any configured alignment.
    fn load_nominal(&self) -> Result<GeometryNode> {
        let mut config = self.to_config()?;
        if let Some(alignment) = config.alignment.take() {
            log::warn!("ignoring configured alignment {}", alignment.display());
        }
        Self::load_sorted(&config)
    }

    fn load_sorted(config: &GeometryConfig) -> Result<GeometryNode> {
        let mut tree = config.load_tree()?;
        tree.sort_components();
        Ok(tree)
    }
}

/// Proton spectrometer geometry tool.
#[derive(Parser)]
#[command(name = "ppsgeom")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the geometry tree
    Dump {
        #[command(flatten)]
        geometry: GeometryArgs,

        /// Log the full record of every node instead of one line each
        #[arg(short, long)]
        verbose: bool,
    },

    /// List sensors in detector-id order
    Sensors {
        #[command(flatten)]
        geometry: GeometryArgs,
    },

    /// Apply an alignment file and report the moved sensors
    Align {
        #[command(flatten)]
        geometry: GeometryArgs,

        /// Alignment corrections JSON file to apply
        corrections: PathBuf,
    },

    /// Check whether a local position falls on a pixel module
    PixelHit {
        /// Local x (mm)
        #[arg(allow_hyphen_values = true)]
        x: f32,

        /// Local y (mm)
        #[arg(allow_hyphen_values = true)]
        y: f32,

        /// Read-out layout
        #[arg(short, long, value_enum, default_value = "3x2")]
        layout: Layout,
    },

    /// Compute the stub algorithm scaling factor
    StubFactor {
        /// Configuration file with a `stub_algorithm` section
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Central field along z (tesla)
        #[arg(long, default_value = "3.8")]
        bz: f64,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Dump { geometry, verbose } => {
            let tree = geometry.load()?;
            if verbose {
                tree.iter().for_each(GeometryNode::print);
            } else {
                tree.write_tree(&mut out)?;
            }
            writeln!(out, "{} nodes", tree.node_count())?;
        }

        Commands::Sensors { geometry } => {
            let tree = geometry.load()?;
            let sensors = tree.sensors();
            writeln!(out, "{:<12} | {:<8} | {:<30} | z (mm)", "DetId", "Type", "Name")?;
            writeln!(out, "{:-<70}", "")?;
            for node in &sensors {
                writeln!(
                    out,
                    "{:<12} | {:<8} | {:<30} | {:.3}",
                    node.geographical_id().raw(),
                    node.sensor_type().as_str(),
                    format!("{}[{}]", node.name(), node.copy_number()),
                    node.translation().z
                )?;
            }
            writeln!(out, "{} sensors", sensors.len())?;
        }

        Commands::Align {
            geometry,
            corrections,
        } => {
            let nominal = geometry.load_nominal()?;
            let mut aligned = nominal.clone();
            let corrections = AlignmentCorrections::from_file(&corrections)?;
            let moved = corrections.apply_to(&mut aligned);

            for (before, after) in nominal.iter().zip(aligned.iter()) {
                if before.placement() == after.placement() {
                    continue;
                }
                let shift = after.translation() - before.translation();
                writeln!(
                    out,
                    "{} shifted by ({:.4}, {:.4}, {:.4}) mm, rotated by {:.6} rad",
                    after,
                    shift.x,
                    shift.y,
                    shift.z,
                    after.rotation().angle_to(before.rotation())
                )?;
            }
            writeln!(out, "{} nodes aligned", moved)?;
        }

        Commands::PixelHit { x, y, layout } => {
            let (is_3x2, name) = match layout {
                Layout::ThreeByTwo => (true, "3x2"),
                Layout::TwoByTwo => (false, "2x2"),
            };
            let hit = PixelTopology::is_pixel_hit(x, y, is_3x2);
            writeln!(
                out,
                "({}, {}) on {} module: {}",
                x,
                y,
                name,
                if hit { "inside" } else { "outside" }
            )?;
        }

        Commands::StubFactor { config, bz } => {
            let config = match config {
                Some(path) => StubAlgorithmConfig::from_file(path)?,
                None => StubAlgorithmConfig::default(),
            };
            let producer = StubAlgorithmProducer::new(config)?;
            let algo = producer.produce(&UniformField::along_z(bz))?;
            writeln!(out, "algorithm: {}", algo.name())?;
            writeln!(out, "min pT: {} GeV", config.min_pt_threshold)?;
            writeln!(out, "B_z(0): {} T", bz)?;
            writeln!(out, "scaling factor: {:e}", algo.compatibility_scaling_factor())?;
            writeln!(out, "ip width: {} cm", algo.ip_width())?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn demo(file: &str) -> String {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../demos")
            .join(file)
            .display()
            .to_string()
    }

    fn align_geometry(args: &[&str]) -> GeometryArgs {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::Align { geometry, .. } => geometry,
            _ => panic!("expected the align subcommand"),
        }
    }

    #[test]
    fn test_align_starts_from_unaligned_tree() {
        let config = demo("config.json");
        let corrections = demo("alignment.json");
        let geometry = align_geometry(&["ppsgeom", "align", "-c", &config, &corrections]);

        let nominal = geometry.load_nominal().unwrap();
        let aligned = geometry.load().unwrap();

        let plane = nominal.find("RP_Silicon_Detector", 0).unwrap();
        assert!(plane.translation().x.abs() < 1e-12);
        let plane = aligned.find("RP_Silicon_Detector", 0).unwrap();
        assert!((plane.translation().x - 0.120).abs() < 1e-9);
    }

    #[test]
    fn test_align_ignores_alignment_flag() {
        let description = demo("ctpps_legacy.json");
        let corrections = demo("alignment.json");
        let geometry = align_geometry(&[
            "ppsgeom",
            "align",
            "-d",
            &description,
            "-a",
            &corrections,
            &corrections,
        ]);
        assert!(geometry.to_config().unwrap().alignment.is_some());

        let nominal = geometry.load_nominal().unwrap();
        for (name, copy) in [("RP_box_primary_vacuum", 3), ("RP_Silicon_Detector", 0)] {
            let node = nominal.find(name, copy).unwrap();
            assert!(node.translation().x.abs() < 1e-12, "{node} moved");
        }
    }
}
