//! Stickerboard command line tools.
//!
//! Loads a scene snapshot, resolves media sizes from a manifest, settles
//! every asset and either reports placement validity or writes a normalized
//! export.

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use stickerboard_core::validity;
use stickerboard_core::{
    AssetType, EditableAsset, MemoryMediaResolver, Pending, Scene, SceneConfig, SceneError,
    SceneSnapshot,
};
use thiserror::Error;

#[derive(Parser, Debug)]
#[command(name = "stickerboard", version, about = "Check and normalize stickerboard scenes")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Report placement validity of every asset.
    Check(CheckArgs),
    /// Write the settled scene as a snapshot.
    Export(ExportArgs),
}

/// Inputs shared by every command.
#[derive(Args, Debug, Clone)]
pub struct SceneArgs {
    /// Scene snapshot JSON.
    pub scene: PathBuf,

    /// Media manifest JSON mapping media ids to their size and metadata.
    #[arg(long)]
    pub media: Option<PathBuf>,

    /// Scene configuration JSON.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Canvas size as WIDTHxHEIGHT, overriding the configuration.
    #[arg(long, value_parser = parse_canvas)]
    pub canvas: Option<(f64, f64)>,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub scene: SceneArgs,

    /// Print the report as JSON.
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    #[command(flatten)]
    pub scene: SceneArgs,

    /// Output path. Defaults to stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

/// CLI errors.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{}: {source}", path.display())]
    File { path: PathBuf, source: SceneError },
    #[error(transparent)]
    Scene(#[from] SceneError),
}

/// Parse a `WIDTHxHEIGHT` canvas size.
pub fn parse_canvas(value: &str) -> Result<(f64, f64), String> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{value}'"))?;
    let parse = |s: &str| {
        s.trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .ok_or_else(|| format!("invalid canvas dimension '{s}'"))
    };
    Ok((parse(width)?, parse(height)?))
}

fn file_error(path: &Path) -> impl FnOnce(SceneError) -> CliError + '_ {
    move |source| CliError::File {
        path: path.to_path_buf(),
        source,
    }
}

/// Load, resolve and settle a scene.
pub fn load_scene(args: &SceneArgs) -> Result<Scene, CliError> {
    let mut config = match &args.config {
        Some(path) => SceneConfig::from_path(path).map_err(file_error(path))?,
        None => SceneConfig::default(),
    };
    if let Some((width, height)) = args.canvas {
        config.canvas_width = width;
        config.canvas_height = height;
    }

    let snapshot = SceneSnapshot::from_path(&args.scene).map_err(file_error(&args.scene))?;
    let mut scene = Scene::new(config);
    scene.load(&snapshot);
    for event in scene.drain_events() {
        log::warn!("{:?}", event);
    }

    if let Some(path) = &args.media {
        let resolver = MemoryMediaResolver::from_path(path).map_err(file_error(path))?;
        let resolved = pollster::block_on(scene.resolve_media(&resolver));
        log::info!("Resolved media for {} of {} assets", resolved, scene.len());
    }
    scene.settle();
    scene.drain_events();
    Ok(scene)
}

/// Placement summary of one asset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetReport {
    pub asset_type: AssetType,
    pub source_ref: String,
    pub layer: i32,
    pub resolved: bool,
    pub valid: bool,
    /// Whether the scale fits the media's allowed range; unknown until resolved.
    pub scale_in_range: Option<bool>,
}

/// Placement summary of a scene.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneReport {
    pub all_valid: bool,
    pub assets: Vec<AssetReport>,
}

impl SceneReport {
    pub fn new(scene: &Scene) -> Self {
        let config = scene.config();
        let assets = scene
            .items()
            .iter()
            .chain(scene.messages().iter())
            .map(|editable| asset_report(editable, config))
            .collect();
        Self {
            all_valid: scene.all_valid(),
            assets,
        }
    }

    /// Human readable, one asset per line.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for a in &self.assets {
            let status = match (a.resolved, a.valid) {
                (false, _) => "unresolved",
                (true, true) => "ok",
                (true, false) => "invalid",
            };
            let scale = match a.scale_in_range {
                Some(true) | None => "",
                Some(false) => " (scale out of range)",
            };
            out.push_str(&format!(
                "{:<8} {:<10} layer {:>5}  {}{}\n",
                a.asset_type.as_str(),
                status,
                a.layer,
                a.source_ref,
                scale
            ));
        }
        out.push_str(if self.all_valid {
            "all assets placed validly\n"
        } else {
            "some assets are placed invalidly\n"
        });
        out
    }
}

fn asset_report(editable: &EditableAsset, config: &SceneConfig) -> AssetReport {
    let asset = editable.asset();
    let resolved = editable.pending() != Some(Pending::Resolve) && asset.is_measured();
    let scale_in_range = resolved.then(|| {
        validity::scale_within_range(
            asset,
            asset.width,
            asset.height,
            config.min_dim(asset.asset_type),
            config.max_dim,
        )
    });
    AssetReport {
        asset_type: asset.asset_type,
        source_ref: asset.source_ref.clone(),
        layer: asset.layer,
        resolved,
        valid: resolved && editable.is_valid(),
        scale_in_range,
    }
}

/// Run the `check` command. Returns whether every asset is valid.
pub fn check(args: &CheckArgs) -> Result<bool, CliError> {
    let scene = load_scene(&args.scene)?;
    let report = SceneReport::new(&scene);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report).map_err(SceneError::from)?);
    } else {
        print!("{}", report.to_text());
    }
    Ok(report.all_valid && report.assets.iter().all(|a| a.resolved))
}

/// Run the `export` command.
pub fn export(args: &ExportArgs) -> Result<(), CliError> {
    let scene = load_scene(&args.scene)?;
    let snapshot = scene.export();
    match &args.out {
        Some(path) => {
            snapshot.save(path).map_err(file_error(path))?;
            log::info!("Wrote {}", path.display());
        }
        None => println!("{}", snapshot.to_json()?),
    }
    Ok(())
}
