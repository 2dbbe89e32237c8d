use std::path::PathBuf;
use std::process;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use rift_placement::common::config::{self, Config};
use rift_placement::common::log;
use rift_placement::layout_engine::TilingWorkspace;
use rift_placement::sys::geometry::{Rect, Size};
use rift_placement::sys::window::{DesktopId, RecordedSizes, WindowId};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "rift-placement")]
#[command(about = "Try out the rift tiling placement engine")]
struct Cli {
    /// Config file to use instead of ~/.rift-placement.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Place windows on an empty desktop and print the resulting layout
    Simulate {
        #[arg(long, default_value_t = 1920)]
        width: i32,
        #[arg(long, default_value_t = 1080)]
        height: i32,
        /// Number of windows to open
        #[arg(short, long, default_value_t = 3)]
        windows: u32,
        /// Minimum window size as WIDTHxHEIGHT, one per window in order
        #[arg(long = "min", value_parser = parse_size)]
        minimums: Vec<Size>,
        /// Print frames as JSON instead of the tree
        #[arg(long)]
        json: bool,
    },
    /// Validate the config file
    CheckConfig {
        /// Write the automatically fixed config back
        #[arg(long)]
        fix: bool,
    },
}

#[derive(Serialize)]
struct Placement {
    window: WindowId,
    frame: Option<Rect>,
    error: Option<String>,
}

fn parse_size(s: &str) -> Result<Size, String> {
    let (w, h) = s.split_once('x').ok_or_else(|| format!("expected WIDTHxHEIGHT, got {s}"))?;
    let w = w.trim().parse::<i32>().map_err(|e| e.to_string())?;
    let h = h.trim().parse::<i32>().map_err(|e| e.to_string())?;
    Ok(Size::new(w, h))
}

fn config_path(cli: &Cli) -> Option<PathBuf> { cli.config.clone().or_else(config::config_file) }

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    match config_path(cli) {
        Some(path) if path.exists() => {
            Config::read(&path).with_context(|| format!("reading {}", path.display()))
        }
        Some(path) if cli.config.is_some() => bail!("{} does not exist", path.display()),
        _ => Ok(Config::default()),
    }
}

fn simulate(
    config: Config,
    width: i32,
    height: i32,
    windows: u32,
    minimums: &[Size],
    json: bool,
) -> anyhow::Result<()> {
    let desktop = DesktopId::new(1);
    let orientation = config.settings.default_orientation;
    let mut sizes = RecordedSizes::new();
    let ids: Vec<WindowId> = (0..windows).map(|idx| WindowId::new(1, idx + 1)).collect();
    for (&window, &size) in ids.iter().zip(minimums) {
        sizes.set_minimum(window, size);
    }

    let mut workspace = TilingWorkspace::new(sizes, config.settings);
    workspace.register_desktop(desktop, orientation, Rect::from_xywh(0, 0, width, height));

    let mut failures = Vec::new();
    for &window in &ids {
        if let Err(err) = workspace.register_window(desktop, window, None) {
            failures.push((window, err.to_string()));
        }
    }

    if json {
        let frames = workspace.frames(desktop)?;
        let mut placements: Vec<Placement> = frames
            .into_iter()
            .map(|(window, frame)| Placement { window, frame: Some(frame), error: None })
            .collect();
        placements.extend(failures.into_iter().map(|(window, error)| Placement {
            window,
            frame: None,
            error: Some(error),
        }));
        println!("{}", serde_json::to_string_pretty(&placements)?);
    } else {
        print!("{}", workspace.draw_tree(desktop)?);
        for (window, frame) in workspace.frames(desktop)? {
            println!("{window:?}: {frame:?}");
        }
        for (window, error) in failures {
            println!("{window:?}: not tiled ({error})");
        }
    }
    Ok(())
}

fn check_config(cli: &Cli, fix: bool) -> anyhow::Result<()> {
    let mut config = load_config(cli)?;
    let issues = config.validate();
    if issues.is_empty() {
        println!("config is valid");
        return Ok(());
    }
    for issue in &issues {
        println!("{issue}");
    }
    if !fix {
        bail!("{} issue(s) found", issues.len());
    }
    let fixes = config.auto_fix_values();
    let path = config_path(cli).context("no config path")?;
    config.save(&path)?;
    println!("applied {fixes} fix(es) to {}", path.display());
    Ok(())
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Simulate { width, height, windows, minimums, json } => {
            let config = load_config(&cli)?;
            simulate(config, *width, *height, *windows, minimums, *json)
        }
        Commands::CheckConfig { fix } => check_config(&cli, *fix),
    }
}

fn main() {
    let cli = Cli::parse();
    log::init_logging(cli.verbose);
    if let Err(err) = run(cli) {
        eprintln!("Error: {err:#}");
        process::exit(1);
    }
}
