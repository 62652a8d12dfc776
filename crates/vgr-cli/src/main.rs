//! `vgr`: command-line driver for the coarse/fine rasterizer pipeline.
//!
//! Grounded on `vfx-cli`'s `clap::Parser`/`Subcommand` + `tracing-subscriber`
//! bootstrap, reduced to the one subcommand this crate's narrower scope
//! needs: there is no multi-command dispatch table, no file logger, and no
//! `rayon` thread-pool configuration, since the demo pipeline is a single
//! single-threaded CPU run.

mod scene;

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use vgr_raster::types::BumpCell;

/// Command-line driver for the vgr vector-graphics rasterizer.
#[derive(Parser)]
#[command(name = "vgr", version, about)]
struct Cli {
    /// Increase log verbosity (`-v` info, `-vv` debug, `-vvv` trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the built-in demo scene to a PNG file.
    Demo(DemoArgs),
}

#[derive(clap::Args)]
struct DemoArgs {
    /// Output PNG path.
    #[arg(long, short)]
    out: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Demo(args) => run_demo(&args),
    }
}

/// Maps `-v` repeat count to an `EnvFilter`, same verbosity ladder as
/// `vfx-cli::init_tracing` (`warn` / `info` / `debug` / `trace`).
fn init_tracing(verbose: u8) {
    let directive = match verbose {
        0 => "warn",
        1 => "vgr=info",
        2 => "vgr=debug",
        _ => "vgr=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn run_demo(args: &DemoArgs) -> Result<()> {
    let demo = scene::build().context("building demo scene")?;
    let view = demo.view();
    let cfg = view.config;

    let mut ptcl = vec![0u32; cfg.ptcl_static_end() as usize];
    let bump = BumpCell::new();
    vgr_raster::run_coarse_cpu(&view, &mut ptcl, &bump).context("running coarse rasterizer")?;

    let bump_failed = bump.load(std::sync::atomic::Ordering::Relaxed).failed != 0;
    if bump_failed {
        tracing::warn!("ptcl bump allocator overflowed; output will be the magenta fallback tile");
    }

    let mut output = vec![0u32; (cfg.width_px() * cfg.height_px()) as usize];
    vgr_raster::run_fine_cpu(&cfg, &ptcl, &demo.segments, bump_failed, &mut output)
        .context("running fine rasterizer")?;

    write_png(&args.out, cfg.width_px(), cfg.height_px(), &output)
        .with_context(|| format!("writing {}", args.out.display()))?;

    tracing::info!(path = %args.out.display(), width = cfg.width_px(), height = cfg.height_px(), "wrote demo render");
    Ok(())
}

/// Writes packed `0xAABBGGRR` pixels (little-endian bytes already in
/// `[R, G, B, A]` order) as an 8-bit RGBA PNG.
fn write_png(path: &PathBuf, width: u32, height: u32, pixels: &[u32]) -> Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);

    let mut encoder = png::Encoder::new(writer, width, height);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;

    let mut bytes = Vec::with_capacity(pixels.len() * 4);
    for &px in pixels {
        bytes.extend_from_slice(&px.to_le_bytes());
    }
    writer.write_image_data(&bytes)?;
    Ok(())
}
