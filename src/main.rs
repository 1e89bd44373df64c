use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use loomkit::{draw_demo, init_logging, CompositingSession, EngineConfig, BUILD_DATE, VERSION};

/// Render a loomkit session to color, displacement and normal PNGs
#[derive(Parser, Debug)]
#[command(name = "loomkit")]
#[command(version)]
struct Args {
    /// Engine configuration (JSON or TOML); defaults are used when absent
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Layer snapshot to replay instead of the built-in demo
    #[arg(short, long)]
    snapshot: Option<PathBuf>,

    /// Directory the PNG files are written to
    #[arg(short, long, default_value = ".")]
    out: PathBuf,

    /// Also save the session as a snapshot next to the images
    #[arg(long)]
    save_snapshot: bool,
}

fn main() -> Result<()> {
    init_logging()?;
    let args = Args::parse();
    tracing::info!("loomkit {} (built {})", VERSION, BUILD_DATE);

    let config = match &args.config {
        Some(path) => EngineConfig::load_from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let mut session = CompositingSession::new(config)?;

    match &args.snapshot {
        Some(path) => session
            .load_snapshot(path)
            .with_context(|| format!("loading snapshot {}", path.display()))?,
        None => {
            session.set_name("demo");
            draw_demo(&mut session)?;
        }
    }
    session.frame()?;

    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("creating {}", args.out.display()))?;
    let outputs = [
        ("color.png", session.composed_surface()),
        ("displacement.png", session.displacement_surface()),
        ("normal.png", session.normal_surface()),
    ];
    for (name, surface) in outputs {
        let surface = surface.with_context(|| format!("no surface for {}", name))?;
        surface.save_png(&args.out.join(name))?;
    }
    if args.save_snapshot {
        session.save_snapshot(&args.out.join("session.json"))?;
    }

    let stats = session.pool_stats();
    tracing::info!(
        "Wrote {} layers to {} ({} surfaces, {} bytes)",
        session.store().len(),
        args.out.display(),
        stats.active,
        stats.estimated_bytes()
    );
    Ok(())
}
