//! Headless star field renderer
//!
//! Generates a synthetic sky, optionally flies a short focus tour across its
//! brightest stars, and writes every frame to PNG.
//!
//! # Usage
//!
//! ```bash
//! # Single frame of 20k stars in the default orthographic view
//! cargo run --release --bin skyview-render -- -o frames
//!
//! # Planetarium view, naked-eye glow, 3 second tour at 30 fps
//! cargo run --release --bin skyview-render -- -o frames \
//!     --projection stereographic --glow naked-eye --tour --frames 90 --fps 30
//!
//! # Start from a saved configuration
//! cargo run --release --bin skyview-render -- -o frames --config skyview.json
//! ```

use std::path::PathBuf;

use clap::Parser;
use crossbeam_channel::unbounded;
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use skyview::config::RenderConfig;
use skyview::focus::{FocusProgram, FocusStep};
use skyview::milky_way::GlowMode;
use skyview::raster::PixmapSurface;
use skyview::render_loop::{FrameStatus, RenderLoop};
use skyview::{ConstellationLine, Equatorial, ProjectionMode, SkyEvent, Star, StarCatalog, ViewState};

/// North galactic pole and the galactic longitude of the north celestial pole (J2000)
const NGP_RA_DEG: f64 = 192.85948;
const NGP_DEC_DEG: f64 = 27.12825;
const NCP_GALACTIC_LON_DEG: f64 = 122.93192;

#[derive(Parser, Debug)]
#[command(author, version, about = "Render synthetic star field frames to PNG", long_about = None)]
struct Args {
    /// Directory receiving frame_NNNN.png files
    #[arg(short, long, default_value = "frames")]
    output: PathBuf,

    /// Load the render configuration from this JSON file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the effective configuration to this JSON file
    #[arg(long)]
    save_config: Option<PathBuf>,

    /// Number of synthetic stars
    #[arg(short = 'n', long, default_value_t = 20_000)]
    stars: usize,

    /// Random seed for the synthetic sky
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Projection model (overrides the configuration)
    #[arg(long, value_enum)]
    projection: Option<ProjectionMode>,

    /// Milky Way glow mode (overrides the configuration)
    #[arg(long, value_enum)]
    glow: Option<GlowMode>,

    /// Disable the Milky Way glow
    #[arg(long, conflicts_with = "glow")]
    no_glow: bool,

    /// Initial zoom (overrides the configuration)
    #[arg(long)]
    zoom: Option<f64>,

    /// Surface width in pixels (overrides the configuration)
    #[arg(long)]
    width: Option<u32>,

    /// Surface height in pixels (overrides the configuration)
    #[arg(long)]
    height: Option<u32>,

    /// Fly a focus tour across the brightest stars
    #[arg(long)]
    tour: bool,

    /// Number of frames to render
    #[arg(long, default_value_t = 1)]
    frames: usize,

    /// Frame rate used to advance the clock
    #[arg(long, default_value_t = 30.0, value_parser = parse_fps)]
    fps: f64,
}

/// Parse a frame rate; must be a finite positive number
fn parse_fps(s: &str) -> Result<f64, String> {
    let fps: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("Invalid frame rate: {s}"))?;
    if !fps.is_finite() || fps <= 0.0 {
        return Err(format!("Frame rate must be positive, got {fps}"));
    }
    Ok(fps)
}

/// Convert galactic coordinates to equatorial, all in degrees.
fn galactic_to_equatorial(l: f64, b: f64) -> (f64, f64) {
    let (l, b) = (l.to_radians(), b.to_radians());
    let ngp_dec = NGP_DEC_DEG.to_radians();
    let l_ncp = NCP_GALACTIC_LON_DEG.to_radians();

    let sin_dec = ngp_dec.sin() * b.sin() + ngp_dec.cos() * b.cos() * (l_ncp - l).cos();
    let y = b.cos() * (l_ncp - l).sin();
    let x = ngp_dec.cos() * b.sin() - ngp_dec.sin() * b.cos() * (l_ncp - l).cos();

    let ra = (NGP_RA_DEG + y.atan2(x).to_degrees()).rem_euclid(360.0);
    (ra, sin_dec.clamp(-1.0, 1.0).asin().to_degrees())
}

/// Random sky: faint stars crowd toward the galactic plane, brightness
/// follows a steep number-magnitude relation.
fn synthetic_sky(count: usize, seed: u64) -> Vec<Star> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut stars: Vec<Star> = (0..count)
        .map(|i| {
            let vmag = -1.5 + 9.5 * rng.random::<f64>().cbrt();
            let (ra, dec) = if vmag > 5.0 && rng.random_bool(0.6) {
                let b: f64 = rng.random_range(-1.0..1.0) * rng.random_range(0.0..12.0);
                galactic_to_equatorial(rng.random_range(0.0..360.0), b)
            } else {
                let ra = rng.random_range(0.0..360.0);
                let dec = rng.random_range(-1.0f64..1.0).asin().to_degrees();
                (ra, dec)
            };
            let bv = rng.random_range(-0.4..2.0);
            Star::new(i as u32 + 1, ra, dec, Some(vmag), Some(bv))
        })
        .collect();

    stars.sort_by(|a, b| a.sort_magnitude().total_cmp(&b.sort_magnitude()));
    for (rank, star) in stars.iter_mut().take(24).enumerate() {
        star.proper_name = Some(format!("Star {}", rank + 1));
    }
    stars
}

/// Chain the brightest stars in groups of four as stick figures.
fn synthetic_constellations(stars: &[Star]) -> Vec<ConstellationLine> {
    stars
        .iter()
        .take(24)
        .collect::<Vec<_>>()
        .chunks(4)
        .enumerate()
        .map(|(i, group)| {
            let lines = group.windows(2).map(|pair| (pair[0].id, pair[1].id)).collect();
            ConstellationLine::new(format!("C{i:02}"), lines)
        })
        .collect()
}

fn tour(stars: &[Star], zoom: f64) -> FocusProgram {
    let steps = stars
        .iter()
        .take(3)
        .map(|star| {
            FocusStep::new(Equatorial::new(star.ra, star.dec), zoom * 2.0)
                .with_duration(1000.0)
                .with_hold(500.0)
        })
        .collect();
    FocusProgram::new("brightest-tour", steps)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => RenderConfig::load(path)?,
        None => RenderConfig::default(),
    };
    if let Some(projection) = args.projection {
        config.view.projection_mode = projection;
    }
    if let Some(zoom) = args.zoom {
        config.view = ViewState::new(config.view.view_center, zoom, config.view.projection_mode);
    }
    if let Some(glow) = args.glow {
        config.options.milky_way_glow = Some(glow);
    }
    if args.no_glow {
        config.options.milky_way_glow = None;
    }
    config.width = args.width.unwrap_or(config.width);
    config.height = args.height.unwrap_or(config.height);

    if let Some(path) = &args.save_config {
        config.save(path)?;
        println!("Saved configuration to {}", path.display());
    }

    println!("SkyView Renderer");
    println!("================");
    println!("Stars: {} (seed {})", args.stars, args.seed);
    println!("Projection: {}", config.view.projection_mode);
    println!("Surface: {}x{}", config.width, config.height);

    let stars = synthetic_sky(args.stars, args.seed);
    let constellations = synthetic_constellations(&stars);
    let program = args.tour.then(|| tour(&stars, config.view.zoom));

    let mut surface = PixmapSurface::new(config.width, config.height)?;
    let mut render_loop = RenderLoop::new(config, StarCatalog::new(stars), constellations);

    let (tx, rx) = unbounded();
    render_loop.add_listener(tx);

    std::fs::create_dir_all(&args.output)?;
    let frame_ms = 1000.0 / args.fps;
    if program.is_some() {
        render_loop.submit_focus(program, 0.0);
    }

    let pb = ProgressBar::new(args.frames as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}) ETA: {eta}")?
            .progress_chars("█▉▊▋▌▍▎▏ "),
    );
    pb.set_message("Rendering frames");

    for frame in 0..args.frames {
        let now_ms = frame as f64 * frame_ms;
        if render_loop.tick(now_ms, Some(&mut surface)) != FrameStatus::Continue {
            break;
        }
        surface.save_png(args.output.join(format!("frame_{frame:04}.png")))?;
        pb.inc(1);
    }
    pb.finish_with_message("Done");

    for event in rx.try_iter() {
        match event {
            SkyEvent::VisibleCountChanged(count) => log::info!("Visible stars: {count}"),
            SkyEvent::FocusSequenceComplete(id) => println!("Focus program {id} complete"),
            other => log::debug!("{other:?}"),
        }
    }

    let view = render_loop.viewport().view();
    println!(
        "Final view: RA {:.2}° Dec {:.2}° zoom {:.2}",
        view.view_center.ra, view.view_center.dec, view.zoom
    );
    println!("Frames written to {}", args.output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_galactic_center_direction() {
        // Galactic center sits near RA 266.4, Dec -28.9
        let (ra, dec) = galactic_to_equatorial(0.0, 0.0);
        assert_relative_eq!(ra, 266.40, epsilon = 0.05);
        assert_relative_eq!(dec, -28.94, epsilon = 0.05);
    }

    #[test]
    fn test_fps_must_be_positive() {
        assert_eq!(parse_fps("24"), Ok(24.0));
        assert!(parse_fps("0").is_err());
        assert!(parse_fps("-5").is_err());
        assert!(parse_fps("inf").is_err());
        assert!(parse_fps("fast").is_err());
        assert!(Args::try_parse_from(["skyview-render", "--fps", "0"]).is_err());
    }

    #[test]
    fn test_synthetic_sky_is_reproducible() {
        let a = synthetic_sky(500, 3);
        let b = synthetic_sky(500, 3);
        assert_eq!(a, b);
        assert_eq!(a.iter().filter(|s| s.proper_name.is_some()).count(), 24);
        assert!(a.iter().all(|s| (-90.0..=90.0).contains(&s.dec)));
    }
}
