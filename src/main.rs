use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

use notegram::audio::analyzer::{self, AnalyzerSettings};
use notegram::audio::decode::decode_audio;
use notegram::cli::Cli;
use notegram::config;
use notegram::encode::ffmpeg::{FfmpegEncoder, VideoOptions};
use notegram::music::notes::NoteTable;
use notegram::playback::{format_clock, Playback};
use notegram::render::grid::grid_lines;
use notegram::render::layer::Rgba;
use notegram::render::orchestrator::RenderOrchestrator;
use notegram::render::palette::Palette;
use notegram::render::raster::Canvas;
use notegram::render::text::{find_system_font, load_font_from_url, TextOverlay};
use notegram::render::viewport::TimeWindow;
use notegram::spectrum::Spectrogram;

const CLOCK_SIZE: f32 = 14.0;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut cli = Cli::parse();

    if let Some(path) = config::find_config(cli.config.as_deref()) {
        if let Some(cfg) = config::load_config(&path) {
            log::info!("Loaded config from {}", path.display());
            cli.apply_config(cfg);
        } else {
            log::warn!("Failed to load config from {}", path.display());
        }
    }

    if cli.list_palettes {
        println!("Available palettes:");
        for palette in Palette::ALL {
            println!("  {}", palette);
        }
        return Ok(());
    }

    let input = cli.input.clone().context("Input audio file is required")?;
    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }

    log::info!("notegram - musically aligned spectrogram");
    log::info!("Input: {}", input.display());

    // 1. Decode and analyze
    log::info!("Decoding audio...");
    let audio_data = decode_audio(&input)?;

    log::info!("Analyzing audio...");
    let raw = analyzer::analyze(&audio_data, &AnalyzerSettings::default())?;
    drop(audio_data);

    let spectrogram = Spectrogram::build(&raw, NoteTable::default())
        .context("Failed to build intensity matrix")?;
    drop(raw);

    let settings = cli.view_settings();

    // Grid dump mode
    if cli.print_grid {
        let duration = spectrogram.duration;
        let window = TimeWindow {
            start: 0.0,
            end: duration,
        };
        let lines = grid_lines(&settings.grid, window, duration);
        println!("{}", serde_json::to_string_pretty(&lines)?);
        return Ok(());
    }

    anyhow::ensure!(cli.width > 0 && cli.height > 0, "Frame size must be non-zero");
    anyhow::ensure!(cli.fps > 0, "FPS must be positive");

    // 2. Layers and rasterizer
    let text_overlay = load_text_overlay(&cli);
    let mut orchestrator = RenderOrchestrator::new(spectrogram, cli.width, cli.height);
    orchestrator.apply(&settings);
    let mut canvas = Canvas::new(cli.width, cli.height);

    match cli.at {
        Some(at) => render_still(&cli, at, &mut orchestrator, &mut canvas, text_overlay.as_ref()),
        None => render_video(&cli, &input, &mut orchestrator, &mut canvas, text_overlay.as_ref()),
    }
}

fn render_still(
    cli: &Cli,
    at: f32,
    orchestrator: &mut RenderOrchestrator,
    canvas: &mut Canvas,
    text: Option<&TextOverlay>,
) -> Result<()> {
    // The default output name is for video; a still gets an image.
    let output = if cli.output == PathBuf::from("output.mp4") {
        PathBuf::from("output.png")
    } else {
        cli.output.clone()
    };

    orchestrator.set_position(at);
    let duration = orchestrator.spectrogram().duration;
    let clock = cli
        .show_time
        .then(|| format!("{} / {}", format_clock(orchestrator.viewport().position), format_clock(duration)));
    draw_frame(orchestrator, canvas, text, clock.as_deref());

    let mut encoder = FfmpegEncoder::still(&output, cli.width, cli.height)?;
    encoder.write_frame(canvas.pixels())?;
    encoder.finish()?;

    log::info!("Done! Output: {}", output.display());
    Ok(())
}

fn render_video(
    cli: &Cli,
    input: &std::path::Path,
    orchestrator: &mut RenderOrchestrator,
    canvas: &mut Canvas,
    text: Option<&TextOverlay>,
) -> Result<()> {
    let duration = orchestrator.spectrogram().duration;
    if orchestrator.spectrogram().is_empty() {
        anyhow::bail!("Recording is empty, nothing to render");
    }

    let mut playback = Playback::new(duration);
    playback.seek(cli.start);
    let start = playback.position();
    let total_frames = ((duration - start) * cli.fps as f32).ceil().max(1.0) as u64;

    log::info!("Output: {}", cli.output.display());
    log::info!(
        "Resolution: {}x{} @ {}fps, {} frames from {}",
        cli.width,
        cli.height,
        cli.fps,
        total_frames,
        format_clock(start)
    );

    log::info!("Starting FFmpeg encoder...");
    let opts = VideoOptions {
        width: cli.width,
        height: cli.height,
        fps: cli.fps,
        codec: &cli.codec,
        pix_fmt: &cli.pix_fmt,
        crf: cli.crf,
    };
    let mut encoder = FfmpegEncoder::video(&cli.output, input, start, &opts)?;

    let pb = ProgressBar::new(total_frames);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} frames ({eta} remaining)")?
            .progress_chars("=>-"),
    );

    let dt = 1.0 / cli.fps as f32;
    let mut written = 0u64;
    playback.play();
    loop {
        let position = playback.position();
        orchestrator.set_position(position);
        let clock = cli
            .show_time
            .then(|| format!("{} / {}", format_clock(position), format_clock(duration)));
        draw_frame(orchestrator, canvas, text, clock.as_deref());

        encoder.write_frame(canvas.pixels())?;
        written += 1;
        pb.set_position(written);

        if written >= total_frames || !playback.advance(dt) {
            break;
        }
    }
    pb.finish_with_message("Rendering complete");

    let stats = orchestrator.stats();
    log::debug!(
        "Layer builds: lanes={}, grid={}, data={}, palette={}",
        stats.lane_builds,
        stats.grid_builds,
        stats.data_builds,
        stats.palette_builds
    );

    log::info!("Finishing encoding...");
    encoder.finish()?;

    log::info!("Done! Output: {}", cli.output.display());
    Ok(())
}

fn draw_frame(
    orchestrator: &mut RenderOrchestrator,
    canvas: &mut Canvas,
    text: Option<&TextOverlay>,
    clock: Option<&str>,
) {
    canvas.draw_layers(orchestrator.render(), text);

    if let (Some(overlay), Some(clock)) = (text, clock) {
        let width = overlay.measure_width(clock, CLOCK_SIZE) as f32;
        let x = canvas.width() as f32 - width - 10.0;
        overlay.draw(canvas, clock, x, 20.0, CLOCK_SIZE, false, Rgba::white(0.85));
    }
}

fn load_text_overlay(cli: &Cli) -> Option<TextOverlay> {
    let loaded = if let Some(ref url) = cli.font_url {
        load_font_from_url(url).and_then(|bytes| TextOverlay::from_bytes(&bytes))
    } else if let Some(path) = cli.font.clone().or_else(find_system_font) {
        log::info!("Using font {}", path.display());
        TextOverlay::from_path(&path)
    } else {
        log::warn!("No font found, labels disabled (use --font or --font-url)");
        return None;
    };

    match loaded {
        Ok(overlay) => Some(overlay),
        Err(err) => {
            log::warn!("Failed to load font, labels disabled: {:#}", err);
            None
        }
    }
}
