mod adsr;
mod adv_controls;
mod analysis;
mod articulation;
mod block_diagram;
mod brightness;
mod buffers;
mod config;
mod controllers;
mod envelope;
mod fft_display;
mod filter;
mod freq_mod;
mod graph;
mod layout;
mod note;
mod operator;
mod other_controls;
mod output;
mod panel;
mod space;
mod spectrum;
mod touch;
mod widgets;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, mpsc};

use analysis::spawn_analysis;
use buffers::BufferBank;
use clap::Parser;
use config::{Config, DEFAULT_CONFIG_FILE};
use controllers::KeyboardController;
use env_logger::{Builder, Env};
use log::{info, warn};
use macroquad::prelude::*;
use note::FFT_SIZE;
use output::{AudioEngine, SharedPipeline, SynthPipeline};
use panel::Panel;
use tokio::runtime::Runtime;
use widgets::Pointer;

/// Rate assumed by the FFT axes when no output device is open.
const DISPLAY_SAMPLE_RATE: f32 = 44_100.0;

#[derive(Parser, Debug)]
#[command(name = "timbre-space")]
#[command(about = "Four-dimension timbre synthesizer with an FM editor")]
#[command(version)]
struct Cli {
    /// Config file path (defaults to ./timbre-space.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run the panel without opening an audio device
    #[arg(long)]
    no_audio: bool,
}

struct Startup {
    cli: Cli,
    config: Config,
}

static STARTUP: OnceLock<Startup> = OnceLock::new();

/// Parses arguments and loads the config once. `window_conf` runs before
/// `main`, so both read from here.
fn startup() -> &'static Startup {
    STARTUP.get_or_init(|| {
        let _ = Builder::from_env(Env::default().default_filter_or("info"))
            .format_timestamp(None)
            .try_init();

        let cli = Cli::parse();
        let source = match &cli.config {
            Some(path) => path.display().to_string(),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => DEFAULT_CONFIG_FILE.to_string(),
            None => "built-in defaults".to_string(),
        };
        let config = match Config::load(cli.config.as_deref()) {
            Ok(config) => {
                info!("config: {source}");
                config
            }
            Err(err) => {
                warn!("{err}; using built-in defaults");
                Config::default()
            }
        };
        Startup { cli, config }
    })
}

fn window_conf() -> Conf {
    let window = &startup().config.window;
    Conf {
        window_title: window.title.clone(),
        fullscreen: false,
        sample_count: 1,
        window_width: window.width,
        window_height: window.height,
        window_resizable: true,
        high_dpi: false,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    let startup = startup();
    let config = &startup.config;
    let runtime = Runtime::new().expect("tokio runtime");

    let buffers = BufferBank::shared();
    let (note_tx, note_rx) = mpsc::channel();
    let analysis = spawn_analysis(&runtime, buffers.clone(), FFT_SIZE);
    let pipeline: SharedPipeline = Arc::new(Mutex::new(SynthPipeline::new(
        buffers.clone(),
        note_rx,
        Some(analysis),
        &config.audio,
    )));

    let audio = if config.audio.enabled && !startup.cli.no_audio {
        match AudioEngine::start(pipeline.clone()) {
            Ok(engine) => Some(engine),
            Err(err) => {
                warn!("audio output unavailable ({err:#}), running without sound");
                None
            }
        }
    } else {
        info!("audio disabled");
        None
    };
    let sample_rate = audio
        .as_ref()
        .map_or(DISPLAY_SAMPLE_RATE, AudioEngine::sample_rate);

    let mut controller =
        KeyboardController::new(config.keyboard.base_note, config.keyboard.velocity);
    let mut panel = Panel::new(
        screen_width(),
        screen_height(),
        config.presets.clone(),
        sample_rate,
    );

    loop {
        panel.resize(screen_width(), screen_height());
        let pointer = Pointer::poll();

        if !panel.is_typing() {
            for event in controller.poll() {
                if note_tx.send(event).is_err() {
                    warn!("note channel closed");
                }
            }
        }

        if let Ok(mut bank) = buffers.lock() {
            panel.pull(&mut bank);
        }
        panel.update(&pointer);
        if let Ok(mut bank) = buffers.lock() {
            panel.push(&mut bank);
        }

        panel.draw(&controller.status());
        next_frame().await;
    }
}
