use std::path::PathBuf;

use clap::{Parser, Subcommand, Args};
use rust_game_objects::{
    config::{
        ConfigError,
        StageConfig
    },
    demo::DemoSettings,
    game::stage::StageError
};

/// # Global Arguments
#[derive(Debug, Parser)]
#[command(version, about = "2D game objects demo", long_about = None)]
struct Cli {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Subcommand)]
enum Mode {
    /// Run the collector demo without a window, steering the player automatically
    Headless(HeadlessArgs),

    /// Run the collector demo in a window
    Window(WindowArgs),
}

#[derive(Debug, Args)]
struct StageArgs {
    /// Stage config file (JSON)
    #[arg(short = 'c', long = "config", value_name = "CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Overrides the configured max frame rate
    #[arg(short = 'r', long = "fps", value_name = "MAX_FRAME_RATE")]
    max_frame_rate: Option<f32>,

    /// Number of coins on the field
    #[arg(short = 'n', long = "coins", value_name = "COINS", default_value_t = 8)]
    coins: usize,
}

#[derive(Debug, Args)]
struct HeadlessArgs {
    #[command(flatten)]
    stage: StageArgs,

    /// Stop after this many frames
    #[arg(short = 'f', long = "frames", value_name = "FRAMES")]
    frames: Option<u64>,
}

#[derive(Debug, Args)]
struct WindowArgs {
    #[command(flatten)]
    stage: StageArgs,

    /// Start with the autopilot steering
    #[arg(long = "autopilot")]
    autopilot: bool,
}

#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    ConfigError(#[from] ConfigError),

    #[error(transparent)]
    StageError(#[from] StageError),

    #[error("Runtime failed, reason='{0}'")]
    IoError(#[from] std::io::Error),

    #[error("Could not set Ctrl-C handler, reason='{0}'")]
    CtrlcError(#[from] ctrlc::Error),

    #[error(transparent)]
    WindowError(#[from] rust_game_objects::app::window::WindowError),
}

impl StageArgs {
    fn load_config(&self) -> Result<StageConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => StageConfig::from_json_file(path)?,
            None => StageConfig::default(),
        };
        if let Some(max_frame_rate) = self.max_frame_rate {
            config.max_frame_rate = max_frame_rate;
        }
        Ok(config)
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // browser builds start through `rendering::dom::run_demo`
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp_millis()
        .format_file(false)
        .format_line_number(true)
        .init();

    let cli_args = Cli::parse();
    log::info!("Got args: '{:?}'.", cli_args);

    let result = match cli_args.mode {
        Mode::Headless(headless_args) => {
            cli_headless::run(&headless_args.stage, headless_args.frames)
        },
        Mode::Window(window_args) => {
            cli_window::run(&window_args.stage, window_args.autopilot)
        },
    };

    if let Err(e) = result {
        log::error!("{e}");
        std::process::exit(1);
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod cli_headless {
    use rust_game_objects::{
        app::{
            run_stage,
            StageHandle
        },
        demo,
        game::{
            clock::TokioClock,
            math::Vector2F,
            stage::Stage
        },
        rendering::SceneSurface
    };

    use super::*;

    pub fn run(args: &StageArgs, frames: Option<u64>) -> Result<(), CliError> {
        let config = args.load_config()?;
        let rt = tokio::runtime::Runtime::new()?;

        rt.block_on(async move {
            let surface = SceneSurface::new(Vector2F::new(config.container_width, config.container_height));
            let scene = surface.scene();
            let mut stage = Stage::new(&config, surface, TokioClock::new())?;

            let settings = DemoSettings {
                coins: args.coins,
                autopilot: true,
                frame_limit: frames,
                ..Default::default()
            };
            let handle = demo::setup(&mut stage, &settings)?;

            let (stage_handle, mut signals) = StageHandle::channel();
            ctrlc::set_handler(move || {
                log::info!("Captured ctrl-C, stopping the stage...");
                stage_handle.stop();
            })?;

            run_stage(&mut stage, &mut signals).await;

            println!(
                "frames: {}, score: {}, nodes: {}",
                stage.frame_count(),
                handle.score.get(),
                scene.borrow().len()
            );
            Ok::<(), CliError>(())
        })
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod cli_window {
    use rust_game_objects::{
        app::window::run_window,
        demo,
        game::{
            clock::SystemClock,
            math::Vector2F,
            stage::Stage
        },
        rendering::SceneSurface
    };

    use super::*;

    pub fn run(args: &StageArgs, autopilot: bool) -> Result<(), CliError> {
        let config = args.load_config()?;
        let surface = SceneSurface::new(Vector2F::new(config.container_width, config.container_height));
        let scene = surface.scene();
        let mut stage = Stage::new(&config, surface, SystemClock::new())?;

        let settings = DemoSettings {
            coins: args.coins,
            autopilot,
            ..Default::default()
        };
        let handle = demo::setup(&mut stage, &settings)?;

        run_window(stage, scene, "Collector")?;
        println!("score: {}", handle.score.get());
        Ok(())
    }
}
