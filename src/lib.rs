#[cfg(not(target_arch = "wasm32"))]
pub mod app;
pub mod config;
pub mod demo;
pub mod game;
pub mod rendering;

pub const DEFAULT_MAX_FRAME_RATE: f32 = 60.0;

/// Input identifier shared by every touch, multi-touch is not distinguished.
pub const TOUCH_KEY: &str = "touch";
