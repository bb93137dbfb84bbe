pub mod app_core;
mod input;
pub mod runtime;

pub use app_core::{
    AppError, AppEvent, AppState, ConfigPatch, PuzzleApp, PuzzleConfig, DEFAULT_TARGET_COUNT,
    SHUFFLE_SETTLE_MS, WIN_SETTLE_MS,
};
pub use runtime::{
    play_path, AppHooks, ContainerQuery, ImageHost, PaintSurface, StoreError, StringStore,
};

pub use tsugihagi_core;
