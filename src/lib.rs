//! Flappy Nerd simulation core.
//!
//! A [`Game`] owns the bird, the obstacle list, the score and the session high
//! score. A [`Session`] drives it from two independent periodic timers (a fast
//! physics tick and a slower obstacle spawn) supplied by any [`Scheduler`].
//! On `wasm32` the `web` module wires this to `setInterval` and DOM input.

pub mod config;
pub mod game;
pub mod obstacles;
pub mod physics;
pub mod render;
pub mod session;
pub mod spawner;
pub mod state;
pub mod timer;

#[cfg(target_arch = "wasm32")]
pub mod web;

pub use config::{Dimensions, FieldConfig, Sizing, Tuning};
pub use game::{Activation, EndCause, Game, Snapshot, Step};
pub use render::InstanceData;
pub use session::Session;
pub use spawner::{GapSource, RandomGaps, ScriptedGaps};
pub use state::{Bird, Obstacle, Phase, SimState};
pub use timer::{ManualScheduler, Scheduler};

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).ok();
}
