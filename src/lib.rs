//! Iron House core crate.
//!
//! The "break the iron house" panel of the Dawn page: a dark box the visitor
//! strikes until it shatters, with shards, cracks and sparks drawn per strike
//! and Lu Xun's lines staged over it. `mount_iron_house()` is the JS entry
//! point; the simulation itself lives in plain Rust (`surface`) so it runs and
//! tests without a browser. The page's two small helpers ride along: the
//! empathy responder client and the manifesto signature flag.

use wasm_bindgen::prelude::*;

pub mod config;
pub mod empathy;
#[cfg(feature = "logging")]
mod logging;
pub mod manifesto;
pub mod rng;
pub mod surface;

pub use config::SurfaceConfig;
pub use surface::{
    DIALOGUES, Dialogue, FractureSurface, Frame, InteractionState, IronHouseHandle, Strike,
    mount_iron_house,
};

// Optional small allocator for size (feature gated)
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn wasm_start() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
    #[cfg(feature = "logging")]
    logging::init();
}

/// Strikes needed to break the house with the default config.
#[wasm_bindgen]
pub fn default_threshold() -> u32 {
    SurfaceConfig::default().threshold
}

/// Dialogue pairs as JSON `[{"quote": .., "reality": ..}, ..]` for hosts that
/// render their own overlay.
#[wasm_bindgen]
pub fn dialogues_json() -> String {
    let pairs: Vec<serde_json::Value> = DIALOGUES
        .iter()
        .map(|d| serde_json::json!({ "quote": d.quote, "reality": d.reality }))
        .collect();
    serde_json::Value::Array(pairs).to_string()
}
