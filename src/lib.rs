pub mod color;
pub mod config;
pub mod error;
pub mod grant;
pub mod layout;
pub mod measure;
pub mod scale;

use wasm_bindgen::prelude::*;

use error::LayoutError;
use grant::parse_grants;
use layout::{LayoutEngine, LayoutMode};

/// Initialize panic hook for better error messages in WASM
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

/// Compute one chart layout from a JSON grant list, as JSON.
#[wasm_bindgen(js_name = "layoutGrants")]
pub fn layout_grants(
    dataset_json: &str,
    mode: &str,
    width: f64,
    height: f64,
) -> Result<String, JsValue> {
    layout_json(dataset_json, mode, width, height)
        .map_err(|e| js_sys::Error::new(&e.to_string()).into())
}

/// Names of the supported layout modes.
#[wasm_bindgen(js_name = "layoutModes")]
pub fn layout_modes() -> Vec<String> {
    LayoutMode::ALL.iter().map(|m| m.name().to_string()).collect()
}

pub fn layout_json(
    dataset_json: &str,
    mode: &str,
    width: f64,
    height: f64,
) -> Result<String, LayoutError> {
    let mode: LayoutMode = mode.parse()?;
    let grants = parse_grants(dataset_json)?;
    let layout = LayoutEngine::default().layout(mode, &grants, width, height)?;
    Ok(serde_json::to_string(&layout)?)
}
