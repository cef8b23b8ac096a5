//! Graphics capability check run before mounting

use quadview_core::InitError;

/// Shown in place of the canvas when no graphics backend is available
pub const FALLBACK_MESSAGE: &str = "3D model viewer not available. \
Your browser does not support WebGL, which is required to display the interactive drone model.";

/// WebGPU when built with `webgpu`, otherwise a WebGL2 context
#[cfg(target_arch = "wasm32")]
pub fn check_graphics() -> Result<(), InitError> {
    let window = web_sys::window().ok_or_else(|| InitError::NoGraphics("no window".to_string()))?;

    #[cfg(feature = "webgpu")]
    {
        let navigator = window.navigator();
        if js_sys::Reflect::has(&navigator, &"gpu".into()).unwrap_or(false) {
            return Ok(());
        }
        tracing::warn!("navigator.gpu missing; checking WebGL2");
    }

    use wasm_bindgen::JsCast;
    let document = window
        .document()
        .ok_or_else(|| InitError::NoGraphics("no document".to_string()))?;
    let canvas: web_sys::HtmlCanvasElement = document
        .create_element("canvas")
        .map_err(|e| InitError::NoGraphics(format!("{:?}", e)))?
        .dyn_into()
        .map_err(|_| InitError::NoGraphics("canvas cast failed".to_string()))?;

    match canvas.get_context("webgl2") {
        Ok(Some(_)) => Ok(()),
        Ok(None) => Err(InitError::NoGraphics("WebGL2 context unavailable".to_string())),
        Err(e) => Err(InitError::NoGraphics(format!("{:?}", e))),
    }
}

/// Desktop builds always have a surface; wgpu reports adapter failures itself
#[cfg(not(target_arch = "wasm32"))]
pub fn check_graphics() -> Result<(), InitError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_native_check_passes() {
        assert!(check_graphics().is_ok());
    }

    #[test]
    fn test_init_error_text() {
        let err = InitError::NoGraphics("WebGL2 context unavailable".to_string());
        assert_eq!(
            err.to_string(),
            "Failed to initialize 3D viewer: WebGL2 context unavailable. Your browser may not support WebGL."
        );
    }
}
