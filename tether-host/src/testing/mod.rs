//! Mock host objects for testing bridges without a browser.
//!
//! [`MockEnvironment`] assembles a window, navigator, GPU, canvas and
//! transcoder into a global object and keeps typed handles to each so
//! tests can assert on what the guest did.
//!
//! # Example
//!
//! ```ignore
//! use tether_host::testing::MockEnvironment;
//!
//! let env = MockEnvironment::new();
//! let mut bridge = Bridge::builder().globals(env.globals()).build()?;
//! bridge.init(wasm_bytes).await?;
//! bridge.start().await?;
//! assert_eq!(env.device().map(|d| d.queue().submitted()), Some(1));
//! ```

pub mod basis;
pub mod dom;
pub mod gpu;

pub use basis::{FORMAT_RGBA32, MockBasis, MockBasisFile, transcoded_size};
pub use dom::{MockCanvas, MockDocument, MockPerformance, MockResponse, MockRoute, MockWindow};
pub use gpu::{
    MockAdapter, MockCanvasContext, MockDevice, MockEncoder, MockGpu, MockQueue, MockResource,
};

use std::sync::Arc;
use tether_core::value::{HostDict, HostValue};

/// Id of the canvas every environment starts with.
pub const CANVAS_ID: &str = "canvas";

/// A complete set of mock globals.
pub struct MockEnvironment {
    globals: HostDict,
    window: Arc<MockWindow>,
    gpu: Arc<MockGpu>,
    canvas: Arc<MockCanvas>,
    basis: Arc<MockBasis>,
}

impl MockEnvironment {
    /// Environment with a working GPU and a 640x480 canvas.
    pub fn new() -> Self {
        Self::with_gpu(MockGpu::new())
    }

    /// Environment around a specific GPU, e.g. [`MockGpu::unavailable`].
    pub fn with_gpu(gpu: MockGpu) -> Self {
        let gpu = Arc::new(gpu);
        let canvas = Arc::new(MockCanvas::new(CANVAS_ID, 640, 480));
        let window = Arc::new(MockWindow::new(gpu.clone(), canvas.clone()));
        let basis = Arc::new(MockBasis::new());
        let cx = tether_core::tasks::HostCx::default();

        let globals = HostDict::new();
        let window_value = HostValue::Native(window.clone());
        globals.insert("window", window_value.clone());
        globals.insert("self", window_value.clone());
        globals.insert("BASIS", HostValue::Native(basis.clone()));
        for name in ["document", "navigator", "performance"] {
            globals.insert(name, window_value.get_property(&cx, name).unwrap_or_default());
        }

        Self {
            globals,
            window,
            gpu,
            canvas,
            basis,
        }
    }

    /// The global object to hand to the bridge builder.
    pub fn globals(&self) -> HostDict {
        self.globals.clone()
    }

    /// The window.
    pub fn window(&self) -> &Arc<MockWindow> {
        &self.window
    }

    /// The GPU behind `navigator.gpu`.
    pub fn gpu(&self) -> &Arc<MockGpu> {
        &self.gpu
    }

    /// The canvas registered under [`CANVAS_ID`].
    pub fn canvas(&self) -> &Arc<MockCanvas> {
        &self.canvas
    }

    /// The transcoder module.
    pub fn basis(&self) -> &Arc<MockBasis> {
        &self.basis
    }

    /// The device, when the GPU has an adapter.
    pub fn device(&self) -> Option<&Arc<MockDevice>> {
        self.gpu.adapter().map(|adapter| adapter.device())
    }
}

impl Default for MockEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

/// Globals of a fresh [`MockEnvironment`].
pub fn default_globals() -> HostDict {
    MockEnvironment::new().globals()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marshal::resolve;
    use tether_core::tasks::HostCx;

    #[test]
    fn globals_expose_the_page() {
        let env = MockEnvironment::new();
        let cx = HostCx::default();
        let globals = HostValue::from(env.globals());
        assert!(resolve(&cx, &globals, "navigator.gpu").unwrap().instance_of("GPU"));
        assert!(resolve(&cx, &globals, "globalThis.window").unwrap().instance_of("Window"));
        assert!(resolve(&cx, &globals, "BASIS.BasisFile").unwrap().is_object());
        assert!(resolve(&cx, &globals, "globalThis.global").unwrap().is_nullish());
        assert!(env.device().is_some());
    }

    #[test]
    fn unavailable_gpu_has_no_device() {
        let env = MockEnvironment::with_gpu(MockGpu::unavailable());
        assert!(env.device().is_none());
    }
}
