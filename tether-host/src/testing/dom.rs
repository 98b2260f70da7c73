//! Window, document, canvas, fetch and timing doubles.

use super::gpu::{MockCanvasContext, MockGpu};
use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tether_core::tasks::HostCx;
use tether_core::value::{
    HostArray, HostBytes, HostDict, HostException, HostObject, HostResult, HostValue,
};

fn arg(args: &[HostValue], index: usize) -> HostValue {
    args.get(index).cloned().unwrap_or_default()
}

/// A canned fetch response.
#[derive(Debug, Clone)]
pub struct MockRoute {
    status: u16,
    body: Vec<u8>,
}

impl MockRoute {
    /// Respond with `status` and `body`.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// The `window` global.
pub struct MockWindow {
    document: Arc<MockDocument>,
    navigator: HostDict,
    performance: Arc<MockPerformance>,
    routes: Mutex<HashMap<String, MockRoute>>,
}

impl MockWindow {
    /// Window with a document holding `canvas` and a navigator exposing
    /// `gpu`.
    pub fn new(gpu: Arc<MockGpu>, canvas: Arc<MockCanvas>) -> Self {
        let navigator = HostDict::new();
        navigator.insert("gpu", HostValue::Native(gpu));
        Self {
            document: Arc::new(MockDocument::new(canvas)),
            navigator,
            performance: Arc::new(MockPerformance::default()),
            routes: Mutex::new(HashMap::new()),
        }
    }

    /// Serve `route` for `url`.
    pub fn on_fetch(&self, url: impl Into<String>, route: MockRoute) -> &Self {
        self.routes.lock().insert(url.into(), route);
        self
    }

    /// The performance clock.
    pub fn performance(&self) -> &Arc<MockPerformance> {
        &self.performance
    }

    fn fetch(&self, cx: &HostCx, url: &str) -> HostValue {
        let route = self.routes.lock().get(url).cloned();
        let url = url.to_string();
        cx.spawn(async move {
            tokio::task::yield_now().await;
            match route {
                Some(route) => {
                    tracing::debug!(%url, status = route.status, "mock fetch");
                    Ok(HostValue::native(MockResponse::new(url, route)))
                }
                None => Err(HostException::type_error(format!("Failed to fetch {url}")).into()),
            }
        })
    }
}

impl HostObject for MockWindow {
    fn class_name(&self) -> &str {
        "Window"
    }

    fn get(&self, _cx: &HostCx, name: &str) -> HostResult<HostValue> {
        Ok(match name {
            "document" => HostValue::Native(self.document.clone()),
            "navigator" => HostValue::from(self.navigator.clone()),
            "performance" => HostValue::Native(self.performance.clone()),
            "Window" => HostValue::native(MockClass("Window")),
            _ => HostValue::Undefined,
        })
    }

    fn call(&self, cx: &HostCx, method: &str, args: &[HostValue]) -> HostResult<HostValue> {
        match method {
            "fetch" => match arg(args, 0).as_str() {
                Some(url) => Ok(self.fetch(cx, url)),
                None => {
                    let reason = HostException::type_error("fetch expects a URL string");
                    Ok(cx.rejected(reason.into()))
                }
            },
            "requestAnimationFrame" => {
                let callback = arg(args, 0);
                if !callback.is_function() {
                    return Err(HostException::type_error(concat!(
                        "Failed to execute 'requestAnimationFrame': ",
                        "parameter 1 is not of type 'Function'"
                    ))
                    .into());
                }
                Ok(HostValue::from(cx.tasks().request_animation_frame(callback)))
            }
            "cancelAnimationFrame" => {
                cx.tasks().cancel_animation_frame(arg(args, 0).to_u32());
                Ok(HostValue::Undefined)
            }
            _ => Err(HostException::type_error(format!(
                "Window.{method} is not a function"
            ))
            .into()),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A constructor object, only useful for presence checks.
pub struct MockClass(pub &'static str);

impl HostObject for MockClass {
    fn class_name(&self) -> &str {
        "Function"
    }

    fn get(&self, _cx: &HostCx, name: &str) -> HostResult<HostValue> {
        Ok(match name {
            "name" => HostValue::from(self.0),
            _ => HostValue::Undefined,
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// The document: a set of elements by id.
pub struct MockDocument {
    elements: Mutex<HashMap<String, HostValue>>,
}

impl MockDocument {
    /// Document holding `canvas` under its id.
    pub fn new(canvas: Arc<MockCanvas>) -> Self {
        let mut elements = HashMap::new();
        elements.insert(canvas.id.clone(), HostValue::Native(canvas));
        Self {
            elements: Mutex::new(elements),
        }
    }

    /// Add an element.
    pub fn insert(&self, id: impl Into<String>, element: HostValue) {
        self.elements.lock().insert(id.into(), element);
    }
}

impl HostObject for MockDocument {
    fn class_name(&self) -> &str {
        "Document"
    }

    fn call(&self, _cx: &HostCx, method: &str, args: &[HostValue]) -> HostResult<HostValue> {
        let query = arg(args, 0);
        let query = query.as_str().unwrap_or_default();
        match method {
            "getElementById" => {
                let found = self.elements.lock().get(query).cloned();
                Ok(found.unwrap_or(HostValue::Null))
            }
            "querySelectorAll" => {
                if query.is_empty() {
                    return Err(HostException::error(
                        "SyntaxError: '' is not a valid selector",
                    )
                    .into());
                }
                let tag = query.to_ascii_lowercase();
                let matches = self
                    .elements
                    .lock()
                    .values()
                    .filter(|e| {
                        tag == "*" || (tag == "canvas" && e.instance_of("HTMLCanvasElement"))
                    })
                    .cloned()
                    .collect();
                Ok(HostValue::Array(HostArray::from_vec(matches)))
            }
            _ => Err(HostException::type_error(format!(
                "Document.{method} is not a function"
            ))
            .into()),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A canvas element with a lazily created GPU context.
pub struct MockCanvas {
    id: String,
    size: Arc<Mutex<(u32, u32)>>,
    context: Arc<MockCanvasContext>,
}

impl MockCanvas {
    /// Canvas `id` sized `width` x `height`.
    pub fn new(id: impl Into<String>, width: u32, height: u32) -> Self {
        let size = Arc::new(Mutex::new((width, height)));
        Self {
            id: id.into(),
            context: Arc::new(MockCanvasContext::new(size.clone())),
            size,
        }
    }

    /// Current size.
    pub fn size(&self) -> (u32, u32) {
        *self.size.lock()
    }

    /// The GPU context.
    pub fn context(&self) -> &Arc<MockCanvasContext> {
        &self.context
    }
}

impl HostObject for MockCanvas {
    fn class_name(&self) -> &str {
        "HTMLCanvasElement"
    }

    fn get(&self, _cx: &HostCx, name: &str) -> HostResult<HostValue> {
        let (width, height) = self.size();
        Ok(match name {
            "width" => HostValue::from(width),
            "height" => HostValue::from(height),
            "id" => HostValue::from(self.id.as_str()),
            _ => HostValue::Undefined,
        })
    }

    fn set(&self, _cx: &HostCx, name: &str, value: HostValue) -> HostResult<()> {
        let mut size = self.size.lock();
        match name {
            "width" => size.0 = value.to_u32(),
            "height" => size.1 = value.to_u32(),
            _ => {}
        }
        Ok(())
    }

    fn call(&self, _cx: &HostCx, method: &str, args: &[HostValue]) -> HostResult<HostValue> {
        match method {
            "getContext" => Ok(match arg(args, 0).as_str() {
                Some("webgpu") => HostValue::Native(self.context.clone()),
                Some("2d" | "webgl" | "webgl2") => HostValue::Null,
                _ => {
                    return Err(HostException::type_error(
                        "getContext: unknown context type",
                    )
                    .into());
                }
            }),
            _ => Err(HostException::type_error(format!(
                "HTMLCanvasElement.{method} is not a function"
            ))
            .into()),
        }
    }

    fn instance_of(&self, class: &str) -> bool {
        matches!(class, "HTMLCanvasElement" | "HTMLElement" | "Element")
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A fetch response whose body can be read once.
pub struct MockResponse {
    url: String,
    status: u16,
    body: Mutex<Option<Vec<u8>>>,
}

impl MockResponse {
    fn new(url: String, route: MockRoute) -> Self {
        Self {
            url,
            status: route.status,
            body: Mutex::new(Some(route.body)),
        }
    }
}

impl HostObject for MockResponse {
    fn class_name(&self) -> &str {
        "Response"
    }

    fn get(&self, _cx: &HostCx, name: &str) -> HostResult<HostValue> {
        Ok(match name {
            "ok" => HostValue::Bool((200..300).contains(&self.status)),
            "status" => HostValue::from(u32::from(self.status)),
            "url" => HostValue::from(self.url.as_str()),
            "bodyUsed" => HostValue::Bool(self.body.lock().is_none()),
            _ => HostValue::Undefined,
        })
    }

    fn call(&self, cx: &HostCx, method: &str, _args: &[HostValue]) -> HostResult<HostValue> {
        match method {
            "arrayBuffer" => Ok(match self.body.lock().take() {
                Some(body) => cx.resolved(HostValue::Bytes(HostBytes::from_vec(body))),
                None => cx.rejected(HostException::type_error("body stream already read").into()),
            }),
            _ => Err(HostException::type_error(format!(
                "Response.{method} is not a function"
            ))
            .into()),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A manually advanced millisecond clock.
#[derive(Default)]
pub struct MockPerformance {
    now: Mutex<f64>,
}

impl MockPerformance {
    /// Move the clock forward.
    pub fn advance(&self, ms: f64) {
        *self.now.lock() += ms;
    }
}

impl HostObject for MockPerformance {
    fn class_name(&self) -> &str {
        "Performance"
    }

    fn call(&self, _cx: &HostCx, method: &str, _args: &[HostValue]) -> HostResult<HostValue> {
        match method {
            "now" => Ok(HostValue::Number(*self.now.lock())),
            _ => Err(HostException::type_error(format!(
                "Performance.{method} is not a function"
            ))
            .into()),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_core::promise::PromiseStatus;

    fn window() -> (Arc<MockCanvas>, HostValue) {
        let canvas = Arc::new(MockCanvas::new("gfx", 640, 480));
        let window = MockWindow::new(Arc::new(MockGpu::new()), canvas.clone());
        window.on_fetch("/tex.basis", MockRoute::new(200, b"sB\x00".to_vec()));
        (canvas, HostValue::native(window))
    }

    #[test]
    fn canvas_lookup_and_context() {
        let cx = HostCx::default();
        let (canvas, window) = window();
        let document = window.get_property(&cx, "document").unwrap();
        let found = document.call_method(&cx, "getElementById", &[HostValue::from("gfx")]).unwrap();
        assert!(found.instance_of("HTMLCanvasElement"));
        let missing = document
            .call_method(&cx, "getElementById", &[HostValue::from("nope")])
            .unwrap();
        assert!(missing.is_nullish());

        found.set_property(&cx, "width", HostValue::from(800u32)).unwrap();
        assert_eq!(canvas.size(), (800, 480));
        let ctx = found.call_method(&cx, "getContext", &[HostValue::from("webgpu")]).unwrap();
        assert!(ctx.instance_of("GPUCanvasContext"));
        let plain = found.call_method(&cx, "getContext", &[HostValue::from("2d")]).unwrap();
        assert!(plain.is_nullish());
    }

    #[tokio::test]
    async fn fetch_resolves_through_host_futures() {
        let cx = HostCx::default();
        let (_, window) = window();
        let fetch = |url: &str| match window.call_method(&cx, "fetch", &[HostValue::from(url)]) {
            Ok(HostValue::Promise(promise)) => promise,
            other => panic!("fetch returns a promise, got {other:?}"),
        };
        let ok = fetch("/tex.basis");
        let missing = fetch("/nope");
        for (promise, future) in cx.tasks().take_futures() {
            promise.settle(future.await.into());
        }
        assert_eq!(ok.status(), PromiseStatus::Fulfilled);
        assert_eq!(missing.status(), PromiseStatus::Rejected);

        let response = ok.outcome().unwrap().value().clone();
        assert_eq!(response.get_property(&cx, "status").unwrap().to_u32(), 200);
        let HostValue::Promise(body) = response.call_method(&cx, "arrayBuffer", &[]).unwrap() else {
            panic!("arrayBuffer returns a promise");
        };
        assert_eq!(body.status(), PromiseStatus::Fulfilled);
        let again = response.call_method(&cx, "arrayBuffer", &[]).unwrap();
        let HostValue::Promise(again) = again else {
            panic!("arrayBuffer returns a promise");
        };
        assert_eq!(again.status(), PromiseStatus::Rejected);
    }

    #[test]
    fn animation_frames_need_functions() {
        let cx = HostCx::default();
        let (_, window) = window();
        let err = window
            .call_method(&cx, "requestAnimationFrame", &[HostValue::from(1u32)])
            .unwrap_err();
        assert!(err.instance_of("TypeError"));
    }
}
