#![cfg(target_arch = "wasm32")]
//! Browser front-end: binds the visualizer core to a canvas, WebGPU/WebGL,
//! WebAudio and pointer input, and exports the session to JavaScript.

mod audio;
mod controls;
mod dom;
mod frame;
mod loaders;
mod overlay;
mod params;
mod render;

use std::cell::RefCell;
use std::rc::Rc;
use viz_core::{LoadOutcome, Mode, Scene, Services, Visualizer, VisualizerConfig, VizError};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys as web;

const DEVICE_MESSAGE: &str = "This browser cannot create a WebGPU or WebGL2 context, so the \
visualizer cannot run. Try a recent Chrome, Edge, Firefox or Safari with hardware acceleration \
enabled.";

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).ok();
    log::info!("viz-web loaded");
    Ok(())
}

fn to_js(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn any_to_js(err: anyhow::Error) -> JsValue {
    JsValue::from_str(&format!("{err:#}"))
}

/// One visualizer bound to a container element.
#[wasm_bindgen]
pub struct AudioVisualizer {
    session: Rc<RefCell<Visualizer>>,
    canvas: web::HtmlCanvasElement,
    listeners: Vec<dom::Listener>,
}

#[wasm_bindgen]
impl AudioVisualizer {
    /// Create a canvas inside `#container_id`, open a rendering device and
    /// start the frame loop in 3D mode.
    pub async fn init(container_id: String) -> Result<AudioVisualizer, JsValue> {
        let document = dom::window_document().ok_or_else(|| to_js("no document"))?;
        let container = document
            .get_element_by_id(&container_id)
            .ok_or_else(|| to_js(format!("missing #{container_id}")))?;
        let canvas = dom::create_canvas(&document, &container).map_err(any_to_js)?;
        let (width, height) = dom::sync_canvas_backing_size(&canvas);

        let gpu = match render::GpuState::new(&canvas).await {
            Ok(gpu) => gpu,
            Err(err) => {
                log::error!("[render] {}", err);
                overlay::show_message(&document, &container, DEVICE_MESSAGE);
                return Err(to_js(err));
            }
        };
        log::info!("[render] using {:?}", gpu.backend());
        overlay::hide(&document);
        let canvas = gpu.canvas().clone();

        let config = VisualizerConfig::default();
        let camera = config.camera(width as f32, height as f32);
        let controls = controls::OrbitControls::new(&canvas, &camera).map_err(any_to_js)?;
        let session = Visualizer::new(
            config,
            frame::animation_frame_loop(),
            Rc::new(loaders::HttpImageDecoder),
        )
        .with_model_decoder(Rc::new(loaders::JsModelDecoder));
        let session = Rc::new(RefCell::new(session));
        session
            .borrow_mut()
            .init(Services {
                surface: Box::new(gpu),
                scene: Box::new(Scene::new(camera, width as f32, height as f32)),
                controls: Some(Box::new(controls)),
            })
            .map_err(to_js)?;
        Visualizer::start(&session);

        let mut viz = AudioVisualizer {
            session,
            canvas,
            listeners: Vec::new(),
        };
        let window = web::window().ok_or_else(|| to_js("no window"))?;
        let session = viz.session.clone();
        let canvas = viz.canvas.clone();
        viz.listeners.push(
            dom::Listener::new(window.as_ref(), "resize", move |_| {
                resize(&session, &canvas);
            })
            .map_err(any_to_js)?,
        );
        Ok(viz)
    }

    /// Route a playing `<audio>`/`<video>` element into the analyser. Only
    /// the first call binds an element; later calls resume its context.
    #[wasm_bindgen(js_name = connectAudio)]
    pub fn connect_audio(&self, element: web::HtmlMediaElement) -> Result<(), JsValue> {
        let mut session = self.session.borrow_mut();
        if session.resume_audio() {
            return Ok(());
        }
        let source = audio::AnalyserSource::new(element).map_err(any_to_js)?;
        session.connect_audio(Box::new(source)).map_err(any_to_js)
    }

    #[wasm_bindgen(js_name = getMode)]
    pub fn get_mode(&self) -> String {
        self.session.borrow().mode().to_string()
    }

    #[wasm_bindgen(js_name = switchMode)]
    pub fn switch_mode(&self, mode: &str) -> Result<(), JsValue> {
        let mode: Mode = mode.parse().map_err(to_js)?;
        self.session.borrow_mut().switch_mode(mode).map_err(to_js)
    }

    #[wasm_bindgen(js_name = switchModeAndReset)]
    pub fn switch_mode_and_reset(&self, mode: &str) -> Result<(), JsValue> {
        let mode: Mode = mode.parse().map_err(to_js)?;
        self.session.borrow_mut().switch_mode_and_reset(mode).map_err(to_js)
    }

    /// Resolves to `true` when installed, `false` when a newer request
    /// superseded this one.
    #[wasm_bindgen(js_name = setImage)]
    pub fn set_image(&self, url: String) -> js_sys::Promise {
        let session = self.session.clone();
        future_to_promise(async move { outcome(Visualizer::set_image(session, url).await) })
    }

    #[wasm_bindgen(js_name = setModel)]
    pub fn set_model(&self, url: String, extension: String) -> js_sys::Promise {
        let session = self.session.clone();
        future_to_promise(async move {
            outcome(Visualizer::set_model(session, url, extension).await)
        })
    }

    #[wasm_bindgen(js_name = listShaders2D)]
    pub fn list_shaders_2d(&self) -> JsValue {
        params::summaries_to_js(&self.session.borrow().list_shaders_2d())
    }

    #[wasm_bindgen(js_name = listShaders3D)]
    pub fn list_shaders_3d(&self) -> JsValue {
        params::summaries_to_js(&self.session.borrow().list_shaders_3d())
    }

    #[wasm_bindgen(js_name = changeShader2D)]
    pub fn change_shader_2d(&self, id: &str) -> String {
        self.session.borrow_mut().change_shader_2d(id).to_string()
    }

    #[wasm_bindgen(js_name = changeShader3D)]
    pub fn change_shader_3d(&self, id: &str) -> String {
        self.session.borrow_mut().change_shader_3d(id).to_string()
    }

    #[wasm_bindgen(js_name = getCurrentShaderParams2D)]
    pub fn current_shader_params_2d(&self) -> JsValue {
        params::params_to_js(&self.session.borrow().current_shader_params_2d())
    }

    #[wasm_bindgen(js_name = getCurrentShaderParams3D)]
    pub fn current_shader_params_3d(&self) -> JsValue {
        params::params_to_js(&self.session.borrow().current_shader_params_3d())
    }

    /// Returns whether the value was stored; unknown names are ignored.
    #[wasm_bindgen(js_name = setParameter2D)]
    pub fn set_parameter_2d(&self, name: &str, value: JsValue) -> bool {
        params::uniform_from_js(&value)
            .map(|v| self.session.borrow_mut().set_parameter_2d(name, v))
            .unwrap_or(false)
    }

    #[wasm_bindgen(js_name = setParameter3D)]
    pub fn set_parameter_3d(&self, name: &str, value: JsValue) -> bool {
        params::uniform_from_js(&value)
            .map(|v| self.session.borrow_mut().set_parameter_3d(name, v))
            .unwrap_or(false)
    }

    #[wasm_bindgen(js_name = setRotationSpeed)]
    pub fn set_rotation_speed(&self, value: f32) {
        self.session.borrow_mut().set_rotation_speed(value);
    }

    #[wasm_bindgen(js_name = onViewportResize)]
    pub fn on_viewport_resize(&self) {
        resize(&self.session, &self.canvas);
    }

    /// Stop rendering and release every resource. Later calls report a
    /// missing context.
    pub fn teardown(&mut self) {
        self.listeners.clear();
        self.session.borrow_mut().teardown();
        self.canvas.remove();
    }
}

fn resize(session: &Rc<RefCell<Visualizer>>, canvas: &web::HtmlCanvasElement) {
    let (width, height) = dom::sync_canvas_backing_size(canvas);
    match session.try_borrow_mut() {
        Ok(mut session) => session.on_viewport_resize(width as f32, height as f32),
        Err(_) => log::warn!("[session] resize skipped: session busy"),
    }
}

fn outcome(result: Result<LoadOutcome, VizError>) -> Result<JsValue, JsValue> {
    result
        .map(|o| JsValue::from_bool(o == LoadOutcome::Installed))
        .map_err(to_js)
}
