use std::cell::RefCell;
use std::rc::{Rc, Weak};
use viz_core::{FrameLoop, FrameScheduler};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys as web;

/// `requestAnimationFrame`-backed scheduler. Every fired frame calls
/// `FrameLoop::run_frame` on the loop it was built for.
struct RafScheduler {
    tick: Closure<dyn FnMut()>,
}

impl RafScheduler {
    fn new(frame_loop: Weak<RefCell<FrameLoop>>) -> Self {
        let tick = Closure::wrap(Box::new(move || {
            if let Some(frame_loop) = frame_loop.upgrade() {
                FrameLoop::run_frame(&frame_loop);
            }
        }) as Box<dyn FnMut()>);
        Self { tick }
    }
}

impl FrameScheduler for RafScheduler {
    fn request_frame(&mut self) -> u64 {
        let Some(w) = web::window() else {
            log::error!("[frame] no window to schedule on");
            return 0;
        };
        match w.request_animation_frame(self.tick.as_ref().unchecked_ref()) {
            Ok(id) => id as u64,
            Err(e) => {
                log::error!("[frame] requestAnimationFrame failed: {:?}", e);
                0
            }
        }
    }

    fn cancel_frame(&mut self, id: u64) {
        if let Some(w) = web::window() {
            let _ = w.cancel_animation_frame(id as i32);
        }
    }
}

/// A frame loop driven by the browser's display refresh.
pub fn animation_frame_loop() -> Rc<RefCell<FrameLoop>> {
    Rc::new_cyclic(|weak| RefCell::new(FrameLoop::new(Box::new(RafScheduler::new(weak.clone())))))
}
