//! Orbit-style camera controls: left drag rotates around the target, the
//! wheel zooms within the configured distance limits.

use crate::dom::Listener;
use glam::Vec3;
use std::cell::RefCell;
use std::rc::Rc;
use viz_core::constants::{
    ORBIT_MAX_DISTANCE, ORBIT_MIN_DISTANCE, ORBIT_ROTATE_SPEED, ORBIT_ZOOM_SPEED,
};
use viz_core::{Camera, InteractionControls};
use wasm_bindgen::JsCast;
use web_sys as web;

const PITCH_LIMIT: f32 = std::f32::consts::FRAC_PI_2 - 0.01;

#[derive(Clone, Copy, Debug)]
struct Pose {
    yaw: f32,
    pitch: f32,
    distance: f32,
}

impl Pose {
    fn of(camera: &Camera) -> Self {
        let offset = camera.eye - camera.target;
        let distance = offset.length().max(ORBIT_MIN_DISTANCE);
        Self {
            yaw: offset.x.atan2(offset.z),
            pitch: (offset.y / distance).clamp(-1.0, 1.0).asin(),
            distance,
        }
    }

    fn offset(&self) -> Vec3 {
        let (sy, cy) = self.yaw.sin_cos();
        let (sp, cp) = self.pitch.sin_cos();
        Vec3::new(sy * cp, sp, cy * cp) * self.distance
    }
}

#[derive(Debug, Default)]
struct Input {
    enabled: bool,
    dragging: Option<i32>,
    last: (f32, f32),
    rotate: (f32, f32),
    zoom: f32,
}

pub struct OrbitControls {
    input: Rc<RefCell<Input>>,
    initial: Pose,
    pose: Pose,
    target: Vec3,
    listeners: Vec<Listener>,
}

impl OrbitControls {
    pub fn new(canvas: &web::HtmlCanvasElement, camera: &Camera) -> anyhow::Result<Self> {
        let input = Rc::new(RefCell::new(Input::default()));
        let target: &web::EventTarget = canvas.as_ref();
        let mut listeners = Vec::with_capacity(5);

        {
            let input = input.clone();
            let canvas = canvas.clone();
            listeners.push(Listener::new(target, "pointerdown", move |ev| {
                let Some(ev) = ev.dyn_ref::<web::PointerEvent>() else {
                    return;
                };
                let mut guard = input.borrow_mut();
                let i = &mut *guard;
                if !i.enabled || ev.button() != 0 {
                    return;
                }
                i.dragging = Some(ev.pointer_id());
                i.last = (ev.client_x() as f32, ev.client_y() as f32);
                let _ = canvas.set_pointer_capture(ev.pointer_id());
            })?);
        }
        {
            let input = input.clone();
            listeners.push(Listener::new(target, "pointermove", move |ev| {
                let Some(ev) = ev.dyn_ref::<web::PointerEvent>() else {
                    return;
                };
                let mut guard = input.borrow_mut();
                let i = &mut *guard;
                if i.dragging != Some(ev.pointer_id()) {
                    return;
                }
                let (x, y) = (ev.client_x() as f32, ev.client_y() as f32);
                i.rotate.0 += x - i.last.0;
                i.rotate.1 += y - i.last.1;
                i.last = (x, y);
            })?);
        }
        for kind in ["pointerup", "pointercancel"] {
            let input = input.clone();
            listeners.push(Listener::new(target, kind, move |ev| {
                if let Some(ev) = ev.dyn_ref::<web::PointerEvent>() {
                    let mut guard = input.borrow_mut();
                    let i = &mut *guard;
                    if i.dragging == Some(ev.pointer_id()) {
                        i.dragging = None;
                    }
                }
            })?);
        }
        {
            let input = input.clone();
            listeners.push(Listener::new(target, "wheel", move |ev| {
                let Some(wheel) = ev.dyn_ref::<web::WheelEvent>() else {
                    return;
                };
                let mut guard = input.borrow_mut();
                let i = &mut *guard;
                if !i.enabled {
                    return;
                }
                i.zoom += wheel.delta_y() as f32;
                ev.prevent_default();
            })?);
        }

        let pose = Pose::of(camera);
        Ok(Self {
            input,
            initial: pose,
            pose,
            target: camera.target,
            listeners,
        })
    }

    fn apply(&self, camera: &mut Camera) {
        camera.target = self.target;
        camera.eye = self.target + self.pose.offset();
    }
}

impl InteractionControls for OrbitControls {
    fn set_enabled(&mut self, enabled: bool) {
        let mut input = self.input.borrow_mut();
        input.enabled = enabled;
        if !enabled {
            *input = Input::default();
        }
    }

    fn is_enabled(&self) -> bool {
        self.input.borrow().enabled
    }

    fn update(&mut self, camera: &mut Camera) {
        let (rotate, zoom) = {
            let mut input = self.input.borrow_mut();
            (
                std::mem::take(&mut input.rotate),
                std::mem::take(&mut input.zoom),
            )
        };
        if rotate == (0.0, 0.0) && zoom == 0.0 {
            return;
        }
        self.pose.yaw -= rotate.0 * ORBIT_ROTATE_SPEED;
        self.pose.pitch =
            (self.pose.pitch + rotate.1 * ORBIT_ROTATE_SPEED).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        let factor = (zoom * 0.001 * ORBIT_ZOOM_SPEED).exp();
        self.pose.distance =
            (self.pose.distance * factor).clamp(ORBIT_MIN_DISTANCE, ORBIT_MAX_DISTANCE);
        self.apply(camera);
    }

    fn reset(&mut self, camera: &mut Camera) {
        {
            let mut input = self.input.borrow_mut();
            input.rotate = (0.0, 0.0);
            input.zoom = 0.0;
            input.dragging = None;
        }
        self.pose = self.initial;
        self.apply(camera);
    }

    fn dispose(&mut self) {
        self.listeners.clear();
        self.set_enabled(false);
    }
}
