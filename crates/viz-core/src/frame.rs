//! Continuously rescheduled per-frame callback.
//!
//! The host drives the loop through a [`FrameScheduler`] and calls
//! [`FrameLoop::run_frame`] whenever a requested frame fires. Pauses nest:
//! every [`FrameLoop::pause`] returns a token that must be handed back to
//! [`FrameLoop::resume`], and the loop only restarts once the outermost
//! pause is released.

use crate::error::VizError;
use std::cell::RefCell;
use std::rc::Rc;

/// Host primitive for requesting a single future frame.
pub trait FrameScheduler {
    /// Request one call to `FrameLoop::run_frame`; returns a cancellable id.
    fn request_frame(&mut self) -> u64;
    fn cancel_frame(&mut self, id: u64);
}

pub type FrameCallback = Box<dyn FnMut() -> anyhow::Result<()>>;

/// Proof of one outstanding pause. Hand it back to [`FrameLoop::resume`].
#[must_use = "a pause that is never resumed keeps the loop stopped"]
#[derive(Debug)]
pub struct PauseToken {
    was_running: bool,
}

impl PauseToken {
    /// Whether a frame was scheduled when this pause was taken.
    pub fn was_running(&self) -> bool {
        self.was_running
    }
}

pub struct FrameLoop {
    scheduler: Box<dyn FrameScheduler>,
    callback: Option<FrameCallback>,
    pending: Option<u64>,
    started: bool,
    pause_depth: u32,
    resume_on_release: bool,
    generation: u64,
    faults: u64,
}

impl FrameLoop {
    pub fn new(scheduler: Box<dyn FrameScheduler>) -> Self {
        Self {
            scheduler,
            callback: None,
            pending: None,
            started: false,
            pause_depth: 0,
            resume_on_release: false,
            generation: 0,
            faults: 0,
        }
    }

    /// A frame is currently scheduled.
    pub fn is_running(&self) -> bool {
        self.pending.is_some()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn pause_depth(&self) -> u32 {
        self.pause_depth
    }

    /// Number of callback invocations that returned an error.
    pub fn fault_count(&self) -> u64 {
        self.faults
    }

    fn schedule(&mut self) {
        if self.pending.is_none() {
            self.pending = Some(self.scheduler.request_frame());
        }
    }

    fn cancel(&mut self) {
        if let Some(id) = self.pending.take() {
            self.scheduler.cancel_frame(id);
        }
    }

    pub fn start(&mut self, callback: FrameCallback) {
        if self.started {
            log::warn!("[frame] start ignored: loop already running");
            return;
        }
        self.callback = Some(callback);
        self.started = true;
        self.generation += 1;
        if self.pause_depth == 0 {
            self.schedule();
        } else {
            self.resume_on_release = true;
        }
    }

    pub fn pause(&mut self) -> PauseToken {
        let was_running = self.pending.is_some();
        if self.pause_depth == 0 {
            self.resume_on_release = was_running;
        }
        self.cancel();
        self.pause_depth = self.pause_depth.saturating_add(1);
        PauseToken { was_running }
    }

    /// Release one pause. Scheduling restarts only when the last pause is
    /// released, the loop was running when the first one was taken, and no
    /// frame is already scheduled.
    pub fn resume(&mut self, _token: PauseToken) {
        if self.pause_depth == 0 {
            log::warn!("[frame] resume without matching pause");
            return;
        }
        self.pause_depth -= 1;
        if self.pause_depth > 0 {
            return;
        }
        if std::mem::take(&mut self.resume_on_release) && self.callback.is_some() {
            self.schedule();
        }
    }

    /// Cancel scheduling and drop the callback.
    pub fn stop(&mut self) {
        self.cancel();
        self.callback = None;
        self.started = false;
        self.resume_on_release = false;
        self.generation += 1;
    }

    /// Entry point for the host when a requested frame fires.
    ///
    /// The next frame is requested before the callback runs, so an error
    /// returned by the callback is logged and the chain continues.
    pub fn run_frame(this: &Rc<RefCell<Self>>) {
        let (mut callback, generation) = {
            let mut me = this.borrow_mut();
            me.pending = None;
            if me.pause_depth > 0 {
                return;
            }
            let Some(callback) = me.callback.take() else {
                return;
            };
            me.schedule();
            (callback, me.generation)
        };

        if let Err(err) = callback() {
            let fault = VizError::CallbackFault(format!("{err:#}"));
            log::error!("[frame] {}", fault);
            this.borrow_mut().faults += 1;
        }

        let mut me = this.borrow_mut();
        if me.generation == generation && me.callback.is_none() {
            me.callback = Some(callback);
        }
    }
}
