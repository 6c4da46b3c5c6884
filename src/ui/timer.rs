use crate::{AppEvent, playback::FrameTimer};
use fltk::app::{self, Sender, TimeoutHandle};
use std::{cell::Cell, rc::Rc, time::Duration};

/// Repeating FLTK timeout that posts [`AppEvent::Tick`] to the event loop.
///
/// The callback re-arms itself with whatever interval is current, so changing
/// the interval takes effect on the next tick without stopping the timer.
pub struct FltkFrameTimer {
    sender: Sender<AppEvent>,
    interval: Rc<Cell<Duration>>,
    handle: Option<TimeoutHandle>,
}

impl FltkFrameTimer {
    pub fn new(sender: Sender<AppEvent>) -> Self {
        Self {
            sender,
            interval: Rc::new(Cell::new(Duration::from_millis(1000))),
            handle: None,
        }
    }
}

impl FrameTimer for FltkFrameTimer {
    fn start(&mut self, interval: Duration) {
        self.interval.set(interval);
        if self.handle.is_some() {
            return;
        }

        let sender = self.sender;
        let shared = self.interval.clone();
        self.handle = Some(app::add_timeout3(interval.as_secs_f64(), move |handle| {
            sender.send(AppEvent::Tick);
            app::repeat_timeout3(shared.get().as_secs_f64(), handle);
        }));
    }

    fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            app::remove_timeout3(handle);
        }
    }

    fn set_interval(&mut self, interval: Duration) {
        self.interval.set(interval);
    }

    fn is_active(&self) -> bool {
        self.handle.is_some()
    }
}
