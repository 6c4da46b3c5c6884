mod layout;
mod surface;
mod timer;

pub use layout::*;
pub use surface::*;
pub use timer::*;

use crate::{
    AppEvent,
    playback::{FrameSink, Speed, VideoFrame},
};
use fltk::{
    app::{self, Sender},
    button::Button,
    enums::{Align, Color, Event, Font},
    frame::Frame,
    prelude::*,
    window::Window,
};
use log::warn;

pub struct UserInterface {
    pub main_window: Window,
    pub video_window: Window,
    pub speed_label: Frame,
    #[allow(unused)]
    pub buttons: Vec<Button>,
}

impl UserInterface {
    /// Builds the fixed-size main window covering the primary screen's work
    /// area, with the video surface and transport grid laid out inside.
    pub fn make_window(title: &str, event_sender: Sender<AppEvent>) -> Self {
        let (work_x, work_y, work_w, work_h) = app::screen_work_area(0);
        let (width, height) = window_size(work_w, work_h);
        let geometry = GridGeometry::new(width, height);

        let mut main_window = Window::new(work_x, work_y, width, height, None);
        main_window.set_label(title);
        main_window.size_range(width, height, width, height);

        let video_rect = geometry.rect(VIDEO_CELL);
        let mut video_window =
            Window::new(video_rect.x, video_rect.y, video_rect.w, video_rect.h, None);
        video_window.set_color(Color::Black);
        video_window.end();

        let label_rect = geometry.rect(SPEED_LABEL_CELL);
        let mut speed_label =
            Frame::new(label_rect.x, label_rect.y, label_rect.w, label_rect.h, None);
        speed_label.set_label(&Speed::NORMAL.label());
        speed_label.set_label_font(Font::HelveticaBold);
        speed_label.set_label_color(Color::Black);
        speed_label.set_align(Align::Left | Align::Inside);

        let buttons = TRANSPORT_BUTTONS
            .iter()
            .map(|spec| {
                let rect = geometry.rect(spec.cell);
                let mut button = Button::new(rect.x, rect.y, rect.w, rect.h, spec.label);
                button.set_tooltip(spec.tooltip);
                button.set_color(Color::Light2);
                button.set_label_font(Font::HelveticaBold);
                button.emit(event_sender, AppEvent::Command(spec.command));
                button
            })
            .collect();

        main_window.end();
        main_window.set_callback(move |_| {
            if app::event() == Event::Close {
                event_sender.send(AppEvent::Command(TransportCommand::Close));
            }
        });

        Self {
            main_window,
            video_window,
            speed_label,
            buttons,
        }
    }
}

/// The observable half of the player: the frame surface and the speed label.
pub struct PlayerView<'a> {
    pub surface: WgpuState<'a>,
    pub speed_label: Frame,
}

impl FrameSink for PlayerView<'_> {
    fn show_frame(&mut self, frame: &VideoFrame) {
        if let Err(err) = self.surface.present_frame(frame) {
            warn!("failed to present frame {}: {err:#}", frame.index);
        }
    }

    fn show_speed(&mut self, text: &str) {
        self.speed_label.set_label(text);
        self.speed_label.redraw();
    }
}
