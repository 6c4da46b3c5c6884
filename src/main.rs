mod ff_interop;
mod playback;
mod ui;

use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use ff_interop::video_player::FfmpegVideoDecoder;
use fltk::{app, prelude::*};
use log::{error, info, warn};
use playback::{PlaybackController, PullOutcome};
use std::path::{Path, PathBuf};
use ui::{FltkFrameTimer, PlayerView, TransportCommand, UserInterface};

pub const APP_TITLE_AND_VERSION: &str =
    concat!(env!("CARGO_PKG_NAME"), " v", env!("CARGO_PKG_VERSION"));

/// Play a video file with frame-stepping transport controls.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Video file to open
    path: PathBuf,

    /// Start this many seconds into the video
    #[arg(short, long, value_name = "SECONDS", default_value_t = 0)]
    skip: u64,
}

#[derive(Debug, Copy, Clone)]
pub enum AppEvent {
    Tick,
    ResizePreview(u32, u32),
    RedrawPreview,
    Command(TransportCommand),
}

type Session = PlaybackController<FfmpegVideoDecoder, FltkFrameTimer>;

fn open_session(
    path: &Path,
    skip_seconds: u64,
    event_sender: app::Sender<AppEvent>,
) -> anyhow::Result<Session> {
    let decoder = FfmpegVideoDecoder::open(path)?;
    PlaybackController::open(decoder, FltkFrameTimer::new(event_sender), skip_seconds)
}

struct MainApp<'a> {
    fltk_app: app::App,
    event_receiver: app::Receiver<AppEvent>,
    #[allow(unused)]
    fltk_ui: UserInterface,
    view: PlayerView<'a>,
    session: Option<Session>,
}

impl MainApp<'_> {
    pub fn new(cli: &Cli) -> anyhow::Result<Self> {
        info!("starting up!");
        info!("{APP_TITLE_AND_VERSION}");

        let fltk_app = app::App::default().with_scheme(app::Scheme::Oxy);
        let (event_sender, event_receiver) = app::channel::<AppEvent>();
        info!("created fltk app");

        let file_name = cli
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| cli.path.display().to_string());
        let title = format!("{APP_TITLE_AND_VERSION} - {file_name}");
        let mut ui = UserInterface::make_window(&title, event_sender);
        ui.main_window.show();
        info!("initialized main window");

        ui.video_window.resize_callback(move |_, _, _, w, h| {
            event_sender.send(AppEvent::ResizePreview(w as u32, h as u32));
        });
        ui.video_window.draw(move |_| event_sender.send(AppEvent::RedrawPreview));
        ui.video_window.show();

        let surface = futures_lite::future::block_on(ui::WgpuState::new(ui.video_window.clone()))
            .context("failed to initialize the video surface")?;
        if let Err(err) = surface.redraw() {
            warn!("initial redraw failed: {err:#}");
        }
        info!("initialized wgpu & video rendering");

        let session = match open_session(&cli.path, cli.skip, event_sender) {
            Ok(session) => Some(session),
            Err(err) => {
                error!("unable to open {:?}: {err:#}", cli.path);
                fltk::dialog::alert_default(&format!(
                    "Unable to load file:\n{err:#}\nat \"{}\"",
                    cli.path.display()
                ));
                None
            }
        };

        let view = PlayerView {
            surface,
            speed_label: ui.speed_label.clone(),
        };

        Ok(Self {
            fltk_app,
            event_receiver,
            fltk_ui: ui,
            view,
            session,
        })
    }

    pub fn run_loop(&mut self) {
        while self.fltk_app.wait() {
            if let Some(event) = self.event_receiver.recv() {
                match event {
                    AppEvent::Tick => self.tick(),
                    AppEvent::ResizePreview(width, height) => {
                        self.view.surface.resize_surface(width, height);
                        self.redraw_preview();
                    }
                    AppEvent::RedrawPreview => self.redraw_preview(),
                    AppEvent::Command(command) => self.dispatch(command),
                }
            }
        }
        info!("event loop finished");
    }

    fn redraw_preview(&self) {
        if let Err(err) = self.view.surface.redraw() {
            warn!("failed to redraw video surface: {err:#}");
        }
    }

    fn tick(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        // ticks queued before a pause still arrive
        if !session.is_open() || !session.is_running() {
            return;
        }
        if let Err(err) = session.on_tick(&mut self.view) {
            warn!("periodic pull failed: {err:#}");
        }
    }

    fn dispatch(&mut self, command: TransportCommand) {
        let Some(session) = self.session.as_mut() else {
            if command == TransportCommand::Close {
                app::quit();
            } else {
                warn!("no video open, ignoring {command:?}");
            }
            return;
        };

        let view = &mut self.view;
        let outcome = match command {
            TransportCommand::Close => {
                info!(
                    "closing at frame {} of {}",
                    session.position(),
                    session.info().frame_count
                );
                session.close();
                app::quit();
                return;
            }
            TransportCommand::PlayPause => {
                if session.toggle_play_pause() {
                    info!(
                        "playing at x{}, {}ms per frame",
                        session.speed(),
                        session.interval().as_millis()
                    );
                } else {
                    info!("paused at frame {}", session.position());
                }
                return;
            }
            TransportCommand::DoubleSpeed => {
                session.double_speed(view);
                return;
            }
            TransportCommand::HalfSpeed => {
                session.half_speed(view);
                return;
            }
            TransportCommand::StepFrame { forward } => session.step_frame(forward, view),
            TransportCommand::Skip { amount, forward } => {
                session.skip(amount.seconds(), forward, view)
            }
        };

        match outcome {
            Ok(PullOutcome::Frame(index)) => info!("showing frame {index}"),
            Ok(PullOutcome::EndOfStream) => info!("no frame to show, end of stream"),
            Err(err) => warn!("{command:?} failed: {err:#}"),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    ffmpeg_next::init().context("failed to initialize ffmpeg")?;

    MainApp::new(&cli)?.run_loop();
    Ok(())
}
