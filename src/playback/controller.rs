use super::{
    FrameNum, FrameSink, FrameTimer, MediaInfo, MediaSource, Speed, frame_interval,
};
use anyhow::{Context, bail};
use log::{debug, info};
use std::time::Duration;

/// Frames kept between an initial skip target and the end of the stream, so a
/// long `--skip` still leaves something to watch.
pub const INITIAL_SKIP_END_MARGIN: u64 = 60;

/// The relative jumps offered by the transport buttons.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SkipAmount {
    TenSeconds,
    FiveMinutes,
}

impl SkipAmount {
    pub fn seconds(self) -> u64 {
        match self {
            Self::TenSeconds => 10,
            Self::FiveMinutes => 5 * 60,
        }
    }
}

/// Result of asking the media for one more frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PullOutcome {
    /// The frame at this index was decoded and handed to the sink.
    Frame(FrameNum),
    EndOfStream,
}

/// Playback state for the single open video: speed, timer cadence and
/// position arithmetic on top of a [`MediaSource`].
pub struct PlaybackController<M: MediaSource, T: FrameTimer> {
    media: Option<M>,
    timer: T,
    info: MediaInfo,
    speed: Speed,
    interval: Duration,
}

impl<M: MediaSource, T: FrameTimer> PlaybackController<M, T> {
    /// Takes ownership of an opened stream, applies the initial skip and
    /// starts periodic pulls at normal speed.
    pub fn open(mut media: M, mut timer: T, initial_skip_seconds: u64) -> anyhow::Result<Self> {
        let info = media.info();
        if !info.frame_rate.is_valid() {
            bail!(
                "stream reports no usable frame rate ({}/{})",
                info.frame_rate.num,
                info.frame_rate.den
            );
        }

        let speed = Speed::NORMAL;
        let interval = frame_interval(info.frame_rate, speed);
        info!(
            "opened {}x{} video: {} frames at {:.3} fps, pulling every {}ms",
            info.width,
            info.height,
            info.frame_count,
            info.frame_rate.fps(),
            interval.as_millis()
        );

        if initial_skip_seconds > 0 {
            let frames_to_skip = info.frame_rate.frames_in(initial_skip_seconds);
            let latest = info.frame_count.saturating_sub(INITIAL_SKIP_END_MARGIN);
            let target = FrameNum(frames_to_skip).min(latest);
            info!("skipping {initial_skip_seconds}s in, to frame {target}");
            media
                .seek(target)
                .with_context(|| format!("failed to apply initial skip to frame {target}"))?;
        }

        timer.start(interval);

        Ok(Self {
            media: Some(media),
            timer,
            info,
            speed,
            interval,
        })
    }

    pub fn info(&self) -> MediaInfo {
        self.info
    }

    pub fn speed(&self) -> Speed {
        self.speed
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_active()
    }

    pub fn is_open(&self) -> bool {
        self.media.is_some()
    }

    /// Index of the next frame to decode, or zero once closed.
    pub fn position(&self) -> FrameNum {
        self.media
            .as_ref()
            .map_or(FrameNum::ZERO, |media| media.position())
    }

    /// Flips periodic pulls on or off and reports whether they now run.
    pub fn toggle_play_pause(&mut self) -> bool {
        if self.timer.is_active() {
            self.timer.stop();
            debug!("paused at frame {}", self.position());
        } else {
            self.timer.start(self.interval);
            debug!("resumed at frame {}", self.position());
        }
        self.timer.is_active()
    }

    pub fn double_speed(&mut self, sink: &mut impl FrameSink) -> Speed {
        self.set_speed(self.speed.doubled(), sink)
    }

    pub fn half_speed(&mut self, sink: &mut impl FrameSink) -> Speed {
        self.set_speed(self.speed.halved(), sink)
    }

    fn set_speed(&mut self, speed: Speed, sink: &mut impl FrameSink) -> Speed {
        self.speed = speed;
        self.interval = frame_interval(self.info.frame_rate, speed);
        self.timer.set_interval(self.interval);
        sink.show_speed(&speed.label());
        info!("speed x{speed}, pulling every {}ms", self.interval.as_millis());
        speed
    }

    /// Pauses, then shows the next frame or the one before the frame on
    /// screen.
    pub fn step_frame(
        &mut self,
        forward: bool,
        sink: &mut impl FrameSink,
    ) -> anyhow::Result<PullOutcome> {
        if self.timer.is_active() {
            self.timer.stop();
        }

        if !forward {
            let current = self.position();
            // the frame on screen is current - 1
            let target = current.saturating_sub(2);
            debug!("stepping back from frame {current} to {target}");
            self.seek(target)?;
        }

        self.pull_next_frame(sink)
    }

    /// Jumps by `seconds` worth of frames and shows the frame landed on.
    /// Periodic pulls keep their state.
    pub fn skip(
        &mut self,
        seconds: u64,
        forward: bool,
        sink: &mut impl FrameSink,
    ) -> anyhow::Result<PullOutcome> {
        let current = self.position();
        let delta = self.info.frame_rate.frames_in(seconds);
        let target = if forward {
            current
                .saturating_add(delta)
                .min(self.info.frame_count.saturating_sub(1))
                .max(current)
        } else {
            current.saturating_sub(delta)
        };
        debug!("skipping {seconds}s from frame {current} to {target}");

        self.seek(target)?;
        self.pull_next_frame(sink)
    }

    pub fn pull_next_frame(&mut self, sink: &mut impl FrameSink) -> anyhow::Result<PullOutcome> {
        let media = self.media_mut()?;
        let position = media.position();
        let frame = media
            .read_frame()
            .with_context(|| format!("failed to decode frame {position}"))?;

        // estimated counts can fall short of what the stream really holds
        let reached = media.position();
        if reached > self.info.frame_count {
            debug!(
                "stream runs past its reported {} frames, now at {reached}",
                self.info.frame_count
            );
            self.info.frame_count = reached;
        }

        Ok(match frame {
            Some(frame) => {
                sink.show_frame(&frame);
                PullOutcome::Frame(frame.index)
            }
            None => PullOutcome::EndOfStream,
        })
    }

    /// Periodic pull. Reaching the end of the stream pauses playback.
    pub fn on_tick(&mut self, sink: &mut impl FrameSink) -> anyhow::Result<PullOutcome> {
        let outcome = self.pull_next_frame(sink)?;
        if outcome == PullOutcome::EndOfStream && self.timer.is_active() {
            info!("end of stream reached, pausing");
            self.timer.stop();
        }
        Ok(outcome)
    }

    /// Stops periodic pulls and releases the media.
    pub fn close(&mut self) {
        self.timer.stop();
        if self.media.take().is_some() {
            info!("closed media");
        }
    }

    fn seek(&mut self, target: FrameNum) -> anyhow::Result<()> {
        let target = target.min(self.info.frame_count);
        self.media_mut()?
            .seek(target)
            .with_context(|| format!("failed to seek to frame {target}"))
    }

    fn media_mut(&mut self) -> anyhow::Result<&mut M> {
        self.media.as_mut().context("media has already been released")
    }
}

impl<M: MediaSource, T: FrameTimer> Drop for PlaybackController<M, T> {
    fn drop(&mut self) {
        self.timer.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::{FrameRate, VideoFrame};
    use std::{cell::RefCell, rc::Rc};

    #[derive(Default)]
    struct MediaLog {
        seeks: Vec<FrameNum>,
        released: bool,
    }

    struct FakeMedia {
        info: MediaInfo,
        real_frames: FrameNum,
        position: FrameNum,
        broken: bool,
        log: Rc<RefCell<MediaLog>>,
    }

    impl FakeMedia {
        fn new(fps: i32, frames: u64) -> (Self, Rc<RefCell<MediaLog>>) {
            let log = Rc::new(RefCell::new(MediaLog::default()));
            let media = Self {
                info: MediaInfo {
                    frame_rate: FrameRate::new(fps, 1),
                    frame_count: FrameNum(frames),
                    width: 4,
                    height: 2,
                },
                real_frames: FrameNum(frames),
                position: FrameNum::ZERO,
                broken: false,
                log: log.clone(),
            };
            (media, log)
        }
    }

    impl MediaSource for FakeMedia {
        fn info(&self) -> MediaInfo {
            self.info
        }

        fn position(&self) -> FrameNum {
            self.position
        }

        fn seek(&mut self, target: FrameNum) -> anyhow::Result<()> {
            if target > self.real_frames {
                bail!("seek past end");
            }
            self.log.borrow_mut().seeks.push(target);
            self.position = target;
            Ok(())
        }

        fn read_frame(&mut self) -> anyhow::Result<Option<VideoFrame>> {
            if self.broken {
                bail!("corrupt packet");
            }
            if self.position >= self.real_frames {
                return Ok(None);
            }
            let frame = VideoFrame {
                index: self.position,
                width: 4,
                height: 2,
                stride: 12,
                data: vec![0; 24],
            };
            self.position = self.position.next();
            Ok(Some(frame))
        }
    }

    impl Drop for FakeMedia {
        fn drop(&mut self) {
            self.log.borrow_mut().released = true;
        }
    }

    #[derive(Default)]
    struct TimerState {
        active: bool,
        interval: Duration,
        starts: usize,
    }

    #[derive(Default, Clone)]
    struct FakeTimer(Rc<RefCell<TimerState>>);

    impl FrameTimer for FakeTimer {
        fn start(&mut self, interval: Duration) {
            let mut state = self.0.borrow_mut();
            state.active = true;
            state.interval = interval;
            state.starts += 1;
        }

        fn stop(&mut self) {
            self.0.borrow_mut().active = false;
        }

        fn set_interval(&mut self, interval: Duration) {
            self.0.borrow_mut().interval = interval;
        }

        fn is_active(&self) -> bool {
            self.0.borrow().active
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        frames: Vec<FrameNum>,
        labels: Vec<String>,
    }

    impl FrameSink for RecordingSink {
        fn show_frame(&mut self, frame: &VideoFrame) {
            self.frames.push(frame.index);
        }

        fn show_speed(&mut self, text: &str) {
            self.labels.push(text.to_owned());
        }
    }

    type Session = PlaybackController<FakeMedia, FakeTimer>;

    fn open(skip: u64) -> (Session, FakeTimer, Rc<RefCell<MediaLog>>) {
        let (media, log) = FakeMedia::new(30, 300);
        let timer = FakeTimer::default();
        let session = Session::open(media, timer.clone(), skip).unwrap();
        (session, timer, log)
    }

    fn open_at(frame: u64) -> (Session, FakeTimer, Rc<RefCell<MediaLog>>) {
        let (mut session, timer, log) = open(0);
        session.seek(FrameNum(frame)).unwrap();
        log.borrow_mut().seeks.clear();
        (session, timer, log)
    }

    #[test]
    fn opens_at_start_and_runs() {
        let (session, timer, log) = open(0);
        assert_eq!(session.position(), FrameNum(0));
        assert_eq!(session.interval(), Duration::from_millis(33));
        assert!(session.is_running());
        assert_eq!(timer.0.borrow().interval, Duration::from_millis(33));
        assert!(log.borrow().seeks.is_empty());
    }

    #[test]
    fn initial_skip_seeks_by_seconds() {
        let (session, _, _) = open(5);
        assert_eq!(session.position(), FrameNum(150));
    }

    #[test]
    fn initial_skip_keeps_a_margin_before_the_end() {
        let (session, _, _) = open(9);
        assert_eq!(session.position(), FrameNum(240));
    }

    #[test]
    fn huge_initial_skip_still_keeps_the_margin() {
        let (session, _, _) = open(614_891_469_123_651_721);
        assert_eq!(session.position(), FrameNum(240));
    }

    #[test]
    fn initial_skip_on_a_short_stream_lands_on_zero() {
        let (media, _) = FakeMedia::new(30, 40);
        let session = Session::open(media, FakeTimer::default(), 1).unwrap();
        assert_eq!(session.position(), FrameNum(0));
    }

    #[test]
    fn open_rejects_a_stream_without_frame_rate() {
        let (media, _) = FakeMedia::new(0, 300);
        let timer = FakeTimer::default();
        assert!(Session::open(media, timer.clone(), 0).is_err());
        assert!(!timer.is_active());
    }

    #[test]
    fn toggling_twice_restores_running_state() {
        let (mut session, _, _) = open(0);
        assert!(!session.toggle_play_pause());
        assert!(session.toggle_play_pause());
        assert!(session.is_running());
    }

    #[test]
    fn resume_uses_current_interval() {
        let (mut session, timer, _) = open(0);
        let mut sink = RecordingSink::default();
        session.toggle_play_pause();
        session.double_speed(&mut sink);
        session.toggle_play_pause();
        assert_eq!(timer.0.borrow().interval, Duration::from_millis(17));
    }

    #[test]
    fn doubling_speed_caps_at_four() {
        let (mut session, _, _) = open(0);
        let mut sink = RecordingSink::default();
        let speeds: Vec<f64> = (0..4)
            .map(|_| session.double_speed(&mut sink).multiplier())
            .collect();
        assert_eq!(speeds, [2.0, 4.0, 4.0, 4.0]);
        assert_eq!(sink.labels.last().unwrap(), "Speed: x4");
    }

    #[test]
    fn speed_change_retargets_running_timer() {
        let (mut session, timer, _) = open(0);
        let mut sink = RecordingSink::default();
        session.double_speed(&mut sink);

        let state = timer.0.borrow();
        assert!(state.active);
        assert_eq!(state.starts, 1);
        assert_eq!(state.interval, Duration::from_millis(17));
        assert_eq!(session.interval(), Duration::from_millis(17));
    }

    #[test]
    fn halving_speed_retargets_running_timer() {
        let (mut session, timer, _) = open(0);
        let mut sink = RecordingSink::default();
        session.half_speed(&mut sink);

        let state = timer.0.borrow();
        assert!(state.active);
        assert_eq!(state.starts, 1);
        assert_eq!(state.interval, Duration::from_millis(67));
        assert_eq!(session.interval(), Duration::from_millis(67));
    }

    #[test]
    fn halving_speed_lowers_it_down_to_a_floor() {
        let (mut session, _, _) = open(0);
        let mut sink = RecordingSink::default();
        assert_eq!(session.half_speed(&mut sink).multiplier(), 0.5);
        assert_eq!(session.interval(), Duration::from_millis(67));
        for _ in 0..6 {
            session.half_speed(&mut sink);
        }
        assert_eq!(session.speed(), Speed::MIN);
        assert_eq!(session.interval(), Duration::from_millis(533));
        assert_eq!(sink.labels.first().unwrap(), "Speed: x0.5");
        assert_eq!(sink.labels.last().unwrap(), "Speed: x0.0625");
    }

    #[test]
    fn step_forward_pauses_and_shows_next_frame() {
        let (mut session, _, _) = open_at(10);
        let mut sink = RecordingSink::default();
        let outcome = session.step_frame(true, &mut sink).unwrap();
        assert_eq!(outcome, PullOutcome::Frame(FrameNum(10)));
        assert_eq!(session.position(), FrameNum(11));
        assert!(!session.is_running());
    }

    #[test]
    fn step_backward_shows_frame_before_the_current_one() {
        let (mut session, _, log) = open_at(10);
        let mut sink = RecordingSink::default();
        session.step_frame(false, &mut sink).unwrap();
        assert_eq!(log.borrow().seeks, [FrameNum(8)]);
        assert_eq!(sink.frames, [FrameNum(8)]);
        assert_eq!(session.position(), FrameNum(9));
        assert!(!session.is_running());
    }

    #[test]
    fn step_backward_at_start_stays_at_zero() {
        let (mut session, _, log) = open_at(1);
        let mut sink = RecordingSink::default();
        session.step_frame(false, &mut sink).unwrap();
        assert_eq!(log.borrow().seeks, [FrameNum(0)]);
        assert_eq!(sink.frames, [FrameNum(0)]);
    }

    #[test]
    fn backward_skip_clamps_to_start() {
        let (mut session, _, log) = open_at(200);
        let mut sink = RecordingSink::default();
        session
            .skip(SkipAmount::TenSeconds.seconds(), false, &mut sink)
            .unwrap();
        assert_eq!(log.borrow().seeks, [FrameNum(0)]);
        assert_eq!(sink.frames, [FrameNum(0)]);
    }

    #[test]
    fn forward_skip_clamps_to_last_frame() {
        let (mut session, _, log) = open_at(200);
        let mut sink = RecordingSink::default();
        let outcome = session
            .skip(SkipAmount::FiveMinutes.seconds(), true, &mut sink)
            .unwrap();
        assert_eq!(log.borrow().seeks, [FrameNum(299)]);
        assert_eq!(outcome, PullOutcome::Frame(FrameNum(299)));
    }

    #[test]
    fn forward_skip_within_range_moves_by_seconds() {
        let (media, log) = FakeMedia::new(30, 3000);
        let mut session = Session::open(media, FakeTimer::default(), 0).unwrap();
        let mut sink = RecordingSink::default();
        session.pull_next_frame(&mut sink).unwrap();
        session
            .skip(SkipAmount::TenSeconds.seconds(), true, &mut sink)
            .unwrap();
        assert_eq!(log.borrow().seeks, [FrameNum(301)]);
        assert_eq!(session.position(), FrameNum(302));
    }

    #[test]
    fn skips_never_escape_bounds() {
        let (mut session, _, log) = open(0);
        let mut sink = RecordingSink::default();
        for (seconds, forward) in [(10, true), (300, true), (10, false), (300, false), (300, true)] {
            let before = session.position();
            session.skip(seconds, forward, &mut sink).unwrap();
            let target = *log.borrow().seeks.last().unwrap();
            if forward && before < FrameNum(299) {
                assert!(target <= FrameNum(299));
            }
            assert!(session.position() <= session.info().frame_count);
        }
        assert!(log.borrow().seeks.iter().all(|t| *t <= FrameNum(300)));
    }

    #[test]
    fn skips_leave_periodic_pulls_running_but_steps_stop_them() {
        let (mut session, _, _) = open_at(100);
        let mut sink = RecordingSink::default();
        session.skip(10, true, &mut sink).unwrap();
        session.skip(10, false, &mut sink).unwrap();
        assert!(session.is_running());

        session.step_frame(true, &mut sink).unwrap();
        assert!(!session.is_running());

        // a paused session stays paused through a skip
        session.skip(10, true, &mut sink).unwrap();
        assert!(!session.is_running());
    }

    #[test]
    fn forward_skip_at_the_end_does_not_rewind() {
        let (mut session, _, log) = open_at(300);
        let mut sink = RecordingSink::default();
        let outcome = session
            .skip(SkipAmount::TenSeconds.seconds(), true, &mut sink)
            .unwrap();
        assert_eq!(log.borrow().seeks, [FrameNum(300)]);
        assert_eq!(outcome, PullOutcome::EndOfStream);
        assert_eq!(session.position(), FrameNum(300));
    }

    #[test]
    fn stream_longer_than_reported_stays_within_total() {
        let (mut media, _) = FakeMedia::new(30, 300);
        media.real_frames = FrameNum(320);
        let mut session = Session::open(media, FakeTimer::default(), 0).unwrap();
        let mut sink = RecordingSink::default();

        for _ in 0..310 {
            session.on_tick(&mut sink).unwrap();
            assert!(session.position() <= session.info().frame_count);
        }
        assert_eq!(session.position(), FrameNum(310));

        session.skip(10, true, &mut sink).unwrap();
        assert!(session.position() > FrameNum(310));
        assert!(session.position() <= session.info().frame_count);

        while session.on_tick(&mut sink).unwrap() != PullOutcome::EndOfStream {}
        assert_eq!(session.position(), FrameNum(320));
        assert_eq!(session.info().frame_count, FrameNum(320));
    }

    #[test]
    fn end_of_stream_is_not_an_error() {
        let (mut session, _, _) = open_at(300);
        let mut sink = RecordingSink::default();
        let outcome = session.pull_next_frame(&mut sink).unwrap();
        assert_eq!(outcome, PullOutcome::EndOfStream);
        assert!(sink.frames.is_empty());
        assert_eq!(session.position(), FrameNum(300));
    }

    #[test]
    fn tick_at_end_of_stream_pauses() {
        let (mut session, _, _) = open_at(299);
        let mut sink = RecordingSink::default();
        assert_eq!(
            session.on_tick(&mut sink).unwrap(),
            PullOutcome::Frame(FrameNum(299))
        );
        assert!(session.is_running());
        assert_eq!(session.on_tick(&mut sink).unwrap(), PullOutcome::EndOfStream);
        assert!(!session.is_running());
    }

    #[test]
    fn decode_failures_surface_as_errors() {
        let (mut session, _, _) = open(0);
        session.media.as_mut().unwrap().broken = true;
        let mut sink = RecordingSink::default();
        let err = session.pull_next_frame(&mut sink).unwrap_err();
        assert!(format!("{err:#}").contains("corrupt packet"));
        assert!(sink.frames.is_empty());
    }

    #[test]
    fn close_stops_timer_and_releases_media() {
        let (mut session, timer, log) = open(0);
        session.close();
        assert!(!timer.is_active());
        assert!(log.borrow().released);
        assert!(!session.is_open());

        let mut sink = RecordingSink::default();
        assert!(session.pull_next_frame(&mut sink).is_err());
    }

    #[test]
    fn dropping_the_session_stops_the_timer() {
        let (session, timer, log) = open(0);
        drop(session);
        assert!(!timer.is_active());
        assert!(log.borrow().released);
    }
}
