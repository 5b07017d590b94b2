// In-process media element using ffmpeg-next
// Requires FFmpeg libraries: libavcodec, libavformat, libavutil, libswscale
//
// To install FFmpeg development libraries:
// - Ubuntu/Debian: sudo apt install libavcodec-dev libavformat-dev libavutil-dev libswscale-dev libavdevice-dev
// - Fedora: sudo dnf install ffmpeg-devel
// - macOS: brew install ffmpeg
// - Windows: Download from https://ffmpeg.org and set FFMPEG_DIR environment variable

use std::sync::{Mutex, MutexGuard};

/// Decoded video frame for rendering
pub struct DecodedFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>, // RGB24 data
}

/// State shared between the element and its decode thread
#[derive(Default)]
struct Shared {
    paused: bool,
    ended: bool,
    time: f64,
    duration: Option<f64>,
    error: Option<String>,
    frame: Option<DecodedFrame>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(feature = "internal-player")]
mod element_impl {
    use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender, TryRecvError};
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::{Duration, Instant};

    extern crate ffmpeg_next as ffmpeg;
    use ffmpeg::format::Pixel;
    use ffmpeg::media::Type;
    use ffmpeg::software::scaling::{context::Context as ScalingContext, flag::Flags};
    use ffmpeg::util::frame::video::Video as VideoFrame;
    use tracing::{debug, warn};

    use super::{lock, DecodedFrame, Shared};
    use crate::player::media::{MediaElement, PlaybackError};

    /// Commands to send to the decode thread
    enum Command {
        /// `rewind` restarts from the top after the end was reached
        Play { rewind: bool },
        Pause,
        Seek(f64),
        Stop,
    }

    pub struct FfmpegElement {
        user_agent: String,
        source: Option<String>,
        shared: Arc<Mutex<Shared>>,
        commands: Option<Sender<Command>>,
        muted: bool,
    }

    impl FfmpegElement {
        pub fn new(user_agent: &str) -> Self {
            ffmpeg::init().ok();

            Self {
                user_agent: user_agent.to_string(),
                source: None,
                shared: Arc::new(Mutex::new(Shared {
                    paused: true,
                    ..Default::default()
                })),
                commands: None,
                muted: false,
            }
        }

        /// Latest decoded frame, if a new one arrived since the last call
        pub fn take_frame(&self) -> Option<DecodedFrame> {
            lock(&self.shared).frame.take()
        }

        pub fn last_error(&self) -> Option<String> {
            lock(&self.shared).error.clone()
        }

        pub fn is_loading(&self) -> bool {
            let shared = lock(&self.shared);
            self.source.is_some() && !shared.paused && shared.time == 0.0 && shared.error.is_none()
        }

        fn send(&self, command: Command) {
            if let Some(ref sender) = self.commands {
                let _ = sender.send(command);
            }
        }

        fn stop_thread(&mut self) {
            self.send(Command::Stop);
            self.commands = None;
        }

        fn decode_thread(
            url: String,
            user_agent: String,
            shared: Arc<Mutex<Shared>>,
            cmd_rx: Receiver<Command>,
        ) {
            let fail = |msg: String| {
                warn!("{}", msg);
                let mut s = lock(&shared);
                s.error = Some(msg);
                s.paused = true;
            };

            // Set options for network streams
            let mut options = ffmpeg::Dictionary::new();
            options.set("user_agent", &user_agent);
            options.set("reconnect", "1");
            options.set("reconnect_streamed", "1");
            options.set("reconnect_delay_max", "5");
            options.set("timeout", "5000000"); // 5 second timeout

            let mut ictx = match ffmpeg::format::input_with_dictionary(&url, options) {
                Ok(ctx) => ctx,
                Err(e) => return fail(format!("Failed to open stream: {}", e)),
            };

            let Some(stream) = ictx.streams().best(Type::Video) else {
                return fail("No video stream found".to_string());
            };
            let video_index = stream.index();
            let time_base = f64::from(stream.time_base());

            let mut decoder = match ffmpeg::codec::context::Context::from_parameters(stream.parameters())
                .and_then(|c| c.decoder().video())
            {
                Ok(d) => d,
                Err(e) => return fail(format!("Failed to create decoder: {}", e)),
            };

            let duration = ictx.duration();
            lock(&shared).duration = (duration > 0)
                .then(|| duration as f64 / f64::from(ffmpeg::ffi::AV_TIME_BASE));

            let width = decoder.width();
            let height = decoder.height();

            // Scale to reasonable size if too large
            let (target_width, target_height) = if width > 1280 || height > 720 {
                let scale = f64::min(1280.0 / width as f64, 720.0 / height as f64);
                ((width as f64 * scale) as u32, (height as f64 * scale) as u32)
            } else {
                (width, height)
            };

            let mut scaler = match ScalingContext::get(
                decoder.format(),
                width,
                height,
                Pixel::RGB24,
                target_width,
                target_height,
                Flags::BILINEAR,
            ) {
                Ok(s) => s,
                Err(e) => return fail(format!("Failed to create scaler: {}", e)),
            };

            let mut paused = lock(&shared).paused;
            let frame_duration = Duration::from_secs_f64(1.0 / 30.0); // Target 30fps display
            let mut last_frame_time = Instant::now();

            loop {
                // Block while paused, poll while playing
                let command = if paused {
                    match cmd_rx.recv_timeout(Duration::from_millis(100)) {
                        Ok(c) => Some(c),
                        Err(RecvTimeoutError::Timeout) => None,
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                } else {
                    match cmd_rx.try_recv() {
                        Ok(c) => Some(c),
                        Err(TryRecvError::Empty) => None,
                        Err(TryRecvError::Disconnected) => break,
                    }
                };

                match command {
                    Some(Command::Stop) => break,
                    Some(Command::Pause) => paused = true,
                    Some(Command::Play { rewind }) => {
                        paused = false;
                        if rewind && ictx.seek(0, ..).is_ok() {
                            decoder.flush();
                        }
                    }
                    Some(Command::Seek(t)) => {
                        let ts = (t * f64::from(ffmpeg::ffi::AV_TIME_BASE)) as i64;
                        match ictx.seek(ts, ..) {
                            Ok(()) => {
                                decoder.flush();
                                let mut s = lock(&shared);
                                s.time = t;
                                s.ended = false;
                            }
                            Err(e) => debug!("Seek to {:.1}s failed: {}", t, e),
                        }
                    }
                    None => {}
                }

                if paused {
                    continue;
                }

                let mut packet = ffmpeg::Packet::empty();
                match packet.read(&mut ictx) {
                    Ok(()) => {}
                    Err(ffmpeg::Error::Eof) => {
                        let mut s = lock(&shared);
                        s.ended = true;
                        s.paused = true;
                        paused = true;
                        continue;
                    }
                    Err(_) => continue,
                }

                if packet.stream() != video_index {
                    continue;
                }
                if decoder.send_packet(&packet).is_err() {
                    continue;
                }

                let mut decoded = VideoFrame::empty();
                while decoder.receive_frame(&mut decoded).is_ok() {
                    let mut rgb_frame = VideoFrame::empty();
                    if scaler.run(&decoded, &mut rgb_frame).is_err() {
                        continue;
                    }
                    let data = rgb_frame.data(0);
                    let stride = rgb_frame.stride(0);

                    // Copy frame data (handling stride)
                    let mut frame_data =
                        Vec::with_capacity((target_width * target_height * 3) as usize);
                    for y in 0..target_height as usize {
                        let row_start = y * stride;
                        let row_end = row_start + (target_width as usize * 3);
                        frame_data.extend_from_slice(&data[row_start..row_end]);
                    }

                    {
                        let mut s = lock(&shared);
                        if let Some(pts) = decoded.pts() {
                            s.time = pts as f64 * time_base;
                        }
                        s.frame = Some(DecodedFrame {
                            width: target_width,
                            height: target_height,
                            data: frame_data,
                        });
                    }

                    // Rate limiting to avoid overwhelming the UI
                    let elapsed = last_frame_time.elapsed();
                    if elapsed < frame_duration {
                        thread::sleep(frame_duration - elapsed);
                    }
                    last_frame_time = Instant::now();
                }
            }
        }
    }

    impl MediaElement for FfmpegElement {
        fn set_source(&mut self, url: &str) {
            self.stop_thread();
            *lock(&self.shared) = Shared {
                paused: true,
                ..Default::default()
            };
            self.source = Some(url.to_string());

            let (cmd_tx, cmd_rx) = channel();
            self.commands = Some(cmd_tx);

            let url = url.to_string();
            let user_agent = self.user_agent.clone();
            let shared = Arc::clone(&self.shared);
            thread::spawn(move || {
                Self::decode_thread(url, user_agent, shared, cmd_rx);
            });
        }

        fn clear_source(&mut self) {
            self.stop_thread();
            self.source = None;
            *lock(&self.shared) = Shared {
                paused: true,
                ..Default::default()
            };
        }

        fn play(&mut self) -> Result<(), PlaybackError> {
            if self.source.is_none() {
                return Err(PlaybackError::NoSource);
            }
            if let Some(e) = self.last_error() {
                return Err(PlaybackError::Open(e));
            }
            let rewind = {
                let mut s = lock(&self.shared);
                let rewind = s.ended;
                s.paused = false;
                s.ended = false;
                rewind
            };
            self.send(Command::Play { rewind });
            Ok(())
        }

        fn pause(&mut self) {
            lock(&self.shared).paused = true;
            self.send(Command::Pause);
        }

        fn is_paused(&self) -> bool {
            lock(&self.shared).paused
        }

        fn has_ended(&self) -> bool {
            lock(&self.shared).ended
        }

        fn current_time(&self) -> f64 {
            lock(&self.shared).time
        }

        fn seek(&mut self, t: f64) {
            lock(&self.shared).time = t;
            self.send(Command::Seek(t));
        }

        fn duration(&self) -> Option<f64> {
            lock(&self.shared).duration
        }

        // Audio is not decoded; the flag only drives the control state
        fn set_muted(&mut self, muted: bool) {
            self.muted = muted;
        }

        fn is_muted(&self) -> bool {
            self.muted
        }
    }

    impl Drop for FfmpegElement {
        fn drop(&mut self) {
            self.stop_thread();
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_replay_clears_ended_immediately() {
            let mut element = FfmpegElement::new("test-agent");
            element.source = Some("https://cdn.test/dune.mp4".to_string());
            {
                let mut s = lock(&element.shared);
                s.ended = true;
                s.paused = true;
            }

            assert!(element.play().is_ok());
            assert!(!element.has_ended());
            assert!(!element.is_paused());
        }
    }
}

// Stub implementation when internal-player feature is disabled
#[cfg(not(feature = "internal-player"))]
mod element_impl {
    use super::DecodedFrame;
    use crate::player::media::{MediaElement, PlaybackError};

    pub struct FfmpegElement {
        source: Option<String>,
        time: f64,
        muted: bool,
    }

    impl FfmpegElement {
        pub fn new(_user_agent: &str) -> Self {
            Self {
                source: None,
                time: 0.0,
                muted: false,
            }
        }

        pub fn take_frame(&self) -> Option<DecodedFrame> {
            None
        }

        pub fn last_error(&self) -> Option<String> {
            self.source.as_ref().map(|_| {
                "Internal player not enabled. Build with --features internal-player".to_string()
            })
        }

        pub fn is_loading(&self) -> bool {
            false
        }
    }

    impl MediaElement for FfmpegElement {
        fn set_source(&mut self, url: &str) {
            self.source = Some(url.to_string());
            self.time = 0.0;
        }

        fn clear_source(&mut self) {
            self.source = None;
        }

        fn play(&mut self) -> Result<(), PlaybackError> {
            Err(PlaybackError::Unsupported)
        }

        fn pause(&mut self) {}

        fn is_paused(&self) -> bool {
            true
        }

        fn has_ended(&self) -> bool {
            false
        }

        fn current_time(&self) -> f64 {
            self.time
        }

        fn seek(&mut self, t: f64) {
            self.time = t;
        }

        fn duration(&self) -> Option<f64> {
            None
        }

        fn set_muted(&mut self, muted: bool) {
            self.muted = muted;
        }

        fn is_muted(&self) -> bool {
            self.muted
        }
    }
}

pub use element_impl::*;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::media::MediaElement;

    #[test]
    fn test_new_element_is_paused_without_source() {
        let mut element = FfmpegElement::new("test-agent");
        assert!(element.is_paused());
        assert!(!element.has_ended());
        assert!(element.take_frame().is_none());
        assert!(element.play().is_err());
    }

    #[test]
    fn test_shared_lock_recovers() {
        let shared = Mutex::new(Shared::default());
        lock(&shared).time = 3.0;
        assert_eq!(lock(&shared).time, 3.0);
    }
}
