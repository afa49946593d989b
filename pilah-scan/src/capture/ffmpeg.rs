//! Camera capture through an `ffmpeg` subprocess
//!
//! `ffmpeg` reads the platform camera and writes a continuous MJPEG stream to
//! stdout. A reader thread splits the stream into JPEG images and publishes
//! the most recent one on a `watch` channel; [`DeviceHandle::grab`] hands out
//! whatever is newest at call time.

use async_trait::async_trait;
use std::io::{self, BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Child, ChildStderr, ChildStdout, Command, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::{CaptureBackend, CapturedFrame, DeviceHandle};
use crate::error::{Result, ScanError};

const SOI: [u8; 2] = [0xFF, 0xD8];
const EOI: [u8; 2] = [0xFF, 0xD9];

/// Anything larger than this without an end marker is treated as garbage
const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

const READ_CHUNK: usize = 64 * 1024;

type LatestFrame = Option<Arc<[u8]>>;

/// V4L2/AVFoundation/DirectShow camera via `ffmpeg`
#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    device: String,
    ffmpeg: PathBuf,
    frame_rate: u32,
    first_frame_timeout: Duration,
}

impl FfmpegBackend {
    /// `device` is a path (`/dev/video0`) or a bare index (`0`)
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            ffmpeg: PathBuf::from("ffmpeg"),
            frame_rate: 15,
            first_frame_timeout: Duration::from_secs(5),
        }
    }

    /// Device argument as `ffmpeg` expects it on this platform
    fn device_input(&self) -> String {
        #[cfg(target_os = "linux")]
        {
            match parse_device_index(&self.device) {
                Some(index) if !self.device.starts_with('/') => format!("/dev/video{index}"),
                _ => self.device.clone(),
            }
        }
        #[cfg(target_os = "macos")]
        {
            parse_device_index(&self.device)
                .map(|index| index.to_string())
                .unwrap_or_else(|| self.device.clone())
        }
        #[cfg(target_os = "windows")]
        {
            format!("video={}", self.device)
        }
        #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
        {
            self.device.clone()
        }
    }

    fn command(&self, input: &str) -> Command {
        let mut cmd = Command::new(&self.ffmpeg);
        cmd.arg("-hide_banner").arg("-loglevel").arg("error");

        #[cfg(target_os = "linux")]
        cmd.arg("-f").arg("video4linux2");
        #[cfg(target_os = "macos")]
        cmd.arg("-f").arg("avfoundation").arg("-framerate").arg("30");
        #[cfg(target_os = "windows")]
        cmd.arg("-f").arg("dshow");

        cmd.arg("-i")
            .arg(input)
            .arg("-an")
            .arg("-vf")
            .arg(format!("fps={}", self.frame_rate))
            .arg("-f")
            .arg("image2pipe")
            .arg("-c:v")
            .arg("mjpeg")
            .arg("-q:v")
            .arg("3")
            .arg("-");

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }
}

#[async_trait]
impl CaptureBackend for FfmpegBackend {
    fn describe(&self) -> String {
        self.device.clone()
    }

    async fn open(&self) -> Result<Box<dyn DeviceHandle>> {
        let input = self.device_input();

        #[cfg(target_os = "linux")]
        probe_device(&input)?;

        let mut child = self
            .command(&input)
            .spawn()
            .map_err(|e| classify_spawn_error(e, &self.ffmpeg))?;

        let (stdout, stderr) = match (child.stdout.take(), child.stderr.take()) {
            (Some(out), Some(err)) => (out, err),
            _ => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ScanError::DeviceError(
                    "failed to capture ffmpeg output pipes".to_string(),
                ));
            }
        };

        let (tx, rx) = watch::channel::<LatestFrame>(None);
        let reader = thread::Builder::new()
            .name("pilah-capture".to_string())
            .spawn(move || read_frames(stdout, tx))
            .map_err(|e| {
                let _ = child.kill();
                let _ = child.wait();
                ScanError::DeviceError(format!("failed to start reader thread: {e}"))
            })?;

        let device = self.device.clone();
        let _ = thread::Builder::new()
            .name("pilah-capture-log".to_string())
            .spawn(move || log_stderr(stderr, device));

        info!(device = %self.device, pid = child.id(), "ffmpeg capture started");

        Ok(Box::new(FfmpegHandle {
            child: Some(child),
            reader: Some(reader),
            frames: rx,
            first_frame_timeout: self.first_frame_timeout,
        }))
    }
}

/// Running `ffmpeg` process plus its reader thread
struct FfmpegHandle {
    child: Option<Child>,
    reader: Option<thread::JoinHandle<()>>,
    frames: watch::Receiver<LatestFrame>,
    first_frame_timeout: Duration,
}

#[async_trait]
impl DeviceHandle for FfmpegHandle {
    async fn grab(&mut self) -> Result<CapturedFrame> {
        let child = self
            .child
            .as_mut()
            .ok_or_else(|| ScanError::DeviceError("capture session released".to_string()))?;

        if let Ok(Some(status)) = child.try_wait() {
            return Err(ScanError::DeviceError(format!(
                "ffmpeg exited ({status})"
            )));
        }

        let waited = tokio::time::timeout(
            self.first_frame_timeout,
            self.frames.wait_for(Option::is_some),
        )
        .await;

        match waited {
            Ok(Ok(latest)) => latest
                .as_ref()
                .map(|bytes| CapturedFrame::from_camera(Arc::clone(bytes)))
                .ok_or_else(|| ScanError::DeviceError("no frame available".to_string())),
            Ok(Err(_)) => Err(ScanError::DeviceError(
                "capture stream ended".to_string(),
            )),
            Err(_) => Err(ScanError::DeviceError(format!(
                "no frame within {:?}",
                self.first_frame_timeout
            ))),
        }
    }

    fn release(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            match child.wait() {
                Ok(status) => debug!(%status, "ffmpeg capture stopped"),
                Err(e) => warn!(error = %e, "Failed to reap ffmpeg process"),
            }
        }
        // stdout closes with the process, so the reader finishes promptly
        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
    }
}

impl Drop for FfmpegHandle {
    fn drop(&mut self) {
        self.release();
    }
}

fn read_frames(mut stdout: ChildStdout, tx: watch::Sender<LatestFrame>) {
    let mut splitter = JpegSplitter::default();
    let mut chunk = vec![0u8; READ_CHUNK];

    loop {
        match stdout.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                if let Some(frame) = splitter.push(&chunk[..n]) {
                    tx.send_replace(Some(frame.into()));
                }
                if tx.is_closed() {
                    break;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!(error = %e, "Capture stream read failed");
                break;
            }
        }
    }
    debug!("Capture reader finished");
}

fn log_stderr(stderr: ChildStderr, device: String) {
    for line in BufReader::new(stderr).lines().map_while(std::result::Result::ok) {
        if !line.trim().is_empty() {
            warn!(device = %device, "ffmpeg: {}", line.trim());
        }
    }
}

/// Splits a concatenated MJPEG byte stream into whole JPEG images
///
/// Relies on `FF D9` never occurring inside a frame, which holds for
/// ffmpeg's encoder output (no embedded thumbnails, entropy data is
/// byte-stuffed).
#[derive(Debug, Default)]
struct JpegSplitter {
    buf: Vec<u8>,
}

impl JpegSplitter {
    /// Feed bytes; returns the newest frame completed by this chunk
    fn push(&mut self, chunk: &[u8]) -> Option<Vec<u8>> {
        self.buf.extend_from_slice(chunk);
        let mut latest = None;

        loop {
            let Some(start) = find_marker(&self.buf, SOI) else {
                // keep a trailing 0xFF that may begin the next SOI
                let keep = usize::from(self.buf.last() == Some(&0xFF));
                let cut = self.buf.len() - keep;
                self.buf.drain(..cut);
                break;
            };

            let body = start + SOI.len();
            let Some(end) = find_marker(&self.buf[body..], EOI) else {
                self.buf.drain(..start);
                if self.buf.len() > MAX_FRAME_BYTES {
                    warn!(bytes = self.buf.len(), "Discarding oversized capture frame");
                    self.buf.clear();
                }
                break;
            };

            let frame_end = body + end + EOI.len();
            latest = Some(self.buf[start..frame_end].to_vec());
            self.buf.drain(..frame_end);
        }

        latest
    }
}

fn find_marker(haystack: &[u8], marker: [u8; 2]) -> Option<usize> {
    haystack.windows(2).position(|w| w == marker)
}

/// Parse `"2"` or `"/dev/video2"` into a device index
fn parse_device_index(device: &str) -> Option<u32> {
    if let Ok(index) = device.parse::<u32>() {
        return Some(index);
    }
    device
        .strip_prefix("/dev/video")
        .filter(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
        .and_then(|rest| rest.parse().ok())
}

/// Open the device node once to surface missing/forbidden devices up front
#[cfg(target_os = "linux")]
fn probe_device(path: &str) -> Result<()> {
    std::fs::File::open(path)
        .map(|_| ())
        .map_err(|e| classify_device_error(e, path))
}

fn classify_device_error(err: io::Error, path: &str) -> ScanError {
    match err.kind() {
        io::ErrorKind::NotFound => ScanError::DeviceUnavailable(format!("{path} does not exist")),
        io::ErrorKind::PermissionDenied => ScanError::PermissionDenied(format!("{path}: {err}")),
        _ => ScanError::DeviceError(format!("{path}: {err}")),
    }
}

fn classify_spawn_error(err: io::Error, binary: &std::path::Path) -> ScanError {
    match err.kind() {
        io::ErrorKind::NotFound => ScanError::DeviceUnavailable(format!(
            "capture tool {} not found",
            binary.display()
        )),
        io::ErrorKind::PermissionDenied => {
            ScanError::PermissionDenied(format!("cannot execute {}: {err}", binary.display()))
        }
        _ => ScanError::DeviceError(format!("failed to spawn {}: {err}", binary.display())),
    }
}
