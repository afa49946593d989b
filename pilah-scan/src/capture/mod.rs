//! Capture device acquisition and still-frame capture

mod backend;
mod controller;
mod ffmpeg;
mod frame;

pub use backend::{CaptureBackend, DeviceHandle};
pub use controller::{CaptureController, DeviceState};
pub use ffmpeg::FfmpegBackend;
pub use frame::{decode_image, CapturedFrame, FrameSource};
