// Opens a camera and delivers frames at a fixed working resolution.
// Visual expectation: whatever the webcam's native size, every frame the
// display loop sees is exactly `width x height`, packed 0x00RRGGBB.

use crate::error::Error;
use crate::types::{FrameBuffer, pack_rgb};

use image::RgbImage;
use image::imageops::{self, FilterType};
use nokhwa::{
    Camera,
    pixel_format::RgbFormat,
    utils::{CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution},
};

/// Anything that yields successive color frames; `None` means the stream ended.
pub trait FrameSource {
    fn next_frame(&mut self) -> Option<FrameBuffer>;
}

impl<S: FrameSource + ?Sized> FrameSource for &mut S {
    fn next_frame(&mut self) -> Option<FrameBuffer> {
        (**self).next_frame()
    }
}

// A small wrapper around nokhwa::Camera so the display loop stays clean.
// Dropping it stops the stream and releases the device.
pub struct CameraCapture {
    cam: Camera,
    width: u32,
    height: u32,
}

impl CameraCapture {
    /// Open camera `index`, asking for something close to the working size.
    pub fn new(index: u32, width: u32, height: u32, fps: u32) -> Result<Self, Error> {
        let idx = CameraIndex::Index(index);
        let fmt = CameraFormat::new(Resolution::new(width, height), FrameFormat::YUYV, fps);
        let req = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(fmt));

        let mut cam = Camera::new(idx, req)
            .map_err(|e| Error::DeviceUnavailable(format!("Create camera {index}: {e}")))?;
        cam.open_stream()
            .map_err(|e| Error::DeviceUnavailable(format!("Open stream: {e}")))?;

        let native = cam.resolution();
        log::info!(
            "Camera {index} streaming at {}x{}, working size {width}x{height}",
            native.width(),
            native.height()
        );
        Ok(Self { cam, width, height })
    }
}

impl FrameSource for CameraCapture {
    /// Grab, decode and resize one frame (blocks until the camera has one).
    /// Any capture or decode failure ends the stream.
    fn next_frame(&mut self) -> Option<FrameBuffer> {
        let frame = match self.cam.frame() {
            Ok(f) => f,
            Err(e) => {
                log::warn!("Fetch frame: {e}");
                return None;
            }
        };
        let rgb = match frame.decode_image::<RgbFormat>() {
            Ok(img) => img,
            Err(e) => {
                log::warn!("Decode RGB: {e}");
                return None;
            }
        };
        // Re-wrap the raw bytes so resizing uses this crate's `image` version.
        let (w, h) = rgb.dimensions();
        let rgb = RgbImage::from_raw(w, h, rgb.into_raw()).filter(|_| w > 0 && h > 0)?;

        let rgb = if rgb.dimensions() == (self.width, self.height) {
            rgb
        } else {
            imageops::resize(&rgb, self.width, self.height, FilterType::Triangle)
        };

        let pixels = rgb.pixels().map(|p| pack_rgb(p[0], p[1], p[2])).collect();
        Some(FrameBuffer {
            width: self.width as usize,
            height: self.height as usize,
            pixels,
        })
    }
}

impl Drop for CameraCapture {
    fn drop(&mut self) {
        if let Err(e) = self.cam.stop_stream() {
            log::warn!("Stop stream: {e}");
        }
        log::debug!("Camera released");
    }
}
