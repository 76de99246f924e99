//! Host camera devices backed by `nokhwa`.

use image::RgbImage;
use nokhwa::Camera;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
};

use crate::{CaptureError, MediaDevices, MediaStream, VideoConstraints};

const REQUESTED_FRAME_RATE: u32 = 30;

/// Opens the host camera at a fixed device index.
#[derive(Debug, Clone, Copy)]
pub struct NativeMediaDevices {
    index: u32,
}

impl NativeMediaDevices {
    /// Targets the camera at `index` in host enumeration order.
    pub fn new(index: u32) -> Self {
        Self { index }
    }
}

impl MediaDevices for NativeMediaDevices {
    fn open_stream(
        &self,
        constraints: &VideoConstraints,
    ) -> Result<Box<dyn MediaStream>, CaptureError> {
        let format = CameraFormat::new(
            Resolution::new(constraints.ideal_width, constraints.ideal_height),
            FrameFormat::MJPEG,
            REQUESTED_FRAME_RATE,
        );
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(format));
        let camera = Camera::new(CameraIndex::Index(self.index), requested)
            .map_err(|error| CaptureError::AccessDenied(error.to_string()))?;

        Ok(Box::new(NativeStream {
            camera,
            streaming: false,
        }))
    }
}

struct NativeStream {
    camera: Camera,
    streaming: bool,
}

impl MediaStream for NativeStream {
    fn label(&self) -> String {
        self.camera.info().human_name()
    }

    fn resolution(&self) -> Option<(u32, u32)> {
        let resolution = self.camera.resolution();
        Some((resolution.width(), resolution.height()))
    }

    fn play(&mut self) -> Result<(), CaptureError> {
        self.camera
            .open_stream()
            .map_err(|error| CaptureError::Playback(error.to_string()))?;
        self.streaming = true;
        Ok(())
    }

    fn grab_frame(&mut self) -> Result<RgbImage, CaptureError> {
        let frame = self
            .camera
            .frame()
            .map_err(|error| CaptureError::Backend(error.to_string()))?;
        frame
            .decode_image::<RgbFormat>()
            .map_err(|error| CaptureError::Backend(error.to_string()))
    }

    fn stop_tracks(&mut self) {
        if self.streaming {
            // Stop errors leave nothing to recover; the handle is dropped next.
            let _ = self.camera.stop_stream();
            self.streaming = false;
        }
    }
}
