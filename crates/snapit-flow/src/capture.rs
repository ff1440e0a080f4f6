// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Capture flow: the camera surface.
//
//   Camera ──capture──▶ Edit ──confirm_crop──▶ (result stored, surface closed)
//     ▲                  │
//     └─────retake───────┘
//
// The camera is held only in `Camera`; the crop session only in `Edit`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use snapit_bridge::{CameraDevice, Platform};
use snapit_core::error::{Result, SnapitError};
use snapit_core::human_errors::humanize_error;
use snapit_core::{AppConfig, CaptureState, CapturedImage, ImageId, data_url};
use snapit_document::{CropOutput, CropRegion, CropSession};
use tracing::{debug, info, instrument, warn};

use crate::countdown::{Tick, run_countdown};

/// Flash overlay duration after the frame is frozen.
pub const FLASH_DURATION: Duration = Duration::from_millis(150);
/// Time from freezing the frame to entering the editor.
pub const SUCCESS_HOLD: Duration = Duration::from_millis(1000);

const CAPTURE_FAILED: &str = "Failed to capture photo. Please try again.";
const CROP_FAILED: &str = "Failed to apply crop. Please try again.";

/// Overlay phases reported while a capture runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CapturePhase {
    Countdown(Tick),
    Flash,
    Success,
    /// All overlays hidden.
    Cleared,
}

/// What the capture surface renders.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureView {
    pub state: CaptureState,
    /// The capture control is enabled.
    pub can_capture: bool,
    pub capturing: bool,
    /// Persistent inline error.
    pub error: Option<String>,
    /// The camera failure may clear up on its own; offer to try again.
    pub can_retry: bool,
    /// Frozen frame being edited, as a `data:` URL.
    pub edit_image: Option<String>,
    pub crop_region: Option<CropRegion>,
    pub rotation_degrees: u32,
    /// Size of the frame as currently rotated.
    pub dimensions: Option<(u32, u32)>,
}

struct CaptureInner {
    state: CaptureState,
    camera_ready: bool,
    capturing: bool,
    error: Option<String>,
    retriable: bool,
    /// Frozen frame as a `data:` URL, encoded once on entering `Edit`.
    edit_image: Option<String>,
    session: Option<CropSession>,
    closed: bool,
}

/// Controller for one capture surface.
pub struct CaptureFlow<P, C> {
    platform: P,
    camera: Arc<C>,
    inner: Arc<Mutex<CaptureInner>>,
    output: CropOutput,
}

impl<P: Clone, C> Clone for CaptureFlow<P, C> {
    fn clone(&self) -> Self {
        Self {
            platform: self.platform.clone(),
            camera: Arc::clone(&self.camera),
            inner: Arc::clone(&self.inner),
            output: self.output,
        }
    }
}

impl<P: Platform, C: CameraDevice> CaptureFlow<P, C> {
    pub fn new(platform: P, camera: C, config: &AppConfig) -> Self {
        Self {
            platform,
            camera: Arc::new(camera),
            inner: Arc::new(Mutex::new(CaptureInner {
                state: CaptureState::Camera,
                camera_ready: false,
                capturing: false,
                error: None,
                retriable: false,
                edit_image: None,
                session: None,
                closed: false,
            })),
            output: CropOutput {
                max_edge: config.max_capture_edge,
                jpeg_quality: config.jpeg_quality,
            },
        }
    }

    fn lock(&self) -> MutexGuard<'_, CaptureInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> CaptureState {
        self.lock().state
    }

    pub fn view(&self) -> CaptureView {
        let inner = self.lock();
        let session = inner.session.as_ref();
        CaptureView {
            state: inner.state,
            can_capture: inner.state == CaptureState::Camera
                && inner.camera_ready
                && !inner.capturing,
            capturing: inner.capturing,
            error: inner.error.clone(),
            can_retry: inner.state == CaptureState::Camera
                && inner.retriable
                && !inner.camera_ready,
            edit_image: inner.edit_image.clone(),
            crop_region: session.map(CropSession::region),
            rotation_degrees: session.map_or(0, CropSession::rotation_degrees),
            dimensions: session.map(CropSession::dimensions),
        }
    }

    /// Enter `Camera` and acquire the camera, dropping any stream already
    /// held.
    ///
    /// On failure the classified message is kept as the inline error and the
    /// capture control stays disabled.
    pub async fn start(&self) -> Result<()> {
        self.camera.release();
        {
            let mut inner = self.lock();
            inner.state = CaptureState::Camera;
            inner.camera_ready = false;
            inner.error = None;
            inner.retriable = false;
        }

        let acquired = self.camera.acquire().await;

        let mut inner = self.lock();
        if inner.closed {
            self.camera.release();
            return Err(SnapitError::InvalidState("capture surface closed".into()));
        }
        match acquired {
            Ok(()) => {
                inner.camera_ready = true;
                info!("camera ready");
                Ok(())
            }
            Err(failure) => {
                warn!(error = %failure, "camera acquisition failed");
                let err = SnapitError::Camera(failure);
                let human = humanize_error(&err);
                inner.error = Some(human.message);
                inner.retriable = human.retriable;
                Err(err)
            }
        }
    }

    /// Count down, freeze a frame, play the flash/success overlays, release
    /// the camera, and open the crop editor.
    ///
    /// Rejected while another capture runs or the camera is not ready.
    pub async fn capture(&self, mut on_phase: impl FnMut(CapturePhase)) -> Result<()> {
        {
            let mut inner = self.lock();
            if inner.state != CaptureState::Camera || !inner.camera_ready {
                return Err(SnapitError::InvalidState("camera is not ready".into()));
            }
            if inner.capturing {
                return Err(SnapitError::InvalidState("capture already running".into()));
            }
            inner.capturing = true;
            inner.error = None;
        }

        match self.run_capture(&mut on_phase).await {
            Ok(()) => {
                on_phase(CapturePhase::Cleared);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "capture failed");
                {
                    let mut inner = self.lock();
                    inner.capturing = false;
                    inner.error = Some(CAPTURE_FAILED.to_string());
                }
                on_phase(CapturePhase::Cleared);
                Err(e)
            }
        }
    }

    async fn run_capture(&self, on_phase: &mut impl FnMut(CapturePhase)) -> Result<()> {
        run_countdown(|tick| on_phase(CapturePhase::Countdown(tick))).await;

        let frame = self.camera.grab_frame().await?;
        on_phase(CapturePhase::Flash);
        let session = CropSession::new(&frame)?;
        debug!(dimensions = ?session.dimensions(), "frame frozen");

        tokio::time::sleep(FLASH_DURATION).await;
        on_phase(CapturePhase::Success);
        tokio::time::sleep(SUCCESS_HOLD - FLASH_DURATION).await;

        self.camera.release();
        let mut inner = self.lock();
        inner.capturing = false;
        inner.camera_ready = false;
        if inner.closed {
            return Err(SnapitError::InvalidState("capture surface closed".into()));
        }
        inner.edit_image = Some(data_url::encode("image/jpeg", &frame));
        inner.session = Some(session);
        inner.state = CaptureState::Edit;
        info!("entered crop editor");
        Ok(())
    }

    fn with_session<R>(&self, f: impl FnOnce(&mut CropSession) -> R) -> Result<R> {
        let mut inner = self.lock();
        inner
            .session
            .as_mut()
            .map(f)
            .ok_or_else(|| SnapitError::InvalidState("no image is being edited".into()))
    }

    pub fn rotate_left(&self) -> Result<()> {
        self.with_session(CropSession::rotate_left)
    }

    pub fn rotate_right(&self) -> Result<()> {
        self.with_session(CropSession::rotate_right)
    }

    /// Back to the automatic full-image crop with no rotation.
    pub fn reset_crop(&self) -> Result<()> {
        self.with_session(CropSession::reset)
    }

    pub fn set_crop_region(&self, region: CropRegion) -> Result<CropRegion> {
        self.with_session(|s| {
            s.set_region(region);
            s.region()
        })
    }

    /// Render the crop, store it for the main surface, and close this
    /// surface. Failures keep the editor open with an inline error.
    #[instrument(skip(self))]
    pub async fn confirm_crop(&self) -> Result<ImageId> {
        let rendered = {
            let inner = self.lock();
            match inner.session.as_ref() {
                Some(session) => session.commit(self.output),
                None => Err(SnapitError::InvalidState("no image is being edited".into())),
            }
        };
        let jpeg = rendered.inspect_err(|_| self.set_error(CROP_FAILED))?;

        let capture = CapturedImage::new_jpeg(jpeg);
        if let Err(e) = self.platform.storage_set(capture.to_storage()).await {
            warn!(error = %e, "could not hand the capture over");
            self.set_error(CROP_FAILED);
            return Err(e);
        }
        info!(id = %capture.id, bytes = capture.bytes.len(), "capture stored");

        self.teardown();
        if let Err(e) = self.platform.close_window().await {
            warn!(error = %e, "capture surface did not close");
        }
        Ok(capture.id)
    }

    /// Discard the frozen frame and go back to a live camera.
    pub async fn retake(&self) -> Result<()> {
        {
            let mut inner = self.lock();
            inner.session = None;
            inner.edit_image = None;
            inner.error = None;
        }
        debug!("retake");
        self.start().await
    }

    /// Release everything and close the surface.
    pub async fn close(&self) -> Result<()> {
        self.teardown();
        self.platform.close_window().await
    }

    /// Release the camera and drop any crop session. Safe to call repeatedly
    /// and from any state.
    pub fn teardown(&self) {
        self.camera.release();
        let mut inner = self.lock();
        inner.session = None;
        inner.edit_image = None;
        inner.camera_ready = false;
        inner.closed = true;
    }

    fn set_error(&self, message: &str) {
        self.lock().error = Some(message.to_string());
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted camera for flow tests.

    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use image::{DynamicImage, Rgb, RgbImage};
    use snapit_core::error::CameraFailure;
    use snapit_document::ImageProcessor;

    use super::*;

    pub fn jpeg(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, 90]));
        ImageProcessor::from_dynamic(DynamicImage::ImageRgb8(img))
            .to_jpeg_bytes(95)
            .expect("encode")
    }

    pub struct FakeCamera {
        pub failure: Mutex<Option<CameraFailure>>,
        pub frame: Vec<u8>,
        pub active: AtomicBool,
        pub acquisitions: AtomicUsize,
        /// Acquisitions made while a stream was still live.
        pub overlapping: AtomicUsize,
    }

    impl FakeCamera {
        pub fn new(width: u32, height: u32) -> Self {
            Self {
                failure: Mutex::new(None),
                frame: jpeg(width, height),
                active: AtomicBool::new(false),
                acquisitions: AtomicUsize::new(0),
                overlapping: AtomicUsize::new(0),
            }
        }

        pub fn failing(failure: CameraFailure) -> Self {
            let camera = Self::new(10, 10);
            *camera.failure.lock().unwrap() = Some(failure);
            camera
        }
    }

    impl CameraDevice for FakeCamera {
        async fn acquire(&self) -> std::result::Result<(), CameraFailure> {
            if let Some(f) = self.failure.lock().unwrap().clone() {
                return Err(f);
            }
            self.acquisitions.fetch_add(1, Ordering::SeqCst);
            if self.active.swap(true, Ordering::SeqCst) {
                self.overlapping.fetch_add(1, Ordering::SeqCst);
            }
            Ok(())
        }

        async fn grab_frame(&self) -> Result<Vec<u8>> {
            if !self.active.load(Ordering::SeqCst) {
                return Err(SnapitError::InvalidState("stream stopped".into()));
            }
            Ok(self.frame.clone())
        }

        fn release(&self) {
            self.active.store(false, Ordering::SeqCst);
        }

        fn is_active(&self) -> bool {
            self.active.load(Ordering::SeqCst)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use snapit_bridge::{ExtensionHost, ExtensionPlatform};
    use snapit_core::error::CameraFailure;
    use snapit_core::{CAPTURE_KEYS, WindowConfig};
    use snapit_document::ImageProcessor;

    use super::testing::FakeCamera;
    use super::*;

    async fn flow_in_window(
        camera: FakeCamera,
    ) -> (ExtensionHost, CaptureFlow<ExtensionPlatform, FakeCamera>) {
        let host = ExtensionHost::new(std::env::temp_dir());
        let handle = host
            .popup()
            .open_window(WindowConfig::centred("capture", 800, 700, (1920, 1080)))
            .await
            .expect("window");
        let flow = CaptureFlow::new(host.window(handle), camera, &AppConfig::default());
        (host, flow)
    }

    #[tokio::test]
    async fn denied_camera_keeps_capture_disabled() {
        let (_host, flow) = flow_in_window(FakeCamera::failing(CameraFailure::PermissionDenied)).await;
        let err = flow.start().await.expect_err("denied");
        assert!(matches!(err, SnapitError::Camera(CameraFailure::PermissionDenied)));

        let view = flow.view();
        assert!(!view.can_capture);
        assert!(!view.can_retry);
        assert_eq!(
            view.error.as_deref(),
            Some("Camera access failed. Please allow camera access in your settings.")
        );
        assert!(flow.capture(|_| {}).await.is_err());
    }

    #[tokio::test]
    async fn busy_camera_offers_a_retry() {
        let (_host, flow) =
            flow_in_window(FakeCamera::failing(CameraFailure::Other("Device busy".into()))).await;
        assert!(flow.start().await.is_err());
        let view = flow.view();
        assert!(view.can_retry);
        assert_eq!(view.error.as_deref(), Some("Camera access failed. Device busy"));

        *flow.camera.failure.lock().unwrap() = None;
        flow.start().await.expect("second attempt");
        let view = flow.view();
        assert!(view.can_capture);
        assert!(!view.can_retry);
        assert!(view.error.is_none());
    }

    #[tokio::test]
    async fn restarting_the_camera_stops_the_old_stream() {
        let (_host, flow) = flow_in_window(FakeCamera::new(10, 10)).await;
        flow.start().await.expect("camera");
        flow.retake().await.expect("retake while live");

        assert_eq!(flow.camera.acquisitions.load(Ordering::SeqCst), 2);
        assert_eq!(flow.camera.overlapping.load(Ordering::SeqCst), 0);
        assert!(flow.camera.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn capture_runs_phases_and_enters_edit() {
        let (_host, flow) = flow_in_window(FakeCamera::new(320, 240)).await;
        flow.start().await.expect("camera");
        assert!(flow.view().can_capture);

        let mut phases = Vec::new();
        flow.capture(|p| phases.push(p)).await.expect("capture");

        let countdown: Vec<u32> = phases
            .iter()
            .filter_map(|p| match p {
                CapturePhase::Countdown(t) => Some(t.value),
                _ => None,
            })
            .collect();
        assert_eq!(countdown, vec![3, 2, 1]);
        assert_eq!(
            &phases[3..],
            &[CapturePhase::Flash, CapturePhase::Success, CapturePhase::Cleared]
        );

        let view = flow.view();
        assert_eq!(view.state, CaptureState::Edit);
        assert_eq!(view.dimensions, Some((320, 240)));
        let expected = data_url::encode("image/jpeg", &flow.camera.frame);
        assert_eq!(view.edit_image.as_deref(), Some(expected.as_str()));
        flow.rotate_right().expect("rotate");
        assert_eq!(flow.view().edit_image, view.edit_image);
        assert!(!flow.camera.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_capture_is_rejected() {
        let (_host, flow) = flow_in_window(FakeCamera::new(64, 64)).await;
        flow.start().await.expect("camera");

        let (first, second) = tokio::join!(flow.capture(|_| {}), flow.capture(|_| {}));
        assert!(first.is_ok());
        assert!(matches!(second, Err(SnapitError::InvalidState(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn confirm_stores_capture_and_closes_window() {
        let (host, flow) = flow_in_window(FakeCamera::new(400, 300)).await;
        flow.start().await.expect("camera");
        flow.capture(|_| {}).await.expect("capture");

        flow.rotate_right().expect("rotate");
        flow.set_crop_region(CropRegion {
            x: 0,
            y: 0,
            width: 150,
            height: 200,
        })
        .expect("crop");
        let id = flow.confirm_crop().await.expect("confirm");

        let stored = host.storage_snapshot();
        assert_eq!(stored.len(), CAPTURE_KEYS.len());
        let capture = CapturedImage::from_storage(&stored)
            .expect("well-formed")
            .expect("present");
        assert_eq!(capture.id, id);
        let out = ImageProcessor::from_bytes(&capture.bytes).expect("jpeg");
        assert_eq!((out.width(), out.height()), (150, 200));

        assert!(host.open_windows().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn retake_drops_edit_state_and_reacquires() {
        let (_host, flow) = flow_in_window(FakeCamera::new(100, 100)).await;
        flow.start().await.expect("camera");
        flow.capture(|_| {}).await.expect("capture");
        flow.rotate_left().expect("rotate");

        flow.retake().await.expect("retake");
        let view = flow.view();
        assert_eq!(view.state, CaptureState::Camera);
        assert!(view.edit_image.is_none());
        assert!(view.crop_region.is_none());
        assert!(view.can_capture);
        assert_eq!(flow.camera.acquisitions.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn edit_operations_need_a_frame() {
        let (_host, flow) = flow_in_window(FakeCamera::new(10, 10)).await;
        assert!(flow.rotate_left().is_err());
        assert!(flow.reset_crop().is_err());
        assert!(flow.confirm_crop().await.is_err());
    }

    #[tokio::test]
    async fn teardown_is_idempotent() {
        let (_host, flow) = flow_in_window(FakeCamera::new(10, 10)).await;
        flow.start().await.expect("camera");
        flow.teardown();
        flow.teardown();
        assert!(!flow.camera.is_active());
        assert!(!flow.view().can_capture);
    }
}
