// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// End-to-end: capture surface → shared storage → main surface → export, over
// both the extension host and the desktop host bridge.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use image::{DynamicImage, Rgb, RgbImage};
use snapit_bridge::host::{FileFilter, MAIN_SURFACE};
use snapit_bridge::{
    CameraDevice, DesktopPlatform, ExtensionHost, HostBridge, HostConnector, KvStore, NativeShell,
    Platform,
};
use snapit_core::error::{CameraFailure, Result, SnapitError};
use snapit_core::{
    AppConfig, AssemblyState, CAPTURE_KEYS, ImageExportFormat, SurfaceId, WindowConfig,
    WindowHandle,
};
use snapit_document::ImageProcessor;
use snapit_flow::{AssemblySnapshot, CaptureFlow, DocumentAssemblyFlow, Tone};
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

struct StillCamera {
    frame: Vec<u8>,
    active: AtomicBool,
}

impl StillCamera {
    fn new(width: u32, height: u32) -> Self {
        let img = RgbImage::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, 200]));
        let frame = ImageProcessor::from_dynamic(DynamicImage::ImageRgb8(img))
            .to_jpeg_bytes(95)
            .expect("encode");
        Self {
            frame,
            active: AtomicBool::new(false),
        }
    }
}

impl CameraDevice for StillCamera {
    async fn acquire(&self) -> std::result::Result<(), CameraFailure> {
        self.active.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn grab_frame(&self) -> Result<Vec<u8>> {
        Ok(self.frame.clone())
    }

    fn release(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Default)]
struct ScriptedShell {
    save_to: Option<PathBuf>,
    closed: Arc<Mutex<Vec<SurfaceId>>>,
}

impl NativeShell for ScriptedShell {
    async fn open_window(&self, surface: SurfaceId, _config: WindowConfig) -> Result<WindowHandle> {
        Ok(WindowHandle(surface.0))
    }

    async fn close_window(&self, surface: SurfaceId) -> Result<()> {
        self.closed.lock().unwrap().push(surface);
        Ok(())
    }

    async fn save_dialog(&self, _name: &str, _filters: &[FileFilter]) -> Option<PathBuf> {
        self.save_to.clone()
    }

    async fn write_clipboard_image(&self, _mime: &str, _bytes: Vec<u8>) -> Result<()> {
        Err(SnapitError::Clipboard("no clipboard in tests".into()))
    }
}

fn desktop(shell: ScriptedShell) -> HostConnector {
    desktop_over(KvStore::open_in_memory().expect("store"), shell)
}

fn desktop_over(store: KvStore, shell: ScriptedShell) -> HostConnector {
    let (connector, inbox) = HostConnector::channel();
    let host = Arc::new(HostBridge::new(store, shell, &connector));
    tokio::spawn(host.serve(inbox));
    connector
}

/// Pixel size of the single image drawn on each page, in page order.
fn page_image_sizes(pdf: &lopdf::Document) -> Vec<(u32, u32)> {
    pdf.get_pages()
        .values()
        .map(|&page_id| {
            let images = pdf.get_page_images(page_id).expect("page images");
            assert_eq!(images.len(), 1, "one image per page");
            (images[0].width as u32, images[0].height as u32)
        })
        .collect()
}

/// Forward every assembly snapshot into a channel.
fn watch<P>(flow: &DocumentAssemblyFlow<P>) -> mpsc::UnboundedReceiver<AssemblySnapshot>
where
    P: Platform + snapit_bridge::ImageClipboard,
{
    let (tx, rx) = mpsc::unbounded_channel();
    // Stays registered for the flow's lifetime.
    let _ = flow.subscribe(move |snap| {
        let _ = tx.send(snap.clone());
    });
    rx
}

async fn wait_for_state(
    rx: &mut mpsc::UnboundedReceiver<AssemblySnapshot>,
    state: AssemblyState,
) -> AssemblySnapshot {
    loop {
        let snap = tokio::time::timeout(Duration::from_secs(30), rx.recv())
            .await
            .expect("timed out waiting for assembly state")
            .expect("flow dropped");
        if snap.state == state {
            return snap;
        }
    }
}

/// Run one capture surface to completion: the capture lands in storage and
/// the surface closes.
async fn capture_once<P: Platform>(platform: P, camera: StillCamera) {
    let flow = CaptureFlow::new(platform, camera, &AppConfig::default());
    flow.start().await.expect("camera");
    flow.capture(|_| {}).await.expect("capture");
    flow.confirm_crop().await.expect("confirm");
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn capture_reaches_preview_with_identical_bytes() {
    let host = ExtensionHost::new(std::env::temp_dir());
    let assembly = DocumentAssemblyFlow::new(host.popup(), AppConfig::default());
    let mut snapshots = watch(&assembly);

    let stored = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&stored);
    let _recorder = host.popup().on_storage_changed(move |changes| {
        if let Ok(Some(capture)) = snapit_core::CapturedImage::from_changes(changes) {
            *sink.lock().unwrap() = Some(capture);
        }
    });
    let _listening = assembly.listen();

    let handle = assembly
        .open_capture_surface((1920, 1080))
        .await
        .expect("open");
    let (_, config) = host.open_windows()[0].clone();
    assert_eq!((config.width, config.height), (800, 700));
    assert_eq!((config.left, config.top), (560, 190));

    capture_once(host.window(handle), StillCamera::new(320, 200)).await;

    let snap = wait_for_state(&mut snapshots, AssemblyState::Preview).await;
    let written = stored.lock().unwrap().clone().expect("capture was written");
    assert_eq!(snap.preview, Some(written.data_url()));

    for _ in 0..100 {
        if host.storage_snapshot().is_empty() {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert!(host.storage_snapshot().is_empty());
    assert!(host.open_windows().is_empty());
}

#[tokio::test(start_paused = true)]
async fn three_captures_make_a_three_page_pdf_in_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    let target = dir.path().join("document.pdf");
    let connector = desktop(ScriptedShell {
        save_to: Some(target.clone()),
        ..ScriptedShell::default()
    });

    let main = DesktopPlatform::new(connector.client(MAIN_SURFACE));
    let assembly = DocumentAssemblyFlow::new(main, AppConfig::default());
    let mut snapshots = watch(&assembly);
    let _listening = assembly.listen();

    let sizes = [(300, 100), (100, 300), (200, 200)];
    for (i, (w, h)) in sizes.into_iter().enumerate() {
        let handle = assembly
            .open_capture_surface((1280, 800))
            .await
            .expect("open");
        let surface = DesktopPlatform::new(connector.client(SurfaceId(handle.0)));
        capture_once(surface, StillCamera::new(w, h)).await;

        wait_for_state(&mut snapshots, AssemblyState::Preview).await;
        assert_eq!(assembly.add_page().await.expect("add"), i as u32 + 1);
        if i < sizes.len() - 1 {
            assembly.add_more_images();
        }
    }

    let snap = assembly.snapshot();
    assert_eq!(snap.state, AssemblyState::PdfReview);
    assert_eq!(snap.page_count_label, "3 Pages Added");

    let pages = assembly.pages();
    let dims: Vec<(u32, u32)> = pages
        .iter()
        .map(|p| {
            let img = ImageProcessor::from_bytes(&p.image.bytes).expect("page image");
            (img.width(), img.height())
        })
        .collect();
    assert_eq!(dims, sizes.to_vec());
    assert_eq!(
        pages.iter().map(|p| p.position).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );

    let outcome = assembly.download_pdf().await.expect("pdf");
    assert!(outcome.success);
    assert_eq!(outcome.path.as_deref(), Some(target.display().to_string().as_str()));
    let pdf = lopdf::Document::load(&target).expect("parse");
    assert_eq!(pdf.get_pages().len(), 3);
    assert_eq!(page_image_sizes(&pdf), sizes.to_vec());
    assert_eq!(assembly.snapshot().status.text, "PDF with 3 pages generated!");

    let left: Vec<_> = DesktopPlatform::new(connector.client(MAIN_SURFACE))
        .storage_get(&CAPTURE_KEYS)
        .await
        .into_keys()
        .collect();
    assert!(left.is_empty(), "mailbox not cleared: {left:?}");
}

#[tokio::test(start_paused = true)]
async fn cancelled_download_is_neutral() {
    let connector = desktop(ScriptedShell::default());
    let main = DesktopPlatform::new(connector.client(MAIN_SURFACE));
    let assembly = DocumentAssemblyFlow::new(main.clone(), AppConfig::default());
    let mut snapshots = watch(&assembly);
    let _listening = assembly.listen();

    let capture_surface = DesktopPlatform::new(connector.client(SurfaceId(99)));
    capture_once(capture_surface, StillCamera::new(64, 48)).await;
    wait_for_state(&mut snapshots, AssemblyState::Preview).await;

    let outcome = assembly
        .download_image(ImageExportFormat::Jpeg)
        .await
        .expect("cancel is not an error");
    assert!(!outcome.success);
    let status = assembly.snapshot().status;
    assert_eq!(status.tone, Tone::Neutral);
    assert_eq!(status.text, "Download cancelled");

    assert!(assembly.copy_to_clipboard().await.is_err());
    assert_eq!(assembly.snapshot().status.text, "Failed to copy");
}

#[tokio::test(start_paused = true)]
async fn reset_state_from_host_returns_to_launcher() {
    let (connector, inbox) = HostConnector::channel();
    let host = Arc::new(HostBridge::new(
        KvStore::open_in_memory().expect("store"),
        ScriptedShell::default(),
        &connector,
    ));
    tokio::spawn(Arc::clone(&host).serve(inbox));

    let main = DesktopPlatform::new(connector.client(MAIN_SURFACE));
    let assembly = DocumentAssemblyFlow::new(main.clone(), AppConfig::default());
    let mut snapshots = watch(&assembly);
    let _listening = assembly.listen();

    capture_once(
        DesktopPlatform::new(connector.client(SurfaceId(5))),
        StillCamera::new(40, 40),
    )
    .await;
    wait_for_state(&mut snapshots, AssemblyState::Preview).await;

    let flow = assembly.clone();
    let _reset = main.on_reset_state(move || {
        let flow = flow.clone();
        tokio::spawn(async move { flow.reset().await });
    });
    host.broadcast_reset();

    let snap = wait_for_state(&mut snapshots, AssemblyState::Launcher).await;
    assert!(snap.preview.is_none());
    assert_eq!(snap.page_count, 0);
}

#[tokio::test]
async fn startup_drops_captures_left_by_an_earlier_session() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("storage.db");
    let stale = snapit_core::CapturedImage::new_jpeg(StillCamera::new(16, 16).frame);
    {
        let mut store = KvStore::open(&db).expect("store");
        store.set(&stale.to_storage()).expect("seed");
    }

    let connector = desktop_over(KvStore::open(&db).expect("reopen"), ScriptedShell::default());
    let main = DesktopPlatform::new(connector.client(MAIN_SURFACE));
    assert_eq!(main.storage_get(&CAPTURE_KEYS).await.len(), CAPTURE_KEYS.len());

    let assembly = DocumentAssemblyFlow::new(main.clone(), AppConfig::default());
    let _listening = assembly.start().await;

    assert!(main.storage_get(&CAPTURE_KEYS).await.is_empty());
    let snap = assembly.snapshot();
    assert_eq!(snap.state, AssemblyState::Launcher);
    assert!(snap.preview.is_none());
    assert_eq!(KvStore::open(&db).expect("reopen").len().expect("len"), 0);
}
