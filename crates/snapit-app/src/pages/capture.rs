// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Capture window: live camera, countdown, then the crop/rotate editor.
//
// Runs in its own VirtualDom. The `<video>` element stays mounted in every
// state so the camera is acquired exactly once per mount.

use std::sync::Arc;

use dioxus::prelude::*;
use snapit_bridge::DesktopPlatform;
use snapit_core::{AppConfig, CaptureState};
use snapit_document::CropRegion;
use snapit_flow::{CaptureFlow, CapturePhase, CaptureView};
use tokio::sync::Notify;
use tracing::debug;

use crate::services::camera::{VIDEO_ELEMENT_ID, WebviewCamera};

type Flow = CaptureFlow<DesktopPlatform, WebviewCamera>;

/// Root context of a capture window.
#[derive(Clone)]
pub struct CaptureContext {
    pub platform: DesktopPlatform,
    pub config: AppConfig,
    /// Notified when the host closes this surface.
    pub close: Arc<Notify>,
}

#[derive(Clone, Copy, PartialEq)]
enum Edge {
    Left,
    Top,
    Width,
    Height,
}

impl Edge {
    fn label(self) -> &'static str {
        match self {
            Edge::Left => "Left",
            Edge::Top => "Top",
            Edge::Width => "Width",
            Edge::Height => "Height",
        }
    }

    fn get(self, region: &CropRegion) -> u32 {
        match self {
            Edge::Left => region.x,
            Edge::Top => region.y,
            Edge::Width => region.width,
            Edge::Height => region.height,
        }
    }

    fn with(self, mut region: CropRegion, value: u32) -> CropRegion {
        match self {
            Edge::Left => region.x = value,
            Edge::Top => region.y = value,
            Edge::Width => region.width = value,
            Edge::Height => region.height = value,
        }
        region
    }

    /// Slider upper bound for an image of `dimensions`.
    fn max(self, (width, height): (u32, u32)) -> u32 {
        match self {
            Edge::Left | Edge::Width => width,
            Edge::Top | Edge::Height => height,
        }
    }
}

#[component]
pub fn CaptureWindow() -> Element {
    let ctx = use_context::<CaptureContext>();
    let flow = use_hook(|| {
        Flow::new(
            ctx.platform.clone(),
            WebviewCamera::new(ctx.config.jpeg_quality),
            &ctx.config,
        )
    });
    let mut view = use_signal(|| flow.view());
    let mut phase = use_signal(|| CapturePhase::Cleared);

    // Host-initiated close.
    use_hook({
        let flow = flow.clone();
        let close = Arc::clone(&ctx.close);
        move || {
            spawn(async move {
                close.notified().await;
                debug!("close requested by host");
                flow.teardown();
                dioxus::desktop::window().close();
            });
        }
    });
    use_drop({
        let flow = flow.clone();
        move || flow.teardown()
    });

    let start_camera = {
        let flow = flow.clone();
        move |_: MountedEvent| {
            let flow = flow.clone();
            spawn(async move {
                let _ = flow.start().await;
                view.set(flow.view());
            });
        }
    };
    let retry = {
        let flow = flow.clone();
        move |_: MouseEvent| {
            let flow = flow.clone();
            spawn(async move {
                let _ = flow.start().await;
                view.set(flow.view());
            });
        }
    };

    let capture = {
        let flow = flow.clone();
        move |_: MouseEvent| {
            let flow = flow.clone();
            spawn(async move {
                let watcher = flow.clone();
                let result = flow
                    .capture(|p| {
                        phase.set(p);
                        view.set(watcher.view());
                    })
                    .await;
                if let Err(e) = result {
                    debug!(error = %e, "capture did not complete");
                }
                view.set(flow.view());
            });
        }
    };

    let close = {
        let flow = flow.clone();
        move |_: MouseEvent| {
            let flow = flow.clone();
            spawn(async move {
                let _ = flow.close().await;
            });
        }
    };

    let current = view.read().clone();
    let editing = current.state == CaptureState::Edit;
    let video_style = if editing {
        "display: none;"
    } else {
        "width: 100%; max-height: 70vh; background: #000; border-radius: 8px;"
    };

    rsx! {
        div {
            style: "display: flex; flex-direction: column; gap: 12px; padding: 16px; height: 100vh; box-sizing: border-box; font-family: system-ui, -apple-system, sans-serif;",

            div { style: "position: relative;",
                video {
                    id: VIDEO_ELEMENT_ID,
                    style: "{video_style}",
                    autoplay: true,
                    muted: true,
                    "playsinline": "true",
                    onmounted: start_camera,
                }
                if !editing {
                    Overlay { phase: phase() }
                }
            }

            if let Some(error) = current.error.clone() {
                p { style: "color: #c62828; margin: 0;", "{error}" }
            }
            if current.can_retry {
                button {
                    style: "padding: 10px; border-radius: 8px; border: 1px solid #ccc; background: white;",
                    onclick: retry,
                    "Try Again"
                }
            }

            if editing {
                CropEditor { flow: FlowHandle(flow.clone()), view: current.clone(), on_change: move |next| view.set(next) }
            } else {
                div { style: "display: flex; gap: 8px;",
                    button {
                        style: "flex: 1; padding: 14px; border-radius: 10px; border: none; background: #007aff; color: white; font-size: 16px;",
                        disabled: !current.can_capture,
                        onclick: capture,
                        if current.capturing { "Capturing..." } else { "Capture" }
                    }
                    button {
                        style: "padding: 14px; border-radius: 10px; border: 1px solid #ccc; background: white;",
                        onclick: close,
                        "Close"
                    }
                }
            }
        }
    }
}

#[component]
fn Overlay(phase: CapturePhase) -> Element {
    match phase {
        CapturePhase::Countdown(tick) => {
            let value = tick.value;
            let percent = (tick.progress * 100.0).round();
            rsx! {
                div { style: "position: absolute; inset: 0; display: flex; flex-direction: column; align-items: center; justify-content: center; color: white; font-size: 96px; font-weight: 700; text-shadow: 0 2px 8px rgba(0,0,0,.6);",
                    "{value}"
                    div { style: "width: 60%; height: 6px; background: rgba(255,255,255,.3); border-radius: 3px;",
                        div { style: "width: {percent}%; height: 100%; background: white; border-radius: 3px;" }
                    }
                }
            }
        }
        CapturePhase::Flash => rsx! {
            div { style: "position: absolute; inset: 0; background: white; opacity: 0.9; border-radius: 8px;" }
        },
        CapturePhase::Success => rsx! {
            div { style: "position: absolute; inset: 0; display: flex; align-items: center; justify-content: center; font-size: 72px; color: #34c759;",
                "\u{2713}"
            }
        },
        CapturePhase::Cleared => rsx! {},
    }
}

/// `CaptureFlow` as a component prop. Every handle to one flow compares equal.
#[derive(Clone)]
struct FlowHandle(Flow);

impl PartialEq for FlowHandle {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

#[component]
fn CropEditor(flow: FlowHandle, view: CaptureView, on_change: EventHandler<CaptureView>) -> Element {
    let FlowHandle(flow) = flow;
    let dimensions = view.dimensions.unwrap_or((0, 0));
    let region = view
        .crop_region
        .unwrap_or_else(|| CropRegion::full(dimensions.0, dimensions.1));
    let rotation = view.rotation_degrees;
    let src = view.edit_image.clone().unwrap_or_default();
    let summary = format!(
        "Crop {}\u{00d7}{} at ({}, {}) of {}\u{00d7}{}",
        region.width, region.height, region.x, region.y, dimensions.0, dimensions.1
    );
    let sliders: Vec<(Edge, &'static str, u32, u32)> = [Edge::Left, Edge::Top, Edge::Width, Edge::Height]
        .into_iter()
        .map(|edge| (edge, edge.label(), edge.max(dimensions), edge.get(&region)))
        .collect();

    let sync = {
        let flow = flow.clone();
        move || on_change.call(flow.view())
    };
    let edit = |f: fn(&Flow) -> snapit_core::error::Result<()>| {
        let flow = flow.clone();
        let sync = sync.clone();
        move |_: MouseEvent| {
            if let Err(e) = f(&flow) {
                debug!(error = %e, "edit ignored");
            }
            sync();
        }
    };

    let retake = {
        let flow = flow.clone();
        let sync = sync.clone();
        move |_: MouseEvent| {
            let flow = flow.clone();
            let sync = sync.clone();
            spawn(async move {
                let _ = flow.retake().await;
                sync();
            });
        }
    };
    let confirm = {
        let flow = flow.clone();
        let sync = sync.clone();
        move |_: MouseEvent| {
            let flow = flow.clone();
            let sync = sync.clone();
            spawn(async move {
                if flow.confirm_crop().await.is_err() {
                    sync();
                }
            });
        }
    };

    rsx! {
        div { style: "display: flex; flex-direction: column; gap: 12px;",
            div { style: "display: flex; justify-content: center; align-items: center; min-height: 40vh; overflow: hidden; background: #111; border-radius: 8px;",
                img {
                    src: "{src}",
                    style: "max-width: 100%; max-height: 50vh; transform: rotate({rotation}deg);",
                }
            }
            p { style: "margin: 0; color: #666; font-size: 13px;", "{summary}" }
            for (edge, name, max, value) in sliders {
                label { key: "{name}", style: "display: flex; gap: 8px; align-items: center; font-size: 13px;",
                    span { style: "width: 56px;", "{name}" }
                    input {
                        r#type: "range",
                        style: "flex: 1;",
                        min: "0",
                        max: "{max}",
                        value: "{value}",
                        oninput: {
                            let flow = flow.clone();
                            let sync = sync.clone();
                            move |e: FormEvent| {
                                if let Ok(value) = e.value().parse::<u32>() {
                                    let _ = flow.set_crop_region(edge.with(region, value));
                                    sync();
                                }
                            }
                        },
                    }
                }
            }
            div { style: "display: flex; gap: 8px; flex-wrap: wrap;",
                button { style: "flex: 1; padding: 10px;", onclick: edit(Flow::rotate_left), "\u{21BA} Rotate Left" }
                button { style: "flex: 1; padding: 10px;", onclick: edit(Flow::rotate_right), "\u{21BB} Rotate Right" }
                button { style: "flex: 1; padding: 10px;", onclick: edit(Flow::reset_crop), "Reset" }
            }
            div { style: "display: flex; gap: 8px;",
                button {
                    style: "flex: 1; padding: 14px; border-radius: 10px; border: 1px solid #ccc; background: white;",
                    onclick: retake,
                    "Retake"
                }
                button {
                    style: "flex: 2; padding: 14px; border-radius: 10px; border: none; background: #34c759; color: white; font-size: 16px;",
                    onclick: confirm,
                    "Use Photo"
                }
            }
        }
    }
}
