// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Main window: launcher, preview of the latest capture, and the PDF review.

use std::future::Future;

use dioxus::prelude::*;
use snapit_bridge::DesktopPlatform;
use snapit_bridge::host::MAIN_SURFACE;
use snapit_core::{AssemblyState, ImageExportFormat};
use snapit_flow::{DocumentAssemblyFlow, StatusMessage, Tone};
use tokio::sync::mpsc;
use tracing::debug;

use crate::services::app_services::AppServices;
use crate::windows;

type Flow = DocumentAssemblyFlow<DesktopPlatform>;

const PRIMARY: &str = "width: 100%; padding: 14px; border-radius: 12px; border: none; background: #007aff; color: white; font-size: 16px;";
const SECONDARY: &str = "flex: 1; padding: 12px; border-radius: 8px; border: 1px solid #ccc; background: white;";

/// Click handler that runs `action` on its own task.
fn act<F, Fut>(flow: &Flow, action: F) -> impl FnMut(MouseEvent) + 'static
where
    F: Fn(Flow) -> Fut + 'static,
    Fut: Future<Output = ()> + 'static,
{
    let flow = flow.clone();
    move |_: MouseEvent| {
        spawn(action(flow.clone()));
    }
}

#[component]
pub fn DocumentAssembly() -> Element {
    let services = use_context::<AppServices>();
    let flow = use_hook(|| Flow::new(services.platform(MAIN_SURFACE), services.config().clone()));
    let mut snapshot = use_signal(|| flow.snapshot());

    // Wire storage, reset-state, and view updates once.
    use_hook({
        let flow = flow.clone();
        move || {
            let (tx, mut rx) = mpsc::unbounded_channel();
            let _ = flow.subscribe(move |snap| {
                let _ = tx.send(snap.clone());
            });

            let starting = flow.clone();
            spawn(async move {
                let _ = starting.start().await;
            });

            let reset = flow.clone();
            let _ = flow.platform().on_reset_state(move || {
                let reset = reset.clone();
                tokio::spawn(async move { reset.reset().await });
            });

            spawn(async move {
                while let Some(next) = rx.recv().await {
                    snapshot.set(next);
                }
            });
        }
    });

    let snap = snapshot.read().clone();

    let body = match snap.state {
        AssemblyState::Launcher => rsx! {
            div { style: "text-align: center; margin: 48px 0 24px; color: #666;",
                p { style: "font-size: 48px; margin: 0;", "\u{1F4F7}" }
                p { "Photograph a document, crop it, then save it as an image or a PDF." }
            }
            button {
                style: PRIMARY,
                onclick: {
                    let flow = flow.clone();
                    move |_: MouseEvent| {
                        let screen = windows::screen_size();
                        let flow = flow.clone();
                        spawn(async move {
                            let _ = flow.open_capture_surface(screen).await;
                        });
                    }
                },
                "Take Photo"
            }
        },

        AssemblyState::Preview => {
            let preview = snap.preview.clone().unwrap_or_default();
            let preferred = flow.default_image_format();
            let alternate = match preferred {
                ImageExportFormat::Jpeg => ImageExportFormat::Png,
                ImageExportFormat::Png => ImageExportFormat::Jpeg,
            };
            let save_label = format!("Save {}", preferred.label());
            let alternate_label = format!("Save {}", alternate.label());
            rsx! {
                img {
                    src: "{preview}",
                    style: "width: 100%; max-height: 50vh; object-fit: contain; border-radius: 8px; background: #f0f0f0;",
                }
                if let Some(hint) = snap.pdf_hint.clone() {
                    p { style: "color: #666; font-size: 13px; text-align: center;", "{hint}" }
                }
                button {
                    style: "{PRIMARY} margin-top: 12px;",
                    onclick: act(&flow, |f| async move {
                        let _ = f.download_default_image().await;
                    }),
                    "{save_label}"
                }
                div { style: "display: flex; gap: 8px; margin-top: 8px;",
                    button {
                        style: SECONDARY,
                        onclick: act(&flow, |f| async move {
                            let _ = f.copy_to_clipboard().await;
                        }),
                        "Copy"
                    }
                    button {
                        style: SECONDARY,
                        onclick: act(&flow, move |f| async move {
                            let _ = f.download_image(alternate).await;
                        }),
                        "{alternate_label}"
                    }
                }
                if snap.can_attach_to_page {
                    button {
                        style: "{SECONDARY} width: 100%; margin-top: 8px;",
                        onclick: act(&flow, |f| async move {
                            let outcome = f.attach_to_active_page().await;
                            debug!(success = outcome.success, "attach to page");
                        }),
                        "Attach to Page"
                    }
                }
                div { style: "display: flex; gap: 8px; margin-top: 8px;",
                    button {
                        style: SECONDARY,
                        onclick: {
                            let flow = flow.clone();
                            move |_: MouseEvent| flow.retake()
                        },
                        "Retake"
                    }
                    button {
                        style: "flex: 2; padding: 12px; border-radius: 8px; border: none; background: #34c759; color: white;",
                        onclick: act(&flow, |f| async move {
                            let _ = f.add_page().await;
                        }),
                        "Add to PDF"
                    }
                }
            }
        }

        AssemblyState::PdfReview => {
            let pages: Vec<(u32, String)> = flow
                .pages()
                .iter()
                .map(|page| (page.position, page.image.data_url()))
                .collect();
            let label = snap.page_count_label.clone();
            rsx! {
                h2 { style: "text-align: center;", "{label}" }
                div { style: "display: flex; gap: 8px; overflow-x: auto; padding: 8px 0;",
                    for (position, src) in pages {
                        div { key: "{position}", style: "min-width: 90px; text-align: center; font-size: 12px; color: #666;",
                            img { src: "{src}", style: "width: 90px; height: 120px; object-fit: cover; border: 1px solid #ccc; border-radius: 4px;" }
                            p { style: "margin: 4px 0 0;", "Page {position}" }
                        }
                    }
                }
                button {
                    style: PRIMARY,
                    onclick: act(&flow, |f| async move {
                        let _ = f.download_pdf().await;
                    }),
                    "Download PDF"
                }
                div { style: "display: flex; gap: 8px; margin-top: 8px;",
                    button {
                        style: SECONDARY,
                        onclick: {
                            let flow = flow.clone();
                            move |_: MouseEvent| flow.add_more_images()
                        },
                        "Add More Images"
                    }
                    button {
                        style: SECONDARY,
                        onclick: {
                            let flow = flow.clone();
                            move |_: MouseEvent| flow.clear_pages()
                        },
                        "Clear All"
                    }
                }
            }
        }
    };

    let corner_label = (snap.page_count > 0 && snap.state != AssemblyState::PdfReview)
        .then(|| snap.page_count_label.clone());

    rsx! {
        div {
            style: "display: flex; flex-direction: column; height: 100vh; padding: 16px; box-sizing: border-box; font-family: system-ui, -apple-system, sans-serif;",
            header { style: "display: flex; justify-content: space-between; align-items: baseline;",
                h1 { style: "margin: 0;", "SnapIt" }
                if let Some(label) = corner_label {
                    span { style: "color: #666; font-size: 13px;", "{label}" }
                }
            }
            StatusLine { status: snap.status.clone() }
            div { style: "flex: 1; overflow-y: auto;", {body} }
        }
    }
}

#[component]
fn StatusLine(status: StatusMessage) -> Element {
    let color = match status.tone {
        Tone::Neutral => "#555",
        Tone::Success => "#1a7f37",
        Tone::Error => "#c62828",
    };
    let text = status.text;
    rsx! {
        p { style: "margin: 8px 0 16px; color: {color}; min-height: 1.2em;", "{text}" }
    }
}
