// SPDX-License-Identifier: MIT OR Apache-2.0
//! Flow Studio - visual flow editor.
//!
//! A desktop editor for building flows:
//! - Palette of typed nodes (triggers, databases, APIs, actions)
//! - Canvas for placing, wiring and repositioning nodes
//! - Properties pane with per-kind configuration forms
//! - REST-backed persistence behind a token-authenticated session
//!
//! ## Architecture
//!
//! The app owns a winit window with an egui-wgpu surface. Backend calls run
//! on a tokio runtime and return to the frame loop over a channel; the
//! graph model itself lives in `flowstudio_graph` and never touches I/O.

mod app;
mod panels;
mod remote;
mod state;

use app::StudioApp;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn main() {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("flowstudio_app=debug".parse().unwrap())
        .add_directive("flowstudio_client=debug".parse().unwrap())
        .add_directive("wgpu=warn".parse().unwrap())
        .add_directive("naga=warn".parse().unwrap());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Flow Studio v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = StudioApp::run() {
        tracing::error!("Flow Studio crashed: {e}");
        std::process::exit(1);
    }
}
