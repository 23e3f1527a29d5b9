// SPDX-License-Identifier: MIT OR Apache-2.0
//! Screen panels: login form, flow listing, node palette, properties pane.

pub mod flows;
pub mod login;
pub mod palette;
pub mod properties;

pub use flows::{FlowsAction, FlowsPanel};
pub use login::{LoginPanel, LoginRequest};
pub use palette::PalettePanel;
pub use properties::PropertiesPanel;
