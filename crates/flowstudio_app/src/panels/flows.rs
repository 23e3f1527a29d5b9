// SPDX-License-Identifier: MIT OR Apache-2.0
//! Flow listing screen: create, open, delete.

use egui::{Color32, RichText};
use flowstudio_client::{Flow, FlowDraft, FlowStatus};

/// Action requested from the listing
pub enum FlowsAction {
    /// Reload the listing
    Refresh,
    /// Create a new flow
    Create(FlowDraft),
    /// Open a flow in the editor
    Open(String),
    /// Delete a flow
    Delete(String),
}

/// Flow listing state
#[derive(Default)]
pub struct FlowsPanel {
    draft_name: String,
    draft_error: Option<String>,
    /// A create call is in flight
    pub creating: bool,
}

impl FlowsPanel {
    /// Create an empty listing panel
    pub fn new() -> Self {
        Self::default()
    }

    /// Render the listing. Returns at most one action per frame.
    pub fn ui(
        &mut self,
        ui: &mut egui::Ui,
        flows: &[Flow],
        loading: bool,
    ) -> Option<FlowsAction> {
        let mut action = None;

        ui.horizontal(|ui| {
            ui.heading("Flows");
            if ui.add_enabled(!loading, egui::Button::new("\u{21bb} Refresh")).clicked() {
                action = Some(FlowsAction::Refresh);
            }
            if loading {
                ui.spinner();
            }
        });
        ui.add_space(4.0);

        // Create row: name is validated inline, before any network call
        ui.horizontal(|ui| {
            ui.add(
                egui::TextEdit::singleline(&mut self.draft_name)
                    .hint_text("new flow name")
                    .desired_width(240.0),
            );
            let create = ui.add_enabled(!self.creating, egui::Button::new("Create Flow"));
            if self.creating {
                ui.spinner();
            }
            if create.clicked() {
                if self.draft_name.trim().is_empty() {
                    self.draft_error = Some("flow name must not be empty".to_string());
                } else {
                    self.draft_error = None;
                    self.creating = true;
                    action = Some(FlowsAction::Create(FlowDraft {
                        name: self.draft_name.trim().to_string(),
                        ..FlowDraft::default()
                    }));
                }
            }
        });
        if let Some(error) = &self.draft_error {
            ui.label(RichText::new(error).color(Color32::from_rgb(220, 60, 60)));
        }
        ui.separator();

        if flows.is_empty() && !loading {
            ui.vertical_centered(|ui| {
                ui.add_space(40.0);
                ui.heading("No flows yet");
                ui.label("Create a flow to start building");
            });
            return action;
        }

        egui::ScrollArea::vertical().show(ui, |ui| {
            for flow in flows {
                ui.horizontal(|ui| {
                    ui.label(status_chip(flow.status));
                    ui.label(RichText::new(&flow.name).strong());
                    ui.label(format!(
                        "{} node(s), {} connection(s)",
                        flow.nodes.len(),
                        flow.connections.len()
                    ));
                    if let Some(updated) = flow.updated_at {
                        ui.label(
                            RichText::new(format!("updated {}", updated.format("%Y-%m-%d %H:%M")))
                                .color(Color32::from_gray(130)),
                        );
                    }

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.button("Delete").clicked() {
                            action = Some(FlowsAction::Delete(flow.id.clone()));
                        }
                        if ui.button("Open").clicked() {
                            action = Some(FlowsAction::Open(flow.id.clone()));
                        }
                    });
                });
                ui.separator();
            }
        });

        action
    }

    /// Reset the create row after a finished create call
    pub fn create_finished(&mut self, ok: bool) {
        self.creating = false;
        if ok {
            self.draft_name.clear();
        }
    }
}

fn status_chip(status: FlowStatus) -> RichText {
    let (label, color) = match status {
        FlowStatus::Draft => ("draft", Color32::from_gray(130)),
        FlowStatus::Active => ("active", Color32::from_rgb(34, 160, 90)),
        FlowStatus::Paused => ("paused", Color32::from_rgb(220, 160, 40)),
        FlowStatus::Error => ("error", Color32::from_rgb(220, 60, 60)),
    };
    RichText::new(label).color(color).monospace()
}
