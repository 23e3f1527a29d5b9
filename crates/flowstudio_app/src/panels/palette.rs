// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node palette: category tabs over the registry catalog.

use flowstudio_graph::{NodeCategory, NodeKind, NodeRegistry, TriggerKind};

/// Palette panel state
pub struct PalettePanel {
    active: NodeCategory,
}

impl PalettePanel {
    /// Create a palette opened on the trigger tab
    pub fn new() -> Self {
        Self {
            active: NodeCategory::Trigger,
        }
    }

    /// Render the palette. Returns the kind to add when an entry is clicked.
    pub fn ui(
        &mut self,
        ui: &mut egui::Ui,
        registry: &NodeRegistry,
    ) -> Option<(NodeKind, Option<TriggerKind>)> {
        ui.heading("Components");
        ui.label("Click to add a node to the flow");
        ui.add_space(6.0);

        ui.horizontal_wrapped(|ui| {
            for category in NodeCategory::all() {
                ui.selectable_value(&mut self.active, *category, category.display_name());
            }
        });
        ui.separator();

        let mut picked = None;
        egui::ScrollArea::vertical().show(ui, |ui| {
            for spec in registry.specs_in_category(self.active) {
                let label = format!("{} {}", spec.icon, spec.kind.display_label());
                if ui
                    .add_sized([ui.available_width(), 28.0], egui::Button::new(label))
                    .clicked()
                {
                    picked = Some((spec.kind.clone(), trigger_for(&spec.kind)));
                }
            }
        });
        picked
    }
}

impl Default for PalettePanel {
    fn default() -> Self {
        Self::new()
    }
}

/// Trigger sub-kind implied by a palette entry
fn trigger_for(kind: &NodeKind) -> Option<TriggerKind> {
    match kind {
        NodeKind::Schedule => Some(TriggerKind::Schedule),
        NodeKind::Webhook => Some(TriggerKind::Webhook),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_subkind_only_for_trigger_entries() {
        assert_eq!(trigger_for(&NodeKind::Schedule), Some(TriggerKind::Schedule));
        assert_eq!(trigger_for(&NodeKind::Webhook), Some(TriggerKind::Webhook));
        assert_eq!(trigger_for(&NodeKind::Trigger), None);
        assert_eq!(trigger_for(&NodeKind::Postgresql), None);
    }
}
