// SPDX-License-Identifier: MIT OR Apache-2.0
//! Credential entry screen.

use egui::{Color32, RichText};

/// Submitted credentials
pub struct LoginRequest {
    /// Login name
    pub username: String,
    /// Password
    pub password: String,
}

/// Login form state
#[derive(Default)]
pub struct LoginPanel {
    username: String,
    password: String,
    /// A login call is in flight
    pub in_flight: bool,
    /// Last login failure, shown inline
    pub error: Option<String>,
}

impl LoginPanel {
    /// Create an empty form
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the password and error after a failed attempt
    pub fn fail(&mut self, message: String) {
        self.in_flight = false;
        self.password.clear();
        self.error = Some(message);
    }

    /// Render the form. Returns the credentials when submitted.
    pub fn ui(&mut self, ui: &mut egui::Ui) -> Option<LoginRequest> {
        let mut submitted = false;

        ui.vertical_centered(|ui| {
            ui.add_space(ui.available_height() * 0.25);
            ui.heading("Flow Studio");
            ui.label("Sign in to build and run flows");
            ui.add_space(16.0);

            ui.scope(|ui| {
                ui.set_max_width(280.0);

                ui.label("Username");
                ui.add(
                    egui::TextEdit::singleline(&mut self.username).hint_text("username"),
                );
                ui.add_space(6.0);

                ui.label("Password");
                let password_edit = ui.add(
                    egui::TextEdit::singleline(&mut self.password)
                        .password(true)
                        .hint_text("password"),
                );
                if password_edit.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                    submitted = true;
                }
                ui.add_space(10.0);

                if let Some(error) = &self.error {
                    ui.label(RichText::new(error).color(Color32::from_rgb(220, 60, 60)));
                    ui.add_space(6.0);
                }

                if self.in_flight {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label("Signing in...");
                    });
                } else if ui
                    .add_sized([280.0, 32.0], egui::Button::new("Sign In"))
                    .clicked()
                {
                    submitted = true;
                }
            });
        });

        if submitted && !self.in_flight {
            if self.username.trim().is_empty() || self.password.is_empty() {
                self.error = Some("username and password are required".to_string());
                return None;
            }
            self.in_flight = true;
            self.error = None;
            return Some(LoginRequest {
                username: self.username.trim().to_string(),
                password: std::mem::take(&mut self.password),
            });
        }
        None
    }
}
