use eframe::egui;
use rust_s3ui::config::S3Config;
use rust_s3ui::connections::ConnectionManager;

/// Requests the connection tab hands back to the app.
pub enum ConnectionAction {
    Save(S3Config),
    Remove(usize),
    Connect(usize),
    Copy { index: usize, name: String },
}

pub struct ConnectionTab {
    selected: Option<usize>,
    form: S3Config,
    show_secret: bool,
    error: Option<String>,
    /// Name being entered for a copy of the selected profile.
    copy_name: Option<String>,
}

impl ConnectionTab {
    pub fn new(connections: &ConnectionManager) -> Self {
        let selected = (connections.count() > 0).then_some(0);
        let form = selected
            .and_then(|i| connections.get(i))
            .cloned()
            .unwrap_or_default();
        Self {
            selected,
            form,
            show_secret: false,
            error: None,
            copy_name: None,
        }
    }

    /// Shows the profile at `selected` in the form, or an empty form.
    pub fn set_selected(&mut self, selected: Option<usize>, connections: &ConnectionManager) {
        self.selected = selected.filter(|&i| i < connections.count());
        self.form = self
            .selected
            .and_then(|i| connections.get(i))
            .cloned()
            .unwrap_or_default();
    }

    pub fn set_error(&mut self, error: Option<String>) {
        self.error = error;
    }

    pub fn show(&mut self, ui: &mut egui::Ui, connections: &ConnectionManager) -> Option<ConnectionAction> {
        let mut action = None;

        ui.heading("Connections");
        ui.separator();

        ui.columns(2, |columns| {
            let ui = &mut columns[0];
            ui.strong("Profiles");
            egui::ScrollArea::vertical()
                .id_salt("profiles")
                .show(ui, |ui| {
                    if connections.count() == 0 {
                        ui.label("No saved profiles yet");
                    }
                    for (index, profile) in connections.list().iter().enumerate() {
                        let label = if profile.is_transient() {
                            format!("{} (from environment)", profile.name)
                        } else {
                            profile.name.clone()
                        };
                        let response = ui.selectable_label(self.selected == Some(index), label);
                        if response.clicked() {
                            self.selected = Some(index);
                            self.form = profile.clone();
                            self.error = None;
                        }
                        if response.double_clicked() {
                            action = Some(ConnectionAction::Connect(index));
                        }
                    }
                });

            ui.add_space(10.0);
            if ui.button("➕ New Profile").clicked() {
                self.selected = None;
                self.form = S3Config::default();
                self.error = None;
            }

            let ui = &mut columns[1];
            ui.group(|ui| {
                egui::Grid::new("profile_form")
                    .num_columns(2)
                    .spacing([10.0, 6.0])
                    .show(ui, |ui| {
                        ui.label("Name:");
                        ui.text_edit_singleline(&mut self.form.name);
                        ui.end_row();

                        ui.label("Endpoint:");
                        ui.add(
                            egui::TextEdit::singleline(&mut self.form.endpoint)
                                .hint_text("s3.example.com:9000"),
                        );
                        ui.end_row();

                        ui.label("Access Key:");
                        ui.text_edit_singleline(&mut self.form.access_key);
                        ui.end_row();

                        ui.label("Secret Key:");
                        ui.horizontal(|ui| {
                            ui.add(
                                egui::TextEdit::singleline(&mut self.form.secret_key)
                                    .password(!self.show_secret),
                            );
                            ui.checkbox(&mut self.show_secret, "Show");
                        });
                        ui.end_row();

                        ui.label("Bucket:");
                        ui.text_edit_singleline(&mut self.form.bucket);
                        ui.end_row();

                        ui.label("Prefix:");
                        ui.text_edit_singleline(&mut self.form.prefix);
                        ui.end_row();

                        ui.label("Region:");
                        ui.add(egui::TextEdit::singleline(&mut self.form.region).hint_text("us-east-1"));
                        ui.end_row();

                        ui.label("");
                        ui.checkbox(&mut self.form.use_ssl, "Use SSL");
                        ui.end_row();
                    });

                ui.add_space(10.0);
                ui.horizontal(|ui| {
                    if ui.button("💾 Save").clicked() {
                        match self.validate() {
                            Ok(()) => {
                                self.error = None;
                                action = Some(ConnectionAction::Save(self.form.clone()));
                            }
                            Err(e) => self.error = Some(e),
                        }
                    }

                    if let Some(index) = self.selected {
                        if ui.button("🗑️ Remove").clicked() {
                            action = Some(ConnectionAction::Remove(index));
                        }
                        if ui.button("📄 Copy").clicked() {
                            self.copy_name = connections
                                .get(index)
                                .map(|p| format!("Copy of {}", p.name));
                        }
                        if ui.button("🔌 Connect").clicked() {
                            action = Some(ConnectionAction::Connect(index));
                        }
                    }
                });

                if let Some(error) = &self.error {
                    ui.colored_label(egui::Color32::RED, error);
                }
            });
        });

        let mut close = self.selected.is_none();
        if let (Some(index), Some(name)) = (self.selected, self.copy_name.as_mut()) {
            egui::Window::new("Copy Connection")
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                .show(ui.ctx(), |ui| {
                    ui.label("New connection name:");
                    ui.text_edit_singleline(name);
                    ui.horizontal(|ui| {
                        if ui.button("Copy Connection").clicked() {
                            action = Some(ConnectionAction::Copy {
                                index,
                                name: name.clone(),
                            });
                            close = true;
                        }
                        if ui.button("Abort").clicked() {
                            close = true;
                        }
                    });
                });
        }
        if close {
            self.copy_name = None;
        }

        action
    }

    fn validate(&self) -> Result<(), String> {
        if self.form.name.trim().is_empty() {
            return Err("Profile name is required".to_string());
        }
        if self.form.is_transient() {
            return Err(format!("{} is reserved for the environment profile", self.form.name));
        }
        if self.form.endpoint.trim().is_empty() {
            return Err("Endpoint is required".to_string());
        }
        if self.form.bucket.trim().is_empty() {
            return Err("Bucket is required".to_string());
        }
        Ok(())
    }
}
