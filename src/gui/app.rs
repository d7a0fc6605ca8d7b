use super::tabs::{BrowserTab, ConnectionAction, ConnectionTab};
use anyhow::Result;
use eframe::egui;
use rust_s3ui::browser::Browser;
use rust_s3ui::config::S3Config;
use rust_s3ui::connections::ConnectionManager;
use rust_s3ui::s3_client::S3Client;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing::{error, info};

#[derive(PartialEq)]
enum Tab {
    Connections,
    Browser,
}

pub struct S3UiApp {
    runtime: Arc<Runtime>,
    connections: ConnectionManager,
    active_tab: Tab,
    connection_tab: ConnectionTab,
    browser_tab: BrowserTab,
    /// Name and bucket of the connected profile.
    connected: Option<(String, String)>,
    status_message: String,
}

impl S3UiApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        runtime: Arc<Runtime>,
        connections: ConnectionManager,
    ) -> Self {
        let connection_tab = ConnectionTab::new(&connections);
        Self {
            runtime,
            connections,
            active_tab: Tab::Connections,
            connection_tab,
            browser_tab: BrowserTab::new(),
            connected: None,
            status_message: "Ready".to_string(),
        }
    }

    fn connect(&mut self, index: usize) {
        let profile = match self.connections.select(index) {
            Ok(profile) => profile.clone(),
            Err(e) => {
                self.status_message = e.to_string();
                return;
            }
        };
        match self.open_browser(&profile) {
            Ok(browser) => {
                info!(profile = %profile.name, bucket = %profile.bucket, "connected");
                self.status_message = format!("Connected to {}", profile.name);
                self.connected = Some((profile.name.clone(), profile.bucket.clone()));
                self.browser_tab.attach(browser, &profile.prefix);
                self.active_tab = Tab::Browser;
            }
            Err(e) => {
                error!("Failed to connect to {}: {:#}", profile.name, e);
                self.status_message = format!("Failed to connect: {}", e);
            }
        }
    }

    fn open_browser(&self, profile: &S3Config) -> Result<Browser> {
        let client = S3Client::new(profile)?;
        Ok(Browser::new(
            Arc::new(client),
            self.runtime.handle().clone(),
            self.connections.config().browser.clone(),
        ))
    }

    fn run_action(&mut self, action: ConnectionAction) {
        match action {
            ConnectionAction::Save(profile) => {
                let name = profile.name.clone();
                let index = self.connections.add(profile);
                self.connection_tab.set_selected(Some(index), &self.connections);
                self.status_message = match self.connections.save() {
                    Ok(()) => format!("Saved profile {}", name),
                    Err(e) => format!("Failed to save profiles: {}", e),
                };
            }
            ConnectionAction::Remove(index) => {
                if let Some(removed) = self.connections.remove(index) {
                    if self.connected.as_ref().is_some_and(|(name, _)| *name == removed.name) {
                        self.connected = None;
                        self.browser_tab.detach();
                    }
                    self.connection_tab.set_selected(None, &self.connections);
                    self.status_message = match self.connections.save() {
                        Ok(()) => format!("Removed profile {}", removed.name),
                        Err(e) => format!("Failed to save profiles: {}", e),
                    };
                }
            }
            ConnectionAction::Connect(index) => self.connect(index),
            ConnectionAction::Copy { index, name } => match self.connections.duplicate(index, &name) {
                Ok(copy) => {
                    self.connection_tab.set_selected(Some(copy), &self.connections);
                    self.status_message = match self.connections.save() {
                        Ok(()) => format!("Copied profile to {}", name.trim()),
                        Err(e) => format!("Failed to save profiles: {}", e),
                    };
                }
                Err(e) => self.connection_tab.set_error(Some(e.to_string())),
            },
        }
    }
}

impl eframe::App for S3UiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.browser_tab.pump(ctx);

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("🗄️ S3 Browser");
                ui.separator();

                match &self.connected {
                    Some((name, bucket)) => {
                        ui.colored_label(egui::Color32::GREEN, "● Connected");
                        ui.label(format!("{} / {}", name, bucket));
                    }
                    None => {
                        ui.colored_label(egui::Color32::RED, "● Disconnected");
                    }
                }
            });
        });

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                match self.browser_tab.status_line() {
                    Some(line) => ui.label(line),
                    None => ui.label(format!("Status: {}", self.status_message)),
                };
            });
        });

        egui::SidePanel::left("side_panel")
            .default_width(150.0)
            .show(ctx, |ui| {
                ui.vertical(|ui| {
                    ui.heading("Navigation");
                    ui.separator();
                    ui.selectable_value(&mut self.active_tab, Tab::Connections, "🔌 Connections");
                    ui.selectable_value(&mut self.active_tab, Tab::Browser, "📦 Browser");
                });
            });

        let mut action = None;
        egui::CentralPanel::default().show(ctx, |ui| match self.active_tab {
            Tab::Connections => action = self.connection_tab.show(ui, &self.connections),
            Tab::Browser => self.browser_tab.show(ui),
        });
        if let Some(action) = action {
            self.run_action(action);
        }
    }
}
