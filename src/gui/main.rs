mod app;
mod tabs;

use anyhow::{anyhow, Context, Result};
use eframe::egui;
use rust_s3ui::config::Config;
use rust_s3ui::connections::ConnectionManager;
use std::sync::Arc;
use tokio::runtime::Runtime;

fn main() -> Result<()> {
    env_logger::init();

    let runtime = Arc::new(Runtime::new().context("Failed to create Tokio runtime")?);
    let connections = ConnectionManager::load(Config::default_path()?)?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([800.0, 600.0]),
        ..Default::default()
    };

    eframe::run_native(
        "S3 Browser",
        options,
        Box::new(move |cc| {
            egui_extras::install_image_loaders(&cc.egui_ctx);
            Ok(Box::new(app::S3UiApp::new(cc, runtime, connections)))
        }),
    )
    .map_err(|e| anyhow!("GUI failed: {}", e))
}
