use anyhow::Context;
use dropzone_uploader::{DropzoneApp, WidgetConfig};
use eframe::CreationContext;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config_path =
        std::env::var("UPLOADER_CONFIG").unwrap_or_else(|_| "uploader.toml".to_string());
    let mut config = WidgetConfig::load(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path))?;
    if config.local_root.is_none() {
        config.local_root = std::env::var_os("HOME")
            .or_else(|| std::env::var_os("USERPROFILE"))
            .map(PathBuf::from);
    }
    tracing::info!(
        config = %config_path,
        adapters = config.enabled_adapters.len(),
        endpoint = %config.token_endpoint,
        "configuration loaded"
    );

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([640.0, 720.0])
            .with_min_inner_size([420.0, 480.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };

    eframe::run_native(
        "Dropzone Uploader",
        options,
        Box::new(move |cc: &CreationContext| Box::new(DropzoneApp::new(cc, config))),
    )
    .map_err(|e| anyhow::anyhow!("Failed to run application: {}", e))
}
