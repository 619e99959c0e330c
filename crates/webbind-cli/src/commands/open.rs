//! `webbind open`: show a page in a native window

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use webbind_core::{Webview, WindowConfig};
use webbind_ffi::EngineLibrary;

/// Page shown when neither the config nor the command line names one
pub const DEFAULT_URL: &str = "https://en.m.wikipedia.org/wiki/Main_Page";

#[derive(Debug, Args)]
pub struct OpenArgs {
    /// Native engine library (.so, .dylib or .dll)
    #[arg(long)]
    pub engine: PathBuf,
    /// Window configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Window title
    #[arg(long)]
    pub title: Option<String>,
    /// Window width
    #[arg(long)]
    pub width: Option<i32>,
    /// Window height
    #[arg(long)]
    pub height: Option<i32>,
    /// Page to open
    #[arg(long)]
    pub url: Option<String>,
    /// Enable developer tools
    #[arg(long)]
    pub debug: bool,
}

impl OpenArgs {
    /// The config file, if any, with command-line values layered on top
    pub fn window_config(&self) -> anyhow::Result<WindowConfig> {
        let mut config = match &self.config {
            Some(path) => WindowConfig::load(path)?,
            None => WindowConfig::default(),
        };
        if let Some(title) = &self.title {
            config.title = title.clone();
        }
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(url) = &self.url {
            config.url = Some(url.clone());
        }
        config.debug |= self.debug;
        if config.url.is_none() {
            config.url = Some(DEFAULT_URL.to_string());
        }
        Ok(config)
    }
}

pub fn execute(args: OpenArgs) -> anyhow::Result<()> {
    let config = args.window_config()?;
    let library = Arc::new(
        EngineLibrary::open(&args.engine)
            .with_context(|| format!("loading engine {}", args.engine.display()))?,
    );
    let engine = library.create_engine(config.debug)?;

    let webview = Webview::new(engine);
    webview.apply(&config);
    tracing::info!(title = %config.title, url = ?config.url, "window opened");
    webview.run();
    tracing::info!("window closed");
    Ok(())
}
