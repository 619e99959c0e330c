//! `webbind scrape`: print an attribute of every matching element, repeatedly

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use clap::Args;
use crossbeam::channel::{self, RecvTimeoutError};
use webbind_core::{SizeHint, Webview};
use webbind_ffi::EngineLibrary;

#[derive(Debug, Args)]
pub struct ScrapeArgs {
    /// Native engine library (.so, .dylib or .dll)
    #[arg(long)]
    pub engine: PathBuf,
    /// Page to scrape
    #[arg(long, default_value = "http://google.com")]
    pub url: String,
    /// CSS selector
    #[arg(long, default_value = "a")]
    pub selector: String,
    /// Element property to collect
    #[arg(long, default_value = "href")]
    pub attr: String,
    /// Milliseconds between evaluations
    #[arg(long, default_value_t = 1000)]
    pub interval_ms: u64,
    /// Enable developer tools
    #[arg(long)]
    pub debug: bool,
}

/// Script that reports matches through the `result` binding
pub fn scrape_script(selector: &str, attr: &str) -> serde_json::Result<String> {
    // A JSON string is a valid JS string literal
    let selector = serde_json::to_string(selector)?;
    Ok(format!(
        "result(JSON.stringify([...document.querySelectorAll({selector})].map(x => x.{attr})))"
    ))
}

pub fn execute(args: ScrapeArgs) -> anyhow::Result<()> {
    let library = Arc::new(
        EngineLibrary::open(&args.engine)
            .with_context(|| format!("loading engine {}", args.engine.display()))?,
    );
    let webview = Webview::new(library.create_engine(args.debug)?);
    webview.set_title("webbind scrape");
    webview.set_size(800, 600, SizeHint::None);
    webview.navigate(&args.url);
    webview.bind("result", |json: String| println!("{json}"))?;

    let script = scrape_script(&args.selector, &args.attr)?;
    let interval = Duration::from_millis(args.interval_ms);
    let proxy = webview.proxy();
    let (stop, stopped) = channel::bounded::<()>(0);
    let ticker = thread::spawn(move || loop {
        match stopped.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => proxy.eval(script.as_str()),
            _ => break,
        }
    });

    webview.run();

    // The ticker must be gone before the window is destroyed
    drop(stop);
    if ticker.join().is_err() {
        tracing::warn!("scrape ticker panicked");
    }
    Ok(())
}
