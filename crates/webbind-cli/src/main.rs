//! webbind command-line host
//!
//! Opens native web windows through an engine library, or exercises
//! bindings headlessly.

use clap::{Parser, Subcommand};

mod commands;
mod logging;

use commands::{call::CallArgs, open::OpenArgs, scrape::ScrapeArgs};

#[derive(Parser)]
#[command(name = "webbind")]
#[command(about = "Host web pages in native windows", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a window and run until it is closed
    Open(OpenArgs),

    /// Repeatedly collect an attribute from every element matching a selector
    Scrape(ScrapeArgs),

    /// Call a demo binding on a headless engine and print the result
    Call(CallArgs),
}

fn main() -> anyhow::Result<()> {
    logging::init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Open(args) => commands::open::execute(args),
        Commands::Scrape(args) => commands::scrape::execute(args),
        Commands::Call(args) => commands::call::execute(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::io::Write;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_scrape_defaults() {
        let cli = Cli::try_parse_from(["webbind", "scrape", "--engine", "libengine.so"]).unwrap();
        let Commands::Scrape(args) = cli.command else {
            panic!("expected scrape");
        };
        assert_eq!(args.selector, "a");
        assert_eq!(args.attr, "href");
        assert_eq!(args.interval_ms, 1000);
    }

    #[test]
    fn test_open_flags_override_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "title = \"from file\"\nwidth = 1024\nurl = \"https://example.com\"").unwrap();
        let path = file.path().to_str().unwrap();

        let cli = Cli::try_parse_from([
            "webbind", "open", "--engine", "libengine.so", "--config", path, "--title", "cli",
        ])
        .unwrap();
        let Commands::Open(args) = cli.command else {
            panic!("expected open");
        };
        let config = args.window_config().unwrap();
        assert_eq!(config.title, "cli");
        assert_eq!(config.width, 1024);
        assert_eq!(config.height, 600);
        assert_eq!(config.url.as_deref(), Some("https://example.com"));
    }

    #[test]
    fn test_open_default_url() {
        let cli = Cli::try_parse_from(["webbind", "open", "--engine", "x.so"]).unwrap();
        let Commands::Open(args) = cli.command else {
            panic!("expected open");
        };
        let config = args.window_config().unwrap();
        assert_eq!(config.url.as_deref(), Some(commands::open::DEFAULT_URL));
        assert_eq!(config.title, "webbind");
    }

    #[test]
    fn test_call_requires_name() {
        assert!(Cli::try_parse_from(["webbind", "call"]).is_err());
    }
}
