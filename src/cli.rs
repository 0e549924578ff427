use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::ConfigLayer;
use crate::error::Result;

#[derive(Parser)]
#[command(name = "chat-widget")]
#[command(version)]
#[command(about = "Embeddable chat client that renders streamed JSON-Lines replies")]
pub struct Args {
    /// Log at debug level (RUST_LOG still takes precedence)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Chat with an endpoint from the terminal
    Chat(ChatArgs),
    /// Run a local JSON-Lines echo endpoint
    Serve(ServeArgs),
}

#[derive(clap::Args)]
pub struct ChatArgs {
    /// Chat endpoint URL (POST, JSON-Lines response)
    #[arg(long)]
    pub api: Option<String>,

    /// Panel title
    #[arg(long)]
    pub title: Option<String>,

    /// Accent color as #rgb or #rrggbb
    #[arg(long)]
    pub accent: Option<String>,

    /// TOML file with endpoint_url / title / accent_color
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Send one message and exit instead of reading stdin
    #[arg(long, short)]
    pub message: Option<String>,
}

impl ChatArgs {
    /// Settings given on the command line, as the top config layer.
    pub fn overrides(&self) -> ConfigLayer {
        ConfigLayer {
            endpoint_url: self.api.clone(),
            title: self.title.clone(),
            accent_color: self.accent.clone(),
        }
    }

    /// Merge the config file (if any) under the command-line overrides.
    pub fn layers(&self) -> Result<ConfigLayer> {
        let base = match &self.config {
            Some(path) => ConfigLayer::from_file(path)?,
            None => ConfigLayer::default(),
        };
        Ok(base.overlay(self.overrides()))
    }
}

#[derive(clap::Args)]
pub struct ServeArgs {
    /// Port for the local endpoint
    #[arg(long, default_value = "8000")]
    pub port: u16,

    /// Bytes per HTTP chunk; small values exercise record reassembly
    #[arg(long, default_value = "7")]
    pub chunk_size: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn chat(args: &[&str]) -> ChatArgs {
        match Args::parse_from(args).command {
            Command::Chat(c) => c,
            Command::Serve(_) => panic!("expected chat"),
        }
    }

    #[test]
    fn test_args_parse_chat_minimal() {
        let c = chat(&["chat-widget", "chat", "--api", "http://localhost:8000/chat"]);
        assert_eq!(c.api.as_deref(), Some("http://localhost:8000/chat"));
        assert!(c.title.is_none());
        assert!(c.message.is_none());
    }

    #[test]
    fn test_args_parse_chat_full() {
        let c = chat(&[
            "chat-widget",
            "chat",
            "--api",
            "http://x/chat",
            "--title",
            "Support",
            "--accent",
            "#fff",
            "-m",
            "hello",
        ]);
        assert_eq!(c.title.as_deref(), Some("Support"));
        assert_eq!(c.accent.as_deref(), Some("#fff"));
        assert_eq!(c.message.as_deref(), Some("hello"));
    }

    #[test]
    fn test_args_parse_serve_defaults() {
        let args = Args::parse_from(["chat-widget", "serve"]);
        match args.command {
            Command::Serve(s) => {
                assert_eq!(s.port, 8000);
                assert_eq!(s.chunk_size, 7);
            }
            Command::Chat(_) => panic!("expected serve"),
        }
        assert!(!args.verbose);
    }

    #[test]
    fn test_args_verbose_global() {
        let args = Args::parse_from(["chat-widget", "serve", "--verbose"]);
        assert!(args.verbose);
    }

    #[test]
    fn test_cli_overrides_config_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "endpoint_url = \"http://file/chat\"\ntitle = \"File\"").unwrap();
        let path = f.path().to_str().unwrap().to_string();
        let c = chat(&["chat-widget", "chat", "--config", &path, "--title", "Flag"]);
        let cfg = c.layers().unwrap().resolve().unwrap();
        assert_eq!(cfg.endpoint_url(), "http://file/chat");
        assert_eq!(cfg.title(), "Flag");
    }

    #[test]
    fn test_missing_endpoint_everywhere_fails() {
        let c = chat(&["chat-widget", "chat"]);
        assert!(c.layers().unwrap().resolve().is_err());
    }
}
