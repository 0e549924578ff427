use std::sync::Arc;

use clap::Parser;
use colored::*;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use stream_chat_widget::cli::{Args, ChatArgs, Command, ServeArgs};
use stream_chat_widget::dev_server::{self, EchoResponder};
use stream_chat_widget::{
    EventResult, RenderSink, SubmitOutcome, TerminalSink, Widget, WidgetEvent,
};

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Whether the REPL must print its own prompt; other outcomes already
/// refocused the input inside the controller.
fn needs_prompt(result: &EventResult) -> bool {
    matches!(
        result,
        EventResult::PanelToggled { .. }
            | EventResult::Submitted(SubmitOutcome::Ignored | SubmitOutcome::RequestFailed)
    )
}

async fn run_chat(args: ChatArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = args.layers()?.resolve()?;
    let mut sink = TerminalSink::stdout(&config);
    sink.print_header();
    let mut widget = Widget::http(config, sink);

    if let Some(message) = args.message {
        let result = widget.dispatch(WidgetEvent::Submit(message)).await;
        println!();
        if result == EventResult::Submitted(SubmitOutcome::RequestFailed) {
            return Err("chat request failed".into());
        }
        return Ok(());
    }

    widget.dispatch(WidgetEvent::ToggleClicked).await;
    widget.sink_mut().focus_input();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let event = match line.trim() {
            "/quit" | "/exit" => break,
            "/toggle" => WidgetEvent::ToggleClicked,
            _ => WidgetEvent::Submit(line),
        };
        let result = widget.dispatch(event).await;
        if needs_prompt(&result) {
            widget.sink_mut().focus_input();
        }
    }
    println!();
    Ok(())
}

async fn run_serve(args: ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind(("127.0.0.1", args.port)).await?;
    eprintln!(
        "{}",
        format!("  Dev chat endpoint at http://localhost:{}/chat", args.port).bright_green()
    );
    eprintln!("{}", "  Press Ctrl+C to stop.".bright_blue());
    let responder = EchoResponder {
        chunk_size: args.chunk_size,
    };
    dev_server::serve(listener, Arc::new(responder)).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_tracing(args.verbose);

    match args.command {
        Command::Chat(chat) => run_chat(chat).await,
        Command::Serve(serve) => run_serve(serve).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_returns_after_failed_request() {
        assert!(needs_prompt(&EventResult::Submitted(SubmitOutcome::RequestFailed)));
        assert!(needs_prompt(&EventResult::Submitted(SubmitOutcome::Ignored)));
        assert!(needs_prompt(&EventResult::PanelToggled { open: false }));
    }

    #[test]
    fn test_streamed_outcomes_already_prompted() {
        assert!(!needs_prompt(&EventResult::Submitted(SubmitOutcome::Completed { events: 2 })));
        assert!(!needs_prompt(&EventResult::Submitted(SubmitOutcome::StreamFailed { events: 0 })));
    }
}
