//! Terminal chat widget
//!
//! Storage lives in a JSON file, so restarting the program behaves like
//! reloading the page: an agent chat in progress is resumed.

use anyhow::Context;
use chatdesk_adaptor_terminal::{parse_line, LogTail, TerminalConfig, TerminalRenderer};
use chatdesk_core::{
    init_logging, load_env, load_env_from_path, ChatWidget, FileStorage, PageContext, SystemClock,
    UiEvent, WidgetConfig, WidgetStorage,
};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Environment file to load instead of ./.env
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Relay WebSocket URL
    #[arg(long, env = "CHATDESK_RELAY_URL")]
    relay_url: Option<String>,

    /// Cookie and local storage file
    #[arg(long, default_value = ".chatdesk/storage.json")]
    storage: PathBuf,

    /// Tail core logs on stderr
    #[arg(long)]
    logs: bool,

    /// Only show log lines containing this text
    #[arg(long)]
    log_filter: Option<String>,

    /// Page URL reported to the agent
    #[arg(long, default_value = "https://wpwebsolucoes.com.br/")]
    page_url: String,

    /// Referrer reported to the agent
    #[arg(long, default_value = "")]
    referrer: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match &cli.env_file {
        Some(path) => load_env_from_path(path)?,
        None => load_env()?,
    }
    init_logging(false);
    let _tail = LogTail::new(TerminalConfig {
        enabled: cli.logs,
        target_filter: cli.log_filter.clone(),
    })
    .start();

    let mut config = WidgetConfig::from_env();
    if let Some(url) = cli.relay_url {
        config.relay_url = url;
    }
    config.validate().context("invalid widget configuration")?;

    info!(
        relay = %config.relay_url,
        storage = %cli.storage.display(),
        "starting terminal widget"
    );
    let storage = Arc::new(FileStorage::open(&cli.storage, Arc::new(SystemClock)));
    let page = PageContext {
        page_url: cli.page_url,
        referrer: cli.referrer,
        user_agent: format!("chatdesk-terminal/{}", env!("CARGO_PKG_VERSION")),
        ..PageContext::default()
    };

    let renderer = TerminalRenderer::new(std::io::stdout());
    let menu = renderer.menu();
    let (widget, ui) = ChatWidget::new(
        config,
        page,
        Box::new(renderer),
        WidgetStorage {
            cookies: storage.clone(),
            store: storage,
        },
    )?;

    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let visible = menu.lock().map(|m| m.clone()).unwrap_or_default();
            match parse_line(&line, &visible) {
                Ok(Some(event)) => {
                    let quit = event == UiEvent::Shutdown;
                    if ui.send(event).is_err() || quit {
                        break;
                    }
                }
                Ok(None) => {}
                Err(msg) => eprintln!("   {}", msg),
            }
        }
        let _ = ui.send(UiEvent::Shutdown);
    });

    widget.run().await?;
    Ok(())
}
