//! Debugger application entry point (spec §6: `dbg` binary), mirroring
//! `bugstalker::main`'s `--ui console|tui` dispatch with a `--ui
//! console|dap` flag instead.

use clap::Parser;
use std::path::PathBuf;
use std::rc::Rc;
use wasm_dbg_bridge::config::Config;
use wasm_dbg_bridge::debugger::cdp::discover::wait_for_debugger_url;
use wasm_dbg_bridge::debugger::cdp::transport::WebSocketTransport;
use wasm_dbg_bridge::debugger::cdp::CdpClient;
use wasm_dbg_bridge::ui::{console, dap};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Debugger interface type.
    #[arg(long, default_value_t = String::from("console"))]
    ui: String,

    /// Host the CDP endpoint listens on.
    #[arg(long, default_value_t = String::from("127.0.0.1"))]
    host: String,

    /// Port the CDP endpoint listens on.
    #[arg(long, default_value_t = 9222)]
    port: u16,

    /// Optional TOML config file (server_root/web_root/launch timeouts).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the config's serverRoot.
    #[arg(long)]
    server_root: Option<String>,

    /// Override the config's webRoot.
    #[arg(long)]
    web_root: Option<String>,
}

fn main() -> anyhow::Result<()> {
    wasm_dbg_bridge::log::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if args.server_root.is_some() {
        config.server_root = args.server_root.clone();
    }
    if args.web_root.is_some() {
        config.web_root = args.web_root.clone();
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let local = tokio::task::LocalSet::new();

    local.block_on(&runtime, async move {
        let ws_url = wait_for_debugger_url(&args.host, args.port, &config.launch).await?;
        let transport: Rc<dyn CdpClient> = WebSocketTransport::connect(&ws_url).await?;
        let path_remap = config.path_remap();

        match args.ui.as_str() {
            "dap" => dap::run(transport, path_remap).await,
            _ => console::run(transport, path_remap).await,
        }
    })
}
