//! NFC HAL service: entry point.
//!
//! Fetches the configured NFC controller through the bridge factory and
//! drives one session against it, the way the upper NFC stack would:
//!
//! ```text
//! open ─► OPEN_CPLT ─► coreInitialized ─► POST_INIT_CPLT
//!      ─► prediscover ─► PRE_DISCOVER_CPLT ─► write* ─► [hold] ─► close
//! ```
//!
//! Every event and frame the controller reports is logged as it arrives.
//!
//! # Usage
//!
//! ```text
//! nfc-hal-service [OPTIONS]
//!
//! Options:
//!   --config    <PATH>   TOML configuration file
//!   --instance  <NAME>   Controller instance to fetch [default: from config]
//!   --log-level <LEVEL>  Log level when RUST_LOG is unset
//!   --write     <HEX>    NCI frame to write after pre-discover (repeatable)
//!   --hold               Keep the session open until Ctrl+C
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable           | Description                 |
//! |--------------------|-----------------------------|
//! | `NFC_HAL_CONFIG`   | Path of the TOML config     |
//! | `NFC_HAL_INSTANCE` | Controller instance name    |
//! | `RUST_LOG`         | Full `tracing` filter       |

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use nfc_core::{NciFrame, Nfc, NfcClientCallback, NfcEvent, NfcStatus};
use nfc_hal::application::{fetch_nfc, ConfiguredProvider};
use nfc_hal::infrastructure::storage::{load_config, HalConfig};

/// How long to wait for each completion event from the controller.
const COMPLETION_TIMEOUT: Duration = Duration::from_secs(5);

// ── CLI argument definitions ──────────────────────────────────────────────────

/// NFC HAL bridge service.
#[derive(Debug, Parser)]
#[command(
    name = "nfc-hal-service",
    about = "Drives an NFC controller session through the HAL bridge",
    version
)]
struct Cli {
    /// TOML configuration file.  Defaults apply when omitted.
    #[arg(long, env = "NFC_HAL_CONFIG")]
    config: Option<PathBuf>,

    /// Controller instance name; overrides `[service] instance`.
    #[arg(long, env = "NFC_HAL_INSTANCE")]
    instance: Option<String>,

    /// Log level used when `RUST_LOG` is unset; overrides `[service] log_level`.
    #[arg(long)]
    log_level: Option<String>,

    /// NCI frame in hex (e.g. `20000101`) to write once pre-discover completes.
    #[arg(long = "write", value_name = "HEX")]
    writes: Vec<HexFrame>,

    /// Keep the session open until Ctrl+C instead of closing immediately.
    #[arg(long)]
    hold: bool,
}

impl Cli {
    /// Applies the command-line overrides on top of `config`.
    fn apply(&self, mut config: HalConfig) -> HalConfig {
        if let Some(instance) = &self.instance {
            config.service.instance = instance.clone();
        }
        if let Some(level) = &self.log_level {
            config.service.log_level = level.clone();
        }
        config
    }
}

/// A byte frame given on the command line as hex digits.
#[derive(Debug, Clone, PartialEq, Eq)]
struct HexFrame(Vec<u8>);

impl FromStr for HexFrame {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits: Vec<u8> = s
            .bytes()
            .filter(|b| !matches!(b, b' ' | b':' | b'_'))
            .collect();
        if digits.len() % 2 != 0 {
            return Err(format!("odd number of hex digits in '{s}'"));
        }
        digits
            .chunks(2)
            .map(|pair| {
                let text = std::str::from_utf8(pair).map_err(|_| format!("invalid hex in '{s}'"))?;
                u8::from_str_radix(text, 16).map_err(|_| format!("invalid hex byte '{text}' in '{s}'"))
            })
            .collect::<Result<Vec<u8>, String>>()
            .map(HexFrame)
    }
}

// ── Session client ────────────────────────────────────────────────────────────

#[derive(Debug, PartialEq)]
enum Notice {
    Event(NfcEvent, NfcStatus),
    Data(Vec<u8>),
}

/// Client that logs every notification and forwards it to the session task.
///
/// Called on the driver's thread; the unbounded sender never blocks it.
struct LoggingClient {
    tx: UnboundedSender<Notice>,
}

impl NfcClientCallback for LoggingClient {
    fn send_event(&self, event: NfcEvent, status: NfcStatus) {
        info!(%event, %status, "controller event");
        let _ = self.tx.send(Notice::Event(event, status));
    }

    fn send_data(&self, data: Vec<u8>) {
        info!(len = data.len(), frame = %NciFrame::new(&data), "controller data");
        let _ = self.tx.send(Notice::Data(data));
    }
}

/// Waits for `want`, logging unrelated notices, and returns its status.
async fn await_event(
    rx: &mut UnboundedReceiver<Notice>,
    want: NfcEvent,
    within: Duration,
) -> anyhow::Result<NfcStatus> {
    let wait = async {
        while let Some(notice) = rx.recv().await {
            match notice {
                Notice::Event(event, status) if event == want => return Some(status),
                other => debug!(?other, "notice while waiting for {want}"),
            }
        }
        None
    };
    match tokio::time::timeout(within, wait).await {
        Ok(Some(status)) => Ok(status),
        Ok(None) => bail!("client channel closed while waiting for {want}"),
        Err(_) => bail!("timed out after {within:?} waiting for {want}"),
    }
}

async fn expect_ok(rx: &mut UnboundedReceiver<Notice>, want: NfcEvent) -> anyhow::Result<()> {
    let status = await_event(rx, want, COMPLETION_TIMEOUT).await?;
    if status != NfcStatus::Ok {
        bail!("{want} reported {status}");
    }
    Ok(())
}

/// Runs one session between `open` and `close`.
async fn run_session(
    nfc: &dyn Nfc,
    rx: &mut UnboundedReceiver<Notice>,
    writes: &[HexFrame],
    hold: bool,
) -> anyhow::Result<()> {
    expect_ok(rx, NfcEvent::OpenCplt).await?;

    let status = nfc.core_initialized(&[]);
    debug!(status, "coreInitialized returned");
    expect_ok(rx, NfcEvent::PostInitCplt).await?;

    let status = nfc.prediscover();
    debug!(status, "prediscover returned");
    expect_ok(rx, NfcEvent::PreDiscoverCplt).await?;

    for HexFrame(frame) in writes {
        let status = nfc.write(frame);
        if usize::try_from(status).ok() != Some(frame.len()) {
            warn!(status, len = frame.len(), "controller did not accept the whole frame");
        } else {
            info!(frame = %NciFrame::new(frame), "frame written");
        }
    }

    if hold {
        info!("session open; press Ctrl+C to close");
        tokio::signal::ctrl_c()
            .await
            .context("failed to listen for Ctrl+C")?;
        info!("received Ctrl+C; closing session");
    }
    Ok(())
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.apply(load_config(cli.config.as_deref())?);

    // RUST_LOG wins; otherwise the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.service.log_level)),
        )
        .init();

    let instance = config.service.instance.clone();
    info!(instance = %instance, controller = ?config.controller.kind, "NFC HAL service starting");

    let provider = ConfiguredProvider::new(instance.clone(), config.controller.clone());
    let bridge = fetch_nfc(&instance, &provider)?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let status = bridge.open(Arc::new(LoggingClient { tx }));
    if status != 0 {
        bail!("open of NFC controller '{instance}' failed with status {status}");
    }

    let outcome = run_session(&*bridge, &mut rx, &cli.writes, cli.hold).await;

    let status = bridge.close();
    debug!(status, "close returned");
    while let Ok(notice) = rx.try_recv() {
        debug!(?notice, "notice delivered during close");
    }

    let stats = bridge.stats();
    info!(
        events = stats.events_delivered,
        frames = stats.frames_delivered,
        bytes = stats.bytes_delivered,
        dropped = stats.events_dropped + stats.frames_dropped,
        "NFC HAL service stopped"
    );
    outcome
}

// ── Tests ─────────────────────────────────────────────────────────────────────
