//! # tessera-daemon
//!
//! Single OS process running a Tokio runtime. It owns the royalty ledger and
//! an in-process decryption oracle, serves JSON-RPC over a Unix socket, and
//! runs two background tasks:
//!
//! - the relay, which fulfils queued oracle requests and delivers each
//!   response to the ledger
//! - the journal writer, which persists every ledger notification
//!
//! Ledger state lives in memory; the journal is the durable record.

pub mod commands;
pub mod config;
pub mod events;
pub mod journal;
pub mod relay;
pub mod rpc;

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::Context;
use tessera_crypto::ed25519::{derive_account_id, SigningKey};
use tessera_ledger::RoyaltyLedger;
use tessera_oracle::LocalOracle;
use tessera_types::{AccountId, Event};
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::config::DaemonConfig;
use crate::events::EventBus;
use crate::rpc::RpcServer;

/// Per-subscriber broadcast buffer. The journal feed is not bounded by it.
const EVENT_BUS_CAPACITY: usize = 1000;

/// Daemon-wide shared state.
pub struct DaemonState {
    pub db: Arc<Mutex<rusqlite::Connection>>,
    pub config: DaemonConfig,
    pub event_bus: EventBus,
    pub ledger: Mutex<RoyaltyLedger>,
    pub oracle: Arc<LocalOracle>,
    /// Account of the key in `operator.key`; owns the ledger unless configured otherwise.
    pub operator: AccountId,
    pub started_at: u64,
    pub shutdown_tx: broadcast::Sender<()>,
    /// Taken once by whoever runs the journal writer.
    journal_feed: std::sync::Mutex<Option<mpsc::UnboundedReceiver<Event>>>,
}

impl DaemonState {
    /// Wire up the oracle, the event bus and the ledger.
    pub fn new(
        config: DaemonConfig,
        conn: rusqlite::Connection,
        operator: AccountId,
    ) -> anyhow::Result<Self> {
        let oracle = Arc::new(
            LocalOracle::new(&config.oracle_config()).context("starting decryption oracle")?,
        );
        let mut event_bus = EventBus::new(EVENT_BUS_CAPACITY);
        let journal_feed = event_bus.attach_journal();
        let policy = config.access_policy(operator)?;
        let ledger = RoyaltyLedger::new(
            oracle.coprocessor(),
            oracle.clone(),
            Arc::new(event_bus.clone()),
            policy,
        );
        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
            config,
            event_bus,
            ledger: Mutex::new(ledger),
            oracle,
            operator,
            started_at: unix_now(),
            shutdown_tx,
            journal_feed: std::sync::Mutex::new(Some(journal_feed)),
        })
    }

    pub fn uptime_secs(&self) -> u64 {
        unix_now().saturating_sub(self.started_at)
    }

    /// The journal feed, on first call only.
    pub fn take_journal_feed(&self) -> Option<mpsc::UnboundedReceiver<Event>> {
        self.journal_feed.lock().ok()?.take()
    }

    /// Start the relay and the journal writer.
    ///
    /// Events emitted before this call are already queued on the journal
    /// feed and are written first. Returns the journal writer's handle,
    /// which completes once queued events are flushed after shutdown.
    pub fn spawn_background_tasks(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let writer = match self.take_journal_feed() {
            Some(feed) => Some(tokio::spawn(journal::run(
                Arc::clone(&self.db),
                feed,
                self.shutdown_tx.subscribe(),
            ))),
            None => {
                error!("journal feed already taken, journal writer not started");
                None
            }
        };

        let interval = Duration::from_millis(self.config.oracle.relay_interval_ms.max(1));
        tokio::spawn(relay::run(
            Arc::clone(self),
            interval,
            self.shutdown_tx.subscribe(),
        ));
        writer
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Install the tracing subscriber. `RUST_LOG` directives are added on top of
/// the configured level.
pub fn init_tracing(config: &DaemonConfig) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(format!("tessera={}", config.advanced.log_level).parse()?);

    if config.advanced.log_file.is_empty() {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    } else {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.advanced.log_file)
            .with_context(|| format!("opening log file {}", config.advanced.log_file))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file))
            .init();
    }
    Ok(())
}

/// Load the operator key from `path`, creating it on first run.
pub fn load_operator_key(path: &Path) -> anyhow::Result<SigningKey> {
    if path.exists() {
        let encoded = std::fs::read_to_string(path)?;
        let bytes: [u8; 32] = hex::decode(encoded.trim())?
            .try_into()
            .map_err(|_| anyhow::anyhow!("operator key must be 32 bytes"))?;
        return Ok(SigningKey::from_bytes(&bytes));
    }

    let key = SigningKey::generate();
    std::fs::write(path, hex::encode(key.to_bytes()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }
    info!("Generated operator key at {:?}", path);
    Ok(key)
}

/// Run the daemon until Ctrl-C or a shutdown signal.
pub async fn run(config: DaemonConfig) -> anyhow::Result<()> {
    info!("Tessera daemon starting");

    let data_dir = config.data_dir();
    std::fs::create_dir_all(&data_dir)?;

    let operator_key = load_operator_key(&data_dir.join("operator.key"))?;
    let operator = derive_account_id(&operator_key.verifying_key());
    info!(operator = %hex::encode(operator), "operator account");

    let conn = tessera_db::open(&data_dir.join("tessera.db"))?;
    let state = Arc::new(DaemonState::new(config, conn, operator)?);
    let journal_writer = state.spawn_background_tasks();

    let socket_path = data_dir.join("daemon.sock");
    let rpc_server = RpcServer::new(state.clone(), socket_path.clone());
    info!("Starting JSON-RPC server on {:?}", socket_path);

    let mut shutdown_rx = state.shutdown_tx.subscribe();
    tokio::select! {
        result = rpc_server.run() => {
            if let Err(e) = result {
                error!("RPC server error: {}", e);
            }
        }
        _ = shutdown_rx.recv() => {
            info!("Shutdown signal received");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
        }
    }

    info!("Daemon shutting down gracefully");
    let _ = state.shutdown_tx.send(());
    if let Some(writer) = journal_writer {
        if let Err(e) = writer.await {
            error!("journal writer failed: {}", e);
        }
    }
    let _ = std::fs::remove_file(&socket_path);
    info!("Daemon stopped");
    Ok(())
}
