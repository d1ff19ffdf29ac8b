//! veris-daemon: the veris supply oracle daemon.
//!
//! Single OS process running a Tokio async runtime. Clients (reporter and
//! admin tooling) communicate with the daemon via JSON-RPC over a Unix
//! socket. All oracle state lives in memory behind one lock and is
//! snapshotted to SQLite after every mutating operation.

mod commands;
mod config;
mod events;
mod rpc;

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{error, info};

use veris_oracle::SupplyOracle;

use crate::config::DaemonConfig;
use crate::events::EventBus;
use crate::rpc::RpcServer;

/// The oracle state machine together with its durable store.
///
/// Held behind a single lock: every operation is applied and persisted as
/// one totally-ordered step.
pub struct OracleService {
    /// In-memory oracle state machine.
    pub oracle: SupplyOracle,
    /// Database connection for snapshots.
    pub db: rusqlite::Connection,
}

/// Daemon-wide shared state.
pub struct DaemonState {
    /// Oracle plus database behind the serialization lock.
    pub service: tokio::sync::Mutex<OracleService>,
    /// Configuration.
    pub config: DaemonConfig,
    /// Event bus for pushing signals to subscribers.
    pub event_bus: EventBus,
    /// Shutdown signal sender.
    pub shutdown_tx: broadcast::Sender<()>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("veris=info".parse()?),
        )
        .init();

    info!("Veris oracle daemon starting");

    // 1. Load config
    let config = DaemonConfig::load()?;
    let data_dir = config.data_dir();
    std::fs::create_dir_all(&data_dir)?;

    // 2. Open database
    let db_path = data_dir.join("veris.db");
    let mut db = veris_db::open(&db_path)?;

    // 3. Restore the oracle, or initialize from genesis on a fresh database
    let oracle = match veris_db::snapshot::load(&db)? {
        Some(oracle) => {
            info!("Oracle state restored from snapshot");
            oracle
        }
        None => {
            let genesis = config.genesis.to_genesis()?;
            let oracle = SupplyOracle::new(genesis)?;
            veris_db::snapshot::save(&mut db, &oracle)?;
            info!("Fresh oracle initialized from genesis config");
            oracle
        }
    };

    // 4. Create event bus and shutdown channel
    let event_bus = EventBus::new(1000);
    let (shutdown_tx, _shutdown_rx) = broadcast::channel(1);

    // 5. Build daemon state
    let state = Arc::new(DaemonState {
        service: tokio::sync::Mutex::new(OracleService { oracle, db }),
        config,
        event_bus,
        shutdown_tx: shutdown_tx.clone(),
    });

    // 6. Start the RPC server
    let socket_path = data_dir.join("veris.sock");
    let rpc_server = RpcServer::new(state.clone(), socket_path.clone());

    // 7. Emit DaemonStarted event
    state.event_bus.emit(events::Event {
        event_type: "DaemonStarted".to_string(),
        timestamp: commands::unix_now(),
        payload: serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
        }),
    });

    // 8. Run until shutdown
    let mut shutdown_rx = shutdown_tx.subscribe();
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
    let _ = std::fs::remove_file(&socket_path);
    info!("Daemon stopped");
    Ok(())
}
