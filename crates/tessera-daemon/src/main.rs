//! tessera-daemon: the royalty ledger daemon.

use tessera_daemon::config::DaemonConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = DaemonConfig::load()?;
    tessera_daemon::init_tracing(&config)?;
    tessera_daemon::run(config).await
}
