//! Journal writer.
//!
//! Drains the event bus's journal feed and appends every event to the
//! SQLite journal, updating the royalty read model in the same transaction.
//! The feed is unbounded, so a slow writer delays persistence but never
//! loses an event.

use std::sync::Arc;

use rusqlite::Connection;
use tessera_db::queries::journal;
use tessera_types::Event;
use tokio::sync::{broadcast, mpsc, Mutex};
use tracing::{debug, error};

/// Persist events from `feed` until the bus is dropped or shutdown is
/// signalled. On shutdown, events already queued are written before
/// returning.
pub async fn run(
    db: Arc<Mutex<Connection>>,
    mut feed: mpsc::UnboundedReceiver<Event>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            event = feed.recv() => match event {
                Some(event) => write(&db, &event).await,
                None => {
                    debug!("event bus closed, journal writer stopping");
                    return;
                }
            },
            _ = shutdown.recv() => break,
        }
    }

    feed.close();
    let mut flushed = 0usize;
    while let Some(event) = feed.recv().await {
        write(&db, &event).await;
        flushed += 1;
    }
    debug!(flushed, "journal writer stopped");
}

async fn write(db: &Mutex<Connection>, event: &Event) {
    let conn = db.lock().await;
    if let Err(e) = journal::record(&conn, event) {
        error!(event_type = event.event_type.as_str(), error = %e, "journal write failed");
    }
}
