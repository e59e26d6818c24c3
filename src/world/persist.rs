//! Background persistence writer.
//!
//! World state is mutated in memory by the event worker; durable copies
//! are written here, off the hot path. Commands are applied in enqueue
//! order on a single task, so a flush ack means every write enqueued
//! before it has reached the store.

use std::sync::Arc;

use log::{debug, warn};
use tokio::sync::{mpsc, oneshot};

use crate::world::storage::WorldStore;
use crate::world::types::{AccountRecord, PlotRecord};

pub enum PersistCommand {
    Account(AccountRecord),
    Plot(PlotRecord),
    Flush(oneshot::Sender<()>),
    Shutdown(oneshot::Sender<()>),
}

/// Cheap clonable front door to the writer task.
#[derive(Clone)]
pub struct PersistHandle {
    tx: mpsc::UnboundedSender<PersistCommand>,
}

impl PersistHandle {
    pub fn save_account(&self, account: AccountRecord) {
        let _ = self.tx.send(PersistCommand::Account(account));
    }

    pub fn save_plot(&self, plot: PlotRecord) {
        let _ = self.tx.send(PersistCommand::Plot(plot));
    }

    /// Resolves once every previously enqueued write has been applied.
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        if self.tx.send(PersistCommand::Flush(tx)).is_ok() {
            let _ = rx.await;
        }
    }

    /// Drains the queue and stops the writer.
    pub async fn shutdown(&self) {
        let (tx, rx) = oneshot::channel();
        if self.tx.send(PersistCommand::Shutdown(tx)).is_ok() {
            let _ = rx.await;
        }
    }
}

pub fn start_writer(store: Arc<WorldStore>) -> PersistHandle {
    let (tx, mut rx) = mpsc::unbounded_channel::<PersistCommand>();
    let handle = PersistHandle { tx };

    tokio::spawn(async move {
        let mut writes: u64 = 0;
        let mut failures: u64 = 0;
        let mut stopped: Option<oneshot::Sender<()>> = None;
        while let Some(cmd) = rx.recv().await {
            match cmd {
                PersistCommand::Account(account) => {
                    let username = account.username.clone();
                    match store.put_account(account) {
                        Ok(()) => {
                            writes += 1;
                            crate::metrics::inc_persist_writes();
                        }
                        Err(e) => {
                            failures += 1;
                            crate::metrics::inc_persist_failures();
                            warn!("Failed to persist account '{username}': {e}");
                        }
                    }
                }
                PersistCommand::Plot(plot) => {
                    let plot_id = plot.id.clone();
                    match store.put_plot(plot) {
                        Ok(()) => {
                            writes += 1;
                            crate::metrics::inc_persist_writes();
                        }
                        Err(e) => {
                            failures += 1;
                            crate::metrics::inc_persist_failures();
                            warn!("Failed to persist plot '{plot_id}': {e}");
                        }
                    }
                }
                PersistCommand::Flush(done) => {
                    let _ = done.send(());
                }
                PersistCommand::Shutdown(done) => {
                    stopped = Some(done);
                    break;
                }
            }
            if writes > 0 && writes % 256 == 0 {
                debug!("persist writer: writes={writes} failures={failures}");
            }
        }
        debug!("persist writer stopped: writes={writes} failures={failures}");
        // The ack must come after the store handle is released, so a
        // caller awaiting shutdown can reopen the database.
        drop(store);
        if let Some(done) = stopped {
            let _ = done.send(());
        }
    });

    handle
}
