use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use log::{error, info};
use rusqlite::Connection;
use tokio::sync::oneshot;

mod helpers;
mod migrations;
mod repositories;

use migrations::run_migrations;

type DbJob = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum DbMessage {
    Run(DbJob),
    Shutdown,
}

struct WorkerHandle {
    sender: mpsc::Sender<DbMessage>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        let mut guard = match self.thread.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            if let Err(err) = self.sender.send(DbMessage::Shutdown) {
                error!("Failed to send shutdown to DB thread: {err}");
            }
            if let Err(join_err) = handle.join() {
                error!("Failed to join DB thread: {join_err:?}");
            }
        }
    }
}

/// SQLite-backed calibration storage.
///
/// A single worker thread owns the connection; every query runs there in
/// submission order, so writes never interleave.
#[derive(Clone)]
pub struct Database {
    worker: Arc<WorkerHandle>,
    location: Arc<Option<PathBuf>>,
}

impl Database {
    /// Open (or create) the database file at `db_path` and migrate it.
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        let path_for_thread = db_path.clone();
        let database = Self::spawn(Some(db_path), move || {
            Connection::open(&path_for_thread).context("failed to open SQLite database")
        })?;

        if let Some(path) = database.path() {
            info!("Calibration database ready at {}", path.display());
        }
        Ok(database)
    }

    /// Private in-memory database. Its content disappears with the last clone.
    pub fn in_memory() -> Result<Self> {
        Self::spawn(None, || {
            Connection::open_in_memory().context("failed to open in-memory SQLite database")
        })
    }

    fn spawn<F>(location: Option<PathBuf>, open: F) -> Result<Self>
    where
        F: FnOnce() -> Result<Connection> + Send + 'static,
    {
        let (message_tx, message_rx) = mpsc::channel::<DbMessage>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();

        let thread = thread::Builder::new()
            .name("lumen-db".into())
            .spawn(move || {
                let mut conn = match open() {
                    Ok(connection) => connection,
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };

                if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
                    error!("Failed to enable WAL mode: {err}");
                }

                let init_result =
                    run_migrations(&mut conn).context("failed to run database migrations");
                if ready_tx.send(init_result).is_err() {
                    error!("DB initialization receiver dropped before ready signal");
                    return;
                }

                while let Ok(message) = message_rx.recv() {
                    match message {
                        DbMessage::Run(job) => job(&mut conn),
                        DbMessage::Shutdown => break,
                    }
                }

                info!("Database thread shutting down");
            })
            .context("failed to spawn database worker thread")?;

        ready_rx
            .recv()
            .context("database worker exited before signaling readiness")??;

        Ok(Self {
            worker: Arc::new(WorkerHandle {
                sender: message_tx,
                thread: Mutex::new(Some(thread)),
            }),
            location: Arc::new(location),
        })
    }

    /// Database file, `None` for in-memory databases.
    pub fn path(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    /// Run `task` on the worker thread and await its result.
    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();

        let job: DbJob = Box::new(move |conn| {
            if reply_tx.send(task(conn)).is_err() {
                error!("DB caller dropped before receiving result");
            }
        });

        self.worker
            .sender
            .send(DbMessage::Run(job))
            .map_err(|err| anyhow!("failed to send job to DB thread: {err}"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("database thread terminated unexpectedly"))?
    }
}
