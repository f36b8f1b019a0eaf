use std::path::{Path, PathBuf};

use anyhow::Context;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};

pub(super) struct StoreState {
    store_file: PathBuf,
    pub(super) pool: SqlitePool,
}

impl std::fmt::Debug for StoreState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreState")
            .field("store_file", &self.store_file)
            .finish()
    }
}

impl StoreState {
    /// Open the store file, creating it (and the patients table) when absent.
    pub(super) async fn open<P: AsRef<Path>>(store_file: P) -> anyhow::Result<Self> {
        let store_file = store_file.as_ref().to_path_buf();

        if let Some(parent) = store_file.parent() {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                anyhow::bail!("Patient store directory does not exist: {:?}", parent);
            }
        }

        let connect_opts = SqliteConnectOptions::new()
            .filename(&store_file)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_opts)
            .await
            .with_context(|| format!("Failed to open patient store {:?}", store_file))?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to prepare patient table")?;

        log::debug!("Opened patient store {}", store_file.display());
        Ok(Self { store_file, pool })
    }

    pub(super) fn path(&self) -> &Path {
        &self.store_file
    }

    /// Flush the WAL into the main file and release file handles.
    pub(super) async fn close(&self) -> anyhow::Result<()> {
        sqlx::query("PRAGMA wal_checkpoint(TRUNCATE);")
            .execute(&self.pool)
            .await?;
        self.pool.close().await;
        Ok(())
    }
}
