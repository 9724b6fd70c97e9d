use sea_orm::DatabaseConnection;

use crate::{EngineError, ResultEngine};

mod expenses;

/// Data access over the expense table.
///
/// The connection is a pool; `Engine` is shared by reference between
/// request tasks and adds no locking of its own.
#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Round trip to the store.
    pub async fn ping(&self) -> ResultEngine<()> {
        self.database.ping().await.map_err(|err| {
            tracing::error!("database ping failed: {err}");
            EngineError::Internal
        })
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
        })
    }
}
