mod auth;
mod catalog;
mod config;
mod db;
mod messaging;
mod notifications;
mod registrations;
mod util;

pub mod policy;

#[cfg(test)]
mod test_utils;

use std::sync::Arc;

pub use auth::*;
pub use catalog::*;
pub use config::*;
pub use db::*;
pub use messaging::*;
pub use notifications::*;
pub use registrations::*;
pub use util::DATE_FORMAT;

/// The eventdesk ledger, keeping accounts, events, registrations, and chat in one database.
pub struct Ledger<Db> {
    database: Arc<Db>,

    pub auth: Auth<Db>,
    pub catalog: EventCatalog<Db>,
    pub registrations: Registrations<Db>,
    pub notifications: Notifications<Db>,
    pub messaging: Messaging<Db>,
}

/// The ledger as the server runs it
pub type SqliteLedger = Ledger<SqliteDatabase>;

impl<Db> Ledger<Db>
where
    Db: Database,
{
    pub fn new(database: Db, config: Config) -> Self {
        let database = Arc::new(database);

        Self {
            auth: Auth::new(&database, &config),
            catalog: EventCatalog::new(&database, &config),
            registrations: Registrations::new(&database),
            notifications: Notifications::new(&database),
            messaging: Messaging::new(&database),
            database,
        }
    }

    /// Direct access to the underlying database
    pub fn database(&self) -> &Arc<Db> {
        &self.database
    }
}
