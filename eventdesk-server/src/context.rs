use std::sync::Arc;

use eventdesk_ledger::SqliteLedger;

#[derive(Clone)]
pub struct ServerContext {
    pub ledger: Arc<SqliteLedger>,
}

impl ServerContext {
    pub fn new(ledger: SqliteLedger) -> Self {
        Self {
            ledger: Arc::new(ledger),
        }
    }
}
