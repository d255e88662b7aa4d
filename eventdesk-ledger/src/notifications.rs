use std::sync::Arc;

use crate::{Database, DatabaseError, NotificationData, PrimaryKey};

/// Read access to the notifications written by registrations
pub struct Notifications<Db> {
    db: Arc<Db>,
}

impl<Db> Notifications<Db>
where
    Db: Database,
{
    pub fn new(db: &Arc<Db>) -> Self {
        Self { db: db.clone() }
    }

    /// Notifications of a user, newest first
    pub async fn for_user(&self, user_id: PrimaryKey) -> Result<Vec<NotificationData>, DatabaseError> {
        self.db.notifications_for_user(user_id).await
    }
}
