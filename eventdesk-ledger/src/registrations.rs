use std::sync::Arc;

use log::{info, warn};
use thiserror::Error;

use crate::{
    Database, DatabaseError, NewRegistration, PrimaryKey, RegistrationData, RegistrationOutcome,
};

/// Binds students to events without ever overselling seats
pub struct Registrations<Db> {
    db: Arc<Db>,
}

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("Event {0} doesn't exist")]
    NotFound(PrimaryKey),
    #[error("You are already registered for this event")]
    AlreadyRegistered,
    #[error("No seats available for this event")]
    SeatsFull,
    /// The store failed midway, nothing was written
    #[error("Registration could not be completed, please try again")]
    TransactionFailure(#[source] DatabaseError),
}

/// The notification a student receives once their seat is confirmed
pub fn confirmation_message(event_name: &str) -> String {
    format!("Your registration for {} is confirmed!", event_name)
}

impl<Db> Registrations<Db>
where
    Db: Database,
{
    pub fn new(db: &Arc<Db>) -> Self {
        Self { db: db.clone() }
    }

    /// Registers a user for an event, confirming the seat and recording the fee as paid.
    /// A notification is written in the same transaction.
    pub async fn register(
        &self,
        user_id: PrimaryKey,
        event_id: PrimaryKey,
    ) -> Result<RegistrationData, RegistrationError> {
        let outcome = self
            .db
            .register_for_event(NewRegistration {
                user_id,
                event_id,
                notification: confirmation_message,
            })
            .await
            .map_err(|e| {
                warn!("Registration of user {} for event {} failed: {}", user_id, event_id, e);
                RegistrationError::TransactionFailure(e)
            })?;

        match outcome {
            RegistrationOutcome::Confirmed(registration) => {
                info!("User {} registered for event {}", user_id, event_id);
                Ok(registration)
            }
            RegistrationOutcome::EventMissing => Err(RegistrationError::NotFound(event_id)),
            RegistrationOutcome::AlreadyRegistered => Err(RegistrationError::AlreadyRegistered),
            RegistrationOutcome::SeatsFull => Err(RegistrationError::SeatsFull),
        }
    }

    /// The registration of a user for an event, if any
    pub async fn registration_for(
        &self,
        user_id: PrimaryKey,
        event_id: PrimaryKey,
    ) -> Result<Option<RegistrationData>, DatabaseError> {
        self.db.registration_for(user_id, event_id).await
    }

    pub async fn for_user(&self, user_id: PrimaryKey) -> Result<Vec<RegistrationData>, DatabaseError> {
        self.db.registrations_for_user(user_id).await
    }
}
