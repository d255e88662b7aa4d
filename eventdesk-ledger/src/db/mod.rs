use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;

mod data;
pub use data::*;

mod sqlite;
pub use sqlite::*;

pub type Result<T> = std::result::Result<T, DatabaseError>;

#[derive(Debug, Error)]
pub enum DatabaseError {
    /// An unknown or internal error happened with the database
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),
    /// A resource already exists
    #[error("{resource} with {field} of value {value} already exists")]
    Conflict {
        /// The resource in question
        resource: &'static str,
        /// The field that is conflicting
        field: &'static str,
        /// The conflicting value
        value: String,
    },
    /// A resource in the database doesn't exist
    #[error("{resource}:{identifier} doesn't exist")]
    NotFound {
        resource: &'static str,
        identifier: &'static str,
    },
}

impl DatabaseError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Helper trait to reduce boilerplate
pub trait IntoDatabaseError {
    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError;
    fn any(self) -> DatabaseError;
}

/// Helper trait to reduce boilerplate
pub trait DatabaseResult {
    /// Turns the Result into a conflict error if it's Ok()
    fn conflict_or_ok(self, resource: &'static str, field: &'static str, value: &str)
        -> Result<()>;
}

impl<T> DatabaseResult for Result<T> {
    fn conflict_or_ok(
        self,
        resource: &'static str,
        field: &'static str,
        value: &str,
    ) -> Result<()> {
        match self {
            Ok(_) => Err(DatabaseError::Conflict {
                resource,
                field,
                value: value.to_string(),
            }),
            Err(DatabaseError::NotFound { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// Represents a type that can fetch and store eventdesk data
#[async_trait]
pub trait Database: Send + Sync + 'static {
    async fn check_for_admin(&self) -> Result<bool>;
    /// The oldest admin account, which students address in chat
    async fn default_admin(&self) -> Result<UserData>;
    async fn user_by_id(&self, user_id: PrimaryKey) -> Result<UserData>;
    async fn user_by_username(&self, username: &str) -> Result<UserData>;
    async fn user_by_email(&self, email: &str) -> Result<UserData>;
    async fn list_users(&self) -> Result<Vec<UserData>>;
    async fn create_user(&self, new_user: NewUser) -> Result<UserData>;

    async fn session_by_token(&self, token: &str) -> Result<SessionData>;
    async fn create_session(&self, new_session: NewSession) -> Result<SessionData>;
    async fn delete_session_by_token(&self, token: &str) -> Result<()>;
    async fn clear_expired_sessions(&self) -> Result<()>;

    async fn event_by_id(&self, event_id: PrimaryKey) -> Result<EventData>;
    /// All events, latest date first
    async fn list_events(&self) -> Result<Vec<EventData>>;
    async fn create_event(&self, new_event: NewEvent) -> Result<EventData>;
    /// Replaces every field of an event.
    /// Returns `Ok(None)` if the new seat count is lower than the confirmed registrations.
    async fn update_event(&self, updated_event: UpdatedEvent) -> Result<Option<EventData>>;
    /// Deletes the registrations and notifications of an event, then the event, atomically
    async fn delete_event_and_registrations(&self, event_id: PrimaryKey) -> Result<()>;

    async fn confirmed_count(&self, event_id: PrimaryKey) -> Result<i64>;
    async fn registration_for(
        &self,
        user_id: PrimaryKey,
        event_id: PrimaryKey,
    ) -> Result<Option<RegistrationData>>;
    async fn registrations_for_user(&self, user_id: PrimaryKey) -> Result<Vec<RegistrationData>>;
    async fn registrations_for_event(&self, event_id: PrimaryKey)
        -> Result<Vec<RegistrationData>>;
    /// Registers a user and writes their notification in one transaction,
    /// provided the event has a free seat and the user isn't registered yet.
    async fn register_for_event(
        &self,
        new_registration: NewRegistration,
    ) -> Result<RegistrationOutcome>;

    async fn notifications_for_user(&self, user_id: PrimaryKey) -> Result<Vec<NotificationData>>;

    async fn create_message(&self, new_message: NewMessage) -> Result<MessageData>;
    /// Every message sent or received by the user, oldest first
    async fn conversation_for(&self, user_id: PrimaryKey) -> Result<Vec<MessageData>>;
}

#[derive(Debug)]
pub struct NewUser {
    pub username: String,
    pub email: Option<String>,
    /// Must already be hashed
    pub password: String,
    pub role: Role,
}

#[derive(Debug)]
pub struct NewSession {
    pub token: String,
    pub user_id: PrimaryKey,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub name: String,
    pub description: String,
    pub date: NaiveDateTime,
    pub location: String,
    pub max_seats: i64,
    pub registration_fee: f64,
}

#[derive(Debug)]
pub struct UpdatedEvent {
    pub id: PrimaryKey,
    pub fields: NewEvent,
}

#[derive(Debug)]
pub struct NewRegistration {
    pub user_id: PrimaryKey,
    pub event_id: PrimaryKey,
    /// Builds the notification written alongside the registration from the event name
    pub notification: fn(&str) -> String,
}

#[derive(Debug)]
pub struct NewMessage {
    pub sender_id: PrimaryKey,
    pub receiver_id: PrimaryKey,
    pub content: String,
}
