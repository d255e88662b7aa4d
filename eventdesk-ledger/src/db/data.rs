use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// The type used for primary keys in the database.
pub type PrimaryKey = i64;

/// What an account is allowed to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Student,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Student => "student",
        }
    }
}

/// An eventdesk account
#[derive(Debug, Clone, FromRow)]
pub struct UserData {
    pub id: PrimaryKey,
    pub username: String,
    pub email: Option<String>,
    /// The argon2 hash of the password, never the password itself
    pub password: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl UserData {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Login session data for authentication
#[derive(Debug, Clone)]
pub struct SessionData {
    pub id: PrimaryKey,
    /// The session token, or key if you will
    pub token: String,
    pub expires_at: DateTime<Utc>,
    /// The user that is logged in
    pub user: UserData,
}

/// An event students can register for
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct EventData {
    pub id: PrimaryKey,
    pub name: String,
    pub description: String,
    /// When the event takes place, in campus local time
    pub date: NaiveDateTime,
    pub location: String,
    /// Upper bound on confirmed registrations
    pub max_seats: i64,
    pub registration_fee: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Binds a user to an event
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct RegistrationData {
    pub id: PrimaryKey,
    pub user_id: PrimaryKey,
    pub event_id: PrimaryKey,
    /// The fee recorded at the time of registration
    pub payment_amount: f64,
    pub payment_status: bool,
    /// Confirmed registrations count against the event's seats
    pub is_confirmed: bool,
    pub registration_date: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct NotificationData {
    pub id: PrimaryKey,
    pub user_id: PrimaryKey,
    pub event_id: PrimaryKey,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// A chat message between a user and an admin
#[derive(Debug, Clone, FromRow)]
pub struct MessageData {
    pub id: PrimaryKey,
    pub sender_id: PrimaryKey,
    pub receiver_id: PrimaryKey,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub is_read: bool,
}

/// The result of a guarded registration attempt.
/// Every variant but `Confirmed` means nothing was written.
#[derive(Debug)]
pub enum RegistrationOutcome {
    Confirmed(RegistrationData),
    EventMissing,
    AlreadyRegistered,
    SeatsFull,
}
