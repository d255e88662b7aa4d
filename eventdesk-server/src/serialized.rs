//! All schemas that are exposed from endpoints are defined here
//! along with the ToSerialized impls

use chrono::{DateTime, NaiveDateTime, Utc};
use eventdesk_ledger::{
    EventData, EventSummary, MessageData, NotificationData, PrimaryKey, RegistrationData, Role,
    SessionData, UserData, DATE_FORMAT,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::dashboard_path;

#[derive(Debug, Serialize, ToSchema)]
pub struct User {
    id: PrimaryKey,
    username: String,
    email: Option<String>,
    #[schema(value_type = String, example = "student")]
    role: Role,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResult {
    token: String,
    expires_at: DateTime<Utc>,
    user: User,
    /// The dashboard for the role of the user
    #[schema(value_type = String, example = "/student/dashboard")]
    redirect: &'static str,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginForm {
    #[schema(value_type = Vec<String>)]
    pub roles: [Role; 2],
}

impl Default for LoginForm {
    fn default() -> Self {
        Self {
            roles: [Role::Admin, Role::Student],
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterForm {
    /// Whether the caller may create admin accounts
    pub admin_allowed: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Event {
    id: PrimaryKey,
    name: String,
    description: String,
    #[schema(value_type = String, example = "2025-03-01T10:00:00")]
    date: NaiveDateTime,
    location: String,
    max_seats: i64,
    registration_fee: f64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EventOverview {
    #[serde(flatten)]
    event: Event,
    seats_taken: i64,
    seats_left: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Registration {
    id: PrimaryKey,
    user_id: PrimaryKey,
    event_id: PrimaryKey,
    payment_amount: f64,
    payment_status: bool,
    is_confirmed: bool,
    registration_date: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Notification {
    id: PrimaryKey,
    event_id: PrimaryKey,
    message: String,
    is_read: bool,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Message {
    id: PrimaryKey,
    sender_id: PrimaryKey,
    receiver_id: PrimaryKey,
    content: String,
    timestamp: DateTime<Utc>,
    is_read: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminDashboard {
    pub events: Vec<EventOverview>,
    pub users: Vec<User>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StudentEvent {
    #[serde(flatten)]
    pub overview: EventOverview,
    /// Whether the caller already holds a seat
    pub registered: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StudentDashboard {
    pub events: Vec<StudentEvent>,
    pub registrations: Vec<Registration>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EventDetail {
    pub event: EventOverview,
    pub registration: Option<Registration>,
}

/// Defaults for a blank event form
#[derive(Debug, Serialize, ToSchema)]
pub struct EventForm {
    pub max_seats: i64,
    pub registration_fee: f64,
    #[schema(value_type = String, example = "%Y-%m-%dT%H:%M")]
    pub date_format: &'static str,
}

impl EventForm {
    pub fn with_default_seats(max_seats: i64) -> Self {
        Self {
            max_seats,
            registration_fee: 0.0,
            date_format: DATE_FORMAT,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegistrationQuote {
    pub event: EventOverview,
    pub fee: f64,
    pub registered: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegistrationResult {
    #[schema(value_type = String)]
    pub message: &'static str,
    pub registration: Registration,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusMessage {
    #[schema(value_type = String)]
    pub message: &'static str,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SendResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SendResult {
    pub fn sent() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn failed(message: impl ToString) -> Self {
        Self {
            success: false,
            message: Some(message.to_string()),
        }
    }
}

/// Helper trait to convert any type into a serialized version
pub trait ToSerialized<T>
where
    T: Serialize,
{
    fn to_serialized(&self) -> T;
}

impl<I, O> ToSerialized<Vec<O>> for Vec<I>
where
    I: ToSerialized<O>,
    O: Serialize,
{
    fn to_serialized(&self) -> Vec<O> {
        self.iter().map(|x| x.to_serialized()).collect()
    }
}

impl ToSerialized<User> for UserData {
    fn to_serialized(&self) -> User {
        User {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            role: self.role,
            created_at: self.created_at,
        }
    }
}

impl ToSerialized<LoginResult> for SessionData {
    fn to_serialized(&self) -> LoginResult {
        LoginResult {
            token: self.token.clone(),
            expires_at: self.expires_at,
            user: self.user.to_serialized(),
            redirect: dashboard_path(self.user.role),
        }
    }
}

impl ToSerialized<Event> for EventData {
    fn to_serialized(&self) -> Event {
        Event {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            date: self.date,
            location: self.location.clone(),
            max_seats: self.max_seats,
            registration_fee: self.registration_fee,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl ToSerialized<EventOverview> for EventSummary {
    fn to_serialized(&self) -> EventOverview {
        EventOverview {
            event: self.event.to_serialized(),
            seats_taken: self.seats_taken,
            seats_left: self.seats_left(),
        }
    }
}

impl ToSerialized<Registration> for RegistrationData {
    fn to_serialized(&self) -> Registration {
        Registration {
            id: self.id,
            user_id: self.user_id,
            event_id: self.event_id,
            payment_amount: self.payment_amount,
            payment_status: self.payment_status,
            is_confirmed: self.is_confirmed,
            registration_date: self.registration_date,
        }
    }
}

impl ToSerialized<Notification> for NotificationData {
    fn to_serialized(&self) -> Notification {
        Notification {
            id: self.id,
            event_id: self.event_id,
            message: self.message.clone(),
            is_read: self.is_read,
            created_at: self.created_at,
        }
    }
}

impl ToSerialized<Message> for MessageData {
    fn to_serialized(&self) -> Message {
        Message {
            id: self.id,
            sender_id: self.sender_id,
            receiver_id: self.receiver_id,
            content: self.content.clone(),
            timestamp: self.timestamp,
            is_read: self.is_read,
        }
    }
}
