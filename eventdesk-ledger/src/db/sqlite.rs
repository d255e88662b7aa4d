use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    query, query_as, query_scalar,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Error as SqlxError, FromRow, Sqlite, SqlitePool, Transaction,
};

use crate::{
    Database, DatabaseError, DatabaseResult, EventData, IntoDatabaseError, MessageData, NewEvent,
    NewMessage, NewRegistration, NewSession, NewUser, NotificationData, PrimaryKey,
    RegistrationData, RegistrationOutcome, Result, SessionData, UpdatedEvent, UserData,
};

const USER_COLUMNS: &str = "id, username, email, password, role, created_at";
const EVENT_COLUMNS: &str = "id, name, description, date, location, max_seats, registration_fee, created_at, updated_at";
const REGISTRATION_COLUMNS: &str =
    "id, user_id, event_id, payment_amount, payment_status, is_confirmed, registration_date";
const MESSAGE_COLUMNS: &str = "id, sender_id, receiver_id, content, timestamp, is_read";

/// A SQLite database implementation for eventdesk
pub struct SqliteDatabase {
    pool: SqlitePool,
}

#[derive(FromRow)]
struct SessionRow {
    id: PrimaryKey,
    token: String,
    user_id: PrimaryKey,
    expires_at: DateTime<Utc>,
}

impl SqliteDatabase {
    /// Connects to the database at `url`, creating it if needed, and applies the schema.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| e.any())?
            .create_if_missing(true)
            .foreign_keys(true);

        // An in-memory database lives exactly as long as its connection
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| e.any())?;

        let database = Self { pool };
        database.migrate().await?;

        Ok(database)
    }

    /// A private database that disappears when dropped
    pub async fn in_memory() -> Result<Self> {
        Self::connect("sqlite::memory:", 1).await
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DatabaseError::Internal(Box::new(e)))
    }

    async fn event_exists(tx: &mut Transaction<'_, Sqlite>, event_id: PrimaryKey) -> Result<bool> {
        query_scalar("SELECT EXISTS (SELECT 1 FROM events WHERE id = $1)")
            .bind(event_id)
            .fetch_one(&mut **tx)
            .await
            .map_err(|e| e.any())
    }
}

#[async_trait]
impl Database for SqliteDatabase {
    async fn check_for_admin(&self) -> Result<bool> {
        query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE role = 'admin')")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.any())
    }

    async fn default_admin(&self) -> Result<UserData> {
        query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE role = 'admin' ORDER BY id ASC LIMIT 1"
        ))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.not_found_or("user", "role"))
    }

    async fn user_by_id(&self, user_id: PrimaryKey) -> Result<UserData> {
        query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("user", "id"))
    }

    async fn user_by_username(&self, username: &str) -> Result<UserData> {
        query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1"))
            .bind(username)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("user", "username"))
    }

    async fn user_by_email(&self, email: &str) -> Result<UserData> {
        query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("user", "email"))
    }

    async fn list_users(&self) -> Result<Vec<UserData>> {
        query_as(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id ASC"))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| e.any())
    }

    async fn create_user(&self, new_user: NewUser) -> Result<UserData> {
        self.user_by_username(&new_user.username)
            .await
            .conflict_or_ok("user", "username", &new_user.username)?;

        if let Some(email) = &new_user.email {
            self.user_by_email(email)
                .await
                .conflict_or_ok("user", "email", email)?;
        }

        query_as(&format!(
            "INSERT INTO users (username, email, password, role, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}"
        ))
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.password)
        .bind(new_user.role)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.conflict_or("user", "username", &new_user.username))
    }

    async fn session_by_token(&self, token: &str) -> Result<SessionData> {
        let row: SessionRow =
            query_as("SELECT id, token, user_id, expires_at FROM sessions WHERE token = $1")
                .bind(token)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| e.not_found_or("session", "token"))?;

        let user = self.user_by_id(row.user_id).await?;

        Ok(SessionData {
            id: row.id,
            token: row.token,
            expires_at: row.expires_at,
            user,
        })
    }

    async fn create_session(&self, new_session: NewSession) -> Result<SessionData> {
        self.session_by_token(&new_session.token)
            .await
            .conflict_or_ok("session", "token", &new_session.token)?;

        query("INSERT INTO sessions (token, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(&new_session.token)
            .bind(new_session.user_id)
            .bind(new_session.expires_at)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        self.session_by_token(&new_session.token).await
    }

    async fn delete_session_by_token(&self, token: &str) -> Result<()> {
        let result = query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound {
                resource: "session",
                identifier: "token",
            });
        }

        Ok(())
    }

    async fn clear_expired_sessions(&self) -> Result<()> {
        query("DELETE FROM sessions WHERE expires_at < $1")
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn event_by_id(&self, event_id: PrimaryKey) -> Result<EventData> {
        query_as(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"))
            .bind(event_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("event", "id"))
    }

    async fn list_events(&self) -> Result<Vec<EventData>> {
        query_as(&format!(
            "SELECT {EVENT_COLUMNS} FROM events ORDER BY date DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())
    }

    async fn create_event(&self, new_event: NewEvent) -> Result<EventData> {
        let now = Utc::now();

        query_as(&format!(
            "INSERT INTO events
                (name, description, date, location, max_seats, registration_fee, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING {EVENT_COLUMNS}"
        ))
        .bind(new_event.name)
        .bind(new_event.description)
        .bind(new_event.date)
        .bind(new_event.location)
        .bind(new_event.max_seats)
        .bind(new_event.registration_fee)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())
    }

    async fn update_event(&self, updated_event: UpdatedEvent) -> Result<Option<EventData>> {
        let UpdatedEvent { id, fields } = updated_event;
        let mut tx = self.pool.begin().await.map_err(|e| e.any())?;

        // Seats may never drop below what is already confirmed
        let updated = query(
            "UPDATE events SET
                name = $1,
                description = $2,
                date = $3,
                location = $4,
                max_seats = $5,
                registration_fee = $6,
                updated_at = $7
            WHERE id = $8
                AND (
                    SELECT COUNT(*) FROM registrations
                    WHERE event_id = $8 AND is_confirmed = 1
                ) <= $5",
        )
        .bind(fields.name)
        .bind(fields.description)
        .bind(fields.date)
        .bind(fields.location)
        .bind(fields.max_seats)
        .bind(fields.registration_fee)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| e.any())?
        .rows_affected();

        if updated == 0 {
            return if Self::event_exists(&mut tx, id).await? {
                Ok(None)
            } else {
                Err(DatabaseError::NotFound {
                    resource: "event",
                    identifier: "id",
                })
            };
        }

        let event = query_as(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"))
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| e.any())?;

        tx.commit().await.map_err(|e| e.any())?;

        Ok(Some(event))
    }

    async fn delete_event_and_registrations(&self, event_id: PrimaryKey) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(|e| e.any())?;

        query("DELETE FROM registrations WHERE event_id = $1")
            .bind(event_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| e.any())?;

        query("DELETE FROM notifications WHERE event_id = $1")
            .bind(event_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| e.any())?;

        let deleted = query("DELETE FROM events WHERE id = $1")
            .bind(event_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| e.any())?
            .rows_affected();

        // Dropping the transaction rolls back the deletes above
        if deleted == 0 {
            return Err(DatabaseError::NotFound {
                resource: "event",
                identifier: "id",
            });
        }

        tx.commit().await.map_err(|e| e.any())
    }

    async fn confirmed_count(&self, event_id: PrimaryKey) -> Result<i64> {
        query_scalar(
            "SELECT COUNT(*) FROM registrations WHERE event_id = $1 AND is_confirmed = 1",
        )
        .bind(event_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())
    }

    async fn registration_for(
        &self,
        user_id: PrimaryKey,
        event_id: PrimaryKey,
    ) -> Result<Option<RegistrationData>> {
        query_as(&format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE user_id = $1 AND event_id = $2"
        ))
        .bind(user_id)
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| e.any())
    }

    async fn registrations_for_user(&self, user_id: PrimaryKey) -> Result<Vec<RegistrationData>> {
        query_as(&format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE user_id = $1 ORDER BY id ASC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())
    }

    async fn registrations_for_event(
        &self,
        event_id: PrimaryKey,
    ) -> Result<Vec<RegistrationData>> {
        query_as(&format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE event_id = $1 ORDER BY id ASC"
        ))
        .bind(event_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())
    }

    async fn register_for_event(
        &self,
        new_registration: NewRegistration,
    ) -> Result<RegistrationOutcome> {
        let NewRegistration {
            user_id,
            event_id,
            notification,
        } = new_registration;

        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(|e| e.any())?;

        // This must stay the first statement of the transaction: it takes the write lock
        // before anything is read, so the seat count it checks cannot change underneath it.
        let inserted: std::result::Result<Option<PrimaryKey>, SqlxError> = query_scalar(
            "INSERT INTO registrations
                (user_id, event_id, payment_amount, payment_status, is_confirmed, registration_date)
            SELECT $1, events.id, events.registration_fee, 1, 1, $2
            FROM events
            WHERE events.id = $3
                AND NOT EXISTS (
                    SELECT 1 FROM registrations WHERE user_id = $1 AND event_id = $3
                )
                AND (
                    SELECT COUNT(*) FROM registrations
                    WHERE event_id = $3 AND is_confirmed = 1
                ) < events.max_seats
            RETURNING id",
        )
        .bind(user_id)
        .bind(now)
        .bind(event_id)
        .fetch_optional(&mut *tx)
        .await;

        let registration_id = match inserted {
            Ok(Some(id)) => id,
            Ok(None) => {
                if !Self::event_exists(&mut tx, event_id).await? {
                    return Ok(RegistrationOutcome::EventMissing);
                }

                let already_registered: bool = query_scalar(
                    "SELECT EXISTS (
                        SELECT 1 FROM registrations WHERE user_id = $1 AND event_id = $2
                    )",
                )
                .bind(user_id)
                .bind(event_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| e.any())?;

                return Ok(if already_registered {
                    RegistrationOutcome::AlreadyRegistered
                } else {
                    RegistrationOutcome::SeatsFull
                });
            }
            Err(e) if is_unique_violation(&e) => return Ok(RegistrationOutcome::AlreadyRegistered),
            Err(e) => return Err(e.any()),
        };

        let event_name: String = query_scalar("SELECT name FROM events WHERE id = $1")
            .bind(event_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| e.any())?;

        query(
            "INSERT INTO notifications (user_id, event_id, message, is_read, created_at)
            VALUES ($1, $2, $3, 0, $4)",
        )
        .bind(user_id)
        .bind(event_id)
        .bind(notification(&event_name))
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| e.any())?;

        let registration = query_as(&format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE id = $1"
        ))
        .bind(registration_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| e.any())?;

        tx.commit().await.map_err(|e| e.any())?;

        Ok(RegistrationOutcome::Confirmed(registration))
    }

    async fn notifications_for_user(&self, user_id: PrimaryKey) -> Result<Vec<NotificationData>> {
        query_as(
            "SELECT id, user_id, event_id, message, is_read, created_at
            FROM notifications
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())
    }

    async fn create_message(&self, new_message: NewMessage) -> Result<MessageData> {
        query_as(&format!(
            "INSERT INTO messages (sender_id, receiver_id, content, timestamp, is_read)
            VALUES ($1, $2, $3, $4, 0)
            RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(new_message.sender_id)
        .bind(new_message.receiver_id)
        .bind(new_message.content)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())
    }

    async fn conversation_for(&self, user_id: PrimaryKey) -> Result<Vec<MessageData>> {
        query_as(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages
            WHERE sender_id = $1 OR receiver_id = $1
            ORDER BY timestamp ASC, id ASC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())
    }
}

fn is_unique_violation(error: &SqlxError) -> bool {
    error
        .as_database_error()
        .map(|e| e.is_unique_violation())
        .unwrap_or(false)
}

impl IntoDatabaseError for SqlxError {
    fn any(self) -> DatabaseError {
        DatabaseError::Internal(Box::new(self))
    }

    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError {
        match self {
            SqlxError::RowNotFound => DatabaseError::NotFound {
                resource,
                identifier,
            },
            e => Self::any(e),
        }
    }
}

trait ConflictOr {
    fn conflict_or(self, resource: &'static str, field: &'static str, value: &str)
        -> DatabaseError;
}

impl ConflictOr for SqlxError {
    /// A unique constraint that trips between the check and the insert is still a conflict
    fn conflict_or(
        self,
        resource: &'static str,
        field: &'static str,
        value: &str,
    ) -> DatabaseError {
        if is_unique_violation(&self) {
            DatabaseError::Conflict {
                resource,
                field,
                value: value.to_string(),
            }
        } else {
            self.any()
        }
    }
}
