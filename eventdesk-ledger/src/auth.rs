use argon2::{
    password_hash::{Encoding, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use chrono::{Duration, Utc};
use log::info;
use rand::rngs::OsRng;
use std::sync::Arc;
use thiserror::Error;

use crate::{
    util::{non_empty, random_string},
    Config, Database, DatabaseError, NewSession, NewUser, Role, SessionData, UserData,
};

pub struct Auth<Db> {
    db: Arc<Db>,
    argon: Argon2<'static>,
    /// Verified against when the username is unknown
    decoy_hash: Option<String>,
    session_duration: Duration,
}

#[derive(Debug, Error)]
pub enum AuthError {
    /// Username or password is incorrect. Unknown usernames fail the same way.
    #[error("Invalid username or password")]
    InvalidCredentials,
    /// The account exists but has a different role than the one asked for
    #[error("{}", role_mismatch_message(.attempted))]
    RoleMismatch { attempted: Role, actual: Role },
    #[error("Username or email already exists")]
    DuplicateIdentity,
    #[error("Username and password are required")]
    MissingFields,
    /// Something else went wrong with the database
    #[error(transparent)]
    Db(DatabaseError),
    #[error("HashError: {0}")]
    HashError(String),
}

fn role_mismatch_message(attempted: &Role) -> &'static str {
    match attempted {
        Role::Admin => "You are not authorized to log in as an admin",
        Role::Student => "Admins cannot log in as students",
    }
}

impl<Db> Auth<Db>
where
    Db: Database,
{
    const TOKEN_LENGTH: usize = 32;

    pub fn new(db: &Arc<Db>, config: &Config) -> Self {
        let argon = Argon2::default();
        let salt = SaltString::generate(&mut OsRng);
        let decoy_hash = argon
            .hash_password(random_string(Self::TOKEN_LENGTH).as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .ok();

        Self {
            db: db.clone(),
            argon,
            decoy_hash,
            session_duration: config.session_duration(),
        }
    }

    /// Logs in a user, returning a new session
    pub async fn login(&self, credentials: Credentials) -> Result<SessionData, AuthError> {
        self.clear_expired().await?;

        let user = match self.db.user_by_username(credentials.username.trim()).await {
            Ok(user) => user,
            Err(DatabaseError::NotFound { .. }) => {
                self.verify_decoy(&credentials.password);
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => return Err(AuthError::Db(e)),
        };

        if !self.verify_password(&user, &credentials.password)? {
            return Err(AuthError::InvalidCredentials);
        }

        if let Some(attempted) = credentials.role {
            if attempted != user.role {
                return Err(AuthError::RoleMismatch {
                    attempted,
                    actual: user.role,
                });
            }
        }

        let new_session = NewSession {
            token: random_string(Self::TOKEN_LENGTH),
            user_id: user.id,
            expires_at: Utc::now() + self.session_duration,
        };

        let session = self
            .db
            .create_session(new_session)
            .await
            .map_err(AuthError::Db)?;

        info!("{} logged in as {}", user.username, user.role.as_str());

        Ok(session)
    }

    /// Deletes the associated session, if it exists
    pub async fn logout(&self, token: &str) -> Result<(), DatabaseError> {
        self.db.delete_session_by_token(token).await
    }

    /// Creates an account with the given role
    pub async fn register(&self, new_user: NewPlainUser) -> Result<UserData, AuthError> {
        let username = non_empty(&new_user.username).ok_or(AuthError::MissingFields)?;

        if new_user.password.is_empty() {
            return Err(AuthError::MissingFields);
        }

        let salt = SaltString::generate(&mut OsRng);
        let hashed_password = self
            .argon
            .hash_password(new_user.password.as_bytes(), &salt)
            .map_err(|e| AuthError::HashError(e.to_string()))?
            .to_string();

        let user = self
            .db
            .create_user(NewUser {
                username,
                email: new_user.email.as_deref().and_then(non_empty),
                password: hashed_password,
                role: new_user.role,
            })
            .await
            .map_err(|e| match e {
                DatabaseError::Conflict { .. } => AuthError::DuplicateIdentity,
                err => AuthError::Db(err),
            })?;

        info!("Created {} account {}", user.role.as_str(), user.username);

        Ok(user)
    }

    /// Creates an admin, unless one already exists
    pub async fn ensure_admin(&self, new_user: NewPlainUser) -> Result<Option<UserData>, AuthError> {
        let has_admin = self.db.check_for_admin().await.map_err(AuthError::Db)?;

        if has_admin {
            return Ok(None);
        }

        self.register(NewPlainUser {
            role: Role::Admin,
            ..new_user
        })
        .await
        .map(Some)
    }

    /// Returns a session if it exists and hasn't expired
    pub async fn session(&self, token: &str) -> Result<SessionData, DatabaseError> {
        let session = self.db.session_by_token(token).await?;

        if session.expires_at <= Utc::now() {
            return Err(DatabaseError::NotFound {
                resource: "session",
                identifier: "token",
            });
        }

        Ok(session)
    }

    pub async fn list_users(&self) -> Result<Vec<UserData>, DatabaseError> {
        self.db.list_users().await
    }

    /// Checks a plaintext password against the stored hash of a user
    pub fn verify_password(&self, user: &UserData, password: &str) -> Result<bool, AuthError> {
        let stored_password = PasswordHash::parse(&user.password, Encoding::default())
            .map_err(|e| AuthError::HashError(e.to_string()))?;

        Ok(self
            .argon
            .verify_password(password.as_bytes(), &stored_password)
            .is_ok())
    }

    /// Checks the password against a hash nobody knows the secret of
    fn verify_decoy(&self, password: &str) -> bool {
        self.decoy_hash
            .as_deref()
            .and_then(|hash| PasswordHash::new(hash).ok())
            .is_some_and(|hash| self.argon.verify_password(password.as_bytes(), &hash).is_ok())
    }

    async fn clear_expired(&self) -> Result<(), AuthError> {
        self.db.clear_expired_sessions().await.map_err(AuthError::Db)
    }
}

#[derive(Debug)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    /// The role the user intends to log in as, if they picked one
    pub role: Option<Role>,
}

#[derive(Debug)]
pub struct NewPlainUser {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
    pub role: Role,
}
