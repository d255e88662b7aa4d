use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use eventdesk_ledger::{
    policy::{AccessError, Operation},
    AuthError, DatabaseError, EventError, RegistrationError, Role,
};
use log::error;
use thiserror::Error;

use crate::auth::dashboard_path;

pub type ServerResult<T> = Result<T, ServerError>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Validation(String),
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("{0}")]
    RoleMismatch(String),
    #[error("{0}")]
    NotPermitted(&'static str),
    #[error("Authorization must be Bearer")]
    MalformedAuthorization,
    /// No session, the user is sent to log in
    #[error("You need to log in first")]
    Unauthenticated,
    /// Logged in with the wrong role, the user is sent back where they belong
    #[error("You are not allowed to do that")]
    Forbidden { redirect: &'static str },
    /// The details are logged, never shown
    #[error("Something went wrong, please try again")]
    Unknown(String),
}

impl ServerError {
    fn as_status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::RoleMismatch(_) | Self::NotPermitted(_) => StatusCode::FORBIDDEN,
            Self::MalformedAuthorization => StatusCode::BAD_REQUEST,
            Self::Unauthenticated | Self::Forbidden { .. } => StatusCode::SEE_OTHER,
            Self::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthenticated => Redirect::to("/login").into_response(),
            Self::Forbidden { redirect } => Redirect::to(redirect).into_response(),
            Self::Unknown(ref details) => {
                error!("Request failed: {}", details);
                (self.as_status_code(), self.to_string()).into_response()
            }
            _ => (self.as_status_code(), self.to_string()).into_response(),
        }
    }
}

/// Where a user is sent when they try something their role doesn't allow
fn fallback_for(operation: Operation, role: Role) -> &'static str {
    match (operation, role) {
        (Operation::ViewAdminChat, Role::Student) => "/chat",
        (_, role) => dashboard_path(role),
    }
}

impl From<AccessError> for ServerError {
    fn from(value: AccessError) -> Self {
        match value {
            AccessError::Unauthenticated => Self::Unauthenticated,
            AccessError::Forbidden { operation, role } => Self::Forbidden {
                redirect: fallback_for(operation, role),
            },
        }
    }
}

impl From<AuthError> for ServerError {
    fn from(value: AuthError) -> Self {
        match value {
            AuthError::InvalidCredentials => Self::InvalidCredentials,
            e @ AuthError::RoleMismatch { .. } => Self::RoleMismatch(e.to_string()),
            e @ AuthError::DuplicateIdentity => Self::Conflict(e.to_string()),
            e @ AuthError::MissingFields => Self::Validation(e.to_string()),
            e => Self::Unknown(e.to_string()),
        }
    }
}

impl From<DatabaseError> for ServerError {
    fn from(value: DatabaseError) -> Self {
        match value {
            e @ DatabaseError::NotFound { .. } => Self::NotFound(e.to_string()),
            e @ DatabaseError::Conflict { .. } => Self::Conflict(e.to_string()),
            e => Self::Unknown(e.to_string()),
        }
    }
}

impl From<EventError> for ServerError {
    fn from(value: EventError) -> Self {
        match value {
            EventError::Validation(e) => Self::Validation(e.to_string()),
            e @ EventError::NotFound(_) => Self::NotFound(e.to_string()),
            EventError::Db(e) => e.into(),
        }
    }
}

impl From<RegistrationError> for ServerError {
    fn from(value: RegistrationError) -> Self {
        match value {
            e @ RegistrationError::NotFound(_) => Self::NotFound(e.to_string()),
            e @ (RegistrationError::AlreadyRegistered | RegistrationError::SeatsFull) => {
                Self::Conflict(e.to_string())
            }
            RegistrationError::TransactionFailure(e) => Self::Unknown(e.to_string()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn wrong_roles_are_sent_home() {
        let student_deleting: ServerError = AccessError::Forbidden {
            operation: Operation::DeleteEvent,
            role: Role::Student,
        }
        .into();
        assert!(matches!(
            student_deleting,
            ServerError::Forbidden {
                redirect: "/student/dashboard"
            }
        ));

        let admin_registering: ServerError = AccessError::Forbidden {
            operation: Operation::RegisterForEvent,
            role: Role::Admin,
        }
        .into();
        assert!(matches!(
            admin_registering,
            ServerError::Forbidden {
                redirect: "/admin/dashboard"
            }
        ));

        let student_in_admin_chat: ServerError = AccessError::Forbidden {
            operation: Operation::ViewAdminChat,
            role: Role::Student,
        }
        .into();
        assert!(matches!(
            student_in_admin_chat,
            ServerError::Forbidden { redirect: "/chat" }
        ));
    }

    #[test]
    fn internal_errors_are_not_leaked() {
        let error = ServerError::Unknown("disk I/O error".to_string());

        assert_eq!(
            error.to_string(),
            "Something went wrong, please try again"
        );
        assert_eq!(
            error.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
