//! Role based access control.
//!
//! Every gated operation is listed in [Operation::audience], which is the only place
//! deciding who may do what. Callers resolve the acting identity, then ask [authorize].

use thiserror::Error;

use crate::Role;

/// Something a request wants to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ViewAdminDashboard,
    ViewStudentDashboard,
    ListUsers,
    ViewEvent,
    CreateEvent,
    EditEvent,
    DeleteEvent,
    RegisterForEvent,
    ViewChat,
    ViewAdminChat,
    SendMessage,
    ViewNotifications,
    ViewOwnAccount,
    CreateAdminAccount,
    Logout,
}

/// Who is allowed to perform an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// Any logged in user
    Authenticated,
    Only(Role),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccessError {
    #[error("You need to log in first")]
    Unauthenticated,
    #[error("{role:?} accounts cannot perform {operation:?}")]
    Forbidden { operation: Operation, role: Role },
}

impl Operation {
    pub fn audience(self) -> Audience {
        use Audience::*;
        use Operation::*;

        match self {
            ViewAdminDashboard => Only(Role::Admin),
            ListUsers => Only(Role::Admin),
            CreateEvent => Only(Role::Admin),
            EditEvent => Only(Role::Admin),
            DeleteEvent => Only(Role::Admin),
            ViewAdminChat => Only(Role::Admin),
            CreateAdminAccount => Only(Role::Admin),

            ViewStudentDashboard => Only(Role::Student),
            RegisterForEvent => Only(Role::Student),

            ViewEvent => Authenticated,
            ViewChat => Authenticated,
            SendMessage => Authenticated,
            ViewNotifications => Authenticated,
            ViewOwnAccount => Authenticated,
            Logout => Authenticated,
        }
    }
}

/// Decides whether an identity with the given role, or no identity at all, may perform an operation
pub fn authorize(role: Option<Role>, operation: Operation) -> Result<(), AccessError> {
    let role = role.ok_or(AccessError::Unauthenticated)?;

    match operation.audience() {
        Audience::Authenticated => Ok(()),
        Audience::Only(required) if required == role => Ok(()),
        Audience::Only(_) => Err(AccessError::Forbidden { operation, role }),
    }
}
