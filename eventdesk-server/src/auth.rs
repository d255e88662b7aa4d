use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, Query, Request, State},
    http::{header, request::Parts, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post, MethodRouter},
    Json,
};
use eventdesk_ledger::{
    policy::{authorize, Operation},
    Credentials, DatabaseError, NewPlainUser, Role, SessionData, UserData,
};
use serde::Deserialize;

use crate::{
    errors::{ServerError, ServerResult},
    schemas::{LoginSchema, RegisterSchema, ValidatedJson},
    serialized::{LoginForm, LoginResult, RegisterForm, ToSerialized, User},
    Router, ServerContext,
};

/// Where each role lands after logging in
pub fn dashboard_path(role: Role) -> &'static str {
    match role {
        Role::Admin => "/admin/dashboard",
        Role::Student => "/student/dashboard",
    }
}

/// Wraps [SessionData] so [FromRequestParts] can be implemented for it
#[derive(Debug, Clone)]
pub struct Session(SessionData);

impl Session {
    /// Returns the user of the session
    pub fn user(&self) -> &UserData {
        &self.0.user
    }

    pub fn token(&self) -> &str {
        &self.0.token
    }
}

/// The caller of a request, who may not be logged in
#[derive(Debug, Clone)]
pub enum Identity {
    Authenticated(Session),
    Anonymous,
}

impl Identity {
    pub fn role(&self) -> Option<Role> {
        match self {
            Self::Authenticated(session) => Some(session.user().role),
            Self::Anonymous => None,
        }
    }
}

#[derive(Deserialize)]
struct TokenQuery {
    token: String,
}

/// Finds the session token in the authorization header, or the `token` query parameter
fn token_from_parts(parts: &Parts) -> Result<Option<String>, ServerError> {
    if let Some(value) = parts.headers.get(header::AUTHORIZATION) {
        let value = value
            .to_str()
            .map_err(|_| ServerError::MalformedAuthorization)?;

        let parts: Vec<_> = value.split_ascii_whitespace().collect();

        if parts.first() != Some(&"Bearer") {
            return Err(ServerError::MalformedAuthorization);
        }

        return Ok(parts.get(1).map(|token| token.to_string()));
    }

    let query = Query::<TokenQuery>::try_from_uri(&parts.uri).ok();

    Ok(query.map(|Query(q)| q.token))
}

#[async_trait]
impl<S> FromRequestParts<S> for Identity
where
    ServerContext: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let context = ServerContext::from_ref(state);

        let Some(token) = token_from_parts(parts)? else {
            return Ok(Self::Anonymous);
        };

        Self::from_lookup(context.ledger.auth.session(&token).await)
    }
}

impl Identity {
    /// Unknown or expired tokens are anonymous, a failing store is not
    fn from_lookup(lookup: Result<SessionData, DatabaseError>) -> Result<Self, ServerError> {
        match lookup {
            Ok(session) => Ok(Self::Authenticated(Session(session))),
            Err(e) if e.is_not_found() => Ok(Self::Anonymous),
            Err(e) => Err(ServerError::Unknown(format!("Could not look up session: {}", e))),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    ServerContext: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Gated routes have already resolved the session
        if let Some(session) = parts.extensions.get::<Session>() {
            return Ok(session.clone());
        }

        match Identity::from_request_parts(parts, state).await? {
            Identity::Authenticated(session) => Ok(session),
            Identity::Anonymous => Err(ServerError::Unauthenticated),
        }
    }
}

/// State for the access gate of a single route
#[derive(Clone)]
pub struct Gate {
    context: ServerContext,
    operation: Operation,
}

impl FromRef<Gate> for ServerContext {
    fn from_ref(gate: &Gate) -> Self {
        gate.context.clone()
    }
}

async fn check_access(
    State(gate): State<Gate>,
    identity: Identity,
    mut request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    authorize(identity.role(), gate.operation)?;

    if let Identity::Authenticated(session) = identity {
        request.extensions_mut().insert(session);
    }

    Ok(next.run(request).await)
}

/// Only lets requests through when the caller may perform `operation`
pub fn gated(
    context: &ServerContext,
    operation: Operation,
    route: MethodRouter<ServerContext>,
) -> MethodRouter<ServerContext> {
    let gate = Gate {
        context: context.clone(),
        operation,
    };

    route.route_layer(middleware::from_fn_with_state(gate, check_access))
}

#[utoipa::path(
    get,
    path = "/register",
    tag = "auth",
    responses(
        (status = 200, body = RegisterForm)
    )
)]
async fn register_form(identity: Identity) -> Json<RegisterForm> {
    let admin_allowed = authorize(identity.role(), Operation::CreateAdminAccount).is_ok();

    Json(RegisterForm { admin_allowed })
}

#[utoipa::path(
    post,
    path = "/register",
    tag = "auth",
    request_body = RegisterSchema,
    responses(
        (status = 201, body = User),
        (status = 403, description = "Only admins can create admin accounts"),
        (status = 409, description = "Username or email already taken")
    )
)]
async fn register(
    State(context): State<ServerContext>,
    identity: Identity,
    ValidatedJson(body): ValidatedJson<RegisterSchema>,
) -> ServerResult<impl IntoResponse> {
    let role = if body.admin {
        authorize(identity.role(), Operation::CreateAdminAccount)
            .map_err(|_| ServerError::NotPermitted("Only admins can create admin accounts"))?;

        Role::Admin
    } else {
        Role::Student
    };

    let user = context
        .ledger
        .auth
        .register(NewPlainUser {
            username: body.username,
            password: body.password,
            email: body.email,
            role,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(user.to_serialized())))
}

/// Users who are already logged in are sent to their dashboard
#[utoipa::path(
    get,
    path = "/login",
    tag = "auth",
    responses(
        (status = 200, body = LoginForm),
        (status = 303, description = "Already logged in, redirects to the dashboard")
    )
)]
async fn login_form(identity: Identity) -> Response {
    match identity.role() {
        Some(role) => Redirect::to(dashboard_path(role)).into_response(),
        None => Json(LoginForm::default()).into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/login",
    tag = "auth",
    request_body = LoginSchema,
    responses(
        (status = 200, body = LoginResult),
        (status = 401, description = "Invalid username or password"),
        (status = 403, description = "The account has a different role")
    )
)]
async fn login(
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<LoginSchema>,
) -> ServerResult<Json<LoginResult>> {
    let session = context
        .ledger
        .auth
        .login(Credentials {
            username: body.username,
            password: body.password,
            role: body.role,
        })
        .await?;

    Ok(Json(session.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/logout",
    tag = "auth",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 303, description = "Session removed, redirects to /login")
    )
)]
async fn logout(State(context): State<ServerContext>, session: Session) -> ServerResult<Redirect> {
    context.ledger.auth.logout(session.token()).await?;

    Ok(Redirect::to("/login"))
}

#[utoipa::path(
    get,
    path = "/user",
    tag = "auth",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = User)
    )
)]
async fn user(session: Session) -> Json<User> {
    Json(session.user().to_serialized())
}

pub fn router(context: &ServerContext) -> Router {
    Router::new()
        .route("/register", get(register_form).post(register))
        .route("/login", get(login_form).post(login))
        .route("/logout", gated(context, Operation::Logout, get(logout)))
        .route("/user", gated(context, Operation::ViewOwnAccount, get(user)))
}
