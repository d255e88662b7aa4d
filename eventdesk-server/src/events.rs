use std::collections::HashSet;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json,
};
use eventdesk_ledger::{policy::Operation, PrimaryKey};

use crate::{
    auth::{gated, Session},
    errors::ServerResult,
    schemas::{EventSchema, ValidatedJson},
    serialized::{
        AdminDashboard, Event, EventDetail, EventForm, Notification, RegistrationQuote,
        RegistrationResult, StatusMessage, StudentDashboard, StudentEvent, ToSerialized, User,
    },
    Router, ServerContext,
};

#[utoipa::path(
    get,
    path = "/admin/dashboard",
    tag = "dashboards",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = AdminDashboard)
    )
)]
async fn admin_dashboard(State(context): State<ServerContext>) -> ServerResult<Json<AdminDashboard>> {
    let events = context.ledger.catalog.overview().await?;
    let users = context.ledger.auth.list_users().await?;

    Ok(Json(AdminDashboard {
        events: events.to_serialized(),
        users: users.to_serialized(),
    }))
}

#[utoipa::path(
    get,
    path = "/admin/users",
    tag = "dashboards",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<User>)
    )
)]
async fn list_users(State(context): State<ServerContext>) -> ServerResult<Json<Vec<User>>> {
    let users = context.ledger.auth.list_users().await?;

    Ok(Json(users.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/student/dashboard",
    tag = "dashboards",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = StudentDashboard)
    )
)]
async fn student_dashboard(
    State(context): State<ServerContext>,
    session: Session,
) -> ServerResult<Json<StudentDashboard>> {
    let user_id = session.user().id;

    let summaries = context.ledger.catalog.overview().await?;
    let registrations = context.ledger.registrations.for_user(user_id).await?;

    let registered: HashSet<PrimaryKey> = registrations.iter().map(|r| r.event_id).collect();

    let events = summaries
        .iter()
        .map(|summary| StudentEvent {
            overview: summary.to_serialized(),
            registered: registered.contains(&summary.event.id),
        })
        .collect();

    Ok(Json(StudentDashboard {
        events,
        registrations: registrations.to_serialized(),
    }))
}

#[utoipa::path(
    get,
    path = "/event/{id}",
    tag = "events",
    params(
        ("id" = i64, Path, description = "Event id")
    ),
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = EventDetail),
        (status = 404, description = "Event doesn't exist")
    )
)]
async fn event(
    State(context): State<ServerContext>,
    session: Session,
    Path(event_id): Path<PrimaryKey>,
) -> ServerResult<Json<EventDetail>> {
    let summary = context.ledger.catalog.summary(event_id).await?;
    let registration = context
        .ledger
        .registrations
        .registration_for(session.user().id, event_id)
        .await?;

    Ok(Json(EventDetail {
        event: summary.to_serialized(),
        registration: registration.map(|r| r.to_serialized()),
    }))
}

#[utoipa::path(
    get,
    path = "/create_event",
    tag = "events",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = EventForm)
    )
)]
async fn event_form(State(context): State<ServerContext>) -> Json<EventForm> {
    Json(EventForm::with_default_seats(
        context.ledger.catalog.default_max_seats(),
    ))
}

#[utoipa::path(
    post,
    path = "/create_event",
    tag = "events",
    request_body = EventSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 201, body = Event),
        (status = 422, description = "A field is missing or invalid")
    )
)]
async fn create_event(
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<EventSchema>,
) -> ServerResult<impl IntoResponse> {
    let event = context.ledger.catalog.create(body.into()).await?;

    Ok((StatusCode::CREATED, Json(event.to_serialized())))
}

#[utoipa::path(
    get,
    path = "/edit_event/{id}",
    tag = "events",
    params(
        ("id" = i64, Path, description = "Event id")
    ),
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Event),
        (status = 404, description = "Event doesn't exist")
    )
)]
async fn edit_form(
    State(context): State<ServerContext>,
    Path(event_id): Path<PrimaryKey>,
) -> ServerResult<Json<Event>> {
    let event = context.ledger.catalog.get(event_id).await?;

    Ok(Json(event.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/edit_event/{id}",
    tag = "events",
    params(
        ("id" = i64, Path, description = "Event id")
    ),
    request_body = EventSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Event),
        (status = 404, description = "Event doesn't exist"),
        (status = 422, description = "A field is invalid, or seats would drop below confirmed registrations")
    )
)]
async fn edit_event(
    State(context): State<ServerContext>,
    Path(event_id): Path<PrimaryKey>,
    ValidatedJson(body): ValidatedJson<EventSchema>,
) -> ServerResult<Json<Event>> {
    let event = context.ledger.catalog.edit(event_id, body.into()).await?;

    Ok(Json(event.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/delete_event/{id}",
    tag = "events",
    params(
        ("id" = i64, Path, description = "Event id")
    ),
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = StatusMessage),
        (status = 404, description = "Event doesn't exist")
    )
)]
async fn delete_event(
    State(context): State<ServerContext>,
    Path(event_id): Path<PrimaryKey>,
) -> ServerResult<Json<StatusMessage>> {
    context.ledger.catalog.delete(event_id).await?;

    Ok(Json(StatusMessage {
        message: "Event deleted successfully!",
    }))
}

#[utoipa::path(
    get,
    path = "/register_event/{id}",
    tag = "registrations",
    params(
        ("id" = i64, Path, description = "Event id")
    ),
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = RegistrationQuote),
        (status = 404, description = "Event doesn't exist")
    )
)]
async fn registration_quote(
    State(context): State<ServerContext>,
    session: Session,
    Path(event_id): Path<PrimaryKey>,
) -> ServerResult<Json<RegistrationQuote>> {
    let summary = context.ledger.catalog.summary(event_id).await?;
    let registration = context
        .ledger
        .registrations
        .registration_for(session.user().id, event_id)
        .await?;

    Ok(Json(RegistrationQuote {
        fee: summary.event.registration_fee,
        registered: registration.is_some(),
        event: summary.to_serialized(),
    }))
}

#[utoipa::path(
    post,
    path = "/register_event/{id}",
    tag = "registrations",
    params(
        ("id" = i64, Path, description = "Event id")
    ),
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 201, body = RegistrationResult),
        (status = 404, description = "Event doesn't exist"),
        (status = 409, description = "Already registered, or no seats left")
    )
)]
async fn register_for_event(
    State(context): State<ServerContext>,
    session: Session,
    Path(event_id): Path<PrimaryKey>,
) -> ServerResult<impl IntoResponse> {
    let registration = context
        .ledger
        .registrations
        .register(session.user().id, event_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegistrationResult {
            message: "Registration successful!",
            registration: registration.to_serialized(),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/notifications",
    tag = "registrations",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<Notification>)
    )
)]
async fn notifications(
    State(context): State<ServerContext>,
    session: Session,
) -> ServerResult<Json<Vec<Notification>>> {
    let notifications = context
        .ledger
        .notifications
        .for_user(session.user().id)
        .await?;

    Ok(Json(notifications.to_serialized()))
}

pub fn router(context: &ServerContext) -> Router {
    use Operation::*;

    Router::new()
        .route(
            "/admin/dashboard",
            gated(context, ViewAdminDashboard, get(admin_dashboard)),
        )
        .route("/admin/users", gated(context, ListUsers, get(list_users)))
        .route(
            "/student/dashboard",
            gated(context, ViewStudentDashboard, get(student_dashboard)),
        )
        .route("/event/:id", gated(context, ViewEvent, get(event)))
        .route(
            "/create_event",
            gated(context, CreateEvent, get(event_form).post(create_event)),
        )
        .route(
            "/edit_event/:id",
            gated(context, EditEvent, get(edit_form).post(edit_event)),
        )
        .route(
            "/delete_event/:id",
            gated(context, DeleteEvent, post(delete_event)),
        )
        .route(
            "/register_event/:id",
            gated(
                context,
                RegisterForEvent,
                get(registration_quote).post(register_for_event),
            ),
        )
        .route(
            "/notifications",
            gated(context, ViewNotifications, get(notifications)),
        )
}
