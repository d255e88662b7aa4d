use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json,
};
use eventdesk_ledger::{policy::Operation, MessageError};
use log::error;

use crate::{
    auth::{gated, Session},
    errors::ServerResult,
    schemas::{MessageSchema, ValidatedJson},
    serialized::{Message, SendResult, ToSerialized},
    Router, ServerContext,
};

async fn conversation(context: &ServerContext, session: &Session) -> ServerResult<Json<Vec<Message>>> {
    let messages = context
        .ledger
        .messaging
        .conversation(session.user().id)
        .await?;

    Ok(Json(messages.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/chat",
    tag = "chat",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<Message>)
    )
)]
async fn chat(State(context): State<ServerContext>, session: Session) -> ServerResult<Json<Vec<Message>>> {
    conversation(&context, &session).await
}

#[utoipa::path(
    get,
    path = "/admin/chat",
    tag = "chat",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<Message>)
    )
)]
async fn admin_chat(
    State(context): State<ServerContext>,
    session: Session,
) -> ServerResult<Json<Vec<Message>>> {
    conversation(&context, &session).await
}

/// Always answers 200, the outcome is in the body
#[utoipa::path(
    post,
    path = "/send_message",
    tag = "chat",
    request_body = MessageSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = SendResult)
    )
)]
async fn send_message(
    State(context): State<ServerContext>,
    session: Session,
    body: Result<ValidatedJson<MessageSchema>, (StatusCode, &'static str)>,
) -> Json<SendResult> {
    let body = match body {
        Ok(ValidatedJson(body)) => body,
        Err((_, reason)) => return Json(SendResult::failed(reason)),
    };

    let result = context
        .ledger
        .messaging
        .send(session.user(), body.student_id, &body.content)
        .await;

    match result {
        Ok(_) => Json(SendResult::sent()),
        Err(MessageError::Db(e)) => {
            error!("Could not store message from {}: {}", session.user().username, e);
            Json(SendResult::failed("Message could not be sent, please try again"))
        }
        Err(e) => Json(SendResult::failed(e)),
    }
}

pub fn router(context: &ServerContext) -> Router {
    Router::new()
        .route("/chat", gated(context, Operation::ViewChat, get(chat)))
        .route(
            "/admin/chat",
            gated(context, Operation::ViewAdminChat, get(admin_chat)),
        )
        .route(
            "/send_message",
            gated(context, Operation::SendMessage, post(send_message)),
        )
}
