use std::borrow::BorrowMut;

use axum::{response::IntoResponse, Json};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::{auth, chat, events, schemas, serialized};

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::register_form,
        auth::register,
        auth::login_form,
        auth::login,
        auth::logout,
        auth::user,
        events::admin_dashboard,
        events::list_users,
        events::student_dashboard,
        events::event,
        events::event_form,
        events::create_event,
        events::edit_form,
        events::edit_event,
        events::delete_event,
        events::registration_quote,
        events::register_for_event,
        events::notifications,
        chat::chat,
        chat::admin_chat,
        chat::send_message,
    ),
    components(schemas(
        schemas::LoginSchema,
        schemas::RegisterSchema,
        schemas::EventSchema,
        schemas::MessageSchema,
        serialized::User,
        serialized::LoginForm,
        serialized::RegisterForm,
        serialized::LoginResult,
        serialized::Event,
        serialized::EventOverview,
        serialized::Registration,
        serialized::Notification,
        serialized::Message,
        serialized::AdminDashboard,
        serialized::StudentEvent,
        serialized::StudentDashboard,
        serialized::EventDetail,
        serialized::EventForm,
        serialized::RegistrationQuote,
        serialized::RegistrationResult,
        serialized::StatusMessage,
        serialized::SendResult,
    )),
    modifiers(&Security),
    info(
        description = "eventdesk-server exposes endpoints to manage campus events, registrations and chat"
    )
)]
pub struct ApiDoc;

struct Security;

impl Modify for Security {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.borrow_mut() {
            let scheme = HttpBuilder::new()
                .scheme(HttpAuthScheme::Bearer)
                .bearer_format("Bearer <token>")
                .build();

            components.add_security_scheme("BearerAuth", SecurityScheme::Http(scheme))
        }
    }
}

pub async fn docs() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}
