mod auth;
mod chat;
mod context;
mod docs;
mod errors;
mod events;
mod schemas;
mod serialized;

use axum::routing::get;
use log::info;
use std::net::{Ipv6Addr, SocketAddr};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

pub use context::ServerContext;

/// The default port the server will listen on.
pub const DEFAULT_PORT: u16 = 9050;

pub type Router = axum::Router<ServerContext>;

/// Assembles every route of the server
pub fn app(context: ServerContext) -> axum::Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(auth::router(&context))
        .merge(events::router(&context))
        .merge(chat::router(&context))
        .route("/api.json", get(docs::docs))
        .layer(cors)
        .with_state(context)
}

/// Starts the eventdesk server
pub async fn run_server(context: ServerContext, port: u16) -> std::io::Result<()> {
    let addr: SocketAddr = (Ipv6Addr::UNSPECIFIED, port).into();
    let listener = TcpListener::bind(&addr).await?;

    info!("Listening on http://{}", addr);

    axum::serve(listener, app(context)).await
}

#[cfg(test)]
mod test {
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
        response::Response,
    };
    use eventdesk_ledger::{
        Config, Credentials, Database, EventData, EventFields, Ledger, NewPlainUser, Role,
        SqliteDatabase, UserData,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;

    async fn setup() -> (ServerContext, axum::Router) {
        let database = SqliteDatabase::in_memory().await.unwrap();
        let context = ServerContext::new(Ledger::new(database, Config::default()));
        let app = app(context.clone());

        (context, app)
    }

    async fn create_user(context: &ServerContext, username: &str, role: Role) -> UserData {
        context
            .ledger
            .auth
            .register(NewPlainUser {
                username: username.to_string(),
                password: "correct horse".to_string(),
                email: None,
                role,
            })
            .await
            .unwrap()
    }

    async fn token_for(context: &ServerContext, username: &str) -> String {
        context
            .ledger
            .auth
            .login(Credentials {
                username: username.to_string(),
                password: "correct horse".to_string(),
                role: None,
            })
            .await
            .unwrap()
            .token
    }

    async fn create_event(context: &ServerContext, max_seats: i64) -> EventData {
        context
            .ledger
            .catalog
            .create(EventFields {
                name: "Hack Day".to_string(),
                description: "A day of building things".to_string(),
                date: "2025-03-01T10:00".to_string(),
                location: "Lab 1".to_string(),
                max_seats: Some(max_seats.to_string()),
                registration_fee: Some("5".to_string()),
            })
            .await
            .unwrap()
    }

    async fn send(
        app: &axum::Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        let mut request = Request::builder().method(method).uri(uri);

        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap())),
            None => request.body(Body::empty()),
        };

        app.clone().oneshot(request.unwrap()).await.unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn location(response: &Response) -> &str {
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|l| l.to_str().ok())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn anonymous_requests_go_to_login() {
        let (_, app) = setup().await;

        for uri in ["/admin/dashboard", "/student/dashboard", "/chat", "/user"] {
            let response = send(&app, Method::GET, uri, None, None).await;

            assert_eq!(response.status(), StatusCode::SEE_OTHER, "{}", uri);
            assert_eq!(location(&response), "/login");
        }

        let unknown = send(&app, Method::GET, "/user", Some("not-a-session"), None).await;
        assert_eq!(location(&unknown), "/login");
    }

    #[tokio::test]
    async fn students_cannot_delete_events() {
        let (context, app) = setup().await;
        let student = create_user(&context, "ada", Role::Student).await;
        let event = create_event(&context, 10).await;
        context
            .ledger
            .registrations
            .register(student.id, event.id)
            .await
            .unwrap();

        let token = token_for(&context, "ada").await;
        let uri = format!("/delete_event/{}", event.id);
        let response = send(&app, Method::POST, &uri, Some(&token), None).await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/student/dashboard");

        assert!(context.ledger.catalog.get(event.id).await.is_ok());
        let registrations = context
            .ledger
            .database()
            .registrations_for_event(event.id)
            .await
            .unwrap();
        assert_eq!(registrations.len(), 1);
    }

    #[tokio::test]
    async fn wrong_roles_are_sent_to_their_own_pages() {
        let (context, app) = setup().await;
        create_user(&context, "root", Role::Admin).await;
        create_user(&context, "ada", Role::Student).await;

        let admin = token_for(&context, "root").await;
        let student = token_for(&context, "ada").await;

        let response = send(&app, Method::GET, "/student/dashboard", Some(&admin), None).await;
        assert_eq!(location(&response), "/admin/dashboard");

        let response = send(&app, Method::GET, "/admin/chat", Some(&student), None).await;
        assert_eq!(location(&response), "/chat");

        let response = send(&app, Method::GET, "/create_event", Some(&student), None).await;
        assert_eq!(location(&response), "/student/dashboard");
    }

    #[tokio::test]
    async fn admins_create_events_with_defaults() {
        let (context, app) = setup().await;
        create_user(&context, "root", Role::Admin).await;
        let token = token_for(&context, "root").await;

        let form = send(&app, Method::GET, "/create_event", Some(&token), None).await;
        assert_eq!(form.status(), StatusCode::OK);
        assert_eq!(body_json(form).await["max_seats"], 100);

        let body = json!({
            "name": "Hack Day",
            "description": "A day of building things",
            "date": "2025-03-01T10:00",
            "location": "Lab 1",
        });
        let response = send(&app, Method::POST, "/create_event", Some(&token), Some(body)).await;

        assert_eq!(response.status(), StatusCode::CREATED);
        let event = body_json(response).await;
        assert_eq!(event["max_seats"], 100);
        assert_eq!(event["registration_fee"], 0.0);

        let invalid = json!({
            "name": "Hack Day",
            "description": "A day of building things",
            "date": "March first",
            "location": "Lab 1",
        });
        let response = send(&app, Method::POST, "/create_event", Some(&token), Some(invalid)).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn students_register_once() {
        let (context, app) = setup().await;
        create_user(&context, "ada", Role::Student).await;
        let event = create_event(&context, 10).await;
        let token = token_for(&context, "ada").await;
        let uri = format!("/register_event/{}", event.id);

        let quote = body_json(send(&app, Method::GET, &uri, Some(&token), None).await).await;
        assert_eq!(quote["fee"], 5.0);
        assert_eq!(quote["registered"], false);

        let response = send(&app, Method::POST, &uri, Some(&token), None).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            body_json(response).await["registration"]["payment_amount"],
            5.0
        );

        let again = send(&app, Method::POST, &uri, Some(&token), None).await;
        assert_eq!(again.status(), StatusCode::CONFLICT);
        assert_eq!(
            body_text(again).await,
            "You are already registered for this event"
        );

        let dashboard =
            body_json(send(&app, Method::GET, "/student/dashboard", Some(&token), None).await)
                .await;
        assert_eq!(dashboard["events"][0]["registered"], true);
        assert_eq!(dashboard["events"][0]["seats_left"], 9);

        let notifications =
            body_json(send(&app, Method::GET, "/notifications", Some(&token), None).await).await;
        assert_eq!(
            notifications[0]["message"],
            "Your registration for Hack Day is confirmed!"
        );
    }

    #[tokio::test]
    async fn empty_messages_fail_softly() {
        let (context, app) = setup().await;
        let admin = create_user(&context, "root", Role::Admin).await;
        create_user(&context, "ada", Role::Student).await;
        let token = token_for(&context, "ada").await;

        let response = send(
            &app,
            Method::POST,
            "/send_message",
            Some(&token),
            Some(json!({ "content": "   " })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({ "success": false, "message": "Message cannot be empty" })
        );
        assert!(context
            .ledger
            .messaging
            .conversation(admin.id)
            .await
            .unwrap()
            .is_empty());

        let response = send(
            &app,
            Method::POST,
            "/send_message",
            Some(&token),
            Some(json!({ "content": "When does it start?" })),
        )
        .await;
        assert_eq!(body_json(response).await, json!({ "success": true }));

        let chat = body_json(send(&app, Method::GET, "/chat", Some(&token), None).await).await;
        assert_eq!(chat[0]["receiver_id"], admin.id);
    }

    #[tokio::test]
    async fn unreadable_messages_fail_softly() {
        let (context, app) = setup().await;
        let admin = create_user(&context, "root", Role::Admin).await;
        create_user(&context, "ada", Role::Student).await;
        let token = token_for(&context, "ada").await;

        let too_long = send(
            &app,
            Method::POST,
            "/send_message",
            Some(&token),
            Some(json!({ "content": "a".repeat(2001) })),
        )
        .await;
        assert_eq!(too_long.status(), StatusCode::OK);
        assert_eq!(body_json(too_long).await["success"], false);

        let malformed = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/send_message")
                    .header(header::AUTHORIZATION, format!("Bearer {}", token))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{\"content\": "))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(malformed.status(), StatusCode::OK);
        assert_eq!(body_json(malformed).await["success"], false);

        assert!(context
            .ledger
            .messaging
            .conversation(admin.id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn login_failures_look_the_same() {
        let (context, app) = setup().await;
        create_user(&context, "ada", Role::Student).await;

        let wrong_password = send(
            &app,
            Method::POST,
            "/login",
            None,
            Some(json!({ "username": "ada", "password": "wrong" })),
        )
        .await;
        let unknown_user = send(
            &app,
            Method::POST,
            "/login",
            None,
            Some(json!({ "username": "grace", "password": "wrong" })),
        )
        .await;

        assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(unknown_user.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_text(wrong_password).await, body_text(unknown_user).await);

        let response = send(
            &app,
            Method::POST,
            "/login",
            None,
            Some(json!({ "username": "ada", "password": "correct horse" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let result = body_json(response).await;
        assert_eq!(result["redirect"], "/student/dashboard");
        assert_eq!(result["user"]["role"], "student");
        assert_eq!(result["token"].as_str().map(str::len), Some(32));
    }

    #[tokio::test]
    async fn only_admins_create_admins() {
        let (context, app) = setup().await;
        create_user(&context, "root", Role::Admin).await;
        let token = token_for(&context, "root").await;

        let body = json!({ "username": "mallory", "password": "hunter22", "admin": true });
        let response = send(&app, Method::POST, "/register", None, Some(body)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let body = json!({ "username": "deputy", "password": "hunter22", "admin": true });
        let response = send(&app, Method::POST, "/register", Some(&token), Some(body)).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(body_json(response).await["role"], "admin");

        let body = json!({ "username": "ada", "password": "hunter22" });
        let response = send(&app, Method::POST, "/register", None, Some(body)).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(body_json(response).await["role"], "student");
    }

    #[tokio::test]
    async fn logout_ends_the_session() {
        let (context, app) = setup().await;
        create_user(&context, "ada", Role::Student).await;
        let token = token_for(&context, "ada").await;

        let response = send(&app, Method::GET, "/logout", Some(&token), None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/login");

        let response = send(&app, Method::GET, "/user", Some(&token), None).await;
        assert_eq!(location(&response), "/login");
    }

    #[tokio::test]
    async fn login_page_sends_logged_in_users_home() {
        let (context, app) = setup().await;
        create_user(&context, "root", Role::Admin).await;
        let token = token_for(&context, "root").await;

        let response = send(&app, Method::GET, "/login", None, None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["roles"], json!(["admin", "student"]));

        let response = send(&app, Method::GET, "/login", Some(&token), None).await;
        assert_eq!(location(&response), "/admin/dashboard");

        let form = send(&app, Method::GET, "/register", Some(&token), None).await;
        assert_eq!(body_json(form).await["admin_allowed"], true);
    }

    #[tokio::test]
    async fn token_can_be_passed_in_the_query() {
        let (context, app) = setup().await;
        create_user(&context, "ada", Role::Student).await;
        let token = token_for(&context, "ada").await;

        let uri = format!("/user?token={}", token);
        let response = send(&app, Method::GET, &uri, None, None).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["username"], "ada");
    }

    #[tokio::test]
    async fn serves_api_docs() {
        let (_, app) = setup().await;

        let response = send(&app, Method::GET, "/api.json", None, None).await;
        assert_eq!(response.status(), StatusCode::OK);

        let document = body_json(response).await;
        assert!(document["paths"]["/register_event/{id}"].is_object());
    }
}
