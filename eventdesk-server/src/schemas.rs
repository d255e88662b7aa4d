use axum::{
    async_trait,
    extract::{FromRequest, Request},
    http::StatusCode,
    Json,
};
use eventdesk_ledger::{EventFields, PrimaryKey, Role};
use serde::{de::DeserializeOwned, Deserialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginSchema {
    #[validate(length(max = 128))]
    pub username: String,
    #[validate(length(max = 64))]
    pub password: String,
    /// The role the user means to log in as
    #[schema(value_type = Option<String>, example = "student")]
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterSchema {
    #[validate(length(max = 128))]
    pub username: String,
    #[validate(length(max = 64))]
    pub password: String,
    #[validate(email, length(max = 254))]
    #[serde(default)]
    pub email: Option<String>,
    /// Only honored when an admin creates the account
    #[serde(default)]
    pub admin: bool,
}

/// The event form. Seats and fee may be sent as numbers or as text
#[derive(Debug, ToSchema, Validate, Deserialize)]
pub struct EventSchema {
    #[validate(length(max = 150))]
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[schema(example = "2025-03-01T10:00")]
    #[serde(default)]
    pub date: String,
    #[validate(length(max = 150))]
    #[serde(default)]
    pub location: String,
    #[schema(value_type = Option<i64>)]
    #[serde(default)]
    pub max_seats: Option<FormValue>,
    #[schema(value_type = Option<f64>)]
    #[serde(default)]
    pub registration_fee: Option<FormValue>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum FormValue {
    Number(serde_json::Number),
    Text(String),
}

impl FormValue {
    fn into_text(self) -> String {
        match self {
            Self::Number(number) => number.to_string(),
            Self::Text(text) => text,
        }
    }
}

impl From<EventSchema> for EventFields {
    fn from(value: EventSchema) -> Self {
        EventFields {
            name: value.name,
            description: value.description,
            date: value.date,
            location: value.location,
            max_seats: value.max_seats.map(FormValue::into_text),
            registration_fee: value.registration_fee.map(FormValue::into_text),
        }
    }
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
pub struct MessageSchema {
    #[validate(length(max = 2000))]
    #[serde(default)]
    pub content: String,
    /// Who an admin is replying to, ignored for students
    #[serde(default)]
    pub student_id: Option<PrimaryKey>,
}

pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let extracted_json: Json<T> = Json::from_request(req, state)
            .await
            .map_err(|_| (StatusCode::BAD_REQUEST, "JSON parse failed"))?;

        extracted_json
            .0
            .validate()
            .map_err(|_| (StatusCode::BAD_REQUEST, "Request body is invalid"))?;

        Ok(Self(extracted_json.0))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn event_form_accepts_numbers_and_text() {
        let schema: EventSchema = serde_json::from_value(serde_json::json!({
            "name": "Hack Day",
            "description": "Build things",
            "date": "2025-03-01T10:00",
            "location": "Lab 1",
            "max_seats": 40,
            "registration_fee": "12.5",
        }))
        .unwrap();

        let fields = EventFields::from(schema);
        assert_eq!(fields.max_seats.as_deref(), Some("40"));
        assert_eq!(fields.registration_fee.as_deref(), Some("12.5"));

        let new_event = fields.validate(100).unwrap();
        assert_eq!(new_event.max_seats, 40);
        assert_eq!(new_event.registration_fee, 12.5);
    }

    #[test]
    fn login_role_is_optional() {
        let schema: LoginSchema = serde_json::from_value(serde_json::json!({
            "username": "ada",
            "password": "lovelace",
        }))
        .unwrap();
        assert_eq!(schema.role, None);

        let schema: LoginSchema = serde_json::from_value(serde_json::json!({
            "username": "ada",
            "password": "lovelace",
            "role": "admin",
        }))
        .unwrap();
        assert_eq!(schema.role, Some(Role::Admin));
    }

    #[test]
    fn rejects_malformed_email() {
        let schema = RegisterSchema {
            username: "ada".to_string(),
            password: "lovelace".to_string(),
            email: Some("not an email".to_string()),
            admin: false,
        };

        assert!(schema.validate().is_err());
    }
}
