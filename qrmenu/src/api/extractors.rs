//! Extractors that report malformed input through the standard error envelope.

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Request},
    http::{header::USER_AGENT, request::Parts},
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::{activity::RequestMeta, errors::Error, limits::client_ip};

/// `Path` whose rejection is a `VALIDATION_ERROR` envelope
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(Error))]
pub struct ValidPath<T>(pub T);

/// `Query` whose rejection is a `VALIDATION_ERROR` envelope
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(Error))]
pub struct ValidQuery<T>(pub T);

/// `Json` whose rejection is a `VALIDATION_ERROR` envelope. Validation is left to the handler.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(Error))]
pub struct JsonBody<T>(pub T);

/// JSON body that is deserialized and then checked with [`Validate`]. Every failing field is
/// reported.
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(Self(value))
    }
}

impl<S: Send + Sync> FromRequestParts<S> for RequestMeta {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ip = client_ip(&parts.headers, &parts.extensions);
        Ok(RequestMeta {
            ip: (ip != "unknown").then_some(ip),
            user_agent: parts
                .headers
                .get(USER_AGENT)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorEnvelope;
    use axum::{Router, http::StatusCode, routing::post};
    use axum_test::TestServer;
    use serde::Deserialize;
    use serde_json::json;
    use uuid::Uuid;

    #[derive(Debug, Deserialize, Validate)]
    struct Named {
        #[validate(length(min = 1, message = "Name is required"))]
        name: String,
    }

    async fn create(ValidPath(id): ValidPath<Uuid>, ValidatedJson(body): ValidatedJson<Named>) -> String {
        format!("{id}:{}", body.name)
    }

    fn app() -> TestServer {
        let app: Router = Router::new().route("/things/{id}", post(create));
        TestServer::new(app).unwrap()
    }

    #[tokio::test]
    async fn test_valid_request() {
        let id = Uuid::new_v4();
        let response = app().post(&format!("/things/{id}")).json(&json!({"name": "soup"})).await;
        response.assert_status_ok();
        response.assert_text(format!("{id}:soup"));
    }

    #[tokio::test]
    async fn test_bad_path_is_validation_error() {
        let response = app().post("/things/not-a-uuid").json(&json!({"name": "soup"})).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: ErrorEnvelope = response.json();
        assert_eq!(body.error.code, "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_malformed_json_is_validation_error() {
        let id = Uuid::new_v4();
        let response = app()
            .post(&format!("/things/{id}"))
            .content_type("application/json")
            .bytes("{not json".into())
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<ErrorEnvelope>().error.code, "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_failed_rules_list_fields() {
        let id = Uuid::new_v4();
        let response = app().post(&format!("/things/{id}")).json(&json!({"name": ""})).await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let body: ErrorEnvelope = response.json();
        assert_eq!(body.error.message, "Validation failed");
        let details = body.error.details.unwrap();
        assert_eq!(details.len(), 1);
        assert_eq!(details[0].field, "name");
        assert_eq!(details[0].message, "Name is required");
    }
}
