// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{require_session, session::SESSION_COOKIE_NAME},
    error::{panic_response, ErrorEnvelope},
    models::{Contact, User},
    state::AppState,
};

pub mod contacts;
pub mod health;
pub mod sign_in;

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/contacts", get(contacts::list_contacts))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_session));

    Router::new()
        .route("/signIn", post(sign_in::sign_in))
        .route("/ping", get(health::ping))
        .merge(protected)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(panic_response))
}

#[derive(OpenApi)]
#[openapi(
    paths(sign_in::sign_in, contacts::list_contacts, health::ping),
    components(schemas(User, Contact, ErrorEnvelope, health::PingResponse)),
    modifiers(&SecuritySchemes),
    tags(
        (name = "Session", description = "Sign-in and session cookies"),
        (name = "Contacts", description = "Emergency contacts of the session user"),
        (name = "Health", description = "Liveness")
    )
)]
struct ApiDoc;

struct SecuritySchemes;

impl Modify for SecuritySchemes {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let Some(components) = openapi.components.as_mut() else {
            return;
        };
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
        components.add_security_scheme(
            "session_cookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(SESSION_COOKIE_NAME))),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_state;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null))
    }

    #[tokio::test]
    async fn ping_is_public() {
        let (status, body) = send(
            router(test_state("http://127.0.0.1:1")),
            Request::get("/ping").body(Body::empty()).unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn contacts_without_session_is_401() {
        let (status, body) = send(
            router(test_state("http://127.0.0.1:1")),
            Request::get("/contacts").body(Body::empty()).unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["Code"], 401);
        assert_eq!(body["Message"], "Unauthorized");
    }

    #[tokio::test]
    async fn sign_in_without_token_is_401() {
        let (status, body) = send(
            router(test_state("http://127.0.0.1:1")),
            Request::post("/signIn")
                .header("authorization", "Basic Zm9vOmJhcg==")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["Code"], 401);
    }

    #[test]
    fn openapi_documents_routes_and_schemes() {
        let doc = ApiDoc::openapi();

        assert!(doc.paths.paths.contains_key("/signIn"));
        assert!(doc.paths.paths.contains_key("/contacts"));
        assert!(doc.paths.paths.contains_key("/ping"));
        let components = doc.components.unwrap();
        assert!(components.security_schemes.contains_key("bearer"));
        assert!(components.security_schemes.contains_key("session_cookie"));
    }
}
