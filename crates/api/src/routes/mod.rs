// routes/mod.rs - API routes, mounted under /api

use crate::error::ApiError;
use crate::utils::MessageResponse;
use actix_web::{get, web, HttpResponse};

pub mod auth;
pub mod builds;
pub mod costs;
pub mod imagekit;
pub mod steps;

#[get("/health")]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(MessageResponse::ok("OK"))
}

// Extractor failures answer in the same {success, message} shape as handler errors
pub fn extractor_configs() -> (web::JsonConfig, web::PathConfig, web::QueryConfig) {
    let json = web::JsonConfig::default()
        .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into());
    let path = web::PathConfig::default()
        .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into());
    let query = web::QueryConfig::default()
        .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into());

    (json, path, query)
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(health)
            .service(
                web::scope("/auth")
                    .service(auth::register)
                    .service(auth::login)
                    .service(auth::refresh)
                    .service(auth::me)
                    .service(auth::verify_email)
                    .service(auth::resend_verification_email)
                    .service(auth::send_reset_password_email)
                    .service(auth::verify_reset_password_otp)
                    .service(auth::reset_password),
            )
            .service(
                web::scope("/builds")
                    .service(builds::list_builds)
                    .service(builds::create_build)
                    .service(builds::get_build)
                    .service(builds::update_build)
                    .service(builds::delete_build)
                    .service(builds::update_build_status)
                    .service(builds::update_current_step)
                    .service(steps::list_steps)
                    .service(steps::create_step)
                    .service(steps::get_step)
                    .service(steps::update_step)
                    .service(steps::delete_step),
            )
            .service(web::scope("/costs").service(costs::overview))
            .service(web::scope("/imagekit").service(imagekit::upload_auth)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthSettings;
    use actix_web::{http::StatusCode, post, test, App};

    fn auth_settings() -> web::Data<AuthSettings> {
        web::Data::new(AuthSettings {
            jwt_secret: "route-test-secret".to_string(),
            access_token_ttl: 60,
            refresh_token_ttl: 120,
        })
    }

    #[actix_web::test]
    async fn test_health() {
        let app = test::init_service(App::new().configure(configure)).await;
        let req = test::TestRequest::get().uri("/api/health").to_request();
        let body: MessageResponse = test::call_and_read_body_json(&app, req).await;

        assert!(body.success);
    }

    #[actix_web::test]
    async fn test_protected_routes_require_a_bearer_token() {
        let app = test::init_service(
            App::new()
                .app_data(auth_settings())
                .configure(configure),
        )
        .await;

        for uri in ["/api/builds", "/api/costs/overview", "/api/imagekit/auth", "/api/auth/me"] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let res = test::call_service(&app, req).await;
            assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "{}", uri);
        }
    }

    #[post("/echo")]
    async fn echo(body: web::Json<crate::models::EmailRequest>) -> HttpResponse {
        HttpResponse::Ok().json(MessageResponse::ok(body.email.clone()))
    }

    #[actix_web::test]
    async fn test_malformed_json_is_a_400_with_message_body() {
        let (json, path, query) = extractor_configs();
        let app = test::init_service(
            App::new()
                .app_data(json)
                .app_data(path)
                .app_data(query)
                .service(echo),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/echo")
            .insert_header(("content-type", "application/json"))
            .set_payload("{not json")
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let body: MessageResponse = test::read_body_json(res).await;
        assert!(!body.success);
    }

    #[actix_web::test]
    async fn test_missing_field_is_a_400() {
        let (json, _, _) = extractor_configs();
        let app = test::init_service(App::new().app_data(json).service(echo)).await;

        let req = test::TestRequest::post()
            .uri("/echo")
            .set_json(serde_json::json!({ "address": "12 Elm St" }))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
