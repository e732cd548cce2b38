use actix_web::{get, web, HttpResponse};
use sea_orm::DatabaseConnection;
use serde::Deserialize;

use crate::error::AppError;
use crate::guard::{GuardKind, RouteGuard};
use crate::middleware::AuthUser;
use crate::services::profile_service::ProfileService;
use crate::session::ProfileState;

#[derive(Debug, Deserialize)]
pub struct AdmissionQuery {
    pub path: String,
    pub guard: Option<GuardKind>,
}

/// GET /session/admission?path=/dashboard - Décision du garde pour l'appelant
///
/// Le jeton est optionnel : sans jeton valide la décision est une redirection
/// vers /login.
#[get("/admission")]
pub async fn admission(
    auth_user: Option<AuthUser>,
    query: web::Query<AdmissionQuery>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let guard = query
        .guard
        .map(RouteGuard::new)
        .unwrap_or_else(|| RouteGuard::for_path(&query.path));

    let profile = match &auth_user {
        None => ProfileState::NotLoaded,
        Some(user) => match ProfileService::find_by_user(db.get_ref(), user.user_id).await {
            Ok(profile) => ProfileState::Loaded(profile.into()),
            Err(AppError::ProfileNotFound) => ProfileState::Failed(AppError::ProfileNotFound.to_string()),
            Err(e) => return Err(e),
        },
    };

    let decision = guard.decide(false, auth_user.is_some(), &profile, &query.path);

    Ok(HttpResponse::Ok().json(decision))
}

pub fn session_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/session")
            .service(admission)
    );
}

#[cfg(test)]
mod tests {
    use actix_web::{test, App};
    use serde_json::{json, Value};
    use uuid::Uuid;

    use crate::db::testing::{memory_db, seed_user};
    use crate::routes::testing::{bearer_for, configure};

    fn admission_request(uri: &str, bearer: Option<(&'static str, String)>) -> test::TestRequest {
        let req = test::TestRequest::get().uri(uri);
        match bearer {
            Some(header) => req.insert_header(header),
            None => req,
        }
    }

    #[actix_web::test]
    async fn test_anonymous_is_sent_to_login() {
        let db = memory_db().await;
        let app = test::init_service(App::new().configure(configure(db))).await;

        let body: Value = test::call_and_read_body_json(&app, admission_request("/api/session/admission?path=/dashboard", None).to_request()).await;
        assert_eq!(body, json!({ "decision": "redirect", "to": "/login" }));
    }

    #[actix_web::test]
    async fn test_unverified_and_verified_users() {
        let db = memory_db().await;
        let unverified = seed_user(&db, "+5511900000400", "unverified", "user").await;
        let verified = seed_user(&db, "+5511900000401", "verified", "user").await;
        let app = test::init_service(App::new().configure(configure(db))).await;

        let body: Value = test::call_and_read_body_json(&app, admission_request("/api/session/admission?path=/dashboard", Some(bearer_for(unverified, "+5511900000400"))).to_request()).await;
        assert_eq!(body, json!({ "decision": "redirect", "to": "/verify" }));

        let body: Value = test::call_and_read_body_json(&app, admission_request("/api/session/admission?path=/verify", Some(bearer_for(unverified, "+5511900000400"))).to_request()).await;
        assert_eq!(body, json!({ "decision": "admit" }));

        let body: Value = test::call_and_read_body_json(&app, admission_request("/api/session/admission?path=/verify", Some(bearer_for(verified, "+5511900000401"))).to_request()).await;
        assert_eq!(body, json!({ "decision": "redirect", "to": "/dashboard" }));

        let body: Value = test::call_and_read_body_json(&app, admission_request("/api/session/admission?path=/dashboard", Some(bearer_for(verified, "+5511900000401"))).to_request()).await;
        assert_eq!(body, json!({ "decision": "admit" }));

        // le préfixe /admin choisit la garde admin
        let body: Value = test::call_and_read_body_json(&app, admission_request("/api/session/admission?path=/admin", Some(bearer_for(verified, "+5511900000401"))).to_request()).await;
        assert_eq!(body, json!({ "decision": "redirect", "to": "/dashboard" }));
    }

    #[actix_web::test]
    async fn test_missing_profile_is_unavailable() {
        let db = memory_db().await;
        let app = test::init_service(App::new().configure(configure(db))).await;

        let body: Value = test::call_and_read_body_json(&app, admission_request("/api/session/admission?path=/dashboard", Some(bearer_for(Uuid::new_v4(), "+55"))).to_request()).await;
        assert_eq!(body, json!({ "decision": "profile_unavailable" }));
    }

    #[actix_web::test]
    async fn test_path_is_required() {
        let db = memory_db().await;
        let app = test::init_service(App::new().configure(configure(db))).await;

        let req = test::TestRequest::get().uri("/api/session/admission").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
    }
}
