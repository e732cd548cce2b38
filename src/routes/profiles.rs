use actix_web::{get, web, HttpResponse};
use sea_orm::DatabaseConnection;

use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::models::dto::Profile;
use crate::services::profile_service::ProfileService;

/// GET /profiles/me - Profil de l'utilisateur connecté (PROTÉGÉE)
#[get("/me")]
pub async fn my_profile(
    auth_user: AuthUser,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let profile = ProfileService::find_by_user(db.get_ref(), auth_user.user_id).await?;

    Ok(HttpResponse::Ok().json(Profile::from(profile)))
}

pub fn profiles_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/profiles")
            .service(my_profile)
    );
}

#[cfg(test)]
mod tests {
    use actix_web::{test, App};
    use serde_json::Value;
    use uuid::Uuid;

    use crate::db::testing::{memory_db, seed_user};
    use crate::routes::testing::{bearer_for, configure};

    #[actix_web::test]
    async fn test_my_profile() {
        let db = memory_db().await;
        let id = seed_user(&db, "+5511900000300", "unverified", "affiliate").await;
        let app = test::init_service(App::new().configure(configure(db))).await;

        let req = test::TestRequest::get()
            .uri("/api/profiles/me")
            .insert_header(bearer_for(id, "+5511900000300"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["id"], id.to_string());
        assert_eq!(body["status"], "unverified");
        assert_eq!(body["account_type"], "affiliate");
        assert!(body.get("verification_code_hash").is_none());
    }

    #[actix_web::test]
    async fn test_missing_profile_is_404() {
        let db = memory_db().await;
        let app = test::init_service(App::new().configure(configure(db))).await;

        let req = test::TestRequest::get()
            .uri("/api/profiles/me")
            .insert_header(bearer_for(Uuid::new_v4(), "+55"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 404);
    }
}
