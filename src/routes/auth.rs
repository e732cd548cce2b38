use actix_web::{post, web, HttpResponse};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use validator::Validate;

use crate::config::Config;
use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::models::dto::{AuthResponse, LoginRequest, UserIdentity};
use crate::models::users::{self, Column as UserColumn, Entity as Users};
use crate::routes::{validation_error, verification};
use crate::utils::{hashing, jwt};

fn issue_session(user: &users::Model, config: &Config) -> Result<AuthResponse, AppError> {
    let issued = jwt::generate_token(user.id, &user.phone, &config.jwt_secret, config.jwt_ttl_hours)
        .map_err(AppError::Internal)?;

    Ok(AuthResponse {
        access_token: issued.token,
        expires_at: issued.expires_at,
        user: UserIdentity {
            id: user.id,
            phone: user.phone.clone(),
            email: user.email.clone(),
        },
    })
}

/// POST /auth/login - Se connecter par téléphone + mot de passe (PUBLIC)
#[post("/login")]
pub async fn login(
    body: web::Json<LoginRequest>,
    db: web::Data<DatabaseConnection>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    body.validate().map_err(validation_error)?;

    // 1. Trouver l'utilisateur
    let user = Users::find()
        .filter(UserColumn::Phone.eq(body.phone.trim()))
        .one(db.get_ref())
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    // 2. Vérifier le mot de passe
    let is_valid = hashing::verify_password(&body.password, &user.password_hash)
        .map_err(|e| AppError::Internal(format!("Password verification error: {}", e)))?;

    if !is_valid {
        tracing::info!(phone = %body.phone, "Rejected login");
        return Err(AppError::InvalidCredentials);
    }

    // 3. Générer le JWT
    Ok(HttpResponse::Ok().json(issue_session(&user, &config)?))
}

/// POST /auth/refresh - Nouveau jeton pour la même session (PROTÉGÉE)
#[post("/refresh")]
pub async fn refresh(
    auth_user: AuthUser,
    db: web::Data<DatabaseConnection>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    // L'utilisateur a pu être supprimé depuis l'émission du jeton
    let user = Users::find_by_id(auth_user.user_id)
        .one(db.get_ref())
        .await?
        .ok_or(AppError::Unauthenticated)?;

    Ok(HttpResponse::Ok().json(issue_session(&user, &config)?))
}

pub fn auth_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .service(login)
            .service(refresh)
            .service(verification::verify_account)
            .service(verification::request_verification_code)
    );
}
