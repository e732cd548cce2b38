use actix_web::{post, web, HttpResponse};
use sea_orm::DatabaseConnection;
use validator::Validate;

use crate::config::{Config, VerificationScheme};
use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::models::dto::{ApiMessage, VerifyAccountRequest};
use crate::routes::validation_error;
use crate::services::code_sender::CodeSender;
use crate::services::verification_service::VerificationService;

/// POST /auth/verify-account - Fonction serveur de vérification (PUBLIC)
///
/// Succès: 200 `{success:true, message}` ; code invalide, compte déjà
/// vérifié ou utilisateur inconnu: 400 `{success:false, error}`.
#[post("/verify-account")]
pub async fn verify_account(
    body: web::Json<VerifyAccountRequest>,
    db: web::Data<DatabaseConnection>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    body.validate().map_err(validation_error)?;

    VerificationService::verify_account(
        db.get_ref(),
        config.verification_scheme,
        &body.user_id,
        &body.verification_code,
    )
    .await
    .map_err(|e| match e {
        // cette fonction ne répond que 200, 400 ou 500
        AppError::ProfileNotFound => AppError::MalformedRequest(AppError::ProfileNotFound.to_string()),
        other => other,
    })?;

    Ok(HttpResponse::Ok().json(ApiMessage::ok("Conta verificada com sucesso!")))
}

/// POST /auth/verification-code - Envoie un code à l'utilisateur (PROTÉGÉE)
#[post("/verification-code")]
pub async fn request_verification_code(
    auth_user: AuthUser,
    db: web::Data<DatabaseConnection>,
    config: web::Data<Config>,
    sender: web::Data<dyn CodeSender>,
) -> Result<HttpResponse, AppError> {
    if config.verification_scheme != VerificationScheme::Otp {
        return Err(AppError::MalformedRequest(
            "Envio de código não está habilitado.".to_string(),
        ));
    }

    VerificationService::issue_code(
        db.get_ref(),
        sender.get_ref(),
        auth_user.user_id,
        config.verification_code_ttl_minutes,
    )
    .await?;

    Ok(HttpResponse::Ok().json(ApiMessage::ok("Código de verificação enviado.")))
}
