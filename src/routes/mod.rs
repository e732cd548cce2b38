pub mod auth;
pub mod health;
pub mod media;
pub mod profiles;
pub mod session;
pub mod verification;

use actix_web::web;
use validator::ValidationErrors;

use crate::error::AppError;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    // Corps JSON/query invalides : même format d'erreur que le reste de l'API
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        AppError::MalformedRequest(format!("Requisição inválida: {}", err)).into()
    }))
    .app_data(web::QueryConfig::default().error_handler(|err, _req| {
        AppError::MalformedRequest(format!("Parâmetros inválidos: {}", err)).into()
    }));

    cfg.service(
        web::scope("/api")
            .service(health::health_check)
            .configure(auth::auth_routes)
            .configure(profiles::profiles_routes)
            .configure(media::media_routes)
            .configure(session::session_routes)
    );
}

/// Premier message d'erreur de validation, pour la réponse 400
pub(crate) fn validation_error(errors: ValidationErrors) -> AppError {
    let message = errors
        .field_errors()
        .values()
        .flat_map(|field_errors| field_errors.iter())
        .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| "Requisição inválida.".to_string());

    AppError::MalformedRequest(message)
}
