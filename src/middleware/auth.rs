use actix_web::{dev::Payload, web, Error, FromRequest, HttpRequest};
use futures::future::{ready, Ready};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::error::AppError;
use crate::utils::jwt;

/// Structure qui contient les infos de l'utilisateur authentifié
/// Utilisée comme extracteur dans les routes protégées
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub phone: String,
}

impl AuthUser {
    fn from_request_parts(req: &HttpRequest) -> Result<Self, AppError> {
        // 1. Extraire le header Authorization
        let auth_str = req
            .headers()
            .get("Authorization")
            .and_then(|header| header.to_str().ok())
            .ok_or(AppError::Unauthenticated)?;

        // 2. Extraire le token (format: "Bearer <token>")
        let token = auth_str
            .strip_prefix("Bearer ")
            .ok_or(AppError::Unauthenticated)?;

        // 3. Vérifier le token JWT avec le secret de la configuration
        let config = req
            .app_data::<web::Data<Config>>()
            .ok_or_else(|| AppError::Internal("Config missing from app data".to_string()))?;

        let claims = jwt::verify_token(token, &config.jwt_secret).map_err(|e| {
            tracing::debug!(error = %e, "Rejected bearer token");
            AppError::Unauthenticated
        })?;

        Ok(AuthUser {
            user_id: claims.sub,
            phone: claims.phone,
        })
    }
}

/// Implémentation de FromRequest pour AuthUser
/// Cela permet à Actix-Web d'extraire automatiquement AuthUser des requêtes
impl FromRequest for AuthUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Self::from_request_parts(req).map_err(Error::from))
    }
}
