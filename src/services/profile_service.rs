use sea_orm::*;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::profiles;

pub struct ProfileService;

impl ProfileService {
    /// Lit le profil d'un utilisateur (jamais créé ici)
    pub async fn find_by_user(
        db: &DatabaseConnection,
        user_id: Uuid,
    ) -> Result<profiles::Model, AppError> {
        profiles::Entity::find_by_id(user_id)
            .one(db)
            .await?
            .ok_or(AppError::ProfileNotFound)
    }

    /// Variante pour un id reçu en texte : un id non UUID n'a pas de profil
    pub async fn find_by_raw_id(
        db: &DatabaseConnection,
        raw_user_id: &str,
    ) -> Result<profiles::Model, AppError> {
        let user_id = Uuid::parse_str(raw_user_id.trim()).map_err(|_| AppError::ProfileNotFound)?;
        Self::find_by_user(db, user_id).await
    }
}
