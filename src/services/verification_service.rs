// ============================================================================
// SERVICE : VÉRIFICATION DE COMPTE
// ============================================================================
//
// Workflow (schéma "otp"):
//   1. User connecté appelle POST /api/auth/verification-code
//   2. Backend génère un code à 6 chiffres, stocke son SHA-256 + expiration
//   3. Backend remet le code au CodeSender (webhook n8n → WhatsApp)
//   4. User saisit le code sur /verify
//   5. POST /api/auth/verify-account { userId, verificationCode }
//   6. Backend vérifie: code vivant, pas expiré, essais < 5, empreinte égale
//   7. Backend met status = 'verified', efface le code, note verified_at
//
// Schéma "identity" (comportement historique):
//   Le code attendu est l'id de l'utilisateur. Ce n'est PAS une vérification
//   réelle, n'importe qui connaissant l'id peut vérifier le compte.
//
// Points d'attention:
//   - Le passage à 'verified' est conditionnel (status <> 'verified') :
//     deux vérifications concurrentes ne peuvent pas réussir toutes les deux
//   - Un mauvais code ne modifie le profil qu'en schéma otp (compteur)
//
// ============================================================================

use chrono::{Duration, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::*;
use uuid::Uuid;

use crate::config::VerificationScheme;
use crate::error::AppError;
use crate::models::profiles::{self, ProfileStatus};
use crate::services::code_sender::CodeSender;
use crate::services::profile_service::ProfileService;
use crate::utils::hashing;

pub const MAX_ATTEMPTS: i32 = 5;

pub struct VerificationService;

impl VerificationService {
    /// Valide le code et fait passer le profil à 'verified'
    pub async fn verify_account(
        db: &DatabaseConnection,
        scheme: VerificationScheme,
        user_id: &str,
        code: &str,
    ) -> Result<profiles::Model, AppError> {
        // 1. Le profil doit exister et ne pas être déjà vérifié
        let profile = ProfileService::find_by_raw_id(db, user_id).await?;

        if profile.profile_status() == ProfileStatus::Verified {
            return Err(AppError::AlreadyVerified);
        }

        // 2. Comparer le code selon le schéma
        match scheme {
            VerificationScheme::Identity => {
                if Uuid::parse_str(code.trim()).ok() != Some(profile.id) {
                    return Err(AppError::InvalidCode);
                }
            }
            VerificationScheme::Otp => Self::check_otp(db, &profile, code).await?,
        }

        // 3. Mise à jour conditionnelle : status + nettoyage des artefacts
        Self::mark_verified(db, profile.id).await?;

        tracing::info!(user_id = %profile.id, "✅ Account verified");

        ProfileService::find_by_user(db, profile.id).await
    }

    /// Passe le profil à 'verified' seulement s'il ne l'est pas déjà
    async fn mark_verified(db: &DatabaseConnection, user_id: Uuid) -> Result<(), AppError> {
        let result = profiles::Entity::update_many()
            .set(profiles::ActiveModel {
                status: Set(ProfileStatus::Verified.as_str().to_string()),
                verification_code_hash: Set(None),
                verification_expires_at: Set(None),
                verification_attempts: Set(0),
                verified_at: Set(Some(Utc::now())),
                ..Default::default()
            })
            .filter(profiles::Column::Id.eq(user_id))
            .filter(profiles::Column::Status.ne(ProfileStatus::Verified.as_str()))
            .exec(db)
            .await?;

        if result.rows_affected == 0 {
            // Une autre requête a vérifié le compte entre-temps
            return Err(AppError::AlreadyVerified);
        }

        Ok(())
    }

    /// Émet un nouveau code (schéma otp) et le remet au CodeSender
    pub async fn issue_code(
        db: &DatabaseConnection,
        sender: &dyn CodeSender,
        user_id: Uuid,
        ttl_minutes: i64,
    ) -> Result<(), AppError> {
        let profile = ProfileService::find_by_user(db, user_id).await?;

        if profile.profile_status() == ProfileStatus::Verified {
            return Err(AppError::AlreadyVerified);
        }

        // Destinataire: le WhatsApp du profil, sinon le téléphone de connexion
        let phone = match profile.whatsapp_number.clone().filter(|p| !p.trim().is_empty()) {
            Some(phone) => phone,
            None => {
                crate::models::users::Entity::find_by_id(user_id)
                    .one(db)
                    .await?
                    .map(|user| user.phone)
                    .ok_or(AppError::ProfileNotFound)?
            }
        };

        let code = hashing::generate_verification_code();

        let mut active_model: profiles::ActiveModel = profile.into();
        active_model.verification_code_hash = Set(Some(hashing::hash_code(&code)));
        active_model.verification_expires_at = Set(Some(Utc::now() + Duration::minutes(ttl_minutes)));
        active_model.verification_attempts = Set(0);
        active_model.update(db).await?;

        sender.send_code(&phone, &code).await?;

        tracing::info!(user_id = %user_id, "🔑 Verification code issued");
        Ok(())
    }

    async fn check_otp(
        db: &DatabaseConnection,
        profile: &profiles::Model,
        code: &str,
    ) -> Result<(), AppError> {
        let (stored_hash, expires_at) =
            match (&profile.verification_code_hash, profile.verification_expires_at) {
                (Some(hash), Some(expires_at)) => (hash, expires_at),
                _ => return Err(AppError::VerificationExpired),
            };

        if expires_at <= Utc::now() {
            return Err(AppError::VerificationExpired);
        }

        if profile.verification_attempts >= MAX_ATTEMPTS {
            return Err(AppError::TooManyAttempts);
        }

        if !hashing::code_matches(code, stored_hash) {
            profiles::Entity::update_many()
                .col_expr(
                    profiles::Column::VerificationAttempts,
                    Expr::col(profiles::Column::VerificationAttempts).add(1),
                )
                .filter(profiles::Column::Id.eq(profile.id))
                .exec(db)
                .await?;

            tracing::warn!(
                user_id = %profile.id,
                attempts = profile.verification_attempts + 1,
                "Invalid verification code"
            );
            return Err(AppError::InvalidCode);
        }

        Ok(())
    }
}
