//! Contrats consommés par le store de session : fournisseur d'identité,
//! source de profils et fonction serveur de vérification.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::dto::{AuthResponse, Profile, UserIdentity};

/// Session émise par le fournisseur d'identité
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub expires_at: i64,
    pub user: UserIdentity,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now().timestamp()
    }
}

impl From<AuthResponse> for Session {
    fn from(auth: AuthResponse) -> Self {
        Self {
            access_token: auth.access_token,
            expires_at: auth.expires_at,
            user: auth.user,
        }
    }
}

/// Notification de changement d'état d'authentification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn,
    TokenRefreshed,
    SignedOut,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Session courante ; `None` si jamais connecté ou expirée
    async fn get_session(&self) -> Result<Option<Session>, AppError>;

    /// Flux des changements d'état, pour toute la vie de l'application
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;

    async fn sign_in_with_password(&self, phone: &str, password: &str) -> Result<Session, AppError>;

    async fn refresh_session(&self) -> Result<Session, AppError>;

    async fn sign_out(&self) -> Result<(), AppError>;
}

#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn fetch_profile(&self, user_id: Uuid) -> Result<Profile, AppError>;
}

#[async_trait]
pub trait AccountVerifier: Send + Sync {
    /// Appelle la fonction serveur ; renvoie le message de succès
    async fn verify_account(&self, user_id: Uuid, code: &str) -> Result<String, AppError>;
}
