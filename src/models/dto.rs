//pour les requêtes/réponses structurées (partagées par le serveur et le client)
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::profiles::{self, AccountType, ProfileStatus};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub time: DateTime<Utc>,
}

// DTO pour la connexion
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Telefone é obrigatório."))]
    pub phone: String,
    #[validate(length(min = 1, message = "Senha é obrigatória."))]
    pub password: String,
}

/// Identité authentifiée, dérivée 1:1 de la session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: Uuid,
    pub phone: String,
    pub email: Option<String>,
}

// Réponse après login/refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub expires_at: i64,
    pub user: UserIdentity,
}

/// Vue du profil exposée aux clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub full_name: Option<String>,
    pub whatsapp_number: Option<String>,
    pub status: ProfileStatus,
    pub credits: i64,
    pub account_type: AccountType,
    pub plan: Option<String>,
    pub plan_expires_at: Option<DateTime<Utc>>,
    pub verified_at: Option<DateTime<Utc>>,
}

impl Profile {
    pub fn is_verified(&self) -> bool {
        self.status == ProfileStatus::Verified
    }
}

impl From<profiles::Model> for Profile {
    fn from(model: profiles::Model) -> Self {
        Self {
            id: model.id,
            status: model.profile_status(),
            account_type: model.account_kind(),
            full_name: model.full_name,
            whatsapp_number: model.whatsapp_number,
            credits: model.credits,
            plan: model.plan,
            plan_expires_at: model.plan_expires_at,
            verified_at: model.verified_at,
        }
    }
}

// DTO de la fonction serveur de vérification
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct VerifyAccountRequest {
    #[serde(rename = "userId", default)]
    #[validate(length(min = 1, message = "userId é obrigatório."))]
    pub user_id: String,
    #[serde(rename = "verificationCode", default)]
    #[validate(length(min = 1, message = "verificationCode é obrigatório."))]
    pub verification_code: String,
}

/// Réponse de succès générique `{ success: true, message }`
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiMessage {
    pub success: bool,
    pub message: String,
}

impl ApiMessage {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Type de média généré
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Image,
    Video,
    Audio,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            MediaKind::Image => "png",
            MediaKind::Video => "mp4",
            MediaKind::Audio => "mp3",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            MediaKind::Image => "image/png",
            MediaKind::Video => "video/mp4",
            MediaKind::Audio => "audio/mpeg",
        }
    }
}

// DTO du relais de persistance média
// urls et user_id sont optionnels pour répondre 400 avec un message clair
#[derive(Debug, Serialize, Deserialize)]
pub struct StoreMediaRequest {
    pub urls: Option<Vec<String>>,
    pub user_id: Option<String>,
    #[serde(default)]
    pub media_type: MediaKind,
}

/// Résultat par élément : URL durable, ou URL d'origine si l'élément a échoué
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayedItem {
    pub url: String,
    pub stored: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StoreMediaResponse {
    pub success: bool,
    pub urls: Vec<String>,
    pub items: Vec<RelayedItem>,
    pub message: String,
}
