// ============================================================================
// MODÈLE : PROFILES
// ============================================================================
//
// Description:
//   Profil applicatif, exactement un par utilisateur (id = users.id).
//   Créé à l'inscription, jamais par ce backend ; ici on le lit et on fait
//   passer status de 'unverified' à 'verified'.
//
// Colonnes:
//   - id (UUID, PRIMARY KEY, FK vers users)
//   - full_name, whatsapp_number (VARCHAR, NULL)
//   - status (VARCHAR) - texte libre, lu comme 'unverified' | 'verified'
//   - credits (BIGINT) - modifié par les générations/achats, pas ici
//   - account_type (VARCHAR) - 'user' | 'affiliate' | 'admin'
//   - plan, plan_expires_at
//   - verification_code_hash (VARCHAR, NULL) - SHA-256 hex du code OTP
//   - verification_expires_at (TIMESTAMPTZ, NULL)
//   - verification_attempts (INTEGER, DEFAULT 0)
//   - verified_at (TIMESTAMPTZ, NULL)
//
// Points d'attention:
//   - Pas de verrou ni de version : la vérification ne touche que status et
//     les colonnes verification_*, les crédits sont écrits ailleurs
//   - Le passage à 'verified' est une mise à jour conditionnelle
//     (status <> 'verified'), voir services::verification_service
//
// ============================================================================

use std::fmt;

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "profiles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub full_name: Option<String>,

    pub whatsapp_number: Option<String>,

    pub status: String,

    pub credits: i64,

    pub account_type: String,

    pub plan: Option<String>,

    pub plan_expires_at: Option<DateTimeUtc>,

    #[serde(skip_serializing)]
    pub verification_code_hash: Option<String>,

    pub verification_expires_at: Option<DateTimeUtc>,

    pub verification_attempts: i32,

    pub verified_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::Id",
        to = "super::users::Column::Id"
    )]
    User,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn profile_status(&self) -> ProfileStatus {
        ProfileStatus::from_column(&self.status)
    }

    pub fn account_kind(&self) -> AccountType {
        AccountType::from_column(&self.account_type)
    }
}

/// Statut de vérification du profil
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileStatus {
    Unverified,
    Verified,
}

impl ProfileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileStatus::Unverified => "unverified",
            ProfileStatus::Verified => "verified",
        }
    }

    /// La colonne est du texte libre : tout ce qui n'est pas 'verified'
    /// est traité comme non vérifié.
    pub fn from_column(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("verified") {
            ProfileStatus::Verified
        } else {
            ProfileStatus::Unverified
        }
    }
}

impl fmt::Display for ProfileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    User,
    Affiliate,
    Admin,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::User => "user",
            AccountType::Affiliate => "affiliate",
            AccountType::Admin => "admin",
        }
    }

    pub fn from_column(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "admin" => AccountType::Admin,
            "affiliate" => AccountType::Affiliate,
            _ => AccountType::User,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_is_two_state() {
        assert_eq!(ProfileStatus::from_column("verified"), ProfileStatus::Verified);
        assert_eq!(ProfileStatus::from_column("VERIFIED "), ProfileStatus::Verified);
        assert_eq!(ProfileStatus::from_column("unverified"), ProfileStatus::Unverified);
        assert_eq!(ProfileStatus::from_column("pending"), ProfileStatus::Unverified);
        assert_eq!(ProfileStatus::from_column(""), ProfileStatus::Unverified);
    }

    #[test]
    fn test_account_type_defaults_to_user() {
        assert_eq!(AccountType::from_column("admin"), AccountType::Admin);
        assert_eq!(AccountType::from_column("affiliate"), AccountType::Affiliate);
        assert_eq!(AccountType::from_column("staff"), AccountType::User);
    }
}
