// ============================================================================
// MODÈLE : USERS
// ============================================================================
//
// Description:
//   Identité authentifiée (équivalent de auth.users du fournisseur d'identité).
//   Le profil applicatif vit dans la table profiles, clé = users.id.
//
// Colonnes:
//   - id (UUID, PRIMARY KEY)
//   - phone (VARCHAR, UNIQUE, NOT NULL) - identifiant de connexion
//   - email (VARCHAR, NULL)
//   - password_hash (VARCHAR, NOT NULL) - Format: pbkdf2:sha256:iterations$salt$hash
//   - created_at (TIMESTAMPTZ)
//
// ============================================================================

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(unique)]
    pub phone: String,

    pub email: Option<String>,

    #[serde(skip_serializing)]
    pub password_hash: String,

    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::profiles::Entity")]
    Profile,
}

impl Related<super::profiles::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Profile.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
