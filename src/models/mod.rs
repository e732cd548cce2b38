// ============================================================================
// MODELS - MODULE PRINCIPAL
// ============================================================================
//
// Description:
//   Point d'entrée pour les modèles de données.
//   Chaque entité correspond à une table PostgreSQL avec SeaORM.
//
// Liste des modules:
//   - users : Identités (connexion par téléphone + mot de passe)
//   - profiles : Profils applicatifs (statut de vérification, crédits, type de compte)
//   - dto : Data Transfer Objects des requêtes/réponses API
//
// ============================================================================

pub mod users;
pub mod profiles;
pub mod dto;
