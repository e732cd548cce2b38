// ============================================================================
// SESSION - CÔTÉ CLIENT
// ============================================================================
//
// Description:
//   Cœur de session consommé par l'interface : store de session, flux de
//   vérification et client HTTP du backend. La décision d'accès aux routes
//   vit dans crate::guard et lit les SessionSnapshot publiés ici.
//
// Liste des modules:
//   - identity : contrats (IdentityProvider, ProfileSource, AccountVerifier)
//   - context : SessionContext, le store unique {session, user, profile, loading}
//   - verification : VerificationFlow (soumission du code + rafraîchissement)
//   - api_client : implémentation reqwest des contrats contre /api
//
// ============================================================================

pub mod api_client;
pub mod context;
pub mod identity;
pub mod verification;

pub use api_client::ApiClient;
pub use context::{ProfileState, RetryPolicy, SessionContext, SessionSnapshot};
pub use identity::{AccountVerifier, AuthEvent, IdentityProvider, ProfileSource, Session};
pub use verification::VerificationFlow;
