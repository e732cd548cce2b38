use std::sync::Arc;

use crate::error::AppError;
use crate::session::context::SessionContext;
use crate::session::identity::AccountVerifier;

/// Flux de vérification utilisé par la page /verify et par le prompt in-app.
///
/// Les deux passent par la fonction serveur ; le client n'écrit jamais le statut.
pub struct VerificationFlow {
    context: Arc<SessionContext>,
    verifier: Arc<dyn AccountVerifier>,
}

impl VerificationFlow {
    pub fn new(context: Arc<SessionContext>, verifier: Arc<dyn AccountVerifier>) -> Self {
        Self { context, verifier }
    }

    /// Soumet le code de l'utilisateur courant.
    ///
    /// En cas de succès, rafraîchit le jeton et le profil pour que le garde de
    /// routes voie le nouveau statut sans rechargement. Aucune erreur n'est
    /// réessayée automatiquement.
    pub async fn submit(&self, code: &str) -> Result<String, AppError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(AppError::MalformedRequest(
                "Informe o código de verificação.".to_string(),
            ));
        }

        let user = self
            .context
            .snapshot()
            .user
            .ok_or(AppError::Unauthenticated)?;

        let message = self.verifier.verify_account(user.id, code).await?;

        if let Err(e) = self.context.identity().refresh_session().await {
            tracing::warn!(error = %e, "Session refresh after verification failed");
        }
        self.context.refetch_profile().await;

        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use uuid::Uuid;

    use super::*;
    use crate::guard::{Admission, RouteGuard, DASHBOARD_PATH, VERIFY_PATH};
    use crate::session::context::RetryPolicy;
    use crate::session::testing::{profile_for, session_for, FakeIdentity, FakeProfiles};

    /// Vérificateur qui applique le schéma "identity" sur la source de profils
    struct FakeVerifier {
        profiles: Arc<FakeProfiles>,
        submitted: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl AccountVerifier for FakeVerifier {
        async fn verify_account(&self, user_id: Uuid, code: &str) -> Result<String, AppError> {
            self.submitted.lock().unwrap().push(code.to_string());
            if code != user_id.to_string() {
                return Err(AppError::InvalidCode);
            }
            self.profiles.insert(profile_for(user_id, "verified"));
            Ok("Conta verificada com sucesso!".to_string())
        }
    }

    async fn setup(
        signed_in: bool,
    ) -> (VerificationFlow, Arc<SessionContext>, Arc<FakeIdentity>, Uuid) {
        let user_id = Uuid::new_v4();
        let identity = Arc::new(if signed_in {
            FakeIdentity::with_session(session_for(user_id))
        } else {
            FakeIdentity::default()
        });
        let profiles = Arc::new(FakeProfiles::default());
        profiles.insert(profile_for(user_id, "unverified"));

        let retry = RetryPolicy {
            max_attempts: 1,
            base_delay: Duration::from_millis(1),
        };
        let context = SessionContext::start(identity.clone(), profiles.clone(), retry).await;
        let verifier = Arc::new(FakeVerifier {
            profiles,
            submitted: Mutex::new(Vec::new()),
        });

        (VerificationFlow::new(context.clone(), verifier), context, identity, user_id)
    }

    #[tokio::test]
    async fn test_success_refreshes_profile_and_admits() {
        let (flow, context, identity, user_id) = setup(true).await;
        let guard = RouteGuard::member();

        assert_eq!(
            guard.evaluate(&context.snapshot(), DASHBOARD_PATH),
            Admission::Redirect { to: VERIFY_PATH }
        );

        let message = flow.submit(&user_id.to_string()).await.unwrap();
        assert_eq!(message, "Conta verificada com sucesso!");
        assert_eq!(identity.refreshes(), 1);

        // Le profil est rafraîchi avant le retour de submit
        let snapshot = context.snapshot();
        assert!(snapshot.profile().unwrap().is_verified());
        assert_eq!(guard.evaluate(&snapshot, DASHBOARD_PATH), Admission::Admit);
        assert_eq!(
            guard.evaluate(&snapshot, VERIFY_PATH),
            Admission::Redirect { to: DASHBOARD_PATH }
        );
    }

    #[tokio::test]
    async fn test_invalid_code_leaves_profile_unverified() {
        let (flow, context, identity, _) = setup(true).await;

        let result = flow.submit("999999").await;
        assert!(matches!(result, Err(AppError::InvalidCode)));
        assert_eq!(identity.refreshes(), 0);
        assert!(!context.snapshot().profile().unwrap().is_verified());

        // L'utilisateur peut réessayer immédiatement
        assert!(matches!(flow.submit("999998").await, Err(AppError::InvalidCode)));
    }

    #[tokio::test]
    async fn test_requires_signed_in_user() {
        let (flow, _, _, user_id) = setup(false).await;

        let result = flow.submit(&user_id.to_string()).await;
        assert!(matches!(result, Err(AppError::Unauthenticated)));
    }

    #[tokio::test]
    async fn test_blank_code_is_rejected_locally() {
        let (flow, _, _, _) = setup(true).await;

        assert!(matches!(flow.submit("   ").await, Err(AppError::MalformedRequest(_))));
    }
}
