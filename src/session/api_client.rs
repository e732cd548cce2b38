// Client HTTP du backend : fournisseur d'identité, source de profils et
// appels aux fonctions serveur (vérification, relais média).

use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::dto::{
    ApiMessage, AuthResponse, LoginRequest, Profile, StoreMediaRequest, StoreMediaResponse,
};
use crate::session::identity::{AccountVerifier, AuthEvent, IdentityProvider, ProfileSource, Session};

const EVENT_CAPACITY: usize = 16;

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: RwLock<Option<Session>>,
    events: broadcast::Sender<AuthEvent>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, AppError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session: RwLock::new(None),
            events,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn current_session(&self) -> Option<Session> {
        self.session
            .read()
            .ok()
            .and_then(|session| session.clone())
            .filter(|session| !session.is_expired())
    }

    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, AppError> {
        let session = self.current_session().ok_or(AppError::Unauthenticated)?;
        Ok(request.bearer_auth(session.access_token))
    }

    fn store_session(&self, session: Option<Session>, event: AuthEvent) {
        if let Ok(mut current) = self.session.write() {
            *current = session;
        }
        // Pas d'abonné : rien à notifier
        let _ = self.events.send(event);
    }

    /// Demande l'envoi d'un code de vérification (schéma otp)
    pub async fn request_verification_code(&self) -> Result<String, AppError> {
        let request = self.authorized(self.http.post(self.url("/api/auth/verification-code")))?;
        let message: ApiMessage = read_json(request.send().await?).await?;
        Ok(message.message)
    }

    /// Appelle le relais de persistance média
    pub async fn store_generated_media(
        &self,
        request: &StoreMediaRequest,
    ) -> Result<StoreMediaResponse, AppError> {
        let response = self
            .http
            .post(self.url("/api/media/store-generated-media"))
            .json(request)
            .send()
            .await?;
        read_json(response).await
    }
}

/// Décode une réponse ; `{success:false, error}` devient AppError::Rejected
async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, AppError> {
    let status = response.status();

    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let message = response
        .json::<Value>()
        .await
        .ok()
        .and_then(|body| body.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| status.to_string());

    Err(AppError::Rejected {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl IdentityProvider for ApiClient {
    async fn get_session(&self) -> Result<Option<Session>, AppError> {
        Ok(self.current_session())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    async fn sign_in_with_password(&self, phone: &str, password: &str) -> Result<Session, AppError> {
        let response = self
            .http
            .post(self.url("/api/auth/login"))
            .json(&LoginRequest {
                phone: phone.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;

        let session: Session = read_json::<AuthResponse>(response).await?.into();
        self.store_session(Some(session.clone()), AuthEvent::SignedIn);
        Ok(session)
    }

    async fn refresh_session(&self) -> Result<Session, AppError> {
        let request = self.authorized(self.http.post(self.url("/api/auth/refresh")))?;

        let session: Session = read_json::<AuthResponse>(request.send().await?).await?.into();
        self.store_session(Some(session.clone()), AuthEvent::TokenRefreshed);
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), AppError> {
        // Jetons sans état côté serveur : il suffit de les oublier
        self.store_session(None, AuthEvent::SignedOut);
        Ok(())
    }
}

#[async_trait]
impl ProfileSource for ApiClient {
    async fn fetch_profile(&self, user_id: Uuid) -> Result<Profile, AppError> {
        let request = self.authorized(self.http.get(self.url("/api/profiles/me")))?;
        let profile: Profile = read_json(request.send().await?).await?;

        // La session a changé pendant la requête
        if profile.id != user_id {
            return Err(AppError::ProfileUnavailable);
        }

        Ok(profile)
    }
}

#[async_trait]
impl AccountVerifier for ApiClient {
    async fn verify_account(&self, user_id: Uuid, code: &str) -> Result<String, AppError> {
        let response = self
            .http
            .post(self.url("/api/auth/verify-account"))
            .json(&serde_json::json!({
                "userId": user_id.to_string(),
                "verificationCode": code,
            }))
            .send()
            .await?;

        let message: ApiMessage = read_json(response).await?;
        Ok(message.message)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::dto::UserIdentity;

    fn session(expires_in: i64) -> Session {
        Session {
            access_token: "t".to_string(),
            expires_at: Utc::now().timestamp() + expires_in,
            user: UserIdentity {
                id: Uuid::new_v4(),
                phone: "+55".to_string(),
                email: None,
            },
        }
    }

    #[tokio::test]
    async fn test_expired_session_is_reported_absent() {
        let client = ApiClient::new("http://localhost:8080/", Duration::from_secs(1)).unwrap();
        client.store_session(Some(session(-10)), AuthEvent::SignedIn);

        assert!(client.get_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sign_out_notifies_subscribers() {
        let client = ApiClient::new("http://localhost:8080", Duration::from_secs(1)).unwrap();
        let mut events = client.subscribe();
        client.store_session(Some(session(3600)), AuthEvent::SignedIn);
        assert!(client.get_session().await.unwrap().is_some());

        client.sign_out().await.unwrap();

        assert_eq!(events.recv().await.unwrap(), AuthEvent::SignedIn);
        assert_eq!(events.recv().await.unwrap(), AuthEvent::SignedOut);
        assert!(client.get_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_authorized_calls_need_a_session() {
        let client = ApiClient::new("http://localhost:8080", Duration::from_secs(1)).unwrap();

        let result = client.fetch_profile(Uuid::new_v4()).await;
        assert!(matches!(result, Err(AppError::Unauthenticated)));
        assert!(matches!(client.refresh_session().await, Err(AppError::Unauthenticated)));
    }

    #[test]
    fn test_base_url_is_normalized() {
        let client = ApiClient::new("http://localhost:8080/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.url("/api/health"), "http://localhost:8080/api/health");
    }

    #[tokio::test]
    async fn test_store_drops_session_at_expiry_when_backend_is_unreachable() {
        use std::sync::Arc;

        use crate::guard::{Admission, RouteGuard, LOGIN_PATH};
        use crate::session::context::{RetryPolicy, SessionContext};
        use crate::session::testing::{profile_for, FakeProfiles};

        // rien n'écoute sur le port 9 : le renouvellement échoue
        let client = Arc::new(ApiClient::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap());
        let current = session(2);
        client.store_session(Some(current.clone()), AuthEvent::SignedIn);
        let profiles = Arc::new(FakeProfiles::default());
        profiles.insert(profile_for(current.user.id, "verified"));

        let context = SessionContext::start(client.clone(), profiles, RetryPolicy::default()).await;
        assert!(context.snapshot().session.is_some());

        let mut receiver = context.subscribe();
        tokio::time::timeout(Duration::from_secs(5), receiver.wait_for(|s| s.session.is_none()))
            .await
            .expect("expired session was never dropped")
            .unwrap();

        assert!(client.get_session().await.unwrap().is_none());
        assert_eq!(
            RouteGuard::member().evaluate(&context.snapshot(), "/dashboard"),
            Admission::Redirect { to: LOGIN_PATH }
        );
    }
}
