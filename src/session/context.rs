// ============================================================================
// STORE DE SESSION
// ============================================================================
//
// Description:
//   Copie unique en mémoire de {session, user, profile, loading}, construite
//   une fois à la racine de l'application puis partagée (Arc). Les
//   consommateurs lisent un SessionSnapshot via un canal watch.
//
// Initialisation:
//   1. loading = true
//   2. Demander la session au fournisseur d'identité
//   3. Si session: dériver l'utilisateur, charger le profil
//   4. loading = false, quel que soit le résultat
//   5. Écouter les AuthEvent : à chaque notification refaire 2-3 (sans loading)
//
// Points d'attention:
//   - Un échec de profil met profile à Failed mais NE vide PAS la session
//   - Les échecs transitoires sont réessayés avec backoff exponentiel
//   - Fetchs concurrents du même profil : la dernière réponse gagne
//   - La tâche d'écoute ne garde qu'une référence faible sur le contexte
//   - Le jeton est renouvelé REFRESH_MARGIN_SECS avant expires_at ; si le
//     renouvellement échoue, la session est détruite à expires_at
//   - Une session expirée n'est jamais publiée
//
// ============================================================================

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

use crate::models::dto::{Profile, UserIdentity};
use crate::session::identity::{AuthEvent, IdentityProvider, ProfileSource, Session};

/// Avance du renouvellement sur l'expiration du jeton
pub const REFRESH_MARGIN_SECS: i64 = 60;

/// État du profil dans le store
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ProfileState {
    /// Pas encore chargé (ou pas d'utilisateur)
    #[default]
    NotLoaded,
    Loaded(Profile),
    /// Dernier chargement en échec après les réessais
    Failed(String),
}

#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    pub session: Option<Session>,
    pub user: Option<UserIdentity>,
    pub profile: ProfileState,
    pub loading: bool,
}

impl SessionSnapshot {
    /// Session publiée et pas encore expirée
    pub fn live_session(&self) -> Option<&Session> {
        self.session.as_ref().filter(|session| !session.is_expired())
    }

    pub fn profile(&self) -> Option<&Profile> {
        match &self.profile {
            ProfileState::Loaded(profile) => Some(profile),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

pub struct SessionContext {
    identity: Arc<dyn IdentityProvider>,
    profiles: Arc<dyn ProfileSource>,
    retry: RetryPolicy,
    state: watch::Sender<SessionSnapshot>,
    listener: Mutex<Option<JoinHandle<()>>>,
    // expires_at de la dernière session dont le renouvellement a échoué
    refresh_failed_for: AtomicI64,
}

impl SessionContext {
    /// Hydrate le store puis s'abonne aux changements d'authentification
    pub async fn start(
        identity: Arc<dyn IdentityProvider>,
        profiles: Arc<dyn ProfileSource>,
        retry: RetryPolicy,
    ) -> Arc<Self> {
        let (state, _) = watch::channel(SessionSnapshot {
            loading: true,
            ..Default::default()
        });

        let context = Arc::new(Self {
            identity,
            profiles,
            retry,
            state,
            listener: Mutex::new(None),
            refresh_failed_for: AtomicI64::new(i64::MIN),
        });

        // S'abonner avant le premier getSession pour ne rater aucun événement
        let events = context.identity.subscribe();

        context.hydrate().await;
        context.state.send_modify(|snapshot| snapshot.loading = false);

        let handle = tokio::spawn(listen(Arc::downgrade(&context), events));
        if let Ok(mut listener) = context.listener.lock() {
            *listener = Some(handle);
        }

        context
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    /// Récepteur notifié à chaque changement du snapshot
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    pub fn identity(&self) -> &Arc<dyn IdentityProvider> {
        &self.identity
    }

    /// Recharge le profil de l'utilisateur connu ; no-op sans utilisateur
    pub async fn refetch_profile(&self) {
        let user_id = self.state.borrow().user.as_ref().map(|user| user.id);

        if let Some(user_id) = user_id {
            self.load_profile(user_id).await;
        }
    }

    /// Arrête l'écoute des événements d'authentification
    pub fn shutdown(&self) {
        if let Ok(mut listener) = self.listener.lock() {
            if let Some(handle) = listener.take() {
                handle.abort();
            }
        }
    }

    async fn hydrate(&self) {
        // 1. Session courante (une erreur du fournisseur vaut "pas de session")
        let session = match self.identity.get_session().await {
            Ok(session) => session.filter(|s| !s.is_expired()),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read session");
                None
            }
        };

        let user = session.as_ref().map(|s| s.user.clone());

        // 2. Publier la session ; oublier le profil si l'utilisateur a changé
        self.state.send_modify(|snapshot| {
            let same_user = match (&snapshot.user, &user) {
                (Some(previous), Some(current)) => previous.id == current.id,
                _ => false,
            };
            if !same_user {
                snapshot.profile = ProfileState::NotLoaded;
            }
            snapshot.session = session.clone();
            snapshot.user = user.clone();
        });

        // 3. Profil
        if let Some(user) = user {
            self.load_profile(user.id).await;
        }
    }

    /// Prochain réveil : renouvellement, ou expiration si le renouvellement a échoué
    fn session_deadline(&self) -> Option<Instant> {
        let expires_at = self.state.borrow().session.as_ref()?.expires_at;

        let target = if self.refresh_failed_for.load(Ordering::SeqCst) == expires_at {
            expires_at
        } else {
            expires_at - REFRESH_MARGIN_SECS
        };

        let wait = (target - Utc::now().timestamp()).max(0) as u64;
        Some(Instant::now() + Duration::from_secs(wait))
    }

    async fn renew_or_expire(&self) {
        let Some(session) = self.state.borrow().session.clone() else {
            return;
        };

        if !session.is_expired() {
            if self.refresh_failed_for.load(Ordering::SeqCst) == session.expires_at {
                return;
            }

            match self.identity.refresh_session().await {
                Ok(renewed) if renewed.expires_at > session.expires_at => {
                    tracing::debug!(user_id = %renewed.user.id, "🔄 Session renewed");
                    let stored = self.state.send_if_modified(|snapshot| {
                        let same_user = snapshot.user.as_ref().map(|user| user.id) == Some(renewed.user.id);
                        if same_user {
                            snapshot.session = Some(renewed);
                        }
                        same_user
                    });
                    if !stored {
                        self.refresh_failed_for.store(session.expires_at, Ordering::SeqCst);
                    }
                }
                Ok(_) => {
                    tracing::warn!("Session refresh did not extend expiry");
                    self.refresh_failed_for.store(session.expires_at, Ordering::SeqCst);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Session refresh failed, expiring at expires_at");
                    self.refresh_failed_for.store(session.expires_at, Ordering::SeqCst);
                }
            }
            return;
        }

        tracing::info!(user_id = %session.user.id, "⌛ Session expired");
        if let Err(e) = self.identity.sign_out().await {
            tracing::warn!(error = %e, "Sign-out after expiry failed");
        }
        self.state.send_modify(|snapshot| {
            snapshot.session = None;
            snapshot.user = None;
            snapshot.profile = ProfileState::NotLoaded;
        });
    }

    async fn load_profile(&self, user_id: Uuid) {
        let mut delay = self.retry.base_delay;
        let mut attempt = 1;

        let state = loop {
            match self.profiles.fetch_profile(user_id).await {
                Ok(profile) => break ProfileState::Loaded(profile),
                Err(e) if e.is_transient() && attempt < self.retry.max_attempts => {
                    tracing::warn!(%user_id, attempt, error = %e, "Profile fetch failed, retrying");
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(%user_id, error = %e, "❌ Profile unavailable");
                    break ProfileState::Failed(e.to_string());
                }
            }
        };

        // Ne pas écrire le profil d'un utilisateur qui n'est plus connecté
        self.state.send_if_modified(|snapshot| {
            let current = snapshot.user.as_ref().map(|user| user.id);
            if current == Some(user_id) {
                snapshot.profile = state;
                true
            } else {
                false
            }
        });
    }
}

impl Drop for SessionContext {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn listen(context: Weak<SessionContext>, mut events: broadcast::Receiver<AuthEvent>) {
    loop {
        let deadline = match context.upgrade() {
            Some(context) => context.session_deadline(),
            None => break,
        };

        tokio::select! {
            received = events.recv() => match received {
                Ok(event) => {
                    let Some(context) = context.upgrade() else { break };
                    tracing::debug!(?event, "Auth state changed");
                    context.hydrate().await;
                }
                Err(RecvError::Lagged(skipped)) => {
                    // Des événements perdus : on se resynchronise une fois
                    let Some(context) = context.upgrade() else { break };
                    tracing::warn!(skipped, "Auth events lagged");
                    context.hydrate().await;
                }
                Err(RecvError::Closed) => break,
            },
            _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                let Some(context) = context.upgrade() else { break };
                context.renew_or_expire().await;
            }
        }
    }
}
