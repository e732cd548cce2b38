// ============================================================================
// GARDE DE ROUTES
// ============================================================================
//
// Description:
//   Décision d'accès recalculée à chaque navigation ou changement du store de
//   session. Fonction pure de (loading, session?, profil, chemin) : aucune
//   mémoire des décisions précédentes.
//
// Table de décision (ordre strict, la première règle gagne):
//   1. loading                                    → Loading
//   2. pas de session                             → Redirect /login
//   3. profil pas encore chargé                   → Loading
//      profil en échec après réessais             → ProfileUnavailable
//   4. non vérifié et chemin != /verify           → Redirect /verify
//   5. vérifié et chemin == /verify               → Redirect /dashboard
//   6. garde admin et account_type != admin       → Redirect /dashboard
//   7. sinon                                      → Admit
//
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::models::profiles::{AccountType, ProfileStatus};
use crate::session::context::{ProfileState, SessionSnapshot};

pub const LOGIN_PATH: &str = "/login";
pub const VERIFY_PATH: &str = "/verify";
pub const DASHBOARD_PATH: &str = "/dashboard";
pub const ADMIN_PREFIX: &str = "/admin";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Admission {
    /// Afficher l'indicateur de chargement, pas de redirection
    Loading,
    Redirect { to: &'static str },
    /// Profil introuvable après réessais : afficher l'erreur et un bouton réessayer
    ProfileUnavailable,
    Admit,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuardKind {
    #[default]
    Member,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteGuard {
    kind: GuardKind,
}

impl RouteGuard {
    pub fn new(kind: GuardKind) -> Self {
        Self { kind }
    }

    /// Garde des routes protégées (dashboard, générations)
    pub fn member() -> Self {
        Self::new(GuardKind::Member)
    }

    /// Garde du back-office : exige en plus account_type = admin
    pub fn admin() -> Self {
        Self::new(GuardKind::Admin)
    }

    /// Garde qui protège un chemin donné
    pub fn for_path(path: &str) -> Self {
        let path = normalize(path);
        if path == ADMIN_PREFIX || path.starts_with("/admin/") {
            Self::admin()
        } else {
            Self::member()
        }
    }

    pub fn evaluate(&self, snapshot: &SessionSnapshot, path: &str) -> Admission {
        // une session expirée pas encore retirée du store compte comme absente
        self.decide(snapshot.loading, snapshot.live_session().is_some(), &snapshot.profile, path)
    }

    pub fn decide(
        &self,
        loading: bool,
        has_session: bool,
        profile: &ProfileState,
        path: &str,
    ) -> Admission {
        if loading {
            return Admission::Loading;
        }

        if !has_session {
            return Admission::Redirect { to: LOGIN_PATH };
        }

        let profile = match profile {
            ProfileState::NotLoaded => return Admission::Loading,
            ProfileState::Failed(_) => return Admission::ProfileUnavailable,
            ProfileState::Loaded(profile) => profile,
        };

        let on_verify_page = normalize(path) == VERIFY_PATH;

        match profile.status {
            ProfileStatus::Unverified if !on_verify_page => Admission::Redirect { to: VERIFY_PATH },
            ProfileStatus::Verified if on_verify_page => Admission::Redirect { to: DASHBOARD_PATH },
            ProfileStatus::Verified
                if self.kind == GuardKind::Admin && profile.account_type != AccountType::Admin =>
            {
                Admission::Redirect { to: DASHBOARD_PATH }
            }
            _ => Admission::Admit,
        }
    }
}

/// Retire query string, fragment et slash final : "/verify/?x=1" → "/verify"
fn normalize(path: &str) -> &str {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() { "/" } else { trimmed }
}
