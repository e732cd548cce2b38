// Cœur de Conversio Studio : API serveur (auth, profils, vérification,
// relais média) et session côté client (store, garde de routes).

pub mod config;
pub mod db;
pub mod error;
pub mod guard;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod session;
pub mod utils;

pub use config::{Config, VerificationScheme};
pub use error::AppError;
pub use guard::{Admission, GuardKind, RouteGuard};
pub use session::{SessionContext, SessionSnapshot, VerificationFlow};
