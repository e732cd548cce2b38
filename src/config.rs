// ============================================================================
// CONFIGURATION
// ============================================================================
//
// Description:
//   Lit la configuration du serveur depuis l'environnement (.env chargé par
//   dotenv dans main). Chaque valeur optionnelle a une valeur par défaut.
//
// Variables:
//   - BIND_ADDR (défaut 127.0.0.1:8080)
//   - DATABASE_URL (obligatoire pour le binaire)
//   - JWT_SECRET, JWT_TTL_HOURS (défaut 24)
//   - VERIFICATION_SCHEME : "identity" (défaut) ou "otp" ; toute autre valeur
//     empêche le démarrage
//   - VERIFICATION_CODE_TTL_MINUTES (défaut 10)
//   - VERIFICATION_WEBHOOK_URL : webhook n8n qui livre le code (optionnel)
//   - STORAGE_URL, STORAGE_SERVICE_KEY, STORAGE_BUCKET
//   - RELAY_TIMEOUT_SECS (défaut 30)
//   - RELAY_MAX_BYTES : taille maximale d'un média relayé (défaut 100 Mio)
//
// ============================================================================

use std::env;
use std::str::FromStr;
use std::time::Duration;

const INSECURE_JWT_SECRET: &str = "default-insecure-key-change-this";

/// Comment `verifyAccount` valide un code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationScheme {
    /// Le code attendu est l'id de l'utilisateur (schéma provisoire)
    Identity,
    /// Code aléatoire à 6 chiffres, haché, avec expiration et compteur d'essais
    Otp,
}

impl FromStr for VerificationScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "identity" => Ok(Self::Identity),
            "otp" => Ok(Self::Otp),
            other => Err(format!("Unknown verification scheme: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub url: String,
    pub service_key: String,
    pub bucket: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub verification_scheme: VerificationScheme,
    pub verification_code_ttl_minutes: i64,
    pub verification_webhook_url: Option<String>,
    pub storage: StorageConfig,
    pub relay_timeout: Duration,
    pub relay_max_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            database_url: None,
            jwt_secret: INSECURE_JWT_SECRET.to_string(),
            jwt_ttl_hours: 24,
            verification_scheme: VerificationScheme::Identity,
            verification_code_ttl_minutes: 10,
            verification_webhook_url: None,
            storage: StorageConfig {
                url: "http://127.0.0.1:54321".to_string(),
                service_key: String::new(),
                bucket: "generated-media".to_string(),
            },
            relay_timeout: Duration::from_secs(30),
            relay_max_bytes: 100 * 1024 * 1024,
        }
    }
}

impl Config {
    /// Construit la configuration depuis les variables d'environnement
    ///
    /// Erreur si VERIFICATION_SCHEME est renseigné avec une valeur inconnue.
    pub fn from_env() -> Result<Self, String> {
        let defaults = Self::default();

        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("⚠️  JWT_SECRET not set, using default (INSECURE)");
            defaults.jwt_secret.clone()
        });

        let verification_scheme = scheme_from(env::var("VERIFICATION_SCHEME").ok().as_deref())?;

        Ok(Self {
            bind_addr: env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            database_url: env::var("DATABASE_URL").ok(),
            jwt_secret,
            jwt_ttl_hours: parse_or("JWT_TTL_HOURS", defaults.jwt_ttl_hours),
            verification_scheme,
            verification_code_ttl_minutes: parse_or(
                "VERIFICATION_CODE_TTL_MINUTES",
                defaults.verification_code_ttl_minutes,
            ),
            verification_webhook_url: env::var("VERIFICATION_WEBHOOK_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            storage: StorageConfig {
                url: env::var("STORAGE_URL").unwrap_or(defaults.storage.url),
                service_key: env::var("STORAGE_SERVICE_KEY").unwrap_or_default(),
                bucket: env::var("STORAGE_BUCKET").unwrap_or(defaults.storage.bucket),
            },
            relay_timeout: Duration::from_secs(parse_or(
                "RELAY_TIMEOUT_SECS",
                defaults.relay_timeout.as_secs(),
            )),
            relay_max_bytes: parse_or("RELAY_MAX_BYTES", defaults.relay_max_bytes),
        })
    }
}

/// Absente ou vide : identity. Une valeur inconnue est une erreur, jamais un
/// repli silencieux sur identity.
fn scheme_from(raw: Option<&str>) -> Result<VerificationScheme, String> {
    match raw.map(str::trim) {
        None | Some("") => Ok(VerificationScheme::Identity),
        Some(value) => value
            .parse()
            .map_err(|e| format!("VERIFICATION_SCHEME: {}", e)),
    }
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "Invalid value, using default");
            default
        }),
        Err(_) => default,
    }
}
