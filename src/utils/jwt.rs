use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,       // user_id
    pub phone: String,
    pub exp: i64,        // expiration timestamp
}

/// Jeton émis : la chaîne signée et son expiration
#[derive(Debug)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: i64,
}

/// Génère un JWT pour un utilisateur
pub fn generate_token(
    user_id: Uuid,
    phone: &str,
    secret: &str,
    ttl_hours: i64,
) -> Result<IssuedToken, String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(ttl_hours))
        .ok_or("Failed to calculate expiration")?
        .timestamp();

    let claims = Claims {
        sub: user_id,
        phone: phone.to_string(),
        exp: expiration,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
    .map_err(|e| format!("Failed to generate token: {}", e))?;

    Ok(IssuedToken {
        token,
        expires_at: expiration,
    })
}

/// Vérifie et décode un JWT
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .map_err(|e| format!("Invalid token: {}", e))
}
