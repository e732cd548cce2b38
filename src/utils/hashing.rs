use base64::{Engine, engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD}};
use hmac::Hmac;
use pbkdf2::pbkdf2;
use rand::Rng;
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

const KEY_LENGTH: usize = 32;
const CODE_DIGITS: u32 = 6;

/// Hash un mot de passe : PBKDF2-HMAC-SHA256, salt de 16 bytes
/// Format: pbkdf2:sha256:iterations$salt$hash
///
/// Les comptes sont créés par l'inscription, hors de ce backend : ici on ne
/// hache que pour les comptes de test.
#[cfg(test)]
pub(crate) fn hash_password(password: &str, iterations: u32) -> Result<String, String> {
    let mut salt = [0u8; 16];
    rand::thread_rng().fill(&mut salt);

    let key = derive(password, &salt, iterations, KEY_LENGTH)?;

    Ok(format!(
        "pbkdf2:sha256:{}${}${}",
        iterations,
        URL_SAFE_NO_PAD.encode(salt),
        URL_SAFE_NO_PAD.encode(key)
    ))
}

/// Vérifie un mot de passe contre un hash stocké
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, String> {
    let parts: Vec<&str> = stored_hash.split('$').collect();
    if parts.len() != 3 {
        return Err("Invalid hash format".to_string());
    }

    let header_parts: Vec<&str> = parts[0].split(':').collect();
    if header_parts.len() != 3 || header_parts[0] != "pbkdf2" || header_parts[1] != "sha256" {
        return Err("Invalid header".to_string());
    }

    let iterations = header_parts[2]
        .parse::<u32>()
        .map_err(|_| "Invalid iterations".to_string())?;

    let salt = decode_b64(parts[1])?;
    let expected = decode_b64(parts[2])?;

    let computed = derive(password, &salt, iterations, expected.len())?;

    Ok(constant_time_eq(&computed, &expected))
}

/// Génère un code de vérification à 6 chiffres
pub fn generate_verification_code() -> String {
    let code = rand::thread_rng().gen_range(0..10u32.pow(CODE_DIGITS));
    format!("{:0width$}", code, width = CODE_DIGITS as usize)
}

/// Empreinte SHA-256 (hex) d'un code : seule l'empreinte est stockée
pub fn hash_code(code: &str) -> String {
    hex::encode(Sha256::digest(code.trim().as_bytes()))
}

/// Compare un code soumis à l'empreinte stockée
pub fn code_matches(code: &str, stored_hash: &str) -> bool {
    constant_time_eq(hash_code(code).as_bytes(), stored_hash.as_bytes())
}

fn derive(password: &str, salt: &[u8], iterations: u32, len: usize) -> Result<Vec<u8>, String> {
    let mut key = vec![0u8; len];
    pbkdf2::<HmacSha256>(password.as_bytes(), salt, iterations, &mut key)
        .map_err(|e| format!("PBKDF2 failed: {}", e))?;
    Ok(key)
}

// Accepte l'encodage URL-safe sans padding (nôtre) et le base64 standard
fn decode_b64(input: &str) -> Result<Vec<u8>, String> {
    URL_SAFE_NO_PAD
        .decode(input)
        .or_else(|_| STANDARD.decode(input))
        .map_err(|_| "Failed to decode".to_string())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
