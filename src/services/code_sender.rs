// Livraison hors bande des codes de vérification (WhatsApp via n8n)

use std::time::Duration;

use async_trait::async_trait;

use crate::error::AppError;

#[async_trait]
pub trait CodeSender: Send + Sync {
    async fn send_code(&self, phone: &str, code: &str) -> Result<(), AppError>;
}

/// Écrit le code dans les logs (développement, pas de webhook configuré)
#[derive(Default)]
pub struct LogCodeSender;

#[async_trait]
impl CodeSender for LogCodeSender {
    async fn send_code(&self, phone: &str, code: &str) -> Result<(), AppError> {
        tracing::info!(phone = %phone, code = %code, "📨 Verification code (no webhook configured)");
        Ok(())
    }
}

/// Poste `{ phone, code }` vers un webhook n8n qui envoie le message
pub struct WebhookCodeSender {
    client: reqwest::Client,
    url: String,
}

impl WebhookCodeSender {
    pub fn new(url: String, timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl CodeSender for WebhookCodeSender {
    async fn send_code(&self, phone: &str, code: &str) -> Result<(), AppError> {
        self.client
            .post(&self.url)
            .json(&serde_json::json!({ "phone": phone, "code": code }))
            .send()
            .await?
            .error_for_status()?;

        tracing::info!(phone = %phone, "📨 Verification code handed to webhook");
        Ok(())
    }
}
