use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use sea_orm::DbErr;
use thiserror::Error;

/// Erreurs de l'application (serveur et client)
///
/// Les erreurs métier sont rendues en `{ "success": false, "error": "..." }`
/// pour que le client affiche le message sans regarder le statut HTTP.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Sessão inválida ou expirada.")]
    Unauthenticated,

    #[error("Telefone ou senha inválidos.")]
    InvalidCredentials,

    #[error("Perfil indisponível no momento.")]
    ProfileUnavailable,

    #[error("Perfil não encontrado.")]
    ProfileNotFound,

    #[error("Código de verificação inválido.")]
    InvalidCode,

    #[error("Esta conta já foi verificada.")]
    AlreadyVerified,

    #[error("Código de verificação expirado. Solicite um novo código.")]
    VerificationExpired,

    #[error("Muitas tentativas. Solicite um novo código.")]
    TooManyAttempts,

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("{0}")]
    MalformedRequest(String),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("Transport error: {0}")]
    Transport(String),

    /// Réponse `{success:false}` reçue du serveur (côté client)
    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Les erreurs réseau/serveur valent la peine d'être réessayées,
    /// pas les refus métier.
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::Transport(_) | AppError::Database(_) | AppError::Internal(_) => true,
            AppError::Rejected { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::Transport(e.to_string())
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::ProfileNotFound => StatusCode::NOT_FOUND,
            AppError::InvalidCode
            | AppError::AlreadyVerified
            | AppError::VerificationExpired
            | AppError::TooManyAttempts
            | AppError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            AppError::DownloadFailed(_) | AppError::UploadFailed(_) | AppError::Transport(_) => {
                StatusCode::BAD_GATEWAY
            }
            AppError::Rejected { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            AppError::ProfileUnavailable | AppError::Database(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();

        // Ne jamais exposer le détail des erreurs d'infrastructure
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("❌ {}", self);
            "Erro interno do servidor.".to_string()
        } else {
            self.to_string()
        };

        HttpResponse::build(status).json(serde_json::json!({
            "success": false,
            "error": message
        }))
    }
}
