use actix_web::{post, web, HttpResponse};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::dto::{StoreMediaRequest, StoreMediaResponse};
use crate::services::media_relay::MediaRelay;

/// POST /media/store-generated-media - Relais de persistance média (PUBLIC)
///
/// Ne renvoie 400 que pour une requête mal formée ; les échecs par élément
/// gardent l'URL d'origine et sont signalés dans `items`.
#[post("/store-generated-media")]
pub async fn store_generated_media(
    body: web::Json<StoreMediaRequest>,
    relay: web::Data<MediaRelay>,
) -> Result<HttpResponse, AppError> {
    let request = body.into_inner();

    let urls = request
        .urls
        .ok_or_else(|| AppError::MalformedRequest("urls é obrigatório.".to_string()))?;

    let owner = request
        .user_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::MalformedRequest("user_id é obrigatório.".to_string()))?;

    // Le préfixe de stockage est l'id : il doit être un UUID
    let owner = Uuid::parse_str(owner.trim())
        .map_err(|_| AppError::MalformedRequest("user_id inválido.".to_string()))?;

    let items = relay.persist(owner, request.media_type, &urls).await;

    let stored = items.iter().filter(|item| item.stored).count();
    tracing::info!(
        owner = %owner,
        media_type = request.media_type.as_str(),
        stored,
        total = items.len(),
        "📦 Generated media relayed"
    );

    Ok(HttpResponse::Ok().json(StoreMediaResponse {
        success: true,
        urls: items.iter().map(|item| item.url.clone()).collect(),
        message: format!("{} de {} arquivo(s) armazenado(s).", stored, items.len()),
        items,
    }))
}

pub fn media_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/media")
            .service(store_generated_media)
    );
}
