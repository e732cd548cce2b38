// ============================================================================
// SERVICE : RELAIS DE PERSISTANCE MÉDIA
// ============================================================================
//
// Description:
//   Les webhooks de génération renvoient des URLs éphémères. Le relais
//   télécharge chaque média et le ré-uploade dans le stockage durable.
//
// Contrat:
//   - Sortie de même longueur et même ordre que l'entrée
//   - Un élément en échec (download ou upload) garde son URL d'origine,
//     marqué stored = false avec l'erreur ; le lot n'échoue jamais
//   - Chemin: {owner}/{kind}_{timestamp_ms}_{index}.{ext}, un timestamp par lot ;
//     owner est un UUID, jamais vide, deux propriétaires ne partagent pas un préfixe
//
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::error::AppError;
use crate::models::dto::{MediaKind, RelayedItem};

/// Télécharge une ressource distante
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, AppError>;
}

/// Stockage objet durable ; renvoie l'URL publique de l'objet
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, AppError>;
}

pub struct HttpMediaFetcher {
    client: reqwest::Client,
    max_bytes: usize,
}

impl HttpMediaFetcher {
    pub fn new(timeout: Duration, max_bytes: usize) -> Result<Self, AppError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, max_bytes })
    }
}

#[async_trait]
impl MediaFetcher for HttpMediaFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, AppError> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::DownloadFailed(e.to_string()))?;

        // Taille annoncée refusée avant toute lecture
        let declared = response.content_length();
        check_declared_size(declared, self.max_bytes)?;

        let capacity = declared.map_or(0, |len| len as usize);
        let mut bytes = Vec::with_capacity(capacity);
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| AppError::DownloadFailed(e.to_string()))?
        {
            append_within_limit(&mut bytes, &chunk, self.max_bytes)?;
        }

        Ok(bytes)
    }
}

fn check_declared_size(declared: Option<u64>, max_bytes: usize) -> Result<(), AppError> {
    match declared {
        Some(len) if len > max_bytes as u64 => Err(AppError::DownloadFailed(format!(
            "media too large: {} bytes (limit {})",
            len, max_bytes
        ))),
        _ => Ok(()),
    }
}

// Content-Length peut manquer ou mentir : la limite vaut aussi en lecture
fn append_within_limit(buffer: &mut Vec<u8>, chunk: &[u8], max_bytes: usize) -> Result<(), AppError> {
    if buffer.len() + chunk.len() > max_bytes {
        return Err(AppError::DownloadFailed(format!(
            "media exceeds limit of {} bytes",
            max_bytes
        )));
    }
    buffer.extend_from_slice(chunk);
    Ok(())
}

/// Stockage compatible Supabase Storage
pub struct HttpObjectStorage {
    client: reqwest::Client,
    config: StorageConfig,
}

impl HttpObjectStorage {
    pub fn new(config: StorageConfig, timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, config })
    }

    fn base(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    pub fn public_url(&self, path: &str) -> String {
        format!("{}/storage/v1/object/public/{}/{}", self.base(), self.config.bucket, path)
    }
}

#[async_trait]
impl ObjectStorage for HttpObjectStorage {
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, AppError> {
        let url = format!("{}/storage/v1/object/{}/{}", self.base(), self.config.bucket, path);

        self.client
            .post(&url)
            .bearer_auth(&self.config.service_key)
            .header("apikey", &self.config.service_key)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("x-upsert", "true")
            .body(bytes)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::UploadFailed(e.to_string()))?;

        Ok(self.public_url(path))
    }
}

pub struct MediaRelay {
    fetcher: Arc<dyn MediaFetcher>,
    storage: Arc<dyn ObjectStorage>,
}

impl MediaRelay {
    pub fn new(fetcher: Arc<dyn MediaFetcher>, storage: Arc<dyn ObjectStorage>) -> Self {
        Self { fetcher, storage }
    }

    /// Relais HTTP réel (téléchargement + Supabase Storage) avec timeout et taille maximale
    pub fn http(storage: StorageConfig, timeout: Duration, max_bytes: usize) -> Result<Self, AppError> {
        Ok(Self::new(
            Arc::new(HttpMediaFetcher::new(timeout, max_bytes)?),
            Arc::new(HttpObjectStorage::new(storage, timeout)?),
        ))
    }

    /// Persiste chaque URL ; les éléments sont indépendants et traités en parallèle
    pub async fn persist(&self, owner: Uuid, kind: MediaKind, urls: &[String]) -> Vec<RelayedItem> {
        let timestamp = Utc::now().timestamp_millis();

        let tasks = urls.iter().enumerate().map(|(index, url)| async move {
            match self.persist_one(owner, kind, timestamp, index, url).await {
                Ok(durable_url) => RelayedItem {
                    url: durable_url,
                    stored: true,
                    error: None,
                },
                Err(e) => {
                    tracing::warn!(index, url = %url, error = %e, "⚠️  Media item kept ephemeral");
                    RelayedItem {
                        url: url.clone(),
                        stored: false,
                        error: Some(e.to_string()),
                    }
                }
            }
        });

        // join_all conserve l'ordre des futures
        join_all(tasks).await
    }

    async fn persist_one(
        &self,
        owner: Uuid,
        kind: MediaKind,
        timestamp: i64,
        index: usize,
        url: &str,
    ) -> Result<String, AppError> {
        let bytes = self.fetcher.fetch(url).await?;
        let path = storage_path(owner, kind, timestamp, index);
        self.storage.upload(&path, bytes, kind.content_type()).await
    }
}

/// {owner}/{kind}_{timestamp}_{index}.{ext}
pub fn storage_path(owner: Uuid, kind: MediaKind, timestamp: i64, index: usize) -> String {
    // forme hyphénée minuscule : une seule écriture par propriétaire
    format!(
        "{}/{}_{}_{}.{}",
        owner.hyphenated(),
        kind.as_str(),
        timestamp,
        index,
        kind.extension()
    )
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use super::*;

    /// Fetcher en mémoire : les URLs listées échouent
    pub(crate) struct FakeFetcher {
        pub failing: HashSet<String>,
    }

    #[async_trait]
    impl MediaFetcher for FakeFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>, AppError> {
            if self.failing.contains(url) {
                Err(AppError::DownloadFailed(format!("404 for {}", url)))
            } else {
                Ok(url.as_bytes().to_vec())
            }
        }
    }

    /// Stockage en mémoire ; échoue sur les contenus listés
    #[derive(Default)]
    pub(crate) struct FakeStorage {
        pub rejecting: HashSet<Vec<u8>>,
        pub uploads: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl ObjectStorage for FakeStorage {
        async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, AppError> {
            if self.rejecting.contains(&bytes) {
                return Err(AppError::UploadFailed("bucket full".to_string()));
            }
            self.uploads
                .lock()
                .unwrap()
                .push((path.to_string(), content_type.to_string()));
            Ok(format!("https://durable/{}", path))
        }
    }

    pub(crate) fn relay(failing: &[&str], rejecting: &[&str]) -> (MediaRelay, Arc<FakeStorage>) {
        let storage = Arc::new(FakeStorage {
            rejecting: rejecting.iter().map(|u| u.as_bytes().to_vec()).collect(),
            ..Default::default()
        });
        let fetcher = Arc::new(FakeFetcher {
            failing: failing.iter().map(|u| u.to_string()).collect(),
        });
        (MediaRelay::new(fetcher, storage.clone()), storage)
    }

    const OWNER: &str = "6f1c2a3e-5b7d-4e8f-9a0b-1c2d3e4f5a6b";

    fn owner() -> Uuid {
        Uuid::parse_str(OWNER).unwrap()
    }

    fn urls(items: &[&str]) -> Vec<String> {
        items.iter().map(|u| u.to_string()).collect()
    }

    #[tokio::test]
    async fn test_failed_download_falls_back_to_original() {
        let (relay, _) = relay(&["https://bad/2.png"], &[]);
        let input = urls(&["https://ok/1.png", "https://bad/2.png"]);

        let items = relay.persist(owner(), MediaKind::Image, &input).await;

        assert_eq!(items.len(), 2);
        assert!(items[0].stored);
        assert!(items[0].url.starts_with(&format!("https://durable/{}/image_", OWNER)));
        assert!(items[0].url.ends_with("_0.png"));
        assert!(!items[1].stored);
        assert_eq!(items[1].url, "https://bad/2.png");
        assert!(items[1].error.as_deref().unwrap().starts_with("Download failed"));
    }

    #[tokio::test]
    async fn test_failed_upload_falls_back_to_original() {
        let (relay, _) = relay(&[], &["https://ok/b.mp3"]);
        let input = urls(&["https://ok/a.mp3", "https://ok/b.mp3", "https://ok/c.mp3"]);

        let items = relay.persist(owner(), MediaKind::Audio, &input).await;

        assert_eq!(items.len(), 3);
        assert!(items[0].stored && items[2].stored);
        assert_eq!(items[1].url, "https://ok/b.mp3");
        assert!(items[1].error.as_deref().unwrap().starts_with("Upload failed"));
        assert!(items[2].url.ends_with("_2.mp3"));
    }

    #[tokio::test]
    async fn test_order_and_length_are_preserved() {
        let failing: Vec<String> = (0..10).filter(|i| i % 3 == 0).map(|i| format!("https://x/{}", i)).collect();
        let failing_refs: Vec<&str> = failing.iter().map(|s| s.as_str()).collect();
        let (relay, _) = relay(&failing_refs, &[]);
        let input: Vec<String> = (0..10).map(|i| format!("https://x/{}", i)).collect();

        let items = relay.persist(owner(), MediaKind::Video, &input).await;

        assert_eq!(items.len(), input.len());
        for (i, item) in items.iter().enumerate() {
            if i % 3 == 0 {
                assert_eq!(item.url, input[i]);
            } else {
                assert!(item.url.ends_with(&format!("_{}.mp4", i)));
            }
        }
    }

    #[tokio::test]
    async fn test_content_type_follows_kind() {
        let (relay, storage) = relay(&[], &[]);
        relay.persist(owner(), MediaKind::Audio, &urls(&["https://ok/1"])).await;

        let uploads = storage.uploads.lock().unwrap();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].1, "audio/mpeg");
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let (relay, _) = relay(&[], &[]);
        assert!(relay.persist(owner(), MediaKind::Image, &[]).await.is_empty());
    }

    #[test]
    fn test_storage_path() {
        assert_eq!(
            storage_path(owner(), MediaKind::Image, 1700000000000, 4),
            format!("{}/image_1700000000000_4.png", OWNER)
        );
    }

    #[test]
    fn test_storage_path_prefix_is_canonical_and_distinct() {
        // la casse d'entrée ne crée pas un second préfixe
        let upper = Uuid::parse_str(&OWNER.to_uppercase()).unwrap();
        assert_eq!(storage_path(upper, MediaKind::Video, 1, 0), format!("{}/video_1_0.mp4", OWNER));

        let other = Uuid::new_v4();
        let path = storage_path(other, MediaKind::Video, 1, 0);
        assert!(path.starts_with(&format!("{}/", other)));
        assert_ne!(path, storage_path(owner(), MediaKind::Video, 1, 0));
    }

    #[test]
    fn test_public_url() {
        let storage = HttpObjectStorage::new(
            StorageConfig {
                url: "https://proj.supabase.co/".to_string(),
                service_key: "k".to_string(),
                bucket: "generated-media".to_string(),
            },
            Duration::from_secs(5),
        )
        .unwrap();

        assert_eq!(
            storage.public_url("u/image_1_0.png"),
            "https://proj.supabase.co/storage/v1/object/public/generated-media/u/image_1_0.png"
        );
    }

    #[test]
    fn test_declared_size_over_limit_is_refused() {
        assert!(check_declared_size(None, 10).is_ok());
        assert!(check_declared_size(Some(10), 10).is_ok());
        let err = check_declared_size(Some(11), 10).unwrap_err();
        assert!(matches!(err, AppError::DownloadFailed(_)));
    }

    #[test]
    fn test_streamed_body_is_capped() {
        let mut buffer = Vec::new();
        append_within_limit(&mut buffer, &[0u8; 6], 10).unwrap();
        append_within_limit(&mut buffer, &[0u8; 4], 10).unwrap();
        assert_eq!(buffer.len(), 10);

        let err = append_within_limit(&mut buffer, &[0u8; 1], 10).unwrap_err();
        assert!(matches!(err, AppError::DownloadFailed(_)));
        assert_eq!(buffer.len(), 10);
    }

    /// Serveur HTTP d'une seule réponse, sans Content-Length (corps lu jusqu'à la fermeture)
    async fn serve_once(body: Vec<u8>) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            let head = "HTTP/1.1 200 OK\r\nContent-Type: image/png\r\nConnection: close\r\n\r\n";
            let _ = socket.write_all(head.as_bytes()).await;
            let _ = socket.write_all(&body).await;
            let _ = socket.shutdown().await;
        });
        format!("http://{}/media.png", addr)
    }

    #[tokio::test]
    async fn test_fetcher_stops_at_size_limit() {
        let fetcher = HttpMediaFetcher::new(Duration::from_secs(5), 1024).unwrap();

        let url = serve_once(vec![7u8; 4096]).await;
        let result = fetcher.fetch(&url).await;
        assert!(matches!(result, Err(AppError::DownloadFailed(_))));

        let url = serve_once(vec![7u8; 512]).await;
        assert_eq!(fetcher.fetch(&url).await.unwrap().len(), 512);
    }
}
