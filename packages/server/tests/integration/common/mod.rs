use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use reqwest::Client;
use serde_json::{Value, json};
use tempfile::TempDir;

use server::config::{AppConfig, CorsConfig, ServerConfig, SessionConfig, StorageAppConfig};
use server::registry::SessionRegistry;
use server::state::AppState;
use server::storage::init_store;

/// Upload size limit used by every test server.
pub const MAX_OBJECT_SIZE: u64 = 1024;

pub mod routes {
    pub const SESSIONS: &str = "/api/v1/sessions";

    pub fn session(id: &str) -> String {
        format!("/api/v1/sessions/{id}")
    }

    pub fn dirty(id: &str) -> String {
        format!("/api/v1/sessions/{id}/dirty")
    }

    pub fn uploads(id: &str) -> String {
        format!("/api/v1/sessions/{id}/uploads")
    }

    pub fn adopt(id: &str) -> String {
        format!("/api/v1/sessions/{id}/uploads/adopt")
    }

    pub fn removals(id: &str) -> String {
        format!("/api/v1/sessions/{id}/removals")
    }

    pub fn save(id: &str) -> String {
        format!("/api/v1/sessions/{id}/save")
    }

    pub fn discard(id: &str) -> String {
        format!("/api/v1/sessions/{id}/discard")
    }

    pub fn navigate(id: &str) -> String {
        format!("/api/v1/sessions/{id}/navigate")
    }

    pub fn confirm(id: &str) -> String {
        format!("/api/v1/sessions/{id}/navigate/confirm")
    }

    pub fn cancel(id: &str) -> String {
        format!("/api/v1/sessions/{id}/navigate/cancel")
    }

    pub fn history(id: &str) -> String {
        format!("/api/v1/sessions/{id}/history")
    }
}

/// A running test server backed by a temporary media directory.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub sessions: Arc<SessionRegistry>,
    /// Root of the filesystem object store.
    pub media_root: PathBuf,
    _media_dir: TempDir,
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    /// Raw response body as text.
    pub text: String,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
}

/// Raw response for a media fetch.
pub struct MediaResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        let media_dir = tempfile::tempdir().expect("Failed to create media dir");
        let media_root = media_dir.path().join("media");

        let app_config = AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors: CorsConfig::default(),
            },
            storage: StorageAppConfig {
                root: media_root.clone(),
                public_base_url: format!("http://{addr}/media"),
                max_object_size: MAX_OBJECT_SIZE,
                ..Default::default()
            },
            sessions: SessionConfig::default(),
        };

        let store = init_store(&app_config.storage)
            .await
            .expect("Failed to initialize media store");
        let sessions = Arc::new(SessionRegistry::new(Arc::clone(&store)));

        let state = AppState {
            sessions: Arc::clone(&sessions),
            store,
            config: app_config,
        };

        let app = server::build_router(state);

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            client: Client::new(),
            sessions,
            media_root,
            _media_dir: media_dir,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn post(&self, path: &str, body: &Value) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn post_empty(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn put(&self, path: &str, body: &Value) -> TestResponse {
        let res = self
            .client
            .put(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to send PUT request");

        TestResponse::from_response(res).await
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn delete(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .delete(self.url(path))
            .send()
            .await
            .expect("Failed to send DELETE request");

        TestResponse::from_response(res).await
    }

    pub async fn upload(
        &self,
        path: &str,
        file_name: &str,
        file_bytes: Vec<u8>,
        folder: Option<&str>,
    ) -> TestResponse {
        let part = reqwest::multipart::Part::bytes(file_bytes)
            .file_name(file_name.to_string())
            .mime_str("image/png")
            .expect("Failed to set MIME type");
        let mut form = reqwest::multipart::Form::new();
        if let Some(folder) = folder {
            form = form.text("folder", folder.to_string());
        }
        let form = form.part("file", part);

        self.upload_form(path, form).await
    }

    pub async fn upload_form(&self, path: &str, form: reqwest::multipart::Form) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .multipart(form)
            .send()
            .await
            .expect("Failed to send upload request");

        TestResponse::from_response(res).await
    }

    /// Number of objects in the media store, ignoring in-flight temp files.
    pub fn stored_object_count(&self) -> usize {
        fn count(dir: &Path) -> usize {
            std::fs::read_dir(dir)
                .expect("Failed to read media dir")
                .map(|entry| entry.expect("Failed to read media entry"))
                .filter(|entry| entry.file_name() != ".tmp")
                .map(|entry| {
                    let path = entry.path();
                    if path.is_dir() { count(&path) } else { 1 }
                })
                .sum()
        }
        count(&self.media_root)
    }

    /// Fetch an object by the absolute URL the upload endpoint returned.
    pub async fn fetch_media(&self, url: &str) -> MediaResponse {
        let res = self
            .client
            .get(url)
            .send()
            .await
            .expect("Failed to fetch media");

        let status = res.status().as_u16();
        let content_type = res
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = res.bytes().await.unwrap_or_default().to_vec();

        MediaResponse {
            status,
            content_type,
            bytes,
        }
    }

    /// Open a session at `location` and return its ID.
    pub async fn open_session(&self, location: &str) -> String {
        let res = self
            .post(routes::SESSIONS, &json!({ "location": location }))
            .await;
        assert_eq!(res.status, 201, "open session failed: {}", res.text);
        res.id()
    }

    /// Upload a small PNG-named file and return its public URL.
    pub async fn upload_image(&self, session_id: &str, file_name: &str) -> String {
        let res = self
            .upload(
                &routes::uploads(session_id),
                file_name,
                png_bytes(),
                None,
            )
            .await;
        assert_eq!(res.status, 201, "upload failed: {}", res.text);
        res.body["url"].as_str().unwrap().to_string()
    }

    /// Store an image through a throwaway session and save it, as if it
    /// belonged to an already persisted record.
    pub async fn saved_image(&self, file_name: &str) -> String {
        let id = self.open_session("/admin/seed").await;
        let url = self.upload_image(&id, file_name).await;
        let res = self.post_empty(&routes::save(&id)).await;
        assert_eq!(res.status, 200, "save failed: {}", res.text);
        let res = self.delete(&routes::session(&id)).await;
        assert_eq!(res.status, 200, "close failed: {}", res.text);
        url
    }
}

impl TestResponse {
    pub async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let text = res.text().await.unwrap_or_default();
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Self { status, text, body }
    }

    pub fn id(&self) -> String {
        self.body["id"]
            .as_str()
            .expect("Response missing 'id' field")
            .to_string()
    }

    pub fn error_code(&self) -> &str {
        self.body["code"].as_str().unwrap_or_default()
    }

    /// Sorted string array at `pointer`.
    pub fn strings(&self, pointer: &str) -> Vec<String> {
        let mut items: Vec<String> = self
            .body
            .pointer(pointer)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        items.sort();
        items
    }
}

/// A few bytes standing in for an image.
pub fn png_bytes() -> Vec<u8> {
    vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0, 0, 0, 0]
}
