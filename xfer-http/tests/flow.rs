use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use bytes::Bytes;
use http_body_util::BodyExt;
use tower::ServiceExt;
use xfer_blob::{BlobBroker, BlobResult, ByteStream, CompletedPart, ObjectHead};
use xfer_coordinator::Coordinator;
use xfer_core::AppConfig;
use xfer_http::state::AppState;
use xfer_meta::{FieldStore, MetaResult};

struct InMemoryBlob {
    objects: Mutex<HashMap<String, Bytes>>,
}

#[async_trait]
impl BlobBroker for InMemoryBlob {
    async fn sign_put(&self, key: &str, _ttl: Duration) -> BlobResult<String> {
        Ok(format!("https://blob.test/put/{key}"))
    }
    async fn sign_get(&self, key: &str, _ttl: Duration, _filename: Option<&str>) -> BlobResult<String> {
        Ok(format!("https://blob.test/get/{key}"))
    }
    async fn start_multipart(&self, _key: &str) -> BlobResult<String> {
        Ok("upload-1".to_string())
    }
    async fn sign_part(&self, key: &str, upload_id: &str, part_number: i32, _ttl: Duration) -> BlobResult<String> {
        Ok(format!("https://blob.test/part/{key}/{upload_id}/{part_number}"))
    }
    async fn complete_multipart(&self, key: &str, _upload_id: &str, _parts: Vec<CompletedPart>) -> BlobResult<()> {
        self.objects.lock().unwrap().insert(key.to_string(), Bytes::from_static(b"multipart-body"));
        Ok(())
    }
    async fn abort_multipart(&self, _key: &str, _upload_id: &str) -> BlobResult<()> {
        Ok(())
    }
    async fn delete(&self, key: &str) -> BlobResult<()> {
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }
    async fn stream_get(&self, key: &str) -> BlobResult<ByteStream> {
        let data = self
            .objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| xfer_blob::BlobError::not_found(key))?;
        Ok(Box::pin(futures::stream::once(async move { Ok(data) })))
    }
    async fn size(&self, key: &str) -> BlobResult<ObjectHead> {
        let size = self.objects.lock().unwrap().get(key).map(|b| b.len()).unwrap_or(0);
        Ok(ObjectHead { size_bytes: size as u64 })
    }
    async fn ping(&self) -> BlobResult<()> {
        Ok(())
    }
}

struct InMemoryMeta {
    records: Mutex<HashMap<String, HashMap<String, String>>>,
}

#[async_trait]
impl FieldStore for InMemoryMeta {
    async fn set_field(&self, id: &str, field: &str, value: &str) -> MetaResult<()> {
        self.records
            .lock()
            .unwrap()
            .entry(id.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
        Ok(())
    }
    async fn get_field(&self, id: &str, field: &str) -> MetaResult<Option<String>> {
        Ok(self.records.lock().unwrap().get(id).and_then(|m| m.get(field).cloned()))
    }
    async fn get_all(&self, id: &str) -> MetaResult<HashMap<String, String>> {
        Ok(self.records.lock().unwrap().get(id).cloned().unwrap_or_default())
    }
    async fn del_field(&self, id: &str, fields: &[&str]) -> MetaResult<()> {
        if let Some(m) = self.records.lock().unwrap().get_mut(id) {
            for f in fields {
                m.remove(*f);
            }
        }
        Ok(())
    }
    async fn incr(&self, id: &str, field: &str, delta: i64) -> MetaResult<i64> {
        let mut guard = self.records.lock().unwrap();
        let entry = guard.entry(id.to_string()).or_default();
        let current: i64 = entry.get(field).and_then(|v| v.parse().ok()).unwrap_or(0);
        let next = current + delta;
        entry.insert(field.to_string(), next.to_string());
        Ok(next)
    }
    async fn expire(&self, _id: &str, _seconds: u64) -> MetaResult<()> {
        Ok(())
    }
    async fn ttl(&self, _id: &str) -> MetaResult<Option<i64>> {
        Ok(Some(3600))
    }
    async fn exists(&self, id: &str) -> MetaResult<bool> {
        Ok(self.records.lock().unwrap().contains_key(id))
    }
    async fn del(&self, id: &str) -> MetaResult<()> {
        self.records.lock().unwrap().remove(id);
        Ok(())
    }
}

fn test_state() -> AppState {
    let blob = Arc::new(InMemoryBlob {
        objects: Mutex::new(HashMap::new()),
    });
    let meta = Arc::new(InMemoryMeta {
        records: Mutex::new(HashMap::new()),
    });
    let config = Arc::new(AppConfig::default());
    AppState {
        coordinator: Arc::new(Coordinator::new(blob, meta, config.clone())),
        config,
    }
}

#[tokio::test]
async fn heartbeat_is_ok() {
    let app = xfer_http::build(test_state());
    let response = app
        .oneshot(Request::builder().uri("/__heartbeat__").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn plan_then_complete_then_exists_round_trip() {
    let app = xfer_http::build(test_state());

    let plan_response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/upload/url")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"fileSize":1024,"encrypted":false}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(plan_response.status(), StatusCode::OK);

    let plan_body = plan_response.into_body().collect().await.unwrap().to_bytes();
    let plan_json: serde_json::Value = serde_json::from_slice(&plan_body).unwrap();
    let id = plan_json["id"].as_str().unwrap().to_string();
    assert_eq!(plan_json["multipart"], false);

    let complete_body = serde_json::json!({
        "id": id,
        "metadata": "eyJmaWxlcyI6W119",
        "actualSize": 1024,
    });
    let complete_response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/upload/complete")
                .header("content-type", "application/json")
                .body(Body::from(complete_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(complete_response.status(), StatusCode::OK);

    let exists_response = app
        .oneshot(
            Request::builder()
                .uri(format!("/exists/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(exists_response.status(), StatusCode::OK);
    let exists_body = exists_response.into_body().collect().await.unwrap().to_bytes();
    let exists_json: serde_json::Value = serde_json::from_slice(&exists_body).unwrap();
    assert_eq!(exists_json["exists"], true);
}

#[tokio::test]
async fn unknown_file_metadata_is_not_found() {
    let app = xfer_http::build(test_state());
    let response = app
        .oneshot(
            Request::builder()
                .uri("/metadata/0000000000000000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn multipart_plan_then_complete_round_trip() {
    let app = xfer_http::build(test_state());

    // 20 MiB exceeds the default 16 MiB multipart threshold.
    let plan_response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/upload/url")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"fileSize":20971520,"encrypted":false}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(plan_response.status(), StatusCode::OK);
    let plan_json = json_body(plan_response).await;
    assert_eq!(plan_json["multipart"], true);
    let id = plan_json["id"].as_str().unwrap().to_string();
    let parts = plan_json["parts"].as_array().unwrap();
    assert_eq!(parts.len(), 3);

    let complete_parts: Vec<_> = parts
        .iter()
        .map(|p| {
            serde_json::json!({
                "part_number": p["partNumber"],
                "etag": format!("etag-{}", p["partNumber"]),
            })
        })
        .collect();
    let complete_body = serde_json::json!({
        "id": id,
        "metadata": "eyJmaWxlcyI6W119",
        "actualSize": 20971520,
        "parts": complete_parts,
    });
    let complete_response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/upload/complete")
                .header("content-type", "application/json")
                .body(Body::from(complete_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(complete_response.status(), StatusCode::OK);
}

#[tokio::test]
async fn encrypted_file_requires_signature_and_rotates_nonce_on_every_attempt() {
    use base64::Engine;
    use hmac::{Hmac, Mac};
    use sha2::Sha256;
    type HmacSha256 = Hmac<Sha256>;

    let app = xfer_http::build(test_state());
    let auth_key = [9u8; 32];
    let auth_key_b64 = base64::engine::general_purpose::STANDARD.encode(auth_key);

    let plan_response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/upload/url")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"fileSize":1024,"encrypted":true}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    let plan_json = json_body(plan_response).await;
    let id = plan_json["id"].as_str().unwrap().to_string();

    let complete_body = serde_json::json!({
        "id": id,
        "metadata": "eyJmaWxlcyI6W119",
        "authKey": auth_key_b64,
        "actualSize": 1024,
    });
    let complete_response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/upload/complete")
                .header("content-type", "application/json")
                .body(Body::from(complete_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(complete_response.status(), StatusCode::OK);

    // No Authorization header: rejected, but a fresh challenge nonce comes back.
    let challenge_response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/metadata/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(challenge_response.status(), StatusCode::UNAUTHORIZED);
    let challenge = challenge_response
        .headers()
        .get("www-authenticate")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    let nonce_b64 = challenge.strip_prefix("send-v1 ").unwrap().to_string();

    let mut mac = HmacSha256::new_from_slice(&auth_key).unwrap();
    mac.update(nonce_b64.as_bytes());
    let sig = base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes());
    let header = format!("send-v1 {sig}");

    let authed_response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/metadata/{id}"))
                .header("authorization", &header)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(authed_response.status(), StatusCode::OK);

    // The nonce rotated on success too, so replaying the same signature fails.
    let replay_response = app
        .oneshot(
            Request::builder()
                .uri(format!("/metadata/{id}"))
                .header("authorization", &header)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(replay_response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn download_limit_reached_makes_the_file_gone() {
    let app = xfer_http::build(test_state());

    let plan_response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/upload/url")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"fileSize":1024,"encrypted":false,"dlimit":1}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    let plan_json = json_body(plan_response).await;
    let id = plan_json["id"].as_str().unwrap().to_string();

    let complete_body = serde_json::json!({
        "id": id,
        "metadata": "eyJmaWxlcyI6W119",
        "actualSize": 1024,
    });
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/upload/complete")
                .header("content-type", "application/json")
                .body(Body::from(complete_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let first_download = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/download/complete/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(first_download.status(), StatusCode::OK);
    let first_json = json_body(first_download).await;
    assert_eq!(first_json["deleted"], true);

    let second_url = app
        .oneshot(
            Request::builder()
                .uri(format!("/download/url/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(second_url.status(), StatusCode::GONE);
}

#[tokio::test]
async fn owner_actions_require_the_owner_token() {
    let app = xfer_http::build(test_state());

    let plan_response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/upload/url")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"fileSize":1024,"encrypted":false}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    let plan_json = json_body(plan_response).await;
    let id = plan_json["id"].as_str().unwrap().to_string();
    let owner = plan_json["owner"].as_str().unwrap().to_string();

    let complete_body = serde_json::json!({
        "id": id,
        "metadata": "eyJmaWxlcyI6W119",
        "actualSize": 1024,
    });
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/upload/complete")
                .header("content-type", "application/json")
                .body(Body::from(complete_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let wrong_owner_response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/info/{id}"))
                .header("content-type", "application/json")
                .body(Body::from(serde_json::json!({ "owner": "not-the-owner" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(wrong_owner_response.status(), StatusCode::UNAUTHORIZED);

    let info_response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/info/{id}"))
                .header("content-type", "application/json")
                .body(Body::from(serde_json::json!({ "owner": owner }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(info_response.status(), StatusCode::OK);
    let info_json = json_body(info_response).await;
    assert_eq!(info_json["dl"], 0);

    let params_response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/params/{id}"))
                .header("content-type", "application/json")
                .body(Body::from(serde_json::json!({ "owner": owner, "dlimit": 5 }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(params_response.status(), StatusCode::OK);

    let password_response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/password/{id}"))
                .header("content-type", "application/json")
                .body(Body::from(
                    serde_json::json!({ "owner": owner, "authKey": "not-applicable" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    // Password changes only apply to encrypted files; this one isn't.
    assert_eq!(password_response.status(), StatusCode::BAD_REQUEST);

    let delete_response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/delete/{id}"))
                .header("content-type", "application/json")
                .body(Body::from(serde_json::json!({ "owner": owner }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(delete_response.status(), StatusCode::OK);

    let info_after_delete = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/info/{id}"))
                .header("content-type", "application/json")
                .body(Body::from(serde_json::json!({ "owner": owner }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(info_after_delete.status(), StatusCode::UNAUTHORIZED);
}
