//! HTTP front end: an upload page and a scan endpoint.

use crate::{
    error::InputError,
    models::{ImagePayload, ScanResponse},
    pipeline::MenuScanner,
};
use actix_multipart::Multipart;
use actix_web::{
    http::header::{self, ContentType},
    web, App, HttpRequest, HttpResponse, HttpServer, Responder,
};
use futures::{Stream, StreamExt};
use serde_json::json;

pub const PAGE_TITLE: &str = "Find the dish!";
pub const BAD_UPLOAD_MESSAGE: &str = "No file uploaded or file size too large.";
pub const SCAN_FAILED_MESSAGE: &str = "Error processing the menu image.";

/// Form field carrying the menu photo.
pub const FILE_FIELD: &str = "file";

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html>
  <head><meta charset="utf-8"><title>{title}</title></head>
  <body>
    <h1>{title}</h1>
    <input type="file" id="file" accept="image/*">
    <button onclick="scan()">Upload</button>
    <ul id="dishes"></ul>
    <script>
      async function scan() {
        const file = document.getElementById('file').files[0];
        const form = new FormData();
        if (file) form.append('file', file);
        const res = await fetch('/', { method: 'POST', body: form });
        const list = document.getElementById('dishes');
        list.innerHTML = '';
        if (!res.ok) { list.textContent = await res.text(); return; }
        for (const dish of (await res.json()).dishes) {
          const item = document.createElement('li');
          item.textContent = dish.name + ' - ' + dish.price;
          list.appendChild(item);
        }
      }
    </script>
  </body>
</html>
"#;

pub fn configure(scanner: MenuScanner) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg: &mut web::ServiceConfig| {
        cfg.app_data(web::Data::new(scanner))
            .route("/", web::get().to(index))
            .route("/", web::post().to(scan))
            .route("/health", web::get().to(health));
    }
}

pub async fn run(scanner: MenuScanner, port: u16) -> std::io::Result<()> {
    log::info!("🌐 Listening on http://0.0.0.0:{}", port);
    HttpServer::new(move || App::new().configure(configure(scanner.clone())))
        .bind(("0.0.0.0", port))?
        .run()
        .await
}

async fn index() -> impl Responder {
    HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(INDEX_HTML.replace("{title}", PAGE_TITLE))
}

async fn health() -> impl Responder {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

/// Reads the image from a `multipart/form-data` body (the `file` field) or,
/// for any other content type, from the raw body.
async fn read_upload(
    req: &HttpRequest,
    payload: web::Payload,
    limit: usize,
) -> Result<ImagePayload, InputError> {
    let is_multipart = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map_or(false, |value| {
            value.trim_start().to_ascii_lowercase().starts_with("multipart/form-data")
        });

    let bytes = if is_multipart {
        let mut form = Multipart::new(req.headers(), payload);
        let mut file = None;
        while let Some(field) = form.next().await {
            let field = field.map_err(|e| InputError::Malformed(e.to_string()))?;
            if field.content_disposition().get_name() == Some(FILE_FIELD) {
                file = Some(read_limited(field, limit).await?);
                break;
            }
        }
        file.ok_or(InputError::Missing)?
    } else {
        read_limited(payload, limit).await?
    };

    ImagePayload::new(bytes, limit)
}

/// Collects a body stream, giving up as soon as it grows past `limit`.
async fn read_limited<S, E>(stream: S, limit: usize) -> Result<Vec<u8>, InputError>
where
    S: Stream<Item = Result<web::Bytes, E>>,
    E: std::fmt::Display,
{
    futures::pin_mut!(stream);
    let mut bytes = Vec::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| InputError::Malformed(e.to_string()))?;
        bytes.extend_from_slice(&chunk);
        if bytes.len() > limit {
            return Err(InputError::TooLarge {
                size: bytes.len(),
                limit,
            });
        }
    }
    Ok(bytes)
}

async fn scan(
    scanner: web::Data<MenuScanner>,
    req: HttpRequest,
    body: web::Payload,
) -> HttpResponse {
    let payload = match read_upload(&req, body, scanner.upload_limit()).await {
        Ok(payload) => {
            log::debug!("📥 Received {} byte image", payload.len());
            payload
        }
        Err(e) => {
            log::warn!("⚠️  Rejected upload: {}", e);
            return HttpResponse::BadRequest().body(BAD_UPLOAD_MESSAGE);
        }
    };

    match scanner.scan_payload(payload).await {
        Ok(dishes) => HttpResponse::Ok().json(ScanResponse { dishes }),
        Err(e) => {
            log::error!("❌ Menu scan failed: {}", e);
            HttpResponse::InternalServerError().body(SCAN_FAILED_MESSAGE)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::StubVisionClient;
    use actix_web::{http::StatusCode, test};
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use std::sync::Arc;

    const BOUNDARY: &str = "XYZ";

    fn scanner(stub: StubVisionClient) -> MenuScanner {
        scanner_shared(Arc::new(stub))
    }

    fn scanner_shared(stub: Arc<StubVisionClient>) -> MenuScanner {
        MenuScanner::new(stub, "gpt-4o-mini").with_upload_limit(16)
    }

    fn multipart_body(parts: &[(&str, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, data) in parts {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            if *name == FILE_FIELD {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"menu.jpg\"\r\nContent-Type: image/jpeg\r\n\r\n",
                        name
                    )
                    .as_bytes(),
                );
            } else {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                );
            }
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    fn multipart_request(parts: &[(&str, &[u8])]) -> test::TestRequest {
        test::TestRequest::post()
            .uri("/")
            .insert_header((
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            ))
            .set_payload(multipart_body(parts))
    }

    #[actix_web::test]
    async fn test_index_page() {
        let app = test::init_service(App::new().configure(configure(scanner(StubVisionClient::no_match())))).await;
        let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = test::read_body(resp).await;
        assert!(String::from_utf8_lossy(&body).contains("<title>Find the dish!</title>"));
    }

    #[actix_web::test]
    async fn test_scan_returns_dishes() {
        let stub = StubVisionClient::with_fragments([
            "```json\n{\"dishes\":[{\"name\":\"Tatar\",\"price\":\"35 PLN\"}]}\n```",
        ]);
        let app = test::init_service(App::new().configure(configure(scanner(stub)))).await;
        let req = test::TestRequest::post()
            .uri("/")
            .set_payload(&b"\xff\xd8\xff\xe0"[..])
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!({ "dishes": [{ "name": "Tatar", "price": "35 PLN" }] }));
    }

    #[actix_web::test]
    async fn test_bad_uploads_are_400() {
        let app = test::init_service(App::new().configure(configure(scanner(StubVisionClient::no_match())))).await;

        let empty = test::TestRequest::post().uri("/").to_request();
        let resp = test::call_service(&app, empty).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(test::read_body(resp).await, BAD_UPLOAD_MESSAGE.as_bytes());

        let oversized = test::TestRequest::post()
            .uri("/")
            .set_payload(vec![0u8; 17])
            .to_request();
        let resp = test::call_service(&app, oversized).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_pipeline_failures_are_500() {
        let stub = StubVisionClient::with_fragments(["not json"]);
        let app = test::init_service(App::new().configure(configure(scanner(stub)))).await;
        let req = test::TestRequest::post().uri("/").set_payload(&b"menu"[..]).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(test::read_body(resp).await, SCAN_FAILED_MESSAGE.as_bytes());
    }

    #[actix_web::test]
    async fn test_multipart_upload_sends_only_file_bytes() {
        let stub = Arc::new(StubVisionClient::with_fragments([
            "{\"dishes\":[{\"name\":\"Pierogi\",\"price\":\"24 zł\"}]}",
        ]));
        let app = test::init_service(App::new().configure(configure(scanner_shared(stub.clone())))).await;

        let req = multipart_request(&[("note", &b"lunch menu"[..]), (FILE_FIELD, &b"JPEGDATA"[..])]).to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!({ "dishes": [{ "name": "Pierogi", "price": "24 zł" }] }));

        let request = stub.last_request().unwrap();
        assert_eq!(STANDARD.decode(&request.image_base64).unwrap(), b"JPEGDATA");
    }

    #[actix_web::test]
    async fn test_multipart_without_file_field_is_400() {
        let stub = Arc::new(StubVisionClient::no_match());
        let app = test::init_service(App::new().configure(configure(scanner_shared(stub.clone())))).await;

        let resp = test::call_service(&app, multipart_request(&[("note", &b"JPEGDATA"[..])]).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(test::read_body(resp).await, BAD_UPLOAD_MESSAGE.as_bytes());
        assert!(stub.last_request().is_none());
    }

    #[actix_web::test]
    async fn test_oversized_multipart_file_is_400() {
        let stub = Arc::new(StubVisionClient::no_match());
        let app = test::init_service(App::new().configure(configure(scanner_shared(stub.clone())))).await;

        let resp = test::call_service(&app, multipart_request(&[(FILE_FIELD, &[b'A'; 17][..])]).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(stub.last_request().is_none());

        let resp = test::call_service(&app, multipart_request(&[(FILE_FIELD, &[b'A'; 16][..])]).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
