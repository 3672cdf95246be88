// src/web/assets.rs
// Embedded static assets for single-binary distribution

use axum::{
    extract::Path,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};

const APP_JS: &str = include_str!("../../assets/app.js");
const STYLE_CSS: &str = include_str!("../../assets/style.css");
const FAVICON_SVG: &str = include_str!("../../assets/favicon.svg");

fn lookup(path: &str) -> Option<&'static str> {
    match path {
        "app.js" => Some(APP_JS),
        "style.css" => Some(STYLE_CSS),
        "favicon.svg" => Some(FAVICON_SVG),
        _ => None,
    }
}

/// Content type guessed from the extension; text types get a charset
fn content_type(path: &str) -> String {
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    if mime.type_() == mime_guess::mime::TEXT || mime.subtype() == "javascript" {
        format!("{}; charset=utf-8", mime.essence_str())
    } else {
        mime.essence_str().to_string()
    }
}

fn serve_embedded(path: &str) -> Response {
    match lookup(path) {
        Some(content) => (
            [
                (header::CONTENT_TYPE, content_type(path)),
                (header::CACHE_CONTROL, "public, max-age=3600".to_string()),
            ],
            content,
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "Not Found").into_response(),
    }
}

pub async fn static_handler(Path(file): Path<String>) -> Response {
    serve_embedded(&file)
}

pub async fn favicon_handler() -> Response {
    serve_embedded("favicon.svg")
}
