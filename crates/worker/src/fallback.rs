//! Responses synthesized when both network and cache fail.
//!
//! None of these are stored; each failure builds a fresh one.

use crate::response::Response;

const PLACEHOLDER_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="400" height="300" viewBox="0 0 400 300" role="img" aria-label="Image unavailable">
  <rect width="400" height="300" fill="#f3f4f6"/>
  <path d="M170 170l20-25 15 18 10-12 25 30h-70z" fill="#d1d5db"/>
  <circle cx="180" cy="130" r="8" fill="#d1d5db"/>
  <text x="200" y="215" text-anchor="middle" font-family="system-ui, sans-serif" font-size="14" fill="#9ca3af">Image unavailable offline</text>
</svg>"##;

const OFFLINE_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>Offline | Portfolio</title>
  <style>
    body { font-family: system-ui, sans-serif; display: flex; align-items: center; justify-content: center; min-height: 100vh; margin: 0; background: #f9fafb; color: #111827; }
    main { text-align: center; padding: 2rem; max-width: 32rem; }
    h1 { font-size: 2rem; margin-bottom: 0.5rem; }
    p { color: #4b5563; line-height: 1.5; }
    button { margin-top: 1.5rem; padding: 0.75rem 1.5rem; border: 0; border-radius: 0.5rem; background: #2563eb; color: #fff; font-size: 1rem; cursor: pointer; }
  </style>
</head>
<body>
  <main>
    <h1>You're Offline</h1>
    <p>This page isn't available without a connection. Pages you have already visited are still available, and this one will load once you're back online.</p>
    <button type="button" onclick="window.location.reload()">Try Again</button>
  </main>
</body>
</html>
"#;

/// Inline SVG placeholder image. Cacheable by the client for a day.
pub fn placeholder_image() -> Response {
    Response::synthesized(
        200,
        &[("content-type", "image/svg+xml"), ("cache-control", "public, max-age=86400")],
        PLACEHOLDER_SVG,
    )
}

/// Offline page served for HTML requests with no network and no cached copy.
pub fn offline_page() -> Response {
    Response::synthesized(
        200,
        &[("content-type", "text/html; charset=utf-8"), ("cache-control", "no-cache")],
        OFFLINE_PAGE,
    )
}

/// Generic content with no network and no cached copy.
pub fn offline_text() -> Response {
    Response::synthesized(503, &[("content-type", "text/plain; charset=utf-8")], "Offline")
}

/// Last resort when routing itself failed.
pub fn service_unavailable() -> Response {
    Response::synthesized(503, &[("content-type", "text/plain; charset=utf-8")], "Service Unavailable")
}
