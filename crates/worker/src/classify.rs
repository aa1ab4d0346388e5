//! Request classification by URL shape.
//!
//! A total function from a URL path onto [`RequestClass`]. Only the last path
//! segment is inspected, so dots in directory names do not count as
//! extensions.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static STATIC_ASSET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(css|js|mjs|woff2?|ttf|eot|otf)$").expect("static asset pattern"));

static IMAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(png|jpe?g|gif|webp|avif|svg|ico|bmp)$").expect("image pattern"));

static HTML: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\.html?$").expect("html pattern"));

/// Traffic class of an intercepted request. Decides the strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestClass {
    /// Stylesheets, scripts, fonts: cache-first with background refresh.
    Static,
    /// Bitmap and vector images: cache-first with placeholder fallback.
    Image,
    /// Pages: network-first with offline page fallback.
    Html,
    /// Anything else: network-first with a 503 fallback.
    Other,
}

fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or("")
}

/// Classify a request path. First match wins: static, image, html, other.
pub fn classify(path: &str) -> RequestClass {
    let segment = last_segment(path);

    if STATIC_ASSET.is_match(segment) {
        RequestClass::Static
    } else if IMAGE.is_match(segment) {
        RequestClass::Image
    } else if path == "/" || HTML.is_match(segment) || !segment.contains('.') {
        RequestClass::Html
    } else {
        RequestClass::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_assets() {
        for path in ["/css/styles.css", "/js/main.js", "/fonts/inter.woff2", "/fonts/inter.woff", "/fonts/a.TTF"] {
            assert_eq!(classify(path), RequestClass::Static, "{path}");
        }
    }

    #[test]
    fn test_images() {
        for path in ["/images/profile.jpg", "/images/logo.svg", "/favicon.ico", "/images/hero.WEBP", "/a.jpeg"] {
            assert_eq!(classify(path), RequestClass::Image, "{path}");
        }
    }

    #[test]
    fn test_html_pages() {
        for path in ["/", "/index.html", "/about.htm", "/projects", "/blog/post-1", "/v1.2/about"] {
            assert_eq!(classify(path), RequestClass::Html, "{path}");
        }
    }

    #[test]
    fn test_other() {
        for path in ["/manifest.json", "/resume.pdf", "/sitemap.xml", "/data/projects.json"] {
            assert_eq!(classify(path), RequestClass::Other, "{path}");
        }
    }

    #[test]
    fn test_static_wins_over_html_rule() {
        assert_eq!(classify("/js/app.min.js"), RequestClass::Static);
    }

    #[test]
    fn test_trailing_slash_is_html() {
        assert_eq!(classify("/projects/"), RequestClass::Html);
    }
}
