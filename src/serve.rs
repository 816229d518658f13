//! The HTTP front end, built on [`tiny_http`].
//!
//! Requests are dispatched on their raw URL:
//!
//! - the blog prefix without its trailing slash redirects to the prefix,
//! - paths under the blog prefix go to the [`Router`] and are wrapped in the
//!   page [`Chrome`],
//! - paths under the static prefix are served from the static directory,
//! - everything else is a plain 404.
//!
//! A fixed pool of worker threads pulls requests from one shared server. The
//! [`Site`] they share is read-only.

use crate::chrome::{Chrome, Page};
use crate::router::Router;
use anyhow::{anyhow, Result};
use std::fs;
use std::io::{self, Cursor};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tiny_http::{Header, Request, Response, Server, StatusCode};
use tracing::{debug, info, warn};

/// Everything needed to answer requests.
#[derive(Debug)]
pub struct Site {
    pub router: Router,
    pub chrome: Chrome,
    pub statics: Option<StaticFiles>,
}

/// A static file tree mounted under a URL prefix.
#[derive(Clone, Debug)]
pub struct StaticFiles {
    prefix: String,
    root: PathBuf,
}

impl StaticFiles {
    pub fn new(prefix: impl Into<String>, root: impl Into<PathBuf>) -> StaticFiles {
        StaticFiles {
            prefix: prefix.into(),
            root: root.into(),
        }
    }

    /// Maps a prefix-relative, still percent-encoded path to a file under the
    /// root. Returns `None` for anything that isn't an existing file or that
    /// tries to leave the root.
    fn file(&self, relative: &str) -> Option<PathBuf> {
        let decoded = urlencoding::decode(relative).ok()?;
        let relative = Path::new(decoded.as_ref());
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return None;
        }
        let path = self.root.join(relative);
        if path.is_file() {
            Some(path)
        } else {
            None
        }
    }
}

/// Where a request is dispatched.
#[derive(Debug, PartialEq, Eq)]
enum Route<'a> {
    /// Permanent redirect to the given location.
    Redirect(&'a str),

    /// Handled by the slug router.
    Blog,

    /// A file from the static tree.
    Static(PathBuf),

    NotFound,
}

fn route<'a>(site: &'a Site, url: &str) -> Route<'a> {
    let path = match url.find(|c| c == '?' || c == '#') {
        Some(i) => &url[..i],
        None => url,
    };
    let blog_prefix = site.router.prefix();
    let statics = site
        .statics
        .as_ref()
        .filter(|statics| path.starts_with(&statics.prefix));

    // The longer matching prefix wins.
    match (path.starts_with(blog_prefix), statics) {
        (true, Some(statics)) if statics.prefix.len() > blog_prefix.len() => {
            static_route(statics, path)
        }
        (true, _) => Route::Blog,
        (false, Some(statics)) => static_route(statics, path),
        (false, None) if path.len() > 1 && Some(path) == blog_prefix.strip_suffix('/') => {
            Route::Redirect(blog_prefix)
        }
        (false, None) => Route::NotFound,
    }
}

fn static_route<'a>(statics: &StaticFiles, path: &str) -> Route<'a> {
    match statics.file(&path[statics.prefix.len()..]) {
        Some(file) => Route::Static(file),
        None => Route::NotFound,
    }
}

/// Binds `address` and answers requests on `threads` worker threads until
/// the server shuts down.
pub fn serve(site: Site, address: &str, threads: usize) -> Result<()> {
    let server = Server::http(address).map_err(|e| anyhow!("binding `{}`: {}", address, e))?;
    let server = Arc::new(server);
    let site = Arc::new(site);
    info!(%address, threads, prefix = site.router.prefix(), "listening");

    let workers = (0..threads.max(1))
        .map(|i| {
            let server = Arc::clone(&server);
            let site = Arc::clone(&site);
            thread::Builder::new()
                .name(format!("worker-{}", i))
                .spawn(move || work(&server, &site))
        })
        .collect::<io::Result<Vec<_>>>()?;

    for worker in workers {
        worker
            .join()
            .map_err(|_| anyhow!("worker thread panicked"))??;
    }
    Ok(())
}

fn work(server: &Server, site: &Site) -> Result<()> {
    let page = site.chrome.compile()?;
    for request in server.incoming_requests() {
        if let Err(e) = handle(site, &page, request) {
            warn!("request error: {}", e);
        }
    }
    Ok(())
}

type Body = Response<Cursor<Vec<u8>>>;

fn handle(site: &Site, page: &Page, request: Request) -> io::Result<()> {
    let started = Instant::now();
    let response = respond(site, page, request.url(), started);
    debug!(
        method = %request.method(),
        url = request.url(),
        status = response.status_code().0,
        elapsed_us = started.elapsed().as_micros() as u64,
        "handled request"
    );
    request.respond(response)
}

fn respond(site: &Site, page: &Page, url: &str, started: Instant) -> Body {
    match route(site, url) {
        Route::Redirect(location) => with_header(
            Response::from_string(format!("Moved to {}", location))
                .with_status_code(StatusCode(301)),
            "Location",
            location,
        ),
        Route::Blog => {
            let resolution = site.router.resolve(url);
            match page.render(resolution.body(), started.elapsed()) {
                Ok(html) => with_header(
                    Response::from_string(html)
                        .with_status_code(StatusCode(resolution.status())),
                    "Content-Type",
                    "text/html; charset=utf-8",
                ),
                Err(e) => {
                    warn!(%url, "{}", e);
                    plain(500, "500 Internal Server Error")
                }
            }
        }
        Route::Static(path) => match fs::read(&path) {
            Ok(data) => with_header(
                Response::from_data(data),
                "Content-Type",
                guess_content_type(&path),
            ),
            Err(e) => {
                warn!(path = %path.display(), "reading static file: {}", e);
                plain(404, "404 Not Found")
            }
        },
        Route::NotFound => plain(404, "404 Not Found"),
    }
}

fn plain(status: u16, text: &str) -> Body {
    with_header(
        Response::from_string(text).with_status_code(StatusCode(status)),
        "Content-Type",
        "text/plain; charset=utf-8",
    )
}

fn with_header(response: Body, field: &str, value: &str) -> Body {
    match Header::from_bytes(field.as_bytes(), value.as_bytes()) {
        Ok(header) => response.with_header(header),
        Err(()) => {
            warn!(field, value, "dropping invalid header");
            response
        }
    }
}

/// Guess MIME content type from file extension.
fn guess_content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js" | "mjs") => "application/javascript; charset=utf-8",
        Some("json") => "application/json; charset=utf-8",
        Some("txt") => "text/plain; charset=utf-8",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",
        Some("otf") => "font/otf",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chrome::DEFAULT_TEMPLATE;
    use crate::index::Index;
    use crate::post::Post;
    use std::io::Read;
    use tempfile::TempDir;

    fn site(blog_prefix: &str, statics: Option<StaticFiles>) -> Site {
        let index = Index::from_posts(vec![Post {
            title: String::from("Hello World"),
            slug: String::from("hello-world"),
            content: String::from("<p>hello body</p>\n"),
            source: PathBuf::from("hello-world.md"),
        }])
        .unwrap();
        Site {
            router: Router::new(blog_prefix, index),
            chrome: Chrome::new("<main>{{ .body }}</main>", "Test", "/fonts/", None).unwrap(),
            statics,
        }
    }

    fn static_tree() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("fonts.css"), "body {}").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("a b.txt"), "spaced").unwrap();
        dir
    }

    fn body(response: Body) -> String {
        let mut out = String::new();
        response.into_reader().read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn test_route_blog() {
        let site = site("/blog/", None);
        assert_eq!(Route::Blog, route(&site, "/blog/"));
        assert_eq!(Route::Blog, route(&site, "/blog/hello-world"));
        assert_eq!(Route::Blog, route(&site, "/blog/anything?x=1"));
        assert_eq!(Route::Redirect("/blog/"), route(&site, "/blog"));
        assert_eq!(Route::Redirect("/blog/"), route(&site, "/blog?x=1"));
        assert_eq!(Route::NotFound, route(&site, "/"));
        assert_eq!(Route::NotFound, route(&site, "/blogs"));
    }

    #[test]
    fn test_route_root_prefix_never_redirects() {
        let site = site("/", None);
        assert_eq!(Route::Blog, route(&site, "/"));
        assert_eq!(Route::Blog, route(&site, "/hello-world"));
        assert_eq!(
            Route::Static(dir.path().join("fonts.css")),
            route(&site, "/fonts/fonts.css?v=2#top")
        );
        assert_eq!(Route::Blog, route(&site, "/hello-world?from=feed"));
    }

    #[test]
    fn test_route_static() {
        let dir = static_tree();
        let site = site("/blog/", Some(StaticFiles::new("/fonts/", dir.path())));
        assert_eq!(
            Route::Static(dir.path().join("fonts.css")),
            route(&site, "/fonts/fonts.css?v=2")
        );
        assert_eq!(
            Route::Static(dir.path().join("sub").join("a b.txt")),
            route(&site, "/fonts/sub/a%20b.txt")
        );
        assert_eq!(Route::NotFound, route(&site, "/fonts/missing.css"));
        assert_eq!(Route::NotFound, route(&site, "/fonts/sub"));
        assert_eq!(Route::NotFound, route(&site, "/fonts/"));
        assert_eq!(Route::NotFound, route(&site, "/fonts/../secret"));
        assert_eq!(Route::NotFound, route(&site, "/fonts/%2e%2e/secret"));
        assert_eq!(Route::NotFound, route(&site, "/fonts//etc/passwd"));
    }

    #[test]
    fn test_route_longest_prefix_wins() {
        let dir = static_tree();
        let site = site("/", Some(StaticFiles::new("/fonts/", dir.path())));
        assert_eq!(
            Route::Static(dir.path().join("fonts.css")),
            route(&site, "/fonts/fonts.css")
        );
        assert_eq!(Route::Blog, route(&site, "/hello-world"));
    }

    #[test]
    fn test_respond_document_and_listing() {
        let site = site("/blog/", None);
        let page = site.chrome.compile().unwrap();

        let response = respond(&site, &page, "/blog/Hello-World/", Instant::now());
        assert_eq!(200, response.status_code().0);
        assert_eq!("<main><p>hello body</p>\n</main>", body(response));

        let response = respond(&site, &page, "/blog/", Instant::now());
        assert_eq!(200, response.status_code().0);
        assert!(body(response).contains("<a href=\"/blog/hello-world\">Hello World</a>"));
    }

    #[test]
    fn test_respond_follows_escaped_listing_links() {
        let index = Index::from_posts(vec![Post {
            title: String::from("Café"),
            slug: String::from("café"),
            content: String::from("<p>coffee</p>\n"),
            source: PathBuf::from("cafe.md"),
        }])
        .unwrap();
        let mut site = site("/blog/", None);
        site.router = Router::new("/blog/", index);
        let page = site.chrome.compile().unwrap();

        let listing = body(respond(&site, &page, "/blog/", Instant::now()));
        let href = listing
            .split("href=\"")
            .nth(1)
            .and_then(|rest| rest.split('"').next())
            .unwrap()
            .to_owned();
        assert_eq!("/blog/caf%C3%A9", href);

        let response = respond(&site, &page, &href, Instant::now());
        assert_eq!(200, response.status_code().0);
        assert_eq!("<main><p>coffee</p>\n</main>", body(response));
    }

    #[test]
    fn test_respond_unknown_slug() {
        let site = site("/blog/", None);
        let page = site.chrome.compile().unwrap();
        let response = respond(&site, &page, "/blog/does-not-exist", Instant::now());
        assert_eq!(404, response.status_code().0);
        assert_eq!("<main>Invalid slug does-not-exist.</main>", body(response));
    }

    #[test]
    fn test_respond_redirect_and_not_found() {
        let site = site("/blog/", None);
        let page = site.chrome.compile().unwrap();

        let response = respond(&site, &page, "/blog", Instant::now());
        assert_eq!(301, response.status_code().0);
        assert!(response
            .headers()
            .iter()
            .any(|h| h.field.equiv("Location") && h.value.as_str() == "/blog/"));

        let response = respond(&site, &page, "/nowhere", Instant::now());
        assert_eq!(404, response.status_code().0);
    }

    #[test]
    fn test_respond_static() {
        let dir = static_tree();
        let site = site("/blog/", Some(StaticFiles::new("/fonts/", dir.path())));
        let page = site.chrome.compile().unwrap();
        let response = respond(&site, &page, "/fonts/fonts.css", Instant::now());
        assert_eq!(200, response.status_code().0);
        assert!(response
            .headers()
            .iter()
            .any(|h| h.field.equiv("Content-Type") && h.value.as_str().starts_with("text/css")));
        assert_eq!("body {}", body(response));
    }

    #[test]
    fn test_default_template_wraps_pages() {
        let mut site = site("/blog/", None);
        site.chrome = Chrome::new(DEFAULT_TEMPLATE, "Test", "/fonts/", None).unwrap();
        let page = site.chrome.compile().unwrap();
        let html = body(respond(&site, &page, "/blog/hello-world", Instant::now()));
        assert!(html.starts_with("<html>"));
        assert!(html.contains("<p>hello body</p>"));
    }
}
