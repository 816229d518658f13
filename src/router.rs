//! Resolves request paths against an [`Index`].
//!
//! Request paths are normalized before lookup:
//!
//! 1. everything from the first `#` or `?` is dropped,
//! 2. percent-escapes are decoded,
//! 3. the routing prefix is stripped,
//! 4. one trailing `/` is removed,
//! 5. the path is folded to lowercase.
//!
//! An empty result selects the listing of every post. Anything else is looked
//! up as a slug; unknown slugs produce an "invalid slug" message rather than
//! an error.

use crate::escape::{EscapeHref, EscapeHtml};
use crate::index::Index;
use crate::post::Post;
use std::borrow::Cow;
use tracing::warn;

/// Routes request paths under a fixed prefix to posts. Owns the [`Index`] and
/// never mutates it, so a single router can be shared across threads.
#[derive(Debug)]
pub struct Router {
    prefix: String,
    index: Index,
    listing: String,
}

/// What a request path resolved to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    Listing,
    Document,
    NotFound,
}

/// The outcome of [`Router::resolve`].
#[derive(Debug, PartialEq, Eq)]
pub enum Resolution<'a> {
    /// The link list of every post.
    Listing(&'a str),

    /// A single post.
    Document(&'a Post),

    /// No post has the requested slug. `message` is the HTML shown in its
    /// place.
    NotFound { slug: String, message: String },
}

impl Resolution<'_> {
    pub fn kind(&self) -> Kind {
        match self {
            Resolution::Listing(_) => Kind::Listing,
            Resolution::Document(_) => Kind::Document,
            Resolution::NotFound { .. } => Kind::NotFound,
        }
    }

    /// The HTML fragment to send.
    pub fn body(&self) -> &str {
        match self {
            Resolution::Listing(listing) => listing,
            Resolution::Document(post) => &post.content,
            Resolution::NotFound { message, .. } => message,
        }
    }

    /// The HTTP status code for this outcome.
    pub fn status(&self) -> u16 {
        match self.kind() {
            Kind::Listing | Kind::Document => 200,
            Kind::NotFound => 404,
        }
    }
}

impl Router {
    /// Creates a router serving `index` under `prefix` (e.g. `/blog/`). The
    /// listing is rendered here, once.
    pub fn new(prefix: impl Into<String>, index: Index) -> Router {
        let prefix = prefix.into();
        for post in index.posts() {
            if post.slug.is_empty() || normalize_slug(&post.slug) != post.slug {
                warn!(
                    slug = %post.slug,
                    file = %post.source.display(),
                    "slug cannot be reached by any request path"
                );
            }
        }
        let listing = render_listing(&prefix, &index);
        Router {
            prefix,
            index,
            listing,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    /// Resolves `request_path` to the listing, a post, or a not-found
    /// message. Never fails and has no side effects.
    pub fn resolve<'a>(&'a self, request_path: &str) -> Resolution<'a> {
        let slug = normalize(&self.prefix, request_path);
        if slug.is_empty() {
            return Resolution::Listing(&self.listing);
        }
        match self.index.get(&slug) {
            Some(post) => Resolution::Document(post),
            None => Resolution::NotFound {
                message: format!("Invalid slug {}.", EscapeHtml(&slug)),
                slug: slug.into_owned(),
            },
        }
    }
}

/// Strips `prefix` from `request_path` (if present) and normalizes the rest.
pub fn normalize<'p>(prefix: &str, request_path: &'p str) -> Cow<'p, str> {
    let path = match request_path.find(|c| c == '#' || c == '?') {
        Some(i) => &request_path[..i],
        None => request_path,
    };
    // Undecodable escapes (invalid UTF-8) are looked up as written.
    let path = urlencoding::decode(path).unwrap_or(Cow::Borrowed(path));
    let path = match path {
        Cow::Borrowed(path) => Cow::Borrowed(trim(prefix, path)),
        Cow::Owned(path) => Cow::Owned(trim(prefix, &path).to_owned()),
    };
    if path.chars().all(|c| c.to_lowercase().eq(std::iter::once(c))) {
        path
    } else {
        Cow::Owned(path.to_lowercase())
    }
}

/// Normalizes a path that carries no routing prefix.
pub fn normalize_slug(path: &str) -> Cow<'_, str> {
    normalize("", path)
}

fn trim<'a>(prefix: &str, path: &'a str) -> &'a str {
    let path = path.strip_prefix(prefix).unwrap_or(path);
    path.strip_suffix('/').unwrap_or(path)
}

fn render_listing(prefix: &str, index: &Index) -> String {
    let mut posts: Vec<&Post> = index.posts().collect();
    posts.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.slug.cmp(&b.slug)));

    let mut listing = String::from("<p>Blog Posts:</p>\n<ul>\n");
    for post in posts {
        listing.push_str(&format!(
            "<li><a href=\"{}{}\">{}</a></li>\n",
            EscapeHref(prefix),
            EscapeHref(&post.slug),
            EscapeHtml(&post.title),
        ));
    }
    listing.push_str("</ul>\n");
    listing
}
