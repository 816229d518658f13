//! Defines the [`Index`] of posts and [`build`], which loads every post in a
//! content root. The index is built once at startup and never mutated
//! afterwards.

use crate::markdown::{Error as TransformError, Transform};
use crate::post::{MetadataError, Post};
use std::collections::hash_map::{Entry, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Source documents are files directly under the content root with this
/// extension.
pub const MARKDOWN_EXTENSION: &str = ".md";

/// A `slug → Post` mapping. Slugs are unique.
#[derive(Clone, Debug, Default)]
pub struct Index {
    posts: HashMap<String, Post>,
}

impl Index {
    /// Builds an index from already-rendered posts, rejecting duplicate slugs
    /// the same way [`build`] does.
    pub fn from_posts(posts: impl IntoIterator<Item = Post>) -> Result<Index> {
        let mut index = Index::default();
        for post in posts {
            index.insert(post)?;
        }
        Ok(index)
    }

    fn insert(&mut self, post: Post) -> Result<()> {
        match self.posts.entry(post.slug.clone()) {
            Entry::Occupied(existing) => Err(Error::DuplicateSlug {
                slug: post.slug,
                first: existing.get().source.clone(),
                second: post.source,
            }),
            Entry::Vacant(vacant) => {
                vacant.insert(post);
                Ok(())
            }
        }
    }

    /// Looks up a post by its exact slug.
    pub fn get(&self, slug: &str) -> Option<&Post> {
        self.posts.get(slug)
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    /// Iterates over every post once, in no particular order.
    pub fn posts(&self) -> impl Iterator<Item = &Post> {
        self.posts.values()
    }
}

/// Loads every document directly under `root` into an [`Index`]. Entries are
/// visited in file-name order; directories and files without the
/// [`MARKDOWN_EXTENSION`] are skipped. Each document is passed through
/// `transform` and must declare a string `title` and `slug`.
///
/// The first failure aborts the build: a site with missing or shadowed posts
/// is never produced.
pub fn build<T: Transform + ?Sized>(root: &Path, transform: &T) -> Result<Index> {
    let metadata = std::fs::metadata(root).map_err(|err| Error::Read {
        path: root.to_owned(),
        err,
    })?;
    if !metadata.is_dir() {
        return Err(Error::Read {
            path: root.to_owned(),
            err: io::Error::new(io::ErrorKind::InvalidInput, "not a directory"),
        });
    }

    let mut index = Index::default();
    let entries = WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .sort_by(|a, b| a.file_name().cmp(b.file_name()));

    for result in entries {
        let entry = result.map_err(|err| Error::Read {
            path: err.path().unwrap_or(root).to_owned(),
            err: io::Error::from(err),
        })?;
        if entry.file_type().is_dir() {
            continue;
        }
        let source = PathBuf::from(entry.file_name());
        if !entry.file_name().to_string_lossy().ends_with(MARKDOWN_EXTENSION) {
            debug!(file = %source.display(), "skipping non-markdown file");
            continue;
        }

        let post = load(entry.path(), source, transform)?;
        debug!(slug = %post.slug, file = %post.source.display(), "loaded post");
        index.insert(post)?;
    }

    info!(root = %root.display(), posts = index.len(), "built post index");
    Ok(index)
}

fn load<T: Transform + ?Sized>(path: &Path, source: PathBuf, transform: &T) -> Result<Post> {
    let contents = std::fs::read(path).map_err(|err| Error::Read {
        path: path.to_owned(),
        err,
    })?;
    let rendered = transform
        .transform(&contents)
        .map_err(|err| Error::Transform {
            path: source.clone(),
            err,
        })?;
    Post::from_rendered(source.clone(), rendered)
        .map_err(|err| Error::MissingMetadata { path: source, err })
}

/// The result of building an [`Index`].
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a failure to build the [`Index`]. Every variant is fatal: the
/// site must not be served from a partial corpus.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned when the content root or a document couldn't be read.
    #[error("reading `{}`: {err}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        err: io::Error,
    },

    /// Returned when the markup transform rejected a document.
    #[error("rendering `{}`: {err}", path.display())]
    Transform {
        path: PathBuf,
        #[source]
        err: TransformError,
    },

    /// Returned when a document lacks a string `title` or `slug`.
    #[error("loading `{}`: {err}", path.display())]
    MissingMetadata {
        path: PathBuf,
        #[source]
        err: MetadataError,
    },

    /// Returned when two documents declare the same slug.
    #[error(
        "slug `{slug}` is declared by both `{}` and `{}`",
        first.display(),
        second.display()
    )]
    DuplicateSlug {
        slug: String,
        first: PathBuf,
        second: PathBuf,
    },
}
