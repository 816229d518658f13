//! Defines the [`Post`] type and the typed extraction of its required
//! metadata fields from a [`Rendered`] document.

use crate::markdown::{Metadata, Rendered};
use serde_yaml::Value;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The metadata key holding a post's title.
pub const TITLE: &str = "title";

/// The metadata key holding a post's slug.
pub const SLUG: &str = "slug";

/// The rendered form of a source document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Post {
    /// The human-readable display name.
    pub title: String,

    /// The URL identifier, stored exactly as the document declared it.
    pub slug: String,

    /// The rendered HTML of the document body.
    pub content: String,

    /// The file name of the source document relative to the content root.
    /// Only used to annotate errors and logs.
    pub source: PathBuf,
}

impl Post {
    /// Builds a [`Post`] from a transformed document. Fails if either `title`
    /// or `slug` is absent from the metadata or isn't a string.
    pub fn from_rendered(source: PathBuf, rendered: Rendered) -> Result<Post, MetadataError> {
        let title = required(&rendered.metadata, TITLE)?;
        let slug = required(&rendered.metadata, SLUG)?;
        Ok(Post {
            title,
            slug,
            content: rendered.html,
            source,
        })
    }
}

fn required(metadata: &Metadata, key: &'static str) -> Result<String, MetadataError> {
    match metadata.get(key) {
        Some(Value::String(value)) => Ok(value.clone()),
        Some(other) => Err(MetadataError {
            key,
            problem: Problem::NotAString(kind(other)),
        }),
        None => Err(MetadataError {
            key,
            problem: Problem::Absent,
        }),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
    }
}

/// Returned when a required metadata field is absent or mistyped.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("metadata field `{key}` {problem}")]
pub struct MetadataError {
    /// The required key.
    pub key: &'static str,

    /// What was wrong with it.
    pub problem: Problem,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Problem {
    Absent,

    /// The field was present; carries a description of what it held instead.
    NotAString(&'static str),
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Problem::Absent => write!(f, "is missing"),
            Problem::NotAString(found) => write!(f, "must be a string, found {}", found),
        }
    }
}
