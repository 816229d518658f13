//! Defines the [`Transform`] trait, the capability that turns raw document
//! bytes into an HTML fragment plus a metadata map, and [`Markdown`], the
//! transform used for posts.
//!
//! A markdown document may begin with a YAML metadata block fenced by lines
//! consisting of `---`:
//!
//! ```md
//! ---
//! title: Hello, world!
//! slug: hello-world
//! ---
//! # Hello
//!
//! World
//! ```
//!
//! The metadata block is removed before the body is rendered.

use pulldown_cmark::{html, Options, Parser};
use serde_yaml::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Metadata extracted from a document. Keys are arbitrary strings; values are
/// whatever the metadata block declared.
pub type Metadata = HashMap<String, Value>;

/// The output of a [`Transform`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Rendered {
    /// The rendered HTML fragment for the document body.
    pub html: String,

    /// The metadata block, if any. Empty when the document has none.
    pub metadata: Metadata,
}

/// Converts raw document bytes into a [`Rendered`] fragment. Any
/// implementation that extracts `title` and `slug` as string metadata can
/// stand in for [`Markdown`].
pub trait Transform {
    fn transform(&self, source: &[u8]) -> Result<Rendered>;
}

/// Renders markdown with [`pulldown_cmark`], reading metadata from a leading
/// YAML block.
#[derive(Clone, Copy, Debug, Default)]
pub struct Markdown;

impl Transform for Markdown {
    fn transform(&self, source: &[u8]) -> Result<Rendered> {
        let input = std::str::from_utf8(source)?;
        let input = input.strip_prefix('\u{feff}').unwrap_or(input);
        let (frontmatter, body) = split_frontmatter(input)?;
        let metadata = match frontmatter {
            Some(yaml) => parse_metadata(yaml)?,
            None => Metadata::new(),
        };
        Ok(Rendered {
            html: to_html(body),
            metadata,
        })
    }
}

/// Converts markdown to HTML.
pub fn to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, Parser::new_ext(markdown, options));
    out
}

const FENCE: &str = "---";

/// Splits `input` into its metadata block (without fences) and its body. A
/// document whose first line isn't a fence has no metadata block.
fn split_frontmatter(input: &str) -> Result<(Option<&str>, &str)> {
    let mut lines = input.split_inclusive('\n');
    let yaml_start = match lines.next() {
        Some(first) if first.trim_end() == FENCE => first.len(),
        _ => return Ok((None, input)),
    };

    let mut offset = yaml_start;
    for line in lines {
        if line.trim_end() == FENCE {
            return Ok((
                Some(&input[yaml_start..offset]),
                &input[offset + line.len()..],
            ));
        }
        offset += line.len();
    }
    Err(Error::FrontmatterMissingEndFence)
}

fn parse_metadata(yaml: &str) -> Result<Metadata> {
    if yaml.trim().is_empty() {
        return Ok(Metadata::new());
    }

    match serde_yaml::from_str::<Value>(yaml)? {
        Value::Null => Ok(Metadata::new()),
        Value::Mapping(mapping) => mapping
            .into_iter()
            .map(|(key, value)| match key {
                Value::String(key) => Ok((key, value)),
                other => Err(Error::NonStringKey(format!("{:?}", other))),
            })
            .collect(),
        _ => Err(Error::FrontmatterNotAMapping),
    }
}

/// The result of a fallible transform.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error converting a document.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned when a document isn't valid UTF-8.
    #[error("document is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// Returned when the opening `---` fence was found but the closing one
    /// was not.
    #[error("missing closing `---` for the metadata block")]
    FrontmatterMissingEndFence,

    /// Returned when the metadata block isn't valid YAML.
    #[error("parsing metadata block: {0}")]
    DeserializeYaml(#[from] serde_yaml::Error),

    /// Returned when the metadata block is valid YAML but not a mapping.
    #[error("metadata block must be a mapping")]
    FrontmatterNotAMapping,

    /// Returned when a metadata key isn't a string.
    #[error("metadata key {0} is not a string")]
    NonStringKey(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string(s: &str) -> Value {
        Value::String(s.to_owned())
    }

    #[test]
    fn test_transform_with_metadata() -> Result<()> {
        let rendered = Markdown.transform(
            b"---\ntitle: Hello World\nslug: hello-world\n---\n# Hello\n\nWorld\n",
        )?;
        assert_eq!("<h1>Hello</h1>\n<p>World</p>\n", rendered.html);
        assert_eq!(Some(&string("Hello World")), rendered.metadata.get("title"));
        assert_eq!(Some(&string("hello-world")), rendered.metadata.get("slug"));
        Ok(())
    }

    #[test]
    fn test_transform_without_metadata_block() -> Result<()> {
        let rendered = Markdown.transform(b"Just a paragraph.\n")?;
        assert!(rendered.metadata.is_empty());
        assert_eq!("<p>Just a paragraph.</p>\n", rendered.html);
        Ok(())
    }

    #[test]
    fn test_transform_keeps_non_string_values() -> Result<()> {
        let rendered = Markdown.transform(b"---\nslug: 42\n---\n")?;
        assert!(matches!(rendered.metadata.get("slug"), Some(Value::Number(_))));
        assert_eq!("", rendered.html);
        Ok(())
    }

    #[test]
    fn test_transform_empty_metadata_block() -> Result<()> {
        let rendered = Markdown.transform(b"---\n---\nbody\n")?;
        assert!(rendered.metadata.is_empty());
        assert_eq!("<p>body</p>\n", rendered.html);
        Ok(())
    }

    #[test]
    fn test_transform_crlf_fences() -> Result<()> {
        let rendered = Markdown.transform(b"---\r\ntitle: T\r\nslug: t\r\n---\r\nbody\r\n")?;
        assert_eq!(Some(&string("t")), rendered.metadata.get("slug"));
        assert!(rendered.html.contains("body"));
        Ok(())
    }

    #[test]
    fn test_fence_must_be_a_whole_line() -> Result<()> {
        // `---` inside a value does not close the block.
        let rendered = Markdown.transform(b"---\ntitle: a --- b\nslug: s\n---\n")?;
        assert_eq!(Some(&string("a --- b")), rendered.metadata.get("title"));
        Ok(())
    }

    #[test]
    fn test_transform_errors() {
        assert!(matches!(
            Markdown.transform(b"---\ntitle: Unterminated\n"),
            Err(Error::FrontmatterMissingEndFence)
        ));
        assert!(matches!(
            Markdown.transform(b"---\n- a\n- b\n---\n"),
            Err(Error::FrontmatterNotAMapping)
        ));
        assert!(matches!(
            Markdown.transform(b"---\ntitle: [unclosed\n---\n"),
            Err(Error::DeserializeYaml(_))
        ));
        assert!(matches!(
            Markdown.transform(b"---\n1: one\n---\n"),
            Err(Error::NonStringKey(_))
        ));
        assert!(matches!(
            Markdown.transform(&[0xff, 0xfe, 0x00]),
            Err(Error::Utf8(_))
        ));
    }
}
