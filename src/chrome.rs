//! The page chrome: the HTML document every router response is wrapped in.
//! Rendered with [`gtmpl`]; the template receives `title`, `body`,
//! `static_url`, `source_url` (empty when unset) and `elapsed_ms`.

use crate::config::Config;
use crate::util::read_to_string;
use gtmpl::{Context, Template, Value};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// The template used when the configuration doesn't name one.
pub const DEFAULT_TEMPLATE: &str = include_str!("embed/page.html");

/// The validated page template plus the site-wide values it is rendered with.
#[derive(Clone, Debug)]
pub struct Chrome {
    source: String,
    title: String,
    static_url: String,
    source_url: Option<Url>,
}

impl Chrome {
    /// Checks that `source` parses as a template.
    pub fn new(
        source: impl Into<String>,
        title: impl Into<String>,
        static_url: impl Into<String>,
        source_url: Option<Url>,
    ) -> Result<Chrome> {
        let chrome = Chrome {
            source: source.into(),
            title: title.into(),
            static_url: static_url.into(),
            source_url,
        };
        chrome.compile()?;
        Ok(chrome)
    }

    /// Builds the chrome from the configured template, or the default one.
    pub fn from_config(config: &Config) -> anyhow::Result<Chrome> {
        let source = match &config.template {
            Some(path) => read_to_string(path, "template")?,
            None => DEFAULT_TEMPLATE.to_owned(),
        };
        Ok(Chrome::new(
            source,
            config.title.as_str(),
            config.static_prefix.as_str(),
            config.source_url.clone(),
        )?)
    }

    /// Parses the template. Each thread that renders pages compiles its own
    /// [`Page`]; compiled templates are never shared between threads.
    pub fn compile(&self) -> Result<Page<'_>> {
        let mut template = Template::default();
        template.parse(&self.source).map_err(Error::Parse)?;
        Ok(Page {
            chrome: self,
            template,
        })
    }
}

/// A compiled [`Chrome`], ready to render.
pub struct Page<'a> {
    chrome: &'a Chrome,
    template: Template,
}

impl Page<'_> {
    /// Wraps `body` in the page template. `elapsed` is the time spent
    /// producing `body`.
    pub fn render(&self, body: &str, elapsed: Duration) -> Result<String> {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("title".to_owned(), Value::String(self.chrome.title.clone()));
        m.insert("body".to_owned(), Value::String(body.to_owned()));
        m.insert(
            "static_url".to_owned(),
            Value::String(self.chrome.static_url.clone()),
        );
        m.insert(
            "source_url".to_owned(),
            Value::String(
                self.chrome
                    .source_url
                    .as_ref()
                    .map(Url::to_string)
                    .unwrap_or_default(),
            ),
        );
        m.insert(
            "elapsed_ms".to_owned(),
            Value::String(elapsed.as_millis().to_string()),
        );

        let context = Context::from(Value::Object(m)).map_err(|e| Error::Render(e.to_string()))?;
        let mut out: Vec<u8> = Vec::new();
        self.template
            .execute(&mut out, &context)
            .map_err(Error::Render)?;
        Ok(String::from_utf8(out)?)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error parsing or rendering the page template.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned when the template doesn't parse.
    #[error("parsing page template: {0}")]
    Parse(String),

    /// Returned when executing the template fails.
    #[error("rendering page template: {0}")]
    Render(String),

    /// Returned when the template produced invalid UTF-8.
    #[error("page template produced invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_template() -> Result<()> {
        let chrome = Chrome::new(
            DEFAULT_TEMPLATE,
            "Morgan",
            "/fonts/",
            Some(Url::parse("https://example.com/src").unwrap()),
        )?;
        let html = chrome
            .compile()?
            .render("<p>hello</p>", Duration::from_millis(7))?;
        assert!(html.contains("<title>Morgan</title>"));
        assert!(html.contains("<hr />\n<p>hello</p>\n<hr />"));
        assert!(html.contains("@import url(\"/fonts/fonts.css\")"));
        assert!(html.contains("<a href=\"https://example.com/src\">open source</a>"));
        assert!(html.contains("Rendered page in 7 ms."));
        Ok(())
    }

    #[test]
    fn test_without_source_url() -> Result<()> {
        let chrome = Chrome::new(DEFAULT_TEMPLATE, "Site", "/static/", None)?;
        let html = chrome.compile()?.render("", Duration::from_millis(0))?;
        assert!(!html.contains("open source"));
        assert!(html.contains("Rendered page in 0 ms."));
        Ok(())
    }

    #[test]
    fn test_custom_template() -> Result<()> {
        let chrome = Chrome::new("[{{ .title }}] {{ .body }}", "T", "/s/", None)?;
        assert_eq!(
            "[T] <b>x</b>",
            chrome.compile()?.render("<b>x</b>", Duration::default())?
        );
        Ok(())
    }

    #[test]
    fn test_invalid_template() {
        assert!(matches!(
            Chrome::new("{{ if .title }}unterminated", "T", "/s/", None),
            Err(Error::Parse(_))
        ));
    }
}
