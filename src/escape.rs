//! [`Display`] wrappers around [`pulldown_cmark`]'s HTML escaping so escaped
//! text can be dropped straight into `format!` strings.

use pulldown_cmark::escape::{escape_href, escape_html};
use std::fmt::{self, Display};
use std::io;

type Escaper = fn(&mut String, &str) -> io::Result<()>;

fn write_escaped(f: &mut fmt::Formatter<'_>, escape: Escaper, text: &str) -> fmt::Result {
    let mut escaped = String::with_capacity(text.len());
    escape(&mut escaped, text).map_err(|_| fmt::Error)?;
    f.write_str(&escaped)
}

/// Displays its contents escaped for use inside an `href` attribute.
pub struct EscapeHref<'a>(pub &'a str);

impl Display for EscapeHref<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_escaped(f, |out, text| escape_href(out, text), self.0)
    }
}

/// Displays its contents escaped as HTML text.
pub struct EscapeHtml<'a>(pub &'a str);

impl Display for EscapeHtml<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_escaped(f, |out, text| escape_html(out, text), self.0)
    }
}
