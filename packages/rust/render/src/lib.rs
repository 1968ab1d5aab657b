//! HTML rendering for sitepipe detail pages.
//!
//! - [`render_rich_text`] turns a record body into an HTML fragment
//! - [`PageTemplate`] fills `{{NAME}}` placeholders from [`PageVars`]

mod rich_text;
mod template;

pub use rich_text::render_rich_text;
pub use template::{PageTemplate, PageVars};

/// Escape text for inclusion in HTML element content or attribute values.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
