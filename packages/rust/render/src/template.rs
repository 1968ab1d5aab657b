//! Detail page templates with `{{NAME}}` placeholders.

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::debug;

use sitepipe_shared::{Result, SitePipeError};

use crate::escape_html;

/// `{{NAME}}` where NAME is upper-case letters and underscores.
static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([A-Z_]+)\}\}").expect("placeholder regex"));

/// Template used when no template file exists.
const BUILTIN_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="{{LANG}}">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{{TITLE}}</title>
  <meta name="description" content="{{SUMMARY}}">
  <link rel="canonical" href="{{URL}}">
  <link rel="stylesheet" href="/styles.css">
</head>
<body>
  <main class="article">
    <p class="category">{{CATEGORY_LABEL}}</p>
    <h1>{{TITLE}}</h1>
    <time>{{DATE}}</time>
    <img class="cover" src="{{IMAGE}}" alt="{{ALT}}">
    <article>{{CONTENT}}</article>
    <nav class="pager">
      <a class="prev" href="{{PREV_URL}}">{{PREV_TITLE}}</a>
      <a class="next" href="{{NEXT_URL}}">{{NEXT_TITLE}}</a>
    </nav>
  </main>
  <script src="/script.js"></script>
</body>
</html>
"#;

/// Values substituted into a template.
///
/// Text values are HTML-escaped on insertion; HTML values are inserted as-is.
#[derive(Debug, Default, Clone)]
pub struct PageVars {
    values: HashMap<&'static str, String>,
}

impl PageVars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a placeholder to escaped text.
    pub fn text(mut self, name: &'static str, value: impl AsRef<str>) -> Self {
        self.values.insert(name, escape_html(value.as_ref()));
        self
    }

    /// Set a placeholder to a trusted HTML fragment.
    pub fn html(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.values.insert(name, value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}

/// A loaded detail page template.
#[derive(Debug, Clone)]
pub struct PageTemplate {
    source: String,
}

impl PageTemplate {
    pub fn from_source(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn builtin() -> Self {
        Self::from_source(BUILTIN_TEMPLATE)
    }

    /// Load the first existing template among `candidates`, else the built-in.
    ///
    /// A template file without a `{{CONTENT}}` placeholder is rejected.
    pub fn load_first<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        for candidate in candidates {
            let path = candidate.as_ref();
            if path.is_file() {
                let source = std::fs::read_to_string(path)
                    .map_err(|e| SitePipeError::io(path, e))?;
                if !source.contains("{{CONTENT}}") {
                    return Err(SitePipeError::Render(format!(
                        "template {} has no {{{{CONTENT}}}} placeholder",
                        path.display()
                    )));
                }
                debug!(path = %path.display(), "loaded page template");
                return Ok(Self::from_source(source));
            }
        }
        debug!("no template file found, using built-in template");
        Ok(Self::builtin())
    }

    /// Replace every known placeholder; unknown ones are left untouched.
    pub fn fill(&self, vars: &PageVars) -> String {
        PLACEHOLDER_RE
            .replace_all(&self.source, |caps: &Captures| match vars.get(&caps[1]) {
                Some(value) => value.to_string(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }
}
