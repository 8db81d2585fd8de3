//! Health stubs and dashboard pages.
//!
//! Templates are read once at startup from the template directory (falling
//! back to built-in pages) and rendered against the immutable configuration,
//! so handlers only clone the finished HTML.

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
};
use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::config::{DominoConfig, PagesConfig};
use crate::http::server::AppState;

const BUILTIN_INDEX: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Governance Dashboard</title>
  <script>window.DASHBOARD_CONFIG = {{ config_json }};</script>
  <script>const DOMINO_PROJECT_ID = window.DASHBOARD_CONFIG.project_id;</script>
</head>
<body data-project-id="{{ project_id }}">
  <main id="app"></main>
  <script src="static/js/main.js"></script>
</body>
</html>
"#;

const BUILTIN_ORIGINAL: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Governance Dashboard (original)</title>
  <script>window.DASHBOARD_CONFIG = {{ config_json }};</script>
</head>
<body data-project-id="{{ project_id }}" data-domain="{{ domino_domain }}">
  <main id="app"></main>
</body>
</html>
"#;

/// Configuration object handed to page templates.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PageContext {
    pub project_id: String,
    pub run_host_path: String,
    pub domino_domain: String,
    pub api_key: String,
}

impl From<&DominoConfig> for PageContext {
    fn from(domino: &DominoConfig) -> Self {
        Self {
            project_id: domino.project_id.clone(),
            run_host_path: domino.run_host_path.clone(),
            domino_domain: domino.domain.clone(),
            api_key: domino.api_key().unwrap_or_default().to_string(),
        }
    }
}

/// Rendered pages.
#[derive(Debug, Clone)]
pub struct Pages {
    index: String,
    original: String,
}

impl Pages {
    pub fn load(pages: &PagesConfig, domino: &DominoConfig) -> Self {
        let context = PageContext::from(domino);
        let dir = Path::new(&pages.template_dir);

        Self {
            index: render(&read_template(dir, "index.html", BUILTIN_INDEX), &context),
            original: render(&read_template(dir, "original_index.html", BUILTIN_ORIGINAL), &context),
        }
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    pub fn original(&self) -> &str {
        &self.original
    }
}

fn read_template(dir: &Path, name: &str, builtin: &str) -> String {
    let path = dir.join(name);
    match fs::read_to_string(&path) {
        Ok(template) => {
            tracing::debug!(path = %path.display(), "Loaded page template");
            template
        }
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Using built-in page template");
            builtin.to_string()
        }
    }
}

/// Substitute `{{ name }}` placeholders.
///
/// Scalar values are HTML-escaped; `config_json` is emitted as a JSON object
/// safe to embed in a `<script>` element.
pub fn render(template: &str, context: &PageContext) -> String {
    let config_json = serde_json::to_string(context)
        .unwrap_or_else(|_| "{}".to_string())
        .replace("</", "<\\/");

    [
        ("config_json", config_json),
        ("project_id", escape_html(&context.project_id)),
        ("run_host_path", escape_html(&context.run_host_path)),
        ("domino_domain", escape_html(&context.domino_domain)),
        ("api_key", escape_html(&context.api_key)),
    ]
    .iter()
    .fold(template.to_string(), |page, (name, value)| {
        page.replace(&format!("{{{{ {} }}}}", name), value)
            .replace(&format!("{{{{{}}}}}", name), value)
    })
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Liveness probe for the hosting platform.
pub async fn health() -> impl IntoResponse {
    StatusCode::OK
}

/// Host configuration probe stub.
pub async fn host_config() -> impl IntoResponse {
    StatusCode::OK
}

pub async fn index(State(state): State<AppState>) -> Html<String> {
    Html(state.pages.index().to_string())
}

pub async fn original(State(state): State<AppState>) -> Html<String> {
    Html(state.pages.original().to_string())
}
