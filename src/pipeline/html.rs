//! Report HTML: markdown → semantic HTML → fixed page template.
//!
//! The template carries no timestamps, request ids or random values, so the
//! same report always produces the same HTML byte for byte. Physical page
//! geometry (A4, margins) is applied by the renderer's print settings; the
//! CSS here only styles content.

use crate::config::RenderSettings;
use html_escape::encode_double_quoted_attribute;
use html_escape::encode_text;
use pulldown_cmark::{html, Options, Parser};

/// Inputs of the report page template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportTemplate {
    pub title: String,
    pub logo_url: Option<String>,
}

impl ReportTemplate {
    pub fn from_settings(settings: &RenderSettings) -> Self {
        Self {
            title: settings.title.clone(),
            logo_url: settings.logo_url.clone(),
        }
    }

    /// Wrap rendered report HTML in the page template.
    pub fn wrap(&self, body_html: &str) -> String {
        let title = encode_text(&self.title);
        let header = match &self.logo_url {
            Some(url) => format!(
                r#"<img src="{}" alt="{}" width="200">"#,
                encode_double_quoted_attribute(url),
                encode_double_quoted_attribute(&self.title),
            ),
            None => format!(r#"<span class="wordmark">{title}</span>"#),
        };

        format!(
            r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8">
    <title>{title}</title>
    <style>{STYLE}</style>
  </head>
  <body>
    <header class="logo">{header}</header>
    <main class="content">
{body_html}
    </main>
  </body>
</html>
"#
        )
    }
}

const STYLE: &str = r#"
      body { font-family: Arial, Helvetica, sans-serif; font-size: 11pt; line-height: 1.45; color: #1f2328; }
      .logo { text-align: center; margin-bottom: 20px; }
      .wordmark { font-size: 20pt; font-weight: bold; letter-spacing: 0.04em; }
      .content { margin: 0 15mm; }
      h1, h2, h3 { page-break-after: avoid; break-after: avoid; }
      blockquote { margin: 0.6em 0; padding: 0.4em 0.9em; border-left: 4px solid #d1242f; background: #fff5f5; }
      pre, code { font-family: "Courier New", monospace; }
      pre { white-space: pre-wrap; padding: 0.6em; background: #f6f8fa; }
      table { border-collapse: collapse; width: 100%; }
      th, td { border: 1px solid #d0d7de; padding: 4px 8px; text-align: left; }
"#;

/// Convert report markdown to HTML.
///
/// Raw HTML in the markdown is escaped rather than passed through: the
/// report quotes contract text the service does not control.
pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(markdown, options).map(|event| match event {
        pulldown_cmark::Event::Html(raw) | pulldown_cmark::Event::InlineHtml(raw) => {
            pulldown_cmark::Event::Text(raw)
        }
        other => other,
    });

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

/// Full report page for `markdown`.
pub fn render_report_html(markdown: &str, template: &ReportTemplate) -> String {
    template.wrap(&markdown_to_html(markdown))
}
