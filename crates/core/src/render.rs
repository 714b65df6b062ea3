//! Render contract.
//!
//! How pixels or markup are produced is up to the renderer; the archive only
//! stores what it returns and versions it by content fingerprint.

use bytes::Bytes;

use crate::Error;
use crate::slide::{RenderKind, Slide};

/// Output of one render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub bytes: Bytes,
    pub content_type: String,
}

/// Renderer trait for producing slide artifacts.
#[async_trait::async_trait]
pub trait SlideRenderer: Send + Sync {
    /// Render `slide` as `kind`.
    async fn render(&self, slide: &Slide, kind: RenderKind) -> Result<Rendered, Error>;
}

/// Minimal HTML renderer.
///
/// `blog` renders a `<figure>` embed; `slide` renders a standalone page
/// around the same figure.
#[derive(Debug, Clone, Default)]
pub struct TemplateRenderer;

impl TemplateRenderer {
    fn figure(slide: &Slide) -> String {
        let image_url = slide
            .archived_image
            .as_ref()
            .map(|image| image.url.as_str())
            .filter(|url| !url.is_empty())
            .unwrap_or(slide.source_image_url.as_str());
        let work = slide.work_info.as_ref().map(|w| w.name.as_str()).unwrap_or("");
        let artists = slide
            .artists()
            .map(|a| escape(&a.name))
            .filter(|name| !name.is_empty())
            .collect::<Vec<_>>()
            .join(", ");

        let mut caption = String::new();
        if !work.is_empty() {
            caption.push_str(&format!("<cite>{}</cite>", escape(work)));
        }
        if !artists.is_empty() {
            if !caption.is_empty() {
                caption.push_str(" by ");
            }
            caption.push_str(&artists);
        }
        if !caption.is_empty() {
            caption.push_str(" &middot; ");
        }
        caption.push_str(&format!(
            "via <a href=\"{}\">{}</a>",
            escape(&slide.page.url),
            escape(if slide.site.title.is_empty() { &slide.page.title } else { &slide.site.title })
        ));

        format!(
            "<figure class=\"slide\" data-guid=\"{}\"><img src=\"{}\" alt=\"{}\"><figcaption>{}</figcaption></figure>",
            escape(&slide.guid_hash),
            escape(image_url),
            escape(work),
            caption
        )
    }
}

#[async_trait::async_trait]
impl SlideRenderer for TemplateRenderer {
    async fn render(&self, slide: &Slide, kind: RenderKind) -> Result<Rendered, Error> {
        let figure = Self::figure(slide);
        let html = match kind {
            RenderKind::Blog => figure,
            RenderKind::Slide => format!(
                "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{}</title></head><body>{}</body></html>\n",
                escape(&slide.page.title),
                figure
            ),
        };

        Ok(Rendered { bytes: Bytes::from(html), content_type: "text/html; charset=utf-8".into() })
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
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
