//! Identity and render fingerprints.

use serde::Serialize;
use sha2::{Digest, Sha256};

use super::{ArtistInfo, ImageInfo, Page, RenderKind, Site, Slide, WorkInfo};
use crate::Error;

/// Compute the identity key of a find from where it was found.
///
/// Only the site and page URLs participate; titles may be edited upstream
/// without changing which find a slide describes.
pub fn compute_guid_hash(site: &Site, page: &Page) -> String {
    let mut hasher = Sha256::new();
    hasher.update(site.url.trim().as_bytes());
    hasher.update(b"\n");
    hasher.update(page.url.trim().as_bytes());
    hex::encode(hasher.finalize())
}

/// The fields of a slide that feed its renders.
#[derive(Serialize)]
struct RenderInput<'a> {
    site: &'a Site,
    page: &'a Page,
    content: &'a str,
    guid_hash: &'a str,
    source_image_url: &'a str,
    archived_image: &'a Option<ImageInfo>,
    artist_info: &'a Option<ArtistInfo>,
    artists: &'a [ArtistInfo],
    work_info: &'a Option<WorkInfo>,
}

/// Content fingerprint of a slide for one render kind.
///
/// `edited` and the render ledger itself are excluded, so re-saving an
/// unchanged slide or recording a render never invalidates a token.
///
/// # Errors
///
/// Returns `Error::MalformedDocument` if the render input cannot be
/// serialized.
pub fn fingerprint(slide: &Slide, kind: RenderKind) -> Result<String, Error> {
    let input = RenderInput {
        site: &slide.site,
        page: &slide.page,
        content: &slide.content,
        guid_hash: &slide.guid_hash,
        source_image_url: &slide.source_image_url,
        archived_image: &slide.archived_image,
        artist_info: &slide.artist_info,
        artists: &slide.artists_info,
        work_info: &slide.work_info,
    };

    // Struct serialization has a fixed field order, so the bytes are canonical.
    let canonical = serde_json::to_vec(&input)
        .map_err(|e| Error::MalformedDocument(format!("failed to fingerprint slide {}: {e}", slide.guid_hash)))?;

    let mut hasher = Sha256::new();
    hasher.update(kind.as_str().as_bytes());
    hasher.update(b"\n");
    hasher.update(&canonical);
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn site() -> Site {
        Site::new("Blog", "http://b")
    }

    fn page() -> Page {
        Page::new("Post", "http://b/1")
    }

    #[test]
    fn test_guid_hash_stability() {
        assert_eq!(compute_guid_hash(&site(), &page()), compute_guid_hash(&site(), &page()));
    }

    #[test]
    fn test_guid_hash_ignores_titles_and_whitespace() {
        let retitled = Page::new("Post (updated)", " http://b/1 ");
        assert_eq!(compute_guid_hash(&site(), &page()), compute_guid_hash(&site(), &retitled));
    }

    #[test]
    fn test_guid_hash_different_page() {
        let other = Page::new("Post", "http://b/2");
        assert_ne!(compute_guid_hash(&site(), &page()), compute_guid_hash(&site(), &other));
    }

    #[test]
    fn test_guid_hash_format() {
        let hash = compute_guid_hash(&site(), &page());
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_fingerprint_ignores_edited_and_ledger() {
        let slide = Slide::new(site(), page());
        let mut touched = slide.clone();
        touched.edited = Utc::now();
        touched.render_hash.set(RenderKind::Blog, "whatever");
        assert_eq!(fingerprint(&slide, RenderKind::Blog).unwrap(), fingerprint(&touched, RenderKind::Blog).unwrap());
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let slide = Slide::new(site(), page());
        let mut changed = slide.clone();
        changed.work_info = Some(WorkInfo { name: "Untitled".into() });
        assert_ne!(fingerprint(&slide, RenderKind::Slide).unwrap(), fingerprint(&changed, RenderKind::Slide).unwrap());
    }

    #[test]
    fn test_fingerprint_format() {
        let token = fingerprint(&Slide::default(), RenderKind::Blog).unwrap();
        assert_eq!(token.len(), 64);
        assert_ne!(token, hex::encode(Sha256::digest(b"blog\n")));
    }

    #[test]
    fn test_fingerprint_differs_per_kind() {
        let slide = Slide::new(site(), page());
        assert_ne!(fingerprint(&slide, RenderKind::Blog).unwrap(), fingerprint(&slide, RenderKind::Slide).unwrap());
    }
}
