//! Render hash ledger.
//!
//! Each slide document records, per render kind, the fingerprint of the
//! content its stored artifact was rendered from. Comparing that token with a
//! fresh fingerprint decides whether the artifact can be served as-is.
//! Keeping the ledger inside the document means one upsert updates both the
//! metadata and the validity state; there is no separate index to drift.

use serde::Serialize;

use crate::Error;
use crate::slide::{RenderKind, Slide, fingerprint};

/// Whether a stored artifact is still valid for the slide's current content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheStatus {
    Hit,
    Miss,
}

/// Compare the ledger entry for `kind` against a freshly computed fingerprint.
pub fn check(slide: &Slide, kind: RenderKind, fingerprint: &str) -> CacheStatus {
    match slide.render_hash.get(kind) {
        Some(token) if token == fingerprint => CacheStatus::Hit,
        _ => CacheStatus::Miss,
    }
}

/// Check the ledger against the slide's own current fingerprint.
///
/// Returns the status together with the fingerprint, which is the token to
/// render under and record on a miss.
pub fn evaluate(slide: &Slide, kind: RenderKind) -> Result<(CacheStatus, String), Error> {
    let token = fingerprint(slide, kind)?;
    Ok((check(slide, kind, &token), token))
}

/// Record that the artifact for `kind` was rendered from content `token`.
pub fn record(slide: &mut Slide, kind: RenderKind, token: impl Into<String>) {
    slide.render_hash.set(kind, token);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slide::{Page, Site, WorkInfo};

    fn slide() -> Slide {
        Slide { guid_hash: "x".into(), ..Slide::new(Site::new("Blog", "http://b"), Page::new("Post", "http://b/1")) }
    }

    #[test]
    fn test_absent_entry_is_miss() {
        assert_eq!(check(&slide(), RenderKind::Blog, "T1"), CacheStatus::Miss);
    }

    #[test]
    fn test_hit_then_miss_then_update() {
        let mut slide = slide();
        record(&mut slide, RenderKind::Blog, "T1");
        assert_eq!(check(&slide, RenderKind::Blog, "T1"), CacheStatus::Hit);

        assert_eq!(check(&slide, RenderKind::Blog, "T2"), CacheStatus::Miss);
        record(&mut slide, RenderKind::Blog, "T2");
        assert_eq!(slide.render_hash.get(RenderKind::Blog), Some("T2"));
        assert_eq!(check(&slide, RenderKind::Blog, "T2"), CacheStatus::Hit);
    }

    #[test]
    fn test_kinds_are_independent() {
        let mut slide = slide();
        record(&mut slide, RenderKind::Blog, "T1");
        assert_eq!(check(&slide, RenderKind::Slide, "T1"), CacheStatus::Miss);
    }

    #[test]
    fn test_evaluate_tracks_content_changes() {
        let mut slide = slide();
        let (status, token) = evaluate(&slide, RenderKind::Slide).unwrap();
        assert_eq!(status, CacheStatus::Miss);

        record(&mut slide, RenderKind::Slide, token.clone());
        assert_eq!(evaluate(&slide, RenderKind::Slide).unwrap(), (CacheStatus::Hit, token.clone()));

        slide.work_info = Some(WorkInfo { name: "Untitled".into() });
        let (status, fresh) = evaluate(&slide, RenderKind::Slide).unwrap();
        assert_eq!(status, CacheStatus::Miss);
        assert_ne!(fresh, token);
    }
}
