//! Consumer-facing operations over the slide store, the artifact store and an
//! optional renderer.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

use crate::Error;
use crate::artifact::Artifacts;
use crate::ledger::{self, CacheStatus};
use crate::render::SlideRenderer;
use crate::slide::{Candidate, RenderKind, Site, Slide, fingerprint};
use crate::store::{Cursor, SlideDb, SlidePage};

/// Result of asking for a rendered artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    /// The stored artifact is current for the slide's content.
    Hit { bytes: Bytes, token: String },
    /// The artifact was (re)rendered, stored and recorded in the ledger.
    Rendered { bytes: Bytes, token: String },
    /// No current artifact exists and no renderer is configured.
    Miss { token: String },
}

impl RenderOutcome {
    pub fn token(&self) -> &str {
        match self {
            Self::Hit { token, .. } | Self::Rendered { token, .. } | Self::Miss { token } => token,
        }
    }

    pub fn bytes(&self) -> Option<&Bytes> {
        match self {
            Self::Hit { bytes, .. } | Self::Rendered { bytes, .. } => Some(bytes),
            Self::Miss { .. } => None,
        }
    }

    pub fn status(&self) -> CacheStatus {
        match self {
            Self::Hit { .. } => CacheStatus::Hit,
            Self::Rendered { .. } | Self::Miss { .. } => CacheStatus::Miss,
        }
    }
}

/// The slide archive.
#[derive(Clone)]
pub struct Archive {
    db: SlideDb,
    artifacts: Artifacts,
    renderer: Option<Arc<dyn SlideRenderer>>,
}

impl fmt::Debug for Archive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Archive")
            .field("db", &self.db)
            .field("artifacts", &self.artifacts)
            .field("renderer", &self.renderer.is_some())
            .finish()
    }
}

impl Archive {
    pub fn new(db: SlideDb, artifacts: Artifacts) -> Self {
        Self { db, artifacts, renderer: None }
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn SlideRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn db(&self) -> &SlideDb {
        &self.db
    }

    pub async fn list_slides(&self, cursor: Option<Cursor>, limit: usize) -> Result<SlidePage, Error> {
        self.db.list_slides(cursor, limit).await
    }

    /// # Errors
    ///
    /// Returns `Error::NotFound` if no slide has `guid_hash`.
    pub async fn get_slide(&self, guid_hash: &str) -> Result<Slide, Error> {
        self.db
            .get_slide(guid_hash)
            .await?
            .ok_or_else(|| Error::NotFound(format!("no slide with guid_hash {guid_hash}")))
    }

    /// Merge `update` into the stored slide and persist it.
    ///
    /// # Errors
    ///
    /// - `Error::ConstraintViolation` if `update` names a different GUID hash
    /// - `Error::InvalidCandidate` if it carries an incomplete image
    /// - `Error::NotFound` if no slide has `guid_hash`
    pub async fn update_slide(&self, guid_hash: &str, mut update: Candidate) -> Result<Slide, Error> {
        update.normalize();
        if let Some(other) = update.guid_hash.as_deref().filter(|other| *other != guid_hash) {
            return Err(Error::ConstraintViolation(format!(
                "update for {guid_hash} carries guid_hash {other}"
            )));
        }
        update.validate_image()?;

        let (stored, ()) = self
            .db
            .modify_slide(guid_hash, move |stored| {
                Ok((
                    stored.map(|mut slide| {
                        slide.merge(update);
                        slide
                    }),
                    (),
                ))
            })
            .await?;
        let stored = stored.ok_or_else(|| Error::NotFound(format!("no slide with guid_hash {guid_hash}")))?;

        tracing::info!(guid_hash = %guid_hash, "updated slide");
        Ok(stored)
    }

    pub async fn list_sites(&self) -> Result<BTreeSet<Site>, Error> {
        self.db.list_sites().await
    }

    /// Serve the `kind` artifact of a slide, rendering it when stale.
    ///
    /// A ledger hit whose artifact has gone missing from the artifact store
    /// is treated as a miss.
    ///
    /// # Errors
    ///
    /// - `Error::NotFound` if no slide has `guid_hash`
    /// - `Error::ArtifactStoreUnavailable` if the artifact store fails
    /// - `Error::RenderFailed` if the renderer fails
    pub async fn render_slide(&self, guid_hash: &str, kind: RenderKind) -> Result<RenderOutcome, Error> {
        let slide = self.get_slide(guid_hash).await?;
        let (status, token) = ledger::evaluate(&slide, kind)?;

        if status == CacheStatus::Hit {
            match self.artifacts.get(guid_hash, kind, &token).await? {
                Some(bytes) => {
                    tracing::debug!(guid_hash = %guid_hash, %kind, "render cache hit");
                    return Ok(RenderOutcome::Hit { bytes, token });
                }
                None => tracing::warn!(guid_hash = %guid_hash, %kind, "ledger hit without artifact"),
            }
        }

        let Some(renderer) = &self.renderer else {
            return Ok(RenderOutcome::Miss { token });
        };

        let rendered = renderer.render(&slide, kind).await?;
        self.artifacts.put(guid_hash, kind, &token, rendered.bytes.clone()).await?;
        self.record_render(guid_hash, kind, &token).await?;

        tracing::info!(guid_hash = %guid_hash, %kind, size = rendered.bytes.len(), "rendered slide");
        Ok(RenderOutcome::Rendered { bytes: rendered.bytes, token })
    }

    /// Record `token` on the latest stored copy, unless its content moved on
    /// while rendering. Only the ledger entry changes.
    async fn record_render(&self, guid_hash: &str, kind: RenderKind, token: &str) -> Result<(), Error> {
        let token = token.to_string();
        let (written, ()) = self
            .db
            .modify_slide(guid_hash, move |stored| {
                let Some(mut latest) = stored else {
                    return Ok((None, ()));
                };
                if fingerprint(&latest, kind)? != token {
                    return Ok((None, ()));
                }
                ledger::record(&mut latest, kind, token);
                Ok((Some(latest), ()))
            })
            .await?;

        if written.is_none() {
            tracing::debug!(guid_hash = %guid_hash, %kind, "slide changed during render, ledger not updated");
        }
        Ok(())
    }
}
