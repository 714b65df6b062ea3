//! Incoming slide candidates and the field-level merge rule.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{ArtistInfo, ImageInfo, Page, Site, Slide, WorkInfo, compute_guid_hash};
use crate::Error;

/// A not-yet-persisted slide, as submitted by a producer.
///
/// Every field is optional on the wire. Present fields overwrite the stored
/// slide on merge; absent fields leave it untouched. Candidates never carry
/// `edited` or render tokens: the store and the render path own those.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Candidate {
    #[serde(default)]
    pub site: Site,
    #[serde(default)]
    pub page: Page,
    #[serde(default)]
    pub content: String,
    /// Identity key; derived from site and page when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guid_hash: Option<String>,
    #[serde(default)]
    pub source_image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_image: Option<ImageInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist_info: Option<ArtistInfo>,
    #[serde(default, rename = "artists")]
    pub artists_info: Vec<ArtistInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_info: Option<WorkInfo>,
}

impl Candidate {
    pub fn new(site: Site, page: Page) -> Self {
        Self { site, page, ..Default::default() }
    }

    pub fn with_guid_hash(mut self, guid_hash: impl Into<String>) -> Self {
        self.guid_hash = Some(guid_hash.into());
        self
    }

    /// Trim surrounding whitespace from identity and text fields.
    pub fn normalize(&mut self) {
        trim(&mut self.site.title);
        trim(&mut self.site.url);
        trim(&mut self.page.title);
        trim(&mut self.page.url);
        trim(&mut self.page.guid_hash);
        trim(&mut self.source_image_url);
        if let Some(guid) = self.guid_hash.as_mut() {
            trim(guid);
        }
        if self.guid_hash.as_deref() == Some("") {
            self.guid_hash = None;
        }
        if let Some(work) = self.work_info.as_mut() {
            trim(&mut work.name);
        }
    }

    /// Check the fields every new find must carry.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidCandidate` naming the first missing field:
    /// site title/url, page title/url, or any field of a present image. A
    /// supplied `guid_hash` containing `/` is rejected too, since it could
    /// never address an artifact.
    pub fn validate(&self) -> Result<(), Error> {
        if let Some(guid) = self.guid_hash.as_deref().filter(|guid| guid.contains('/')) {
            return Err(Error::InvalidCandidate(format!("guid_hash must not contain '/': {guid:?}")));
        }

        let required = [
            ("site.title", &self.site.title),
            ("site.url", &self.site.url),
            ("page.title", &self.page.title),
            ("page.url", &self.page.url),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(Error::InvalidCandidate(format!("{field} is required")));
            }
        }

        for (field, value) in [("site.url", &self.site.url), ("page.url", &self.page.url)] {
            url::Url::parse(value).map_err(|e| Error::InvalidCandidate(format!("{field} is not a valid URL: {e}")))?;
        }

        self.validate_image()
    }

    /// Check only the image, for partial updates of an existing slide.
    pub fn validate_image(&self) -> Result<(), Error> {
        if let Some(field) = self.archived_image.as_ref().and_then(ImageInfo::missing_field) {
            return Err(Error::InvalidCandidate(format!("archived_image.{field} is required")));
        }
        Ok(())
    }

    /// The identity key of this candidate, supplied or derived.
    pub fn resolve_guid_hash(&self) -> String {
        match &self.guid_hash {
            Some(guid) => guid.clone(),
            None => compute_guid_hash(&self.site, &self.page),
        }
    }

    /// Build a fresh slide from this candidate.
    pub fn into_slide(self) -> Slide {
        let guid_hash = self.resolve_guid_hash();
        let mut slide = Slide { guid_hash, ..Default::default() };
        slide.merge(self);
        slide
    }
}

fn trim(value: &mut String) {
    let trimmed = value.trim();
    if trimmed.len() != value.len() {
        *value = trimmed.to_string();
    }
}

fn overwrite(stored: &mut String, incoming: String) {
    if !incoming.is_empty() {
        *stored = incoming;
    }
}

impl Slide {
    /// Apply a candidate on top of this slide, field by field.
    ///
    /// Present fields win; absent fields keep the stored value. Site and page
    /// merge per sub-field. Image, artist and work records replace as units.
    /// `guid_hash`, `edited` and the render ledger are never touched.
    pub fn merge(&mut self, incoming: Candidate) {
        let Candidate {
            site,
            page,
            content,
            guid_hash: _,
            source_image_url,
            archived_image,
            artist_info,
            artists_info,
            work_info,
        } = incoming;

        overwrite(&mut self.site.title, site.title);
        overwrite(&mut self.site.url, site.url);
        overwrite(&mut self.page.title, page.title);
        overwrite(&mut self.page.url, page.url);
        overwrite(&mut self.page.guid_hash, page.guid_hash);
        if page.published.is_some() {
            self.page.published = page.published;
        }
        overwrite(&mut self.content, content);
        overwrite(&mut self.source_image_url, source_image_url);

        if archived_image.is_some() {
            self.archived_image = archived_image;
        }
        if artist_info.is_some() {
            self.artist_info = artist_info;
        }
        if !artists_info.is_empty() {
            self.artists_info = artists_info;
        }
        if work_info.is_some() {
            self.work_info = work_info;
        }
    }
}
