//! The slide data model.
//!
//! A [`Slide`] is the canonical record for one archived art find. It is
//! persisted as a single tagged JSON document (see [`codec`]) and carries the
//! render ledger for its derived artifacts in [`RenderHash`].

pub mod candidate;
pub mod codec;
pub mod identity;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::Error;

pub use candidate::Candidate;
pub use codec::{DOCUMENT_SCHEMA, decode, encode};
pub use identity::{compute_guid_hash, fingerprint};

/// Identifying info about the parent site an image was found on.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Site {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
}

impl Site {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self { title: title.into(), url: url.into() }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.url.is_empty()
    }
}

/// Identifying info about the page an image was found on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Page {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<DateTime<Utc>>,
    /// Hash of the feed item GUID the page was discovered through.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub guid_hash: String,
}

impl Page {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self { title: title.into(), url: url.into(), ..Default::default() }
    }
}

/// An archived copy of the source image.
///
/// Every field is required; a partial image record never decodes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ImageInfo {
    pub url: String,
    pub width: u32,
    pub height: u32,
    pub content_type: String,
    pub filename: String,
}

impl ImageInfo {
    /// Name of the first missing field, if any.
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.url.trim().is_empty() {
            Some("url")
        } else if self.width == 0 {
            Some("width")
        } else if self.height == 0 {
            Some("height")
        } else if self.content_type.trim().is_empty() {
            Some("content_type")
        } else if self.filename.trim().is_empty() {
            Some("filename")
        } else {
            None
        }
    }
}

/// Information about the artist who made the work.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ArtistInfo {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub artsy_url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub wikipedia_url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub website_url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub feed_url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub instagram_url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub twitter_url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub feeds: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sites: Vec<String>,
}

impl ArtistInfo {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Default::default() }
    }
}

/// Information about the work itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct WorkInfo {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
}

/// The kinds of render a slide can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum RenderKind {
    /// Embed for a blog post.
    Blog,
    /// Standalone slide view.
    Slide,
}

impl RenderKind {
    pub const ALL: [RenderKind; 2] = [RenderKind::Blog, RenderKind::Slide];

    pub fn as_str(&self) -> &'static str {
        match self {
            RenderKind::Blog => "blog",
            RenderKind::Slide => "slide",
        }
    }
}

impl fmt::Display for RenderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RenderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "blog" => Ok(RenderKind::Blog),
            "slide" => Ok(RenderKind::Slide),
            other => Err(Error::InvalidInput(format!("unknown render kind: {other}"))),
        }
    }
}

/// Render ledger: the version token of each render kind that has been produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RenderHash {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blog: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slide: Option<String>,
}

impl RenderHash {
    pub fn get(&self, kind: RenderKind) -> Option<&str> {
        match kind {
            RenderKind::Blog => self.blog.as_deref(),
            RenderKind::Slide => self.slide.as_deref(),
        }
    }

    pub fn set(&mut self, kind: RenderKind, token: impl Into<String>) {
        let token = Some(token.into());
        match kind {
            RenderKind::Blog => self.blog = token,
            RenderKind::Slide => self.slide = token,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.blog.is_none() && self.slide.is_none()
    }
}

/// Bundles together everything known about one find.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Slide {
    #[serde(default, skip_serializing_if = "Site::is_empty")]
    pub site: Site,
    #[serde(default)]
    pub page: Page,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub content: String,
    #[serde(default)]
    pub edited: DateTime<Utc>,
    /// Identity key shared by the metadata and artifact stores.
    pub guid_hash: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source_image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_image: Option<ImageInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist_info: Option<ArtistInfo>,
    #[serde(default, rename = "artists", skip_serializing_if = "Vec::is_empty")]
    pub artists_info: Vec<ArtistInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_info: Option<WorkInfo>,
    #[serde(default, skip_serializing_if = "RenderHash::is_empty")]
    pub render_hash: RenderHash,
}

impl Slide {
    /// A slide for `(site, page)` with its identity derived from them.
    pub fn new(site: Site, page: Page) -> Self {
        let guid_hash = compute_guid_hash(&site, &page);
        Self { site, page, guid_hash, ..Default::default() }
    }

    /// Every attribution on the slide, singular first.
    pub fn artists(&self) -> impl Iterator<Item = &ArtistInfo> {
        self.artist_info.iter().chain(self.artists_info.iter())
    }
}
