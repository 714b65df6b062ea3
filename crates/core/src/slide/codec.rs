//! Slide document codec.
//!
//! The metadata store only ever sees the bytes produced here. Documents are
//! JSON objects tagged with a `schema` number next to the slide's own fields.
//! Decoding is forward-compatible: missing optional fields take their
//! zero value, unknown fields are ignored, and untagged documents (written
//! before tagging) read as schema 0.

use serde::{Deserialize, Serialize};

use super::{ImageInfo, Slide};
use crate::Error;

/// Schema number written into every encoded document.
pub const DOCUMENT_SCHEMA: u32 = 1;

#[derive(Serialize)]
struct DocumentRef<'a> {
    schema: u32,
    #[serde(flatten)]
    slide: &'a Slide,
}

#[derive(Deserialize)]
struct Document {
    #[serde(default)]
    schema: u32,
    #[serde(flatten)]
    slide: Slide,
}

/// Encode a slide into its persisted document form.
pub fn encode(slide: &Slide) -> Result<Vec<u8>, Error> {
    serde_json::to_vec(&DocumentRef { schema: DOCUMENT_SCHEMA, slide })
        .map_err(|e| Error::MalformedDocument(format!("failed to encode slide {}: {e}", slide.guid_hash)))
}

/// Decode a persisted document back into a slide.
///
/// # Errors
///
/// Returns `Error::MalformedDocument` if the bytes are not a JSON object,
/// if `guid_hash` is absent or empty, or if a present `archived_image` has
/// a missing, empty or zero field.
pub fn decode(bytes: &[u8]) -> Result<Slide, Error> {
    let document: Document =
        serde_json::from_slice(bytes).map_err(|e| Error::MalformedDocument(e.to_string()))?;

    if document.slide.guid_hash.trim().is_empty() {
        return Err(Error::MalformedDocument("guid_hash is empty".into()));
    }

    if let Some(field) = document.slide.archived_image.as_ref().and_then(ImageInfo::missing_field) {
        return Err(Error::MalformedDocument(format!(
            "slide {}: archived_image.{field} is empty",
            document.slide.guid_hash
        )));
    }

    if document.schema > DOCUMENT_SCHEMA {
        tracing::debug!(
            schema = document.schema,
            known = DOCUMENT_SCHEMA,
            guid_hash = %document.slide.guid_hash,
            "decoded document from a newer schema; unknown fields ignored"
        );
    }

    Ok(document.slide)
}
