//! Slide CRUD operations.
//!
//! Each slide is one row: its GUID hash, its encoded document and a write
//! sequence number. Listing follows the write sequence, so recently edited
//! slides move to the end.

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, OptionalExtension, TransactionBehavior, types::ValueRef};

use super::connection::SlideDb;
use crate::Error;
use crate::slide::{Slide, decode, encode};

/// Opaque position in the slide listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cursor(i64);

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0.to_be_bytes()))
    }
}

impl FromStr for Cursor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidInput(format!("invalid cursor: {s}"));
        let bytes: [u8; 8] = hex::decode(s)
            .map_err(|_| invalid())?
            .try_into()
            .map_err(|_| invalid())?;
        Ok(Cursor(i64::from_be_bytes(bytes)))
    }
}

impl Serialize for Cursor {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Cursor {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl JsonSchema for Cursor {
    fn schema_name() -> std::borrow::Cow<'static, str> {
        "Cursor".into()
    }

    fn json_schema(generator: &mut schemars::SchemaGenerator) -> schemars::Schema {
        String::json_schema(generator)
    }
}

/// One page of the slide listing.
#[derive(Debug, Clone, Default, Serialize, JsonSchema)]
pub struct SlidePage {
    pub slides: Vec<Slide>,
    /// GUID hashes of rows whose documents failed to decode.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub malformed: Vec<String>,
    /// Cursor for the next page; `None` once the listing is exhausted.
    pub next_cursor: Option<Cursor>,
}

/// Lazy, restartable walk over every slide in write order.
pub struct SlidePages {
    db: SlideDb,
    cursor: Option<Cursor>,
    limit: usize,
    done: bool,
}

impl SlidePages {
    /// Cursor to resume this walk from later.
    pub fn cursor(&self) -> Option<Cursor> {
        self.cursor
    }

    /// Fetch the next page, or `None` when the walk is complete.
    pub async fn next(&mut self) -> Result<Option<SlidePage>, Error> {
        if self.done {
            return Ok(None);
        }

        let page = self.db.list_slides(self.cursor, self.limit).await?;
        match page.next_cursor {
            Some(next) => self.cursor = Some(next),
            None => self.done = true,
        }

        if page.slides.is_empty() && page.malformed.is_empty() {
            return Ok(None);
        }
        Ok(Some(page))
    }
}

fn document_bytes(value: ValueRef<'_>) -> Vec<u8> {
    match value {
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => bytes.to_vec(),
        _ => Vec::new(),
    }
}

/// Stamp `edited` and encode, ready for `write_document`.
fn prepare_write(slide: &Slide) -> Result<(Slide, String), Error> {
    if slide.guid_hash.trim().is_empty() {
        return Err(Error::ConstraintViolation("guid_hash must not be empty".into()));
    }

    let mut stored = slide.clone();
    stored.edited = Utc::now();
    let document = String::from_utf8(encode(&stored)?).map_err(|e| Error::MalformedDocument(e.to_string()))?;
    Ok((stored, document))
}

fn read_document(conn: &rusqlite::Connection, guid_hash: &str) -> rusqlite::Result<Option<Vec<u8>>> {
    conn.query_row("SELECT document FROM slides WHERE guid_hash = ?1", params![guid_hash], |row| {
        Ok(document_bytes(row.get_ref(0)?))
    })
    .optional()
}

fn write_document(conn: &rusqlite::Connection, guid_hash: &str, document: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO slides (guid_hash, document, seq)
        VALUES (?1, ?2, (SELECT COALESCE(MAX(seq), 0) + 1 FROM slides))
        ON CONFLICT(guid_hash) DO UPDATE SET
            document = excluded.document,
            seq = excluded.seq",
        params![guid_hash, document],
    )?;
    Ok(())
}

impl SlideDb {
    /// Insert or replace a slide document.
    ///
    /// Stamps `edited` with the current time, then writes the whole document
    /// in one statement, so readers see either the old or the new slide.
    /// Returns the slide as stored.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConstraintViolation` if `guid_hash` is empty and
    /// `Error::StoreUnavailable` if the database cannot be reached.
    pub async fn upsert_slide(&self, slide: &Slide) -> Result<Slide, Error> {
        let (stored, document) = prepare_write(slide)?;
        let guid_hash = stored.guid_hash.clone();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                write_document(conn, &guid_hash, &document)?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        tracing::debug!(guid_hash = %stored.guid_hash, "upserted slide");
        Ok(stored)
    }

    /// Read, change and write back one slide in a single store call.
    ///
    /// `apply` gets the stored slide (`None` if absent) and returns the slide
    /// to write, or `None` to leave the row as it is, plus a value handed back
    /// to the caller. No other write on this database lands between the read
    /// and the write. Returns the slide as stored, if one was written.
    ///
    /// # Errors
    ///
    /// Returns whatever `apply` returns, `Error::MalformedDocument` if the
    /// stored document does not decode, and `Error::ConstraintViolation` if
    /// `apply` changes the GUID hash.
    pub async fn modify_slide<T, F>(&self, guid_hash: &str, apply: F) -> Result<(Option<Slide>, T), Error>
    where
        T: Send + 'static,
        F: FnOnce(Option<Slide>) -> Result<(Option<Slide>, T), Error> + Send + 'static,
    {
        let guid_hash = guid_hash.to_string();
        let (stored, value) = self
            .conn
            .call(move |conn| -> Result<(Option<Slide>, T), Error> {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
                let current = read_document(&tx, &guid_hash)?.map(|bytes| decode(&bytes)).transpose()?;

                let (next, value) = apply(current)?;
                let Some(next) = next else {
                    return Ok((None, value));
                };
                if next.guid_hash != guid_hash {
                    return Err(Error::ConstraintViolation(format!(
                        "modifying {guid_hash} produced guid_hash {}",
                        next.guid_hash
                    )));
                }

                let (stored, document) = prepare_write(&next)?;
                write_document(&tx, &guid_hash, &document)?;
                tx.commit()?;
                Ok((Some(stored), value))
            })
            .await
            .map_err(Error::from)?;

        if let Some(stored) = &stored {
            tracing::debug!(guid_hash = %stored.guid_hash, "modified slide");
        }
        Ok((stored, value))
    }

    /// Get a slide by GUID hash.
    ///
    /// Returns None if no slide has that hash.
    pub async fn get_slide(&self, guid_hash: &str) -> Result<Option<Slide>, Error> {
        let guid_hash = guid_hash.to_string();
        let raw = self
            .conn
            .call(move |conn| -> Result<Option<Vec<u8>>, Error> { Ok(read_document(conn, &guid_hash)?) })
            .await
            .map_err(Error::from)?;

        raw.map(|bytes| decode(&bytes)).transpose()
    }

    /// List up to `limit` slides written after `cursor`, oldest write first.
    ///
    /// Rows that fail to decode are reported in `malformed` and skipped.
    pub async fn list_slides(&self, cursor: Option<Cursor>, limit: usize) -> Result<SlidePage, Error> {
        if limit == 0 {
            return Err(Error::InvalidInput("limit must be at least 1".into()));
        }

        let after = cursor.map_or(0, |c| c.0);
        // One extra row tells us whether another page exists.
        let fetch = i64::try_from(limit)
            .ok()
            .and_then(|limit| limit.checked_add(1))
            .ok_or_else(|| Error::InvalidInput(format!("limit {limit} is too large")))?;

        let rows = self
            .conn
            .call(move |conn| -> Result<Vec<(String, Vec<u8>, i64)>, Error> {
                let mut stmt =
                    conn.prepare("SELECT guid_hash, document, seq FROM slides WHERE seq > ?1 ORDER BY seq ASC LIMIT ?2")?;
                let rows = stmt
                    .query_map(params![after, fetch], |row| {
                        Ok((row.get(0)?, document_bytes(row.get_ref(1)?), row.get(2)?))
                    })?
                    .collect::<Result<Vec<_>, rusqlite::Error>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)?;

        let has_more = rows.len() > limit;
        let mut page = SlidePage::default();
        let mut last_seq = None;

        for (guid_hash, bytes, seq) in rows.into_iter().take(limit) {
            last_seq = Some(seq);
            match decode(&bytes) {
                Ok(slide) => page.slides.push(slide),
                Err(e) => {
                    tracing::warn!(guid_hash = %guid_hash, error = %e, "skipping malformed slide document");
                    page.malformed.push(guid_hash);
                }
            }
        }

        if has_more {
            page.next_cursor = last_seq.map(Cursor);
        }
        Ok(page)
    }

    /// Walk every slide lazily, `limit` at a time, optionally resuming from `cursor`.
    pub fn slide_pages(&self, cursor: Option<Cursor>, limit: usize) -> SlidePages {
        SlidePages { db: self.clone(), cursor, limit, done: false }
    }

    /// Number of stored slides.
    pub async fn count_slides(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM slides", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slide::{ArtistInfo, Candidate, Page, Site, WorkInfo};

    fn make_test_slide(n: usize) -> Slide {
        Candidate::new(Site::new("Blog", "http://b"), Page::new(format!("Post {n}"), format!("http://b/{n}")))
            .into_slide()
    }

    fn semantic(slide: &Slide) -> Slide {
        Slide { edited: Default::default(), ..slide.clone() }
    }

    #[tokio::test]
    async fn test_upsert_and_get() {
        let db = SlideDb::open_in_memory().await.unwrap();
        let slide = make_test_slide(1);

        let stored = db.upsert_slide(&slide).await.unwrap();
        let retrieved = db.get_slide(&slide.guid_hash).await.unwrap().unwrap();

        assert_eq!(retrieved, stored);
        assert_eq!(semantic(&retrieved), semantic(&slide));
    }

    #[tokio::test]
    async fn test_get_missing() {
        let db = SlideDb::open_in_memory().await.unwrap();
        let result = db.get_slide("nonexistent").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let db = SlideDb::open_in_memory().await.unwrap();
        let slide = Slide { artist_info: Some(ArtistInfo::named("A")), ..make_test_slide(1) };

        let first = db.upsert_slide(&slide).await.unwrap();
        let second = db.upsert_slide(&slide).await.unwrap();

        assert_eq!(semantic(&first), semantic(&second));
        assert_eq!(db.count_slides().await.unwrap(), 1);
        assert!(second.edited >= first.edited);
    }

    #[tokio::test]
    async fn test_upsert_replaces_document() {
        let db = SlideDb::open_in_memory().await.unwrap();
        let mut slide = make_test_slide(1);
        db.upsert_slide(&slide).await.unwrap();

        slide.work_info = Some(WorkInfo { name: "Untitled".into() });
        db.upsert_slide(&slide).await.unwrap();

        let retrieved = db.get_slide(&slide.guid_hash).await.unwrap().unwrap();
        assert_eq!(retrieved.work_info.unwrap().name, "Untitled");
    }

    #[tokio::test]
    async fn test_upsert_rejects_empty_guid() {
        let db = SlideDb::open_in_memory().await.unwrap();
        let slide = Slide { guid_hash: " ".into(), ..make_test_slide(1) };
        let result = db.upsert_slide(&slide).await;
        assert!(matches!(result, Err(Error::ConstraintViolation(_))));
    }

    #[tokio::test]
    async fn test_get_malformed_document() {
        let db = SlideDb::open_in_memory().await.unwrap();
        db.conn
            .call(|conn| {
                conn.execute("INSERT INTO slides (guid_hash, document, seq) VALUES ('broken', '{not json', 1)", [])
            })
            .await
            .unwrap();

        let result = db.get_slide("broken").await;
        assert!(matches!(result, Err(Error::MalformedDocument(_))));
    }

    #[tokio::test]
    async fn test_list_pages_in_write_order() {
        let db = SlideDb::open_in_memory().await.unwrap();
        for n in 0..5 {
            db.upsert_slide(&make_test_slide(n)).await.unwrap();
        }

        let first = db.list_slides(None, 2).await.unwrap();
        assert_eq!(first.slides.len(), 2);
        assert_eq!(first.slides[0].page.title, "Post 0");
        let cursor = first.next_cursor.unwrap();

        let second = db.list_slides(Some(cursor), 2).await.unwrap();
        assert_eq!(second.slides[0].page.title, "Post 2");

        let last = db.list_slides(second.next_cursor, 2).await.unwrap();
        assert_eq!(last.slides.len(), 1);
        assert!(last.next_cursor.is_none());
    }

    #[tokio::test]
    async fn test_list_moves_edited_to_end() {
        let db = SlideDb::open_in_memory().await.unwrap();
        let first = make_test_slide(0);
        db.upsert_slide(&first).await.unwrap();
        db.upsert_slide(&make_test_slide(1)).await.unwrap();
        db.upsert_slide(&first).await.unwrap();

        let page = db.list_slides(None, 10).await.unwrap();
        let titles: Vec<_> = page.slides.iter().map(|s| s.page.title.as_str()).collect();
        assert_eq!(titles, vec!["Post 1", "Post 0"]);
    }

    #[tokio::test]
    async fn test_list_reports_malformed_rows() {
        let db = SlideDb::open_in_memory().await.unwrap();
        db.upsert_slide(&make_test_slide(0)).await.unwrap();
        db.conn
            .call(|conn| {
                conn.execute("INSERT INTO slides (guid_hash, document, seq) VALUES ('broken', '[]', 100)", [])
            })
            .await
            .unwrap();

        let page = db.list_slides(None, 10).await.unwrap();
        assert_eq!(page.slides.len(), 1);
        assert_eq!(page.malformed, vec!["broken".to_string()]);
    }

    #[tokio::test]
    async fn test_list_rejects_zero_limit() {
        let db = SlideDb::open_in_memory().await.unwrap();
        assert!(matches!(db.list_slides(None, 0).await, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_list_rejects_oversized_limit() {
        let db = SlideDb::open_in_memory().await.unwrap();
        db.upsert_slide(&make_test_slide(0)).await.unwrap();

        assert!(matches!(db.list_slides(None, usize::MAX).await, Err(Error::InvalidInput(_))));

        let page = db.list_slides(None, i64::MAX as usize - 1).await.unwrap();
        assert_eq!(page.slides.len(), 1);
        assert!(page.next_cursor.is_none());
    }

    #[tokio::test]
    async fn test_modify_slide_reads_and_writes() {
        let db = SlideDb::open_in_memory().await.unwrap();
        let slide = make_test_slide(1);
        let guid = slide.guid_hash.clone();

        let (written, existed) = db
            .modify_slide(&guid, move |stored| {
                let existed = stored.is_some();
                Ok((Some(stored.unwrap_or(slide)), existed))
            })
            .await
            .unwrap();
        assert!(!existed);
        assert_eq!(written.unwrap().page.title, "Post 1");

        let (written, existed) = db
            .modify_slide(&guid, |stored| {
                let existed = stored.is_some();
                let mut slide = stored.unwrap();
                slide.work_info = Some(WorkInfo { name: "Untitled".into() });
                Ok((Some(slide), existed))
            })
            .await
            .unwrap();
        assert!(existed);
        assert_eq!(written.unwrap().work_info.unwrap().name, "Untitled");
        assert_eq!(db.get_slide(&guid).await.unwrap().unwrap().work_info.unwrap().name, "Untitled");
    }

    #[tokio::test]
    async fn test_modify_slide_can_skip_write() {
        let db = SlideDb::open_in_memory().await.unwrap();
        let slide = db.upsert_slide(&make_test_slide(1)).await.unwrap();

        let (written, ()) = db.modify_slide(&slide.guid_hash, |_| Ok((None, ()))).await.unwrap();
        assert!(written.is_none());
        assert_eq!(db.get_slide(&slide.guid_hash).await.unwrap().unwrap(), slide);

        let (written, ()) = db.modify_slide("absent", |stored| Ok((stored, ()))).await.unwrap();
        assert!(written.is_none());
        assert_eq!(db.count_slides().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_modify_slide_keeps_identity() {
        let db = SlideDb::open_in_memory().await.unwrap();
        let slide = db.upsert_slide(&make_test_slide(1)).await.unwrap();

        let result = db
            .modify_slide(&slide.guid_hash, |stored| {
                Ok((stored.map(|s| Slide { guid_hash: "other".into(), ..s }), ()))
            })
            .await;
        assert!(matches!(result, Err(Error::ConstraintViolation(_))));
        assert!(db.get_slide("other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_slide_pages_walks_everything() {
        let db = SlideDb::open_in_memory().await.unwrap();
        for n in 0..7 {
            db.upsert_slide(&make_test_slide(n)).await.unwrap();
        }

        let mut pages = db.slide_pages(None, 3);
        let mut seen = Vec::new();
        while let Some(page) = pages.next().await.unwrap() {
            seen.extend(page.slides.into_iter().map(|s| s.guid_hash));
        }
        assert_eq!(seen.len(), 7);
        assert!(pages.next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_slide_pages_restart_from_cursor() {
        let db = SlideDb::open_in_memory().await.unwrap();
        for n in 0..4 {
            db.upsert_slide(&make_test_slide(n)).await.unwrap();
        }

        let mut pages = db.slide_pages(None, 2);
        pages.next().await.unwrap().unwrap();
        let resume = pages.cursor();

        let mut restarted = db.slide_pages(resume, 2);
        let page = restarted.next().await.unwrap().unwrap();
        assert_eq!(page.slides[0].page.title, "Post 2");
    }

    #[test]
    fn test_cursor_is_opaque_and_parses() {
        let cursor = Cursor(42);
        let text = cursor.to_string();
        assert_eq!(text.parse::<Cursor>().unwrap(), cursor);
        assert!("zz".parse::<Cursor>().is_err());
        assert!("00".parse::<Cursor>().is_err());
    }
}
