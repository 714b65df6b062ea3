//! Site discovery.
//!
//! Sites are aggregated by SQLite's JSON functions so listing them never
//! decodes whole slide documents in application code.

use std::collections::BTreeSet;

use tokio_rusqlite::rusqlite::{self, types::ValueRef};

use super::connection::SlideDb;
use crate::Error;
use crate::slide::Site;

/// A site field as extracted from a document; `None` when it is not text.
fn site_field(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Text(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Null => Some(String::new()),
        _ => None,
    }
}

impl SlideDb {
    /// Distinct sites across every stored slide, ordered by title then URL.
    ///
    /// Documents whose site fields are not strings are skipped, as
    /// `list_slides` skips them.
    pub async fn list_sites(&self) -> Result<BTreeSet<Site>, Error> {
        self.conn
            .call(|conn| -> Result<BTreeSet<Site>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT
                        json_extract(document, '$.site.title') AS title,
                        json_extract(document, '$.site.url') AS url
                    FROM slides
                    WHERE json_valid(document)
                    GROUP BY title, url",
                )?;

                let rows = stmt
                    .query_map([], |row| {
                        let title = site_field(row.get_ref(0)?);
                        let url = site_field(row.get_ref(1)?);
                        Ok(title.zip(url).map(|(title, url)| Site { title, url }))
                    })?
                    .collect::<Result<Vec<_>, rusqlite::Error>>()?;

                let skipped = rows.iter().filter(|row| row.is_none()).count();
                if skipped > 0 {
                    tracing::warn!(skipped, "skipping sites with non-text fields");
                }

                Ok(rows.into_iter().flatten().filter(|site| !site.is_empty()).collect())
            })
            .await
            .map_err(Error::from)
    }
}
