//! `artarchive ingest`: stream JSON-lines candidates through the pipeline.

use anyhow::{Context, Result, bail};
use artarchive_core::{Candidate, IngestStatus, Pipeline, PipelineConfig, SlideDb};
use serde_json::json;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

/// Parse one input line. Blank lines yield `None`.
fn parse_line(line: &str) -> Result<Option<Candidate>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(line)?))
}

async fn open_input(input: &str) -> Result<Box<dyn AsyncBufRead + Unpin + Send>> {
    if input == "-" {
        return Ok(Box::new(BufReader::new(tokio::io::stdin())));
    }
    let file = tokio::fs::File::open(input).await.with_context(|| format!("opening {input}"))?;
    Ok(Box::new(BufReader::new(file)))
}

pub async fn execute(db: SlideDb, config: PipelineConfig, input: &str) -> Result<()> {
    let reader = open_input(input).await?;
    let (pipeline, mut outcomes) = Pipeline::spawn(db, config)?;
    // One producer per worker; lines for the same slide share a producer.
    let mut producers = pipeline.fan_out();
    drop(pipeline);

    // Lines are read while outcomes drain, so a full queue only pauses reading.
    let feeder = tokio::spawn(async move {
        let mut lines = reader.lines();
        let mut line_no = 0u64;
        let mut rejected = 0u64;

        while let Some(line) = lines.next_line().await? {
            line_no += 1;
            match parse_line(&line) {
                Ok(Some(candidate)) => {
                    if producers.submit(candidate).await.is_err() {
                        bail!("ingestion pipeline closed at line {line_no}");
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    rejected += 1;
                    tracing::warn!(line = line_no, error = %e, "skipping unparseable line");
                }
            }
        }
        Ok::<_, anyhow::Error>(rejected)
    });

    let (mut inserted, mut updated, mut failed) = (0u64, 0u64, 0u64);
    while let Some(outcome) = outcomes.recv().await {
        let line = match &outcome.result {
            Ok(status) => {
                match status {
                    IngestStatus::Inserted => inserted += 1,
                    IngestStatus::Updated => updated += 1,
                }
                json!({
                    "producer": outcome.producer,
                    "sequence": outcome.sequence,
                    "guid_hash": outcome.guid_hash,
                    "status": status,
                })
            }
            Err(e) => {
                failed += 1;
                json!({
                    "producer": outcome.producer,
                    "sequence": outcome.sequence,
                    "guid_hash": outcome.guid_hash,
                    "error": e.to_string(),
                })
            }
        };
        println!("{line}");
    }

    let rejected = feeder.await??;
    eprintln!("inserted {inserted}, updated {updated}, failed {failed}, unparseable {rejected}");

    if failed + rejected > 0 {
        bail!("{} candidate(s) not ingested", failed + rejected);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line() {
        assert!(parse_line("   ").unwrap().is_none());

        let candidate = parse_line(r#"{"site": {"title": "Blog", "url": "http://b"}, "guid_hash": "abc123"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(candidate.site.title, "Blog");
        assert_eq!(candidate.guid_hash.as_deref(), Some("abc123"));

        assert!(parse_line("{not json").is_err());
    }

    #[tokio::test]
    async fn test_execute_from_file() {
        let path = std::env::temp_dir().join(format!("artarchive-ingest-{}.jsonl", std::process::id()));
        let body = [
            r#"{"site": {"title": "Blog", "url": "http://b"}, "page": {"title": "Post", "url": "http://b/1"}}"#,
            "",
            r#"{"site": {"title": "Blog", "url": "http://b"}, "page": {"title": "Other", "url": "http://b/2"}}"#,
        ]
        .join("\n");
        tokio::fs::write(&path, body).await.unwrap();

        let db = SlideDb::open_in_memory().await.unwrap();
        execute(db.clone(), PipelineConfig::default(), path.to_str().unwrap()).await.unwrap();
        tokio::fs::remove_file(&path).await.unwrap();

        assert_eq!(db.count_slides().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_execute_keeps_line_order_per_slide() {
        let path = std::env::temp_dir().join(format!("artarchive-ingest-order-{}.jsonl", std::process::id()));
        let mut lines = Vec::new();
        for n in 0..20 {
            lines.push(format!(
                r#"{{"site": {{"title": "Blog", "url": "http://b"}}, "page": {{"title": "Post {n}", "url": "http://b/{n}"}}}}"#
            ));
            lines.push(format!(r#"{{"guid_hash": "same", "site": {{"title": "Blog", "url": "http://b"}}, "page": {{"title": "Post", "url": "http://b/x"}}, "content": "revision {n}"}}"#));
        }
        tokio::fs::write(&path, lines.join("\n")).await.unwrap();

        let db = SlideDb::open_in_memory().await.unwrap();
        execute(db.clone(), PipelineConfig::default(), path.to_str().unwrap()).await.unwrap();
        tokio::fs::remove_file(&path).await.unwrap();

        assert_eq!(db.count_slides().await.unwrap(), 21);
        assert_eq!(db.get_slide("same").await.unwrap().unwrap().content, "revision 19");
    }

    #[tokio::test]
    async fn test_execute_reports_failures() {
        let path = std::env::temp_dir().join(format!("artarchive-ingest-bad-{}.jsonl", std::process::id()));
        tokio::fs::write(&path, "{\"content\": \"no site\"}\nnot json\n").await.unwrap();

        let db = SlideDb::open_in_memory().await.unwrap();
        let result = execute(db.clone(), PipelineConfig::default(), path.to_str().unwrap()).await;
        tokio::fs::remove_file(&path).await.unwrap();

        assert!(result.is_err());
        assert_eq!(db.count_slides().await.unwrap(), 0);
    }
}
