//! Zero-cost Atom feed parsing.
//!
//! The per-channel feed is an early-warning hint that a known channel has a
//! new video; every id still gets validated through the batch API before it
//! can enter the catalog.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use vigil_core::VigilError;

/// Only entries published within this window are worth validating.
const FRESH_WINDOW_HOURS: i64 = 2;
/// Entries examined per poll; the feed lists newest first.
const ENTRIES_PER_POLL: usize = 5;

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(rename = "entry", default)]
    entries: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    #[serde(rename = "videoId")]
    video_id: String,
    published: String,
}

/// Extract the ids of freshly published videos from a raw Atom document.
pub fn fresh_video_ids(xml: &str, now: DateTime<Utc>) -> Result<Vec<String>, VigilError> {
    let feed: Feed = quick_xml::de::from_str(xml)
        .map_err(|e| VigilError::parse(format!("malformed feed: {e}")))?;
    let cutoff = now - Duration::hours(FRESH_WINDOW_HOURS);
    let mut ids = Vec::new();
    for entry in feed.entries.iter().take(ENTRIES_PER_POLL) {
        let Ok(published) = DateTime::parse_from_rfc3339(&entry.published) else {
            // One malformed entry should not sink the whole poll.
            continue;
        };
        if published.with_timezone(&Utc) >= cutoff {
            ids.push(entry.video_id.clone());
        }
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_xml(entries: &[(&str, DateTime<Utc>)]) -> String {
        let body: String = entries
            .iter()
            .map(|(id, published)| {
                format!(
                    "<entry><yt:videoId>{id}</yt:videoId><published>{}</published></entry>",
                    published.to_rfc3339()
                )
            })
            .collect();
        format!(
            "<feed xmlns=\"http://www.w3.org/2005/Atom\" \
             xmlns:yt=\"http://www.youtube.com/xml/schemas/2015\">{body}</feed>"
        )
    }

    #[test]
    fn fresh_entries_surface() {
        let now = Utc::now();
        let xml = feed_xml(&[
            ("new1", now - Duration::minutes(10)),
            ("old", now - Duration::hours(5)),
            ("new2", now - Duration::minutes(90)),
        ]);
        let ids = fresh_video_ids(&xml, now).unwrap();
        assert_eq!(ids, vec!["new1".to_string(), "new2".to_string()]);
    }

    #[test]
    fn only_the_newest_entries_are_examined() {
        let now = Utc::now();
        let mut entries: Vec<(String, DateTime<Utc>)> = (0..8)
            .map(|n| (format!("v{n}"), now - Duration::minutes(n)))
            .collect();
        // The sixth entry is fresh but beyond the per-poll window.
        entries[5].1 = now;
        let borrowed: Vec<(&str, DateTime<Utc>)> =
            entries.iter().map(|(id, t)| (id.as_str(), *t)).collect();
        let ids = fresh_video_ids(&feed_xml(&borrowed), now).unwrap();
        assert_eq!(ids.len(), 5);
        assert!(!ids.contains(&"v5".to_string()));
    }

    #[test]
    fn empty_feed_yields_nothing() {
        let ids = fresh_video_ids(
            "<feed xmlns=\"http://www.w3.org/2005/Atom\"></feed>",
            Utc::now(),
        )
        .unwrap();
        assert!(ids.is_empty());
    }

    #[test]
    fn garbage_is_a_parse_error() {
        assert!(fresh_video_ids("not xml at all", Utc::now()).is_err());
    }
}
