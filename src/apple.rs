use std::path::Path;

use anyhow::{bail, Result};
use serde_json::Value;
use tracing::{info, warn};

use crate::fetch::ReviewSource;
use crate::flatten::{extract_by_map, ExtractRule, FlatRecord};
use crate::persist;

pub const SOURCE: &str = "apple";

/// Top-level keys of one feed entry. The feed wraps every scalar in a
/// `{"label": ...}` object, hence the uniform nested key.
const TOP_RULES: &[ExtractRule] = &[
    ExtractRule::nested("im:version", "label", "im_version"),
    ExtractRule::nested("im:rating", "label", "im_rating"),
    ExtractRule::nested("id", "label", "id"),
    ExtractRule::nested("title", "label", "title"),
    ExtractRule::nested("content", "label", "content"),
    ExtractRule::nested("im:voteSum", "label", "im_votesum"),
    ExtractRule::nested("im:voteCount", "label", "im_votecount"),
];

const AUTHOR_RULES: &[ExtractRule] = &[
    ExtractRule::nested("uri", "label", "author_uri"),
    ExtractRule::nested("name", "label", "author_name"),
];

const LINK_RULES: &[ExtractRule] = &[
    ExtractRule::nested("attributes", "rel", "link_attributes_related"),
    ExtractRule::nested("attributes", "href", "link_attributes_href"),
];

const CONTENT_TYPE_RULES: &[ExtractRule] = &[
    ExtractRule::nested("attributes", "term", "content_attributes_term"),
    ExtractRule::nested("attributes", "label", "content_attributes_label"),
];

/// Named nested sections of an entry, each with its own map. Destination
/// fields never collide across these or TOP_RULES.
const REVIEW_SECTIONS: &[(&str, &[ExtractRule])] = &[
    ("author", AUTHOR_RULES),
    ("link", LINK_RULES),
    ("im:contentType", CONTENT_TYPE_RULES),
];

/// Flatten one feed entry: top-level map on the entry root, then each named
/// section's map on that section, merged into one record. A section absent
/// from the entry is skipped.
pub fn flatten_review(review: &Value) -> Result<FlatRecord> {
    let Some(root) = review.as_object() else {
        bail!("schema mismatch: feed entry is not an object");
    };

    let mut record = extract_by_map(TOP_RULES, root)?;
    for (name, rules) in REVIEW_SECTIONS {
        let Some(section) = root.get(*name) else {
            continue;
        };
        let Some(section) = section.as_object() else {
            bail!("schema mismatch: section '{}' is not an object", name);
        };
        record.append(&mut extract_by_map(rules, section)?);
    }
    Ok(record)
}

pub struct CollectStats {
    pub pages: usize,
    pub records: usize,
    pub errors: usize,
}

/// Fetch pages 1..=max_pages in order, flattening every entry into one batch.
///
/// Termination policy: a failed fetch ends the run with whatever has been
/// collected so far (partial results are always returned, even when page 1
/// fails). A page that parses but has no array at `feed.entry` is the feed's
/// "no more reviews" signal and ends pagination normally. Each good page is
/// written verbatim to `out_dir` before its entries are flattened; a record
/// that fails to flatten is logged, counted, and skipped.
pub async fn collect_pages(
    source: &impl ReviewSource,
    max_pages: u32,
    out_dir: &Path,
) -> Result<(Vec<FlatRecord>, CollectStats)> {
    let mut batch: Vec<FlatRecord> = Vec::new();
    let mut stats = CollectStats {
        pages: 0,
        records: 0,
        errors: 0,
    };

    for page in 1..=max_pages {
        let Some(body) = source.fetch_page(page).await else {
            warn!(
                "Cannot get reviews for page {}; stopping with {} records collected",
                page,
                batch.len()
            );
            break;
        };

        let parsed: Value = match serde_json::from_str(&body) {
            Ok(v) => v,
            Err(e) => {
                info!("Page {} is not valid JSON ({}); treating as end of data", page, e);
                break;
            }
        };

        let entries = parsed
            .get("feed")
            .and_then(|feed| feed.get("entry"))
            .and_then(|entry| entry.as_array());
        let Some(entries) = entries else {
            info!("No more entries at page {}", page);
            break;
        };

        persist::save_raw_page(out_dir, SOURCE, page, &body)?;

        for entry in entries {
            match flatten_review(entry) {
                Ok(record) => {
                    batch.push(record);
                    stats.records += 1;
                }
                Err(e) => {
                    warn!("Skipping malformed review on page {}: {}", page, e);
                    stats.errors += 1;
                }
            }
        }
        stats.pages += 1;
    }

    Ok((batch, stats))
}

// ── Tests ──
