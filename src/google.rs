use serde_json::Value;
use tracing::{debug, info, warn};

use crate::flatten::search::search_key;
use crate::flatten::FlatRecord;

pub const SOURCE: &str = "google";

/// Optional fields pre-populated as Null so every record carries the same
/// column set regardless of which of them the source review included.
const OPTIONAL_FIELDS: &[&str] = &[
    "android_os_version",
    "app_version_code",
    "app_version_name",
    "device",
    "reviewer_language",
    "dev_comment_last_modified_seconds",
    "dev_comment_last_modified_nanos",
    "dev_comment_text",
];

/// User-comment fields, resolved by recursive search because the Play schema
/// nests them at varying optional depths. (source key, destination field)
const COMMENT_FIELDS: &[(&str, &str)] = &[
    ("starRating", "star_rating"),
    ("reviewerLanguage", "reviewer_language"),
    ("device", "device"),
    ("androidOsVersion", "android_os_version"),
    ("appVersionCode", "app_version_code"),
    ("appVersionName", "app_version_name"),
    ("thumbsUpCount", "thumbs_up_count"),
    ("thumbsDownCount", "thumbs_down_count"),
    ("originalText", "original_text"),
];

const METADATA_FIELDS: &[(&str, &str)] = &[
    ("productName", "device_product_name"),
    ("manufacturer", "device_manufacturer"),
    ("screenHeightPx", "device_screen_height_px"),
    ("screenWidthPx", "device_screen_width_px"),
    ("nativePlatform", "device_native_platform"),
    ("screenDensityDpi", "device_screen_density_dpi"),
    ("glEsVersion", "device_gles_version"),
    ("cpuModel", "device_cpu_model"),
    ("cpuMake", "device_cpu_make"),
    ("ramMb", "device_ram_mb"),
];

/// Process a materialized `{reviews: [...]}` collection (fetching and OAuth
/// are the API client's job, upstream of this crate). Each comment entry of
/// each review becomes one flat record sharing the review's id and author.
/// Returns the batch plus the number of reviews skipped for having no
/// comments list.
pub fn process_reviews(root: &Value) -> (Vec<FlatRecord>, usize) {
    let Some(reviews) = root.get("reviews").and_then(Value::as_array) else {
        warn!("No reviews found in input");
        return (Vec::new(), 0);
    };

    let mut batch: Vec<FlatRecord> = Vec::new();
    let mut skipped = 0usize;
    for review in reviews {
        let review_id = review.get("reviewId").cloned().unwrap_or(Value::Null);
        let author_name = review.get("authorName").cloned().unwrap_or(Value::Null);

        let Some(comments) = review.get("comments").and_then(Value::as_array) else {
            debug!("Review {} has no comments list", review_id);
            skipped += 1;
            continue;
        };
        for comment in comments {
            batch.push(flatten_comment(comment, &review_id, &author_name));
        }
    }

    info!("Processed {} records", batch.len());
    (batch, skipped)
}

/// Flatten one comment entry. A comment entry may carry a user comment, a
/// developer comment, or both; whichever is present contributes its fields,
/// the rest stay at their pre-populated Null.
fn flatten_comment(comment: &Value, review_id: &Value, author_name: &Value) -> FlatRecord {
    let mut record = FlatRecord::new();
    record.insert("review_id".into(), review_id.clone());
    record.insert("author_name".into(), author_name.clone());
    for field in OPTIONAL_FIELDS {
        record.insert((*field).to_string(), Value::Null);
    }

    if let Some(user) = comment.get("userComment") {
        if let Some(text) = user.get("text") {
            record.insert("user_comment".into(), text.clone());
        }
        if let Some(last_modified) = user.get("lastModified") {
            insert_timestamp(&mut record, last_modified, "user_comment_last_modified");
        }
        for (source, dest) in COMMENT_FIELDS {
            let value = search_key(user, source).cloned().unwrap_or(Value::Null);
            record.insert((*dest).to_string(), value);
        }
        if let Some(metadata) = user.get("deviceMetadata") {
            for (source, dest) in METADATA_FIELDS {
                let value = search_key(metadata, source).cloned().unwrap_or(Value::Null);
                record.insert((*dest).to_string(), value);
            }
        }
    }

    if let Some(dev) = comment.get("developerComment") {
        if let Some(text) = dev.get("text") {
            record.insert("dev_comment_text".into(), text.clone());
        }
        if let Some(last_modified) = dev.get("lastModified") {
            insert_timestamp(&mut record, last_modified, "dev_comment_last_modified");
        }
    }

    record
}

fn insert_timestamp(record: &mut FlatRecord, last_modified: &Value, prefix: &str) {
    let seconds = last_modified.get("seconds").cloned().unwrap_or(Value::Null);
    let nanos = last_modified.get("nanos").cloned().unwrap_or(Value::Null);
    record.insert(format!("{}_seconds", prefix), seconds);
    record.insert(format!("{}_nanos", prefix), nanos);
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn user_comment_only_leaves_dev_fields_null() {
        let root = json!({
            "reviews": [{
                "reviewId": "r1",
                "authorName": "alice",
                "comments": [{"userComment": {"text": "great"}}]
            }]
        });
        let (batch, skipped) = process_reviews(&root);
        assert_eq!(batch.len(), 1);
        assert_eq!(skipped, 0);
        let r = &batch[0];
        assert_eq!(r["user_comment"], json!("great"));
        assert_eq!(r["dev_comment_text"], Value::Null);
        assert_eq!(r["dev_comment_last_modified_seconds"], Value::Null);
    }

    #[test]
    fn one_record_per_comment_entry_sharing_id_and_author() {
        let root = json!({
            "reviews": [{
                "reviewId": "r1",
                "authorName": "alice",
                "comments": [
                    {"userComment": {"text": "love it", "starRating": 5}},
                    {"developerComment": {
                        "text": "thanks!",
                        "lastModified": {"seconds": "1600000000", "nanos": 0}
                    }}
                ]
            }]
        });
        let (batch, _) = process_reviews(&root);
        assert_eq!(batch.len(), 2);
        for r in &batch {
            assert_eq!(r["review_id"], json!("r1"));
            assert_eq!(r["author_name"], json!("alice"));
        }
        assert_eq!(batch[0]["user_comment"], json!("love it"));
        assert_eq!(batch[0]["star_rating"], json!(5));
        assert_eq!(batch[1]["dev_comment_text"], json!("thanks!"));
        assert_eq!(batch[1]["dev_comment_last_modified_seconds"], json!("1600000000"));
        assert!(!batch[1].contains_key("user_comment"));
    }

    #[test]
    fn optional_fields_are_present_and_null_on_every_record() {
        let root = json!({
            "reviews": [{
                "reviewId": "r1",
                "authorName": "a",
                "comments": [{"userComment": {"text": "hi"}}]
            }]
        });
        let (batch, _) = process_reviews(&root);
        for field in OPTIONAL_FIELDS {
            assert!(batch[0].contains_key(*field), "missing {}", field);
        }
    }

    #[test]
    fn device_metadata_fields_extracted_when_present() {
        let root = json!({
            "reviews": [{
                "reviewId": "r2",
                "authorName": "bob",
                "comments": [{"userComment": {
                    "text": "ok",
                    "starRating": 3,
                    "androidOsVersion": 28,
                    "deviceMetadata": {
                        "productName": "Pixel 4",
                        "manufacturer": "Google",
                        "ramMb": 6144
                    }
                }}]
            }]
        });
        let (batch, _) = process_reviews(&root);
        let r = &batch[0];
        assert_eq!(r["device_product_name"], json!("Pixel 4"));
        assert_eq!(r["device_manufacturer"], json!("Google"));
        assert_eq!(r["device_ram_mb"], json!(6144));
        assert_eq!(r["device_cpu_model"], Value::Null);
        assert_eq!(r["android_os_version"], json!(28));
    }

    #[test]
    fn review_without_comments_is_skipped() {
        let root = json!({
            "reviews": [
                {"reviewId": "r1", "authorName": "a"},
                {"reviewId": "r2", "authorName": "b",
                 "comments": [{"userComment": {"text": "x"}}]}
            ]
        });
        let (batch, skipped) = process_reviews(&root);
        assert_eq!(batch.len(), 1);
        assert_eq!(skipped, 1);
        assert_eq!(batch[0]["review_id"], json!("r2"));
    }

    #[test]
    fn missing_reviews_key_yields_empty_batch() {
        let (batch, skipped) = process_reviews(&json!({"something": "else"}));
        assert!(batch.is_empty());
        assert_eq!(skipped, 0);
    }

    #[test]
    fn fixture_batch_processes_in_delivered_order() {
        let body = std::fs::read_to_string("tests/fixtures/google_reviews.json").unwrap();
        let root: Value = serde_json::from_str(&body).unwrap();
        let (batch, _) = process_reviews(&root);
        assert_eq!(batch.len(), 3); // two comments on the first review, one on the second
        assert_eq!(batch[0]["review_id"], batch[1]["review_id"]);
        assert_ne!(batch[0]["review_id"], batch[2]["review_id"]);
        assert_eq!(batch[0]["star_rating"], json!(5));
        assert_eq!(batch[1]["dev_comment_text"], json!("Thanks for the feedback!"));
    }
}
