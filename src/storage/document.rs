//! Explicit mapping between the series tree and its JSON document
//!
//! The document layout is a top-level array of series objects:
//!
//! ```json
//! [{"sonarr_id": 1, "title": "...", "num_seasons": 2, "anilist_entries": [
//!     {"anilist_id": 10, "title": "...", "season_year": 2020,
//!      "manually_added": false, "ignore": false, "torrents": [
//!         {"id": "...", "info_hash": "...", "tracker": "...", "url": "...",
//!          "is_best": true, "dual_audio": false, "chosen": true}]}]}]
//! ```
//!
//! Decoding drops an item that lacks its key field and keeps its siblings.
//! Optional fields fall back to empty or false.

use serde_json::{json, Map, Value};
use tracing::warn;

use crate::models::{MetadataEntry, Release, Series};
use crate::utils::error::StorageError;

/// Encode the series tree
pub fn series_to_document(series: &[Series]) -> Value {
    Value::Array(series.iter().map(series_to_value).collect())
}

/// Decode the series tree
///
/// Fails only when the root is not an array.
pub fn series_from_document(document: Value) -> Result<Vec<Series>, StorageError> {
    let Value::Array(items) = document else {
        return Err(StorageError::Malformed("root is not an array".to_string()));
    };

    Ok(items.iter().filter_map(series_from_value).collect())
}

fn series_to_value(series: &Series) -> Value {
    json!({
        "sonarr_id": series.sonarr_id,
        "title": series.title,
        "num_seasons": series.num_seasons,
        "anilist_entries": series.anilist_entries.iter().map(entry_to_value).collect::<Vec<_>>(),
    })
}

fn entry_to_value(entry: &MetadataEntry) -> Value {
    json!({
        "anilist_id": entry.anilist_id,
        "title": entry.title,
        "season_year": entry.season_year,
        "torrents": entry.torrents.iter().map(release_to_value).collect::<Vec<_>>(),
        "manually_added": entry.manually_added,
        "ignore": entry.ignore,
    })
}

fn release_to_value(release: &Release) -> Value {
    json!({
        "id": release.id,
        "info_hash": release.info_hash,
        "tracker": release.tracker,
        "url": release.url,
        "is_best": release.is_best,
        "dual_audio": release.dual_audio,
        "chosen": release.chosen,
    })
}

fn series_from_value(value: &Value) -> Option<Series> {
    let object = value.as_object()?;
    let Some(sonarr_id) = object.get("sonarr_id").and_then(Value::as_i64) else {
        warn!("Dropping persisted series without sonarr_id");
        return None;
    };

    let mut series = Series::new(
        sonarr_id,
        string_field(object, "title"),
        object
            .get("num_seasons")
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(0),
    );
    series.anilist_entries = array_field(object, "anilist_entries")
        .iter()
        .filter_map(entry_from_value)
        .collect();

    Some(series)
}

fn entry_from_value(value: &Value) -> Option<MetadataEntry> {
    let object = value.as_object()?;
    let Some(anilist_id) = object.get("anilist_id").and_then(Value::as_i64) else {
        warn!("Dropping persisted AniList entry without anilist_id");
        return None;
    };

    let season_year = object
        .get("season_year")
        .and_then(Value::as_i64)
        .and_then(|year| i32::try_from(year).ok())
        .unwrap_or(0);

    let mut entry = MetadataEntry::new(anilist_id, string_field(object, "title"), season_year);
    entry.manually_added = bool_field(object, "manually_added");
    entry.ignore = bool_field(object, "ignore");
    entry.torrents = array_field(object, "torrents")
        .iter()
        .filter_map(release_from_value)
        .collect();

    Some(entry)
}

fn release_from_value(value: &Value) -> Option<Release> {
    let object = value.as_object()?;
    let id = object.get("id").and_then(Value::as_str);
    let info_hash = object.get("info_hash").and_then(Value::as_str);

    let (Some(id), Some(info_hash)) = (id, info_hash) else {
        warn!("Dropping persisted release without id or info_hash");
        return None;
    };

    Some(
        Release::new(id, info_hash, string_field(object, "tracker"), string_field(object, "url"))
            .with_best(bool_field(object, "is_best"))
            .with_dual_audio(bool_field(object, "dual_audio"))
            .with_chosen(bool_field(object, "chosen")),
    )
}

fn string_field(object: &Map<String, Value>, key: &str) -> String {
    object
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn bool_field(object: &Map<String, Value>, key: &str) -> bool {
    object.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn array_field<'a>(object: &'a Map<String, Value>, key: &str) -> &'a [Value] {
    object
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}
