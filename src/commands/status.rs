use anyhow::{Context, Result};

use seadex_monitor::config::Config;
use seadex_monitor::reconcile::score;
use seadex_monitor::storage::SnapshotStore;

/// Print the persisted series tree with each entry's chosen release
pub async fn status(config: &Config) -> Result<()> {
    let store = SnapshotStore::new(config.storage.snapshot_path());

    if !store.path().exists() {
        println!("No snapshot at {} yet", store.path().display());
        return Ok(());
    }

    let series = store
        .try_load()
        .await
        .with_context(|| format!("Failed to read snapshot {}", store.path().display()))?;

    let entries: usize = series.iter().map(|s| s.anilist_entries.len()).sum();
    let chosen: usize = series.iter().map(|s| s.chosen_releases().count()).sum();

    println!("Snapshot: {}", store.path().display());
    println!("  {} series, {entries} AniList entries, {chosen} chosen releases", series.len());

    for item in &series {
        println!();
        println!("{} (Sonarr #{}, {} seasons)", item.title, item.sonarr_id, item.num_seasons);

        for entry in &item.anilist_entries {
            let mut flags = Vec::new();
            if entry.manually_added {
                flags.push("manual");
            }
            if entry.ignore {
                flags.push("ignored");
            }
            let flags = if flags.is_empty() {
                String::new()
            } else {
                format!(" [{}]", flags.join(", "))
            };

            println!(
                "  AniList #{} {} ({}){flags}: {} releases",
                entry.anilist_id,
                entry.title,
                entry.season_year,
                entry.torrents.len()
            );

            if let Some(release) = entry.chosen() {
                let private = if release.is_private() { ", private" } else { "" };
                println!(
                    "    chosen: {} on {} (score {}{private}) {}",
                    release.id,
                    release.tracker,
                    score(release, &config.scoring),
                    release.url
                );
            }
        }
    }

    Ok(())
}
