use anyhow::{Context, Result};

use seadex_monitor::config::Config;
use seadex_monitor::sync::{PassReport, SyncEngine, Trigger};

/// Run one pass and print its report
pub async fn sync(config: Config, json: bool) -> Result<()> {
    let engine = SyncEngine::from_config(&config)?;
    let report = engine.run_pass(Trigger::Manual).await;

    if json {
        let rendered = serde_json::to_string_pretty(&report).context("Failed to render report")?;
        println!("{rendered}");
    } else {
        print_report(&report);
    }

    if !report.persisted {
        anyhow::bail!(
            "Pass finished but the snapshot could not be written to {}",
            engine.store().path().display()
        );
    }

    Ok(())
}

fn print_report(report: &PassReport) {
    println!("Sync pass {} ({})", report.pass_id, report.trigger);
    if report.series_source_failed {
        println!("  Sonarr unavailable, known series reused");
    }
    println!(
        "  Series: {} kept, {} added, {} removed",
        report.series_kept, report.series_added, report.series_removed
    );
    println!(
        "  AniList: {} searches, {} entries added, {} removed",
        report.searches, report.entries_added, report.entries_removed
    );
    println!(
        "  SeaDex: {} lookups, {} releases discovered, {} dropped",
        report.lookups, report.releases_discovered, report.releases_dropped
    );
    println!("  Skipped this pass: {}", report.skipped);
    println!(
        "  Selections: {} ({} sent, {} declined, {} failed)",
        report.selections,
        report.submissions_sent,
        report.submissions_declined,
        report.submissions_failed
    );
    println!("  Duration: {} ms", report.duration_ms);
}
