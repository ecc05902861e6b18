// Batch jobs: one run reads its files once, reconciles, and writes once.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use futures::future::join_all;

use crate::api::TibiaApi;
use crate::config::Config;
use crate::error::JobError;
use crate::names::{fold, folded_set};
use crate::online::{self, OnlineStatus};
use crate::reconcile::{self, EnemyReport, RosterReport, SanityReport};
use crate::store;

/// Load a list the job only reads. A corrupt file is reported and treated
/// as empty.
fn load_auxiliary(path: &Path) -> Vec<String> {
    store::load_list(path).unwrap_or_else(|e| {
        tracing::warn!("Ignoring unreadable list: {e}");
        Vec::new()
    })
}

/// Grow the trolls list from killers of online enemy guild members.
pub async fn run_enemies<A: TibiaApi + ?Sized>(
    config: &Config,
    api: &A,
) -> Result<EnemyReport, JobError> {
    let trolls_path = config.trolls_file();
    let mut trolls = store::load_list(&trolls_path)?;
    let allied = load_auxiliary(&config.bastex_file());
    tracing::info!(
        "Loaded {} trolls and {} bastex entries",
        trolls.len(),
        allied.len()
    );

    let report = reconcile::grow_trolls(api, &mut trolls, &allied, &config.enemy_guilds).await;

    tracing::info!(
        initial = report.initial_count,
        added = report.additions.len(),
        normalized = report.normalizations.len(),
        final_count = report.final_count,
        "Enemy check summary"
    );
    for a in &report.additions {
        tracing::info!("Added {} ({}) - killed {}", a.name, a.world, a.victim);
    }
    for n in &report.normalizations {
        tracing::info!("Normalized '{}' -> '{}'", n.old, n.new);
    }

    if report.modified() {
        store::save_list(&trolls_path, &trolls)?;
    } else {
        tracing::info!("No changes to save");
    }
    Ok(report)
}

/// Refresh the world/guild member snapshot.
///
/// The snapshot is saved even on total outage (it is then unchanged), and
/// the outage is reported afterwards.
pub async fn run_guilds<A: TibiaApi + ?Sized>(
    config: &Config,
    api: &A,
) -> Result<RosterReport, JobError> {
    let path = config.world_guilds_file();
    let previous = match store::load_snapshot(&path) {
        Ok(snapshot) => {
            tracing::info!("Loaded existing data with {} worlds", snapshot.len());
            snapshot
        }
        Err(e) => {
            tracing::warn!("Could not load existing data: {e}");
            Default::default()
        }
    };

    let report = reconcile::refresh_snapshot(api, &previous, &config.worlds).await;
    store::save_snapshot(&path, &report.snapshot)?;

    if report.total_outage() {
        return Err(JobError::TotalOutage {
            worlds: report.worlds_total,
        });
    }
    tracing::info!(
        "Job completed with {}/{} worlds processed",
        report.worlds_ok,
        report.worlds_total
    );
    Ok(report)
}

/// Deduplicate and normalize every sanity-checked list. A file that cannot
/// be loaded is reported and skipped; the others still run.
pub async fn run_sanity<A: TibiaApi + ?Sized>(
    config: &Config,
    api: &A,
) -> Result<Vec<(PathBuf, SanityReport)>, JobError> {
    let mut results = Vec::new();

    for path in config.sanity_files() {
        tracing::info!(file = %path.display(), "Processing");
        let names = match store::load_list(&path) {
            Ok(names) => names,
            Err(e) => {
                tracing::error!("Skipping due to load error: {e}");
                continue;
            }
        };

        let report = reconcile::sanitize(api, &names, config.lookup_delay).await;
        tracing::info!(
            file = %path.display(),
            original = report.original_count,
            duplicates_removed = report.duplicates_removed,
            normalized = report.normalized.len(),
            not_found = report.not_found.len(),
            final_count = report.cleaned.len(),
            "Sanity summary"
        );

        if report.changed() {
            store::save_list(&path, &report.cleaned)?;
        } else {
            tracing::info!(file = %path.display(), "Already clean");
        }
        results.push((path, report));
    }

    tracing::info!(
        "Files processed: {}, modified: {}",
        results.len(),
        results.iter().filter(|(_, r)| r.changed()).count()
    );
    Ok(results)
}

/// Track who is online on each world and log them by category.
pub async fn run_online<A: TibiaApi + ?Sized>(
    config: &Config,
    api: &A,
) -> Result<OnlineStatus, JobError> {
    let trolls = store::load_list(&config.trolls_file())?;
    let alerts = load_auxiliary(&config.alerts_file());
    let snapshot = store::load_snapshot(&config.world_guilds_file()).unwrap_or_else(|e| {
        tracing::warn!("Ignoring unreadable guild snapshot: {e}");
        Default::default()
    });
    let status_path = config.online_status_file();
    let mut status = store::load_online_status(&status_path)?;

    // Display path only; the rosters are independent, so fetch them together.
    let rosters = join_all(config.worlds.iter().map(|w| api.world_online(w))).await;
    let observed: BTreeMap<String, Option<Vec<_>>> =
        config.worlds.iter().cloned().zip(rosters).collect();

    let now = chrono::Utc::now().naive_utc();
    let alert_keys = folded_set(&alerts);
    for (world, name) in online::update_status(&mut status, &observed, now) {
        if alert_keys.contains(&fold(&name)) {
            tracing::warn!(world = %world, "{name} just logged on!");
        }
    }

    for (world, roster) in &observed {
        let Some(players) = roster else {
            tracing::warn!(world = %world, "Failed to fetch online players");
            continue;
        };
        let seen = status.get(world);
        let categories = online::categorize(
            players,
            &trolls,
            &alerts,
            snapshot.get(world),
            &config.special_guilds,
        );
        tracing::info!(world = %world, "{} online", players.len());
        for category in categories {
            let listing: Vec<String> = category
                .players
                .iter()
                .map(|p| {
                    let since = seen
                        .and_then(|s| s.get(&p.name))
                        .map(|stamp| online::format_online_since(stamp, now))
                        .unwrap_or_else(|| "0m".to_string());
                    format!("[{}] {} ({since})", p.level, p.name)
                })
                .collect();
            tracing::info!(
                world = %world,
                "{} ({}): {}",
                category.name,
                category.players.len(),
                listing.join(", ")
            );
        }
    }

    store::save_online_status(&status_path, &status)?;

    if !config.worlds.is_empty() && observed.values().all(Option::is_none) {
        return Err(JobError::TotalOutage {
            worlds: config.worlds.len(),
        });
    }
    Ok(status)
}
