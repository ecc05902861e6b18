// Duplicate detection and canonical-casing pass over a persisted list.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use crate::api::{character_info, TibiaApi};
use crate::names::{dedup_first, find_duplicates, fold};

use super::Normalization;

const PROGRESS_EVERY: usize = 50;

#[derive(Debug, Clone, Default)]
pub struct SanityReport {
    pub original_count: usize,
    /// Folded key -> every spelling found, in list order.
    pub duplicates: BTreeMap<String, Vec<String>>,
    pub duplicates_removed: usize,
    pub normalized: Vec<Normalization>,
    /// Names the remote source did not confirm; kept as they were.
    pub not_found: Vec<String>,
    pub cleaned: Vec<String>,
}

impl SanityReport {
    /// Whether the cleaned list differs from the input and should be saved.
    pub fn changed(&self) -> bool {
        !self.duplicates.is_empty() || !self.normalized.is_empty()
    }
}

/// Drop case-insensitive duplicates (first spelling wins) and rewrite each
/// survivor to its canonical casing. Names that cannot be confirmed stay.
pub async fn sanitize<A: TibiaApi + ?Sized>(
    api: &A,
    names: &[String],
    lookup_delay: Duration,
) -> SanityReport {
    let duplicates = find_duplicates(names);
    if duplicates.is_empty() {
        tracing::info!("No duplicates found");
    } else {
        tracing::warn!("{} case-insensitive duplicate(s) detected", duplicates.len());
        for (key, variants) in &duplicates {
            tracing::warn!("'{key}' appears {} times as: {variants:?}", variants.len());
        }
    }

    let unique = dedup_first(names);
    let mut report = SanityReport {
        original_count: names.len(),
        duplicates_removed: names.len() - unique.len(),
        duplicates,
        ..SanityReport::default()
    };
    tracing::info!(
        "After deduplication: {} unique entries (removed {} duplicates)",
        unique.len(),
        report.duplicates_removed
    );

    let total = unique.len();
    let mut kept: HashMap<String, String> = HashMap::with_capacity(total);
    for (i, name) in unique.into_iter().enumerate() {
        if i > 0 && !lookup_delay.is_zero() {
            tokio::time::sleep(lookup_delay).await;
        }
        if (i + 1) % PROGRESS_EVERY == 0 {
            tracing::info!("Progress: {}/{} names checked...", i + 1, total);
        }

        let resolved = match character_info(api, &name).await {
            Some(info) if info.name != name => {
                tracing::info!("[NORMALIZED] '{name}' -> '{}'", info.name);
                report.normalized.push(Normalization {
                    old: name,
                    new: info.name.clone(),
                });
                info.name
            }
            Some(_) => name,
            None => {
                tracing::warn!("[NOT FOUND] '{name}' - character may not exist, keeping original");
                report.not_found.push(name.clone());
                name
            }
        };

        // A renamed character can resolve onto a name kept earlier.
        let key = fold(&resolved);
        match kept.get(&key) {
            Some(first) => {
                tracing::warn!("'{resolved}' duplicates kept entry '{first}' - dropping");
                report
                    .duplicates
                    .entry(key)
                    .or_insert_with(|| vec![first.clone()])
                    .push(resolved);
                report.duplicates_removed += 1;
            }
            None => {
                kept.insert(key, resolved.clone());
                report.cleaned.push(resolved);
            }
        }
    }

    report
}
