// Integration tests for the three reconciliation algorithms, run against an
// in-memory API.

mod common;

use std::collections::BTreeMap;
use std::time::Duration;

use common::{strings, FakeApi};
use tibia_ops::names::{find_duplicates, CaseIndex};
use tibia_ops::reconcile::{
    grow_trolls, refresh_snapshot, sanitize, CandidateOutcome, EnemyReport, GuildSnapshot,
    Normalization, TrollList,
};

fn enemy(guild: &str, world: &str) -> Vec<(String, String)> {
    vec![(guild.to_string(), world.to_string())]
}

/// Every entry of `before` is still present, case-insensitively.
fn is_superset(after: &[String], before: &[String]) -> bool {
    let index = CaseIndex::build(after);
    before.iter().all(|n| index.contains(n))
}

// ── Troll-list growth ────────────────────────────────────────────────

#[tokio::test]
async fn test_adds_unguilded_player_killer_only() {
    let api = FakeApi::new()
        .guild("Bastex", &[("Evil Player", "online"), ("Sleeper", "offline")])
        .character(
            "Evil Player",
            "Firmera",
            "Bastex",
            &[("Another Troll", true), ("a dragon lord", false)],
        )
        .character("Another Troll", "Firmera", "", &[]);

    let mut trolls = strings(&["Ruslex"]);
    let report = grow_trolls(&api, &mut trolls, &[], &enemy("Bastex", "Firmera")).await;

    assert_eq!(trolls, strings(&["Ruslex", "Another Troll"]));
    assert_eq!(report.additions.len(), 1);
    assert_eq!(report.additions[0].name, "Another Troll");
    assert_eq!(report.additions[0].victim, "Evil Player");
    assert!(report.normalizations.is_empty());
    assert!(report.modified());
    // Offline members and creatures are never looked up.
    assert_eq!(api.character_lookups("Sleeper"), 0);
    assert_eq!(api.character_lookups("a dragon lord"), 0);
}

#[tokio::test]
async fn test_rejects_guilded_wrong_world_and_missing() {
    let api = FakeApi::new()
        .guild("Bastex", &[("Victim", "online")])
        .character(
            "Victim",
            "Firmera",
            "Bastex",
            &[("Guilded", true), ("Traveller", true), ("Ghost", true)],
        )
        .character("Guilded", "Firmera", "Some Guild", &[])
        .character("Traveller", "Lobera", "", &[]);

    let mut trolls = Vec::new();
    let report = grow_trolls(&api, &mut trolls, &[], &enemy("Bastex", "Firmera")).await;

    assert!(trolls.is_empty());
    assert!(!report.modified());
}

#[tokio::test]
async fn test_world_match_is_case_insensitive_and_uses_canonical_name() {
    let api = FakeApi::new()
        .guild("Bastex", &[("Victim", "online")])
        .character("Victim", "Firmera", "Bastex", &[("another troll", true)])
        .character("Another Troll", "firmera", "", &[]);

    let mut trolls = Vec::new();
    grow_trolls(&api, &mut trolls, &[], &enemy("Bastex", "Firmera")).await;
    assert_eq!(trolls, strings(&["Another Troll"]));
}

#[tokio::test]
async fn test_allied_killers_are_skipped_without_lookup() {
    let api = FakeApi::new()
        .guild("Bastex", &[("Victim", "online")])
        .character("Victim", "Firmera", "Bastex", &[("Friend", true)])
        .character("Friend", "Firmera", "", &[]);

    let mut trolls = Vec::new();
    grow_trolls(&api, &mut trolls, &strings(&["FRIEND"]), &enemy("Bastex", "Firmera")).await;

    assert!(trolls.is_empty());
    assert_eq!(api.character_lookups("Friend"), 0);
}

#[tokio::test]
async fn test_existing_variant_is_normalized_in_place() {
    let api = FakeApi::new()
        .guild("Bastex", &[("Victim", "online")])
        .character("Victim", "Firmera", "Bastex", &[("RUSLEX", true)])
        .character("Ruslex", "Firmera", "", &[]);

    let mut trolls = strings(&["Alpha", "ruslex", "Omega"]);
    let report = grow_trolls(&api, &mut trolls, &[], &enemy("Bastex", "Firmera")).await;

    assert_eq!(trolls, strings(&["Alpha", "Ruslex", "Omega"]));
    assert!(report.additions.is_empty());
    assert_eq!(
        report.normalizations,
        vec![Normalization {
            old: "ruslex".into(),
            new: "Ruslex".into()
        }]
    );
}

#[tokio::test]
async fn test_exact_match_needs_no_lookup() {
    let api = FakeApi::new()
        .guild("Bastex", &[("Victim", "online")])
        .character("Victim", "Firmera", "Bastex", &[("Ruslex", true)]);

    let mut trolls = strings(&["Ruslex"]);
    let report = grow_trolls(&api, &mut trolls, &[], &enemy("Bastex", "Firmera")).await;

    assert!(!report.modified());
    assert_eq!(api.character_lookups("Ruslex"), 0);
}

#[tokio::test]
async fn test_failed_lookups_never_shrink_the_list() {
    let api = FakeApi::new();
    let mut trolls = strings(&["Alpha", "bravo"]);
    let before = trolls.clone();
    let mut report = EnemyReport::default();
    let mut list = TrollList::new(&mut trolls, &[]);

    let new_name = list
        .consider(&api, "Charlie", "Firmera", "Victim", &mut report)
        .await;
    let variant = list
        .consider(&api, "Bravo", "Firmera", "Victim", &mut report)
        .await;

    assert_eq!(new_name, CandidateOutcome::NotFound);
    assert_eq!(variant, CandidateOutcome::Known);
    assert_eq!(trolls, before);
    assert!(is_superset(&trolls, &before));
}

#[tokio::test]
async fn test_failed_guild_fetch_adds_nothing() {
    let api = FakeApi::new();
    let mut trolls = strings(&["Ruslex"]);
    let report = grow_trolls(&api, &mut trolls, &[], &enemy("Bastex", "Firmera")).await;
    assert_eq!(trolls, strings(&["Ruslex"]));
    assert_eq!(report.initial_count, 1);
    assert_eq!(report.final_count, 1);
}

#[tokio::test]
async fn test_killer_seen_twice_is_added_once() {
    let api = FakeApi::new()
        .guild("Bastex", &[("One", "online"), ("Two", "online")])
        .character("One", "Firmera", "Bastex", &[("Serial", true), ("Serial", true)])
        .character("Two", "Firmera", "Bastex", &[("serial", true)])
        .character("Serial", "Firmera", "", &[]);

    let mut trolls = Vec::new();
    let report = grow_trolls(&api, &mut trolls, &[], &enemy("Bastex", "Firmera")).await;
    assert_eq!(trolls, strings(&["Serial"]));
    assert_eq!(report.additions.len(), 1);
}

#[tokio::test]
async fn test_former_name_of_tracked_character_is_not_added() {
    let api = FakeApi::new()
        .guild("Bastex", &[("Victim", "online")])
        .character("Victim", "Firmera", "Bastex", &[("Old Name", true)])
        .character("Another Troll", "Firmera", "", &[])
        .renamed("Old Name", "Another Troll");

    let mut trolls = strings(&["Another Troll"]);
    let report = grow_trolls(&api, &mut trolls, &[], &enemy("Bastex", "Firmera")).await;

    assert_eq!(trolls, strings(&["Another Troll"]));
    assert!(find_duplicates(&trolls).is_empty());
    assert!(!report.modified());
}

#[tokio::test]
async fn test_stored_former_name_is_rewritten_once() {
    let api = FakeApi::new()
        .character("Another Troll", "Firmera", "", &[])
        .renamed("Old Name", "Another Troll");
    let mut trolls = strings(&["old name"]);
    let mut report = EnemyReport::default();
    let mut list = TrollList::new(&mut trolls, &[]);

    let first = list.consider(&api, "OLD NAME", "Firmera", "V", &mut report).await;
    let current = list.consider(&api, "another troll", "Firmera", "V", &mut report).await;
    let former = list.consider(&api, "Old Name", "Firmera", "V", &mut report).await;

    assert_eq!(first, CandidateOutcome::Normalized);
    assert_eq!(current, CandidateOutcome::Known);
    assert_eq!(former, CandidateOutcome::Known);
    assert_eq!(trolls, strings(&["Another Troll"]));
    assert_eq!(report.normalizations.len(), 1);
    assert!(report.additions.is_empty());
}

#[tokio::test]
async fn test_former_name_stays_when_current_is_tracked_elsewhere() {
    let api = FakeApi::new()
        .character("Another Troll", "Firmera", "", &[])
        .renamed("Old Name", "Another Troll");
    let mut trolls = strings(&["old name", "Another Troll"]);
    let mut report = EnemyReport::default();
    let mut list = TrollList::new(&mut trolls, &[]);

    let outcome = list.consider(&api, "Old Name", "Firmera", "V", &mut report).await;

    assert_eq!(outcome, CandidateOutcome::Known);
    assert_eq!(trolls, strings(&["old name", "Another Troll"]));
    assert!(find_duplicates(&trolls).is_empty());
}

// ── Snapshot with fallback ───────────────────────────────────────────

fn snapshot(entries: &[(&str, &str, &[&str])]) -> GuildSnapshot {
    let mut snap = GuildSnapshot::new();
    for (world, guild, members) in entries {
        snap.entry(world.to_string())
            .or_insert_with(BTreeMap::new)
            .insert(guild.to_string(), strings(members));
    }
    snap
}

#[tokio::test]
async fn test_failed_world_keeps_old_data() {
    let previous = snapshot(&[("Firmera", "Bastex", &["Old Member"])]);
    let api = FakeApi::new()
        .world_guilds("Lobera", &["Red Rose"])
        .guild("Red Rose", &[("Rosie", "offline")]);

    let report = refresh_snapshot(&api, &previous, &strings(&["Firmera", "Lobera"])).await;

    assert_eq!(report.worlds_ok, 1);
    assert_eq!(report.worlds_failed, 1);
    assert!(!report.total_outage());
    assert_eq!(report.snapshot["Firmera"], previous["Firmera"]);
    assert_eq!(report.snapshot["Lobera"]["Red Rose"], strings(&["Rosie"]));
}

#[tokio::test]
async fn test_failed_guild_keeps_old_members_or_stays_absent() {
    let previous = snapshot(&[
        ("Firmera", "Bastex", &["Old Member"]),
        ("Firmera", "Gone Guild", &["Someone"]),
    ]);
    let api = FakeApi::new()
        .world_guilds("Firmera", &["Bastex", "Brand New", "", "Fresh"])
        .guild("Fresh", &[("Newbie", "online")]);

    let report = refresh_snapshot(&api, &previous, &strings(&["Firmera"])).await;
    let firmera = &report.snapshot["Firmera"];

    assert_eq!(firmera["Bastex"], strings(&["Old Member"]));
    assert!(!firmera.contains_key("Brand New"));
    assert_eq!(firmera["Fresh"], strings(&["Newbie"]));
    // Guilds missing from the fresh list are carried over from the old data.
    assert_eq!(firmera["Gone Guild"], strings(&["Someone"]));
    assert_eq!(report.guilds_ok, 1);
    assert_eq!(report.guilds_failed, 2);
}

#[tokio::test]
async fn test_empty_member_list_counts_as_failure() {
    let previous = snapshot(&[("Firmera", "Quiet", &["Lurker"])]);
    let api = FakeApi::new()
        .world_guilds("Firmera", &["Quiet"])
        .guild("Quiet", &[]);

    let report = refresh_snapshot(&api, &previous, &strings(&["Firmera"])).await;
    assert_eq!(report.snapshot["Firmera"]["Quiet"], strings(&["Lurker"]));
    assert_eq!(report.guilds_failed, 1);
}

#[tokio::test]
async fn test_total_outage_only_when_every_world_fails() {
    let previous = snapshot(&[("Firmera", "Bastex", &["A"])]);
    let api = FakeApi::new();

    let report = refresh_snapshot(&api, &previous, &strings(&["Firmera", "Lobera"])).await;
    assert!(report.total_outage());
    assert_eq!(report.snapshot, previous);

    let none = refresh_snapshot(&api, &previous, &[]).await;
    assert!(!none.total_outage());
}

// ── Sanity pass ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_sanity_normalizes_lowercase_name() {
    let api = FakeApi::new().character("Ruslex", "Firmera", "", &[]);
    let report = sanitize(&api, &strings(&["ruslex"]), Duration::ZERO).await;

    assert_eq!(report.cleaned, strings(&["Ruslex"]));
    assert_eq!(report.normalized.len(), 1);
    assert!(report.duplicates.is_empty());
    assert!(report.changed());
}

#[tokio::test]
async fn test_sanity_reports_duplicate_group_and_looks_up_once() {
    let api = FakeApi::new();
    let report = sanitize(&api, &strings(&["Rod", "rod", "ROD"]), Duration::ZERO).await;

    assert_eq!(report.duplicates.len(), 1);
    assert_eq!(report.duplicates["rod"], strings(&["Rod", "rod", "ROD"]));
    assert_eq!(report.duplicates_removed, 2);
    assert_eq!(report.cleaned, strings(&["Rod"]));
    assert_eq!(api.calls(), strings(&["character:Rod"]));
    // Unconfirmed names are kept, not dropped.
    assert_eq!(report.not_found, strings(&["Rod"]));
    assert!(report.changed());
}

#[tokio::test]
async fn test_sanity_is_idempotent() {
    let api = FakeApi::new()
        .character("Ruslex", "Firmera", "", &[])
        .character("Trip Wick", "Firmera", "", &[]);
    let names = strings(&["trip wick", "Ruslex", "TRIP WICK", "ruslex", "Unknown Guy"]);

    let first = sanitize(&api, &names, Duration::ZERO).await;
    assert_eq!(first.cleaned, strings(&["Trip Wick", "Ruslex", "Unknown Guy"]));
    assert!(first.changed());

    let second = sanitize(&api, &first.cleaned, Duration::ZERO).await;
    assert!(second.duplicates.is_empty());
    assert!(second.normalized.is_empty());
    assert!(!second.changed());
    assert_eq!(second.cleaned, first.cleaned);
}

#[tokio::test]
async fn test_sanity_merges_former_and_current_name() {
    let api = FakeApi::new()
        .character("Another Troll", "Firmera", "", &[])
        .renamed("Old Name", "Another Troll");

    let first = sanitize(&api, &strings(&["Old Name", "Another Troll"]), Duration::ZERO).await;
    assert_eq!(first.cleaned, strings(&["Another Troll"]));
    assert_eq!(first.duplicates_removed, 1);
    assert!(first.changed());
    assert!(find_duplicates(&first.cleaned).is_empty());

    let second = sanitize(&api, &first.cleaned, Duration::ZERO).await;
    assert!(second.duplicates.is_empty());
    assert!(!second.changed());
    assert_eq!(second.cleaned, first.cleaned);
}

#[tokio::test]
async fn test_sanity_counts_are_independent() {
    let api = FakeApi::new().character("Rod", "Firmera", "", &[]);
    let report = sanitize(&api, &strings(&["rod", "ROD", "Other"]), Duration::ZERO).await;

    assert_eq!(report.original_count, 3);
    assert_eq!(report.duplicates_removed, 1);
    assert_eq!(report.normalized.len(), 1);
    assert_eq!(report.not_found, strings(&["Other"]));
    assert_eq!(report.cleaned, strings(&["Rod", "Other"]));
}
