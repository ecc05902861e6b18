// Reconciliation of persisted name lists against freshly fetched data.
//
// - `trolls`: additive growth of the troll list from enemy deaths.
// - `roster`: world/guild snapshot refresh with per-unit fallback.
// - `sanity`: duplicate removal and canonical casing.
//
// None of these drop an entry because a fetch failed.

pub mod roster;
pub mod sanity;
pub mod trolls;

pub use roster::{refresh_snapshot, GuildSnapshot, RosterReport, WorldGuilds};
pub use sanity::{sanitize, SanityReport};
pub use trolls::{grow_trolls, Addition, CandidateOutcome, EnemyReport, TrollList};

/// A stored spelling replaced by its canonical form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalization {
    pub old: String,
    pub new: String,
}
