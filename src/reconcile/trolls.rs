// Troll-list growth: unguilded player killers of online enemy guild members
// are appended to the tracked list; known entries get their casing fixed.

use std::collections::HashSet;

use crate::api::{character_info, extract_player_killers, online_guild_members, TibiaApi};
use crate::names::{fold, folded_set, CaseIndex};

use super::Normalization;

/// A name appended during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Addition {
    pub name: String,
    pub world: String,
    /// Enemy guild member whose death revealed the killer.
    pub victim: String,
}

/// What happened to one candidate name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateOutcome {
    /// On the allied list; not looked up.
    Allied,
    /// Already tracked with identical casing, or the lookup gave nothing new.
    Known,
    /// Already tracked; the stored spelling was rewritten to the canonical one.
    Normalized,
    Added,
    NotFound,
    WrongWorld(String),
    Guilded(String),
}

#[derive(Debug, Clone, Default)]
pub struct EnemyReport {
    pub initial_count: usize,
    pub final_count: usize,
    pub additions: Vec<Addition>,
    pub normalizations: Vec<Normalization>,
}

impl EnemyReport {
    /// Whether the list needs to be written back.
    pub fn modified(&self) -> bool {
        !self.additions.is_empty() || !self.normalizations.is_empty()
    }
}

/// Tracked list plus its case index, updated together.
pub struct TrollList<'a> {
    names: &'a mut Vec<String>,
    index: CaseIndex,
    allied: HashSet<String>,
}

impl<'a> TrollList<'a> {
    pub fn new(names: &'a mut Vec<String>, allied: &[String]) -> Self {
        let index = CaseIndex::build(names);
        Self {
            names,
            index,
            allied: folded_set(allied),
        }
    }

    /// Apply the growth rules to one killer seen on `world`.
    pub async fn consider<A: TibiaApi + ?Sized>(
        &mut self,
        api: &A,
        candidate: &str,
        world: &str,
        victim: &str,
        report: &mut EnemyReport,
    ) -> CandidateOutcome {
        if self.allied.contains(&fold(candidate)) {
            tracing::debug!(candidate, "Already in allied list - skipping");
            return CandidateOutcome::Allied;
        }

        if let Some((idx, existing)) = self.index.get(candidate) {
            if existing == candidate {
                tracing::debug!(candidate, "Already in trolls list");
                return CandidateOutcome::Known;
            }
            let existing = existing.to_string();
            tracing::info!(candidate, existing = %existing, "Found with different case");

            return match character_info(api, candidate).await {
                Some(info) if info.name != existing => {
                    let tracked_elsewhere = self.index.get(&info.name).filter(|(i, _)| *i != idx);
                    if let Some((other, _)) = tracked_elsewhere {
                        tracing::info!(
                            "'{existing}' resolves to '{}', already tracked at {other}",
                            info.name
                        );
                        return CandidateOutcome::Known;
                    }
                    self.rewrite(idx, existing, info.name, report);
                    CandidateOutcome::Normalized
                }
                _ => {
                    tracing::info!("Keeping existing: '{existing}'");
                    CandidateOutcome::Known
                }
            };
        }

        let Some(info) = character_info(api, candidate).await else {
            tracing::info!(candidate, "Skipped (character not found)");
            return CandidateOutcome::NotFound;
        };

        // Former names resolve to the current one, which may already be tracked.
        if let Some((idx, existing)) = self.index.get(&info.name) {
            if existing == info.name {
                tracing::info!(candidate, "Resolves to tracked '{}'", info.name);
                return CandidateOutcome::Known;
            }
            let existing = existing.to_string();
            self.rewrite(idx, existing, info.name, report);
            return CandidateOutcome::Normalized;
        }

        if !info.world.is_empty() && !info.world.eq_ignore_ascii_case(world) {
            tracing::info!(candidate, "Skipped (different world: {})", info.world);
            return CandidateOutcome::WrongWorld(info.world);
        }

        if !info.guild.is_empty() {
            tracing::info!(candidate, "Skipped (has guild: {})", info.guild);
            return CandidateOutcome::Guilded(info.guild);
        }

        if info.name != candidate {
            tracing::info!("[NORMALIZED] Using correct name: '{}'", info.name);
        }
        tracing::info!(name = %info.name, world, "ADDING (unguilded)");

        self.names.push(info.name.clone());
        self.index.set(self.names.len() - 1, &info.name);
        report.additions.push(Addition {
            name: info.name,
            world: world.to_string(),
            victim: victim.to_string(),
        });
        CandidateOutcome::Added
    }

    /// Replace the entry at `idx` with its canonical spelling.
    fn rewrite(&mut self, idx: usize, old: String, new: String, report: &mut EnemyReport) {
        tracing::info!("[NORMALIZED] '{old}' -> '{new}'");
        self.index.remove(&old);
        self.names[idx] = new.clone();
        self.index.set(idx, &new);
        report.normalizations.push(Normalization { old, new });
    }
}

/// Scan online members of each enemy guild, collect the players who killed
/// them and grow `trolls` accordingly. Guilds are processed in the given
/// order; killers of one character in name order.
pub async fn grow_trolls<A: TibiaApi + ?Sized>(
    api: &A,
    trolls: &mut Vec<String>,
    allied: &[String],
    enemy_guilds: &[(String, String)],
) -> EnemyReport {
    let mut report = EnemyReport {
        initial_count: trolls.len(),
        ..EnemyReport::default()
    };
    let mut list = TrollList::new(trolls, allied);

    for (guild, world) in enemy_guilds {
        let online = online_guild_members(api, guild).await;
        if online.is_empty() {
            tracing::info!(guild = %guild, world = %world, "No online members found or failed to fetch guild data");
            continue;
        }
        tracing::info!(guild = %guild, world = %world, "Found {} online member(s)", online.len());

        for member in &online {
            let Some(detail) = api.character(member).await else {
                tracing::warn!(member = %member, "Failed to fetch character data");
                continue;
            };
            if detail.deaths.is_empty() {
                tracing::debug!(member = %member, "No deaths recorded");
                continue;
            }

            let killers = extract_player_killers(&detail.deaths);
            tracing::info!(
                member = %member,
                "Found {} death(s), {} unique player killer(s)",
                detail.deaths.len(),
                killers.len()
            );

            for killer in &killers {
                list.consider(api, killer, world, member, &mut report).await;
            }
        }
    }

    report.final_count = trolls.len();
    report
}
