// Guild roster refresh with fallback to the previous snapshot.

use std::collections::BTreeMap;

use crate::api::TibiaApi;

/// Guild name -> member names.
pub type WorldGuilds = BTreeMap<String, Vec<String>>;

/// World name -> guilds on that world.
pub type GuildSnapshot = BTreeMap<String, WorldGuilds>;

#[derive(Debug, Clone, Default)]
pub struct RosterReport {
    pub snapshot: GuildSnapshot,
    pub worlds_total: usize,
    pub worlds_ok: usize,
    pub worlds_failed: usize,
    pub guilds_ok: usize,
    pub guilds_failed: usize,
}

impl RosterReport {
    /// Every configured world failed. Partial failures are not an outage.
    pub fn total_outage(&self) -> bool {
        self.worlds_total > 0 && self.worlds_ok == 0
    }
}

/// Refresh `previous` for `worlds`, keeping old data wherever a fetch fails.
pub async fn refresh_snapshot<A: TibiaApi + ?Sized>(
    api: &A,
    previous: &GuildSnapshot,
    worlds: &[String],
) -> RosterReport {
    let mut report = RosterReport {
        snapshot: previous.clone(),
        worlds_total: worlds.len(),
        ..RosterReport::default()
    };

    for world in worlds {
        let Some(guilds) = api.world_guilds(world).await else {
            tracing::warn!(world = %world, "Failed to fetch guild list. Keeping old data.");
            report.worlds_failed += 1;
            continue;
        };

        let old_world = previous.get(world).cloned().unwrap_or_default();
        let mut new_world = old_world.clone();
        report.worlds_ok += 1;
        tracing::info!(world = %world, "Found {} guilds", guilds.len());

        for summary in guilds {
            if summary.name.is_empty() {
                continue;
            }
            let guild_name = summary.name;

            match api.guild(&guild_name).await {
                Some(guild) if !guild.members.is_empty() => {
                    let members: Vec<String> = guild.members.into_iter().map(|m| m.name).collect();
                    tracing::debug!(guild = %guild_name, "OK ({} members)", members.len());
                    new_world.insert(guild_name, members);
                    report.guilds_ok += 1;
                }
                _ => {
                    match old_world.get(&guild_name) {
                        Some(old) => tracing::warn!(
                            guild = %guild_name,
                            "Failed - keeping old data ({} members)",
                            old.len()
                        ),
                        None => tracing::warn!(guild = %guild_name, "Failed or no members"),
                    }
                    report.guilds_failed += 1;
                }
            }
        }

        report.snapshot.insert(world.clone(), new_world);
    }

    tracing::info!(
        "Worlds: {}/{} successful, {} failed; guilds: {} processed, {} failed/skipped",
        report.worlds_ok,
        report.worlds_total,
        report.worlds_failed,
        report.guilds_ok,
        report.guilds_failed
    );
    report
}
