// Online-status tracking and player categorisation for the status page.
//
// Unlike the reconcilers, a successfully fetched world roster is
// authoritative here: players missing from it are removed. Worlds whose
// fetch failed keep their previous entries.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;

use crate::api::OnlinePlayer;
use crate::names::folded_set;
use crate::reconcile::WorldGuilds;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const TROLLS: &str = "Trolls";
pub const ALERTS: &str = "Alerts";
pub const OTHERS: &str = "Others";

/// World -> player -> first time seen online.
pub type OnlineStatus = BTreeMap<String, BTreeMap<String, String>>;

/// Merge freshly observed rosters into `status`.
///
/// `observed` maps each world to its roster, or `None` if the fetch failed.
/// Returns `(world, player)` pairs that just came online.
pub fn update_status(
    status: &mut OnlineStatus,
    observed: &BTreeMap<String, Option<Vec<OnlinePlayer>>>,
    now: NaiveDateTime,
) -> Vec<(String, String)> {
    let stamp = now.format(TIMESTAMP_FORMAT).to_string();
    let mut arrivals = Vec::new();

    for (world, roster) in observed {
        let seen = status.entry(world.clone()).or_default();
        let Some(players) = roster else {
            continue;
        };

        seen.retain(|name, _| players.iter().any(|p| &p.name == name));
        for player in players {
            if !seen.contains_key(&player.name) {
                seen.insert(player.name.clone(), stamp.clone());
                arrivals.push((world.clone(), player.name.clone()));
            }
        }
    }

    arrivals
}

/// `"{h}h{m}m"`, or `"{m}m"` under an hour. Unparseable stamps count as `now`.
pub fn format_online_since(since: &str, now: NaiveDateTime) -> String {
    let start = NaiveDateTime::parse_from_str(since, TIMESTAMP_FORMAT).unwrap_or(now);
    let minutes_total = (now - start).num_minutes().max(0);
    let (hours, minutes) = (minutes_total / 60, minutes_total % 60);
    if hours > 0 {
        format!("{hours}h{minutes}m")
    } else {
        format!("{minutes}m")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub name: String,
    pub players: Vec<OnlinePlayer>,
}

/// Group online players for display, highest level first.
///
/// A player is a troll or alert by case-insensitive list membership,
/// otherwise a member of the first snapshot guild listing them, otherwise
/// "Others". Order: trolls, alerts, special guilds as configured, remaining
/// guilds as first encountered, others. Empty categories are omitted.
pub fn categorize(
    players: &[OnlinePlayer],
    trolls: &[String],
    alerts: &[String],
    guilds: Option<&WorldGuilds>,
    special_guilds: &[String],
) -> Vec<Category> {
    let trolls = folded_set(trolls);
    let alerts = folded_set(alerts);

    let mut sorted: Vec<&OnlinePlayer> = players.iter().collect();
    sorted.sort_by(|a, b| b.level.cmp(&a.level));

    let mut buckets: Vec<Category> = Vec::new();
    let mut push = |name: &str, player: &OnlinePlayer| {
        match buckets.iter_mut().find(|c| c.name == name) {
            Some(c) => c.players.push(player.clone()),
            None => buckets.push(Category {
                name: name.to_string(),
                players: vec![player.clone()],
            }),
        }
    };

    for player in sorted {
        let folded = player.name.to_lowercase();
        if trolls.contains(&folded) {
            push(TROLLS, player);
        } else if alerts.contains(&folded) {
            push(ALERTS, player);
        } else {
            let guild = guilds.and_then(|g| {
                g.iter()
                    .find(|(_, members)| members.contains(&player.name))
                    .map(|(name, _)| name.as_str())
            });
            push(guild.unwrap_or(OTHERS), player);
        }
    }

    let rank = |name: &str| -> (usize, usize) {
        if name == TROLLS {
            (0, 0)
        } else if name == ALERTS {
            (1, 0)
        } else if let Some(pos) = special_guilds.iter().position(|g| g == name) {
            (2, pos)
        } else if name == OTHERS {
            (4, 0)
        } else {
            (3, 0)
        }
    };
    // Stable sort keeps first-encountered order among non-special guilds.
    buckets.sort_by_key(|c| rank(&c.name));
    buckets
}
