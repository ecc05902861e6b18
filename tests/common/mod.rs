// In-memory TibiaApi used by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use tibia_ops::api::{
    CharacterDetail, CharacterSheet, Death, Guild, GuildMember, GuildRef, GuildSummary, Killer,
    OnlinePlayer, TibiaApi,
};

/// Anything not registered behaves as a failed fetch. Characters are looked
/// up case-insensitively, like the real API.
#[derive(Default)]
pub struct FakeApi {
    characters: HashMap<String, CharacterDetail>,
    guilds: HashMap<String, Guild>,
    world_guilds: HashMap<String, Vec<GuildSummary>>,
    online: HashMap<String, Vec<OnlinePlayer>>,
    calls: Mutex<Vec<String>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a character. `killers` are `(name, is_player)` pairs, one death each.
    pub fn character(mut self, name: &str, world: &str, guild: &str, killers: &[(&str, bool)]) -> Self {
        let deaths = killers
            .iter()
            .map(|(killer, player)| Death {
                killers: vec![Killer {
                    name: killer.to_string(),
                    player: *player,
                }],
                time: None,
            })
            .collect();
        let guild = if guild.is_empty() {
            None
        } else {
            Some(GuildRef {
                name: guild.to_string(),
            })
        };
        self.characters.insert(
            name.to_lowercase(),
            CharacterDetail {
                character: CharacterSheet {
                    name: name.to_string(),
                    world: world.to_string(),
                    guild,
                },
                deaths,
            },
        );
        self
    }

    /// Make `former` resolve to the already registered `current` character.
    pub fn renamed(mut self, former: &str, current: &str) -> Self {
        let detail = self.characters[&current.to_lowercase()].clone();
        self.characters.insert(former.to_lowercase(), detail);
        self
    }

    /// Register a guild. `members` are `(name, status)` pairs.
    pub fn guild(mut self, name: &str, members: &[(&str, &str)]) -> Self {
        self.guilds.insert(
            name.to_string(),
            Guild {
                name: name.to_string(),
                members: members
                    .iter()
                    .map(|(n, s)| GuildMember {
                        name: n.to_string(),
                        status: s.to_string(),
                    })
                    .collect(),
            },
        );
        self
    }

    pub fn world_guilds(mut self, world: &str, guilds: &[&str]) -> Self {
        self.world_guilds.insert(
            world.to_string(),
            guilds
                .iter()
                .map(|g| GuildSummary {
                    name: g.to_string(),
                })
                .collect(),
        );
        self
    }

    pub fn online(mut self, world: &str, players: &[(&str, u32)]) -> Self {
        self.online.insert(
            world.to_string(),
            players
                .iter()
                .map(|(n, level)| OnlinePlayer {
                    name: n.to_string(),
                    level: *level,
                    vocation: "Master Sorcerer".to_string(),
                })
                .collect(),
        );
        self
    }

    /// Every request made so far, as `kind:name`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn character_lookups(&self, name: &str) -> usize {
        let key = format!("character:{name}");
        self.calls().iter().filter(|c| **c == key).count()
    }

    fn record(&self, kind: &str, name: &str) {
        self.calls.lock().unwrap().push(format!("{kind}:{name}"));
    }
}

#[async_trait]
impl TibiaApi for FakeApi {
    async fn world_guilds(&self, world: &str) -> Option<Vec<GuildSummary>> {
        self.record("guilds", world);
        self.world_guilds.get(world).cloned()
    }

    async fn guild(&self, name: &str) -> Option<Guild> {
        self.record("guild", name);
        self.guilds.get(name).cloned()
    }

    async fn character(&self, name: &str) -> Option<CharacterDetail> {
        self.record("character", name);
        self.characters.get(&name.to_lowercase()).cloned()
    }

    async fn world_online(&self, world: &str) -> Option<Vec<OnlinePlayer>> {
        self.record("world", world);
        self.online.get(world).cloned()
    }
}

pub fn strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}
