// TibiaData entity accessors: worlds, guilds, characters.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::config::Config;
use crate::error::JobError;
use crate::fetch::{HttpTransport, RetryingFetcher, Transport};

// ── Response types ───────────────────────────────────────────────────

/// Entry of a world's active guild list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuildSummary {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuildMember {
    pub name: String,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guild {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub members: Vec<GuildMember>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GuildRef {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterSheet {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub world: String,
    #[serde(default)]
    pub guild: Option<GuildRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Killer {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub player: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Death {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub killers: Vec<Killer>,
    #[serde(default)]
    pub time: Option<String>,
}

/// The `character` object of a character response: sheet plus recent deaths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterDetail {
    pub character: CharacterSheet,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub deaths: Vec<Death>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnlinePlayer {
    pub name: String,
    #[serde(default)]
    pub level: u32,
    #[serde(default)]
    pub vocation: String,
}

/// Canonical name, world and guild of a character. `guild` is empty when unguilded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterInfo {
    pub name: String,
    pub world: String,
    pub guild: String,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

// ── Accessor trait ───────────────────────────────────────────────────

/// Typed access to the remote API. `None` means the fetch failed, which is
/// never the same as an empty result.
#[async_trait]
pub trait TibiaApi: Send + Sync {
    async fn world_guilds(&self, world: &str) -> Option<Vec<GuildSummary>>;
    async fn guild(&self, name: &str) -> Option<Guild>;
    async fn character(&self, name: &str) -> Option<CharacterDetail>;
    async fn world_online(&self, world: &str) -> Option<Vec<OnlinePlayer>>;
}

/// [`TibiaApi`] over a retrying fetcher.
pub struct ApiClient<T> {
    base_url: String,
    fetcher: RetryingFetcher<T>,
}

impl ApiClient<HttpTransport> {
    pub fn from_config(config: &Config) -> Result<Self, JobError> {
        let transport = HttpTransport::new(config.retry.request_timeout)
            .map_err(|e| JobError::Client(e.to_string()))?;
        Ok(Self::new(
            &config.base_url,
            RetryingFetcher::new(transport, config.retry.clone()),
        ))
    }
}

impl<T: Transport> ApiClient<T> {
    pub fn new(base_url: &str, fetcher: RetryingFetcher<T>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            fetcher,
        }
    }

    /// `{base}/{kind}/{escaped name}`.
    pub fn url(&self, kind: &str, name: &str) -> String {
        format!("{}/{}/{}", self.base_url, kind, urlencoding::encode(name))
    }

    /// Fetch `url` and decode the object found by walking `path`.
    async fn fetch_field<R: DeserializeOwned + Send>(&self, url: &str, path: &[&str]) -> Option<R> {
        let mut value = self.fetcher.fetch(url).await.ok()?;
        for key in path {
            value = match value.get_mut(*key) {
                Some(inner) => inner.take(),
                None => {
                    tracing::error!(url, "Response is missing field '{key}'");
                    return None;
                }
            };
        }
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                tracing::error!(url, "Unexpected response shape: {e}");
                None
            }
        }
    }
}

#[async_trait]
impl<T: Transport> TibiaApi for ApiClient<T> {
    async fn world_guilds(&self, world: &str) -> Option<Vec<GuildSummary>> {
        let url = self.url("guilds", world);
        let active: Option<Option<Vec<GuildSummary>>> =
            self.fetch_field(&url, &["guilds", "active"]).await;
        active.map(Option::unwrap_or_default)
    }

    async fn guild(&self, name: &str) -> Option<Guild> {
        let url = self.url("guild", name);
        self.fetch_field(&url, &["guild"]).await
    }

    async fn character(&self, name: &str) -> Option<CharacterDetail> {
        let url = self.url("character", name);
        self.fetch_field(&url, &["character"]).await
    }

    async fn world_online(&self, world: &str) -> Option<Vec<OnlinePlayer>> {
        let url = self.url("world", world);
        let players: Option<Option<Vec<OnlinePlayer>>> =
            self.fetch_field(&url, &["world", "online_players"]).await;
        players.map(Option::unwrap_or_default)
    }
}

// ── Derived helpers ──────────────────────────────────────────────────

/// Names of a guild's online members; empty if the guild fetch failed.
pub async fn online_guild_members<A: TibiaApi + ?Sized>(api: &A, guild: &str) -> Vec<String> {
    match api.guild(guild).await {
        Some(g) => g
            .members
            .into_iter()
            .filter(|m| m.status == "online")
            .map(|m| m.name)
            .collect(),
        None => Vec::new(),
    }
}

/// Unique names of player killers across all deaths. Creatures are excluded.
pub fn extract_player_killers(deaths: &[Death]) -> BTreeSet<String> {
    deaths
        .iter()
        .flat_map(|d| d.killers.iter())
        .filter(|k| k.player && !k.name.is_empty())
        .map(|k| k.name.clone())
        .collect()
}

/// Canonical name, world and guild of a character, or `None` if unavailable.
pub async fn character_info<A: TibiaApi + ?Sized>(api: &A, name: &str) -> Option<CharacterInfo> {
    let detail = api.character(name).await?;
    let sheet = detail.character;
    if sheet.name.is_empty() {
        return None;
    }
    Some(CharacterInfo {
        name: sheet.name,
        world: sheet.world,
        guild: sheet.guild.map(|g| g.name).unwrap_or_default(),
    })
}
