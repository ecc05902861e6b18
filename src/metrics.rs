// Prometheus metrics for the enemy tracker.
//
// The registry is an explicit value owned by the metrics server state rather
// than a process-wide static.

use prometheus::{
    Encoder, Gauge, IntCounter, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder,
};

pub struct Metrics {
    registry: Registry,

    // ── Gauges ───────────────────────────────────────────────────────
    /// Players in the trolls list.
    pub trolls_total: IntGauge,
    /// Players in the allied (bastex) list.
    pub bastex_total: IntGauge,
    /// Enemy guild members online at the last check.
    pub enemies_online: IntGauge,
    pub last_check_timestamp: Gauge,
    pub last_check_duration_seconds: Gauge,
    pub worlds_monitored: IntGauge,
    pub guilds_monitored: IntGauge,
    /// Online members per enemy guild, by guild and world.
    pub guild_online_members: IntGaugeVec,

    // ── Counters ─────────────────────────────────────────────────────
    pub api_calls_total: IntCounter,
    pub api_errors_total: IntCounter,
}

impl Metrics {
    /// Create and register every metric.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let metrics = Self {
            trolls_total: IntGauge::new(
                "tibia_trolls_total",
                "Total number of players in trolls list",
            )?,
            bastex_total: IntGauge::new(
                "tibia_bastex_total",
                "Total number of players in bastex list",
            )?,
            enemies_online: IntGauge::new(
                "tibia_enemies_online",
                "Current number of enemies online",
            )?,
            last_check_timestamp: Gauge::new(
                "tibia_last_check_timestamp",
                "Unix timestamp of last check",
            )?,
            last_check_duration_seconds: Gauge::new(
                "tibia_last_check_duration_seconds",
                "Duration of last check",
            )?,
            worlds_monitored: IntGauge::new(
                "tibia_worlds_monitored",
                "Number of worlds being monitored",
            )?,
            guilds_monitored: IntGauge::new(
                "tibia_guilds_monitored",
                "Number of enemy guilds being monitored",
            )?,
            guild_online_members: IntGaugeVec::new(
                Opts::new(
                    "tibia_guild_online_members",
                    "Online members per enemy guild",
                ),
                &["guild", "world"],
            )?,
            api_calls_total: IntCounter::new("tibia_api_calls_total", "Total API calls made")?,
            api_errors_total: IntCounter::new("tibia_api_errors_total", "Total API errors")?,
            registry,
        };

        let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(metrics.trolls_total.clone()),
            Box::new(metrics.bastex_total.clone()),
            Box::new(metrics.enemies_online.clone()),
            Box::new(metrics.last_check_timestamp.clone()),
            Box::new(metrics.last_check_duration_seconds.clone()),
            Box::new(metrics.worlds_monitored.clone()),
            Box::new(metrics.guilds_monitored.clone()),
            Box::new(metrics.guild_online_members.clone()),
            Box::new(metrics.api_calls_total.clone()),
            Box::new(metrics.api_errors_total.clone()),
        ];
        for c in collectors {
            metrics.registry.register(c)?;
        }

        Ok(metrics)
    }

    /// Serialize all registered metrics to the Prometheus text exposition format.
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
