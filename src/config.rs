//! Run configuration, read from the environment.

use std::env;
use std::str::FromStr;
use std::sync::Arc;

use chrono::TimeDelta;
use log::warn;
use serde::Deserialize;

use crate::check::haversine::DEFAULT_FIXED_SPEED_KMH;
use crate::geo::prune::DEFAULT_MIN_PRUNE_RADIUS;
use crate::geo::simplify::{DEFAULT_EPSILON, DEFAULT_INTERVAL};
use crate::geo::{
    try_from_seconds, GeoError, NoOpSimplifier, PerpendicularDistance, RouteSimplifier, TimeThreshold,
    DEFAULT_WALKING_SPEED_MPS,
};
use crate::plan::matrix::DEFAULT_CACHING_BOUND;

pub const DEFAULT_DETOUR_BUDGET: TimeDelta = TimeDelta::minutes(15);

/// The route simplification strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DownsamplerKind {
    #[default]
    Rdp,
    TimeThreshold,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    pub enable_pruning: bool,
    pub enable_downsampling: bool,
    pub downsampler: DownsamplerKind,
    pub rdp_epsilon_meters: f64,
    #[serde(with = "crate::model::seconds")]
    pub time_threshold_interval: TimeDelta,
    pub walking_speed_mps: f64,
    pub min_prune_radius_meters: f64,
    #[serde(with = "crate::model::seconds")]
    pub default_detour_budget: TimeDelta,
    /// Evaluation pool size, `0` for one worker per core.
    pub worker_threads: usize,
    pub enable_haversine_checker: bool,
    pub fixed_speed_kmh: f64,
    /// Stops held by one offer's cached time matrix.
    pub matrix_caching_bound: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        MatcherConfig {
            enable_pruning: true,
            enable_downsampling: true,
            downsampler: DownsamplerKind::Rdp,
            rdp_epsilon_meters: DEFAULT_EPSILON,
            time_threshold_interval: DEFAULT_INTERVAL,
            walking_speed_mps: DEFAULT_WALKING_SPEED_MPS,
            min_prune_radius_meters: DEFAULT_MIN_PRUNE_RADIUS,
            default_detour_budget: DEFAULT_DETOUR_BUDGET,
            worker_threads: 0,
            enable_haversine_checker: false,
            fixed_speed_kmh: DEFAULT_FIXED_SPEED_KMH,
            matrix_caching_bound: DEFAULT_CACHING_BOUND,
        }
    }
}

impl MatcherConfig {
    /// Reads the configuration from the process environment, after loading
    /// a `.env` file if one is present. Unset variables keep their default,
    /// and unparseable ones are reported and ignored.
    pub fn from_env() -> Self {
        if let Err(err) = dotenv::dotenv() {
            log::debug!("No .env file loaded: {}", err);
        }

        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = MatcherConfig::default();

        let read = |key: &str, default| parse(&lookup, key).unwrap_or(default);
        let seconds = |key: &str, scale: f64, default| {
            parse::<f64>(&lookup, key)
                .and_then(|value| match try_from_seconds(value * scale) {
                    Ok(duration) => Some(duration),
                    Err(err) => {
                        warn!("Ignoring invalid value for {}: {}", key, err);
                        None
                    }
                })
                .unwrap_or(default)
        };

        MatcherConfig {
            enable_pruning: read("ENABLE_PRUNING", defaults.enable_pruning),
            enable_downsampling: read("ENABLE_DOWNSAMPLING", defaults.enable_downsampling),
            downsampler: parse(&lookup, "DOWNSAMPLER_TYPE").unwrap_or(defaults.downsampler),
            rdp_epsilon_meters: parse(&lookup, "RDP_EPSILON_METERS").unwrap_or(defaults.rdp_epsilon_meters),
            time_threshold_interval: seconds(
                "TIME_THRESHOLD_INTERVAL_SECONDS",
                1.0,
                defaults.time_threshold_interval,
            ),
            walking_speed_mps: parse(&lookup, "WALKING_SPEED_MPS").unwrap_or(defaults.walking_speed_mps),
            min_prune_radius_meters: parse(&lookup, "MIN_PRUNE_RADIUS_METERS")
                .unwrap_or(defaults.min_prune_radius_meters),
            default_detour_budget: seconds("DEFAULT_DETOUR_BUDGET_MINUTES", 60.0, defaults.default_detour_budget),
            worker_threads: parse(&lookup, "WORKER_THREADS").unwrap_or(defaults.worker_threads),
            enable_haversine_checker: read(
                "ENABLE_HAVERSINE_DISTANCE_CHECKER",
                defaults.enable_haversine_checker,
            ),
            fixed_speed_kmh: parse(&lookup, "FIXED_SPEED_KMH").unwrap_or(defaults.fixed_speed_kmh),
            matrix_caching_bound: parse(&lookup, "CACHING_BOUND").unwrap_or(defaults.matrix_caching_bound),
        }
    }

    /// The configured simplifier, or the no-op one if downsampling is off.
    pub fn simplifier(&self) -> Result<Arc<dyn RouteSimplifier>, GeoError> {
        if !self.enable_downsampling {
            return Ok(Arc::new(NoOpSimplifier));
        }

        Ok(match self.downsampler {
            DownsamplerKind::Rdp => Arc::new(PerpendicularDistance::new(self.rdp_epsilon_meters)?),
            DownsamplerKind::TimeThreshold => Arc::new(TimeThreshold::new(
                self.time_threshold_interval,
                self.walking_speed_mps,
            )?),
        })
    }
}

fn parse<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let value = lookup(key)?;
    match value.trim().parse::<T>() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!("Ignoring invalid value for {}: {:?}", key, value);
            None
        }
    }
}
