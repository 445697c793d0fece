//! Run configuration resolution.
//!
//! Three sources can describe a run, in strict precedence order:
//!
//! 1. Programmatic overrides (highest).
//! 2. Command-line arguments, consulted only when there are no overrides and
//!    arguments were actually given.
//! 3. Built-in defaults (lowest, always the fallback).
//!
//! Exactly one of the first two is selected and merged field-by-field over
//! the defaults. All sources are [`RawConfig`] values holding unparsed text,
//! so type coercion and validation happen once, in [`RawConfig::build`].

use std::fmt;
use std::path::{Path, PathBuf};

use clap::{Args, Parser};
use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};
use tracing::debug;

use atmos_common::{parse_iso8601, ConfigError, RunConfig};

/// Default sampling cadence (seconds).
pub const DEFAULT_STEP_SECONDS: &str = "60";
/// Default altitude list (meters).
pub const DEFAULT_ALTITUDES_M: &str = "400000";
/// Default F10.7 solar flux.
pub const DEFAULT_SOLAR_FLUX_INDEX: &str = "150.0";
/// Default Ap geomagnetic index.
pub const DEFAULT_GEOMAGNETIC_INDEX: &str = "4.0";

/// One unresolved configuration layer.
///
/// Every field is optional text. Numbers in YAML are accepted and kept as
/// text; a YAML list of altitudes is joined with commas.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    #[serde(default, deserialize_with = "scalar")]
    pub start: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    pub end: Option<String>,
    #[serde(default, alias = "dt", deserialize_with = "scalar")]
    pub step_seconds: Option<String>,
    #[serde(default, alias = "lat", deserialize_with = "scalar")]
    pub latitude_deg: Option<String>,
    #[serde(default, alias = "lon", deserialize_with = "scalar")]
    pub longitude_deg: Option<String>,
    #[serde(default, alias = "alts", deserialize_with = "scalar")]
    pub altitudes_m: Option<String>,
    #[serde(default, alias = "f107", deserialize_with = "scalar")]
    pub solar_flux_index: Option<String>,
    #[serde(default, alias = "ap", deserialize_with = "scalar")]
    pub geomagnetic_index: Option<String>,
    #[serde(default, alias = "output", deserialize_with = "scalar")]
    pub output_path: Option<String>,
}

impl RawConfig {
    /// Built-in defaults. Start, end and output have none and must come
    /// from the caller.
    pub fn builtin_defaults() -> Self {
        Self {
            step_seconds: Some(DEFAULT_STEP_SECONDS.to_string()),
            latitude_deg: Some("0.0".to_string()),
            longitude_deg: Some("0.0".to_string()),
            altitudes_m: Some(DEFAULT_ALTITUDES_M.to_string()),
            solar_flux_index: Some(DEFAULT_SOLAR_FLUX_INDEX.to_string()),
            geomagnetic_index: Some(DEFAULT_GEOMAGNETIC_INDEX.to_string()),
            ..Self::default()
        }
    }

    /// Build a layer from key/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut raw = Self::default();
        for (key, value) in pairs {
            raw.set(key.as_ref(), value)?;
        }
        Ok(raw)
    }

    /// Load a layer from a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::DefaultsFile(e.to_string()))
    }

    /// Load a layer from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::DefaultsFile(format!("{}: {}", path.display(), e)))?;
        Self::from_yaml_str(&text)
    }

    /// Set a field by name. Accepts both the full names and the short
    /// aliases (`dt`, `lat`, `lon`, `alts`, `f107`, `ap`, `output`).
    pub fn set(&mut self, key: &str, value: impl Into<String>) -> Result<(), ConfigError> {
        let slot = match key {
            "start" => &mut self.start,
            "end" => &mut self.end,
            "step_seconds" | "dt" => &mut self.step_seconds,
            "latitude_deg" | "lat" => &mut self.latitude_deg,
            "longitude_deg" | "lon" => &mut self.longitude_deg,
            "altitudes_m" | "alts" => &mut self.altitudes_m,
            "solar_flux_index" | "f107" => &mut self.solar_flux_index,
            "geomagnetic_index" | "ap" => &mut self.geomagnetic_index,
            "output_path" | "output" => &mut self.output_path,
            other => return Err(ConfigError::UnknownKey(other.to_string())),
        };
        *slot = Some(value.into());
        Ok(())
    }

    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// This layer's values, falling back to `base` for unset fields.
    pub fn merged_over(&self, base: &RawConfig) -> RawConfig {
        fn pick(top: &Option<String>, base: &Option<String>) -> Option<String> {
            top.clone().or_else(|| base.clone())
        }
        RawConfig {
            start: pick(&self.start, &base.start),
            end: pick(&self.end, &base.end),
            step_seconds: pick(&self.step_seconds, &base.step_seconds),
            latitude_deg: pick(&self.latitude_deg, &base.latitude_deg),
            longitude_deg: pick(&self.longitude_deg, &base.longitude_deg),
            altitudes_m: pick(&self.altitudes_m, &base.altitudes_m),
            solar_flux_index: pick(&self.solar_flux_index, &base.solar_flux_index),
            geomagnetic_index: pick(&self.geomagnetic_index, &base.geomagnetic_index),
            output_path: pick(&self.output_path, &base.output_path),
        }
    }

    /// Coerce and validate into a [`RunConfig`].
    pub fn build(&self) -> Result<RunConfig, ConfigError> {
        let start = parse_time("start", required("start", &self.start)?)?;
        let end = parse_time("end", required("end", &self.end)?)?;

        let step_seconds = parse_step(required("step_seconds", &self.step_seconds)?)?;

        let latitude_deg = parse_float("latitude_deg", required("latitude_deg", &self.latitude_deg)?)?;
        if !(-90.0..=90.0).contains(&latitude_deg) {
            return Err(ConfigError::invalid(
                "latitude_deg",
                format!("{} is outside [-90, 90]", latitude_deg),
            ));
        }
        let longitude_deg =
            parse_float("longitude_deg", required("longitude_deg", &self.longitude_deg)?)?;

        let altitudes_m = parse_altitudes(required("altitudes_m", &self.altitudes_m)?)?;

        let solar_flux_index = parse_float(
            "solar_flux_index",
            required("solar_flux_index", &self.solar_flux_index)?,
        )?;
        let geomagnetic_index = parse_float(
            "geomagnetic_index",
            required("geomagnetic_index", &self.geomagnetic_index)?,
        )?;

        let output = required("output_path", &self.output_path)?.trim();
        if output.is_empty() {
            return Err(ConfigError::MissingField("output_path"));
        }

        Ok(RunConfig {
            start,
            end,
            step_seconds,
            latitude_deg,
            longitude_deg,
            altitudes_m,
            solar_flux_index,
            geomagnetic_index,
            output_path: PathBuf::from(output),
        })
    }
}

fn required<'a>(field: &'static str, value: &'a Option<String>) -> Result<&'a str, ConfigError> {
    value.as_deref().ok_or(ConfigError::MissingField(field))
}

fn parse_time(field: &'static str, raw: &str) -> Result<chrono::DateTime<chrono::Utc>, ConfigError> {
    parse_iso8601(raw).map_err(|e| ConfigError::invalid(field, e.to_string()))
}

fn parse_step(raw: &str) -> Result<i64, ConfigError> {
    let step: i64 = raw
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid("step_seconds", format!("'{}' is not an integer", raw)))?;
    if step <= 0 {
        return Err(ConfigError::NonPositiveStep(step));
    }
    Ok(step)
}

fn parse_float(field: &'static str, raw: &str) -> Result<f64, ConfigError> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(field, format!("'{}' is not a number", raw)))?;
    if !value.is_finite() {
        return Err(ConfigError::invalid(field, format!("'{}' is not finite", raw)));
    }
    Ok(value)
}

/// Parse a comma-separated altitude list (meters).
///
/// Every token must be a finite, non-negative number. An empty token is an
/// error rather than being skipped, so "300000,,400000" never quietly
/// samples one altitude fewer than intended.
pub fn parse_altitudes(list: &str) -> Result<Vec<f64>, ConfigError> {
    list.split(',')
        .enumerate()
        .map(|(i, token)| {
            let token = token.trim();
            if token.is_empty() {
                return Err(ConfigError::EmptyAltitudeToken {
                    position: i + 1,
                    list: list.to_string(),
                });
            }
            let altitude = parse_float("altitudes_m", token)?;
            if altitude < 0.0 {
                return Err(ConfigError::invalid(
                    "altitudes_m",
                    format!("altitude {} is negative", token),
                ));
            }
            Ok(altitude)
        })
        .collect()
}

/// Sampling flags shared by every entry point that takes a command line.
///
/// Each flag can also come from an `ATMOS_*` environment variable. Values
/// stay text here; coercion errors are reported as [`ConfigError`].
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct SampleArgs {
    /// ISO start time, e.g. 2025-08-17T00:00:00
    #[arg(long, env = "ATMOS_START")]
    pub start: Option<String>,

    /// ISO end time (inclusive)
    #[arg(long, env = "ATMOS_END")]
    pub end: Option<String>,

    /// Time step in seconds
    #[arg(long = "step-seconds", visible_alias = "dt", env = "ATMOS_STEP_SECONDS")]
    pub step_seconds: Option<String>,

    /// Latitude in degrees
    #[arg(long = "latitude-deg", visible_alias = "lat", env = "ATMOS_LATITUDE_DEG", allow_negative_numbers = true)]
    pub latitude_deg: Option<String>,

    /// Longitude in degrees
    #[arg(long = "longitude-deg", visible_alias = "lon", env = "ATMOS_LONGITUDE_DEG", allow_negative_numbers = true)]
    pub longitude_deg: Option<String>,

    /// Comma-separated altitudes in meters
    #[arg(long = "altitudes-m", visible_alias = "alts", env = "ATMOS_ALTITUDES_M")]
    pub altitudes_m: Option<String>,

    /// F10.7 solar flux index
    #[arg(long = "solar-flux-index", visible_alias = "f107", env = "ATMOS_SOLAR_FLUX_INDEX")]
    pub solar_flux_index: Option<String>,

    /// Ap geomagnetic index
    #[arg(long = "geomagnetic-index", visible_alias = "ap", env = "ATMOS_GEOMAGNETIC_INDEX")]
    pub geomagnetic_index: Option<String>,

    /// Output table path
    #[arg(long = "output-path", visible_alias = "output", env = "ATMOS_OUTPUT_PATH")]
    pub output_path: Option<String>,
}

impl From<SampleArgs> for RawConfig {
    fn from(args: SampleArgs) -> Self {
        RawConfig {
            start: args.start,
            end: args.end,
            step_seconds: args.step_seconds,
            latitude_deg: args.latitude_deg,
            longitude_deg: args.longitude_deg,
            altitudes_m: args.altitudes_m,
            solar_flux_index: args.solar_flux_index,
            geomagnetic_index: args.geomagnetic_index,
            output_path: args.output_path,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "profile-sampler", no_binary_name = true)]
struct SampleCommand {
    #[command(flatten)]
    sample: SampleArgs,
}

/// Which layer was merged over the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    Overrides,
    CommandLine,
    Defaults,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConfigSource::Overrides => "overrides",
            ConfigSource::CommandLine => "command-line",
            ConfigSource::Defaults => "defaults",
        })
    }
}

/// Resolves a [`RunConfig`] from overrides, arguments and defaults.
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    defaults: RawConfig,
}

impl Default for ConfigResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigResolver {
    /// Resolver with the built-in defaults.
    pub fn new() -> Self {
        Self {
            defaults: RawConfig::builtin_defaults(),
        }
    }

    /// Resolver whose defaults layer is `defaults`, completed by the
    /// built-in defaults for fields it leaves unset.
    pub fn with_defaults(defaults: RawConfig) -> Self {
        Self {
            defaults: defaults.merged_over(&RawConfig::builtin_defaults()),
        }
    }

    pub fn defaults(&self) -> &RawConfig {
        &self.defaults
    }

    /// Resolve from overrides and a raw argument list (without program name).
    ///
    /// When `overrides` is non-empty the arguments are not even parsed.
    pub fn resolve<S: AsRef<str>>(
        &self,
        overrides: &RawConfig,
        args: &[S],
    ) -> Result<RunConfig, ConfigError> {
        if !overrides.is_empty() || args.is_empty() {
            return self.resolve_layers(overrides, None);
        }

        let command = SampleCommand::try_parse_from(args.iter().map(|a| a.as_ref()))
            .map_err(|e| ConfigError::Arguments(e.to_string().trim().to_string()))?;
        let cli = RawConfig::from(command.sample);
        self.resolve_layers(overrides, Some(&cli))
    }

    /// Resolve from already-parsed layers.
    pub fn resolve_layers(
        &self,
        overrides: &RawConfig,
        command_line: Option<&RawConfig>,
    ) -> Result<RunConfig, ConfigError> {
        let (source, layer) = match command_line {
            _ if !overrides.is_empty() => (ConfigSource::Overrides, overrides.clone()),
            Some(cli) if !cli.is_empty() => (ConfigSource::CommandLine, cli.clone()),
            _ => (ConfigSource::Defaults, RawConfig::default()),
        };

        let config = layer.merged_over(&self.defaults).build()?;
        debug!(
            source = %source,
            start = %config.start,
            end = %config.end,
            step_seconds = config.step_seconds,
            altitudes = config.altitudes_m.len(),
            output = %config.output_path.display(),
            "Resolved run configuration"
        );
        Ok(config)
    }
}

/// Accepts a YAML/JSON scalar or a list of scalars as text.
fn scalar<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Scalar>::deserialize(deserializer).map(|value| value.map(|Scalar(s)| s))
}

struct Scalar(String);

impl<'de> Deserialize<'de> for Scalar {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ScalarVisitor).map(Scalar)
    }
}

struct ScalarVisitor;

impl<'de> Visitor<'de> for ScalarVisitor {
    type Value = String;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string, a number, or a list of numbers")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<String, E> {
        Ok(v)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<String, A::Error> {
        let mut parts = Vec::new();
        while let Some(Scalar(part)) = seq.next_element::<Scalar>()? {
            parts.push(part);
        }
        Ok(parts.join(","))
    }
}
