//! Exporter configuration
//!
//! Loaded from TOML. Every field has a default, so an empty file is a valid
//! configuration:
//!
//! ```toml
//! [logging]
//! level = "info"
//!
//! [metrics]
//! namespace = "loggie"
//!
//! [filewatcher]
//! period = "5m"
//! checkUnFinishedTimeout = "24h"
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::logging::LogConfig;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExporterConfig {
    /// Process logging
    #[serde(default)]
    pub logging: LogConfig,

    /// Metric naming
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// File watcher listener
    #[serde(default)]
    pub filewatcher: FileWatcherConfig,
}

impl ExporterConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ExporterConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        tracing::info!(path = %path.display(), "Loaded configuration from file");
        Ok(config)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        self.metrics.validate()?;
        self.filewatcher.validate()
    }
}

/// Metric naming
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Leading component of every metric name
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Component between namespace and metric name
    #[serde(default = "default_subsystem")]
    pub subsystem: String,
}

fn default_namespace() -> String {
    "loggie".to_string()
}

fn default_subsystem() -> String {
    "filewatcher".to_string()
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            subsystem: default_subsystem(),
        }
    }
}

impl MetricsConfig {
    /// Fully-qualified metric name: non-empty parts joined with `_`
    pub fn fq_name(&self, name: &str) -> String {
        [self.namespace.as_str(), self.subsystem.as_str(), name]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join("_")
    }

    /// Reject prefixes that would make every metric name invalid
    pub fn validate(&self) -> Result<()> {
        let sample = self.fq_name("x");
        if !is_valid_metric_name(&sample) {
            return Err(Error::Configuration(format!(
                "metrics namespace '{}' and subsystem '{}' do not form a valid metric name",
                self.namespace, self.subsystem
            )));
        }
        Ok(())
    }
}

/// Matches `[a-zA-Z_:][a-zA-Z0-9_:]*`
fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

/// File watcher listener settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileWatcherConfig {
    /// Export cadence
    #[serde(default = "default_period", with = "duration_str")]
    pub period: Duration,

    /// Files quiet for longer than this with unacknowledged bytes are
    /// reported as unfinished
    #[serde(
        rename = "checkUnFinishedTimeout",
        default = "default_unfinished_timeout",
        with = "duration_str"
    )]
    pub unfinished_timeout: Duration,
}

fn default_period() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_unfinished_timeout() -> Duration {
    Duration::from_secs(24 * 60 * 60)
}

impl Default for FileWatcherConfig {
    fn default() -> Self {
        Self {
            period: default_period(),
            unfinished_timeout: default_unfinished_timeout(),
        }
    }
}

impl FileWatcherConfig {
    /// Reject settings the scheduler cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.period.is_zero() {
            return Err(Error::Configuration(
                "filewatcher.period must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Durations as human strings (`"500ms"`, `"5m"`, `"1h30m"`) or numeric seconds
mod duration_str {
    use serde::de::{self, Deserializer, Visitor};
    use serde::Serializer;
    use std::fmt;
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format(duration))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(DurationVisitor)
    }

    struct DurationVisitor;

    impl<'de> Visitor<'de> for DurationVisitor {
        type Value = Duration;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a duration such as \"5m\" or a number of seconds")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Duration, E> {
            parse(v).map_err(E::custom)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Duration, E> {
            Ok(Duration::from_secs(v))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Duration, E> {
            u64::try_from(v)
                .map(Duration::from_secs)
                .map_err(|_| E::custom("duration must not be negative"))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Duration, E> {
            Duration::try_from_secs_f64(v).map_err(E::custom)
        }
    }

    const NANOS_PER_SEC: u128 = 1_000_000_000;

    /// Go-style durations: `"300us"`, `"1.5h"`, `"1h30m"`, plus `d` for days
    pub(super) fn parse(input: &str) -> Result<Duration, String> {
        let input = input.trim();
        if input.is_empty() {
            return Err("empty duration".to_string());
        }
        let out_of_range = || format!("duration '{}' out of range", input);

        let mut total: u128 = 0;
        let mut rest = input;
        while !rest.is_empty() {
            let number_len = rest
                .find(|c: char| !(c.is_ascii_digit() || c == '.'))
                .unwrap_or(rest.len());
            let number = &rest[..number_len];
            let (whole, frac) = number.split_once('.').unwrap_or((number, ""));
            if (whole.is_empty() && frac.is_empty()) || frac.contains('.') {
                return Err(format!("invalid duration '{}'", input));
            }
            rest = &rest[number_len..];

            let unit_len = rest
                .find(|c: char| c.is_ascii_digit() || c == '.')
                .unwrap_or(rest.len());
            let unit: u128 = match &rest[..unit_len] {
                "ns" => 1,
                "us" | "µs" => 1_000,
                "ms" => 1_000_000,
                "s" => NANOS_PER_SEC,
                "m" => 60 * NANOS_PER_SEC,
                "h" => 3600 * NANOS_PER_SEC,
                "d" => 86_400 * NANOS_PER_SEC,
                "" => return Err(format!("missing unit in duration '{}'", input)),
                other => return Err(format!("unknown unit '{}' in duration '{}'", other, input)),
            };
            rest = &rest[unit_len..];

            let whole: u128 = if whole.is_empty() {
                0
            } else {
                whole
                    .parse()
                    .map_err(|e| format!("invalid duration '{}': {}", input, e))?
            };
            let mut part = whole.checked_mul(unit).ok_or_else(out_of_range)?;

            // Digits past the 18th are below a nanosecond for every unit
            let frac = &frac[..frac.len().min(18)];
            if !frac.is_empty() {
                let frac_value: u128 = frac
                    .parse()
                    .map_err(|e| format!("invalid duration '{}': {}", input, e))?;
                part += frac_value * unit / 10u128.pow(frac.len() as u32);
            }

            total = total.checked_add(part).ok_or_else(out_of_range)?;
        }

        let secs = u64::try_from(total / NANOS_PER_SEC).map_err(|_| out_of_range())?;
        Ok(Duration::new(secs, (total % NANOS_PER_SEC) as u32))
    }

    fn format(duration: &Duration) -> String {
        let nanos = duration.as_nanos();
        if nanos % 1_000 != 0 {
            return format!("{}ns", nanos);
        }
        if nanos % 1_000_000 != 0 {
            return format!("{}us", nanos / 1_000);
        }
        if nanos % NANOS_PER_SEC != 0 {
            return format!("{}ms", nanos / 1_000_000);
        }
        let secs = duration.as_secs();
        if secs != 0 && secs % 3600 == 0 {
            format!("{}h", secs / 3600)
        } else if secs != 0 && secs % 60 == 0 {
            format!("{}m", secs / 60)
        } else {
            format!("{}s", secs)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_default() {
        let config = ExporterConfig::default();
        assert_eq!(config.filewatcher.period, Duration::from_secs(300));
        assert_eq!(
            config.filewatcher.unfinished_timeout,
            Duration::from_secs(86_400)
        );
        assert_eq!(config.metrics.namespace, "loggie");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = ExporterConfig::from_toml_str("").unwrap();
        assert_eq!(config.filewatcher, FileWatcherConfig::default());
    }

    #[test]
    fn test_parse_filewatcher_section() {
        let config = ExporterConfig::from_toml_str(
            r#"
            [filewatcher]
            period = "30s"
            checkUnFinishedTimeout = "1h30m"
            "#,
        )
        .unwrap();

        assert_eq!(config.filewatcher.period, Duration::from_secs(30));
        assert_eq!(
            config.filewatcher.unfinished_timeout,
            Duration::from_secs(5400)
        );
    }

    #[test]
    fn test_numeric_seconds() {
        let config = ExporterConfig::from_toml_str("[filewatcher]\nperiod = 10\n").unwrap();
        assert_eq!(config.filewatcher.period, Duration::from_secs(10));
    }

    #[test]
    fn test_zero_period_rejected() {
        let err = ExporterConfig::from_toml_str("[filewatcher]\nperiod = \"0s\"\n").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_invalid_metric_prefix_rejected() {
        let err = ExporterConfig::from_toml_str("[metrics]\nnamespace = \"my-ns\"\n").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));

        let err =
            ExporterConfig::from_toml_str("[metrics]\nnamespace = \"\"\nsubsystem = \"9lives\"\n")
                .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));

        let config =
            ExporterConfig::from_toml_str("[metrics]\nnamespace = \"ns:app\"\nsubsystem = \"\"\n")
                .unwrap();
        assert_eq!(config.metrics.fq_name("file_size"), "ns:app_file_size");
        assert!(MetricsConfig::default().validate().is_ok());
    }

    #[test]
    fn test_bad_duration_rejected() {
        assert!(ExporterConfig::from_toml_str("[filewatcher]\nperiod = \"5 minutes\"\n").is_err());
        assert!(duration_str::parse("10").is_err());
        assert!(duration_str::parse("m").is_err());
        assert_eq!(
            duration_str::parse("250ms").unwrap(),
            Duration::from_millis(250)
        );
        assert_eq!(duration_str::parse("2d").unwrap(), Duration::from_secs(172_800));
    }

    #[test]
    fn test_go_style_durations() {
        assert_eq!(duration_str::parse("1.5h").unwrap(), Duration::from_secs(5400));
        assert_eq!(duration_str::parse("300us").unwrap(), Duration::from_micros(300));
        assert_eq!(duration_str::parse("300µs").unwrap(), Duration::from_micros(300));
        assert_eq!(duration_str::parse("10ns").unwrap(), Duration::from_nanos(10));
        assert_eq!(duration_str::parse(".5s").unwrap(), Duration::from_millis(500));
        assert_eq!(
            duration_str::parse("1h0.5m").unwrap(),
            Duration::from_secs(3630)
        );
        assert!(duration_str::parse("1.2.3s").is_err());
        assert!(duration_str::parse(".s").is_err());

        let config = ExporterConfig::from_toml_str(
            "[filewatcher]\nperiod = \"300us\"\ncheckUnFinishedTimeout = \"1.5h\"\n",
        )
        .unwrap();
        assert_eq!(config.filewatcher.period, Duration::from_micros(300));
        assert_eq!(
            config.filewatcher.unfinished_timeout,
            Duration::from_secs(5400)
        );

        let text = toml::to_string(&config).unwrap();
        assert!(text.contains("period = \"300us\""));
        let back = ExporterConfig::from_toml_str(&text).unwrap();
        assert_eq!(back.filewatcher, config.filewatcher);
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = ExporterConfig::default();
        let text = toml::to_string(&config).unwrap();
        assert!(text.contains("checkUnFinishedTimeout = \"24h\""));
        assert!(text.contains("period = \"5m\""));

        let back = ExporterConfig::from_toml_str(&text).unwrap();
        assert_eq!(back.filewatcher, config.filewatcher);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[metrics]\nnamespace = \"custom\"").unwrap();

        let config = ExporterConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.metrics.namespace, "custom");
        assert_eq!(config.metrics.subsystem, "filewatcher");
    }

    #[test]
    fn test_load_missing_file() {
        let err = ExporterConfig::load_from_file("/nonexistent/exporter.toml").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_fq_name() {
        let config = MetricsConfig::default();
        assert_eq!(config.fq_name("file_size"), "loggie_filewatcher_file_size");

        let bare = MetricsConfig {
            namespace: "ns".to_string(),
            subsystem: String::new(),
        };
        assert_eq!(bare.fq_name("total_file_count"), "ns_total_file_count");
    }
}
