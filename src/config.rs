//! Configuration types.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default cron expression for the daily report (sec min hour dom month dow).
pub const DEFAULT_REPORT_SCHEDULE: &str = "0 20 19 * * *";

/// Default caption attached to the daily report file.
pub const DEFAULT_REPORT_CAPTION: &str = "Your daily report";

/// Bot configuration, built from environment variables.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Port the webhook server binds on.
    pub port: u16,
    /// Path to the libSQL database file.
    pub db_path: PathBuf,
    /// WATI API base URL (without the `/api/v1` suffix).
    pub wati_api_url: String,
    /// WATI access token, sent verbatim in the `Authorization` header.
    pub wati_access_token: SecretString,
    /// CSV export URL of the question sheet.
    pub questions_sheet_url: String,
    /// Timeout applied to every outbound HTTP call.
    pub http_timeout: Duration,
    pub sweep: SweepConfig,
    pub report: ReportConfig,
    /// Directory for the daily rolling log file. Stderr only when unset.
    pub log_dir: Option<PathBuf>,
}

/// Startup distribution sweep settings.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    pub enabled: bool,
    /// Directory holding one image per branch, named `<branch>.<ext>`.
    pub image_dir: PathBuf,
    /// Extension candidates, tried in order.
    pub image_extensions: Vec<String>,
    /// Staff roster CSV imported at startup, before the sweep.
    pub roster_csv: Option<PathBuf>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            image_dir: PathBuf::from("./branch_images"),
            image_extensions: vec!["png".into(), "jpg".into(), "jpeg".into()],
            roster_csv: None,
        }
    }
}

/// Daily report settings.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    /// Directory the dated report files are written to.
    pub output_dir: PathBuf,
    /// Phone number the report is delivered to.
    pub operator_phone: String,
    pub caption: String,
    /// Cron expression for the daily run.
    pub schedule: String,
    /// Delete all collected answers after a successful delivery.
    pub purge_after_delivery: bool,
}

impl ReportConfig {
    pub fn new(output_dir: impl Into<PathBuf>, operator_phone: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            operator_phone: operator_phone.into(),
            caption: DEFAULT_REPORT_CAPTION.to_string(),
            schedule: DEFAULT_REPORT_SCHEDULE.to_string(),
            purge_after_delivery: false,
        }
    }
}

impl BotConfig {
    /// Build config from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
        };

        let wati_api_url = required("WATI_API_URL")?.trim_end_matches('/').to_string();
        let wati_access_token = SecretString::from(required("WATI_ACCESS_TOKEN")?);
        let questions_sheet_url = required("QUESTIONS_SHEET_URL")?;
        let operator_phone = required("REPORT_OPERATOR_PHONE")?;

        let port: u16 = parse_or(&lookup, "BOT_PORT", 5000)?;
        let timeout_secs: u64 = parse_or(&lookup, "HTTP_TIMEOUT_SECS", 30)?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "HTTP_TIMEOUT_SECS".into(),
                message: "must be greater than zero".into(),
            });
        }

        let db_path = lookup("BOT_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./data/survey-bot.db"));

        let mut sweep = SweepConfig {
            enabled: !parse_bool(&lookup, "SKIP_DISTRIBUTION_SWEEP", false)?,
            ..SweepConfig::default()
        };
        if let Some(dir) = lookup("BRANCH_IMAGE_DIR") {
            sweep.image_dir = PathBuf::from(dir);
        }
        sweep.roster_csv = lookup("STAFF_ROSTER_CSV")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);
        if let Some(exts) = lookup("BRANCH_IMAGE_EXTENSIONS") {
            let parsed: Vec<String> = exts
                .split(',')
                .map(|s| s.trim().trim_start_matches('.').to_ascii_lowercase())
                .filter(|s| !s.is_empty())
                .collect();
            if parsed.is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: "BRANCH_IMAGE_EXTENSIONS".into(),
                    message: "at least one extension is required".into(),
                });
            }
            sweep.image_extensions = parsed;
        }

        let mut report = ReportConfig::new(
            lookup("REPORT_DIR").unwrap_or_else(|| "./reports".to_string()),
            operator_phone,
        );
        if let Some(caption) = lookup("REPORT_CAPTION") {
            report.caption = caption;
        }
        if let Some(schedule) = lookup("REPORT_SCHEDULE") {
            cron::Schedule::from_str(&schedule).map_err(|e| ConfigError::InvalidValue {
                key: "REPORT_SCHEDULE".into(),
                message: e.to_string(),
            })?;
            report.schedule = schedule;
        }
        report.purge_after_delivery = parse_bool(&lookup, "REPORT_PURGE_AFTER_DELIVERY", false)?;

        Ok(Self {
            port,
            db_path,
            wati_api_url,
            wati_access_token,
            questions_sheet_url,
            http_timeout: Duration::from_secs(timeout_secs),
            sweep,
            report,
            log_dir: lookup("BOT_LOG_DIR").map(PathBuf::from),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn parse_bool<F>(lookup: &F, key: &str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).map(|s| s.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" | "" => Ok(false),
            other => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("expected a boolean, got '{other}'"),
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const BASE: &[(&str, &str)] = &[
        ("WATI_API_URL", "https://live-server.wati.io/"),
        ("WATI_ACCESS_TOKEN", "Bearer abc"),
        ("QUESTIONS_SHEET_URL", "https://sheets.example/export?format=csv"),
        ("REPORT_OPERATOR_PHONE", "917892409211"),
    ];

    #[test]
    fn defaults_applied() {
        let config = BotConfig::from_lookup(lookup_from(BASE)).unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.wati_api_url, "https://live-server.wati.io");
        assert_eq!(config.wati_access_token.expose_secret(), "Bearer abc");
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert_eq!(config.report.schedule, DEFAULT_REPORT_SCHEDULE);
        assert_eq!(config.report.caption, DEFAULT_REPORT_CAPTION);
        assert!(!config.report.purge_after_delivery);
        assert!(config.sweep.enabled);
        assert_eq!(config.sweep.image_extensions, vec!["png", "jpg", "jpeg"]);
        assert!(config.log_dir.is_none());
        assert!(config.sweep.roster_csv.is_none());
    }

    #[test]
    fn missing_required_var() {
        let err = BotConfig::from_lookup(lookup_from(&BASE[1..])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "WATI_API_URL"));
    }

    #[test]
    fn overrides_parsed() {
        let mut pairs = BASE.to_vec();
        pairs.extend_from_slice(&[
            ("BOT_PORT", "8081"),
            ("HTTP_TIMEOUT_SECS", "5"),
            ("BRANCH_IMAGE_EXTENSIONS", ".JPG, png"),
            ("REPORT_SCHEDULE", "0 0 8 * * MON-FRI"),
            ("REPORT_PURGE_AFTER_DELIVERY", "yes"),
            ("SKIP_DISTRIBUTION_SWEEP", "true"),
            ("STAFF_ROSTER_CSV", "./data/staff.csv"),
        ]);
        let config = BotConfig::from_lookup(lookup_from(&pairs)).unwrap();
        assert_eq!(config.port, 8081);
        assert_eq!(config.http_timeout, Duration::from_secs(5));
        assert_eq!(config.sweep.image_extensions, vec!["jpg", "png"]);
        assert_eq!(config.report.schedule, "0 0 8 * * MON-FRI");
        assert!(config.report.purge_after_delivery);
        assert!(!config.sweep.enabled);
        assert_eq!(config.sweep.roster_csv, Some(PathBuf::from("./data/staff.csv")));
    }

    #[test]
    fn invalid_values_rejected() {
        for (key, value) in [
            ("BOT_PORT", "not-a-port"),
            ("HTTP_TIMEOUT_SECS", "0"),
            ("REPORT_SCHEDULE", "every day"),
            ("REPORT_PURGE_AFTER_DELIVERY", "maybe"),
        ] {
            let mut pairs = BASE.to_vec();
            pairs.push((key, value));
            let err = BotConfig::from_lookup(lookup_from(&pairs)).unwrap_err();
            assert!(
                matches!(err, ConfigError::InvalidValue { key: ref k, .. } if k == key),
                "{key}={value} should be rejected"
            );
        }
    }
}
