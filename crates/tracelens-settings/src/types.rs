//! Settings type definitions.
//!
//! Every section is `#[serde(default)]`, so a partial JSON file only needs
//! the keys it overrides.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type.
///
/// ```json
/// {
///   "logging": { "level": "debug" },
///   "pipeline": { "oldDataThresholdSecs": 600 }
/// }
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TracelensSettings {
    pub logging: LoggingSettings,
    pub pipeline: PipelineSettings,
    pub presentation: PresentationSettings,
    pub bridges: BridgeSettings,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// One of `trace`, `debug`, `info`, `warn`, `error`.
    pub level: String,
    /// Emit JSON lines instead of human-readable logs.
    pub json: bool,
    /// Per-module level overrides, e.g. `{"tracelens_pipeline": "debug"}`.
    pub modules: BTreeMap<String, String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            modules: BTreeMap::new(),
        }
    }
}

impl LoggingSettings {
    pub fn log_level(&self) -> Result<tracing::Level> {
        parse_level("logging.level", &self.level)
    }

    pub fn module_levels(&self) -> Result<Vec<(String, tracing::Level)>> {
        self.modules
            .iter()
            .map(|(module, level)| Ok((module.clone(), parse_level("logging.modules", level)?)))
            .collect()
    }
}

fn parse_level(field: &'static str, level: &str) -> Result<tracing::Level> {
    level.parse().map_err(|_| SettingsError::Invalid {
        field,
        reason: format!("unknown level `{level}`"),
    })
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineSettings {
    /// Traces ending this long before the newest trace are dropped as old data.
    pub old_data_threshold_secs: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            old_data_threshold_secs: 300,
        }
    }
}

impl PipelineSettings {
    pub fn old_data_threshold(&self) -> Duration {
        Duration::from_secs(self.old_data_threshold_secs)
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PresentationSettings {
    /// Delay used for each presentation yield. `0` yields to the runtime once.
    pub yield_delay_ms: u64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BridgeSettings {
    /// Accept cross-tool messages (timestamps, bugreports) from an external tool.
    pub cross_tool_enabled: bool,
    /// Directory the extension bridge downloads attachments from on startup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachments_dir: Option<String>,
}

impl TracelensSettings {
    pub fn validate(&self) -> Result<()> {
        self.logging.log_level()?;
        self.logging.module_levels()?;
        if self.pipeline.old_data_threshold_secs == 0 {
            return Err(SettingsError::Invalid {
                field: "pipeline.oldDataThresholdSecs",
                reason: "must be positive".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = TracelensSettings::default();
        assert_eq!(settings.logging.level, "info");
        assert!(!settings.logging.json);
        assert_eq!(settings.pipeline.old_data_threshold(), Duration::from_secs(300));
        assert_eq!(settings.presentation.yield_delay_ms, 0);
        assert!(!settings.bridges.cross_tool_enabled);
        assert!(settings.bridges.attachments_dir.is_none());
        settings.validate().unwrap();
    }

    #[test]
    fn json_is_camel_case() {
        let json = serde_json::to_value(TracelensSettings::default()).unwrap();
        assert_eq!(json["pipeline"]["oldDataThresholdSecs"], 300);
        assert_eq!(json["presentation"]["yieldDelayMs"], 0);
        assert_eq!(json["bridges"]["crossToolEnabled"], false);
        assert!(json["bridges"].get("attachmentsDir").is_none());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let settings: TracelensSettings =
            serde_json::from_str(r#"{"logging": {"json": true}}"#).unwrap();
        assert!(settings.logging.json);
        assert_eq!(settings.logging.level, "info");
        assert_eq!(settings.pipeline.old_data_threshold_secs, 300);
    }

    #[test]
    fn invalid_level_rejected() {
        let mut settings = TracelensSettings::default();
        settings.logging.level = "loud".into();
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::Invalid { field: "logging.level", .. })
        ));
    }

    #[test]
    fn module_levels_parse() {
        let mut settings = TracelensSettings::default();
        settings
            .logging
            .modules
            .insert("tracelens_bridge".into(), "debug".into());
        assert_eq!(
            settings.logging.module_levels().unwrap(),
            vec![("tracelens_bridge".to_string(), tracing::Level::DEBUG)]
        );
    }

    #[test]
    fn zero_threshold_rejected() {
        let mut settings = TracelensSettings::default();
        settings.pipeline.old_data_threshold_secs = 0;
        assert!(settings.validate().is_err());
    }
}
