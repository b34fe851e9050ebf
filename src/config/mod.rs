//! Rule configuration. The document is loaded once at start-up and handed out as an immutable
//! [RuleConfig] snapshot, see [shared::SharedRuleConfig] for how reloads replace it.

pub mod loader;
pub mod ordered;
pub mod shared;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::TrackerError;

/// Budget or absolute block applied to every canonical title containing the rule's substring.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestrictionSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_minutes_per_day: Option<u32>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub always_blocked: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlocklistSpec {
    #[serde(default)]
    pub categories: BTreeSet<String>,
    /// Raw process names, e.g. `steam.exe`.
    #[serde(default)]
    pub processes: BTreeSet<String>,
    /// Substrings of the canonical title.
    #[serde(default)]
    pub apps: BTreeSet<String>,
}

impl BlocklistSpec {
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty() && self.processes.is_empty() && self.apps.is_empty()
    }
}

const DEFAULT_WORK_MINUTES: u32 = 25;
const DEFAULT_BREAK_MINUTES: u32 = 5;

fn default_work_minutes() -> u32 {
    DEFAULT_WORK_MINUTES
}

fn default_break_minutes() -> u32 {
    DEFAULT_BREAK_MINUTES
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PomodoroSpec {
    #[serde(default = "default_work_minutes")]
    pub work_minutes: u32,
    #[serde(default = "default_break_minutes")]
    pub break_minutes: u32,
}

impl Default for PomodoroSpec {
    fn default() -> Self {
        Self {
            work_minutes: DEFAULT_WORK_MINUTES,
            break_minutes: DEFAULT_BREAK_MINUTES,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryAlert {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_threshold_minutes: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRules {
    #[serde(default)]
    pub categories: BTreeMap<String, CategoryAlert>,
}

fn enabled() -> bool {
    true
}

fn is_true(v: &bool) -> bool {
    *v
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Exact process name to category name.
    pub process_rules: BTreeMap<String, String>,
    /// Category name to title keywords, in document order.
    #[serde(with = "ordered")]
    pub window_rules: Vec<(String, Vec<String>)>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub title_overrides: BTreeMap<String, String>,
    #[serde(default, with = "ordered", skip_serializing_if = "Vec::is_empty")]
    pub window_restrictions: Vec<(String, RestrictionSpec)>,
    #[serde(default, skip_serializing_if = "BlocklistSpec::is_empty")]
    pub blocklist: BlocklistSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pomodoro: Option<PomodoroSpec>,
    #[serde(default = "enabled", skip_serializing_if = "is_true")]
    pub notifications: bool,
    #[serde(default, skip_serializing_if = "NotificationRules::is_empty")]
    pub notification_rules: NotificationRules,
}

impl NotificationRules {
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

impl RuleConfig {
    /// Parses and validates a configuration document.
    pub fn from_json(text: &str) -> Result<Self, TrackerError> {
        let config: RuleConfig = serde_json::from_str(text).map_err(TrackerError::config)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, TrackerError> {
        serde_json::to_string_pretty(self).map_err(TrackerError::config)
    }

    /// Checks the constraints serde can't express. Empty patterns are rejected because an empty
    /// substring matches every title.
    pub fn validate(&self) -> Result<(), TrackerError> {
        for (name, category) in &self.process_rules {
            if name.is_empty() || category.is_empty() {
                return Err(TrackerError::config(
                    "process_rules can't contain empty process or category names",
                ));
            }
        }
        for (category, keywords) in &self.window_rules {
            if category.is_empty() {
                return Err(TrackerError::config("window_rules contains an empty category"));
            }
            if keywords.iter().any(String::is_empty) {
                return Err(TrackerError::config(format!(
                    "window_rules.{category} contains an empty keyword"
                )));
            }
        }
        if self.window_restrictions.iter().any(|(v, _)| v.is_empty()) {
            return Err(TrackerError::config(
                "window_restrictions contains an empty title substring",
            ));
        }
        if self.blocklist.apps.iter().any(String::is_empty) {
            return Err(TrackerError::config("blocklist.apps contains an empty entry"));
        }
        if let Some(pomodoro) = self.pomodoro {
            if pomodoro.work_minutes == 0 || pomodoro.break_minutes == 0 {
                return Err(TrackerError::config("pomodoro durations must be positive"));
            }
        }
        Ok(())
    }
}

impl Default for RuleConfig {
    /// Configuration written out when no valid one exists.
    fn default() -> Self {
        let process_rules = [
            ("Telegram.exe", "Social"),
            ("Discord.exe", "Social"),
            ("pycharm64.exe", "Development"),
            ("python3.12.exe", "Development"),
            ("vscode.exe", "Development"),
        ];
        let title_overrides = [
            ("pycharm64", "PyCharm"),
            ("Taskmgr", "Task Manager"),
            ("wps", "WPS Office"),
            ("firefox", "Mozilla Firefox"),
            ("explorer", "Explorer"),
        ];
        Self {
            process_rules: process_rules
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            window_rules: vec![
                (
                    "Work".to_string(),
                    ["Jira", "Confluence", "GitHub", "python3"]
                        .map(String::from)
                        .to_vec(),
                ),
                (
                    "Entertainment".to_string(),
                    ["YouTube", "Twitch", "Steam"].map(String::from).to_vec(),
                ),
            ],
            title_overrides: title_overrides
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            window_restrictions: vec![(
                "YouTube".to_string(),
                RestrictionSpec {
                    max_minutes_per_day: Some(3600),
                    always_blocked: false,
                },
            )],
            blocklist: BlocklistSpec::default(),
            pomodoro: None,
            notifications: true,
            notification_rules: NotificationRules::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "process_rules": { "chrome.exe": "Browsing" },
        "window_rules": {
            "Work": ["Jira", "GitHub"],
            "Entertainment": ["YouTube"],
            "Art": ["Krita"]
        },
        "window_restrictions": {
            "YouTube": { "max_minutes_per_day": 30 },
            "Steam": { "always_blocked": true }
        },
        "blocklist": { "processes": ["game.exe"] },
        "pomodoro": { "work_minutes": 50 },
        "browser_specific": {}
    }"#;

    #[test]
    fn test_window_rules_keep_document_order() {
        let config = RuleConfig::from_json(SAMPLE).unwrap();
        let names: Vec<_> = config.window_rules.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, ["Work", "Entertainment", "Art"]);
        assert_eq!(config.window_restrictions[0].0, "YouTube");
        assert_eq!(config.window_restrictions[1].0, "Steam");
    }

    #[test]
    fn test_optional_sections_default() {
        let config = RuleConfig::from_json(SAMPLE).unwrap();
        assert!(config.title_overrides.is_empty());
        assert!(config.blocklist.categories.is_empty());
        assert!(config.notifications);
        assert_eq!(
            config.pomodoro,
            Some(PomodoroSpec {
                work_minutes: 50,
                break_minutes: 5
            })
        );
        assert_eq!(
            config.window_restrictions[1].1,
            RestrictionSpec {
                max_minutes_per_day: None,
                always_blocked: true
            }
        );
    }

    #[test]
    fn test_required_fields() {
        let missing = r#"{ "process_rules": {} }"#;
        assert!(matches!(
            RuleConfig::from_json(missing),
            Err(TrackerError::ConfigLoad(_))
        ));

        let wrong_type = r#"{ "process_rules": [], "window_rules": {} }"#;
        assert!(RuleConfig::from_json(wrong_type).is_err());
    }

    #[test]
    fn test_rejects_empty_keyword() {
        let text = r#"{ "process_rules": {}, "window_rules": { "Work": ["Jira", ""] } }"#;
        assert!(RuleConfig::from_json(text).is_err());
    }

    #[test]
    fn test_round_trip() {
        let config = RuleConfig::from_json(SAMPLE).unwrap();
        let written = config.to_json().unwrap();
        assert_eq!(RuleConfig::from_json(&written).unwrap(), config);

        let default = RuleConfig::default();
        assert_eq!(
            RuleConfig::from_json(&default.to_json().unwrap()).unwrap(),
            default
        );
    }
}
