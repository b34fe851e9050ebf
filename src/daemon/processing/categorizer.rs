use crate::{config::RuleConfig, error::TrackerError, window_api::WindowSnapshot};

/// Category assigned to snapshots no rule matched.
pub const FALLBACK_CATEGORY: &str = "Other";

const EXECUTABLE_SUFFIX: &str = ".exe";

/// Classification of a single snapshot. `canonical_title` is the key usage is aggregated under,
/// `raw_process_name` always identifies the executable itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub name: String,
    pub canonical_title: String,
    pub raw_process_name: String,
    pub source: WindowSnapshot,
}

/// Removes a trailing lowercase `.exe`. Other spellings are kept as part of the name.
pub fn strip_executable_suffix(process_name: &str) -> &str {
    process_name
        .strip_suffix(EXECUTABLE_SUFFIX)
        .unwrap_or(process_name)
}

fn display_title(config: &RuleConfig, raw: &str) -> String {
    config
        .title_overrides
        .get(raw)
        .cloned()
        .unwrap_or_else(|| raw.to_string())
}

/// Maps a snapshot to its category. Rules are tried in order, first match wins:
/// 1. exact process name in `process_rules`;
/// 2. first category of `window_rules` with a keyword contained in the window title, the first
///    matching keyword of that category becomes the title;
/// 3. [FALLBACK_CATEGORY].
///
/// `title_overrides` applies to the resulting title in every case.
pub fn categorize(snapshot: &WindowSnapshot, config: &RuleConfig) -> Result<Category, TrackerError> {
    if !snapshot.is_resolved() {
        return Err(TrackerError::InvalidInput(format!(
            "Can't categorize unresolved window {snapshot:?}"
        )));
    }

    let stripped = strip_executable_suffix(&snapshot.process_name);

    let (name, title) = if let Some(name) = config.process_rules.get(&*snapshot.process_name) {
        (name.clone(), display_title(config, stripped))
    } else if let Some((name, keyword)) = match_window_rules(&snapshot.window_title, config) {
        (name.to_string(), display_title(config, keyword))
    } else {
        (FALLBACK_CATEGORY.to_string(), display_title(config, stripped))
    };

    Ok(Category {
        name,
        canonical_title: title,
        raw_process_name: stripped.to_string(),
        source: snapshot.clone(),
    })
}

fn match_window_rules<'a>(title: &str, config: &'a RuleConfig) -> Option<(&'a str, &'a str)> {
    config.window_rules.iter().find_map(|(name, keywords)| {
        keywords
            .iter()
            .find(|keyword| title.contains(keyword.as_str()))
            .map(|keyword| (name.as_str(), keyword.as_str()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(process_name: &str, window_title: &str) -> WindowSnapshot {
        WindowSnapshot {
            process_id: 1234,
            process_name: process_name.into(),
            executable_path: format!("C:\\Apps\\{process_name}").into(),
            window_title: window_title.into(),
        }
    }

    fn config() -> RuleConfig {
        RuleConfig::from_json(
            r#"{
                "process_rules": {
                    "chrome.exe": "Browsing",
                    "pycharm64.exe": "Development"
                },
                "window_rules": {
                    "Work": ["Jira", "GitHub"],
                    "Entertainment": ["YouTube", "Twitch"],
                    "Late": ["GitHub"]
                },
                "title_overrides": {
                    "pycharm64": "PyCharm",
                    "Twitch": "Twitch.tv"
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_process_rule() {
        let category = categorize(&snapshot("chrome.exe", "YouTube - Chrome"), &config()).unwrap();
        assert_eq!(category.name, "Browsing");
        assert_eq!(category.canonical_title, "chrome");
        assert_eq!(category.raw_process_name, "chrome");
    }

    #[test]
    fn test_process_rule_beats_window_rule() {
        let category =
            categorize(&snapshot("pycharm64.exe", "project - GitHub"), &config()).unwrap();
        assert_eq!(category.name, "Development");
        assert_eq!(category.canonical_title, "PyCharm");
        assert_eq!(category.raw_process_name, "pycharm64");
    }

    #[test]
    fn test_first_category_and_first_keyword_win() {
        // Both "Jira" and "GitHub" match, "Work" is listed before "Late".
        let category = categorize(
            &snapshot("firefox.exe", "GitHub issue linked from Jira"),
            &config(),
        )
        .unwrap();
        assert_eq!(category.name, "Work");
        assert_eq!(category.canonical_title, "Jira");
        assert_eq!(category.raw_process_name, "firefox");
    }

    #[test]
    fn test_keyword_title_goes_through_overrides() {
        let category =
            categorize(&snapshot("firefox.exe", "Twitch - Firefox"), &config()).unwrap();
        assert_eq!(category.name, "Entertainment");
        assert_eq!(category.canonical_title, "Twitch.tv");
    }

    #[test]
    fn test_fallback() {
        let category = categorize(&snapshot("notepad.exe", "notes.txt"), &config()).unwrap();
        assert_eq!(category.name, FALLBACK_CATEGORY);
        assert_eq!(category.canonical_title, "notepad");
        assert_eq!(category.raw_process_name, "notepad");

        let category = categorize(&snapshot("NOTEPAD.EXE", "notes.txt"), &config()).unwrap();
        assert_eq!(category.canonical_title, "NOTEPAD.EXE");
        assert_eq!(category.raw_process_name, "NOTEPAD.EXE");
    }

    #[test]
    fn test_fallback_title_goes_through_overrides() {
        let category =
            categorize(&snapshot("explorer.exe", "Downloads"), &RuleConfig::default()).unwrap();
        assert_eq!(category.name, FALLBACK_CATEGORY);
        assert_eq!(category.canonical_title, "Explorer");
        assert_eq!(category.raw_process_name, "explorer");
    }

    #[test]
    fn test_unresolved_is_invalid_input() {
        assert!(matches!(
            categorize(&WindowSnapshot::unresolved(), &config()),
            Err(TrackerError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_deterministic() {
        let config = config();
        let snapshots = [
            snapshot("chrome.exe", "Jira"),
            snapshot("alacritty", "GitHub - YouTube"),
            snapshot("x", ""),
        ];
        let first: Vec<_> = snapshots
            .iter()
            .map(|s| categorize(s, &config).unwrap())
            .collect();
        for _ in 0..10 {
            for (s, expected) in snapshots.iter().rev().zip(first.iter().rev()) {
                assert_eq!(&categorize(s, &config).unwrap(), expected);
            }
        }
    }

    #[test]
    fn test_strip_executable_suffix() {
        assert_eq!(strip_executable_suffix("chrome.exe"), "chrome");
        assert_eq!(strip_executable_suffix("CHROME.EXE"), "CHROME.EXE");
        assert_eq!(strip_executable_suffix("firefox"), "firefox");
        assert_eq!(strip_executable_suffix("exe"), "exe");
        assert_eq!(strip_executable_suffix("файл.exe"), "файл");
    }
}
