use std::fmt::Display;

use chrono::NaiveDate;
use tracing::error;

use crate::{config::RuleConfig, daemon::storage::usage_store::UsageStore};

use super::categorizer::Category;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    None,
    Terminate { pid: u32 },
}

/// A single rule the current window breaks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    AlwaysBlocked {
        rule: String,
    },
    BudgetExceeded {
        rule: String,
        seconds: i64,
        max_minutes: u32,
    },
    BlockedCategory(String),
    BlockedProcess(String),
    BlockedApp(String),
}

impl Violation {
    /// Stable identifier used to throttle repeated reports of the same rule.
    pub fn rule_id(&self) -> String {
        match self {
            Violation::AlwaysBlocked { rule } => format!("restriction {rule} always_blocked"),
            Violation::BudgetExceeded {
                rule, max_minutes, ..
            } => format!("restriction {rule} max_minutes_per_day {max_minutes}"),
            Violation::BlockedCategory(v) => format!("blocklist category {v}"),
            Violation::BlockedProcess(v) => format!("blocklist process {v}"),
            Violation::BlockedApp(v) => format!("blocklist app {v}"),
        }
    }
}

impl Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Violation::AlwaysBlocked { rule } => write!(f, "'{rule}' is always blocked"),
            Violation::BudgetExceeded {
                rule,
                seconds,
                max_minutes,
            } => write!(
                f,
                "'{rule}' used for {seconds}s today, budget is {max_minutes} minutes"
            ),
            Violation::BlockedCategory(v) => write!(f, "category '{v}' is blocklisted"),
            Violation::BlockedProcess(v) => write!(f, "process '{v}' is blocklisted"),
            Violation::BlockedApp(v) => write!(f, "app '{v}' is blocklisted"),
        }
    }
}

/// Result of evaluating every rule against a window. Termination is a single action no matter
/// how many rules are broken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub action: Action,
    pub violations: Vec<Violation>,
}

/// Checks window restrictions, then the blocklist. Budgets compare against the seconds stored
/// before the current tick is recorded, so the tick that crosses a budget is still counted and
/// the window is terminated from the next one on.
pub fn evaluate<S: UsageStore + ?Sized>(
    category: &Category,
    store: &S,
    config: &RuleConfig,
    today: NaiveDate,
) -> Verdict {
    let mut violations = Vec::new();
    let title = category.canonical_title.as_str();

    let mut seconds_today: Option<i64> = None;
    for (rule, spec) in &config.window_restrictions {
        if !title.contains(rule.as_str()) {
            continue;
        }
        if spec.always_blocked {
            violations.push(Violation::AlwaysBlocked { rule: rule.clone() });
            continue;
        }
        let Some(max_minutes) = spec.max_minutes_per_day else {
            continue;
        };
        let seconds = match seconds_today {
            Some(v) => v,
            None => match store.seconds_today(title, today) {
                Ok(v) => *seconds_today.insert(v),
                Err(e) => {
                    error!("Skipping budget check for {title}, usage is unavailable: {e}");
                    continue;
                }
            },
        };
        if seconds > i64::from(max_minutes) * 60 {
            violations.push(Violation::BudgetExceeded {
                rule: rule.clone(),
                seconds,
                max_minutes,
            });
        }
    }

    let blocklist = &config.blocklist;
    if blocklist.categories.contains(&category.name) {
        violations.push(Violation::BlockedCategory(category.name.clone()));
    }
    if blocklist
        .processes
        .contains(&*category.source.process_name)
    {
        violations.push(Violation::BlockedProcess(
            category.source.process_name.to_string(),
        ));
    }
    for app in &blocklist.apps {
        if title.contains(app.as_str()) {
            violations.push(Violation::BlockedApp(app.clone()));
        }
    }

    let action = if violations.is_empty() {
        Action::None
    } else {
        Action::Terminate {
            pid: category.source.process_id,
        }
    };
    Verdict { action, violations }
}
