use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::{error, warn};

use crate::{config::RuleConfig, daemon::storage::usage_store::UsageStore};

use super::categorizer::Category;

/// Remembers which rules already fired today. The set resets implicitly at local midnight,
/// a rule last fired on an earlier date is allowed to fire again.
#[derive(Debug, Default)]
pub struct NotificationThrottler {
    fired: HashMap<String, NaiveDate>,
}

impl NotificationThrottler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true at most once per `rule_id` per day and records the firing.
    pub fn should_fire(&mut self, rule_id: &str, today: NaiveDate) -> bool {
        match self.fired.get_mut(rule_id) {
            Some(last) if *last == today => false,
            Some(last) => {
                *last = today;
                true
            }
            None => {
                self.fired.insert(rule_id.to_string(), today);
                true
            }
        }
    }
}

/// Destination of user facing alerts.
#[cfg_attr(test, mockall::automock)]
pub trait Notifier: Send {
    fn notify(&self, title: &str, message: &str);
}

/// Writes alerts into the log.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, title: &str, message: &str) {
        warn!("{title}: {message}");
    }
}

/// Fires `notification_rules` alerts when a category goes over its daily threshold.
pub struct CategoryAlerts {
    throttler: NotificationThrottler,
    notifier: Box<dyn Notifier>,
}

impl CategoryAlerts {
    pub fn new(notifier: Box<dyn Notifier>) -> Self {
        Self {
            throttler: NotificationThrottler::new(),
            notifier,
        }
    }

    /// Checks the threshold of `category` only, other categories didn't change this tick.
    pub fn check<S: UsageStore + ?Sized>(
        &mut self,
        category: &Category,
        store: &S,
        config: &RuleConfig,
        today: NaiveDate,
    ) {
        if !config.notifications {
            return;
        }
        let Some(threshold) = config
            .notification_rules
            .categories
            .get(&category.name)
            .and_then(|v| v.time_threshold_minutes)
        else {
            return;
        };
        let rule_id = format!("{} time_threshold_minutes {threshold}", category.name);

        let seconds = match store.category_seconds(&category.name, today) {
            Ok(v) => v,
            Err(e) => {
                error!("Can't check alert {rule_id}: {e}");
                return;
            }
        };
        if seconds / 60 < i64::from(threshold) {
            return;
        }
        if self.throttler.should_fire(&rule_id, today) {
            self.notifier.notify(
                "Time limit reached",
                &format!(
                    "You spent more time in {} than planned ({threshold} minutes)",
                    category.name
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::{
        config::CategoryAlert,
        daemon::storage::entities::{DateFilter, UsageRecord},
        error::TrackerError,
        window_api::WindowSnapshot,
    };

    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, d).unwrap()
    }

    #[test]
    fn test_fires_once_per_day() {
        let mut throttler = NotificationThrottler::new();

        assert!(throttler.should_fire("a", day(1)));
        assert!(!throttler.should_fire("a", day(1)));
        assert!(throttler.should_fire("b", day(1)));
        assert!(throttler.should_fire("a", day(2)));
        assert!(!throttler.should_fire("a", day(2)));
    }

    struct CategoryUsage(i64);

    impl UsageStore for CategoryUsage {
        fn record_tick(&mut self, _: &Category, _: NaiveDate) -> Result<(), TrackerError> {
            unreachable!()
        }

        fn seconds_today(&self, _: &str, _: NaiveDate) -> Result<i64, TrackerError> {
            unreachable!()
        }

        fn category_seconds(&self, _: &str, _: NaiveDate) -> Result<i64, TrackerError> {
            Ok(self.0)
        }

        fn query(&self, _: DateFilter) -> Result<Vec<UsageRecord>, TrackerError> {
            unreachable!()
        }
    }

    fn social() -> Category {
        Category {
            name: "Social".into(),
            canonical_title: "Telegram".into(),
            raw_process_name: "Telegram".into(),
            source: WindowSnapshot {
                process_id: 10,
                process_name: "Telegram.exe".into(),
                executable_path: "".into(),
                window_title: "Telegram".into(),
            },
        }
    }

    fn config(threshold: u32) -> RuleConfig {
        let mut config = RuleConfig::default();
        config.notification_rules.categories.insert(
            "Social".into(),
            CategoryAlert {
                time_threshold_minutes: Some(threshold),
            },
        );
        config
    }

    #[test]
    fn test_alert_fires_once_when_threshold_reached() {
        let mut notifier = MockNotifier::new();
        notifier.expect_notify().times(1).return_const(());
        let mut alerts = CategoryAlerts::new(Box::new(notifier));
        let config = config(10);

        alerts.check(&social(), &CategoryUsage(599), &config, day(1));
        alerts.check(&social(), &CategoryUsage(600), &config, day(1));
        alerts.check(&social(), &CategoryUsage(900), &config, day(1));
    }

    #[test]
    fn test_alert_fires_again_next_day() {
        let mut notifier = MockNotifier::new();
        notifier.expect_notify().times(2).return_const(());
        let mut alerts = CategoryAlerts::new(Box::new(notifier));
        let config = config(1);

        alerts.check(&social(), &CategoryUsage(60), &config, day(1));
        alerts.check(&social(), &CategoryUsage(61), &config, day(1));
        alerts.check(&social(), &CategoryUsage(60), &config, day(2));
    }

    #[test]
    fn test_disabled_notifications() {
        let mut notifier = MockNotifier::new();
        notifier.expect_notify().never();
        let mut alerts = CategoryAlerts::new(Box::new(notifier));
        let mut config = config(1);
        config.notifications = false;

        alerts.check(&social(), &CategoryUsage(6000), &config, day(1));
    }
}
