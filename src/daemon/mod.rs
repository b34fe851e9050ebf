use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Result;
use collection::{
    resolver::WindowResolver,
    sampler::{SamplingIntervals, SamplingLoop},
};
use processing::{
    enforcement::{Enforcer, ProcessTerminator, SysinfoTerminator},
    notifications::{CategoryAlerts, LogNotifier},
};
use storage::{schema::DATABASE_FILE_NAME, usage_store::SqliteUsageStore};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::{
    config::{
        loader::{CONFIG_FILE_NAME, load_or_default},
        shared::{ConfigReloader, SharedRuleConfig},
    },
    utils::clock::{Clock, DefaultClock},
    window_api::{GenericWindowManager, WindowManager},
};

pub mod args;
pub mod collection;
pub mod processing;
pub mod reload;
pub mod shutdown;
pub mod storage;

const DEFAULT_INTERVALS: SamplingIntervals = SamplingIntervals {
    tick: Duration::from_secs(1),
    unresolved_backoff: Duration::from_secs(1),
};
const RESOLVE_TIMEOUT: Duration = Duration::from_secs(2);
const TERMINATE_TIMEOUT: Duration = Duration::from_secs(2);

/// Represents the starting point for the daemon. `dir` holds the database and the default
/// configuration location.
pub async fn start_daemon(dir: PathBuf, config_path: Option<PathBuf>) -> Result<()> {
    tokio::fs::create_dir_all(&dir).await?;
    let config_path = config_path.unwrap_or_else(|| dir.join(CONFIG_FILE_NAME));
    let config = SharedRuleConfig::new(load_or_default(&config_path).await?);

    let manager = GenericWindowManager::new()?;
    let store = SqliteUsageStore::open(&dir.join(DATABASE_FILE_NAME), Box::new(DefaultClock))?;

    let shutdown_token = CancellationToken::new();
    let sampler = create_sampler(
        manager,
        Arc::new(SysinfoTerminator),
        config.clone(),
        store,
        &shutdown_token,
        DEFAULT_INTERVALS,
        DefaultClock,
    );
    let reloader = ConfigReloader::new(config_path, config);

    info!("Daemon started in {dir:?}");
    let (_, _, sampling_result) = tokio::join!(
        shutdown::detect_shutdown(shutdown_token.clone()),
        reload::watch_reload(reloader, shutdown_token.clone()),
        sampler.run(),
    );

    if let Err(sampling_result) = sampling_result {
        error!("Sampling loop got an error {:?}", sampling_result);
    }

    Ok(())
}

fn create_sampler(
    manager: impl WindowManager + 'static,
    terminator: Arc<dyn ProcessTerminator>,
    config: SharedRuleConfig,
    store: SqliteUsageStore,
    shutdown_token: &CancellationToken,
    intervals: SamplingIntervals,
    clock: impl Clock,
) -> SamplingLoop<SqliteUsageStore> {
    SamplingLoop::new(
        WindowResolver::new(Box::new(manager), RESOLVE_TIMEOUT),
        config,
        store,
        Enforcer::new(terminator, TERMINATE_TIMEOUT),
        CategoryAlerts::new(Box::new(LogNotifier)),
        shutdown_token.clone(),
        intervals,
        Box::new(clock),
    )
}

#[cfg(test)]
mod daemon_tests {
    use std::{sync::Arc, time::Duration};

    use anyhow::Result;
    use chrono::NaiveDate;
    use tempfile::tempdir;
    use tokio_util::sync::CancellationToken;

    use crate::{
        config::{RuleConfig, shared::SharedRuleConfig},
        daemon::{
            collection::sampler::SamplingIntervals,
            create_sampler,
            processing::enforcement::MockProcessTerminator,
            storage::{
                entities::DateFilter, queries::UsageReader, schema::DATABASE_FILE_NAME,
                usage_store::SqliteUsageStore,
            },
        },
        utils::{clock::test_clock::TestClock, logging::TEST_LOGGING},
        window_api::{MockWindowManager, WindowSnapshot},
    };

    fn test_items() -> Vec<WindowSnapshot> {
        let snapshot = |pid, process: &str, title: &str| WindowSnapshot {
            process_id: pid,
            process_name: process.into(),
            executable_path: format!("/usr/bin/{process}").into(),
            window_title: title.into(),
        };
        vec![
            snapshot(10, "code", "main.rs - usage-warden"),
            snapshot(10, "code", "lib.rs - usage-warden"),
            snapshot(20, "firefox", "Jira board - Mozilla Firefox"),
        ]
    }

    /// Very simple smoke test to check that the pieces are wired together. Runs the loop against
    /// a mocked window manager for a short while and reads the result back the way the cli does.
    #[tokio::test]
    async fn smoke_test_daemon() -> Result<()> {
        *TEST_LOGGING;
        let mut mock_window_manager = MockWindowManager::new();
        let mut items = test_items().into_iter().cycle();
        mock_window_manager
            .expect_get_active_window_data()
            .returning(move || items.next().ok_or_else(|| anyhow::anyhow!("no items")));
        let mut terminator = MockProcessTerminator::new();
        terminator.expect_terminate().never();

        let config = RuleConfig::from_json(
            r#"{
                "process_rules": { "code": "Development" },
                "window_rules": { "Work": ["Jira"] }
            }"#,
        )?;
        let day = NaiveDate::from_ymd_opt(2018, 7, 4).unwrap();
        let clock = TestClock::new(day);
        let dir = tempdir()?;
        let db_path = dir.path().join(DATABASE_FILE_NAME);
        let store = SqliteUsageStore::open(&db_path, Box::new(clock.clone()))?;

        let shutdown_token = CancellationToken::new();
        let sampler = create_sampler(
            mock_window_manager,
            Arc::new(terminator),
            SharedRuleConfig::new(config),
            store,
            &shutdown_token,
            SamplingIntervals {
                tick: Duration::from_millis(20),
                unresolved_backoff: Duration::from_millis(20),
            },
            clock,
        );

        let (_, sampling_result) = tokio::join!(
            async {
                tokio::time::sleep(Duration::from_millis(500)).await;
                shutdown_token.cancel()
            },
            sampler.run(),
        );
        sampling_result?;

        let reader = UsageReader::open(&db_path)?;
        let by_category = reader.totals_by_category(DateFilter::Day(day))?;
        let names: Vec<_> = by_category.iter().map(|v| v.category.as_str()).collect();
        assert!(names.contains(&"Development"));
        assert!(names.contains(&"Work"));

        let titles = reader.top_titles(DateFilter::All, 10)?;
        assert_eq!(titles.len(), 2);
        assert!(titles.iter().any(|v| v.title == "code"));
        assert!(titles.iter().any(|v| v.title == "Jira"));
        assert_eq!(
            reader.grand_total(DateFilter::All)?,
            titles.iter().map(|v| v.seconds).sum::<i64>()
        );
        Ok(())
    }
}
