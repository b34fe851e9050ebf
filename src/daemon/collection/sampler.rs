use std::time::Duration;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span};

use crate::{
    config::shared::SharedRuleConfig,
    daemon::{
        processing::{
            categorizer::categorize,
            enforcement::Enforcer,
            notifications::{CategoryAlerts, NotificationThrottler},
            policy::{self, Action, Verdict},
        },
        storage::usage_store::UsageStore,
    },
    utils::clock::Clock,
};

use super::resolver::WindowResolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing could be resolved, the tick had no effect.
    Skipped,
    /// One second was added to the store.
    Recorded(Action),
    /// The tick was evaluated but the store write failed.
    Dropped(Action),
}

/// Timing of the sampling loop.
#[derive(Debug, Clone, Copy)]
pub struct SamplingIntervals {
    pub tick: Duration,
    pub unresolved_backoff: Duration,
}

/// The sampling loop. It sequentially resolves the focused window, categorizes it, enforces the
/// policy and records one second of usage. A tick is never interrupted, stop requests are
/// observed between ticks.
pub struct SamplingLoop<S: UsageStore> {
    resolver: WindowResolver,
    config: SharedRuleConfig,
    store: S,
    enforcer: Enforcer,
    alerts: CategoryAlerts,
    violation_log: NotificationThrottler,
    shutdown: CancellationToken,
    intervals: SamplingIntervals,
    time_provider: Box<dyn Clock>,
}

impl<S: UsageStore> SamplingLoop<S> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        resolver: WindowResolver,
        config: SharedRuleConfig,
        store: S,
        enforcer: Enforcer,
        alerts: CategoryAlerts,
        shutdown: CancellationToken,
        intervals: SamplingIntervals,
        time_provider: Box<dyn Clock>,
    ) -> Self {
        Self {
            resolver,
            config,
            store,
            enforcer,
            alerts,
            violation_log: NotificationThrottler::new(),
            shutdown,
            intervals,
            time_provider,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Runs a single tick to completion.
    pub async fn tick(&mut self) -> TickOutcome {
        let Some(snapshot) = self.resolver.resolve().await else {
            return TickOutcome::Skipped;
        };

        // One snapshot and one date for the whole tick.
        let config = self.config.snapshot();
        let today = self.time_provider.today();

        let category = match categorize(&snapshot, &config) {
            Ok(v) => v,
            Err(e) => {
                error!("Skipping tick {e}");
                return TickOutcome::Skipped;
            }
        };
        debug!(
            "{} -> {} ({})",
            snapshot.window_title, category.canonical_title, category.name
        );

        let verdict = policy::evaluate(&category, &self.store, &config, today);
        self.report_violations(&verdict, today);
        self.enforcer.enforce(verdict.action).await;

        match self.store.record_tick(&category, today) {
            Ok(()) => {
                self.alerts.check(&category, &self.store, &config, today);
                TickOutcome::Recorded(verdict.action)
            }
            Err(e) => {
                error!("Dropping tick for {}: {e}", category.canonical_title);
                TickOutcome::Dropped(verdict.action)
            }
        }
    }

    fn report_violations(&mut self, verdict: &Verdict, today: chrono::NaiveDate) {
        for violation in &verdict.violations {
            if self.violation_log.should_fire(&violation.rule_id(), today) {
                info!("Restricting: {violation}");
            } else {
                debug!("Restricting: {violation}");
            }
        }
    }

    /// Executes the sampling loop until shutdown is requested.
    pub async fn run(mut self) -> Result<()> {
        info!("Starting sampling loop {:?}", self.intervals);
        let mut collection_point = self.time_provider.instant();
        loop {
            let outcome = self
                .tick()
                .instrument(info_span!("Sampling tick"))
                .await;

            let now = self.time_provider.instant();
            collection_point = match outcome {
                TickOutcome::Skipped => now + self.intervals.unresolved_backoff,
                // A tick that overran its slot doesn't make the following ticks burst.
                _ => (collection_point + self.intervals.tick).max(now),
            };

            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    break;
                }
                _ = self.time_provider.sleep_until(collection_point) => ()
            }
        }
        info!("Sampling loop stopped");
        Ok(())
    }
}
