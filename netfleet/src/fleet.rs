//! Fleet-wide scheduling.
//!
//! [`FleetScheduler`] runs one [`SessionPipeline`] per host with at most
//! `workers` sessions open at a time, under an optional deadline for the
//! whole run. Every submitted host produces exactly one [`HostResult`],
//! returned in submission order.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use log::{debug, error, info};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::time::Instant;

use crate::config::FleetConfig;
use crate::driver::{DefaultDriverFactory, DriverFactory};
use crate::inventory::Host;
use crate::pipeline::{HostResult, SessionPipeline, Stage};
use crate::platform::PlatformRegistry;
use crate::resolver::CommandCatalog;

/// Runs commands across a fleet with bounded concurrency.
pub struct FleetScheduler<F = DefaultDriverFactory> {
    registry: Arc<PlatformRegistry>,
    factory: Arc<F>,
    config: FleetConfig,
}

impl FleetScheduler<DefaultDriverFactory> {
    /// Scheduler over the built-in platforms and drivers.
    pub fn new(config: FleetConfig) -> Self {
        let factory = DefaultDriverFactory::new(config.driver.clone());
        Self::with_factory(Arc::new(PlatformRegistry::builtin()), Arc::new(factory), config)
    }
}

impl<F: DriverFactory> FleetScheduler<F> {
    /// Scheduler with a custom registry and driver factory.
    pub fn with_factory(
        registry: Arc<PlatformRegistry>,
        factory: Arc<F>,
        config: FleetConfig,
    ) -> Self {
        Self {
            registry,
            factory,
            config,
        }
    }

    pub fn config(&self) -> &FleetConfig {
        &self.config
    }

    pub fn registry(&self) -> &PlatformRegistry {
        &self.registry
    }

    /// Run every host's commands and collect the results.
    ///
    /// Never fails as a whole: per-host failures are reported in the
    /// host's result.
    pub async fn run<I>(&self, hosts: I, catalog: Arc<CommandCatalog>) -> FleetReport
    where
        I: IntoIterator<Item = Arc<Host>>,
    {
        let started = Instant::now();
        let deadline = self.config.deadline.map(|d| started + d);
        let workers = self.config.workers.max(1);

        let pipeline = Arc::new(
            SessionPipeline::new(self.registry.clone(), catalog, self.factory.clone())
                .with_deadline(deadline)
                .with_close_timeout(self.config.close_timeout),
        );
        let semaphore = Arc::new(Semaphore::new(workers));

        let hosts: Vec<Arc<Host>> = hosts.into_iter().collect();
        info!("running {} hosts with {} workers", hosts.len(), workers);

        let tasks: Vec<_> = hosts
            .iter()
            .cloned()
            .map(|host| {
                let pipeline = pipeline.clone();
                let semaphore = semaphore.clone();
                tokio::spawn(async move {
                    let acquire = semaphore.acquire_owned();
                    let permit = match deadline {
                        Some(deadline) => match tokio::time::timeout_at(deadline, acquire).await {
                            Ok(permit) => permit,
                            Err(_) => {
                                debug!("{}: deadline reached before a worker was free", host.name);
                                return HostResult::not_run(
                                    host,
                                    Stage::Timeout,
                                    "run deadline exceeded before the host was started",
                                );
                            }
                        },
                        None => acquire.await,
                    };
                    let _permit = match permit {
                        Ok(permit) => permit,
                        Err(e) => {
                            return HostResult::not_run(
                                host,
                                Stage::CommandError,
                                format!("worker pool closed: {}", e),
                            );
                        }
                    };
                    pipeline.run(host).await
                })
            })
            .collect();

        let results = join_all(tasks)
            .await
            .into_iter()
            .zip(hosts)
            .map(|(joined, host)| match joined {
                Ok(result) => result,
                Err(e) => {
                    error!("{}: host task failed: {}", host.name, e);
                    HostResult::not_run(host, Stage::CommandError, "host task panicked")
                }
            })
            .collect();

        let report = FleetReport {
            results,
            elapsed: started.elapsed(),
        };
        info!("{}", report.summary());
        report
    }

    /// Run again every host of `report` whose stage is retryable.
    pub async fn rerun_failed(
        &self,
        report: &FleetReport,
        catalog: Arc<CommandCatalog>,
    ) -> FleetReport {
        let hosts: Vec<_> = report
            .results
            .iter()
            .filter(|r| r.stage.is_retryable())
            .map(|r| r.host.clone())
            .collect();
        info!("re-running {} failed hosts", hosts.len());
        self.run(hosts, catalog).await
    }
}

/// Results of one fleet run.
#[derive(Debug, Clone, Serialize)]
pub struct FleetReport {
    /// One result per submitted host, in submission order.
    pub results: Vec<HostResult>,

    #[serde(serialize_with = "secs")]
    pub elapsed: Duration,
}

impl FleetReport {
    /// Counts per terminal stage.
    pub fn summary(&self) -> RunSummary {
        let mut by_stage = BTreeMap::new();
        for result in &self.results {
            *by_stage.entry(result.stage).or_insert(0) += 1;
        }
        RunSummary {
            total: self.results.len(),
            by_stage,
            elapsed: self.elapsed,
        }
    }

    /// Results of hosts that did not succeed.
    pub fn failed(&self) -> impl Iterator<Item = &HostResult> {
        self.results.iter().filter(|r| !r.is_success())
    }

    /// Result for a host by name.
    pub fn get(&self, name: &str) -> Option<&HostResult> {
        self.results.iter().find(|r| r.host.name == name)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Per-stage host counts for a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub by_stage: BTreeMap<Stage, usize>,
    #[serde(serialize_with = "secs")]
    pub elapsed: Duration,
}

impl RunSummary {
    /// Number of hosts that ended in `stage`.
    pub fn count(&self, stage: Stage) -> usize {
        self.by_stage.get(&stage).copied().unwrap_or(0)
    }

    /// Number of hosts that succeeded.
    pub fn succeeded(&self) -> usize {
        self.by_stage
            .iter()
            .filter(|(stage, _)| stage.is_success())
            .map(|(_, count)| count)
            .sum()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} hosts, {} succeeded in {:.1}s",
            self.total,
            self.succeeded(),
            self.elapsed.as_secs_f64()
        )?;
        for (stage, count) in &self.by_stage {
            write!(f, ", {} {}", count, stage)?;
        }
        Ok(())
    }
}

fn secs<S: serde::Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}
