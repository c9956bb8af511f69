//! 最小宿主驱动
//!
//! 为每个虚拟用户启动一个 tokio 任务：先执行一次 `setup`，再顺序执行
//! 指定次数的迭代。虚拟用户之间相互独立，同一虚拟用户的迭代从不重叠。
//!
//! 每个迭代的结果一结束就通过通道上报，超时中止时已完成的迭代仍计入汇总。

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use loadtest_shared::config::RunConfig;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::{Instant, timeout_at};
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::account::Account;
use crate::credential::TokenExchange;
use crate::scenario::{IterationState, ScenarioExecutor, setup};

/// 运行参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub vus: usize,
    pub iterations: usize,
    pub max_duration: Option<Duration>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self::from(&RunConfig::default())
    }
}

impl From<&RunConfig> for RunOptions {
    fn from(config: &RunConfig) -> Self {
        Self {
            vus: config.vus,
            iterations: config.iterations,
            max_duration: config.max_duration(),
        }
    }
}

/// 虚拟用户上报的进度事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VuEvent {
    SetupFailed,
    Succeeded,
    Failed(IterationState),
}

/// 整体运行结果
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    /// 启动的虚拟用户数
    pub vus: usize,
    /// 初始化失败（或异常退出）的虚拟用户数
    pub vus_failed: usize,
    pub iterations_succeeded: usize,
    pub iterations_failed: usize,
    /// 按中止状态统计的失败迭代
    pub failures_by_state: BTreeMap<String, usize>,
    /// 是否因超出时长上限而中止
    pub aborted: bool,
    pub duration_ms: u64,
}

impl RunSummary {
    pub fn iterations_total(&self) -> usize {
        self.iterations_succeeded + self.iterations_failed
    }

    /// 是否全部成功
    pub fn is_all_success(&self) -> bool {
        self.vus_failed == 0 && self.iterations_failed == 0 && !self.aborted
    }

    /// 迭代成功率（百分比）
    ///
    /// 没有执行任何迭代时，只要有虚拟用户初始化失败就记为 0。
    pub fn success_rate(&self) -> f64 {
        let total = self.iterations_total();
        if total == 0 {
            if self.vus_failed > 0 { 0.0 } else { 100.0 }
        } else {
            (self.iterations_succeeded as f64 / total as f64) * 100.0
        }
    }

    fn record(&mut self, event: VuEvent) {
        match event {
            VuEvent::SetupFailed => self.vus_failed += 1,
            VuEvent::Succeeded => self.iterations_succeeded += 1,
            VuEvent::Failed(state) => {
                self.iterations_failed += 1;
                *self
                    .failures_by_state
                    .entry(state.as_str().to_string())
                    .or_default() += 1;
            }
        }
    }
}

/// 场景驱动器
pub struct ScenarioDriver {
    exchange: Arc<dyn TokenExchange>,
    account: Account,
    oidc_enabled: bool,
    executor: Arc<ScenarioExecutor>,
}

impl ScenarioDriver {
    pub fn new(
        exchange: Arc<dyn TokenExchange>,
        account: Account,
        oidc_enabled: bool,
        executor: Arc<ScenarioExecutor>,
    ) -> Self {
        Self {
            exchange,
            account,
            oidc_enabled,
            executor,
        }
    }

    /// 运行全部虚拟用户并汇总结果
    ///
    /// 超过 `max_duration` 时直接中止仍在运行的虚拟用户，正在进行的迭代不做清理。
    pub async fn run(&self, options: &RunOptions) -> RunSummary {
        let start = Instant::now();
        let deadline = options.max_duration.map(|d| start + d);
        info!(
            vus = options.vus,
            iterations = options.iterations,
            oidc_enabled = self.oidc_enabled,
            "开始运行场景"
        );

        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let mut tasks = JoinSet::new();
        for vu in 1..=options.vus {
            let exchange = Arc::clone(&self.exchange);
            let account = self.account.clone();
            let executor = Arc::clone(&self.executor);
            let oidc_enabled = self.oidc_enabled;
            let iterations = options.iterations;
            let events = events_tx.clone();

            tasks.spawn(
                run_virtual_user(exchange, account, oidc_enabled, executor, iterations, events)
                    .instrument(info_span!("vu", vu)),
            );
        }
        drop(events_tx);

        let mut summary = RunSummary {
            vus: options.vus,
            ..Default::default()
        };

        loop {
            let next = match deadline {
                Some(at) => match timeout_at(at, tasks.join_next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        warn!(remaining = tasks.len(), "超出时长上限，中止剩余虚拟用户");
                        tasks.abort_all();
                        summary.aborted = true;
                        break;
                    }
                },
                None => tasks.join_next().await,
            };

            let Some(joined) = next else { break };
            if let Err(e) = joined {
                error!(error = %e, "虚拟用户任务异常退出");
                summary.vus_failed += 1;
            }
        }

        // 被中止的任务不会再发送，取出已缓冲的全部事件即可
        while let Ok(event) = events_rx.try_recv() {
            summary.record(event);
        }

        summary.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            succeeded = summary.iterations_succeeded,
            failed = summary.iterations_failed,
            vus_failed = summary.vus_failed,
            aborted = summary.aborted,
            duration_ms = summary.duration_ms,
            "场景运行结束"
        );
        summary
    }
}

async fn run_virtual_user(
    exchange: Arc<dyn TokenExchange>,
    account: Account,
    oidc_enabled: bool,
    executor: Arc<ScenarioExecutor>,
    iterations: usize,
    events: mpsc::UnboundedSender<VuEvent>,
) {
    let context = match setup(exchange.as_ref(), &account, oidc_enabled).await {
        Ok(context) => context,
        Err(e) => {
            error!(
                error = %e,
                setup_error = e.is_setup_error(),
                "虚拟用户初始化失败，跳过全部迭代"
            );
            let _ = events.send(VuEvent::SetupFailed);
            return;
        }
    };

    for iteration in 0..iterations {
        match executor
            .run_iteration(&context)
            .instrument(info_span!("iteration", iteration))
            .await
        {
            Ok(report) => {
                debug!(
                    iteration,
                    file_name = %report.file_name,
                    duration_ms = report.duration.as_millis() as u64,
                    "迭代完成"
                );
                let _ = events.send(VuEvent::Succeeded);
            }
            Err(failure) => {
                warn!(
                    iteration,
                    state = %failure.state,
                    transient = failure.error.is_transient(),
                    error = %failure.error,
                    "迭代失败"
                );
                let _ = events.send(VuEvent::Failed(failure.state));
            }
        }
    }
}
