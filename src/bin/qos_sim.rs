//! 校园 Wi-Fi QoS 仿真
//!
//! 启动策略刷新、调度与流量生成三个周期任务，按固定间隔输出指标 JSON。

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use campus_qos::config::{JitterMode, QosConfig};
use campus_qos::policy::{InMemoryPolicyStore, QosPolicy};
use campus_qos::runtime::QosRuntime;
use campus_qos::traffic::{Clock, SystemClock};
use clap::Parser;
use serde_json::json;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "qos-sim", about = "校园 Wi-Fi QoS 流量整形仿真：严格优先级 + 尾丢弃")]
struct Args {
    /// JSON 配置文件；命令行参数优先
    #[arg(long)]
    config: Option<PathBuf>,
    /// 高优先级应用（可重复）
    #[arg(long = "policy")]
    policies: Vec<String>,
    /// 普通队列容量
    #[arg(long)]
    queue_capacity: Option<usize>,
    #[arg(long)]
    dispatch_ms: Option<u64>,
    #[arg(long)]
    refresh_ms: Option<u64>,
    #[arg(long)]
    history: Option<usize>,
    /// 优先级流量过期窗口（毫秒）
    #[arg(long)]
    stale_ms: Option<u64>,
    #[arg(long)]
    forward_timeout_ms: Option<u64>,
    /// 流量生成间隔（毫秒）
    #[arg(long)]
    gen_ms: Option<u64>,
    /// 用实测的延迟差值代替伪随机 jitter
    #[arg(long)]
    measured_jitter: bool,
    /// 随机种子（应用类型选择与伪随机 jitter）
    #[arg(long)]
    seed: Option<u64>,
    /// 仿真运行多少毫秒
    #[arg(long, default_value_t = 10_000)]
    duration_ms: u64,
    /// 指标输出间隔（毫秒）
    #[arg(long, default_value_t = 1_000)]
    report_every_ms: u64,
}

impl Args {
    fn to_config(&self) -> Result<QosConfig, campus_qos::error::ConfigError> {
        let mut cfg = match &self.config {
            Some(path) => QosConfig::from_json_file(path)?,
            None => QosConfig::default(),
        };
        if let Some(v) = self.queue_capacity {
            cfg.normal_queue_capacity = v;
        }
        if let Some(v) = self.dispatch_ms {
            cfg.dispatch_period_ms = v;
        }
        if let Some(v) = self.refresh_ms {
            cfg.policy_refresh_period_ms = v;
        }
        if let Some(v) = self.history {
            cfg.latency_history_capacity = v;
        }
        if let Some(v) = self.stale_ms {
            cfg.staleness_window_ms = v;
        }
        if let Some(v) = self.forward_timeout_ms {
            cfg.forward_timeout_ms = v;
        }
        if let Some(v) = self.gen_ms {
            cfg.generator_period_ms = v;
        }
        if self.measured_jitter {
            cfg.jitter = JitterMode::Measured;
        }
        if self.seed.is_some() {
            cfg.jitter_seed = self.seed;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // 初始化 tracing（输出到 stderr，stdout 只留给指标）
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let args = Args::parse();
    let cfg = match args.to_config() {
        Ok(cfg) => cfg,
        Err(err) => {
            error!(%err, "invalid configuration");
            return ExitCode::from(2);
        }
    };

    let store = Arc::new(InMemoryPolicyStore::with_policies(
        args.policies.iter().map(QosPolicy::high),
    ));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let rt = match QosRuntime::new(cfg, store, Arc::clone(&clock)) {
        Ok(rt) => rt.with_generator(clock, args.seed),
        Err(err) => {
            error!(%err, "failed to build runtime");
            return ExitCode::from(2);
        }
    };

    info!(policies = ?args.policies, duration_ms = args.duration_ms, "starting simulation");
    rt.start();

    let report_every = Duration::from_millis(args.report_every_ms.max(1));
    let deadline = tokio::time::Instant::now() + Duration::from_millis(args.duration_ms);
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + report_every, report_every);
    loop {
        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => break,
            _ = ticker.tick() => {
                println!("{}", json!(rt.metrics()));
            }
        }
    }

    rt.stop().await;

    let emitted = rt.generator().map(|g| g.packets_emitted()).unwrap_or(0);
    println!(
        "{}",
        json!({
            "final": rt.metrics(),
            "queues": rt.queue_depths(),
            "emitted": emitted,
        })
    );
    ExitCode::SUCCESS
}
