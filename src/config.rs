//! 运行时可调参数
//!
//! 默认值与校园 Wi-Fi 仿真一致：普通队列容量 20、调度周期 60ms、
//! 策略刷新 5s、延迟历史 50 条、优先级过期窗口 3s。

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// jitter 的计算方式
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum JitterMode {
    /// 0..=4 之间的伪随机值
    #[default]
    Synthetic,
    /// 最近延迟样本相邻差值的平均绝对值，截断到 0..=4
    Measured,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QosConfig {
    /// 普通队列容量 `Q`
    pub normal_queue_capacity: usize,
    /// 调度周期 `T_dispatch`
    pub dispatch_period_ms: u64,
    pub policy_refresh_period_ms: u64,
    /// 每类延迟历史容量 `H`
    pub latency_history_capacity: usize,
    /// 优先级流量过期窗口 `W`
    pub staleness_window_ms: u64,
    /// 单次转发的超时上限，必须短于调度周期
    pub forward_timeout_ms: u64,
    /// 丢包率分母中代表一个报告窗口预期流量的常数
    pub loss_window_samples: u64,
    pub generator_period_ms: u64,
    pub count_forward_failures_as_loss: bool,
    pub jitter: JitterMode,
    pub jitter_seed: Option<u64>,
}

impl Default for QosConfig {
    fn default() -> Self {
        Self {
            normal_queue_capacity: 20,
            dispatch_period_ms: 60,
            policy_refresh_period_ms: 5_000,
            latency_history_capacity: 50,
            staleness_window_ms: 3_000,
            forward_timeout_ms: 25,
            loss_window_samples: 20,
            generator_period_ms: 50,
            count_forward_failures_as_loss: true,
            jitter: JitterMode::Synthetic,
            jitter_seed: None,
        }
    }
}

impl QosConfig {
    /// 从 JSON 文件读取；缺省字段取默认值。
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let cfg: QosConfig = serde_json::from_str(raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let nonzero = [
            ("normal_queue_capacity", self.normal_queue_capacity as u64),
            ("dispatch_period_ms", self.dispatch_period_ms),
            ("policy_refresh_period_ms", self.policy_refresh_period_ms),
            ("latency_history_capacity", self.latency_history_capacity as u64),
            ("staleness_window_ms", self.staleness_window_ms),
            ("forward_timeout_ms", self.forward_timeout_ms),
            ("loss_window_samples", self.loss_window_samples),
            ("generator_period_ms", self.generator_period_ms),
        ];
        for (name, v) in nonzero {
            if v == 0 {
                return Err(ConfigError::Zero(name));
            }
        }
        if self.forward_timeout_ms >= self.dispatch_period_ms {
            return Err(ConfigError::ForwardTimeoutTooLong {
                timeout_ms: self.forward_timeout_ms,
                period_ms: self.dispatch_period_ms,
            });
        }
        Ok(())
    }

    pub fn dispatch_period(&self) -> Duration {
        Duration::from_millis(self.dispatch_period_ms)
    }

    pub fn policy_refresh_period(&self) -> Duration {
        Duration::from_millis(self.policy_refresh_period_ms)
    }

    pub fn forward_timeout(&self) -> Duration {
        Duration::from_millis(self.forward_timeout_ms)
    }

    pub fn generator_period(&self) -> Duration {
        Duration::from_millis(self.generator_period_ms)
    }
}
