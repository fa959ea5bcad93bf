//! 错误类型
//!
//! 每个故障域一个枚举；子系统内没有任何错误对进程是致命的。

use thiserror::Error;

/// 入口（ingress）请求校验失败，对应客户端错误（HTTP 400）。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngressError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("required field `{0}` is empty")]
    EmptyField(&'static str),
}

impl IngressError {
    pub fn http_status(&self) -> u16 {
        400
    }
}

/// 外部策略存储不可达。刷新失败时保留旧快照。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyStoreError {
    #[error("policy store unreachable: {0}")]
    Unreachable(String),
}

/// Dispatcher -> Receiver 转发失败。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForwardError {
    #[error("receiver unreachable: {0}")]
    Unreachable(String),
    #[error("receiver rejected packet: {0}")]
    Rejected(String),
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("`{0}` must be greater than zero")]
    Zero(&'static str),
    #[error("forward timeout ({timeout_ms}ms) must be shorter than dispatch period ({period_ms}ms)")]
    ForwardTimeoutTooLong { timeout_ms: u64, period_ms: u64 },
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}
