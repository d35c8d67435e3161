//! 错误类型
//!
//! - `ConfigError`：命令/配置校验失败，同步拒绝，仿真状态不变。
//! - `ProtocolViolation`：协议内部不变式被破坏，对应实例被拆除。
//!
//! 信道丢包/损坏/重复不是错误，只作为普通日志事件出现。

use crate::link::Endpoint;
use crate::proto::ProtocolKind;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("unknown protocol id {0}; expected 1..=6")]
    UnknownProtocol(u8),
    #[error("sequence bits {0} outside 1..=16")]
    SeqBits(u32),
    #[error("window size must be at least 1")]
    ZeroWindow,
    #[error("window size {size} exceeds {max}, the limit for a {bits}-bit sequence space")]
    WindowTooLarge { size: u32, max: u32, bits: u32 },
    #[error("{name} probability {value} outside [0, 1]")]
    Probability { name: &'static str, value: f64 },
    #[error("delay range {min_ms}..={max_ms} ms is empty")]
    DelayRange { min_ms: u64, max_ms: u64 },
    #[error("retransmission and ack timeouts must be positive")]
    ZeroTimeout,
    #[error(
        "reordering with window {window} over {modulus} sequence numbers and delays {min_ms}..={max_ms} ms lets stale frames alias live ones"
    )]
    ReorderAliasing {
        modulus: u32,
        window: u32,
        min_ms: u64,
        max_ms: u64,
    },
    #[error("payload chunk size must be at least 1 byte")]
    ChunkSize,
    #[error("no protocol instance is running")]
    NoInstance,
    #[error("protocol {protocol} does not support {what}")]
    Unsupported {
        protocol: ProtocolKind,
        what: &'static str,
    },
}

/// 协议实现的内部逻辑缺陷（例如未确认帧数超过窗口）。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("protocol violation at endpoint {endpoint}: {detail}")]
pub struct ProtocolViolation {
    pub endpoint: Endpoint,
    pub detail: String,
}

impl ProtocolViolation {
    pub fn new(endpoint: Endpoint, detail: impl Into<String>) -> Self {
        Self {
            endpoint,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Violation(#[from] ProtocolViolation),
}
