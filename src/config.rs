//! 仿真配置
//!
//! 一次运行完全由 `SimConfig`（含随机种子）描述：相同配置重放出逐字节相同的事件日志。

use crate::error::ConfigError;
use crate::link::{Endpoint, FaultRates, Payload};
use crate::proto::ProtocolKind;
use serde::{Deserialize, Serialize};

/// 两端网络层要发送的数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrafficConfig {
    pub a: String,
    pub b: String,
    /// 每个分组的字节数
    pub chunk_bytes: usize,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            a: "A says: the quick brown fox jumps over the lazy dog.".to_string(),
            b: "B replies: pack my box with five dozen liquor jugs.".to_string(),
            chunk_bytes: 16,
        }
    }
}

impl TrafficConfig {
    /// 把 `ep` 的文本切成 `chunk_bytes` 字节的分组
    pub fn packets(&self, ep: Endpoint) -> Vec<Payload> {
        let text = match ep {
            Endpoint::A => &self.a,
            Endpoint::B => &self.b,
        };
        text.as_bytes()
            .chunks(self.chunk_bytes.max(1))
            .map(|c| Payload::new(c.to_vec()))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub protocol: ProtocolKind,
    /// 窗口型协议的序号位数 k
    pub seq_bits: u32,
    pub window_size: u32,
    pub faults: FaultRates,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    /// 重传定时器
    pub timeout_ms: u64,
    /// 辅助确认定时器
    pub ack_timeout_ms: u64,
    /// None：按协议默认（1–4 保序；5–6 在序号空间容得下时乱序，否则保序）。
    /// Some(true) 而序号会混淆时校验失败。
    pub reorder: Option<bool>,
    /// 选择重传是否发送 NAK
    pub nak: bool,
    pub seed: u64,
    pub traffic: TrafficConfig,
    /// 自由运行时的事件预算
    pub max_events: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            protocol: ProtocolKind::default(),
            seq_bits: 3,
            window_size: 4,
            faults: FaultRates::NONE,
            min_delay_ms: 50,
            max_delay_ms: 150,
            timeout_ms: 500,
            ack_timeout_ms: 150,
            reorder: None,
            nak: true,
            seed: 0,
            traffic: TrafficConfig::default(),
            max_events: 1_000_000,
        }
    }
}

impl SimConfig {
    pub fn for_protocol(protocol: ProtocolKind) -> Self {
        Self {
            protocol,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=16).contains(&self.seq_bits) {
            return Err(ConfigError::SeqBits(self.seq_bits));
        }
        self.protocol
            .effective_window(self.window_size, self.seq_bits)?;
        self.faults.validate()?;
        if self.min_delay_ms > self.max_delay_ms {
            return Err(ConfigError::DelayRange {
                min_ms: self.min_delay_ms,
                max_ms: self.max_delay_ms,
            });
        }
        self.reorders()?;
        if self.timeout_ms == 0 || self.ack_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.traffic.chunk_bytes == 0 {
            return Err(ConfigError::ChunkSize);
        }
        Ok(())
    }

    /// 实际生效的窗口大小
    pub fn window(&self) -> Result<u32, ConfigError> {
        self.protocol
            .effective_window(self.window_size, self.seq_bits)
    }

    /// 信道是否乱序投递
    pub fn reorders(&self) -> Result<bool, ConfigError> {
        let seqs = self.protocol.seq_space(self.seq_bits)?;
        let window = self.window()?;
        let safe = seqs.tolerates_reorder(window, self.min_delay_ms, self.max_delay_ms);
        match self.reorder {
            Some(true) if !safe => Err(ConfigError::ReorderAliasing {
                modulus: seqs.modulus(),
                window,
                min_ms: self.min_delay_ms,
                max_ms: self.max_delay_ms,
            }),
            Some(reorder) => Ok(reorder),
            None => Ok(self.protocol.reorder_preset() && safe),
        }
    }
}
