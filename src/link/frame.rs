//! 帧类型
//!
//! 帧创建后不可变；信道"损坏"一帧时生成一个带损坏标记的新副本，
//! seq/ack/载荷保持原样，由接收方检出。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FrameKind {
    Data,
    Ack,
    DataAck,
    Nak,
}

impl FrameKind {
    pub fn carries_data(self) -> bool {
        matches!(self, FrameKind::Data | FrameKind::DataAck)
    }

    /// `ack` 字段是否有意义
    pub fn carries_ack(self) -> bool {
        matches!(self, FrameKind::Ack | FrameKind::DataAck | FrameKind::Nak)
    }
}

/// 网络层分组（不透明字节）。克隆只增加引用计数，重传不复制数据。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Payload(Arc<[u8]>);

impl Payload {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Payload(Arc::from(bytes.into()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 有损 UTF-8 解码，用于日志展示
    pub fn to_text(&self) -> String {
        String::from_utf8_lossy(&self.0).into_owned()
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Payload::new(s.as_bytes().to_vec())
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

/// 数据链路层帧
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    seq: u32,
    ack: u32,
    kind: FrameKind,
    payload: Payload,
    corrupted: bool,
}

impl Frame {
    fn build(kind: FrameKind, seq: u32, ack: u32, payload: Payload) -> Self {
        Self {
            seq,
            ack,
            kind,
            payload,
            corrupted: false,
        }
    }

    /// 纯数据帧（单工协议）
    pub fn data(seq: u32, payload: Payload) -> Self {
        Self::build(FrameKind::Data, seq, 0, payload)
    }

    /// 携带捎带确认的数据帧
    pub fn data_ack(seq: u32, ack: u32, payload: Payload) -> Self {
        Self::build(FrameKind::DataAck, seq, ack, payload)
    }

    /// 独立确认帧
    pub fn ack(ack: u32) -> Self {
        Self::build(FrameKind::Ack, 0, ack, Payload::default())
    }

    /// 否定确认：请求 `ack + 1`，同时累计确认 `ack`
    pub fn nak(ack: u32) -> Self {
        Self::build(FrameKind::Nak, 0, ack, Payload::default())
    }

    pub fn seq(&self) -> u32 {
        self.seq
    }

    pub fn ack_no(&self) -> u32 {
        self.ack
    }

    pub fn kind(&self) -> FrameKind {
        self.kind
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn is_corrupted(&self) -> bool {
        self.corrupted
    }

    /// 信道损坏后的副本
    pub fn corrupted_copy(&self) -> Frame {
        Frame {
            corrupted: true,
            ..self.clone()
        }
    }
}
