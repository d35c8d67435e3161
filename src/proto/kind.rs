use crate::error::ConfigError;
use crate::link::SeqSpace;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 六种协议，按经典教学顺序编号 1..=6
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolKind {
    /// 1. 无限制单工（乌托邦）
    Utopia,
    /// 2. 单工停等
    #[default]
    StopAndWait,
    /// 3. 有噪声信道的单工停等（PAR）
    Par,
    /// 4. 1 位滑动窗口
    OneBitSlidingWindow,
    /// 5. 回退 N 帧
    GoBackN,
    /// 6. 选择重传
    SelectiveRepeat,
}

impl ProtocolKind {
    pub const ALL: [ProtocolKind; 6] = [
        ProtocolKind::Utopia,
        ProtocolKind::StopAndWait,
        ProtocolKind::Par,
        ProtocolKind::OneBitSlidingWindow,
        ProtocolKind::GoBackN,
        ProtocolKind::SelectiveRepeat,
    ];

    pub fn id(self) -> u8 {
        match self {
            ProtocolKind::Utopia => 1,
            ProtocolKind::StopAndWait => 2,
            ProtocolKind::Par => 3,
            ProtocolKind::OneBitSlidingWindow => 4,
            ProtocolKind::GoBackN => 5,
            ProtocolKind::SelectiveRepeat => 6,
        }
    }

    /// 双向都有数据流量
    pub fn duplex(self) -> bool {
        self.id() >= 4
    }

    /// 能在有故障的信道上工作（1、2 假定理想信道）
    pub fn supports_faults(self) -> bool {
        self.id() >= 3
    }

    /// 窗口大小可配置
    pub fn supports_window(self) -> bool {
        matches!(self, ProtocolKind::GoBackN | ProtocolKind::SelectiveRepeat)
    }

    /// 默认是否使用乱序信道（前提是序号空间容得下，见 `SimConfig::reorders`）
    pub fn reorder_preset(self) -> bool {
        self.supports_window()
    }

    /// 该协议的序号空间；`bits` 只对窗口型协议有意义
    pub fn seq_space(self, bits: u32) -> Result<SeqSpace, ConfigError> {
        match self {
            ProtocolKind::Utopia | ProtocolKind::StopAndWait => Ok(SeqSpace::new(1)),
            ProtocolKind::Par | ProtocolKind::OneBitSlidingWindow => Ok(SeqSpace::new(2)),
            ProtocolKind::GoBackN | ProtocolKind::SelectiveRepeat => {
                if !(1..=16).contains(&bits) {
                    return Err(ConfigError::SeqBits(bits));
                }
                Ok(SeqSpace::with_bits(bits))
            }
        }
    }

    /// 实际使用的窗口大小：非窗口型协议恒为 1
    pub fn effective_window(self, requested: u32, bits: u32) -> Result<u32, ConfigError> {
        if !self.supports_window() {
            return Ok(1);
        }
        let seqs = self.seq_space(bits)?;
        if requested == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        let max = seqs.max_window();
        if requested > max {
            return Err(ConfigError::WindowTooLarge {
                size: requested,
                max,
                bits,
            });
        }
        Ok(requested)
    }
}

impl TryFrom<u8> for ProtocolKind {
    type Error = ConfigError;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        ProtocolKind::ALL
            .into_iter()
            .find(|p| p.id() == id)
            .ok_or(ConfigError::UnknownProtocol(id))
    }
}

impl fmt::Display for ProtocolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProtocolKind::Utopia => "utopia",
            ProtocolKind::StopAndWait => "stop-and-wait",
            ProtocolKind::Par => "par",
            ProtocolKind::OneBitSlidingWindow => "one-bit sliding window",
            ProtocolKind::GoBackN => "go-back-n",
            ProtocolKind::SelectiveRepeat => "selective repeat",
        };
        write!(f, "{} ({name})", self.id())
    }
}
