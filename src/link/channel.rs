//! 仿真信道
//!
//! 单条点对点双向链路。每次 `send` 独立地按配置概率决定丢弃、重复与损坏，
//! 并为每个副本抽取传播时延。信道只产出 `ChannelEvent`，不了解任何协议逻辑。
//!
//! 故障策略（固定的抽样顺序保证同一种子可复现）：
//! 1. 命中强制丢弃过滤器 -> 丢弃（一次性）；
//! 2. 按 `loss` 抽样整次发送是否丢失，丢失的帧不会再被损坏或重复；
//! 3. 按 `duplicate` 抽样是否产生第二个副本（最多两个）；
//! 4. 每个副本独立按 `corrupt` 抽样是否损坏，并独立抽取时延。
//!
//! FIFO 模式下，一个方向上的到达时间不早于该方向上一次到达，保证按序交付。

use super::endpoint::Endpoint;
use super::frame::{Frame, FrameKind};
use crate::error::ConfigError;
use crate::sim::SimTime;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, trace};

/// 故障概率，均在 [0, 1] 内。
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FaultRates {
    #[serde(default)]
    pub loss: f64,
    #[serde(default)]
    pub corrupt: f64,
    #[serde(default)]
    pub duplicate: f64,
}

impl FaultRates {
    pub const NONE: FaultRates = FaultRates {
        loss: 0.0,
        corrupt: 0.0,
        duplicate: 0.0,
    };

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("loss", self.loss),
            ("corrupt", self.corrupt),
            ("duplicate", self.duplicate),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Probability { name, value });
            }
        }
        Ok(())
    }

    pub fn is_ideal(&self) -> bool {
        self.loss == 0.0 && self.corrupt == 0.0 && self.duplicate == 0.0
    }
}

#[derive(Debug, Clone)]
pub struct ChannelConfig {
    pub faults: FaultRates,
    pub min_delay: SimTime,
    pub max_delay: SimTime,
    /// true：同一方向按发送顺序到达
    pub fifo: bool,
    pub seed: u64,
}

/// 一次在链路上的发送（含重传）。`id` 在实例内唯一，便于可视化关联。
#[derive(Debug, Clone)]
pub struct Transmission {
    pub id: u64,
    pub from: Endpoint,
    pub frame: Frame,
    pub retrans: bool,
}

impl Transmission {
    pub fn to(&self) -> Endpoint {
        self.from.peer()
    }
}

/// 强制丢弃过滤器：空过滤器匹配下一帧。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameFilter {
    #[serde(default)]
    pub from: Option<Endpoint>,
    #[serde(default)]
    pub seq: Option<u32>,
    /// 只匹配携带数据的帧
    #[serde(default)]
    pub data_only: bool,
}

impl FrameFilter {
    pub fn any() -> Self {
        Self::default()
    }

    /// 从 `from` 发出、序号为 `seq` 的数据帧
    pub fn data(from: Endpoint, seq: u32) -> Self {
        Self {
            from: Some(from),
            seq: Some(seq),
            data_only: true,
        }
    }

    pub fn matches(&self, tx: &Transmission) -> bool {
        if self.from.is_some_and(|from| from != tx.from) {
            return false;
        }
        if self.data_only && !tx.frame.kind().carries_data() {
            return false;
        }
        // 只有数据帧的 seq 字段有意义
        if let Some(seq) = self.seq {
            if !tx.frame.kind().carries_data() || tx.frame.seq() != seq {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChannelEventKind {
    Arrival,
    Drop,
    Corrupt,
}

/// 信道的调度决定：在 `at` 时刻到达（可能已损坏），或在发送时刻被丢弃。
#[derive(Debug, Clone)]
pub struct ChannelEvent {
    pub kind: ChannelEventKind,
    pub tx: Transmission,
    pub at: SimTime,
    /// 由强制丢弃过滤器触发
    pub forced: bool,
}

#[derive(Debug)]
pub struct Channel {
    cfg: ChannelConfig,
    rng: ChaCha8Rng,
    last_arrival: [SimTime; 2],
    forced: VecDeque<FrameFilter>,
}

impl Channel {
    pub fn new(cfg: ChannelConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(cfg.seed);
        Self {
            cfg,
            rng,
            last_arrival: [SimTime::ZERO; 2],
            forced: VecDeque::new(),
        }
    }

    pub fn faults(&self) -> FaultRates {
        self.cfg.faults
    }

    pub fn set_faults(&mut self, faults: FaultRates) {
        debug!(?faults, "更新信道故障概率");
        self.cfg.faults = faults;
    }

    pub fn is_fifo(&self) -> bool {
        self.cfg.fifo
    }

    /// 登记一次性的强制丢弃
    pub fn force_drop(&mut self, filter: FrameFilter) {
        self.forced.push_back(filter);
    }

    pub fn pending_forced_drops(&self) -> usize {
        self.forced.len()
    }

    fn draw(&mut self, p: f64) -> bool {
        self.rng.gen_bool(p.clamp(0.0, 1.0))
    }

    fn draw_delay(&mut self) -> SimTime {
        let lo = self.cfg.min_delay.0;
        let hi = self.cfg.max_delay.0.max(lo);
        SimTime(self.rng.gen_range(lo..=hi))
    }

    /// 发送一帧，返回信道对它的全部调度决定（按到达时间无序）。
    pub fn send(&mut self, tx: Transmission, now: SimTime) -> Vec<ChannelEvent> {
        if let Some(i) = self.forced.iter().position(|f| f.matches(&tx)) {
            self.forced.remove(i);
            debug!(tx_id = tx.id, from = %tx.from, "强制丢弃");
            return vec![ChannelEvent {
                kind: ChannelEventKind::Drop,
                tx,
                at: now,
                forced: true,
            }];
        }

        let faults = self.cfg.faults;
        if self.draw(faults.loss) {
            trace!(tx_id = tx.id, "随机丢弃");
            return vec![ChannelEvent {
                kind: ChannelEventKind::Drop,
                tx,
                at: now,
                forced: false,
            }];
        }

        let copies = if self.draw(faults.duplicate) { 2 } else { 1 };
        let dir = tx.from.index();
        let mut out = Vec::with_capacity(copies);
        for _ in 0..copies {
            let corrupted = self.draw(faults.corrupt);
            let mut at = now.after(self.draw_delay());
            if self.cfg.fifo {
                at = at.max(self.last_arrival[dir]);
                self.last_arrival[dir] = at;
            }
            let (kind, frame) = if corrupted {
                (ChannelEventKind::Corrupt, tx.frame.corrupted_copy())
            } else {
                (ChannelEventKind::Arrival, tx.frame.clone())
            };
            trace!(tx_id = tx.id, ?kind, arrive = ?at, "调度到达");
            out.push(ChannelEvent {
                kind,
                tx: Transmission {
                    frame,
                    ..tx.clone()
                },
                at,
                forced: false,
            });
        }
        out
    }
}

/// 帧概要，用于日志
pub(crate) fn frame_label(frame: &Frame) -> &'static str {
    match frame.kind() {
        FrameKind::Data => "data",
        FrameKind::Ack => "ack",
        FrameKind::DataAck => "data+ack",
        FrameKind::Nak => "nak",
    }
}
