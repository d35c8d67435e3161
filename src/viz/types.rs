use crate::link::{Endpoint, FrameKind, TimerSlot, Transmission};
use crate::sim::SimTime;
use serde::{Deserialize, Serialize};

/// 发送方状态：阻塞型协议在两者间切换；窗口型协议由未确认帧数推出。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SenderState {
    Idle,
    AwaitingAck,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowSide {
    Sender,
    Receiver,
}

/// 接收方拒收一帧的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscardReason {
    /// 校验失败
    Corrupted,
    /// 已经交付过的帧（重传或信道重复）
    Duplicate,
    /// 超前于期望序号（回退 N 帧接收方只收按序帧）
    OutOfOrder,
    /// 不在接收窗口内
    OutsideWindow,
    /// 当前状态下不该出现的帧（例如空闲时收到 ACK）
    Unexpected,
}

/// 帧的可视化字段
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VizFrame {
    pub tx_id: u64,
    pub from: Endpoint,
    pub to: Endpoint,
    pub frame_kind: FrameKind,
    pub seq: u32,
    pub ack: u32,
    pub len: usize,
    pub corrupted: bool,
    /// 是否为重传（超时/NAK/捎带触发的 resend）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retrans: Option<bool>,
}

impl VizFrame {
    pub fn of(tx: &Transmission) -> Self {
        Self {
            tx_id: tx.id,
            from: tx.from,
            to: tx.to(),
            frame_kind: tx.frame.kind(),
            seq: tx.frame.seq(),
            ack: tx.frame.ack_no(),
            len: tx.frame.payload().len(),
            corrupted: tx.frame.is_corrupted(),
            retrans: tx.retrans.then_some(true),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VizTimer {
    pub timer_id: u64,
    pub endpoint: Endpoint,
    #[serde(flatten)]
    pub slot: TimerSlot,
    pub deadline_ns: u64,
    /// arm 时被替换掉的旧定时器
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replaced: Option<u64>,
}

/// 窗口快照。`base`/`next_seq` 为模序号。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VizWindow {
    pub endpoint: Endpoint,
    pub side: WindowSide,
    pub base: u32,
    pub next_seq: u32,
    /// 发送方：未确认帧数；接收方：已缓存未交付帧数
    pub outstanding: u32,
    pub size: u32,
    pub state: SenderState,
}

/// 事件类型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LogKind {
    /// 站点把帧交给信道
    FrameSent(VizFrame),
    /// 帧完好到达对端
    FrameDelivered(VizFrame),
    /// 帧在信道中丢失
    FrameDropped {
        #[serde(flatten)]
        frame: VizFrame,
        forced: bool,
    },
    /// 帧带着损坏标记到达对端
    FrameCorrupted(VizFrame),
    /// 信道为该帧安排了第二个副本
    FrameDuplicated(VizFrame),
    /// 接收方拒收
    FrameDiscarded {
        #[serde(flatten)]
        frame: VizFrame,
        reason: DiscardReason,
    },
    TimerArmed(VizTimer),
    TimerFired(VizTimer),
    TimerCancelled(VizTimer),
    WindowChanged(VizWindow),
    /// 分组按序交给上层
    PacketDelivered {
        endpoint: Endpoint,
        bytes: usize,
        text: String,
    },
    /// 不变式被破坏，实例已拆除
    ProtocolError { endpoint: Endpoint, detail: String },
}

impl LogKind {
    /// 大写事件名（FRAME_SENT 等），方便界面显示与过滤
    pub fn name(&self) -> &'static str {
        match self {
            LogKind::FrameSent(_) => "FRAME_SENT",
            LogKind::FrameDelivered(_) => "FRAME_DELIVERED",
            LogKind::FrameDropped { .. } => "FRAME_DROPPED",
            LogKind::FrameCorrupted(_) => "FRAME_CORRUPTED",
            LogKind::FrameDuplicated(_) => "FRAME_DUPLICATED",
            LogKind::FrameDiscarded { .. } => "FRAME_DISCARDED",
            LogKind::TimerArmed(_) => "TIMER_ARMED",
            LogKind::TimerFired(_) => "TIMER_FIRED",
            LogKind::TimerCancelled(_) => "TIMER_CANCELLED",
            LogKind::WindowChanged(_) => "WINDOW_CHANGED",
            LogKind::PacketDelivered { .. } => "PACKET_DELIVERED",
            LogKind::ProtocolError { .. } => "PROTOCOL_ERROR",
        }
    }

    /// 与帧相关的事件返回帧字段
    pub fn frame(&self) -> Option<&VizFrame> {
        match self {
            LogKind::FrameSent(f)
            | LogKind::FrameDelivered(f)
            | LogKind::FrameCorrupted(f)
            | LogKind::FrameDuplicated(f) => Some(f),
            LogKind::FrameDropped { frame, .. } | LogKind::FrameDiscarded { frame, .. } => {
                Some(frame)
            }
            _ => None,
        }
    }
}

/// 一条可回放的事件（JSON）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// 仿真时间（纳秒，和 `SimTime.0` 同口径）
    pub t_ns: u64,
    pub instance_id: u64,
    #[serde(flatten)]
    pub kind: LogKind,
}

/// 有序、只追加的事件记录
#[derive(Debug, Default)]
pub struct EventLog {
    instance_id: u64,
    entries: Vec<LogEntry>,
}

impl EventLog {
    pub fn new(instance_id: u64) -> Self {
        Self {
            instance_id,
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, at: SimTime, kind: LogKind) {
        self.entries.push(LogEntry {
            t_ns: at.0,
            instance_id: self.instance_id,
            kind,
        });
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// 从下标 `from` 开始的新条目（界面增量拉取）
    pub fn since(&self, from: usize) -> &[LogEntry] {
        self.entries.get(from..).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
