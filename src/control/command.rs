use crate::link::{Endpoint, FrameFilter};
use crate::sim::SimTime;
use serde::{Deserialize, Serialize};

/// 可视化/控制端发来的命令
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", content = "args", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    SelectProtocol(u8),
    Start,
    Pause,
    Step,
    Stop,
    Reset,
    SetFaultRates { loss: f64, corrupt: f64, duplicate: f64 },
    SetWindowSize(u32),
    /// 丢弃下一个匹配的帧（一次性）
    ForceDropNext(FrameFilter),
}

/// `run_until` 的停止条件
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopCondition {
    /// 两端上层合计收到 n 个分组
    Delivered(u64),
    /// 某一端上层收到 n 个分组
    DeliveredAt(Endpoint, u64),
    AllDelivered,
    Until(SimTime),
    /// 事件队列为空
    Idle,
    /// 再执行 n 个事件
    Events(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Reached,
    /// 条件未满足但已无事件可执行
    Idle,
    BudgetExhausted,
    /// 协议错误，实例已拆除
    Halted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// 尚无实例
    Idle,
    Running,
    Paused,
    Stopped,
    Halted,
}
