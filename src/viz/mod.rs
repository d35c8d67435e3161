//! 可观测事件流（供外部可视化器消费）
//!
//! 设计目标：
//! - **结构化**：JSON 事件而不是解析文本日志
//! - **有序、只追加**：按发生顺序记录每一次状态迁移
//! - **可回放**：相同配置 + 种子得到逐字节相同的事件流
//!
//! 可视化器只通过这里与仿真核心耦合，从不直接读取内部状态。

mod types;

pub use types::{
    DiscardReason, EventLog, LogEntry, LogKind, SenderState, VizFrame, VizTimer, VizWindow,
    WindowSide,
};
