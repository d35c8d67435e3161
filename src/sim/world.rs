//! 世界 trait
//!
//! 仿真世界持有全部可变状态（站点、信道、定时器、日志），由事件通过它读写。

use super::simulator::Simulator;
use std::any::Any;

/// 仿真世界：由业务层实现（这里是数据链路层的双端点世界）。
pub trait World: Any {
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// 每个事件执行完毕后调用一次，用于派生出"同一时刻"的后续事件。
    fn on_tick(&mut self, _sim: &mut Simulator) {}
}
