//! 仿真核心模块
//!
//! 离散事件仿真的基础设施：虚拟时间、事件、世界与调度器。
//! 协议逻辑不在这里，本模块只保证事件按 (时间, 调度序号) 的因果顺序执行。

mod event;
mod simulator;
mod time;
mod world;

pub use event::Event;
pub use simulator::Simulator;
pub use time::SimTime;
pub use world::World;
