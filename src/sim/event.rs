//! 事件 trait
//!
//! 信道到达、定时器唤醒、网络层就绪都实现此接口，统一进入同一个事件队列。

use super::simulator::Simulator;
use super::world::World;

/// 事件：可被调度执行。使用 `self: Box<Self>` 以支持 move/所有权转移。
///
/// `Send` 约束让一个完整的仿真实例可以整体移交给另一个线程运行。
pub trait Event: Send + 'static {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World);
}
