//! 数据链路层基础设施
//!
//! 帧、序号空间、不可靠信道、定时器表，以及把它们连接到调度器上的世界与事件。

pub mod channel;
pub mod ctx;
pub mod deliver_frame;
pub mod endpoint;
pub mod frame;
pub mod network_ready;
pub mod seq;
pub mod stats;
pub mod timer;
pub mod timer_wake;
pub mod world;

pub use channel::{
    Channel, ChannelConfig, ChannelEvent, ChannelEventKind, FaultRates, FrameFilter, Transmission,
};
pub use ctx::LinkCtx;
pub use deliver_frame::DeliverFrame;
pub use endpoint::Endpoint;
pub use frame::{Frame, FrameKind, Payload};
pub use network_ready::NetworkReady;
pub use seq::SeqSpace;
pub use stats::Stats;
pub use timer::{Armed, Timer, TimerId, TimerOwner, TimerSlot, TimerTable};
pub use timer_wake::TimerWake;
pub use world::{ArqWorld, UpperLayer};
