//! 协议状态机
//!
//! 六种协议共用一个能力接口 `DataLink`。协议集合是封闭的，
//! 所以站点用枚举 `Station` 表示，在创建实例时选定一次。

pub mod go_back_n;
pub mod kind;
pub mod one_bit;
pub mod par;
pub mod selective_repeat;
pub mod stop_and_wait;
pub mod utopia;

pub use go_back_n::GoBackN;
pub use kind::ProtocolKind;
pub use one_bit::OneBit;
pub use par::{ParReceiver, ParSender};
pub use selective_repeat::SelectiveRepeat;
pub use stop_and_wait::{StopAndWaitReceiver, StopAndWaitSender};
pub use utopia::{UtopiaReceiver, UtopiaSender};

use crate::config::SimConfig;
use crate::error::{ConfigError, ProtocolViolation};
use crate::link::{Endpoint, Frame, LinkCtx, TimerSlot};
use crate::viz::{SenderState, VizWindow};

/// 一端数据链路层的能力集合。
///
/// 站点只通过 `ctx` 产生副作用（发帧、arm/取消定时器、交付分组、写日志），
/// 自身只保存协议状态。返回 `Err` 表示实现逻辑缺陷，实例会被拆除。
pub trait DataLink {
    /// 网络层有分组待发（仅在 `ready_for_packet` 为真时调用）
    fn on_send_request(&mut self, _ctx: &mut dyn LinkCtx) -> Result<(), ProtocolViolation> {
        Ok(())
    }

    fn on_frame_arrival(&mut self, frame: Frame, ctx: &mut dyn LinkCtx) -> Result<(), ProtocolViolation>;

    fn on_timer_expiry(&mut self, _slot: TimerSlot, _ctx: &mut dyn LinkCtx) -> Result<(), ProtocolViolation> {
        Ok(())
    }

    /// 能否从网络层再取一个分组
    fn ready_for_packet(&self) -> bool {
        false
    }

    /// 发送窗口快照
    fn window(&self, _ep: Endpoint) -> Option<VizWindow> {
        None
    }

    /// 接收窗口快照
    fn receive_window(&self, _ep: Endpoint) -> Option<VizWindow> {
        None
    }

    fn sender_state(&self, ep: Endpoint) -> Option<SenderState> {
        self.window(ep).map(|w| w.state)
    }

    /// 每次分派后检查的内部不变式
    fn check(&self, _ep: Endpoint) -> Result<(), ProtocolViolation> {
        Ok(())
    }
}

pub(crate) fn state_of(outstanding: usize) -> SenderState {
    if outstanding == 0 {
        SenderState::Idle
    } else {
        SenderState::AwaitingAck
    }
}

/// 一个端点上运行的协议站
#[derive(Debug)]
pub enum Station {
    UtopiaSender(UtopiaSender),
    UtopiaReceiver(UtopiaReceiver),
    StopAndWaitSender(StopAndWaitSender),
    StopAndWaitReceiver(StopAndWaitReceiver),
    ParSender(ParSender),
    ParReceiver(ParReceiver),
    OneBit(OneBit),
    GoBackN(GoBackN),
    SelectiveRepeat(SelectiveRepeat),
}

macro_rules! each_station {
    ($station:expr, $s:ident => $body:expr) => {
        match $station {
            Station::UtopiaSender($s) => $body,
            Station::UtopiaReceiver($s) => $body,
            Station::StopAndWaitSender($s) => $body,
            Station::StopAndWaitReceiver($s) => $body,
            Station::ParSender($s) => $body,
            Station::ParReceiver($s) => $body,
            Station::OneBit($s) => $body,
            Station::GoBackN($s) => $body,
            Station::SelectiveRepeat($s) => $body,
        }
    };
}

impl Station {
    /// 为协议创建 [A, B] 两端的站点。单工协议中 A 为发送方、B 为接收方。
    pub fn pair(protocol: ProtocolKind, cfg: &SimConfig) -> Result<[Station; 2], ConfigError> {
        let seqs = protocol.seq_space(cfg.seq_bits)?;
        let window = protocol.effective_window(cfg.window_size, cfg.seq_bits)?;
        let pair = match protocol {
            ProtocolKind::Utopia => [
                Station::UtopiaSender(UtopiaSender),
                Station::UtopiaReceiver(UtopiaReceiver),
            ],
            ProtocolKind::StopAndWait => [
                Station::StopAndWaitSender(StopAndWaitSender::default()),
                Station::StopAndWaitReceiver(StopAndWaitReceiver),
            ],
            ProtocolKind::Par => [
                Station::ParSender(ParSender::new(seqs)),
                Station::ParReceiver(ParReceiver::new(seqs)),
            ],
            ProtocolKind::OneBitSlidingWindow => [
                Station::OneBit(OneBit::new(seqs)),
                Station::OneBit(OneBit::new(seqs)),
            ],
            ProtocolKind::GoBackN => [
                Station::GoBackN(GoBackN::new(seqs, window)),
                Station::GoBackN(GoBackN::new(seqs, window)),
            ],
            ProtocolKind::SelectiveRepeat => [
                Station::SelectiveRepeat(SelectiveRepeat::new(seqs, window, cfg.nak)),
                Station::SelectiveRepeat(SelectiveRepeat::new(seqs, window, cfg.nak)),
            ],
        };
        Ok(pair)
    }
}

impl DataLink for Station {
    fn on_send_request(&mut self, ctx: &mut dyn LinkCtx) -> Result<(), ProtocolViolation> {
        each_station!(self, s => s.on_send_request(ctx))
    }

    fn on_frame_arrival(&mut self, frame: Frame, ctx: &mut dyn LinkCtx) -> Result<(), ProtocolViolation> {
        each_station!(self, s => s.on_frame_arrival(frame, ctx))
    }

    fn on_timer_expiry(&mut self, slot: TimerSlot, ctx: &mut dyn LinkCtx) -> Result<(), ProtocolViolation> {
        each_station!(self, s => s.on_timer_expiry(slot, ctx))
    }

    fn ready_for_packet(&self) -> bool {
        each_station!(self, s => s.ready_for_packet())
    }

    fn window(&self, ep: Endpoint) -> Option<VizWindow> {
        each_station!(self, s => s.window(ep))
    }

    fn receive_window(&self, ep: Endpoint) -> Option<VizWindow> {
        each_station!(self, s => s.receive_window(ep))
    }

    fn sender_state(&self, ep: Endpoint) -> Option<SenderState> {
        each_station!(self, s => s.sender_state(ep))
    }

    fn check(&self, ep: Endpoint) -> Result<(), ProtocolViolation> {
        each_station!(self, s => s.check(ep))
    }
}
