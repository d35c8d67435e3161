//! 协议 1：无限制单工
//!
//! 信道理想、接收方处理能力无限：发送方拿到分组就发，不编号、不确认、不重传。

use super::DataLink;
use crate::error::ProtocolViolation;
use crate::link::{Frame, LinkCtx};
use crate::viz::DiscardReason;

#[derive(Debug, Default)]
pub struct UtopiaSender;

impl DataLink for UtopiaSender {
    fn on_send_request(&mut self, ctx: &mut dyn LinkCtx) -> Result<(), ProtocolViolation> {
        if let Some(p) = ctx.fetch_packet() {
            ctx.send_frame(Frame::data(0, p), false);
        }
        Ok(())
    }

    fn on_frame_arrival(&mut self, frame: Frame, ctx: &mut dyn LinkCtx) -> Result<(), ProtocolViolation> {
        // 接收方从不回送
        ctx.discard(&frame, DiscardReason::Unexpected);
        Ok(())
    }

    fn ready_for_packet(&self) -> bool {
        true
    }
}

#[derive(Debug, Default)]
pub struct UtopiaReceiver;

impl DataLink for UtopiaReceiver {
    fn on_frame_arrival(&mut self, frame: Frame, ctx: &mut dyn LinkCtx) -> Result<(), ProtocolViolation> {
        if frame.is_corrupted() {
            ctx.discard(&frame, DiscardReason::Corrupted);
            return Ok(());
        }
        ctx.deliver_packet(frame.payload().clone());
        Ok(())
    }
}
