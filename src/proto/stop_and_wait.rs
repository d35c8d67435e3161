//! 协议 2：单工停等
//!
//! 信道无差错但接收方处理能力有限：发送方每发一帧就阻塞，
//! 直到收到接收方的哑确认。没有定时器。

use super::{state_of, DataLink};
use crate::error::ProtocolViolation;
use crate::link::{Endpoint, Frame, FrameKind, LinkCtx};
use crate::viz::{DiscardReason, SenderState, VizWindow, WindowSide};
use tracing::debug;

#[derive(Debug, Default)]
pub struct StopAndWaitSender {
    awaiting_ack: bool,
}

impl StopAndWaitSender {
    fn snapshot(&self, ep: Endpoint) -> VizWindow {
        let outstanding = u32::from(self.awaiting_ack);
        VizWindow {
            endpoint: ep,
            side: WindowSide::Sender,
            base: 0,
            next_seq: 0,
            outstanding,
            size: 1,
            state: state_of(outstanding as usize),
        }
    }
}

impl DataLink for StopAndWaitSender {
    fn on_send_request(&mut self, ctx: &mut dyn LinkCtx) -> Result<(), ProtocolViolation> {
        if self.awaiting_ack {
            return Ok(());
        }
        let Some(p) = ctx.fetch_packet() else {
            return Ok(());
        };
        ctx.send_frame(Frame::data(0, p), false);
        self.awaiting_ack = true;
        let ep = ctx.endpoint();
        ctx.window_changed(self.snapshot(ep));
        Ok(())
    }

    fn on_frame_arrival(&mut self, frame: Frame, ctx: &mut dyn LinkCtx) -> Result<(), ProtocolViolation> {
        if frame.is_corrupted() {
            ctx.discard(&frame, DiscardReason::Corrupted);
            return Ok(());
        }
        if frame.kind() != FrameKind::Ack || !self.awaiting_ack {
            ctx.discard(&frame, DiscardReason::Unexpected);
            return Ok(());
        }
        let ep = ctx.endpoint();
        debug!(endpoint = %ep, "收到确认，解除阻塞");
        self.awaiting_ack = false;
        ctx.window_changed(self.snapshot(ep));
        Ok(())
    }

    fn ready_for_packet(&self) -> bool {
        !self.awaiting_ack
    }

    fn window(&self, ep: Endpoint) -> Option<VizWindow> {
        Some(self.snapshot(ep))
    }

    fn sender_state(&self, _ep: Endpoint) -> Option<SenderState> {
        Some(state_of(usize::from(self.awaiting_ack)))
    }
}

#[derive(Debug, Default)]
pub struct StopAndWaitReceiver;

impl DataLink for StopAndWaitReceiver {
    fn on_frame_arrival(&mut self, frame: Frame, ctx: &mut dyn LinkCtx) -> Result<(), ProtocolViolation> {
        if frame.is_corrupted() {
            ctx.discard(&frame, DiscardReason::Corrupted);
            return Ok(());
        }
        if !frame.kind().carries_data() {
            ctx.discard(&frame, DiscardReason::Unexpected);
            return Ok(());
        }
        ctx.deliver_packet(frame.payload().clone());
        ctx.send_frame(Frame::ack(0), false);
        Ok(())
    }
}
