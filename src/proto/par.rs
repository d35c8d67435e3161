//! 协议 3：肯定确认重传（PAR）
//!
//! 1 位序号交替。发送方为未确认帧启动重传定时器，超时后原样重发；
//! 接收方只接受期望序号的帧，并总是确认最后一个按序收到的帧。

use super::{state_of, DataLink};
use crate::error::ProtocolViolation;
use crate::link::{Endpoint, Frame, FrameKind, LinkCtx, Payload, SeqSpace, TimerSlot};
use crate::viz::{DiscardReason, VizWindow, WindowSide};
use tracing::debug;

#[derive(Debug)]
pub struct ParSender {
    seqs: SeqSpace,
    next_to_send: u32,
    outstanding: Option<Payload>,
}

impl ParSender {
    pub fn new(seqs: SeqSpace) -> Self {
        Self {
            seqs,
            next_to_send: 0,
            outstanding: None,
        }
    }

    fn snapshot(&self, ep: Endpoint) -> VizWindow {
        let outstanding = u32::from(self.outstanding.is_some());
        VizWindow {
            endpoint: ep,
            side: WindowSide::Sender,
            base: self.next_to_send,
            next_seq: self.seqs.add(self.next_to_send, outstanding),
            outstanding,
            size: 1,
            state: state_of(outstanding as usize),
        }
    }

    fn transmit(&self, p: Payload, retrans: bool, ctx: &mut dyn LinkCtx) {
        let seq = self.next_to_send;
        ctx.send_frame(Frame::data(seq, p), retrans);
        ctx.arm_timer(TimerSlot::Frame(seq));
    }
}

impl DataLink for ParSender {
    fn on_send_request(&mut self, ctx: &mut dyn LinkCtx) -> Result<(), ProtocolViolation> {
        if self.outstanding.is_some() {
            return Ok(());
        }
        let Some(p) = ctx.fetch_packet() else {
            return Ok(());
        };
        self.transmit(p.clone(), false, ctx);
        self.outstanding = Some(p);
        let ep = ctx.endpoint();
        ctx.window_changed(self.snapshot(ep));
        Ok(())
    }

    fn on_frame_arrival(&mut self, frame: Frame, ctx: &mut dyn LinkCtx) -> Result<(), ProtocolViolation> {
        if frame.is_corrupted() {
            ctx.discard(&frame, DiscardReason::Corrupted);
            return Ok(());
        }
        if frame.kind() != FrameKind::Ack {
            ctx.discard(&frame, DiscardReason::Unexpected);
            return Ok(());
        }
        if self.outstanding.is_none() || frame.ack_no() != self.next_to_send {
            // 重复或过期的确认
            ctx.discard(&frame, DiscardReason::Duplicate);
            return Ok(());
        }
        ctx.cancel_timer(TimerSlot::Frame(self.next_to_send));
        self.outstanding = None;
        self.next_to_send = self.seqs.inc(self.next_to_send);
        let ep = ctx.endpoint();
        ctx.window_changed(self.snapshot(ep));
        Ok(())
    }

    fn on_timer_expiry(&mut self, slot: TimerSlot, ctx: &mut dyn LinkCtx) -> Result<(), ProtocolViolation> {
        let TimerSlot::Frame(seq) = slot else {
            return Ok(());
        };
        let Some(p) = self.outstanding.clone() else {
            return Ok(());
        };
        if seq != self.next_to_send {
            return Err(ProtocolViolation::new(
                ctx.endpoint(),
                format!("timer for seq {seq} fired while seq {} is outstanding", self.next_to_send),
            ));
        }
        debug!(endpoint = %ctx.endpoint(), seq, "超时重传");
        self.transmit(p, true, ctx);
        Ok(())
    }

    fn ready_for_packet(&self) -> bool {
        self.outstanding.is_none()
    }

    fn window(&self, ep: Endpoint) -> Option<VizWindow> {
        Some(self.snapshot(ep))
    }
}

#[derive(Debug)]
pub struct ParReceiver {
    seqs: SeqSpace,
    frame_expected: u32,
}

impl ParReceiver {
    pub fn new(seqs: SeqSpace) -> Self {
        Self {
            seqs,
            frame_expected: 0,
        }
    }
}

impl DataLink for ParReceiver {
    fn on_frame_arrival(&mut self, frame: Frame, ctx: &mut dyn LinkCtx) -> Result<(), ProtocolViolation> {
        // 损坏帧与丢失等同：不确认，等待发送方超时
        if frame.is_corrupted() {
            ctx.discard(&frame, DiscardReason::Corrupted);
            return Ok(());
        }
        if !frame.kind().carries_data() {
            ctx.discard(&frame, DiscardReason::Unexpected);
            return Ok(());
        }
        if frame.seq() == self.frame_expected {
            ctx.deliver_packet(frame.payload().clone());
            self.frame_expected = self.seqs.inc(self.frame_expected);
        } else {
            ctx.discard(&frame, DiscardReason::Duplicate);
        }
        ctx.send_frame(Frame::ack(self.seqs.dec(self.frame_expected)), false);
        Ok(())
    }

    fn receive_window(&self, ep: Endpoint) -> Option<VizWindow> {
        Some(VizWindow {
            endpoint: ep,
            side: WindowSide::Receiver,
            base: self.frame_expected,
            next_seq: self.seqs.inc(self.frame_expected),
            outstanding: 0,
            size: 1,
            state: state_of(0),
        })
    }
}
