//! 协议 4：1 位滑动窗口
//!
//! 两端对称，都既发送又接收。确认捎带在反向数据帧上：
//! 每收到一个新数据帧都回送一帧（有未确认数据则重发它，否则发独立 ACK）。
//! 重复的数据帧只回独立 ACK，独立 ACK 本身不触发回送，
//! 因此信道重复不会让帧数成倍增长。

use super::{state_of, DataLink};
use crate::error::ProtocolViolation;
use crate::link::{Endpoint, Frame, LinkCtx, Payload, SeqSpace, TimerSlot};
use crate::viz::{DiscardReason, VizWindow, WindowSide};
use tracing::debug;

#[derive(Debug)]
pub struct OneBit {
    seqs: SeqSpace,
    next_to_send: u32,
    frame_expected: u32,
    outstanding: Option<Payload>,
}

impl OneBit {
    pub fn new(seqs: SeqSpace) -> Self {
        Self {
            seqs,
            next_to_send: 0,
            frame_expected: 0,
            outstanding: None,
        }
    }

    fn last_received(&self) -> u32 {
        self.seqs.dec(self.frame_expected)
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
        ctx.send_frame(Frame::data_ack(seq, self.last_received(), p), retrans);
        ctx.arm_timer(TimerSlot::Frame(seq));
    }

    /// 从网络层取下一个分组并发出；返回是否发出了帧
    fn send_next(&mut self, ctx: &mut dyn LinkCtx) -> bool {
        if self.outstanding.is_some() {
            return false;
        }
        let Some(p) = ctx.fetch_packet() else {
            return false;
        };
        self.transmit(p.clone(), false, ctx);
        self.outstanding = Some(p);
        let ep = ctx.endpoint();
        ctx.window_changed(self.snapshot(ep));
        true
    }
}

impl DataLink for OneBit {
    fn on_send_request(&mut self, ctx: &mut dyn LinkCtx) -> Result<(), ProtocolViolation> {
        self.send_next(ctx);
        Ok(())
    }

    fn on_frame_arrival(&mut self, frame: Frame, ctx: &mut dyn LinkCtx) -> Result<(), ProtocolViolation> {
        if frame.is_corrupted() {
            ctx.discard(&frame, DiscardReason::Corrupted);
            return Ok(());
        }

        let has_data = frame.kind().carries_data();
        let mut fresh = false;
        if has_data {
            if frame.seq() == self.frame_expected {
                ctx.deliver_packet(frame.payload().clone());
                self.frame_expected = self.seqs.inc(self.frame_expected);
                fresh = true;
            } else {
                ctx.discard(&frame, DiscardReason::Duplicate);
            }
        }

        let mut sent = false;
        if frame.kind().carries_ack()
            && self.outstanding.is_some()
            && frame.ack_no() == self.next_to_send
        {
            debug!(endpoint = %ctx.endpoint(), ack = frame.ack_no(), "捎带确认到达");
            ctx.cancel_timer(TimerSlot::Frame(self.next_to_send));
            self.outstanding = None;
            self.next_to_send = self.seqs.inc(self.next_to_send);
            let ep = ctx.endpoint();
            ctx.window_changed(self.snapshot(ep));
            sent = self.send_next(ctx);
        }

        if has_data && !sent {
            match self.outstanding.clone() {
                Some(p) if fresh => self.transmit(p, true, ctx),
                _ => ctx.send_frame(Frame::ack(self.last_received()), false),
            }
        }
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
        self.transmit(p, true, ctx);
        Ok(())
    }

    fn ready_for_packet(&self) -> bool {
        self.outstanding.is_none()
    }

    fn window(&self, ep: Endpoint) -> Option<VizWindow> {
        Some(self.snapshot(ep))
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
