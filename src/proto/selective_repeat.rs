//! 协议 6：选择重传
//!
//! 接收方在大小为 W 的接收窗口内缓存乱序到达的帧，空缺补齐后按序交付。
//! 每个未确认帧一个重传定时器，超时只重发该帧。可选 NAK：检测到空缺或
//! 损坏帧时请求重发下一个期望帧，每个空缺至多一个未决 NAK。

use super::{state_of, DataLink};
use crate::error::ProtocolViolation;
use crate::link::{Endpoint, Frame, FrameKind, LinkCtx, Payload, SeqSpace, TimerSlot};
use crate::viz::{DiscardReason, VizWindow, WindowSide};
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug)]
pub struct SelectiveRepeat {
    seqs: SeqSpace,
    window: u32,
    nak_enabled: bool,

    ack_expected: u32,
    next_to_send: u32,
    out_buf: BTreeMap<u32, Payload>,

    frame_expected: u32,
    too_far: u32,
    in_buf: BTreeMap<u32, Payload>,
    /// 当前空缺还没有发过 NAK
    no_nak: bool,
}

impl SelectiveRepeat {
    pub fn new(seqs: SeqSpace, window: u32, nak_enabled: bool) -> Self {
        Self {
            seqs,
            window,
            nak_enabled,
            ack_expected: 0,
            next_to_send: 0,
            out_buf: BTreeMap::new(),
            frame_expected: 0,
            too_far: seqs.wrap(window),
            in_buf: BTreeMap::new(),
            no_nak: true,
        }
    }

    fn snapshot(&self, ep: Endpoint) -> VizWindow {
        VizWindow {
            endpoint: ep,
            side: WindowSide::Sender,
            base: self.ack_expected,
            next_seq: self.next_to_send,
            outstanding: self.out_buf.len() as u32,
            size: self.window,
            state: state_of(self.out_buf.len()),
        }
    }

    fn receiver_snapshot(&self, ep: Endpoint) -> VizWindow {
        VizWindow {
            endpoint: ep,
            side: WindowSide::Receiver,
            base: self.frame_expected,
            next_seq: self.too_far,
            outstanding: self.in_buf.len() as u32,
            size: self.window,
            state: state_of(0),
        }
    }

    fn last_received(&self) -> u32 {
        self.seqs.dec(self.frame_expected)
    }

    fn send_data(&self, seq: u32, p: Payload, retrans: bool, ctx: &mut dyn LinkCtx) {
        ctx.send_frame(Frame::data_ack(seq, self.last_received(), p), retrans);
        ctx.arm_timer(TimerSlot::Frame(seq));
        ctx.cancel_timer(TimerSlot::Ack);
    }

    fn send_nak(&mut self, ctx: &mut dyn LinkCtx) {
        debug!(endpoint = %ctx.endpoint(), expected = self.frame_expected, "发送 NAK");
        self.no_nak = false;
        ctx.cancel_timer(TimerSlot::Ack);
        ctx.send_frame(Frame::nak(self.last_received()), false);
    }

    fn send_ack(&self, ctx: &mut dyn LinkCtx) {
        ctx.send_frame(Frame::ack(self.last_received()), false);
    }

    fn ensure_ack_timer(ctx: &mut dyn LinkCtx) {
        if !ctx.timer_active(TimerSlot::Ack) {
            ctx.arm_timer(TimerSlot::Ack);
        }
    }

    fn receive_data(&mut self, frame: &Frame, ctx: &mut dyn LinkCtx) {
        let seq = frame.seq();
        if seq != self.frame_expected && self.nak_enabled && self.no_nak {
            self.send_nak(ctx);
        } else {
            Self::ensure_ack_timer(ctx);
        }

        let in_window = self.seqs.between(self.frame_expected, seq, self.too_far);
        if !in_window || self.in_buf.contains_key(&seq) {
            let reason = if in_window {
                DiscardReason::Duplicate
            } else {
                DiscardReason::OutsideWindow
            };
            ctx.discard(frame, reason);
            return;
        }

        self.in_buf.insert(seq, frame.payload().clone());
        let mut delivered = false;
        while let Some(p) = self.in_buf.remove(&self.frame_expected) {
            ctx.deliver_packet(p);
            self.no_nak = true;
            self.frame_expected = self.seqs.inc(self.frame_expected);
            self.too_far = self.seqs.inc(self.too_far);
            delivered = true;
        }
        if delivered {
            Self::ensure_ack_timer(ctx);
        }
        let ep = ctx.endpoint();
        ctx.window_changed(self.receiver_snapshot(ep));
    }

    fn absorb_ack(&mut self, ack: u32, ctx: &mut dyn LinkCtx) {
        let mut advanced = false;
        while self.seqs.between(self.ack_expected, ack, self.next_to_send) {
            self.out_buf.remove(&self.ack_expected);
            ctx.cancel_timer(TimerSlot::Frame(self.ack_expected));
            self.ack_expected = self.seqs.inc(self.ack_expected);
            advanced = true;
        }
        if advanced {
            let ep = ctx.endpoint();
            ctx.window_changed(self.snapshot(ep));
        }
    }

    fn resend(&self, seq: u32, ctx: &mut dyn LinkCtx) {
        if let Some(p) = self.out_buf.get(&seq) {
            self.send_data(seq, p.clone(), true, ctx);
        }
    }
}

impl DataLink for SelectiveRepeat {
    fn on_send_request(&mut self, ctx: &mut dyn LinkCtx) -> Result<(), ProtocolViolation> {
        if !self.ready_for_packet() {
            return Ok(());
        }
        let Some(p) = ctx.fetch_packet() else {
            return Ok(());
        };
        let seq = self.next_to_send;
        self.out_buf.insert(seq, p.clone());
        self.next_to_send = self.seqs.inc(seq);
        self.send_data(seq, p, false, ctx);
        let ep = ctx.endpoint();
        ctx.window_changed(self.snapshot(ep));
        Ok(())
    }

    fn on_frame_arrival(&mut self, frame: Frame, ctx: &mut dyn LinkCtx) -> Result<(), ProtocolViolation> {
        if frame.is_corrupted() {
            ctx.discard(&frame, DiscardReason::Corrupted);
            if self.nak_enabled && self.no_nak {
                self.send_nak(ctx);
            }
            return Ok(());
        }

        if frame.kind().carries_data() {
            self.receive_data(&frame, ctx);
        }

        if frame.kind() == FrameKind::Nak {
            let wanted = self.seqs.inc(frame.ack_no());
            if self.seqs.between(self.ack_expected, wanted, self.next_to_send) {
                debug!(endpoint = %ctx.endpoint(), seq = wanted, "收到 NAK，重发");
                self.resend(wanted, ctx);
            }
        }

        if frame.kind().carries_ack() {
            self.absorb_ack(frame.ack_no(), ctx);
        }
        Ok(())
    }

    fn on_timer_expiry(&mut self, slot: TimerSlot, ctx: &mut dyn LinkCtx) -> Result<(), ProtocolViolation> {
        match slot {
            TimerSlot::Ack => self.send_ack(ctx),
            TimerSlot::Frame(seq) => self.resend(seq, ctx),
        }
        Ok(())
    }

    fn ready_for_packet(&self) -> bool {
        (self.out_buf.len() as u32) < self.window
    }

    fn window(&self, ep: Endpoint) -> Option<VizWindow> {
        Some(self.snapshot(ep))
    }

    fn receive_window(&self, ep: Endpoint) -> Option<VizWindow> {
        Some(self.receiver_snapshot(ep))
    }

    fn check(&self, ep: Endpoint) -> Result<(), ProtocolViolation> {
        let w = self.window as usize;
        if self.out_buf.len() > w {
            return Err(ProtocolViolation::new(
                ep,
                format!("{} outstanding frames exceed window {w}", self.out_buf.len()),
            ));
        }
        if self.in_buf.len() > w {
            return Err(ProtocolViolation::new(
                ep,
                format!("receive buffer holds {} frames, window is {w}", self.in_buf.len()),
            ));
        }
        Ok(())
    }
}
