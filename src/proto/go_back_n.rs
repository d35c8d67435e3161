//! 协议 5：回退 N 帧
//!
//! k 位序号，发送窗口 W <= 2^(k-1)，累计确认捎带在反向数据帧上。
//! 接收方只接受按序帧：乱序帧被丢弃，并立即重发对最后一个按序帧的确认。
//! 任一帧的重传定时器到期时，发送方从窗口底部开始重发全部未确认帧。

use super::{state_of, DataLink};
use crate::error::ProtocolViolation;
use crate::link::{Endpoint, Frame, LinkCtx, Payload, SeqSpace, TimerSlot};
use crate::viz::{DiscardReason, VizWindow, WindowSide};
use std::collections::VecDeque;
use tracing::debug;

#[derive(Debug)]
pub struct GoBackN {
    seqs: SeqSpace,
    window: u32,
    /// 最早的未确认帧（窗口底部）
    ack_expected: u32,
    next_to_send: u32,
    frame_expected: u32,
    /// 未确认帧的分组，按序号从 `ack_expected` 开始
    buffer: VecDeque<Payload>,
}

impl GoBackN {
    pub fn new(seqs: SeqSpace, window: u32) -> Self {
        Self {
            seqs,
            window,
            ack_expected: 0,
            next_to_send: 0,
            frame_expected: 0,
            buffer: VecDeque::new(),
        }
    }

    fn snapshot(&self, ep: Endpoint) -> VizWindow {
        VizWindow {
            endpoint: ep,
            side: WindowSide::Sender,
            base: self.ack_expected,
            next_seq: self.next_to_send,
            outstanding: self.buffer.len() as u32,
            size: self.window,
            state: state_of(self.buffer.len()),
        }
    }

    fn send_data(&self, seq: u32, p: Payload, retrans: bool, ctx: &mut dyn LinkCtx) {
        let ack = self.seqs.dec(self.frame_expected);
        ctx.send_frame(Frame::data_ack(seq, ack, p), retrans);
        ctx.arm_timer(TimerSlot::Frame(seq));
        // 确认已捎带，不再需要独立 ACK
        ctx.cancel_timer(TimerSlot::Ack);
    }

    fn send_ack(&self, ctx: &mut dyn LinkCtx) {
        ctx.cancel_timer(TimerSlot::Ack);
        ctx.send_frame(Frame::ack(self.seqs.dec(self.frame_expected)), false);
    }

    fn receive_data(&mut self, frame: &Frame, ctx: &mut dyn LinkCtx) {
        if frame.seq() == self.frame_expected {
            ctx.deliver_packet(frame.payload().clone());
            self.frame_expected = self.seqs.inc(self.frame_expected);
            if !ctx.timer_active(TimerSlot::Ack) {
                ctx.arm_timer(TimerSlot::Ack);
            }
            return;
        }
        let horizon = self.seqs.add(self.frame_expected, self.window);
        let reason = if self.seqs.between(self.frame_expected, frame.seq(), horizon) {
            DiscardReason::OutOfOrder
        } else {
            DiscardReason::Duplicate
        };
        ctx.discard(frame, reason);
        debug!(endpoint = %ctx.endpoint(), seq = frame.seq(), expected = self.frame_expected, "乱序帧，重发累计确认");
        self.send_ack(ctx);
    }

    /// 累计确认：`ack` 及之前的全部帧都已收到
    fn absorb_ack(&mut self, ack: u32, ctx: &mut dyn LinkCtx) {
        let mut advanced = false;
        while !self.buffer.is_empty() && self.seqs.between(self.ack_expected, ack, self.next_to_send) {
            self.buffer.pop_front();
            ctx.cancel_timer(TimerSlot::Frame(self.ack_expected));
            self.ack_expected = self.seqs.inc(self.ack_expected);
            advanced = true;
        }
        if advanced {
            let ep = ctx.endpoint();
            ctx.window_changed(self.snapshot(ep));
        }
    }

    fn outstanding(&self) -> Vec<(u32, Payload)> {
        let mut seq = self.ack_expected;
        self.buffer
            .iter()
            .map(|p| {
                let item = (seq, p.clone());
                seq = self.seqs.inc(seq);
                item
            })
            .collect()
    }
}

impl DataLink for GoBackN {
    fn on_send_request(&mut self, ctx: &mut dyn LinkCtx) -> Result<(), ProtocolViolation> {
        if !self.ready_for_packet() {
            return Ok(());
        }
        let Some(p) = ctx.fetch_packet() else {
            return Ok(());
        };
        let seq = self.next_to_send;
        self.buffer.push_back(p.clone());
        self.next_to_send = self.seqs.inc(seq);
        self.send_data(seq, p, false, ctx);
        let ep = ctx.endpoint();
        ctx.window_changed(self.snapshot(ep));
        Ok(())
    }

    fn on_frame_arrival(&mut self, frame: Frame, ctx: &mut dyn LinkCtx) -> Result<(), ProtocolViolation> {
        if frame.is_corrupted() {
            ctx.discard(&frame, DiscardReason::Corrupted);
            return Ok(());
        }
        if frame.kind().carries_data() {
            self.receive_data(&frame, ctx);
        }
        if frame.kind().carries_ack() {
            self.absorb_ack(frame.ack_no(), ctx);
        }
        Ok(())
    }

    fn on_timer_expiry(&mut self, slot: TimerSlot, ctx: &mut dyn LinkCtx) -> Result<(), ProtocolViolation> {
        match slot {
            TimerSlot::Ack => self.send_ack(ctx),
            TimerSlot::Frame(seq) => {
                let outstanding = self.outstanding();
                debug!(endpoint = %ctx.endpoint(), seq, count = outstanding.len(), "超时，回退重发窗口内全部帧");
                for (seq, p) in outstanding {
                    self.send_data(seq, p, true, ctx);
                }
            }
        }
        Ok(())
    }

    fn ready_for_packet(&self) -> bool {
        (self.buffer.len() as u32) < self.window
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

    fn check(&self, ep: Endpoint) -> Result<(), ProtocolViolation> {
        let outstanding = self.buffer.len() as u32;
        if outstanding > self.window {
            return Err(ProtocolViolation::new(
                ep,
                format!("{outstanding} outstanding frames exceed window {}", self.window),
            ));
        }
        let span = self.seqs.distance(self.ack_expected, self.next_to_send);
        if span != outstanding {
            return Err(ProtocolViolation::new(
                ep,
                format!("window [{}, {}) spans {span} but buffers {outstanding}", self.ack_expected, self.next_to_send),
            ));
        }
        Ok(())
    }
}
