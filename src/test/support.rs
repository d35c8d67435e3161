//! 测试公用工具

use crate::config::{SimConfig, TrafficConfig};
use crate::control::{Command, RunOutcome, Session, StopCondition};
use crate::link::{Endpoint, Frame, LinkCtx, Payload, TimerSlot};
use crate::proto::ProtocolKind;
use crate::sim::SimTime;
use crate::viz::{DiscardReason, LogEntry, LogKind, VizFrame, VizWindow};
use std::collections::VecDeque;

pub fn config(protocol: ProtocolKind, a: &str, b: &str) -> SimConfig {
    SimConfig {
        protocol,
        traffic: TrafficConfig {
            a: a.to_string(),
            b: b.to_string(),
            chunk_bytes: 4,
        },
        ..SimConfig::default()
    }
}

/// 所有传播时延固定为 `ms`，让场景测试的时间线可以手算
pub fn fixed_delay(mut cfg: SimConfig, ms: u64) -> SimConfig {
    cfg.min_delay_ms = ms;
    cfg.max_delay_ms = ms;
    cfg
}

pub fn run_to_idle(cfg: SimConfig, setup: &[Command]) -> Session {
    let mut session = Session::new(cfg).expect("valid config");
    for cmd in setup {
        session.apply(cmd.clone()).expect("command accepted");
    }
    session.apply(Command::Start).expect("start");
    let outcome = session.run_until(StopCondition::Idle).expect("run");
    assert_eq!(outcome, RunOutcome::Reached);
    session
}

pub fn texts(packets: &[Payload]) -> Vec<String> {
    packets.iter().map(Payload::to_text).collect()
}

pub fn chunks(text: &str, n: usize) -> Vec<String> {
    text.as_bytes()
        .chunks(n)
        .map(|c| String::from_utf8_lossy(c).into_owned())
        .collect()
}

pub fn names(log: &[LogEntry]) -> Vec<&'static str> {
    log.iter().map(|e| e.kind.name()).collect()
}

pub fn count(log: &[LogEntry], name: &str) -> usize {
    log.iter().filter(|e| e.kind.name() == name).count()
}

/// 某端发出的帧（按发送顺序）
pub fn sent_by(log: &[LogEntry], ep: Endpoint) -> Vec<&VizFrame> {
    log.iter()
        .filter_map(|e| match &e.kind {
            LogKind::FrameSent(f) if f.from == ep => Some(f),
            _ => None,
        })
        .collect()
}

pub fn retransmitted_seqs(log: &[LogEntry], ep: Endpoint) -> Vec<u32> {
    sent_by(log, ep)
        .into_iter()
        .filter(|f| f.retrans == Some(true))
        .map(|f| f.seq)
        .collect()
}

pub fn discards(log: &[LogEntry], at: Endpoint) -> Vec<(u32, DiscardReason)> {
    log.iter()
        .filter_map(|e| match &e.kind {
            LogKind::FrameDiscarded { frame, reason } if frame.to == at => Some((frame.seq, *reason)),
            _ => None,
        })
        .collect()
}

pub fn windows(log: &[LogEntry]) -> Vec<VizWindow> {
    log.iter()
        .filter_map(|e| match &e.kind {
            LogKind::WindowChanged(w) => Some(*w),
            _ => None,
        })
        .collect()
}

/// 直接驱动单个站点的 `LinkCtx`，记录它产生的全部副作用
#[derive(Default)]
pub struct RecordingCtx {
    pub now: SimTime,
    pub endpoint: Option<Endpoint>,
    pub source: VecDeque<Payload>,
    pub delivered: Vec<Payload>,
    pub sent: Vec<(Frame, bool)>,
    pub armed: Vec<TimerSlot>,
    pub cancelled: Vec<TimerSlot>,
    pub active: Vec<TimerSlot>,
    pub discarded: Vec<(u32, DiscardReason)>,
    pub windows: Vec<VizWindow>,
}

impl RecordingCtx {
    pub fn with_packets(packets: &[&str]) -> Self {
        Self {
            source: packets.iter().map(|p| Payload::from(*p)).collect(),
            ..Self::default()
        }
    }

    pub fn take_sent(&mut self) -> Vec<(Frame, bool)> {
        std::mem::take(&mut self.sent)
    }
}

impl LinkCtx for RecordingCtx {
    fn now(&self) -> SimTime {
        self.now
    }

    fn endpoint(&self) -> Endpoint {
        self.endpoint.unwrap_or(Endpoint::A)
    }

    fn fetch_packet(&mut self) -> Option<Payload> {
        self.source.pop_front()
    }

    fn deliver_packet(&mut self, payload: Payload) {
        self.delivered.push(payload);
    }

    fn send_frame(&mut self, frame: Frame, retrans: bool) {
        self.sent.push((frame, retrans));
    }

    fn arm_timer(&mut self, slot: TimerSlot) {
        self.armed.push(slot);
        if !self.active.contains(&slot) {
            self.active.push(slot);
        }
    }

    fn cancel_timer(&mut self, slot: TimerSlot) {
        if let Some(i) = self.active.iter().position(|s| *s == slot) {
            self.active.remove(i);
            self.cancelled.push(slot);
        }
    }

    fn timer_active(&self, slot: TimerSlot) -> bool {
        self.active.contains(&slot)
    }

    fn discard(&mut self, frame: &Frame, reason: DiscardReason) {
        self.discarded.push((frame.seq(), reason));
    }

    fn window_changed(&mut self, window: VizWindow) {
        self.windows.push(window);
    }
}
