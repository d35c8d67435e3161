//! Link-facing API used by protocol stations.
//!
//! A station never touches the channel, the timer table or the event log
//! directly; every side effect of a dispatch goes through `LinkCtx`.

use super::channel::{frame_label, ChannelEventKind, Transmission};
use super::deliver_frame::DeliverFrame;
use super::endpoint::Endpoint;
use super::frame::{Frame, Payload};
use super::timer::{TimerOwner, TimerSlot};
use super::timer_wake::TimerWake;
use super::world::LinkState;
use crate::sim::{SimTime, Simulator};
use crate::viz::{DiscardReason, LogKind, VizFrame, VizTimer, VizWindow};
use tracing::{debug, trace, warn};

/// Sender/receiver side effects available to a station while it handles one event.
pub trait LinkCtx {
    fn now(&self) -> SimTime;
    /// Endpoint the station runs on.
    fn endpoint(&self) -> Endpoint;

    /// Take the next packet from the upper layer (from_network_layer).
    fn fetch_packet(&mut self) -> Option<Payload>;
    /// Hand a packet to the upper layer, in order (to_network_layer).
    fn deliver_packet(&mut self, payload: Payload);

    /// Put a frame on the channel; `retrans` marks a resend.
    fn send_frame(&mut self, frame: Frame, retrans: bool);

    /// Arm (or cancel-and-replace) the timer for `slot`.
    fn arm_timer(&mut self, slot: TimerSlot);
    fn cancel_timer(&mut self, slot: TimerSlot);
    fn timer_active(&self, slot: TimerSlot) -> bool;

    fn discard(&mut self, frame: &Frame, reason: DiscardReason);
    fn window_changed(&mut self, window: VizWindow);
}

/// `LinkCtx` for one dispatch: the station's endpoint plus the shared link state.
pub(crate) struct Dispatch<'a> {
    pub(crate) endpoint: Endpoint,
    pub(crate) sim: &'a mut Simulator,
    pub(crate) link: &'a mut LinkState,
    /// 正在处理的到达帧；拒收条目沿用它的 tx_id
    pub(crate) arriving: Option<VizFrame>,
}

impl Dispatch<'_> {
    fn owner(&self, slot: TimerSlot) -> TimerOwner {
        TimerOwner::new(self.endpoint, slot)
    }
}

impl LinkCtx for Dispatch<'_> {
    fn now(&self) -> SimTime {
        self.sim.now()
    }

    fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    fn fetch_packet(&mut self) -> Option<Payload> {
        self.link.upper[self.endpoint.index()].source.pop_front()
    }

    fn deliver_packet(&mut self, payload: Payload) {
        let now = self.sim.now();
        debug!(endpoint = %self.endpoint, bytes = payload.len(), "📥 分组交付上层");
        self.link.stats.packets_delivered += 1;
        self.link.stats.bytes_delivered += payload.len() as u64;
        self.link.log.push(
            now,
            LogKind::PacketDelivered {
                endpoint: self.endpoint,
                bytes: payload.len(),
                text: payload.to_text(),
            },
        );
        self.link.upper[self.endpoint.index()].sink.push(payload);
    }

    #[tracing::instrument(skip(self, frame), fields(endpoint = %self.endpoint, seq = frame.seq(), ack = frame.ack_no(), frame = frame_label(&frame)))]
    fn send_frame(&mut self, frame: Frame, retrans: bool) {
        let now = self.sim.now();
        let tx = Transmission {
            id: self.link.next_tx_id,
            from: self.endpoint,
            frame,
            retrans,
        };
        self.link.next_tx_id = self.link.next_tx_id.wrapping_add(1);

        self.link.stats.frames_sent += 1;
        if retrans {
            self.link.stats.retransmissions += 1;
        }
        if tx.frame.kind() == crate::link::FrameKind::Nak {
            self.link.stats.naks_sent += 1;
        }
        self.link.log.push(now, LogKind::FrameSent(VizFrame::of(&tx)));

        let decisions = self.link.channel.send(tx, now);
        if decisions.len() > 1 {
            self.link.stats.frames_duplicated += 1;
            self.link
                .log
                .push(now, LogKind::FrameDuplicated(VizFrame::of(&decisions[0].tx)));
        }
        for ev in decisions {
            match ev.kind {
                ChannelEventKind::Drop => {
                    debug!(tx_id = ev.tx.id, forced = ev.forced, "🗑️  帧在信道中丢失");
                    self.link.stats.frames_dropped += 1;
                    self.link.log.push(
                        now,
                        LogKind::FrameDropped {
                            frame: VizFrame::of(&ev.tx),
                            forced: ev.forced,
                        },
                    );
                }
                ChannelEventKind::Arrival | ChannelEventKind::Corrupt => {
                    trace!(tx_id = ev.tx.id, arrive = ?ev.at, "调度帧到达");
                    self.sim.schedule(
                        ev.at,
                        DeliverFrame {
                            kind: ev.kind,
                            tx: ev.tx,
                        },
                    );
                }
            }
        }
    }

    fn arm_timer(&mut self, slot: TimerSlot) {
        let now = self.sim.now();
        let timeout = match slot {
            TimerSlot::Ack => self.link.ack_timeout,
            TimerSlot::Frame(_) => self.link.timeout,
        };
        let owner = self.owner(slot);
        let armed = self.link.timers.arm(now.after(timeout), owner);
        self.link.log.push(
            now,
            LogKind::TimerArmed(VizTimer {
                timer_id: armed.id.0,
                endpoint: self.endpoint,
                slot,
                deadline_ns: armed.deadline.0,
                replaced: armed.replaced.map(|id| id.0),
            }),
        );
        self.sim.schedule(armed.deadline, TimerWake { timer_id: armed.id });
    }

    fn cancel_timer(&mut self, slot: TimerSlot) {
        let owner = self.owner(slot);
        let Some(t) = self.link.timers.cancel_owner(owner) else {
            return;
        };
        let now = self.sim.now();
        self.link.log.push(
            now,
            LogKind::TimerCancelled(VizTimer {
                timer_id: t.id.0,
                endpoint: self.endpoint,
                slot,
                deadline_ns: t.deadline.0,
                replaced: None,
            }),
        );
    }

    fn timer_active(&self, slot: TimerSlot) -> bool {
        self.link.timers.is_active(self.owner(slot))
    }

    fn discard(&mut self, frame: &Frame, reason: DiscardReason) {
        let now = self.sim.now();
        let Some(viz) = self.arriving.clone() else {
            warn!(endpoint = %self.endpoint, seq = frame.seq(), ?reason, "没有到达帧可拒收，忽略");
            return;
        };
        debug!(endpoint = %self.endpoint, tx_id = viz.tx_id, seq = frame.seq(), ?reason, "接收方拒收");
        self.link.stats.frames_discarded += 1;
        self.link
            .log
            .push(now, LogKind::FrameDiscarded { frame: viz, reason });
    }

    fn window_changed(&mut self, window: VizWindow) {
        let now = self.sim.now();
        trace!(?window, "窗口变化");
        self.link.log.push(now, LogKind::WindowChanged(window));
    }
}
