//! 数据链路世界
//!
//! 两个端点的协议站、共享信道、定时器表、上层模拟与事件日志。
//! 事件通过 `arq_world` 向下转型取得它，再把控制权交给对应站点。

use super::channel::{Channel, ChannelConfig, FaultRates, FrameFilter};
use super::ctx::{Dispatch, LinkCtx};
use super::endpoint::Endpoint;
use super::frame::{Frame, Payload};
use super::network_ready::NetworkReady;
use super::stats::Stats;
use super::timer::{TimerSlot, TimerTable};
use crate::config::SimConfig;
use crate::error::{ConfigError, ProtocolViolation};
use crate::proto::{DataLink, ProtocolKind, Station};
use crate::sim::{SimTime, Simulator, World};
use crate::viz::{EventLog, LogKind, SenderState, VizFrame, VizTimer, VizWindow};
use std::any::Any;
use std::collections::VecDeque;
use tracing::{debug, error, info, warn};

/// 一端的网络层：待发送的分组队列与已交付的分组
#[derive(Debug, Default)]
pub struct UpperLayer {
    pub source: VecDeque<Payload>,
    pub sink: Vec<Payload>,
    /// 最初排队的分组总数
    pub expected_in: usize,
}

/// 站点以外的全部链路状态，站点通过 `LinkCtx` 访问
#[derive(Debug)]
pub struct LinkState {
    pub(crate) channel: Channel,
    pub(crate) timers: TimerTable,
    pub(crate) log: EventLog,
    pub(crate) stats: Stats,
    pub(crate) upper: [UpperLayer; 2],
    pub(crate) next_tx_id: u64,
    pub(crate) ready_pending: [bool; 2],
    pub(crate) timeout: SimTime,
    pub(crate) ack_timeout: SimTime,
}

pub struct ArqWorld {
    protocol: ProtocolKind,
    stations: [Station; 2],
    link: LinkState,
    halted: Option<ProtocolViolation>,
    stopped: bool,
}

/// 从 `dyn World` 取回具体世界；类型不符时返回 None（事件被忽略）。
pub(crate) fn arq_world(world: &mut dyn World) -> Option<&mut ArqWorld> {
    world.as_any_mut().downcast_mut::<ArqWorld>()
}

impl ArqWorld {
    pub fn new(instance_id: u64, cfg: &SimConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        let protocol = cfg.protocol;
        let stations = Station::pair(protocol, cfg)?;

        let fifo = !cfg.reorders()?;
        let faults = if protocol.supports_faults() {
            cfg.faults
        } else {
            if !cfg.faults.is_ideal() {
                warn!(%protocol, "该协议假定理想信道，忽略故障概率");
            }
            FaultRates::NONE
        };
        let channel = Channel::new(ChannelConfig {
            faults,
            min_delay: SimTime::from_millis(cfg.min_delay_ms),
            max_delay: SimTime::from_millis(cfg.max_delay_ms),
            fifo,
            seed: cfg.seed,
        });

        let mut upper: [UpperLayer; 2] = Default::default();
        for ep in Endpoint::ALL {
            // 单工协议只有 A 产生流量
            if ep == Endpoint::B && !protocol.duplex() {
                continue;
            }
            let packets = cfg.traffic.packets(ep);
            upper[ep.index()].expected_in = packets.len();
            upper[ep.index()].source = packets.into();
        }

        info!(
            instance_id,
            %protocol,
            fifo,
            packets_a = upper[0].expected_in,
            packets_b = upper[1].expected_in,
            "🔗 创建数据链路实例"
        );

        Ok(Self {
            protocol,
            stations,
            link: LinkState {
                channel,
                timers: TimerTable::default(),
                log: EventLog::new(instance_id),
                stats: Stats::default(),
                upper,
                next_tx_id: 0,
                ready_pending: [false; 2],
                timeout: SimTime::from_millis(cfg.timeout_ms),
                ack_timeout: SimTime::from_millis(cfg.ack_timeout_ms),
            },
            halted: None,
            stopped: false,
        })
    }

    pub fn protocol(&self) -> ProtocolKind {
        self.protocol
    }

    pub fn log(&self) -> &EventLog {
        &self.link.log
    }

    pub fn stats(&self) -> &Stats {
        &self.link.stats
    }

    pub fn halted(&self) -> Option<&ProtocolViolation> {
        self.halted.as_ref()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// `ep` 的网络层已经收到的分组
    pub fn delivered(&self, ep: Endpoint) -> &[Payload] {
        &self.link.upper[ep.index()].sink
    }

    /// `ep` 的网络层尚未交给数据链路层的分组数
    pub fn queued(&self, ep: Endpoint) -> usize {
        self.link.upper[ep.index()].source.len()
    }

    /// 两个方向的全部分组都已交付到对端
    pub fn all_delivered(&self) -> bool {
        Endpoint::ALL.iter().all(|&ep| {
            self.link.upper[ep.peer().index()].sink.len() >= self.link.upper[ep.index()].expected_in
        })
    }

    pub fn faults(&self) -> FaultRates {
        self.link.channel.faults()
    }

    pub fn set_faults(&mut self, faults: FaultRates) {
        self.link.channel.set_faults(faults);
    }

    pub fn force_drop(&mut self, filter: FrameFilter) {
        debug!(?filter, "登记强制丢弃");
        self.link.channel.force_drop(filter);
    }

    pub fn pending_forced_drops(&self) -> usize {
        self.link.channel.pending_forced_drops()
    }

    pub fn timers(&self) -> &TimerTable {
        &self.link.timers
    }

    pub fn window(&self, ep: Endpoint) -> Option<VizWindow> {
        self.stations[ep.index()].window(ep)
    }

    pub fn receive_window(&self, ep: Endpoint) -> Option<VizWindow> {
        self.stations[ep.index()].receive_window(ep)
    }

    pub fn sender_state(&self, ep: Endpoint) -> Option<SenderState> {
        self.stations[ep.index()].sender_state(ep)
    }

    /// 启动：让有数据可发的站点开始工作
    pub fn start(&mut self, sim: &mut Simulator) {
        self.pump(sim);
    }

    /// 停止：取消全部定时器、清空事件队列，之后任何事件都被忽略
    pub fn stop(&mut self, sim: &mut Simulator) {
        if self.stopped {
            return;
        }
        self.cancel_all_timers(sim.now());
        let discarded = sim.clear();
        self.stopped = true;
        info!(discarded, now = ?sim.now(), "⏹️  实例已停止");
    }

    fn active(&self) -> bool {
        !self.stopped && self.halted.is_none()
    }

    fn cancel_all_timers(&mut self, now: SimTime) {
        for t in self.link.timers.cancel_all() {
            self.link.log.push(
                now,
                LogKind::TimerCancelled(VizTimer {
                    timer_id: t.id.0,
                    endpoint: t.owner.endpoint,
                    slot: t.owner.slot,
                    deadline_ns: t.deadline.0,
                    replaced: None,
                }),
            );
        }
    }

    /// 为每个可以接收新分组的站点安排一次 NETWORK_READY
    fn pump(&mut self, sim: &mut Simulator) {
        if !self.active() {
            return;
        }
        for ep in Endpoint::ALL {
            let i = ep.index();
            if !self.link.ready_pending[i]
                && !self.link.upper[i].source.is_empty()
                && self.stations[i].ready_for_packet()
            {
                self.link.ready_pending[i] = true;
                sim.schedule(sim.now(), NetworkReady { endpoint: ep });
            }
        }
    }

    /// 以 `ep` 的站点处理一次事件，然后检查不变式
    fn dispatch<F>(&mut self, ep: Endpoint, sim: &mut Simulator, arriving: Option<VizFrame>, f: F)
    where
        F: FnOnce(&mut Station, &mut dyn LinkCtx) -> Result<(), ProtocolViolation>,
    {
        if !self.active() {
            return;
        }
        let station = &mut self.stations[ep.index()];
        let mut ctx = Dispatch {
            endpoint: ep,
            sim: &mut *sim,
            link: &mut self.link,
            arriving,
        };
        let result = f(&mut *station, &mut ctx).and_then(|()| station.check(ep));
        if let Err(violation) = result {
            self.halt(sim, violation);
        }
    }

    fn halt(&mut self, sim: &mut Simulator, violation: ProtocolViolation) {
        error!(endpoint = %violation.endpoint, detail = %violation.detail, "❌ 协议错误，拆除实例");
        let now = sim.now();
        self.link.log.push(
            now,
            LogKind::ProtocolError {
                endpoint: violation.endpoint,
                detail: violation.detail.clone(),
            },
        );
        self.cancel_all_timers(now);
        sim.clear();
        self.halted = Some(violation);
    }

    pub(crate) fn on_network_ready(&mut self, ep: Endpoint, sim: &mut Simulator) {
        self.link.ready_pending[ep.index()] = false;
        if self.link.upper[ep.index()].source.is_empty() || !self.stations[ep.index()].ready_for_packet() {
            return;
        }
        self.dispatch(ep, sim, None, |st, ctx| st.on_send_request(ctx));
    }

    pub(crate) fn on_frame(&mut self, frame: Frame, arriving: VizFrame, sim: &mut Simulator) {
        let to = arriving.to;
        self.dispatch(to, sim, Some(arriving), |st, ctx| st.on_frame_arrival(frame, ctx));
    }

    /// 截止时刻唤醒：依次处理所有已到期的定时器（被取消/替换的不会出现）
    pub(crate) fn on_timer_wake(&mut self, sim: &mut Simulator) {
        while self.active() {
            let Some(t) = self.link.timers.next_expired(sim.now()) else {
                break;
            };
            debug!(endpoint = %t.owner.endpoint, slot = ?t.owner.slot, "⏰ 定时器到期");
            self.link.stats.timeouts += u64::from(matches!(t.owner.slot, TimerSlot::Frame(_)));
            self.link.log.push(
                sim.now(),
                LogKind::TimerFired(VizTimer {
                    timer_id: t.id.0,
                    endpoint: t.owner.endpoint,
                    slot: t.owner.slot,
                    deadline_ns: t.deadline.0,
                    replaced: None,
                }),
            );
            let slot = t.owner.slot;
            self.dispatch(t.owner.endpoint, sim, None, |st, ctx| st.on_timer_expiry(slot, ctx));
        }
    }

    pub(crate) fn log_arrival(&mut self, kind: LogKind, corrupted: bool, now: SimTime) {
        self.link.stats.frames_delivered += 1;
        if corrupted {
            self.link.stats.frames_corrupted += 1;
        }
        self.link.log.push(now, kind);
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active()
    }
}

impl World for ArqWorld {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn on_tick(&mut self, sim: &mut Simulator) {
        self.pump(sim);
    }
}
