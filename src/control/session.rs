//! 命令面
//!
//! `Session` 持有当前配置与至多一个协议实例。命令按当前协议的能力同步校验，
//! 被拒绝的命令不改变任何状态。

use super::command::{Command, RunMode, RunOutcome, StopCondition};
use super::instance::Instance;
use crate::config::SimConfig;
use crate::error::{ConfigError, ProtocolViolation};
use crate::link::{Endpoint, FaultRates, FrameFilter, Payload, Stats};
use crate::proto::ProtocolKind;
use crate::sim::SimTime;
use crate::viz::{LogEntry, SenderState, VizWindow};
use tracing::{debug, info};

pub struct Session {
    cfg: SimConfig,
    instance: Option<Instance>,
    mode: RunMode,
    next_instance_id: u64,
    /// 实例创建前登记的强制丢弃
    pending_drops: Vec<FrameFilter>,
}

impl Session {
    pub fn new(cfg: SimConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            instance: None,
            mode: RunMode::Idle,
            next_instance_id: 1,
            pending_drops: Vec::new(),
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.cfg
    }

    pub fn protocol(&self) -> ProtocolKind {
        self.cfg.protocol
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    pub fn instance(&self) -> Option<&Instance> {
        self.instance.as_ref()
    }

    /// 替换整个配置；已有实例被销毁
    pub fn set_config(&mut self, cfg: SimConfig) -> Result<(), ConfigError> {
        cfg.validate()?;
        self.cfg = cfg;
        self.discard_instance();
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(protocol = %self.cfg.protocol))]
    pub fn apply(&mut self, cmd: Command) -> Result<(), ConfigError> {
        debug!(mode = ?self.mode, "处理命令");
        match cmd {
            Command::SelectProtocol(id) => {
                let protocol = ProtocolKind::try_from(id)?;
                let cfg = SimConfig {
                    protocol,
                    ..self.cfg.clone()
                };
                cfg.validate()?;
                info!(%protocol, "🔀 切换协议");
                self.cfg = cfg;
                self.discard_instance();
            }
            Command::Start => {
                // 已停止或出错的实例不能继续，重新开始一次运行
                if matches!(self.mode, RunMode::Stopped | RunMode::Halted) {
                    self.instance = None;
                }
                self.ensure_instance()?;
                self.mode = RunMode::Running;
            }
            Command::Pause => {
                if self.mode == RunMode::Running {
                    self.mode = RunMode::Paused;
                }
            }
            Command::Step => {
                if matches!(self.mode, RunMode::Stopped | RunMode::Halted) {
                    return Ok(());
                }
                self.ensure_instance()?;
                self.mode = RunMode::Paused;
                if let Some(inst) = self.instance.as_mut() {
                    inst.step();
                }
                self.sync_halted();
            }
            Command::Stop => {
                if let Some(inst) = self.instance.as_mut() {
                    inst.stop();
                    if self.mode != RunMode::Halted {
                        self.mode = RunMode::Stopped;
                    }
                }
            }
            Command::Reset => {
                info!("🔄 重置");
                self.discard_instance();
            }
            Command::SetFaultRates {
                loss,
                corrupt,
                duplicate,
            } => {
                self.require(self.cfg.protocol.supports_faults(), "fault injection")?;
                let faults = FaultRates {
                    loss,
                    corrupt,
                    duplicate,
                };
                faults.validate()?;
                self.cfg.faults = faults;
                if let Some(inst) = self.instance.as_mut() {
                    inst.world_mut().set_faults(faults);
                }
            }
            Command::SetWindowSize(size) => {
                self.require(self.cfg.protocol.supports_window(), "a configurable window")?;
                let cfg = SimConfig {
                    window_size: size,
                    ..self.cfg.clone()
                };
                // 显式要求乱序时，新窗口也必须满足序号不混淆的条件
                cfg.validate()?;
                self.cfg = cfg;
                if self.instance.is_some() {
                    // 窗口大小无法在运行中改变：按新配置重建实例
                    self.discard_instance();
                    self.ensure_instance()?;
                    self.mode = RunMode::Paused;
                }
            }
            Command::ForceDropNext(filter) => {
                self.require(self.cfg.protocol.supports_faults(), "forced drops")?;
                match self.instance.as_mut() {
                    Some(inst) => inst.world_mut().force_drop(filter),
                    None => self.pending_drops.push(filter),
                }
            }
        }
        Ok(())
    }

    /// 自由运行直到满足条件。没有实例时按当前配置创建；
    /// 已停止的实例不再执行事件，直接返回 `Idle`（出错的返回 `Halted`）。
    pub fn run_until(&mut self, cond: StopCondition) -> Result<RunOutcome, ConfigError> {
        self.ensure_instance()?;
        let budget = self.cfg.max_events;
        let outcome = match self.instance.as_mut() {
            Some(inst) => inst.run_until(cond, budget),
            None => return Err(ConfigError::NoInstance),
        };
        self.sync_halted();
        Ok(outcome)
    }

    /// 自由运行模式下由界面周期性调用；未处于 Running 时什么也不做
    pub fn pump(&mut self, max_events: u64) -> Option<RunOutcome> {
        if self.mode != RunMode::Running {
            return None;
        }
        let outcome = self
            .instance
            .as_mut()
            .map(|inst| inst.run_until(StopCondition::Events(max_events), max_events))?;
        self.sync_halted();
        Some(outcome)
    }

    pub fn log(&self) -> &[LogEntry] {
        self.instance
            .as_ref()
            .map_or(&[][..], |inst| inst.world().log().entries())
    }

    pub fn stats(&self) -> Stats {
        self.instance
            .as_ref()
            .map(|inst| inst.world().stats().clone())
            .unwrap_or_default()
    }

    pub fn now(&self) -> SimTime {
        self.instance.as_ref().map_or(SimTime::ZERO, Instance::now)
    }

    pub fn delivered(&self, ep: Endpoint) -> &[Payload] {
        self.instance
            .as_ref()
            .map_or(&[][..], |inst| inst.world().delivered(ep))
    }

    pub fn window(&self, ep: Endpoint) -> Option<VizWindow> {
        self.instance.as_ref()?.world().window(ep)
    }

    pub fn receive_window(&self, ep: Endpoint) -> Option<VizWindow> {
        self.instance.as_ref()?.world().receive_window(ep)
    }

    pub fn sender_state(&self, ep: Endpoint) -> Option<SenderState> {
        self.instance.as_ref()?.world().sender_state(ep)
    }

    pub fn halted(&self) -> Option<&ProtocolViolation> {
        self.instance.as_ref()?.world().halted()
    }

    fn require(&self, supported: bool, what: &'static str) -> Result<(), ConfigError> {
        if supported {
            Ok(())
        } else {
            Err(ConfigError::Unsupported {
                protocol: self.cfg.protocol,
                what,
            })
        }
    }

    fn ensure_instance(&mut self) -> Result<(), ConfigError> {
        if self.instance.is_some() {
            return Ok(());
        }
        let id = self.next_instance_id;
        let mut inst = Instance::new(id, &self.cfg)?;
        self.next_instance_id += 1;
        for filter in self.pending_drops.drain(..) {
            inst.world_mut().force_drop(filter);
        }
        info!(instance_id = id, protocol = %self.cfg.protocol, "🚀 新建协议实例");
        self.instance = Some(inst);
        self.mode = RunMode::Paused;
        Ok(())
    }

    fn discard_instance(&mut self) {
        self.instance = None;
        self.pending_drops.clear();
        self.mode = RunMode::Idle;
    }

    fn sync_halted(&mut self) {
        if self.halted().is_some() {
            self.mode = RunMode::Halted;
        }
    }
}
