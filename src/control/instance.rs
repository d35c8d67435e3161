//! 一个协议实例：独占的调度器与世界。
//!
//! 实例之间没有共享的可变状态，可以整体移交给其它线程运行。

use super::command::{RunOutcome, StopCondition};
use crate::config::SimConfig;
use crate::error::ConfigError;
use crate::link::{ArqWorld, Endpoint};
use crate::sim::{SimTime, Simulator};
use tracing::{debug, info};

pub struct Instance {
    id: u64,
    sim: Simulator,
    world: ArqWorld,
}

impl Instance {
    pub fn new(id: u64, cfg: &SimConfig) -> Result<Self, ConfigError> {
        let mut world = ArqWorld::new(id, cfg)?;
        let mut sim = Simulator::default();
        world.start(&mut sim);
        Ok(Self { id, sim, world })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn now(&self) -> SimTime {
        self.sim.now()
    }

    pub fn world(&self) -> &ArqWorld {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut ArqWorld {
        &mut self.world
    }

    pub fn pending_events(&self) -> usize {
        self.sim.pending()
    }

    pub fn events_executed(&self) -> u64 {
        self.sim.executed()
    }

    /// 界面单步：推进到至少产生一条日志（或队列为空）为止。
    ///
    /// 已失效定时器的唤醒不会单独成为一步。返回是否执行了任何事件。
    pub fn step(&mut self) -> bool {
        let before = self.world.log().len();
        let mut progressed = false;
        while self.world.log().len() == before && self.sim.step(&mut self.world) {
            progressed = true;
        }
        progressed
    }

    /// 停止：取消定时器并丢弃所有排队事件
    pub fn stop(&mut self) {
        self.world.stop(&mut self.sim);
    }

    fn reached(&self, cond: StopCondition, start_events: u64) -> bool {
        match cond {
            StopCondition::Delivered(n) => self.world.stats().packets_delivered >= n,
            StopCondition::DeliveredAt(ep, n) => self.world.delivered(ep).len() as u64 >= n,
            StopCondition::AllDelivered => self.world.all_delivered(),
            StopCondition::Until(t) => self.sim.peek_time().is_none_or(|next| next > t),
            StopCondition::Idle => self.sim.pending() == 0,
            StopCondition::Events(n) => self.sim.executed() - start_events >= n,
        }
    }

    /// 自由运行直到满足条件、队列为空、协议出错或用完 `budget` 个事件。
    pub fn run_until(&mut self, cond: StopCondition, budget: u64) -> RunOutcome {
        let start = self.sim.executed();
        debug!(instance_id = self.id, ?cond, budget, "运行实例");
        let outcome = loop {
            if self.world.halted().is_some() {
                break RunOutcome::Halted;
            }
            if self.reached(cond, start) {
                if let StopCondition::Until(t) = cond {
                    self.sim.run_until(t, &mut self.world);
                }
                break RunOutcome::Reached;
            }
            if self.sim.executed() - start >= budget {
                break RunOutcome::BudgetExhausted;
            }
            if !self.sim.step(&mut self.world) {
                break if self.world.halted().is_some() {
                    RunOutcome::Halted
                } else {
                    RunOutcome::Idle
                };
            }
        };
        info!(
            instance_id = self.id,
            ?outcome,
            now = ?self.sim.now(),
            events = self.sim.executed() - start,
            delivered_a = self.world.delivered(Endpoint::A).len(),
            delivered_b = self.world.delivered(Endpoint::B).len(),
            "⏸️  运行结束"
        );
        outcome
    }
}
