//! 仿真器
//!
//! 维护当前虚拟时间与按 (时间, 序号) 排序的最小堆事件队列。

use super::event::Event;
use super::time::SimTime;
use super::world::World;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use tracing::{debug, info, trace};

/// 队列中的一项。`key` 用 `Reverse` 包装，使 max-heap 弹出最早的事件；
/// 同一时刻按调度顺序执行。
struct Pending {
    key: Reverse<(SimTime, u64)>,
    ev: Box<dyn Event>,
}

impl Pending {
    fn at(&self) -> SimTime {
        self.key.0.0
    }

    fn seq(&self) -> u64 {
        self.key.0.1
    }
}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Pending {}

/// 事件驱动仿真器：维护当前时间与事件队列。
#[derive(Default)]
pub struct Simulator {
    now: SimTime,
    next_seq: u64,
    executed: u64,
    q: BinaryHeap<Pending>,
}

impl Simulator {
    /// 获取当前仿真时间
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// 队列中待执行的事件数
    pub fn pending(&self) -> usize {
        self.q.len()
    }

    /// 已执行的事件总数
    pub fn executed(&self) -> u64 {
        self.executed
    }

    /// 队首事件的时间（队列为空时为 None）
    pub fn peek_time(&self) -> Option<SimTime> {
        self.q.peek().map(Pending::at)
    }

    /// 调度事件在指定时间执行。早于当前时间的请求按"立即"处理。
    #[tracing::instrument(skip(self, ev), fields(event_type = std::any::type_name::<E>(), schedule_at = ?at))]
    pub fn schedule<E: Event>(&mut self, at: SimTime, ev: E) {
        let at = at.max(self.now);
        let seq = self.next_seq;
        trace!(now = ?self.now, seq, "调度事件");

        self.next_seq = self.next_seq.wrapping_add(1);
        self.q.push(Pending {
            key: Reverse((at, seq)),
            ev: Box::new(ev),
        });

        debug!(queue_size = self.q.len(), "事件已加入队列");
    }

    /// 丢弃所有尚未执行的事件，返回丢弃数量。时间不回退。
    pub fn clear(&mut self) -> usize {
        let n = self.q.len();
        self.q.clear();
        debug!(discarded = n, now = ?self.now, "清空事件队列");
        n
    }

    fn dispatch(&mut self, item: Pending, world: &mut dyn World) {
        self.now = item.at();
        self.executed += 1;
        trace!(now = ?self.now, seq = item.seq(), remaining_queue = self.q.len(), "执行事件");
        item.ev.execute(self, world);
        world.on_tick(self);
    }

    /// 单步：执行队首事件，以及该事件在同一时刻派生出的全部后续事件。
    ///
    /// 调用前已经排在同一时刻的其它事件不属于本次级联，留给下一次 `step`。
    /// 队列为空时返回 false。
    pub fn step(&mut self, world: &mut dyn World) -> bool {
        let Some(first) = self.q.pop() else {
            return false;
        };
        let horizon = self.next_seq;
        self.dispatch(first, world);

        while self
            .q
            .peek()
            .is_some_and(|p| p.at() == self.now && p.seq() >= horizon)
        {
            let Some(item) = self.q.pop() else {
                break;
            };
            self.dispatch(item, world);
        }
        true
    }

    /// 运行直到事件队列为空或到达 `until`。
    pub fn run_until(&mut self, until: SimTime, world: &mut dyn World) {
        while self.q.peek().is_some_and(|top| top.at() <= until) {
            let Some(item) = self.q.pop() else {
                break;
            };
            self.dispatch(item, world);
        }
        self.now = self.now.max(until);
    }

    /// 运行所有事件直到队列为空。
    #[tracing::instrument(skip(self, world))]
    pub fn run(&mut self, world: &mut dyn World) {
        info!("▶️  开始运行仿真");
        debug!(now = ?self.now, queue_size = self.q.len(), "初始状态");

        let mut event_count: u64 = 0;
        while let Some(item) = self.q.pop() {
            event_count += 1;
            self.dispatch(item, world);
        }

        info!(
            total_events = event_count,
            final_time = ?self.now,
            "✅ 仿真完成"
        );
    }
}
