use super::timer::TimerId;
use super::world::arq_world;
use crate::sim::{Event, Simulator, World};

/// 定时器截止时刻的唤醒。
///
/// 不直接携带要触发的定时器：唤醒时查询定时器表，已被取消或替换的定时器自然不会触发。
pub struct TimerWake {
    pub timer_id: TimerId,
}

impl Event for TimerWake {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let Some(w) = arq_world(world) else {
            return;
        };
        tracing::trace!(timer_id = self.timer_id.0, "定时器唤醒");
        w.on_timer_wake(sim);
    }
}
