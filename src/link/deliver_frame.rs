use super::channel::{ChannelEventKind, Transmission};
use super::world::arq_world;
use crate::sim::{Event, Simulator, World};
use crate::viz::{LogKind, VizFrame};
use tracing::trace;

/// 帧到达对端（可能已损坏）
pub struct DeliverFrame {
    pub kind: ChannelEventKind,
    pub tx: Transmission,
}

impl Event for DeliverFrame {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let DeliverFrame { kind, tx } = *self;
        let Some(w) = arq_world(world) else {
            return;
        };
        if !w.is_active() {
            return;
        }
        trace!(tx_id = tx.id, to = %tx.to(), ?kind, "帧到达");
        let corrupted = kind == ChannelEventKind::Corrupt;
        let viz = VizFrame::of(&tx);
        let entry = if corrupted {
            LogKind::FrameCorrupted(viz.clone())
        } else {
            LogKind::FrameDelivered(viz.clone())
        };
        w.log_arrival(entry, corrupted, sim.now());
        w.on_frame(tx.frame, viz, sim);
    }
}
