use super::endpoint::Endpoint;
use super::world::arq_world;
use crate::sim::{Event, Simulator, World};

/// 网络层有分组待发，且该端的数据链路层可以接收
pub struct NetworkReady {
    pub endpoint: Endpoint,
}

impl Event for NetworkReady {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let Some(w) = arq_world(world) else {
            return;
        };
        w.on_network_ready(self.endpoint, sim);
    }
}
