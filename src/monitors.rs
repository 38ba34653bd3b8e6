//! Monitor topology as seen by the layout reconciler
//!
//! Only the ordered list matters here: the position in the list is the
//! topology index the layout assignment is keyed by.

use std::sync::mpsc::Sender;
use tracing::info;

use crate::event_handler::HostEvent;
use crate::subscription::{SubscriptionId, Subscribers};

#[derive(Debug, Clone, PartialEq)]
pub struct Monitor {
    pub index: usize,
    pub scale_factor: f64,
}

pub trait MonitorTopology {
    /// Current monitors, ordered by topology index
    fn monitors(&self) -> Vec<Monitor>;

    fn subscribe(&mut self, sender: Sender<HostEvent>) -> SubscriptionId;

    fn unsubscribe(&mut self, id: SubscriptionId) -> bool;

    fn monitor_count(&self) -> usize {
        self.monitors().len()
    }
}

/// Topology described by a list of scale factors (config file or shell)
pub struct StaticTopology {
    scales: Vec<f64>,
    subscribers: Subscribers<()>,
}

impl StaticTopology {
    pub fn new(scales: Vec<f64>) -> Self {
        Self {
            scales,
            subscribers: Subscribers::new(),
        }
    }

    /// Replace the monitor list, notifying subscribers if it changed
    pub fn set_scales(&mut self, scales: Vec<f64>) {
        if scales == self.scales {
            return;
        }
        info!(old = self.scales.len(), new = scales.len(), "Monitor topology changed");
        self.scales = scales;
        self.subscribers.notify(&(), HostEvent::TopologyChanged);
    }
}

impl MonitorTopology for StaticTopology {
    fn monitors(&self) -> Vec<Monitor> {
        self.scales
            .iter()
            .enumerate()
            .map(|(index, &scale_factor)| Monitor { index, scale_factor })
            .collect()
    }

    fn subscribe(&mut self, sender: Sender<HostEvent>) -> SubscriptionId {
        self.subscribers.subscribe((), sender)
    }

    fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }
}
