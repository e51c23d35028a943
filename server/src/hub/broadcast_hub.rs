use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use log::{debug, info, warn};
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};

use hexmap_shared::{Audience, CampaignEvent, CampaignId, Frame, Role};

use super::EventStream;

/// Identifies one subscription on the hub
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

struct Subscriber {
    id: SubscriberId,
    role: Role,
    sender: mpsc::Sender<Frame>,
}

pub(crate) struct HubInner {
    channels: Mutex<HashMap<CampaignId, Vec<Subscriber>>>,
    next_id: AtomicU64,
    heartbeat_interval: Duration,
    buffer: usize,
}

impl HubInner {
    pub(crate) fn remove(&self, campaign_id: CampaignId, id: SubscriberId) -> bool {
        let mut channels = self.channels.lock();
        let Some(subscribers) = channels.get_mut(&campaign_id) else {
            return false;
        };

        let before = subscribers.len();
        subscribers.retain(|subscriber| subscriber.id != id);
        let removed = subscribers.len() != before;

        if subscribers.is_empty() {
            channels.remove(&campaign_id);
        }
        removed
    }
}

/// Per-campaign publish/subscribe fan-out.
///
/// Delivery is at-most-once and in-process only: nothing is buffered for
/// subscribers that connect later. Each subscriber queues at most `buffer`
/// frames; a frame published to a full queue is dropped for that subscriber.
#[derive(Clone)]
pub struct BroadcastHub {
    inner: Arc<HubInner>,
}

impl BroadcastHub {
    pub fn new(heartbeat_interval: Duration, buffer: usize) -> Self {
        Self {
            inner: Arc::new(HubInner {
                channels: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                heartbeat_interval,
                buffer: buffer.max(1),
            }),
        }
    }

    /// Opens a stream of events for `campaign_id`, filtered for `role`. Must be
    /// called from within a tokio runtime, since the stream owns a heartbeat
    /// timer.
    pub fn subscribe(&self, campaign_id: CampaignId, role: Role) -> EventStream {
        let id = SubscriberId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = mpsc::channel(self.inner.buffer);

        self.inner
            .channels
            .lock()
            .entry(campaign_id)
            .or_default()
            .push(Subscriber { id, role, sender });

        debug!("Subscriber {:?} ({}) joined campaign {}", id, role, campaign_id);

        EventStream::new(
            id,
            campaign_id,
            receiver,
            self.inner.heartbeat_interval,
            Arc::downgrade(&self.inner),
        )
    }

    pub fn unsubscribe(&self, campaign_id: CampaignId, id: SubscriberId) -> bool {
        self.inner.remove(campaign_id, id)
    }

    /// Delivers `event` to every subscriber of the campaign admitted by
    /// `audience`. Returns how many subscribers received it.
    pub fn publish(&self, campaign_id: CampaignId, event: &CampaignEvent, audience: Audience) -> usize {
        let wire = match event.encode() {
            Ok(wire) => wire,
            Err(err) => {
                warn!("Dropping {} for campaign {}: {}", event.name(), campaign_id, err);
                return 0;
            }
        };

        let mut channels = self.inner.channels.lock();
        let Some(subscribers) = channels.get_mut(&campaign_id) else {
            return 0;
        };

        let mut delivered = 0;
        subscribers.retain(|subscriber| {
            if !audience.admits(subscriber.role) {
                return true;
            }
            match subscriber.sender.try_send(Frame::Event(wire.clone())) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(TrySendError::Full(_)) => {
                    warn!(
                        "Dropped {} for subscriber {:?} of campaign {}: buffer full",
                        wire.name, subscriber.id, campaign_id
                    );
                    true
                }
                Err(TrySendError::Closed(_)) => {
                    info!(
                        "Pruning subscriber {:?} of campaign {}: stream closed",
                        subscriber.id, campaign_id
                    );
                    false
                }
            }
        });

        if subscribers.is_empty() {
            channels.remove(&campaign_id);
        }

        debug!(
            "Published {} to {:?} of campaign {} ({} delivered)",
            wire.name, audience, campaign_id, delivered
        );
        delivered
    }

    pub fn subscriber_count(&self, campaign_id: CampaignId) -> usize {
        self.inner
            .channels
            .lock()
            .get(&campaign_id)
            .map_or(0, Vec::len)
    }
}
