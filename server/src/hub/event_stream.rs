use std::{
    pin::Pin,
    sync::Weak,
    task::{Context, Poll},
    time::Duration,
};

use futures::Stream;
use tokio::{
    sync::mpsc,
    time::{interval_at, Instant, Interval, MissedTickBehavior},
};

use hexmap_shared::{CampaignId, Frame};

use super::{broadcast_hub::HubInner, SubscriberId};

/// The push stream of one connected client.
///
/// Yields published events as they arrive and a [`Frame::KeepAlive`] whenever
/// the heartbeat interval elapses. Dropping the stream unsubscribes it.
pub struct EventStream {
    id: SubscriberId,
    campaign_id: CampaignId,
    receiver: mpsc::Receiver<Frame>,
    heartbeat: Interval,
    hub: Weak<HubInner>,
}

impl EventStream {
    pub(crate) fn new(
        id: SubscriberId,
        campaign_id: CampaignId,
        receiver: mpsc::Receiver<Frame>,
        heartbeat_interval: Duration,
        hub: Weak<HubInner>,
    ) -> Self {
        let mut heartbeat = interval_at(Instant::now() + heartbeat_interval, heartbeat_interval);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Self {
            id,
            campaign_id,
            receiver,
            heartbeat,
            hub,
        }
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn campaign_id(&self) -> CampaignId {
        self.campaign_id
    }
}

impl Stream for EventStream {
    type Item = Frame;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Frame>> {
        let this = self.get_mut();

        match this.receiver.poll_recv(cx) {
            Poll::Ready(Some(frame)) => {
                this.heartbeat.reset();
                return Poll::Ready(Some(frame));
            }
            // hub is gone
            Poll::Ready(None) => return Poll::Ready(None),
            Poll::Pending => {}
        }

        match this.heartbeat.poll_tick(cx) {
            Poll::Ready(_) => Poll::Ready(Some(Frame::KeepAlive)),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.remove(self.campaign_id, self.id);
        }
    }
}
