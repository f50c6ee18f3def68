//! Event pump feeding platform callbacks into the broadcaster

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::error::{BroadcasterError, Result};
use crate::handle::{BroadcastControl, SharedBroadcaster};
use crate::identity::IdentityProvider;
use crate::transport::{PeripheralEvent, PeripheralTransport};

/// Sender used by a platform adapter to deliver callbacks
pub type PeripheralEventSender = mpsc::UnboundedSender<PeripheralEvent>;
/// Receiving side consumed by [`BroadcastTask`]
pub type PeripheralEventReceiver = mpsc::UnboundedReceiver<PeripheralEvent>;

/// Create the callback channel between a platform adapter and the task
pub fn event_channel() -> (PeripheralEventSender, PeripheralEventReceiver) {
    mpsc::unbounded_channel()
}

// ----------------------------------------------------------------------------
// Broadcast Task
// ----------------------------------------------------------------------------

/// Single consumer of peripheral callbacks.
///
/// Callbacks are applied one at a time in arrival order. When a keepalive
/// interval is configured the task also sends a one-byte wrapping counter on
/// the keepalive characteristic.
pub struct BroadcastTask<T, P> {
    broadcaster: SharedBroadcaster<T, P>,
    events: PeripheralEventReceiver,
    shutdown: watch::Receiver<bool>,
    keepalive_interval: Option<Duration>,
    keepalive_counter: u8,
}

impl<T: PeripheralTransport, P: IdentityProvider> BroadcastTask<T, P> {
    pub fn new(
        broadcaster: SharedBroadcaster<T, P>,
        events: PeripheralEventReceiver,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let keepalive_interval = broadcaster.with(|b| b.config().keepalive_interval());
        Self {
            broadcaster,
            events,
            shutdown,
            keepalive_interval,
            keepalive_counter: 0,
        }
    }

    pub fn with_keepalive_interval(mut self, interval: Option<Duration>) -> Self {
        self.keepalive_interval = interval.filter(|period| !period.is_zero());
        self
    }

    /// Run until shutdown is signalled or the event channel closes
    pub async fn run(mut self) -> Result<()> {
        info!("broadcast task starting");

        let mut ticker = self.keepalive_interval.map(|period| {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker
        });

        loop {
            tokio::select! {
                event = self.events.recv() => {
                    match event {
                        Some(event) => {
                            debug!("peripheral event: {}", event.kind());
                            self.broadcaster.handle_event(event);
                        }
                        None => {
                            info!("peripheral event channel closed");
                            return Err(BroadcasterError::ChannelClosed);
                        }
                    }
                }

                _ = next_tick(&mut ticker) => {
                    self.keepalive_counter = self.keepalive_counter.wrapping_add(1);
                    self.broadcaster.send_keepalive(vec![self.keepalive_counter]);
                }

                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        info!("broadcast task shutting down");
                        return Ok(());
                    }
                }
            }
        }
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
