use crate::subscription::{SubscriptionId, SubscriptionSource};
use futures::stream::BoxStream;
use futures::StreamExt;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;

/// A repeating timer that fires at a fixed interval.
///
/// The first tick arrives one full `interval` after the subscription starts,
/// so a one-second countdown does not lose its first second. The `id`
/// keeps several timers apart when a screen declares more than one.
///
/// # Example
///
/// ```rust,ignore
/// let sub = subscribe(Every::new(Duration::from_secs(1), "otp-cooldown"))
///     .map(|_| Msg::Tick);
/// ```
pub struct Every {
    /// The interval between ticks.
    pub interval: Duration,
    /// A string identifier used to distinguish this timer from others.
    pub id: &'static str,
}

impl Every {
    /// Create a new repeating timer with the given interval and identifier.
    pub fn new(interval: Duration, id: &'static str) -> Self {
        Self { interval, id }
    }
}

impl SubscriptionSource for Every {
    type Output = Instant;

    fn id(&self) -> SubscriptionId {
        SubscriptionId::with_str::<Self>(self.id)
    }

    fn stream(self) -> BoxStream<'static, Instant> {
        let start = tokio::time::Instant::now() + self.interval;
        let mut interval = tokio::time::interval_at(start, self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let stream = tokio_stream::wrappers::IntervalStream::new(interval)
            .map(|tick| tick.into_std());
        Box::pin(stream)
    }
}
