use futures::stream::BoxStream;
use futures::StreamExt;
use std::any::TypeId;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

type SpawnFn<Msg> = Box<dyn FnOnce(mpsc::UnboundedSender<Msg>) -> AbortHandle + Send>;

/// A long-lived event source owned by the runtime.
///
/// Subscriptions are declared in
/// [`Model::subscriptions`](crate::Model::subscriptions) after every update.
/// The runtime starts the ones it has not seen and aborts the ones that
/// disappeared, so a model cancels a timer simply by no longer declaring it.
pub struct Subscription<Msg: Send + 'static> {
    pub(crate) id: SubscriptionId,
    pub(crate) spawn: SpawnFn<Msg>,
}

/// Identity for diffing subscriptions between update cycles.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId {
    type_id: TypeId,
    discriminant: u64,
}

impl SubscriptionId {
    /// Create an ID from a type and a numeric discriminant.
    pub fn new<T: 'static>(discriminant: u64) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            discriminant,
        }
    }

    /// Create an ID from a type alone (for singletons).
    pub fn of<T: 'static>() -> Self {
        Self::new::<T>(0)
    }

    /// Create an ID from a type and a string discriminant.
    pub fn with_str<T: 'static>(s: &str) -> Self {
        let mut hasher = std::hash::DefaultHasher::new();
        s.hash(&mut hasher);
        Self::new::<T>(hasher.finish())
    }
}

/// Trait for types that produce a stream of values.
///
/// The runtime calls [`stream`](SubscriptionSource::stream) once when the
/// subscription starts and drops the stream when it is removed.
pub trait SubscriptionSource: Send + 'static {
    /// The type of values this source emits.
    type Output: Send + 'static;

    /// Unique ID for this subscription instance.
    fn id(&self) -> SubscriptionId;

    /// Create the stream of values.
    fn stream(self) -> BoxStream<'static, Self::Output>;
}

fn forward<Msg: Send + 'static>(
    stream: BoxStream<'static, Msg>,
    tx: mpsc::UnboundedSender<Msg>,
) -> AbortHandle {
    tokio::spawn(async move {
        let mut stream = stream;
        while let Some(msg) = stream.next().await {
            if tx.send(msg).is_err() {
                break;
            }
        }
    })
    .abort_handle()
}

/// Create a [`Subscription`] from a [`SubscriptionSource`].
pub fn subscribe<S>(source: S) -> Subscription<S::Output>
where
    S: SubscriptionSource,
{
    let id = source.id();
    Subscription {
        id,
        spawn: Box::new(move |tx| forward(source.stream(), tx)),
    }
}

impl<Msg: Send + 'static> Subscription<Msg> {
    /// Create from a raw stream and id.
    pub fn from_stream(id: SubscriptionId, stream: BoxStream<'static, Msg>) -> Self {
        Subscription {
            id,
            spawn: Box::new(move |tx| forward(stream, tx)),
        }
    }

    /// The identity used for diffing.
    pub fn id(&self) -> &SubscriptionId {
        &self.id
    }

    /// Transform the message type (for component composition).
    pub fn map<NewMsg: Send + 'static>(
        self,
        f: impl Fn(Msg) -> NewMsg + Send + Sync + 'static,
    ) -> Subscription<NewMsg> {
        let f = Arc::new(f);
        Subscription {
            id: self.id,
            spawn: Box::new(move |new_tx: mpsc::UnboundedSender<NewMsg>| {
                let (inner_tx, mut inner_rx) = mpsc::unbounded_channel::<Msg>();
                let abort = (self.spawn)(inner_tx);

                // Ends on its own once the source is aborted and inner_tx drops.
                tokio::spawn(async move {
                    while let Some(msg) = inner_rx.recv().await {
                        if new_tx.send(f(msg)).is_err() {
                            break;
                        }
                    }
                });

                abort
            }),
        }
    }
}

/// Running subscriptions keyed by id, diffed against the model's
/// declarations after every update.
pub(crate) struct SubscriptionManager<Msg: Send + 'static> {
    running: HashMap<SubscriptionId, AbortHandle>,
    tx: mpsc::UnboundedSender<Msg>,
}

impl<Msg: Send + 'static> SubscriptionManager<Msg> {
    pub fn new(tx: mpsc::UnboundedSender<Msg>) -> Self {
        SubscriptionManager {
            running: HashMap::new(),
            tx,
        }
    }

    /// Abort what is no longer declared and start what is new. A
    /// subscription declared again under the same id keeps running.
    pub fn reconcile(&mut self, declared: Vec<Subscription<Msg>>) {
        let declared: HashMap<SubscriptionId, Subscription<Msg>> = declared
            .into_iter()
            .map(|sub| (sub.id.clone(), sub))
            .collect();

        let gone: Vec<SubscriptionId> = self
            .running
            .keys()
            .filter(|id| !declared.contains_key(*id))
            .cloned()
            .collect();
        for id in gone {
            if let Some(handle) = self.running.remove(&id) {
                tracing::trace!(?id, "subscription stopped");
                handle.abort();
            }
        }

        for (id, sub) in declared {
            self.running
                .entry(id)
                .or_insert_with(|| (sub.spawn)(self.tx.clone()));
        }
    }

    pub fn shutdown(&mut self) {
        self.running.drain().for_each(|(_, handle)| handle.abort());
    }

    #[cfg(test)]
    pub fn running(&self) -> usize {
        self.running.len()
    }
}
