use super::Concurrency;
use crate::{
    Result,
    connect::{ConnectionFactory, ConnectionParameters, PeerHandle},
    record::WorkerRecord,
};
use core::{future::Future, iter};
use futures::stream::{FuturesUnordered, StreamExt};

/// A single, one-shot fan-out over the live subset of a record collection.
///
/// Building a traversal filters the records down to live workers and
/// validates their connection arguments, so every construction-time error is
/// reported before any action runs. Running it through [`Traversal::map`] or
/// [`Traversal::each`] consumes it.
///
/// While running, at most [`Concurrency`] actions are outstanding. Elements are
/// dispatched in filtered order and each slot freed by a completed action is
/// refilled with the next element; a [`PeerHandle`] is only built at the
/// moment its element is dispatched.
///
/// Failures inside an action are opaque to the traversal: a failed element
/// still frees its slot and, for `map`, still occupies its position in the
/// output. There is no cancellation, so an action that never completes keeps
/// the traversal from completing.
#[derive(Debug)]
pub struct Traversal {
    factory: ConnectionFactory,
    pending: Vec<ConnectionParameters>,
    concurrency: Concurrency,
}

impl Traversal {
    /// Builds a traversal over the live records in `records`.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::InvalidConcurrency`] if `concurrency` is zero.
    /// - [`crate::Error::InvalidConnectionArguments`] if any live record has
    ///   no usable `url`/`token`.
    pub fn new<I>(records: I, factory: ConnectionFactory, concurrency: usize) -> Result<Self>
    where
        I: IntoIterator<Item = WorkerRecord>,
    {
        Self::with_concurrency(records, factory, Concurrency::new(concurrency)?)
    }

    /// Like [`Traversal::new`] with an already validated ceiling.
    pub fn with_concurrency<I>(
        records: I,
        factory: ConnectionFactory,
        concurrency: Concurrency,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = WorkerRecord>,
    {
        let pending = records
            .into_iter()
            .filter(WorkerRecord::is_live)
            .map(|record| ConnectionParameters::from_record(&record))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            factory,
            pending,
            concurrency,
        })
    }

    /// Number of live elements that will be dispatched.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn concurrency(&self) -> Concurrency {
        self.concurrency
    }

    /// Runs `action` once per live element and collects the outputs.
    ///
    /// The output at index `i` belongs to the `i`-th live element, whatever
    /// order the actions finished in.
    pub async fn map<T, A, Fut>(self, action: A) -> Vec<T>
    where
        A: FnMut(PeerHandle) -> Fut,
        Fut: Future<Output = T>,
    {
        let mut slots: Vec<Option<T>> = iter::repeat_with(|| None).take(self.len()).collect();
        self.drive(action, |index, output| slots[index] = Some(output))
            .await;

        // Every slot is filled exactly once before `drive` returns.
        slots.into_iter().flatten().collect()
    }

    /// Runs `action` once per live element, discarding the outputs.
    pub async fn each<A, Fut>(self, action: A)
    where
        A: FnMut(PeerHandle) -> Fut,
        Fut: Future,
    {
        self.drive(action, |_, _| {}).await;
    }

    /// [`Traversal::map`], handing the ordered outputs to `on_complete`.
    pub async fn map_then<T, A, Fut, C>(self, action: A, on_complete: C)
    where
        A: FnMut(PeerHandle) -> Fut,
        Fut: Future<Output = T>,
        C: FnOnce(Vec<T>),
    {
        on_complete(self.map(action).await);
    }

    /// [`Traversal::each`], calling `on_complete` once the last action is done.
    pub async fn each_then<A, Fut, C>(self, action: A, on_complete: C)
    where
        A: FnMut(PeerHandle) -> Fut,
        Fut: Future,
        C: FnOnce(),
    {
        self.each(action).await;
        on_complete();
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            skip_all,
            fields(workers = self.pending.len(), concurrency = self.concurrency.get())
        )
    )]
    async fn drive<A, Fut, F>(self, mut action: A, mut complete: F)
    where
        A: FnMut(PeerHandle) -> Fut,
        Fut: Future,
        F: FnMut(usize, Fut::Output),
    {
        let Self {
            factory,
            pending,
            concurrency,
        } = self;
        let ceiling = concurrency.get();
        let mut queue = pending.into_iter().enumerate();
        let mut in_flight = FuturesUnordered::new();

        loop {
            // Refill freed slots in filtered order.
            while in_flight.len() < ceiling {
                let Some((index, params)) = queue.next() else {
                    break;
                };
                let handle = factory.worker_handle(params);

                #[cfg(feature = "tracing")]
                tracing::trace!("Dispatching element {index} to {}", handle.address());

                let fut = action(handle);
                in_flight.push(async move { (index, fut.await) });
            }

            match in_flight.next().await {
                Some((index, output)) => {
                    #[cfg(feature = "tracing")]
                    tracing::trace!("Element {index} done ({} in flight)", in_flight.len());

                    complete(index, output);
                }
                None => break,
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!("Traversal complete");
    }
}
