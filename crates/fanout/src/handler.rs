//! Dispatcher-side facade tying the registry, the connection factory and the
//! fan-out engine together.

use crate::{
    Result,
    connect::{ClientOptions, ConnectionArgs, ConnectionFactory, PeerHandle},
    engine::{Concurrency, Traversal},
    record::{JobRegistry, WorkerRecord, live_records},
};
use core::future::Future;

/// Fans work out to the live workers known to a [`JobRegistry`].
///
/// Each call snapshots the registry, so workers that appear or disappear
/// between calls are picked up automatically.
#[derive(Clone, Debug)]
pub struct Handler<R> {
    factory: ConnectionFactory,
    registry: R,
    concurrency: Concurrency,
}

impl<R: JobRegistry> Handler<R> {
    pub fn new(options: ClientOptions, registry: R) -> Self {
        Self::with_factory(ConnectionFactory::new(options), registry)
    }

    pub fn with_factory(factory: ConnectionFactory, registry: R) -> Self {
        Self {
            factory,
            registry,
            concurrency: Concurrency::default(),
        }
    }

    /// Replaces the default ceiling used by [`Handler::map_workers`] and
    /// [`Handler::each_worker`].
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidConcurrency`] for zero.
    pub fn with_concurrency(mut self, concurrency: usize) -> Result<Self> {
        self.concurrency = Concurrency::new(concurrency)?;
        Ok(self)
    }

    pub fn concurrency(&self) -> Concurrency {
        self.concurrency
    }

    pub fn factory(&self) -> &ConnectionFactory {
        &self.factory
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Live workers currently known to the registry, in registry order.
    pub fn workers(&self) -> Vec<WorkerRecord> {
        live_records(self.registry.worker_records())
    }

    pub fn connect_to_coordinator(&self, address: impl Into<String>) -> PeerHandle {
        self.factory.connect_to_coordinator(address)
    }

    pub fn connect_to_worker(&self, args: impl Into<ConnectionArgs>) -> Result<PeerHandle> {
        self.factory.connect_to_worker(args)
    }

    /// A traversal over `records` (or the registry's workers when `None`),
    /// using `concurrency` (or the handler default when `None`).
    pub fn traversal(
        &self,
        records: Option<Vec<WorkerRecord>>,
        concurrency: Option<usize>,
    ) -> Result<Traversal> {
        let concurrency = match concurrency {
            Some(value) => Concurrency::new(value)?,
            None => self.concurrency,
        };
        let records = records.unwrap_or_else(|| self.registry.worker_records());

        Traversal::with_concurrency(records, self.factory.clone(), concurrency)
    }

    /// Maps `action` over every live worker, returning outputs in registry
    /// order.
    ///
    /// Construction errors are returned before any action runs.
    pub async fn map_workers<T, A, Fut>(&self, action: A) -> Result<Vec<T>>
    where
        A: FnMut(PeerHandle) -> Fut,
        Fut: Future<Output = T>,
    {
        Ok(self.traversal(None, None)?.map(action).await)
    }

    /// Runs `action` against every live worker.
    pub async fn each_worker<A, Fut>(&self, action: A) -> Result<()>
    where
        A: FnMut(PeerHandle) -> Fut,
        Fut: Future,
    {
        self.traversal(None, None)?.each(action).await;
        Ok(())
    }

    /// [`Handler::map_workers`], handing the ordered outputs to `on_complete`
    /// once the last action has finished.
    pub async fn map_workers_then<T, A, Fut, C>(&self, action: A, on_complete: C) -> Result<()>
    where
        A: FnMut(PeerHandle) -> Fut,
        Fut: Future<Output = T>,
        C: FnOnce(Vec<T>),
    {
        self.traversal(None, None)?
            .map_then(action, on_complete)
            .await;
        Ok(())
    }

    /// [`Handler::each_worker`], calling `on_complete` after the last action.
    pub async fn each_worker_then<A, Fut, C>(&self, action: A, on_complete: C) -> Result<()>
    where
        A: FnMut(PeerHandle) -> Fut,
        Fut: Future,
        C: FnOnce(),
    {
        self.traversal(None, None)?
            .each_then(action, on_complete)
            .await;
        Ok(())
    }

    /// [`Handler::map_workers`] over explicit records and ceiling.
    pub async fn map_over<T, A, Fut>(
        &self,
        records: Vec<WorkerRecord>,
        action: A,
        concurrency: usize,
    ) -> Result<Vec<T>>
    where
        A: FnMut(PeerHandle) -> Fut,
        Fut: Future<Output = T>,
    {
        Ok(self
            .traversal(Some(records), Some(concurrency))?
            .map(action)
            .await)
    }

    /// [`Handler::each_worker`] over explicit records and ceiling.
    pub async fn each_over<A, Fut>(
        &self,
        records: Vec<WorkerRecord>,
        action: A,
        concurrency: usize,
    ) -> Result<()>
    where
        A: FnMut(PeerHandle) -> Fut,
        Fut: Future,
    {
        self.traversal(Some(records), Some(concurrency))?
            .each(action)
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, Role};
    use core::time::Duration;
    use futures::FutureExt;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    /// Registry whose contents can change between calls.
    #[derive(Default)]
    struct Jobs(Mutex<Vec<WorkerRecord>>);

    impl JobRegistry for Jobs {
        fn worker_records(&self) -> Vec<WorkerRecord> {
            self.0.lock().unwrap().clone()
        }
    }

    fn job(name: &str, proc: serde_json::Value) -> WorkerRecord {
        WorkerRecord::default()
            .with("url", format!("http://{name}:7331"))
            .with("token", format!("{name}-token"))
            .with("proc", proc)
    }

    fn handler(jobs: Arc<Jobs>) -> Handler<Arc<Jobs>> {
        Handler::new(ClientOptions::default(), jobs)
    }

    #[test]
    fn workers_are_the_live_jobs() {
        let jobs = Arc::new(Jobs::default());
        *jobs.0.lock().unwrap() = vec![
            job("a", json!({"pid": 1})),
            job("b", json!({})),
            job("c", json!({"pid": 3})),
        ];

        let handler = handler(Arc::clone(&jobs));
        let urls: Vec<_> = handler
            .workers()
            .iter()
            .map(|r| r.get("url").unwrap().clone())
            .collect();
        assert_eq!(urls, [json!("http://a:7331"), json!("http://c:7331")]);

        jobs.0.lock().unwrap().push(job("d", json!({"pid": 4})));
        assert_eq!(handler.workers().len(), 3);
    }

    #[tokio::test]
    async fn map_workers_uses_the_registry_snapshot() {
        let jobs = Arc::new(Jobs::default());
        *jobs.0.lock().unwrap() = vec![
            job("a", json!({"pid": 1})),
            job("b", Default::default()),
            job("c", json!({"pid": 3})),
        ];

        let tokens = handler(jobs)
            .map_workers(|handle| async move {
                tokio::time::sleep(Duration::from_millis(1)).await;
                handle.token().unwrap().to_string()
            })
            .await
            .unwrap();
        assert_eq!(tokens, ["a-token", "c-token"]);
    }

    #[tokio::test]
    async fn each_worker_visits_live_jobs_in_order() {
        let jobs = Arc::new(Jobs::default());
        *jobs.0.lock().unwrap() = vec![
            job("a", json!({"pid": 1})),
            job("b", json!({})),
            job("c", json!("running")),
            job("d", serde_json::Value::Null),
            job("e", json!({"pid": 5})),
        ];
        let handler = handler(jobs).with_concurrency(1).unwrap();
        let seen = Mutex::new(Vec::new());
        let completions = Mutex::new(0);

        let result = handler
            .each_worker_then(
                |handle| {
                    seen.lock().unwrap().push(handle.address().to_string());
                    async {}
                },
                || *completions.lock().unwrap() += 1,
            )
            .await;

        assert_eq!(result, Ok(()));
        assert_eq!(*completions.lock().unwrap(), 1);
        assert_eq!(
            *seen.lock().unwrap(),
            ["http://a:7331", "http://c:7331", "http://e:7331"]
        );

        seen.lock().unwrap().clear();
        let result = handler
            .each_worker(|handle| {
                seen.lock().unwrap().push(handle.address().to_string());
                tokio::time::sleep(Duration::from_millis(1))
            })
            .await;

        assert_eq!(result, Ok(()));
        assert_eq!(seen.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn map_workers_then_hands_over_ordered_outputs() {
        let jobs = Arc::new(Jobs::default());
        *jobs.0.lock().unwrap() = vec![
            job("a", json!({"pid": 1})),
            job("b", json!({})),
            job("c", json!({"pid": 3})),
        ];
        let mut tokens = None;

        handler(jobs)
            .map_workers_then(
                |handle| async move { handle.token().unwrap().to_string() },
                |out| tokens = Some(out),
            )
            .await
            .unwrap();

        assert_eq!(tokens.unwrap(), ["a-token", "c-token"]);
    }

    #[test]
    fn closures_serve_as_registries() {
        let handler = Handler::new(ClientOptions::default(), || {
            vec![job("a", json!({"pid": 1})), job("b", json!({}))]
        });

        let count = handler
            .map_workers(|_handle| async {})
            .now_or_never()
            .unwrap()
            .unwrap()
            .len();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn each_over_respects_explicit_records() {
        let handler = handler(Arc::new(Jobs::default()));
        let seen = Mutex::new(Vec::new());

        handler
            .each_over(
                vec![job("x", json!("up")), job("y", json!({"pid": 2}))],
                |handle| {
                    seen.lock().unwrap().push(handle.address().to_string());
                    async {}
                },
                1,
            )
            .await
            .unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            ["http://x:7331".to_string(), "http://y:7331".to_string()]
        );
    }

    #[test]
    fn explicit_zero_ceiling_is_rejected() {
        let handler = handler(Arc::new(Jobs::default()));
        let calls = Mutex::new(0);

        let result = handler
            .map_over(
                vec![job("a", json!({"pid": 1}))],
                |_handle| {
                    *calls.lock().unwrap() += 1;
                    async {}
                },
                0,
            )
            .now_or_never()
            .unwrap();

        assert_eq!(result, Err(Error::InvalidConcurrency { value: 0 }));
        assert_eq!(*calls.lock().unwrap(), 0);

        assert!(
            Handler::new(ClientOptions::default(), Vec::<WorkerRecord>::new())
                .with_concurrency(0)
                .is_err()
        );
    }

    #[test]
    fn empty_registry_completes_immediately() {
        let handler = handler(Arc::new(Jobs::default()))
            .with_concurrency(3)
            .unwrap();
        assert_eq!(handler.concurrency().get(), 3);

        let out = handler
            .map_workers(|_handle| async {})
            .now_or_never()
            .unwrap()
            .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn connects_in_both_roles() {
        let handler = handler(Arc::new(Jobs::default()));

        let coordinator = handler.connect_to_coordinator("http://coord:7331");
        assert_eq!(coordinator.role(), Role::Coordinator);

        let worker = handler
            .connect_to_worker(("http://w:7331", "secret"))
            .unwrap();
        assert_eq!(worker.role(), Role::Worker);
        assert_eq!(worker.token(), Some("secret"));

        assert!(matches!(
            handler.connect_to_worker(crate::record::Attributes::new()),
            Err(Error::InvalidConnectionArguments { .. })
        ));
    }
}
