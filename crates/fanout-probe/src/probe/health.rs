//! Health checks fanned out over the registry's live workers.
//!
//! Every worker gets one `grpc.health.v1.Health/Check` call, issued through
//! the handler's bounded traversal. A failing worker only marks its own row in
//! the report; the remaining checks carry on.

use anyhow::{Context, anyhow};
use fanout::{Handler, JobRegistry, PeerHandle};
use serde::Serialize;
use std::{fmt::Write as _, time::Instant};
use tonic::Request;
use tonic_health::pb::{
    HealthCheckRequest, health_check_response::ServingStatus, health_client::HealthClient,
};

/// Outcome of checking a single peer.
#[derive(Clone, Debug, Serialize)]
pub struct PeerReport {
    pub role: String,
    pub address: String,
    pub status: Option<String>,
    pub error: Option<String>,
    pub elapsed_ms: f64,
}

impl PeerReport {
    pub fn is_serving(&self) -> bool {
        self.status.as_deref() == Some(ServingStatus::Serving.as_str_name())
    }
}

/// Results for the coordinator (if requested) and every live worker, the
/// latter in registry order.
#[derive(Clone, Debug, Serialize)]
pub struct ProbeReport {
    pub coordinator: Option<PeerReport>,
    pub workers: Vec<PeerReport>,
}

impl ProbeReport {
    pub fn peers(&self) -> impl Iterator<Item = &PeerReport> {
        self.coordinator.iter().chain(&self.workers)
    }

    /// Number of peers that are not serving.
    pub fn failures(&self) -> usize {
        self.peers().filter(|peer| !peer.is_serving()).count()
    }

    pub fn render_table(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:<12} | {:<32} | {:<12} | {:>10} | {}",
            "Role", "Address", "Status", "Time (ms)", "Error"
        );
        let _ = writeln!(out, "{}", "-".repeat(84));
        for peer in self.peers() {
            let _ = writeln!(
                out,
                "{:<12} | {:<32} | {:<12} | {:>10.2} | {}",
                peer.role,
                peer.address,
                peer.status.as_deref().unwrap_or("-"),
                peer.elapsed_ms,
                peer.error.as_deref().unwrap_or(""),
            );
        }
        out
    }
}

/// Checks one peer and records the outcome, never failing itself.
pub async fn check_peer(peer: PeerHandle, service: &str) -> PeerReport {
    let start = Instant::now();
    let outcome = check_status(&peer, service).await;
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

    #[cfg(feature = "tracing")]
    match &outcome {
        Ok(status) => tracing::debug!(
            "{} {} is {}",
            peer.role(),
            peer.address(),
            status.as_str_name()
        ),
        Err(e) => tracing::warn!("{} {} failed: {e:#}", peer.role(), peer.address()),
    }

    let (status, error) = match outcome {
        Ok(status) => (Some(status.as_str_name().to_string()), None),
        Err(e) => (None, Some(format!("{e:#}"))),
    };

    PeerReport {
        role: peer.role().to_string(),
        address: peer.address().to_string(),
        status,
        error,
        elapsed_ms,
    }
}

async fn check_status(peer: &PeerHandle, service: &str) -> anyhow::Result<ServingStatus> {
    let channel = peer.connect().await?;
    let request = peer.authorize(Request::new(HealthCheckRequest {
        service: service.to_string(),
    }))?;

    let response = HealthClient::new(channel)
        .check(request)
        .await
        .context("health check failed")?
        .into_inner();

    ServingStatus::try_from(response.status)
        .map_err(|_| anyhow!("unknown serving status {}", response.status))
}

/// Checks the coordinator (when given) and every live worker concurrently.
///
/// # Errors
///
/// Only construction problems fail the probe: a worker record without a
/// usable `url`, for instance. Unreachable peers are reported, not returned.
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all, fields(service = service)))]
pub async fn probe_peers<R: JobRegistry>(
    handler: &Handler<R>,
    coordinator: Option<&str>,
    service: &str,
) -> anyhow::Result<ProbeReport> {
    let coordinator = async {
        match coordinator {
            Some(address) => {
                let peer = handler.connect_to_coordinator(address);
                Some(check_peer(peer, service).await)
            }
            None => None,
        }
    };
    let workers = handler.map_workers(|worker| check_peer(worker, service));

    let (coordinator, workers) = tokio::join!(coordinator, workers);

    Ok(ProbeReport {
        coordinator,
        workers: workers?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fanout::{ClientOptions, WorkerRecord};
    use serde_json::json;
    use std::net::SocketAddr;
    use tokio::net::TcpListener;
    use tokio_stream::wrappers::TcpListenerStream;
    use tonic::transport::Server;
    use tonic_health::ServingStatus as ReportedStatus;

    async fn health_server(status: ReportedStatus) -> SocketAddr {
        let (reporter, service) = tonic_health::server::health_reporter();
        reporter.set_service_status("", status).await;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(
            Server::builder()
                .add_service(service)
                .serve_with_incoming(TcpListenerStream::new(listener)),
        );
        addr
    }

    fn worker(url: String, proc: serde_json::Value) -> WorkerRecord {
        WorkerRecord::default()
            .with("url", url)
            .with("token", "secret")
            .with("proc", proc)
    }

    #[tokio::test]
    async fn reports_every_live_worker_in_order() {
        let serving = health_server(ReportedStatus::Serving).await;
        let not_serving = health_server(ReportedStatus::NotServing).await;

        let records = vec![
            worker(format!("http://{serving}"), json!({"pid": 1})),
            worker("http://127.0.0.1:1".to_string(), json!({"pid": 2})),
            worker(format!("http://{serving}"), json!({})),
            worker(format!("http://{not_serving}"), json!({"pid": 3})),
        ];
        let handler = Handler::new(ClientOptions::default(), records)
            .with_concurrency(2)
            .unwrap();

        let coordinator = format!("http://{serving}");
        let report = probe_peers(&handler, Some(&coordinator), "").await.unwrap();

        let coordinator = report.coordinator.as_ref().unwrap();
        assert_eq!(coordinator.role, "coordinator");
        assert!(coordinator.is_serving());

        assert_eq!(report.workers.len(), 3);
        assert!(report.workers[0].is_serving());
        assert_eq!(report.workers[1].address, "http://127.0.0.1:1");
        assert!(report.workers[1].error.is_some());
        assert_eq!(report.workers[2].status.as_deref(), Some("NOT_SERVING"));
        assert!(report.workers.iter().all(|w| w.role == "worker"));

        assert_eq!(report.failures(), 2);
        assert!(report.render_table().contains("http://127.0.0.1:1"));
    }

    #[tokio::test]
    async fn malformed_records_fail_the_probe() {
        let records = vec![WorkerRecord::default().with("proc", json!({"pid": 1}))];
        let handler = Handler::new(ClientOptions::default(), records);

        assert!(probe_peers(&handler, None, "").await.is_err());
    }
}
