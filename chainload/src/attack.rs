//! Issuing requests on a paced schedule.
use crate::pacer::Pacer;
use async_channel::{Receiver, Sender};
use chainload_core::{AttackResult, Method, Target};
use futures_util::Stream;
use reqwest::header::CONTENT_TYPE;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use time::OffsetDateTime;
use tokio::time::Instant;
#[allow(unused_imports)]
use tracing::{debug, error, info, trace, warn};

/// Hands out each buffered target exactly once, in buffer order.
#[derive(Debug, Clone)]
pub struct StaticTargets {
    targets: Arc<Vec<Target>>,
    next: usize,
}

impl StaticTargets {
    pub fn new(targets: Vec<Target>) -> Self {
        Self {
            targets: Arc::new(targets),
            next: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn next_target(&mut self) -> Option<Target> {
        let target = self.targets.get(self.next).cloned();
        if target.is_some() {
            self.next += 1;
        }
        target
    }
}

/// Fires targets for a fixed duration at the cadence of a [`Pacer`].
#[derive(Clone)]
pub struct Attacker {
    client: reqwest::Client,
    pacer: Arc<dyn Pacer>,
    duration: Duration,
}

impl Attacker {
    pub fn new(client: reqwest::Client, pacer: Arc<dyn Pacer>, duration: Duration) -> Self {
        Self {
            client,
            pacer,
            duration,
        }
    }

    /// Lazily attacks with `targets`. Nothing is sent before the returned stream is first
    /// polled.
    pub fn attack(&self, targets: StaticTargets, label: &str) -> AttackStream {
        let (tx, rx) = async_channel::unbounded();
        let driver = drive(self.clone(), targets, Arc::from(label), tx);
        AttackStream {
            driver: Some(Box::pin(driver)),
            results: rx,
        }
    }
}

/// Results of one attack, in completion order. Ends once the attack is over and every in-flight
/// request has finished.
#[pin_project::pin_project]
pub struct AttackStream {
    driver: Option<Pin<Box<dyn Future<Output = ()> + Send>>>,
    #[pin]
    results: Receiver<AttackResult>,
}

impl Stream for AttackStream {
    type Item = AttackResult;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        // The schedule belongs to the driver, not to whoever consumes the results.
        if let Some(driver) = this.driver.take() {
            tokio::spawn(driver);
        }
        this.results.poll_next(cx)
    }
}

async fn drive(
    attacker: Attacker,
    mut targets: StaticTargets,
    label: Arc<str>,
    tx: Sender<AttackResult>,
) {
    info!(
        "Attack {label} starting with {} targets for {:?}",
        targets.len(),
        attacker.duration
    );

    let began = Instant::now();
    let mut hits = 0u64;
    loop {
        let elapsed = began.elapsed();
        if elapsed >= attacker.duration {
            break;
        }

        let (wait, stop) = attacker.pacer.pace(elapsed, hits);
        if stop {
            warn!("Pacer stopped attack {label} after {hits} hits");
            break;
        }

        // The tick slept for is always fired, even if it lands on the end of the run.
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }

        let Some(target) = targets.next_target() else {
            debug!("Attack {label} ran out of targets after {hits} hits");
            break;
        };

        let seq = hits;
        hits += 1;

        let client = attacker.client.clone();
        let hit_label = label.clone();
        let results = tx.clone();
        tokio::spawn(async move {
            let result = hit(&client, target, &hit_label, seq).await;
            if results.send(result).await.is_err() {
                trace!("Result receiver dropped");
            }
        });

        if tx.is_closed() {
            debug!("Attack {label} abandoned by consumer");
            break;
        }
    }

    info!("Attack {label} issued {hits} hits in {:?}", began.elapsed());
}

async fn hit(client: &reqwest::Client, target: Target, attack: &str, seq: u64) -> AttackResult {
    let mut result = AttackResult {
        attack: attack.to_string(),
        seq,
        timestamp: OffsetDateTime::now_utc(),
        latency: Duration::ZERO,
        status_code: 0,
        body: String::new(),
        bytes_in: 0,
        bytes_out: target.body_len(),
        error: String::new(),
    };

    let mut request = match target.method {
        Method::Get => client.get(&target.url),
        Method::Post => client.post(&target.url),
    };
    if let Some(body) = target.body {
        request = request.header(CONTENT_TYPE, "application/json").body(body);
    }

    let start = Instant::now();
    match request.send().await {
        Ok(response) => {
            let status = response.status();
            result.status_code = status.as_u16();
            match response.bytes().await {
                Ok(bytes) => {
                    result.bytes_in = bytes.len() as u64;
                    result.body = String::from_utf8_lossy(&bytes).into_owned();
                }
                Err(err) => result.error = err.to_string(),
            }
            if !status.is_success() && result.error.is_empty() {
                result.error = status.to_string();
            }
        }
        Err(err) => result.error = err.to_string(),
    }
    result.latency = start.elapsed();

    #[cfg(feature = "metrics")]
    record(&result);

    result
}

#[cfg(feature = "metrics")]
fn record(result: &AttackResult) {
    let attack = result.attack.clone();
    ::metrics::counter!("chainload_requests_total", "attack" => attack.clone()).increment(1);
    if !result.is_success() {
        ::metrics::counter!("chainload_errors_total", "attack" => attack.clone()).increment(1);
    }
    ::metrics::histogram!("chainload_latency", "attack" => attack)
        .record(result.latency.as_secs_f64());
}
