use async_trait::async_trait;
use chrono::Local;
use clap::ValueEnum;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::error::{NetpulseError, ProbeError};
use crate::target::{ProbeOutcome, ProbeTarget};

/// 发送一次探测请求，只关心是否完成，不读取响应体
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn fetch(&self, url: Url) -> Result<(), ProbeError>;
}

/// 基于reqwest的HTTP传输
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Option<Duration>) -> Result<Self, NetpulseError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, url: Url) -> Result<(), ProbeError> {
        // 任何状态码都算完成，响应直接丢弃
        self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                ProbeError::Timeout
            } else {
                ProbeError::Request(e)
            }
        })?;
        Ok(())
    }
}

/// 上一次探测尚未结束时，新的tick如何处理
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OverlapPolicy {
    /// 照常发出新的探测
    #[default]
    Concurrent,
    /// 跳过本次tick
    Skip,
}

/// 探测器，按固定间隔探测目标
pub struct Prober<T: Transport> {
    transport: Arc<T>,
    target: ProbeTarget,
    interval: Duration,
    overlap: OverlapPolicy,
}

impl<T: Transport> Prober<T> {
    pub fn new(transport: T, target: ProbeTarget, interval: Duration, overlap: OverlapPolicy) -> Self {
        Self {
            transport: Arc::new(transport),
            target,
            interval,
            overlap,
        }
    }

    /// 按间隔持续探测，结果通过通道发送
    ///
    /// 第一次探测立即发出。`count` 为 `None` 时一直运行，直到接收方关闭。
    ///
    /// # 参数
    ///
    /// * `count`: 最多发出的探测次数
    /// * `tx`: 用于发送探测结果的通道
    pub async fn run(self, count: Option<u32>, tx: mpsc::Sender<ProbeOutcome>) {
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let in_flight = Arc::new(AtomicBool::new(false));
        let mut seq: u32 = 0;

        while count.map_or(true, |limit| seq < limit) {
            ticker.tick().await;

            if tx.is_closed() {
                // 接收方已关闭
                break;
            }

            if self.overlap == OverlapPolicy::Skip && in_flight.load(Ordering::SeqCst) {
                debug!(host = %self.target.name, "previous probe still in flight, skipping tick");
                continue;
            }

            in_flight.store(true, Ordering::SeqCst);
            let transport = Arc::clone(&self.transport);
            let target = self.target.clone();
            let flag = Arc::clone(&in_flight);
            let tx = tx.clone();

            tokio::spawn(async move {
                let outcome = measure(transport.as_ref(), &target, seq).await;
                flag.store(false, Ordering::SeqCst);
                let _ = tx.send(outcome).await;
            });

            seq = seq.wrapping_add(1);
        }
    }
}

/// 发送一次探测请求并测量耗时
///
/// # 参数
///
/// * `transport`: 实际发送请求的传输
/// * `target`: 探测目标
/// * `seq`: 探测序号
///
/// # 返回值
///
/// * `ProbeOutcome`: 成功时带有耗时，失败时带有错误
async fn measure<T: Transport>(transport: &T, target: &ProbeTarget, seq: u32) -> ProbeOutcome {
    let started_at = Local::now();
    let url = target.cache_busted(started_at.timestamp_millis());
    let start = Instant::now();

    match transport.fetch(url).await {
        Ok(()) => {
            let rtt = start.elapsed();
            debug!(seq, latency_ms = rtt.as_millis() as u64, "probe completed");
            ProbeOutcome::success(seq, started_at, rtt)
        }
        Err(e) => {
            warn!(seq, error = %e, "probe failed");
            ProbeOutcome::failure(seq, started_at, e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// 固定延迟后返回，并记录每次请求的开始时间
    struct FakeTransport {
        delay: Duration,
        fail: bool,
        calls: Arc<Mutex<Vec<(Instant, Url)>>>,
    }

    impl FakeTransport {
        fn new(delay_ms: u64, fail: bool) -> (Self, Arc<Mutex<Vec<(Instant, Url)>>>) {
            let calls = Arc::new(Mutex::new(Vec::new()));
            let transport = Self {
                delay: Duration::from_millis(delay_ms),
                fail,
                calls: Arc::clone(&calls),
            };
            (transport, calls)
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn fetch(&self, url: Url) -> Result<(), ProbeError> {
            self.calls.lock().unwrap().push((Instant::now(), url));
            time::sleep(self.delay).await;
            if self.fail {
                Err(ProbeError::Timeout)
            } else {
                Ok(())
            }
        }
    }

    fn target() -> ProbeTarget {
        ProbeTarget::parse("https://probe.example.com").unwrap()
    }

    fn offsets(start: Instant, calls: &Arc<Mutex<Vec<(Instant, Url)>>>) -> Vec<u64> {
        calls
            .lock()
            .unwrap()
            .iter()
            .map(|(at, _)| at.duration_since(start).as_millis() as u64)
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_measure_reports_elapsed_time() {
        let (transport, calls) = FakeTransport::new(42, false);

        let outcome = measure(&transport, &target(), 7).await;

        assert!(outcome.is_success());
        assert_eq!(outcome.seq, 7);
        assert_eq!(outcome.latency_ms(), Some(42));

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let url = &calls[0].1;
        assert_eq!(url.path(), "/");
        assert!(url.query().unwrap().starts_with("t="));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_probe_is_not_retried() {
        let (transport, calls) = FakeTransport::new(5, true);

        let outcome = measure(&transport, &target(), 0).await;

        assert!(!outcome.is_success());
        assert_eq!(outcome.latency_or_sentinel(), -1);
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_fires_immediately_then_every_interval() {
        let start = Instant::now();
        let (transport, calls) = FakeTransport::new(10, false);
        let prober = Prober::new(transport, target(), Duration::from_millis(3000), OverlapPolicy::Concurrent);
        let (tx, mut rx) = mpsc::channel(16);

        tokio::spawn(prober.run(Some(3), tx));

        let mut seqs = Vec::new();
        while let Some(outcome) = rx.recv().await {
            seqs.push(outcome.seq);
        }

        assert_eq!(seqs, vec![0, 1, 2]);
        assert_eq!(offsets(start, &calls), vec![0, 3000, 6000]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_policy_overlaps_slow_probes() {
        let start = Instant::now();
        let (transport, calls) = FakeTransport::new(7000, false);
        let prober = Prober::new(transport, target(), Duration::from_millis(3000), OverlapPolicy::Concurrent);
        let (tx, mut rx) = mpsc::channel(16);

        tokio::spawn(prober.run(Some(2), tx));
        while rx.recv().await.is_some() {}

        assert_eq!(offsets(start, &calls), vec![0, 3000]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_skip_policy_waits_for_in_flight_probe() {
        let start = Instant::now();
        let (transport, calls) = FakeTransport::new(7000, false);
        let prober = Prober::new(transport, target(), Duration::from_millis(3000), OverlapPolicy::Skip);
        let (tx, mut rx) = mpsc::channel(16);

        tokio::spawn(prober.run(Some(2), tx));
        let mut received = 0;
        while rx.recv().await.is_some() {
            received += 1;
        }

        assert_eq!(received, 2);
        assert_eq!(offsets(start, &calls), vec![0, 9000]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_when_receiver_closes() {
        let (transport, calls) = FakeTransport::new(1, false);
        let prober = Prober::new(transport, target(), Duration::from_millis(3000), OverlapPolicy::Concurrent);
        let (tx, mut rx) = mpsc::channel(16);

        let handle = tokio::spawn(prober.run(None, tx));
        assert!(rx.recv().await.is_some());
        drop(rx);

        handle.await.unwrap();
        assert_eq!(calls.lock().unwrap().len(), 1);
    }
}
