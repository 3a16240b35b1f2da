//! 동시 작업 큐 -- 아이템당 최대 1회 처리 보장
//!
//! [`WorkQueue`]는 보강 패스마다 새로 만들어지는 범용 작업 큐입니다.
//! 같은 identity([`Identify::id`])를 가진 아이템은 큐 인스턴스 수명 동안
//! 단 한 번만 처리됩니다. 핸들러가 처리 도중 큐에 새 아이템을 제출할 수
//! 있으며(전이 의존성 발견), 버퍼가 무제한이므로 이 재제출이 워커 풀을
//! 교착시키지 않습니다.
//!
//! # 수명 주기
//!
//! ```text
//! new(concurrency, handler) → add(item)* → start() → add(item)* → wait() → stop()
//! ```
//!
//! - [`add`](WorkQueue::add)는 동기 호출이며 절대 블록하지 않습니다.
//! - [`wait`](WorkQueue::wait)는 in-flight 카운터가 0이 될 때까지 대기합니다.
//! - [`stop`](WorkQueue::stop)은 취소 토큰으로 워커를 내리고 합류합니다.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use depscan_core::extension::BoxFuture;
use depscan_core::metrics as m;
use depscan_core::types::Identify;

use crate::error::ScanEngineError;

/// 작업 아이템 핸들러
///
/// 첫 인자로 큐 자신을 받아, 처리 도중 발견한 후속 아이템을
/// [`WorkQueue::add`]로 재제출할 수 있습니다.
pub type QueueHandler<T> = Arc<
    dyn for<'a> Fn(&'a WorkQueue<T>, T) -> BoxFuture<'a, Result<(), ScanEngineError>>
        + Send
        + Sync,
>;

/// 아이템당 최대 1회 처리를 보장하는 동시 작업 큐
pub struct WorkQueue<T: Identify + Clone + Send + 'static> {
    /// 워커 태스크 수
    concurrency: usize,
    /// 아이템 제출 채널 (무제한)
    tx: mpsc::UnboundedSender<T>,
    /// 워커들이 공유하는 수신단
    rx: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<T>>>,
    /// 이 인스턴스에 한 번이라도 들어온 identity 집합
    seen: Mutex<HashSet<String>>,
    /// 제출되었지만 아직 처리가 끝나지 않은 아이템 수
    in_flight: AtomicUsize,
    /// in-flight가 0이 될 때 깨어나는 알림
    idle: Notify,
    /// 전체 큐 취소 토큰
    cancel: CancellationToken,
    /// 아이템 핸들러
    handler: QueueHandler<T>,
    /// 워커 태스크 핸들
    workers: Mutex<Vec<JoinHandle<()>>>,
    /// start() 중복 호출 방지
    started: AtomicBool,
}

impl<T: Identify + Clone + Send + 'static> WorkQueue<T> {
    /// 새 작업 큐를 생성합니다. 워커는 [`start`](Self::start) 전까지 뜨지 않습니다.
    pub fn new(concurrency: usize, handler: QueueHandler<T>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            concurrency,
            tx,
            rx: Arc::new(tokio::sync::Mutex::new(rx)),
            seen: Mutex::new(HashSet::new()),
            in_flight: AtomicUsize::new(0),
            idle: Notify::new(),
            cancel: CancellationToken::new(),
            handler,
            workers: Mutex::new(Vec::new()),
            started: AtomicBool::new(false),
        }
    }

    /// 아이템을 큐에 제출합니다.
    ///
    /// 같은 identity가 이미 제출된 적이 있으면 아무것도 하지 않고
    /// `false`를 반환합니다. 제출에 성공하면 `true`.
    pub fn add(&self, item: T) -> bool {
        let id = item.id();

        {
            let mut seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());
            if !seen.insert(id) {
                metrics::counter!(m::QUEUE_ITEMS_DEDUPED_TOTAL).increment(1);
                return false;
            }
        }

        self.in_flight.fetch_add(1, Ordering::AcqRel);
        metrics::counter!(m::QUEUE_ITEMS_ADMITTED_TOTAL).increment(1);
        metrics::gauge!(m::QUEUE_IN_FLIGHT).increment(1.0);

        if self.tx.send(item).is_err() {
            // 수신단이 이미 닫힘 (stop 이후 제출)
            tracing::warn!("work queue channel closed, dropping item");
            self.finish_one();
            return false;
        }

        true
    }

    /// 워커 태스크를 띄웁니다.
    ///
    /// # Errors
    ///
    /// 이미 시작된 큐에 다시 호출하면 `ScanEngineError::QueueState` 반환
    pub fn start(self: &Arc<Self>) -> Result<(), ScanEngineError> {
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(ScanEngineError::QueueState(
                "work queue already started".to_owned(),
            ));
        }

        let mut workers = self.workers.lock().unwrap_or_else(|e| e.into_inner());
        for worker_id in 0..self.concurrency {
            let queue = Arc::clone(self);
            workers.push(tokio::spawn(async move {
                queue.worker_loop(worker_id).await;
            }));
        }

        tracing::debug!(concurrency = self.concurrency, "work queue started");
        Ok(())
    }

    /// 워커 본체: 채널에서 아이템을 꺼내 핸들러를 실행합니다.
    async fn worker_loop(self: Arc<Self>, worker_id: usize) {
        loop {
            let item = tokio::select! {
                _ = self.cancel.cancelled() => break,
                item = Self::next_item(&self.rx) => item,
            };

            let Some(item) = item else {
                break;
            };

            let item_id = item.id();
            if let Err(err) = (self.handler)(self.as_ref(), item).await {
                metrics::counter!(m::QUEUE_HANDLER_FAILURES_TOTAL).increment(1);
                tracing::warn!(worker_id, item_id = %item_id, error = %err, "work item handler failed");
            }

            self.finish_one();
        }

        tracing::trace!(worker_id, "work queue worker exited");
    }

    /// 다음 아이템을 수신합니다. 수신단 뮤텍스는 recv 동안만 점유됩니다.
    async fn next_item(rx: &tokio::sync::Mutex<mpsc::UnboundedReceiver<T>>) -> Option<T> {
        rx.lock().await.recv().await
    }

    /// 아이템 하나의 처리 종료를 기록하고, in-flight가 0이면 대기자를 깨웁니다.
    fn finish_one(&self) {
        let previous = self.in_flight.fetch_sub(1, Ordering::AcqRel);
        metrics::gauge!(m::QUEUE_IN_FLIGHT).decrement(1.0);
        if previous == 1 {
            self.idle.notify_waiters();
        }
    }

    /// 제출된 모든 아이템(재제출 포함)의 처리가 끝날 때까지 대기합니다.
    pub async fn wait(&self) {
        loop {
            // 알림 future를 카운터 확인 전에 만들어 notify 유실을 막습니다
            let notified = self.idle.notified();
            if self.in_flight.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.await;
        }
    }

    /// 워커를 취소하고 전부 합류할 때까지 대기합니다.
    pub async fn stop(&self) {
        self.cancel.cancel();

        let handles = {
            let mut workers = self.workers.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *workers)
        };
        for handle in handles {
            if let Err(err) = handle.await {
                tracing::warn!(error = %err, "work queue worker join failed");
            }
        }

        tracing::debug!("work queue stopped");
    }

    /// 아직 처리가 끝나지 않은 아이템 수를 반환합니다.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::AtomicU32;

    /// 이름이 곧 identity인 테스트 아이템
    #[derive(Debug, Clone)]
    struct Job {
        name: String,
        depth: u32,
    }

    impl Job {
        fn new(name: &str) -> Self {
            Self {
                name: name.to_owned(),
                depth: 0,
            }
        }
    }

    impl Identify for Job {
        fn id(&self) -> String {
            self.name.clone()
        }
    }

    fn counting_handler(counter: Arc<AtomicU32>) -> QueueHandler<Job> {
        Arc::new(move |_queue, _job| {
            let counter = Arc::clone(&counter);
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        })
    }

    #[tokio::test]
    async fn processes_each_item_once() {
        let counter = Arc::new(AtomicU32::new(0));
        let queue = Arc::new(WorkQueue::new(2, counting_handler(Arc::clone(&counter))));

        assert!(queue.add(Job::new("a")));
        assert!(queue.add(Job::new("b")));
        // 같은 identity 재제출은 거부
        assert!(!queue.add(Job::new("a")));

        queue.start().unwrap();
        queue.wait().await;
        queue.stop().await;

        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn dedup_survives_processing() {
        // 이미 처리가 끝난 아이템도 다시 제출할 수 없다
        let counter = Arc::new(AtomicU32::new(0));
        let queue = Arc::new(WorkQueue::new(1, counting_handler(Arc::clone(&counter))));

        queue.add(Job::new("a"));
        queue.start().unwrap();
        queue.wait().await;

        assert!(!queue.add(Job::new("a")));
        queue.wait().await;
        queue.stop().await;

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn handler_can_resubmit_without_deadlock() {
        // 핸들러가 자기 큐에 후속 아이템을 제출해도 (무제한 버퍼) 진행된다
        let counter = Arc::new(AtomicU32::new(0));
        let handler_counter = Arc::clone(&counter);
        let handler: QueueHandler<Job> = Arc::new(move |queue, job| {
            let counter = Arc::clone(&handler_counter);
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
                if job.depth < 3 {
                    queue.add(Job {
                        name: format!("{}/child", job.name),
                        depth: job.depth + 1,
                    });
                }
                Ok(())
            })
        });

        // 워커 1개: 재제출이 블록하면 여기서 영영 멈춘다
        let queue = Arc::new(WorkQueue::new(1, handler));
        queue.add(Job::new("root"));
        queue.start().unwrap();
        queue.wait().await;
        queue.stop().await;

        // root, root/child, root/child/child, root/child/child/child
        assert_eq!(counter.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn handler_error_does_not_kill_worker() {
        let counter = Arc::new(AtomicU32::new(0));
        let handler_counter = Arc::clone(&counter);
        let handler: QueueHandler<Job> = Arc::new(move |_queue, job| {
            let counter = Arc::clone(&handler_counter);
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
                if job.name == "bad" {
                    return Err(ScanEngineError::QueueState("boom".to_owned()));
                }
                Ok(())
            })
        });

        let queue = Arc::new(WorkQueue::new(1, handler));
        queue.add(Job::new("bad"));
        queue.add(Job::new("good"));
        queue.start().unwrap();
        queue.wait().await;
        queue.stop().await;

        // 실패한 아이템 뒤의 아이템도 처리된다
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn wait_returns_immediately_when_empty() {
        let queue = Arc::new(WorkQueue::new(2, counting_handler(Arc::new(AtomicU32::new(0)))));
        queue.start().unwrap();
        queue.wait().await;
        queue.stop().await;
    }

    #[tokio::test]
    async fn double_start_is_rejected() {
        let queue = Arc::new(WorkQueue::new(1, counting_handler(Arc::new(AtomicU32::new(0)))));
        queue.start().unwrap();
        assert!(matches!(
            queue.start(),
            Err(ScanEngineError::QueueState(_))
        ));
        queue.stop().await;
    }

    #[tokio::test]
    async fn concurrent_workers_drain_many_items() {
        let counter = Arc::new(AtomicU32::new(0));
        let queue = Arc::new(WorkQueue::new(8, counting_handler(Arc::clone(&counter))));

        for i in 0..200 {
            assert!(queue.add(Job::new(&format!("job-{i}"))));
        }
        queue.start().unwrap();
        queue.wait().await;
        queue.stop().await;

        assert_eq!(counter.load(Ordering::SeqCst), 200);
        assert_eq!(queue.in_flight(), 0);
    }

    #[tokio::test]
    async fn add_before_start_is_buffered() {
        let counter = Arc::new(AtomicU32::new(0));
        let queue = Arc::new(WorkQueue::new(2, counting_handler(Arc::clone(&counter))));

        queue.add(Job::new("a"));
        queue.add(Job::new("b"));
        assert_eq!(queue.in_flight(), 2);

        queue.start().unwrap();
        queue.wait().await;
        queue.stop().await;
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }
}
