//! 작업 큐 벤치마크
//!
//! 큐 처리량과 중복 제거 경로의 비용을 측정합니다.

use std::sync::Arc;

use criterion::{Criterion, Throughput, criterion_group, criterion_main};

use depscan_core::types::Identify;
use depscan_scan_engine::workqueue::{QueueHandler, WorkQueue};

#[derive(Debug, Clone)]
struct Item {
    name: String,
}

impl Identify for Item {
    fn id(&self) -> String {
        self.name.clone()
    }
}

fn noop_handler() -> QueueHandler<Item> {
    Arc::new(|_queue, _item| Box::pin(async { Ok(()) }))
}

fn bench_queue_throughput(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("tokio runtime");

    let mut group = c.benchmark_group("queue_throughput");
    group.throughput(Throughput::Elements(1000));

    for concurrency in [1usize, 4, 8] {
        group.bench_function(format!("drain_1000_items_{concurrency}_workers"), |b| {
            b.iter(|| {
                rt.block_on(async {
                    let queue = Arc::new(WorkQueue::new(concurrency, noop_handler()));
                    for i in 0..1000 {
                        queue.add(Item {
                            name: format!("item-{i}"),
                        });
                    }
                    queue.start().expect("queue start");
                    queue.wait().await;
                    queue.stop().await;
                });
            });
        });
    }

    group.finish();
}

fn bench_dedup_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_dedup");
    group.throughput(Throughput::Elements(1000));

    // 이미 들어온 identity의 재제출은 동기 경로에서 거부됩니다
    group.bench_function("reject_1000_duplicates", |b| {
        b.iter_with_setup(
            || {
                let queue = WorkQueue::new(1, noop_handler());
                for i in 0..1000 {
                    queue.add(Item {
                        name: format!("item-{i}"),
                    });
                }
                queue
            },
            |queue| {
                for i in 0..1000 {
                    let admitted = queue.add(Item {
                        name: format!("item-{i}"),
                    });
                    assert!(!admitted);
                }
                queue
            },
        );
    });

    group.finish();
}

criterion_group!(benches, bench_queue_throughput, bench_dedup_path);
criterion_main!(benches);
