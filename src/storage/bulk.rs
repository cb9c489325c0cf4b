//! Bounded worker pool for bulk imports.
//!
//! Each `bulk_import` call builds its own pool: one dispatcher thread feeds
//! records over a bounded job channel to at most [`MAX_IMPORT_WORKERS`]
//! workers, and the calling thread collects outcomes from a bounded result
//! channel. All three block on the caller's [`Context`] alongside their
//! channels, so cancellation stops dispatch and wakes idle workers at once.
//! In-flight records are allowed to finish; nothing is interrupted
//! mid-mutation.

use std::thread;

use crossbeam_channel::{bounded, select, Receiver, Sender};
use tracing::{debug, info};

use crate::context::Context;
use crate::error::{BulkImportError, Interruption, ItemFailure, StoreError, StoreResult};
use crate::product::Product;

/// Upper bound on concurrent workers per bulk import, regardless of batch size.
pub const MAX_IMPORT_WORKERS: usize = 10;

/// Clamps a configured worker count into `1..=MAX_IMPORT_WORKERS`.
pub(crate) fn clamp_workers(workers: usize) -> usize {
    workers.clamp(1, MAX_IMPORT_WORKERS)
}

struct Job {
    index: usize,
    product: Product,
}

struct Outcome {
    index: usize,
    id: String,
    result: StoreResult<()>,
}

/// What the pool observed while running a batch.
#[derive(Debug, Default)]
pub(crate) struct PoolReport {
    /// Records whose handler returned `Ok`.
    pub succeeded: usize,
    /// Records whose handler returned `Err`.
    pub failures: Vec<ItemFailure>,
    /// Records that reached a handler.
    pub processed: usize,
    /// Set when the context stopped the batch before every record ran.
    pub interrupted: Option<Interruption>,
}

impl PoolReport {
    fn record(&mut self, outcome: Outcome) {
        self.processed += 1;
        match outcome.result {
            Ok(()) => self.succeeded += 1,
            Err(error) => self.failures.push(ItemFailure {
                index: outcome.index,
                id: outcome.id,
                error,
            }),
        }
    }
}

fn interruption_of(ctx: &Context) -> Interruption {
    match ctx.check() {
        Err(StoreError::DeadlineExceeded) => Interruption::DeadlineExceeded,
        _ => Interruption::Cancelled,
    }
}

/// Runs `handler` over every product on a bounded pool of scoped threads.
///
/// `handler` receives the record's position in the batch. The pool checks
/// `ctx` before handing a record to `handler`, so handlers need not.
pub(crate) fn run<F>(ctx: &Context, products: Vec<Product>, workers: usize, handler: F) -> PoolReport
where
    F: Fn(usize, Product) -> StoreResult<()> + Sync,
{
    let total = products.len();
    if total == 0 {
        return PoolReport::default();
    }
    let workers = clamp_workers(workers).min(total);
    debug!(records = total, workers, "starting bulk import pool");

    let (job_tx, job_rx) = bounded::<Job>(workers);
    let (result_tx, result_rx) = bounded::<Outcome>(workers);
    let handler = &handler;

    thread::scope(|scope| {
        for idx in 0..workers {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            thread::Builder::new()
                .name(format!("inventory-import-{idx}"))
                .spawn_scoped(scope, move || work(ctx, &job_rx, &result_tx, handler))
                .expect("failed to spawn import worker");
        }
        // Workers hold the only remaining clones: the result channel
        // disconnects once every worker has exited.
        drop(job_rx);
        drop(result_tx);

        thread::Builder::new()
            .name("inventory-import-dispatch".to_string())
            .spawn_scoped(scope, move || dispatch(ctx, products, &job_tx))
            .expect("failed to spawn import dispatcher");

        collect(ctx, &result_rx, total)
    })
}

fn dispatch(ctx: &Context, products: Vec<Product>, jobs: &Sender<Job>) {
    let deadline = ctx.deadline_timer();
    for (index, product) in products.into_iter().enumerate() {
        select! {
            send(jobs, Job { index, product }) -> sent => {
                if sent.is_err() {
                    return;
                }
            }
            recv(ctx.cancelled()) -> _ => return,
            recv(deadline) -> _ => return,
        }
    }
}

fn work<F>(ctx: &Context, jobs: &Receiver<Job>, results: &Sender<Outcome>, handler: &F)
where
    F: Fn(usize, Product) -> StoreResult<()> + Sync,
{
    let deadline = ctx.deadline_timer();
    loop {
        let job = select! {
            recv(jobs) -> job => match job {
                Ok(job) => job,
                Err(_) => return,
            },
            recv(ctx.cancelled()) -> _ => return,
            recv(deadline) -> _ => return,
        };
        // A job can win the select after the context fired.
        if ctx.is_done() {
            return;
        }

        let id = job.product.id.to_string();
        let result = handler(job.index, job.product);
        let outcome = Outcome {
            index: job.index,
            id,
            result,
        };
        if results.send(outcome).is_err() {
            return;
        }
    }
}

fn collect(ctx: &Context, results: &Receiver<Outcome>, total: usize) -> PoolReport {
    let deadline = ctx.deadline_timer();
    let mut report = PoolReport::default();
    let mut observed = None;

    while report.processed < total {
        select! {
            recv(results) -> outcome => match outcome {
                Ok(outcome) => report.record(outcome),
                Err(_) => break,
            },
            recv(ctx.cancelled()) -> _ => {
                observed = Some(Interruption::Cancelled);
                break;
            }
            recv(deadline) -> _ => {
                observed = Some(Interruption::DeadlineExceeded);
                break;
            }
        }
    }

    // Drain until every worker has exited: workers never block on a full
    // result channel, and records that finished are still reported.
    for outcome in results.iter() {
        report.record(outcome);
    }

    if report.processed < total {
        report.interrupted = Some(observed.unwrap_or_else(|| interruption_of(ctx)));
    }
    report
}

/// Turns the counts of a finished batch into the caller-facing result.
pub(crate) fn conclude(
    total: usize,
    imported: usize,
    processed: usize,
    failures: Vec<ItemFailure>,
    interrupted: Option<Interruption>,
    persist: Option<StoreError>,
) -> StoreResult<usize> {
    let skipped = total.saturating_sub(processed);
    info!(
        records = total,
        imported,
        failed = failures.len(),
        skipped,
        interrupted = interrupted.is_some(),
        "bulk import finished"
    );

    if failures.is_empty() && interrupted.is_none() {
        return match persist {
            Some(err) => Err(err),
            None => Ok(imported),
        };
    }
    Err(StoreError::Bulk(BulkImportError::new(
        failures,
        imported,
        skipped,
        interrupted,
        persist,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    use crate::error::ErrorKind;

    fn batch(n: usize) -> Vec<Product> {
        (0..n)
            .map(|i| Product::new(format!("p-{i:03}"), format!("Item {i}"), 1.0, 1, "bulk"))
            .collect()
    }

    #[test]
    fn every_record_reaches_the_handler_once() {
        let seen = Mutex::new(HashSet::new());
        let report = run(&Context::background(), batch(250), MAX_IMPORT_WORKERS, |index, product| {
            assert!(seen.lock().unwrap().insert(index));
            assert_eq!(product.id.as_str(), format!("p-{index:03}"));
            Ok(())
        });
        assert_eq!(report.succeeded, 250);
        assert_eq!(report.processed, 250);
        assert!(report.failures.is_empty());
        assert!(report.interrupted.is_none());
    }

    #[test]
    fn concurrency_never_exceeds_the_cap() {
        let active = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        let report = run(&Context::background(), batch(100), 50, |_, _| {
            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(2));
            active.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        });
        assert_eq!(report.processed, 100);
        assert!(peak.load(Ordering::SeqCst) <= MAX_IMPORT_WORKERS);
    }

    #[test]
    fn small_batches_use_fewer_workers() {
        let threads = Mutex::new(HashSet::new());
        run(&Context::background(), batch(3), MAX_IMPORT_WORKERS, |_, _| {
            let name = std::thread::current().name().map(str::to_string);
            threads.lock().unwrap().insert(name);
            std::thread::sleep(Duration::from_millis(5));
            Ok(())
        });
        assert!(threads.lock().unwrap().len() <= 3);
    }

    #[test]
    fn handler_errors_are_collected_per_item() {
        let report = run(&Context::background(), batch(20), 4, |index, product| {
            if index % 5 == 0 {
                Err(StoreError::duplicate(product.id.as_str()))
            } else {
                Ok(())
            }
        });
        assert_eq!(report.succeeded, 16);
        assert_eq!(report.failures.len(), 4);
        let mut indexes: Vec<_> = report.failures.iter().map(|f| f.index).collect();
        indexes.sort_unstable();
        assert_eq!(indexes, vec![0, 5, 10, 15]);
        assert!(report.failures.iter().all(|f| f.error.kind() == ErrorKind::Duplicate));
    }

    #[test]
    fn cancellation_mid_batch_stops_dispatch() {
        let ctx = Context::background();
        let calls = AtomicUsize::new(0);
        let report = run(&ctx, batch(500), 2, |_, _| {
            if calls.fetch_add(1, Ordering::SeqCst) == 10 {
                ctx.cancel();
            }
            std::thread::sleep(Duration::from_millis(1));
            Ok(())
        });
        assert_eq!(report.interrupted, Some(Interruption::Cancelled));
        assert!(report.processed < 500);
        assert_eq!(report.processed, calls.load(Ordering::SeqCst));
    }

    #[test]
    fn deadline_mid_batch_reports_deadline() {
        let ctx = Context::with_timeout(Duration::from_millis(30));
        let started = Instant::now();
        let report = run(&ctx, batch(1000), 2, |_, _| {
            std::thread::sleep(Duration::from_millis(5));
            Ok(())
        });
        assert_eq!(report.interrupted, Some(Interruption::DeadlineExceeded));
        assert!(report.processed < 1000);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn conclude_shapes_results() {
        assert_eq!(conclude(3, 3, 3, Vec::new(), None, None).unwrap(), 3);

        let err = conclude(3, 3, 3, Vec::new(), None, Some(StoreError::config("disk full"))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);

        let failures = vec![ItemFailure {
            index: 1,
            id: "x".into(),
            error: StoreError::duplicate("x"),
        }];
        let err = conclude(5, 2, 3, failures, Some(Interruption::Cancelled), None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        let bulk = err.as_bulk().unwrap();
        assert_eq!(bulk.skipped(), 2);
        assert_eq!(bulk.imported(), 2);
        assert_eq!(bulk.failures().len(), 1);
    }
}
