use std::ops::Range;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crate::error::NtpError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerFailure {
    Panicked(String),
    TimedOut,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SampleOutcome<T> {
    Done(T),
    Failed(WorkerFailure),
}

/// Wall-clock limit shared by every task of one `map` call.
///
/// Tasks hold borrowed inputs, so a running task cannot be abandoned. Long loops
/// poll `expired` and return `None` to give up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    pub fn none() -> Self {
        Self(None)
    }

    pub fn after(timeout: Option<Duration>) -> Self {
        Self(timeout.map(|t| Instant::now() + t))
    }

    pub fn expired(&self) -> bool {
        self.0.is_some_and(|d| Instant::now() >= d)
    }
}

/// Runs an independent task per sample index and returns outcomes in index order.
///
/// A panic inside a task fails only that sample. A sample without a result when
/// the deadline passes is reported as timed out: it was never started, its task
/// gave up (`None`), or it finished too late.
pub trait SampleMapper {
    fn worker_count(&self) -> usize;

    fn map<T, F>(&self, n_samples: usize, task: F) -> Vec<SampleOutcome<T>>
    where
        T: Send,
        F: Fn(usize, &Deadline) -> Option<T> + Sync;
}

pub struct SerialMapper {
    timeout: Option<Duration>,
}

impl SerialMapper {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

impl SampleMapper for SerialMapper {
    fn worker_count(&self) -> usize {
        1
    }

    fn map<T, F>(&self, n_samples: usize, task: F) -> Vec<SampleOutcome<T>>
    where
        T: Send,
        F: Fn(usize, &Deadline) -> Option<T> + Sync,
    {
        let deadline = Deadline::after(self.timeout);
        (0..n_samples)
            .map(|sample| run_guarded(&task, sample, &deadline))
            .collect()
    }
}

/// Fixed-size rayon pool. Samples are split into one contiguous chunk per worker.
pub struct ThreadPoolMapper {
    pool: rayon::ThreadPool,
    workers: usize,
    timeout: Option<Duration>,
}

impl ThreadPoolMapper {
    pub fn new(workers: usize, timeout: Option<Duration>) -> Result<Self, NtpError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("kira-ntp-worker-{i}"))
            .build()
            .map_err(|e| NtpError::WorkerPool(e.to_string()))?;
        Ok(Self {
            pool,
            workers,
            timeout,
        })
    }
}

impl SampleMapper for ThreadPoolMapper {
    fn worker_count(&self) -> usize {
        self.workers
    }

    fn map<T, F>(&self, n_samples: usize, task: F) -> Vec<SampleOutcome<T>>
    where
        T: Send,
        F: Fn(usize, &Deadline) -> Option<T> + Sync,
    {
        let deadline = Deadline::after(self.timeout);
        let (tx, rx) = mpsc::channel::<(usize, SampleOutcome<T>)>();
        let task = &task;

        self.pool.scope(|scope| {
            for range in split_chunks(n_samples, self.workers) {
                let tx = tx.clone();
                scope.spawn(move |_| {
                    for sample in range {
                        let outcome = run_guarded(task, sample, &deadline);
                        if tx.send((sample, outcome)).is_err() {
                            return;
                        }
                    }
                });
            }
        });
        drop(tx);

        let mut slots: Vec<Option<SampleOutcome<T>>> = (0..n_samples).map(|_| None).collect();
        for (sample, outcome) in rx {
            slots[sample] = Some(outcome);
        }
        slots
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| {
                    SampleOutcome::Failed(WorkerFailure::Panicked("worker exited early".to_string()))
                })
            })
            .collect()
    }
}

fn run_guarded<T, F>(task: &F, sample: usize, deadline: &Deadline) -> SampleOutcome<T>
where
    F: Fn(usize, &Deadline) -> Option<T>,
{
    if deadline.expired() {
        return SampleOutcome::Failed(WorkerFailure::TimedOut);
    }
    match catch_unwind(AssertUnwindSafe(|| task(sample, deadline))) {
        Ok(Some(_)) if deadline.expired() => {
            tracing::warn!("sample {} finished after the deadline", sample);
            SampleOutcome::Failed(WorkerFailure::TimedOut)
        }
        Ok(Some(value)) => SampleOutcome::Done(value),
        Ok(None) => SampleOutcome::Failed(WorkerFailure::TimedOut),
        Err(payload) => {
            let msg = panic_message(payload.as_ref());
            tracing::error!("sample {} failed in worker: {}", sample, msg);
            SampleOutcome::Failed(WorkerFailure::Panicked(msg))
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Contiguous, disjoint ranges covering `0..n`, at most `workers` of them.
pub fn split_chunks(n: usize, workers: usize) -> Vec<Range<usize>> {
    let workers = workers.max(1).min(n.max(1));
    let base = n / workers;
    let extra = n % workers;
    let mut out = Vec::with_capacity(workers);
    let mut start = 0usize;
    for w in 0..workers {
        let len = base + usize::from(w < extra);
        if len == 0 {
            continue;
        }
        out.push(start..start + len);
        start += len;
    }
    out
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/workers.rs"]
mod tests;
