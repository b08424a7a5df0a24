use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread::{Builder, JoinHandle};

use crate::error::{ReactorError, Result};

pub const DEFAULT_WORKERS: usize = 4;

pub type Job = Box<dyn FnOnce() + Send + 'static>;

enum WorkerMessage {
    Job(Job),
    Terminate,
}

/// Offload pool for blocking collaborators.
///
/// Handler callbacks run on the reactor thread and must never block; a
/// legacy protocol handler or slow filesystem call goes here instead.
/// Jobs are dispatched round-robin across a fixed set of named worker
/// threads and the pool joins them all on drop.
pub struct BlockingPool {
    workers: Vec<Worker>,
    senders: Vec<Sender<WorkerMessage>>,
    next_worker: AtomicUsize,
}

impl Default for BlockingPool {
    fn default() -> Self {
        let capacity = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(DEFAULT_WORKERS);
        Self::new(capacity)
    }
}

impl BlockingPool {
    pub fn new(capacity: usize) -> Self {
        let mut workers = Vec::with_capacity(capacity);
        let mut senders = Vec::with_capacity(capacity);

        for id in 0..capacity {
            let (sender, receiver) = channel::<WorkerMessage>();
            workers.push(Worker::new(id, receiver));
            senders.push(sender);
        }

        Self {
            workers,
            senders,
            next_worker: AtomicUsize::new(0),
        }
    }

    pub fn dispatch<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let index = self.next_worker.fetch_add(1, Ordering::Relaxed) % self.senders.len();
        self.senders[index]
            .send(WorkerMessage::Job(Box::new(job)))
            .map_err(|_| ReactorError::WorkerGone)
    }

    pub fn workers_len(&self) -> usize {
        self.workers.len()
    }
}

impl Drop for BlockingPool {
    fn drop(&mut self) {
        for sender in &self.senders {
            let _ = sender.send(WorkerMessage::Terminate);
        }
        for worker in &mut self.workers {
            if let Some(thread) = worker.take_thread() {
                let _ = thread.join();
            }
        }
    }
}

struct Worker {
    thread: Option<JoinHandle<()>>,
}

impl Worker {
    fn new(id: usize, receiver: Receiver<WorkerMessage>) -> Self {
        let thread = Builder::new()
            .name(format!("blocking-pool-worker-{id}"))
            .spawn(move || {
                while let Ok(message) = receiver.recv() {
                    match message {
                        WorkerMessage::Job(job) => job(),
                        WorkerMessage::Terminate => break,
                    }
                }
            })
            .expect("failed to spawn blocking-pool worker");

        Self {
            thread: Some(thread),
        }
    }

    fn take_thread(&mut self) -> Option<JoinHandle<()>> {
        self.thread.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn pool_reports_capacity() {
        let pool = BlockingPool::new(4);
        assert_eq!(pool.workers_len(), 4);
    }

    #[test]
    fn jobs_run() {
        let pool = BlockingPool::new(2);
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..10 {
            let counter = counter.clone();
            pool.dispatch(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }

        std::thread::sleep(Duration::from_millis(200));
        assert_eq!(counter.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn drop_waits_for_in_flight_jobs() {
        let counter = Arc::new(AtomicUsize::new(0));
        {
            let pool = BlockingPool::new(2);
            let counter = counter.clone();
            pool.dispatch(move || {
                std::thread::sleep(Duration::from_millis(50));
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
