//! Bounded async queue with a single background worker
//!
//! Producers hand entries to [`AsyncQueue::send`]; one worker thread takes
//! them in FIFO order and runs the processing function. A full queue either
//! blocks the producer or drops the entry, depending on the current
//! [`OverflowPolicy`].
//!
//! Two ways to stop:
//!
//! - [`AsyncQueue::close`] stops at once. Entries still queued are discarded.
//! - [`AsyncQueue::shutdown`] stops accepting entries, lets the worker drain
//!   what is queued, and waits for it up to a deadline. Producers still
//!   blocked on a full queue are turned away. On expiry the drain keeps
//!   running in the background until the queue is closed or dropped.
//!
//! Dropping the queue behaves like `close`.

use super::{
    error::{LogdashError, Result},
    overflow_policy::{ErrorHandler, OverflowPolicy},
    queue_stats::QueueStats,
};
use crossbeam_channel::{
    bounded, select, unbounded, Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError,
};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const WORKER_THREAD_NAME: &str = "logdash-queue";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Running,
    Draining,
    Drained,
    Closed,
}

pub struct AsyncQueue<T> {
    /// Producer side; taken on close or shutdown
    entries: RwLock<Option<Sender<T>>>,
    /// Never sent on. Dropping it broadcasts "stop now" to the worker and
    /// to producers blocked on a full queue.
    stop: Mutex<Option<Sender<()>>>,
    stop_signal: Receiver<()>,
    /// Never sent on. Dropped when a shutdown starts so producers blocked on
    /// a full queue give up and release the read lock.
    accepting: Mutex<Option<Sender<()>>>,
    accepting_signal: Receiver<()>,
    /// Disconnects once the worker has exited
    finished: Receiver<()>,
    lifecycle: Mutex<Lifecycle>,
    policy: RwLock<OverflowPolicy>,
    on_error: ErrorHandler,
    stats: Arc<QueueStats>,
    capacity: Option<usize>,
}

impl<T: Send + 'static> AsyncQueue<T> {
    /// Create a queue holding at most `capacity` entries.
    ///
    /// A capacity of zero makes a rendezvous queue: an entry is accepted only
    /// while the worker is idle and waiting for one.
    ///
    /// # Errors
    ///
    /// [`LogdashError::IoError`] if the worker thread cannot be spawned.
    pub fn bounded<F>(
        capacity: usize,
        policy: OverflowPolicy,
        process: F,
        on_error: ErrorHandler,
    ) -> Result<Self>
    where
        F: FnMut(T) -> Result<()> + Send + 'static,
    {
        let (sender, receiver) = bounded(capacity);
        Self::start(sender, receiver, Some(capacity), policy, process, on_error)
    }

    /// Create a bounded queue and hand back an extra producer handle.
    ///
    /// The handle bypasses [`AsyncQueue::send`]; callers use `try_send` or
    /// `select!` on it to hand an entry over only while there is room.
    /// A graceful shutdown finishes once every such handle has been dropped.
    pub(crate) fn with_producer<F>(
        capacity: usize,
        process: F,
        on_error: ErrorHandler,
    ) -> Result<(Self, Sender<T>)>
    where
        F: FnMut(T) -> Result<()> + Send + 'static,
    {
        let (sender, receiver) = bounded(capacity);
        let producer = sender.clone();
        let queue = Self::start(
            sender,
            receiver,
            Some(capacity),
            OverflowPolicy::Block,
            process,
            on_error,
        )?;
        Ok((queue, producer))
    }

    /// Create a queue that never overflows
    ///
    /// # Errors
    ///
    /// [`LogdashError::IoError`] if the worker thread cannot be spawned.
    pub fn unbounded<F>(process: F, on_error: ErrorHandler) -> Result<Self>
    where
        F: FnMut(T) -> Result<()> + Send + 'static,
    {
        let (sender, receiver) = unbounded();
        Self::start(sender, receiver, None, OverflowPolicy::Block, process, on_error)
    }

    fn start<F>(
        sender: Sender<T>,
        receiver: Receiver<T>,
        capacity: Option<usize>,
        policy: OverflowPolicy,
        process: F,
        on_error: ErrorHandler,
    ) -> Result<Self>
    where
        F: FnMut(T) -> Result<()> + Send + 'static,
    {
        let (stop, stop_signal) = bounded::<()>(0);
        let (accepting, accepting_signal) = bounded::<()>(0);
        let (finished_guard, finished) = bounded::<()>(0);
        let stats = Arc::new(QueueStats::new());

        let worker = Worker {
            entries: receiver,
            stop: stop_signal.clone(),
            process,
            on_error: Arc::clone(&on_error),
            stats: Arc::clone(&stats),
            finished: finished_guard,
        };
        thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || worker.run())?;

        Ok(Self {
            entries: RwLock::new(Some(sender)),
            stop: Mutex::new(Some(stop)),
            stop_signal,
            accepting: Mutex::new(Some(accepting)),
            accepting_signal,
            finished,
            lifecycle: Mutex::new(Lifecycle::Running),
            policy: RwLock::new(policy),
            on_error,
            stats,
            capacity,
        })
    }

    /// Accept an entry for asynchronous processing.
    ///
    /// Returns immediately when there is room. On a full queue the
    /// [`OverflowPolicy`] applies: `Block` waits for space, `Drop` discards
    /// the entry, reports [`LogdashError::Overflow`] to the error handler and
    /// still returns `Ok`.
    ///
    /// # Errors
    ///
    /// [`LogdashError::AlreadyClosed`] if the queue was closed or is draining.
    pub fn send(&self, item: T) -> Result<()> {
        // Held for the whole call so a close cannot slip in between the
        // closed check and the insert.
        let entries = self.entries.read();
        let Some(sender) = entries.as_ref() else {
            return Err(LogdashError::AlreadyClosed);
        };

        match sender.try_send(item) {
            Ok(()) => {
                self.stats.record_enqueued();
                Ok(())
            }
            Err(TrySendError::Full(item)) => self.handle_overflow(sender, item),
            Err(TrySendError::Disconnected(_)) => Err(LogdashError::AlreadyClosed),
        }
    }

    fn handle_overflow(&self, sender: &Sender<T>, item: T) -> Result<()> {
        let policy = *self.policy.read();

        match policy {
            OverflowPolicy::Drop => {
                self.stats.record_dropped();
                (self.on_error)(&LogdashError::Overflow);
                Ok(())
            }
            OverflowPolicy::Block => {
                self.stats.record_block();
                select! {
                    send(sender, item) -> res => match res {
                        Ok(()) => {
                            self.stats.record_enqueued();
                            Ok(())
                        }
                        Err(_) => Err(LogdashError::AlreadyClosed),
                    },
                    recv(self.stop_signal) -> _ => Err(LogdashError::AlreadyClosed),
                    recv(self.accepting_signal) -> _ => Err(LogdashError::AlreadyClosed),
                }
            }
        }
    }

    /// Stop immediately, discarding entries that were not processed yet.
    ///
    /// Never waits for the worker. Producers blocked on a full queue are
    /// released with [`LogdashError::AlreadyClosed`]. Allowed after a
    /// shutdown that hit its deadline, to abandon the background drain.
    ///
    /// # Errors
    ///
    /// [`LogdashError::AlreadyClosed`] if the queue was already closed or
    /// fully drained by a shutdown.
    pub fn close(&self) -> Result<()> {
        {
            let mut lifecycle = self.lifecycle.lock();
            if matches!(*lifecycle, Lifecycle::Closed | Lifecycle::Drained) {
                return Err(LogdashError::AlreadyClosed);
            }
            *lifecycle = Lifecycle::Closed;
        }

        // Stop first: blocked producers hold the read lock until they see it.
        drop(self.stop.lock().take());
        drop(self.entries.write().take());
        Ok(())
    }

    /// Stop accepting entries and wait for everything queued to be processed.
    ///
    /// Producers blocked on a full queue are released with
    /// [`LogdashError::AlreadyClosed`]; their entries were never accepted.
    ///
    /// # Errors
    ///
    /// - [`LogdashError::AlreadyClosed`] if close or shutdown already happened.
    /// - [`LogdashError::DeadlineExceeded`] if the worker has not finished
    ///   within `timeout`. The worker keeps draining in the background.
    pub fn shutdown(&self, timeout: Duration) -> Result<()> {
        self.shutdown_by(Instant::now() + timeout, timeout)
    }

    pub(crate) fn shutdown_by(&self, deadline: Instant, timeout: Duration) -> Result<()> {
        {
            let mut lifecycle = self.lifecycle.lock();
            if *lifecycle != Lifecycle::Running {
                return Err(LogdashError::AlreadyClosed);
            }
            *lifecycle = Lifecycle::Draining;
        }

        // Blocked producers hold the read lock until they see this.
        drop(self.accepting.lock().take());
        match self.entries.try_write_until(deadline) {
            Some(mut entries) => drop(entries.take()),
            None => return Err(LogdashError::deadline_exceeded(timeout)),
        }

        if let Err(RecvTimeoutError::Timeout) = self.finished.recv_deadline(deadline) {
            return Err(LogdashError::deadline_exceeded(timeout));
        }

        let mut lifecycle = self.lifecycle.lock();
        if *lifecycle == Lifecycle::Draining {
            *lifecycle = Lifecycle::Drained;
        }
        Ok(())
    }

    /// Receiver that disconnects when the queue is closed
    pub(crate) fn stop_signal(&self) -> Receiver<()> {
        self.stop_signal.clone()
    }

    /// Change the overflow policy; applies from the next full-queue event
    pub fn set_overflow_policy(&self, policy: OverflowPolicy) {
        *self.policy.write() = policy;
    }

    pub fn overflow_policy(&self) -> OverflowPolicy {
        *self.policy.read()
    }

    /// `None` for an unbounded queue
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn stats(&self) -> &QueueStats {
        &self.stats
    }

    pub fn is_closed(&self) -> bool {
        *self.lifecycle.lock() != Lifecycle::Running
    }
}

struct Worker<T, F> {
    entries: Receiver<T>,
    stop: Receiver<()>,
    process: F,
    on_error: ErrorHandler,
    stats: Arc<QueueStats>,
    finished: Sender<()>,
}

impl<T, F> Worker<T, F>
where
    F: FnMut(T) -> Result<()>,
{
    fn run(self) {
        let Worker {
            entries,
            stop,
            mut process,
            on_error,
            stats,
            finished,
        } = self;

        loop {
            select! {
                recv(stop) -> _ => break,
                recv(entries) -> msg => match msg {
                    Ok(item) => {
                        // A close that raced with this receive still wins.
                        if matches!(stop.try_recv(), Err(TryRecvError::Disconnected)) {
                            break;
                        }
                        match process(item) {
                            Ok(()) => {
                                stats.record_delivered();
                            }
                            Err(err) => {
                                stats.record_failed();
                                on_error(&err);
                            }
                        }
                    }
                    // Every producer is gone and the queue is empty.
                    Err(_) => break,
                },
            }
        }

        // Waiters on `finished` must see the processing function torn down.
        drop(process);
        drop(finished);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn silent() -> ErrorHandler {
        Arc::new(|_| {})
    }

    fn counting() -> (ErrorHandler, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);
        let handler: ErrorHandler = Arc::new(move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });
        (handler, count)
    }

    /// Processing function that reports each item and waits for a release
    /// token before finishing it.
    fn gated(
    ) -> (
        impl FnMut(u32) -> Result<()> + Send + 'static,
        Receiver<u32>,
        Sender<()>,
    ) {
        let (started_tx, started_rx) = unbounded();
        let (release_tx, release_rx) = unbounded::<()>();
        let process = move |item: u32| {
            let _ = started_tx.send(item);
            let _ = release_rx.recv();
            Ok(())
        };
        (process, started_rx, release_tx)
    }

    #[test]
    fn test_processes_in_fifo_order() {
        let (seen_tx, seen_rx) = unbounded();
        let queue = AsyncQueue::bounded(
            16,
            OverflowPolicy::Block,
            move |item: u32| {
                let _ = seen_tx.send(item);
                Ok(())
            },
            silent(),
        )
        .unwrap();

        for i in 0..10 {
            queue.send(i).unwrap();
        }
        queue.shutdown(Duration::from_secs(5)).unwrap();

        let seen: Vec<u32> = seen_rx.try_iter().collect();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
        assert_eq!(queue.stats().delivered(), 10);
    }

    #[test]
    fn test_drop_policy_reports_every_overflow_without_blocking() {
        let (process, started, release) = gated();
        let (on_error, errors) = counting();
        let queue = AsyncQueue::bounded(1, OverflowPolicy::Drop, process, on_error).unwrap();

        let start = Instant::now();
        for i in 0..1000 {
            queue.send(i).unwrap();
        }
        assert!(start.elapsed() < Duration::from_secs(2));

        // One in flight at most, one in the buffer, the rest dropped.
        let stats = queue.stats();
        assert!(stats.enqueued() <= 2);
        assert_eq!(stats.enqueued() + stats.dropped(), 1000);
        assert_eq!(errors.load(Ordering::SeqCst) as u64, stats.dropped());

        drop(started);
        drop(release);
        queue.close().unwrap();
    }

    #[test]
    fn test_block_policy_delivers_everything() {
        let queue = AsyncQueue::bounded(2, OverflowPolicy::Block, |_: u32| Ok(()), silent())
            .unwrap();

        for i in 0..200 {
            queue.send(i).unwrap();
        }
        queue.shutdown(Duration::from_secs(5)).unwrap();

        assert_eq!(queue.stats().delivered(), 200);
        assert_eq!(queue.stats().dropped(), 0);
    }

    #[test]
    fn test_policy_change_applies_to_next_overflow() {
        let (process, started, release) = gated();
        let (on_error, errors) = counting();
        let queue = AsyncQueue::bounded(1, OverflowPolicy::Block, process, on_error).unwrap();

        queue.send(1).unwrap();
        started.recv_timeout(Duration::from_secs(5)).unwrap();
        queue.send(2).unwrap();

        queue.set_overflow_policy(OverflowPolicy::Drop);
        assert_eq!(queue.overflow_policy(), OverflowPolicy::Drop);
        queue.send(3).unwrap();
        assert_eq!(errors.load(Ordering::SeqCst), 1);

        drop(release);
        queue.shutdown(Duration::from_secs(5)).unwrap();
        assert_eq!(queue.stats().delivered(), 2);
    }

    #[test]
    fn test_processing_error_does_not_stop_worker() {
        let (on_error, errors) = counting();
        let queue = AsyncQueue::bounded(
            8,
            OverflowPolicy::Block,
            |item: u32| {
                if item % 2 == 0 {
                    Err(LogdashError::other("boom"))
                } else {
                    Ok(())
                }
            },
            on_error,
        )
        .unwrap();

        for i in 0..6 {
            queue.send(i).unwrap();
        }
        queue.shutdown(Duration::from_secs(5)).unwrap();

        assert_eq!(errors.load(Ordering::SeqCst), 3);
        assert_eq!(queue.stats().failed(), 3);
        assert_eq!(queue.stats().delivered(), 3);
    }

    #[test]
    fn test_close_twice_fails() {
        let queue = AsyncQueue::bounded(4, OverflowPolicy::Drop, |_: u32| Ok(()), silent())
            .unwrap();

        assert!(queue.close().is_ok());
        assert!(queue.close().unwrap_err().is_already_closed());
        assert!(queue.shutdown(Duration::from_secs(1)).unwrap_err().is_already_closed());
    }

    #[test]
    fn test_close_after_completed_shutdown_fails() {
        let queue = AsyncQueue::bounded(4, OverflowPolicy::Drop, |_: u32| Ok(()), silent())
            .unwrap();

        queue.send(1).unwrap();
        queue.shutdown(Duration::from_secs(5)).unwrap();
        assert!(queue.is_closed());
        assert!(queue.close().unwrap_err().is_already_closed());
    }

    #[test]
    fn test_send_after_close_is_rejected() {
        let (seen_tx, seen_rx) = unbounded();
        let queue = AsyncQueue::bounded(
            4,
            OverflowPolicy::Block,
            move |item: u32| {
                let _ = seen_tx.send(item);
                Ok(())
            },
            silent(),
        )
        .unwrap();

        queue.close().unwrap();
        assert!(queue.send(7).unwrap_err().is_already_closed());

        thread::sleep(Duration::from_millis(50));
        assert!(seen_rx.try_recv().is_err());
    }

    #[test]
    fn test_close_discards_queued_entries() {
        let (process, started, release) = gated();
        let queue = AsyncQueue::bounded(8, OverflowPolicy::Block, process, silent()).unwrap();

        queue.send(1).unwrap();
        started.recv_timeout(Duration::from_secs(5)).unwrap();
        for i in 2..6 {
            queue.send(i).unwrap();
        }

        queue.close().unwrap();
        drop(release);
        thread::sleep(Duration::from_millis(100));

        assert!(started.try_recv().is_err(), "queued entries must not be processed");
        assert_eq!(queue.stats().delivered(), 1);
    }

    #[test]
    fn test_close_releases_blocked_producer() {
        let (process, started, _release) = gated();
        let queue = Arc::new(
            AsyncQueue::bounded(1, OverflowPolicy::Block, process, silent()).unwrap(),
        );

        queue.send(1).unwrap();
        started.recv_timeout(Duration::from_secs(5)).unwrap();
        queue.send(2).unwrap();

        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.send(3))
        };
        thread::sleep(Duration::from_millis(50));

        let start = Instant::now();
        queue.close().unwrap();
        assert!(start.elapsed() < Duration::from_secs(1));

        let result = producer.join().unwrap();
        assert!(result.unwrap_err().is_already_closed());
    }

    #[test]
    fn test_shutdown_deadline_exceeded_keeps_draining() {
        let (process, started, release) = gated();
        let queue = AsyncQueue::bounded(8, OverflowPolicy::Block, process, silent()).unwrap();

        for i in 0..3 {
            queue.send(i).unwrap();
        }
        started.recv_timeout(Duration::from_secs(5)).unwrap();

        let err = queue.shutdown(Duration::from_millis(50)).unwrap_err();
        assert!(matches!(err, LogdashError::DeadlineExceeded { .. }));

        for _ in 0..3 {
            release.send(()).unwrap();
        }
        thread::sleep(Duration::from_millis(200));
        assert_eq!(queue.stats().delivered(), 3);

        // A hard stop is still allowed after the deadline path.
        assert!(queue.close().is_ok());
    }

    #[test]
    fn test_shutdown_turns_away_blocked_producer_and_late_sends() {
        let (process, started, release) = gated();
        let queue = Arc::new(
            AsyncQueue::bounded(1, OverflowPolicy::Block, process, silent()).unwrap(),
        );

        queue.send(1).unwrap();
        started.recv_timeout(Duration::from_secs(5)).unwrap();
        queue.send(2).unwrap();

        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.send(3))
        };
        thread::sleep(Duration::from_millis(50));

        let err = queue.shutdown(Duration::from_millis(100)).unwrap_err();
        assert!(matches!(err, LogdashError::DeadlineExceeded { .. }));
        assert!(producer.join().unwrap().unwrap_err().is_already_closed());
        assert!(queue.send(4).unwrap_err().is_already_closed());

        drop(release);
        assert!(matches!(
            queue.finished.recv_timeout(Duration::from_secs(5)),
            Err(RecvTimeoutError::Disconnected)
        ));
        assert_eq!(queue.stats().enqueued(), 2);
        assert_eq!(queue.stats().delivered(), 2);
    }

    #[test]
    fn test_producer_handle_fills_capacity_before_refusing() {
        let (process, started, release) = gated();
        let (queue, producer) = AsyncQueue::with_producer(2, process, silent()).unwrap();

        producer.try_send(1).unwrap();
        started.recv_timeout(Duration::from_secs(5)).unwrap();
        producer.try_send(2).unwrap();
        producer.try_send(3).unwrap();
        assert!(matches!(producer.try_send(4), Err(TrySendError::Full(4))));
        assert_eq!(queue.capacity(), Some(2));

        drop(release);
        drop(producer);
        queue.shutdown(Duration::from_secs(5)).unwrap();
        assert_eq!(queue.stats().delivered(), 3);
    }

    #[test]
    fn test_rendezvous_accepts_only_when_idle() {
        let (process, started, release) = gated();
        let (queue, producer) = AsyncQueue::with_producer(0, process, silent()).unwrap();

        // Give the worker time to start waiting.
        thread::sleep(Duration::from_millis(50));
        producer.try_send(1).unwrap();
        started.recv_timeout(Duration::from_secs(5)).unwrap();

        assert!(matches!(producer.try_send(2), Err(TrySendError::Full(2))));

        drop(release);
        drop(producer);
        queue.shutdown(Duration::from_secs(5)).unwrap();
    }
}
