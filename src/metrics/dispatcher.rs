//! Routes metric entries to one accumulator per name
//!
//! Every distinct name costs one OS thread that lives until the pipeline
//! shuts down, so applications should keep the set of metric names small and
//! fixed. Accumulator threads run with a reduced stack to keep that cost low.

use super::accumulator::Accumulator;
use crate::core::{LogdashError, MetricEntry, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::collections::HashMap;
use std::thread::{self, JoinHandle};

/// Accumulators only merge and forward entries
const ACCUMULATOR_STACK_SIZE: usize = 64 * 1024;

struct AccumulatorHandle {
    input: Sender<MetricEntry>,
    thread: JoinHandle<()>,
}

/// Owns the name to accumulator mapping
///
/// Runs on the metrics input queue's worker thread, so routing is sequential
/// and entries for one name reach their accumulator in arrival order. The
/// per-name inputs are unbounded: routing never drops or waits.
///
/// Dropping the dispatcher closes every per-name input and waits for each
/// accumulator to hand over its last pending value.
pub(crate) struct Dispatcher {
    output: Sender<MetricEntry>,
    stop: Receiver<()>,
    workers: HashMap<String, AccumulatorHandle>,
}

impl Dispatcher {
    pub(crate) fn new(output: Sender<MetricEntry>, stop: Receiver<()>) -> Self {
        Self {
            output,
            stop,
            workers: HashMap::new(),
        }
    }

    pub(crate) fn dispatch(&mut self, entry: MetricEntry) -> Result<()> {
        if !self.workers.contains_key(&entry.name) {
            let handle = self.spawn(&entry.name)?;
            self.workers.insert(entry.name.clone(), handle);
        }

        match self.workers.get(&entry.name) {
            Some(worker) => worker
                .input
                .send(entry)
                .map_err(|_| LogdashError::AlreadyClosed),
            None => Err(LogdashError::AlreadyClosed),
        }
    }

    fn spawn(&self, name: &str) -> Result<AccumulatorHandle> {
        let (input, receiver) = unbounded();
        let accumulator = Accumulator::new(receiver, self.output.clone(), self.stop.clone());

        let thread = thread::Builder::new()
            .name(format!("logdash-metric-{}", name))
            .stack_size(ACCUMULATOR_STACK_SIZE)
            .spawn(move || accumulator.run())?;

        Ok(AccumulatorHandle { input, thread })
    }

    pub(crate) fn worker_count(&self) -> usize {
        self.workers.len()
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        // Close every input before joining so the accumulators flush concurrently
        let threads: Vec<JoinHandle<()>> = self
            .workers
            .drain()
            .map(|(_, AccumulatorHandle { input, thread })| {
                drop(input);
                thread
            })
            .collect();

        for thread in threads {
            let _ = thread.join();
        }
    }
}
