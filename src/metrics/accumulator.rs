//! Per-name coalescing worker
//!
//! Sits between the dispatcher and the sender. While the sender is busy,
//! updates for the name are merged into one pending entry, so at most one
//! entry per name is ever waiting.
//!
//! States:
//!
//! - **Idle**: an incoming entry is handed to the sender if it is ready right
//!   now, otherwise it becomes the pending entry.
//! - **Accumulating**: the worker waits on two events at once. A new entry is
//!   merged into the pending one; the sender accepting the pending entry
//!   returns the worker to idle.
//!
//! The worker exits when its input is closed and nothing is pending, or when
//! the sender goes away.

use crate::core::MetricEntry;
use crossbeam_channel::{select, Receiver, Sender, TrySendError};
use std::ops::ControlFlow;

pub(crate) struct Accumulator {
    input: Receiver<MetricEntry>,
    output: Sender<MetricEntry>,
    /// Disconnects when the sending stage is closed
    stop: Receiver<()>,
    pending: Option<MetricEntry>,
    input_open: bool,
}

impl Accumulator {
    pub(crate) fn new(
        input: Receiver<MetricEntry>,
        output: Sender<MetricEntry>,
        stop: Receiver<()>,
    ) -> Self {
        Self {
            input,
            output,
            stop,
            pending: None,
            input_open: true,
        }
    }

    pub(crate) fn run(mut self) {
        while self.step().is_continue() {}
    }

    fn step(&mut self) -> ControlFlow<()> {
        match self.pending.take() {
            None if self.input_open => self.idle(),
            None => ControlFlow::Break(()),
            Some(pending) if self.input_open => self.accumulating(pending),
            Some(pending) => self.flush(pending),
        }
    }

    fn idle(&mut self) -> ControlFlow<()> {
        select! {
            recv(self.input) -> msg => match msg {
                Ok(entry) => match self.output.try_send(entry) {
                    Ok(()) => ControlFlow::Continue(()),
                    Err(TrySendError::Full(entry)) => {
                        self.pending = Some(entry);
                        ControlFlow::Continue(())
                    }
                    Err(TrySendError::Disconnected(_)) => ControlFlow::Break(()),
                },
                Err(_) => ControlFlow::Break(()),
            },
            recv(self.stop) -> _ => ControlFlow::Break(()),
        }
    }

    fn accumulating(&mut self, mut pending: MetricEntry) -> ControlFlow<()> {
        // `pending` is only moved into the send arm if that arm is selected.
        let offered = pending.clone();
        select! {
            recv(self.input) -> msg => {
                match msg {
                    Ok(entry) => pending.merge(entry),
                    Err(_) => self.input_open = false,
                }
                self.pending = Some(pending);
                ControlFlow::Continue(())
            }
            send(self.output, offered) -> res => match res {
                Ok(()) => ControlFlow::Continue(()),
                Err(_) => ControlFlow::Break(()),
            },
            recv(self.stop) -> _ => ControlFlow::Break(()),
        }
    }

    /// Input is closed: hand over the last value and exit
    fn flush(&mut self, pending: MetricEntry) -> ControlFlow<()> {
        select! {
            send(self.output, pending) -> _ => {},
            recv(self.stop) -> _ => {},
        }
        ControlFlow::Break(())
    }
}
