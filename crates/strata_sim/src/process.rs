//! Cooperative testbench processes.
//!
//! A testbench process is an `async` block that receives a
//! [`ProcessContext`]. It drives inputs with [`ProcessContext::poke`], reads
//! settled values with [`ProcessContext::peek`], and suspends on the futures
//! returned by [`ProcessContext::delay`] and [`ProcessContext::tick`]. The
//! simulator polls every runnable process once per round, in registration
//! order, and settles the design between rounds.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;
use std::task::{Context, Poll, Wake, Waker};

use strata_common::Bits;
use strata_ir::DomainId;

use crate::error::SimError;
use crate::kernel::{Kernel, SettleStats};
use crate::value::{PokeValue, SignalRef};

/// The future type of a boxed testbench body.
pub type ProcessFuture = Pin<Box<dyn Future<Output = Result<(), SimError>>>>;

/// The condition a suspended process waits for.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum WaitFor {
    /// Simulated time reaches the given femtosecond timestamp.
    Time(u64),
    /// The domain's edge counter exceeds the given value.
    Tick(DomainId, u64),
}

#[derive(Debug)]
pub(crate) struct ProcessShared {
    name: String,
    waiting: Cell<Option<WaitFor>>,
}

/// A process's handle on the running simulation.
#[derive(Clone)]
pub struct ProcessContext {
    kernel: Rc<RefCell<Kernel>>,
    shared: Rc<ProcessShared>,
}

impl ProcessContext {
    /// The name the process was registered under.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Current simulated time in femtoseconds.
    pub fn now(&self) -> u64 {
        self.kernel.borrow().now().fs
    }

    /// Schedules a write to an undriven signal. It takes effect at the next
    /// settle.
    pub fn poke(&self, signal: impl SignalRef, value: impl PokeValue) -> Result<(), SimError> {
        let mut kernel = self.kernel.borrow_mut();
        let id = kernel.resolve(signal.signal_id())?;
        let bits = value.into_bits(kernel.design().signal(id).shape);
        kernel.poke(id, bits)
    }

    /// Reads a settled value.
    pub fn peek(&self, signal: impl SignalRef) -> Result<Bits, SimError> {
        self.kernel.borrow().peek(signal.signal_id())
    }

    /// Reads the low 64 bits of a settled value.
    pub fn peek_u64(&self, signal: impl SignalRef) -> Result<u64, SimError> {
        let bits = self.peek(signal)?;
        Ok(low_u64(&bits))
    }

    /// Applies pending pokes and brings the design to a fixed point without
    /// letting time pass.
    pub async fn settle(&self) -> Result<SettleStats, SimError> {
        self.kernel.borrow_mut().settle()
    }

    /// Suspends for `fs` femtoseconds. A zero delay yields to the other
    /// processes at the current time.
    pub fn delay(&self, fs: u64) -> Wait {
        let target = self.now().saturating_add(fs);
        self.wait(Ok(WaitFor::Time(target)))
    }

    /// Suspends until the next active edge of `domain`.
    pub fn tick(&self, domain: DomainId) -> Wait {
        let cond = self.kernel.borrow().edge_count(domain).map(|n| WaitFor::Tick(domain, n));
        self.wait(cond)
    }

    fn wait(&self, cond: Result<WaitFor, SimError>) -> Wait {
        Wait {
            shared: Rc::clone(&self.shared),
            kernel: Rc::clone(&self.kernel),
            state: match cond {
                Ok(cond) => WaitState::Pending { cond, registered: false },
                Err(e) => WaitState::Failed(Some(e)),
            },
        }
    }

    /// Fails the simulation with [`SimError::AssertionFailed`] unless the
    /// settled value of `signal` equals `expected`.
    pub fn assert_eq(&self, signal: impl SignalRef, expected: impl PokeValue, message: &str) -> Result<(), SimError> {
        let (actual, expected, path) = {
            let kernel = self.kernel.borrow();
            let id = kernel.resolve(signal.signal_id())?;
            let s = kernel.design().signal(id);
            (kernel.peek(id)?, expected.into_bits(s.shape), s.path.clone())
        };
        if actual == expected {
            return Ok(());
        }
        Err(SimError::AssertionFailed {
            time_fs: self.now(),
            process: self.shared.name.clone(),
            message: format!(
                "{message}: expected '{path}' to be {}, got {}",
                display_value(&expected),
                display_value(&actual)
            ),
        })
    }
}

fn low_u64(bits: &Bits) -> u64 {
    let low = if bits.width() > 64 { bits.slice(0, 64) } else { bits.clone() };
    low.to_u64().unwrap_or_default()
}

fn display_value(bits: &Bits) -> String {
    match bits.to_u64() {
        Some(v) => v.to_string(),
        None => format!("{}'b{bits}", bits.width()),
    }
}

enum WaitState {
    Pending { cond: WaitFor, registered: bool },
    Failed(Option<SimError>),
}

/// A suspension point returned by [`ProcessContext::delay`] and
/// [`ProcessContext::tick`].
///
/// Always suspends at least once, so the simulator regains control.
pub struct Wait {
    shared: Rc<ProcessShared>,
    kernel: Rc<RefCell<Kernel>>,
    state: WaitState,
}

impl Future for Wait {
    type Output = Result<(), SimError>;

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match &mut this.state {
            WaitState::Failed(err) => match err.take() {
                Some(e) => Poll::Ready(Err(e)),
                None => Poll::Ready(Ok(())),
            },
            WaitState::Pending { cond, registered } => {
                if *registered && this.kernel.borrow().wait_satisfied(*cond) {
                    this.shared.waiting.set(None);
                    Poll::Ready(Ok(()))
                } else {
                    *registered = true;
                    this.shared.waiting.set(Some(*cond));
                    Poll::Pending
                }
            }
        }
    }
}

impl Kernel {
    pub(crate) fn wait_satisfied(&self, cond: WaitFor) -> bool {
        match cond {
            WaitFor::Time(t) => self.now().fs >= t,
            WaitFor::Tick(domain, seen) => self.edge_count(domain).is_ok_and(|n| n > seen),
        }
    }
}

struct NoopWake;

impl Wake for NoopWake {
    fn wake(self: Arc<Self>) {}
}

/// A registered process and its future.
pub(crate) struct ProcessSlot {
    shared: Rc<ProcessShared>,
    future: Option<ProcessFuture>,
    started: bool,
}

impl ProcessSlot {
    pub(crate) fn new<F, Fut>(kernel: &Rc<RefCell<Kernel>>, name: &str, body: F) -> Self
    where
        F: FnOnce(ProcessContext) -> Fut,
        Fut: Future<Output = Result<(), SimError>> + 'static,
    {
        let shared = Rc::new(ProcessShared {
            name: name.to_string(),
            waiting: Cell::new(None),
        });
        let ctx = ProcessContext {
            kernel: Rc::clone(kernel),
            shared: Rc::clone(&shared),
        };
        Self {
            shared,
            future: Some(Box::pin(body(ctx))),
            started: false,
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.shared.name
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.future.is_none()
    }

    /// The timestamp this process is sleeping until, if any.
    pub(crate) fn wake_time(&self) -> Option<u64> {
        match self.shared.waiting.get() {
            Some(WaitFor::Time(t)) if self.future.is_some() => Some(t),
            _ => None,
        }
    }

    fn is_ready(&self, kernel: &Kernel) -> bool {
        if self.future.is_none() {
            return false;
        }
        match self.shared.waiting.get() {
            None => !self.started,
            Some(cond) => kernel.wait_satisfied(cond),
        }
    }
}

/// Polls every runnable process once, in registration order. Returns
/// whether any process ran.
pub(crate) fn poll_round(kernel: &Rc<RefCell<Kernel>>, slots: &mut [ProcessSlot]) -> Result<bool, SimError> {
    let waker = Waker::from(Arc::new(NoopWake));
    let mut cx = Context::from_waker(&waker);
    let mut ran = false;
    for slot in slots.iter_mut() {
        if !slot.is_ready(&kernel.borrow()) {
            continue;
        }
        let Some(future) = slot.future.as_mut() else {
            continue;
        };
        slot.started = true;
        ran = true;
        match future.as_mut().poll(&mut cx) {
            Poll::Ready(result) => {
                slot.future = None;
                tracing::debug!(process = %slot.shared.name, ok = result.is_ok(), "process finished");
                result?;
            }
            Poll::Pending => {
                if slot.shared.waiting.get().is_none() {
                    return Err(SimError::ProcessStalled {
                        process: slot.shared.name.clone(),
                    });
                }
            }
        }
    }
    Ok(ran)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_bits_of_wide_values() {
        let mut wide = Bits::new(70);
        wide.set(69, true);
        wide.set(1, true);
        assert_eq!(low_u64(&wide), 2);
        assert_eq!(low_u64(&Bits::from_u64(9, 4)), 9);
    }

    #[test]
    fn values_display_in_decimal_when_they_fit() {
        assert_eq!(display_value(&Bits::from_u64(12, 8)), "12");
        let mut wide = Bits::new(70);
        wide.set(69, true);
        assert!(display_value(&wide).starts_with("70'b1"));
    }
}
