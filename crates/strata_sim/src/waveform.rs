//! The settled-value stream and its consumers.
//!
//! At every settle point the simulator emits one [`TraceEvent`] per signal
//! whose value differs from the value it last emitted, in signal identity
//! order. [`WaveformSink`] implementations receive that stream: the in-memory
//! [`TraceBuffer`] and the IEEE 1364 [`VcdRecorder`].

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use strata_common::{Bits, ContentHash, ContentHasher};
use strata_ir::SignalId;

use crate::error::SimError;

/// One signal change observed at a settle point.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TraceEvent {
    /// Simulated time in femtoseconds.
    pub time_fs: u64,
    /// Flat signal identity.
    pub signal: SignalId,
    /// New settled value.
    pub value: Bits,
}

/// A signal announced to sinks before any change is reported.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TracedSignal {
    /// Flat signal identity.
    pub id: SignalId,
    /// Hierarchical path, `.`-separated.
    pub path: String,
    /// Width in bits.
    pub width: u32,
}

/// A consumer of the settled-value stream.
pub trait WaveformSink {
    /// Called once when the sink is attached, with every traced signal in
    /// identity order.
    fn begin(&mut self, top: &str, signals: &[TracedSignal]) -> Result<(), SimError>;

    /// Records a change.
    fn change(&mut self, event: &TraceEvent) -> Result<(), SimError>;

    /// Flushes any buffered output. Called when the run ends.
    fn finish(&mut self) -> Result<(), SimError>;
}

/// Collects the stream in memory.
///
/// Clones share the same buffer, so one clone can be handed to the
/// simulator while another is kept for inspection.
#[derive(Clone, Debug, Default)]
pub struct TraceBuffer {
    events: Rc<RefCell<Vec<TraceEvent>>>,
}

impl TraceBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of every event recorded so far.
    pub fn events(&self) -> Vec<TraceEvent> {
        self.events.borrow().clone()
    }

    /// Number of events recorded so far.
    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    /// Returns `true` if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    /// A hash over the whole stream; two runs produced the same trace if and
    /// only if (barring collisions) their digests are equal.
    pub fn digest(&self) -> ContentHash {
        digest(&self.events.borrow())
    }
}

/// Hashes a recorded stream.
pub fn digest(events: &[TraceEvent]) -> ContentHash {
    let mut hasher = ContentHasher::new();
    for e in events {
        hasher.update(&e.time_fs.to_le_bytes());
        hasher.update(&e.signal.as_raw().to_le_bytes());
        hasher.update(&e.value.width().to_le_bytes());
        hasher.update(e.value.to_string().as_bytes());
    }
    hasher.finish()
}

impl WaveformSink for TraceBuffer {
    fn begin(&mut self, _top: &str, _signals: &[TracedSignal]) -> Result<(), SimError> {
        Ok(())
    }

    fn change(&mut self, event: &TraceEvent) -> Result<(), SimError> {
        self.events.borrow_mut().push(event.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SimError> {
        Ok(())
    }
}

/// VCD (Value Change Dump) writer following IEEE 1364.
///
/// Each `.`-separated path component below the top becomes a nested
/// `$scope module`. Identifier codes are printable ASCII starting at `!`.
pub struct VcdRecorder<W: Write> {
    writer: W,
    codes: HashMap<SignalId, (String, u32)>,
    current_time: Option<u64>,
}

impl<W: Write> VcdRecorder<W> {
    /// Creates a recorder writing to `writer`.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            codes: HashMap::new(),
            current_time: None,
        }
    }

    /// Consumes the recorder, returning the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn id_code(index: usize) -> String {
        let mut code = String::new();
        let mut idx = index;
        loop {
            code.push((b'!' + (idx % 94) as u8) as char);
            idx /= 94;
            if idx == 0 {
                break;
            }
            idx -= 1;
        }
        code
    }

    fn format_value(value: &Bits) -> String {
        if value.width() == 1 {
            value.to_string()
        } else {
            format!("b{value} ")
        }
    }
}

impl<W: Write> WaveformSink for VcdRecorder<W> {
    fn begin(&mut self, top: &str, signals: &[TracedSignal]) -> Result<(), SimError> {
        writeln!(self.writer, "$version Strata simulator $end")?;
        writeln!(self.writer, "$timescale 1fs $end")?;
        writeln!(self.writer, "$scope module {top} $end")?;

        let mut ordered: Vec<(Vec<&str>, usize)> = signals
            .iter()
            .enumerate()
            .map(|(i, s)| (s.path.split('.').collect(), i))
            .collect();
        ordered.sort();

        let mut open: Vec<&str> = Vec::new();
        for (parts, index) in ordered {
            let (leaf, scopes) = parts.split_last().map(|(l, s)| (*l, s)).unwrap_or(("", &[]));
            let shared = open.iter().zip(scopes).take_while(|(a, b)| a == b).count();
            for _ in shared..open.len() {
                writeln!(self.writer, "$upscope $end")?;
            }
            open.truncate(shared);
            for scope in &scopes[shared..] {
                writeln!(self.writer, "$scope module {scope} $end")?;
                open.push(scope);
            }
            let signal = &signals[index];
            let code = Self::id_code(self.codes.len());
            writeln!(self.writer, "$var wire {} {code} {leaf} $end", signal.width)?;
            self.codes.insert(signal.id, (code, signal.width));
        }
        for _ in 0..open.len() {
            writeln!(self.writer, "$upscope $end")?;
        }
        writeln!(self.writer, "$upscope $end")?;
        writeln!(self.writer, "$enddefinitions $end")?;
        Ok(())
    }

    fn change(&mut self, event: &TraceEvent) -> Result<(), SimError> {
        let Some((code, _)) = self.codes.get(&event.signal) else {
            return Err(SimError::UnknownSignal {
                id: event.signal.as_raw(),
            });
        };
        if self.current_time != Some(event.time_fs) {
            writeln!(self.writer, "#{}", event.time_fs)?;
            self.current_time = Some(event.time_fs);
        }
        writeln!(self.writer, "{}{code}", Self::format_value(&event.value))?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SimError> {
        self.writer.flush()?;
        Ok(())
    }
}
