//! Per-operation wall-clock statistics.
//!
//! Enabled via `[development] statistics = true`.  Each timed section
//! accumulates total duration and invocation count; the aggregate is printed
//! by the scheduler at the end of a run.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Mutex;
use std::time::Instant;

#[derive(Default, Clone, Copy)]
struct Entry {
    total_us: u128,
    count: u64,
}

/// Accumulates named timing samples.
#[derive(Default)]
pub struct TimingAggregator {
    entries: Mutex<BTreeMap<String, Entry>>,
}

impl TimingAggregator {
    pub fn new() -> TimingAggregator {
        TimingAggregator::default()
    }

    /// Run `f`, recording its wall-clock duration under `name`.
    pub fn time<R>(&self, name: &str, f: impl FnOnce() -> R) -> R {
        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed().as_micros();
        let mut entries = self.entries.lock().expect("TimingAggregator: poisoned");
        let entry = entries.entry(name.to_string()).or_default();
        entry.total_us += elapsed;
        entry.count += 1;
        result
    }
}

impl fmt::Display for TimingAggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.lock().expect("TimingAggregator: poisoned");
        writeln!(f, "{:<24} {:>12} {:>8} {:>12}", "operation", "total [ms]", "calls", "mean [us]")?;
        for (name, e) in entries.iter() {
            let mean = if e.count > 0 { e.total_us / e.count as u128 } else { 0 };
            writeln!(
                f,
                "{:<24} {:>12.3} {:>8} {:>12}",
                name,
                e.total_us as f64 / 1000.0,
                e.count,
                mean
            )?;
        }
        Ok(())
    }
}

/// Time `f` when an aggregator is present, run it plainly otherwise.
pub fn maybe_time<R>(agg: Option<&TimingAggregator>, name: &str, f: impl FnOnce() -> R) -> R {
    match agg {
        Some(agg) => agg.time(name, f),
        None => f(),
    }
}
