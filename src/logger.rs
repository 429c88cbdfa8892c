//! Measurement log output.
//!
//! Stable, line-oriented two-column format (server time, diff against the
//! probe baseline) consumed by downstream tooling, plus free-form stamp
//! rows. Diagnostics never go here; they belong to the tracing side channel.

use std::io::Write;

use anyhow::Result;

pub struct LatencyLogger<W: Write> {
    out: W,
    last_event_time: u32,
    header_written: bool,
}

impl<W: Write> LatencyLogger<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            last_event_time: 0,
            header_written: false,
        }
    }

    /// Write one measurement row: `time`, then `time` minus the current
    /// baseline. The diff is 0 while either side is unset, and signed
    /// otherwise, so an inconsistent server clock shows up as a negative
    /// value rather than being clamped. Flushed immediately; a killed
    /// process keeps every row written so far.
    pub fn log(&mut self, time: u32, text: &str) -> Result<()> {
        self.write_header()?;

        let diff = if self.last_event_time > 0 && time > 0 {
            i64::from(time) - i64::from(self.last_event_time)
        } else {
            0
        };

        writeln!(self.out, "{:>10}ms : {:>5}ms : {}", time, diff, text)?;
        self.out.flush()?;
        Ok(())
    }

    /// Write a free-form marker row, bypassing the timestamp columns.
    pub fn log_stamp(&mut self, text: &str) -> Result<()> {
        self.write_header()?;
        writeln!(self.out, "{text}")?;
        self.out.flush()?;
        Ok(())
    }

    /// Move the diff baseline. Called once per probe with the injection's
    /// synchronized timestamp, never with a notification timestamp. Zero is
    /// ignored so an unset clock cannot become the baseline.
    pub fn set_baseline(&mut self, time: u32) {
        if time > 0 {
            self.last_event_time = time;
        }
    }

    #[cfg(test)]
    pub(crate) fn last_event_time(&self) -> u32 {
        self.last_event_time
    }

    #[cfg(test)]
    pub(crate) fn writer(&self) -> &W {
        &self.out
    }

    fn write_header(&mut self) -> Result<()> {
        if self.header_written {
            return Ok(());
        }
        writeln!(self.out)?;
        writeln!(self.out, " Server Time : Diff    : Info")?;
        writeln!(self.out, "-----------------------------")?;
        self.header_written = true;
        Ok(())
    }
}
