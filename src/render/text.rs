use super::Renderer;
use crate::{MetricKind, ResultEntry, Result, SampledResult, Value};
use chrono::{DateTime, Local};
use std::io::Write;

pub const DEFAULT_PRECISION: usize = 3;

/// Plain text output, one line per entry:
///
/// ```text
/// 12:00:01 network.interface.in.bytes [eth0] 500.000
/// ```
pub struct TextRenderer<W> {
    writer: W,
    precision: usize,
    clamp_negative: bool,
}

impl<W: Write> TextRenderer<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            precision: DEFAULT_PRECISION,
            clamp_negative: false,
        }
    }

    /// Decimal places for floating point values.
    pub fn precision(mut self, precision: usize) -> Self {
        self.precision = precision;
        self
    }

    /// Show negative counter rates, such as after a counter reset, as zero.
    pub fn clamp_negative(mut self, clamp: bool) -> Self {
        self.clamp_negative = clamp;
        self
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn value(&self, entry: &ResultEntry) -> Value {
        match entry.value {
            Value::Float(v)
                if self.clamp_negative
                    && v < 0.0
                    && entry.kind == MetricKind::Counter
                    && !entry.absolute =>
            {
                Value::Float(0.0)
            }
            ref value => value.clone(),
        }
    }
}

impl<W: Write> Renderer for TextRenderer<W> {
    fn render(&mut self, result: &SampledResult) -> Result<()> {
        let time = DateTime::<Local>::from(result.timestamp).format("%H:%M:%S");

        if result.missed > 0 {
            writeln!(self.writer, "{time} missed {} ticks", result.missed)?;
        }

        for entry in &result.entries {
            write!(self.writer, "{time} {}", entry.metric)?;

            match (&entry.name, entry.instance) {
                (Some(name), _) => write!(self.writer, " [{name}]")?,
                (None, Some(id)) => write!(self.writer, " [#{id}]")?,
                (None, None) => {}
            }

            let value = self.value(entry);
            let precision = self.precision;
            writeln!(self.writer, " {value:.precision$}")?;
        }

        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
