use super::Renderer;
use crate::{ResultEntry, Result, SampledResult};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct Line<'a> {
    timestamp: String,
    missed: u64,
    entries: &'a [ResultEntry],
}

/// JSON lines output: one object per sample.
pub struct JsonRenderer<W> {
    writer: W,
}

impl<W: Write> JsonRenderer<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Renderer for JsonRenderer<W> {
    fn render(&mut self, result: &SampledResult) -> Result<()> {
        let line = Line {
            timestamp: DateTime::<Utc>::from(result.timestamp)
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            missed: result.missed,
            entries: &result.entries,
        };

        serde_json::to_writer(&mut self.writer, &line)?;
        self.writer.write_all(b"\n")?;

        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{InstanceId, MetricKind, Value};
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    fn test_json_lines() {
        let mut renderer = JsonRenderer::new(Vec::new());

        let mut result = SampledResult::new(
            UNIX_EPOCH + Duration::from_millis(1_700_000_000_250),
            vec![
                ResultEntry {
                    metric: "net.bytes".into(),
                    instance: Some(InstanceId(1)),
                    name: Some("eth0".into()),
                    value: Value::Float(500.0),
                    kind: MetricKind::Counter,
                    absolute: false,
                },
                ResultEntry {
                    metric: "kernel.uname.release".into(),
                    instance: None,
                    name: None,
                    value: Value::from("6.8.0"),
                    kind: MetricKind::Discrete,
                    absolute: false,
                },
            ],
        );
        result.missed = 1;

        renderer.render(&result).unwrap();
        renderer.render(&SampledResult::new(result.timestamp, vec![])).unwrap();
        renderer.flush().unwrap();

        let output = String::from_utf8(renderer.into_inner()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["timestamp"], "2023-11-14T22:13:20.250Z");
        assert_eq!(first["missed"], 1);
        assert_eq!(first["entries"][0]["metric"], "net.bytes");
        assert_eq!(first["entries"][0]["instance"], 1);
        assert_eq!(first["entries"][0]["name"], "eth0");
        assert_eq!(first["entries"][0]["value"], 500.0);
        assert_eq!(first["entries"][0]["kind"], "counter");
        assert_eq!(first["entries"][1]["instance"], serde_json::Value::Null);
        assert_eq!(first["entries"][1]["value"], "6.8.0");

        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["entries"].as_array().map(|e| e.len()), Some(0));
    }
}
