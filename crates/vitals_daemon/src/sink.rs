//! Line-oriented plot output
//!
//! Every emitted value is one line: `>` + channel name + `:` + value, the
//! format the host-side capture and plotting tools consume. Waveform
//! channels are decimated by a fixed factor; summary channels are emitted
//! on every call. `#`-prefixed comment lines carry human-readable status.

use std::collections::HashMap;
use std::io::{self, Write};

/// Plot-line sink over any writer, with independent per-channel decimation.
pub struct PlotSink<W: Write> {
    out: W,
    decimation: u32,
    counters: HashMap<&'static str, u32>,
}

impl<W: Write> PlotSink<W> {
    pub fn new(out: W, decimation: u32) -> Self {
        Self {
            out,
            decimation: decimation.max(1),
            counters: HashMap::new(),
        }
    }

    /// Emit one integer value unconditionally.
    pub fn emit_int(&mut self, name: &'static str, value: i64) -> io::Result<()> {
        writeln!(self.out, ">{}:{}", name, value)
    }

    /// Emit one fixed-decimal value unconditionally.
    pub fn emit(&mut self, name: &'static str, value: f32) -> io::Result<()> {
        writeln!(self.out, ">{}:{:.2}", name, value)
    }

    /// Emit every Nth call per channel; the rest are counted and skipped.
    pub fn emit_decimated_int(&mut self, name: &'static str, value: i64) -> io::Result<()> {
        if self.tick(name) {
            self.emit_int(name, value)
        } else {
            Ok(())
        }
    }

    /// Decimated fixed-decimal variant of [`Self::emit_decimated_int`].
    pub fn emit_decimated(&mut self, name: &'static str, value: f32) -> io::Result<()> {
        if self.tick(name) {
            self.emit(name, value)
        } else {
            Ok(())
        }
    }

    /// Human-readable status line, ignored by the plotters.
    pub fn comment(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "# {}", text)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    /// Consume the sink, returning the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn tick(&mut self, name: &'static str) -> bool {
        let counter = self.counters.entry(name).or_insert(0);
        *counter += 1;
        if *counter >= self.decimation {
            *counter = 0;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(buf: &[u8]) -> Vec<String> {
        String::from_utf8(buf.to_vec())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn line_format_is_exact() {
        let mut buf = Vec::new();
        {
            let mut sink = PlotSink::new(&mut buf, 1);
            sink.emit_int("ecg_raw", 2048).unwrap();
            sink.emit("spo2", 97.5).unwrap();
            sink.comment("STARTING").unwrap();
        }
        assert_eq!(
            lines(&buf),
            vec![">ecg_raw:2048", ">spo2:97.50", "# STARTING"]
        );
    }

    #[test]
    fn decimation_keeps_every_nth() {
        let mut buf = Vec::new();
        {
            let mut sink = PlotSink::new(&mut buf, 10);
            for i in 0..100 {
                sink.emit_decimated_int("ecg_raw", i).unwrap();
            }
        }
        let out = lines(&buf);
        assert_eq!(out.len(), 10);
        assert_eq!(out[0], ">ecg_raw:9");
        assert_eq!(out[9], ">ecg_raw:99");
    }

    #[test]
    fn channels_decimate_independently() {
        let mut buf = Vec::new();
        {
            let mut sink = PlotSink::new(&mut buf, 4);
            for i in 0..8 {
                sink.emit_decimated_int("ecg_raw", i).unwrap();
            }
            for i in 0..4 {
                sink.emit_decimated_int("ppg_ir_raw", i).unwrap();
            }
        }
        let out = lines(&buf);
        assert_eq!(
            out,
            vec![">ecg_raw:3", ">ecg_raw:7", ">ppg_ir_raw:3"]
        );
    }

    #[test]
    fn undecimated_channels_always_emit() {
        let mut buf = Vec::new();
        {
            let mut sink = PlotSink::new(&mut buf, 10);
            sink.emit("heart_rate", 75.0).unwrap();
            sink.emit("heart_rate", 76.0).unwrap();
        }
        assert_eq!(lines(&buf).len(), 2);
    }
}
