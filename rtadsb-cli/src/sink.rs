//! Packet log sink: one `[timestamp] HEX` line per validated message.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use rtadsb_core::{Packet, PacketSink};

pub struct LogFileSink {
    file: File,
}

impl LogFileSink {
    /// Open (or create) the log file for appending.
    pub fn open(path: &Path) -> io::Result<Self> {
        Ok(LogFileSink {
            file: OpenOptions::new().create(true).append(true).open(path)?,
        })
    }
}

impl PacketSink for LogFileSink {
    fn write(&mut self, packet: &Packet) -> io::Result<()> {
        writeln!(self.file, "[{:.6}] {}", packet.timestamp, packet.message)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
