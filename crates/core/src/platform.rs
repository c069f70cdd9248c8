//! Narrow interfaces to the platform: clocks, input polling and save files.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::io::{self, Cursor, Read, Write};
use std::rc::Rc;
use std::time::Instant;

use chrono::{Datelike, Local, Timelike};

use crate::state::TimeDate;

/// Monotonic millisecond clock.
pub trait Clock {
    fn millis(&self) -> u32;
}

/// Wall-clock calendar used to date saves.
pub trait Calendar {
    fn now(&self) -> TimeDate;
}

/// Live input state, polled lazily when a condition reads an input variable.
pub trait InputSource {
    fn validate_pressed(&self) -> bool;
    fn escape_pressed(&self) -> bool;
    fn tilde_pressed(&self) -> bool;
    fn space_pressed(&self) -> bool;
}

/// Destination of a save in progress. Nothing is durable until `commit`.
pub trait SaveSink: Write {
    fn commit(self: Box<Self>) -> io::Result<()>;
}

/// Named save storage.
pub trait SaveFileManager {
    fn open_for_loading(&self, name: &str) -> io::Result<Box<dyn Read>>;
    fn open_for_saving(&self, name: &str) -> io::Result<Box<dyn SaveSink>>;
}

/// Milliseconds since the clock was created.
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn millis(&self) -> u32 {
        self.start.elapsed().as_millis() as u32
    }
}

/// Local time of the host.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemCalendar;

impl Calendar for SystemCalendar {
    fn now(&self) -> TimeDate {
        let now = Local::now();
        TimeDate {
            year: u16::try_from(now.year()).unwrap_or(0),
            month: now.month() as u8,
            day: now.day() as u8,
            hour: now.hour() as u8,
            minute: now.minute() as u8,
        }
    }
}

/// Input source with nothing pressed, for headless use.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoInput;

impl InputSource for NoInput {
    fn validate_pressed(&self) -> bool {
        false
    }

    fn escape_pressed(&self) -> bool {
        false
    }

    fn tilde_pressed(&self) -> bool {
        false
    }

    fn space_pressed(&self) -> bool {
        false
    }
}

type SharedFiles = Rc<RefCell<BTreeMap<String, Vec<u8>>>>;

/// Save files kept in memory.
#[derive(Clone, Debug, Default)]
pub struct MemorySaveFiles {
    files: SharedFiles,
}

impl MemorySaveFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.files.borrow().get(name).cloned()
    }

    pub fn insert(&self, name: &str, bytes: Vec<u8>) {
        self.files.borrow_mut().insert(name.to_string(), bytes);
    }

    pub fn names(&self) -> Vec<String> {
        self.files.borrow().keys().cloned().collect()
    }
}

struct MemorySink {
    name: String,
    buffer: Vec<u8>,
    files: SharedFiles,
}

impl Write for MemorySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SaveSink for MemorySink {
    fn commit(self: Box<Self>) -> io::Result<()> {
        let MemorySink {
            name,
            buffer,
            files,
        } = *self;
        files.borrow_mut().insert(name, buffer);
        Ok(())
    }
}

impl SaveFileManager for MemorySaveFiles {
    fn open_for_loading(&self, name: &str) -> io::Result<Box<dyn Read>> {
        let bytes = self.get(name).ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no save named '{name}'"))
        })?;
        Ok(Box::new(Cursor::new(bytes)))
    }

    fn open_for_saving(&self, name: &str) -> io::Result<Box<dyn SaveSink>> {
        Ok(Box::new(MemorySink {
            name: name.to_string(),
            buffer: Vec::new(),
            files: Rc::clone(&self.files),
        }))
    }
}
