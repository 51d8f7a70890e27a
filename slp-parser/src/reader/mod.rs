//! Byte-level access to a replay: container detection, the raw event stream, and the
//! trailing metadata block.
//!
//! A replay is a UBJSON document of the shape `{"raw": [bytes...], "metadata": {...}}`. The
//! `raw` array is written with an optimized header (`[$U#l` + a big-endian `u32` length), so
//! the event stream always begins at byte 15. A recording that is still in progress has a
//! length of 0 in that header, and no metadata yet.
//!
//! Every read pass opens the source through `open_slp` and drops the handle when the
//! returned `SlpFile` goes out of scope.

use std::borrow::Cow;
use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;

use serde_json::Value;

use crate::Log;
use crate::errors::{Result, SlpError};
use crate::types::{Command, Event};

mod payloads;
pub mod ubjson;

use ubjson::{UbjsonError, UbjsonReader};

/// The start of a wrapped replay, up to (not including) the raw length.
const RAW_HEADER: &[u8] = b"{U\x03raw[$U#l";
const RAW_DATA_POSITION: usize = 15;
const METADATA_KEY: &str = "metadata";

/// Where replay bytes come from.
#[derive(Debug, Clone)]
pub enum SlpSource {
    File(PathBuf),
    Buffer(Vec<u8>),
}

impl TryFrom<Value> for SlpSource {
    type Error = SlpError;

    /// Accepts the tagged JSON form (`{"source": "file", "path": ...}` or
    /// `{"source": "buffer", "bytes": [...]}`). Anything else is rejected.
    fn try_from(value: Value) -> Result<Self> {
        serde_json::from_value::<crate::config::SourceConfig>(value)
            .map(Into::into)
            .map_err(|e| SlpError::InvalidSource(e.to_string()))
    }
}

/// The underlying handle for a single read pass.
#[derive(Debug)]
enum SlpHandle<'a> {
    File(File),
    Buffer(&'a [u8]),
}

impl<'a> SlpHandle<'a> {
    fn read_range(&mut self, start: usize, end: usize) -> Result<Cow<'a, [u8]>> {
        match self {
            SlpHandle::Buffer(bytes) => {
                let bytes: &'a [u8] = *bytes;
                Ok(Cow::Borrowed(&bytes[start..end]))
            },

            SlpHandle::File(file) => {
                let mut buffer = vec![0; end - start];

                file.seek(SeekFrom::Start(start as u64))
                    .map_err(|e| SlpError::ReplayIo(format!("seek to {start}: {e}")))?;
                file.read_exact(&mut buffer)
                    .map_err(|e| SlpError::ReplayIo(format!("read of {} bytes at {start}: {e}", end - start)))?;

                Ok(Cow::Owned(buffer))
            },
        }
    }
}

/// Location of the event stream inside the source, as of the moment it was opened.
#[derive(Debug, Clone, Copy)]
struct RawLayout {
    position: usize,
    /// Bytes of the event stream that are currently readable.
    available: usize,
    /// Length written in the container header; `None` for bare streams and for
    /// recordings that are still in progress.
    declared: Option<usize>,
}

/// An opened replay. Dropping it releases the file handle.
#[derive(Debug)]
pub struct SlpFile<'a> {
    handle: SlpHandle<'a>,
    size: usize,
    raw: Option<RawLayout>,
}

/// Opens `source` for a single read pass and locates the event stream.
pub fn open_slp(source: &SlpSource) -> Result<SlpFile<'_>> {
    let mut handle = match source {
        SlpSource::File(path) => {
            let file = File::open(path).map_err(|e| SlpError::ReplayIo(format!("{}: {e}", path.display())))?;
            SlpHandle::File(file)
        },

        SlpSource::Buffer(bytes) => SlpHandle::Buffer(bytes.as_slice()),
    };

    let size = match &handle {
        SlpHandle::File(file) => {
            let metadata = file.metadata().map_err(|e| SlpError::ReplayIo(e.to_string()))?;
            metadata.len() as usize
        },
        SlpHandle::Buffer(bytes) => bytes.len(),
    };

    let raw = locate_raw_data(&mut handle, size)?;

    Ok(SlpFile { handle, size, raw })
}

fn locate_raw_data(handle: &mut SlpHandle<'_>, size: usize) -> Result<Option<RawLayout>> {
    if size == 0 {
        return Ok(None);
    }

    let first = handle.read_range(0, 1)?[0];

    // A bare event stream, as produced by live mirroring, starts with the payload sizes.
    if first == u8::from(Command::EventPayloads) {
        return Ok(Some(RawLayout {
            position: 0,
            available: size,
            declared: None,
        }));
    }

    if first != b'{' {
        return Err(SlpError::ReplayParse(format!("unrecognized replay container (first byte 0x{first:02x})")));
    }

    if size < RAW_DATA_POSITION {
        return Ok(None);
    }

    let header = handle.read_range(0, RAW_DATA_POSITION)?;
    if &header[..RAW_HEADER.len()] != RAW_HEADER {
        return Err(SlpError::ReplayParse("replay does not start with a raw event array".into()));
    }

    let length_bytes: [u8; 4] = header[RAW_HEADER.len()..RAW_DATA_POSITION]
        .try_into()
        .map_err(|_| SlpError::ReplayParse("raw length is unreadable".into()))?;
    let length = u32::from_be_bytes(length_bytes) as usize;
    let remaining = size - RAW_DATA_POSITION;

    // A zero length means the recording has not been finalized yet.
    let (available, declared) = match length {
        0 => (remaining, None),
        length => (length.min(remaining), Some(length)),
    };

    Ok(Some(RawLayout {
        position: RAW_DATA_POSITION,
        available,
        declared,
    }))
}

/// Record sizes (excluding the command byte), keyed by command byte.
#[derive(Debug)]
struct PayloadSizes {
    sizes: HashMap<u8, u16>,
    /// Absolute position of the first record after the payload sizes record.
    events_start: usize,
}

/// Reads the leading `0x35` record. `Ok(None)` means it has not been fully written yet.
fn read_payload_sizes(file: &mut SlpFile<'_>, raw: RawLayout) -> Result<Option<PayloadSizes>> {
    let raw_end = raw.position + raw.available;

    if raw.available < 2 {
        return Ok(None);
    }

    let prefix = file.handle.read_range(raw.position, raw.position + 2)?;
    if prefix[0] != u8::from(Command::EventPayloads) {
        return Err(SlpError::MalformedHeader {
            position: raw.position,
            reason: format!("expected event payload sizes, found command 0x{:02x}", prefix[0]),
        });
    }

    // The size byte counts itself, followed by (command, u16 size) triples.
    let payload_size = prefix[1] as usize;
    if payload_size == 0 || (payload_size - 1) % 3 != 0 {
        return Err(SlpError::MalformedHeader {
            position: raw.position,
            reason: format!("event payload sizes record has invalid length {payload_size}"),
        });
    }

    let table_start = raw.position + 2;
    let table_end = table_start + payload_size - 1;
    if table_end > raw_end {
        return Ok(None);
    }

    let table = file.handle.read_range(table_start, table_end)?;
    let sizes = table
        .chunks_exact(3)
        .map(|entry| (entry[0], u16::from_be_bytes([entry[1], entry[2]])))
        .collect();

    Ok(Some(PayloadSizes {
        sizes,
        events_start: table_end,
    }))
}

/// Decodes records starting at `start` (or at the first event when `start` is `None` or
/// points into the header), invoking `callback` for each one with the decoded payload, or
/// `None` for commands without a decoder.
///
/// Returns the position to resume from:
///
/// - when the stream runs out mid-record, the position *before* that record, so the same
///   call can be retried once more bytes exist;
/// - when `callback` returns `true`, the position right after the record it was given.
///
/// A command byte with no entry in the payload sizes table is fatal, since the record
/// length cannot be determined.
pub fn iterate_events<F>(file: &mut SlpFile<'_>, start: Option<usize>, mut callback: F) -> Result<usize>
where
    F: FnMut(Command, Option<&Event>) -> bool,
{
    let Some(raw) = file.raw else {
        return Ok(start.unwrap_or(0));
    };

    let Some(payload_sizes) = read_payload_sizes(file, raw)? else {
        return Ok(start.unwrap_or(raw.position));
    };

    let raw_end = raw.position + raw.available;
    let mut position = start.map_or(payload_sizes.events_start, |start| start.max(payload_sizes.events_start));

    if position >= raw_end {
        return Ok(position);
    }

    let bytes = file.handle.read_range(position, raw_end)?;
    let mut offset = 0;
    let mut warned = BTreeSet::new();

    tracing::debug!(target: Log::SlpReader, position, available = bytes.len(), "Decoding events");

    while offset < bytes.len() {
        let command_byte = bytes[offset];
        let Some(&size) = payload_sizes.sizes.get(&command_byte) else {
            return Err(SlpError::MalformedHeader {
                position: position + offset,
                reason: format!("command 0x{command_byte:02x} has no known payload size"),
            });
        };

        let record_end = offset + 1 + size as usize;
        if record_end > bytes.len() {
            tracing::debug!(
                target: Log::SlpReader,
                position = position + offset,
                "Record is incomplete, waiting for more data"
            );
            break;
        }

        let command = Command::from(command_byte);
        let event = payloads::parse_event(command, &bytes[offset..record_end]);

        if let Command::Unknown(unknown) = command {
            if warned.insert(unknown) {
                tracing::warn!(target: Log::SlpReader, command = unknown, "Skipping records of an unknown command");
            }
        }

        let should_stop = callback(command, event.as_ref());
        offset = record_end;

        if should_stop {
            break;
        }
    }

    Ok(position + offset)
}

/// Reads the `metadata` object that follows the event stream. Returns `Ok(None)` for bare
/// streams and for recordings that have not been finalized.
pub fn get_metadata(file: &mut SlpFile<'_>) -> Result<Option<Value>> {
    let Some(RawLayout {
        position,
        declared: Some(declared),
        ..
    }) = file.raw
    else {
        return Ok(None);
    };

    let metadata_start = position + declared;
    if metadata_start >= file.size {
        return Ok(None);
    }

    let bytes = file.handle.read_range(metadata_start, file.size)?;
    let mut reader = UbjsonReader::new(&bytes);

    match reader.find_in_open_object(METADATA_KEY) {
        Ok(value) => Ok(value),

        Err(UbjsonError::UnexpectedEnd) => {
            tracing::debug!(target: Log::SlpReader, "Metadata is not fully written yet");
            Ok(None)
        },

        Err(error) => Err(error.into()),
    }
}
