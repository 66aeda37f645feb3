//! Streaming transfers between device memory and host files
//!
//! Transfers move at most [`CHUNK_SIZE`] bytes per device access so that
//! arbitrarily large copies run in constant memory. The file side of every
//! transfer is owned by the transfer function and dropped on every exit path,
//! so a failing transfer never leaks an open handle.

use crate::device::{Device, VerifyReport};
use crate::error::{Error, Result};
use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Maximum bytes moved per device access
pub const CHUNK_SIZE: usize = 1024;

/// Observer for transfer progress
pub trait Progress {
    /// A transfer of `total` bytes is starting
    fn start(&mut self, total: u64);

    /// `done` bytes have been transferred so far
    fn advance(&mut self, done: u64);

    /// The transfer completed
    fn finish(&mut self);
}

/// Progress observer that ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn start(&mut self, _total: u64) {}
    fn advance(&mut self, _done: u64) {}
    fn finish(&mut self) {}
}

/// Outcome of a completed transfer
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TransferReport {
    /// Device address the transfer started at
    pub address: u32,
    /// Bytes moved
    pub bytes: u32,
}

/// State of one in-flight transfer
struct TransferJob {
    address: u32,
    transferred: u32,
    buffer: Vec<u8>,
}

impl TransferJob {
    fn new(address: u32) -> Self {
        Self {
            address,
            transferred: 0,
            buffer: vec![0u8; CHUNK_SIZE],
        }
    }

    fn advance(&mut self, len: usize) {
        self.address = self.address.wrapping_add(len as u32);
        self.transferred += len as u32;
    }
}

/// Copy `count` bytes of device memory at `address` into a new file at `path`
pub fn read_to_file(
    device: &mut dyn Device,
    address: u32,
    count: u32,
    path: &Path,
    progress: &mut dyn Progress,
) -> Result<TransferReport> {
    let file = File::create(path).map_err(|source| Error::FileOpen {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!(
        "Reading {} bytes from 0x{:08x} into {}",
        count,
        address,
        path.display()
    );
    read_to_writer(device, address, count, file, progress)
}

/// Copy `count` bytes of device memory at `address` into `sink`
///
/// Each chunk is handed to the sink in a single write; a sink that accepts
/// fewer bytes fails the transfer with [`Error::FileShort`].
pub fn read_to_writer<W: Write>(
    device: &mut dyn Device,
    address: u32,
    count: u32,
    mut sink: W,
    progress: &mut dyn Progress,
) -> Result<TransferReport> {
    let mut job = TransferJob::new(address);
    progress.start(count as u64);

    while job.transferred < count {
        let len = (count - job.transferred).min(CHUNK_SIZE as u32) as usize;
        let chunk = &mut job.buffer[..len];
        device.read(job.address, chunk)?;

        let written = write_once(&mut sink, chunk)?;
        if written != len {
            return Err(Error::FileShort {
                expected: len,
                written,
            });
        }

        log::trace!("Copied {} bytes from 0x{:08x}", len, job.address);
        job.advance(len);
        progress.advance(job.transferred as u64);
    }

    sink.flush().map_err(Error::file_io)?;
    progress.finish();

    Ok(TransferReport {
        address,
        bytes: job.transferred,
    })
}

/// Copy the contents of the file at `path` to device memory at `address`
pub fn write_from_file(
    device: &mut dyn Device,
    address: u32,
    path: &Path,
    progress: &mut dyn Progress,
) -> Result<TransferReport> {
    let file = File::open(path).map_err(|source| Error::FileOpen {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!("Writing {} to 0x{:08x}", path.display(), address);
    write_from_reader(device, address, file, progress)
}

/// Copy everything in `source` to device memory at `address`
///
/// The size is measured up front by seeking to the end. A source that turns
/// out shorter than measured ends the transfer early without error.
pub fn write_from_reader<R: Read + Seek>(
    device: &mut dyn Device,
    address: u32,
    mut source: R,
    progress: &mut dyn Progress,
) -> Result<TransferReport> {
    let size = measure(&mut source)?;
    let span = u32::try_from(size)
        .map_err(|_| Error::OutOfRange(format!("File size {}", size)))?;
    crate::args::check_span(address, span)?;

    let mut job = TransferJob::new(address);
    let mut position = 0u64;
    progress.start(size);

    while position < size {
        let want = (size - position).min(CHUNK_SIZE as u64) as usize;
        let len = read_once(&mut source, &mut job.buffer[..want])?;
        if len == 0 {
            log::warn!(
                "File ended after {} of {} measured bytes",
                position,
                size
            );
            break;
        }

        device.write(job.address, &job.buffer[..len])?;
        log::trace!("Copied {} bytes to 0x{:08x}", len, job.address);
        job.advance(len);
        position += len as u64;
        progress.advance(position);
    }

    progress.finish();

    Ok(TransferReport {
        address,
        bytes: job.transferred,
    })
}

/// Compare the file at `path` with device memory at `address`
pub fn verify_against_file(
    device: &mut dyn Device,
    address: u32,
    path: &Path,
    progress: &mut dyn Progress,
) -> Result<VerifyReport> {
    let file = File::open(path).map_err(|source| Error::FileOpen {
        path: path.to_path_buf(),
        source,
    })?;
    verify_against_reader(device, address, file, progress)
}

/// Compare everything in `source` with device memory at `address`
pub fn verify_against_reader<R: Read + Seek>(
    device: &mut dyn Device,
    address: u32,
    mut source: R,
    progress: &mut dyn Progress,
) -> Result<VerifyReport> {
    let size = measure(&mut source)?;
    let span = u32::try_from(size)
        .map_err(|_| Error::OutOfRange(format!("File size {}", size)))?;
    crate::args::check_span(address, span)?;

    let mut job = TransferJob::new(address);
    let mut target = vec![0u8; CHUNK_SIZE];
    let mut report = VerifyReport::default();
    progress.start(size);

    while (job.transferred as u64) < size {
        let want = (size - job.transferred as u64).min(CHUNK_SIZE as u64) as usize;
        let len = read_once(&mut source, &mut job.buffer[..want])?;
        if len == 0 {
            break;
        }

        device.read(job.address, &mut target[..len])?;
        for (offset, (expected, actual)) in job.buffer[..len].iter().zip(&target[..len]).enumerate() {
            if expected != actual {
                report.mismatches += 1;
                report
                    .first_mismatch
                    .get_or_insert(job.address.wrapping_add(offset as u32));
            }
        }

        job.advance(len);
        progress.advance(job.transferred as u64);
    }

    report.bytes = job.transferred;
    progress.finish();
    Ok(report)
}

fn measure<S: Seek>(source: &mut S) -> Result<u64> {
    let size = source.seek(SeekFrom::End(0)).map_err(Error::file_io)?;
    source.rewind().map_err(Error::file_io)?;
    Ok(size)
}

fn read_once<R: Read>(source: &mut R, buf: &mut [u8]) -> Result<usize> {
    loop {
        match source.read(buf) {
            Ok(n) => return Ok(n),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::file_io(e)),
        }
    }
}

fn write_once<W: Write>(sink: &mut W, buf: &[u8]) -> Result<usize> {
    loop {
        match sink.write(buf) {
            Ok(n) => return Ok(n),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::file_io(e)),
        }
    }
}
