//! Streaming ZIP reader for EPUB containers
//!
//! Parses the central directory once, then streams individual entries on
//! demand. Supports stored and DEFLATE entries (decompressed with
//! miniz_oxide) and verifies CRC32 checksums. Only archive integrity and entry
//! lookup live here; nothing in this module knows about chapters.

use std::io::{Cursor, Read, Seek, SeekFrom, Write};

use miniz_oxide::{DataFormat, MZFlush, MZStatus};

/// Default cap on central directory entries
const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// Maximum filename length in ZIP entries
const MAX_FILENAME_LEN: usize = 1024;

/// Runtime-configurable ZIP safety limits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ZipLimits {
    /// Maximum compressed or uncompressed file size allowed for reads.
    pub max_file_read_size: usize,
    /// Maximum number of central directory entries loaded.
    pub max_entries: usize,
    /// Whether ZIP parsing should fail on strict structural issues.
    pub strict: bool,
    /// Maximum bytes scanned from file tail while searching for EOCD.
    pub max_eocd_scan: usize,
}

impl ZipLimits {
    /// Create explicit ZIP limits.
    pub fn new(max_file_read_size: usize, max_entries: usize) -> Self {
        Self {
            max_file_read_size,
            max_entries,
            strict: false,
            max_eocd_scan: MAX_EOCD_SCAN,
        }
    }

    /// Enable or disable strict ZIP parsing behavior.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Set a cap for EOCD tail scan bytes.
    pub fn with_max_eocd_scan(mut self, max_eocd_scan: usize) -> Self {
        self.max_eocd_scan = max_eocd_scan.max(EOCD_MIN_SIZE);
        self
    }
}

/// Local file header signature (little-endian)
const SIG_LOCAL_FILE_HEADER: u32 = 0x04034b50;

/// Central directory entry signature (little-endian)
const SIG_CD_ENTRY: u32 = 0x02014b50;

/// End of central directory signature (little-endian)
const SIG_EOCD: u32 = 0x06054b50;
/// ZIP64 end of central directory locator signature (little-endian)
const SIG_ZIP64_EOCD_LOCATOR: u32 = 0x07064b50;
/// Minimum EOCD record size in bytes
const EOCD_MIN_SIZE: usize = 22;
/// Maximum EOCD search window (EOCD + max comment length)
const MAX_EOCD_SCAN: usize = EOCD_MIN_SIZE + u16::MAX as usize;

/// Compression methods
const METHOD_STORED: u16 = 0;
const METHOD_DEFLATED: u16 = 8;

/// Required content of the `mimetype` entry
pub const EPUB_MIMETYPE: &str = "application/epub+zip";

// Re-export the crate's public ZIP error alias for module consumers.
pub use crate::error::ZipError;

#[derive(Clone, Copy, Debug)]
struct EocdInfo {
    cd_offset: u64,
    cd_size: u32,
    num_entries: u16,
    uses_zip64: bool,
}

/// Central directory entry metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdEntry {
    /// Compression method (0=stored, 8=deflated)
    pub method: u16,
    /// Compressed size in bytes
    pub compressed_size: u32,
    /// Uncompressed size in bytes
    pub uncompressed_size: u32,
    /// Offset to local file header
    pub local_header_offset: u32,
    /// CRC32 checksum
    pub crc32: u32,
    /// Path of the entry inside the archive
    pub filename: String,
}

/// Streaming ZIP file reader
///
/// One reader is owned by exactly one parse; it is never shared.
pub struct StreamingZip<F: Read + Seek> {
    file: F,
    entries: Vec<CdEntry>,
    limits: Option<ZipLimits>,
}

/// Open an in-memory container.
///
/// Fails with [`ZipErrorKind::NotAnArchive`](crate::error::ZipErrorKind::NotAnArchive)
/// when the bytes are not ZIP at all, and with a structural variant when the
/// archive is damaged.
pub fn open_container(
    bytes: &[u8],
    limits: Option<ZipLimits>,
) -> Result<StreamingZip<Cursor<&[u8]>>, ZipError> {
    StreamingZip::new_with_limits(Cursor::new(bytes), limits)
}

impl<F: Read + Seek> StreamingZip<F> {
    /// Open a ZIP file and parse the central directory
    pub fn new(file: F) -> Result<Self, ZipError> {
        Self::new_with_limits(file, None)
    }

    /// Open a ZIP file with explicit runtime limits.
    pub fn new_with_limits(mut file: F, limits: Option<ZipLimits>) -> Result<Self, ZipError> {
        let max_eocd_scan = limits
            .map(|l| l.max_eocd_scan.min(MAX_EOCD_SCAN))
            .unwrap_or(MAX_EOCD_SCAN);
        let eocd = match Self::find_eocd(&mut file, max_eocd_scan) {
            Ok(eocd) => eocd,
            Err(ZipError::InvalidFormat) if !Self::starts_with_local_header(&mut file)? => {
                return Err(ZipError::NotAnArchive);
            }
            Err(err) => return Err(err),
        };
        if eocd.uses_zip64 {
            return Err(ZipError::UnsupportedZip64);
        }
        let strict = limits.is_some_and(|l| l.strict);
        let max_entries = limits.map(|l| l.max_entries).unwrap_or(DEFAULT_MAX_ENTRIES);
        if eocd.num_entries as usize > max_entries {
            return Err(ZipError::TooManyEntries);
        }

        let mut entries = Vec::with_capacity(eocd.num_entries as usize);

        file.seek(SeekFrom::Start(eocd.cd_offset))
            .map_err(|_| ZipError::IoError)?;
        let cd_end = eocd.cd_offset + eocd.cd_size as u64;

        for _ in 0..eocd.num_entries {
            let pos = file.stream_position().map_err(|_| ZipError::IoError)?;
            if pos >= cd_end {
                if strict {
                    return Err(ZipError::InvalidFormat);
                }
                break;
            }
            match Self::read_cd_entry(&mut file)? {
                Some(entry) => entries.push(entry),
                None if strict => return Err(ZipError::InvalidFormat),
                None => break,
            }
        }

        if entries.len() < eocd.num_entries as usize {
            log::warn!(
                "[ZIP] Directory declares {} entries but only {} were readable",
                eocd.num_entries,
                entries.len()
            );
        }

        log::debug!(
            "[ZIP] Parsed {} central directory entries (offset {})",
            entries.len(),
            eocd.cd_offset
        );

        Ok(Self {
            file,
            entries,
            limits,
        })
    }

    /// Check the first four bytes for a local file header signature.
    fn starts_with_local_header(file: &mut F) -> Result<bool, ZipError> {
        file.seek(SeekFrom::Start(0))
            .map_err(|_| ZipError::IoError)?;
        let mut sig = [0u8; 4];
        if file.read_exact(&mut sig).is_err() {
            return Ok(false);
        }
        Ok(u32::from_le_bytes(sig) == SIG_LOCAL_FILE_HEADER)
    }

    /// Find EOCD and extract central directory info
    fn find_eocd(file: &mut F, max_eocd_scan: usize) -> Result<EocdInfo, ZipError> {
        let file_size = file.seek(SeekFrom::End(0)).map_err(|_| ZipError::IoError)?;

        if file_size < EOCD_MIN_SIZE as u64 {
            return Err(ZipError::InvalidFormat);
        }

        // Scan last (EOCD + max comment) bytes for EOCD signature.
        let scan_range = file_size.min(max_eocd_scan as u64) as usize;
        let mut buffer = vec![0u8; scan_range];

        file.seek(SeekFrom::Start(file_size - scan_range as u64))
            .map_err(|_| ZipError::IoError)?;
        file.read_exact(&mut buffer)
            .map_err(|_| ZipError::IoError)?;
        let scan_base = file_size - scan_range as u64;

        for i in (0..=scan_range.saturating_sub(EOCD_MIN_SIZE)).rev() {
            if read_u32_le(&buffer, i) != SIG_EOCD {
                continue;
            }
            let num_entries = read_u16_le(&buffer, i + 10);
            let cd_size = read_u32_le(&buffer, i + 12);
            let cd_offset = read_u32_le(&buffer, i + 16) as u64;
            let comment_len = read_u16_le(&buffer, i + 20) as u64;
            let eocd_pos = scan_base + i as u64;
            let eocd_end = eocd_pos + EOCD_MIN_SIZE as u64 + comment_len;
            if eocd_end != file_size {
                continue;
            }

            let uses_zip64_sentinel =
                num_entries == u16::MAX || cd_size == u32::MAX || cd_offset == u32::MAX as u64;
            let uses_zip64_locator = if eocd_pos >= 20 {
                file.seek(SeekFrom::Start(eocd_pos - 20))
                    .map_err(|_| ZipError::IoError)?;
                let mut locator_sig = [0u8; 4];
                file.read_exact(&mut locator_sig)
                    .map_err(|_| ZipError::IoError)?;
                u32::from_le_bytes(locator_sig) == SIG_ZIP64_EOCD_LOCATOR
            } else {
                false
            };
            if uses_zip64_sentinel || uses_zip64_locator {
                return Ok(EocdInfo {
                    cd_offset,
                    cd_size,
                    num_entries,
                    uses_zip64: true,
                });
            }

            let cd_end = cd_offset
                .checked_add(cd_size as u64)
                .ok_or(ZipError::InvalidFormat)?;
            if cd_end > eocd_pos {
                return Err(ZipError::InvalidFormat);
            }

            return Ok(EocdInfo {
                cd_offset,
                cd_size,
                num_entries,
                uses_zip64: false,
            });
        }

        Err(ZipError::InvalidFormat)
    }

    /// Read a central directory entry from file
    fn read_cd_entry(file: &mut F) -> Result<Option<CdEntry>, ZipError> {
        let mut sig_buf = [0u8; 4];
        if file.read_exact(&mut sig_buf).is_err() {
            return Ok(None);
        }
        if u32::from_le_bytes(sig_buf) != SIG_CD_ENTRY {
            return Ok(None);
        }

        // Fixed portion after the signature: buf[N] is CD offset N + 4.
        let mut buf = [0u8; 42];
        file.read_exact(&mut buf).map_err(|_| ZipError::IoError)?;

        let method = read_u16_le(&buf, 6);
        let crc32 = read_u32_le(&buf, 12);
        let compressed_size = read_u32_le(&buf, 16);
        let uncompressed_size = read_u32_le(&buf, 20);
        let name_len = read_u16_le(&buf, 24) as usize;
        let extra_len = read_u16_le(&buf, 26) as usize;
        let comment_len = read_u16_le(&buf, 28) as usize;
        let local_header_offset = read_u32_le(&buf, 38);

        let mut filename = String::new();
        if name_len > MAX_FILENAME_LEN {
            file.seek(SeekFrom::Current(name_len as i64))
                .map_err(|_| ZipError::IoError)?;
        } else if name_len > 0 {
            let mut name_buf = vec![0u8; name_len];
            file.read_exact(&mut name_buf)
                .map_err(|_| ZipError::IoError)?;
            filename = String::from_utf8_lossy(&name_buf).into_owned();
        }

        let skip_bytes = extra_len + comment_len;
        if skip_bytes > 0 {
            file.seek(SeekFrom::Current(skip_bytes as i64))
                .map_err(|_| ZipError::IoError)?;
        }

        Ok(Some(CdEntry {
            method,
            compressed_size,
            uncompressed_size,
            local_header_offset,
            crc32,
            filename,
        }))
    }

    /// Get entry by path.
    ///
    /// Exact matches win; otherwise the lookup is ASCII case-insensitive and
    /// tolerates a leading slash on either side.
    pub fn get_entry(&self, name: &str) -> Option<&CdEntry> {
        let bare = name.trim_start_matches('/');
        self.entries
            .iter()
            .find(|e| e.filename == name)
            .or_else(|| {
                self.entries
                    .iter()
                    .find(|e| e.filename.trim_start_matches('/').eq_ignore_ascii_case(bare))
            })
    }

    /// Whether an entry with this path exists.
    pub fn contains(&self, name: &str) -> bool {
        self.get_entry(name).is_some()
    }

    /// Read a whole entry by path into memory.
    pub fn read_to_vec(&mut self, name: &str) -> Result<Vec<u8>, ZipError> {
        let entry = self.get_entry(name).cloned().ok_or(ZipError::FileNotFound)?;
        let mut out = Vec::with_capacity(entry.uncompressed_size as usize);
        self.read_file_to_writer(&entry, &mut out)?;
        Ok(out)
    }

    /// Stream a file's decompressed bytes into an arbitrary writer.
    pub fn read_file_to_writer<W: Write>(
        &mut self,
        entry: &CdEntry,
        writer: &mut W,
    ) -> Result<usize, ZipError> {
        let mut input_buf = vec![0u8; 8 * 1024];
        let mut output_buf = vec![0u8; 32 * 1024];
        self.read_file_to_writer_with_scratch(entry, writer, &mut input_buf, &mut output_buf)
    }

    /// Stream a file's decompressed bytes into a writer using caller-provided scratch buffers.
    ///
    /// `input_buf` and `output_buf` must both be non-empty. For stored entries
    /// only `input_buf` is used.
    pub fn read_file_to_writer_with_scratch<W: Write>(
        &mut self,
        entry: &CdEntry,
        writer: &mut W,
        input_buf: &mut [u8],
        output_buf: &mut [u8],
    ) -> Result<usize, ZipError> {
        if input_buf.is_empty() || output_buf.is_empty() {
            return Err(ZipError::IoError);
        }
        if let Some(limits) = self.limits {
            if entry.uncompressed_size as usize > limits.max_file_read_size
                || entry.compressed_size as usize > limits.max_file_read_size
            {
                return Err(ZipError::FileTooLarge);
            }
        }

        let data_offset = self.calc_data_offset(entry)?;
        self.file
            .seek(SeekFrom::Start(data_offset))
            .map_err(|_| ZipError::IoError)?;

        let mut hasher = crc32fast::Hasher::new();
        let written = match entry.method {
            METHOD_STORED => {
                let mut remaining = entry.compressed_size as usize;
                let mut written = 0usize;

                while remaining > 0 {
                    let take = remaining.min(input_buf.len());
                    self.file
                        .read_exact(&mut input_buf[..take])
                        .map_err(|_| ZipError::IoError)?;
                    writer
                        .write_all(&input_buf[..take])
                        .map_err(|_| ZipError::IoError)?;
                    hasher.update(&input_buf[..take]);
                    written += take;
                    remaining -= take;
                }
                written
            }
            METHOD_DEFLATED => {
                let mut state = Box::new(miniz_oxide::inflate::stream::InflateState::new(
                    DataFormat::Raw,
                ));
                let mut compressed_remaining = entry.compressed_size as usize;
                let mut pending = &[][..];
                let mut written = 0usize;

                loop {
                    if pending.is_empty() && compressed_remaining > 0 {
                        let take = compressed_remaining.min(input_buf.len());
                        self.file
                            .read_exact(&mut input_buf[..take])
                            .map_err(|_| ZipError::IoError)?;
                        pending = &input_buf[..take];
                        compressed_remaining -= take;
                    }

                    let flush = if compressed_remaining == 0 {
                        MZFlush::Finish
                    } else {
                        MZFlush::None
                    };
                    let result =
                        miniz_oxide::inflate::stream::inflate(&mut state, pending, output_buf, flush);
                    let consumed = result.bytes_consumed;
                    let produced = result.bytes_written;
                    pending = &pending[consumed..];

                    if produced > 0 {
                        writer
                            .write_all(&output_buf[..produced])
                            .map_err(|_| ZipError::IoError)?;
                        hasher.update(&output_buf[..produced]);
                        written += produced;
                    }
                    if let Some(limits) = self.limits {
                        if written > limits.max_file_read_size {
                            return Err(ZipError::FileTooLarge);
                        }
                    }

                    match result.status {
                        Ok(MZStatus::StreamEnd) => {
                            if compressed_remaining != 0 || !pending.is_empty() {
                                return Err(ZipError::DecompressError);
                            }
                            break;
                        }
                        Ok(MZStatus::Ok) => {
                            if consumed == 0 && produced == 0 {
                                return Err(ZipError::DecompressError);
                            }
                        }
                        Ok(MZStatus::NeedDict) | Err(_) => return Err(ZipError::DecompressError),
                    }
                }
                written
            }
            _ => return Err(ZipError::UnsupportedCompression),
        };

        if entry.crc32 != 0 && hasher.finalize() != entry.crc32 {
            return Err(ZipError::CrcMismatch);
        }
        Ok(written)
    }

    /// Calculate the offset to the actual file data (past local header)
    fn calc_data_offset(&mut self, entry: &CdEntry) -> Result<u64, ZipError> {
        let offset = entry.local_header_offset as u64;
        self.file
            .seek(SeekFrom::Start(offset))
            .map_err(|_| ZipError::IoError)?;

        // Local file header: 30 bytes fixed + variable filename/extra
        let mut header = [0u8; 30];
        self.file
            .read_exact(&mut header)
            .map_err(|_| ZipError::InvalidFormat)?;

        if read_u32_le(&header, 0) != SIG_LOCAL_FILE_HEADER {
            return Err(ZipError::InvalidFormat);
        }

        let name_len = read_u16_le(&header, 26) as u64;
        let extra_len = read_u16_le(&header, 28) as u64;

        Ok(offset + 30 + name_len + extra_len)
    }

    /// Validate that the archive contains a valid EPUB mimetype file
    ///
    /// Checks that a file named "mimetype" exists and its content is exactly
    /// `application/epub+zip`.
    pub fn validate_mimetype(&mut self) -> Result<(), ZipError> {
        let entry = self
            .get_entry("mimetype")
            .ok_or_else(|| ZipError::InvalidMimetype("mimetype file not found in archive".into()))?
            .clone();

        if entry.uncompressed_size as usize > 256 {
            return Err(ZipError::InvalidMimetype("mimetype file too large".into()));
        }

        let mut buf = Vec::new();
        self.read_file_to_writer(&entry, &mut buf)?;

        let content = core::str::from_utf8(&buf)
            .map_err(|_| ZipError::InvalidMimetype("mimetype file is not valid UTF-8".into()))?;

        if content.trim_end() != EPUB_MIMETYPE {
            return Err(ZipError::InvalidMimetype(format!(
                "expected '{}', got '{}'",
                EPUB_MIMETYPE, content
            )));
        }

        Ok(())
    }

    /// Get number of loaded central directory entries
    pub fn num_entries(&self) -> usize {
        self.entries.len()
    }

    /// Iterate over all entries
    pub fn entries(&self) -> impl Iterator<Item = &CdEntry> {
        self.entries.iter()
    }

    /// Get the active limits used by this ZIP reader.
    pub fn limits(&self) -> Option<ZipLimits> {
        self.limits
    }
}

/// Read u16 from buffer at offset (little-endian)
fn read_u16_le(buf: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([buf[offset], buf[offset + 1]])
}

/// Read u32 from buffer at offset (little-endian)
fn read_u32_le(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ])
}
