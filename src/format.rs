// Infiniium BIN container format model.
// Byte layouts and enumeration mappings shared by both conversion
// directions. All multi-byte fields are little-endian and tightly packed.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Bad file cookie: expected \"AG\", got {0:?}")]
    BadCookie(String),

    #[error("Buffer size {buffer_size} is not a multiple of {bytes_per_point} bytes per point")]
    MisalignedBuffer { buffer_size: i32, bytes_per_point: i16 },

    #[error("Point count mismatch: header declares {declared}, buffers hold {actual}")]
    PointCountMismatch { declared: i32, actual: usize },

    #[error("Time vector length {time_points} does not match sample count {samples}")]
    TimeVectorMismatch { time_points: usize, samples: usize },

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {value:?}")]
    InvalidField { field: String, value: String },

    #[error("Source {path:?} does not have the expected .{expected} extension; pass an explicit destination")]
    ExtensionMismatch { path: String, expected: String },

    #[error("Parse error: {0}")]
    ParseError(String),
}

pub type Result<T> = std::result::Result<T, ConvertError>;

/// Magic cookie identifying the Agilent/Keysight binary waveform family.
pub const FILE_COOKIE: [u8; 2] = *b"AG";
/// Format version written by this crate.
pub const FILE_VERSION: [u8; 2] = *b"10";

/// Unit of measure for an axis, as coded in the waveform header.
///
/// The seven coded values map bidirectionally to their labels;
/// anything else becomes `Unrecognized`, which carries no code of its
/// own and must be resolved before serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Units {
    Unknown,
    Volts,
    Seconds,
    Constant,
    Amps,
    Db,
    Hz,
    Unrecognized,
}

impl Units {
    pub fn from_code(code: i32) -> Units {
        match code {
            0 => Units::Unknown,
            1 => Units::Volts,
            2 => Units::Seconds,
            3 => Units::Constant,
            4 => Units::Amps,
            5 => Units::Db,
            6 => Units::Hz,
            _ => Units::Unrecognized,
        }
    }

    /// Coded value, or `None` for the sentinel.
    pub fn code(self) -> Option<i32> {
        match self {
            Units::Unknown => Some(0),
            Units::Volts => Some(1),
            Units::Seconds => Some(2),
            Units::Constant => Some(3),
            Units::Amps => Some(4),
            Units::Db => Some(5),
            Units::Hz => Some(6),
            Units::Unrecognized => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Units::Unknown => "Unknown",
            Units::Volts => "Volts",
            Units::Seconds => "Seconds",
            Units::Constant => "Constant",
            Units::Amps => "Amps",
            Units::Db => "dB",
            Units::Hz => "Hz",
            Units::Unrecognized => "Unrecognized",
        }
    }

    /// Label to unit, tolerating case differences and the singular
    /// forms instruments emit ("Volt", "Second", "Amp").
    pub fn from_label(label: &str) -> Units {
        let l = label.trim().to_ascii_lowercase();
        if l == "unknown" {
            Units::Unknown
        } else if l.starts_with("volt") {
            Units::Volts
        } else if l.starts_with("second") {
            Units::Seconds
        } else if l == "constant" {
            Units::Constant
        } else if l.starts_with("amp") {
            Units::Amps
        } else if l == "db" {
            Units::Db
        } else if l == "hz" {
            Units::Hz
        } else {
            Units::Unrecognized
        }
    }
}

/// Acquisition type stored in the waveform header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaveformType {
    Unknown,
    Normal,
    PeakDetect,
    Average,
    Reserved4,
    Reserved5,
    Logic,
    Unrecognized,
}

impl WaveformType {
    pub fn from_code(code: i32) -> WaveformType {
        match code {
            0 => WaveformType::Unknown,
            1 => WaveformType::Normal,
            2 => WaveformType::PeakDetect,
            3 => WaveformType::Average,
            4 => WaveformType::Reserved4,
            5 => WaveformType::Reserved5,
            6 => WaveformType::Logic,
            _ => WaveformType::Unrecognized,
        }
    }

    pub fn code(self) -> Option<i32> {
        match self {
            WaveformType::Unknown => Some(0),
            WaveformType::Normal => Some(1),
            WaveformType::PeakDetect => Some(2),
            WaveformType::Average => Some(3),
            WaveformType::Reserved4 => Some(4),
            WaveformType::Reserved5 => Some(5),
            WaveformType::Logic => Some(6),
            WaveformType::Unrecognized => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            WaveformType::Unknown => "Unknown",
            WaveformType::Normal => "Normal",
            WaveformType::PeakDetect => "Peak Detect",
            WaveformType::Average => "Average",
            WaveformType::Reserved4 => "Not Used",
            WaveformType::Reserved5 => "Not Used2",
            WaveformType::Logic => "Logic",
            WaveformType::Unrecognized => "Unrecognized",
        }
    }

    pub fn from_label(label: &str) -> WaveformType {
        match label.trim() {
            "Unknown" => WaveformType::Unknown,
            "Normal" => WaveformType::Normal,
            "Peak Detect" => WaveformType::PeakDetect,
            "Average" => WaveformType::Average,
            "Not Used" => WaveformType::Reserved4,
            "Not Used2" => WaveformType::Reserved5,
            "Logic" => WaveformType::Logic,
            _ => WaveformType::Unrecognized,
        }
    }
}

/// Element type of one data buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferType {
    Unknown,
    NormalFloat,
    MaxFloat,
    MinFloat,
    Reserved4,
    Reserved5,
    DigitalByte,
    Unrecognized,
}

impl BufferType {
    pub fn from_code(code: i16) -> BufferType {
        match code {
            0 => BufferType::Unknown,
            1 => BufferType::NormalFloat,
            2 => BufferType::MaxFloat,
            3 => BufferType::MinFloat,
            4 => BufferType::Reserved4,
            5 => BufferType::Reserved5,
            6 => BufferType::DigitalByte,
            _ => BufferType::Unrecognized,
        }
    }

    pub fn code(self) -> Option<i16> {
        match self {
            BufferType::Unknown => Some(0),
            BufferType::NormalFloat => Some(1),
            BufferType::MaxFloat => Some(2),
            BufferType::MinFloat => Some(3),
            BufferType::Reserved4 => Some(4),
            BufferType::Reserved5 => Some(5),
            BufferType::DigitalByte => Some(6),
            BufferType::Unrecognized => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BufferType::Unknown => "Unknown",
            BufferType::NormalFloat => "Normal",
            BufferType::MaxFloat => "Maximum Float",
            BufferType::MinFloat => "Min Float",
            BufferType::Reserved4 => "Not Used",
            BufferType::Reserved5 => "Not Used2",
            BufferType::DigitalByte => "Digital",
            BufferType::Unrecognized => "Unrecognized",
        }
    }

    pub fn from_label(label: &str) -> BufferType {
        match label.trim() {
            "Unknown" => BufferType::Unknown,
            "Normal" => BufferType::NormalFloat,
            "Maximum Float" => BufferType::MaxFloat,
            "Min Float" => BufferType::MinFloat,
            "Not Used" => BufferType::Reserved4,
            "Not Used2" => BufferType::Reserved5,
            "Digital" => BufferType::DigitalByte,
            _ => BufferType::Unrecognized,
        }
    }
}

pub(crate) fn read_i16(bytes: &[u8]) -> Result<i16> {
    bytes
        .try_into()
        .map(i16::from_le_bytes)
        .map_err(|_| ConvertError::ParseError("Failed to parse i16".to_string()))
}

pub(crate) fn read_i32(bytes: &[u8]) -> Result<i32> {
    bytes
        .try_into()
        .map(i32::from_le_bytes)
        .map_err(|_| ConvertError::ParseError("Failed to parse i32".to_string()))
}

pub(crate) fn read_u32(bytes: &[u8]) -> Result<u32> {
    bytes
        .try_into()
        .map(u32::from_le_bytes)
        .map_err(|_| ConvertError::ParseError("Failed to parse u32".to_string()))
}

pub(crate) fn read_f32(bytes: &[u8]) -> Result<f32> {
    bytes
        .try_into()
        .map(f32::from_le_bytes)
        .map_err(|_| ConvertError::ParseError("Failed to parse f32".to_string()))
}

pub(crate) fn read_f64(bytes: &[u8]) -> Result<f64> {
    bytes
        .try_into()
        .map(f64::from_le_bytes)
        .map_err(|_| ConvertError::ParseError("Failed to parse f64".to_string()))
}

/// Fixed-width text field to String, trailing NUL and space bytes trimmed.
pub(crate) fn read_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches(['\0', ' '])
        .to_string()
}

/// String into a fixed-width field, truncated and right-padded with NUL.
pub(crate) fn put_text(field: &mut [u8], text: &str) {
    let bytes = text.as_bytes();
    let n = bytes.len().min(field.len());
    field[..n].copy_from_slice(&bytes[..n]);
    for b in field[n..].iter_mut() {
        *b = 0;
    }
}

/// File header at the start of every BIN artifact.
#[derive(Debug, Clone)]
pub struct FileHeader {
    pub cookie: [u8; 2],
    pub version: [u8; 2],
    pub file_size: i32,
    pub num_waveforms: i32,
}

impl FileHeader {
    pub const SIZE: usize = 12;

    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < Self::SIZE {
            return Err(ConvertError::ParseError(format!(
                "File header needs {} bytes, got {}",
                Self::SIZE,
                buf.len()
            )));
        }
        let header = FileHeader {
            cookie: [buf[0], buf[1]],
            version: [buf[2], buf[3]],
            file_size: read_i32(&buf[4..8])?,
            num_waveforms: read_i32(&buf[8..12])?,
        };
        if header.cookie != FILE_COOKIE {
            return Err(ConvertError::BadCookie(
                String::from_utf8_lossy(&header.cookie).to_string(),
            ));
        }
        if header.num_waveforms < 0 {
            return Err(ConvertError::ParseError(format!(
                "Negative waveform count: {}",
                header.num_waveforms
            )));
        }
        Ok(header)
    }

    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..2].copy_from_slice(&self.cookie);
        buf[2..4].copy_from_slice(&self.version);
        buf[4..8].copy_from_slice(&self.file_size.to_le_bytes());
        buf[8..12].copy_from_slice(&self.num_waveforms.to_le_bytes());
        buf
    }

    pub fn version_string(&self) -> String {
        String::from_utf8_lossy(&self.version).to_string()
    }
}

/// Per-waveform metadata header preceding that waveform's data buffers.
#[derive(Debug, Clone)]
pub struct WaveformHeader {
    pub header_size: i32,
    pub waveform_type: WaveformType,
    pub num_buffers: i32,
    pub num_points: i32,
    pub count: i32,
    pub x_display_range: f32,
    pub x_display_origin: f64,
    pub x_increment: f64,
    pub x_origin: f64,
    pub x_units: Units,
    pub y_units: Units,
    pub date: String,
    pub time: String,
    pub frame: String,
    pub label: String,
    pub time_tag: f64,
    pub segment_index: u32,
}

impl WaveformHeader {
    pub const SIZE: usize = 140;

    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < Self::SIZE {
            return Err(ConvertError::ParseError(format!(
                "Waveform header needs {} bytes, got {}",
                Self::SIZE,
                buf.len()
            )));
        }
        Ok(WaveformHeader {
            header_size: read_i32(&buf[0..4])?,
            waveform_type: WaveformType::from_code(read_i32(&buf[4..8])?),
            num_buffers: read_i32(&buf[8..12])?,
            num_points: read_i32(&buf[12..16])?,
            count: read_i32(&buf[16..20])?,
            x_display_range: read_f32(&buf[20..24])?,
            x_display_origin: read_f64(&buf[24..32])?,
            x_increment: read_f64(&buf[32..40])?,
            x_origin: read_f64(&buf[40..48])?,
            x_units: Units::from_code(read_i32(&buf[48..52])?),
            y_units: Units::from_code(read_i32(&buf[52..56])?),
            date: read_text(&buf[56..72]),
            time: read_text(&buf[72..88]),
            frame: read_text(&buf[88..112]),
            label: read_text(&buf[112..128]),
            time_tag: read_f64(&buf[128..136])?,
            segment_index: read_u32(&buf[136..140])?,
        })
    }

    /// Serialize to the fixed 140-byte layout. The stored `header_size`
    /// is ignored: this layout has exactly one size, so the size field
    /// is resolved here rather than patched into emitted bytes.
    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..4].copy_from_slice(&(Self::SIZE as i32).to_le_bytes());
        buf[4..8].copy_from_slice(&self.waveform_type.code().unwrap_or(0).to_le_bytes());
        buf[8..12].copy_from_slice(&self.num_buffers.to_le_bytes());
        buf[12..16].copy_from_slice(&self.num_points.to_le_bytes());
        buf[16..20].copy_from_slice(&self.count.to_le_bytes());
        buf[20..24].copy_from_slice(&self.x_display_range.to_le_bytes());
        buf[24..32].copy_from_slice(&self.x_display_origin.to_le_bytes());
        buf[32..40].copy_from_slice(&self.x_increment.to_le_bytes());
        buf[40..48].copy_from_slice(&self.x_origin.to_le_bytes());
        // Sentinel units resolve to the Unknown code; the sentinel
        // itself has no wire representation.
        buf[48..52].copy_from_slice(&self.x_units.code().unwrap_or(0).to_le_bytes());
        buf[52..56].copy_from_slice(&self.y_units.code().unwrap_or(0).to_le_bytes());
        put_text(&mut buf[56..72], &self.date);
        put_text(&mut buf[72..88], &self.time);
        put_text(&mut buf[88..112], &self.frame);
        put_text(&mut buf[112..128], &self.label);
        buf[128..136].copy_from_slice(&self.time_tag.to_le_bytes());
        buf[136..140].copy_from_slice(&self.segment_index.to_le_bytes());
        buf
    }
}

/// Header preceding one block of sample data.
#[derive(Debug, Clone)]
pub struct BufferHeader {
    pub header_size: i32,
    pub buffer_type: BufferType,
    pub bytes_per_point: i16,
    pub buffer_size: i32,
}

impl BufferHeader {
    pub const SIZE: usize = 12;

    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < Self::SIZE {
            return Err(ConvertError::ParseError(format!(
                "Buffer header needs {} bytes, got {}",
                Self::SIZE,
                buf.len()
            )));
        }
        Ok(BufferHeader {
            header_size: read_i32(&buf[0..4])?,
            buffer_type: BufferType::from_code(read_i16(&buf[4..6])?),
            bytes_per_point: read_i16(&buf[6..8])?,
            buffer_size: read_i32(&buf[8..12])?,
        })
    }

    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..4].copy_from_slice(&(Self::SIZE as i32).to_le_bytes());
        buf[4..6].copy_from_slice(&self.buffer_type.code().unwrap_or(0).to_le_bytes());
        buf[6..8].copy_from_slice(&self.bytes_per_point.to_le_bytes());
        buf[8..12].copy_from_slice(&self.buffer_size.to_le_bytes());
        buf
    }

    /// Samples held by this buffer, enforcing the exact-division
    /// invariant `buffer_size == bytes_per_point * sample_count`.
    pub fn sample_count(&self) -> Result<usize> {
        if self.bytes_per_point <= 0 || self.buffer_size < 0 {
            return Err(ConvertError::MisalignedBuffer {
                buffer_size: self.buffer_size,
                bytes_per_point: self.bytes_per_point,
            });
        }
        if self.buffer_size % self.bytes_per_point as i32 != 0 {
            return Err(ConvertError::MisalignedBuffer {
                buffer_size: self.buffer_size,
                bytes_per_point: self.bytes_per_point,
            });
        }
        Ok((self.buffer_size / self.bytes_per_point as i32) as usize)
    }
}

/// Derive the destination path by swapping the source extension.
/// A source without the expected extension is rejected before any file
/// I/O happens, so a stray path never gets overwritten.
pub fn derive_destination(source: &Path, expected_ext: &str, new_ext: &str) -> Result<PathBuf> {
    match source.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case(expected_ext) => Ok(source.with_extension(new_ext)),
        _ => Err(ConvertError::ExtensionMismatch {
            path: source.display().to_string(),
            expected: expected_ext.to_string(),
        }),
    }
}
