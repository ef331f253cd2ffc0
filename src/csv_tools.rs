// CSV reading and BIN export.
// The csv2bin pipeline: recover metadata and samples from an
// Infiniium-format CSV, then serialize a single-waveform BIN file.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::format::{
    BufferHeader, BufferType, ConvertError, FILE_COOKIE, FILE_VERSION, FileHeader, Result, Units,
    WaveformHeader, WaveformType,
};

/// `file_size` stand-in written on the reverse conversion; the true
/// serialized length is not reproduced.
pub const FILE_SIZE_PLACEHOLDER: i32 = 64040;
/// Frame identifier used when the CSV carries none.
pub const FRAME_PLACEHOLDER: &str = "N8900A:AT79587422";
/// Channel label used on the reverse conversion; CSV has no label field.
pub const LABEL_PLACEHOLDER: &str = "Channel 1";

/// One waveform reconstructed from a CSV artifact.
///
/// Metadata keys keep their textual values; numeric interpretation is
/// deferred to [`CsvFile::write_bin`], which reports the offending field
/// when a required value is missing or unparseable.
#[derive(Debug, Default)]
pub struct CsvFile {
    pub file_path: String,
    pub metadata: HashMap<String, String>,
    pub samples: Vec<f32>,
    /// False when sample data appeared without Points/Count metadata.
    pub complete: bool,
}

impl CsvFile {
    pub fn new() -> Self {
        CsvFile::default()
    }

    /// Load a CSV file from the given path.
    ///
    /// Lines whose first character is not a digit, point, or minus sign
    /// are metadata (`key:value`, last occurrence wins). The first data
    /// line switches reading permanently to sample rows, of which only
    /// the final comma-separated column is kept; the time column is
    /// redundant with XOrg/XInc and is discarded.
    pub fn load_file<P: AsRef<Path>>(&mut self, input_file: P) -> Result<()> {
        self.file_path = input_file.as_ref().to_string_lossy().to_string();
        self.metadata.clear();
        self.samples.clear();

        let file = File::open(&input_file)?;
        let reader = BufReader::new(file);

        let mut in_data = false;
        for line in reader.lines() {
            let line = line?;
            let trimmed = line.trim_end();
            if trimmed.is_empty() {
                continue;
            }
            let first = trimmed.chars().next().unwrap_or(' ');
            if !in_data && !first.is_ascii_digit() && first != '.' && first != '-' {
                if let Some((key, value)) = trimmed.split_once(':') {
                    self.metadata
                        .insert(key.trim().to_string(), value.trim().to_string());
                }
                continue;
            }
            in_data = true;
            let last_column = trimmed.rsplit(',').next().unwrap_or(trimmed).trim();
            let sample = last_column
                .parse::<f32>()
                .map_err(|_| ConvertError::InvalidField {
                    field: "sample".to_string(),
                    value: last_column.to_string(),
                })?;
            self.samples.push(sample);
        }

        self.complete =
            self.metadata.contains_key("Points") && self.metadata.contains_key("Count");
        Ok(())
    }

    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(|v| v.as_str())
    }

    fn required_f64(&self, key: &str) -> Result<f64> {
        let value = self
            .meta(key)
            .ok_or_else(|| ConvertError::MissingField(key.to_string()))?;
        value.parse().map_err(|_| ConvertError::InvalidField {
            field: key.to_string(),
            value: value.to_string(),
        })
    }

    fn required_i32(&self, key: &str) -> Result<i32> {
        let value = self
            .meta(key)
            .ok_or_else(|| ConvertError::MissingField(key.to_string()))?;
        value.parse().map_err(|_| ConvertError::InvalidField {
            field: key.to_string(),
            value: value.to_string(),
        })
    }

    fn optional_i32(&self, key: &str, default: i32) -> Result<i32> {
        match self.meta(key) {
            Some(value) => value.parse().map_err(|_| ConvertError::InvalidField {
                field: key.to_string(),
                value: value.to_string(),
            }),
            None => Ok(default),
        }
    }

    fn optional_f64(&self, key: &str, default: f64) -> Result<f64> {
        match self.meta(key) {
            Some(value) => value.parse().map_err(|_| ConvertError::InvalidField {
                field: key.to_string(),
                value: value.to_string(),
            }),
            None => Ok(default),
        }
    }

    /// Serialize back into the BIN container: one waveform, one normal
    /// float buffer at 4 bytes per point.
    ///
    /// Points, XInc and XOrg must parse; everything else falls back to
    /// documented placeholders (the CSV form does not carry the frame
    /// string, channel label, or true file size).
    pub fn write_bin<P: AsRef<Path>>(&self, output_file: P) -> Result<()> {
        let num_points = self.required_i32("Points")?;
        let x_increment = self.required_f64("XInc")?;
        let x_origin = self.required_f64("XOrg")?;
        let count = self.optional_i32("Count", 0)?;
        let x_display_range = self.optional_f64("XDispRange", 0.0)? as f32;
        let x_display_origin = self.optional_f64("XDispOrg", 0.0)?;
        let x_units = self.meta("XUnits").map(Units::from_label).unwrap_or(Units::Unknown);
        let y_units = self.meta("YUnits").map(Units::from_label).unwrap_or(Units::Unknown);

        let waveform_header = WaveformHeader {
            header_size: WaveformHeader::SIZE as i32,
            waveform_type: WaveformType::Normal,
            num_buffers: 1,
            num_points,
            count,
            x_display_range,
            x_display_origin,
            x_increment,
            x_origin,
            x_units,
            y_units,
            date: self.meta("Date").unwrap_or("").to_string(),
            time: self.meta("Time").unwrap_or("").to_string(),
            frame: self.meta("Frame").unwrap_or(FRAME_PLACEHOLDER).to_string(),
            label: LABEL_PLACEHOLDER.to_string(),
            time_tag: 0.0,
            segment_index: 0,
        };

        let buffer_header = BufferHeader {
            header_size: BufferHeader::SIZE as i32,
            buffer_type: BufferType::NormalFloat,
            bytes_per_point: 4,
            buffer_size: (self.samples.len() * 4) as i32,
        };

        let file_header = FileHeader {
            cookie: FILE_COOKIE,
            version: FILE_VERSION,
            file_size: FILE_SIZE_PLACEHOLDER,
            num_waveforms: 1,
        };

        let file = File::create(output_file)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(&file_header.encode())?;
        writer.write_all(&waveform_header.encode())?;
        writer.write_all(&buffer_header.encode())?;
        for sample in &self.samples {
            writer.write_all(&sample.to_le_bytes())?;
        }
        writer.flush()?;
        Ok(())
    }
}
