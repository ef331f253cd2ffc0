// BIN reading and CSV export.
// The bin2csv pipeline: parse the binary container into per-channel
// records, then emit one Infiniium-style CSV per channel.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::format::{
    BufferHeader, BufferType, ConvertError, FileHeader, Result, WaveformHeader, read_f32, read_i32,
};

/// Reader behavior flags, all off by default.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReadOptions {
    /// Keep segment index and time tag, accumulating records that share
    /// a channel label into an ordered segment list.
    pub use_segments: bool,
    /// Compute the shared time vector from the first record.
    pub include_time_vector: bool,
}

/// Sample data of one waveform record, typed by the buffer that carried it.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleData {
    Float(Vec<f32>),
    Int(Vec<i32>),
    Digital(Vec<u8>),
}

impl SampleData {
    pub fn len(&self) -> usize {
        match self {
            SampleData::Float(v) => v.len(),
            SampleData::Int(v) => v.len(),
            SampleData::Digital(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sample at `idx` widened to f64.
    pub fn value(&self, idx: usize) -> f64 {
        match self {
            SampleData::Float(v) => v[idx] as f64,
            SampleData::Int(v) => v[idx] as f64,
            SampleData::Digital(v) => v[idx] as f64,
        }
    }

    /// Sample at `idx` in scientific notation, at the element's own
    /// precision (a float32 sample renders with float32 digits).
    fn sci(&self, idx: usize) -> String {
        match self {
            SampleData::Float(v) => sci_f32(v[idx]),
            SampleData::Int(v) => sci_f64(v[idx] as f64),
            SampleData::Digital(v) => sci_f64(v[idx] as f64),
        }
    }

    fn decode(header: &BufferHeader, data: &[u8]) -> Result<SampleData> {
        let width = match header.buffer_type {
            BufferType::NormalFloat | BufferType::MaxFloat | BufferType::MinFloat => 4,
            BufferType::Reserved4 => 4,
            _ => 1,
        };
        if header.bytes_per_point as usize != width {
            return Err(ConvertError::ParseError(format!(
                "Buffer type {:?} expects {} bytes per point, header says {}",
                header.buffer_type, width, header.bytes_per_point
            )));
        }
        match header.buffer_type {
            BufferType::NormalFloat | BufferType::MaxFloat | BufferType::MinFloat => Ok(
                SampleData::Float(data.chunks_exact(4).map(read_f32).collect::<Result<_>>()?),
            ),
            BufferType::Reserved4 => Ok(SampleData::Int(
                data.chunks_exact(4).map(read_i32).collect::<Result<_>>()?,
            )),
            _ => Ok(SampleData::Digital(data.to_vec())),
        }
    }

    /// Concatenate a following buffer's samples, in buffer order.
    fn concat(self, other: SampleData) -> Result<SampleData> {
        match (self, other) {
            (SampleData::Float(mut a), SampleData::Float(b)) => {
                a.extend(b);
                Ok(SampleData::Float(a))
            }
            (SampleData::Int(mut a), SampleData::Int(b)) => {
                a.extend(b);
                Ok(SampleData::Int(a))
            }
            (SampleData::Digital(mut a), SampleData::Digital(b)) => {
                a.extend(b);
                Ok(SampleData::Digital(a))
            }
            _ => Err(ConvertError::ParseError(
                "Mixed buffer element types within one waveform record".to_string(),
            )),
        }
    }
}

/// One segment of a segmented-memory capture.
#[derive(Debug, Clone)]
pub struct SegmentData {
    pub segment_index: u32,
    pub time_tag: f64,
    pub samples: SampleData,
}

/// One channel's (or segment group's) metadata and samples.
#[derive(Debug, Clone)]
pub struct WaveformRecord {
    /// Trimmed label with internal whitespace folded to underscores;
    /// the lookup key within one file.
    pub label: String,
    pub header: WaveformHeader,
    pub samples: SampleData,
    /// Populated only when reading with `use_segments`.
    pub segments: Vec<SegmentData>,
}

/// Main BIN file reader.
#[derive(Debug, Default)]
pub struct BinFile {
    pub file_path: String,
    pub file_header: Option<FileHeader>,
    pub channels: Vec<WaveformRecord>,
    pub time_vector: Option<Vec<f64>>,
}

impl BinFile {
    pub fn new() -> Self {
        BinFile::default()
    }

    /// Load a BIN file from the given path.
    pub fn load_file<P: AsRef<Path>>(&mut self, input_file: P, options: ReadOptions) -> Result<()> {
        self.file_path = input_file.as_ref().to_string_lossy().to_string();
        self.channels.clear();
        self.time_vector = None;

        let file = File::open(&input_file)?;
        let mut reader = BufReader::new(file);

        let mut header_buf = [0u8; FileHeader::SIZE];
        reader.read_exact(&mut header_buf)?;
        let file_header = FileHeader::parse(&header_buf)?;

        for wfx in 0..file_header.num_waveforms {
            let mut wf_buf = [0u8; WaveformHeader::SIZE];
            reader.read_exact(&mut wf_buf)?;
            let header = WaveformHeader::parse(&wf_buf)?;
            let label = header.label.replace(char::is_whitespace, "_");

            // Usually one buffer; any further ones are concatenated.
            let mut samples: Option<SampleData> = None;
            for _ in 0..header.num_buffers.max(0) {
                let mut bf_buf = [0u8; BufferHeader::SIZE];
                reader.read_exact(&mut bf_buf)?;
                let buffer_header = BufferHeader::parse(&bf_buf)?;
                buffer_header.sample_count()?;

                let mut data = vec![0u8; buffer_header.buffer_size as usize];
                reader.read_exact(&mut data)?;
                let decoded = SampleData::decode(&buffer_header, &data)?;
                samples = Some(match samples {
                    Some(acc) => acc.concat(decoded)?,
                    None => decoded,
                });
            }
            let samples = samples.unwrap_or(SampleData::Float(Vec::new()));

            if samples.len() != header.num_points.max(0) as usize {
                return Err(ConvertError::PointCountMismatch {
                    declared: header.num_points,
                    actual: samples.len(),
                });
            }

            if options.include_time_vector {
                // One shared time base, taken from the first record.
                if wfx == 0 {
                    let tvec = (0..samples.len())
                        .map(|i| header.x_origin + header.x_increment * i as f64)
                        .collect();
                    self.time_vector = Some(tvec);
                }
                if let Some(tvec) = &self.time_vector {
                    if tvec.len() != samples.len() {
                        return Err(ConvertError::TimeVectorMismatch {
                            time_points: tvec.len(),
                            samples: samples.len(),
                        });
                    }
                }
            }

            let existing = self.channels.iter().position(|c| c.label == label);
            if options.use_segments {
                let segment = SegmentData {
                    segment_index: header.segment_index,
                    time_tag: header.time_tag,
                    samples,
                };
                match existing {
                    Some(idx) => self.channels[idx].segments.push(segment),
                    None => self.channels.push(WaveformRecord {
                        label,
                        header,
                        samples: SampleData::Float(Vec::new()),
                        segments: vec![segment],
                    }),
                }
            } else {
                let record = WaveformRecord {
                    label,
                    header,
                    samples,
                    segments: Vec::new(),
                };
                match existing {
                    Some(idx) => self.channels[idx] = record,
                    None => self.channels.push(record),
                }
            }
        }

        self.file_header = Some(file_header);
        Ok(())
    }

    /// Look up a channel by its normalized label.
    pub fn channel(&self, label: &str) -> Option<&WaveformRecord> {
        self.channels.iter().find(|c| c.label == label)
    }

    /// Time value for each sample of the first channel.
    pub fn time_values(&self) -> Vec<f64> {
        match self.channels.first() {
            Some(record) => (0..record.samples.len())
                .map(|i| record.header.x_origin + record.header.x_increment * i as f64)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Write every channel as an Infiniium-format CSV.
    ///
    /// With a single channel the output goes to `output_file` as given.
    /// With several, each channel is routed to its own destination
    /// (label suffixed to the file stem) so no channel overwrites
    /// another. Returns the paths actually written.
    pub fn write_csv<P: AsRef<Path>>(&self, output_file: P) -> Result<Vec<PathBuf>> {
        let base = output_file.as_ref();
        let mut written = Vec::with_capacity(self.channels.len());
        for record in &self.channels {
            let dest = if self.channels.len() > 1 {
                per_channel_path(base, &record.label)
            } else {
                base.to_path_buf()
            };
            self.write_channel_csv(record, &dest)?;
            written.push(dest);
        }
        Ok(written)
    }

    fn write_channel_csv(&self, record: &WaveformRecord, dest: &Path) -> Result<()> {
        let y = &record.samples;
        let n = y.len();

        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        for i in 0..n {
            let v = y.value(i);
            min = min.min(v);
            max = max.max(v);
            sum += v;
        }
        let y_disp_range = if n > 0 { max - min } else { 0.0 };
        let y_disp_org = if n > 0 { sum / n as f64 } else { 0.0 };
        // Display hint only: first-difference, not a true increment.
        let y_inc = if n > 1 { y.value(1) - y.value(0) } else { 0.0 };
        let y_org = if n > 0 { y.value(0) } else { 0.0 };

        let times: Vec<f64> = match &self.time_vector {
            Some(tvec) if tvec.len() == n => tvec.clone(),
            _ => (0..n)
                .map(|i| record.header.x_origin + record.header.x_increment * i as f64)
                .collect(),
        };

        let h = &record.header;
        let file = File::create(dest)?;
        let mut writer = BufWriter::new(file);

        writeln!(writer, "Revision:0")?;
        writeln!(writer, "Type:interpolation")?;
        writeln!(writer, "Start:0")?;
        writeln!(writer, "Points:{}", h.num_points)?;
        writeln!(writer, "Count:{}", h.count)?;
        writeln!(writer, "XDispRange:{}", meta_f32(h.x_display_range))?;
        writeln!(writer, "XDispOrg:{}", meta_f64(h.x_display_origin))?;
        writeln!(writer, "XInc:{}", meta_f64(h.x_increment))?;
        writeln!(writer, "XOrg:{}", meta_f64(h.x_origin))?;
        writeln!(writer, "XUnits:{}", h.x_units.label())?;
        writeln!(writer, "YDispRange:{}", meta_f64(y_disp_range))?;
        writeln!(writer, "YDispOrg:{}", meta_f64(y_disp_org))?;
        writeln!(writer, "YInc:{}", meta_f64(y_inc))?;
        writeln!(writer, "YOrg:{}", meta_f64(y_org))?;
        writeln!(writer, "YUnits:{}", h.y_units.label())?;
        writeln!(writer, "YReference:1")?;
        writeln!(writer, "Frame:{}", h.frame)?;
        writeln!(writer, "Date:{}", h.date)?;
        writeln!(writer, "Time:{}", h.time)?;
        writeln!(writer, "Max Bandwidth:62000000000")?;
        writeln!(writer, "Min Bandwidth:0")?;
        writeln!(writer, "Data:")?;

        for i in 0..n {
            writeln!(writer, "{},{}", sci_f64(times[i]), y.sci(i))?;
        }

        writer.flush()?;
        Ok(())
    }
}

fn per_channel_path(base: &Path, label: &str) -> PathBuf {
    let stem = base
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("waveform");
    let ext = base.extension().and_then(|s| s.to_str()).unwrap_or("csv");
    base.with_file_name(format!("{}_{}.{}", stem, label, ext))
}

// Scientific rendering in the instrument's CSV style: shortest mantissa
// with a trailing point when integral, unpadded exponent, "0." for zero.
// Examples: 0. / 1.e-9 / 1.5e-1 / -5.e-2

pub(crate) fn sci_f64(value: f64) -> String {
    if value == 0.0 {
        return "0.".to_string();
    }
    // 15 significant digits, so a one-ULP error from the time-base
    // multiply never reaches the rendered text.
    let rounded: f64 = format!("{:.14e}", value).parse().unwrap_or(value);
    sci_fixup(format!("{:e}", rounded))
}

pub(crate) fn sci_f32(value: f32) -> String {
    if value == 0.0 {
        return "0.".to_string();
    }
    sci_fixup(format!("{:e}", value))
}

fn sci_fixup(rendered: String) -> String {
    match rendered.split_once('e') {
        Some((mantissa, exponent)) if !mantissa.contains('.') => {
            format!("{}.e{}", mantissa, exponent)
        }
        _ => rendered,
    }
}

// Preamble numerics in the original artifacts' form: exponent notation
// with a signed two-digit exponent outside [1e-4, 1e16), plain decimal
// with at least one fractional digit inside it.
// Examples: 1e-09 / 4e-09 / 0.0 / 0.25 / 1e+16

pub(crate) fn meta_f64(value: f64) -> String {
    meta_fixup(format!("{:e}", value), format!("{}", value))
}

pub(crate) fn meta_f32(value: f32) -> String {
    meta_fixup(format!("{:e}", value), format!("{}", value))
}

fn meta_fixup(exp_form: String, dec_form: String) -> String {
    match exp_form.split_once('e') {
        Some((mantissa, exponent)) => {
            let exponent: i32 = exponent.parse().unwrap_or(0);
            if !(-4..16).contains(&exponent) {
                format!("{}e{:+03}", mantissa, exponent)
            } else if dec_form.contains('.') {
                dec_form
            } else {
                format!("{}.0", dec_form)
            }
        }
        None => dec_form,
    }
}
