// src/lib.rs
// Infiniium BIN/CSV Converter Library - Public API

//! # agbin_convert
//!
//! A Rust library for converting Keysight/Agilent Infiniium BIN waveform
//! files to and from the Infiniium CSV format.
//!
//! ## Features
//!
//! - Read Infiniium BIN files (cookie `"AG"`), including segmented captures
//! - Export each channel as an Infiniium-style CSV with metadata preamble
//! - Reconstruct a single-waveform BIN file from such a CSV
//! - Unit, waveform-type and buffer-type code mappings in both directions
//! - Proper error handling
//!
//! ## Example
//!
//! ```no_run
//! use agbin_convert::{BinFile, CsvFile, ReadOptions};
//!
//! let mut bin = BinFile::new();
//! let options = ReadOptions { include_time_vector: true, ..Default::default() };
//! bin.load_file("capture.bin", options).expect("Failed to load file");
//!
//! println!("Channels: {}", bin.channels.len());
//!
//! // Export to CSV (one file per channel)
//! let written = bin.write_csv("capture.csv").expect("Failed to write CSV");
//! println!("Wrote {} file(s)", written.len());
//!
//! // And back: CSV to BIN
//! let mut csv = CsvFile::new();
//! csv.load_file(&written[0]).expect("Failed to load CSV");
//! csv.write_bin("rebuilt.bin").expect("Failed to write BIN");
//! ```

mod bin_tools;
mod csv_tools;
mod format;

pub use bin_tools::{BinFile, ReadOptions, SampleData, SegmentData, WaveformRecord};
pub use csv_tools::{CsvFile, FILE_SIZE_PLACEHOLDER, FRAME_PLACEHOLDER, LABEL_PLACEHOLDER};
pub use format::{
    BufferHeader, BufferType, ConvertError, FILE_COOKIE, FILE_VERSION, FileHeader, Result, Units,
    WaveformHeader, WaveformType, derive_destination,
};
