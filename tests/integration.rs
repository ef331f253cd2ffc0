// tests/integration.rs
// End-to-end tests for the BIN/CSV converter

use std::fs;
use std::path::Path;

use agbin_convert::{
    BinFile, ConvertError, CsvFile, ReadOptions, SampleData, Units, derive_destination,
};

/// Build a BIN file image by hand, byte offsets spelled out, so the
/// wire layout is pinned independently of the library's own encoder.
fn build_bin(labels_and_samples: &[(&str, &[f32])]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"AG");
    out.extend_from_slice(b"10");
    let body: usize = labels_and_samples
        .iter()
        .map(|(_, s)| 140 + 12 + s.len() * 4)
        .sum();
    out.extend_from_slice(&((12 + body) as i32).to_le_bytes());
    out.extend_from_slice(&(labels_and_samples.len() as i32).to_le_bytes());

    for (label, samples) in labels_and_samples {
        let mut wf = vec![0u8; 140];
        wf[0..4].copy_from_slice(&140i32.to_le_bytes()); // header size
        wf[4..8].copy_from_slice(&1i32.to_le_bytes()); // Normal
        wf[8..12].copy_from_slice(&1i32.to_le_bytes()); // one buffer
        wf[12..16].copy_from_slice(&(samples.len() as i32).to_le_bytes());
        wf[16..20].copy_from_slice(&0i32.to_le_bytes()); // count
        wf[20..24].copy_from_slice(&4e-9f32.to_le_bytes()); // x display range
        wf[24..32].copy_from_slice(&0f64.to_le_bytes()); // x display origin
        wf[32..40].copy_from_slice(&1e-9f64.to_le_bytes()); // x increment
        wf[40..48].copy_from_slice(&0f64.to_le_bytes()); // x origin
        wf[48..52].copy_from_slice(&2i32.to_le_bytes()); // Seconds
        wf[52..56].copy_from_slice(&1i32.to_le_bytes()); // Volts
        wf[88..88 + 17].copy_from_slice(b"N8900A:AT79587422");
        wf[112..112 + label.len()].copy_from_slice(label.as_bytes());
        wf[128..136].copy_from_slice(&0f64.to_le_bytes()); // time tag
        wf[136..140].copy_from_slice(&0u32.to_le_bytes()); // segment index
        out.extend_from_slice(&wf);

        out.extend_from_slice(&12i32.to_le_bytes()); // buffer header size
        out.extend_from_slice(&1i16.to_le_bytes()); // normal float
        out.extend_from_slice(&4i16.to_le_bytes()); // bytes per point
        out.extend_from_slice(&((samples.len() * 4) as i32).to_le_bytes());
        for s in *samples {
            out.extend_from_slice(&s.to_le_bytes());
        }
    }
    out
}

const SAMPLES: [f32; 4] = [0.1, 0.2, 0.15, -0.05];

#[test]
fn test_bin_to_csv_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let bin_path = dir.path().join("scenario.bin");
    fs::write(&bin_path, build_bin(&[("Channel 1", &SAMPLES)])).unwrap();

    let mut bin = BinFile::new();
    let options = ReadOptions {
        include_time_vector: true,
        ..Default::default()
    };
    bin.load_file(&bin_path, options).unwrap();

    assert_eq!(bin.channels.len(), 1);
    assert_eq!(bin.channels[0].label, "Channel_1");
    assert_eq!(bin.channels[0].header.x_units, Units::Seconds);
    assert_eq!(bin.channels[0].header.y_units, Units::Volts);

    let csv_path = dir.path().join("scenario.csv");
    let written = bin.write_csv(&csv_path).unwrap();
    assert_eq!(written, vec![csv_path.clone()]);

    let text = fs::read_to_string(&csv_path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 26); // 22 preamble lines + 4 data lines

    assert_eq!(lines[0], "Revision:0");
    assert_eq!(lines[1], "Type:interpolation");
    assert_eq!(lines[2], "Start:0");
    assert_eq!(lines[3], "Points:4");
    assert_eq!(lines[4], "Count:0");
    assert_eq!(lines[5], "XDispRange:4e-09");
    assert_eq!(lines[7], "XInc:1e-09");
    assert_eq!(lines[8], "XOrg:0.0");
    assert_eq!(lines[9], "XUnits:Seconds");
    assert_eq!(lines[14], "YUnits:Volts");
    assert_eq!(lines[15], "YReference:1");
    assert_eq!(lines[16], "Frame:N8900A:AT79587422");
    assert_eq!(lines[19], "Max Bandwidth:62000000000");
    assert_eq!(lines[20], "Min Bandwidth:0");
    assert_eq!(lines[21], "Data:");

    assert_eq!(lines[22], "0.,1.e-1");
    assert_eq!(lines[23], "1.e-9,2.e-1");
    assert_eq!(lines[24], "2.e-9,1.5e-1");
    assert_eq!(lines[25], "3.e-9,-5.e-2");
}

#[test]
fn test_csv_to_bin_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let bin_path = dir.path().join("original.bin");
    fs::write(&bin_path, build_bin(&[("Channel 1", &SAMPLES)])).unwrap();

    let mut bin = BinFile::new();
    bin.load_file(&bin_path, ReadOptions::default()).unwrap();
    let csv_path = dir.path().join("original.csv");
    bin.write_csv(&csv_path).unwrap();

    let mut csv = CsvFile::new();
    csv.load_file(&csv_path).unwrap();
    assert!(csv.complete);
    let rebuilt_path = dir.path().join("rebuilt.bin");
    csv.write_bin(&rebuilt_path).unwrap();

    let mut rebuilt = BinFile::new();
    rebuilt.load_file(&rebuilt_path, ReadOptions::default()).unwrap();

    assert_eq!(rebuilt.channels.len(), 1);
    let record = rebuilt.channel("Channel_1").unwrap();
    assert_eq!(record.header.num_points, 4);
    assert_eq!(record.header.x_increment, 1e-9);
    assert_eq!(record.header.x_origin, 0.0);
    assert_eq!(record.header.x_units, Units::Seconds);
    assert_eq!(record.header.y_units, Units::Volts);
    // Scientific-notation text preserves float32 samples exactly.
    assert_eq!(record.samples, SampleData::Float(SAMPLES.to_vec()));
}

#[test]
fn test_multi_channel_fan_out() {
    let dir = tempfile::tempdir().unwrap();
    let bin_path = dir.path().join("dual.bin");
    let other = [1.0f32, -1.0, 0.5, 0.25];
    fs::write(
        &bin_path,
        build_bin(&[("Channel 1", &SAMPLES), ("Channel 2", &other)]),
    )
    .unwrap();

    let mut bin = BinFile::new();
    bin.load_file(&bin_path, ReadOptions::default()).unwrap();
    let written = bin.write_csv(dir.path().join("dual.csv")).unwrap();

    assert_eq!(written.len(), 2);
    assert_eq!(written[0], dir.path().join("dual_Channel_1.csv"));
    assert_eq!(written[1], dir.path().join("dual_Channel_2.csv"));

    let mut csv = CsvFile::new();
    csv.load_file(&written[1]).unwrap();
    assert_eq!(csv.meta("Points"), Some("4"));
    assert_eq!(csv.samples, other.to_vec());
}

#[test]
fn test_bad_cookie_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("not_agilent.bin");
    let mut bytes = build_bin(&[("Channel 1", &SAMPLES)]);
    bytes[0..2].copy_from_slice(b"XX");
    fs::write(&path, bytes).unwrap();

    let mut bin = BinFile::new();
    let result = bin.load_file(&path, ReadOptions::default());
    assert!(matches!(result, Err(ConvertError::BadCookie(_))));
}

#[test]
fn test_duplicate_label_replaces_record() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dup.bin");
    let second = [0.3f32, 0.4];
    fs::write(
        &path,
        build_bin(&[("Channel 1", &SAMPLES), ("Channel 1", &second)]),
    )
    .unwrap();

    let mut bin = BinFile::new();
    bin.load_file(&path, ReadOptions::default()).unwrap();

    assert_eq!(bin.channels.len(), 1);
    assert_eq!(
        bin.channel("Channel_1").unwrap().samples,
        SampleData::Float(second.to_vec())
    );
}

#[test]
fn test_extension_guard_fires_before_io() {
    // data.txt does not exist; the guard must reject it without I/O.
    let result = derive_destination(Path::new("data.txt"), "bin", "csv");
    assert!(matches!(result, Err(ConvertError::ExtensionMismatch { .. })));

    let result = derive_destination(Path::new("data.bin"), "csv", "bin");
    assert!(matches!(result, Err(ConvertError::ExtensionMismatch { .. })));
}
