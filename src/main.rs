// src/main.rs
// Command-line converter between Infiniium BIN and CSV waveform files

use std::env;
use std::path::{Path, PathBuf};
use std::process;

use agbin_convert::{BinFile, CsvFile, ReadOptions, derive_destination};

fn print_usage() {
    eprintln!("Usage: agbin_convert <command> <file> [output]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  bin2csv <file.bin> [output.csv]  Convert BIN waveform file to CSV");
    eprintln!("  csv2bin <file.csv> [output.bin]  Convert CSV waveform file to BIN");
    eprintln!("  info <file.bin>                  Display BIN file information");
    eprintln!();
    eprintln!("When no output is given, the destination is derived by swapping");
    eprintln!("the source extension; a source with the wrong extension is rejected.");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  agbin_convert bin2csv capture.bin");
    eprintln!("  agbin_convert bin2csv capture.bin waveform.csv");
    eprintln!("  agbin_convert csv2bin waveform.csv");
    eprintln!("  agbin_convert info capture.bin");
}

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 3 {
        print_usage();
        process::exit(1);
    }

    let command = &args[1];
    let input_file = Path::new(&args[2]);

    match command.as_str() {
        "bin2csv" => {
            // Destination is settled before the source is ever opened.
            let output: PathBuf = match args.get(3) {
                Some(path) => PathBuf::from(path),
                None => match derive_destination(input_file, "bin", "csv") {
                    Ok(path) => path,
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        process::exit(1);
                    }
                },
            };

            let mut bin = BinFile::new();
            let options = ReadOptions {
                include_time_vector: true,
                ..Default::default()
            };
            if let Err(e) = bin.load_file(input_file, options) {
                eprintln!("Error loading BIN file '{}': {}", input_file.display(), e);
                process::exit(1);
            }

            match bin.write_csv(&output) {
                Ok(written) => {
                    for path in &written {
                        println!("Successfully wrote {}", path.display());
                    }
                }
                Err(e) => {
                    eprintln!("Error writing CSV file '{}': {}", output.display(), e);
                    process::exit(1);
                }
            }
        }

        "csv2bin" => {
            let output: PathBuf = match args.get(3) {
                Some(path) => PathBuf::from(path),
                None => match derive_destination(input_file, "csv", "bin") {
                    Ok(path) => path,
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        process::exit(1);
                    }
                },
            };

            let mut csv = CsvFile::new();
            if let Err(e) = csv.load_file(input_file) {
                eprintln!("Error loading CSV file '{}': {}", input_file.display(), e);
                process::exit(1);
            }
            if !csv.complete {
                eprintln!(
                    "Warning: '{}' has sample data without Points/Count metadata",
                    input_file.display()
                );
            }

            if let Err(e) = csv.write_bin(&output) {
                eprintln!("Error writing BIN file '{}': {}", output.display(), e);
                process::exit(1);
            }
            println!("Successfully wrote {}", output.display());
            println!("Total samples written: {}", csv.samples.len());
        }

        "info" => {
            let mut bin = BinFile::new();
            let options = ReadOptions {
                use_segments: true,
                ..Default::default()
            };
            if let Err(e) = bin.load_file(input_file, options) {
                eprintln!("Error loading BIN file '{}': {}", input_file.display(), e);
                process::exit(1);
            }
            print_file_info(&bin);
        }

        _ => {
            eprintln!("Error: Unknown command '{}'", command);
            print_usage();
            process::exit(1);
        }
    }
}

fn print_file_info(bin: &BinFile) {
    println!("BIN File Information");
    println!("====================");
    println!();
    println!("File: {}", bin.file_path);
    if let Some(header) = &bin.file_header {
        println!("Version: {}", header.version_string());
        println!("Declared size: {} bytes", header.file_size);
        println!("Waveform records: {}", header.num_waveforms);
    }
    println!("Channels: {}", bin.channels.len());
    println!();

    for record in &bin.channels {
        let h = &record.header;
        println!("Channel '{}':", record.label);
        println!("  Type: {}", h.waveform_type.label());
        println!("  Points: {}", h.num_points);
        println!("  Count: {}", h.count);
        println!("  X increment: {:.6e} {}", h.x_increment, h.x_units.label());
        println!("  X origin: {:.6e}", h.x_origin);
        println!("  Y units: {}", h.y_units.label());
        if !h.date.is_empty() || !h.time.is_empty() {
            println!("  Captured: {} {}", h.date, h.time);
        }
        if !h.frame.is_empty() {
            println!("  Frame: {}", h.frame);
        }

        if record.segments.is_empty() {
            let n = record.samples.len();
            if n > 0 {
                let mut min = f64::INFINITY;
                let mut max = f64::NEG_INFINITY;
                let mut sum = 0.0;
                for i in 0..n {
                    let v = record.samples.value(i);
                    min = min.min(v);
                    max = max.max(v);
                    sum += v;
                }
                println!(
                    "  Data range: {:.3} to {:.3}, avg {:.3}",
                    min,
                    max,
                    sum / n as f64
                );
            }
        } else {
            println!("  Segments: {}", record.segments.len());
            for segment in record.segments.iter().take(3) {
                println!(
                    "    #{}: {} samples, time tag {:.6e} s",
                    segment.segment_index,
                    segment.samples.len(),
                    segment.time_tag
                );
            }
        }
        println!();
    }
}
