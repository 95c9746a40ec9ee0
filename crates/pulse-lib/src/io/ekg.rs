use crate::{
    error::{PulseError, Result},
    signal::{Sample, Signal},
};
use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use std::{io::Write, path::Path};

/// Header of the amplitude column in uploaded recordings.
pub const AMPLITUDE_COLUMN: &str = "Messwerte in mV";
/// Header of the time column in uploaded recordings.
pub const TIME_COLUMN: &str = "Zeit in ms";

/// Parse a headerless two-column table: amplitude (mV), then time (ms).
///
/// The delimiter is taken from the first data line: tab, then comma, otherwise runs of spaces.
/// Blank lines and `#` comments are skipped. Rows with fewer or more than two values are
/// rejected. An empty table yields an empty signal.
pub fn parse_ekg_table(text: &str) -> Result<Signal> {
    let delimiter = match text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty() && !l.starts_with('#'))
    {
        Some(line) if line.contains('\t') => b'\t',
        Some(line) if line.contains(',') => b',',
        _ => b' ',
    };
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .trim(Trim::All)
        .comment(Some(b'#'))
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut samples = Vec::new();
    let mut record = StringRecord::new();
    loop {
        match reader.read_record(&mut record) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => return Err(positioned(e)),
        }
        let line = record.position().map_or(0, |p| p.line() as usize);
        // Space-delimited rows may carry repeated separators.
        let fields: Vec<&str> = record.iter().filter(|f| !f.is_empty()).collect();
        if fields.is_empty() {
            continue;
        }
        if fields.len() != 2 {
            return Err(PulseError::Parse {
                line,
                message: format!(
                    "expected amplitude and time, got {} values",
                    fields.len()
                ),
            });
        }
        let amplitude = parse_cell(fields[0], line, "amplitude")?;
        let time = parse_cell(fields[1], line, "time")?;
        push_sample(&mut samples, time, amplitude, line)?;
    }
    Ok(Signal::new(samples))
}

pub fn read_ekg_file(path: &Path) -> Result<Signal> {
    let text = std::fs::read_to_string(path).map_err(|e| PulseError::io(path, e))?;
    parse_ekg_table(&text)
}

/// Parse an uploaded recording whose first row names exactly the columns [`AMPLITUDE_COLUMN`]
/// and [`TIME_COLUMN`], in either order. Names are matched case- and unit-sensitively.
pub fn parse_ekg_upload(text: &str) -> Result<Signal> {
    let delimiter = match text.lines().next() {
        Some(header) if header.contains('\t') => b'\t',
        Some(header) if header.contains(';') => b';',
        _ => b',',
    };
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());
    let headers = reader.headers()?.clone();
    let amplitude_idx = locate_column(&headers, AMPLITUDE_COLUMN)?;
    let time_idx = locate_column(&headers, TIME_COLUMN)?;
    if let Some(extra) = headers
        .iter()
        .find(|h| *h != AMPLITUDE_COLUMN && *h != TIME_COLUMN)
    {
        return Err(PulseError::Parse {
            line: 1,
            message: format!(
                "unexpected column '{extra}'; expected only '{AMPLITUDE_COLUMN}' and '{TIME_COLUMN}'"
            ),
        });
    }

    let mut samples = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(positioned)?;
        let line = row + 2;
        let amplitude = parse_cell(record.get(amplitude_idx).unwrap_or(""), line, "amplitude")?;
        let time = parse_cell(record.get(time_idx).unwrap_or(""), line, "time")?;
        push_sample(&mut samples, time, amplitude, line)?;
    }
    Ok(Signal::new(samples))
}

pub fn read_ekg_upload(path: &Path) -> Result<Signal> {
    let text = std::fs::read_to_string(path).map_err(|e| PulseError::io(path, e))?;
    parse_ekg_upload(&text)
}

/// Write a signal as a headerless, tab-separated amplitude/time table.
pub fn write_ekg_table<W: Write>(signal: &Signal, out: W) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_writer(out);
    for sample in &signal.samples {
        writer.write_record([
            format!("{:.6}", sample.amplitude_mv),
            format!("{:.3}", sample.time_ms),
        ])?;
    }
    writer.flush().map_err(|e| PulseError::Io {
        path: "<output>".into(),
        source: e,
    })?;
    Ok(())
}

fn positioned(err: csv::Error) -> PulseError {
    match err.position() {
        Some(pos) => PulseError::Parse {
            line: pos.line() as usize,
            message: err.to_string(),
        },
        None => PulseError::Csv(err),
    }
}

fn locate_column(headers: &StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| PulseError::MissingColumn(name.to_string()))
}

fn parse_cell(cell: &str, line: usize, what: &str) -> Result<f64> {
    let value: f64 = cell.trim().parse().map_err(|_| PulseError::Parse {
        line,
        message: format!("{what} is not a number: '{cell}'"),
    })?;
    if !value.is_finite() {
        return Err(PulseError::Parse {
            line,
            message: format!("{what} is not finite: '{cell}'"),
        });
    }
    Ok(value)
}

fn push_sample(samples: &mut Vec<Sample>, time_ms: f64, amplitude: f64, line: usize) -> Result<()> {
    if let Some(prev) = samples.last() {
        if time_ms < prev.time_ms {
            return Err(PulseError::NonMonotonicTime {
                line,
                time_ms,
                previous_ms: prev.time_ms,
            });
        }
    }
    samples.push(Sample::new(time_ms, amplitude));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn parses_tab_separated_table() {
        let signal = parse_ekg_table("0.12\t0\n0.15\t2\n\n# note\n0.90\t4\n").unwrap();
        assert_eq!(signal.len(), 3);
        assert_eq!(signal.samples[2].amplitude_mv, 0.90);
        assert_eq!(signal.sampling_rate_hz(), Some(500.0));
    }

    #[test]
    fn accepts_comma_and_space_separators() {
        let signal = parse_ekg_table("1.0, 0\n2.0,4\n").unwrap();
        assert_eq!(signal.times_ms(), vec![0.0, 4.0]);
        let signal = parse_ekg_table("# amplitude time\n1.0  0\n2.0 4\n").unwrap();
        assert_eq!(signal.amplitudes(), vec![1.0, 2.0]);
    }

    #[test]
    fn extra_columns_are_rejected() {
        assert!(matches!(
            parse_ekg_table("1.0\t0\n1.0\t2\t99\n"),
            Err(PulseError::Parse { line: 2, .. })
        ));
    }

    #[test]
    fn empty_table_is_an_empty_signal() {
        let signal = parse_ekg_table("").unwrap();
        assert!(signal.is_empty());
    }

    #[test]
    fn reports_bad_cells_with_line_numbers() {
        match parse_ekg_table("1.0\t0\nabc\t2\n") {
            Err(PulseError::Parse { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            parse_ekg_table("1.0\n"),
            Err(PulseError::Parse { line: 1, .. })
        ));
    }

    #[test]
    fn rejects_decreasing_time() {
        assert!(matches!(
            parse_ekg_table("1.0\t10\n1.0\t8\n"),
            Err(PulseError::NonMonotonicTime { line: 2, .. })
        ));
    }

    #[test]
    fn upload_requires_named_columns() {
        let ok = parse_ekg_upload("Zeit in ms,Messwerte in mV\n0,0.5\n2,0.7\n").unwrap();
        assert_eq!(ok.samples[1].amplitude_mv, 0.7);
        assert_eq!(ok.samples[1].time_ms, 2.0);

        match parse_ekg_upload("zeit in ms,Messwerte in mV\n0,0.5\n") {
            Err(PulseError::MissingColumn(col)) => assert_eq!(col, TIME_COLUMN),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            parse_ekg_upload("Messwerte in V,Zeit in ms\n0.5,0\n"),
            Err(PulseError::MissingColumn(_))
        ));
        assert!(parse_ekg_upload("Messwerte in mV,Zeit in ms,Puls\n0.5,0,60\n").is_err());
    }

    #[test]
    fn upload_accepts_tab_header() {
        let signal = parse_ekg_upload("Messwerte in mV\tZeit in ms\n0.5\t0\n0.6\t4\n").unwrap();
        assert_eq!(signal.len(), 2);
    }

    #[test]
    fn table_round_trips_through_writer() {
        let signal = parse_ekg_table("0.5\t0\n1.25\t4\n").unwrap();
        let mut buf = Vec::new();
        write_ekg_table(&signal, &mut buf).unwrap();
        let back = parse_ekg_table(std::str::from_utf8(&buf).unwrap()).unwrap();
        assert_eq!(back.amplitudes(), signal.amplitudes());
        assert_eq!(back.times_ms(), signal.times_ms());
    }

    #[test]
    fn reads_fixture_recording() {
        let path = sample_path("test_data/ekg_short.txt");
        let signal = read_ekg_file(&path).expect("read fixture");
        assert!(signal.len() > 100);
        assert_eq!(signal.sampling_rate_hz(), Some(500.0));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = read_ekg_file(Path::new("/nonexistent/ekg.txt")).unwrap_err();
        assert!(matches!(err, PulseError::Io { .. }));
    }

    fn sample_path(relative: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .parent()
            .and_then(|p| p.parent())
            .expect("workspace root")
            .join(relative)
    }
}
