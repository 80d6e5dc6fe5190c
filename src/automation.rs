//! Plain-text automation files written by the recorders and read back by the
//! readers.
//!
//! One file per stream, named `<base>_000`, `<base>_001`, ... Every line holds
//! whitespace-separated numbers printed with six decimals:
//!
//! ```text
//! 0.000000 0.250000        control stream: time value
//! 0.512000 60.000000 0.8   note stream:    time pitch velocity
//! ```

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{Error, Result};

/// Recorded `(time, value)` pairs of one control channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControlStream {
    pub points: Vec<(f64, f64)>,
}

/// Recorded `(time, pitch, velocity)` triples of one voice.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteStream {
    pub points: Vec<(f64, f64, f64)>,
}

/// A stream that can be stored one point per line.
pub trait StreamFile: Sized {
    const FIELDS: usize;

    fn rows(&self) -> Vec<Vec<f64>>;

    fn from_rows(rows: Vec<Vec<f64>>) -> Self;
}

impl StreamFile for ControlStream {
    const FIELDS: usize = 2;

    fn rows(&self) -> Vec<Vec<f64>> {
        self.points.iter().map(|&(t, v)| vec![t, v]).collect()
    }

    fn from_rows(rows: Vec<Vec<f64>>) -> Self {
        let points = rows.into_iter().map(|r| (r[0], r[1])).collect();
        Self { points }
    }
}

impl StreamFile for NoteStream {
    const FIELDS: usize = 3;

    fn rows(&self) -> Vec<Vec<f64>> {
        self.points.iter().map(|&(t, p, v)| vec![t, p, v]).collect()
    }

    fn from_rows(rows: Vec<Vec<f64>>) -> Self {
        let points = rows.into_iter().map(|r| (r[0], r[1], r[2])).collect();
        Self { points }
    }
}

/// `<base>_NNN`, the file holding stream `index`.
pub fn stream_path(base: impl AsRef<Path>, index: usize) -> PathBuf {
    let base = base.as_ref();
    let mut name = base.file_name().unwrap_or_default().to_os_string();
    name.push(format!("_{index:03}"));
    base.with_file_name(name)
}

/// Write every stream to its own file. Existing files are overwritten.
pub fn write_streams<S: StreamFile>(base: impl AsRef<Path>, streams: &[S]) -> Result<Vec<PathBuf>> {
    let base = base.as_ref();
    let mut paths = Vec::with_capacity(streams.len());
    for (index, stream) in streams.iter().enumerate() {
        let path = stream_path(base, index);
        let file = fs::File::create(&path).map_err(|e| Error::from_io(e, &path))?;
        let mut writer = BufWriter::new(file);
        for row in stream.rows() {
            let line: Vec<String> = row.iter().map(|v| format!("{v:.6}")).collect();
            writeln!(writer, "{}", line.join(" "))?;
        }
        writer.flush()?;
        paths.push(path);
    }
    debug!(base = %base.display(), streams = streams.len(), "automation written");
    Ok(paths)
}

pub fn read_control_streams(base: impl AsRef<Path>) -> Result<Vec<ControlStream>> {
    read_streams(base.as_ref())
}

pub fn read_note_streams(base: impl AsRef<Path>) -> Result<Vec<NoteStream>> {
    read_streams(base.as_ref())
}

/// Files in the base's directory whose name starts with `<base>_`, by name.
pub fn stream_files(base: &Path) -> Result<Vec<PathBuf>> {
    let dir = match base.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let mut prefix = base.file_name().unwrap_or_default().to_os_string();
    prefix.push("_");
    let prefix = prefix.to_string_lossy().into_owned();

    let mut files = Vec::new();
    for entry in fs::read_dir(&dir).map_err(|e| Error::from_io(e, &dir))? {
        let entry = entry?;
        let matches = entry.file_name().to_string_lossy().starts_with(&prefix);
        if matches && entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

fn read_streams<S: StreamFile>(base: &Path) -> Result<Vec<S>> {
    stream_files(base)?
        .iter()
        .map(|path| parse_rows(path, S::FIELDS).map(S::from_rows))
        .collect()
}

/// Rows of exactly `fields` numbers. Blank lines are skipped.
fn parse_rows(path: &Path, fields: usize) -> Result<Vec<Vec<f64>>> {
    let text = fs::read_to_string(path).map_err(|e| Error::from_io(e, path))?;
    let mut rows = Vec::new();
    for (n, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let parse_error = || Error::Parse {
            path: path.to_path_buf(),
            line: n + 1,
        };
        let row = line
            .split_whitespace()
            .map(|field| field.parse::<f64>().map_err(|_| parse_error()))
            .collect::<Result<Vec<f64>>>()?;
        if row.len() != fields {
            return Err(parse_error());
        }
        rows.push(row);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_path_appends_padded_index() {
        assert_eq!(stream_path("/tmp/take", 7), PathBuf::from("/tmp/take_007"));
        assert_eq!(stream_path("take", 12), PathBuf::from("take_012"));
    }

    #[test]
    fn control_streams_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("ctl");
        let streams = vec![
            ControlStream {
                points: vec![(0.0, 0.125), (0.5, -1.333333)],
            },
            ControlStream {
                points: vec![(0.25, 440.0)],
            },
        ];

        let paths = write_streams(&base, &streams).unwrap();
        assert_eq!(paths.len(), 2);
        let text = fs::read_to_string(&paths[0]).unwrap();
        assert_eq!(text.lines().next(), Some("0.000000 0.125000"));

        let read = read_control_streams(&base).unwrap();
        assert_eq!(read.len(), 2);
        for (a, b) in read.iter().zip(&streams) {
            for (p, q) in a.points.iter().zip(&b.points) {
                approx::assert_abs_diff_eq!(p.0, q.0, epsilon = 1e-6);
                approx::assert_abs_diff_eq!(p.1, q.1, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn note_streams_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("notes");
        let streams = vec![NoteStream {
            points: vec![(0.1, 60.0, 0.5), (0.4, 60.0, 0.0)],
        }];
        write_streams(&base, &streams).unwrap();
        assert_eq!(read_note_streams(&base).unwrap(), streams);
    }

    #[test]
    fn only_matching_prefix_is_read() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("ctl_001"), "1 2\n").unwrap();
        fs::write(dir.path().join("ctl_000"), "0 1\n").unwrap();
        fs::write(dir.path().join("other_000"), "9 9\n").unwrap();

        let read = read_control_streams(dir.path().join("ctl")).unwrap();
        assert_eq!(read.len(), 2);
        assert_eq!(read[0].points, vec![(0.0, 1.0)]);
        assert_eq!(read[1].points, vec![(1.0, 2.0)]);
        assert!(read_control_streams(dir.path().join("none")).unwrap().is_empty());
    }

    #[test]
    fn malformed_line_reports_position() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bad_000"), "0 1\n\n0.5 x\n").unwrap();

        let err = read_control_streams(dir.path().join("bad")).unwrap_err();
        assert!(matches!(err, Error::Parse { line: 3, .. }), "got {err:?}");

        fs::write(dir.path().join("short_000"), "0 1\n").unwrap();
        assert!(read_note_streams(dir.path().join("short")).is_err());
    }

    #[test]
    fn missing_directory_is_file_not_found() {
        let err = read_control_streams("/no/such/dir/ctl").unwrap_err();
        assert!(matches!(err, Error::FileNotFound(_)));
    }
}
