//! Full-memory waveform retrieval.
//!
//! The DS1000Z returns at most a few hundred thousand points per
//! `:WAV:DATA?`, so a capture walks the buffer in 1-based `start..=stop`
//! windows, stitches the payloads together and only then converts raw codes
//! with the preamble.

use std::fs::File;
use std::path::Path;

use polars::prelude::*;

use crate::block::MAX_FRAMING_BYTES;
use crate::error::ScopeError;
use crate::tokens::{ScpiToken, Source, WaveformFormat, WaveformMode};
use crate::transport::Transport;
use crate::waveform::{Preamble, Waveform};

pub const TIME_COLUMN_NAME: &str = "time";
pub const VALUE_COLUMN_NAME: &str = "value";

/// How a capture talks to the instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureOptions {
    pub mode: WaveformMode,
    pub format: WaveformFormat,
    /// Points per `:WAV:DATA?` request, defaults to the format's maximum.
    pub chunk_points: Option<usize>,
    /// Send `:STOP` before reading. RAW mode only works on a stopped scope.
    pub stop_first: bool,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            mode: WaveformMode::Normal,
            format: WaveformFormat::Byte,
            chunk_points: None,
            stop_first: true,
        }
    }
}

impl CaptureOptions {
    pub fn with_mode(mut self, mode: WaveformMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_format(mut self, format: WaveformFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_chunk_points(mut self, chunk_points: usize) -> Self {
        self.chunk_points = Some(chunk_points);
        self
    }

    pub fn with_stop_first(mut self, stop_first: bool) -> Self {
        self.stop_first = stop_first;
        self
    }

    fn resolved_chunk_points(&self) -> Result<usize, ScopeError> {
        let limit = self.format.max_chunk_points();
        match self.chunk_points {
            None => Ok(limit),
            Some(points) if (1..=limit).contains(&points) => Ok(points),
            Some(points) => Err(ScopeError::InvalidArgument {
                what: "chunk points",
                value: format!("{points} (1 to {limit} for {} data)", self.format),
            }),
        }
    }
}

/// Reported after every chunk has been appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureProgress {
    pub retrieved: usize,
    pub total: usize,
    /// 1-based index of the chunk just read.
    pub chunk: usize,
    pub chunks: usize,
}

impl CaptureProgress {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.retrieved as f64 / self.total as f64
        }
    }
}

/// Inclusive, 1-based `(start, stop)` windows covering `1..=total`.
#[derive(Debug, Clone)]
pub struct ChunkWindows {
    total: usize,
    chunk_points: usize,
    /// `None` once the window ending at `total` has been handed out.
    next_start: Option<usize>,
}

impl ChunkWindows {
    pub fn new(total: usize, chunk_points: usize) -> Self {
        Self {
            total,
            chunk_points,
            next_start: Some(1),
        }
    }

    pub fn chunk_count(&self) -> usize {
        if self.chunk_points == 0 {
            0
        } else {
            self.total.div_ceil(self.chunk_points)
        }
    }
}

impl Iterator for ChunkWindows {
    type Item = (usize, usize);

    fn next(&mut self) -> Option<Self::Item> {
        let start = self
            .next_start
            .filter(|&start| self.chunk_points > 0 && start <= self.total)?;
        let stop = start
            .saturating_add(self.chunk_points - 1)
            .min(self.total);
        self.next_start = stop.checked_add(1);
        Some((start, stop))
    }
}

/// Unpack one chunk payload. BYTE and WORD give raw codes, ASC gives values
/// the instrument has already scaled.
pub fn decode_samples(format: WaveformFormat, payload: &[u8]) -> Result<Vec<f64>, ScopeError> {
    match format {
        WaveformFormat::Byte => Ok(payload.iter().map(|&b| f64::from(b)).collect()),
        WaveformFormat::Word => {
            if payload.len() % 2 != 0 {
                return Err(ScopeError::unexpected(
                    ":wav:data?",
                    &format!("{} bytes of WORD data", payload.len()),
                ));
            }
            Ok(payload
                .chunks_exact(2)
                .map(|pair| f64::from(u16::from_le_bytes([pair[0], pair[1]])))
                .collect())
        }
        WaveformFormat::Ascii => {
            let text = std::str::from_utf8(payload).map_err(|_| {
                ScopeError::unexpected(":wav:data?", &String::from_utf8_lossy(payload))
            })?;
            text.split(',')
                .map(str::trim)
                .filter(|field| !field.is_empty())
                .map(|field| {
                    field
                        .parse::<f64>()
                        .map_err(|_| ScopeError::unexpected(":wav:data?", field))
                })
                .collect()
        }
    }
}

/// A converted capture: one time and one value per point.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveformData {
    pub source: Source,
    pub preamble: Preamble,
    pub time: Vec<f64>,
    pub values: Vec<f64>,
}

impl WaveformData {
    fn from_raw(source: Source, preamble: Preamble, raw: Vec<f64>) -> Self {
        let time = (0..raw.len()).map(|i| preamble.time_at(i)).collect();
        let values = if preamble.format == WaveformFormat::Ascii {
            raw
        } else {
            raw.into_iter().map(|r| preamble.to_physical(r)).collect()
        };
        Self {
            source,
            preamble,
            time,
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn to_dataframe(&self) -> Result<DataFrame, PolarsError> {
        df!(
            TIME_COLUMN_NAME => self.time.as_slice(),
            VALUE_COLUMN_NAME => self.values.as_slice(),
        )
    }

    /// Two headerless columns, time and value, in 12-digit scientific notation.
    pub fn write_csv(&self, path: &Path) -> Result<(), ScopeError> {
        let mut df = self.to_dataframe()?;
        let mut file = File::create(path)?;
        CsvWriter::new(&mut file)
            .include_header(false)
            .with_separator(b',')
            .with_float_scientific(Some(true))
            .with_float_precision(Some(12))
            .finish(&mut df)?;
        log::debug!("Wrote {} points to {}", self.len(), path.display());
        Ok(())
    }
}

/// Read every point of `source` in chunks and convert it.
///
/// `progress` is called once per chunk. Any framing error, short read or
/// count mismatch aborts the whole capture.
#[tracing::instrument(skip_all, fields(source = %source))]
pub fn capture(
    transport: &mut dyn Transport,
    source: Source,
    options: &CaptureOptions,
    progress: &mut dyn FnMut(&CaptureProgress),
) -> Result<WaveformData, ScopeError> {
    let chunk_points = options.resolved_chunk_points()?;

    if options.stop_first {
        transport.write(":stop")?;
    }
    let mut waveform = Waveform::new(transport);
    waveform.set_source(source)?;
    waveform.set_mode(options.mode)?;
    waveform.set_format(options.format)?;

    let preamble = waveform.preamble()?;
    if preamble.format != options.format {
        return Err(ScopeError::FormatMismatch {
            requested: options.format.as_scpi(),
            reported: preamble.format.as_scpi(),
        });
    }

    let total = preamble.points;
    let windows = ChunkWindows::new(total, chunk_points);
    let chunks = windows.chunk_count();
    log::info!(
        "Capturing {total} points from {source} in {chunks} chunk(s) of up to {chunk_points}"
    );

    let bytes_per_point = options.format.max_bytes_per_point();
    let mut raw = Vec::with_capacity(total);
    for (index, (start, stop)) in windows.enumerate() {
        waveform.set_start(start)?;
        waveform.set_stop(stop)?;
        let max_bytes = (stop - start + 1) * bytes_per_point + MAX_FRAMING_BYTES;
        let payload = waveform.data_block(max_bytes)?;
        raw.extend(decode_samples(options.format, &payload)?);

        let report = CaptureProgress {
            retrieved: raw.len(),
            total,
            chunk: index + 1,
            chunks,
        };
        log::debug!(
            "Chunk {}/{}: points {start}..={stop}, {} of {total} retrieved",
            report.chunk,
            report.chunks,
            report.retrieved
        );
        progress(&report);
    }

    if raw.len() != total {
        return Err(ScopeError::LengthMismatch {
            expected: total,
            actual: raw.len(),
        });
    }

    Ok(WaveformData::from_raw(source, preamble, raw))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::block::encode_block;
    use crate::mock::{Exchange, MockTransport};

    fn last_point(writes: &[String], command: &str) -> Option<usize> {
        writes
            .iter()
            .rev()
            .find_map(|w| w.strip_prefix(command))
            .and_then(|v| v.trim().parse().ok())
    }

    /// Answers `:wav:pre?` with `preamble` and every `:wav:data?` with the
    /// encoded points of the current start..=stop window, minus `short_by`.
    fn chunked_scope(
        preamble: String,
        encode_point: fn(usize) -> Vec<u8>,
        short_by: usize,
    ) -> MockTransport {
        MockTransport::new().with_responder(move |writes| {
            match writes.last()?.as_str() {
                ":wav:pre?" => Some(preamble.clone().into_bytes()),
                ":wav:data?" => {
                    let start = last_point(writes, ":wav:star ")?;
                    let stop = last_point(writes, ":wav:stop ")?;
                    let payload: Vec<u8> = (start..=stop)
                        .skip(short_by)
                        .flat_map(encode_point)
                        .collect();
                    Some(encode_block(&payload))
                }
                _ => None,
            }
        })
    }

    /// A scope holding `points` BYTE samples whose code is `index % 256`.
    pub(crate) fn byte_scope(points: usize, short_by: usize) -> MockTransport {
        chunked_scope(
            format!("1,0,{points},1,1.000000e-06,0.000000e+00,0,1.000000e-02,0,127"),
            |p| vec![((p - 1) % 256) as u8],
            short_by,
        )
    }

    #[test]
    fn test_windows_partition_every_point_once() {
        for total in 0..=60 {
            for chunk in 1..=13 {
                let windows = ChunkWindows::new(total, chunk);
                assert_eq!(windows.chunk_count(), total.div_ceil(chunk));

                let collected: Vec<_> = windows.collect();
                assert_eq!(collected.len(), total.div_ceil(chunk));
                let mut expected_start = 1;
                for (start, stop) in &collected {
                    assert_eq!(*start, expected_start);
                    assert!(stop >= start && stop - start < chunk);
                    expected_start = stop + 1;
                }
                assert_eq!(expected_start, total + 1);
            }
        }
    }

    #[test]
    fn test_huge_chunk_size_gives_one_window() {
        assert_eq!(
            ChunkWindows::new(3, usize::MAX).collect::<Vec<_>>(),
            vec![(1, 3)]
        );
        assert_eq!(
            ChunkWindows::new(usize::MAX, usize::MAX).collect::<Vec<_>>(),
            vec![(1, usize::MAX)]
        );
        assert_eq!(ChunkWindows::new(0, usize::MAX).count(), 0);
    }

    #[test]
    fn test_decode_word_and_ascii() {
        assert_eq!(
            decode_samples(WaveformFormat::Word, &[0x34, 0x12, 0xff, 0x00]).unwrap(),
            vec![4660.0, 255.0]
        );
        assert!(decode_samples(WaveformFormat::Word, &[1, 2, 3]).is_err());
        assert_eq!(
            decode_samples(WaveformFormat::Ascii, b"-1.000000e-01,2.500000e-01,").unwrap(),
            vec![-0.1, 0.25]
        );
        assert!(decode_samples(WaveformFormat::Ascii, b"1.0,volts").is_err());
    }

    #[test]
    fn test_chunked_capture() {
        let mut mock = byte_scope(10, 0);
        let handle = mock.handle();
        let options = CaptureOptions::default().with_chunk_points(4);
        let mut reports = Vec::new();

        let data = capture(&mut mock, Source::Ch1, &options, &mut |p| reports.push(*p)).unwrap();

        assert_eq!(data.len(), 10);
        assert!((data.values[0] - (-1.27)).abs() < 1e-12);
        assert!((data.values[9] - (-1.18)).abs() < 1e-12);
        assert!((data.time[9] - 9e-6).abs() < 1e-15);
        assert_eq!(
            reports.iter().map(|p| p.retrieved).collect::<Vec<_>>(),
            vec![4, 8, 10]
        );
        assert!(reports.iter().all(|p| p.chunks == 3 && p.total == 10));

        let writes = handle.writes();
        assert_eq!(
            writes[..5],
            [":stop", ":wav:sour CHAN1", ":wav:mode NORM", ":wav:form BYTE", ":wav:pre?"]
        );
        let windows: Vec<&str> = writes
            .iter()
            .filter(|w| w.starts_with(":wav:star") || w.starts_with(":wav:stop"))
            .map(String::as_str)
            .collect();
        assert_eq!(
            windows,
            vec![
                ":wav:star 1",
                ":wav:stop 4",
                ":wav:star 5",
                ":wav:stop 8",
                ":wav:star 9",
                ":wav:stop 10",
            ]
        );
    }

    #[test]
    fn test_chunked_word_capture() {
        // raw codes 1000, 2000, ... straddle the byte boundary
        let mut mock = chunked_scope(
            "0,2,5,1,2.000000e-06,-4.000000e-06,0,1.000000e-03,0,0".to_string(),
            |p| ((p * 1000) as u16).to_le_bytes().to_vec(),
            0,
        );
        let handle = mock.handle();
        let options = CaptureOptions::default()
            .with_mode(WaveformMode::Raw)
            .with_format(WaveformFormat::Word)
            .with_chunk_points(2);

        let data = capture(&mut mock, Source::Ch3, &options, &mut |_| {}).unwrap();

        assert_eq!(data.len(), 5);
        for (i, value) in data.values.iter().enumerate() {
            assert!((value - (i + 1) as f64).abs() < 1e-9);
        }
        assert!((data.time[0] - (-4e-6)).abs() < 1e-15);
        assert!((data.time[4] - 4e-6).abs() < 1e-15);
        assert_eq!(
            handle.log().iter().filter(|e| matches!(e, Exchange::ReadRaw(_))).count(),
            3
        );
        assert!(handle.log().contains(&Exchange::ReadRaw(2 * 2 + MAX_FRAMING_BYTES)));
        assert!(handle.writes().contains(&":wav:form WORD".to_string()));
    }

    #[test]
    fn test_ascii_capture_is_not_rescaled() {
        let mut mock = chunked_scope(
            "2,0,3,1,1.000000e-06,0.000000e+00,0,1.000000e-02,0,127".to_string(),
            |p| format!("{:e},", p as f64 / 10.0).into_bytes(),
            0,
        );
        let options = CaptureOptions::default()
            .with_format(WaveformFormat::Ascii)
            .with_chunk_points(2);

        let data = capture(&mut mock, Source::Ch1, &options, &mut |_| {}).unwrap();

        assert_eq!(data.values, vec![0.1, 0.2, 0.3]);
        assert!((data.time[2] - 2e-6).abs() < 1e-15);
    }

    #[test]
    fn test_short_chunks_are_a_length_mismatch() {
        let mut mock = byte_scope(10, 1);
        let options = CaptureOptions::default().with_chunk_points(5);
        assert!(matches!(
            capture(&mut mock, Source::Ch2, &options, &mut |_| {}),
            Err(ScopeError::LengthMismatch {
                expected: 10,
                actual: 8
            })
        ));
    }

    #[test]
    fn test_preamble_format_must_match_request() {
        let mut mock = byte_scope(10, 0);
        let options = CaptureOptions::default()
            .with_format(WaveformFormat::Word)
            .with_stop_first(false);
        assert!(matches!(
            capture(&mut mock, Source::Ch1, &options, &mut |_| {}),
            Err(ScopeError::FormatMismatch {
                requested: "WORD",
                reported: "BYTE"
            })
        ));
    }

    #[test]
    fn test_chunk_points_checked_before_io() {
        let mut mock = MockTransport::new();
        let handle = mock.handle();
        let options = CaptureOptions::default().with_chunk_points(250_001);
        assert!(capture(&mut mock, Source::Ch1, &options, &mut |_| {}).is_err());
        assert!(handle.log().is_empty());
    }

    #[test]
    fn test_csv_output() {
        let mut mock = byte_scope(3, 0);
        let data = capture(&mut mock, Source::Ch1, &CaptureOptions::default(), &mut |_| {}).unwrap();
        let frame = data.to_dataframe().unwrap();
        assert_eq!(frame.shape(), (3, 2));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ch1.csv");
        data.write_csv(&path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.len(), 3);
        let fields: Vec<f64> = lines[1].split(',').map(|f| f.parse().unwrap()).collect();
        assert!((fields[0] - 1e-6).abs() < 1e-15);
        assert!((fields[1] - (-1.26)).abs() < 1e-9);
    }
}
