//! Destinations for 16-row image bands.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::RenderError;

/// Receives image rows one band at a time, top to bottom.
pub trait BandSink {
    fn write_band(&mut self, band: &[u8]) -> Result<(), RenderError>;
}

impl BandSink for Vec<u8> {
    fn write_band(&mut self, band: &[u8]) -> Result<(), RenderError> {
        self.extend_from_slice(band);
        Ok(())
    }
}

/// Streams rows into an 8-bit RGB or RGBA PNG file.
///
/// The file is only valid once [`PngBandWriter::finish`] has seen every row.
pub struct PngBandWriter {
    path: PathBuf,
    stream: png::StreamWriter<'static, BufWriter<File>>,
    row_bytes: usize,
    height: u32,
    rows_written: u64,
}

impl PngBandWriter {
    pub fn create(path: &Path, width: u32, height: u32, rgba: bool) -> Result<Self, RenderError> {
        let file = File::create(path)?;
        let mut encoder = png::Encoder::new(BufWriter::new(file), width, height);
        encoder.set_color(if rgba {
            png::ColorType::Rgba
        } else {
            png::ColorType::Rgb
        });
        encoder.set_depth(png::BitDepth::Eight);
        let stream = encoder.write_header()?.into_stream_writer()?;
        let bytes_per_pixel = if rgba { 4 } else { 3 };
        Ok(Self {
            path: path.to_path_buf(),
            stream,
            row_bytes: width as usize * bytes_per_pixel,
            height,
            rows_written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn row_count_error(&self, written: u64) -> RenderError {
        RenderError::RowCount {
            path: self.path.clone(),
            expected: self.height,
            written,
        }
    }

    /// Flushes the image. Fails unless exactly `height` rows were written.
    pub fn finish(self) -> Result<(), RenderError> {
        if self.rows_written != u64::from(self.height) {
            return Err(self.row_count_error(self.rows_written));
        }
        self.stream.finish()?;
        Ok(())
    }
}

impl BandSink for PngBandWriter {
    fn write_band(&mut self, band: &[u8]) -> Result<(), RenderError> {
        let rows = (band.len() / self.row_bytes.max(1)) as u64;
        if self.rows_written + rows > u64::from(self.height) {
            return Err(self.row_count_error(self.rows_written + rows));
        }
        self.stream.write_all(band)?;
        self.rows_written += rows;
        Ok(())
    }
}
