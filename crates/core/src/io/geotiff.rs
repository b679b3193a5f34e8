//! Multi-band TIFF reading/writing
//!
//! Uses the `tiff` crate. An image is either a single IFD holding all bands
//! as interleaved samples, or one IFD per band (or per group of bands).
//! Written files use one 64-bit float page per band so values survive a
//! round-trip exactly.

use crate::error::{Error, Result};
use crate::labels::LabelMap;
use ndarray::{Array3, ArrayView3, Axis};
use num_traits::ToPrimitive;
use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Read, Seek, Write};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::{Gray32, Gray64Float, RGB8};
use tiff::encoder::TiffEncoder;
use tiff::ColorType;

/// Read a multi-band TIFF into a `(band, row, col)` array.
pub fn read_multiband<P: AsRef<Path>>(path: P) -> Result<Array3<f64>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::MissingResource(path.to_path_buf()));
    }
    let file = File::open(path)?;
    decode_multiband(BufReader::new(file))
}

/// Read a multi-band TIFF from an in-memory buffer.
pub fn read_multiband_from_buffer(data: &[u8]) -> Result<Array3<f64>> {
    decode_multiband(Cursor::new(data))
}

/// Decoded IFD: spatial size and band-sequential samples
struct Page {
    rows: usize,
    cols: usize,
    bands: Vec<Vec<f64>>,
}

fn decode_multiband<R: Read + Seek>(reader: R) -> Result<Array3<f64>> {
    let mut decoder = Decoder::new(reader)?;
    let mut pages = Vec::new();

    loop {
        let (width, height) = decoder.dimensions()?;
        let samples = samples_per_pixel(decoder.colortype()?)?;
        let values = decoding_to_f64(decoder.read_image()?)?;
        let (rows, cols) = (height as usize, width as usize);

        if values.len() != rows * cols * samples {
            return Err(Error::shape(rows * cols * samples, values.len()));
        }

        // Deinterleave chunky samples into one vector per band
        let mut bands = vec![Vec::with_capacity(rows * cols); samples];
        for pixel in values.chunks_exact(samples) {
            for (band, &v) in bands.iter_mut().zip(pixel) {
                band.push(v);
            }
        }
        pages.push(Page { rows, cols, bands });

        if !decoder.more_images() {
            break;
        }
        decoder.next_image()?;
    }

    let (rows, cols) = (pages[0].rows, pages[0].cols);
    if let Some(page) = pages.iter().find(|p| (p.rows, p.cols) != (rows, cols)) {
        return Err(Error::shape((rows, cols), (page.rows, page.cols)));
    }

    let n_bands: usize = pages.iter().map(|p| p.bands.len()).sum();
    let flat: Vec<f64> = pages
        .into_iter()
        .flat_map(|p| p.bands.into_iter().flatten())
        .collect();

    Ok(Array3::from_shape_vec((n_bands, rows, cols), flat)?)
}

fn samples_per_pixel(color: ColorType) -> Result<usize> {
    match color {
        ColorType::Gray(_) => Ok(1),
        ColorType::GrayA(_) => Ok(2),
        ColorType::RGB(_) => Ok(3),
        ColorType::RGBA(_) | ColorType::CMYK(_) => Ok(4),
        ColorType::Multiband { num_samples, .. } => Ok(num_samples as usize),
        other => Err(Error::UnsupportedDataType(format!("TIFF color type {:?}", other))),
    }
}

fn cast_all<T: ToPrimitive>(buf: Vec<T>) -> Vec<f64> {
    buf.into_iter().map(|v| v.to_f64().unwrap_or(f64::NAN)).collect()
}

fn decoding_to_f64(result: DecodingResult) -> Result<Vec<f64>> {
    let data = match result {
        DecodingResult::U8(buf) => cast_all(buf),
        DecodingResult::U16(buf) => cast_all(buf),
        DecodingResult::U32(buf) => cast_all(buf),
        DecodingResult::I8(buf) => cast_all(buf),
        DecodingResult::I16(buf) => cast_all(buf),
        DecodingResult::I32(buf) => cast_all(buf),
        DecodingResult::F32(buf) => cast_all(buf),
        DecodingResult::F64(buf) => buf,
        _ => return Err(Error::UnsupportedDataType("Unsupported TIFF pixel format".to_string())),
    };
    Ok(data)
}

/// Write a `(band, row, col)` array as a TIFF with one f64 page per band.
pub fn write_multiband<P: AsRef<Path>>(image: ArrayView3<'_, f64>, path: P) -> Result<()> {
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    encode_multiband(image, &mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Write a `(band, row, col)` array to an in-memory TIFF buffer.
pub fn write_multiband_to_buffer(image: ArrayView3<'_, f64>) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_multiband(image, Cursor::new(&mut buf))?;
    Ok(buf)
}

fn encode_multiband<W: Write + Seek>(image: ArrayView3<'_, f64>, writer: W) -> Result<()> {
    let (bands, rows, cols) = image.dim();
    if bands == 0 || rows == 0 || cols == 0 {
        return Err(Error::shape("non-empty (band, row, col)", (bands, rows, cols)));
    }
    let mut encoder = TiffEncoder::new(writer)?;
    for band in image.axis_iter(Axis(0)) {
        let data: Vec<f64> = band.iter().copied().collect();
        encoder.write_image::<Gray64Float>(cols as u32, rows as u32, &data)?;
    }
    Ok(())
}

/// Write interleaved 8-bit RGB bytes as a viewable TIFF.
pub fn write_rgb8<P: AsRef<Path>>(rgb: &[u8], rows: usize, cols: usize, path: P) -> Result<()> {
    if rows == 0 || cols == 0 || rgb.len() != rows * cols * 3 {
        return Err(Error::shape(format!("{} RGB bytes", rows * cols * 3), rgb.len()));
    }
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    TiffEncoder::new(&mut writer)?.write_image::<RGB8>(cols as u32, rows as u32, rgb)?;
    writer.flush()?;
    Ok(())
}

/// Write a label map as a single-band 32-bit unsigned TIFF.
pub fn write_labels<P: AsRef<Path>>(labels: &LabelMap, path: P) -> Result<()> {
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    encode_labels(labels, &mut writer)?;
    writer.flush()?;
    Ok(())
}

fn encode_labels<W: Write + Seek>(labels: &LabelMap, writer: W) -> Result<()> {
    let (rows, cols) = labels.shape();
    let data: Vec<u32> = labels.view().iter().copied().collect();
    let mut encoder = TiffEncoder::new(writer)?;
    encoder.write_image::<Gray32>(cols as u32, rows as u32, &data)?;
    Ok(())
}

/// Read a label map written by [`write_labels`].
pub fn read_labels<P: AsRef<Path>>(path: P) -> Result<LabelMap> {
    let image = read_multiband(path)?;
    let (bands, rows, cols) = image.dim();
    if bands != 1 {
        return Err(Error::shape("1 band", bands));
    }
    let mut flat = Vec::with_capacity(rows * cols);
    for &v in image.iter() {
        if !(v >= 0.0 && v <= u32::MAX as f64) || v.fract() != 0.0 {
            return Err(Error::InvalidInput(format!("invalid label value {}", v)));
        }
        flat.push(v as u32);
    }
    let n_labels = flat.iter().max().map_or(0, |&m| m as usize + 1);
    LabelMap::from_flat(flat, rows, cols, n_labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_buffer_roundtrip_exact() {
        let image = Array3::from_shape_fn((3, 4, 5), |(b, r, c)| {
            0.1 * b as f64 + 1e-9 * r as f64 + 1234.5678 * c as f64
        });
        let buf = write_multiband_to_buffer(image.view()).unwrap();
        let back = read_multiband_from_buffer(&buf).unwrap();
        assert_eq!(back, image);
    }

    #[test]
    fn test_empty_image_rejected() {
        let image = Array3::<f64>::zeros((0, 2, 2));
        assert!(write_multiband_to_buffer(image.view()).is_err());
    }

    #[test]
    fn test_missing_file() {
        let r = read_multiband("/definitely/not/here.tif");
        assert!(matches!(r, Err(Error::MissingResource(_))));
    }

    #[test]
    fn test_rgb8_written_interleaved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preview.tif");
        let rgb = [255, 0, 0, 0, 128, 0, 0, 0, 255, 10, 20, 30];
        write_rgb8(&rgb, 2, 2, &path).unwrap();
        let back = read_multiband(&path).unwrap();
        assert_eq!(back.dim(), (3, 2, 2));
        assert_eq!(back[[0, 0, 0]], 255.0);
        assert_eq!(back[[1, 0, 1]], 128.0);
        assert_eq!(back[[2, 1, 1]], 30.0);
        assert!(write_rgb8(&rgb[..9], 2, 2, &path).is_err());
    }

    #[test]
    fn test_labels_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.tif");
        let labels = LabelMap::new(array![[0, 1, 1], [2, 2, 0]], 3).unwrap();
        write_labels(&labels, &path).unwrap();
        assert_eq!(read_labels(&path).unwrap(), labels);
    }
}
