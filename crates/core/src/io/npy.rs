//! Per-image NumPy `.npy` arrays of shape `(band, row, col)`

use crate::error::{Error, Result};
use ndarray::{Array3, ArrayView3};
use ndarray_npy::{ReadNpyError, ReadNpyExt, ReadableElement, WriteNpyExt};
use num_traits::AsPrimitive;
use std::fs::File;
use std::io::{BufWriter, Cursor};
use std::path::Path;

type Decode = fn(&[u8]) -> std::result::Result<Array3<f64>, ReadNpyError>;

/// Element types tried in order until the header descriptor matches
const DECODERS: [Decode; 10] = [
    decode::<f64>,
    decode::<f32>,
    decode::<u16>,
    decode::<i16>,
    decode::<u8>,
    decode::<i8>,
    decode::<u32>,
    decode::<i32>,
    decode::<u64>,
    decode::<i64>,
];

/// Read a 3-D `.npy` array, converting any numeric element type to `f64`.
pub fn read_npy_image<P: AsRef<Path>>(path: P) -> Result<Array3<f64>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::MissingResource(path.to_path_buf()));
    }
    let bytes = std::fs::read(path)?;
    read_npy_image_from_buffer(&bytes)
}

/// Read a 3-D `.npy` array from an in-memory buffer.
pub fn read_npy_image_from_buffer(data: &[u8]) -> Result<Array3<f64>> {
    for decoder in DECODERS {
        match decoder(data) {
            Ok(image) => return Ok(image),
            Err(ReadNpyError::WrongDescriptor(..)) => continue,
            Err(e @ ReadNpyError::WrongNdim(..)) => {
                return Err(Error::InvalidShape {
                    expected: "(band, row, col)".into(),
                    actual: e.to_string(),
                })
            }
            Err(e) => return Err(Error::Npy(e.to_string())),
        }
    }
    Err(Error::UnsupportedDataType("npy element type is not numeric".into()))
}

fn decode<T>(data: &[u8]) -> std::result::Result<Array3<f64>, ReadNpyError>
where
    T: ReadableElement + AsPrimitive<f64>,
{
    let array = Array3::<T>::read_npy(Cursor::new(data))?;
    Ok(array.mapv(|v| v.as_()))
}

/// Write a `(band, row, col)` image as a little-endian `f64` `.npy` file.
pub fn write_npy_image<P: AsRef<Path>>(image: ArrayView3<'_, f64>, path: P) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    image.write_npy(writer).map_err(|e| Error::Npy(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, Array3};

    #[test]
    fn test_f64_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.npy");
        let image = Array3::from_shape_fn((3, 4, 5), |(b, r, c)| (b * 100 + r * 10 + c) as f64 + 0.25);
        write_npy_image(image.view(), &path).unwrap();
        assert_eq!(read_npy_image(&path).unwrap(), image);
    }

    #[test]
    fn test_integer_and_f32_arrays_are_converted() {
        let reflectance = Array3::from_shape_fn((2, 2, 2), |(b, r, c)| (b * 1000 + r * 10 + c) as u16);
        let mut buf = Vec::new();
        reflectance.write_npy(&mut buf).unwrap();
        let image = read_npy_image_from_buffer(&buf).unwrap();
        assert_eq!(image[[1, 1, 1]], 1011.0);

        let scaled = Array3::from_elem((1, 2, 3), 0.5f32);
        let mut buf = Vec::new();
        scaled.write_npy(&mut buf).unwrap();
        assert_eq!(read_npy_image_from_buffer(&buf).unwrap(), Array3::from_elem((1, 2, 3), 0.5));
    }

    #[test]
    fn test_wrong_rank() {
        let mut buf = Vec::new();
        Array2::<f64>::zeros((4, 4)).write_npy(&mut buf).unwrap();
        assert!(matches!(
            read_npy_image_from_buffer(&buf),
            Err(Error::InvalidShape { .. })
        ));
    }

    #[test]
    fn test_missing_and_garbage() {
        assert!(matches!(
            read_npy_image("/no/such/image.npy"),
            Err(Error::MissingResource(_))
        ));
        assert!(matches!(
            read_npy_image_from_buffer(b"not an npy file"),
            Err(Error::Npy(_))
        ));
    }
}
