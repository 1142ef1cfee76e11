//! Binary container for named dense `f64` arrays.
//!
//! Layout (little-endian): magic `INFA`, format version `u32`, entry count `u32`,
//! then per entry the name (`u32` length + UTF-8 bytes), `ndim` as `u32`, each
//! dimension as `u64`, and the values in row-major order.

use crate::prelude::{ProcessingError, ProcessingResult};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use ndarray::{Array, Array1, Array2, ArrayD, Dimension, Ix1, Ix2, IxDyn};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;

const MAGIC: &[u8; 4] = b"INFA";
const FORMAT_VERSION: u32 = 1;
const MAX_NAME_LEN: usize = 1024;
const MAX_NDIM: usize = 8;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArrayBundle {
    arrays: BTreeMap<String, ArrayD<f64>>,
}

impl ArrayBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<D: Dimension>(&mut self, name: &str, array: Array<f64, D>) {
        self.arrays.insert(name.to_string(), array.into_dyn());
    }

    pub fn get(&self, name: &str) -> Option<&ArrayD<f64>> {
        self.arrays.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.arrays.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.arrays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arrays.is_empty()
    }

    pub fn take1(&mut self, name: &str) -> ProcessingResult<Array1<f64>> {
        self.take(name)?
            .into_dimensionality::<Ix1>()
            .map_err(|err| ProcessingError::Format(format!("{} is not 1-D: {}", name, err)))
    }

    pub fn take2(&mut self, name: &str) -> ProcessingResult<Array2<f64>> {
        self.take(name)?
            .into_dimensionality::<Ix2>()
            .map_err(|err| ProcessingError::Format(format!("{} is not 2-D: {}", name, err)))
    }

    fn take(&mut self, name: &str) -> ProcessingResult<ArrayD<f64>> {
        if let Some(array) = self.arrays.remove(name) {
            return Ok(array);
        }
        let present: Vec<&str> = self.names().collect();
        Err(ProcessingError::MissingAttribute(format!(
            "archive key {} (present: {})",
            name,
            present.join(", ")
        )))
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> ProcessingResult<()> {
        writer.write_all(MAGIC)?;
        writer.write_u32::<LittleEndian>(FORMAT_VERSION)?;
        writer.write_u32::<LittleEndian>(self.arrays.len() as u32)?;
        for (name, array) in &self.arrays {
            writer.write_u32::<LittleEndian>(name.len() as u32)?;
            writer.write_all(name.as_bytes())?;
            writer.write_u32::<LittleEndian>(array.ndim() as u32)?;
            for &dim in array.shape() {
                writer.write_u64::<LittleEndian>(dim as u64)?;
            }
            for &value in array.iter() {
                writer.write_f64::<LittleEndian>(value)?;
            }
        }
        Ok(())
    }

    pub fn read_from<R: Read>(reader: &mut R) -> ProcessingResult<Self> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic).map_err(truncated)?;
        if &magic != MAGIC {
            return Err(ProcessingError::Format("bad magic".into()));
        }
        let version = reader.read_u32::<LittleEndian>().map_err(truncated)?;
        if version != FORMAT_VERSION {
            return Err(ProcessingError::Format(format!(
                "unsupported format version {}",
                version
            )));
        }

        let count = reader.read_u32::<LittleEndian>().map_err(truncated)?;
        let mut arrays = BTreeMap::new();
        for _ in 0..count {
            let name_len = reader.read_u32::<LittleEndian>().map_err(truncated)? as usize;
            if name_len > MAX_NAME_LEN {
                return Err(ProcessingError::Format(format!("entry name of {} bytes", name_len)));
            }
            let mut name = vec![0u8; name_len];
            reader.read_exact(&mut name).map_err(truncated)?;
            let name = String::from_utf8(name)
                .map_err(|_| ProcessingError::Format("entry name is not UTF-8".into()))?;

            let ndim = reader.read_u32::<LittleEndian>().map_err(truncated)? as usize;
            if ndim > MAX_NDIM {
                return Err(ProcessingError::Format(format!("{} has {} dimensions", name, ndim)));
            }
            let mut shape = Vec::with_capacity(ndim);
            for _ in 0..ndim {
                shape.push(reader.read_u64::<LittleEndian>().map_err(truncated)? as usize);
            }
            let count = shape
                .iter()
                .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
                .ok_or_else(|| ProcessingError::Format(format!("{} shape overflows", name)))?;

            let mut values = vec![0.0; count];
            reader
                .read_f64_into::<LittleEndian>(&mut values)
                .map_err(truncated)?;
            let array = ArrayD::from_shape_vec(IxDyn(&shape), values)
                .map_err(|err| ProcessingError::Format(format!("{}: {}", name, err)))?;
            arrays.insert(name, array);
        }

        Ok(Self { arrays })
    }

    /// Writes the bundle to a sibling temporary file and renames it over `path`.
    pub fn save(&self, path: &Path) -> ProcessingResult<()> {
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        let mut temp = NamedTempFile::new_in(parent)?;
        {
            let mut writer = BufWriter::new(temp.as_file_mut());
            self.write_to(&mut writer)?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.persist(path)
            .map_err(|err| ProcessingError::Io(err.error))?;
        Ok(())
    }

    pub fn load(path: &Path) -> ProcessingResult<Self> {
        let mut reader = BufReader::new(File::open(path)?);
        Self::read_from(&mut reader)
    }
}

fn truncated(err: io::Error) -> ProcessingError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        ProcessingError::Format("truncated archive".into())
    } else {
        ProcessingError::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::io::Cursor;

    fn sample_bundle() -> ArrayBundle {
        let mut bundle = ArrayBundle::new();
        bundle.insert("matrix", array![[1.0, -2.5, 3.0], [0.1, 0.2, f64::MAX]]);
        bundle.insert("vector", array![1e-300, -0.0, 42.0]);
        bundle
    }

    #[test]
    fn bundle_survives_a_byte_round_trip() {
        let bundle = sample_bundle();
        let mut bytes = Vec::new();
        bundle.write_to(&mut bytes).unwrap();
        let restored = ArrayBundle::read_from(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(restored, bundle);
        assert_eq!(restored.names().collect::<Vec<_>>(), vec!["matrix", "vector"]);
    }

    #[test]
    fn typed_access_checks_rank_and_presence() {
        let mut bundle = sample_bundle();
        match bundle.take2("missing") {
            Err(ProcessingError::MissingAttribute(message)) => {
                assert_eq!(message, "archive key missing (present: matrix, vector)");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(bundle.take1("matrix"), Err(ProcessingError::Format(_))));
        assert_eq!(bundle.take1("vector").unwrap().len(), 3);
    }

    #[test]
    fn truncated_or_foreign_bytes_are_rejected() {
        let mut bytes = Vec::new();
        sample_bundle().write_to(&mut bytes).unwrap();
        bytes.truncate(bytes.len() - 3);
        assert!(matches!(
            ArrayBundle::read_from(&mut Cursor::new(bytes)),
            Err(ProcessingError::Format(_))
        ));
        assert!(matches!(
            ArrayBundle::read_from(&mut Cursor::new(b"NOPE".to_vec())),
            Err(ProcessingError::Format(_))
        ));
    }

    #[test]
    fn save_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("bundle.bin");
        sample_bundle().save(&path).unwrap();

        let mut smaller = ArrayBundle::new();
        smaller.insert("vector", array![1.0]);
        smaller.save(&path).unwrap();
        assert_eq!(ArrayBundle::load(&path).unwrap(), smaller);
    }
}
