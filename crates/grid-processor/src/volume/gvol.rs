//! Reader and writer for `.gvol` volume files.
//!
//! ```text
//! "GVOL" | header length (u32 BE) | JSON header | field 0 bytes | field 1 bytes | ...
//! ```
//!
//! Each field holds `nx * ny * nz` bytes, plane-major then row-major.

use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use bytes::{Buf, BufMut};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    Encoding, FieldGeometry, PlaneData, SourceLocation, VolumeData, VolumeHandle, VolumeSource,
    VolumeTimes,
};
use crate::error::{GridProcessorError, Result};

pub const GVOL_MAGIC: &[u8; 4] = b"GVOL";
pub const GVOL_EXTENSION: &str = "gvol";
const GVOL_VERSION: u32 = 1;
const MAX_HEADER_LEN: usize = 16 * 1024 * 1024;
const PREFIX_LEN: usize = 8;

/// JSON header of a `.gvol` file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GvolHeader {
    pub version: u32,
    pub times: VolumeTimes,
    #[serde(default)]
    pub source_name: String,
    #[serde(default)]
    pub source: SourceLocation,
    pub fields: Vec<FieldGeometry>,
}

impl GvolHeader {
    pub fn new(times: VolumeTimes, fields: Vec<FieldGeometry>) -> Self {
        Self {
            version: GVOL_VERSION,
            times,
            source_name: String::new(),
            source: SourceLocation::default(),
            fields,
        }
    }
}

/// Opens `.gvol` files.
#[derive(Debug, Clone, Copy, Default)]
pub struct GvolSource;

impl VolumeSource for GvolSource {
    fn open(&self, path: &Path) -> Result<Box<dyn VolumeHandle>> {
        Ok(Box::new(GvolHandle::open(path)?))
    }
}

/// An open `.gvol` file.
#[derive(Debug)]
pub struct GvolHandle {
    path: PathBuf,
    file: File,
    header: GvolHeader,
    field_offsets: Vec<u64>,
}

impl GvolHandle {
    pub fn open(path: &Path) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| GridProcessorError::open_failed(format!("{}: {}", path.display(), e)))?;

        let mut prefix = [0u8; PREFIX_LEN];
        file.read_exact(&mut prefix).map_err(|e| {
            GridProcessorError::open_failed(format!("{}: short prefix: {}", path.display(), e))
        })?;
        if &prefix[..4] != GVOL_MAGIC {
            return Err(GridProcessorError::invalid_metadata(format!(
                "{}: not a gvol file",
                path.display()
            )));
        }
        let header_len = (&prefix[4..]).get_u32() as usize;
        if header_len == 0 || header_len > MAX_HEADER_LEN {
            return Err(GridProcessorError::invalid_metadata(format!(
                "{}: header length {} out of range",
                path.display(),
                header_len
            )));
        }

        let mut raw = vec![0u8; header_len];
        file.read_exact(&mut raw)?;
        let header: GvolHeader = serde_json::from_slice(&raw)?;
        if header.version != GVOL_VERSION {
            return Err(GridProcessorError::invalid_metadata(format!(
                "unsupported gvol version {}",
                header.version
            )));
        }

        let mut field_offsets = Vec::with_capacity(header.fields.len());
        let mut offset = (PREFIX_LEN + header_len) as u64;
        for field in &header.fields {
            if field.grid.is_empty() {
                return Err(GridProcessorError::invalid_metadata(format!(
                    "field '{}' has an empty grid",
                    field.name
                )));
            }
            field_offsets.push(offset);
            offset += field.grid.len() as u64;
        }

        let file_len = file.metadata()?.len();
        if file_len < offset {
            return Err(GridProcessorError::read_failed(format!(
                "{}: {} bytes on disk, header describes {}",
                path.display(),
                file_len,
                offset
            )));
        }

        debug!(
            path = %path.display(),
            fields = header.fields.len(),
            "Opened gvol volume"
        );

        Ok(Self {
            path: path.to_path_buf(),
            file,
            header,
            field_offsets,
        })
    }

    pub fn header(&self) -> &GvolHeader {
        &self.header
    }

    fn field(&self, index: usize) -> Result<&FieldGeometry> {
        self.header
            .fields
            .get(index)
            .ok_or(GridProcessorError::FieldOutOfRange {
                index,
                count: self.header.fields.len(),
            })
    }

    fn read_plane_bytes(&mut self, field: usize, plane: usize) -> Result<Vec<u8>> {
        let plane_len = self.field(field)?.grid.plane_len();
        let offset = self.field_offsets[field] + (plane * plane_len) as u64;
        self.file.seek(SeekFrom::Start(offset))?;
        let mut bytes = vec![0u8; plane_len];
        self.file.read_exact(&mut bytes)?;
        Ok(bytes)
    }

    fn volume_data(&self, field: usize, planes: Vec<PlaneData>) -> Result<VolumeData> {
        let geometry = self.field(field)?.clone();
        Ok(VolumeData {
            times: self.header.times,
            field_count: self.header.fields.len(),
            vlevel_included: geometry.has_level_table(),
            source_name: self.header.source_name.clone(),
            source: self.header.source,
            field_index: field,
            field: geometry,
            planes,
        })
    }
}

impl VolumeHandle for GvolHandle {
    fn path(&self) -> &Path {
        &self.path
    }

    fn field_count(&self) -> usize {
        self.header.fields.len()
    }

    fn read_plane(&mut self, field: usize, height_km: f64, _encoding: Encoding) -> Result<VolumeData> {
        let index = self.field(field)?.vertical_levels().nearest(height_km);
        let bytes = self.read_plane_bytes(field, index)?;
        self.volume_data(field, vec![PlaneData { index, bytes }])
    }

    fn read_composite(&mut self, field: usize, _encoding: Encoding) -> Result<VolumeData> {
        let geometry = self.field(field)?.clone();
        let mut composite = vec![geometry.missing_value; geometry.grid.plane_len()];
        let mut seen = vec![false; composite.len()];
        for plane in 0..geometry.grid.nz {
            let bytes = self.read_plane_bytes(field, plane)?;
            for (i, &value) in bytes.iter().enumerate() {
                if geometry.is_invalid(value) {
                    continue;
                }
                if !seen[i] || value > composite[i] {
                    composite[i] = value;
                    seen[i] = true;
                }
            }
        }
        self.volume_data(
            field,
            vec![PlaneData {
                index: 0,
                bytes: composite,
            }],
        )
    }

    fn read_volume(&mut self, field: usize, _encoding: Encoding) -> Result<VolumeData> {
        let nz = self.field(field)?.grid.nz;
        let mut planes = Vec::with_capacity(nz);
        for index in 0..nz {
            let bytes = self.read_plane_bytes(field, index)?;
            planes.push(PlaneData { index, bytes });
        }
        self.volume_data(field, planes)
    }
}

/// Serialize a volume: header plus one byte buffer per field.
pub fn encode_gvol(header: &GvolHeader, fields: &[Vec<u8>]) -> Result<Vec<u8>> {
    if fields.len() != header.fields.len() {
        return Err(GridProcessorError::invalid_metadata(format!(
            "header describes {} fields, {} buffers given",
            header.fields.len(),
            fields.len()
        )));
    }
    for (geometry, data) in header.fields.iter().zip(fields) {
        if data.len() != geometry.grid.len() {
            return Err(GridProcessorError::invalid_metadata(format!(
                "field '{}' expects {} bytes, got {}",
                geometry.name,
                geometry.grid.len(),
                data.len()
            )));
        }
    }

    let json = serde_json::to_vec(header)?;
    let data_len: usize = fields.iter().map(Vec::len).sum();
    let mut out = Vec::with_capacity(PREFIX_LEN + json.len() + data_len);
    out.put_slice(GVOL_MAGIC);
    out.put_u32(json.len() as u32);
    out.put_slice(&json);
    for data in fields {
        out.put_slice(data);
    }
    Ok(out)
}

/// Write a volume file, replacing `path` atomically.
///
/// The temporary file starts with a dot so directory scans never pick up
/// a half-written volume.
pub fn write_gvol(path: &Path, header: &GvolHeader, fields: &[Vec<u8>]) -> Result<()> {
    let bytes = encode_gvol(header, fields)?;
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| GridProcessorError::StorageError(format!("bad path {}", path.display())))?;
    let tmp = path.with_file_name(format!(".{}.tmp", name));
    {
        let mut file = File::create(&tmp)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdata_common::GridGeometry;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn three_level_header() -> GvolHeader {
        let grid = GridGeometry::flat(3, 2, 3, 1.0, 1.0, 0.5);
        let mut field = FieldGeometry::new("DBZ", "dBZ", grid);
        field.bad_value = 0;
        field.missing_value = 255;
        let time = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        GvolHeader::new(VolumeTimes::at(time), vec![field])
    }

    fn three_level_data() -> Vec<u8> {
        vec![
            1, 2, 3, 4, 5, 6, // level 0
            9, 0, 255, 1, 50, 6, // level 1
            2, 0, 255, 8, 40, 7, // level 2
        ]
    }

    fn write_fixture(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("120000.gvol");
        write_gvol(&path, &three_level_header(), &[three_level_data()]).unwrap();
        path
    }

    #[test]
    fn test_read_plane_nearest_level() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(&dir);
        let mut handle = GvolSource.open(&path).unwrap();
        assert_eq!(handle.field_count(), 1);

        let data = handle.read_plane(0, 0.6, Encoding::Int8).unwrap();
        assert_eq!(data.planes.len(), 1);
        assert_eq!(data.planes[0].index, 1);
        assert_eq!(data.planes[0].bytes, vec![9, 0, 255, 1, 50, 6]);
        assert_eq!(data.field.name, "DBZ");
        assert!(!data.vlevel_included);
    }

    #[test]
    fn test_composite_is_max_of_valid_samples() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(&dir);
        let mut handle = GvolSource.open(&path).unwrap();
        let data = handle.read_composite(0, Encoding::Int8).unwrap();
        assert_eq!(data.planes[0].bytes, vec![9, 2, 3, 8, 50, 7]);
    }

    #[test]
    fn test_composite_all_invalid_is_missing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("000000.gvol");
        let mut header = three_level_header();
        header.fields[0].grid = GridGeometry::flat(1, 1, 2, 1.0, 1.0, 1.0);
        write_gvol(&path, &header, &[vec![0, 255]]).unwrap();
        let mut handle = GvolSource.open(&path).unwrap();
        let data = handle.read_composite(0, Encoding::Int8).unwrap();
        assert_eq!(data.planes[0].bytes, vec![255]);
    }

    #[test]
    fn test_read_volume_returns_every_plane() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(&dir);
        let mut handle = GvolSource.open(&path).unwrap();
        let data = handle.read_volume(0, Encoding::Int8).unwrap();
        let indices: Vec<usize> = data.planes.iter().map(|p| p.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(data.planes[2].bytes, vec![2, 0, 255, 8, 40, 7]);
    }

    #[test]
    fn test_field_out_of_range() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(&dir);
        let mut handle = GvolSource.open(&path).unwrap();
        let err = handle.read_volume(3, Encoding::Int8).unwrap_err();
        assert!(matches!(
            err,
            GridProcessorError::FieldOutOfRange { index: 3, count: 1 }
        ));
    }

    #[test]
    fn test_rejects_bad_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.gvol");
        fs::write(&path, b"NOPE\0\0\0\x02{}").unwrap();
        assert!(GvolHandle::open(&path).is_err());

        let path = write_fixture(&dir);
        let bytes = fs::read(&path).unwrap();
        fs::write(&path, &bytes[..bytes.len() - 4]).unwrap();
        assert!(matches!(
            GvolHandle::open(&path).unwrap_err(),
            GridProcessorError::ReadFailed(_)
        ));

        assert!(GvolHandle::open(&dir.path().join("missing.gvol")).is_err());
    }

    #[test]
    fn test_writer_checks_buffer_sizes() {
        let header = three_level_header();
        assert!(encode_gvol(&header, &[vec![0u8; 5]]).is_err());
        assert!(encode_gvol(&header, &[]).is_err());
    }

    #[test]
    fn test_writer_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        write_fixture(&dir);
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["120000.gvol".to_string()]);
    }
}
