//! Zarr V3 writer for yearly archives.
//!
//! Used by the offline tools (dummy data, cropping) to produce archives in
//! the layout [`ZarrArchive`](crate::archive::ZarrArchive) reads.

use std::path::Path;
use std::sync::Arc;

use zarrs::array::codec::bytes_to_bytes::blosc::{
    BloscCodec, BloscCompressionLevel, BloscCompressor, BloscShuffleMode,
};
use zarrs::array::{ArrayBuilder, ChunkGrid, DataType, FillValue};
use zarrs::array_subset::ArraySubset;
use zarrs::group::GroupBuilder;
use zarrs::storage::{ReadableStorageTraits, WritableStorageTraits};
use zarrs_filesystem::FilesystemStore;

use crate::archive::{
    ArchiveData, TimeUnits, FIELDS_ARRAY, LATITUDE_ARRAY, LONGITUDE_ARRAY, TIME_ARRAY,
};
use crate::config::{ArchiveWriterConfig, ZarrCompression};
use crate::error::{DatasetError, Result};

/// Result of writing an archive.
#[derive(Debug, Clone)]
pub struct ArchiveWriteResult {
    /// Number of time steps written.
    pub times: usize,
    /// Channel names, in storage order.
    pub channels: Vec<String>,
    /// `(height, width)` of one plane.
    pub grid_shape: (usize, usize),
}

/// Writer for yearly Zarr V3 archives.
pub struct ArchiveWriter {
    config: ArchiveWriterConfig,
    time_units: TimeUnits,
}

impl ArchiveWriter {
    /// Create a new writer with the given configuration.
    pub fn new(config: ArchiveWriterConfig) -> Self {
        Self {
            config,
            time_units: TimeUnits::hours_since_epoch(),
        }
    }

    /// Encode the time coordinate with different units.
    pub fn with_time_units(mut self, units: TimeUnits) -> Self {
        self.time_units = units;
        self
    }

    /// Write `data` into a directory, creating it if needed.
    pub fn write_to_path(&self, path: &Path, data: &ArchiveData) -> Result<ArchiveWriteResult> {
        std::fs::create_dir_all(path)?;
        let store = FilesystemStore::new(path).map_err(DatasetError::write)?;
        let result = self.write(Arc::new(store), data)?;

        tracing::info!(
            path = %path.display(),
            times = result.times,
            channels = ?result.channels,
            grid = ?result.grid_shape,
            "Wrote archive"
        );
        Ok(result)
    }

    /// Write `data` as an archive group at the root of `storage`.
    pub fn write<S>(&self, storage: Arc<S>, data: &ArchiveData) -> Result<ArchiveWriteResult>
    where
        S: ReadableStorageTraits + WritableStorageTraits + 'static,
    {
        self.config.validate()?;
        let (nt, nc, ny, nx) = data.fields.dim();

        if nt == 0 || nc == 0 || ny == 0 || nx == 0 {
            return Err(DatasetError::write(format!(
                "cannot write an empty cube of shape {:?}",
                data.fields.dim()
            )));
        }
        if nt != data.times.len() || nc != data.channels.len() {
            return Err(DatasetError::write(format!(
                "cube shape {:?} does not match {} times and {} channels",
                data.fields.dim(),
                data.times.len(),
                nc
            )));
        }
        if data.latitude.dim() != (ny, nx) || data.longitude.dim() != (ny, nx) {
            return Err(DatasetError::write(format!(
                "coordinate grids {:?}/{:?} do not match plane shape {:?}",
                data.latitude.dim(),
                data.longitude.dim(),
                (ny, nx)
            )));
        }

        GroupBuilder::new()
            .build(storage.clone(), "/")
            .map_err(DatasetError::write)?
            .store_metadata()
            .map_err(DatasetError::write)?;

        // Data cube
        let mut attrs = serde_json::Map::new();
        attrs.insert("variable".to_string(), serde_json::json!(data.variable));
        attrs.insert("channels".to_string(), serde_json::json!(data.channels));
        attrs.insert(
            "_ARRAY_DIMENSIONS".to_string(),
            serde_json::json!(["time", "channel", "y", "x"]),
        );

        let time_chunk = self.config.time_chunk.min(nt) as u64;
        let mut binding = ArrayBuilder::new(
            vec![nt as u64, nc as u64, ny as u64, nx as u64],
            DataType::Float32,
            chunk_grid(vec![time_chunk, nc as u64, ny as u64, nx as u64])?,
            FillValue::from(f32::NAN),
        );
        let mut builder = binding.attributes(attrs);
        if self.config.compression != ZarrCompression::None {
            builder = builder.bytes_to_bytes_codecs(vec![self.create_compression_codec()?]);
        }
        let fields = builder
            .build(storage.clone(), FIELDS_ARRAY)
            .map_err(DatasetError::write)?;
        fields.store_metadata().map_err(DatasetError::write)?;

        let cube = data.fields.as_standard_layout();
        let cube = cube
            .as_slice()
            .ok_or_else(|| DatasetError::write("data cube is not contiguous"))?;
        let subset = ArraySubset::new_with_start_shape(
            vec![0, 0, 0, 0],
            vec![nt as u64, nc as u64, ny as u64, nx as u64],
        )
        .map_err(DatasetError::write)?;
        fields
            .store_array_subset_elements(&subset, cube)
            .map_err(DatasetError::write)?;

        // Time coordinate
        let raw_times = data
            .times
            .iter()
            .map(|t| self.time_units.encode(*t))
            .collect::<Result<Vec<i64>>>()?;
        let mut time_attrs = serde_json::Map::new();
        time_attrs.insert(
            "units".to_string(),
            serde_json::json!(self.time_units.to_attribute()),
        );
        time_attrs.insert("calendar".to_string(), serde_json::json!("proleptic_gregorian"));
        let time = ArrayBuilder::new(
            vec![nt as u64],
            DataType::Int64,
            chunk_grid(vec![nt as u64])?,
            FillValue::from(0i64),
        )
        .attributes(time_attrs)
        .build(storage.clone(), TIME_ARRAY)
        .map_err(DatasetError::write)?;
        time.store_metadata().map_err(DatasetError::write)?;
        let subset = ArraySubset::new_with_start_shape(vec![0], vec![nt as u64])
            .map_err(DatasetError::write)?;
        time.store_array_subset_elements(&subset, raw_times.as_slice())
            .map_err(DatasetError::write)?;

        // Coordinate grids
        for (path, grid) in [(LATITUDE_ARRAY, &data.latitude), (LONGITUDE_ARRAY, &data.longitude)] {
            let array = ArrayBuilder::new(
                vec![ny as u64, nx as u64],
                DataType::Float64,
                chunk_grid(vec![ny as u64, nx as u64])?,
                FillValue::from(f64::NAN),
            )
            .build(storage.clone(), path)
            .map_err(DatasetError::write)?;
            array.store_metadata().map_err(DatasetError::write)?;

            let values = grid.as_standard_layout();
            let values = values
                .as_slice()
                .ok_or_else(|| DatasetError::write("coordinate grid is not contiguous"))?;
            let subset = ArraySubset::new_with_start_shape(vec![0, 0], vec![ny as u64, nx as u64])
                .map_err(DatasetError::write)?;
            array
                .store_array_subset_elements(&subset, values)
                .map_err(DatasetError::write)?;
        }

        Ok(ArchiveWriteResult {
            times: nt,
            channels: data.channels.clone(),
            grid_shape: (ny, nx),
        })
    }

    /// Create the compression codec based on configuration.
    fn create_compression_codec(
        &self,
    ) -> Result<Arc<dyn zarrs::array::codec::BytesToBytesCodecTraits>> {
        let level = BloscCompressionLevel::try_from(self.config.compression_level)
            .map_err(|_| DatasetError::configuration("invalid compression level"))?;

        let shuffle = if self.config.shuffle {
            BloscShuffleMode::Shuffle
        } else {
            BloscShuffleMode::NoShuffle
        };

        // typesize is required when shuffle is enabled
        let typesize = if self.config.shuffle { Some(4) } else { None };

        let compressor = match self.config.compression {
            ZarrCompression::None => {
                return Err(DatasetError::configuration("no compression configured"))
            }
            ZarrCompression::Lz4 | ZarrCompression::BloscLz4 => BloscCompressor::LZ4,
            ZarrCompression::Zstd | ZarrCompression::BloscZstd => BloscCompressor::Zstd,
        };

        let codec = BloscCodec::new(compressor, level, None, shuffle, typesize)
            .map_err(|e| DatasetError::configuration(e.to_string()))?;

        Ok(Arc::new(codec))
    }
}

/// Regular chunk grid with the given chunk shape.
fn chunk_grid(chunk_shape: Vec<u64>) -> Result<ChunkGrid> {
    chunk_shape
        .try_into()
        .map_err(|e| DatasetError::configuration(format!("invalid chunk shape: {:?}", e)))
}
