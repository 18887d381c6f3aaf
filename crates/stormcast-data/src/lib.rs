//! Paired Low/High Resolution Weather Sample Dataset
//!
//! This crate serves time-synchronized pairs of low-resolution ("background")
//! and high-resolution ("state") gridded weather fields stored as one Zarr V3
//! archive per tier and calendar year.
//!
//! - **Sample index**: every hourly input timestamp whose target
//!   (`input + lead time`) stays inside the configured years
//! - **Archive resolver**: one open archive per year, looked up by calendar year
//! - **Extraction**: exact time match over an ordered channel subset
//! - **Normalization**: per-channel mean/std, with an exact inverse
//!
//! # Architecture
//!
//! ```text
//! PairedDataset::get(i)
//!      │
//!      ├─► SampleIndex::resolve(i) ──► (input, input + lead)
//!      │
//!      ├─► ArchiveResolver::resolve(t) ──► yearly archive
//!      │
//!      ├─► extract(archive, t, selection) ──► (channel, y, x)
//!      │
//!      └─► NormalizationStats::normalize
//!               │
//!               ▼
//!          Sample { background, state_input, state_target }
//! ```
//!
//! The offline path (dummy data, statistics, cropping) writes archives with
//! [`ArchiveWriter`] and crops them with [`CropWindow`].
//!
//! # Example
//!
//! ```ignore
//! use stormcast_data::{DatasetConfig, PairedDataset, Split};
//!
//! let config = DatasetConfig::from_yaml("dataset.yaml")?;
//! let dataset = PairedDataset::open(&config, Split::Train)?;
//!
//! let sample = dataset.get(0)?;
//! assert_eq!(sample.target_time - sample.input_time, dataset.index().lead_time());
//! ```

pub mod archive;
pub mod config;
pub mod crop;
pub mod dataset;
pub mod dummy;
pub mod error;
pub mod extract;
pub mod index;
pub mod normalize;
pub mod resolver;
pub mod stats;
pub mod types;
pub mod writer;

// Re-export commonly used types at crate root
pub use archive::{
    discover, meshgrid, ArchiveData, ArchiveHeader, ArchiveLocation, MemoryArchive, TimeUnits,
    YearArchive, ZarrArchive,
};
pub use config::{ArchiveWriterConfig, DatasetConfig, TierConfig, ZarrCompression};
pub use crop::{index_bounds, nearest_index, CropWindow};
pub use dataset::{PairedDataset, Sample, TieredSource};
pub use error::{DatasetError, Result};
pub use extract::extract;
pub use index::{MissingSamples, NoMissing, SampleIndex, UncoveredYears};
pub use normalize::{denormalize, normalize, NormalizationStats};
pub use resolver::ArchiveResolver;
pub use stats::compute_stats;
pub use types::{BoundingBox, ChannelRequest, ChannelSelection, Split};
pub use writer::{ArchiveWriteResult, ArchiveWriter};
