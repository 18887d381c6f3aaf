//! In-memory archive.

use ndarray::{Array3, Array4, Axis};

use super::{ArchiveData, ArchiveHeader, YearArchive};
use crate::error::{DatasetError, Result};

/// Archive whose data cube lives in memory.
#[derive(Debug, Clone)]
pub struct MemoryArchive {
    header: ArchiveHeader,
    fields: Array4<f32>,
}

impl MemoryArchive {
    /// Wrap archive data for `year`; `location` is only used in messages.
    pub fn new(year: i32, location: impl Into<String>, data: ArchiveData) -> Result<Self> {
        let header = ArchiveHeader::new(
            year,
            location,
            data.variable,
            data.channels,
            data.times,
            data.latitude,
            data.longitude,
        )?;
        header.check_cube_shape(data.fields.shape())?;

        Ok(Self {
            header,
            fields: data.fields,
        })
    }

    /// Copy any archive into memory.
    pub fn load(archive: &dyn YearArchive) -> Result<Self> {
        let header = archive.header().clone();
        let (ny, nx) = archive.grid_shape();
        let positions: Vec<usize> = (0..header.channels.len()).collect();

        let mut fields = Array4::<f32>::zeros((header.times.len(), positions.len(), ny, nx));
        for (t, mut slab) in fields.axis_iter_mut(Axis(0)).enumerate() {
            slab.assign(&archive.read_fields(t, &positions)?);
        }

        Ok(Self { header, fields })
    }

    pub fn fields(&self) -> &Array4<f32> {
        &self.fields
    }

    /// Convert back to plain archive data.
    pub fn into_data(self) -> ArchiveData {
        ArchiveData {
            variable: self.header.variable,
            channels: self.header.channels,
            times: self.header.times,
            latitude: self.header.latitude,
            longitude: self.header.longitude,
            fields: self.fields,
        }
    }
}

impl YearArchive for MemoryArchive {
    fn header(&self) -> &ArchiveHeader {
        &self.header
    }

    fn read_fields(
        &self,
        time_position: usize,
        channel_positions: &[usize],
    ) -> Result<Array3<f32>> {
        if time_position >= self.header.times.len() {
            return Err(DatasetError::read(format!(
                "time position {} out of range for {}",
                time_position, self.header.location
            )));
        }
        if let Some(&bad) = channel_positions
            .iter()
            .find(|&&c| c >= self.header.channels.len())
        {
            return Err(DatasetError::read(format!(
                "channel position {} out of range for {}",
                bad, self.header.location
            )));
        }

        let slab = self.fields.index_axis(Axis(0), time_position);
        Ok(slab.select(Axis(0), channel_positions))
    }
}
