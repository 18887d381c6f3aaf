//! Core types shared across the dataset modules.

use serde::{Deserialize, Serialize};

use crate::error::{DatasetError, Result};

/// A geographic bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Create a new bounding box.
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    /// Build from the `(lat_min, lat_max, lon_min, lon_max)` order used by
    /// the cropping tools.
    pub fn from_lat_lon(lat_min: f64, lat_max: f64, lon_min: f64, lon_max: f64) -> Self {
        Self::new(lon_min, lat_min, lon_max, lat_max)
    }

    /// Parse `"lat_min,lat_max,lon_min,lon_max"`.
    pub fn parse_lat_lon(s: &str) -> Result<Self> {
        let parts: Vec<f64> = s
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| DatasetError::configuration(format!("invalid bbox '{}': {}", s, e)))?;

        match parts.as_slice() {
            [lat_min, lat_max, lon_min, lon_max] => {
                Ok(Self::from_lat_lon(*lat_min, *lat_max, *lon_min, *lon_max))
            }
            _ => Err(DatasetError::configuration(format!(
                "bbox '{}' must have 4 comma-separated values",
                s
            ))),
        }
    }
}

/// Which configured year list a dataset draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Train,
    Valid,
}

impl Split {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Train => "train",
            Self::Valid => "valid",
        }
    }
}

impl std::fmt::Display for Split {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Split {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "train" => Ok(Self::Train),
            "valid" | "validation" => Ok(Self::Valid),
            other => Err(DatasetError::configuration(format!(
                "unknown split '{}', expected 'train' or 'valid'",
                other
            ))),
        }
    }
}

/// Channels a caller wants to keep from a tier.
///
/// Serialized as the string `"all"` or as a list of channel names.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawChannelRequest", into = "RawChannelRequest")]
pub enum ChannelRequest {
    #[default]
    All,
    Names(Vec<String>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawChannelRequest {
    Keyword(String),
    Names(Vec<String>),
}

impl TryFrom<RawChannelRequest> for ChannelRequest {
    type Error = String;

    fn try_from(raw: RawChannelRequest) -> std::result::Result<Self, Self::Error> {
        match raw {
            RawChannelRequest::Keyword(k) if k.eq_ignore_ascii_case("all") => Ok(Self::All),
            RawChannelRequest::Keyword(k) => Err(format!(
                "expected \"all\" or a list of channel names, got \"{}\"",
                k
            )),
            RawChannelRequest::Names(names) => Ok(Self::Names(names)),
        }
    }
}

impl From<ChannelRequest> for RawChannelRequest {
    fn from(req: ChannelRequest) -> Self {
        match req {
            ChannelRequest::All => RawChannelRequest::Keyword("all".to_string()),
            ChannelRequest::Names(names) => RawChannelRequest::Names(names),
        }
    }
}

impl ChannelRequest {
    /// Build a request from a list of names.
    pub fn names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Names(names.into_iter().map(Into::into).collect())
    }
}

/// A channel subset resolved against a tier's stored channel list.
///
/// Positions follow the requested order, which may reorder or subset the
/// storage order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSelection {
    names: Vec<String>,
    positions: Vec<usize>,
}

impl ChannelSelection {
    /// Resolve a request against the stored channel list.
    pub fn resolve(request: &ChannelRequest, available: &[String]) -> Result<Self> {
        match request {
            ChannelRequest::All => Ok(Self::all(available)),
            ChannelRequest::Names(names) => Self::from_names(names, available),
        }
    }

    /// Select every stored channel in storage order.
    pub fn all(available: &[String]) -> Self {
        Self {
            names: available.to_vec(),
            positions: (0..available.len()).collect(),
        }
    }

    /// Resolve an explicit list of names.
    pub fn from_names<S: AsRef<str>>(names: &[S], available: &[String]) -> Result<Self> {
        if names.is_empty() {
            return Err(DatasetError::configuration("channel selection is empty"));
        }

        let mut positions = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            let pos = available.iter().position(|c| c == name).ok_or_else(|| {
                DatasetError::configuration(format!(
                    "channel '{}' not in archive channels {:?}",
                    name, available
                ))
            })?;
            positions.push(pos);
        }

        Ok(Self {
            names: names.iter().map(|n| n.as_ref().to_string()).collect(),
            positions,
        })
    }

    /// Selected channel names, in output order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Storage positions, in output order.
    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
