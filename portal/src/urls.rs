//! Geoportal Thüringen download endpoints.

use crate::PortalError;
use std::{fmt, str::FromStr};
use tilegrid::{Epoch, TileName};

pub const DEFAULT_BASE_URL: &str = "https://geoportal.geoportal-th.de";

/// Elevation product.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DemFormat {
    /// Terrain model (DGM), gridded `.xyz`.
    #[default]
    Dgm,

    /// Surface model (DOM), gridded `.xyz`.
    Dom,

    /// Classified point cloud.
    Las,
}

impl DemFormat {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dgm => "dgm",
            Self::Dom => "dom",
            Self::Las => "las",
        }
    }

    /// Returns `true` for products that can be mosaicked as rasters.
    pub const fn is_raster(self) -> bool {
        !matches!(self, Self::Las)
    }
}

impl fmt::Display for DemFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DemFormat {
    type Err = PortalError;

    fn from_str(s: &str) -> Result<Self, PortalError> {
        match s.to_ascii_lowercase().as_str() {
            "dgm" => Ok(Self::Dgm),
            "dom" => Ok(Self::Dom),
            "las" => Ok(Self::Las),
            _ => Err(PortalError::DemFormat(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl Endpoints {
    pub fn new(base: impl Into<String>) -> Self {
        let mut base = base.into();
        while base.ends_with('/') {
            base.pop();
        }
        Self { base }
    }

    /// Zipped shapefile of an epoch's tile grid.
    pub fn grid(&self, epoch: Epoch) -> String {
        format!("{}/hoehendaten/Uebersichten/Stand_{epoch}.zip", self.base)
    }

    pub fn dem(&self, format: DemFormat, epoch: Epoch, tile: &TileName) -> String {
        let base = &self.base;
        let upper = format.as_str().to_ascii_uppercase();
        match format {
            DemFormat::Dgm | DemFormat::Dom => {
                format!("{base}/hoehendaten/{upper}/{format}_{epoch}/{format}1_{tile}_1_th_{epoch}.zip")
            }
            DemFormat::Las => {
                format!("{base}/hoehendaten/{upper}/{format}_{epoch}/{format}_{tile}_1_th_{epoch}.zip")
            }
        }
    }

    pub fn op(&self, id: u64) -> String {
        format!(
            "{}/gaialight-th/_apps/dladownload/download.php?type=op&id={id}",
            self.base
        )
    }
}
