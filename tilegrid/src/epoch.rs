use crate::TileGridError;
use serde::Serialize;
use std::{fmt, str::FromStr};

/// Last acquisition year whose orthophotos are registered in 2x2
/// blocks under the block's lower-left cell.
pub const BLOCK_REGISTRATION_LAST_YEAR: u16 = 2018;

/// DEM grid vintage.
///
/// Each epoch has its own tile grid and its own DEM archives on the
/// portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "&'static str")]
pub enum Epoch {
    Y2010To2013,
    Y2014To2019,
    Y2020To2025,
}

impl Epoch {
    pub const ALL: [Epoch; 3] = [Epoch::Y2010To2013, Epoch::Y2014To2019, Epoch::Y2020To2025];

    /// Returns the grid epoch serving `year`.
    ///
    /// Years before 2010 fall into the oldest epoch; orthophotos from
    /// 1997 and 2008 are published on that grid.
    pub fn from_year(year: u16) -> Result<Self, TileGridError> {
        match year {
            ..=2013 => Ok(Self::Y2010To2013),
            2014..=2019 => Ok(Self::Y2014To2019),
            2020..=2025 => Ok(Self::Y2020To2025),
            _ => Err(TileGridError::InvalidYear(year)),
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Y2010To2013 => "2010-2013",
            Self::Y2014To2019 => "2014-2019",
            Self::Y2020To2025 => "2020-2025",
        }
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<Epoch> for &'static str {
    fn from(epoch: Epoch) -> &'static str {
        epoch.label()
    }
}

impl FromStr for Epoch {
    type Err = TileGridError;

    fn from_str(s: &str) -> Result<Self, TileGridError> {
        Self::ALL
            .into_iter()
            .find(|epoch| epoch.label() == s)
            .ok_or_else(|| TileGridError::InvalidEpoch(s.to_string()))
    }
}

/// Returns `true` if tiles acquired in `year` are registered per 2x2
/// block.
pub const fn is_block_registered(year: u16) -> bool {
    year <= BLOCK_REGISTRATION_LAST_YEAR
}
