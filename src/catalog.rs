//! The fixed ICON-D2 catalogue: models, run hours, fields, members and levels.

use std::{fmt, str::FromStr};

use thiserror::Error;

/// Number of ensemble members published per run.
pub const MEMBER_COUNT: u8 = 5;

/// Number of vertical levels in the level table.
pub const LEVEL_COUNT: u8 = 65;

/// Model half-level heights in metres, top to bottom.
pub const STANDARD_HALF_HEIGHTS: [f64; 66] = [
    22000.000, 19401.852, 18013.409, 16906.264, 15958.169, 15118.009, 14358.139, 13661.439,
    13016.363, 12414.654, 11850.143, 11318.068, 10814.653, 10336.841, 9882.112, 9448.359,
    9033.796, 8636.893, 8256.329, 7890.952, 7539.748, 7201.825, 6876.388, 6562.725, 6260.200,
    5968.239, 5686.321, 5413.976, 5150.773, 4896.323, 4650.265, 4412.272, 4182.043, 3959.301,
    3743.791, 3535.279, 3333.549, 3138.402, 2949.656, 2767.143, 2590.708, 2420.213, 2255.527,
    2096.537, 1943.136, 1795.234, 1652.748, 1515.610, 1383.761, 1257.155, 1135.760, 1019.556,
    908.539, 802.721, 702.132, 606.827, 516.885, 432.419, 353.586, 280.598, 213.746, 153.438,
    100.277, 55.212, 20.000, 0.000,
];

/// Model full-level heights in metres, top to bottom. This is the level table.
pub const STANDARD_FULL_HEIGHTS: [f64; LEVEL_COUNT as usize] = [
    20700.926, 18707.630, 17459.836, 16432.216, 15538.089, 14738.074, 14009.789, 13338.901,
    12715.508, 12132.398, 11584.105, 11066.360, 10575.747, 10109.477, 9665.235, 9241.077,
    8835.344, 8446.611, 8073.640, 7715.350, 7370.787, 7039.106, 6719.557, 6411.462, 6114.219,
    5827.280, 5550.148, 5282.374, 5023.548, 4773.294, 4531.269, 4297.157, 4070.672, 3851.546,
    3639.535, 3434.414, 3235.976, 3044.029, 2858.399, 2678.926, 2505.461, 2337.870, 2176.032,
    2019.836, 1869.185, 1723.991, 1584.179, 1449.686, 1320.458, 1196.457, 1077.658, 964.048,
    855.630, 752.427, 654.479, 561.856, 474.652, 393.002, 317.092, 247.172, 183.592, 126.857,
    77.745, 37.606, 10.000,
];

#[derive(Debug, Error, PartialEq)]
pub enum CatalogError {
    #[error("unknown model `{0}`")]
    UnknownModel(String),
    #[error("invalid run hour `{0}`, expected one of 00, 03, ..., 21")]
    InvalidRunHour(String),
    #[error("unknown field `{0}`, expected u, v or w")]
    UnknownField(String),
    #[error("level index {0} is outside the {LEVEL_COUNT}-entry level table")]
    InvalidLevel(u8),
}

/// Grid and vertical-coordinate product of the ICON-D2 run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Model {
    IcosahedralModelLevel,
    IcosahedralPressureLevel,
    RegularLatLonModelLevel,
    RegularLatLonPressureLevel,
}

impl Model {
    pub const ALL: [Model; 4] = [
        Model::IcosahedralModelLevel,
        Model::IcosahedralPressureLevel,
        Model::RegularLatLonModelLevel,
        Model::RegularLatLonPressureLevel,
    ];

    /// Name as it appears in remote file names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Model::IcosahedralModelLevel => "icosahedral_model-level",
            Model::IcosahedralPressureLevel => "icosahedral_pressure-level",
            Model::RegularLatLonModelLevel => "regular-lat-lon_model-level",
            Model::RegularLatLonPressureLevel => "regular-lat-lon_pressure-level",
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Model {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Model::ALL
            .into_iter()
            .find(|model| model.as_str() == s)
            .ok_or_else(|| CatalogError::UnknownModel(s.to_string()))
    }
}

/// Model initialisation hour. ICON-D2 runs every three hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RunHour(u8);

impl RunHour {
    pub const ALL: [RunHour; 8] = [
        RunHour(0),
        RunHour(3),
        RunHour(6),
        RunHour(9),
        RunHour(12),
        RunHour(15),
        RunHour(18),
        RunHour(21),
    ];

    pub fn new(hour: u8) -> Result<Self, CatalogError> {
        if hour < 24 && hour % 3 == 0 {
            Ok(RunHour(hour))
        } else {
            Err(CatalogError::InvalidRunHour(hour.to_string()))
        }
    }
}

impl fmt::Display for RunHour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.0)
    }
}

impl FromStr for RunHour {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hour = s
            .parse::<u8>()
            .map_err(|_| CatalogError::InvalidRunHour(s.to_string()))?;
        RunHour::new(hour)
    }
}

/// Wind component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    U,
    V,
    W,
}

impl Field {
    pub const ALL: [Field; 3] = [Field::U, Field::V, Field::W];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::U => "u",
            Field::V => "v",
            Field::W => "w",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "u" => Ok(Field::U),
            "v" => Ok(Field::V),
            "w" => Ok(Field::W),
            _ => Err(CatalogError::UnknownField(s.to_string())),
        }
    }
}

/// Index into the level table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Level(u8);

impl Level {
    pub fn new(index: u8) -> Result<Self, CatalogError> {
        if index < LEVEL_COUNT {
            Ok(Level(index))
        } else {
            Err(CatalogError::InvalidLevel(index))
        }
    }

    /// Full-level height of this level in metres.
    pub fn height(&self) -> f64 {
        STANDARD_FULL_HEIGHTS[self.0 as usize]
    }

    /// Upper and lower half-level heights enclosing this level.
    pub fn bounds(&self) -> (f64, f64) {
        let i = self.0 as usize;
        (STANDARD_HALF_HEIGHTS[i], STANDARD_HALF_HEIGHTS[i + 1])
    }

    pub fn all() -> impl Iterator<Item = Level> + Clone {
        (0..LEVEL_COUNT).map(Level)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// -- Tests -------------------------------------------------------------------
