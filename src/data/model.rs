use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::error::GridError;

// ---------------------------------------------------------------------------
// Column names
// ---------------------------------------------------------------------------

pub const GRID_ID: &str = "grid_id";
pub const GRID_SEGMENT: &str = "grid_segment";
pub const GRID_SEGMENT_KMEANS: &str = "grid_segment_kmeans";
pub const GRID_SCORE: &str = "grid_score";

/// Every column the loader insists on, in the order they are checked.
pub const REQUIRED_COLUMNS: [&str; 9] = [
    GRID_ID,
    GRID_SEGMENT,
    GRID_SEGMENT_KMEANS,
    GRID_SCORE,
    "building_density",
    "yellow_building_density",
    "total_road_density",
    "empty",
    "waterbody",
];

// ---------------------------------------------------------------------------
// CellValue – a single cell in a pass-through column
// ---------------------------------------------------------------------------

/// A dynamically-typed value for columns the dashboard does not interpret.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::String(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v:.4}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

impl CellValue {
    /// Guess the narrowest type for a raw text cell.
    pub fn guess(s: &str) -> Self {
        if s.is_empty() {
            return CellValue::Null;
        }
        if let Ok(i) = s.parse::<i64>() {
            return CellValue::Integer(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return CellValue::Float(f);
        }
        if s == "true" || s == "false" {
            return CellValue::Bool(s == "true");
        }
        CellValue::String(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// FeatureColumn – the five numeric density / coverage attributes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeatureColumn {
    BuildingDensity,
    YellowBuildingDensity,
    TotalRoadDensity,
    Empty,
    Waterbody,
}

impl FeatureColumn {
    /// All features, in display and profile-column order.
    pub const ALL: [FeatureColumn; 5] = [
        FeatureColumn::BuildingDensity,
        FeatureColumn::YellowBuildingDensity,
        FeatureColumn::TotalRoadDensity,
        FeatureColumn::Empty,
        FeatureColumn::Waterbody,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FeatureColumn::BuildingDensity => "building_density",
            FeatureColumn::YellowBuildingDensity => "yellow_building_density",
            FeatureColumn::TotalRoadDensity => "total_road_density",
            FeatureColumn::Empty => "empty",
            FeatureColumn::Waterbody => "waterbody",
        }
    }

    pub fn value(self, row: &GridRow) -> f64 {
        match self {
            FeatureColumn::BuildingDensity => row.building_density,
            FeatureColumn::YellowBuildingDensity => row.yellow_building_density,
            FeatureColumn::TotalRoadDensity => row.total_road_density,
            FeatureColumn::Empty => row.empty,
            FeatureColumn::Waterbody => row.waterbody,
        }
    }
}

// ---------------------------------------------------------------------------
// SegmentMode – which labeling scheme drives the segment operations
// ---------------------------------------------------------------------------

/// The two independent segmentation schemes present on every grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SegmentMode {
    /// Business-rule segmentation (`grid_segment`).
    #[default]
    ScoreBased,
    /// Clustering segmentation (`grid_segment_kmeans`).
    KMeans,
}

fn business_segment(row: &GridRow) -> &str {
    &row.grid_segment
}

fn kmeans_segment(row: &GridRow) -> &str {
    &row.grid_segment_kmeans
}

impl SegmentMode {
    pub const ALL: [SegmentMode; 2] = [SegmentMode::ScoreBased, SegmentMode::KMeans];

    /// Name of the column this mode reads segments from.
    pub fn column(self) -> &'static str {
        match self {
            SegmentMode::ScoreBased => GRID_SEGMENT,
            SegmentMode::KMeans => GRID_SEGMENT_KMEANS,
        }
    }

    /// Field accessor for this mode's segment label.
    pub fn accessor(self) -> fn(&GridRow) -> &str {
        match self {
            SegmentMode::ScoreBased => business_segment,
            SegmentMode::KMeans => kmeans_segment,
        }
    }

    pub fn segment_of(self, row: &GridRow) -> &str {
        (self.accessor())(row)
    }

    /// Label shown in the segmentation selector.
    pub fn label(self) -> &'static str {
        match self {
            SegmentMode::ScoreBased => "Score-based (Business)",
            SegmentMode::KMeans => "KMeans (Unsupervised)",
        }
    }
}

/// Map a segmentation mode to the column it reads.
pub fn select_segment_column(mode: SegmentMode) -> &'static str {
    mode.column()
}

impl FromStr for SegmentMode {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "score-based" => Ok(SegmentMode::ScoreBased),
            "kmeans" => Ok(SegmentMode::KMeans),
            other => Err(GridError::UnknownSegmentMode(other.to_string())),
        }
    }
}

impl fmt::Display for SegmentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentMode::ScoreBased => write!(f, "score-based"),
            SegmentMode::KMeans => write!(f, "kmeans"),
        }
    }
}

// ---------------------------------------------------------------------------
// GridRow – one row of the source table
// ---------------------------------------------------------------------------

/// A single geographic grid cell.
#[derive(Debug, Clone, PartialEq)]
pub struct GridRow {
    pub grid_id: String,
    pub grid_segment: String,
    pub grid_segment_kmeans: String,
    pub grid_score: f64,
    pub building_density: f64,
    pub yellow_building_density: f64,
    pub total_road_density: f64,
    pub empty: f64,
    pub waterbody: f64,
    /// Columns outside the data model, carried through untouched.
    pub extra: BTreeMap<String, CellValue>,
}

// ---------------------------------------------------------------------------
// GridTable – the complete loaded (or derived) table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GridTable {
    /// Rows in source order.
    pub rows: Vec<GridRow>,
    /// Header of the source file, in file order.
    pub columns: Vec<String>,
}

impl GridTable {
    pub fn new(rows: Vec<GridRow>, columns: Vec<String>) -> Self {
        GridTable { rows, columns }
    }

    /// A table with the same header and a different row set.
    pub fn derive(&self, rows: Vec<GridRow>) -> Self {
        GridTable {
            rows,
            columns: self.columns.clone(),
        }
    }

    /// Number of grids.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Columns present in the header that the data model does not name.
    pub fn extra_columns(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .map(String::as_str)
            .filter(|c| !REQUIRED_COLUMNS.contains(c))
    }
}
