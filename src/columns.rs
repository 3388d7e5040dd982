//! Standard column schema for processed agricultural data.

use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    String,
    Number,
    Date,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StandardColumn {
    pub id: &'static str,
    pub name: &'static str,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    pub required: bool,
}

const fn column(
    id: &'static str,
    name: &'static str,
    column_type: ColumnType,
    required: bool,
) -> StandardColumn {
    StandardColumn {
        id,
        name,
        column_type,
        required,
    }
}

pub const STANDARD_COLUMNS: [StandardColumn; 20] = [
    column("plot_id", "Plot ID", ColumnType::String, true),
    column("crop", "Crop", ColumnType::String, true),
    column("year", "Year", ColumnType::Number, true),
    column("plant", "Plant", ColumnType::String, true),
    column("variety", "Variety", ColumnType::String, true),
    column("area_hectares", "Area (ha)", ColumnType::Number, false),
    column("production_tons", "Production (tons)", ColumnType::Number, false),
    column("yield_tons_per_hectare", "Yield (tons/ha)", ColumnType::Number, false),
    column("annual_rainfall_mm", "Annual Rainfall (mm)", ColumnType::Number, false),
    column("avg_temperature_c", "Avg. Temperature (°C)", ColumnType::Number, false),
    column("fertilizer_type_kg_ha", "Fertilizer Type/Rate (kg/ha)", ColumnType::String, false),
    column("pesticide_used_kg_ha", "Pesticide Used (kg/ha)", ColumnType::Number, false),
    column("irrigation_type", "Irrigation Type", ColumnType::String, false),
    column("soil_ph", "Soil pH", ColumnType::Number, false),
    column("organic_matter", "Organic Matter (%)", ColumnType::Number, false),
    column("p_level_mg_kg", "P Level (mg/kg)", ColumnType::Number, false),
    column("k_level_mg_kg", "K Level (mg/kg)", ColumnType::Number, false),
    column("n_level_mg_kg", "N Level (mg/kg)", ColumnType::Number, false),
    column("planting_date", "Planting Date", ColumnType::Date, false),
    column("harvest_date", "Harvest Date", ColumnType::Date, false),
];

/// Outcome of checking a dataset against the standard columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnCheck {
    Valid,
    Empty,
    /// Display names of the required columns absent from the first row.
    MissingRequired(Vec<&'static str>),
}

impl ColumnCheck {
    pub fn is_valid(&self) -> bool {
        matches!(self, ColumnCheck::Valid)
    }

    pub fn message(&self) -> Option<String> {
        match self {
            ColumnCheck::Valid => None,
            ColumnCheck::Empty => {
                Some("No data provided or data is not in the correct format".to_string())
            }
            ColumnCheck::MissingRequired(names) => {
                Some(format!("Missing required columns: {}", names.join(", ")))
            }
        }
    }
}

/// Check the first row for every required column.
///
/// Rows that are not JSON objects count as missing every column.
pub fn validate_against_standard(rows: &[Value]) -> ColumnCheck {
    let Some(first) = rows.first() else {
        return ColumnCheck::Empty;
    };

    let missing: Vec<&'static str> = STANDARD_COLUMNS
        .iter()
        .filter(|c| c.required && first.get(c.id).is_none())
        .map(|c| c.name)
        .collect();

    if missing.is_empty() {
        ColumnCheck::Valid
    } else {
        ColumnCheck::MissingRequired(missing)
    }
}

/// Reshape rows to exactly the standard columns.
///
/// Missing values become `null`; non-standard keys are dropped.
pub fn transform_to_standard_format(rows: &[Value]) -> Vec<Value> {
    rows.iter()
        .map(|row| {
            let standard: Map<String, Value> = STANDARD_COLUMNS
                .iter()
                .map(|c| (c.id.to_string(), row.get(c.id).cloned().unwrap_or(Value::Null)))
                .collect();
            Value::Object(standard)
        })
        .collect()
}

/// Header row of a CSV template, using display names.
pub fn template_csv() -> String {
    STANDARD_COLUMNS
        .iter()
        .map(|c| c.name)
        .collect::<Vec<_>>()
        .join(",")
}
