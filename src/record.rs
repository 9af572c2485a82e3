//! Raw partner rows as the data source delivers them, and their normalization
//! into [`Location`]s.
//!
//! The source is loose about types: ids and coordinates arrive as numbers or
//! strings, list fields as comma-separated strings or arrays. A zero or blank
//! coordinate means the row was never geocoded.

use log::{info, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{LatLng, Location, MapError};

/// A number or a string holding one.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum ScalarValue {
    Number(f64),
    Text(String),
}

impl ScalarValue {
    /// Blank text is `None`.
    fn to_f64(&self, id: &str, field: &'static str) -> Result<Option<f64>, MapError> {
        match self {
            ScalarValue::Number(n) => Ok(Some(*n)),
            ScalarValue::Text(text) => {
                let text = text.trim();
                if text.is_empty() {
                    return Ok(None);
                }
                text.parse::<f64>()
                    .map(Some)
                    .map_err(|_| MapError::UnparsableNumber {
                        id: id.to_string(),
                        field,
                        value: text.to_string(),
                    })
            }
        }
    }

    /// Integral numbers print without a fraction, so `17` and `"17"` agree.
    fn to_id_string(&self) -> String {
        match self {
            ScalarValue::Number(n) if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 => {
                format!("{}", *n as i64)
            }
            ScalarValue::Number(n) => n.to_string(),
            ScalarValue::Text(text) => text.trim().to_string(),
        }
    }
}

impl From<f64> for ScalarValue {
    fn from(n: f64) -> Self {
        ScalarValue::Number(n)
    }
}

impl From<&str> for ScalarValue {
    fn from(text: &str) -> Self {
        ScalarValue::Text(text.to_string())
    }
}

/// A comma-separated string or an explicit list.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum ListValue {
    Text(String),
    List(Vec<String>),
}

impl ListValue {
    fn into_items(self) -> Vec<String> {
        match self {
            ListValue::Text(text) => split_list(&text),
            ListValue::List(items) => items,
        }
    }
}

fn split_list(text: &str) -> Vec<String> {
    text.split(',').map(|s| s.trim().to_string()).collect()
}

/// One partner row before validation.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct LocationRecord {
    pub id: Option<ScalarValue>,
    pub name: Option<String>,
    pub address: Option<String>,
    pub lat: Option<ScalarValue>,
    pub lng: Option<ScalarValue>,
    /// Comma-separated category tags
    pub category: Option<String>,
    /// Comma-separated association names
    pub association: Option<String>,
    pub partner_type: Option<ListValue>,
}

impl TryFrom<LocationRecord> for Location {
    type Error = MapError;

    /// ```
    /// use partner_map::{Location, LocationRecord, ListValue};
    ///
    /// let record = LocationRecord {
    ///     id: Some(17.0.into()),
    ///     name: Some(" 흙공방 ".to_string()),
    ///     lat: Some("37.5665".into()),
    ///     lng: Some(126.9780.into()),
    ///     category: Some("도자기, 목공".to_string()),
    ///     partner_type: Some(ListValue::Text("협회".to_string())),
    ///     ..LocationRecord::default()
    /// };
    ///
    /// let location = Location::try_from(record).unwrap();
    /// assert_eq!(location.id().as_str(), "17");
    /// assert_eq!(location.name(), "흙공방");
    /// assert_eq!(location.categories(), ["도자기", "목공"]);
    /// ```
    fn try_from(record: LocationRecord) -> Result<Self, Self::Error> {
        let id = record
            .id
            .as_ref()
            .map(ScalarValue::to_id_string)
            .filter(|id| !id.is_empty())
            .ok_or(MapError::MissingId)?;

        let name = record.name.as_deref().map(str::trim).unwrap_or_default();
        if name.is_empty() {
            return Err(MapError::EmptyName { id });
        }

        let lat = coordinate_part(record.lat.as_ref(), &id, "lat")?;
        let lng = coordinate_part(record.lng.as_ref(), &id, "lng")?;
        let (Some(lat), Some(lng)) = (lat, lng) else {
            return Err(MapError::MissingCoordinate { id });
        };

        let coordinate = LatLng::new(lat, lng);
        if !coordinate.is_valid() {
            return Err(MapError::InvalidCoordinate { id, lat, lng });
        }

        let name = name.to_string();
        let address = record.address.as_deref().map(str::trim).unwrap_or_default().to_string();

        Ok(Location::new(id, name, coordinate)
            .with_address(address)
            .with_categories(record.category.as_deref().map(split_list).unwrap_or_default())
            .with_associations(record.association.as_deref().map(split_list).unwrap_or_default())
            .with_partner_kinds(record.partner_type.map(ListValue::into_items).unwrap_or_default()))
    }
}

/// A zero value counts as missing.
fn coordinate_part(
    value: Option<&ScalarValue>,
    id: &str,
    field: &'static str,
) -> Result<Option<f64>, MapError> {
    match value {
        Some(v) => Ok(v.to_f64(id, field)?.filter(|n| *n != 0.0)),
        None => Ok(None),
    }
}

/// Convert rows into locations, skipping rows that do not normalize.
pub fn normalize_records<I>(records: I) -> Vec<Location>
where
    I: IntoIterator<Item = LocationRecord>,
{
    let mut skipped = 0usize;
    let locations: Vec<Location> = records
        .into_iter()
        .filter_map(|record| match Location::try_from(record) {
            Ok(location) => Some(location),
            Err(e) => {
                warn!("[PartnerMap] Skipping record: {}", e);
                skipped += 1;
                None
            }
        })
        .collect();

    info!(
        "[PartnerMap] Normalized {} records ({} skipped)",
        locations.len(),
        skipped
    );
    locations
}

#[cfg(feature = "serde")]
#[derive(Deserialize)]
#[serde(untagged)]
enum RecordPayload {
    Wrapped { partners: Vec<LocationRecord> },
    Bare(Vec<LocationRecord>),
}

/// Parse a data-source payload: `{"partners": [...]}` or a bare array.
///
/// Malformed JSON is an error. Rows that fail normalization are skipped.
///
/// ```
/// use partner_map::parse_records_json;
///
/// let json = r#"{"partners": [
///     {"id": 1, "name": "흙공방", "lat": "37.5665", "lng": "126.9780", "partnerType": ["협회"]},
///     {"id": 2, "name": "미등록", "lat": "", "lng": ""}
/// ]}"#;
///
/// let locations = parse_records_json(json).unwrap();
/// assert_eq!(locations.len(), 1);
/// assert!(locations[0].partner_kinds().contains("협회"));
/// ```
#[cfg(feature = "serde")]
pub fn parse_records_json(json: &str) -> Result<Vec<Location>, MapError> {
    let records = match serde_json::from_str::<RecordPayload>(json)? {
        RecordPayload::Wrapped { partners } => partners,
        RecordPayload::Bare(records) => records,
    };
    Ok(normalize_records(records))
}
