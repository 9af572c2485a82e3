//! Address → region lookup.
//!
//! Regions are not stored on locations. They are derived from the leading
//! administrative name of the address, checked against an ordered prefix list.
//! Addresses that match no prefix fall into a catch-all region.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Korean provincial-level prefixes as they appear at the start of a road address.
pub const KOREAN_REGION_PREFIXES: [&str; 17] = [
    "서울", "부산", "대구", "인천", "광주", "대전", "울산", "세종", "경기",
    "강원", "충북", "충남", "전북", "전남", "경북", "경남", "제주",
];

/// Region name for addresses that match no prefix.
pub const KOREAN_FALLBACK_REGION: &str = "기타";

/// Ordered prefix table. The first matching prefix wins.
///
/// # Example
/// ```
/// use partner_map::RegionTable;
///
/// let table = RegionTable::default();
/// assert_eq!(table.region_of("경기 성남시 분당구"), "경기");
/// assert_eq!(table.region_of("Tokyo, Japan"), "기타");
///
/// let custom = RegionTable::new(["Paris", "Lyon"], "Ailleurs");
/// assert_eq!(custom.region_of("Lyon 69002"), "Lyon");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RegionTable {
    prefixes: Vec<String>,
    fallback: String,
}

impl RegionTable {
    pub fn new<I, S>(prefixes: I, fallback: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
            fallback: fallback.into(),
        }
    }

    /// Korean provinces with "기타" as the fallback.
    pub fn korean() -> Self {
        Self::new(KOREAN_REGION_PREFIXES, KOREAN_FALLBACK_REGION)
    }

    /// Region of an address. Leading whitespace is ignored.
    pub fn region_of(&self, address: &str) -> &str {
        let address = address.trim_start();
        self.prefixes
            .iter()
            .find(|prefix| address.starts_with(prefix.as_str()))
            .map_or(self.fallback.as_str(), String::as_str)
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }
}

impl Default for RegionTable {
    fn default() -> Self {
        Self::korean()
    }
}
