//! # Location Filtering
//!
//! Reduces the full location set to the filtered set shown on the map and in the list.
//!
//! A location passes when every active dimension matches:
//!
//! | Dimension | Matches when |
//! |-----------|--------------|
//! | category | `categories` contains the value |
//! | region | region derived from the address equals the value |
//! | association | `associations` contains the value |
//! | partner kind | `partner_kinds` contains the value |
//! | search | lower-cased query is a substring of name or address (empty query passes) |
//! | favorites only | the id is in the caller's [`Favorites`] |
//!
//! Each dimension holds at most one value. Output keeps input order.

use std::borrow::Cow;
use std::collections::BTreeSet;

use log::debug;
use percent_encoding::{percent_decode_str, utf8_percent_encode, NON_ALPHANUMERIC};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Favorites, Location, MapError, RegionTable};

/// The value a query-string or UI control uses for "no restriction".
pub const ALL: &str = "all";

/// One filter dimension: unrestricted, or exactly one accepted value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Selection {
    #[default]
    All,
    Only(String),
}

impl Selection {
    /// `"all"` and the empty string mean no restriction.
    pub fn parse(value: &str) -> Self {
        if value.is_empty() || value == ALL {
            Selection::All
        } else {
            Selection::Only(value.to_string())
        }
    }

    /// Restrict to one value. [`ALL`] and the empty string are reserved: both give
    /// [`Selection::All`], the same thing a query string decodes them to.
    pub fn only(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.is_empty() || value == ALL {
            Selection::All
        } else {
            Selection::Only(value)
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Selection::All)
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            Selection::All => None,
            Selection::Only(v) => Some(v),
        }
    }

    fn accepts(&self, pred: impl FnOnce(&str) -> bool) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(v) => pred(v),
        }
    }
}

/// Current query state of the map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FilterCriteria {
    pub category: Selection,
    pub region: Selection,
    pub association: Selection,
    pub partner_kind: Selection,
    /// Free text, matched case-insensitively. Empty matches everything.
    pub search: String,
    pub favorites_only: bool,
}

impl FilterCriteria {
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Selection::only(category);
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Selection::only(region);
        self
    }

    pub fn with_association(mut self, association: impl Into<String>) -> Self {
        self.association = Selection::only(association);
        self
    }

    pub fn with_partner_kind(mut self, kind: impl Into<String>) -> Self {
        self.partner_kind = Selection::only(kind);
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    pub fn with_favorites_only(mut self, favorites_only: bool) -> Self {
        self.favorites_only = favorites_only;
        self
    }

    /// True when no dimension restricts the result.
    pub fn is_unrestricted(&self) -> bool {
        self.category.is_all()
            && self.region.is_all()
            && self.association.is_all()
            && self.partner_kind.is_all()
            && self.search.is_empty()
            && !self.favorites_only
    }

    /// Encode the shareable part of the criteria as a query string (no leading `?`).
    ///
    /// Favorites-only is personal and is not encoded.
    ///
    /// ```
    /// use partner_map::FilterCriteria;
    ///
    /// let criteria = FilterCriteria::default()
    ///     .with_category("도자기")
    ///     .with_search("pottery class");
    /// let query = criteria.to_query_string();
    /// assert_eq!(FilterCriteria::from_query_string(&query).unwrap(), criteria);
    /// assert_eq!(FilterCriteria::default().to_query_string(), "");
    /// ```
    pub fn to_query_string(&self) -> String {
        let mut params: Vec<(&str, &str)> = Vec::new();
        let dimensions = [
            ("category", &self.category),
            ("region", &self.region),
            ("association", &self.association),
            ("partnerType", &self.partner_kind),
        ];
        for (key, selection) in dimensions {
            if let Some(value) = selection.value() {
                params.push((key, value));
            }
        }
        if !self.search.is_empty() {
            params.push(("search", self.search.as_str()));
        }

        params
            .into_iter()
            .map(|(key, value)| format!("{}={}", key, utf8_percent_encode(value, NON_ALPHANUMERIC)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Decode criteria from a query string. A leading `?` is allowed, unknown keys
    /// are ignored, and `+` decodes to a space.
    pub fn from_query_string(query: &str) -> Result<Self, MapError> {
        let mut criteria = Self::default();
        for (key, value) in decode_query_pairs(query)? {
            criteria.set_query_param(&key, value);
        }
        Ok(criteria)
    }

    /// Apply one decoded parameter. Returns false for keys that are not filter keys.
    pub(crate) fn set_query_param(&mut self, key: &str, value: String) -> bool {
        match key {
            "category" => self.category = Selection::parse(&value),
            "region" => self.region = Selection::parse(&value),
            "association" => self.association = Selection::parse(&value),
            "partnerType" => self.partner_kind = Selection::parse(&value),
            "search" => self.search = value,
            _ => return false,
        }
        true
    }
}

/// Split and percent-decode `key=value` pairs, in order.
pub(crate) fn decode_query_pairs(query: &str) -> Result<Vec<(String, String)>, MapError> {
    let query = query.strip_prefix('?').unwrap_or(query);

    query
        .split('&')
        .filter(|p| !p.is_empty())
        .map(|pair| -> Result<(String, String), MapError> {
            let (key, raw) = pair.split_once('=').unwrap_or((pair, ""));
            let with_spaces = raw.replace('+', " ");
            let value = percent_decode_str(&with_spaces)
                .decode_utf8()
                .map_err(|e| MapError::InvalidQueryParam {
                    key: key.to_string(),
                    reason: e.to_string(),
                })?;
            Ok((key.to_string(), value.into_owned()))
        })
        .collect()
}

/// A compiled filter: criteria plus the collaborators it needs.
///
/// # Example
/// ```
/// use partner_map::{FilterCriteria, LatLng, Location, LocationFilter};
///
/// let locations = vec![
///     Location::new("1", "흙공방", LatLng::new(37.56, 126.97)).with_categories(["도자기"]),
///     Location::new("2", "나무공방", LatLng::new(37.57, 126.98)).with_categories(["목공"]),
/// ];
/// let criteria = FilterCriteria::default().with_category("도자기");
///
/// let filtered = LocationFilter::new(&criteria).apply(&locations);
/// assert_eq!(filtered.len(), 1);
/// assert_eq!(filtered[0].name(), "흙공방");
/// ```
#[derive(Debug, Clone)]
pub struct LocationFilter<'a> {
    criteria: &'a FilterCriteria,
    favorites: Option<&'a Favorites>,
    regions: Cow<'a, RegionTable>,
    search: String,
}

impl<'a> LocationFilter<'a> {
    /// A filter using the default region table and no favorites.
    pub fn new(criteria: &'a FilterCriteria) -> Self {
        Self {
            criteria,
            favorites: None,
            regions: Cow::Owned(RegionTable::default()),
            search: criteria.search.to_lowercase(),
        }
    }

    pub fn with_favorites(mut self, favorites: &'a Favorites) -> Self {
        self.favorites = Some(favorites);
        self
    }

    pub fn with_regions(mut self, regions: &'a RegionTable) -> Self {
        self.regions = Cow::Borrowed(regions);
        self
    }

    /// Whether a single location passes every active dimension.
    pub fn matches(&self, location: &Location) -> bool {
        let c = self.criteria;

        c.category.accepts(|v| location.categories().iter().any(|cat| cat == v))
            && c.region.accepts(|v| location.region(&self.regions) == v)
            && c.association.accepts(|v| location.associations().iter().any(|a| a == v))
            && c.partner_kind.accepts(|v| location.partner_kinds().contains(v))
            && (self.search.is_empty() || location.search_text().contains(&self.search))
            && (!c.favorites_only
                || self.favorites.is_some_and(|favs| favs.contains(location.id())))
    }

    /// The order-preserving subsequence of `locations` that passes.
    pub fn apply(&self, locations: &[Location]) -> Vec<Location> {
        let filtered: Vec<Location> = locations
            .iter()
            .filter(|loc| self.matches(loc))
            .cloned()
            .collect();

        debug!(
            "[PartnerMap] Filter kept {} of {} locations",
            filtered.len(),
            locations.len()
        );

        filtered
    }
}

/// Filter with the default region table.
pub fn filter_locations(
    locations: &[Location],
    criteria: &FilterCriteria,
    favorites: &Favorites,
) -> Vec<Location> {
    LocationFilter::new(criteria).with_favorites(favorites).apply(locations)
}

/// Distinct values available for each filter dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FilterFacets {
    /// In first-seen order.
    pub categories: Vec<String>,
    /// Sorted.
    pub regions: Vec<String>,
    /// Sorted.
    pub associations: Vec<String>,
    /// Sorted.
    pub partner_kinds: Vec<String>,
}

impl FilterFacets {
    pub fn from_locations(locations: &[Location], regions: &RegionTable) -> Self {
        let mut categories: Vec<String> = Vec::new();
        let mut region_set = BTreeSet::new();
        let mut associations = BTreeSet::new();
        let mut partner_kinds = BTreeSet::new();

        for loc in locations {
            for cat in loc.categories() {
                if !categories.contains(cat) {
                    categories.push(cat.clone());
                }
            }
            region_set.insert(loc.region(regions).to_string());
            associations.extend(loc.associations().iter().cloned());
            partner_kinds.extend(loc.partner_kinds().iter().cloned());
        }

        Self {
            categories,
            regions: region_set.into_iter().collect(),
            associations: associations.into_iter().collect(),
            partner_kinds: partner_kinds.into_iter().collect(),
        }
    }
}
