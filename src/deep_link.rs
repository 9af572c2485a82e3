//! Links that open the map in a given state.
//!
//! A link carries the filter keys of [`FilterCriteria::to_query_string`] plus two
//! more:
//!
//! | Key       | Meaning                                       |
//! |-----------|-----------------------------------------------|
//! | `partner` | open this location and zoom to it             |
//! | `nearby`  | `true` asks the host for a geolocation fix     |
//!
//! The crate cannot locate the device. When [`DeepLink::nearby`] is set the host
//! requests a fix and dispatches [`MapEvent::ReferencePointSet`] with it.

use log::debug;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};

use crate::filter::decode_query_pairs;
use crate::{FilterCriteria, LocationId, MapError, MapEvent};

/// State decoded from a link's query string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeepLink {
    pub criteria: FilterCriteria,
    /// Location to open, from `partner=<id>`
    pub focus: Option<LocationId>,
    /// `nearby=true`
    pub nearby: bool,
}

impl DeepLink {
    /// Decode a query string. A leading `?` is allowed and unknown keys are ignored.
    ///
    /// ```
    /// use partner_map::{DeepLink, MapEvent};
    ///
    /// let link = DeepLink::from_query_string("?partner=17&category=%EC%95%95%ED%99%94").unwrap();
    /// assert_eq!(link.focus.as_ref().map(|id| id.as_str()), Some("17"));
    /// assert!(!link.nearby);
    /// assert!(matches!(link.events()[..], [MapEvent::FiltersChanged(_), MapEvent::LocationFocused(_)]));
    /// ```
    pub fn from_query_string(query: &str) -> Result<Self, MapError> {
        let mut link = Self::default();
        for (key, value) in decode_query_pairs(query)? {
            match key.as_str() {
                "partner" => {
                    let id = value.trim();
                    link.focus = (!id.is_empty()).then(|| LocationId::from(id));
                }
                "nearby" => link.nearby = value == "true",
                _ => {
                    if !link.criteria.set_query_param(&key, value) {
                        debug!("[PartnerMap] Ignoring link parameter {}", key);
                    }
                }
            }
        }
        Ok(link)
    }

    /// Encode as a query string (no leading `?`). Filter keys come first.
    pub fn to_query_string(&self) -> String {
        let mut params = Vec::new();
        let filters = self.criteria.to_query_string();
        if !filters.is_empty() {
            params.push(filters);
        }
        if let Some(id) = &self.focus {
            params.push(format!(
                "partner={}",
                utf8_percent_encode(id.as_str(), NON_ALPHANUMERIC)
            ));
        }
        if self.nearby {
            params.push("nearby=true".to_string());
        }
        params.join("&")
    }

    /// Events that put a loaded map into the linked state.
    ///
    /// Dispatch them after [`MapEvent::LocationsLoaded`]. The focus event comes
    /// last so its camera move wins over the filter's fit when both are batched.
    pub fn events(&self) -> Vec<MapEvent> {
        let mut events = Vec::new();
        if !self.criteria.is_unrestricted() {
            events.push(MapEvent::FiltersChanged(self.criteria.clone()));
        }
        if let Some(id) = &self.focus {
            events.push(MapEvent::LocationFocused(id.clone()));
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Effect, LatLng, Location, MapViewState, Selection};

    fn sites() -> Vec<Location> {
        vec![
            Location::new("1", "흙공방", LatLng::new(37.5665, 126.9780)).with_categories(["도자기"]),
            Location::new("2", "압화공방", LatLng::new(36.3504, 127.3845)).with_categories(["압화"]),
        ]
    }

    #[test]
    fn test_partner_and_nearby_keys() {
        let link = DeepLink::from_query_string("partner=2&nearby=true").unwrap();
        assert_eq!(link.focus, Some(LocationId::from("2")));
        assert!(link.nearby);
        assert!(link.criteria.is_unrestricted());
        assert_eq!(link.events(), vec![MapEvent::LocationFocused("2".into())]);
    }

    #[test]
    fn test_nearby_needs_literal_true() {
        for query in ["nearby=1", "nearby=TRUE", "nearby=", "nearby"] {
            assert!(!DeepLink::from_query_string(query).unwrap().nearby, "{}", query);
        }
    }

    #[test]
    fn test_blank_partner_is_no_focus() {
        let link = DeepLink::from_query_string("?partner=+&search=%EB%AC%BC%EB%A0%88").unwrap();
        assert_eq!(link.focus, None);
        assert_eq!(link.criteria.search, "물레");
        assert!(link.events().iter().all(|e| matches!(e, MapEvent::FiltersChanged(_))));
    }

    #[test]
    fn test_filter_keys_are_shared_with_criteria() {
        let link = DeepLink::from_query_string("category=%EC%95%95%ED%99%94&utm_source=blog").unwrap();
        assert_eq!(link.criteria.category, Selection::only("압화"));
        assert_eq!(
            link.criteria,
            FilterCriteria::from_query_string("category=%EC%95%95%ED%99%94").unwrap()
        );
    }

    #[test]
    fn test_malformed_link_is_an_error() {
        assert!(matches!(
            DeepLink::from_query_string("partner=%FF"),
            Err(MapError::InvalidQueryParam { .. })
        ));
    }

    #[test]
    fn test_link_query_string_is_stable() {
        let link = DeepLink {
            criteria: FilterCriteria::default().with_category("압화"),
            focus: Some("a b".into()),
            nearby: true,
        };
        let query = link.to_query_string();
        assert_eq!(query, "category=%EC%95%95%ED%99%94&partner=a%20b&nearby=true");
        assert_eq!(DeepLink::from_query_string(&query).unwrap(), link);
        assert_eq!(DeepLink::default().to_query_string(), "");
    }

    #[test]
    fn test_link_events_focus_after_filter() {
        let link = DeepLink::from_query_string("partner=1&category=%EC%95%95%ED%99%94").unwrap();
        let state = MapViewState::default().reduce(MapEvent::LocationsLoaded(sites())).0;

        let (state, effects) = state.reduce_all(link.events());
        assert_eq!(
            effects,
            vec![
                Effect::ListChanged { count: 1 },
                Effect::ShowDetail("1".into()),
                Effect::CenterOn { coordinate: LatLng::new(37.5665, 126.9780), zoom: 15 },
            ]
        );
        // The filter still applies to the list
        assert_eq!(state.markers()[0].id().as_str(), "2");
    }
}
