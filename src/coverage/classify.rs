//! Partition of addresses into coverage categories.

use super::index::CoverageIndex;
use crate::models::AddressFeature;

/// Coverage category of one address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// Within the stop buffer (edge included)
    ServedByStop,
    /// Within the line buffer but not the stop buffer
    NearLineOnly,
    Unserved,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::ServedByStop => "served_by_stop",
            Category::NearLineOnly => "near_line_only",
            Category::Unserved => "unserved",
        }
    }
}

/// Every input address lands in exactly one list. `near_line_only` is
/// `None` when no line buffer took part (two-way partition).
#[derive(Debug, Clone, PartialEq)]
pub struct Classification<'a> {
    pub served_by_stop: Vec<&'a AddressFeature>,
    pub near_line_only: Option<Vec<&'a AddressFeature>>,
    pub unserved: Vec<&'a AddressFeature>,
}

impl Classification<'_> {
    pub fn total(&self) -> usize {
        self.served_by_stop.len()
            + self.near_line_only.as_ref().map_or(0, Vec::len)
            + self.unserved.len()
    }

    pub fn is_two_tier(&self) -> bool {
        self.near_line_only.is_some()
    }
}

/// Category of a single address. The stop buffer wins over the line buffer.
pub fn categorize(
    address: &AddressFeature,
    stop_index: &CoverageIndex,
    line_index: Option<&CoverageIndex>,
) -> Category {
    if stop_index.intersects_point(&address.location) {
        Category::ServedByStop
    } else if line_index.is_some_and(|index| index.intersects_point(&address.location)) {
        Category::NearLineOnly
    } else {
        Category::Unserved
    }
}

/// One pass over the addresses, one point test per buffer each.
pub fn classify<'a>(
    addresses: &'a [AddressFeature],
    stop_index: &CoverageIndex,
    line_index: Option<&CoverageIndex>,
) -> Classification<'a> {
    let mut result = Classification {
        served_by_stop: Vec::new(),
        near_line_only: line_index.map(|_| Vec::new()),
        unserved: Vec::new(),
    };

    for address in addresses {
        match categorize(address, stop_index, line_index) {
            Category::ServedByStop => result.served_by_stop.push(address),
            Category::NearLineOnly => {
                if let Some(near) = result.near_line_only.as_mut() {
                    near.push(address);
                }
            }
            Category::Unserved => result.unserved.push(address),
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coverage::buffer::{build_buffer, build_line_buffer, DEFAULT_QUADRANT_SEGMENTS};
    use crate::models::LineFeature;
    use geo::{line_string, MultiLineString, Point};
    use hashbrown::HashSet;

    fn stop_index(stops: &[(f64, f64)], radius: f64) -> CoverageIndex {
        let points = stops.iter().map(|&(x, y)| Point::new(x, y));
        CoverageIndex::build(build_buffer(points, radius, DEFAULT_QUADRANT_SEGMENTS).unwrap())
    }

    fn ids(list: &[&AddressFeature]) -> Vec<String> {
        list.iter().map(|a| a.id.clone()).collect()
    }

    #[test]
    fn test_no_addresses() {
        let index = stop_index(&[(0.0, 0.0)], 500.0);
        let result = classify(&[], &index, Some(&index));
        assert_eq!(result.total(), 0);
        assert!(result.served_by_stop.is_empty());
        assert_eq!(result.near_line_only, Some(vec![]));
        assert!(result.unserved.is_empty());
    }

    #[test]
    fn test_single_stop_two_way() {
        let index = stop_index(&[(0.0, 0.0)], 500.0);
        let addresses = vec![
            AddressFeature::new("near", 100.0, 0.0),
            AddressFeature::new("far", 600.0, 0.0),
        ];

        let result = classify(&addresses, &index, None);
        assert!(!result.is_two_tier());
        assert_eq!(ids(&result.served_by_stop), vec!["near"]);
        assert_eq!(ids(&result.unserved), vec!["far"]);
    }

    #[test]
    fn test_address_at_radius_between_vertices_is_served() {
        let radius = 500.0;
        let index = stop_index(&[(0.0, 0.0)], radius);
        let angle = std::f64::consts::PI / (4 * DEFAULT_QUADRANT_SEGMENTS) as f64;
        let at = |d: f64| (d * angle.cos(), d * angle.sin());

        let addresses: Vec<AddressFeature> = [("d500", 500.0), ("d499.5", 499.5), ("d499", 499.0), ("d502", 502.0)]
            .into_iter()
            .map(|(id, d)| {
                let (x, y) = at(d);
                AddressFeature::new(id, x, y)
            })
            .collect();

        let result = classify(&addresses, &index, None);
        assert_eq!(ids(&result.served_by_stop), vec!["d500", "d499.5", "d499"]);
        assert_eq!(ids(&result.unserved), vec!["d502"]);
    }

    #[test]
    fn test_stop_takes_priority_over_line() {
        let stops = stop_index(&[(0.0, 0.0)], 300.0);
        let line = LineFeature::new(
            "l1",
            MultiLineString::new(vec![line_string![(x: -2000.0, y: 0.0), (x: 2000.0, y: 0.0)]]),
        );
        let lines = CoverageIndex::build(build_line_buffer(&[line], 200.0).unwrap());

        let addresses = vec![
            AddressFeature::new("both", 50.0, 50.0),
            AddressFeature::new("line", 1500.0, 100.0),
            AddressFeature::new("none", 1500.0, 900.0),
        ];

        let result = classify(&addresses, &stops, Some(&lines));
        assert_eq!(ids(&result.served_by_stop), vec!["both"]);
        assert_eq!(ids(result.near_line_only.as_deref().unwrap()), vec!["line"]);
        assert_eq!(ids(&result.unserved), vec!["none"]);
    }

    #[test]
    fn test_no_stops_falls_through() {
        let stops = stop_index(&[], 500.0);
        let addresses: Vec<AddressFeature> = (0..5)
            .map(|i| AddressFeature::new(format!("a{i}"), i as f64 * 10.0, 0.0))
            .collect();

        let result = classify(&addresses, &stops, None);
        assert!(result.served_by_stop.is_empty());
        assert_eq!(result.unserved.len(), 5);
    }

    #[test]
    fn test_partition_is_complete_and_disjoint() {
        let stops = stop_index(&[(0.0, 0.0), (1_200.0, 800.0)], 450.0);
        let line = LineFeature::new(
            "l1",
            MultiLineString::new(vec![line_string![(x: -3000.0, y: -200.0), (x: 3000.0, y: 1500.0)]]),
        );
        let lines = CoverageIndex::build(build_line_buffer(&[line], 250.0).unwrap());

        let addresses: Vec<AddressFeature> = (0..400)
            .map(|i| {
                let x = ((i * 37) % 61) as f64 * 70.0 - 2_000.0;
                let y = ((i * 53) % 47) as f64 * 60.0 - 1_000.0;
                AddressFeature::new(format!("a{i}"), x, y)
            })
            .collect();

        let result = classify(&addresses, &stops, Some(&lines));
        assert_eq!(result.total(), addresses.len());

        let mut seen = HashSet::new();
        let near = result.near_line_only.clone().unwrap();
        for a in result.served_by_stop.iter().chain(&near).chain(&result.unserved) {
            assert!(seen.insert(a.id.clone()), "{} classified twice", a.id);
        }
        assert_eq!(seen.len(), addresses.len());

        for a in &near {
            assert!(!stops.intersects_point(&a.location));
        }
    }
}
