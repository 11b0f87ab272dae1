//! Hotspot aggregation of complaint locations per grid cell.
//!
//! Buckets complaint points into grid cells with the point locator, tracking:
//! - Complaint count per cell
//! - Counts per urgency level
//! - The most frequent categories
//!
//! Cells are ranked by complaint count. With the `parallel` feature the points
//! are located on the rayon pool; aggregation itself stays sequential so the
//! result does not depend on scheduling.

use std::collections::HashMap;
use std::fmt;

use log::debug;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::config::ServiceConfig;
use crate::{Coordinate, SpatialIndex};

/// Number of categories kept per hotspot.
const TOP_CATEGORIES: usize = 3;

/// How quickly a complaint needs a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Red,
    Yellow,
    Green,
}

impl Urgency {
    /// Urgency for a complaint category. Accepts both the slug and the
    /// Turkish display form; unknown categories are green.
    pub fn for_category(category: &str) -> Self {
        match category.trim().to_lowercase().as_str() {
            "boru_patlamasi" | "boru patlaması" | "su_baskini" | "su baskını" | "yangin" | "yangın" => {
                Urgency::Red
            }
            "merdiven_kirik" | "merdiven kırık" | "kaldirim_bozuk" | "kaldırım bozuk" | "rampa_eksik"
            | "rampa eksik" => Urgency::Yellow,
            _ => Urgency::Green,
        }
    }
}

/// A complaint reduced to what aggregation needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplaintPoint {
    pub lat: f64,
    pub lon: f64,
    /// Falls back to [`Urgency::for_category`] when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urgency: Option<Urgency>,
    pub category: String,
}

impl ComplaintPoint {
    pub fn urgency(&self) -> Urgency {
        self.urgency.unwrap_or_else(|| Urgency::for_category(&self.category))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: u32,
}

/// Complaint totals for one grid cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hotspot {
    pub grid_id: i64,
    pub total: u32,
    pub red: u32,
    pub yellow: u32,
    pub green: u32,
    /// Most frequent first; ties keep first-seen order. Serialized as a
    /// `{category: count}` object in that order.
    #[serde(with = "category_map")]
    pub top_categories: Vec<CategoryCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotspotReport {
    /// Cells with at least one complaint, before truncation.
    pub total_grids_with_complaints: usize,
    /// Busiest cells first, at most `max_hotspots`.
    pub hotspots: Vec<Hotspot>,
}

// Internal cell data during aggregation
#[derive(Debug)]
struct HotspotBuilder {
    grid_id: i64,
    total: u32,
    urgency_counts: HashMap<Urgency, u32>,
    // (category, count) in first-seen order
    categories: Vec<(String, u32)>,
}

impl HotspotBuilder {
    fn new(grid_id: i64) -> Self {
        Self {
            grid_id,
            total: 0,
            urgency_counts: HashMap::new(),
            categories: Vec::new(),
        }
    }

    fn add(&mut self, complaint: &ComplaintPoint) {
        self.total += 1;
        *self.urgency_counts.entry(complaint.urgency()).or_insert(0) += 1;

        match self.categories.iter_mut().find(|(c, _)| *c == complaint.category) {
            Some((_, count)) => *count += 1,
            None => self.categories.push((complaint.category.clone(), 1)),
        }
    }

    fn build(mut self) -> Hotspot {
        // Stable sort keeps first-seen order among equal counts.
        self.categories.sort_by(|a, b| b.1.cmp(&a.1));
        let top_categories = self
            .categories
            .into_iter()
            .take(TOP_CATEGORIES)
            .map(|(category, count)| CategoryCount { category, count })
            .collect();

        let count = |u: Urgency| self.urgency_counts.get(&u).copied().unwrap_or(0);

        Hotspot {
            grid_id: self.grid_id,
            total: self.total,
            red: count(Urgency::Red),
            yellow: count(Urgency::Yellow),
            green: count(Urgency::Green),
            top_categories,
        }
    }
}

mod category_map {
    use super::*;

    pub fn serialize<S: Serializer>(categories: &[CategoryCount], serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(categories.len()))?;
        for c in categories {
            map.serialize_entry(&c.category, &c.count)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<CategoryCount>, D::Error> {
        deserializer.deserialize_map(CategoryMapVisitor)
    }

    struct CategoryMapVisitor;

    impl<'de> Visitor<'de> for CategoryMapVisitor {
        type Value = Vec<CategoryCount>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a map of category to count")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
            let mut categories = Vec::with_capacity(access.size_hint().unwrap_or(0));
            while let Some((category, count)) = access.next_entry::<String, u32>()? {
                categories.push(CategoryCount { category, count });
            }
            Ok(categories)
        }
    }
}

fn locate_all(index: &SpatialIndex, complaints: &[ComplaintPoint], config: &ServiceConfig) -> Vec<Option<i64>> {
    let locate = |c: &ComplaintPoint| {
        if config.validate_coordinates && !Coordinate::new(c.lat, c.lon).is_valid() {
            debug!("[Hotspots] Skipping complaint at invalid ({}, {})", c.lat, c.lon);
            return None;
        }
        index.locate_grid(c.lat, c.lon)
    };

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        complaints.par_iter().map(locate).collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        complaints.iter().map(locate).collect()
    }
}

/// Aggregate complaints into per-grid hotspots.
///
/// Each complaint is located with containment then nearest centroid. Complaints
/// that resolve to no grid are skipped. Cells are ordered by total descending;
/// equal totals keep the order in which the cell was first hit.
pub fn aggregate_hotspots(
    index: &SpatialIndex,
    complaints: &[ComplaintPoint],
    config: &ServiceConfig,
) -> HotspotReport {
    let grid_ids = locate_all(index, complaints, config);

    let mut positions: HashMap<i64, usize> = HashMap::new();
    let mut builders: Vec<HotspotBuilder> = Vec::new();

    for (complaint, grid_id) in complaints.iter().zip(grid_ids) {
        let Some(grid_id) = grid_id else { continue };
        let position = *positions.entry(grid_id).or_insert_with(|| {
            builders.push(HotspotBuilder::new(grid_id));
            builders.len() - 1
        });
        builders[position].add(complaint);
    }

    let mut hotspots: Vec<Hotspot> = builders.into_iter().map(HotspotBuilder::build).collect();
    hotspots.sort_by(|a, b| b.total.cmp(&a.total));

    let total_grids_with_complaints = hotspots.len();
    hotspots.truncate(config.max_hotspots);

    HotspotReport {
        total_grids_with_complaints,
        hotspots,
    }
}
