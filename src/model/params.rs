// src/model/params.rs
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::builders::{build_measure, filter_key};
use super::items::{CutItem, DrilldownItem, FilterItem, Joint, MeasureItem, QueryParamsItem};
use crate::config::QuerySettings;
use crate::schema::Cube;

/// Server option toggles and their bit in the packed permalink form.
///
/// Bits are append-only: new flags take the next free bit, existing bits are
/// never reassigned.
pub const BOOLEAN_FLAGS: [(&str, u32); 6] = [
    ("parents", 1),
    ("sparse", 1 << 1),
    ("nonempty", 1 << 2),
    ("distinct", 1 << 3),
    ("debug", 1 << 4),
    ("exclude_default_members", 1 << 5),
];

/// Bit assigned to a flag name.
pub fn flag_bit(name: &str) -> Option<u32> {
    BOOLEAN_FLAGS
        .iter()
        .find(|(flag, _)| *flag == name)
        .map(|(_, bit)| *bit)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn symbol(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "asc" => Some(SortDirection::Asc),
            "desc" => Some(SortDirection::Desc),
            _ => None,
        }
    }
}

/// Canonical, serializable query state.
///
/// Every map is keyed by its item's own `key`. Items are deactivated rather
/// than removed, so toggling an item back on keeps its settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryParams {
    /// Selected cube; empty means unset.
    pub cube: String,
    pub locale: Option<String>,
    pub measures: BTreeMap<String, MeasureItem>,
    pub drilldowns: BTreeMap<String, DrilldownItem>,
    pub cuts: BTreeMap<String, CutItem>,
    pub filters: BTreeMap<String, FilterItem>,
    pub booleans: BTreeMap<String, bool>,
    /// Page size; 0 means unpaginated.
    pub pagi_limit: u64,
    pub pagi_offset: u64,
    pub sort_key: Option<String>,
    pub sort_dir: SortDirection,
    pub is_preview: bool,
}

/// A query plus the UI state a permalink carries with it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryItem {
    pub params: QueryParams,
    /// Active result panel (table, pivot, chart...).
    pub panel: Option<String>,
    /// Selected chart key.
    pub chart: Option<String>,
}

fn upsert<T: QueryParamsItem>(map: &mut BTreeMap<String, T>, item: T) {
    map.insert(item.key().to_string(), item);
}

fn set_active<T: QueryParamsItem>(map: &mut BTreeMap<String, T>, key: &str, active: bool) -> bool {
    match map.get_mut(key) {
        Some(item) => {
            item.set_active(active);
            true
        }
        None => false,
    }
}

impl QueryParams {
    pub fn new(cube: impl Into<String>) -> Self {
        Self {
            cube: cube.into(),
            ..Default::default()
        }
    }

    // =========================================================================
    // Replace-by-key updates
    // =========================================================================

    pub fn upsert_measure(&mut self, item: MeasureItem) {
        upsert(&mut self.measures, item);
    }

    pub fn upsert_drilldown(&mut self, item: DrilldownItem) {
        upsert(&mut self.drilldowns, item);
    }

    pub fn upsert_cut(&mut self, item: CutItem) {
        upsert(&mut self.cuts, item);
    }

    pub fn upsert_filter(&mut self, item: FilterItem) {
        upsert(&mut self.filters, item);
    }

    /// Returns false when no measure has this key.
    pub fn set_measure_active(&mut self, key: &str, active: bool) -> bool {
        set_active(&mut self.measures, key, active)
    }

    pub fn set_drilldown_active(&mut self, key: &str, active: bool) -> bool {
        set_active(&mut self.drilldowns, key, active)
    }

    pub fn set_cut_active(&mut self, key: &str, active: bool) -> bool {
        set_active(&mut self.cuts, key, active)
    }

    pub fn set_filter_active(&mut self, key: &str, active: bool) -> bool {
        set_active(&mut self.filters, key, active)
    }

    pub fn remove_drilldown(&mut self, key: &str) -> Option<DrilldownItem> {
        self.drilldowns.remove(key)
    }

    pub fn remove_cut(&mut self, key: &str) -> Option<CutItem> {
        self.cuts.remove(key)
    }

    pub fn remove_filter(&mut self, key: &str) -> Option<FilterItem> {
        self.filters.remove(key)
    }

    pub fn set_boolean(&mut self, flag: &str, value: Option<bool>) {
        match value {
            Some(value) => {
                self.booleans.insert(flag.to_string(), value);
            }
            None => {
                self.booleans.remove(flag);
            }
        }
    }

    pub fn set_page(&mut self, limit: u64, offset: u64) {
        self.pagi_limit = limit;
        self.pagi_offset = offset;
    }

    pub fn set_sort(&mut self, key: Option<String>, dir: SortDirection) {
        self.sort_key = key;
        self.sort_dir = dir;
    }

    /// Fill the locale and page size from settings where the query leaves
    /// them unset.
    pub fn apply_defaults(&mut self, settings: &QuerySettings) {
        if self.locale.is_none() && !settings.default_locale.is_empty() {
            self.locale = Some(settings.default_locale.clone());
        }
        if self.pagi_limit == 0 {
            self.pagi_limit = settings.default_limit;
        }
    }

    // =========================================================================
    // Resets
    // =========================================================================

    /// Reset the query while keeping the cube, locale and measure list.
    ///
    /// Drilldowns, cuts and filters are dropped; measures are deactivated.
    pub fn clear(&mut self) {
        for measure in self.measures.values_mut() {
            measure.active = false;
        }
        self.drilldowns.clear();
        self.cuts.clear();
        self.filters.clear();
        self.booleans.clear();
        self.pagi_offset = 0;
        self.sort_key = None;
        self.sort_dir = SortDirection::default();
    }

    /// Point the query at another cube.
    ///
    /// Drilldowns, cuts and filters name levels of the old cube and are
    /// dropped. Measures are rebuilt from the new cube, inactive.
    pub fn change_cube(&mut self, cube: &Cube) {
        self.cube = cube.name.clone();
        self.drilldowns.clear();
        self.cuts.clear();
        self.filters.clear();
        self.measures = cube
            .measures_flat()
            .map(|(measure, _)| build_measure(&serde_json::json!({ "name": measure.name })))
            .map(|item| (item.key.clone(), item))
            .collect();
        self.pagi_offset = 0;
        self.sort_key = None;
    }

    // =========================================================================
    // Views
    // =========================================================================

    pub fn active_measures(&self) -> impl Iterator<Item = &MeasureItem> {
        self.measures.values().filter(|m| m.active)
    }

    pub fn active_drilldowns(&self) -> impl Iterator<Item = &DrilldownItem> {
        self.drilldowns.values().filter(|d| d.active)
    }

    /// Active cuts with at least one member.
    pub fn active_cuts(&self) -> impl Iterator<Item = &CutItem> {
        self.cuts.values().filter(|c| c.is_active_cut())
    }

    pub fn active_filters(&self) -> impl Iterator<Item = &FilterItem> {
        self.filters.values().filter(|f| f.is_active_filter())
    }

    /// Copy holding only items that contribute to the request.
    ///
    /// Inactive properties and cached drilldown members are dropped, cut
    /// members are sorted, filters are re-keyed by content (a filter typed into
    /// a blank one still carries its random key), and only known flags set to
    /// `true` are kept (an unset flag and a `false` one mean the same to the
    /// server). This is the form both codecs reproduce on decode.
    pub fn pruned(&self) -> Self {
        let mut pruned = Self {
            measures: self
                .active_measures()
                .map(|m| (m.key.clone(), m.clone()))
                .collect(),
            drilldowns: self
                .active_drilldowns()
                .map(|d| {
                    let mut d = d.clone();
                    d.properties.retain(|p| p.active);
                    d.members.clear();
                    (d.key.clone(), d)
                })
                .collect(),
            cuts: self
                .active_cuts()
                .map(|c| {
                    let mut c = c.clone();
                    c.members.sort();
                    c.members.dedup();
                    (c.key.clone(), c)
                })
                .collect(),
            filters: self
                .active_filters()
                .map(|f| {
                    let mut f = f.clone();
                    if f.complete_condition_two().is_none() {
                        f.condition_two = None;
                        f.joint = Joint::default();
                    }
                    if let Some(key) =
                        filter_key(&f.measure, &f.condition_one, f.condition_two.as_ref(), f.joint)
                    {
                        f.key = key;
                    }
                    (f.key.clone(), f)
                })
                .collect(),
            ..self.clone()
        };
        pruned
            .booleans
            .retain(|flag, value| *value && flag_bit(flag).is_some());
        pruned
    }
}
