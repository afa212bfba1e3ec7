//! The query parameter model.
//!
//! [`QueryParams`] is the canonical description of what the user asked for.
//! Items are created through the builders, updated by replacing them by key,
//! and only removed on explicit resets.

pub mod builders;
mod items;
mod key;
mod params;

pub use builders::{
    build_cut, build_drilldown, build_filter, build_measure, build_property, cut_for_level,
    drilldown_for_level, filter_from_conditions,
};
pub use items::{
    format_value, Comparison, CutItem, DrilldownItem, FilterCondition, FilterItem, Joint,
    MeasureItem, PropertyItem, QueryParamsItem,
};
pub use key::{content_key, random_key};
pub use params::{flag_bit, QueryItem, QueryParams, SortDirection, BOOLEAN_FLAGS};
