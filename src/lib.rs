//! # cubequery
//!
//! Query parameter model for OLAP cube explorers.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │          Cube metadata (schema, SchemaProvider)          │
//! └─────────────────────────────────────────────────────────┘
//!             │                                │
//!             ▼ [model builders]               ▼ [catalog]
//! ┌───────────────────────────────┐   ┌─────────────────────┐
//! │   QueryParams (items by key)  │   │ topic/subtopic/table│
//! └───────────────────────────────┘   │        graph        │
//!             │                       └─────────────────────┘
//!             ▼ [validation]
//! ┌─────────────────────────────────────────────────────────┐
//! │             first failing rule, or executable            │
//! └─────────────────────────────────────────────────────────┘
//!             │
//!             ▼ [codec]
//! ┌───────────────────────────┐   ┌─────────────────────────┐
//! │  flat data-server request │   │   permalink (URL state)  │
//! └───────────────────────────┘   └─────────────────────────┘
//!             │
//!             ▼ result rows [pivot, background]
//! ┌─────────────────────────────────────────────────────────┐
//! │                    PivotMatrix                           │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod catalog;
pub mod codec;
pub mod config;
pub mod model;
pub mod pivot;
pub mod schema;
pub mod validation;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::catalog::{CatalogIndex, Matcher, RegexMatcher, TableEntry};
    pub use crate::codec::{
        parse_permalink, parse_request, serialize_permalink, to_request, CodecError, FlatRequest,
    };
    pub use crate::config::Settings;
    pub use crate::model::{
        build_cut, build_drilldown, build_filter, build_measure, build_property, QueryItem,
        QueryParams, QueryParamsItem,
    };
    pub use crate::pivot::{pivot, Aggregation, PivotMatrix, PivotOutcome, PivotRunner, PivotSpec};
    pub use crate::schema::{Cube, LevelIndex, Schema, SchemaProvider, StaticSchema};
    pub use crate::validation::{first_issue, is_valid_query, QueryIssue};
}

pub use codec::{CodecError, CodecResult};
pub use model::{QueryItem, QueryParams};
pub use validation::QueryIssue;
