//! Topic / subtopic / table catalog of cubes.
//!
//! Every visible cube adds the chain `topic - subtopic - table` to an
//! undirected graph:
//!
//! ```text
//!   [Trade] ---- [Goods] ---- (Exports by product)
//!      |            \-------- (Imports by product)
//!      \-------- [Services] - (Service exports)
//! ```
//!
//! Subtopic nodes are keyed by `(topic, subtopic)` and table nodes by cube
//! name, so two tables may share a label as long as they live in different
//! subtopics. An index is built for one locale and rebuilt, never patched,
//! when the locale changes.

mod matcher;

use std::collections::{BTreeMap, HashMap};

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::Bfs;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::CatalogSettings;
use crate::schema::Cube;

pub use matcher::{Matcher, RegexMatcher};

/// A cube as it appears in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableEntry {
    pub cube: String,
    pub label: String,
    pub topic: String,
    pub subtopic: String,
}

impl TableEntry {
    /// Group key used by [`CatalogIndex::search`].
    pub fn group(&self) -> String {
        format!("{} - {}", self.topic, self.subtopic)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogNode {
    Topic(String),
    Subtopic(String),
    Table(TableEntry),
}

/// Topic and subtopic owning a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableOwner {
    pub topic: String,
    pub subtopic: String,
}

#[derive(Debug, Clone)]
pub struct CatalogIndex {
    graph: UnGraph<CatalogNode, ()>,
    locale: Option<String>,
    topics: HashMap<String, NodeIndex>,
    subtopics: HashMap<(String, String), NodeIndex>,
    tables: HashMap<String, NodeIndex>,
}

impl CatalogIndex {
    /// Build the catalog for `locale` from cube annotations.
    pub fn build<'a>(
        cubes: impl IntoIterator<Item = &'a Cube>,
        locale: Option<&str>,
        settings: &CatalogSettings,
    ) -> Self {
        let mut index = Self {
            graph: UnGraph::new_undirected(),
            locale: locale.map(String::from),
            topics: HashMap::new(),
            subtopics: HashMap::new(),
            tables: HashMap::new(),
        };

        for cube in cubes {
            if cube.annotation(&settings.hide_annotation, None) == Some("true") {
                debug!(cube = %cube.name, "hidden from catalog");
                continue;
            }
            if index.tables.contains_key(&cube.name) {
                warn!(cube = %cube.name, "duplicate cube in catalog input, keeping the first");
                continue;
            }

            let label = |key: &str| {
                cube.annotation(key, locale)
                    .map(str::trim)
                    .filter(|value| !value.is_empty())
                    .map(String::from)
            };
            let topic = label(&settings.topic_annotation)
                .unwrap_or_else(|| settings.fallback_topic.clone());
            let subtopic = label(&settings.subtopic_annotation)
                .unwrap_or_else(|| settings.fallback_topic.clone());
            let table = label(&settings.table_annotation)
                .or_else(|| cube.caption.clone())
                .unwrap_or_else(|| cube.name.clone());

            index.insert(TableEntry {
                cube: cube.name.clone(),
                label: table,
                topic,
                subtopic,
            });
        }

        debug!(
            locale = ?index.locale,
            topics = index.topics.len(),
            tables = index.tables.len(),
            "catalog built"
        );
        index
    }

    fn insert(&mut self, entry: TableEntry) {
        let topic = *self
            .topics
            .entry(entry.topic.clone())
            .or_insert_with(|| self.graph.add_node(CatalogNode::Topic(entry.topic.clone())));

        let subtopic_key = (entry.topic.clone(), entry.subtopic.clone());
        let subtopic = match self.subtopics.get(&subtopic_key) {
            Some(node) => *node,
            None => {
                let node = self
                    .graph
                    .add_node(CatalogNode::Subtopic(entry.subtopic.clone()));
                self.graph.add_edge(topic, node, ());
                self.subtopics.insert(subtopic_key, node);
                node
            }
        };

        let cube = entry.cube.clone();
        let table = self.graph.add_node(CatalogNode::Table(entry));
        self.graph.add_edge(subtopic, table, ());
        self.tables.insert(cube, table);
    }

    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    pub fn graph(&self) -> &UnGraph<CatalogNode, ()> {
        &self.graph
    }

    pub fn table(&self, cube: &str) -> Option<&TableEntry> {
        match self.graph.node_weight(*self.tables.get(cube)?)? {
            CatalogNode::Table(entry) => Some(entry),
            _ => None,
        }
    }

    /// Walk outward from a table to the nearest subtopic and topic nodes.
    pub fn owner_of(&self, cube: &str) -> Option<TableOwner> {
        let start = *self.tables.get(cube)?;
        let mut bfs = Bfs::new(&self.graph, start);
        let (mut topic, mut subtopic) = (None, None);

        while let Some(node) = bfs.next(&self.graph) {
            match &self.graph[node] {
                CatalogNode::Subtopic(name) if subtopic.is_none() => subtopic = Some(name.clone()),
                CatalogNode::Topic(name) if topic.is_none() => topic = Some(name.clone()),
                _ => {}
            }
            if topic.is_some() && subtopic.is_some() {
                break;
            }
        }

        Some(TableOwner {
            topic: topic?,
            subtopic: subtopic?,
        })
    }

    /// Topic labels, sorted.
    pub fn topics(&self) -> Vec<&str> {
        let mut topics: Vec<&str> = self.topics.keys().map(String::as_str).collect();
        topics.sort_unstable();
        topics
    }

    /// Subtopics of a topic, sorted.
    pub fn subtopics(&self, topic: &str) -> Vec<&str> {
        let Some(&node) = self.topics.get(topic) else {
            return Vec::new();
        };
        let mut names: Vec<&str> = self
            .graph
            .neighbors(node)
            .filter_map(|n| match &self.graph[n] {
                CatalogNode::Subtopic(name) => Some(name.as_str()),
                _ => None,
            })
            .collect();
        names.sort_unstable();
        names
    }

    /// Tables of a subtopic, sorted by label.
    pub fn tables(&self, topic: &str, subtopic: &str) -> Vec<&TableEntry> {
        let key = (topic.to_string(), subtopic.to_string());
        let Some(&node) = self.subtopics.get(&key) else {
            return Vec::new();
        };
        let mut tables: Vec<&TableEntry> = self
            .graph
            .neighbors(node)
            .filter_map(|n| match &self.graph[n] {
                CatalogNode::Table(entry) => Some(entry),
                _ => None,
            })
            .collect();
        tables.sort_by(|a, b| a.label.cmp(&b.label).then_with(|| a.cube.cmp(&b.cube)));
        tables
    }

    /// Search table labels with the default [`RegexMatcher`].
    pub fn search(&self, needle: &str) -> BTreeMap<String, Vec<&TableEntry>> {
        self.search_with(&RegexMatcher, needle)
    }

    /// Tables whose label matches `needle`, grouped by `"topic - subtopic"`.
    ///
    /// Within a group, better-scoring tables come first. A blank needle
    /// matches every table.
    pub fn search_with<M: Matcher + ?Sized>(
        &self,
        matcher: &M,
        needle: &str,
    ) -> BTreeMap<String, Vec<&TableEntry>> {
        let mut groups: BTreeMap<String, Vec<(usize, &TableEntry)>> = BTreeMap::new();

        for node in self.graph.node_weights() {
            let CatalogNode::Table(entry) = node else {
                continue;
            };
            let score = if needle.trim().is_empty() {
                Some(0)
            } else {
                matcher.score(needle, &entry.label)
            };
            if let Some(score) = score {
                groups.entry(entry.group()).or_default().push((score, entry));
            }
        }

        groups
            .into_iter()
            .map(|(group, mut hits)| {
                hits.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.label.cmp(&b.1.label)));
                (group, hits.into_iter().map(|(_, entry)| entry).collect())
            })
            .collect()
    }
}
