//! The metadata tree and its path-addressed accessors.

use chrono::{NaiveDate, NaiveTime};

use radar_common::{join_path, normalize_path, split_path, RadarError, RadarResult, Value};

use crate::node::{NodeData, NodeId, NodeKind};

/// Hierarchical metadata for one stored file.
///
/// Owns a root group named `""`; every other node is addressed by a
/// normalized `/`-separated path. Sibling names are unique per parent and
/// children keep their insertion order.
#[derive(Debug, Clone)]
pub struct Metadata {
    nodes: Vec<NodeData>,
}

impl Default for Metadata {
    fn default() -> Self {
        Self::new()
    }
}

impl Metadata {
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData::new("", None, NodeKind::Group)],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn name(&self, id: NodeId) -> &str {
        &self.nodes[id.0].name
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes[id.0].children.iter().copied()
    }

    /// Absolute, normalized path of a node. The root path is `/`.
    pub fn path(&self, id: NodeId) -> String {
        let mut segments = Vec::new();
        let mut cursor = Some(id);
        while let Some(c) = cursor {
            let data = &self.nodes[c.0];
            if !data.name.is_empty() {
                segments.push(data.name.as_str());
            }
            cursor = data.parent;
        }
        segments.reverse();
        let mut out = String::from("/");
        out.push_str(&segments.join("/"));
        out
    }

    pub fn child_by_name(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.nodes[id.0]
            .children
            .iter()
            .copied()
            .find(|&c| self.nodes[c.0].name == name)
    }

    /// Look up a node by path, normalizing first. `None` on any miss.
    pub fn find_node(&self, path: &str) -> Option<NodeId> {
        let mut cursor = self.root();
        for segment in split_path(path) {
            cursor = self.child_by_name(cursor, &segment)?;
        }
        Some(cursor)
    }

    /// Look up a node by path, failing with a lookup error when absent.
    pub fn node(&self, path: &str) -> RadarResult<NodeId> {
        self.find_node(path)
            .ok_or_else(|| RadarError::Lookup(format!("no node at {}", normalize_path(path))))
    }

    /// Attach a new node under `parent_path`.
    ///
    /// Fails with a lookup error when the parent is absent and a duplicate
    /// error when a sibling of the same name already exists.
    pub fn add_node(&mut self, parent_path: &str, name: &str, kind: NodeKind) -> RadarResult<NodeId> {
        let parent = self.node(parent_path)?;
        self.add_child(parent, name, kind)
    }

    /// Attach a new node under an existing parent id.
    pub fn add_child(&mut self, parent: NodeId, name: &str, kind: NodeKind) -> RadarResult<NodeId> {
        if name.is_empty() || name.contains('/') {
            return Err(RadarError::Value(format!("invalid node name: {:?}", name)));
        }
        if self.child_by_name(parent, name).is_some() {
            return Err(RadarError::DuplicateEntry(format!(
                "node {} already exists",
                join_path(&self.path(parent), name)
            )));
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData::new(name, Some(parent), kind));
        self.nodes[parent.0].children.push(id);
        Ok(id)
    }

    /// Pre-order traversal starting at the root, inclusive.
    ///
    /// Each call produces a fresh iterator; children are visited in their
    /// insertion order.
    pub fn iternodes(&self) -> Nodes<'_> {
        Nodes {
            metadata: self,
            stack: vec![self.root()],
        }
    }

    /// The value of the attribute at `path`, if present.
    pub fn attribute(&self, path: &str) -> Option<&Value> {
        self.find_node(path)
            .and_then(|id| self.nodes[id.0].kind.value())
    }

    /// Set the attribute at `path`, auto-creating intervening groups and
    /// replacing any existing value.
    pub fn set_attribute(&mut self, path: &str, value: Value) -> RadarResult<NodeId> {
        let segments = split_path(path);
        let (attr_name, groups) = match segments.split_last() {
            Some(split) => split,
            None => return Err(RadarError::Value("attribute path is empty".into())),
        };
        let mut cursor = self.root();
        for group in groups {
            cursor = match self.child_by_name(cursor, group) {
                Some(id) => id,
                None => self.add_child(cursor, group, NodeKind::Group)?,
            };
        }
        match self.child_by_name(cursor, attr_name) {
            Some(id) => {
                self.nodes[id.0].kind = NodeKind::Attribute(value);
                Ok(id)
            }
            None => self.add_child(cursor, attr_name, NodeKind::Attribute(value)),
        }
    }

    fn str_attribute(&self, path: &str) -> Option<&str> {
        match self.attribute(path) {
            Some(Value::Str(s)) => Some(s),
            _ => None,
        }
    }

    /// Date-valued attribute, tolerating the ODIM `YYYYMMDD` string form.
    fn date_attribute(&self, path: &str) -> Option<NaiveDate> {
        match self.attribute(path) {
            Some(Value::Date(d)) => Some(*d),
            Some(Value::Str(s)) => NaiveDate::parse_from_str(s, "%Y%m%d").ok(),
            _ => None,
        }
    }

    /// Time-valued attribute, tolerating the ODIM `HHMMSS` string form.
    fn time_attribute(&self, path: &str) -> Option<NaiveTime> {
        match self.attribute(path) {
            Some(Value::Time(t)) => Some(*t),
            Some(Value::Str(s)) => NaiveTime::parse_from_str(s, "%H%M%S").ok(),
            _ => None,
        }
    }

    // === /what shortcuts ===

    pub fn what_object(&self) -> Option<&str> {
        self.str_attribute("/what/object")
    }

    pub fn what_source(&self) -> Option<&str> {
        self.str_attribute("/what/source")
    }

    pub fn what_date(&self) -> Option<NaiveDate> {
        self.date_attribute("/what/date")
    }

    pub fn what_time(&self) -> Option<NaiveTime> {
        self.time_attribute("/what/time")
    }

    // === /_bdb bookkeeping shortcuts ===

    pub fn bdb_uuid(&self) -> Option<&str> {
        self.str_attribute("/_bdb/uuid")
    }

    pub fn set_bdb_uuid(&mut self, uuid: &str) -> RadarResult<NodeId> {
        self.set_attribute("/_bdb/uuid", Value::Str(uuid.to_string()))
    }

    pub fn bdb_metadata_hash(&self) -> Option<&str> {
        self.str_attribute("/_bdb/metadata_hash")
    }

    pub fn set_bdb_metadata_hash(&mut self, hash: &str) -> RadarResult<NodeId> {
        self.set_attribute("/_bdb/metadata_hash", Value::Str(hash.to_string()))
    }

    pub fn bdb_file_size(&self) -> Option<i64> {
        match self.attribute("/_bdb/file_size") {
            Some(Value::Long(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn set_bdb_file_size(&mut self, size: i64) -> RadarResult<NodeId> {
        self.set_attribute("/_bdb/file_size", Value::Long(size))
    }

    pub fn bdb_source_name(&self) -> Option<&str> {
        self.str_attribute("/_bdb/source_name")
    }

    pub fn set_bdb_source_name(&mut self, name: &str) -> RadarResult<NodeId> {
        self.set_attribute("/_bdb/source_name", Value::Str(name.to_string()))
    }

    pub fn bdb_stored_date(&self) -> Option<NaiveDate> {
        self.date_attribute("/_bdb/stored_date")
    }

    pub fn set_bdb_stored_date(&mut self, date: NaiveDate) -> RadarResult<NodeId> {
        self.set_attribute("/_bdb/stored_date", Value::Date(date))
    }

    pub fn bdb_stored_time(&self) -> Option<NaiveTime> {
        self.time_attribute("/_bdb/stored_time")
    }

    pub fn set_bdb_stored_time(&mut self, time: NaiveTime) -> RadarResult<NodeId> {
        self.set_attribute("/_bdb/stored_time", Value::Time(time))
    }
}

/// Pre-order node iterator, produced by [`Metadata::iternodes`].
pub struct Nodes<'a> {
    metadata: &'a Metadata,
    stack: Vec<NodeId>,
}

impl Iterator for Nodes<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        // Children pushed in reverse so the first child is visited first.
        let children = &self.metadata.nodes[id.0].children;
        self.stack.extend(children.iter().rev().copied());
        Some(id)
    }
}
