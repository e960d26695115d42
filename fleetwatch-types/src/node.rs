//! Node roster types.

/// Static metadata for one monitored node.
///
/// Entries come from the server's node list and change rarely. Everything
/// except `uuid` is optional on the wire.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct NodeInfo {
    pub uuid: String,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::lenient::or_default"))]
    pub name: String,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::lenient::or_default"))]
    pub region: String,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::lenient::or_default"))]
    pub group: String,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::lenient::or_default"))]
    pub os: String,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::lenient::or_default"))]
    pub arch: String,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::lenient::or_default"))]
    pub cpu_name: String,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::lenient::u64"))]
    pub cpu_cores: u64,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::lenient::u64"))]
    pub mem_total: u64,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::lenient::u64"))]
    pub swap_total: u64,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::lenient::u64"))]
    pub disk_total: u64,
    /// Price per billing cycle. Negative means free.
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::lenient::f64"))]
    pub price: f64,
    /// Billing cycle in days.
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::lenient::u64"))]
    pub billing_cycle: u64,
    /// Display ordering; lower sorts first.
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::lenient::u64"))]
    pub weight: u64,
    /// Semicolon separated tag list as sent by the server.
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::lenient::or_default"))]
    pub tags: String,
}

impl NodeInfo {
    /// Create a node with only its uuid set.
    pub fn new(uuid: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            ..Default::default()
        }
    }

    /// Set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the region.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Set the group.
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    /// Set os and arch.
    pub fn with_platform(mut self, os: impl Into<String>, arch: impl Into<String>) -> Self {
        self.os = os.into();
        self.arch = arch.into();
        self
    }

    /// Set the price.
    pub fn with_price(mut self, price: f64) -> Self {
        self.price = price;
        self
    }

    /// Name for display, falling back to the uuid.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.uuid
        } else {
            &self.name
        }
    }

    /// Individual tags, trimmed and without empties.
    pub fn tag_list(&self) -> impl Iterator<Item = &str> {
        self.tags
            .split(';')
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// The list of known nodes.
///
/// Read-only for the live core; a fresh roster replaces the previous one.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(from = "Vec<NodeInfo>", into = "Vec<NodeInfo>")
)]
pub struct Roster {
    nodes: Vec<NodeInfo>,
}

impl Roster {
    /// Build a roster, ordered by weight then name.
    pub fn new(mut nodes: Vec<NodeInfo>) -> Self {
        nodes.sort_by(|a, b| {
            a.weight
                .cmp(&b.weight)
                .then_with(|| a.display_name().cmp(b.display_name()))
        });
        Self { nodes }
    }

    /// Synthesize a bare roster from the ids a snapshot knows about.
    ///
    /// Used when no roster source is available; only uuids are populated.
    pub fn from_snapshot(snapshot: &crate::Snapshot) -> Self {
        let mut ids: Vec<&String> = snapshot.data.keys().chain(snapshot.online.iter()).collect();
        ids.sort();
        ids.dedup();
        Self::new(ids.into_iter().map(|id| NodeInfo::new(id.as_str())).collect())
    }

    /// Look up a node by uuid.
    pub fn get(&self, uuid: &str) -> Option<&NodeInfo> {
        self.nodes.iter().find(|n| n.uuid == uuid)
    }

    pub fn contains(&self, uuid: &str) -> bool {
        self.get(uuid).is_some()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NodeInfo> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn as_slice(&self) -> &[NodeInfo] {
        &self.nodes
    }
}

impl<'a> IntoIterator for &'a Roster {
    type Item = &'a NodeInfo;
    type IntoIter = std::slice::Iter<'a, NodeInfo>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}

impl From<Vec<NodeInfo>> for Roster {
    fn from(nodes: Vec<NodeInfo>) -> Self {
        Self::new(nodes)
    }
}

impl From<Roster> for Vec<NodeInfo> {
    fn from(roster: Roster) -> Self {
        roster.nodes
    }
}

impl FromIterator<NodeInfo> for Roster {
    fn from_iter<I: IntoIterator<Item = NodeInfo>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
