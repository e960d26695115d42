//! Node grouping and search.

use std::collections::BTreeSet;

use fleetwatch_types::{NodeInfo, Roster, Snapshot};

/// Distinct, non-blank group names, sorted.
pub fn groups(roster: &Roster) -> Vec<String> {
    roster
        .iter()
        .map(|n| n.group.trim())
        .filter(|g| !g.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Which group is shown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum GroupSelection {
    #[default]
    All,
    Group(String),
}

impl GroupSelection {
    pub fn matches(&self, node: &NodeInfo) -> bool {
        match self {
            GroupSelection::All => true,
            GroupSelection::Group(g) => node.group.trim() == g,
        }
    }

    /// Advance through `All` then each group in order, wrapping around.
    pub fn next(&self, groups: &[String]) -> Self {
        let position = match self {
            GroupSelection::All => None,
            GroupSelection::Group(g) => groups.iter().position(|x| x == g),
        };
        let next = match position {
            None => 0,
            Some(i) => i + 1,
        };
        groups
            .get(next)
            .map(|g| GroupSelection::Group(g.clone()))
            .unwrap_or(GroupSelection::All)
    }

    pub fn label(&self) -> &str {
        match self {
            GroupSelection::All => "all",
            GroupSelection::Group(g) => g,
        }
    }
}

/// Group, region and free-text search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeFilter {
    pub group: GroupSelection,
    /// Exact region; `Some("")` selects nodes without a region.
    pub region: Option<String>,
    pub search: String,
}

impl NodeFilter {
    /// Whether `node` passes the group, the region and the search term.
    ///
    /// The search term matches case-insensitively against name, os, arch
    /// and region. A numeric term also matches against the price, and the
    /// keywords `online` / `offline` match by status.
    pub fn matches(&self, node: &NodeInfo, snapshot: Option<&Snapshot>) -> bool {
        if !self.group.matches(node) {
            return false;
        }
        if self.region.as_ref().is_some_and(|r| node.region.trim() != r.as_str()) {
            return false;
        }

        let term = self.search.trim().to_lowercase();
        if term.is_empty() {
            return true;
        }

        let contains = |field: &str| field.to_lowercase().contains(&term);
        let basic = contains(node.display_name()) || contains(&node.os) || contains(&node.arch);
        let region = contains(&node.region);
        let price = term.parse::<f64>().is_ok() && node.price.to_string().contains(&term);

        let online = snapshot.is_some_and(|s| s.is_online(&node.uuid));
        let status = (term == "online" && online) || (term == "offline" && !online);

        basic || region || price || status
    }

    /// The roster entries that pass, in roster order.
    pub fn apply<'a>(&self, roster: &'a Roster, snapshot: Option<&Snapshot>) -> Vec<&'a NodeInfo> {
        roster.iter().filter(|n| self.matches(n, snapshot)).collect()
    }

    pub fn is_active(&self) -> bool {
        self.group != GroupSelection::All
            || self.region.is_some()
            || !self.search.trim().is_empty()
    }
}
