use std::collections::BTreeMap;

use serde::{
    Deserialize,
    Serialize,
};

/// One node of the `::`-separated deck hierarchy. Children are keyed by the
/// leaf name so siblings iterate in lexicographic order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeckNode {
    pub name: String,
    pub full_name: String,
    pub children: BTreeMap<String, DeckNode>,
    pub is_expanded: bool,
    pub level: i32,
}

impl DeckNode {
    /// Looks a node up by its full `::`-joined path, for toggling expansion.
    pub fn child_mut(&mut self, full_name: &str) -> Option<&mut DeckNode> {
        let mut current = self;
        for part in full_name.split("::") {
            current = current.children.get_mut(part)?;
        }
        Some(current)
    }
}

/// Builds the deck tree from the flat `deckNames` listing. Intermediate
/// levels exist even when the bridge only reports the leaf deck.
pub fn organize_deck_tree(decks: &[String]) -> DeckNode {
    let mut root = DeckNode { level: -1, ..DeckNode::default() };

    for deck in decks {
        let mut current = &mut root;
        let mut full_path = String::new();

        for (index, part) in deck.split("::").enumerate() {
            if !full_path.is_empty() {
                full_path.push_str("::");
            }
            full_path.push_str(part);

            current = current.children.entry(part.to_string()).or_insert_with(|| DeckNode {
                name: part.to_string(),
                full_name: full_path.clone(),
                children: BTreeMap::new(),
                is_expanded: false,
                level: index as i32,
            });
        }
    }

    root
}

/// Visible rows for a deck list: siblings in name order, descending only
/// into nodes explicitly expanded.
pub fn flatten_deck_tree(node: &DeckNode) -> Vec<String> {
    let mut rows = Vec::new();
    flatten_into(node, &mut rows);
    rows
}

fn flatten_into(node: &DeckNode, rows: &mut Vec<String>) {
    for child in node.children.values() {
        rows.push(child.full_name.clone());
        if child.is_expanded && !child.children.is_empty() {
            flatten_into(child, rows);
        }
    }
}
