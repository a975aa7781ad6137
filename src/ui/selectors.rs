use crate::ui::Intent;
use serde::{Deserialize, Serialize};

/// CSS selector chains for each [`Intent`]
///
/// For single lookups the alternatives are tried in order and the first hit
/// wins. For multi lookups they are joined into one selector list, so matches
/// come back in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Selectors {
    pub active_context: Vec<String>,
    pub group_selector: Vec<String>,
    pub leaf_entry: Vec<String>,
    pub expand_trigger: Vec<String>,
    pub first_menu_item: Vec<String>,
    pub popup_container: Vec<String>,
    pub document_link: Vec<String>,
    pub popup_close: Vec<String>,
}

fn chain(selectors: &[&str]) -> Vec<String> {
    selectors.iter().map(|s| s.to_string()).collect()
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            active_context: chain(&[".tab-pane.active"]),
            group_selector: chain(&["select[name=\"selectAddrid\"]", "select#selectAddrid"]),
            leaf_entry: chain(&["td .dropdown:has(.icon-user)"]),
            expand_trigger: chain(&["a[data-toggle=\"dropdown\"]"]),
            first_menu_item: chain(&["ul.dropdown-menu li:first-child a"]),
            popup_container: chain(&[".layui-layer"]),
            document_link: chain(&["a[href*=\".pdf/\"]", "a[href*=\"/pdf/\"]"]),
            popup_close: chain(&["a.layui-layer-iclose", ".layui-layer-setwin a"]),
        }
    }
}

impl Selectors {
    /// Selector alternatives for an intent
    pub fn chain(&self, intent: Intent) -> &[String] {
        match intent {
            Intent::ActiveContext => &self.active_context,
            Intent::GroupSelector => &self.group_selector,
            Intent::LeafEntry => &self.leaf_entry,
            Intent::ExpandTrigger => &self.expand_trigger,
            Intent::FirstMenuItem => &self.first_menu_item,
            Intent::PopupContainer => &self.popup_container,
            Intent::DocumentLink => &self.document_link,
            Intent::PopupClose => &self.popup_close,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_group_selector_prefers_name_attribute() {
        let selectors = Selectors::default();
        let chain = selectors.chain(Intent::GroupSelector);
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0], "select[name=\"selectAddrid\"]");
        assert_eq!(chain[1], "select#selectAddrid");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let json = serde_json::json!({ "popup_container": [".modal"] });
        let selectors: Selectors = serde_json::from_value(json).unwrap();
        assert_eq!(selectors.popup_container, vec![".modal".to_string()]);
        assert_eq!(selectors.leaf_entry, Selectors::default().leaf_entry);
    }
}
