//! Snapshot parsing for agent-browser output
//!
//! Parses the accessibility tree JSON from `agent-browser snapshot -i --json`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Parsed snapshot from agent-browser
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Whether the operation succeeded
    #[serde(default)]
    pub success: bool,
    /// Snapshot data
    #[serde(default)]
    pub data: Option<SnapshotData>,
}

/// Snapshot data content
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotData {
    /// Raw snapshot string (accessibility tree)
    #[serde(default)]
    pub snapshot: String,
    /// Element refs mapped to their info
    #[serde(default)]
    pub refs: HashMap<String, Element>,
}

/// An element in the snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Element {
    /// ARIA role
    #[serde(default)]
    pub role: String,
    /// Accessible name
    #[serde(default)]
    pub name: String,
    /// Element value (for inputs)
    #[serde(default)]
    pub value: Option<String>,
    /// Whether element is focused
    #[serde(default)]
    pub focused: bool,
}

/// `e12` -> 12, for ordering refs the way they appear on the page
fn ref_number(ref_id: &str) -> u64 {
    ref_id
        .trim_start_matches('@')
        .trim_start_matches('e')
        .parse()
        .unwrap_or(u64::MAX)
}

impl Snapshot {
    /// Count the number of elements with refs
    pub fn count_elements(&self) -> usize {
        self.data.as_ref().map(|d| d.refs.len()).unwrap_or(0)
    }

    /// Get an element by ref
    pub fn get_element(&self, ref_id: &str) -> Option<&Element> {
        // Remove @ prefix if present
        let clean_ref = ref_id.trim().strip_prefix('@').unwrap_or(ref_id.trim());
        self.data.as_ref().and_then(|d| d.refs.get(clean_ref))
    }

    /// Format snapshot for the model, one element per line in page order
    pub fn format_for_display(&self) -> String {
        let Some(data) = &self.data else {
            return "No snapshot data available".to_string();
        };

        let mut refs: Vec<(&String, &Element)> = data.refs.iter().collect();
        refs.sort_by_key(|(ref_id, _)| ref_number(ref_id));

        let mut output = format!("Page Elements ({}):\n", refs.len());
        for (ref_id, element) in refs {
            let value_str = element
                .value
                .as_ref()
                .map(|v| format!(" = \"{}\"", v))
                .unwrap_or_default();

            output.push_str(&format!(
                "  {} \"{}\"{} [ref={}]",
                element.role, element.name, value_str, ref_id
            ));

            if element.focused {
                output.push_str(" [focused]");
            }

            output.push('\n');
        }

        output
    }
}

impl Element {
    /// `role "name"`, or just the role when the element is unnamed
    pub fn label(&self) -> String {
        let name = self.name.trim();
        if name.is_empty() {
            self.role.clone()
        } else {
            format!("{} \"{}\"", self.role, name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAW: &str = r#"{
        "success": true,
        "data": {
            "snapshot": "- searchbox \"Search\" [ref=e3]",
            "refs": {
                "e10": {"role": "link", "name": "Trending"},
                "e3": {"role": "searchbox", "name": "Search", "value": "cats", "focused": true},
                "e5": {"role": "button", "name": "Search"},
                "e7": {"role": "button", "name": "  "}
            }
        }
    }"#;

    #[test]
    fn test_parse_and_lookup() {
        let snapshot: Snapshot = serde_json::from_str(RAW).unwrap();
        assert_eq!(snapshot.count_elements(), 4);
        assert!(snapshot.get_element("e5").is_some());
        assert!(snapshot.get_element("@e5").is_some());
        assert!(snapshot.get_element("e2").is_none());
    }

    #[test]
    fn test_labels() {
        let snapshot: Snapshot = serde_json::from_str(RAW).unwrap();
        assert_eq!(snapshot.get_element("e5").unwrap().label(), "button \"Search\"");
        assert_eq!(snapshot.get_element("e7").unwrap().label(), "button");
    }

    #[test]
    fn test_display_is_in_page_order() {
        let snapshot: Snapshot = serde_json::from_str(RAW).unwrap();
        let display = snapshot.format_for_display();
        let lines: Vec<&str> = display.lines().collect();

        assert_eq!(lines[0], "Page Elements (4):");
        assert_eq!(
            lines[1],
            "  searchbox \"Search\" = \"cats\" [ref=e3] [focused]"
        );
        assert!(lines[4].ends_with("[ref=e10]"));
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = Snapshot {
            success: false,
            data: None,
        };
        assert_eq!(snapshot.format_for_display(), "No snapshot data available");
    }
}
