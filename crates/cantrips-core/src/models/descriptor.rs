//! Command descriptors exported by modules, and the validating tree parser.
//!
//! A module exports a JSON object mapping keys to either a leaf descriptor
//! (`{meta, exposed}`) or a group (`{moduleGroup, ...children}`). Groups nest
//! arbitrarily. Anything else is rejected with a [`DescriptorShapeError`]
//! without affecting its siblings.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::DescriptorShapeError;

/// Marker key identifying a descriptor group.
pub const MODULE_GROUP_KEY: &str = "moduleGroup";

/// A command-line parameter declared by a module or an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(default, alias = "help", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Boolean switch instead of a value option
    #[serde(default)]
    pub flag: bool,
}

impl Parameter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            flag: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn as_flag(mut self) -> Self {
        self.flag = true;
        self
    }
}

/// One exposed action in the modern map shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

/// The set of invocable actions of a leaf descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Exposed {
    /// `{actionName: {description?, parameters?}}`
    Actions(BTreeMap<String, ActionSpec>),
    /// Legacy `[actionName, ...]`
    Legacy(Vec<String>),
}

impl Exposed {
    pub fn contains(&self, action: &str) -> bool {
        match self {
            Exposed::Actions(actions) => actions.contains_key(action),
            Exposed::Legacy(actions) => actions.iter().any(|a| a == action),
        }
    }

    pub fn action_names(&self) -> Vec<&str> {
        match self {
            Exposed::Actions(actions) => actions.keys().map(String::as_str).collect(),
            Exposed::Legacy(actions) => actions.iter().map(String::as_str).collect(),
        }
    }
}

/// The `meta` block of a leaf descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleMeta {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    /// Default action timeout in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafDescriptor {
    pub meta: ModuleMeta,
    pub exposed: Exposed,
}

/// A validated entry of an export tree.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportNode {
    Leaf(LeafDescriptor),
    /// Children of a group, marker already stripped.
    Group(Map<String, Value>),
}

impl ExportNode {
    /// Classify one export value by shape: leaf first, then group.
    pub fn parse(key: &str, value: &Value) -> Result<Self, DescriptorShapeError> {
        let Some(object) = value.as_object() else {
            return Err(DescriptorShapeError::NotADescriptor {
                key: key.to_string(),
            });
        };

        if object.contains_key("meta") && object.contains_key("exposed") {
            let descriptor: LeafDescriptor =
                serde_json::from_value(value.clone()).map_err(|e| {
                    DescriptorShapeError::Malformed {
                        key: key.to_string(),
                        reason: e.to_string(),
                    }
                })?;
            return Ok(ExportNode::Leaf(descriptor));
        }

        if object.contains_key(MODULE_GROUP_KEY) {
            let mut children = object.clone();
            children.remove(MODULE_GROUP_KEY);
            return Ok(ExportNode::Group(children));
        }

        Err(DescriptorShapeError::NotADescriptor {
            key: key.to_string(),
        })
    }
}

/// A leaf found while walking an export tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedLeaf {
    /// Keys from the export root down to this leaf.
    pub export_path: Vec<String>,
    pub descriptor: LeafDescriptor,
}

impl ExportedLeaf {
    /// The key this leaf was found under.
    pub fn export_key(&self) -> &str {
        self.export_path.last().map(String::as_str).unwrap_or_default()
    }
}

/// Result of walking an export tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportScan {
    pub leaves: Vec<ExportedLeaf>,
    pub rejected: Vec<DescriptorShapeError>,
}

/// Walk an export object, unwrapping groups recursively.
pub fn scan_exports(exports: &Map<String, Value>) -> ExportScan {
    let mut scan = ExportScan::default();
    scan_into(exports, &mut Vec::new(), &mut scan);
    scan
}

fn scan_into(exports: &Map<String, Value>, prefix: &mut Vec<String>, scan: &mut ExportScan) {
    for (key, value) in exports {
        match ExportNode::parse(key, value) {
            Ok(ExportNode::Leaf(descriptor)) => {
                let mut export_path = prefix.clone();
                export_path.push(key.clone());
                scan.leaves.push(ExportedLeaf {
                    export_path,
                    descriptor,
                });
            }
            Ok(ExportNode::Group(children)) => {
                prefix.push(key.clone());
                scan_into(&children, prefix, scan);
                prefix.pop();
            }
            Err(err) => scan.rejected.push(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn exports(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_leaf_requires_meta_and_exposed() {
        let leaf = json!({"meta": {"name": "deploy"}, "exposed": {"run": {}}});
        assert!(matches!(
            ExportNode::parse("deploy", &leaf),
            Ok(ExportNode::Leaf(_))
        ));

        let meta_only = json!({"meta": {"name": "deploy"}});
        assert_eq!(
            ExportNode::parse("deploy", &meta_only),
            Err(DescriptorShapeError::NotADescriptor {
                key: "deploy".to_string()
            })
        );
    }

    #[test]
    fn test_non_objects_are_rejected() {
        for value in [json!("1.0.0"), json!(null), json!(42), json!([1, 2])] {
            assert!(ExportNode::parse("x", &value).is_err());
        }
    }

    #[test]
    fn test_malformed_meta_is_reported() {
        let leaf = json!({"meta": {"description": "no name"}, "exposed": {}});
        let err = ExportNode::parse("broken", &leaf).unwrap_err();
        assert!(matches!(err, DescriptorShapeError::Malformed { .. }));
        assert_eq!(err.key(), "broken");
    }

    #[test]
    fn test_legacy_exposed_list() {
        let leaf = json!({"meta": {"name": "old"}, "exposed": ["start", "stop"]});
        let ExportNode::Leaf(descriptor) = ExportNode::parse("old", &leaf).unwrap() else {
            panic!("expected leaf");
        };
        assert!(descriptor.exposed.contains("stop"));
        assert!(!descriptor.exposed.contains("restart"));
        assert_eq!(descriptor.exposed.action_names(), vec!["start", "stop"]);
    }

    #[test]
    fn test_parameter_help_alias() {
        let param: Parameter =
            serde_json::from_value(json!({"name": "env", "help": "Target environment"})).unwrap();
        assert_eq!(param.description.as_deref(), Some("Target environment"));
        assert!(!param.flag);
    }

    #[test]
    fn test_group_is_unwrapped_recursively() {
        let scan = scan_exports(&exports(json!({
            "tools": {
                "moduleGroup": true,
                "lint": {"meta": {"name": "lint"}, "exposed": {"check": {}}},
                "nested": {
                    "moduleGroup": true,
                    "fmt": {"meta": {"name": "fmt"}, "exposed": ["apply"]}
                }
            },
            "deploy": {"meta": {"name": "deploy"}, "exposed": {"run": {}}}
        })));

        assert!(scan.rejected.is_empty());
        let paths: Vec<Vec<String>> = scan.leaves.iter().map(|l| l.export_path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                vec!["deploy".to_string()],
                vec!["tools".to_string(), "lint".to_string()],
                vec!["tools".to_string(), "nested".to_string(), "fmt".to_string()],
            ]
        );
        assert_eq!(scan.leaves[2].export_key(), "fmt");
    }

    #[test]
    fn test_invalid_sibling_does_not_stop_scan() {
        let scan = scan_exports(&exports(json!({
            "a": {"meta": {"name": "a"}, "exposed": {}},
            "b": "not a descriptor",
            "c": {"meta": {"name": "c"}, "exposed": {}}
        })));
        assert_eq!(scan.leaves.len(), 2);
        assert_eq!(scan.rejected.len(), 1);
        assert_eq!(scan.rejected[0].key(), "b");
    }
}
