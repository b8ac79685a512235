use msa_document::{Mapping, Node};

/// Named containers that carry cross-chain alignment data.
pub const PAIRED_CONTAINER_KEYS: [&str; 5] = [
    "pairedMsa",
    "paired_msa",
    "paired_msas",
    "complex_msa",
    "interaction_msa",
];

/// True for keys that hold paired (cross-chain) alignment data. `unpairedMsa`
/// is never paired.
pub fn is_paired_key(key: &str) -> bool {
    PAIRED_CONTAINER_KEYS.contains(&key) || key.to_ascii_lowercase().starts_with("paired")
}

/// Copy of `node` with every paired-alignment field removed at any depth.
pub fn strip_paired(node: &Node) -> Node {
    match node {
        Node::Mapping(map) => Node::Mapping(
            map.iter()
                .filter(|(key, _)| !is_paired_key(key))
                .map(|(key, value)| (key.clone(), strip_paired(value)))
                .collect::<Mapping>(),
        ),
        Node::Sequence(items) => Node::Sequence(items.iter().map(strip_paired).collect()),
        Node::Scalar(_) => node.clone(),
    }
}

/// First paired-alignment key found anywhere in the tree.
pub fn find_paired_key(node: &Node) -> Option<&str> {
    match node {
        Node::Mapping(map) => find_paired_key_in(map),
        Node::Sequence(items) => items.iter().find_map(find_paired_key),
        Node::Scalar(_) => None,
    }
}

pub fn find_paired_key_in(map: &Mapping) -> Option<&str> {
    map.iter().find_map(|(key, value)| {
        if is_paired_key(key) {
            Some(key.as_str())
        } else {
            find_paired_key(value)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn recognizes_paired_keys_case_insensitively() {
        assert!(is_paired_key("pairedMsa"));
        assert!(is_paired_key("PairedTemplates"));
        assert!(is_paired_key("complex_msa"));
        assert!(is_paired_key("interaction_msa"));
        assert!(!is_paired_key("unpairedMsa"));
        assert!(!is_paired_key("templates"));
    }

    #[test]
    fn strip_removes_nested_paired_fields_only() {
        let node = Node::from(json!({
            "pairedMsa": "top",
            "sequences": [{"protein": {"id": "A", "unpairedMsa": ">q", "pairedMsa": ">p"}}],
            "extra": {"complex_msa": [1], "keep": true}
        }));
        let stripped = strip_paired(&node);
        assert_eq!(find_paired_key(&node), Some("pairedMsa"));
        assert_eq!(find_paired_key(&stripped), None);
        assert_eq!(
            stripped,
            Node::from(json!({
                "sequences": [{"protein": {"id": "A", "unpairedMsa": ">q"}}],
                "extra": {"keep": true}
            }))
        );
    }
}
