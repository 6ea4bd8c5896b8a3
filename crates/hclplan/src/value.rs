//! attribute values as plan json
//!
//! Block attributes arrive as [hcl::Value]s. The plan document wants plain json objects where
//! nested blocks are folded into arrays keyed by their block kind:
//!
//! ```hcl
//! resource "aws_instance" "web" {
//!   ami = "ami-123"
//!   ebs_block_device { volume_size = 10 }
//!   ebs_block_device { volume_size = 20 }
//! }
//! ```
//!
//! becomes
//!
//! ```json
//! { "ami": "ami-123", "ebs_block_device": [{ "volume_size": 10 }, { "volume_size": 20 }] }
//! ```
//!
//! `null` values stay `null`. Meta blocks (`dynamic`, `depends_on`) are dropped.
use crate::config::{Block, BlockKind, COUNT_ATTRIBUTE};
use serde_json::{Map, Value};

/// Marshals a block's attribute object
///
/// Returns `None` if `value` is null or not an object. The count attribute is dropped for
/// resources and modules since it is rendered as a separate count expression.
pub fn marshal_attribute_values(kind: &BlockKind, value: &hcl::Value) -> Option<Map<String, Value>> {
    let hcl::Value::Object(object) = value else {
        return None;
    };

    let skip_count = matches!(kind, BlockKind::Resource | BlockKind::Module);
    Some(
        object
            .iter()
            .filter(|(key, _)| !(skip_count && key.as_str() == COUNT_ATTRIBUTE))
            .map(|(key, value)| (key.clone(), json_value(value)))
            .collect(),
    )
}

/// Marshals a block's attributes and all its nested blocks
pub fn marshal_block(block: &Block) -> Option<Map<String, Value>> {
    let mut values = marshal_attribute_values(&block.kind, &block.values())?;
    marshal_children(block, &mut values);
    Some(values)
}

/// Folds the child blocks of `block` into `values`
pub fn marshal_children(block: &Block, values: &mut Map<String, Value>) {
    for child in &block.children {
        if child.kind.is_meta() {
            continue;
        }

        let key = child.kind.as_str();
        let child_values = marshal_block(child).unwrap_or_default();

        match values.get_mut(key) {
            Some(Value::Array(existing)) => existing.push(Value::Object(child_values)),
            _ => {
                values.insert(key.to_owned(), Value::Array(vec![Value::Object(child_values)]));
            }
        }
    }
}

/// Converts a single [hcl::Value]
pub fn json_value(value: &hcl::Value) -> Value {
    match value {
        hcl::Value::Null => Value::Null,
        hcl::Value::Bool(b) => Value::Bool(*b),
        hcl::Value::Number(num) => json_number(num),
        hcl::Value::String(s) => Value::String(s.clone()),
        hcl::Value::Array(array) => Value::Array(array.iter().map(json_value).collect()),
        hcl::Value::Object(object) => Value::Object(
            object
                .iter()
                .map(|(k, v)| (k.clone(), json_value(v)))
                .collect(),
        ),
    }
}

fn json_number(num: &hcl::Number) -> Value {
    if let Some(int) = num.as_i64() {
        return Value::from(int);
    }

    if let Some(uint) = num.as_u64() {
        return Value::from(uint);
    }

    num.as_f64()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::Attribute;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn hcl_value(value: Value) -> hcl::Value {
        hcl::to_value(value).expect("json converts to hcl")
    }

    #[test]
    fn null_is_absent() {
        assert_eq!(marshal_attribute_values(&BlockKind::Resource, &hcl::Value::Null), None);
    }

    #[test]
    fn count_dropped_for_resources_and_modules() {
        let value = hcl_value(json!({ "count": 3, "ami": "ami-123" }));

        let resource = marshal_attribute_values(&BlockKind::Resource, &value).unwrap();
        assert_eq!(Value::Object(resource), json!({ "ami": "ami-123" }));

        let module = marshal_attribute_values(&BlockKind::Module, &value).unwrap();
        assert_eq!(Value::Object(module), json!({ "ami": "ami-123" }));

        let other = marshal_attribute_values(&BlockKind::Other("thing".into()), &value).unwrap();
        assert_eq!(Value::Object(other), json!({ "count": 3, "ami": "ami-123" }));
    }

    #[test]
    fn nested_values() {
        let value = hcl_value(json!({
            "tags": { "Name": "web" },
            "ports": [80, 443],
            "weight": 0.5,
            "unknown": null
        }));

        let values = marshal_attribute_values(&BlockKind::Resource, &value).unwrap();
        assert_eq!(
            Value::Object(values),
            json!({
                "tags": { "Name": "web" },
                "ports": [80, 443],
                "weight": 0.5,
                "unknown": null
            })
        );
    }

    #[test]
    fn children_accumulate_by_kind() {
        let block = Block::resource("aws_instance", "web")
            .with_attribute(Attribute::new("ami", "ami-123"))
            .with_child(
                Block::nested("ebs_block_device").with_attribute(Attribute::new("volume_size", 10)),
            )
            .with_child(
                Block::nested("root_block_device").with_attribute(Attribute::new("volume_size", 8)),
            )
            .with_child(
                Block::nested("ebs_block_device")
                    .with_attribute(Attribute::new("volume_size", 20))
                    .with_child(Block::nested("tag").with_attribute(Attribute::new("key", "a"))),
            );

        assert_eq!(
            Value::Object(marshal_block(&block).unwrap()),
            json!({
                "ami": "ami-123",
                "ebs_block_device": [
                    { "volume_size": 10 },
                    { "volume_size": 20, "tag": [{ "key": "a" }] }
                ],
                "root_block_device": [{ "volume_size": 8 }]
            })
        );
    }

    #[test]
    fn meta_children_skipped() {
        let block = Block::resource("aws_security_group", "sg")
            .with_child(
                Block::new(BlockKind::Dynamic, "ingress", "")
                    .with_attribute(Attribute::new("for_each", hcl::Value::Null))
                    .with_child(Block::nested("content")),
            )
            .with_child(Block::nested("depends_on"))
            .with_child(Block::nested("egress").with_attribute(Attribute::new("from_port", 0)));

        assert_eq!(
            Value::Object(marshal_block(&block).unwrap()),
            json!({ "egress": [{ "from_port": 0 }] })
        );
    }
}
