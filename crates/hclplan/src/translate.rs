//! one resource block to its plan records
use crate::config::Block;
use crate::expressions::{block_expressions, count_expression};
use crate::plan::{Change, PlannedResource, ResourceChange, ResourceConfig, MODE_MANAGED};
use crate::provider::ProviderRegistry;
use crate::value::marshal_block;

/// The three views of a resource block
#[derive(Debug, derive_new::new)]
pub struct ResourceOutput {
    pub planned: PlannedResource,
    pub change: ResourceChange,
    pub configuration: ResourceConfig,
}

#[tracing::instrument(level = "trace", skip_all, fields(address = %block.full_address()))]
pub fn translate_resource(block: &Block, providers: &ProviderRegistry) -> ResourceOutput {
    let address = block.full_address();
    let values = marshal_block(block).unwrap_or_default();

    let planned = PlannedResource {
        address: address.clone(),
        mode: MODE_MANAGED.to_owned(),
        resource_type: block.type_label.clone(),
        name: block.name_label.clone(),
        index: block.index,
        schema_version: 0,
        values: values.clone(),
    };

    let change = ResourceChange {
        address,
        module_address: block.module_address.clone(),
        mode: MODE_MANAGED.to_owned(),
        resource_type: block.type_label.clone(),
        name: block.name_label.clone(),
        index: block.index,
        change: Change::create(values),
    };

    let (address, provider_config_key) = match block.module_name() {
        Some(module_name) => (
            block.local_address_without_index(),
            format!("{module_name}:{}", block.provider_name()),
        ),
        None => (block.full_address_without_index(), providers.resolve(block)),
    };

    let configuration = ResourceConfig {
        address,
        mode: MODE_MANAGED.to_owned(),
        resource_type: block.type_label.clone(),
        name: block.name_label.clone(),
        provider_config_key,
        expressions: block_expressions(block),
        schema_version: 0,
        count_expression: count_expression(block),
    };

    ResourceOutput::new(planned, change, configuration)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::{Attribute, Module};
    use crate::plan::CountExpression;
    use crate::reference::test::expr;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn root_resource() {
        let mut providers = ProviderRegistry::default();
        providers.register(&Block::provider("aws"));

        let block = Block::resource("aws_instance", "foo")
            .with_attribute(Attribute::from_expression(
                "ami",
                expr("var.ami_id"),
                "ami-123",
            ))
            .with_attribute(Attribute::new("instance_type", "t3.micro"));

        let output = translate_resource(&block, &providers);

        assert_eq!(
            serde_json::to_value(&output.planned).unwrap(),
            json!({
                "address": "aws_instance.foo",
                "mode": "managed",
                "type": "aws_instance",
                "name": "foo",
                "schema_version": 0,
                "values": { "ami": "ami-123", "instance_type": "t3.micro" }
            })
        );
        assert_eq!(
            serde_json::to_value(&output.change).unwrap(),
            json!({
                "address": "aws_instance.foo",
                "mode": "managed",
                "type": "aws_instance",
                "name": "foo",
                "change": {
                    "actions": ["create"],
                    "before": null,
                    "after": { "ami": "ami-123", "instance_type": "t3.micro" }
                }
            })
        );
        assert_eq!(
            serde_json::to_value(&output.configuration).unwrap(),
            json!({
                "address": "aws_instance.foo",
                "mode": "managed",
                "type": "aws_instance",
                "name": "foo",
                "provider_config_key": "aws",
                "expressions": { "ami": { "references": ["var.ami_id"] } },
                "schema_version": 0
            })
        );
    }

    #[test]
    fn index_zero_is_explicit() {
        let block = Block::resource("aws_instance", "web")
            .with_attribute(Attribute::new("count", 2))
            .with_index(0);

        let output = translate_resource(&block, &ProviderRegistry::default());

        assert_eq!(output.planned.address, "aws_instance.web[0]");
        assert_eq!(output.planned.index, Some(0));
        assert_eq!(output.change.address, "aws_instance.web[0]");
        assert_eq!(output.change.index, Some(0));
        assert_eq!(output.configuration.address, "aws_instance.web");
        assert_eq!(
            output.configuration.count_expression,
            Some(CountExpression::Constant { constant_value: 2 })
        );
        assert!(!output.planned.values.contains_key("count"));
    }

    #[test]
    fn module_resource() {
        let mut providers = ProviderRegistry::default();
        providers.register(&Block::provider("google"));

        let module = Module::child("module.network", "./network").with_block(
            Block::resource("aws_vpc", "main")
                .with_attribute(Attribute::new("count", 1))
                .with_attribute(Attribute::from_expression(
                    "provider",
                    expr("aws.west"),
                    hcl::Value::Null,
                ))
                .with_index(0),
        );

        let output = translate_resource(&module.blocks[0], &providers);

        assert_eq!(output.planned.address, "module.network.aws_vpc.main[0]");
        assert_eq!(output.change.module_address.as_deref(), Some("module.network"));
        assert_eq!(output.configuration.address, "aws_vpc.main");
        assert_eq!(output.configuration.provider_config_key, "network:aws");
    }
}
