//! module tree to plan document
//!
//! [Translation] walks a [Module] tree depth-first, pre-order. Per module, provider blocks are
//! registered before any resource is translated so resources always see their own module's
//! providers. The resulting change list is flat and follows block encounter order.
use crate::config::{call_key, BlockKind, Module};
use crate::plan::{
    Configuration, ModuleCall, ModuleConfig, PlanDocument, PlanModule, ResourceChange,
};
use crate::provider::ProviderRegistry;
use crate::translate::translate_resource;
use std::collections::HashSet;

/// Module trees nested deeper than this are rejected
pub const MAX_MODULE_DEPTH: usize = 64;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum TranslateError {
    #[error(
        "module nesting deeper than {max} levels at {module}, possible module cycle",
        max = MAX_MODULE_DEPTH
    )]
    ModuleDepthExceeded { module: String },
}

/// State of one translation
///
/// Not shared between translations: the provider default and the change list belong to exactly
/// one module tree.
#[derive(Debug, Default)]
pub struct Translation {
    providers: ProviderRegistry,
    resource_changes: Vec<ResourceChange>,
}

#[derive(Debug, derive_new::new)]
struct ModuleOutput {
    planned: PlanModule,
    configuration: ModuleConfig,
}

impl Translation {
    /// Builds the plan document for `root`
    pub fn build(root: &Module) -> Result<PlanDocument, TranslateError> {
        let mut translation = Self::default();
        let output = translation.walk(root, 0)?;

        let configuration = Configuration {
            provider_config: translation.providers.into_configs(),
            root_module: output.configuration,
        };

        Ok(PlanDocument::new(
            output.planned,
            translation.resource_changes,
            configuration,
        ))
    }

    #[tracing::instrument(level = "debug", skip_all, fields(module = %module.name))]
    fn walk(&mut self, module: &Module, depth: usize) -> Result<ModuleOutput, TranslateError> {
        if depth > MAX_MODULE_DEPTH {
            return Err(TranslateError::ModuleDepthExceeded {
                module: module.name.clone(),
            });
        }

        let mut planned = PlanModule {
            address: (!module.is_root()).then(|| module.name.clone()),
            ..Default::default()
        };
        let mut configuration = ModuleConfig::default();

        for block in module.blocks_of_kind(&BlockKind::Provider) {
            self.providers.register(block);
        }

        let mut configured = HashSet::new();
        for block in module.blocks_of_kind(&BlockKind::Resource) {
            let output = translate_resource(block, &self.providers);

            // instances of a counted resource share one configuration entry
            if configured.insert(output.configuration.address.clone()) {
                configuration.resources.push(output.configuration);
            } else {
                tracing::trace!(address = %output.planned.address, "configuration already recorded");
            }

            planned.resources.push(output.planned);
            self.resource_changes.push(output.change);
        }

        for child in &module.modules {
            let output = self.walk(child, depth + 1)?;

            configuration.module_calls.insert(
                call_key(&child.name).to_owned(),
                ModuleCall {
                    source: child.source.clone(),
                    module: output.configuration,
                },
            );
            planned.child_modules.push(output.planned);
        }

        Ok(ModuleOutput::new(planned, configuration))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::{Attribute, Block};
    use crate::reference::test::expr;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn addresses(changes: &[ResourceChange]) -> Vec<&str> {
        changes.iter().map(|change| change.address.as_str()).collect()
    }

    #[test]
    fn single_resource() {
        let root = Module::root().with_block(Block::resource("aws_instance", "foo").with_attribute(
            Attribute::from_expression("ami", expr("var.ami_id"), hcl::Value::Null),
        ));

        let plan = serde_json::to_value(Translation::build(&root).unwrap()).unwrap();

        assert_eq!(plan["resource_changes"][0]["address"], "aws_instance.foo");
        assert_eq!(plan["resource_changes"][0]["change"]["actions"], json!(["create"]));
        assert_eq!(
            plan["configuration"]["root_module"]["resources"][0]["expressions"],
            json!({ "ami": { "references": ["var.ami_id"] } })
        );
    }

    #[test]
    fn module_call() {
        let root = Module::root().with_module(
            Module::child("module.network", "./network")
                .with_block(Block::resource("aws_vpc", "main")),
        );

        let plan = serde_json::to_value(Translation::build(&root).unwrap()).unwrap();

        assert_eq!(
            plan["configuration"]["root_module"]["module_calls"]["network"],
            json!({
                "source": "./network",
                "module": {
                    "resources": [{
                        "address": "aws_vpc.main",
                        "mode": "managed",
                        "type": "aws_vpc",
                        "name": "main",
                        "provider_config_key": "network:aws",
                        "schema_version": 0
                    }]
                }
            })
        );
        assert_eq!(
            plan["planned_values"]["root_module"]["child_modules"][0]["address"],
            "module.network"
        );
        assert_eq!(plan["resource_changes"][0]["module_address"], "module.network");
    }

    #[test]
    fn counted_instances_share_configuration() {
        let instance = |index: i64| {
            Block::resource("aws_instance", "web")
                .with_attribute(Attribute::new("count", 3))
                .with_attribute(Attribute::from_expression(
                    "ami",
                    expr(&format!("var.ami_{index}")),
                    hcl::Value::Null,
                ))
                .with_index(index)
        };
        let root = Module::root()
            .with_block(instance(0))
            .with_block(instance(1))
            .with_block(instance(2));

        let plan = Translation::build(&root).unwrap();

        assert_eq!(
            addresses(&plan.resource_changes),
            vec!["aws_instance.web[0]", "aws_instance.web[1]", "aws_instance.web[2]"]
        );
        assert_eq!(plan.planned_values.root_module.resources.len(), 3);

        let configured = &plan.configuration.root_module.resources;
        assert_eq!(configured.len(), 1);
        assert_eq!(configured[0].address, "aws_instance.web");
        // the first instance seen is the one recorded
        assert_eq!(
            serde_json::to_value(&configured[0].expressions).unwrap(),
            json!({ "ami": { "references": ["var.ami_0"] } })
        );
    }

    #[test]
    fn pre_order_change_list() {
        let root = Module::root()
            .with_block(Block::resource("a", "one"))
            .with_module(
                Module::child("module.x", "./x")
                    .with_block(Block::resource("b", "two"))
                    .with_module(
                        Module::child("module.x.module.y", "./y")
                            .with_block(Block::resource("c", "three")),
                    ),
            )
            .with_block(Block::resource("a", "four"))
            .with_module(Module::child("module.z", "./z").with_block(Block::resource("d", "five")));

        let plan = Translation::build(&root).unwrap();

        assert_eq!(
            addresses(&plan.resource_changes),
            vec![
                "a.one",
                "a.four",
                "module.x.b.two",
                "module.x.module.y.c.three",
                "module.z.d.five"
            ]
        );

        let calls = &plan.configuration.root_module.module_calls;
        assert_eq!(calls.keys().collect::<Vec<_>>(), vec!["x", "z"]);
        assert!(calls["x"].module.module_calls.contains_key("y"));
    }

    #[test]
    fn providers_registered_before_resources() {
        let root = Module::root()
            .with_block(Block::resource("aws_instance", "web"))
            .with_block(
                Block::provider("aws")
                    .with_attribute(Attribute::new("alias", "east"))
                    .with_attribute(Attribute::new("region", "us-east-1")),
            );

        let plan = Translation::build(&root).unwrap();

        assert_eq!(
            plan.configuration.root_module.resources[0].provider_config_key,
            "aws.east"
        );
        assert!(plan.configuration.provider_config.contains_key("aws.east"));
    }

    #[test]
    fn default_provider_is_process_wide() {
        let root = Module::root()
            .with_block(Block::provider("google"))
            .with_block(Block::provider("aws"))
            .with_block(Block::resource("aws_instance", "web"));

        let plan = Translation::build(&root).unwrap();

        assert_eq!(
            plan.configuration.root_module.resources[0].provider_config_key,
            "google"
        );
    }

    #[test]
    fn meta_blocks_never_planned() {
        let root = Module::root()
            .with_block(Block::new(BlockKind::Dynamic, "ingress", ""))
            .with_block(Block::new("data", "aws_ami", "ubuntu"))
            .with_block(
                Block::resource("aws_security_group", "sg")
                    .with_child(Block::new(BlockKind::Dynamic, "ingress", ""))
                    .with_child(Block::nested("depends_on")),
            );

        let plan = serde_json::to_value(Translation::build(&root).unwrap()).unwrap();

        assert_eq!(plan["resource_changes"].as_array().unwrap().len(), 1);
        assert_eq!(plan["planned_values"]["root_module"]["resources"][0]["values"], json!({}));
        assert_eq!(
            plan["configuration"]["root_module"]["resources"][0].get("expressions"),
            None
        );
    }

    #[test]
    fn depth_guard() {
        let mut module = Module::child("module.leaf", "./leaf");
        for _ in 0..=MAX_MODULE_DEPTH {
            module = Module::child("module.nested", "./nested").with_module(module);
        }
        let root = Module::root().with_module(module);

        assert!(matches!(
            Translation::build(&root),
            Err(TranslateError::ModuleDepthExceeded { .. })
        ));
    }
}
