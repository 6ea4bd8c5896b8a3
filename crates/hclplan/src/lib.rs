//! # hclplan - terraform plans without terraform
//!
//! Builds the json document `terraform show -json <planfile>` would produce for a configuration
//! that is about to be created from scratch, using nothing but the configuration files.
//!
//! ## Introduction for developers
//!
//! ### Loading
//!
//! see [loader::ModuleLoader]
//!
//! A directory is parsed into a [config::Module] tree. Each module holds its [config::Block]s in
//! file order and its child modules. Expressions are evaluated as far as that is possible without
//! provider state (a handful of terraform [functions] included) and every attribute remembers the
//! [reference::Reference]s it contains. Counted resources are already expanded into one block per
//! instance at this point.
//!
//! ### Translation
//!
//! see [walker::Translation::build]
//!
//! The module tree is walked depth-first. For every resource block three records are produced
//! ([translate::translate_resource]):
//!
//! | **record**           | **address**                  | **content**                                |
//! |----------------------|------------------------------|--------------------------------------------|
//! | planned value        | `aws_instance.web[0]`        | marshalled values ([value])                |
//! | resource change      | `aws_instance.web[0]`        | `create` action, same values as `after`    |
//! | configuration        | `aws_instance.web`           | references ([expressions]), provider key   |
//!
//! Instances of a counted resource collapse into one configuration record.
//!
//! Provider blocks of a module are registered before its resources are translated
//! ([provider::ProviderRegistry]). The first provider seen becomes the default for all resources
//! without an explicit `provider` attribute.
//!
//! ### Output
//!
//! The assembled [plan::PlanDocument] is serialized via [serde].
//!
pub mod config;
pub mod expressions;
pub mod functions;
pub mod loader;
pub mod plan;
pub mod provider;
pub mod reference;
pub mod translate;
pub mod value;
pub mod vars;
mod visit;
pub mod walker;

use anyhow::Context;
use std::path::PathBuf;

/// Input of a plan synthesis
#[derive(Debug, Clone, Default)]
pub struct PlanOptions {
    /// Root module directory
    pub path: PathBuf,
    /// Raw terraform plan flags, only `-var` and `-var-file` are used
    pub plan_flags: String,
    /// `key=value` pairs applied after the ones from `plan_flags`
    pub vars: Vec<String>,
    /// Variable files applied after the ones from `plan_flags`
    pub var_files: Vec<String>,
}

/// Loads the configuration in `options.path` and builds its plan document
pub fn load_plan(options: &PlanOptions) -> anyhow::Result<plan::PlanDocument> {
    let mut vars = vars::vars_from_plan_flags(&options.plan_flags)
        .context("could not parse vars from plan flags")?;
    vars.extend(options.vars.iter().cloned(), options.var_files.iter().cloned());

    let root = loader::ModuleLoader::new(vars).load_directory(&options.path)?;
    let plan = walker::Translation::build(&root)?;

    tracing::debug!(
        resources = plan.resource_changes.len(),
        providers = plan.configuration.provider_config.len(),
        "plan built"
    );
    Ok(plan)
}

/// Same as [load_plan], serialized as pretty printed json
pub fn load_plan_json(options: &PlanOptions) -> anyhow::Result<Vec<u8>> {
    let plan = load_plan(options)?;
    serde_json::to_vec_pretty(&plan).context("error handling built plan json from hcl")
}
