//! serialized shape of a terraform plan document
//!
//! Only the subset of `terraform show -json` that downstream consumers read is modelled. Fields
//! that are empty are left out of the output entirely rather than rendered as `null`.
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

pub const FORMAT_VERSION: &str = "1.0";
pub const TERRAFORM_VERSION: &str = "1.1.0";
pub const MODE_MANAGED: &str = "managed";

pub type Values = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanDocument {
    pub format_version: String,
    pub terraform_version: String,
    pub planned_values: PlannedValues,
    pub resource_changes: Vec<ResourceChange>,
    pub configuration: Configuration,
}

impl PlanDocument {
    pub fn new(
        root_module: PlanModule,
        resource_changes: Vec<ResourceChange>,
        configuration: Configuration,
    ) -> Self {
        Self {
            format_version: FORMAT_VERSION.to_owned(),
            terraform_version: TERRAFORM_VERSION.to_owned(),
            planned_values: PlannedValues { root_module },
            resource_changes,
            configuration,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedValues {
    pub root_module: PlanModule,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlanModule {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<PlannedResource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub child_modules: Vec<PlanModule>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedResource {
    pub address: String,
    pub mode: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<i64>,
    pub schema_version: u32,
    pub values: Values,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceChange {
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module_address: Option<String>,
    pub mode: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<i64>,
    pub change: Change,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Change {
    pub actions: Vec<Action>,
    /// Always `null`, there is no prior state
    pub before: Option<Values>,
    pub after: Values,
}

impl Change {
    pub fn create(after: Values) -> Self {
        Self {
            actions: vec![Action::Create],
            before: None,
            after,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Configuration {
    pub provider_config: IndexMap<String, ProviderConfig>,
    pub root_module: ModuleConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderConfig {
    pub name: String,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub expressions: IndexMap<String, ConstantValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstantValue {
    pub constant_value: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModuleConfig {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<ResourceConfig>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub module_calls: IndexMap<String, ModuleCall>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleCall {
    pub source: String,
    pub module: ModuleConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceConfig {
    pub address: String,
    pub mode: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
    pub provider_config_key: String,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub expressions: Expressions,
    pub schema_version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count_expression: Option<CountExpression>,
}

/// References per attribute, nested blocks grouped by kind
pub type Expressions = IndexMap<String, Expression>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Expression {
    References { references: Vec<String> },
    Blocks(Vec<Expressions>),
}

/// Either a constant or a set of references, never both
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CountExpression {
    References { references: Vec<String> },
    Constant { constant_value: i64 },
}
