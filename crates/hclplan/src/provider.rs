//! declared provider configurations
use crate::config::Block;
use crate::plan::{ConstantValue, ProviderConfig};
use indexmap::IndexMap;

/// Provider configurations seen during one translation
///
/// The first provider registered becomes the default for every resource without an explicit
/// `provider` attribute, regardless of the resource's provider type.
#[derive(Debug, Default)]
pub struct ProviderRegistry {
    configs: IndexMap<String, ProviderConfig>,
    default_key: Option<String>,
}

impl ProviderRegistry {
    /// Records a `provider` block and returns its key (`aws` or `aws.west`)
    pub fn register(&mut self, block: &Block) -> String {
        let mut key = block.type_label.clone();
        if let Some(alias) = block.get_attribute("alias").and_then(|alias| alias.as_str()) {
            key = format!("{key}.{alias}");
        }

        let region = block
            .get_attribute("region")
            .and_then(|region| region.as_str())
            .unwrap_or_default();

        tracing::debug!(%key, %region, "provider registered");
        self.configs.insert(
            key.clone(),
            ProviderConfig {
                name: key.clone(),
                expressions: IndexMap::from([(
                    "region".to_owned(),
                    ConstantValue {
                        constant_value: region.into(),
                    },
                )]),
            },
        );

        if self.default_key.is_none() {
            self.default_key = Some(key.clone());
        }

        key
    }

    /// Provider key used by a resource block
    ///
    /// An explicit reference (`provider = aws.west`) wins over a literal string, both win over the
    /// default key. Empty if no provider was registered yet.
    pub fn resolve(&self, block: &Block) -> String {
        block
            .explicit_provider_label()
            .or_else(|| self.default_key.clone())
            .unwrap_or_default()
    }

    pub fn default_key(&self) -> Option<&str> {
        self.default_key.as_deref()
    }

    pub fn into_configs(self) -> IndexMap<String, ProviderConfig> {
        self.configs
    }
}
