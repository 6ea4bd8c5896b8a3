//! parsed configuration tree ([Module]s of [Block]s)
//!
//! This is the shape the planner consumes. It is produced by [crate::loader] or built by hand.
use crate::reference::{collect_references, Reference, ReferenceKind};

/// Attribute that holds the repetition count of a block
pub const COUNT_ATTRIBUTE: &str = "count";

/// Integer value of a `count` attribute
///
/// Numbers are truncated, numeric strings (`"2"`, from tfvars or `-var`) are parsed first.
/// `None` for anything else.
pub fn count_value(value: &hcl::Value) -> Option<i64> {
    let number = match value {
        hcl::Value::Number(num) => num.as_f64(),
        hcl::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;

    Some(number.trunc() as i64)
}

/// Kind of a block, taken from its identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockKind {
    Resource,
    Module,
    Provider,
    /// `dynamic` expansion block
    Dynamic,
    /// dependency-only block
    DependsOn,
    /// Any other block, including nested blocks such as `ebs_block_device`
    Other(String),
}

impl BlockKind {
    pub fn as_str(&self) -> &str {
        match self {
            BlockKind::Resource => "resource",
            BlockKind::Module => "module",
            BlockKind::Provider => "provider",
            BlockKind::Dynamic => "dynamic",
            BlockKind::DependsOn => "depends_on",
            BlockKind::Other(other) => other,
        }
    }

    /// Meta blocks carry no plannable state
    pub fn is_meta(&self) -> bool {
        matches!(self, BlockKind::Dynamic | BlockKind::DependsOn)
    }
}

impl From<&str> for BlockKind {
    fn from(value: &str) -> Self {
        match value {
            "resource" => BlockKind::Resource,
            "module" => BlockKind::Module,
            "provider" => BlockKind::Provider,
            "dynamic" => BlockKind::Dynamic,
            "depends_on" => BlockKind::DependsOn,
            other => BlockKind::Other(other.to_owned()),
        }
    }
}

impl std::fmt::Display for BlockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `name = expression` pair of a block
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    /// Evaluated value, `null` if it could not be resolved statically
    pub value: hcl::Value,
    pub references: Vec<Reference>,
    expr: Option<hcl::Expression>,
}

impl Attribute {
    /// Attribute with a literal value and no references
    pub fn new(name: impl Into<String>, value: impl Into<hcl::Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            references: vec![],
            expr: None,
        }
    }

    /// Attribute backed by an expression, references are extracted from `expr`
    pub fn from_expression(
        name: impl Into<String>,
        expr: hcl::Expression,
        value: impl Into<hcl::Value>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            references: collect_references(&expr),
            expr: Some(expr),
        }
    }

    /// The referenced address if the expression is nothing but a reference (`provider = aws.west`)
    pub fn reference(&self) -> Option<Reference> {
        match self.expr.as_ref()? {
            hcl::Expression::Variable(var) => {
                Some(Reference::new(ReferenceKind::Resource, var.as_str()))
            }
            hcl::Expression::Traversal(traversal) => Reference::from_traversal(traversal),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            hcl::Value::String(s) => Some(s),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub kind: BlockKind,
    pub type_label: String,
    pub name_label: String,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Block>,
    /// Repetition index of an instance of a counted block
    pub index: Option<i64>,
    /// Address of the containing module (`module.a.module.b`), `None` in the root module
    pub module_address: Option<String>,
}

impl Block {
    pub fn new(
        kind: impl Into<BlockKind>,
        type_label: impl Into<String>,
        name_label: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            type_label: type_label.into(),
            name_label: name_label.into(),
            attributes: vec![],
            children: vec![],
            index: None,
            module_address: None,
        }
    }

    pub fn resource(type_label: impl Into<String>, name_label: impl Into<String>) -> Self {
        Self::new(BlockKind::Resource, type_label, name_label)
    }

    pub fn provider(type_label: impl Into<String>) -> Self {
        Self::new(BlockKind::Provider, type_label, "")
    }

    /// Unlabeled nested block such as `root_block_device {}`
    pub fn nested(kind: &str) -> Self {
        Self::new(kind, "", "")
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn with_child(mut self, child: Block) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_index(mut self, index: i64) -> Self {
        self.index = Some(index);
        self
    }

    pub fn get_attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|attr| attr.name == name)
    }

    /// `aws_instance.web`, `aws_instance.web[1]`
    pub fn local_address(&self) -> String {
        match self.index {
            Some(index) => format!("{}[{index}]", self.local_address_without_index()),
            None => self.local_address_without_index(),
        }
    }

    pub fn local_address_without_index(&self) -> String {
        format!("{}.{}", self.type_label, self.name_label)
    }

    /// Address including the module prefix and repetition index
    pub fn full_address(&self) -> String {
        self.with_module_prefix(self.local_address())
    }

    /// Full address with the repetition index stripped
    pub fn full_address_without_index(&self) -> String {
        self.with_module_prefix(self.local_address_without_index())
    }

    fn with_module_prefix(&self, address: String) -> String {
        match &self.module_address {
            Some(module) => format!("{module}.{address}"),
            None => address,
        }
    }

    pub fn is_inside_non_root_module(&self) -> bool {
        self.module_address.is_some()
    }

    /// Call name of the containing module: `b` for `module.a.module.b`
    pub fn module_name(&self) -> Option<&str> {
        self.module_address.as_deref().map(call_key)
    }

    /// Provider label as written in the `provider` attribute
    pub fn explicit_provider_label(&self) -> Option<String> {
        let attr = self.get_attribute("provider")?;
        attr.reference()
            .map(|reference| reference.to_string())
            .or_else(|| attr.as_str().map(ToOwned::to_owned))
    }

    /// Provider name without alias: `aws` for `aws.west` or for an `aws_instance`
    pub fn provider_name(&self) -> String {
        match self.explicit_provider_label() {
            Some(label) => label.split('.').next().unwrap_or_default().to_owned(),
            None => self
                .type_label
                .split('_')
                .next()
                .unwrap_or_default()
                .to_owned(),
        }
    }

    /// Attribute values as one object
    pub fn values(&self) -> hcl::Value {
        hcl::Value::Object(
            self.attributes
                .iter()
                .map(|attr| (attr.name.clone(), attr.value.clone()))
                .collect(),
        )
    }
}

/// Last dot-separated segment of a module name
pub fn call_key(module_name: &str) -> &str {
    module_name.rsplit('.').next().unwrap_or(module_name)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Module {
    /// `module.a.module.b`, empty for the root module
    pub name: String,
    pub source: String,
    pub blocks: Vec<Block>,
    pub modules: Vec<Module>,
}

impl Module {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn child(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            ..Default::default()
        }
    }

    pub fn is_root(&self) -> bool {
        self.name.is_empty()
    }

    /// Adds a block and binds it to this module's address
    pub fn push_block(&mut self, mut block: Block) {
        block.module_address = (!self.is_root()).then(|| self.name.clone());
        self.blocks.push(block);
    }

    pub fn with_block(mut self, block: Block) -> Self {
        self.push_block(block);
        self
    }

    pub fn with_module(mut self, module: Module) -> Self {
        self.modules.push(module);
        self
    }

    pub fn blocks_of_kind<'a>(&'a self, kind: &'a BlockKind) -> impl Iterator<Item = &'a Block> {
        self.blocks.iter().filter(move |block| &block.kind == kind)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::reference::test::expr;
    use pretty_assertions::assert_eq;

    #[test]
    fn addresses() {
        let module = Module::child("module.a.module.b", "./b")
            .with_block(Block::resource("aws_instance", "web").with_index(2));
        let block = &module.blocks[0];

        assert_eq!(block.full_address(), "module.a.module.b.aws_instance.web[2]");
        assert_eq!(block.full_address_without_index(), "module.a.module.b.aws_instance.web");
        assert_eq!(block.local_address(), "aws_instance.web[2]");
        assert_eq!(block.module_name(), Some("b"));
        assert!(block.is_inside_non_root_module());
    }

    #[test]
    fn root_blocks_have_no_module() {
        let module = Module::root().with_block(Block::resource("aws_instance", "web"));
        assert_eq!(module.blocks[0].module_address, None);
        assert_eq!(module.blocks[0].full_address(), "aws_instance.web");
    }

    #[test]
    fn block_kinds() {
        assert_eq!(BlockKind::from("resource"), BlockKind::Resource);
        assert_eq!(BlockKind::from("dynamic"), BlockKind::Dynamic);
        assert_eq!(
            BlockKind::from("ebs_block_device"),
            BlockKind::Other("ebs_block_device".into())
        );
        assert!(BlockKind::DependsOn.is_meta());
        assert!(!BlockKind::Other("ingress".into()).is_meta());
    }

    #[test]
    fn count_values() {
        assert_eq!(count_value(&hcl::Value::from(3)), Some(3));
        assert_eq!(count_value(&hcl::Value::from("2")), Some(2));
        assert_eq!(count_value(&hcl::Value::from(" 4 ")), Some(4));
        assert_eq!(count_value(&hcl::Value::from("two")), None);
        assert_eq!(count_value(&hcl::Value::Null), None);
    }

    #[test]
    fn provider_labels() {
        let referenced = Block::resource("aws_instance", "web").with_attribute(
            Attribute::from_expression("provider", expr("aws.west"), hcl::Value::Null),
        );
        assert_eq!(referenced.explicit_provider_label().as_deref(), Some("aws.west"));
        assert_eq!(referenced.provider_name(), "aws");

        let literal = Block::resource("aws_instance", "web")
            .with_attribute(Attribute::new("provider", "google.eu"));
        assert_eq!(literal.explicit_provider_label().as_deref(), Some("google.eu"));

        let implicit = Block::resource("azurerm_virtual_machine", "vm");
        assert_eq!(implicit.explicit_provider_label(), None);
        assert_eq!(implicit.provider_name(), "azurerm");
    }
}
