//! terraform directories to a [Module] tree
//!
//! A small static loader: every `*.tf` file of a directory is parsed, attribute expressions are
//! evaluated against `var`, `local`, `count.index` and [crate::functions] where possible and left
//! `null` otherwise. Counted resources are expanded into one block per instance. Modules with a
//! local source are loaded recursively.
use crate::config::{count_value, Attribute, Block, BlockKind, Module, COUNT_ATTRIBUTE};
use crate::functions::declare_functions;
use crate::vars::PlanVars;
use hcl::eval::{Context, Evaluate};
use hcl::Identifier;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

type Variables = hcl::Map<String, hcl::Value>;

/// Upper bound on the instances of one counted resource
pub const MAX_COUNT: i64 = 10_000;

/// Module block attributes that are not input variables
const MODULE_META_ARGUMENTS: &[&str] =
    &["source", "version", "count", "for_each", "providers", "depends_on"];

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("No files found in directory {}", .0.display())]
    NoFilesFound(PathBuf),
    #[error("IO error")]
    IoError(#[from] std::io::Error),
    #[error("Unable to parse hcl file {}", .path.display())]
    HclParseFailed {
        path: PathBuf,
        #[source]
        source: hcl_edit::parser::Error,
    },
    #[error("Invalid input variable {0:?}, expected key=value")]
    InvalidVariable(String),
    #[error("Module cycle detected at {}", .0.display())]
    ModuleCycle(PathBuf),
    #[error("count of {address} is {count}, at most {max} instances are supported", max = MAX_COUNT)]
    CountLimitExceeded { address: String, count: i64 },
}

#[derive(Debug, Default, derive_new::new)]
pub struct ModuleLoader {
    vars: PlanVars,
}

impl ModuleLoader {
    /// Loads the root module in `path` and all local child modules
    pub fn load_directory(&self, path: &Path) -> Result<Module, LoadError> {
        let root = path.canonicalize()?;
        if tf_files(&root)?.is_empty() {
            return Err(LoadError::NoFilesFound(root));
        }

        let inputs = self.root_inputs(&root)?;
        let mut stack = vec![];
        load_module(&root, Module::root(), inputs, &mut stack)
    }

    /// Variables from `-var-file`s followed by `-var`s, later entries win
    fn root_inputs(&self, root: &Path) -> Result<Inputs, LoadError> {
        let mut inputs = Inputs::default();
        let context = Context::new();

        for file in &self.vars.files {
            let body = read_body(&root.join(file))?;
            for attribute in body.attributes() {
                inputs
                    .values
                    .insert(attribute.key.to_string(), evaluate(&attribute.expr, &context));
            }
        }

        for var in &self.vars.vars {
            let Some((key, value)) = var.split_once('=') else {
                return Err(LoadError::InvalidVariable(var.clone()));
            };
            inputs.raw.push((key.trim().to_owned(), value.to_owned()));
        }

        Ok(inputs)
    }
}

/// Input variables passed into one module
#[derive(Debug, Default)]
struct Inputs {
    values: Variables,
    /// `-var` values, interpreted once the declared variable types are known
    raw: Vec<(String, String)>,
}

impl From<Variables> for Inputs {
    fn from(values: Variables) -> Self {
        Self {
            values,
            raw: vec![],
        }
    }
}

/// Type constraint of a `variable` block, as far as `-var` parsing cares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VariableType {
    String,
    /// `number` or `bool`
    Primitive,
    /// collections, objects and `any`
    Complex,
}

impl VariableType {
    fn from_expression(expr: &hcl::Expression) -> Self {
        match expr {
            hcl::Expression::Variable(name) => match name.as_str() {
                "string" => VariableType::String,
                "number" | "bool" => VariableType::Primitive,
                _ => VariableType::Complex,
            },
            _ => VariableType::Complex,
        }
    }
}

#[tracing::instrument(level = "debug", skip(module, inputs, stack), fields(module = %module.name))]
fn load_module(
    dir: &Path,
    mut module: Module,
    inputs: Inputs,
    stack: &mut Vec<PathBuf>,
) -> Result<Module, LoadError> {
    stack.push(dir.to_owned());

    let mut blocks = vec![];
    for file_path in tf_files(dir)? {
        tracing::info!(path=%file_path.display(), "loading file");
        blocks.extend(read_body(&file_path)?.into_blocks());
    }

    let scope = Scope::new(&blocks, inputs);

    for block in &blocks {
        match BlockKind::from(block.identifier.as_str()) {
            BlockKind::Resource => {
                for index in scope.instances(block)? {
                    let context = scope.context(index);
                    module.push_block(convert_block(block, &context, index));
                }
            }
            BlockKind::Module => {
                let converted = convert_block(block, &scope.context(None), None);
                let child = load_child(dir, &module, &converted, stack)?;
                module.push_block(converted);
                module.modules.push(child);
            }
            _ => module.push_block(convert_block(block, &scope.context(None), None)),
        }
    }

    stack.pop();
    Ok(module)
}

fn load_child(
    dir: &Path,
    parent: &Module,
    call: &Block,
    stack: &mut Vec<PathBuf>,
) -> Result<Module, LoadError> {
    let name = if parent.is_root() {
        format!("module.{}", call.type_label)
    } else {
        format!("{}.module.{}", parent.name, call.type_label)
    };
    let source = call
        .get_attribute("source")
        .and_then(Attribute::as_str)
        .unwrap_or_default()
        .to_owned();
    let module = Module::child(name, source.clone());

    if !(source.starts_with("./") || source.starts_with("../")) {
        tracing::warn!(module = %module.name, %source, "skipping non-local module source");
        return Ok(module);
    }

    let child_dir = match dir.join(&source).canonicalize() {
        Ok(child_dir) => child_dir,
        Err(err) => {
            tracing::warn!(module = %module.name, %source, %err, "module source not found");
            return Ok(module);
        }
    };

    if stack.contains(&child_dir) {
        return Err(LoadError::ModuleCycle(child_dir));
    }

    let inputs: Variables = call
        .attributes
        .iter()
        .filter(|attribute| !MODULE_META_ARGUMENTS.contains(&attribute.name.as_str()))
        .map(|attribute| (attribute.name.clone(), attribute.value.clone()))
        .collect();

    load_module(&child_dir, module, inputs.into(), stack)
}

/// Values visible to expressions of one module
struct Scope {
    vars: Variables,
    locals: Variables,
}

impl Scope {
    fn new(blocks: &[hcl::Block], inputs: Inputs) -> Self {
        let empty = Context::new();
        let mut vars = Variables::new();
        let mut types = HashMap::new();

        for block in blocks.iter().filter(|b| b.identifier.as_str() == "variable") {
            let Some(name) = block.labels.first() else {
                continue;
            };

            let mut default = hcl::Value::Null;
            for attribute in block.body.attributes() {
                match attribute.key.as_str() {
                    "default" => default = evaluate(&attribute.expr, &empty),
                    "type" => {
                        types.insert(
                            name.as_str().to_owned(),
                            VariableType::from_expression(&attribute.expr),
                        );
                    }
                    _ => {}
                }
            }
            vars.insert(name.as_str().to_owned(), default);
        }

        vars.extend(inputs.values);
        for (key, raw) in inputs.raw {
            let value = parse_var_value(&raw, types.get(&key).copied());
            vars.insert(key, value);
        }

        let mut scope = Self {
            vars,
            locals: Variables::new(),
        };
        scope.resolve_locals(blocks);
        scope
    }

    /// Locals may depend on each other, keep going until nothing new resolves
    fn resolve_locals(&mut self, blocks: &[hcl::Block]) {
        let mut pending: Vec<&hcl::Attribute> = blocks
            .iter()
            .filter(|b| b.identifier.as_str() == "locals")
            .flat_map(|b| b.body.attributes())
            .collect();

        loop {
            let context = self.context(None);
            let before = pending.len();

            pending.retain(|attribute| match attribute.expr.evaluate(&context) {
                Ok(value) => {
                    self.locals.insert(attribute.key.to_string(), value);
                    false
                }
                Err(_) => true,
            });

            if pending.is_empty() || pending.len() == before {
                break;
            }
        }

        for attribute in pending {
            tracing::debug!(local = %attribute.key, "unresolved local");
        }
    }

    fn context(&self, count_index: Option<i64>) -> Context<'static> {
        let mut context = Context::new();
        declare_functions(&mut context);
        context.declare_var(Identifier::unchecked("var"), hcl::Value::Object(self.vars.clone()));
        context.declare_var(
            Identifier::unchecked("local"),
            hcl::Value::Object(self.locals.clone()),
        );

        if let Some(index) = count_index {
            let count = Variables::from([("index".to_owned(), hcl::Value::from(index))]);
            context.declare_var(Identifier::unchecked("count"), hcl::Value::Object(count));
        }

        context
    }

    /// Instance indices of a resource block
    ///
    /// `[None]` without count, one index per instance for a known count and a single instance
    /// for a count that cannot be resolved statically.
    fn instances(&self, block: &hcl::Block) -> Result<Vec<Option<i64>>, LoadError> {
        let Some(count) = block
            .body
            .attributes()
            .find(|attribute| attribute.key.as_str() == COUNT_ATTRIBUTE)
        else {
            return Ok(vec![None]);
        };

        match count_value(&evaluate(&count.expr, &self.context(None))) {
            Some(count) if count > MAX_COUNT => Err(LoadError::CountLimitExceeded {
                address: block_address(block),
                count,
            }),
            Some(count) => Ok((0..count.max(0)).map(Some).collect()),
            None => Ok(vec![Some(0)]),
        }
    }
}

/// `aws_instance.web` from the block labels
fn block_address(block: &hcl::Block) -> String {
    block
        .labels
        .iter()
        .map(|label| label.as_str())
        .collect::<Vec<_>>()
        .join(".")
}

fn convert_block(block: &hcl::Block, context: &Context, index: Option<i64>) -> Block {
    let mut labels = block.labels.iter().map(|label| label.as_str().to_owned());
    let type_label = labels.next().unwrap_or_default();
    let name_label = labels.next().unwrap_or_default();

    let mut converted = Block::new(block.identifier.as_str(), type_label, name_label);
    converted.index = index;

    for attribute in block.body.attributes() {
        let converted_attribute = Attribute::from_expression(
            attribute.key.as_str(),
            attribute.expr.clone(),
            evaluate(&attribute.expr, context),
        );

        // dependencies are kept as a meta block, they are not part of the planned values
        if attribute.key.as_str() == BlockKind::DependsOn.as_str() {
            converted.children.push(
                Block::new(BlockKind::DependsOn, "", "").with_attribute(converted_attribute),
            );
            continue;
        }

        converted.attributes.push(converted_attribute);
    }

    for child in block.body.blocks() {
        converted.children.push(convert_block(child, context, None));
    }

    converted
}

/// Evaluates `expr`, unresolvable expressions become `null`
fn evaluate(expr: &hcl::Expression, context: &Context) -> hcl::Value {
    match expr.evaluate(context) {
        Ok(value) => value,
        Err(errors) => {
            tracing::trace!(%errors, "expression not statically known");
            hcl::Value::Null
        }
    }
}

/// Interprets a `-var` value
///
/// Values of `string` variables are taken verbatim, just like values of variables without a
/// type unless they look like a list or object. Everything else is parsed as an hcl expression,
/// falling back to the raw string.
fn parse_var_value(raw: &str, declared: Option<VariableType>) -> hcl::Value {
    let verbatim = match declared {
        Some(VariableType::String) => true,
        Some(VariableType::Primitive | VariableType::Complex) => false,
        None => !raw.trim_start().starts_with(|c| c == '[' || c == '{'),
    };
    if verbatim {
        return hcl::Value::String(raw.to_owned());
    }

    raw.parse::<hcl_edit::expr::Expression>()
        .ok()
        .and_then(|expr| hcl::Expression::from(expr).evaluate(&Context::new()).ok())
        .unwrap_or_else(|| hcl::Value::String(raw.to_owned()))
}

fn read_body(path: &Path) -> Result<hcl::Body, LoadError> {
    let contents = std::fs::read_to_string(path)?;
    let body = hcl_edit::parser::parse_body(&contents).map_err(|source| {
        LoadError::HclParseFailed {
            path: path.to_owned(),
            source,
        }
    })?;

    Ok(body.into())
}

/// `*.tf` files of a directory in a stable order
fn tf_files(dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
    let mut files = vec![];

    for dir_entry in std::fs::read_dir(dir)? {
        let dir_entry = dir_entry?;
        if !dir_entry.file_type()?.is_file() {
            continue;
        }

        let path = dir_entry.path();
        if path.extension().is_some_and(|ext| ext == "tf") {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}
