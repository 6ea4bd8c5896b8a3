//! symbolic references between configuration addresses
//!
//! A [Reference] points from an attribute expression to some other address (`var.region`,
//! `aws_vpc.main.id`, `data.aws_ami.ubuntu.id`, ...). References are only ever collected
//! and rendered, never dereferenced.
use crate::visit::{Visit, VisitTraversals};
use hcl::{Expression, Traversal, TraversalOperator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Variable,
    Local,
    Data,
    Module,
    Resource,
}

impl ReferenceKind {
    /// Kind-qualified label as used by the parsed representation
    pub fn label(&self) -> Option<&'static str> {
        match self {
            ReferenceKind::Variable => Some("variable"),
            ReferenceKind::Local => Some("local"),
            ReferenceKind::Data => Some("data"),
            ReferenceKind::Module => Some("module"),
            ReferenceKind::Resource => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub kind: ReferenceKind,
    /// Address relative to the kind, e.g. `ami_id` for `var.ami_id`
    pub path: String,
}

impl Reference {
    pub fn new(kind: ReferenceKind, path: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }

    /// Builds a reference from a traversal such as `var.name` or `aws_instance.web[0].id`
    ///
    /// Returns `None` for traversals that do not point at another configuration address
    /// (`count.index`, `each.value`, `path.module`, ...) or that have no attribute access.
    pub fn from_traversal(traversal: &Traversal) -> Option<Self> {
        let Expression::Variable(root) = &traversal.expr else {
            return None;
        };

        let kind = match root.as_str() {
            "var" => ReferenceKind::Variable,
            "local" => ReferenceKind::Local,
            "data" => ReferenceKind::Data,
            "module" => ReferenceKind::Module,
            "count" | "each" | "path" | "self" | "terraform" => return None,
            _ => ReferenceKind::Resource,
        };

        let mut segments = match kind {
            ReferenceKind::Resource => vec![root.as_str().to_owned()],
            _ => vec![],
        };
        for operator in &traversal.operators {
            match operator {
                TraversalOperator::GetAttr(ident) => segments.push(ident.to_string()),
                TraversalOperator::Index(Expression::Number(num)) => match segments.last_mut() {
                    Some(last) => last.push_str(&format!("[{num}]")),
                    None => break,
                },
                TraversalOperator::Index(Expression::String(key)) => match segments.last_mut() {
                    Some(last) => last.push_str(&format!("[{key:?}]")),
                    None => break,
                },
                TraversalOperator::LegacyIndex(index) => match segments.last_mut() {
                    Some(last) => last.push_str(&format!("[{index}]")),
                    None => break,
                },
                _ => break,
            }
        }

        let required = match kind {
            ReferenceKind::Resource => 2,
            _ => 1,
        };
        if segments.len() < required {
            return None;
        }

        Some(Self::new(kind, segments.join(".")))
    }

    /// Renders the reference in the grammar of the plan document (`var.` instead of `variable.`)
    pub fn json_string(&self) -> String {
        match self.kind {
            ReferenceKind::Variable => format!("var.{}", self.path),
            _ => self.to_string(),
        }
    }
}

impl std::fmt::Display for Reference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind.label() {
            Some(label) => write!(f, "{label}.{}", self.path),
            None => f.write_str(&self.path),
        }
    }
}

/// Collects every distinct reference contained in `expr`, in encounter order
pub fn collect_references(expr: &Expression) -> Vec<Reference> {
    let mut collector = ReferenceCollector::default();
    expr.visit_traversals(&mut collector);
    collector.references
}

#[derive(Default)]
struct ReferenceCollector {
    references: Vec<Reference>,
}

impl Visit<Traversal> for ReferenceCollector {
    fn visit(&mut self, traversal: &Traversal) {
        let Some(reference) = Reference::from_traversal(traversal) else {
            return;
        };

        if !self.references.contains(&reference) {
            tracing::trace!(%reference, "reference found");
            self.references.push(reference);
        }
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    pub(crate) fn expr(source: &str) -> Expression {
        let expr: hcl_edit::expr::Expression = source.parse().expect("expression must parse");
        expr.into()
    }

    fn rendered(source: &str) -> Vec<String> {
        collect_references(&expr(source))
            .iter()
            .map(Reference::json_string)
            .collect()
    }

    #[test]
    fn variable_reference_forms() {
        let refs = collect_references(&expr("var.ami_id"));
        assert_eq!(refs, vec![Reference::new(ReferenceKind::Variable, "ami_id")]);
        assert_eq!(refs[0].to_string(), "variable.ami_id");
        assert_eq!(refs[0].json_string(), "var.ami_id");
    }

    #[test]
    fn resource_and_data_references() {
        assert_eq!(
            rendered(r#""${aws_vpc.main.id}/${data.aws_ami.ubuntu.id}""#),
            vec!["aws_vpc.main.id", "data.aws_ami.ubuntu.id"]
        );
    }

    #[test]
    fn indexed_reference() {
        assert_eq!(rendered("aws_instance.web[0].id"), vec!["aws_instance.web[0].id"]);
    }

    #[test]
    fn distinct_references_only() {
        assert_eq!(
            rendered("var.enabled ? var.size : var.enabled"),
            vec!["var.enabled", "var.size"]
        );
    }

    #[test]
    fn ignores_non_address_roots() {
        assert!(rendered("count.index + length(path.module)").is_empty());
        assert!(rendered("each.value").is_empty());
        assert!(rendered("var").is_empty());
    }
}
