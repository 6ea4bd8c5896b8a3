//! configuration expressions of a block
//!
//! Two views are derived from the references found in a block's attributes:
//! - [block_expressions]: `{ "ami": { "references": ["var.ami_id"] } }` per attribute, nested
//!   blocks grouped by kind like [crate::value] does it
//! - [count_expression]: the `count` attribute, either as references or as a constant
use crate::config::{count_value, Block, COUNT_ATTRIBUTE};
use crate::plan::{CountExpression, Expression, Expressions};

pub fn block_expressions(block: &Block) -> Expressions {
    let mut expressions = Expressions::new();

    for attribute in &block.attributes {
        // count has its own key in the configuration
        if attribute.name == COUNT_ATTRIBUTE || attribute.references.is_empty() {
            continue;
        }

        let references = attribute
            .references
            .iter()
            .map(|reference| reference.json_string())
            .collect();
        expressions.insert(attribute.name.clone(), Expression::References { references });
    }

    for child in &block.children {
        if child.kind.is_meta() {
            continue;
        }

        let child_expressions = block_expressions(child);
        if child_expressions.is_empty() {
            continue;
        }

        match expressions.get_mut(child.kind.as_str()) {
            Some(Expression::Blocks(existing)) => existing.push(child_expressions),
            _ => {
                expressions.insert(
                    child.kind.as_str().to_owned(),
                    Expression::Blocks(vec![child_expressions]),
                );
            }
        }
    }

    expressions
}

/// `None` if the block has no count attribute
pub fn count_expression(block: &Block) -> Option<CountExpression> {
    let attribute = block.get_attribute(COUNT_ATTRIBUTE)?;

    if !attribute.references.is_empty() {
        let references = attribute
            .references
            .iter()
            .map(|reference| rewrite_variable_prefix(&reference.to_string()))
            .collect();
        return Some(CountExpression::References { references });
    }

    Some(CountExpression::Constant {
        constant_value: constant_count(&attribute.value),
    })
}

fn rewrite_variable_prefix(reference: &str) -> String {
    match reference.strip_prefix("variable.") {
        Some(rest) => format!("var.{rest}"),
        None => reference.to_owned(),
    }
}

fn constant_count(value: &hcl::Value) -> i64 {
    count_value(value).unwrap_or_else(|| {
        tracing::debug!(?value, "count is not a number, assuming 0");
        0
    })
}
