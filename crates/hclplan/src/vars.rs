//! `-var` and `-var-file` flags from a raw terraform flag string
//!
//! ```
//! let flags = "-var=region=eu-west-1 -refresh=false -var-file=prod.tfvars";
//! let vars = hclplan::vars::vars_from_plan_flags(flags).unwrap();
//! assert_eq!(vars.vars, vec!["region=eu-west-1"]);
//! assert_eq!(vars.files, vec!["prod.tfvars"]);
//! ```

/// Input variables in the order they were given, later entries win
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanVars {
    /// `key=value` pairs
    pub vars: Vec<String>,
    /// variable definition files
    pub files: Vec<String>,
}

impl PlanVars {
    /// Appends explicitly configured entries after the flag derived ones
    pub fn extend(
        &mut self,
        vars: impl IntoIterator<Item = String>,
        files: impl IntoIterator<Item = String>,
    ) {
        self.vars.extend(vars);
        self.files.extend(files);
    }
}

#[derive(thiserror::Error, Debug)]
pub enum VarFlagError {
    #[error("invalid flag syntax")]
    Syntax(#[from] shell_words::ParseError),
    #[error("flag needs an argument: -{0}")]
    MissingValue(String),
}

/// Extracts `-var` and `-var-file` flags, other flags are ignored
///
/// Both `-var=value` and `-var value` forms are accepted, with one or two leading dashes.
pub fn vars_from_plan_flags(flags: &str) -> Result<PlanVars, VarFlagError> {
    let mut vars = PlanVars::default();
    let mut tokens = shell_words::split(flags)?.into_iter();

    while let Some(token) = tokens.next() {
        let Some(flag) = token.strip_prefix("--").or_else(|| token.strip_prefix('-')) else {
            tracing::trace!(%token, "ignoring argument");
            continue;
        };

        let (name, inline_value) = match flag.split_once('=') {
            Some((name, value)) => (name, Some(value.to_owned())),
            None => (flag, None),
        };

        let target = match name {
            "var" => &mut vars.vars,
            "var-file" => &mut vars.files,
            _ => {
                tracing::trace!(%token, "ignoring flag");
                continue;
            }
        };

        let value = match inline_value {
            Some(value) => value,
            None => tokens
                .next()
                .ok_or_else(|| VarFlagError::MissingValue(name.to_owned()))?,
        };
        target.push(value);
    }

    Ok(vars)
}
