//! hclplan cli interface

use clap::{Parser, ValueEnum};
use std::fmt::Formatter;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Change the work directory
    ///
    /// Can be specified multiple times. Note that all
    /// paths on the way to the final path must exist.
    ///
    /// This is equivalent to running { cd <directory>; hclplan ... }
    #[clap(short = 'C', long = "directory")]
    pub directory: Vec<PathBuf>,

    /// Terraform root module directory
    #[arg(default_value = ".")]
    pub path: PathBuf,

    #[clap(flatten)]
    pub input: InputArgs,

    #[clap(flatten)]
    pub output: OutputArgs,
}

#[derive(Parser, Debug)]
pub struct InputArgs {
    /// Raw terraform plan flags
    ///
    /// Only -var and -var-file are picked up, e.g. "-var=region=eu-west-1 -var-file=prod.tfvars"
    #[clap(long = "plan-flags", default_value = "", allow_hyphen_values(true))]
    pub plan_flags: String,

    /// Set an input variable (key=value)
    ///
    /// Applied after variables from --plan-flags
    #[clap(long = "var")]
    pub vars: Vec<String>,

    /// Load input variables from a file
    ///
    /// Applied after files from --plan-flags
    #[clap(long = "var-file")]
    pub var_files: Vec<String>,
}

#[derive(Parser, Debug)]
pub struct OutputArgs {
    #[arg(short = 'F', long = "output-format", default_value_t)]
    pub format: OutputFormat,
}

#[derive(ValueEnum, Clone, Default, Debug)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => f.write_str("json"),
            OutputFormat::Yaml => f.write_str("yaml"),
        }
    }
}
