mod cli;

use hclplan::plan::PlanDocument;
use std::io::Write;

fn main() {
    use clap::Parser;
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("HCLPLAN_LOG"))
        .with_writer(std::io::stderr)
        .init();

    for new_path in cli.directory.iter() {
        match new_path.canonicalize() {
            Err(e) => {
                eprintln!(
                    "Failed to resolve path for -C/--directory {}\n{}",
                    new_path.display(),
                    e
                );
                std::process::exit(1);
            }
            Ok(cwd) => {
                if let Err(err) = std::env::set_current_dir(&cwd) {
                    eprintln!("Failed to set work directory to {}\n{}", cwd.display(), err,);
                    std::process::exit(1);
                }

                tracing::info!(directory=%cwd.display(), "Changed working directory");
            }
        }
    }

    if let Err(e) = plan(cli) {
        for error in e.chain() {
            eprintln!("{error}")
        }
        std::process::exit(1);
    }
}

fn plan(cli: cli::Cli) -> anyhow::Result<()> {
    let options = hclplan::PlanOptions {
        path: cli.path,
        plan_flags: cli.input.plan_flags,
        vars: cli.input.vars,
        var_files: cli.input.var_files,
    };

    match cli.output.format {
        cli::OutputFormat::Json => {
            let json = hclplan::load_plan_json(&options)?;
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&json)?;
            writeln!(stdout)?;
        }
        cli::OutputFormat::Yaml => output_yaml(&hclplan::load_plan(&options)?)?,
    };

    Ok(())
}

fn output_yaml(plan: &PlanDocument) -> anyhow::Result<()> {
    serde_yaml::to_writer(std::io::stdout(), plan)?;
    Ok(())
}
