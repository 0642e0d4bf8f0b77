// SPDX-License-Identifier: MIT

use agentic_workflow_compiler::expression::{break_long_expression, parse, unwrap_expression_template};
use agentic_workflow_compiler::{Compiler, CompilerOptions};
use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile a markdown workflow into a pipeline definition
    Compile {
        /// Path to the workflow file
        file: PathBuf,

        /// Output path, defaults to `<file>.lock.yml` next to the source
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Fail on unpinned actions, agent write grants and implicit project tokens
        #[arg(long)]
        strict: bool,

        /// Runner for jobs that do not set `runs-on`
        #[arg(short, long)]
        runner: Option<String>,

        /// Print the pipeline instead of writing it
        #[arg(long)]
        stdout: bool,
    },
    /// Parse a condition expression and print its canonical rendering
    Expr {
        /// The expression, optionally wrapped in `${{ }}`
        expression: String,
    },
}

fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    match args.command {
        Commands::Compile {
            file,
            output,
            strict,
            runner,
            stdout,
        } => {
            let mut options = CompilerOptions::from_env();
            if strict {
                options = options.strict(true);
            }
            if let Some(runner) = runner {
                options = options.default_runner(runner);
            }

            let compiled = Compiler::new(options)
                .compile_file(&file)
                .with_context(|| format!("failed to compile {}", file.display()))?;
            let yaml = compiled.render_to_yaml()?;

            if stdout {
                print!("{}", yaml);
                return Ok(());
            }

            let output = output.unwrap_or_else(|| lock_file_path(&file));
            fs::write(&output, yaml)
                .with_context(|| format!("failed to write {}", output.display()))?;
            log::info!("Wrote {}", output.display());
            println!("Compiled '{}' -> {}", compiled.name, output.display());
        }
        Commands::Expr { expression } => {
            let node = parse(unwrap_expression_template(&expression))
                .with_context(|| format!("invalid expression: {}", expression))?;
            let rendered = node.render();
            println!("{}", rendered);
            let lines = break_long_expression(&rendered);
            if lines.len() > 1 {
                println!();
                for line in lines {
                    println!("  {}", line);
                }
            }
        }
    }

    Ok(())
}

/// `workflows/triage.md` -> `workflows/triage.lock.yml`
fn lock_file_path(source: &std::path::Path) -> PathBuf {
    source.with_extension("lock.yml")
}
