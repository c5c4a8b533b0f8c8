//! rockpack CLI entry point.

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use rockpack_cli::{Cli, Commands};
use rockpack_core::{Config, Rockspec};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::new();

    match cli.command {
        Commands::Show { file, quick, json } => {
            let rockspec = Rockspec::from_file(&file, quick, &config)
                .with_context(|| format!("failed to normalize {}", file.display()))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&rockspec)?);
            } else {
                print_summary(&rockspec);
            }
            Ok(())
        }
        Commands::Lint { files } => {
            if files.is_empty() {
                bail!("no rockspec files given");
            }
            let mut failures = 0usize;
            for file in &files {
                match Rockspec::from_file(file, false, &config) {
                    Ok(rockspec) => {
                        if !cli.quiet {
                            println!("ok:   {} ({})", file.display(), rockspec.name);
                        }
                    }
                    Err(e) => {
                        failures += 1;
                        eprintln!("fail: {}: {e}", file.display());
                    }
                }
            }
            if failures > 0 {
                bail!("{failures} of {} rockspec(s) failed", files.len());
            }
            Ok(())
        }
    }
}

fn print_summary(rockspec: &Rockspec) {
    println!("{} {}", rockspec.name, rockspec.version);
    if let Some(summary) = &rockspec.description.summary {
        println!("  {summary}");
    }
    println!("  format:   {}", rockspec.format_version);
    println!(
        "  source:   {} ({})",
        rockspec.source.url, rockspec.source.protocol
    );
    if let Some(build) = &rockspec.build {
        println!("  build:    {}", build.build_type);
    }
    for (label, deps) in [
        ("deps", &rockspec.dependencies),
        ("build", &rockspec.build_dependencies),
        ("test", &rockspec.test_dependencies),
    ] {
        if !deps.is_empty() {
            let rendered: Vec<String> = deps.iter().map(ToString::to_string).collect();
            println!("  {label}:     {}", rendered.join(", "));
        }
    }
    if let Some(vars) = &rockspec.variables {
        if let Some(prefix) = vars.get("PREFIX") {
            println!("  prefix:   {prefix}");
        }
    }
}
