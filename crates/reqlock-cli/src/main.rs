use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reqlock_core::Requirement;
use reqlock_registry::{DirectoryRepository, LocalPinsRepository};
use reqlock_resolver::{Repository, ResolutionResult, ResolvedRequirement, Resolver};

use crate::lockfile::{parse_requirement_lines, render_lockfile};

mod lockfile;
mod render;


#[derive(Parser, Debug)]
#[command(name = "reqlock")]
#[command(about = "Compile loose requirements into a pinned, hash-locked set", long_about = None)]
struct Cli {
    #[arg(long)]
    registry_root: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Compile {
        #[arg(default_value = "requirements.in")]
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        hashes: bool,
        #[arg(long)]
        max_rounds: Option<usize>,
        #[arg(long)]
        reuse: Option<PathBuf>,
    },
    Check {
        #[arg(default_value = "requirements.in")]
        input: PathBuf,
        #[arg(default_value = "requirements.txt")]
        lockfile: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run_cli(cli) {
        Ok(code) => code,
        Err(err) => {
            render::print_error(&format!("{err:#}"));
            ExitCode::FAILURE
        }
    }
}

fn run_cli(cli: Cli) -> Result<ExitCode> {
    let registry_root = cli
        .registry_root
        .unwrap_or_else(|| PathBuf::from("."));

    match cli.command {
        Commands::Compile {
            input,
            output,
            hashes,
            max_rounds,
            reuse,
        } => {
            let lines = run_compile_command(
                &input,
                &registry_root,
                hashes,
                max_rounds,
                reuse.as_deref(),
            )?;
            match output {
                Some(path) => {
                    fs::write(&path, lines.join("\n") + "\n")
                        .with_context(|| format!("failed to write {}", path.display()))?;
                }
                None => {
                    for line in &lines {
                        println!("{line}");
                    }
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Check { input, lockfile } => {
            let display = lockfile.display().to_string();
            if run_check_command(&input, &lockfile, &registry_root)? {
                println!("{display} is OK");
                Ok(ExitCode::SUCCESS)
            } else {
                println!("{display} is outdated");
                Ok(ExitCode::FAILURE)
            }
        }
    }
}

fn run_compile_command(
    input: &Path,
    registry_root: &Path,
    hashes: bool,
    max_rounds: Option<usize>,
    reuse: Option<&Path>,
) -> Result<Vec<String>> {
    let content = fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let roots = parse_requirement_lines(&content)?;
    let registry = DirectoryRepository::open(registry_root);

    let result = match reuse {
        Some(pins_path) => {
            let pins_content = fs::read_to_string(pins_path)
                .with_context(|| format!("failed to read {}", pins_path.display()))?;
            let pins = parse_requirement_lines(&pins_content)?;
            let repository = LocalPinsRepository::new(pins, registry);
            compile_requirements(&roots, &repository, hashes, max_rounds)?
        }
        None => compile_requirements(&roots, &registry, hashes, max_rounds)?,
    };

    let hint = format!("reqlock compile {}", input.display());
    Ok(render_lockfile(&result, &hint))
}

fn run_check_command(input: &Path, lockfile: &Path, registry_root: &Path) -> Result<bool> {
    let content = fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let roots = parse_requirement_lines(&content)?;
    let registry = DirectoryRepository::open(registry_root);
    let expected = compile_requirements(&roots, &registry, false, None)?;

    let locked_content = fs::read_to_string(lockfile)
        .with_context(|| format!("failed to read {}", lockfile.display()))?;
    let locked = parse_requirement_lines(&locked_content)?;

    let mut expected_lines: Vec<String> = expected
        .requirements
        .values()
        .map(|resolved| resolved.requirement.to_string())
        .collect();
    expected_lines.sort();

    let mut locked_lines: Vec<String> = locked
        .iter()
        .map(ToString::to_string)
        .collect();
    locked_lines.sort();

    Ok(expected_lines == locked_lines)
}

fn compile_requirements<R: Repository>(
    roots: &[Requirement],
    repository: &R,
    with_hashes: bool,
    max_rounds: Option<usize>,
) -> Result<ResolutionResult> {
    let mut resolver = Resolver::new(repository);
    if let Some(max_rounds) = max_rounds {
        resolver = resolver.with_max_rounds(max_rounds);
    }

    if with_hashes {
        return Ok(resolver.compile(roots)?);
    }

    let pinned = resolver.resolve(roots)?;
    Ok(ResolutionResult {
        requirements: pinned
            .into_iter()
            .map(|(name, requirement)| {
                (name, ResolvedRequirement {
                    requirement,
                    hashes: BTreeSet::new(),
                })
            })
            .collect(),
    })
}
