//! Curator CLI - drives the curation engine from scripts and CI.
//!
//! Results go to stdout (TSV for mappings, JSON for summaries); logs go to
//! stderr.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use curator_core::store::{self, tsv};
use curator_core::{
    export, initialize_folder, CurationState, Decision, GitHook, IdentityKey, IngestOptions,
    InitOptions, MappingSet, MappingSetMetadata, Mark, PredictionQuery, Reference, Repository,
    SortOrder, Vocabulary,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "curator")]
#[command(about = "Curate predicted semantic mappings stored as SSSOM files")]
struct Cli {
    /// Project directory
    #[arg(short, long, global = true, default_value = ".")]
    project: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Stage changed files with git after each mutation
    #[arg(long, global = true)]
    git: bool,

    #[command(subcommand)]
    command: Command,
}

/// The `subject predicate object` triple of a mapping.
#[derive(Args, Debug)]
struct Triple {
    subject: String,
    predicate: String,
    object: String,
}

impl Triple {
    fn key(&self) -> IdentityKey {
        IdentityKey::new(&self.subject, &self.predicate, &self.object)
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the four mapping files and curator.json
    Init {
        #[arg(long)]
        purl_base: Option<String>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        license: Option<String>,
        #[arg(long)]
        creator: Option<String>,
        #[arg(long)]
        basename: Option<String>,
    },
    /// Add predictions from an SSSOM TSV file
    Ingest {
        file: PathBuf,
        /// Merge evidence of already predicted mappings
        #[arg(long)]
        refresh: bool,
    },
    /// Curate a predicted mapping
    Curate {
        #[command(flatten)]
        triple: Triple,
        /// correct, broad, narrow, incorrect or unsure
        #[arg(long)]
        mark: Mark,
        #[arg(long)]
        curator: Reference,
    },
    /// Re-classify a curated mapping
    Recurate {
        #[command(flatten)]
        triple: Triple,
        /// positive, negative or unsure
        #[arg(long)]
        decision: Decision,
        #[arg(long)]
        curator: Reference,
        #[arg(long, default_value = Vocabulary::MANUAL_MAPPING_CURATION)]
        justification: Reference,
    },
    /// Delete a mapping from one file
    Remove {
        #[command(flatten)]
        triple: Triple,
        #[arg(long)]
        state: CurationState,
    },
    /// List predictions
    List(ListArgs),
    /// Check the project for integrity issues (exit code 1 when any are found)
    Validate {
        /// Print issues as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write the merged SSSOM export into a directory
    Merge { out: PathBuf },
    /// Commit staged curations and push the current branch
    Publish {
        #[arg(long)]
        curator: Reference,
        /// Number of curations in the commit
        #[arg(long, default_value_t = 1)]
        count: usize,
    },
}

#[derive(Args, Debug)]
struct ListArgs {
    #[arg(long)]
    query: Option<String>,
    #[arg(long)]
    subject_query: Option<String>,
    #[arg(long)]
    subject_prefix: Option<String>,
    #[arg(long)]
    object_query: Option<String>,
    #[arg(long)]
    object_prefix: Option<String>,
    #[arg(long)]
    prefix: Option<String>,
    #[arg(long)]
    mapping_tool: Option<String>,
    #[arg(long)]
    same_text: bool,
    /// asc, desc, subject or object
    #[arg(long)]
    sort: Option<SortOrder>,
    #[arg(long)]
    offset: Option<usize>,
    #[arg(long)]
    limit: Option<usize>,
    /// Print only the number of matches
    #[arg(long, conflicts_with = "prefixes")]
    count: bool,
    /// Print match counts per prefix pair
    #[arg(long)]
    prefixes: bool,
}

impl ListArgs {
    fn query(&self) -> PredictionQuery {
        PredictionQuery {
            query: self.query.clone(),
            subject_query: self.subject_query.clone(),
            subject_prefix: self.subject_prefix.clone(),
            object_query: self.object_query.clone(),
            object_prefix: self.object_prefix.clone(),
            prefix: self.prefix.clone(),
            mapping_tool: self.mapping_tool.clone(),
            same_text: self.same_text,
            targets: None,
            sort: self.sort,
            offset: self.offset,
            limit: self.limit,
        }
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.as_str().to_lowercase()));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    debug!("Project: {}", cli.project.display());
    run(cli)
}

fn open(cli: &Cli) -> Result<Repository> {
    let repository = Repository::open(&cli.project)
        .with_context(|| format!("Failed to open project {}", cli.project.display()))?;
    Ok(if cli.git {
        repository.with_hook(GitHook::new(&cli.project))
    } else {
        repository
    })
}

fn run(cli: Cli) -> Result<ExitCode> {
    match &cli.command {
        Command::Init {
            purl_base,
            title,
            description,
            license,
            creator,
            basename,
        } => {
            let options = InitOptions {
                purl_base: purl_base.clone(),
                mapping_set: MappingSetMetadata {
                    title: title.clone(),
                    description: description.clone(),
                    license: license.clone(),
                    creator: creator.clone(),
                    ..Default::default()
                },
                basename: basename.clone(),
            };
            initialize_folder(&cli.project, options)?;
            info!("Initialized {}", cli.project.display());
        }
        Command::Ingest { file, refresh } => {
            let candidates = store::load(file)?;
            let summary = open(&cli)?.append_predicted_mappings_with(
                candidates.mappings().to_vec(),
                IngestOptions {
                    refresh_existing: *refresh,
                },
            )?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Curate {
            triple,
            mark,
            curator,
        } => {
            let record = open(&cli)?.mark(triple.key(), *mark, curator)?;
            info!("Stored {}", record.identity_key());
        }
        Command::Recurate {
            triple,
            decision,
            curator,
            justification,
        } => {
            let record = open(&cli)?.recurate(triple.key(), *decision, curator, justification)?;
            info!("Stored {}", record.identity_key());
        }
        Command::Remove { triple, state } => {
            let removed = open(&cli)?.remove(triple.key(), *state)?;
            info!("Removed {} row(s)", removed.len());
        }
        Command::List(args) => {
            let repository = open(&cli)?;
            let query = args.query();
            if args.count {
                println!("{}", repository.count_predictions(&query)?);
            } else if args.prefixes {
                for ((subject, object), count) in repository.prefix_counts(&query)? {
                    println!("{}\t{}\t{}", subject, object, count);
                }
            } else {
                let metadata = repository.default_metadata(CurationState::Predictions);
                let mut listed = MappingSet::new(&metadata);
                listed.extend_unique(repository.predictions(&query)?);
                print!("{}", tsv::render(&listed));
            }
        }
        Command::Validate { json } => {
            let issues = open(&cli)?.validate()?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&issues)?);
            } else {
                for issue in &issues {
                    println!("{}", issue);
                }
            }
            if !issues.is_empty() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Merge { out } => {
            let output = export::merge(&open(&cli)?, out)?;
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Command::Publish { curator, count } => {
            let message = GitHook::new(&cli.project).publish(&curator.curie(), *count)?;
            info!("{}", message);
        }
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_curate() {
        let cli = Cli::try_parse_from([
            "curator",
            "--project",
            "/tmp/p",
            "curate",
            "chebi:1",
            "skos:exactMatch",
            "mesh:C1",
            "--mark",
            "broad",
            "--curator",
            "orcid:0000-0000-0000-0001",
        ])
        .unwrap();
        match cli.command {
            Command::Curate { triple, mark, .. } => {
                assert_eq!(mark, Mark::Broad);
                assert_eq!(triple.key().to_string(), "chebi:1 skos:exactMatch mesh:C1");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_rejects_bad_curator() {
        assert!(Cli::try_parse_from([
            "curator",
            "publish",
            "--curator",
            "not a curie",
        ])
        .is_err());
    }
}
