//! Curator Core - headless engine for curating predicted semantic mappings.
//!
//! A curation project is a directory holding four SSSOM TSV files: machine
//! predictions plus the positive, negative and unsure curations. This crate
//! loads them, keeps every mapping identity in at most one of them, moves
//! mappings between them as reviewers decide, and writes the files back
//! atomically so they can be tracked with git.
//!
//! # Example
//!
//! ```rust,ignore
//! use curator_core::{Decision, IdentityKey, Reference, Repository};
//!
//! fn main() -> curator_core::Result<()> {
//!     let repository = Repository::open("/path/to/project")?;
//!
//!     let key: IdentityKey = "chebi:133530 skos:exactMatch mesh:C027957".parse()?;
//!     let curator = Reference::parse("orcid:0000-0003-4423-4370")?;
//!     let manual = Reference::parse("semapv:ManualMappingCuration")?;
//!     repository.curate(key, Decision::Positive, &curator, &manual)?;
//!
//!     for issue in repository.validate()? {
//!         println!("{}", issue);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod index;
pub mod init;
pub mod model;
pub mod query;
pub mod repository;
pub mod store;

// Re-export commonly used types
pub use config::{FileNames, RepositoryConfig, Vocabulary};
pub use error::{CuratorError, Result};
pub use index::{ConflictIndex, ConflictKind, ConflictReport, IndexDiff, IntegrityIssue};
pub use init::{initialize_folder, InitOptions};
pub use model::{
    Confidence, IdentityKey, MappingSet, MappingSetMetadata, NamedReference, PredicateModifier,
    Reference, SemanticMapping,
};
pub use query::{PredictionQuery, SortOrder};
pub use repository::{
    CurationState, Decision, GitHook, IngestOptions, IngestSummary, Mark, NoopHook, PersistHook,
    PredictionGateway, Repository, StateSets,
};
