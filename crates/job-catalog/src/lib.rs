//! Job Catalog - read-only enumeration of defined training jobs
//!
//! The catalog is a directory of JSON job definitions written by the job
//! submission collaborator. This crate only reads it, and re-reads it on
//! every call so newly submitted jobs appear without a restart.

mod catalog;

pub use catalog::JobCatalog;
