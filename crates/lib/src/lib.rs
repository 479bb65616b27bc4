//! stubgen-lib: Core types and logic for stubgen
//!
//! This crate provides the pieces of the incremental stub build:
//! - `freshness`: the timestamp mark model and the staleness decision
//! - `scan`: definition-file discovery and generated-source collection
//! - `marker`: the persisted mark file recording the last successful build
//! - `tools`: external generator/compiler invocations behind a runner trait
//! - `build`: the orchestration that ties the above together

pub mod build;
pub mod consts;
pub mod freshness;
pub mod marker;
pub mod scan;
pub mod tools;
