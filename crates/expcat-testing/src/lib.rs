//! Testing infrastructure for expcat integration tests.
//!
//! This crate provides utilities for writing robust integration tests:
//! - `CatalogWorld`: Fluent interface for archive trees and CLI runs
//! - `fixtures`: netCDF fixture generation through the classic writer

pub mod fixtures;
pub mod world;

pub use fixtures::{
    FIXTURE_UNITS, FixtureVariable, TimeSeriesFixture, write_corrupt_file, write_oversized_file,
};
pub use world::{CatalogWorld, CliResult};
