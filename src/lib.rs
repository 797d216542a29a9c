//! Structured benchmark results from CI build logs.
//!
//! A log is routed to a [`parsers::LogParser`] by the [`parsers::Dispatcher`].
//! The benchmark parser splits the log into iterations ([`segment`]), reads
//! each iteration header ([`classify`]), pulls metrics with the matching
//! schema ([`registry`], [`extract`]) and rolls the statuses up into a build
//! verdict ([`verdict`]).

pub mod classify;
pub mod config;
pub mod db;
pub mod extract;
pub mod input;
pub mod metadata;
pub mod parsers;
pub mod pattern;
pub mod registry;
pub mod report;
pub mod segment;
pub mod verdict;
