//! ftm-translate - translation of FollowTheMoney entity texts
//!
//! Routes texts through locally installed machine-translation engines
//! (argos and apertium), caching one translator per engine and language
//! pair, and appends the results to entities as they stream through.

pub mod cli;
pub mod config;
pub mod entity;
pub mod error;
pub mod io;
pub mod language;
pub mod process;
pub mod transcribe;
pub mod translate;
pub mod workflow;
