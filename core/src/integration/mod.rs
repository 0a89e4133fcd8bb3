//! Integration tests for the engine runtime
//!
//! Drive the public surface end to end: a logic thread producing commands
//! against a threaded render device, the mixer stream graph, and the engine
//! context built from settings.

#[cfg(test)]
mod engine_tests;
#[cfg(test)]
mod render_pipeline_tests;
