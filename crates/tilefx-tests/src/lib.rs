//! Integration tests for the tilefx crates.
//!
//! End-to-end scenarios driving the filter engine with real CPU filters,
//! exercising the full load -> pump -> draw protocol across crates.
