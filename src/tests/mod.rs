//! # Binary-level Tests
//!
//! Drive the fetch/aggregate/select pipeline in `main` end to end with in-memory
//! sources, so no network or display is needed.
