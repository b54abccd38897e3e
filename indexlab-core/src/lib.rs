//! IndexLab Core: market index data acquisition and the merged price table.
//!
//! This crate contains the data side of the analysis pipeline:
//! - Domain types (single-index series, date-aligned market table)
//! - Provider trait with Yahoo Finance, Sina and synthetic adapters
//! - Deterministic closing-price field selection
//! - Series reconciler with per-index fallback chains
//! - Snapshot persistence with legacy column migration and region ordering

pub mod data;
pub mod domain;
