//! Core library for the governance record health scoring service: the check
//! catalog and executor, the penalty/aggregation/cap pipeline, readiness
//! evaluation, next-action ranking, per-tenant rulesets, and the HTTP router
//! that exposes them.

pub mod config;
pub mod error;
pub mod health;
pub mod telemetry;
