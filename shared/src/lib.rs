//! Shared utilities for the portfolio backend services

pub mod observability;
