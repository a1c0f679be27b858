//! Integration tests for Sumi-Harvest

mod batch_tests;
mod support;
