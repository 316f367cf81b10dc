//! Outer adapters. Currently only the operator command line.

pub mod cli;
