#![doc = include_str!("../README.md")]

pub mod allocation_result;
pub mod config;
pub mod connection;
pub mod context;
pub mod error;
pub mod genetic;
pub mod heuristics;
pub mod history;
pub mod matching;
pub mod objective;
pub mod parser;
pub mod placement_heuristic;
pub mod profile;
pub mod replay;
pub mod static_trace;
pub mod task;
pub mod topology;
