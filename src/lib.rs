/*
 * lib.rs
 *
 * Library crate backing the smt-portfolio binary. The binary is a thin CLI
 * wrapper; everything that matters -- the Command/Task/Controller
 * orchestration engine, the outcome classifier, the signal bridge and
 * watchdog, config loading, output rendering -- lives here so integration
 * tests can drive it directly instead of only through argv.
 */

//! # smt-portfolio
//!
//! Races a portfolio of SMT solvers on one input and reports the first
//! decisive answer.
//!
//! ```rust
//! use smt_portfolio::duration::parse_duration;
//! use std::time::Duration;
//!
//! let dur = parse_duration("30s").unwrap();
//! assert_eq!(dur, Duration::from_secs(30));
//! ```

pub mod classifier;
pub mod command;
pub mod config;
#[cfg(feature = "daemon")]
pub mod daemon;
pub mod controller;
pub mod duration;
pub mod error;
pub mod output;
pub mod signal;
pub mod signal_bridge;
pub mod task;
pub mod watchdog;

pub use classifier::{TaskResult, classify};
pub use command::{Command, Sink};
pub use controller::{Config as ControllerConfig, Controller};
pub use duration::parse_duration;
pub use error::{InvariantViolation, PortfolioError, Result, exit_codes};
pub use signal::{Signal, parse_signal, signal_name};
pub use task::{Task, TaskStatus};
