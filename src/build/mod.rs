//! Task graph and scheduler.
//!
//! # Overview
//!
//! - **Graph**: [`TaskGraph`] registers named tasks with typed edges
//!   (`Requires` pulls a dependency into the run, `After` only orders).
//! - **Planning**: a selection of task names or filters resolves to a
//!   [`RunPlan`] of leaf tasks; aggregates are expanded away.
//! - **Execution**: [`BuildPipeline`] runs the plan level by level on
//!   worker threads and reports through a [`ProgressReporter`].
//!
//! # Example
//!
//! ```ignore
//! use assetpipe::build::{BuildContext, BuildPipeline};
//! use assetpipe::config::load_config;
//!
//! let loaded = load_config(None, &std::env::current_dir()?)?;
//! let context = BuildContext::new(loaded.config, loaded.root);
//! let result = BuildPipeline::new(context).run(&["build:styles"])?;
//! println!("{} tasks succeeded", result.success_count());
//! ```

pub mod context;
pub mod discovery;
pub mod error;
pub mod graph;
pub mod pipeline;
pub mod progress;
pub mod result;
pub mod target;

pub use context::*;
pub use discovery::*;
pub use error::*;
pub use graph::*;
pub use pipeline::*;
pub use progress::*;
pub use result::*;
pub use target::*;
