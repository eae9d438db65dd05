//! Assetpipe - front-end asset pipeline
//!
//! This library provides functionality to:
//! - Compile SCSS/Sass entry points, prefix them for target browsers and minify them
//! - Concatenate vendor and application scripts and stylesheets into bundles
//! - Copy HTML, images and fonts into the output tree
//! - Inject bundle references into HTML between marker comments
//! - Schedule named tasks over a dependency graph, and rebuild on file changes

pub mod build;
pub mod cli;
pub mod concat;
pub mod config;
pub mod copy;
pub mod inject;
pub mod styles;
pub mod watch;
