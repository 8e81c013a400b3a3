// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

#![forbid(unsafe_code)]

//! # Dockerfile build-instruction interpreter
//!
//! A pure Rust library that parses Dockerfile-style build scripts,
//! resolves build-arg and environment scoping across multi-stage builds,
//! and drives a pluggable [`Executor`] that realizes side effects. The
//! library itself performs no image I/O: it is the engine behind a build
//! tool, not the build tool.
//!
//! ## Quick start
//!
//! ```rust
//! use dockerfile_builder::{parse_dockerfile, Builder, NoopExecutor, Stages};
//!
//! let node = parse_dockerfile(r#"
//!   ARG TAG=3.19
//!   FROM alpine:$TAG AS base
//!   ENV GREETING="hello world"
//!   RUN echo $GREETING
//! "#.as_bytes()).unwrap();
//!
//! let stages = Stages::new(&node, &Builder::default()).unwrap();
//! for mut stage in stages {
//!   let image = stage.builder.resolve_from(&mut stage.node).unwrap();
//!   assert_eq!(image, "alpine:3.19");
//!
//!   for child in &stage.node.children {
//!     let mut step = stage.builder.step();
//!     step.resolve(child).unwrap();
//!     stage.builder.run(&step, &mut NoopExecutor, false).unwrap();
//!   }
//! }
//! ```

mod builder;
mod config;
mod error;
mod executor;
mod ignore;
mod instructions;
mod node;
mod parser;
mod shell;
mod stages;
mod volume;

pub use crate::builder::*;
pub use crate::config::*;
pub use crate::error::*;
pub use crate::executor::*;
pub use crate::ignore::*;
pub use crate::node::*;
pub use crate::parser::*;
pub use crate::stages::*;
pub use crate::volume::*;
