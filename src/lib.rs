//! OpenAPI from traffic - OpenAPI documentation inferred from recorded HTTP traffic.
//!
//! This library turns recorded request/response pairs into a multi-file
//! OpenAPI 3.0 document. Concrete paths are generalized into route templates,
//! JSON bodies into schemas, and everything is persisted as a tree of small
//! YAML fragments that later runs extend instead of replacing.
//!
//! # Architecture
//!
//! 1. [`traffic`] - Loads traffic records and groups decoded samples by route
//! 2. [`route`] - Turns concrete paths into route templates and directory names
//! 3. [`identifier`] - Derives operation and schema identifiers
//! 4. [`schema_inferencer`] - Infers schemas from sample JSON values
//! 5. [`dedup`] - Lets each (route, method, status) pattern through once per run
//! 6. [`assembler`] - Writes leaf fragments and regenerates the index nodes
//! 7. [`openapi_builder`] - Drives the pipeline over route groups
//! 8. [`toolchain`] - Bundles, lints and renders the tree with external tools
//!
//! Non-fatal degradations (malformed samples, dropped schema members,
//! unexpected files in the tree) are collected in [`diagnostics`].
//!
//! # Example Usage
//!
//! ```no_run
//! use openapi_from_traffic::{
//!     assembler::Assembler,
//!     diagnostics::Diagnostics,
//!     identifier::CollisionPolicy,
//!     openapi_builder::OpenApiBuilder,
//!     traffic::{group_by_route, JsonFileSource, TrafficSource},
//! };
//! use std::path::PathBuf;
//!
//! let mut diagnostics = Diagnostics::new();
//!
//! // Load and group recorded traffic
//! let records = JsonFileSource::new(PathBuf::from("traffic.jsonl"))
//!     .load(&mut diagnostics)
//!     .unwrap();
//! let groups = group_by_route(records, &mut diagnostics);
//!
//! // Extend the document tree under .build/
//! let root = PathBuf::from(".build");
//! let assembler = Assembler::open(root, CollisionPolicy::Reject, &mut diagnostics).unwrap();
//! let mut builder = OpenApiBuilder::new(assembler);
//! for group in &groups {
//!     builder.add_route_group(group, &mut diagnostics).unwrap();
//! }
//! let summary = builder.build(&diagnostics).unwrap();
//! println!("{} operations, {} schemas", summary.operations, summary.schemas);
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module which provides a complete CLI application.

pub mod assembler;
pub mod cli;
pub mod dedup;
pub mod diagnostics;
pub mod error;
pub mod identifier;
pub mod model;
pub mod openapi_builder;
pub mod route;
pub mod schema_inferencer;
pub mod serializer;
pub mod toolchain;
pub mod traffic;
