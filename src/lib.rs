//! indesign-mcp: MCP server for AI-assisted text editing in Adobe InDesign
//!
//! This library exposes a small set of document-editing tools that let AI
//! assistants add, replace, remove and read text in the active InDesign
//! document.
//!
//! # Architecture
//!
//! The server is a thin, stateless shim:
//!
//! - **Tool dispatch**: validates tool arguments and applies defaults
//! - **Script rendering**: turns each request into a short ExtendScript program
//! - **Execution**: runs the program in InDesign through `osascript`
//!
//! Document state lives entirely inside InDesign and is never cached here.
//!
//! # Modules
//!
//! - [`config`] — Configuration loading and validation
//! - [`error`] — Configuration error types
//! - [`indesign`] — Requests, script rendering and the automation bridge
//! - [`mcp`] — MCP protocol implementation

pub mod config;
pub mod error;
pub mod indesign;
pub mod mcp;
