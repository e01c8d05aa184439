//! Agent lab: an A2A agent registry plus the agents and tools around it.
//!
//! # Architecture
//!
//! - **Registry**: Axum service keeping an in-memory directory of agents,
//!   relaying messages to them and dropping agents that stop answering
//! - **Tool agent**: A2A JSON-RPC server answering with calculator and
//!   clock tools, optionally through an OpenAI-compatible model
//! - **MCP**: stdio tool server, and an MCP client for extra tools
//!
//! # Modules
//!
//! - [`a2a`]: protocol types and client
//! - [`registry`]: directory, relay, health sweeper, HTTP API and dashboard
//! - [`registration`]: registry client and heartbeat
//! - [`agent`]: A2A tool agent server
//! - [`tools`]: native tools and MCP tool aggregation
//! - [`llm`]: chat completions driver and tool loop
//! - [`mcp`]: stdio MCP tool server

#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::implicit_hasher)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::unused_async)]

pub mod a2a;
pub mod agent;
pub mod config;
pub mod error;
pub mod jsonrpc;
pub mod llm;
pub mod mcp;
pub mod registration;
pub mod registry;
pub mod telemetry;
pub mod tools;
