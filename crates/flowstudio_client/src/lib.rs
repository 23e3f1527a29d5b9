// SPDX-License-Identifier: MIT OR Apache-2.0
//! REST persistence and session layer for Flow Studio.
//!
//! This crate bridges the in-memory [`flowstudio_graph::FlowGraph`] and the
//! backend's flow resource:
//! - [`wire`] normalizes the several wire shapes legacy backends answer with
//!   into one internal [`Flow`] shape, and serializes writes into one
//!   canonical request shape
//! - [`FlowClient`] issues the CRUD and execute calls
//! - [`SessionHandle`] owns the credential lifecycle (login, lazy coalesced
//!   refresh, logout) and gates every call
//!
//! View code never sees a raw backend payload; everything passes through
//! [`wire`] first.

pub mod client;
pub mod config;
pub mod error;
pub mod flow;
pub mod session;
pub mod wire;

pub use client::FlowClient;
pub use config::ClientConfig;
pub use error::ApiError;
pub use flow::{ExecutionHandle, ExecutionState, ExecutionStatus, Flow, FlowDraft, FlowStatus};
pub use session::{SessionHandle, UserProfile};
pub use wire::WireError;
