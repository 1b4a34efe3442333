//! Client-side core for the task tracker.
//!
//! # Overview
//! Builds `HttpRequest` values and parses `HttpResponse` values for the task
//! API without touching the network (host-does-IO pattern), and provides the
//! local mirror store the UI seeds with mock rows.
//!
//! # Design
//! - `TaskClient` is stateless; it holds only `base_url`.
//! - Each operation is split into `build_*` (produces request) and
//!   `parse_*` (consumes response), so the I/O boundary is explicit.
//! - DTOs are defined independently from the server crate; integration
//!   tests catch schema drift.
//! - `MirrorStore` is unrelated to the server's data and never syncs with it.

pub mod client;
pub mod error;
pub mod http;
pub mod mirror;
pub mod types;

pub use client::TaskClient;
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use mirror::{load_mirror, MirrorError, MirrorStore, MirrorTask};
pub use types::{CreateTask, FieldError, PageMeta, Task, TaskPage, TaskStatus, UpdateTask};
