//! Inbound command protocol: pure parsing and authentication, zero I/O.
//!
//! ```text
//!              ┌────────────┐
//!  raw frame ─▶│  classify  │── len 2 ──▶ bridge::parse ──────────────┐
//!              │ (by length)│── len 14 ─▶ schedule::parse ────────────┤
//!              └─────┬──────┘                                          │
//!                    │ len 17 / 34                                     ▼
//!                    ▼                                             Dispatch
//!  ┌───────────┐  ┌───────────┐  ┌──────────────┐  ┌─────────┐      ▲
//!  │ normalize │─▶│ freshness │─▶│ mac::verify  │─▶│ Accept  │──────┘
//!  └───────────┘  └───────────┘  └──────────────┘  └─────────┘
//! ```
//!
//! Nothing in this module touches hardware, clocks, or logs beyond
//! `debug!`; the [`CommandService`](crate::app::service::CommandService)
//! composes these stages and talks to collaborators.

pub mod auth;
pub mod bridge;
pub mod classify;
pub mod freshness;
pub mod mac;
pub mod normalize;
pub mod schedule;
