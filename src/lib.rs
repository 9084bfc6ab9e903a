//! # topic-hub
//!
//! Realtime WebSocket topic hub.
//!
//! Clients open a WebSocket under `/ws`, subscribe to topics such as
//! `order:123` or `driver:77`, and receive every event published to those
//! topics. Producers publish in-process through [`service::Hub::publish`]
//! or over HTTP via `POST /api/v1/publish`. Nothing is persisted: a client
//! only sees events published while it is connected and subscribed.
//!
//! ## Architecture
//!
//! ```text
//! Clients (WebSocket)          Producers (in-process, HTTP)
//!     │                              │
//!     ├── WS Handler (ws/)           ├── REST Handlers (api/)
//!     │                              │
//!     └──────────── Hub (service/) ──┘
//!                    │
//!                    ├── SubscriptionIndex (domain/)
//!                    └── per-connection outbound queues
//! ```
//!
//! ## Wire protocol
//!
//! | client → hub | hub → client |
//! |---|---|
//! | `{"type":"ping"}` | `{"type":"ready"}` |
//! | `{"type":"subscribe","topic":"order:1"}` | `{"type":"subscribed","topic":"order:1"}` |
//! | `{"type":"unsubscribe","topic":"order:1"}` | `{"type":"unsubscribed","topic":"order:1"}` |
//! | | `{"type":"event","topic":"order:1","event":{"name":..,"payload":..}}` |
//! | | `{"type":"error","message":"Invalid topic"}` |

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod server;
pub mod service;
pub mod ws;
