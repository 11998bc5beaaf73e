//! HTTP back-end for the chat front-end.
//!
//! ## Module Map
//!
//! ```text
//! ┌──────────┐   HTTP   ┌───────────────────────────────────────────────┐
//! │  Client  │ ───────> │  server.rs  (axum Router, CORS, ServerConfig) │
//! │  (Next)  │ <─────── │    └─ api.rs  (route handlers, AppState)      │
//! └──────────┘          │         │                 │                   │
//!                       │         │ DbHandle::call  │ Assistant::route  │
//!                       │         v                 v                   │
//!                       │  db.rs (SQLite)     agent/ (script pipeline)  │
//!                       └───────────────────────────────────────────────┘
//! ```
//!
//! | Module   | Responsibility                                          |
//! |----------|---------------------------------------------------------|
//! | `models` | `Project`, `Message`, `Sender`                          |
//! | `db`     | SQLite schema, migrations, `DbHandle` (`Arc<Mutex<_>>`) |
//! | `api`    | JSON handlers and `ApiError`                            |
//! | `server` | Router assembly, CORS, bind + graceful shutdown         |
//!
//! ## Chat Request Flow
//!
//! 1. `POST /api/chat` → `api::chat()`
//! 2. The user message is stored under its project (404 if the project is
//!    missing).
//! 3. `Assistant::route()` produces the reply; it never fails.
//! 4. The reply is stored as an `ai` message and returned as
//!    `{"response": ...}`.

pub mod api;
pub mod db;
pub mod models;
pub mod server;
