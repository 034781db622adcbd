//! # Tag Game Server Library
//!
//! Authoritative coordinator for a real-time game of tag. The server tracks every
//! connected player's position, keeps exactly one player "it", transfers that role
//! when the tagger touches someone, and broadcasts each change to all clients.
//!
//! ## Architecture
//!
//! ### Single-Threaded Event Loop
//! Network tasks only decode and encode datagrams. Every inbound event (join,
//! move, disconnect) is handed to one loop in [`network::Server::run`] and handled
//! to completion before the next one starts, so a move racing a disconnect for
//! the same player can never leave a dangling tagger.
//!
//! ### UDP-Based Communication
//! Clients speak bincode-encoded [`shared::Packet`]s over UDP. Delivery is
//! best-effort; state converges through later `PlayerMoved` broadcasts.
//!
//! ## Module Organization
//!
//! - [`player_registry`]: player records, spawn, movement with freeze and clamping
//! - [`tagger`]: the "who is it" state machine and tag scan
//! - [`game`]: the world aggregate tying registry and tagger together
//! - [`router`]: maps session events to transitions and addressed packets
//! - [`client_manager`]: transport sessions, identities, heartbeats, timeouts
//! - [`network`]: socket I/O and the event loop
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::{Server, ServerSettings};
//! use shared::GameConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), server::BoxError> {
//!     let mut server = Server::new(
//!         "127.0.0.1:3000",
//!         GameConfig::default(),
//!         ServerSettings::default(),
//!     )
//!     .await?;
//!
//!     server.run().await
//! }
//! ```

pub mod client_manager;
pub mod game;
pub mod network;
pub mod player_registry;
pub mod router;
pub mod tagger;
pub mod utils;

/// Error type returned by the fallible network entry points
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
