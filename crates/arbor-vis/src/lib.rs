//! Arbor Visualization
//!
//! Step-by-step playback of red-black tree operations recorded by
//! [`arbor_tree`].
//!
//! # Architecture
//!
//! - **Playback**: one authoritative step index over a recorded sequence,
//!   advanced manually or by a timer task
//! - **Session**: the committed tree plus the command surface (insert,
//!   delete, update, build, load, play, pause, step, stop)
//! - **REST API**: issue commands, read frames and status
//! - **WebSocket**: streams every frame, already laid out, to the frontend
//!
//! # Usage
//!
//! ```no_run
//! use arbor_vis::{Session, VisConfig, VisServer};
//!
//! # async fn run() -> arbor_vis::Result<()> {
//! let mut session = Session::new();
//! session.build_animated(vec![41, 38, 31, 12, 19, 8]);
//!
//! let server = VisServer::new(session, VisConfig::from_env()?);
//! server.serve().await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod playback;
mod server;
mod session;
mod view;

pub use config::{parse_values, VisConfig};
pub use error::{Error, Result};
pub use playback::{drive, Frame, Playable, Playback, PlaybackSpeed, PlaybackState, PlaybackStatus};
pub use server::{AppState, VisServer};
pub use session::{Session, TreeFrame};
pub use view::FrameView;
