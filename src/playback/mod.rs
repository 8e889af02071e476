//! Line-by-line playback: sessions, the controller and UI events

pub mod controller;
pub mod events;
pub mod session;

pub use controller::PlaybackController;
pub use events::{Activity, ChannelSink, ErrorKind, EventSink, NullSink, PlaybackEvent};
pub use session::{PlaybackSession, SessionHandle, SessionState, SessionStatus};
