//! Speech rendering and audio playback

pub mod artifact;
pub mod backends;
pub mod player;
pub mod process;
pub mod renderer;
pub mod voices;

pub use artifact::AudioArtifact;
pub use backends::{create_backend, Backend};
pub use player::AudioPlayer;
pub use process::ProcessRegistry;
pub use renderer::{SpeechRenderer, VoiceParams};
