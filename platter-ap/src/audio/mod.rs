//! Audio subsystem: WAV loading, sound buffers, the looping source and the
//! cpal output session.

pub mod loader;
pub mod output;
pub mod resampler;
pub mod session;
pub mod source;
pub mod types;

pub use loader::{WaveData, WaveLoader};
pub use output::{write_device_list, AudioOutput};
pub use session::{AudioSession, SessionConfig};
pub use source::{Listener, LoopingSource, SourceHandle, SourceParams, SourceSlot, Vec3};
pub use types::{AudioFrame, PcmFormat, SoundBuffer};
