pub mod call_control;
pub mod reflection;
pub mod session;
pub mod stt;
pub mod tts;

pub use call_control::{CallControl, CallControlError};
pub use reflection::{Reflection, ReflectionError, ReflectionGenerator};
pub use session::{CallSession, MediaSink, SessionEvent, SessionState};
pub use stt::{BaseSTT, STTConfig, STTError, STTResult, create_stt_provider};
pub use tts::{BaseTTS, TTSConfig, TTSError};
