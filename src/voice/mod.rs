//! Voice output
//!
//! Speech recognition and wake-word detection happen on the client; the
//! gateway only synthesizes the reply audio.

mod tts;

pub use tts::TextToSpeech;
