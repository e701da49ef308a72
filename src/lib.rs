//! Campus Voice - voice and text assistant for LBS College of Engineering, Kasaragod
//!
//! This library provides:
//! - A campus gazetteer with keyword lookup, distances and map links
//! - FAQ grounding for a chat-completion upstream
//! - English/Malayalam language classification and speech text preparation
//! - A voice interaction controller driving capture, answers and playback
//! - The HTTP gateway serving `/college-chat` and `/sarvam-tts`
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                  Voice client                        │
//! │   Capture  │  Controller  │  Playback  │  Geo       │
//! └────────────────────┬────────────────────────────────┘
//!                      │ HTTP
//! ┌────────────────────▼────────────────────────────────┐
//! │                    Gateway                           │
//! │   /college-chat  │  /sarvam-tts  │  /health         │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │          Chat completions   │   Sarvam TTS          │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod gazetteer;
pub mod knowledge;
pub mod language;
pub mod navigation;
pub mod prompt;
pub mod protocol;
pub mod providers;
pub mod speech_text;
pub mod transcript;
pub mod voice;

pub use config::Config;
pub use error::{Error, Result};
pub use language::{Language, classify};
