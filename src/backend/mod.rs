//! Typed access to the queue backend's public endpoints.

pub mod client;
pub mod mock;
pub mod types;

pub use client::{HttpBackend, MonitorBackend, asset_base, resolve_url};
pub use mock::{MockBackend, MockTts};
pub use types::{
    ClientType, DingSoundResponse, Labeled, ServingClient, SpeechPayload, Staff, Video,
    VideosResponse, WindowId, WindowState, WindowsResponse,
};
