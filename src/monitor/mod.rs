//! Live monitoring: polling, transition detection and the announcement queue.

pub mod controller;
pub mod detector;
pub mod poller;
pub mod queue;
pub mod queue_number;
pub mod template;
pub mod types;

pub use controller::{MonitorController, MonitorSettings};
pub use detector::TransitionDetector;
pub use poller::StatePoller;
pub use queue::AnnouncementQueue;
pub use queue_number::{queue_counter, spoken_counter};
pub use template::AnnouncementTemplate;
pub use types::{AnnouncementItem, AnnouncementKey, DedupView, LastAnnounced};
