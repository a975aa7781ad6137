//! Fixed settle waits
//!
//! The host page gives no completion signal for its AJAX loads, dropdown
//! animations or popups, so every synchronization point is a worst-case fixed
//! delay taken through a [`Clock`].

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Named settle durations, one per suspension point of a traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettlePolicy {
    /// After selecting a group, while the grid is repopulated
    #[serde(with = "millis")]
    pub group_activation: Duration,

    /// After clicking a leaf's dropdown trigger
    #[serde(with = "millis")]
    pub menu_expand: Duration,

    /// After clicking an owner entry, while the popup loads its content
    #[serde(with = "millis")]
    pub popup_load: Duration,

    /// After closing (or failing to close) a popup
    #[serde(with = "millis")]
    pub popup_close: Duration,
}

impl Default for SettlePolicy {
    fn default() -> Self {
        Self {
            group_activation: Duration::from_millis(3000),
            menu_expand: Duration::from_millis(300),
            popup_load: Duration::from_millis(1500),
            popup_close: Duration::from_millis(400),
        }
    }
}

impl SettlePolicy {
    /// The same duration for every wait (handy for local test pages)
    pub fn uniform(duration: Duration) -> Self {
        Self { group_activation: duration, menu_expand: duration, popup_load: duration, popup_close: duration }
    }

    pub fn duration(&self, wait: SettleWait) -> Duration {
        match wait {
            SettleWait::GroupActivation => self.group_activation,
            SettleWait::MenuExpand => self.menu_expand,
            SettleWait::PopupLoad => self.popup_load,
            SettleWait::PopupClose => self.popup_close,
        }
    }
}

/// Which suspension point a wait belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettleWait {
    GroupActivation,
    MenuExpand,
    PopupLoad,
    PopupClose,
}

/// Source of elapsed time for settle waits
pub trait Clock: Send + Sync {
    fn sleep(&self, wait: SettleWait, duration: Duration);
}

/// Blocks the calling thread for real
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn sleep(&self, _wait: SettleWait, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Records every requested wait without sleeping
///
/// Clones share the same log, so a test can keep one clone and hand the other
/// to the engine.
#[derive(Debug, Clone, Default)]
pub struct RecordingClock {
    waits: Arc<Mutex<Vec<(SettleWait, Duration)>>>,
}

impl RecordingClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn waits(&self) -> Vec<(SettleWait, Duration)> {
        self.waits.lock().map(|w| w.clone()).unwrap_or_default()
    }

    /// Total virtual time spent waiting
    pub fn elapsed(&self) -> Duration {
        self.waits().iter().map(|(_, d)| *d).sum()
    }

    pub fn count(&self, wait: SettleWait) -> usize {
        self.waits().iter().filter(|(w, _)| *w == wait).count()
    }
}

impl Clock for RecordingClock {
    fn sleep(&self, wait: SettleWait, duration: Duration) {
        if let Ok(mut waits) = self.waits.lock() {
            waits.push((wait, duration));
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
