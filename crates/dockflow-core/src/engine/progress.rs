//! Progress events and the reporting callback.

#[derive(Debug, Clone)]
pub enum Progress {
    StageStart { name: String },
    StageFinish,

    PluginStart { stage: String, uid: String },
    PluginFinish { uid: String },

    /// Periodic queue status from the liveness monitor.
    QueueUpdate { completed: u64, total: u64 },

    Message(String),
}

pub type ProgressCallback = Box<dyn Fn(Progress) + Send + Sync>;

#[derive(Default)]
pub struct ProgressReporter {
    callback: Option<ProgressCallback>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }
}
