use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::atomic::{AtomicU64, Ordering};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{debug, trace, warn};

use crate::form::FileHandle;

static GENERATION: AtomicU64 = AtomicU64::new(1);

struct PreviewResult {
    field: String,
    generation: u64,
    result: Result<String, String>,
}

/// Reads image files into data urls on the rayon pool.
///
/// Each request is tagged with a generation. A result is only handed out if
/// its generation is still the one registered for the field, so cancelled or
/// superseded reads never land in the preview map.
pub struct PreviewLoader {
    sender: Sender<PreviewResult>,
    receiver: Receiver<PreviewResult>,
    pending: HashMap<String, u64>,
}

impl Default for PreviewLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl PreviewLoader {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            sender,
            receiver,
            pending: HashMap::new(),
        }
    }

    /// Starts reading `handle` for `field`. Returns false for non image files.
    pub fn request(&mut self, field: &str, handle: &FileHandle) -> bool {
        let Some(mime) = handle.mime.clone().filter(|_| handle.is_image()) else {
            self.cancel(field);
            return false;
        };

        let generation = GENERATION.fetch_add(1, Ordering::Relaxed);
        self.pending.insert(field.to_string(), generation);

        let sender = self.sender.clone();
        let path: PathBuf = handle.path.clone();
        let field = field.to_string();
        debug!("Reading preview for {field} from {}", path.display());
        rayon::spawn(move || {
            let result = fs::read(&path)
                .map(|bytes| data_url(&mime, &bytes))
                .map_err(|e| e.to_string());
            // The receiver is gone if the form was dropped, nothing to report then.
            let _ = sender.send(PreviewResult {
                field,
                generation,
                result,
            });
        });
        true
    }

    pub fn cancel(&mut self, field: &str) {
        if self.pending.remove(field).is_some() {
            trace!("Cancelled preview for {field}");
        }
    }

    pub fn cancel_all(&mut self) {
        self.pending.clear();
    }

    pub fn is_pending(&self, field: &str) -> bool {
        self.pending.contains_key(field)
    }

    /// Drains finished reads. Returns `(field, data_url)` for every read that
    /// is still current.
    pub fn poll(&mut self) -> Vec<(String, String)> {
        let mut done = Vec::new();
        while let Ok(msg) = self.receiver.try_recv() {
            if self.pending.get(&msg.field) != Some(&msg.generation) {
                trace!("Dropping stale preview for {}", msg.field);
                continue;
            }
            self.pending.remove(&msg.field);
            match msg.result {
                Ok(url) => done.push((msg.field, url)),
                Err(e) => warn!("Preview for {} failed: {e}", msg.field),
            }
        }
        done
    }
}

pub fn data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}
