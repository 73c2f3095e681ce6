use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;

use log::{debug, warn};

/// Ordered in-memory buffer for the encoded chunks emitted while a
/// recording session is running. Chunks are appended in delivery order
/// and concatenated once, when the session stops.
pub struct ChunkBuffer {
    chunks: Mutex<VecDeque<Vec<u8>>>,
    total_bytes: Mutex<usize>,
}

impl ChunkBuffer {
    pub fn new() -> Self {
        Self {
            chunks: Mutex::new(VecDeque::new()),
            total_bytes: Mutex::new(0),
        }
    }

    /// Append one chunk. Zero-length chunks are dropped, not an error.
    pub fn push(&self, data: Vec<u8>) {
        if data.is_empty() {
            debug!("[storage] dropping zero-length chunk");
            return;
        }

        let mut chunks = self.chunks.lock().unwrap();
        let mut total_bytes = self.total_bytes.lock().unwrap();

        *total_bytes += data.len();
        chunks.push_back(data);
    }

    pub fn len(&self) -> usize {
        self.chunks.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn total_bytes(&self) -> usize {
        *self.total_bytes.lock().unwrap()
    }

    /// All buffered chunks concatenated in append order.
    pub fn concat(&self) -> Vec<u8> {
        let chunks = self.chunks.lock().unwrap();
        let total = *self.total_bytes.lock().unwrap();
        let mut out = Vec::with_capacity(total);
        for chunk in chunks.iter() {
            out.extend_from_slice(chunk);
        }
        out
    }

    /// Write the concatenated buffer to `path` in one shot. An empty
    /// buffer still writes an (empty) file.
    pub fn save_to_file(&self, path: &Path) -> Result<(), String> {
        if self.is_empty() {
            warn!("[storage] chunk buffer is empty, saving empty file");
        }
        let data = self.concat();
        std::fs::write(path, &data)
            .map_err(|e| format!("failed to write {}: {}", path.display(), e))?;
        Ok(())
    }
}

impl Default for ChunkBuffer {
    fn default() -> Self {
        Self::new()
    }
}
