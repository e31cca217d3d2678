/// Upper bound on undispatched bytes (partial line plus collected data).
pub const MAX_BUFFERED_BYTES: usize = 1 << 20;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SseError {
    #[error("event stream buffered more than {limit} bytes without dispatching")]
    Overflow { limit: usize },
}

/// One dispatched `text/event-stream` message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub event: String,
    pub data: String,
    pub id: Option<String>,
}

/// Incremental `text/event-stream` decoder. Feed it raw chunks as they come
/// off the wire; complete frames are returned as soon as their blank line
/// arrives. Chunks may split lines or UTF-8 sequences anywhere. Lines end in
/// LF, CRLF or a bare CR.
#[derive(Debug)]
pub struct SseDecoder {
    pending: Vec<u8>,
    after_cr: bool,
    event: Option<String>,
    data: Vec<String>,
    data_bytes: usize,
    id: Option<String>,
    limit: usize,
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::with_limit(MAX_BUFFERED_BYTES)
    }
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            pending: Vec::new(),
            after_cr: false,
            event: None,
            data: Vec::new(),
            data_bytes: 0,
            id: None,
            limit,
        }
    }

    /// Decode `chunk`. Fails once more than the limit is held without a
    /// frame being dispatched; the stream should then be dropped.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<SseFrame>, SseError> {
        self.pending.extend_from_slice(chunk);

        let mut frames = Vec::new();
        loop {
            // The LF of a CRLF split across chunks
            if self.after_cr && !self.pending.is_empty() {
                if self.pending[0] == b'\n' {
                    self.pending.remove(0);
                }
                self.after_cr = false;
            }

            let Some(end) = self
                .pending
                .iter()
                .position(|b| *b == b'\n' || *b == b'\r')
            else {
                break;
            };

            let mut line: Vec<u8> = self.pending.drain(..=end).collect();
            if line.pop() == Some(b'\r') {
                self.after_cr = true;
            }

            let line = String::from_utf8_lossy(&line);
            if let Some(frame) = self.process_line(&line) {
                frames.push(frame);
            }
        }

        if self.pending.len() + self.data_bytes > self.limit {
            return Err(SseError::Overflow { limit: self.limit });
        }
        Ok(frames)
    }

    fn process_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None; // comment / keep-alive
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => {
                self.data_bytes += value.len();
                self.data.push(value.to_string());
            }
            "id" => self.id = Some(value.to_string()),
            _ => {} // retry and unknown fields
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        let event = self.event.take();
        self.data_bytes = 0;
        if self.data.is_empty() {
            return None;
        }

        Some(SseFrame {
            event: event
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| "message".to_string()),
            data: std::mem::take(&mut self.data).join("\n"),
            id: self.id.clone(),
        })
    }
}
