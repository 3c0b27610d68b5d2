//! Per-call audio buffering and silence detection
//!
//! Accumulates inbound audio chunks for one call and decides when the caller
//! has finished speaking. End-of-utterance is purely inactivity-based: there
//! is no voice-activity detection on the audio content itself, so the
//! threshold is a precision/latency trade-off chosen by configuration.
//!
//! The buffer is a bounded ring. Concurrent call count is unbounded, so
//! memory per call must not be; once the window is full the oldest chunk is
//! evicted.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use base64::Engine as _;

/// Milliseconds of speech one chunk is assumed to carry (8kHz mulaw,
/// 160-byte frames).
const CHUNK_DURATION_MS: u64 = 20;

/// One ephemeral unit of inbound audio. Held only inside the buffer window,
/// never persisted.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Base64-encoded payload as delivered by the transport. Opaque here.
    pub payload: String,
    /// Transport timestamp in milliseconds.
    pub timestamp_ms: u64,
    /// Local receipt time; drives silence detection.
    pub received_at: Instant,
}

/// Buffer observability counters. Not used for control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferStats {
    /// Chunks currently in the window.
    pub buffered_chunks: usize,
    /// Chunks received over the life of the call (survives eviction/clear).
    pub total_chunks: u64,
    /// Payload bytes received over the life of the call.
    pub total_bytes: u64,
    /// Rough spoken duration received, in milliseconds.
    pub estimated_duration_ms: u64,
}

/// Bounded audio window for one call.
#[derive(Debug)]
pub struct AudioBuffer {
    chunks: VecDeque<AudioChunk>,
    capacity: usize,
    total_chunks: u64,
    total_bytes: u64,
}

impl AudioBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            chunks: VecDeque::with_capacity(capacity.min(128)),
            capacity: capacity.max(1),
            total_chunks: 0,
            total_bytes: 0,
        }
    }

    /// Append a chunk, evicting the oldest once the window is full.
    ///
    /// The payload is not validated here; a corrupt chunk surfaces later as
    /// an empty continuous buffer, never as a failure on the audio path.
    pub fn push(&mut self, payload: impl Into<String>, timestamp_ms: u64) {
        let payload = payload.into();
        self.total_chunks += 1;
        self.total_bytes += payload.len() as u64;

        self.chunks.push_back(AudioChunk {
            payload,
            timestamp_ms,
            received_at: Instant::now(),
        });

        if self.chunks.len() > self.capacity {
            self.chunks.pop_front();
        }
    }

    /// True once the gap since the last chunk's receipt exceeds `threshold`.
    /// False on an empty buffer: no audio means nothing to conclude.
    pub fn silence_detected(&self, threshold: Duration) -> bool {
        match self.chunks.back() {
            Some(last) => last.received_at.elapsed() >= threshold,
            None => false,
        }
    }

    /// Concatenate all buffered chunks into one decoded payload, in arrival
    /// order, for handoff to transcription.
    ///
    /// Any chunk that fails to decode yields an empty result: a corrupt
    /// chunk must not abort the call, and half an utterance is worse than
    /// none.
    pub fn continuous(&self) -> Vec<u8> {
        if self.chunks.is_empty() {
            return Vec::new();
        }

        let mut out = Vec::with_capacity(self.chunks.len() * 160);
        for chunk in &self.chunks {
            match base64::engine::general_purpose::STANDARD.decode(&chunk.payload) {
                Ok(bytes) => out.extend_from_slice(&bytes),
                Err(err) => {
                    tracing::warn!(
                        timestamp_ms = chunk.timestamp_ms,
                        error = %err,
                        "dropping undecodable audio window"
                    );
                    return Vec::new();
                }
            }
        }
        out
    }

    /// Empty the window. Called after every handoff to transcription and at
    /// teardown. Lifetime counters are kept.
    pub fn clear(&mut self) {
        self.chunks.clear();
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn stats(&self) -> BufferStats {
        BufferStats {
            buffered_chunks: self.chunks.len(),
            total_chunks: self.total_chunks,
            total_bytes: self.total_bytes,
            estimated_duration_ms: self.total_chunks * CHUNK_DURATION_MS,
        }
    }
}

/// Slice synthesized audio into base64 transport frames of `chunk_bytes`
/// each (~20ms of 8kHz mulaw at the 160-byte default).
pub fn split_outbound(audio: &[u8], chunk_bytes: usize) -> Vec<String> {
    let chunk_bytes = chunk_bytes.max(1);
    audio
        .chunks(chunk_bytes)
        .map(|frame| base64::engine::general_purpose::STANDARD.encode(frame))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(bytes: &[u8]) -> String {
        base64::engine::general_purpose::STANDARD.encode(bytes)
    }

    #[test]
    fn test_empty_buffer_never_reports_silence() {
        let buffer = AudioBuffer::new(100);
        assert!(!buffer.silence_detected(Duration::from_millis(0)));
    }

    #[test]
    fn test_silence_after_gap() {
        let mut buffer = AudioBuffer::new(100);
        buffer.push(encoded(b"aa"), 0);

        assert!(!buffer.silence_detected(Duration::from_millis(200)));
        std::thread::sleep(Duration::from_millis(30));
        assert!(buffer.silence_detected(Duration::from_millis(20)));
    }

    #[test]
    fn test_new_chunk_resets_the_silence_window() {
        let mut buffer = AudioBuffer::new(100);
        buffer.push(encoded(b"aa"), 0);
        std::thread::sleep(Duration::from_millis(30));
        buffer.push(encoded(b"bb"), 20);

        assert!(!buffer.silence_detected(Duration::from_millis(25)));
    }

    #[test]
    fn test_capacity_is_a_hard_bound() {
        let mut buffer = AudioBuffer::new(5);
        for i in 0..50 {
            buffer.push(encoded(&[i as u8]), i);
        }
        assert_eq!(buffer.len(), 5);
        assert_eq!(buffer.stats().total_chunks, 50);
    }

    #[test]
    fn test_eviction_keeps_newest_chunks() {
        let mut buffer = AudioBuffer::new(2);
        buffer.push(encoded(b"one"), 0);
        buffer.push(encoded(b"two"), 20);
        buffer.push(encoded(b"three"), 40);

        assert_eq!(buffer.continuous(), b"twothree");
    }

    #[test]
    fn test_continuous_concatenates_in_arrival_order() {
        let mut buffer = AudioBuffer::new(100);
        buffer.push(encoded(b"bon"), 0);
        buffer.push(encoded(b"jour"), 20);

        assert_eq!(buffer.continuous(), b"bonjour");
    }

    #[test]
    fn test_corrupt_chunk_yields_empty_result() {
        let mut buffer = AudioBuffer::new(100);
        buffer.push(encoded(b"bon"), 0);
        buffer.push("not//valid//base64!!!", 20);

        assert!(buffer.continuous().is_empty());
        // The buffer itself is untouched; the caller decides to clear.
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_clear_empties_window_but_keeps_counters() {
        let mut buffer = AudioBuffer::new(100);
        buffer.push(encoded(b"aa"), 0);
        buffer.clear();

        assert!(buffer.is_empty());
        assert_eq!(buffer.stats().total_chunks, 1);
        assert!(!buffer.silence_detected(Duration::from_millis(0)));
    }

    #[test]
    fn test_split_outbound_frames() {
        let audio = vec![7u8; 400];
        let frames = split_outbound(&audio, 160);
        assert_eq!(frames.len(), 3);

        let decoded: Vec<u8> = frames
            .iter()
            .flat_map(|f| {
                base64::engine::general_purpose::STANDARD
                    .decode(f)
                    .unwrap()
            })
            .collect();
        assert_eq!(decoded, audio);
    }
}
