//! Stream Decoder
//!
//! Turns an arbitrarily chunked byte stream into [`ProtocolEvent`]s.
//!
//! # Framing
//!
//! ```text
//! data: {"text":"Hel"}\n
//! \n
//! data: {"text":"lo"}\n
//! : keep-alive\n
//! data: [DONE]\n
//! ```
//!
//! Records are newline-terminated. Only records starting with `data: ` carry
//! anything; everything else (blank separators, comments, other SSE fields)
//! is skipped. Bytes after the last newline stay in a carry-over buffer until
//! the next chunk completes them, so a record is only ever parsed whole. The
//! buffer holds raw bytes rather than text, which keeps a multi-byte UTF-8
//! sequence split across chunks intact.

use serde::Deserialize;

use crate::events::ProtocolEvent;

/// Prefix of records that carry a payload
pub const DATA_PREFIX: &str = "data: ";

/// Payload that terminates the stream
pub const DONE_SENTINEL: &str = "[DONE]";

#[derive(Deserialize)]
struct DataPayload {
    #[serde(default)]
    text: Option<String>,
}

enum Record {
    Skip,
    Delta(String),
    Done,
}

/// Incremental decoder with a carry-over buffer
#[derive(Debug, Default)]
pub struct EventDecoder {
    /// Bytes received but not yet terminated by a newline
    buffer: Vec<u8>,
    /// Set once a terminal event has been produced
    finished: bool,
    /// Complete records that could not be parsed
    discarded: usize,
}

impl EventDecoder {
    /// Create a new decoder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and return the events it completes, in order.
    ///
    /// Once `Done` has been produced the decoder ignores all further input.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<ProtocolEvent> {
        let mut events = Vec::new();
        if self.finished {
            return events;
        }

        self.buffer.extend_from_slice(chunk);

        let mut consumed = 0;
        while let Some(pos) = self.buffer[consumed..].iter().position(|&b| b == b'\n') {
            let end = consumed + pos;
            let record = self.parse_record(consumed, end);
            consumed = end + 1;

            match record {
                Record::Skip => {}
                Record::Delta(text) => events.push(ProtocolEvent::TextDelta { text }),
                Record::Done => {
                    self.finished = true;
                    self.buffer.clear();
                    events.push(ProtocolEvent::Done);
                    return events;
                }
            }
        }

        self.buffer.drain(..consumed);
        events
    }

    /// Signal that the byte stream ended naturally.
    ///
    /// An unterminated trailing record is decoded as-is, then an implicit
    /// `Done` follows unless the stream already produced one.
    pub fn finish(&mut self) -> Vec<ProtocolEvent> {
        let mut events = Vec::new();
        if self.finished {
            return events;
        }

        if !self.buffer.is_empty() {
            if let Record::Delta(text) = self.parse_record(0, self.buffer.len()) {
                events.push(ProtocolEvent::TextDelta { text });
            }
            self.buffer.clear();
        }

        self.finished = true;
        events.push(ProtocolEvent::Done);
        events
    }

    /// Whether a terminal event has been produced
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Number of complete records discarded as malformed
    #[must_use]
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    /// Bytes currently held in the carry-over buffer
    #[must_use]
    pub fn pending_bytes(&self) -> usize {
        self.buffer.len()
    }

    fn parse_record(&mut self, start: usize, end: usize) -> Record {
        let line = &self.buffer[start..end];
        let line = line.strip_suffix(b"\r").unwrap_or(line);

        let Some(payload) = line.strip_prefix(DATA_PREFIX.as_bytes()) else {
            return Record::Skip;
        };

        if payload == DONE_SENTINEL.as_bytes() {
            return Record::Done;
        }

        match serde_json::from_slice::<DataPayload>(payload) {
            Ok(DataPayload {
                text: Some(text), ..
            }) if !text.is_empty() => Record::Delta(text),
            Ok(_) => {
                tracing::debug!(
                    record = %String::from_utf8_lossy(payload),
                    "Skipping stream record without text"
                );
                Record::Skip
            }
            Err(e) => {
                self.discarded += 1;
                tracing::warn!(
                    error = %e,
                    record = %String::from_utf8_lossy(payload),
                    "Discarding malformed stream record"
                );
                Record::Skip
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const STREAM: &[u8] = b"data: {\"text\":\"Hello\"}\n\n\
data: {\"text\":\" there\"}\n\n\
: keep-alive\n\n\
data: {\"text\":\", caf\xc3\xa9 \xe2\x98\x95\"}\n\n\
data: [DONE]\n\n";

    fn decode(chunks: &[&[u8]]) -> Vec<ProtocolEvent> {
        let mut decoder = EventDecoder::new();
        let mut events = Vec::new();
        for chunk in chunks {
            events.extend(decoder.feed(chunk));
        }
        events.extend(decoder.finish());
        events
    }

    fn concat_text(events: &[ProtocolEvent]) -> String {
        events
            .iter()
            .filter_map(|e| match e {
                ProtocolEvent::TextDelta { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_split_record_is_reassembled() {
        let events = decode(&[b"data: {\"te", b"xt\":\"hi\"}\n\ndata: [DONE]\n\n"]);
        assert_eq!(events, vec![ProtocolEvent::text("hi"), ProtocolEvent::Done]);
    }

    #[test]
    fn test_whole_and_split_record_decode_identically() {
        let record: &[u8] = b"data: {\"text\":\"same either way\"}\n";
        let whole = decode(&[record]);
        for offset in 0..=record.len() {
            let (a, b) = record.split_at(offset);
            assert_eq!(decode(&[a, b]), whole, "split at byte {offset}");
        }
    }

    #[test]
    fn test_every_split_offset_yields_same_text() {
        let expected = decode(&[STREAM]);
        assert_eq!(concat_text(&expected), "Hello there, café ☕");

        for offset in 0..=STREAM.len() {
            let (a, b) = STREAM.split_at(offset);
            let events = decode(&[a, b]);
            assert_eq!(events, expected, "split at byte {offset}");
        }
    }

    #[test]
    fn test_byte_at_a_time() {
        let chunks: Vec<&[u8]> = STREAM.chunks(1).collect();
        assert_eq!(decode(&chunks), decode(&[STREAM]));
    }

    #[test]
    fn test_exactly_one_terminal_event() {
        let events = decode(&[STREAM]);
        let terminals = events.iter().filter(|e| e.is_terminal()).count();
        assert_eq!(terminals, 1);
        assert_eq!(events.last(), Some(&ProtocolEvent::Done));
    }

    #[test]
    fn test_nothing_after_done() {
        let mut decoder = EventDecoder::new();
        let events = decoder.feed(b"data: [DONE]\n\ndata: {\"text\":\"late\"}\n\n");
        assert_eq!(events, vec![ProtocolEvent::Done]);
        assert!(decoder.is_finished());

        assert!(decoder.feed(b"data: {\"text\":\"later\"}\n").is_empty());
        assert!(decoder.finish().is_empty());
    }

    #[test]
    fn test_natural_close_yields_implicit_done() {
        let events = decode(&[b"data: {\"text\":\"partial answer\"}\n\n"]);
        assert_eq!(
            events,
            vec![ProtocolEvent::text("partial answer"), ProtocolEvent::Done]
        );
    }

    #[test]
    fn test_unterminated_trailing_record_is_decoded_on_close() {
        let events = decode(&[b"data: {\"text\":\"a\"}\n", b"data: {\"text\":\"b\"}"]);
        assert_eq!(
            events,
            vec![
                ProtocolEvent::text("a"),
                ProtocolEvent::text("b"),
                ProtocolEvent::Done
            ]
        );
    }

    #[test]
    fn test_crlf_framing() {
        let events = decode(&[b"data: {\"text\":\"x\"}\r\n\r\ndata: [DONE]\r\n"]);
        assert_eq!(events, vec![ProtocolEvent::text("x"), ProtocolEvent::Done]);
    }

    #[test]
    fn test_non_data_records_ignored() {
        let events = decode(&[b"\n: ping\nevent: message\nid: 7\ndata: {\"text\":\"y\"}\n"]);
        assert_eq!(events, vec![ProtocolEvent::text("y"), ProtocolEvent::Done]);
    }

    #[test]
    fn test_malformed_complete_record_is_discarded() {
        let mut decoder = EventDecoder::new();
        let mut events = decoder.feed(b"data: {not json}\n\ndata: {\"text\":\"ok\"}\n\n");
        events.extend(decoder.finish());

        assert_eq!(events, vec![ProtocolEvent::text("ok"), ProtocolEvent::Done]);
        assert_eq!(decoder.discarded(), 1);
    }

    #[test]
    fn test_partial_record_is_never_parsed() {
        let mut decoder = EventDecoder::new();
        assert!(decoder.feed(b"data: {\"text\":\"hal").is_empty());
        assert_eq!(decoder.discarded(), 0);
        assert!(decoder.pending_bytes() > 0);

        assert_eq!(decoder.feed(b"f\"}\n"), vec![ProtocolEvent::text("half")]);
        assert_eq!(decoder.pending_bytes(), 0);
    }

    #[test]
    fn test_records_without_text_are_skipped() {
        let events = decode(&[b"data: {\"error\":\"late failure\"}\ndata: {\"text\":\"\"}\n"]);
        assert_eq!(events, vec![ProtocolEvent::Done]);
    }
}
