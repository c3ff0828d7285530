//! Long-polling payloads: several frames in one HTTP body.

/// Separator between frames in a polling payload.
pub const RECORD_SEPARATOR: char = '\x1e';

/// Join frames into a single polling body.
pub fn encode_payload<I, S>(frames: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut body = String::new();
    for (i, frame) in frames.into_iter().enumerate() {
        if i > 0 {
            body.push(RECORD_SEPARATOR);
        }
        body.push_str(frame.as_ref());
    }
    body
}

/// Split a polling body into frames, skipping empty records.
pub fn decode_payload(body: &str) -> impl Iterator<Item = &str> {
    body.split(RECORD_SEPARATOR).filter(|frame| !frame.is_empty())
}
