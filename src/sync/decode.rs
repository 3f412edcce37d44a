/// How the fetched text reached the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeOutcome {
    /// Base58-decoded into valid UTF-8.
    Base58,
    /// Not Base58 text (non-ASCII, or outside the alphabet).
    NotBase58(String),
    /// Base58 decoded but the bytes were not UTF-8.
    NotUtf8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub text: String,
    pub outcome: DecodeOutcome,
}

impl Decoded {
    pub fn was_base58(&self) -> bool { self.outcome == DecodeOutcome::Base58 }
}

/// Try Base58 first; on any failure the raw text passes through unchanged.
///
/// Surrounding ASCII whitespace is deliberately ignored for the decode
/// attempt, since raw file hosts append a trailing newline to encoded
/// payloads. Whitespace inside the text still fails the alphabet check, and
/// the fallback always returns `raw` untrimmed. Blank input is never Base58.
pub fn decode_payload(raw: &str) -> Decoded {
    let candidate = raw.trim_matches(|c: char| c.is_ascii_whitespace());
    if candidate.is_empty() {
        return plain(raw, DecodeOutcome::NotBase58("empty content".to_string()));
    }
    if !candidate.is_ascii() {
        return plain(raw, DecodeOutcome::NotBase58("non-ASCII content".to_string()));
    }
    let bytes = match bs58::decode(candidate).into_vec() {
        Ok(b) => b,
        Err(e) => return plain(raw, DecodeOutcome::NotBase58(e.to_string())),
    };
    match String::from_utf8(bytes) {
        Ok(text) => Decoded { text, outcome: DecodeOutcome::Base58 },
        Err(_) => plain(raw, DecodeOutcome::NotUtf8),
    }
}

fn plain(raw: &str, outcome: DecodeOutcome) -> Decoded {
    Decoded { text: raw.to_string(), outcome }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_json_passes_through_unchanged() {
        let raw = "{\"api_site\": {\"a\": {\"name\": \"A\", \"api\": \"https://a.example\"}}}\n";
        let d = decode_payload(raw);
        assert_eq!(d.text, raw);
        assert!(matches!(d.outcome, DecodeOutcome::NotBase58(_)));
    }

    #[test]
    fn non_ascii_text_is_not_base58() {
        let d = decode_payload("影视");
        assert_eq!(d.text, "影视");
        assert!(matches!(d.outcome, DecodeOutcome::NotBase58(_)));
    }

    #[test]
    fn encoded_json_round_trips() {
        let json = "{\"api_site\":{\"k\":{\"name\":\"电影\",\"api\":\"https://k.example/api\"}}}";
        let encoded = bs58::encode(json.as_bytes()).into_string();
        let d = decode_payload(&format!("{}\n", encoded));
        assert!(d.was_base58());
        assert_eq!(d.text, json);
    }

    #[test]
    fn blank_body_is_not_base58() {
        for raw in ["", "\n", " \r\n\t"] {
            let d = decode_payload(raw);
            assert_eq!(d.text, raw);
            assert_eq!(d.outcome, DecodeOutcome::NotBase58("empty content".to_string()));
        }
    }

    #[test]
    fn inner_whitespace_fails_the_alphabet_check() {
        let encoded = bs58::encode(b"{}").into_string();
        let raw = format!("{} {}", encoded, encoded);
        let d = decode_payload(&raw);
        assert_eq!(d.text, raw);
        assert!(matches!(d.outcome, DecodeOutcome::NotBase58(_)));
    }

    #[test]
    fn invalid_utf8_falls_back_to_raw() {
        let encoded = bs58::encode([0xff, 0xfe, 0xfd]).into_string();
        let d = decode_payload(&encoded);
        assert_eq!(d.outcome, DecodeOutcome::NotUtf8);
        assert_eq!(d.text, encoded);
    }
}
