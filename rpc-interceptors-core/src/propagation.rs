//! Trace context carried in call metadata.
//!
//! The default trace header, `uber-trace-id`, holds
//! `{trace-id}:{span-id}:{parent-span-id}:{flags}` with hexadecimal ids.
//! Some proxies URL-encode the separators as `%3A`; both forms are accepted.

use std::fmt;

use crate::metadata::Metadata;

/// Default metadata key carrying propagated trace context.
pub const DEFAULT_TRACE_HEADER: &str = "uber-trace-id";

/// Sampled bit of [`TraceContext::flags`].
pub const FLAG_SAMPLED: u8 = 0x01;

/// Errors from parsing a trace header value.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TraceContextError {
    #[error("expected 4 fields in trace header, got {0}")]
    FieldCount(usize),

    #[error("invalid {field} in trace header: {value:?}")]
    InvalidField { field: &'static str, value: String },

    #[error("trace header has zero {0}")]
    ZeroId(&'static str),
}

/// Parent context propagated by an upstream caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TraceContext {
    pub trace_id: u128,
    pub span_id: u64,
    pub parent_span_id: u64,
    pub flags: u8,
}

impl TraceContext {
    /// Parse a trace header value.
    pub fn parse(value: &str) -> Result<Self, TraceContextError> {
        let decoded;
        let value = if value.contains('%') {
            decoded = value.replace("%3A", ":").replace("%3a", ":");
            decoded.as_str()
        } else {
            value
        };

        let fields: Vec<&str> = value.split(':').collect();
        let [trace_id, span_id, parent_span_id, flags] = fields.as_slice() else {
            return Err(TraceContextError::FieldCount(fields.len()));
        };

        let trace_id = parse_hex(trace_id, "trace id", 32, |s| u128::from_str_radix(s, 16))?;
        let span_id = parse_hex(span_id, "span id", 16, |s| u64::from_str_radix(s, 16))?;
        let parent_span_id = parse_hex(parent_span_id, "parent span id", 16, |s| {
            u64::from_str_radix(s, 16)
        })?;
        let flags = parse_hex(flags, "flags", 2, |s| u8::from_str_radix(s, 16))?;

        if trace_id == 0 {
            return Err(TraceContextError::ZeroId("trace id"));
        }
        if span_id == 0 {
            return Err(TraceContextError::ZeroId("span id"));
        }

        Ok(Self {
            trace_id,
            span_id,
            parent_span_id,
            flags,
        })
    }

    /// Read the trace context stored under `header_name`.
    ///
    /// Returns `None` when the header is absent, repeated, or malformed.
    pub fn from_metadata(md: &Metadata, header_name: &str) -> Option<Self> {
        match md.values(header_name) {
            [Some(value)] => Self::parse(value).ok(),
            _ => None,
        }
    }

    pub fn is_sampled(&self) -> bool {
        self.flags & FLAG_SAMPLED != 0
    }
}

impl fmt::Display for TraceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:x}:{:x}:{:x}:{:x}",
            self.trace_id, self.span_id, self.parent_span_id, self.flags
        )
    }
}

fn parse_hex<T, E>(
    value: &str,
    field: &'static str,
    max_digits: usize,
    parse: impl FnOnce(&str) -> Result<T, E>,
) -> Result<T, TraceContextError> {
    let invalid = || TraceContextError::InvalidField {
        field,
        value: value.to_string(),
    };
    // from_str_radix accepts a leading '+', which is not valid here
    if value.is_empty()
        || value.len() > max_digits
        || !value.bytes().all(|b| b.is_ascii_hexdigit())
    {
        return Err(invalid());
    }
    parse(value).map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        let ctx = TraceContext::parse("abc123:def456:0:1").unwrap();
        assert_eq!(ctx.trace_id, 0xabc123);
        assert_eq!(ctx.span_id, 0xdef456);
        assert_eq!(ctx.parent_span_id, 0);
        assert_eq!(ctx.flags, 1);
        assert!(ctx.is_sampled());
    }

    #[test]
    fn test_parse_128_bit_trace_id() {
        let ctx = TraceContext::parse("0123456789abcdef0123456789abcdef:1:2:0").unwrap();
        assert_eq!(ctx.trace_id, 0x0123456789abcdef0123456789abcdef);
        assert!(!ctx.is_sampled());
    }

    #[test]
    fn test_parse_url_encoded() {
        let ctx = TraceContext::parse("abc%3Adef%3A0%3A1").unwrap();
        assert_eq!(ctx.trace_id, 0xabc);
        assert_eq!(ctx.span_id, 0xdef);
    }

    #[test]
    fn test_parse_wrong_field_count() {
        assert_eq!(
            TraceContext::parse("abc:def:1"),
            Err(TraceContextError::FieldCount(3))
        );
        assert_eq!(
            TraceContext::parse(""),
            Err(TraceContextError::FieldCount(1))
        );
    }

    #[test]
    fn test_parse_invalid_fields() {
        assert!(matches!(
            TraceContext::parse("xyz:def:0:1"),
            Err(TraceContextError::InvalidField { field: "trace id", .. })
        ));
        assert!(matches!(
            TraceContext::parse("abc:+def:0:1"),
            Err(TraceContextError::InvalidField { field: "span id", .. })
        ));
        assert!(matches!(
            TraceContext::parse("abc:10000000000000000:0:1"),
            Err(TraceContextError::InvalidField { field: "span id", .. })
        ));
        assert!(matches!(
            TraceContext::parse("abc:def:0:100"),
            Err(TraceContextError::InvalidField { field: "flags", .. })
        ));
    }

    #[test]
    fn test_parse_zero_ids() {
        assert_eq!(
            TraceContext::parse("0:def:0:1"),
            Err(TraceContextError::ZeroId("trace id"))
        );
        assert_eq!(
            TraceContext::parse("abc:0:0:1"),
            Err(TraceContextError::ZeroId("span id"))
        );
    }

    #[test]
    fn test_display_matches_header_form() {
        let ctx = TraceContext {
            trace_id: 0xabc,
            span_id: 0xdef,
            parent_span_id: 0,
            flags: 1,
        };
        assert_eq!(ctx.to_string(), "abc:def:0:1");
        assert_eq!(TraceContext::parse(&ctx.to_string()), Ok(ctx));
    }

    #[test]
    fn test_from_metadata() {
        let md = Metadata::pairs([("Uber-Trace-Id", "abc:def:0:1")]);
        let ctx = TraceContext::from_metadata(&md, DEFAULT_TRACE_HEADER).unwrap();
        assert_eq!(ctx.span_id, 0xdef);

        assert!(TraceContext::from_metadata(&md, "x-other-trace").is_none());
    }

    #[test]
    fn test_from_metadata_ignores_repeated_or_malformed() {
        let md = Metadata::pairs([
            (DEFAULT_TRACE_HEADER, "abc:def:0:1"),
            (DEFAULT_TRACE_HEADER, "123:456:0:1"),
        ]);
        assert!(TraceContext::from_metadata(&md, DEFAULT_TRACE_HEADER).is_none());

        let md = Metadata::pairs([(DEFAULT_TRACE_HEADER, "garbage")]);
        assert!(TraceContext::from_metadata(&md, DEFAULT_TRACE_HEADER).is_none());
    }
}
