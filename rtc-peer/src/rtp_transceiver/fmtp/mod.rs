//! SDP `a=fmtp` parameter parsing and codec-aware comparison.

pub(crate) mod generic;
pub(crate) mod h264;

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use generic::GenericFmtp;
use h264::H264Fmtp;

/// Fmtp is a parsed `a=fmtp` line that knows whether another line describes
/// a compatible configuration of the same codec.
pub(crate) trait Fmtp: fmt::Debug {
    /// mime_type returns the MimeType associated with the fmtp
    fn mime_type(&self) -> &str;

    /// match_fmtp compares two fmtp descriptions for compatibility based on the mime_type
    fn match_fmtp(&self, f: &(dyn Fmtp)) -> bool;

    /// parameter returns a value for the associated key if contained in the parsed fmtp string
    fn parameter(&self, key: &str) -> Option<&String>;

    fn as_any(&self) -> &(dyn Any);
}

/// parse parses an fmtp string based on the MimeType
pub(crate) fn parse(mime_type: &str, line: &str) -> Box<dyn Fmtp> {
    let mut parameters = HashMap::new();
    for p in line.split(';') {
        let pp: Vec<&str> = p.trim().splitn(2, '=').collect();
        let key = pp[0].trim().to_lowercase();
        if key.is_empty() {
            continue;
        }
        let value = if pp.len() > 1 {
            pp[1].trim().to_owned()
        } else {
            String::new()
        };
        parameters.insert(key, value);
    }

    if mime_type.eq_ignore_ascii_case("video/h264") {
        Box::new(H264Fmtp {
            parameters: parameters.clone(),
        })
    } else {
        Box::new(GenericFmtp {
            mime_type: mime_type.to_owned(),
            parameters,
        })
    }
}
