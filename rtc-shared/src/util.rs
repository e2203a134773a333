use rand::{rng, Rng};

/// MatchFunc classifies a datagram by its leading bytes.
pub type MatchFunc = fn(&[u8]) -> bool;

/// match_range accepts packets with the first byte in [lower..=upper]
pub fn match_range(lower: u8, upper: u8, buf: &[u8]) -> bool {
    match buf.first() {
        Some(b) => *b >= lower && *b <= upper,
        None => false,
    }
}

/// MatchFuncs as described in RFC7983
/// <https://tools.ietf.org/html/rfc7983>
///              +----------------+
///              |        [0..3] -+--> forward to STUN
///              |                |
///              |      [16..19] -+--> forward to ZRTP
///              |                |
///  packet -->  |      [20..63] -+--> forward to DTLS
///              |                |
///              |      [64..79] -+--> forward to TURN Channel
///              |                |
///              |    [128..191] -+--> forward to RTP/RTCP
///              +----------------+
pub fn match_stun(b: &[u8]) -> bool {
    match_range(0, 3, b)
}

/// match_dtls is a MatchFunc that accepts packets with the first byte in [20..63]
/// as defied in RFC7983
pub fn match_dtls(b: &[u8]) -> bool {
    match_range(20, 63, b)
}

// match_srtp_or_srtcp is a MatchFunc that accepts packets with the first byte in [128..191]
// as defied in RFC7983
pub fn match_srtp_or_srtcp(b: &[u8]) -> bool {
    match_range(128, 191, b)
}

pub fn is_rtcp(buf: &[u8]) -> bool {
    // Not long enough to determine RTP/RTCP
    if buf.len() < 4 {
        return false;
    }

    let rtcp_packet_type = buf[1];
    (192..=223).contains(&rtcp_packet_type)
}

/// match_srtp is a MatchFunc that only matches SRTP and not SRTCP
pub fn match_srtp(buf: &[u8]) -> bool {
    match_srtp_or_srtcp(buf) && !is_rtcp(buf)
}

/// match_srtcp is a MatchFunc that only matches SRTCP and not SRTP
pub fn match_srtcp(buf: &[u8]) -> bool {
    match_srtp_or_srtcp(buf) && is_rtcp(buf)
}

const RUNES_ALPHA: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const RUNES_ALPHA_NUMBER: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const RUNES_ICE_CHAR: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789+/";

/// math_rand_alpha generates a mathematical random alphabet sequence of the requested length.
pub fn math_rand_alpha(n: usize) -> String {
    generate_crypto_random_string(n, RUNES_ALPHA)
}

/// math_rand_alpha_number generates a mathematical random alphabet and number sequence of the requested length.
pub fn math_rand_alpha_number(n: usize) -> String {
    generate_crypto_random_string(n, RUNES_ALPHA_NUMBER)
}

/// rand_ice_char generates a string over the ice-char alphabet of RFC 8839.
pub fn rand_ice_char(n: usize) -> String {
    generate_crypto_random_string(n, RUNES_ICE_CHAR)
}

pub fn generate_crypto_random_string(n: usize, runes: &[u8]) -> String {
    let mut rng = rng();

    (0..n)
        .map(|_| {
            let idx = rng.random_range(0..runes.len());
            runes[idx] as char
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_match_funcs() {
        let rtp = [0x80u8, 96, 0, 1];
        let rtcp = [0x80u8, 200, 0, 6];
        let dtls = [22u8, 254, 253];
        let stun = [0u8, 1, 0, 0];

        let tests: Vec<(&[u8], bool, bool, bool, bool)> = vec![
            // buf, stun, dtls, srtp, srtcp
            (&rtp, false, false, true, false),
            (&rtcp, false, false, false, true),
            (&dtls, false, true, false, false),
            (&stun, true, false, false, false),
            (&[], false, false, false, false),
            (&[64u8, 0, 0, 0], false, false, false, false),
        ];

        for (buf, is_stun, is_dtls, is_srtp, is_srtcp) in tests {
            assert_eq!(match_stun(buf), is_stun, "{buf:?}");
            assert_eq!(match_dtls(buf), is_dtls, "{buf:?}");
            assert_eq!(match_srtp(buf), is_srtp, "{buf:?}");
            assert_eq!(match_srtcp(buf), is_srtcp, "{buf:?}");
        }
    }

    #[test]
    fn test_random_generator_collision() {
        let mut rands = std::collections::HashSet::new();
        for _ in 0..100 {
            let s = math_rand_alpha(16);
            assert_eq!(s.len(), 16);
            assert!(rands.insert(s), "random string collision");
        }
    }

    #[test]
    fn test_rand_ice_char_alphabet() {
        let s = rand_ice_char(64);
        assert!(s.bytes().all(|b| RUNES_ICE_CHAR.contains(&b)));
    }
}
