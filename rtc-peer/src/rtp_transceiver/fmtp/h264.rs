use super::*;

fn profile_level_id_matches(a: &str, b: &str) -> bool {
    let aa = match hex::decode(a) {
        Ok(aa) if aa.len() >= 2 => aa,
        _ => return false,
    };
    let bb = match hex::decode(b) {
        Ok(bb) if bb.len() >= 2 => bb,
        _ => return false,
    };

    aa[0] == bb[0] && aa[1] == bb[1]
}

/// H264Fmtp compares packetization-mode and the profile part of
/// profile-level-id; the level may differ.
#[derive(Debug, PartialEq)]
pub(crate) struct H264Fmtp {
    pub(crate) parameters: HashMap<String, String>,
}

impl Fmtp for H264Fmtp {
    fn mime_type(&self) -> &str {
        "video/h264"
    }

    /// Match returns true if h and b are compatible fmtp descriptions
    /// Based on RFC6184 Section 8.2.2:
    ///   The parameters identifying a media format configuration for H.264
    ///   are profile-level-id and packetization-mode.  These media format
    ///   configuration parameters (except for the level part of profile-
    ///   level-id) MUST be used symmetrically; that is, the answerer MUST
    ///   either maintain all configuration parameters or remove the media
    ///   format (payload type) completely if one or more of the parameter
    ///   values are not supported.
    ///     Informative note: The requirement for symmetric use does not
    ///     apply for the level part of profile-level-id and does not apply
    ///     for the other stream properties and capability parameters.
    fn match_fmtp(&self, f: &(dyn Fmtp)) -> bool {
        let c = match f.as_any().downcast_ref::<H264Fmtp>() {
            Some(c) => c,
            None => return false,
        };

        // test packetization-mode
        let hpmode = self.parameters.get("packetization-mode");
        let cpmode = c.parameters.get("packetization-mode");
        // an absent packetization-mode means mode 0
        if hpmode.map(|s| s.as_str()).unwrap_or("0") != cpmode.map(|s| s.as_str()).unwrap_or("0")
        {
            return false;
        }

        // test profile-level-id
        match (
            self.parameters.get("profile-level-id"),
            c.parameters.get("profile-level-id"),
        ) {
            (Some(hplid), Some(cplid)) => profile_level_id_matches(hplid, cplid),
            (None, None) => true,
            _ => false,
        }
    }

    fn parameter(&self, key: &str) -> Option<&String> {
        self.parameters.get(key)
    }

    fn as_any(&self) -> &(dyn Any) {
        self
    }
}
