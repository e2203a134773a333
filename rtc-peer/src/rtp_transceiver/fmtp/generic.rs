use super::*;

/// GenericFmtp matches when every parameter both sides carry has the same value.
#[derive(Debug, PartialEq)]
pub(crate) struct GenericFmtp {
    pub(crate) mime_type: String,
    pub(crate) parameters: HashMap<String, String>,
}

impl Fmtp for GenericFmtp {
    fn mime_type(&self) -> &str {
        self.mime_type.as_str()
    }

    /// Match returns true if g and b are compatible fmtp descriptions
    /// The generic implementation is used for MimeTypes that are not defined
    fn match_fmtp(&self, f: &(dyn Fmtp)) -> bool {
        let c = match f.as_any().downcast_ref::<GenericFmtp>() {
            Some(c) => c,
            None => return false,
        };

        if !self.mime_type.eq_ignore_ascii_case(&c.mime_type) {
            return false;
        }

        for (k, v) in &self.parameters {
            if let Some(vb) = c.parameters.get(k) {
                if !vb.eq_ignore_ascii_case(v) {
                    return false;
                }
            }
        }

        for (k, v) in &c.parameters {
            if let Some(va) = self.parameters.get(k) {
                if !va.eq_ignore_ascii_case(v) {
                    return false;
                }
            }
        }

        true
    }

    fn parameter(&self, key: &str) -> Option<&String> {
        self.parameters.get(key)
    }

    fn as_any(&self) -> &(dyn Any) {
        self
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_generic_fmtp_compare() {
        let tests = vec![
            ("minptime=10;useinbandfec=1", "useinbandfec=1;minptime=10", true),
            ("minptime=10;useinbandfec=1", "minptime=10", true),
            ("minptime=10", "minptime=20", false),
            ("", "apt=96", true),
            ("apt=96", "APT=96", true),
        ];

        for (a, b, expected) in tests {
            let fa = parse("audio/opus", a);
            let fb = parse("audio/OPUS", b);
            assert_eq!(fa.match_fmtp(&*fb), expected, "{a} vs {b}");
            assert_eq!(fb.match_fmtp(&*fa), expected, "{b} vs {a}");
        }
    }
}
