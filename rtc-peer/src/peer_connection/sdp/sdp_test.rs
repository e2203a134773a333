use std::io::Cursor;

use sdp::description::common::Attribute;

use super::*;
use crate::peer_connection::configuration::media_engine::MIME_TYPE_VP8;

fn media_with(kind: &str, attributes: Vec<(&str, Option<&str>)>) -> MediaDescription {
    MediaDescription {
        media_name: MediaName {
            media: kind.to_owned(),
            port: RangedPort {
                value: 9,
                range: None,
            },
            protos: vec![],
            formats: vec![],
        },
        attributes: attributes
            .into_iter()
            .map(|(key, value)| Attribute {
                key: key.to_owned(),
                value: value.map(|v| v.to_owned()),
            })
            .collect(),
        ..Default::default()
    }
}

fn session_with(
    attributes: Vec<(&str, &str)>,
    media_descriptions: Vec<MediaDescription>,
) -> SessionDescription {
    SessionDescription {
        attributes: attributes
            .into_iter()
            .map(|(key, value)| Attribute {
                key: key.to_owned(),
                value: Some(value.to_owned()),
            })
            .collect(),
        media_descriptions,
        ..Default::default()
    }
}

#[test]
fn test_extract_fingerprint() -> Result<()> {
    // session level
    let s = session_with(vec![("fingerprint", "sha-256 AB:CD")], vec![]);
    let fingerprint = extract_fingerprint(&s)?;
    assert_eq!(fingerprint.algorithm, "sha-256");
    assert_eq!(fingerprint.value, "ab:cd");

    // media level only
    let s = session_with(
        vec![],
        vec![media_with("audio", vec![("fingerprint", Some("sha-256 AB:CD"))])],
    );
    assert_eq!(extract_fingerprint(&s)?.value, "ab:cd");

    // session and media agree, hex case aside
    let s = session_with(
        vec![("fingerprint", "sha-256 ab:cd")],
        vec![media_with("audio", vec![("fingerprint", Some("sha-256 AB:CD"))])],
    );
    assert!(extract_fingerprint(&s).is_ok());

    // missing
    let s = session_with(vec![], vec![]);
    assert_eq!(
        extract_fingerprint(&s),
        Err(Error::ErrSessionDescriptionNoFingerprint)
    );

    // invalid
    let s = session_with(vec![("fingerprint", "foo")], vec![]);
    assert_eq!(
        extract_fingerprint(&s),
        Err(Error::ErrSessionDescriptionInvalidFingerprint)
    );

    // conflicting
    let s = session_with(
        vec![("fingerprint", "sha-256 AB:CD")],
        vec![media_with("audio", vec![("fingerprint", Some("sha-256 EF:01"))])],
    );
    assert_eq!(
        extract_fingerprint(&s),
        Err(Error::ErrSessionDescriptionConflictingFingerprints)
    );

    // two session level fingerprints that disagree
    let s = session_with(
        vec![
            ("fingerprint", "sha-256 AB:CD"),
            ("fingerprint", "sha-256 EF:01"),
        ],
        vec![media_with("audio", vec![])],
    );
    assert_eq!(
        extract_fingerprint(&s),
        Err(Error::ErrSessionDescriptionConflictingFingerprints)
    );

    // a repeated media level fingerprint is checked too
    let s = session_with(
        vec![],
        vec![media_with(
            "audio",
            vec![
                ("fingerprint", Some("sha-256 AB:CD")),
                ("fingerprint", Some("sha-256 EF:01")),
            ],
        )],
    );
    assert_eq!(
        extract_fingerprint(&s),
        Err(Error::ErrSessionDescriptionConflictingFingerprints)
    );

    Ok(())
}

#[test]
fn test_extract_ice_details() -> Result<()> {
    const DEFAULT_UFRAG: &str = "defaultUfrag";
    const DEFAULT_PWD: &str = "defaultPwd";

    // missing ice-pwd
    let s = session_with(
        vec![],
        vec![media_with("audio", vec![("ice-ufrag", Some(DEFAULT_UFRAG))])],
    );
    assert_eq!(
        extract_ice_details(&s),
        Err(Error::ErrSessionDescriptionMissingIcePwd)
    );

    // missing ice-ufrag
    let s = session_with(
        vec![],
        vec![media_with("audio", vec![("ice-pwd", Some(DEFAULT_PWD))])],
    );
    assert_eq!(
        extract_ice_details(&s),
        Err(Error::ErrSessionDescriptionMissingIceUfrag)
    );

    // session level
    let s = session_with(
        vec![("ice-ufrag", DEFAULT_UFRAG), ("ice-pwd", DEFAULT_PWD)],
        vec![],
    );
    let (ufrag, pwd, candidates) = extract_ice_details(&s)?;
    assert_eq!(ufrag, DEFAULT_UFRAG);
    assert_eq!(pwd, DEFAULT_PWD);
    assert!(candidates.is_empty());

    // media level with a candidate
    let s = session_with(
        vec![],
        vec![media_with(
            "audio",
            vec![
                ("ice-ufrag", Some(DEFAULT_UFRAG)),
                ("ice-pwd", Some(DEFAULT_PWD)),
                (
                    "candidate",
                    Some("1 1 udp 2130706431 192.168.1.10 50000 typ host"),
                ),
            ],
        )],
    );
    let (ufrag, pwd, candidates) = extract_ice_details(&s)?;
    assert_eq!(ufrag, DEFAULT_UFRAG);
    assert_eq!(pwd, DEFAULT_PWD);
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].address, "192.168.1.10");
    assert_eq!(candidates[0].port, 50000);

    // conflicting ice-ufrag
    let s = session_with(
        vec![("ice-ufrag", "invalidUfrag"), ("ice-pwd", DEFAULT_PWD)],
        vec![media_with(
            "audio",
            vec![
                ("ice-ufrag", Some(DEFAULT_UFRAG)),
                ("ice-pwd", Some(DEFAULT_PWD)),
            ],
        )],
    );
    assert_eq!(
        extract_ice_details(&s),
        Err(Error::ErrSessionDescriptionConflictingIceUfrag)
    );

    // conflicting ice-pwd
    let s = session_with(
        vec![("ice-ufrag", DEFAULT_UFRAG), ("ice-pwd", "invalidPwd")],
        vec![media_with(
            "audio",
            vec![
                ("ice-ufrag", Some(DEFAULT_UFRAG)),
                ("ice-pwd", Some(DEFAULT_PWD)),
            ],
        )],
    );
    assert_eq!(
        extract_ice_details(&s),
        Err(Error::ErrSessionDescriptionConflictingIcePwd)
    );

    // repeated session level credentials
    let s = session_with(
        vec![
            ("ice-ufrag", DEFAULT_UFRAG),
            ("ice-ufrag", "invalidUfrag"),
            ("ice-pwd", DEFAULT_PWD),
        ],
        vec![],
    );
    assert_eq!(
        extract_ice_details(&s),
        Err(Error::ErrSessionDescriptionConflictingIceUfrag)
    );
    let s = session_with(
        vec![
            ("ice-ufrag", DEFAULT_UFRAG),
            ("ice-pwd", DEFAULT_PWD),
            ("ice-pwd", "invalidPwd"),
        ],
        vec![],
    );
    assert_eq!(
        extract_ice_details(&s),
        Err(Error::ErrSessionDescriptionConflictingIcePwd)
    );

    Ok(())
}

#[test]
fn test_track_details_from_sdp() {
    let s = session_with(
        vec![],
        vec![
            media_with(
                "foobar",
                vec![
                    ("mid", Some("0")),
                    ("sendrecv", None),
                    ("ssrc", Some("1000 msid:unknown_trk_label unknown_trk_guid")),
                ],
            ),
            media_with(
                "audio",
                vec![
                    ("mid", Some("1")),
                    ("sendrecv", None),
                    ("ssrc", Some("2000 msid:audio_trk_label audio_trk_guid")),
                ],
            ),
            media_with(
                "video",
                vec![
                    ("mid", Some("2")),
                    ("sendrecv", None),
                    ("ssrc-group", Some("FID 3000 4000")),
                    ("ssrc", Some("3000 msid:video_trk_label video_trk_guid")),
                    ("ssrc", Some("4000 msid:rtx_trk_label rtx_trck_guid")),
                ],
            ),
            media_with(
                "video",
                vec![
                    ("mid", Some("3")),
                    ("sendonly", None),
                    ("msid", Some("video_stream_id video_trk_id")),
                    ("ssrc", Some("5000")),
                ],
            ),
            media_with(
                "video",
                vec![
                    ("mid", Some("4")),
                    ("inactive", None),
                    ("ssrc", Some("6000")),
                ],
            ),
            media_with(
                "video",
                vec![
                    ("mid", Some("5")),
                    ("recvonly", None),
                    ("ssrc", Some("7000")),
                ],
            ),
        ],
    );

    let tracks = track_details_from_sdp(&s, true);
    assert_eq!(tracks.len(), 3);
    assert!(track_details_for_ssrc(&tracks, 1000).is_none());

    let track = track_details_for_ssrc(&tracks, 2000).expect("audio track");
    assert_eq!(track.kind, RtpCodecKind::Audio);
    assert_eq!(track.mid, "1");
    assert_eq!(track.stream_id, "audio_trk_label");
    assert_eq!(track.id, "audio_trk_guid");

    let track = track_details_for_ssrc(&tracks, 3000).expect("video track");
    assert_eq!(track.kind, RtpCodecKind::Video);
    assert_eq!(track.repair_ssrc, 4000);
    assert!(track_details_for_ssrc(&tracks, 4000).is_none());

    let track = track_details_for_ssrc(&tracks, 5000).expect("msid track");
    assert_eq!(track.stream_id, "video_stream_id");
    assert_eq!(track.id, "video_trk_id");

    assert!(track_details_for_ssrc(&tracks, 6000).is_none());
    assert!(track_details_for_ssrc(&tracks, 7000).is_none());

    // inactive sections count when they are not excluded
    let tracks = track_details_from_sdp(&s, false);
    assert!(track_details_for_ssrc(&tracks, 6000).is_some());
}

#[test]
fn test_track_details_from_sdp_simulcast() {
    let s = session_with(
        vec![],
        vec![media_with(
            "video",
            vec![
                ("mid", Some("0")),
                ("sendonly", None),
                ("msid", Some("stream track")),
                ("rid", Some("q send")),
                ("rid", Some("h send")),
                ("rid", Some("f send")),
                ("simulcast", Some("send q;h;~f")),
            ],
        )],
    );

    let tracks = track_details_from_sdp(&s, true);
    assert_eq!(tracks.len(), 1);
    assert_eq!(tracks[0].rids, vec!["q", "h", "f"]);
    assert!(tracks[0].ssrcs.is_empty());
    assert!(track_details_for_rid(&tracks, "0", "h").is_some());
    assert!(track_details_for_rid(&tracks, "1", "h").is_none());

    let rids = get_rids(&s.media_descriptions[0]);
    assert_eq!(rids.len(), 3);
    assert_eq!(rids[0].direction, SimulcastDirection::Send);
    assert!(!rids[1].paused);
    assert!(rids[2].paused);
}

#[test]
fn test_simulcast_rid_parse() {
    let rid = SimulcastRid::try_from("f send pt=97;max-width=1280").expect("valid rid");
    assert_eq!(rid.id, "f");
    assert_eq!(rid.direction, SimulcastDirection::Send);
    assert_eq!(rid.params, "pt=97;max-width=1280");

    assert_eq!(
        SimulcastRid::try_from("f"),
        Err(Error::SimulcastRidParseErrorSyntaxIdDirSplit)
    );
    assert_eq!(
        SimulcastRid::try_from("f sideways"),
        Err(Error::SimulcastRidParseErrorUnknownDirection)
    );
}

#[test]
fn test_description_is_plan_b() -> Result<()> {
    let plan_b = "v=0\r\n\
o=- 0 2 IN IP4 127.0.0.1\r\n\
s=-\r\n\
t=0 0\r\n\
m=video 9 UDP/TLS/RTP/SAVPF 96\r\n\
a=mid:video\r\n\
a=rtpmap:96 VP8/90000\r\n";
    let desc = RTCSessionDescription::offer(plan_b.to_owned())?;
    assert!(description_is_plan_b(Some(&desc)));

    let two_tracks = "v=0\r\n\
o=- 0 2 IN IP4 127.0.0.1\r\n\
s=-\r\n\
t=0 0\r\n\
m=video 9 UDP/TLS/RTP/SAVPF 96\r\n\
a=mid:0\r\n\
a=rtpmap:96 VP8/90000\r\n\
a=ssrc:1 msid:stream track-a\r\n\
a=ssrc:2 msid:stream track-b\r\n";
    let desc = RTCSessionDescription::offer(two_tracks.to_owned())?;
    assert!(description_is_plan_b(Some(&desc)));

    let unified = "v=0\r\n\
o=- 0 2 IN IP4 127.0.0.1\r\n\
s=-\r\n\
t=0 0\r\n\
m=video 9 UDP/TLS/RTP/SAVPF 96\r\n\
a=mid:0\r\n\
a=rtpmap:96 VP8/90000\r\n\
a=ssrc:1 msid:stream track-a\r\n";
    let desc = RTCSessionDescription::offer(unified.to_owned())?;
    assert!(!description_is_plan_b(Some(&desc)));
    assert!(!description_is_plan_b(None));

    Ok(())
}

#[test]
fn test_codecs_and_extensions_from_media_description() -> Result<()> {
    let raw = "v=0\r\n\
o=- 0 2 IN IP4 127.0.0.1\r\n\
s=-\r\n\
t=0 0\r\n\
m=video 9 UDP/TLS/RTP/SAVPF 0 96\r\n\
a=mid:0\r\n\
a=extmap:3 urn:ietf:params:rtp-hdrext:sdes:mid\r\n\
a=rtpmap:96 VP8/90000\r\n\
a=fmtp:96 max-fr=30\r\n\
a=rtcp-fb:96 nack pli\r\n\
a=rtcp-fb:96 goog-remb\r\n";
    let mut reader = Cursor::new(raw.as_bytes());
    let s = SessionDescription::unmarshal(&mut reader)?;
    let media = &s.media_descriptions[0];

    let codecs = codecs_from_media_description(media)?;
    assert_eq!(codecs.len(), 1);
    assert_eq!(codecs[0].payload_type, 96);
    assert_eq!(codecs[0].rtp_codec.mime_type, MIME_TYPE_VP8);
    assert_eq!(codecs[0].rtp_codec.clock_rate, 90000);
    assert_eq!(codecs[0].rtp_codec.sdp_fmtp_line, "max-fr=30");
    assert_eq!(
        codecs[0].rtp_codec.rtcp_feedback,
        vec![
            RTCPFeedback {
                typ: "nack".to_owned(),
                parameter: "pli".to_owned(),
            },
            RTCPFeedback {
                typ: "goog-remb".to_owned(),
                parameter: String::new(),
            },
        ]
    );

    let extensions = rtp_extensions_from_media_description(media)?;
    assert_eq!(
        extensions,
        vec![("urn:ietf:params:rtp-hdrext:sdes:mid".to_owned(), 3)]
    );

    Ok(())
}

#[test]
fn test_add_candidates_dedup_and_end_of_candidates() -> Result<()> {
    let candidate = RTCIceCandidate::unmarshal("1 2 udp 2130706431 10.0.0.1 4000 typ host")?;
    let m = MediaDescription::new_jsep_media_description("audio".to_owned(), vec![]);

    let m = add_candidates_to_media_descriptions(
        &[candidate.clone(), candidate],
        m,
        RTCIceGatheringState::Complete,
    );
    let candidates: Vec<&Attribute> = m.attributes.iter().filter(|a| a.is_ice_candidate()).collect();
    assert_eq!(candidates.len(), 1);
    assert_eq!(
        candidates[0].value.as_deref(),
        Some("1 1 udp 2130706431 10.0.0.1 4000 typ host")
    );

    let m = add_candidates_to_media_descriptions(&[], m, RTCIceGatheringState::Complete);
    assert_eq!(
        m.attributes
            .iter()
            .filter(|a| a.key == ATTR_KEY_END_OF_CANDIDATES)
            .count(),
        1
    );

    Ok(())
}

#[tokio::test]
async fn test_populate_sdp_data_only() -> Result<()> {
    let media_engine = Arc::new(MediaEngine::default());
    let fingerprints = vec![RTCDtlsFingerprint {
        algorithm: "sha-256".to_owned(),
        value: "ab:cd".to_owned(),
    }];
    let ice_params = RTCIceParameters {
        username_fragment: "ufrag".to_owned(),
        password: "pwd".to_owned(),
        ice_lite: false,
    };
    let media_sections = vec![MediaSection {
        id: "0".to_owned(),
        data: true,
        ..Default::default()
    }];

    let d = SessionDescription::new_jsep_session_description(false);
    let d = populate_sdp(
        d,
        &fingerprints,
        &media_engine,
        &[],
        &ice_params,
        &media_sections,
        PopulateSdpParams {
            is_plan_b: false,
            media_description_fingerprint: false,
            is_ice_lite: true,
            connection_role: ConnectionRole::Actpass,
            ice_gathering_state: RTCIceGatheringState::Complete,
            match_bundle_group: None,
        },
    )
    .await?;

    assert_eq!(d.attribute(ATTR_KEY_GROUP).map(|s| s.as_str()), Some("BUNDLE 0"));
    assert_eq!(
        d.attribute(ATTR_KEY_FINGERPRINT).map(|s| s.as_str()),
        Some("sha-256 AB:CD")
    );
    assert!(is_lite_set(&d));
    assert!(have_application_media_section(&d));

    let m = &d.media_descriptions[0];
    assert_eq!(m.media_name.media, MEDIA_SECTION_APPLICATION);
    assert_eq!(get_mid_value(m).map(|s| s.as_str()), Some("0"));
    assert_eq!(m.attribute(ATTR_KEY_CONNECTION_SETUP), Some(Some("actpass")));
    assert_eq!(m.attribute(ATTR_KEY_ICE_UFRAG), Some(Some("ufrag")));
    assert_eq!(m.attribute(ATTR_KEY_END_OF_CANDIDATES), Some(None));

    // an answer only bundles what the offer bundled
    let d = populate_sdp(
        SessionDescription::new_jsep_session_description(false),
        &fingerprints,
        &media_engine,
        &[],
        &ice_params,
        &media_sections,
        PopulateSdpParams {
            is_plan_b: false,
            media_description_fingerprint: true,
            is_ice_lite: false,
            connection_role: ConnectionRole::Active,
            ice_gathering_state: RTCIceGatheringState::Gathering,
            match_bundle_group: Some("BUNDLE 1".to_owned()),
        },
    )
    .await?;
    assert!(d.attribute(ATTR_KEY_GROUP).is_none());
    assert!(d.attribute(ATTR_KEY_FINGERPRINT).is_none());
    assert_eq!(
        d.media_descriptions[0].attribute(ATTR_KEY_FINGERPRINT),
        Some(Some("sha-256 AB:CD"))
    );

    Ok(())
}

#[test]
fn test_update_sdp_origin() {
    let mut origin = Origin::default();

    let mut first = SessionDescription::new_jsep_session_description(false);
    update_sdp_origin(&mut origin, &mut first);
    assert_eq!(origin.session_id, first.origin.session_id);
    assert_eq!(origin.session_version, first.origin.session_version);

    let mut second = SessionDescription::new_jsep_session_description(false);
    update_sdp_origin(&mut origin, &mut second);
    assert_eq!(second.origin.session_id, first.origin.session_id);
    assert_eq!(
        second.origin.session_version,
        first.origin.session_version + 1
    );
}
