use super::*;
use crate::peer_connection::configuration::RTCConfigurationBuilder;

#[test]
fn test_new_api() -> Result<()> {
    let mut s = SettingEngine::default();
    s.detach_data_channels();
    let mut m = MediaEngine::default();
    m.register_default_codecs()?;

    let api = APIBuilder::new()
        .with_setting_engine(s)
        .with_media_engine(m)
        .build();

    assert!(api.setting_engine.detach.data_channels);
    assert!(!api.media_engine.get_codecs_by_kind(RtpCodecKind::Video).is_empty());
    assert!(api.interceptor_registry.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_api_requires_transport_collaborators() {
    let api = APIBuilder::new().build();

    assert_eq!(
        api.new_ice_gatherer(RTCIceGatherOptions::default()).err(),
        Some(Error::ErrNoTransportFactory("ICE agent factory"))
    );
    assert_eq!(
        api.new_peer_connection(RTCConfigurationBuilder::new().build())
            .await
            .err(),
        Some(Error::ErrNoTransportFactory("ICE agent factory"))
    );
}
