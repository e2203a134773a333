use super::*;
use shared::error::flatten_errs;

/// TrackLocalStaticRTP  is a TrackLocal that has a pre-set codec and accepts RTP Packets.
/// If you wish to send a media.Sample use TrackLocalStaticSample
#[derive(Debug)]
pub struct TrackLocalStaticRTP {
    pub(crate) bindings: Mutex<Vec<Arc<TrackBinding>>>,
    codec: RTCRtpCodec,
    id: String,
    rid: Option<String>,
    stream_id: String,
}

impl TrackLocalStaticRTP {
    /// returns a TrackLocalStaticRTP without rid.
    pub fn new(codec: RTCRtpCodec, id: String, stream_id: String) -> Self {
        TrackLocalStaticRTP {
            codec,
            bindings: Mutex::new(vec![]),
            id,
            rid: None,
            stream_id,
        }
    }

    /// returns a TrackLocalStaticRTP with rid, for one layer of a simulcast
    /// sender.
    pub fn new_with_rid(codec: RTCRtpCodec, id: String, rid: String, stream_id: String) -> Self {
        TrackLocalStaticRTP {
            codec,
            bindings: Mutex::new(vec![]),
            id,
            rid: Some(rid),
            stream_id,
        }
    }

    /// codec gets the Codec of the track
    pub fn codec(&self) -> RTCRtpCodec {
        self.codec.clone()
    }

    pub async fn any_binding_paused(&self) -> bool {
        let bindings = self.bindings.lock().await;
        bindings.iter().any(|b| b.is_sender_paused())
    }

    pub async fn all_binding_paused(&self) -> bool {
        let bindings = self.bindings.lock().await;
        bindings.iter().all(|b| b.is_sender_paused())
    }

    /// write_rtp_with_extensions writes a RTP Packet to the TrackLocalStaticRTP
    /// If one PeerConnection fails the packets will still be sent to
    /// all PeerConnections. The error message will contain the ID of the failed
    /// PeerConnections so you can remove them
    ///
    /// Bindings whose sender is paused are skipped; the packet's sequence
    /// number is still consumed by the caller.
    ///
    /// Extensions that are already configured on the packet are overwritten by extensions in
    /// `extensions`, keyed by URI and mapped to the id negotiated on each binding.
    pub async fn write_rtp_with_extensions(
        &self,
        p: &rtp::packet::Packet,
        extensions: &[(&str, Bytes)],
    ) -> Result<usize> {
        let mut n = 0;
        let mut write_errs = vec![];
        let mut pkt = p.clone();

        let bindings = {
            let bindings = self.bindings.lock().await;
            bindings.clone()
        };

        for b in bindings {
            if b.is_sender_paused() {
                continue;
            }
            pkt.header.ssrc = b.ssrc;
            pkt.header.payload_type = b.payload_type;

            for (id, payload) in &b.hdr_ext_ids {
                if let Err(err) = pkt.header.set_extension(*id, payload.clone()) {
                    write_errs.push(Error::Rtp(err));
                }
            }

            for (uri, data) in extensions {
                if let Some(id) = b
                    .params
                    .header_extensions
                    .iter()
                    .find(|ext| ext.uri == *uri)
                    .map(|ext| ext.id)
                {
                    if let Err(err) = pkt.header.set_extension(id as u8, data.clone()) {
                        write_errs.push(Error::Rtp(err));
                    }
                }
            }

            match b.write_stream.write_rtp(&pkt).await {
                Ok(m) => {
                    n += m;
                }
                Err(err) => {
                    write_errs.push(Error::OtherPeerConnectionErr(format!(
                        "binding {}: {}",
                        b.id, err
                    )));
                }
            }
        }

        flatten_errs(write_errs)?;
        Ok(n)
    }
}

#[async_trait]
impl TrackLocal for TrackLocalStaticRTP {
    /// bind is called by the PeerConnection after negotiation is complete
    /// This asserts that the code requested is supported by the remote peer.
    /// If so it setups all the state (SSRC and PayloadType) to have a call
    async fn bind(&self, t: &TrackLocalContext) -> Result<RTCRtpCodecParameters> {
        let parameters = RTCRtpCodecParameters {
            rtp_codec: self.codec.clone(),
            ..Default::default()
        };

        let mut hdr_ext_ids = vec![];
        if let Some(mid) = t.mid() {
            if let Some(id) = t
                .header_extensions()
                .iter()
                .find(|e| e.uri == sdp::extmap::SDES_MID_URI)
                .map(|e| e.id)
            {
                hdr_ext_ids.push((id as u8, Bytes::from(mid.to_owned())));
            }
        }
        if let Some(rid) = &self.rid {
            if let Some(id) = t
                .header_extensions()
                .iter()
                .find(|e| e.uri == sdp::extmap::SDES_RTP_STREAM_ID_URI)
                .map(|e| e.id)
            {
                hdr_ext_ids.push((id as u8, Bytes::from(rid.clone())));
            }
        }

        let (codec, match_type) = codec_parameters_fuzzy_search(
            &parameters.rtp_codec,
            t.codec_parameters(),
        );
        if match_type == CodecMatch::None {
            return Err(Error::ErrUnsupportedCodec);
        }

        {
            let mut bindings = self.bindings.lock().await;
            bindings.push(Arc::new(TrackBinding {
                id: t.id().to_owned(),
                ssrc: t.ssrc(),
                payload_type: codec.payload_type,
                params: t.params.clone(),
                write_stream: t.write_stream(),
                sender_paused: Arc::clone(&t.paused),
                hdr_ext_ids,
            }));
        }

        Ok(codec)
    }

    /// unbind implements the teardown logic when the track is no longer needed. This happens
    /// because a track has been stopped.
    async fn unbind(&self, t: &TrackLocalContext) -> Result<()> {
        let mut bindings = self.bindings.lock().await;
        let idx = bindings.iter().position(|b| b.id == t.id());
        if let Some(index) = idx {
            bindings.remove(index);
            Ok(())
        } else {
            Err(Error::ErrUnbindFailed)
        }
    }

    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn rid(&self) -> Option<&str> {
        self.rid.as_deref()
    }

    fn stream_id(&self) -> &str {
        self.stream_id.as_str()
    }

    fn kind(&self) -> RtpCodecKind {
        kind_from_mime_type(&self.codec.mime_type)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[async_trait]
impl TrackLocalWriter for TrackLocalStaticRTP {
    /// write_rtp writes a RTP Packet to the TrackLocalStaticRTP
    /// If one PeerConnection fails the packets will still be sent to
    /// all PeerConnections. The error message will contain the ID of the failed
    /// PeerConnections so you can remove them
    async fn write_rtp(&self, p: &rtp::packet::Packet) -> Result<usize> {
        self.write_rtp_with_extensions(p, &[]).await
    }
}
