use log::warn;
use rtp::packetizer::Packetizer;

use super::track_local_static_rtp::TrackLocalStaticRTP;
use super::*;
use crate::constants::RTP_OUTBOUND_MTU;
use crate::media_stream::Sample;
use shared::error::flatten_errs;

#[derive(Debug, Default)]
struct TrackLocalStaticSampleInternal {
    packetizer: Option<Box<dyn Packetizer + Send + Sync>>,
    clock_rate: f64,
    did_warn_about_wonky_pause: bool,
}

/// TrackLocalStaticSample is a TrackLocal that has a pre-set codec and accepts Samples.
/// If you wish to send a RTP Packet use TrackLocalStaticRTP
#[derive(Debug)]
pub struct TrackLocalStaticSample {
    rtp_track: TrackLocalStaticRTP,
    internal: Mutex<TrackLocalStaticSampleInternal>,
}

impl TrackLocalStaticSample {
    /// returns a TrackLocalStaticSample
    pub fn new(codec: RTCRtpCodec, id: String, stream_id: String) -> Self {
        let rtp_track = TrackLocalStaticRTP::new(codec, id, stream_id);

        TrackLocalStaticSample {
            rtp_track,
            internal: Mutex::new(TrackLocalStaticSampleInternal::default()),
        }
    }

    /// returns a TrackLocalStaticSample with rid
    pub fn new_with_rid(codec: RTCRtpCodec, id: String, rid: String, stream_id: String) -> Self {
        let rtp_track = TrackLocalStaticRTP::new_with_rid(codec, id, rid, stream_id);

        TrackLocalStaticSample {
            rtp_track,
            internal: Mutex::new(TrackLocalStaticSampleInternal::default()),
        }
    }

    /// codec gets the Codec of the track
    pub fn codec(&self) -> RTCRtpCodec {
        self.rtp_track.codec()
    }

    /// write_sample writes a Sample to the TrackLocalStaticSample
    /// If one PeerConnection fails the packets will still be sent to
    /// all PeerConnections. The error message will contain the ID of the failed
    /// PeerConnections so you can remove them
    ///
    /// Writing before the track is bound is a no-op.
    pub async fn write_sample(&self, sample: &Sample) -> Result<()> {
        self.write_sample_with_extensions(sample, &[]).await
    }

    /// write_sample_with_extensions is [`TrackLocalStaticSample::write_sample`]
    /// with header extensions applied to every packet, keyed by URI.
    pub async fn write_sample_with_extensions(
        &self,
        sample: &Sample,
        extensions: &[(&str, Bytes)],
    ) -> Result<()> {
        let any_paused = self.rtp_track.any_binding_paused().await;
        let all_paused = self.rtp_track.all_binding_paused().await;

        let packets = {
            let mut internal = self.internal.lock().await;

            if all_paused {
                // Advance the timestamp so the stream resumes without a jump.
                let clock_rate = internal.clock_rate;
                if let Some(packetizer) = internal.packetizer.as_mut() {
                    let samples = (sample.duration.as_secs_f64() * clock_rate) as u32;
                    packetizer.skip_samples(samples);
                }
                return Ok(());
            }

            if any_paused && !internal.did_warn_about_wonky_pause {
                internal.did_warn_about_wonky_pause = true;
                warn!("Detected multiple track bindings where only some of the bindings are paused. This is not supported and sequence numbers of the paused bindings will jump on resume.");
            }

            let clock_rate = internal.clock_rate;
            let packetizer = match internal.packetizer.as_mut() {
                Some(p) => p,
                None => return Ok(()),
            };

            let samples = (sample.duration.as_secs_f64() * clock_rate) as u32;
            if sample.prev_dropped_packets > 0 {
                packetizer.skip_samples(samples * sample.prev_dropped_packets as u32);
            }
            packetizer.packetize(&sample.data, samples)?
        };

        let mut write_errs = vec![];
        for p in packets {
            if let Err(err) = self
                .rtp_track
                .write_rtp_with_extensions(&p, extensions)
                .await
            {
                write_errs.push(err);
            }
        }

        flatten_errs(write_errs)
    }
}

#[async_trait]
impl TrackLocal for TrackLocalStaticSample {
    /// Bind is called by the PeerConnection after negotiation is complete
    /// This asserts that the code requested is supported by the remote peer.
    /// If so it setups all the state (SSRC and PayloadType) to have a call
    async fn bind(&self, t: &TrackLocalContext) -> Result<RTCRtpCodecParameters> {
        let codec = self.rtp_track.bind(t).await?;

        let mut internal = self.internal.lock().await;

        // We only need one packetizer
        if internal.packetizer.is_some() {
            return Ok(codec);
        }

        let payloader = t.payloader(&codec.rtp_codec)?;
        let sequencer: Box<dyn rtp::sequence::Sequencer + Send + Sync> =
            Box::new(rtp::sequence::new_random_sequencer());
        internal.packetizer = Some(Box::new(rtp::packetizer::new_packetizer(
            RTP_OUTBOUND_MTU,
            0, // Value is handled when writing
            0, // Value is handled when writing
            payloader,
            sequencer,
            codec.rtp_codec.clock_rate,
        )));
        internal.clock_rate = codec.rtp_codec.clock_rate as f64;

        Ok(codec)
    }

    /// unbind implements the teardown logic when the track is no longer needed. This happens
    /// because a track has been stopped.
    async fn unbind(&self, t: &TrackLocalContext) -> Result<()> {
        self.rtp_track.unbind(t).await
    }

    fn id(&self) -> &str {
        self.rtp_track.id()
    }

    fn rid(&self) -> Option<&str> {
        self.rtp_track.rid()
    }

    fn stream_id(&self) -> &str {
        self.rtp_track.stream_id()
    }

    fn kind(&self) -> RtpCodecKind {
        self.rtp_track.kind()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[async_trait]
impl TrackLocalWriter for TrackLocalStaticSample {
    /// write_rtp bypasses the packetizer and forwards `p` to every binding.
    async fn write_rtp(&self, p: &rtp::packet::Packet) -> Result<usize> {
        self.rtp_track.write_rtp(p).await
    }
}
