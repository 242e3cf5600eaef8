//! In-process execution adapter using libav bindings
//!
//! Decodes, filters (scale, frame rate, resample) and re-encodes inside this
//! process. The source bytes go through a scratch directory, the same way the
//! native adapter hands files to the executable.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use ffmpeg_next as ffmpeg;
use ffmpeg::{
    codec, decoder, encoder, filter, format, frame, media, picture, ChannelLayout, Dictionary,
    Packet, Rational,
};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::adapters::scratch::ScratchSpace;
use crate::domain::errors::DomainError;
use crate::domain::model::EngineBackend;
use crate::engine::{self, percent_from_ratio, ratio_of, EncodePreset};
use crate::ports::{EngineEvent, TranscodeEngine, ENGINE_EVENT_CAPACITY};

/// Engine running libav in-process
pub struct LibavEngine {
    loaded: AtomicBool,
    thread_count: usize,
    scratch_root: Option<PathBuf>,
    events: broadcast::Sender<EngineEvent>,
}

impl Default for LibavEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl LibavEngine {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(ENGINE_EVENT_CAPACITY);
        Self {
            loaded: AtomicBool::new(false),
            thread_count: Self::optimize_thread_count(),
            scratch_root: None,
            events,
        }
    }

    /// Place scratch directories under `root` instead of the system temp dir
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    /// Use 75% of the cores, at least one and at most 16
    fn optimize_thread_count() -> usize {
        let cpu_count = num_cpus::get();
        let optimal_threads = (cpu_count as f64 * 0.75).ceil() as usize;
        optimal_threads.clamp(1, 16)
    }
}

#[async_trait]
impl TranscodeEngine for LibavEngine {
    fn backend(&self) -> EngineBackend {
        EngineBackend::InProcess
    }

    async fn load(&self) -> Result<(), DomainError> {
        if self.is_loaded() {
            return Ok(());
        }

        ffmpeg::init().map_err(|e| {
            DomainError::EngineUnavailable(format!("libav initialization failed: {}", e))
        })?;

        let preset = EncodePreset::eproc();
        for name in [&preset.video_codec, &preset.audio_codec] {
            if encoder::find_by_name(name).is_none() {
                return Err(DomainError::EngineUnavailable(format!(
                    "linked libav has no {} encoder",
                    name
                )));
            }
        }

        self.loaded.store(true, Ordering::SeqCst);
        info!("libav engine ready ({} threads)", self.thread_count);
        Ok(())
    }

    fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    async fn transcode(&self, args: &[String], input: Vec<u8>) -> Result<Vec<u8>, DomainError> {
        if !self.is_loaded() {
            return Err(DomainError::EngineNotReady(
                "libav engine has not been loaded".to_string(),
            ));
        }

        let preset = EncodePreset::from_args(args)?;
        let scratch = match &self.scratch_root {
            Some(root) => ScratchSpace::new_in(root)?,
            None => ScratchSpace::new()?,
        };
        let input_path = scratch.write(engine::INPUT_FILE_NAME, &input).await?;
        drop(input);
        let output_path = scratch.file(engine::OUTPUT_FILE_NAME);

        let events = self.events.clone();
        let threads = self.thread_count;
        let job = tokio::task::spawn_blocking(move || {
            transcode_file(&input_path, &output_path, &preset, threads, &events)
        });

        let outcome = match job.await {
            Ok(Ok(())) => scratch.read(engine::OUTPUT_FILE_NAME).await,
            Ok(Err(e)) => Err(DomainError::ProcessingError(e.to_string())),
            Err(e) => Err(DomainError::InternalError(format!(
                "libav worker stopped: {}",
                e
            ))),
        };

        scratch.cleanup();
        outcome
    }
}

/// Tracks and emits the fraction done, one event per percent step
struct ProgressReporter<'a> {
    events: &'a broadcast::Sender<EngineEvent>,
    total_seconds: f64,
    last_percent: Option<u8>,
}

impl<'a> ProgressReporter<'a> {
    fn new(events: &'a broadcast::Sender<EngineEvent>, total_seconds: f64) -> Self {
        Self {
            events,
            total_seconds,
            last_percent: None,
        }
    }

    fn position(&mut self, seconds: f64) {
        let Some(ratio) = ratio_of(seconds, self.total_seconds) else {
            return;
        };
        let percent = percent_from_ratio(ratio);
        if percent != self.last_percent {
            self.last_percent = percent;
            self.send(EngineEvent::Progress(ratio));
        }
    }

    fn send(&self, event: EngineEvent) {
        if self.events.send(event).is_err() {
            debug!("No subscribers for engine event");
        }
    }
}

fn transcode_file(
    input: &Path,
    output: &Path,
    preset: &EncodePreset,
    threads: usize,
    events: &broadcast::Sender<EngineEvent>,
) -> Result<(), ffmpeg::Error> {
    let mut ictx = format::input(&input)?;
    let mut octx = format::output_as(&output, &preset.container)?;
    let global_header = octx.format().flags().contains(format::Flags::GLOBAL_HEADER);

    let total_seconds = if ictx.duration() > 0 {
        ictx.duration() as f64 / f64::from(ffmpeg::ffi::AV_TIME_BASE)
    } else {
        0.0
    };
    let mut progress = ProgressReporter::new(events, total_seconds);

    let video_index = ictx
        .streams()
        .best(media::Type::Video)
        .map(|s| s.index())
        .ok_or(ffmpeg::Error::StreamNotFound)?;
    let audio_index = ictx.streams().best(media::Type::Audio).map(|s| s.index());

    let mut video = {
        let ist = ictx.stream(video_index).ok_or(ffmpeg::Error::StreamNotFound)?;
        VideoPipeline::new(&ist, &mut octx, preset, threads, global_header)?
    };
    let mut audio = match audio_index {
        Some(index) => {
            let ist = ictx.stream(index).ok_or(ffmpeg::Error::StreamNotFound)?;
            Some(AudioPipeline::new(&ist, &mut octx, preset, global_header)?)
        }
        None => None,
    };

    progress.send(EngineEvent::Log(format!(
        "libav: video stream {} -> {}x{} @ {} fps, audio stream {:?}",
        video_index, preset.width, preset.height, preset.frame_rate, audio_index
    )));

    octx.write_header()?;

    // The muxer may change stream time bases while writing the header
    video.ost_time_base = stream_time_base(&octx, video.ost_index)?;
    if let Some(audio) = audio.as_mut() {
        audio.ost_time_base = stream_time_base(&octx, audio.ost_index)?;
    }

    for (stream, packet) in ictx.packets() {
        let index = stream.index();
        if index == video_index {
            if let Some(pts) = packet.pts() {
                progress.position(pts as f64 * f64::from(stream.time_base()));
            }
            video.decoder.send_packet(&packet)?;
            video.drain_decoder(&mut octx)?;
        } else if Some(index) == audio_index {
            if let Some(audio) = audio.as_mut() {
                audio.decoder.send_packet(&packet)?;
                audio.drain_decoder(&mut octx)?;
            }
        }
    }

    video.finish(&mut octx)?;
    if let Some(audio) = audio.as_mut() {
        audio.finish(&mut octx)?;
    }

    octx.write_trailer()?;
    progress.send(EngineEvent::Progress(1.0));
    Ok(())
}

fn stream_time_base(
    octx: &format::context::Output,
    index: usize,
) -> Result<Rational, ffmpeg::Error> {
    octx.stream(index)
        .map(|s| s.time_base())
        .ok_or(ffmpeg::Error::StreamNotFound)
}

fn filter_context<'a>(
    graph: &'a mut filter::Graph,
    name: &str,
) -> Result<filter::Context<'a>, ffmpeg::Error> {
    graph.get(name).ok_or(ffmpeg::Error::FilterNotFound)
}

fn build_graph(
    source: &str,
    source_args: &str,
    sink: &str,
    spec: &str,
) -> Result<filter::Graph, ffmpeg::Error> {
    let mut graph = filter::Graph::new();
    let source_filter = filter::find(source).ok_or(ffmpeg::Error::FilterNotFound)?;
    let sink_filter = filter::find(sink).ok_or(ffmpeg::Error::FilterNotFound)?;
    graph.add(&source_filter, "in", source_args)?;
    graph.add(&sink_filter, "out", "")?;
    graph.output("in", 0)?.input("out", 0)?.parse(spec)?;
    graph.validate()?;
    Ok(graph)
}

fn write_encoded(
    packet: &mut Packet,
    ost_index: usize,
    from: Rational,
    to: Rational,
    octx: &mut format::context::Output,
) -> Result<(), ffmpeg::Error> {
    packet.set_stream(ost_index);
    packet.rescale_ts(from, to);
    packet.write_interleaved(octx)
}

struct VideoPipeline {
    decoder: decoder::Video,
    graph: filter::Graph,
    encoder: encoder::Video,
    ost_index: usize,
    encoder_time_base: Rational,
    ost_time_base: Rational,
}

impl VideoPipeline {
    fn new(
        ist: &format::stream::Stream,
        octx: &mut format::context::Output,
        preset: &EncodePreset,
        threads: usize,
        global_header: bool,
    ) -> Result<Self, ffmpeg::Error> {
        let decoder = codec::context::Context::from_parameters(ist.parameters())?
            .decoder()
            .video()?;

        let codec = encoder::find_by_name(&preset.video_codec).ok_or(ffmpeg::Error::EncoderNotFound)?;
        let mut ost = octx.add_stream(codec)?;
        let ost_index = ost.index();

        let encoder_time_base = Rational::new(1, preset.frame_rate as i32);
        let mut config = codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()?;
        config.set_width(preset.width);
        config.set_height(preset.height);
        config.set_format(format::Pixel::YUV420P);
        config.set_time_base(encoder_time_base);
        config.set_frame_rate(Some(Rational::new(preset.frame_rate as i32, 1)));
        config.set_threading(codec::threading::Config::count(threads));
        if global_header {
            config.set_flags(codec::Flags::GLOBAL_HEADER);
        }

        let mut options = Dictionary::new();
        options.set("crf", &preset.crf.to_string());
        options.set("preset", &preset.speed_preset);
        let encoder = config.open_with(options)?;
        ost.set_parameters(&encoder);

        let source_tb = ist.time_base();
        let aspect = decoder.aspect_ratio();
        let pix_fmt: ffmpeg::ffi::AVPixelFormat = decoder.format().into();
        let source_args = format!(
            "video_size={}x{}:pix_fmt={}:time_base={}/{}:pixel_aspect={}/{}",
            decoder.width(),
            decoder.height(),
            pix_fmt as i32,
            source_tb.numerator(),
            source_tb.denominator(),
            aspect.numerator().max(1),
            aspect.denominator().max(1),
        );
        let spec = format!(
            "scale={}:{},fps={},format=yuv420p",
            preset.width, preset.height, preset.frame_rate
        );
        let graph = build_graph("buffer", &source_args, "buffersink", &spec)?;

        Ok(Self {
            decoder,
            graph,
            encoder,
            ost_index,
            encoder_time_base,
            ost_time_base: encoder_time_base,
        })
    }

    fn drain_decoder(&mut self, octx: &mut format::context::Output) -> Result<(), ffmpeg::Error> {
        let mut decoded = frame::Video::empty();
        while self.decoder.receive_frame(&mut decoded).is_ok() {
            let timestamp = decoded.timestamp();
            decoded.set_pts(timestamp);
            filter_context(&mut self.graph, "in")?.source().add(&decoded)?;
            self.drain_graph(octx)?;
        }
        Ok(())
    }

    fn drain_graph(&mut self, octx: &mut format::context::Output) -> Result<(), ffmpeg::Error> {
        let mut filtered = frame::Video::empty();
        while filter_context(&mut self.graph, "out")?
            .sink()
            .frame(&mut filtered)
            .is_ok()
        {
            filtered.set_kind(picture::Type::None);
            self.encoder.send_frame(&filtered)?;
            self.drain_encoder(octx)?;
        }
        Ok(())
    }

    fn drain_encoder(&mut self, octx: &mut format::context::Output) -> Result<(), ffmpeg::Error> {
        let mut encoded = Packet::empty();
        while self.encoder.receive_packet(&mut encoded).is_ok() {
            write_encoded(
                &mut encoded,
                self.ost_index,
                self.encoder_time_base,
                self.ost_time_base,
                octx,
            )?;
        }
        Ok(())
    }

    fn finish(&mut self, octx: &mut format::context::Output) -> Result<(), ffmpeg::Error> {
        self.decoder.send_eof()?;
        self.drain_decoder(octx)?;
        filter_context(&mut self.graph, "in")?.source().flush()?;
        self.drain_graph(octx)?;
        self.encoder.send_eof()?;
        self.drain_encoder(octx)
    }
}

struct AudioPipeline {
    decoder: decoder::Audio,
    graph: filter::Graph,
    encoder: encoder::Audio,
    ost_index: usize,
    encoder_time_base: Rational,
    ost_time_base: Rational,
}

impl AudioPipeline {
    fn new(
        ist: &format::stream::Stream,
        octx: &mut format::context::Output,
        preset: &EncodePreset,
        global_header: bool,
    ) -> Result<Self, ffmpeg::Error> {
        let decoder = codec::context::Context::from_parameters(ist.parameters())?
            .decoder()
            .audio()?;

        let codec = encoder::find_by_name(&preset.audio_codec).ok_or(ffmpeg::Error::EncoderNotFound)?;
        let mut ost = octx.add_stream(codec)?;
        let ost_index = ost.index();

        let rate = if decoder.rate() > 0 {
            decoder.rate() as i32
        } else {
            44_100
        };
        let encoder_time_base = Rational::new(1, rate);
        let mut config = codec::context::Context::new_with_codec(codec)
            .encoder()
            .audio()?;
        config.set_rate(rate);
        config.set_ch_layout(ChannelLayout::STEREO);
        config.set_format(format::Sample::F32(format::sample::Type::Planar));
        config.set_bit_rate(preset.audio_bitrate_kbps as usize * 1000);
        config.set_time_base(encoder_time_base);
        if global_header {
            config.set_flags(codec::Flags::GLOBAL_HEADER);
        }
        let encoder = config.open_as(codec)?;
        ost.set_parameters(&encoder);

        let source_tb = ist.time_base();
        let source_args = format!(
            "time_base={}/{}:sample_rate={}:sample_fmt={}:channels={}",
            source_tb.numerator(),
            source_tb.denominator(),
            decoder.rate(),
            decoder.format().name(),
            decoder.ch_layout().channels(),
        );
        let spec = format!(
            "aresample={},aformat=sample_fmts=fltp:channel_layouts=stereo",
            rate
        );
        let mut graph = build_graph("abuffer", &source_args, "abuffersink", &spec)?;
        if encoder.frame_size() > 0 {
            filter_context(&mut graph, "out")?
                .sink()
                .set_frame_size(encoder.frame_size());
        }

        Ok(Self {
            decoder,
            graph,
            encoder,
            ost_index,
            encoder_time_base,
            ost_time_base: encoder_time_base,
        })
    }

    fn drain_decoder(&mut self, octx: &mut format::context::Output) -> Result<(), ffmpeg::Error> {
        let mut decoded = frame::Audio::empty();
        while self.decoder.receive_frame(&mut decoded).is_ok() {
            let timestamp = decoded.timestamp();
            decoded.set_pts(timestamp);
            filter_context(&mut self.graph, "in")?.source().add(&decoded)?;
            self.drain_graph(octx)?;
        }
        Ok(())
    }

    fn drain_graph(&mut self, octx: &mut format::context::Output) -> Result<(), ffmpeg::Error> {
        let mut filtered = frame::Audio::empty();
        while filter_context(&mut self.graph, "out")?
            .sink()
            .frame(&mut filtered)
            .is_ok()
        {
            self.encoder.send_frame(&filtered)?;
            self.drain_encoder(octx)?;
        }
        Ok(())
    }

    fn drain_encoder(&mut self, octx: &mut format::context::Output) -> Result<(), ffmpeg::Error> {
        let mut encoded = Packet::empty();
        while self.encoder.receive_packet(&mut encoded).is_ok() {
            write_encoded(
                &mut encoded,
                self.ost_index,
                self.encoder_time_base,
                self.ost_time_base,
                octx,
            )?;
        }
        Ok(())
    }

    fn finish(&mut self, octx: &mut format::context::Output) -> Result<(), ffmpeg::Error> {
        self.decoder.send_eof()?;
        self.drain_decoder(octx)?;
        filter_context(&mut self.graph, "in")?.source().flush()?;
        self.drain_graph(octx)?;
        self.encoder.send_eof()?;
        self.drain_encoder(octx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Loaded engine writing its scratch files under `root`, or `None` when
    /// the linked libav lacks the encoders
    async fn loaded_engine(root: &TempDir) -> Option<LibavEngine> {
        let engine = LibavEngine::new().with_scratch_root(root.path());
        match engine.load().await {
            Ok(()) => Some(engine),
            Err(e) => {
                eprintln!("libav encoders unavailable, skipping: {}", e);
                None
            }
        }
    }

    fn scratch_entries(root: &TempDir) -> usize {
        std::fs::read_dir(root.path()).unwrap().count()
    }

    fn progress_values(events: &mut broadcast::Receiver<EngineEvent>) -> Vec<f64> {
        let mut values = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let EngineEvent::Progress(value) = event {
                values.push(value);
            }
        }
        values
    }

    #[test]
    fn test_thread_count_bounds() {
        let threads = LibavEngine::optimize_thread_count();
        assert!((1..=16).contains(&threads));
    }

    #[tokio::test]
    async fn test_transcode_requires_load() {
        let root = TempDir::new().unwrap();
        let engine = LibavEngine::new().with_scratch_root(root.path());
        assert!(!engine.is_loaded());

        let err = engine
            .transcode(&EncodePreset::eproc().to_args(), vec![0u8; 64])
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::EngineNotReady(_)));
        assert_eq!(scratch_entries(&root), 0);
    }

    #[tokio::test]
    async fn test_load_is_idempotent() {
        let root = TempDir::new().unwrap();
        let Some(engine) = loaded_engine(&root).await else {
            return;
        };
        assert!(engine.is_loaded());
        assert!(engine.load().await.is_ok());
        assert_eq!(engine.backend(), EngineBackend::InProcess);
    }

    #[tokio::test]
    async fn test_rejects_unknown_arguments() {
        let root = TempDir::new().unwrap();
        let Some(engine) = loaded_engine(&root).await else {
            return;
        };

        let args = vec!["-vf".to_string(), "x".to_string()];
        let err = engine.transcode(&args, vec![0u8; 64]).await.unwrap_err();
        assert!(matches!(err, DomainError::BadArgs(_)));
        assert_eq!(scratch_entries(&root), 0);
    }

    #[tokio::test]
    async fn test_garbage_input_is_processing_error() {
        let root = TempDir::new().unwrap();
        let Some(engine) = loaded_engine(&root).await else {
            return;
        };

        let err = engine
            .transcode(&EncodePreset::eproc().to_args(), b"not a video at all".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ProcessingError(_)));
        assert_eq!(scratch_entries(&root), 0);
    }

    #[test]
    fn test_progress_reporter_one_event_per_percent() {
        let (sender, mut events) = broadcast::channel(ENGINE_EVENT_CAPACITY);
        let mut reporter = ProgressReporter::new(&sender, 100.0);

        reporter.position(0.0);
        reporter.position(0.2);
        reporter.position(1.0);
        reporter.position(1.3);
        reporter.position(50.0);
        reporter.position(500.0);

        assert_eq!(progress_values(&mut events), vec![0.0, 0.01, 0.5, 1.0]);
    }

    #[test]
    fn test_progress_reporter_silent_without_duration() {
        let (sender, mut events) = broadcast::channel(ENGINE_EVENT_CAPACITY);
        let mut reporter = ProgressReporter::new(&sender, 0.0);

        reporter.position(1.0);
        reporter.position(30.0);

        assert!(progress_values(&mut events).is_empty());
    }
}
