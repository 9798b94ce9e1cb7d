/// Sound engine: procedural 8-bit style cues and a looping tune via rodio.
///
/// All sounds are generated as in-memory WAV buffers at init time.
/// Cue playback is fire-and-forget (non-blocking) via rodio's Sink; the
/// background tune keeps its own Sink so it can be paused and resumed.
///
/// Music plays only while neither the director (`MusicCommand::Pause`)
/// nor the pause coordinator (`set_suspended`) holds it. Cues are dropped
/// while suspended.
///
/// Compile with `--no-default-features` or without "sound" feature
/// to disable audio entirely (the stub SoundEngine does nothing).

use crate::sim::event::GameEvent;
#[cfg(not(feature = "sound"))]
use crate::sim::event::{Cue, MusicCommand};

#[cfg(feature = "sound")]
mod inner {
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
    use tracing::{debug, warn};

    use crate::sim::event::{Cue, CueKind, MusicCommand};

    pub(super) const SAMPLE_RATE: u32 = 22050;
    const MUSIC_VOLUME: f32 = 0.35;

    /// Pre-generated WAV buffers for each cue and the tune.
    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        sfx_jump: Arc<Vec<u8>>,
        sfx_coin: Arc<Vec<u8>>,
        sfx_explosion: Arc<Vec<u8>>,
        sfx_go: Arc<Vec<u8>>,
        sfx_victory: Arc<Vec<u8>>,
        sfx_game_over: Arc<Vec<u8>>,
        tune: Arc<Vec<u8>>,
        music: Option<Sink>,
        music_held: bool,
        suspended: bool,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    warn!("audio output unavailable: {e}");
                    return None;
                }
            };

            // ── Generate all sound buffers ──
            Some(SoundEngine {
                _stream: stream,
                handle,
                sfx_jump: Arc::new(make_wav(&gen_jump())),
                sfx_coin: Arc::new(make_wav(&gen_coin())),
                sfx_explosion: Arc::new(make_wav(&gen_explosion())),
                sfx_go: Arc::new(make_wav(&gen_go())),
                sfx_victory: Arc::new(make_wav(&gen_victory())),
                sfx_game_over: Arc::new(make_wav(&gen_game_over())),
                tune: Arc::new(make_wav(&gen_tune())),
                music: None,
                music_held: false,
                suspended: false,
            })
        }

        fn buffer(&self, kind: CueKind) -> &Arc<Vec<u8>> {
            match kind {
                CueKind::Jump => &self.sfx_jump,
                CueKind::Coin => &self.sfx_coin,
                CueKind::Explosion => &self.sfx_explosion,
                CueKind::Go => &self.sfx_go,
                CueKind::Victory => &self.sfx_victory,
                CueKind::GameOver => &self.sfx_game_over,
            }
        }

        /// Play a cue at its volume and rate. No-op while suspended.
        pub fn play_cue(&self, cue: Cue) {
            if self.suspended {
                return;
            }
            if let Ok(sink) = Sink::try_new(&self.handle) {
                let cursor = Cursor::new(self.buffer(cue.kind).as_ref().clone());
                if let Ok(src) = Decoder::new(cursor) {
                    sink.set_volume(cue.volume);
                    sink.set_speed(cue.rate);
                    sink.append(src);
                    sink.detach(); // fire-and-forget
                }
            }
        }

        pub fn music(&mut self, cmd: MusicCommand) {
            match cmd {
                MusicCommand::Play => {
                    self.stop_music();
                    self.music_held = false;
                    self.start_music();
                }
                MusicCommand::Stop => {
                    self.music_held = false;
                    self.stop_music();
                }
                MusicCommand::Pause => self.music_held = true,
                MusicCommand::Resume => self.music_held = false,
            }
            self.sync_music();
        }

        pub fn set_suspended(&mut self, suspended: bool) {
            self.suspended = suspended;
            self.sync_music();
        }

        fn start_music(&mut self) {
            let sink = match Sink::try_new(&self.handle) {
                Ok(s) => s,
                Err(e) => {
                    warn!("music sink unavailable: {e}");
                    return;
                }
            };
            match Decoder::new_looped(Cursor::new(self.tune.as_ref().clone())) {
                Ok(src) => {
                    sink.set_volume(MUSIC_VOLUME);
                    sink.append(src);
                    self.music = Some(sink);
                }
                Err(e) => warn!("music decode failed: {e}"),
            }
        }

        fn stop_music(&mut self) {
            if let Some(sink) = self.music.take() {
                sink.stop();
            }
        }

        fn sync_music(&self) {
            if let Some(sink) = &self.music {
                if self.music_held || self.suspended {
                    sink.pause();
                } else {
                    sink.play();
                }
                debug!(paused = sink.is_paused(), "music state");
            }
        }
    }

    // ════════════════════════════════════════════════════════════
    //  Waveform generators: all produce Vec<f32> mono samples
    // ════════════════════════════════════════════════════════════

    fn tone(freq: f32, i: usize) -> f32 {
        let t = i as f32 / SAMPLE_RATE as f32;
        (t * freq * 2.0 * std::f32::consts::PI).sin()
    }

    /// Note sequence with a per-note decay envelope and a 3rd harmonic.
    fn gen_notes(notes: &[(f32, f32)], volume: f32) -> Vec<f32> {
        let mut samples = Vec::new();
        for &(freq, dur) in notes {
            let n = (SAMPLE_RATE as f32 * dur) as usize;
            for i in 0..n {
                let env = 1.0 - (i as f32 / n as f32) * 0.4;
                let wave = if freq > 0.0 {
                    tone(freq, i) * 0.7 + tone(freq * 3.0, i) * 0.3
                } else {
                    0.0
                };
                samples.push(wave * env * volume);
            }
        }
        samples
    }

    /// Jump: short rising sweep
    pub(super) fn gen_jump() -> Vec<f32> {
        let duration = 0.1;
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        let mut phase = 0.0_f32;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let freq = 300.0 + t * 500.0;
                phase += freq / SAMPLE_RATE as f32;
                let env = (1.0 - t).powf(0.7);
                (phase * 2.0 * std::f32::consts::PI).sin() * env * 0.25
            })
            .collect()
    }

    /// Coin: quick two-note chime B5→E6
    pub(super) fn gen_coin() -> Vec<f32> {
        gen_notes(&[(988.0, 0.05), (1319.0, 0.12)], 0.3)
    }

    /// Explosion: decaying noise burst with a low rumble
    pub(super) fn gen_explosion() -> Vec<f32> {
        let duration = 0.45;
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        let mut rng: u32 = 12345;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let rumble = tone(60.0 + (1.0 - t) * 40.0, i);
                // Simple LCG noise
                rng = rng.wrapping_mul(1103515245).wrapping_add(12345);
                let noise = (rng as f32 / u32::MAX as f32) * 2.0 - 1.0;
                let env = (1.0 - t).powf(1.5);
                (rumble * 0.4 + noise * 0.6) * env * 0.4
            })
            .collect()
    }

    /// Go: single bright beep
    pub(super) fn gen_go() -> Vec<f32> {
        gen_notes(&[(880.0, 0.25)], 0.3)
    }

    /// Victory: ascending fanfare C5→E5→G5→C6 with a held top note
    pub(super) fn gen_victory() -> Vec<f32> {
        gen_notes(
            &[(523.0, 0.1), (659.0, 0.1), (784.0, 0.1), (1047.0, 0.35)],
            0.3,
        )
    }

    /// Game over: sad descending line A4→F#4→Eb4→C4
    pub(super) fn gen_game_over() -> Vec<f32> {
        let mut samples = gen_notes(
            &[(440.0, 0.14), (370.0, 0.14), (311.0, 0.14), (261.0, 0.3)],
            0.3,
        );
        // Final fade
        let total = samples.len();
        let fade_len = total / 4;
        for (k, s) in samples[total - fade_len..].iter_mut().enumerate() {
            *s *= 1.0 - k as f32 / fade_len as f32;
        }
        samples
    }

    /// Background tune: a two-bar bass-and-lead loop in A minor
    pub(super) fn gen_tune() -> Vec<f32> {
        const STEP: f32 = 0.15;
        let lead = [
            659.0, 0.0, 784.0, 659.0, 587.0, 523.0, 587.0, 0.0,
            523.0, 0.0, 440.0, 523.0, 587.0, 659.0, 587.0, 523.0,
        ];
        let bass = [110.0_f32, 110.0, 87.3, 98.0];
        let n = (SAMPLE_RATE as f32 * STEP) as usize;
        let mut samples = Vec::with_capacity(n * lead.len());
        for (k, &freq) in lead.iter().enumerate() {
            let root = bass[k / 4];
            for i in 0..n {
                let env = 1.0 - (i as f32 / n as f32) * 0.6;
                let lead_wave = if freq > 0.0 { tone(freq, i).signum() * 0.25 } else { 0.0 };
                let bass_wave = tone(root, i) * 0.5;
                samples.push((lead_wave * env + bass_wave) * 0.3);
            }
        }
        samples
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder: wraps f32 samples into a valid WAV buffer
    // ════════════════════════════════════════════════════════════

    pub(super) fn make_wav(samples: &[f32]) -> Vec<u8> {
        let num_channels: u16 = 1;
        let bits_per_sample: u16 = 16;
        let byte_rate = SAMPLE_RATE * (num_channels as u32) * (bits_per_sample as u32) / 8;
        let block_align = num_channels * bits_per_sample / 8;
        let data_size = samples.len() as u32 * 2; // 16-bit = 2 bytes per sample
        let file_size = 36 + data_size;

        let mut buf = Vec::with_capacity(44 + data_size as usize);

        // RIFF header
        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&file_size.to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        // fmt chunk
        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes()); // chunk size
        buf.extend_from_slice(&1u16.to_le_bytes());  // PCM format
        buf.extend_from_slice(&num_channels.to_le_bytes());
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&bits_per_sample.to_le_bytes());

        // data chunk
        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());

        for &s in samples {
            let val = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
            buf.extend_from_slice(&val.to_le_bytes());
        }

        buf
    }
}

// ════════════════════════════════════════════════════════════
//  Public API: compiles to no-ops when sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { Some(SoundEngine) }
    pub fn play_cue(&self, _cue: Cue) {}
    pub fn music(&mut self, _cmd: MusicCommand) {}
    pub fn set_suspended(&mut self, _suspended: bool) {}
}

/// Route one simulation event to the audio engine.
pub fn dispatch(sound: &mut SoundEngine, event: &GameEvent) {
    match event {
        GameEvent::Cue(cue) => sound.play_cue(*cue),
        GameEvent::Music(cmd) => sound.music(*cmd),
        GameEvent::Suspended => sound.set_suspended(true),
        GameEvent::Resumed => sound.set_suspended(false),
        _ => {}
    }
}

#[cfg(all(test, feature = "sound"))]
mod tests {
    use super::inner::*;

    #[test]
    fn wav_header_matches_sample_count() {
        let wav = make_wav(&[0.0, 0.5, -0.5, 2.0]);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(wav.len(), 44 + 4 * 2);
        let data_size = u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]);
        assert_eq!(data_size, 8);
        // Out-of-range samples clamp to full scale.
        assert_eq!(i16::from_le_bytes([wav[50], wav[51]]), 32767);
    }

    #[test]
    fn generated_cues_stay_in_range() {
        for samples in [
            gen_jump(),
            gen_coin(),
            gen_explosion(),
            gen_go(),
            gen_victory(),
            gen_game_over(),
            gen_tune(),
        ] {
            assert!(!samples.is_empty());
            assert!(samples.iter().all(|s| s.abs() <= 1.0));
        }
    }

    #[test]
    fn tune_is_sixteen_steps() {
        let step = (SAMPLE_RATE as f32 * 0.15) as usize;
        assert_eq!(gen_tune().len(), step * 16);
    }
}
