use super::wav_format;

/// Output rate of the encoded stream in Hz.
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

/// Default number of output samples buffered before a block is emitted (20 ms at 16 kHz).
pub const DEFAULT_BLOCK_SAMPLES: usize = 320;

/// Streaming resampler and PCM packer.
///
/// Converts mono f32 frames at the device rate into 16-bit little-endian PCM
/// at `TARGET_SAMPLE_RATE`, prefixed once by a wave header. Linear
/// interpolation state carries across frames, so frame boundaries do not
/// introduce discontinuities.
///
/// One instance belongs to exactly one producer; it holds no locks.
#[derive(Debug, Clone)]
pub struct SampleRateConverter {
    source_rate: u32,
    target_rate: u32,
    /// Source samples advanced per output sample.
    step: f64,
    /// Read position, relative to `carry` (index 0) when one is held.
    position: f64,
    /// Last sample of the previous frame.
    carry: Option<f32>,
    pending: Vec<f32>,
    block_samples: usize,
    header_written: bool,
}

impl SampleRateConverter {
    pub fn new(source_rate: u32, target_rate: u32) -> Self {
        let source_rate = source_rate.max(1);
        let target_rate = target_rate.max(1);
        Self {
            source_rate,
            target_rate,
            step: source_rate as f64 / target_rate as f64,
            position: 0.0,
            carry: None,
            pending: Vec::with_capacity(DEFAULT_BLOCK_SAMPLES * 2),
            block_samples: DEFAULT_BLOCK_SAMPLES,
            header_written: false,
        }
    }

    /// Converter to the 16 kHz stream format.
    pub fn to_target(source_rate: u32) -> Self {
        Self::new(source_rate, TARGET_SAMPLE_RATE)
    }

    /// Minimum number of resampled samples required before `encode` emits bytes.
    pub fn with_block_samples(mut self, block_samples: usize) -> Self {
        self.block_samples = block_samples.max(1);
        self
    }

    pub fn source_rate(&self) -> u32 {
        self.source_rate
    }

    pub fn target_rate(&self) -> u32 {
        self.target_rate
    }

    /// Resampled samples waiting for the next block.
    pub fn buffered_samples(&self) -> usize {
        self.pending.len()
    }

    /// Encode one frame.
    ///
    /// Returns `None` while fewer than a block of resampled samples has
    /// accumulated. The first returned payload starts with the wave header.
    pub fn encode(&mut self, frame: &[f32]) -> Option<Vec<u8>> {
        self.resample_into_pending(frame);
        if self.pending.len() < self.block_samples {
            return None;
        }

        let header_len = if self.header_written { 0 } else { wav_format::WAV_HEADER_SIZE };
        let mut out = Vec::with_capacity(header_len + self.pending.len() * 2);
        if !self.header_written {
            out.extend_from_slice(&wav_format::stream_header(self.target_rate));
            self.header_written = true;
        }
        wav_format::append_pcm16(&mut out, &self.pending);
        self.pending.clear();
        Some(out)
    }

    fn resample_into_pending(&mut self, frame: &[f32]) {
        if frame.is_empty() {
            return;
        }
        if self.source_rate == self.target_rate {
            self.pending.extend_from_slice(frame);
            return;
        }

        // Virtual input: [carry?] ++ frame
        let offset = usize::from(self.carry.is_some());
        let len = frame.len() + offset;
        let sample_at = |i: usize| -> f32 {
            match (i, self.carry) {
                (0, Some(c)) => c,
                _ => frame[i - offset],
            }
        };

        let mut position = self.position;
        loop {
            let index = position as usize;
            if index + 1 >= len {
                break;
            }
            let fraction = (position - index as f64) as f32;
            let a = sample_at(index);
            let b = sample_at(index + 1);
            self.pending.push(a * (1.0 - fraction) + b * fraction);
            position += self.step;
        }

        self.position = position - (len - 1) as f64;
        self.carry = frame.last().copied();
    }
}
