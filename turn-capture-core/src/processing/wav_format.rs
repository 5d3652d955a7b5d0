//! Wave container utilities for the streamed PCM format.
//!
//! The stream starts with a single 44-byte RIFF header followed by raw
//! little-endian 16-bit samples, split into arbitrarily sized chunks.

/// Size of the standard WAV RIFF header in bytes.
pub const WAV_HEADER_SIZE: usize = 44;

/// Generate a 44-byte WAV RIFF header.
///
/// Format: PCM (format code 1), little-endian.
///
/// Layout:
/// ```text
/// [0-3]    "RIFF"
/// [4-7]    36 + data_size
/// [8-11]   "WAVE"
/// [12-15]  "fmt "
/// [16-19]  16 (PCM format chunk size)
/// [20-21]  1 (PCM format code)
/// [22-23]  channels
/// [24-27]  sample_rate
/// [28-31]  byte_rate = sample_rate * channels * bit_depth / 8
/// [32-33]  block_align = channels * bit_depth / 8
/// [34-35]  bit_depth
/// [36-39]  "data"
/// [40-43]  data_size
/// ```
pub fn generate_wav_header(
    sample_rate: u32,
    bit_depth: u16,
    channels: u16,
    data_size: u32,
) -> [u8; WAV_HEADER_SIZE] {
    let byte_rate = sample_rate * channels as u32 * bit_depth as u32 / 8;
    let block_align = channels * bit_depth / 8;
    let chunk_size = 36u32.wrapping_add(data_size);

    let mut header = [0u8; WAV_HEADER_SIZE];

    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&chunk_size.to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");

    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&1u16.to_le_bytes());
    header[22..24].copy_from_slice(&channels.to_le_bytes());
    header[24..28].copy_from_slice(&sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&bit_depth.to_le_bytes());

    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_size.to_le_bytes());

    header
}

/// Header for an open-ended mono 16-bit stream. The data size is unknown
/// when streaming starts, so it is written as zero.
pub fn stream_header(sample_rate: u32) -> [u8; WAV_HEADER_SIZE] {
    generate_wav_header(sample_rate, 16, 1, 0)
}

/// Format fields decoded from a RIFF header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavFormat {
    pub sample_rate: u32,
    pub bit_depth: u16,
    pub channels: u16,
}

/// Decode the format fields of a 44-byte PCM header, or `None` if `bytes`
/// does not start with one.
pub fn parse_header(bytes: &[u8]) -> Option<WavFormat> {
    if bytes.len() < WAV_HEADER_SIZE
        || &bytes[0..4] != b"RIFF"
        || &bytes[8..12] != b"WAVE"
        || &bytes[12..16] != b"fmt "
        || &bytes[36..40] != b"data"
    {
        return None;
    }
    if u16::from_le_bytes([bytes[20], bytes[21]]) != 1 {
        return None;
    }
    Some(WavFormat {
        channels: u16::from_le_bytes([bytes[22], bytes[23]]),
        sample_rate: u32::from_le_bytes([bytes[24], bytes[25], bytes[26], bytes[27]]),
        bit_depth: u16::from_le_bytes([bytes[34], bytes[35]]),
    })
}

/// Convert f32 samples `[-1.0, 1.0]` to 16-bit PCM (little-endian bytes),
/// appending to `out`. Out-of-range values are clamped.
pub fn append_pcm16(out: &mut Vec<u8>, samples: &[f32]) {
    out.reserve(samples.len() * 2);
    for &sample in samples {
        let clamped = sample.clamp(-1.0, 1.0);
        let value = (clamped * i16::MAX as f32) as i16;
        out.extend_from_slice(&value.to_le_bytes());
    }
}

/// Decode little-endian 16-bit PCM bytes back to f32. A trailing odd byte is ignored.
pub fn decode_pcm16(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / i16::MAX as f32)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_header_declares_16k_mono_16bit() {
        let header = stream_header(16_000);
        assert_eq!(header.len(), WAV_HEADER_SIZE);
        assert_eq!(&header[0..4], b"RIFF");
        assert_eq!(&header[8..12], b"WAVE");

        let format = parse_header(&header).unwrap();
        assert_eq!(
            format,
            WavFormat {
                sample_rate: 16_000,
                bit_depth: 16,
                channels: 1
            }
        );

        let byte_rate = u32::from_le_bytes([header[28], header[29], header[30], header[31]]);
        assert_eq!(byte_rate, 32_000);
        let block_align = u16::from_le_bytes([header[32], header[33]]);
        assert_eq!(block_align, 2);
    }

    #[test]
    fn header_with_data_size() {
        let header = generate_wav_header(48000, 16, 2, 9600);
        let data_size = u32::from_le_bytes([header[40], header[41], header[42], header[43]]);
        assert_eq!(data_size, 9600);
        let chunk_size = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        assert_eq!(chunk_size, 36 + 9600);
    }

    #[test]
    fn parse_rejects_non_wave() {
        assert!(parse_header(&[0u8; 44]).is_none());
        assert!(parse_header(b"RIFF").is_none());
    }

    #[test]
    fn pcm16_conversion_clamps() {
        let mut out = Vec::new();
        append_pcm16(&mut out, &[0.0, 1.0, -1.0, 2.0, -3.0]);
        assert_eq!(out.len(), 10);
        assert_eq!(i16::from_le_bytes([out[0], out[1]]), 0);
        assert_eq!(i16::from_le_bytes([out[2], out[3]]), i16::MAX);
        assert_eq!(i16::from_le_bytes([out[4], out[5]]), -i16::MAX);
        assert_eq!(i16::from_le_bytes([out[6], out[7]]), i16::MAX);
        assert_eq!(i16::from_le_bytes([out[8], out[9]]), -i16::MAX);
    }

    #[test]
    fn decode_pcm16_ignores_trailing_byte() {
        let mut out = Vec::new();
        append_pcm16(&mut out, &[0.5]);
        out.push(0xff);
        let decoded = decode_pcm16(&out);
        assert_eq!(decoded.len(), 1);
        assert!((decoded[0] - 0.5).abs() < 1e-4);
    }
}
