pub mod sample_rate_converter;
pub mod wav_format;
