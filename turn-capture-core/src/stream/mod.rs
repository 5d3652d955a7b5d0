pub mod chunk_stream;
