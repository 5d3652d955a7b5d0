pub mod backend;
pub mod first_bytes;
pub mod recorder;
pub mod script_processor;
pub mod worklet_backend;
pub mod worklet_module;
pub mod worklet_node;
