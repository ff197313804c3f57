// Test modules for all components
pub mod common;
pub mod test_frame_stack;
pub mod test_network;
pub mod test_replay_buffer;
