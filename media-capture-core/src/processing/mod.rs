pub mod gain_mixer;
pub mod mix_graph;
pub mod tap_buffer;
