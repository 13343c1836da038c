pub mod column;
pub mod config;
pub mod connections;
pub mod encoder;
pub mod executor;
pub mod homeostatic;
pub mod reconstructor;
pub mod sdr;
pub mod spatial_pooler;
pub mod synapses;
pub mod topology;
