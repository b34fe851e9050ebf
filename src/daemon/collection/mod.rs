pub mod resolver;
pub mod sampler;
