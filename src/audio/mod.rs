pub mod analysis;
pub mod bands;
pub mod compress;
pub mod decode;
pub mod features;
pub mod spectrum;
pub mod window;
