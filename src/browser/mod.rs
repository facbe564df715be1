mod headers;
mod preset;

pub use headers::lookup_headers;
pub use preset::{get_preset, Family, Preset, DEFAULT_PRESET, PRESET_NAMES};
