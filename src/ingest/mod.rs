/// Ingest layer: converts wire-format payloads from the surrounding
/// application into domain `Read`s.

pub mod reads;

#[cfg(test)]
pub(crate) mod fixtures;
