//! Benchmark-only crate; the interesting code is under `benches/`.
