//! Optional engine construction knobs (§6 of the engine contract).

/// Construction-time knobs. Neither field changes observable behavior —
/// `initial_capacity_hint` only pre-sizes internal maps, and `fast_path`
/// only toggles internal micro-optimizations (see [`super::Engine::with_config`]).
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Reserves space in the id index and trade log up front.
    pub initial_capacity_hint: usize,
    /// Enables implementation-specific micro-optimizations. The spec admits
    /// only one observable behavior, so this never changes *what* an
    /// operation returns, only how cheaply it gets there.
    pub fast_path: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            initial_capacity_hint: 0,
            fast_path: true,
        }
    }
}
