//! Configuration for the mk32 trap/VM subsystem.
//!
//! This module defines the configuration structures used to parameterize the
//! subsystem. It provides:
//! 1. **Defaults:** Baseline constants (core count, TLB geometry, stack size).
//! 2. **Structures:** Hierarchical config for the machine, MMU, and SMP layers.
//!
//! Configuration is supplied as JSON by the embedding kernel build, or use
//! `Config::default()`.

use serde::Deserialize;

/// Default configuration constants.
///
/// These values define the baseline machine when not explicitly overridden.
mod defaults {
    /// Number of cores brought up when none is specified.
    pub const NUM_CORES: usize = 1;

    /// Privileged (kernel) stack size per thread, in bytes.
    ///
    /// Must be large enough for the deepest legal nesting of register frames;
    /// overflow during a frame push is a fatal condition, not an allocation
    /// failure.
    pub const STACK_SIZE: u32 = 8192;

    /// Number of translation-cache entries per core.
    pub const TLB_ENTRIES: usize = 256;

    /// Whether the processor variant has a hardware page-table walker.
    ///
    /// When true, the software TLB-fill engine is bypassed and every fault
    /// goes straight to the slow path.
    pub const HW_WALKER: bool = false;

    /// Conservative timeout for cross-core requests, in milliseconds.
    pub const IPI_TIMEOUT_MS: u64 = 10_000;

    pub const fn num_cores() -> usize {
        NUM_CORES
    }
    pub const fn stack_size() -> u32 {
        STACK_SIZE
    }
    pub const fn tlb_entries() -> usize {
        TLB_ENTRIES
    }
    pub const fn hw_walker() -> bool {
        HW_WALKER
    }
    pub const fn ipi_timeout_ms() -> u64 {
        IPI_TIMEOUT_MS
    }
}

/// MMU-layer configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct MmuConfig {
    /// Translation-cache entries per core (rounded up to a power of two).
    pub tlb_entries: usize,
    /// True if the hardware walks page tables itself.
    pub hw_walker: bool,
}

impl Default for MmuConfig {
    fn default() -> Self {
        Self {
            tlb_entries: defaults::tlb_entries(),
            hw_walker: defaults::hw_walker(),
        }
    }
}

/// SMP-layer configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SmpConfig {
    /// Number of cores the machine exposes.
    pub num_cores: usize,
    /// Retry budget for doorbell rings and bring-up waits, in milliseconds.
    pub ipi_timeout_ms: u64,
}

impl Default for SmpConfig {
    fn default() -> Self {
        Self {
            num_cores: defaults::num_cores(),
            ipi_timeout_ms: defaults::ipi_timeout_ms(),
        }
    }
}

/// Root configuration type.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Privileged stack size per thread, in bytes.
    #[serde(deserialize_with = "stack_size_pow2")]
    pub stack_size: StackSize,
    /// MMU-layer configuration.
    pub mmu: MmuConfig,
    /// SMP-layer configuration.
    pub smp: SmpConfig,
}

/// Validated privileged-stack size (power of two, frame-aligned).
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
pub struct StackSize(u32);

impl StackSize {
    /// Returns the stack size in bytes.
    pub fn bytes(self) -> u32 {
        self.0
    }
}

impl Default for StackSize {
    fn default() -> Self {
        Self(defaults::stack_size())
    }
}

fn stack_size_pow2<'de, D>(de: D) -> Result<StackSize, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = u32::deserialize(de)?;
    if !raw.is_power_of_two() {
        return Err(serde::de::Error::custom(format!(
            "stack_size must be a power of two, got {raw}"
        )));
    }
    Ok(StackSize(raw))
}

impl Config {
    /// Parses a configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns the underlying `serde_json` error for malformed input or
    /// out-of-range values.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
