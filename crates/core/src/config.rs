//! Configuration for the coherence engine.
//!
//! This module defines all configuration structures used to parameterize
//! the engine. It provides:
//! 1. **Defaults:** baseline topology and table sizes (`defaults` module).
//! 2. **Structures:** hierarchical config for topology, tables, heap,
//!    reservation table, FIFOs, and the CAS force-fail throttle.
//!
//! Configuration can be loaded from JSON (the CLI's trace/config files) or
//! used as `Config::default()` for library callers and tests.

use serde::Deserialize;

/// Default configuration constants for the engine.
mod defaults {
    /// Words per cache line (must be a power of two).
    pub const NWORDS: u32 = 16;
    /// Sets per way (must be a power of two).
    pub const NSETS: u32 = 1024;
    /// Associativity (ways per set).
    pub const NWAYS: usize = 8;

    /// Transaction Table size (outstanding XRAM transactions).
    pub const TRT_SIZE: usize = 16;
    /// Update Table size (in-flight multicast updates).
    pub const UPT_SIZE: usize = 8;
    /// Invalidate Table size (in-flight invalidations).
    pub const IVT_SIZE: usize = 8;

    /// Sharer heap capacity (extra-sharer linked-list nodes).
    pub const HEAP_SIZE: usize = 64;
    /// Sharer count above which a directory entry converts to counter mode.
    pub const MAX_SHARERS: usize = 16;

    /// Reservation table slot count (must be one of the fixed NSLOTS values
    /// in §4.5's mask table).
    pub const NSLOTS: usize = 16;
    /// Reservation freshness window, in LL operations.
    pub const LIFE_SPAN: u32 = 1;

    /// READ command-intake FIFO depth.
    pub const FIFO_READ_DEPTH: usize = 4;
    /// WRITE command-intake FIFO depth.
    pub const FIFO_WRITE_DEPTH: usize = 8;
    /// CAS command-intake FIFO depth.
    pub const FIFO_CAS_DEPTH: usize = 4;
    /// Coherence-send helper FIFO depth (>= max sharers in practice).
    pub const FIFO_COHERENCE_SEND_DEPTH: usize = 8;
    /// Coherence-receive FIFO depth.
    pub const FIFO_COHERENCE_RECV_DEPTH: usize = 4;

    /// CAS force-fail throttle: roughly 1-in-N CAS attempts are forced to
    /// fail to prevent livelock (§4.1.4).
    pub const CAS_FORCE_FAIL_RATE: u32 = 64;
    /// Fixed LFSR seed, so traces are reproducible (§9).
    pub const LFSR_SEED: u32 = 0xACE1_u32;

    /// Base address of the cached-memory segment the controller services.
    pub const MEM_BASE: u64 = 0x0000_0000;
    /// Size of the cached-memory segment.
    pub const MEM_SIZE: u64 = 0x1_0000_0000;
    /// Base address of the configuration sub-segment (§6.2), placed just
    /// past the top of the memory segment.
    pub const CONFIG_BASE: u64 = MEM_SIZE;
    /// Size of the configuration sub-segment: exactly the 12-bit
    /// in-segment offset §6.2 decodes into `(func, regr)`.
    pub const CONFIG_SIZE: u64 = 0x1000;
}

/// Cache topology: line size, set count, and associativity.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TopologyConfig {
    /// Words per cache line.
    #[serde(default = "TopologyConfig::default_nwords")]
    pub nwords: u32,
    /// Sets per way.
    #[serde(default = "TopologyConfig::default_nsets")]
    pub nsets: u32,
    /// Associativity.
    #[serde(default = "TopologyConfig::default_nways")]
    pub nways: usize,
}

impl TopologyConfig {
    const fn default_nwords() -> u32 {
        defaults::NWORDS
    }
    const fn default_nsets() -> u32 {
        defaults::NSETS
    }
    const fn default_nways() -> usize {
        defaults::NWAYS
    }
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            nwords: defaults::NWORDS,
            nsets: defaults::NSETS,
            nways: defaults::NWAYS,
        }
    }
}

/// Sizes of the three tracking tables (§4.4).
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TablesConfig {
    /// Transaction Table size.
    #[serde(default = "TablesConfig::default_trt")]
    pub trt_size: usize,
    /// Update Table size.
    #[serde(default = "TablesConfig::default_upt")]
    pub upt_size: usize,
    /// Invalidate Table size.
    #[serde(default = "TablesConfig::default_ivt")]
    pub ivt_size: usize,
}

impl TablesConfig {
    const fn default_trt() -> usize {
        defaults::TRT_SIZE
    }
    const fn default_upt() -> usize {
        defaults::UPT_SIZE
    }
    const fn default_ivt() -> usize {
        defaults::IVT_SIZE
    }
}

impl Default for TablesConfig {
    fn default() -> Self {
        Self {
            trt_size: defaults::TRT_SIZE,
            upt_size: defaults::UPT_SIZE,
            ivt_size: defaults::IVT_SIZE,
        }
    }
}

/// Sharer heap capacity and the counter-mode conversion threshold (§4.3).
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct HeapConfig {
    /// Number of extra-sharer linked-list nodes.
    #[serde(default = "HeapConfig::default_size")]
    pub size: usize,
    /// Sharer count above which a directory entry converts to counter mode.
    #[serde(default = "HeapConfig::default_max_sharers")]
    pub max_sharers: usize,
}

impl HeapConfig {
    const fn default_size() -> usize {
        defaults::HEAP_SIZE
    }
    const fn default_max_sharers() -> usize {
        defaults::MAX_SHARERS
    }
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self {
            size: defaults::HEAP_SIZE,
            max_sharers: defaults::MAX_SHARERS,
        }
    }
}

/// Global LL/SC reservation table sizing (§4.5).
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ReservationConfig {
    /// Number of slots; must be one of the fixed values in the §4.5 mask
    /// table (12, 16, 20, ..., 64).
    #[serde(default = "ReservationConfig::default_nslots")]
    pub nslots: usize,
    /// Freshness window, in LL operations, before a reused slot gets a new key.
    #[serde(default = "ReservationConfig::default_life_span")]
    pub life_span: u32,
}

impl ReservationConfig {
    const fn default_nslots() -> usize {
        defaults::NSLOTS
    }
    const fn default_life_span() -> u32 {
        defaults::LIFE_SPAN
    }
}

impl Default for ReservationConfig {
    fn default() -> Self {
        Self {
            nslots: defaults::NSLOTS,
            life_span: defaults::LIFE_SPAN,
        }
    }
}

/// FIFO and single-slot buffer depths (§6.7).
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct FifoConfig {
    /// READ command-intake FIFO depth.
    #[serde(default = "FifoConfig::default_read")]
    pub read_depth: usize,
    /// WRITE command-intake FIFO depth.
    #[serde(default = "FifoConfig::default_write")]
    pub write_depth: usize,
    /// CAS command-intake FIFO depth.
    #[serde(default = "FifoConfig::default_cas")]
    pub cas_depth: usize,
    /// Coherence-send helper FIFO depth.
    #[serde(default = "FifoConfig::default_coherence_send")]
    pub coherence_send_depth: usize,
    /// Coherence-receive FIFO depth.
    #[serde(default = "FifoConfig::default_coherence_recv")]
    pub coherence_recv_depth: usize,
}

impl FifoConfig {
    const fn default_read() -> usize {
        defaults::FIFO_READ_DEPTH
    }
    const fn default_write() -> usize {
        defaults::FIFO_WRITE_DEPTH
    }
    const fn default_cas() -> usize {
        defaults::FIFO_CAS_DEPTH
    }
    const fn default_coherence_send() -> usize {
        defaults::FIFO_COHERENCE_SEND_DEPTH
    }
    const fn default_coherence_recv() -> usize {
        defaults::FIFO_COHERENCE_RECV_DEPTH
    }
}

impl Default for FifoConfig {
    fn default() -> Self {
        Self {
            read_depth: defaults::FIFO_READ_DEPTH,
            write_depth: defaults::FIFO_WRITE_DEPTH,
            cas_depth: defaults::FIFO_CAS_DEPTH,
            coherence_send_depth: defaults::FIFO_COHERENCE_SEND_DEPTH,
            coherence_recv_depth: defaults::FIFO_COHERENCE_RECV_DEPTH,
        }
    }
}

/// CAS force-fail throttle and LFSR seed (§4.1.4, §9).
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CasConfig {
    /// Roughly 1-in-N CAS attempts are forced to fail to prevent livelock.
    #[serde(default = "CasConfig::default_force_fail_rate")]
    pub force_fail_rate: u32,
    /// Fixed LFSR seed.
    #[serde(default = "CasConfig::default_lfsr_seed")]
    pub lfsr_seed: u32,
}

impl CasConfig {
    const fn default_force_fail_rate() -> u32 {
        defaults::CAS_FORCE_FAIL_RATE
    }
    const fn default_lfsr_seed() -> u32 {
        defaults::LFSR_SEED
    }
}

impl Default for CasConfig {
    fn default() -> Self {
        Self {
            force_fail_rate: defaults::CAS_FORCE_FAIL_RATE,
            lfsr_seed: defaults::LFSR_SEED,
        }
    }
}

/// Address-space layout: the cached-memory segment the directory services
/// plus the configuration sub-segment (§6.2) the intake FSM routes to the
/// CONFIG worker.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SegmentConfig {
    /// First byte of the cached-memory segment.
    #[serde(default = "SegmentConfig::default_mem_base")]
    pub mem_base: u64,
    /// Size in bytes of the cached-memory segment.
    #[serde(default = "SegmentConfig::default_mem_size")]
    pub mem_size: u64,
    /// First byte of the configuration sub-segment.
    #[serde(default = "SegmentConfig::default_config_base")]
    pub config_base: u64,
    /// Size in bytes of the configuration sub-segment (must cover the
    /// 12-bit `(func, regr)` offset of §6.2).
    #[serde(default = "SegmentConfig::default_config_size")]
    pub config_size: u64,
}

impl SegmentConfig {
    const fn default_mem_base() -> u64 {
        defaults::MEM_BASE
    }
    const fn default_mem_size() -> u64 {
        defaults::MEM_SIZE
    }
    const fn default_config_base() -> u64 {
        defaults::CONFIG_BASE
    }
    const fn default_config_size() -> u64 {
        defaults::CONFIG_SIZE
    }
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            mem_base: defaults::MEM_BASE,
            mem_size: defaults::MEM_SIZE,
            config_base: defaults::CONFIG_BASE,
            config_size: defaults::CONFIG_SIZE,
        }
    }
}

/// General engine options.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct GeneralConfig {
    /// Emit `eprintln!` lines for state transitions worth observing
    /// (victim eviction, counter-mode conversion, CAS force-fail, IRQ
    /// raised). See `SPEC_FULL.md` §A.3.
    #[serde(default)]
    pub trace_events: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            trace_events: false,
        }
    }
}

/// Root configuration for the coherence engine.
///
/// # Examples
///
/// ```
/// use mc_core::config::Config;
///
/// let config = Config::default();
/// assert_eq!(config.topology.nwords, 16);
/// assert_eq!(config.tables.trt_size, 16);
/// ```
///
/// Deserializing from JSON (as used by the CLI's trace/config files):
///
/// ```
/// use mc_core::config::Config;
///
/// let json = r#"{
///     "topology": { "nwords": 16, "nsets": 64, "nways": 4 },
///     "tables": { "trt_size": 8, "upt_size": 4, "ivt_size": 4 },
///     "heap": { "size": 16, "max_sharers": 4 },
///     "reservation": { "nslots": 16, "life_span": 1 },
///     "fifos": {
///         "read_depth": 4, "write_depth": 8, "cas_depth": 4,
///         "coherence_send_depth": 8, "coherence_recv_depth": 4
///     },
///     "cas": { "force_fail_rate": 64, "lfsr_seed": 44257 },
///     "general": { "trace_events": true }
/// }"#;
///
/// let config: Config = serde_json::from_str(json).unwrap();
/// assert_eq!(config.topology.nsets, 64);
/// assert!(config.general.trace_events);
/// ```
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Config {
    /// Cache topology.
    #[serde(default)]
    pub topology: TopologyConfig,
    /// Tracking table sizes.
    #[serde(default)]
    pub tables: TablesConfig,
    /// Sharer heap sizing.
    #[serde(default)]
    pub heap: HeapConfig,
    /// Global reservation table sizing.
    #[serde(default)]
    pub reservation: ReservationConfig,
    /// FIFO and buffer depths.
    #[serde(default)]
    pub fifos: FifoConfig,
    /// CAS force-fail throttle and LFSR seed.
    #[serde(default)]
    pub cas: CasConfig,
    /// General options.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Address-space segment layout.
    #[serde(default)]
    pub segments: SegmentConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            topology: TopologyConfig::default(),
            tables: TablesConfig::default(),
            heap: HeapConfig::default(),
            reservation: ReservationConfig::default(),
            fifos: FifoConfig::default(),
            cas: CasConfig::default(),
            general: GeneralConfig::default(),
            segments: SegmentConfig::default(),
        }
    }
}
