// Performance metrics module
//
// Lightweight counters for compilation and runtime selection

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Process-wide counters
///
/// Uses atomic operations so the compiler, the manager and the combo sweeper
/// can record without locks.
#[derive(Debug)]
pub struct Metrics {
    /// Documents produced by the last compilations
    documents_compiled: AtomicU64,

    /// AND-blocks written into documents
    blocks_emitted: AtomicU64,

    /// Variants skipped because their source is missing from the library
    dangling_variants: AtomicU64,

    /// Rule resolutions performed
    resolutions: AtomicU64,

    /// Resolutions that ended at General NPC
    resolution_fallbacks: AtomicU64,

    /// NPC ordinals re-rolled after a combo window expired
    npc_rerolls: AtomicU64,

    /// Total compile time in milliseconds
    total_compile_time_ms: AtomicU64,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            documents_compiled: AtomicU64::new(0),
            blocks_emitted: AtomicU64::new(0),
            dangling_variants: AtomicU64::new(0),
            resolutions: AtomicU64::new(0),
            resolution_fallbacks: AtomicU64::new(0),
            npc_rerolls: AtomicU64::new(0),
            total_compile_time_ms: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_document_compiled(&self) {
        self.documents_compiled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_block_emitted(&self) {
        self.blocks_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dangling_variant(&self) {
        self.dangling_variants.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a resolution and whether it fell back to General NPC
    pub fn record_resolution(&self, fallback: bool) {
        self.resolutions.fetch_add(1, Ordering::Relaxed);
        if fallback {
            self.resolution_fallbacks.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_npc_reroll(&self) {
        self.npc_rerolls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_compile_time(&self, duration: Duration) {
        self.total_compile_time_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn documents_compiled(&self) -> u64 {
        self.documents_compiled.load(Ordering::Relaxed)
    }

    pub fn blocks_emitted(&self) -> u64 {
        self.blocks_emitted.load(Ordering::Relaxed)
    }

    pub fn dangling_variants(&self) -> u64 {
        self.dangling_variants.load(Ordering::Relaxed)
    }

    pub fn resolutions(&self) -> u64 {
        self.resolutions.load(Ordering::Relaxed)
    }

    pub fn resolution_fallbacks(&self) -> u64 {
        self.resolution_fallbacks.load(Ordering::Relaxed)
    }

    pub fn npc_rerolls(&self) -> u64 {
        self.npc_rerolls.load(Ordering::Relaxed)
    }

    /// Get total uptime
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Log metrics summary
    pub fn log_summary(&self) {
        tracing::info!("=== Stancecraft Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Documents: {} compiled, {} blocks, {} dangling variants skipped, {}ms compiling",
            self.documents_compiled(),
            self.blocks_emitted(),
            self.dangling_variants(),
            self.total_compile_time_ms.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Resolutions: {} ({} fell back to General NPC), NPC rerolls: {}",
            self.resolutions(),
            self.resolution_fallbacks(),
            self.npc_rerolls()
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
