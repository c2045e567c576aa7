//! Filesystem usage probing.

use camino::Utf8Path;

/// Space figures for the filesystem holding a path, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskUsage {
    total: u64,
    available: u64,
}

impl DiskUsage {
    /// Creates a usage sample. `available` is clamped to `total`.
    #[must_use]
    pub const fn new(total: u64, available: u64) -> Self {
        let clamped = if available > total { total } else { available };
        Self {
            total,
            available: clamped,
        }
    }

    /// Capacity of the filesystem.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.total
    }

    /// Space available to unprivileged users.
    #[must_use]
    pub const fn available(&self) -> u64 {
        self.available
    }

    /// Space not available, counting reserved blocks as used.
    #[must_use]
    pub const fn used(&self) -> u64 {
        self.total.saturating_sub(self.available)
    }

    /// Returns `true` when more than `percent` of the capacity is used.
    ///
    /// An empty filesystem never exceeds a threshold.
    #[must_use]
    pub fn exceeds_percent(&self, percent: u8) -> bool {
        let used = u128::from(self.used());
        let total = u128::from(self.total);
        used * 100 > total * u128::from(percent)
    }
}

/// Source of [`DiskUsage`] samples.
pub trait UsageProbe: Send + Sync {
    /// Samples the filesystem holding `path`.
    ///
    /// # Errors
    ///
    /// Returns the I/O error raised while querying the filesystem.
    fn usage(&self, path: &Utf8Path) -> std::io::Result<DiskUsage>;
}

/// Probe backed by `statvfs` through `fs2`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsProbe;

impl UsageProbe for FsProbe {
    fn usage(&self, path: &Utf8Path) -> std::io::Result<DiskUsage> {
        let total = fs2::total_space(path)?;
        let available = fs2::available_space(path)?;
        Ok(DiskUsage::new(total, available))
    }
}
