use std::sync::Arc;

use crate::models::scan::ScanType;
use crate::tools::ToolAdapter;

pub struct PhaseDefinition {
    pub name: &'static str,
    pub tool: &'static str,
    pub weight: u32,
}

pub static FULL_RECON_PHASES: &[PhaseDefinition] = &[
    PhaseDefinition {
        name: "subdomains",
        tool: "subfinder",
        weight: 25,
    },
    PhaseDefinition {
        name: "dns",
        tool: "dig",
        weight: 10,
    },
    PhaseDefinition {
        name: "services",
        tool: "nmap",
        weight: 40,
    },
    PhaseDefinition {
        name: "vulnerabilities",
        tool: "nuclei",
        weight: 25,
    },
];

pub static FULL_WEB_PHASES: &[PhaseDefinition] = &[
    PhaseDefinition {
        name: "vulnerabilities",
        tool: "nuclei",
        weight: 60,
    },
    PhaseDefinition {
        name: "content",
        tool: "ffuf",
        weight: 40,
    },
];

/// Phase list for a sequence scan type; empty for single-tool types.
pub fn phase_definitions(scan_type: ScanType) -> &'static [PhaseDefinition] {
    match scan_type {
        ScanType::FullRecon => FULL_RECON_PHASES,
        ScanType::FullWeb => FULL_WEB_PHASES,
        _ => &[],
    }
}

/// One step of a sequence: an adapter and its share of overall progress.
#[derive(Clone)]
pub struct Phase {
    pub name: String,
    pub adapter: Arc<dyn ToolAdapter>,
    pub weight: u32,
}

impl Phase {
    pub fn new(name: &str, adapter: Arc<dyn ToolAdapter>, weight: u32) -> Self {
        Self {
            name: name.to_string(),
            adapter,
            weight,
        }
    }
}

impl std::fmt::Debug for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Phase")
            .field("name", &self.name)
            .field("tool", &self.adapter.name())
            .field("weight", &self.weight)
            .finish()
    }
}

/// Slice of the overall 0-100 progress scale owned by one adapter run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressRange {
    pub start: u8,
    pub end: u8,
}

impl ProgressRange {
    pub const FULL: ProgressRange = ProgressRange { start: 0, end: 100 };

    /// Map an adapter-relative value (0-100) into this range.
    pub fn scale(&self, relative: u8) -> u8 {
        let span = self.end.saturating_sub(self.start) as u32;
        let offset = span * relative.min(100) as u32 / 100;
        self.start + offset as u8
    }
}

/// Normalise weights into contiguous ranges covering [0, 100].
/// All-zero weights are treated as equal.
pub fn progress_ranges(weights: &[u32]) -> Vec<ProgressRange> {
    if weights.is_empty() {
        return Vec::new();
    }
    let total: u64 = weights.iter().map(|w| *w as u64).sum();
    let (weights, total): (Vec<u64>, u64) = if total == 0 {
        (vec![1; weights.len()], weights.len() as u64)
    } else {
        (weights.iter().map(|w| *w as u64).collect(), total)
    };

    let mut ranges = Vec::with_capacity(weights.len());
    let mut cumulative = 0u64;
    for weight in &weights {
        let start = (cumulative * 100 / total) as u8;
        cumulative += weight;
        let end = (cumulative * 100 / total) as u8;
        ranges.push(ProgressRange { start, end });
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definitions_sum_to_hundred() {
        for scan_type in [ScanType::FullRecon, ScanType::FullWeb] {
            let total: u32 = phase_definitions(scan_type).iter().map(|p| p.weight).sum();
            assert_eq!(total, 100, "{}", scan_type);
        }
        assert!(phase_definitions(ScanType::Quick).is_empty());
    }

    #[test]
    fn test_ranges_are_contiguous() {
        let ranges = progress_ranges(&[25, 10, 40, 25]);
        assert_eq!(
            ranges,
            vec![
                ProgressRange { start: 0, end: 25 },
                ProgressRange { start: 25, end: 35 },
                ProgressRange { start: 35, end: 75 },
                ProgressRange { start: 75, end: 100 },
            ]
        );
    }

    #[test]
    fn test_uneven_weights_still_end_at_hundred() {
        let ranges = progress_ranges(&[1, 1, 1]);
        assert_eq!(ranges[0].start, 0);
        assert_eq!(ranges[0].end, ranges[1].start);
        assert_eq!(ranges[1].end, ranges[2].start);
        assert_eq!(ranges[2].end, 100);
    }

    #[test]
    fn test_zero_weights_are_equal() {
        let ranges = progress_ranges(&[0, 0]);
        assert_eq!(ranges, vec![ProgressRange { start: 0, end: 50 }, ProgressRange { start: 50, end: 100 }]);
    }

    #[test]
    fn test_scale() {
        let range = ProgressRange { start: 35, end: 75 };
        assert_eq!(range.scale(0), 35);
        assert_eq!(range.scale(50), 55);
        assert_eq!(range.scale(100), 75);
        assert_eq!(ProgressRange::FULL.scale(90), 90);
    }
}
