//! Combine independent scanner verdicts into one severity/confidence
//! pair and a block decision.

use crate::scanner::{ModuleResult, ScanInput, ScannerKind};

/// Thresholds above which aggregated content is blocked outright.
#[derive(Debug, Clone, Copy)]
pub struct ScanThresholds {
    /// Minimum aggregated severity to consider blocking.
    pub block_severity: f64,
    /// Minimum aggregated confidence to consider blocking.
    pub block_confidence: f64,
}

impl Default for ScanThresholds {
    fn default() -> Self {
        Self {
            block_severity: 0.75,
            block_confidence: 0.6,
        }
    }
}

/// The combined outcome of running every scanner over one piece of
/// content.
#[derive(Debug, Clone)]
pub struct AggregateVerdict {
    /// Highest severity observed across all scanners, weighted by that
    /// scanner's own confidence.
    pub severity: f64,
    /// Confidence of the scanner that drove `severity`.
    pub confidence: f64,
    /// `true` iff `severity`/`confidence` both clear the configured
    /// thresholds.
    pub block: bool,
    /// Which scanner drove `severity`/`confidence`, i.e. the
    /// `block_type` a blocked response is reported under.
    pub worst_kind: ScannerKind,
    /// Per-scanner results, for diagnostics/logging.
    pub per_scanner: Vec<(ScannerKind, ModuleResult)>,
}

/// Run every scanner in [`ScannerKind::all`] over `input` and combine the
/// results: the reported severity/confidence are those of whichever
/// scanner produced the highest `severity * confidence` product, which
/// keeps a single loud-but-unsure scanner from dominating a panel of
/// quiet, confident ones.
#[must_use]
pub fn aggregate(input: &ScanInput<'_>, thresholds: ScanThresholds) -> AggregateVerdict {
    let per_scanner: Vec<(ScannerKind, ModuleResult)> =
        ScannerKind::all().iter().map(|kind| (*kind, kind.analyze(input))).collect();

    let (worst_kind, worst) = per_scanner
        .iter()
        .max_by(|a, b| {
            (a.1.severity * a.1.confidence)
                .partial_cmp(&(b.1.severity * b.1.confidence))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(kind, result)| (*kind, *result))
        .unwrap_or((ScannerKind::Malware, ModuleResult::clean()));

    let block = worst.severity >= thresholds.block_severity && worst.confidence >= thresholds.block_confidence;

    AggregateVerdict {
        severity: worst.severity,
        confidence: worst.confidence,
        block,
        worst_kind,
        per_scanner,
    }
}
