//! Match events consumed by the access engine.

use crate::subject::SubjectId;

/// One decoded event from the recognition pipeline.
///
/// Transport framing (HTTP bodies, stream envelopes) is decoded before the
/// engine sees an event; the engine only distinguishes a matched face from
/// an unmatched one.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchEvent {
  /// The pipeline matched a face enrolled upstream.
  Known {
    subject_id: SubjectId,
    /// Match similarity as reported by the pipeline. Logged with the
    /// decision; never used to gate it.
    confidence: f64,
  },
  /// A face was detected but matched nothing.
  Unknown,
}
