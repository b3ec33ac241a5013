//! Per-pass record statistics.
//!
//! Every [`Context`](crate::context::Context) owns a [`PassStats`] that the
//! framing layer updates as records are decoded and encoded:
//! - Record counts in each direction
//! - How many headers needed the long form
//! - How many unknown records were kept as opaque bodies
//! - Total body bytes
//!
//! Counts cover every framed record, so the actions nested inside a
//! `DoAction` tag are counted next to the tag itself, and their bodies are
//! part of the tag's body bytes as well as their own.
//!
//! # Thread Safety
//!
//! `PassStats` is plain data owned by a single pass. Concurrent passes each
//! have their own; merge them with [`PassStats::merge`] afterwards.

use crate::framing::RecordHeader;

/// Counters for one encode or decode pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassStats {
    /// Framed records decoded, nested actions included
    pub records_decoded: u64,

    /// Framed records written, nested actions included
    pub records_encoded: u64,

    /// Headers that used an explicit 32-bit length
    pub long_headers: u64,

    /// Unknown records kept as raw bytes in lenient mode
    pub opaque_records: u64,

    /// Body bytes across all records, excluding headers
    pub body_bytes: u64,
}

impl PassStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_decoded(&mut self, header: &RecordHeader) {
        self.records_decoded += 1;
        self.count_header(header);
    }

    pub fn record_encoded(&mut self, header: &RecordHeader) {
        self.records_encoded += 1;
        self.count_header(header);
    }

    pub fn record_opaque(&mut self) {
        self.opaque_records += 1;
    }

    fn count_header(&mut self, header: &RecordHeader) {
        if header.long_form {
            self.long_headers += 1;
        }
        self.body_bytes += header.length as u64;
    }

    /// Fraction of records that needed a long header.
    ///
    /// Returns 0.0 if no records were processed.
    pub fn long_form_ratio(&self) -> f64 {
        let total = self.records_decoded + self.records_encoded;
        if total == 0 {
            0.0
        } else {
            self.long_headers as f64 / total as f64
        }
    }

    /// Fold another pass's counters into this one.
    pub fn merge(&mut self, other: &PassStats) {
        self.records_decoded += other.records_decoded;
        self.records_encoded += other.records_encoded;
        self.long_headers += other.long_headers;
        self.opaque_records += other.opaque_records;
        self.body_bytes += other.body_bytes;
    }

    /// Export counters as a simple `key=value` text format.
    pub fn export_text(&self) -> String {
        format!(
            "records_decoded={}\n\
             records_encoded={}\n\
             long_headers={}\n\
             long_form_ratio={:.4}\n\
             opaque_records={}\n\
             body_bytes={}\n",
            self.records_decoded,
            self.records_encoded,
            self.long_headers,
            self.long_form_ratio(),
            self.opaque_records,
            self.body_bytes,
        )
    }
}
