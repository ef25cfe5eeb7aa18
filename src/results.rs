//! Per-cell measurements and the flat text artifact they are written to.

use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};

use crate::features::{DescriptorKind, DetectorKind};

pub const HEADER: &str = "Detector Type, Descriptor Type";

/// Measurements of one (detector, descriptor) pair over the whole sequence
#[derive(Debug, Clone, PartialEq)]
pub struct SweepResult {
    pub detector: DetectorKind,
    pub descriptor: DescriptorKind,
    /// One entry per adjacent frame pair
    pub match_counts: Vec<usize>,
    /// One entry per frame
    pub detector_times_ms: Vec<f64>,
    /// One entry per frame
    pub descriptor_times_ms: Vec<f64>,
}

impl SweepResult {
    pub fn new(detector: DetectorKind, descriptor: DescriptorKind) -> Self {
        Self {
            detector,
            descriptor,
            match_counts: Vec::new(),
            detector_times_ms: Vec::new(),
            descriptor_times_ms: Vec::new(),
        }
    }

    /// `DET, DESC, counts.., Detector Times, times.., Descriptor Times, times..`
    pub fn to_line(&self) -> String {
        let mut fields = vec![self.detector.to_string(), self.descriptor.to_string()];
        fields.extend(self.match_counts.iter().map(|c| c.to_string()));
        fields.push("Detector Times".to_owned());
        fields.extend(self.detector_times_ms.iter().map(|t| format!("{t:.3}")));
        fields.push("Descriptor Times".to_owned());
        fields.extend(self.descriptor_times_ms.iter().map(|t| format!("{t:.3}")));
        fields.join(", ")
    }
}

/// Results file kept open for the whole sweep.
///
/// Every line is echoed to stdout.
pub struct ResultsArtifact<W: Write> {
    writer: W,
}

impl ResultsArtifact<BufWriter<File>> {
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        Self::new(BufWriter::new(File::create(path)?))
    }
}

impl<W: Write> ResultsArtifact<W> {
    /// Starts the artifact with its header line
    pub fn new(writer: W) -> io::Result<Self> {
        let mut artifact = Self { writer };
        artifact.write_line(HEADER)?;
        Ok(artifact)
    }

    pub fn append(&mut self, result: &SweepResult) -> io::Result<()> {
        self.write_line(&result.to_line())
    }

    // the line goes out in a single write so concurrent writers cannot interleave it
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        let line = format!("{line}\n");
        self.writer.write_all(line.as_bytes())?;
        self.writer.flush()?;
        print!("{line}");
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
