//! Source-file I/O for the ingestion pipeline.
//!
//! This module handles opening local VCF sources in the compression
//! formats the pipeline accepts (plain, GZIP, BGZF), detected from the
//! file extension.

use std::fs::File;
use std::io::BufReader;
use std::num::NonZero;
use std::path::Path;

use flate2::read::MultiGzDecoder;
use log::debug;
use noodles_bgzf as bgzf;
use noodles_vcf as vcf;

/// Compression type of a VCF source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VcfCompressionType {
    /// No compression (plain text VCF).
    #[default]
    Plain,
    /// Standard GZIP compression.
    Gzip,
    /// BGZF compression (block-gzipped).
    Bgzf,
}

impl VcfCompressionType {
    /// Determines compression type from the file extension:
    /// `.bgz`/`.bgzf` → BGZF, `.gz` → GZIP, otherwise plain.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        let path_str = path.as_ref().to_string_lossy().to_lowercase();
        if path_str.ends_with(".bgz") || path_str.ends_with(".bgzf") {
            VcfCompressionType::Bgzf
        } else if path_str.ends_with(".gz") {
            VcfCompressionType::Gzip
        } else {
            VcfCompressionType::Plain
        }
    }
}

/// A unified reader over local VCF sources.
///
/// Ingestion is single-threaded and batch-sequential, so the readers here
/// are synchronous; BGZF decompression still fans out to worker threads.
pub enum VcfSourceReader {
    /// Reader for uncompressed sources.
    Plain(vcf::io::Reader<BufReader<File>>),
    /// Reader for GZIP-compressed sources.
    Gzip(vcf::io::Reader<BufReader<MultiGzDecoder<File>>>),
    /// Reader for BGZF-compressed sources.
    Bgzf(vcf::io::Reader<bgzf::io::MultithreadedReader<File>>),
}

impl VcfSourceReader {
    /// Opens a local VCF source, detecting compression from the path.
    pub fn open<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        Self::open_with_threads(path, 1)
    }

    /// Opens a local VCF source with an explicit BGZF worker count.
    pub fn open_with_threads<P: AsRef<Path>>(path: P, thread_num: usize) -> std::io::Result<Self> {
        let compression = VcfCompressionType::from_path(&path);
        debug!(
            "opening VCF source {} ({:?})",
            path.as_ref().display(),
            compression
        );
        let file = File::open(path)?;
        match compression {
            VcfCompressionType::Plain => Ok(VcfSourceReader::Plain(vcf::io::Reader::new(
                BufReader::new(file),
            ))),
            VcfCompressionType::Gzip => Ok(VcfSourceReader::Gzip(vcf::io::Reader::new(
                BufReader::new(MultiGzDecoder::new(file)),
            ))),
            VcfCompressionType::Bgzf => {
                let worker_count = NonZero::new(thread_num.max(1)).unwrap();
                Ok(VcfSourceReader::Bgzf(vcf::io::Reader::new(
                    bgzf::io::MultithreadedReader::with_worker_count(worker_count, file),
                )))
            }
        }
    }

    /// Reads the VCF header, consuming the header block.
    pub fn read_header(&mut self) -> std::io::Result<vcf::Header> {
        match self {
            VcfSourceReader::Plain(reader) => reader.read_header(),
            VcfSourceReader::Gzip(reader) => reader.read_header(),
            VcfSourceReader::Bgzf(reader) => reader.read_header(),
        }
    }

    /// Iterates over the data lines following the header.
    pub fn records(&mut self) -> Box<dyn Iterator<Item = std::io::Result<vcf::Record>> + '_> {
        match self {
            VcfSourceReader::Plain(reader) => Box::new(reader.records()),
            VcfSourceReader::Gzip(reader) => Box::new(reader.records()),
            VcfSourceReader::Bgzf(reader) => Box::new(reader.records()),
        }
    }
}
