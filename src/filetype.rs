//! Filetype classification for the dir/group/user/type/age aggregator
//! (spec §4.4): a small closed enum, derived from a file's basename via a
//! lookup table rather than by inspecting file content.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FileTypeClass {
    Cram,
    Bam,
    Vcf,
    Fasta,
    Fastq,
    Text,
    Log,
    Compressed,
    Temp,
    Other,
}

impl FileTypeClass {
    pub const ALL: [Self; 10] = [
        Self::Cram,
        Self::Bam,
        Self::Vcf,
        Self::Fasta,
        Self::Fastq,
        Self::Text,
        Self::Log,
        Self::Compressed,
        Self::Temp,
        Self::Other,
    ];

    /// Classifies a bare filename by suffix and a handful of temp-file
    /// conventions. Directories are never classified by the caller — this
    /// only looks at file basenames.
    #[must_use]
    pub fn from_name(name: &[u8]) -> Self {
        if is_temp_name(name) {
            return Self::Temp;
        }
        let lower = to_ascii_lower(name);
        for &(suffix, class) in SUFFIX_TABLE {
            if lower.ends_with(suffix.as_bytes()) {
                return class;
            }
        }
        Self::Other
    }
}

impl fmt::Display for FileTypeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cram => "cram",
            Self::Bam => "bam",
            Self::Vcf => "vcf",
            Self::Fasta => "fasta",
            Self::Fastq => "fastq",
            Self::Text => "text",
            Self::Log => "log",
            Self::Compressed => "compressed",
            Self::Temp => "temp",
            Self::Other => "other",
        })
    }
}

/// Suffixes are checked longest-first so e.g. `.vcf.gz` resolves to `Vcf`
/// rather than the generic `Compressed` bucket.
const SUFFIX_TABLE: &[(&str, FileTypeClass)] = &[
    (".cram", FileTypeClass::Cram),
    (".cram.crai", FileTypeClass::Cram),
    (".bam", FileTypeClass::Bam),
    (".bam.bai", FileTypeClass::Bam),
    (".vcf.gz", FileTypeClass::Vcf),
    (".vcf", FileTypeClass::Vcf),
    (".fasta.gz", FileTypeClass::Fasta),
    (".fasta", FileTypeClass::Fasta),
    (".fa.gz", FileTypeClass::Fasta),
    (".fa", FileTypeClass::Fasta),
    (".fastq.gz", FileTypeClass::Fastq),
    (".fastq", FileTypeClass::Fastq),
    (".fq.gz", FileTypeClass::Fastq),
    (".fq", FileTypeClass::Fastq),
    (".log", FileTypeClass::Log),
    (".gz", FileTypeClass::Compressed),
    (".bz2", FileTypeClass::Compressed),
    (".zip", FileTypeClass::Compressed),
    (".xz", FileTypeClass::Compressed),
    (".txt", FileTypeClass::Text),
    (".csv", FileTypeClass::Text),
    (".tsv", FileTypeClass::Text),
];

fn is_temp_name(name: &[u8]) -> bool {
    name.starts_with(b".tmp")
        || name.starts_with(b"tmp")
        || name.ends_with(b".tmp")
        || name.ends_with(b"~")
        || (name.starts_with(b".") && name.ends_with(b".swp"))
}

fn to_ascii_lower(name: &[u8]) -> Vec<u8> {
    name.iter().map(u8::to_ascii_lowercase).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_common_bioinformatics_suffixes() {
        assert_eq!(FileTypeClass::from_name(b"sample.cram"), FileTypeClass::Cram);
        assert_eq!(FileTypeClass::from_name(b"sample.bam"), FileTypeClass::Bam);
        assert_eq!(FileTypeClass::from_name(b"calls.vcf.gz"), FileTypeClass::Vcf);
        assert_eq!(FileTypeClass::from_name(b"ref.fasta"), FileTypeClass::Fasta);
        assert_eq!(FileTypeClass::from_name(b"reads.fastq.gz"), FileTypeClass::Fastq);
    }

    #[test]
    fn classifies_temp_files_before_suffix_table() {
        assert_eq!(FileTypeClass::from_name(b".tmp12345.bam"), FileTypeClass::Temp);
        assert_eq!(FileTypeClass::from_name(b"scratch~"), FileTypeClass::Temp);
    }

    #[test]
    fn falls_back_to_other() {
        assert_eq!(FileTypeClass::from_name(b"README"), FileTypeClass::Other);
    }

    #[test]
    fn is_case_insensitive() {
        assert_eq!(FileTypeClass::from_name(b"SAMPLE.BAM"), FileTypeClass::Bam);
    }
}
