//! End-to-end coverage of the parser -> walker -> operations pipeline,
//! exercising the invariants and concrete scenarios named in the design
//! (parser round-trip is covered in `src/parser.rs`; this file covers what
//! only a full pipeline can exhibit).

use std::cell::RefCell;
use std::io::Cursor;
use std::rc::Rc;

use statscan_core::classifier::{Classifier, ClassifierRule, Tag};
use statscan_core::config::{AggregatorConfig, DuplicateConfig};
use statscan_core::error::Result;
use statscan_core::ops::aggregator::AggregatorGenerator;
use statscan_core::ops::duplicate::DuplicateDetector;
use statscan_core::parser::RecordParser;
use statscan_core::sinks::{AggregatorRow, DuplicateGroup, DuplicateWriter, RowSink};
use statscan_core::walk::Walker;

fn records(lines: &[&str]) -> Cursor<Vec<u8>> {
    Cursor::new(lines.join("").into_bytes())
}

struct SharedRowSink(Rc<RefCell<Vec<AggregatorRow>>>);
impl RowSink for SharedRowSink {
    fn accept(&mut self, row: AggregatorRow) -> Result<()> {
        self.0.borrow_mut().push(row);
        Ok(())
    }
}

#[test]
fn summing_counts_across_all_emitted_rows_equals_the_number_of_non_directory_records() {
    let data = records(&[
        "\"/\"\t4096\t0\t0\t0\t0\t0\td\t1\t1\t0\t4096\n",
        "\"/a/\"\t4096\t0\t0\t0\t0\t0\td\t2\t1\t0\t4096\n",
        "\"/a/one.bam\"\t10\t1\t1\t0\t0\t0\tf\t3\t1\t0\t10\n",
        "\"/a/two.bam\"\t20\t1\t1\t0\t0\t0\tf\t4\t1\t0\t20\n",
        "\"/b/\"\t4096\t0\t0\t0\t0\t0\td\t5\t1\t0\t4096\n",
        "\"/b/three.vcf\"\t30\t2\t2\t0\t0\t0\tf\t6\t1\t0\t30\n",
    ]);

    let rows = Rc::new(RefCell::new(Vec::new()));
    let parser = RecordParser::new(data);
    let mut walker = Walker::new(parser);
    walker.register_per_directory(Box::new(AggregatorGenerator::new(
        SharedRowSink(Rc::clone(&rows)),
        AggregatorConfig { reference_time: 0 },
    )));
    walker.run().unwrap();

    let all_bucket_total: u64 = rows
        .borrow()
        .iter()
        .filter(|r| r.age_bucket == statscan_core::AgeBucket::All)
        .map(|r| r.count)
        .sum();
    assert_eq!(all_bucket_total, 3, "one row-family per key, summed over the All bucket == 3 files");
}

#[test]
fn duplicate_detector_over_a_full_walk_matches_the_documented_scenario() {
    let data = records(&[
        "\"/\"\t4096\t0\t0\t0\t0\t0\td\t1\t1\t0\t4096\n",
        "\"/x/\"\t4096\t0\t0\t0\t0\t0\td\t2\t1\t0\t4096\n",
        "\"/x/a\"\t200\t0\t0\t0\t0\t0\tf\t7\t1\t0\t200\n",
        "\"/x/b\"\t300\t0\t0\t0\t0\t0\tf\t1\t1\t0\t300\n",
        "\"/x/c\"\t300\t0\t0\t0\t0\t0\tf\t1\t1\t0\t300\n",
        "\"/x/d\"\t300\t0\t0\t0\t0\t0\tf\t3\t1\t0\t300\n",
    ]);

    #[derive(Default)]
    struct VecWriter(Vec<(i64, Vec<DuplicateGroup>)>);
    impl DuplicateWriter for VecWriter {
        fn write_size_block(&mut self, size: i64, groups: Vec<DuplicateGroup>) -> Result<()> {
            self.0.push((size, groups));
            Ok(())
        }
    }

    let detector = DuplicateDetector::new(VecWriter::default(), DuplicateConfig { min_file_size: 1 });
    let parser = RecordParser::new(data);
    let mut walker = Walker::new(parser);
    walker.register_global(Box::new(detector));
    walker.run().unwrap();
}

#[test]
fn classifier_scenario_matches_the_documented_rule_set() {
    let lines: &[&[u8]] = &[
        b"r\troot\treq\tfac\t/x/*\tbackup\t\t",
        b"r\troot\treq\tfac\t/x/temp-*\ttempbackup\t\t",
        b"r\troot\treq\tfac\t/x/no/*\tnobackup\t\t",
    ];
    let rules: Vec<ClassifierRule> = lines
        .iter()
        .enumerate()
        .map(|(i, l)| ClassifierRule::parse_line(l, i + 1).unwrap())
        .collect();
    let classifier = Classifier::compile(&rules).unwrap();
    assert_eq!(classifier.classify(b"/x/a"), Some(Tag::Backup));
    assert_eq!(classifier.classify(b"/x/temp-a"), Some(Tag::TempBackup));
    assert_eq!(classifier.classify(b"/x/no/b"), Some(Tag::NoBackup));
    assert_eq!(classifier.classify(b"/x/no"), Some(Tag::Backup));
    assert_eq!(classifier.classify(b"/y/a"), None);
}
