//! Workload script integration tests
//!
//! Drives the allocator through scripts and configuration files the way the
//! `fitalloc` binary does

use fitalloc::{
    parse_script, AllocError, AllocatorBuilder, AllocatorConfig, BlockAddr, FitPolicy,
    StatsFormat, Workload,
};
use std::io::Write;
use tempfile::NamedTempFile;

fn run(capacity: usize, policy: FitPolicy, script: &str) -> (Workload, String) {
    let alloc = AllocatorBuilder::new()
        .capacity(capacity)
        .policy(policy)
        .build()
        .unwrap();
    let mut workload = Workload::new(alloc);
    let steps = parse_script(script).unwrap();

    let mut out = Vec::new();
    workload.run(&steps, &mut out).unwrap();
    (workload, String::from_utf8(out).unwrap())
}

#[test]
fn test_alloc_free_round_trip() {
    let script = "\
alloc a 100
alloc b 200
free a
free b
available
check
";
    let (workload, out) = run(1024, FitPolicy::FirstFit, script);
    let lines: Vec<_> = out.lines().collect();

    assert_eq!(lines[0], "alloc a 100 -> 0x0008");
    assert_eq!(lines[1], "alloc b 200 -> 0x0074");
    assert_eq!(lines[2], "free a");
    assert_eq!(lines[3], "free b");
    assert_eq!(lines[4], "Available memory = 1016");
    assert_eq!(lines[5], "check ok");

    assert_eq!(workload.allocator().free_blocks(), vec![BlockAddr::new(8)]);
}

#[test]
fn test_exhaustion_reports_null() {
    let (workload, out) = run(64, FitPolicy::BestFit, "alloc a 40\nalloc b 40\n");
    assert!(out.contains("alloc b 40 -> null"));
    assert_eq!(workload.address_of("b"), None);
    assert!(workload.address_of("a").is_some());
}

#[test]
fn test_stats_text_output() {
    let (_, out) = run(256, FitPolicy::FirstFit, "alloc a 24\nstats\n");
    let expected = "\
alloc a 24 -> 0x0008
Allocated size = 32
Allocated chunks = 1
Free size = 224
Free chunks = 1
Largest free chunk size = 224
Smallest free chunk size = 224
";
    assert_eq!(out, expected);
}

#[test]
fn test_stats_on_full_arena() {
    let (_, out) = run(64, FitPolicy::FirstFit, "alloc a 56\nstats\n");
    assert!(out.contains("Free chunks = 0"));
    assert!(out.contains("Largest free chunk size = 0"));
    assert!(out.contains("Smallest free chunk size = 64"));
}

#[test]
fn test_compact_output_lists_moves() {
    let script = "\
alloc a 8
alloc b 8
alloc c 8
free a
compact
check
";
    let (workload, out) = run(128, FitPolicy::FirstFit, script);

    assert!(out.contains("compact -> 2 blocks"));
    assert!(out.contains("  0x0018 -> 0x0008"));
    assert!(out.contains("  0x0028 -> 0x0018"));
    assert_eq!(workload.address_of("b"), Some(BlockAddr::new(8)));
    assert_eq!(workload.address_of("c"), Some(BlockAddr::new(24)));
}

#[test]
fn test_json_stats_lines() {
    let alloc = AllocatorBuilder::new().capacity(512).build().unwrap();
    let mut workload = Workload::new(alloc).with_format(StatsFormat::Json);
    let steps = parse_script("stats\nalloc a 56\nstats\n").unwrap();

    let mut out = Vec::new();
    workload.run(&steps, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    let records: Vec<serde_json::Value> = text
        .lines()
        .filter(|l| l.starts_with('{'))
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["line"], 1);
    assert_eq!(records[0]["free_size"], 512);
    assert_eq!(records[1]["line"], 3);
    assert_eq!(records[1]["allocated_size"], 64);
    assert_eq!(records[1]["allocated_chunks"], 1);
}

#[test]
fn test_duplicate_name_is_script_error() {
    let alloc = AllocatorBuilder::new().capacity(256).build().unwrap();
    let mut workload = Workload::new(alloc);
    let steps = parse_script("alloc a 8\nalloc a 8\n").unwrap();

    let err = workload.run(&steps, &mut Vec::new()).unwrap_err();
    assert!(matches!(err, AllocError::Script { line: 2, .. }));
}

#[test]
fn test_zero_size_alloc_is_rejected() {
    let alloc = AllocatorBuilder::new().capacity(256).build().unwrap();
    let mut workload = Workload::new(alloc);
    let steps = parse_script("alloc a 0\n").unwrap();

    let err = workload.run(&steps, &mut Vec::new()).unwrap_err();
    assert!(matches!(err, AllocError::InvalidSize(0)));
}

#[test]
fn test_config_file_drives_policy() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "capacity = 358").unwrap();
    writeln!(file, "policy = \"worst_fit\"").unwrap();

    // serde only accepts the kebab-case spelling
    let err = AllocatorConfig::from_path(file.path()).unwrap_err();
    assert!(matches!(err, AllocError::Toml(_)));

    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "capacity = 358\npolicy = \"worst-fit\"").unwrap();
    let config = AllocatorConfig::from_path(file.path()).unwrap();
    let alloc = AllocatorBuilder::new().config(config).build().unwrap();
    assert_eq!(alloc.policy(), FitPolicy::WorstFit);
    assert_eq!(alloc.capacity(), 358);
}
