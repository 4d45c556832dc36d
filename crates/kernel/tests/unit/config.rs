//! Configuration parsing and default tests.

use mk32_kernel::config::Config;
use pretty_assertions::assert_eq;
use rstest::rstest;

#[test]
fn defaults_describe_a_single_core_software_walked_machine() {
    let config = Config::default();
    assert_eq!(config.smp.num_cores, 1);
    assert_eq!(config.smp.ipi_timeout_ms, 10_000);
    assert_eq!(config.mmu.tlb_entries, 256);
    assert!(!config.mmu.hw_walker);
    assert_eq!(config.stack_size.bytes(), 8192);
}

#[test]
fn empty_json_yields_defaults() {
    let config = Config::from_json("{}").unwrap();
    assert_eq!(config.smp.num_cores, Config::default().smp.num_cores);
    assert_eq!(config.stack_size, Config::default().stack_size);
}

#[test]
fn nested_overrides_apply() {
    let config = Config::from_json(
        r#"{
            "stack_size": 16384,
            "mmu": { "tlb_entries": 64, "hw_walker": true },
            "smp": { "num_cores": 4, "ipi_timeout_ms": 500 }
        }"#,
    )
    .unwrap();
    assert_eq!(config.stack_size.bytes(), 16384);
    assert_eq!(config.mmu.tlb_entries, 64);
    assert!(config.mmu.hw_walker);
    assert_eq!(config.smp.num_cores, 4);
    assert_eq!(config.smp.ipi_timeout_ms, 500);
}

#[test]
fn partial_section_keeps_other_fields_default() {
    let config = Config::from_json(r#"{ "smp": { "num_cores": 2 } }"#).unwrap();
    assert_eq!(config.smp.num_cores, 2);
    assert_eq!(config.smp.ipi_timeout_ms, 10_000);
}

#[rstest]
#[case(4096)]
#[case(8192)]
#[case(65536)]
fn power_of_two_stack_sizes_accepted(#[case] size: u32) {
    let config = Config::from_json(&format!(r#"{{ "stack_size": {size} }}"#)).unwrap();
    assert_eq!(config.stack_size.bytes(), size);
}

#[rstest]
#[case(0)]
#[case(100)]
#[case(8191)]
fn non_power_of_two_stack_sizes_rejected(#[case] size: u32) {
    let err = Config::from_json(&format!(r#"{{ "stack_size": {size} }}"#));
    assert!(err.is_err());
}
