//! Cross-core invalidation queue tests.

use mk32_kernel::common::{PhysAddr, VirtAddr};
use mk32_kernel::mm::{AsidAllocator, Pte, Tlb};
use mk32_kernel::smp::{FlushQueues, FlushRequest};
use pretty_assertions::assert_eq;

fn seeded_tlb(entries: &[(u32, u16)]) -> Tlb {
    let mut tlb = Tlb::new(16);
    for &(va, asid) in entries {
        tlb.insert(
            VirtAddr::new(va),
            asid,
            Pte::leaf(PhysAddr::new(0x9000), true, true, false, true, true),
        );
    }
    tlb
}

#[test]
fn apply_drains_only_the_owning_cores_queue() {
    let queues = FlushQueues::new(2);
    queues.push(0, FlushRequest::All);
    queues.push(1, FlushRequest::All);

    let mut tlb = seeded_tlb(&[(0x2000, 3)]);
    let mut asids = AsidAllocator::new();
    queues.apply(0, &mut tlb, &mut asids);

    assert_eq!(queues.pending(0), 0);
    assert_eq!(queues.pending(1), 1);
    assert!(tlb.lookup(VirtAddr::new(0x2000), 3).is_none());
}

#[test]
fn space_request_flushes_one_context() {
    let queues = FlushQueues::new(1);
    queues.push(0, FlushRequest::Space { asid: 3 });

    let mut tlb = seeded_tlb(&[(0x2000, 3), (0x3000, 7)]);
    let mut asids = AsidAllocator::new();
    queues.apply(0, &mut tlb, &mut asids);

    assert!(tlb.lookup(VirtAddr::new(0x2000), 3).is_none());
    assert!(tlb.lookup(VirtAddr::new(0x3000), 7).is_some());
}

#[test]
fn range_request_is_address_scoped() {
    let queues = FlushQueues::new(1);
    queues.push(
        0,
        FlushRequest::Range {
            asid: 3,
            start: VirtAddr::new(0x2000),
            end: VirtAddr::new(0x3000),
        },
    );

    let mut tlb = seeded_tlb(&[(0x2000, 3), (0x3000, 3)]);
    let mut asids = AsidAllocator::new();
    queues.apply(0, &mut tlb, &mut asids);

    assert!(tlb.lookup(VirtAddr::new(0x2000), 3).is_none());
    assert!(tlb.lookup(VirtAddr::new(0x3000), 3).is_some());
}

#[test]
fn retire_flushes_and_releases_the_context() {
    let queues = FlushQueues::new(1);
    let mut asids = AsidAllocator::new();
    let asid = asids.get().unwrap();
    let mut tlb = seeded_tlb(&[(0x2000, asid)]);

    queues.push(0, FlushRequest::Retire { asid });
    queues.apply(0, &mut tlb, &mut asids);

    assert!(tlb.lookup(VirtAddr::new(0x2000), asid).is_none());
    assert!(!asids.in_use(asid));
}

#[test]
fn queued_requests_apply_in_order() {
    let queues = FlushQueues::new(1);
    let mut asids = AsidAllocator::new();
    let mut tlb = seeded_tlb(&[(0x2000, 3), (0x3000, 7)]);

    queues.push(0, FlushRequest::Space { asid: 3 });
    queues.push(0, FlushRequest::Space { asid: 7 });
    assert_eq!(queues.pending(0), 2);

    queues.apply(0, &mut tlb, &mut asids);
    assert!(tlb.lookup(VirtAddr::new(0x2000), 3).is_none());
    assert!(tlb.lookup(VirtAddr::new(0x3000), 7).is_none());
}
