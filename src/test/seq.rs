use crate::link::SeqSpace;

#[test]
fn inc_and_dec_wrap_around_the_modulus() {
    let s = SeqSpace::with_bits(3);
    assert_eq!(s.modulus(), 8);
    assert_eq!(s.inc(7), 0);
    assert_eq!(s.dec(0), 7);
    assert_eq!(s.add(6, 5), 3);
    assert_eq!(s.add(u32::MAX, 1), s.inc(s.wrap(u32::MAX)));
}

#[test]
fn distance_is_forward_modular() {
    let s = SeqSpace::new(8);
    assert_eq!(s.distance(6, 1), 3);
    assert_eq!(s.distance(1, 6), 5);
    assert_eq!(s.distance(4, 4), 0);
}

#[test]
fn between_handles_windows_that_wrap() {
    let s = SeqSpace::new(8);
    // 窗口 [6, 2)：6, 7, 0, 1
    for b in [6, 7, 0, 1] {
        assert!(s.between(6, b, 2), "{b} should be inside [6, 2)");
    }
    for b in [2, 3, 4, 5] {
        assert!(!s.between(6, b, 2), "{b} should be outside [6, 2)");
    }
    // 空区间
    assert!(!s.between(3, 3, 3));
}

#[test]
fn one_bit_and_degenerate_spaces() {
    let one_bit = SeqSpace::new(2);
    assert_eq!(one_bit.inc(1), 0);
    assert_eq!(one_bit.dec(0), 1);
    assert_eq!(one_bit.max_window(), 1);

    let unit = SeqSpace::new(0);
    assert_eq!(unit.modulus(), 1);
    assert_eq!(unit.inc(0), 0);
    assert_eq!(unit.dec(0), 0);
    assert_eq!(unit.max_window(), 1);
}

#[test]
fn max_window_is_half_the_space() {
    assert_eq!(SeqSpace::with_bits(3).max_window(), 4);
    assert_eq!(SeqSpace::with_bits(16).max_window(), 32_768);
}

#[test]
fn reorder_tolerance_needs_room_beyond_half_the_space() {
    let s = SeqSpace::with_bits(3);
    assert!(!s.tolerates_reorder(4, 50, 150));
    assert!(s.tolerates_reorder(4, 100, 100));
    // n = 3：最大时延必须严格小于 5 个最小时延
    assert!(s.tolerates_reorder(2, 50, 249));
    assert!(!s.tolerates_reorder(2, 50, 250));

    assert!(SeqSpace::with_bits(4).tolerates_reorder(4, 50, 150));
    assert!(!SeqSpace::with_bits(4).tolerates_reorder(8, 50, 150));
    assert!(!SeqSpace::new(2).tolerates_reorder(1, 50, 150));
    assert!(!SeqSpace::new(1).tolerates_reorder(1, 0, 1));
}
