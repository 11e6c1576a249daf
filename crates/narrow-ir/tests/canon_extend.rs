//! Canonicalization rules for the extend kinds, plus the synonym rules
//! shared by the whole family.

use narrow_ir::test_harness::canon;
use narrow_ir::{Canonical, ConvertKind, Graph, IntegerStamp};

#[test]
fn identity_conversions_disappear() {
    let mut g = Graph::new();
    let x = g.param(16).unwrap();
    let n = g.narrow(x, 16).unwrap();
    let sx = g.sign_extend(x, 16).unwrap();
    let zx = g.zero_extend(x, 16).unwrap();

    assert_eq!(canon(&g, n), Canonical::Existing(x));
    assert_eq!(canon(&g, sx), Canonical::Existing(x));
    assert_eq!(canon(&g, zx), Canonical::Existing(x));
}

#[test]
fn constant_operands_fold() {
    let mut g = Graph::new();

    let c = g.constant(64, 0x0001_5678).unwrap();
    let n = g.narrow(c, 16).unwrap();
    assert_eq!(
        canon(&g, n),
        Canonical::Constant {
            bits: 16,
            value: 0x5678
        }
    );

    let minus_one = g.constant(8, -1).unwrap();
    let sx = g.sign_extend(minus_one, 32).unwrap();
    assert_eq!(
        canon(&g, sx),
        Canonical::Constant {
            bits: 32,
            value: -1
        }
    );

    let zx = g.zero_extend(minus_one, 32).unwrap();
    assert_eq!(
        canon(&g, zx),
        Canonical::Constant {
            bits: 32,
            value: 255
        }
    );
}

#[test]
fn truncating_constant_reinterprets_sign() {
    let mut g = Graph::new();
    let c = g.constant(64, 0x8765).unwrap();
    let n = g.narrow(c, 16).unwrap();
    assert_eq!(
        canon(&g, n),
        Canonical::Constant {
            bits: 16,
            value: -30875
        }
    );
}

#[test]
fn nested_sign_extends_fold() {
    let mut g = Graph::new();
    let x = g.param(8).unwrap();
    let inner = g.sign_extend(x, 16).unwrap();
    let outer = g.sign_extend(inner, 32).unwrap();

    match canon(&g, outer) {
        Canonical::Convert(spec) => {
            assert_eq!(spec.kind, ConvertKind::SignExtend);
            assert_eq!(spec.operand, x);
            assert_eq!(spec.input_bits, 8);
            assert_eq!(spec.result_bits, 32);
        }
        other => panic!("expected one sign-extend, got {other:?}"),
    }
}

#[test]
fn sign_extend_of_zero_extend_stays_zero_extend() {
    let mut g = Graph::new();
    let x = g.param(8).unwrap();
    let inner = g.zero_extend(x, 16).unwrap();
    let outer = g.sign_extend(inner, 64).unwrap();

    // The zero-extended value's sign bit is already clear, so the outer
    // sign-extend pads with zeros too.
    match canon(&g, outer) {
        Canonical::Convert(spec) => {
            assert_eq!(spec.kind, ConvertKind::ZeroExtend);
            assert_eq!(spec.operand, x);
            assert_eq!(spec.input_bits, 8);
            assert_eq!(spec.result_bits, 64);
        }
        other => panic!("expected a zero-extend, got {other:?}"),
    }
}

#[test]
fn sign_extend_of_provably_positive_value_becomes_zero_extend() {
    let mut g = Graph::new();
    let p = g.param_with_stamp(IntegerStamp::from_masks(16, 0, 0x7FFF));
    let sx = g.sign_extend(p, 64).unwrap();

    match canon(&g, sx) {
        Canonical::Convert(spec) => {
            assert_eq!(spec.kind, ConvertKind::ZeroExtend);
            assert_eq!(spec.operand, p);
            assert!(spec.input_always_positive);
        }
        other => panic!("expected a zero-extend, got {other:?}"),
    }
}

#[test]
fn sign_extend_of_unknown_sign_is_unchanged() {
    let mut g = Graph::new();
    let x = g.param(16).unwrap();
    let sx = g.sign_extend(x, 64).unwrap();
    assert_eq!(canon(&g, sx), Canonical::Unchanged);
}

#[test]
fn nested_zero_extends_fold_and_keep_the_hint() {
    let mut g = Graph::new();
    let x = g.param(8).unwrap();
    let inner = g.zero_extend_with_hint(x, 16, true).unwrap();
    let outer = g.zero_extend(inner, 64).unwrap();

    match canon(&g, outer) {
        Canonical::Convert(spec) => {
            assert_eq!(spec.kind, ConvertKind::ZeroExtend);
            assert_eq!(spec.operand, x);
            assert_eq!(spec.input_bits, 8);
            assert_eq!(spec.result_bits, 64);
            assert!(spec.input_always_positive);
        }
        other => panic!("expected one zero-extend, got {other:?}"),
    }
}

#[test]
fn zero_extend_of_narrow_cancels_when_high_bits_are_zero() {
    let mut g = Graph::new();
    let v = g.param_with_stamp(IntegerStamp::from_masks(32, 0, 0xFF));
    let n = g.narrow(v, 8).unwrap();
    let zx = g.zero_extend(n, 32).unwrap();
    assert_eq!(canon(&g, zx), Canonical::Existing(v));
}

#[test]
fn zero_extend_of_narrow_keeps_only_the_narrow() {
    let mut g = Graph::new();
    let v = g.param_with_stamp(IntegerStamp::from_masks(32, 0, 0xFF));
    let n = g.narrow(v, 8).unwrap();
    let zx = g.zero_extend(n, 16).unwrap();

    match canon(&g, zx) {
        Canonical::Convert(spec) => {
            assert_eq!(spec.kind, ConvertKind::Narrow);
            assert_eq!(spec.operand, v);
            assert_eq!(spec.input_bits, 32);
            assert_eq!(spec.result_bits, 16);
        }
        other => panic!("expected a direct narrow, got {other:?}"),
    }
}

#[test]
fn zero_extend_of_narrow_keeps_only_the_extend() {
    let mut g = Graph::new();
    let v = g.param_with_stamp(IntegerStamp::from_masks(16, 0, 0xFF));
    let n = g.narrow(v, 8).unwrap();
    let zx = g.zero_extend(n, 64).unwrap();

    match canon(&g, zx) {
        Canonical::Convert(spec) => {
            assert_eq!(spec.kind, ConvertKind::ZeroExtend);
            assert_eq!(spec.operand, v);
            assert_eq!(spec.input_bits, 16);
            assert_eq!(spec.result_bits, 64);
            assert!(spec.input_always_positive);
        }
        other => panic!("expected a direct zero-extend, got {other:?}"),
    }
}

#[test]
fn zero_extend_of_lossy_narrow_is_unchanged() {
    let mut g = Graph::new();
    let v = g.param(32).unwrap();
    let n = g.narrow(v, 8).unwrap();
    let zx = g.zero_extend(n, 32).unwrap();
    assert_eq!(canon(&g, zx), Canonical::Unchanged);
}
