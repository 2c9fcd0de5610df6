use crate::op::BinOp;

#[test]
fn index_round_trips() {
    for i in 0..BinOp::COUNT {
        let op = BinOp::from_index(i).unwrap();
        assert_eq!(op.index(), i);
    }
    assert_eq!(BinOp::from_index(BinOp::COUNT), None);
}

#[test]
fn table_order_is_arith_then_comparisons() {
    assert_eq!(BinOp::from_index(0), Some(BinOp::Add));
    assert_eq!(BinOp::from_index(5), Some(BinOp::Pow));
    assert_eq!(BinOp::from_index(6), Some(BinOp::Lt));
    assert_eq!(BinOp::from_index(11), Some(BinOp::Gt));
}

#[test]
fn display_symbols() {
    assert_eq!(BinOp::Add.to_string(), "+");
    assert_eq!(BinOp::Pow.to_string(), "**");
    assert_eq!(BinOp::Ne.to_string(), "!=");
    assert_eq!(BinOp::Le.to_string(), "<=");
}
