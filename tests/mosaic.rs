// Copyright 2022 RisingLight Project Authors. Licensed under Apache-2.0.

use mosaic::storage::{
    compress_delta, estimate_delta, BlockIterator, Candidates, MosaicBlock, MosaicColumn,
    MosaicColumnBuilder, MosaicOptions, PrimitiveFixedWidthEncode, RangePredicate, StorageError,
    Strategy as BlockStrategy, ThetaOp,
};
use proptest::prelude::*;

fn build_column<T: PrimitiveFixedWidthEncode>(
    values: &[T],
    options: MosaicOptions,
) -> MosaicColumn<T> {
    let mut builder = MosaicColumnBuilder::new(options);
    // append in two halves to cover appends spanning pending raw rows
    let (left, right) = values.split_at(values.len() / 2);
    builder.append(left);
    builder.append(right);
    let (index, data) = builder.finish();
    MosaicColumn::open(index, data).unwrap()
}

/// A random walk with small steps and occasional large jumps.
fn walk() -> impl Strategy<Value = Vec<i64>> {
    (
        any::<i32>(),
        prop::collection::vec(
            prop_oneof![9 => -300i64..300, 1 => any::<i32>().prop_map(i64::from)],
            0..600,
        ),
    )
        .prop_map(|(base, steps)| {
            let mut acc = base as i64;
            let mut values = vec![acc];
            for step in steps {
                acc = acc.saturating_add(step);
                values.push(acc);
            }
            values
        })
}

/// i16 walk whose steps often exceed the 7-bit code limit.
fn walk_i16() -> impl Strategy<Value = Vec<i16>> {
    (
        any::<i16>(),
        prop::collection::vec(prop_oneof![9 => -80i16..80, 1 => any::<i16>()], 0..600),
    )
        .prop_map(|(base, steps)| {
            let mut acc = base;
            let mut values = vec![acc];
            for step in steps {
                acc = acc.saturating_add(step);
                values.push(acc);
            }
            values
        })
}

/// i128 walk, starting anywhere including next to the extremes.
fn walk_i128() -> impl Strategy<Value = Vec<i128>> {
    (
        prop_oneof![
            any::<i128>(),
            Just(i128::MAX - 500),
            Just(i128::MIN + 1),
        ],
        prop::collection::vec(
            prop_oneof![9 => -1000i128..1000, 1 => any::<i64>().prop_map(i128::from)],
            0..600,
        ),
    )
        .prop_map(|(base, steps)| {
            let mut acc = base;
            let mut values = vec![acc];
            for step in steps {
                acc = acc.saturating_add(step);
                values.push(acc);
            }
            values
        })
}

fn positions(len: usize) -> impl Strategy<Value = Vec<usize>> {
    prop::collection::btree_set(0..len + 10, 0..64).prop_map(|set| set.into_iter().collect())
}

#[test]
fn scenario_100_103_99_99_250() {
    let values = [100i32, 103, 99, 99, 250];
    let estimate = estimate_delta(&values, &MosaicOptions::default()).unwrap();
    assert_eq!(estimate.count, 5);
    assert_eq!(estimate.bit_width, 9);

    let block = compress_delta(&estimate, &values, 0).unwrap();
    let codes = (0..5).map(|i| block.codes().get(i)).collect::<Vec<_>>();
    assert_eq!(codes, vec![0, 3, 256 | 4, 0, 151]);

    let mut out = vec![];
    let mut scanner = block.iter();
    assert_eq!(scanner.next_batch(None, &mut out), 5);
    assert_eq!(out, values);

    let matched = block
        .select(&Candidates::all(), |v: &i32| *v == 99)
        .collect::<Vec<_>>();
    assert_eq!(matched, vec![2, 3]);

    let mut projected = vec![];
    block.project(&Candidates::from(&[0, 4][..]), &mut projected);
    assert_eq!(projected, vec![100, 250]);
}

#[test]
fn unsupported_types_fall_back() {
    assert!(matches!(
        estimate_delta(&[1i8, 2, 3], &MosaicOptions::default()),
        Err(StorageError::NotApplicable(BlockStrategy::Delta, _))
    ));
    assert!(matches!(
        estimate_delta(&[1.0f64, 2.0], &MosaicOptions::default()),
        Err(StorageError::NotApplicable(BlockStrategy::Delta, _))
    ));
}

#[test]
fn concurrent_readers() {
    let values = (0..5000i64).map(|i| i * 7 % 1000).collect::<Vec<_>>();
    let column = build_column(&values, MosaicOptions::default_for_test());
    std::thread::scope(|s| {
        for t in 0..4i64 {
            let column = &column;
            let values = &values;
            s.spawn(move || {
                assert_eq!(column.decompress(), *values);
                let pred = RangePredicate::theta(ThetaOp::Eq, t * 7);
                let expected = (0..values.len())
                    .filter(|&i| values[i] == t * 7)
                    .collect::<Vec<_>>();
                assert_eq!(column.select(&Candidates::all(), pred), expected);
            });
        }
    });
}

proptest! {
    #[test]
    fn estimate_makes_progress(values in walk()) {
        let options = MosaicOptions::default_for_test();
        match estimate_delta(&values, &options) {
            Ok(estimate) => {
                prop_assert!(estimate.count >= 1);
                prop_assert!(estimate.count <= values.len().min(options.max_block_rows));
                prop_assert!(values.len() == 1 || estimate.count >= 2);
            }
            Err(err) => {
                prop_assert!(values.len() >= 2);
                prop_assert!(err.is_recoverable());
            }
        }
    }

    #[test]
    fn block_reconstructs_prefix(values in walk()) {
        if let Ok(estimate) = estimate_delta(&values, &MosaicOptions::default()) {
            let block = compress_delta(&estimate, &values, 0).unwrap();
            let mut out = vec![];
            block.decompress(&mut out);
            prop_assert_eq!(&out[..], &values[..estimate.count]);
        }
    }

    #[test]
    fn column_round_trip(values in walk(), is_delta in any::<bool>()) {
        let options = MosaicOptions { is_delta, ..MosaicOptions::default_for_test() };
        let column = build_column(&values, options.clone());
        prop_assert_eq!(column.len(), values.len());
        prop_assert_eq!(column.decompress(), values.clone());

        let mut next = 0;
        for entry in column.index() {
            prop_assert_eq!(entry.first_rowid, next);
            prop_assert!(entry.row_count as usize <= options.max_block_rows);
            if !is_delta {
                prop_assert_eq!(entry.strategy, BlockStrategy::Raw);
            }
            next += entry.row_count;
        }
    }

    #[test]
    fn column_round_trip_i16(values in walk_i16()) {
        let column = build_column(&values, MosaicOptions::default_for_test());
        prop_assert_eq!(column.decompress(), values.clone());
        for block in column.blocks() {
            if let MosaicBlock::Delta(block) = block {
                prop_assert!(block.bit_width() <= 7);
            }
        }
    }

    #[test]
    fn column_round_trip_i128(values in walk_i128()) {
        let column = build_column(&values, MosaicOptions::default_for_test());
        prop_assert_eq!(column.decompress(), values.clone());
        let cands = (0..values.len()).step_by(3).collect::<Vec<_>>();
        let expected = cands.iter().map(|&i| values[i]).collect::<Vec<_>>();
        prop_assert_eq!(column.project(&Candidates::from(&cands)), expected);
    }

    #[test]
    fn select_matches_scan(
        values in walk(),
        low in -1000i64..1000,
        width in 0i64..2000,
        anti in any::<bool>()
    ) {
        let column = build_column(&values, MosaicOptions::default_for_test());
        let low = values[0] + low;
        let high = low + width;
        let pred = RangePredicate::new(Some(low), Some(high), true, false, anti);
        let expected = (0..values.len())
            .filter(|&i| (low <= values[i] && values[i] < high) != anti)
            .collect::<Vec<_>>();
        prop_assert_eq!(column.select(&Candidates::all(), pred), expected);
    }

    #[test]
    fn project_follows_candidates(values in walk(), cands in positions(600)) {
        let column = build_column(&values, MosaicOptions::default_for_test());
        let expected = cands
            .iter()
            .filter(|&&pos| pos < values.len())
            .map(|&pos| values[pos])
            .collect::<Vec<_>>();
        prop_assert_eq!(column.project(&Candidates::from(&cands)), expected);
    }

    #[test]
    fn join_is_complete(
        values in walk(),
        picks in prop::collection::vec(any::<prop::sample::Index>(), 0..8)
    ) {
        let column = build_column(&values, MosaicOptions::default_for_test());
        let right = picks.iter().map(|idx| *idx.get(&values)).collect::<Vec<_>>();
        let mut expected = vec![];
        for (i, v) in values.iter().enumerate() {
            for (j, w) in right.iter().enumerate() {
                if v == w {
                    expected.push((i, j));
                }
            }
        }
        prop_assert_eq!(
            column.join(&Candidates::all(), &right, &Candidates::all(), false),
            expected
        );
    }
}
