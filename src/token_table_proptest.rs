#![cfg(test)]

// Property tests for TokenTable kept inside the crate so they can reach the
// crate-private table.

use crate::token::Token;
use crate::token_table::TokenTable;
use proptest::prelude::*;
use std::hash::{BuildHasher, Hasher};

// Pool-indexed operations to improve shrinking: indices shrink to earlier
// tokens, pool length shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum Op {
    Insert(usize, i32),
    Remove(usize),
    Get(usize),
    Iterate,
    Clear,
}

fn arb_token() -> impl Strategy<Value = Token> {
    prop_oneof![
        (-3i64..3).prop_map(Token::Int),
        "[a-c0-9`]{0,3}".prop_map(Token::from),
    ]
}

fn arb_scenario() -> impl Strategy<Value = (Vec<Token>, Vec<Op>)> {
    proptest::collection::vec(arb_token(), 1..=8).prop_flat_map(|pool| {
        let idx = 0..pool.len();
        let op = prop_oneof![
            4 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| Op::Insert(i, v)),
            2 => idx.clone().prop_map(Op::Remove),
            2 => idx.prop_map(Op::Get),
            1 => Just(Op::Iterate),
            1 => Just(Op::Clear),
        ];
        proptest::collection::vec(op, 1..60).prop_map(move |ops| (pool.clone(), ops))
    })
}

// Ordered model: a Vec of (token, value) with replace-in-place semantics.
fn model_insert(model: &mut Vec<(Token, i32)>, token: Token, value: i32) -> Option<i32> {
    match model.iter_mut().find(|(t, _)| *t == token) {
        Some((_, v)) => Some(core::mem::replace(v, value)),
        None => {
            model.push((token, value));
            None
        }
    }
}

fn model_remove(model: &mut Vec<(Token, i32)>, token: &Token) -> Option<i32> {
    let pos = model.iter().position(|(t, _)| t == token)?;
    Some(model.remove(pos).1)
}

fn run<S: BuildHasher>(
    mut sut: TokenTable<i32, S>,
    pool: &[Token],
    ops: Vec<Op>,
) -> Result<(), TestCaseError> {
    let mut model: Vec<(Token, i32)> = Vec::new();
    for op in ops {
        match op {
            Op::Insert(i, v) => {
                let t = pool[i].clone();
                prop_assert_eq!(sut.insert(t.clone(), v), model_insert(&mut model, t, v));
            }
            Op::Remove(i) => {
                prop_assert_eq!(sut.remove(&pool[i]), model_remove(&mut model, &pool[i]));
            }
            Op::Get(i) => {
                let expected = model.iter().find(|(t, _)| *t == pool[i]).map(|(_, v)| v);
                prop_assert_eq!(sut.get(&pool[i]), expected);
                prop_assert_eq!(sut.contains(&pool[i]), expected.is_some());
            }
            Op::Iterate => {
                let forward: Vec<_> = sut.iter().map(|(t, v)| (t.clone(), *v)).collect();
                prop_assert_eq!(&forward, &model);
                let mut backward: Vec<_> = sut.iter().rev().map(|(t, v)| (t.clone(), *v)).collect();
                backward.reverse();
                prop_assert_eq!(&backward, &model);
            }
            Op::Clear => {
                sut.clear();
                model.clear();
            }
        }

        // Post-conditions after each op
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
        prop_assert_eq!(sut.first().map(|(t, _)| t), model.first().map(|(t, _)| t));
        prop_assert_eq!(sut.last().map(|(t, _)| t), model.last().map(|(t, _)| t));
    }
    let owned: Vec<_> = sut.into_iter().collect();
    prop_assert_eq!(owned, model);
    Ok(())
}

// Property: state-machine equivalence against an ordered Vec model.
// - insert replaces in place and returns the previous value.
// - remove returns the stored value and keeps the relative order of the rest.
// - forward and backward iteration agree with the model's order.
// - len/is_empty/first/last parity after every op.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        run(TokenTable::new(), &pool, ops)?;
    }
}

// Collision variant using a constant hasher to stress equality resolution.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        run(TokenTable::with_hasher(ConstBuildHasher), &pool, ops)?;
    }
}
