//! Property tests over randomly generated acyclic models

use crudegraph::prelude::*;
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

/// A random acyclic model: literal values, then formulas whose operands
/// point at strictly earlier cells
#[derive(Debug, Clone)]
struct RandomModel {
    literals: Vec<f64>,
    formulas: Vec<Vec<usize>>,
}

fn name(index: usize) -> String {
    format!("v{index:03}")
}

impl RandomModel {
    fn len(&self) -> usize {
        self.literals.len() + self.formulas.len()
    }

    fn references(&self, index: usize) -> &[usize] {
        index
            .checked_sub(self.literals.len())
            .map_or(&[][..], |f| self.formulas[f].as_slice())
    }

    fn build(&self, reverse: bool) -> CalculationContext {
        let mut indices: Vec<usize> = (0..self.len()).collect();
        if reverse {
            indices.reverse();
        }

        let mut ctx = CalculationContext::new();
        for index in indices {
            match self.literals.get(index) {
                Some(value) => ctx.register_literal(name(index), *value).unwrap(),
                None => {
                    let operands = self
                        .references(index)
                        .iter()
                        .map(|r| Operand::cell(name(*r)))
                        .collect();
                    ctx.register_formula(name(index), "SUM", operands).unwrap();
                }
            }
        }
        ctx
    }

    /// Transitive dependents of a cell, by brute force
    fn dependents(&self, index: usize) -> BTreeSet<String> {
        let mut result = BTreeSet::new();
        let mut frontier = vec![index];
        while let Some(current) = frontier.pop() {
            for candidate in 0..self.len() {
                if self.references(candidate).contains(&current) && result.insert(name(candidate)) {
                    frontier.push(candidate);
                }
            }
        }
        result
    }
}

fn random_model() -> impl Strategy<Value = RandomModel> {
    (
        prop::collection::vec(-100i32..100, 1..8),
        prop::collection::vec(prop::collection::vec(any::<usize>(), 0..4), 1..16),
    )
        .prop_map(|(literals, raw)| {
            let literals: Vec<f64> = literals.into_iter().map(f64::from).collect();
            let formulas = raw
                .into_iter()
                .enumerate()
                .map(|(i, refs)| {
                    let available = literals.len() + i;
                    refs.into_iter().map(|r| r % available).collect()
                })
                .collect();
            RandomModel { literals, formulas }
        })
}

fn all_names(model: &RandomModel) -> Vec<String> {
    (0..model.len()).map(name).collect()
}

proptest! {
    #[test]
    fn prop_order_respects_dependencies(model in random_model()) {
        let ctx = model.build(false);
        let plan = ctx.plan(all_names(&model)).unwrap();

        let position: BTreeMap<&str, usize> = plan
            .order()
            .iter()
            .enumerate()
            .map(|(i, n)| (n.as_str(), i))
            .collect();

        for index in 0..model.len() {
            let own = name(index);
            for r in model.references(index) {
                let precedent = name(*r);
                prop_assert!(position[precedent.as_str()] < position[own.as_str()]);
            }
        }
    }

    #[test]
    fn prop_registration_order_is_irrelevant(model in random_model()) {
        let forward = model.build(false);
        let reversed = model.build(true);
        let outputs = all_names(&model);

        prop_assert_eq!(
            forward.plan(outputs.clone()).unwrap(),
            reversed.plan(outputs).unwrap()
        );
    }

    #[test]
    fn prop_second_evaluation_is_free(model in random_model()) {
        let mut ctx = model.build(false);
        let first = ctx.evaluate_all().unwrap();
        let second = ctx.evaluate_all().unwrap();

        prop_assert_eq!(first, second);
        prop_assert_eq!(ctx.last_stats().unwrap().cells_evaluated, 0);
    }

    #[test]
    fn prop_update_dirties_exactly_dependents(
        model in random_model(),
        pick in any::<prop::sample::Index>(),
        new_value in -100i32..100,
    ) {
        let mut ctx = model.build(false);
        let before = ctx.evaluate_all().unwrap();

        let target = pick.index(model.literals.len());
        ctx.set_literal(name(target), f64::from(new_value)).unwrap();

        let mut expected = model.dependents(target);
        expected.insert(name(target));
        let dirty: BTreeSet<String> = ctx
            .names()
            .into_iter()
            .filter(|n| ctx.is_dirty(n.as_str()) == Some(true))
            .map(|n| n.to_string())
            .collect();
        prop_assert_eq!(&dirty, &expected);

        let after = ctx.evaluate_all().unwrap();
        prop_assert_eq!(ctx.last_stats().unwrap().cells_evaluated, expected.len());
        for (cell, value) in &before {
            if !expected.contains(cell.as_str()) {
                prop_assert_eq!(&after[cell], value);
            }
        }
    }

    #[test]
    fn prop_back_edge_is_a_cycle(model in random_model(), pick in any::<prop::sample::Index>()) {
        let last = model.len() - 1;
        let source = pick.index(model.literals.len());
        let feeds_last = model.dependents(source).contains(&name(last));

        // Same model, with one literal turned into a formula over the last cell
        let mut ctx = CalculationContext::new();
        for index in 0..model.len() {
            if index == source {
                ctx.register_formula(name(index), "SUM", vec![Operand::cell(name(last))])
                    .unwrap();
            } else if let Some(value) = model.literals.get(index) {
                ctx.register_literal(name(index), *value).unwrap();
            } else {
                let operands = model
                    .references(index)
                    .iter()
                    .map(|r| Operand::cell(name(*r)))
                    .collect();
                ctx.register_formula(name(index), "SUM", operands).unwrap();
            }
        }

        let result = ctx.evaluate([name(last)]);
        if feeds_last {
            let is_cycle = matches!(result, Err(Error::CyclicDependency(_)));
            prop_assert!(is_cycle);
        } else {
            prop_assert!(result.is_ok());
        }
    }
}
