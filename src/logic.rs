//! CNF building blocks shared by the encoding layer: fresh-variable allocation, cardinality
//! constraints by sequential counter (Sinz 2005), and lexicographic ordering for symmetry
//! breaking.

use varisat::{Lit, Var};

use crate::props::ComparisonOp;

/// Allocator for auxiliary SAT variables, handing out indices above the decision variables.
pub(crate) struct VarPool {
    next: usize,
}

impl VarPool {
    pub(crate) fn starting_at(first: usize) -> Self {
        Self { next: first }
    }

    pub(crate) fn fresh(&mut self) -> Var {
        let var = Var::from_index(self.next);
        self.next += 1;
        var
    }

    /// One past the highest variable index handed out so far.
    pub(crate) fn allocated(&self) -> usize {
        self.next
    }
}

pub(crate) fn negate(lit: Lit) -> Lit {
    match lit.is_negative() {
        true => lit.var().positive(),
        false => lit.var().negative(),
    }
}

/// At most `k` of `lits` are true.
///
/// Builds the sequential unary counter: register `s[i][j]` holds "at least `j + 1` of the first
/// `i + 1` literals are true". Returns no clauses when the bound is vacuous and unit negations
/// when `k` is zero.
pub(crate) fn at_most_k(pool: &mut VarPool, lits: &[Lit], k: usize) -> Vec<Vec<Lit>> {
    let n = lits.len();
    if k >= n {
        return Vec::new();
    }
    if k == 0 {
        return lits.iter().map(|lit| vec![negate(*lit)]).collect();
    }

    let registers: Vec<Vec<Var>> = (0..n - 1)
        .map(|_| (0..k).map(|_| pool.fresh()).collect())
        .collect();

    let mut clauses = Vec::new();
    clauses.push(vec![negate(lits[0]), registers[0][0].positive()]);
    for j in 1..k {
        clauses.push(vec![registers[0][j].negative()]);
    }
    for i in 1..n - 1 {
        clauses.push(vec![negate(lits[i]), registers[i][0].positive()]);
        clauses.push(vec![registers[i - 1][0].negative(), registers[i][0].positive()]);
        for j in 1..k {
            clauses.push(vec![
                negate(lits[i]),
                registers[i - 1][j - 1].negative(),
                registers[i][j].positive(),
            ]);
            clauses.push(vec![registers[i - 1][j].negative(), registers[i][j].positive()]);
        }
        clauses.push(vec![negate(lits[i]), registers[i - 1][k - 1].negative()]);
    }
    clauses.push(vec![negate(lits[n - 1]), registers[n - 2][k - 1].negative()]);

    clauses
}

/// At least `k` of `lits` are true.
///
/// A demand exceeding the literal count yields the empty clause, making the whole formula
/// unsatisfiable; this is how an impossible count surfaces as clean infeasibility rather than
/// an error.
pub(crate) fn at_least_k(pool: &mut VarPool, lits: &[Lit], k: usize) -> Vec<Vec<Lit>> {
    let n = lits.len();
    if k == 0 {
        return Vec::new();
    }
    if k > n {
        return vec![Vec::new()];
    }
    let negated: Vec<Lit> = lits.iter().map(|lit| negate(*lit)).collect();
    at_most_k(pool, &negated, n - k)
}

/// Exactly `k` of `lits` are true.
pub(crate) fn exactly_k(pool: &mut VarPool, lits: &[Lit], k: usize) -> Vec<Vec<Lit>> {
    let mut clauses = at_most_k(pool, lits, k);
    clauses.extend(at_least_k(pool, lits, k));
    clauses
}

/// Constrain the number of true literals among `lits` to compare against `value` under `op`.
pub(crate) fn compare_count(pool: &mut VarPool, lits: &[Lit], op: ComparisonOp, value: usize) -> Vec<Vec<Lit>> {
    match op {
        ComparisonOp::Eq => exactly_k(pool, lits, value),
        ComparisonOp::Le => at_most_k(pool, lits, value),
        ComparisonOp::Ge => at_least_k(pool, lits, value),
        ComparisonOp::Lt => match value {
            // nothing counts below zero
            0 => vec![Vec::new()],
            _ => at_most_k(pool, lits, value - 1),
        },
        ComparisonOp::Gt => at_least_k(pool, lits, value + 1),
    }
}

/// The assignment to `a` is lexicographically no greater than the assignment to `b`, comparing
/// position 0 first with true above false.
///
/// Auxiliary variable `e_i` means "the first `i` positions agree"; only the forcing direction of
/// its definition is needed for the ordering to hold.
pub(crate) fn lex_le(pool: &mut VarPool, a: &[Lit], b: &[Lit]) -> Vec<Vec<Lit>> {
    debug_assert_eq!(a.len(), b.len());
    if a.is_empty() {
        return Vec::new();
    }

    let mut clauses = vec![vec![negate(a[0]), b[0]]];
    let mut prefix_equal: Option<Var> = None;
    for i in 1..a.len() {
        let e = pool.fresh();
        match prefix_equal {
            None => {
                clauses.push(vec![negate(a[0]), negate(b[0]), e.positive()]);
                clauses.push(vec![a[0], b[0], e.positive()]);
            }
            Some(previous) => {
                clauses.push(vec![previous.negative(), negate(a[i - 1]), negate(b[i - 1]), e.positive()]);
                clauses.push(vec![previous.negative(), a[i - 1], b[i - 1], e.positive()]);
            }
        }
        clauses.push(vec![e.negative(), negate(a[i]), b[i]]);
        prefix_equal = Some(e);
    }

    clauses
}

#[cfg(test)]
mod tests {
    use super::*;

    // Decide the clause set by brute force: decision variables 0..n_decision take their values
    // from the bits of `fixed`, auxiliary variables are existentially quantified.
    fn satisfiable(clauses: &[Vec<Lit>], n_decision: usize, fixed: usize, total_vars: usize) -> bool {
        let n_aux = total_vars - n_decision;
        (0..1usize << n_aux).any(|aux| {
            clauses.iter().all(|clause| {
                clause.iter().any(|lit| {
                    let index = lit.var().index();
                    let value = if index < n_decision {
                        fixed >> index & 1 == 1
                    } else {
                        aux >> (index - n_decision) & 1 == 1
                    };
                    value == lit.is_positive()
                })
            })
        })
    }

    fn decision_lits(n: usize) -> Vec<Lit> {
        (0..n).map(|i| Var::from_index(i).positive()).collect()
    }

    #[test]
    fn at_most_k_counts_correctly() {
        let n = 4;
        for k in 0..=n + 1 {
            let mut pool = VarPool::starting_at(n);
            let clauses = at_most_k(&mut pool, &decision_lits(n), k);
            for fixed in 0..1usize << n {
                let expected = fixed.count_ones() as usize <= k;
                assert_eq!(
                    satisfiable(&clauses, n, fixed, pool.allocated()),
                    expected,
                    "at_most_{k} on {fixed:04b}"
                );
            }
        }
    }

    #[test]
    fn at_least_k_counts_correctly() {
        let n = 4;
        for k in 0..=n + 1 {
            let mut pool = VarPool::starting_at(n);
            let clauses = at_least_k(&mut pool, &decision_lits(n), k);
            for fixed in 0..1usize << n {
                let expected = fixed.count_ones() as usize >= k;
                assert_eq!(
                    satisfiable(&clauses, n, fixed, pool.allocated()),
                    expected,
                    "at_least_{k} on {fixed:04b}"
                );
            }
        }
    }

    #[test]
    fn comparison_operators_match_their_meaning() {
        let n = 4;
        let value = 2;
        let cases: &[(ComparisonOp, fn(usize, usize) -> bool)] = &[
            (ComparisonOp::Eq, |count, value| count == value),
            (ComparisonOp::Le, |count, value| count <= value),
            (ComparisonOp::Ge, |count, value| count >= value),
            (ComparisonOp::Lt, |count, value| count < value),
            (ComparisonOp::Gt, |count, value| count > value),
        ];
        for (op, test) in cases {
            let mut pool = VarPool::starting_at(n);
            let clauses = compare_count(&mut pool, &decision_lits(n), *op, value);
            for fixed in 0..1usize << n {
                let expected = test(fixed.count_ones() as usize, value);
                assert_eq!(satisfiable(&clauses, n, fixed, pool.allocated()), expected, "{op:?} {value} on {fixed:04b}");
            }
        }
    }

    #[test]
    fn positive_demand_over_no_literals_is_unsatisfiable() {
        let mut pool = VarPool::starting_at(0);
        let clauses = at_least_k(&mut pool, &[], 1);
        assert_eq!(clauses, vec![Vec::new()]);
        assert!(!satisfiable(&clauses, 0, 0, pool.allocated()));

        let mut pool = VarPool::starting_at(0);
        assert!(at_least_k(&mut pool, &[], 0).is_empty());
    }

    #[test]
    fn lex_le_orders_assignments() {
        let n = 3;
        let a = decision_lits(n);
        let b: Vec<Lit> = (n..2 * n).map(|i| Var::from_index(i).positive()).collect();
        let mut pool = VarPool::starting_at(2 * n);
        let clauses = lex_le(&mut pool, &a, &b);

        for fixed in 0..1usize << (2 * n) {
            let bits_a: Vec<bool> = (0..n).map(|i| fixed >> i & 1 == 1).collect();
            let bits_b: Vec<bool> = (0..n).map(|i| fixed >> (n + i) & 1 == 1).collect();
            let expected = bits_a <= bits_b;
            assert_eq!(
                satisfiable(&clauses, 2 * n, fixed, pool.allocated()),
                expected,
                "{bits_a:?} <=lex {bits_b:?}"
            );
        }
    }
}
