//! List walking shared by the structured content matchers.
//!
//! A rule group on a list decides how its elements line up with the expected elements:
//! positionally against a padded template, in any order, or as a set of required variants.

use crate::context::MatchingContext;
use crate::executor::domatch;
use crate::mismatch::{BodyItemMatchResult, BodyMismatch};
use crate::path_expr::construct_path;
use crate::rules::{MatchingRule, MatchingRuleCategory, MatchingRuleGroup};
use crate::value::MatchValue;
use indexmap::IndexMap;
use tracing::debug;

/// Compares one expected element with one actual element under a context.
pub(crate) trait ElementComparator<T> {
    fn compare_element(
        &self,
        path: &[String],
        expected: &T,
        actual: &T,
        context: &MatchingContext<'_>,
    ) -> Vec<BodyItemMatchResult>;

    /// Rendering of a single element in mismatch messages.
    fn describe_element(&self, element: &T) -> String;
}

/// Two lists found at the same path.
pub(crate) struct Lists<'a, T> {
    pub path: &'a [String],
    pub expected: &'a [T],
    pub actual: &'a [T],
    pub expected_value: MatchValue<'a>,
    pub actual_value: MatchValue<'a>,
}

impl<T> Lists<'_, T> {
    fn location(&self) -> String {
        construct_path(self.path)
    }

    fn index_path(&self, index: usize) -> Vec<String> {
        let mut path = self.path.to_vec();
        path.push(index.to_string());
        path
    }
}

fn all_ok(results: &[BodyItemMatchResult]) -> bool {
    results.iter().all(BodyItemMatchResult::is_ok)
}

/// Compare two lists that have a rule group registered on them.
pub(crate) fn compare_lists_with_rules<T, C>(
    lists: &Lists<'_, T>,
    group: &MatchingRuleGroup,
    context: &MatchingContext<'_>,
    comparator: &C,
    diff: &dyn Fn() -> String,
) -> Vec<BodyItemMatchResult>
where
    C: ElementComparator<T>,
{
    let mut result = Vec::new();
    let mismatches = domatch(
        group,
        lists.path,
        &lists.expected_value,
        &lists.actual_value,
        context.coerce_numbers,
    );
    if !mismatches.is_empty() {
        result.push(BodyItemMatchResult::new(
            lists.location(),
            mismatches.into_iter().map(BodyMismatch::from).collect(),
        ));
    }

    if lists.expected.is_empty() {
        return result;
    }

    let variants = group.rules.iter().find_map(|rule| match rule {
        MatchingRule::ArrayContains(variants) => Some(variants),
        _ => None,
    });

    if group.rules.iter().any(MatchingRule::is_ignore_order) {
        debug!("compare_lists: ignore-order rule defined for path {}", lists.location());
        result.extend(compare_unordered(lists, context, comparator, diff));
    } else if let Some(variants) = variants {
        let variants: Vec<(usize, MatchingRuleCategory)> = if variants.is_empty() {
            (0..lists.expected.len())
                .map(|index| (index, MatchingRuleCategory::new(context.matchers.name)))
                .collect()
        } else {
            variants
                .iter()
                .map(|variant| (variant.index, variant.rules.clone()))
                .collect()
        };
        result.extend(compare_array_contains(lists, &variants, context, comparator, diff));
    } else {
        let template = &lists.expected[0];
        let padded: Vec<&T> = (0..lists.expected.len().max(lists.actual.len()))
            .map(|index| lists.expected.get(index).unwrap_or(template))
            .collect();
        result.extend(compare_list_content(lists, &padded, context, comparator, diff));
    }
    result
}

/// Compare elements positionally. Expected elements without an actual counterpart are missing
/// unless a rule governs the list.
pub(crate) fn compare_list_content<T, C>(
    lists: &Lists<'_, T>,
    expected: &[&T],
    context: &MatchingContext<'_>,
    comparator: &C,
    diff: &dyn Fn() -> String,
) -> Vec<BodyItemMatchResult>
where
    C: ElementComparator<T>,
{
    let mut result = Vec::new();
    for (index, value) in expected.iter().enumerate() {
        if let Some(actual) = lists.actual.get(index) {
            result.extend(comparator.compare_element(&lists.index_path(index), value, actual, context));
        } else if !context.matcher_defined(lists.path) {
            result.push(BodyItemMatchResult::single(
                lists.location(),
                BodyMismatch::new(
                    lists.expected_value.render(),
                    lists.actual_value.render(),
                    format!("Expected {} but was missing", comparator.describe_element(value)),
                    lists.location(),
                )
                .with_diff(diff()),
            ));
        }
    }
    result
}

/// Pair every left index with a distinct right index for which `matches` holds, using augmenting
/// paths. Returns, for each right index, the left index assigned to it.
pub(crate) fn distinct_assignment<F>(left_len: usize, right_len: usize, mut matches: F) -> Vec<Option<usize>>
where
    F: FnMut(usize, usize) -> bool,
{
    fn augment(
        left: usize,
        right_len: usize,
        matches: &mut dyn FnMut(usize, usize) -> bool,
        visited: &mut [bool],
        owners: &mut [Option<usize>],
    ) -> bool {
        for right in 0..right_len {
            if visited[right] || !matches(left, right) {
                continue;
            }
            visited[right] = true;
            let free = match owners[right] {
                None => true,
                Some(owner) => augment(owner, right_len, matches, visited, owners),
            };
            if free {
                owners[right] = Some(left);
                return true;
            }
        }
        false
    }

    let mut owners = vec![None; right_len];
    for left in 0..left_len {
        let mut visited = vec![false; right_len];
        augment(left, right_len, &mut matches, &mut visited, &mut owners);
    }
    owners
}

/// Pairwise comparisons for an order-independent list match, computed on demand.
struct Unordered<'l, 'c, T, C> {
    lists: &'l Lists<'l, T>,
    context: &'l MatchingContext<'c>,
    comparator: &'l C,
    pairs: Vec<Vec<Option<Vec<BodyItemMatchResult>>>>,
    extras: Vec<Option<Vec<BodyItemMatchResult>>>,
}

impl<'l, 'c, T, C> Unordered<'l, 'c, T, C>
where
    C: ElementComparator<T>,
{
    fn new(lists: &'l Lists<'l, T>, context: &'l MatchingContext<'c>, comparator: &'l C) -> Self {
        Unordered {
            lists,
            context,
            comparator,
            pairs: vec![vec![None; lists.actual.len()]; lists.expected.len()],
            extras: vec![None; lists.actual.len()],
        }
    }

    fn pair(&mut self, expected_index: usize, actual_index: usize) -> &[BodyItemMatchResult] {
        if self.pairs[expected_index][actual_index].is_none() {
            let results = self.comparator.compare_element(
                &self.lists.index_path(expected_index),
                &self.lists.expected[expected_index],
                &self.lists.actual[actual_index],
                self.context,
            );
            self.pairs[expected_index][actual_index] = Some(results);
        }
        self.pairs[expected_index][actual_index]
            .as_deref()
            .unwrap_or_default()
    }

    /// Extra actual elements only need to pass a rule registered directly at their index.
    fn extra(&mut self, actual_index: usize) -> &[BodyItemMatchResult] {
        if self.extras[actual_index].is_none() {
            let index_path = self.lists.index_path(actual_index);
            let results = if self.context.direct_matcher_defined(&index_path) {
                self.comparator.compare_element(
                    &index_path,
                    &self.lists.expected[0],
                    &self.lists.actual[actual_index],
                    self.context,
                )
            } else {
                Vec::new()
            };
            self.extras[actual_index] = Some(results);
        }
        self.extras[actual_index].as_deref().unwrap_or_default()
    }
}

/// Every expected element must match a distinct actual element, in any order. Actual elements left
/// over must pass any rule registered at their own index.
pub(crate) fn compare_unordered<T, C>(
    lists: &Lists<'_, T>,
    context: &MatchingContext<'_>,
    comparator: &C,
    diff: &dyn Fn() -> String,
) -> Vec<BodyItemMatchResult>
where
    C: ElementComparator<T>,
{
    let expected_len = lists.expected.len();
    let actual_len = lists.actual.len();
    let has_extras = actual_len > expected_len;
    let mut search = Unordered::new(lists, context, comparator);

    let owners = distinct_assignment(expected_len, actual_len, |e, a| all_ok(search.pair(e, a)));
    let unmatched: Vec<usize> = (0..expected_len)
        .filter(|expected_index| !owners.contains(&Some(*expected_index)))
        .collect();

    // Leftovers that fail their own rule must take part in the assignment too. A matching covering
    // both sides exists whenever each side can be covered on its own.
    let required: Vec<usize> = if has_extras {
        (0..actual_len)
            .filter(|actual_index| !all_ok(search.extra(*actual_index)))
            .collect()
    } else {
        Vec::new()
    };
    let required_covered = required.is_empty()
        || distinct_assignment(required.len(), expected_len, |r, e| {
            all_ok(search.pair(e, required[r]))
        })
        .iter()
        .flatten()
        .count()
            == required.len();

    if unmatched.is_empty() && required_covered {
        return Vec::new();
    }
    debug!(
        "No order-independent match at {}: {} expected element(s) unmatched",
        lists.location(),
        unmatched.len()
    );

    let mut errors: Vec<BodyMismatch> = Vec::new();
    for actual_index in (0..actual_len).filter(|index| owners[*index].is_none()) {
        for expected_index in &unmatched {
            errors.extend(
                search
                    .pair(*expected_index, actual_index)
                    .iter()
                    .flat_map(|item| item.result.iter().cloned()),
            );
        }
        if has_extras {
            errors.extend(
                search
                    .extra(actual_index)
                    .iter()
                    .flat_map(|item| item.result.iter().cloned()),
            );
        }
    }

    let mut grouped: IndexMap<String, Vec<BodyMismatch>> = IndexMap::new();
    for error in errors {
        grouped.entry(error.path.clone()).or_default().push(error);
    }

    let mut result = vec![BodyItemMatchResult::single(
        lists.location(),
        BodyMismatch::new(
            lists.expected_value.render(),
            lists.actual_value.render(),
            format!(
                "Expected {} to match {} ignoring order of elements",
                lists.expected_value.describe(),
                lists.actual_value.describe()
            ),
            lists.location(),
        )
        .with_diff(diff()),
    )];
    result.extend(
        grouped
            .into_iter()
            .map(|(path, mismatches)| BodyItemMatchResult::new(path, mismatches)),
    );
    result
}

/// Each variant's expected element must match at least one actual element under the variant's
/// own rules.
pub(crate) fn compare_array_contains<T, C>(
    lists: &Lists<'_, T>,
    variants: &[(usize, MatchingRuleCategory)],
    context: &MatchingContext<'_>,
    comparator: &C,
    diff: &dyn Fn() -> String,
) -> Vec<BodyItemMatchResult>
where
    C: ElementComparator<T>,
{
    let root = vec!["$".to_string()];
    let mut result = Vec::new();
    for (index, rules) in variants {
        let Some(expected) = lists.expected.get(*index) else {
            result.push(BodyItemMatchResult::single(
                lists.location(),
                BodyMismatch::new(
                    lists.expected_value.render(),
                    lists.actual_value.render(),
                    format!(
                        "ArrayContains: variant {} is missing from the expected list, which has {} items",
                        index,
                        lists.expected.len()
                    ),
                    lists.location(),
                )
                .with_diff(diff()),
            ));
            continue;
        };

        let variant_context = context.with_rules(rules.clone());
        let found = lists.actual.iter().enumerate().any(|(actual_index, actual)| {
            let outcome = comparator.compare_element(&root, expected, actual, &variant_context);
            let matched = all_ok(&outcome);
            debug!(
                "Comparing list item {} to variant {} at {} -> {}",
                actual_index,
                index,
                lists.location(),
                matched
            );
            matched
        });
        if !found {
            result.push(BodyItemMatchResult::single(
                lists.location(),
                BodyMismatch::new(
                    Some(comparator.describe_element(expected)),
                    lists.actual_value.render(),
                    format!(
                        "Variant at index {} ({}) was not found in the actual list",
                        index,
                        comparator.describe_element(expected)
                    ),
                    lists.location(),
                )
                .with_diff(diff()),
            ));
        }
    }
    result
}
