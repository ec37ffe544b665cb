//! Fact name validation, reference resolution and dependency ordering.
//!
//! Fact names form a dotted namespace. A fact that parses its value
//! creates derived facts under its own name, so no declared name may be
//! a dot-delimited prefix of another declared name. References (from
//! filters, `bool` expressions and `string` sources) may point at a
//! derived fact; they resolve to the declared fact whose name is a
//! dotted prefix of the reference.

use std::collections::HashMap;

use tracing::debug;

use crate::fact::{Expression, Fact, ValueSource};

/// Errors raised while resolving and ordering a fact list.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// One declared fact name is a dotted prefix of another.
    #[error("fact name '{name}' has fact '{prefix}' as a dotted prefix")]
    PrefixCollision {
        /// The longer name.
        name: String,
        /// The declared prefix it collides with.
        prefix: String,
    },

    /// A reference does not resolve to any declared fact.
    #[error("cannot find a fact providing '{reference}' (referenced by '{fact}')")]
    UnresolvedReference {
        /// The fact holding the reference.
        fact: String,
        /// The reference that failed to resolve.
        reference: String,
    },

    /// The dependency graph contains a cycle.
    #[error("dependency cycle detected among facts: {}", .names.join(", "))]
    Cycle {
        /// The facts that could not be ordered.
        names: Vec<String>,
    },
}

/// Reorders `facts` so that every fact appears after the facts it
/// references. Ordering among independent facts preserves input order.
///
/// # Errors
///
/// Returns an error on name-prefix collisions, unresolved references,
/// or dependency cycles.
pub fn sort(facts: &mut Vec<Fact>) -> Result<(), ResolveError> {
    let order = {
        let names: HashMap<&str, usize> = facts
            .iter()
            .enumerate()
            .map(|(i, f)| (f.name(), i))
            .collect();

        validate_names(facts, &names)?;

        let deps = collect_deps(facts, &names)?;
        sweep(facts, &deps)?
    };

    let mut tagged: Vec<(usize, Fact)> = facts.drain(..).enumerate().collect();
    let mut rank = vec![0usize; tagged.len()];
    for (r, &i) in order.iter().enumerate() {
        rank[i] = r;
    }
    tagged.sort_by_key(|&(i, _)| rank[i]);
    facts.extend(tagged.into_iter().map(|(_, f)| f));

    debug!(
        "sorted {} facts: {:?}",
        facts.len(),
        facts.iter().map(Fact::name).collect::<Vec<_>>()
    );
    Ok(())
}

/// Rejects any declared name that has another declared name as a
/// dot-delimited strict prefix.
fn validate_names(facts: &[Fact], names: &HashMap<&str, usize>) -> Result<(), ResolveError> {
    for fact in facts {
        let name = fact.name();
        for (i, _) in name.match_indices('.') {
            let prefix = &name[..i];
            if names.contains_key(prefix) {
                return Err(ResolveError::PrefixCollision {
                    name: name.to_string(),
                    prefix: prefix.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Resolves a reference to the index of the declared fact providing it,
/// walking dotted prefixes from shortest to longest.
fn find_reference(names: &HashMap<&str, usize>, reference: &str) -> Option<usize> {
    for (i, _) in reference.match_indices('.') {
        if let Some(&idx) = names.get(&reference[..i]) {
            return Some(idx);
        }
    }
    names.get(reference).copied()
}

/// Collects the fact names an expression references.
fn expression_refs<'a>(expr: &'a Expression, out: &mut Vec<&'a str>) {
    match expr {
        Expression::Any(children) | Expression::All(children) => {
            for child in children {
                expression_refs(child, out);
            }
        }
        Expression::Fact(leaf) => out.push(leaf.name()),
    }
}

/// Builds the per-fact dependency index lists.
fn collect_deps(
    facts: &[Fact],
    names: &HashMap<&str, usize>,
) -> Result<Vec<Vec<usize>>, ResolveError> {
    let mut deps = Vec::with_capacity(facts.len());
    for fact in facts {
        let mut refs: Vec<&str> = Vec::new();
        if let Some(filter) = fact.filter() {
            expression_refs(filter, &mut refs);
        }
        match fact.value() {
            ValueSource::Bool(expr) => expression_refs(expr, &mut refs),
            ValueSource::String(source) => refs.push(source.fact()),
            _ => {}
        }

        let mut resolved = Vec::with_capacity(refs.len());
        for reference in refs {
            let idx = find_reference(names, reference).ok_or_else(|| {
                ResolveError::UnresolvedReference {
                    fact: fact.name().to_string(),
                    reference: reference.to_string(),
                }
            })?;
            resolved.push(idx);
        }
        deps.push(resolved);
    }
    Ok(deps)
}

/// Repeated-sweep topological sort: each pass emits every fact whose
/// dependencies are already emitted; a pass emitting nothing means a
/// cycle. Order within a pass follows input order, keeping the sort
/// stable for independent facts.
fn sweep(facts: &[Fact], deps: &[Vec<usize>]) -> Result<Vec<usize>, ResolveError> {
    let mut sorted = Vec::with_capacity(facts.len());
    let mut done = vec![false; facts.len()];
    let mut remaining: Vec<usize> = (0..facts.len()).collect();

    while !remaining.is_empty() {
        let emitted = sorted.len();
        let mut skipped = Vec::new();
        for &i in &remaining {
            if deps[i].iter().all(|&d| done[d]) {
                done[i] = true;
                sorted.push(i);
            } else {
                skipped.push(i);
            }
        }
        if sorted.len() == emitted {
            return Err(ResolveError::Cycle {
                names: remaining
                    .iter()
                    .map(|&i| facts[i].name().to_string())
                    .collect(),
            });
        }
        remaining = skipped;
    }

    Ok(sorted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::load_str;
    use crate::fact::FactList;

    fn load(doc: &str) -> FactList {
        load_str(doc).expect("document should load")
    }

    fn names(list: &FactList) -> Vec<&str> {
        list.facts().iter().map(Fact::name).collect()
    }

    #[test]
    fn sort_keeps_independent_facts_in_input_order() {
        let mut list = load(
            r"
facts:
  - name: c
    value: { builtin: {} }
  - name: a
    value: { builtin: {} }
  - name: b
    value: { builtin: {} }
",
        );
        list.sort().unwrap();
        assert_eq!(names(&list), ["c", "a", "b"]);
    }

    #[test]
    fn sort_moves_dependencies_first() {
        let mut list = load(
            r"
facts:
  - name: os.is.linux
    value:
      bool:
        fact: { name: os.kernel, value: Linux }
  - name: os.kernel
    value: { builtin: {} }
",
        );
        list.sort().unwrap();
        assert_eq!(names(&list), ["os.kernel", "os.is.linux"]);
    }

    #[test]
    fn sort_references_point_strictly_leftward() {
        let mut list = load(
            r"
facts:
  - name: d
    value:
      bool:
        all:
          expressions:
            - fact: { name: b, match: exists }
            - fact: { name: c, match: exists }
  - name: c
    value:
      string: { fact: b }
  - name: b
    value:
      string: { fact: a }
  - name: a
    value: { builtin: {} }
",
        );
        list.sort().unwrap();

        let order = names(&list);
        let pos = |n: &str| order.iter().position(|&x| x == n).unwrap();
        assert!(pos("a") < pos("b"));
        assert!(pos("b") < pos("c"));
        assert!(pos("b") < pos("d"));
        assert!(pos("c") < pos("d"));
    }

    #[test]
    fn reference_resolves_to_declared_prefix() {
        let mut list = load(
            r"
facts:
  - name: check
    value:
      bool:
        fact: { name: cpu.family.arm, match: exists }
  - name: cpu.family
    value: { builtin: {} }
",
        );
        list.sort().unwrap();
        assert_eq!(names(&list), ["cpu.family", "check"]);
    }

    #[test]
    fn unresolved_reference_fails() {
        let mut list = load(
            r"
facts:
  - name: check
    value:
      bool:
        fact: { name: cpu.family.arm, match: exists }
",
        );
        let err = list.sort().unwrap_err();
        assert!(matches!(
            err,
            ResolveError::UnresolvedReference { ref reference, .. } if reference == "cpu.family.arm"
        ));
    }

    #[test]
    fn prefix_collision_fails() {
        let mut list = load(
            r"
facts:
  - name: cpu
    value: { builtin: {} }
  - name: cpu.arch
    value: { builtin: {} }
",
        );
        let err = list.sort().unwrap_err();
        assert!(matches!(
            err,
            ResolveError::PrefixCollision { ref name, ref prefix }
                if name == "cpu.arch" && prefix == "cpu"
        ));
    }

    #[test]
    fn two_fact_cycle_fails() {
        let mut list = load(
            r"
facts:
  - name: a
    value:
      string: { fact: b }
  - name: b
    value:
      string: { fact: a }
",
        );
        let err = list.sort().unwrap_err();
        assert!(matches!(err, ResolveError::Cycle { .. }));
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let mut list = load(
            r"
facts:
  - name: a
    value:
      bool:
        fact: { name: a, match: exists }
",
        );
        assert!(matches!(list.sort(), Err(ResolveError::Cycle { .. })));
    }

    #[test]
    fn filter_references_are_dependencies() {
        let mut list = load(
            r"
facts:
  - name: cpu.vmx
    filter:
      fact: { name: os.kernel, value: Linux }
    value: { builtin: {} }
  - name: os.kernel
    value: { builtin: {} }
",
        );
        list.sort().unwrap();
        assert_eq!(names(&list), ["os.kernel", "cpu.vmx"]);
    }
}
