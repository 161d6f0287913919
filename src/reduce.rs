//! Reduce (§4.7): frame-level simplifications run after `assemble`, just
//! before the serializer renders the [`Frame`] tree to SQL text.
//!
//! Two passes, scoped to what this implementation's already-flat join
//! shape can produce redundancy for (a deeper frame lattice with nested
//! derived tables would also want predicate pushdown and join reordering,
//! neither of which applies here since `assemble` never nests a `Branch`
//! inside another `Branch` — only inside an `AggregateSubquery`/
//! `JsonListSubquery`'s own frame):
//! - constant-folding trivial boolean formulas (`x & true`, `x | false`,
//!   a single-argument `coalesce`)
//! - dropping a `LEFT JOIN` whose frame is never read anywhere in the
//!   query, which never changes the result (a `LEFT JOIN` can only add
//!   columns, never filter rows)

use std::collections::HashSet;

use crate::frame::{Frame, FrameJoin, Phrase};

pub fn reduce_frame(frame: Frame) -> Frame {
    constant_fold_frame(drop_unused_outer_joins(frame))
}

fn drop_unused_outer_joins(frame: Frame) -> Frame {
    match frame {
        Frame::Branch { alias, base, joins, select, filter, group, group_filter, order, limit, offset } => {
            let base = Box::new(drop_unused_outer_joins(*base));
            let joins: Vec<FrameJoin> = joins
                .into_iter()
                .map(|j| FrameJoin { frame: drop_unused_outer_joins(j.frame), ..j })
                .collect();
            let kept = joins
                .iter()
                .enumerate()
                .filter(|(i, j)| {
                    if !j.is_outer {
                        return true;
                    }
                    let refs = external_references(&select, &filter, &group, &group_filter, &order, &base, &joins, *i);
                    refs.contains(j.frame.alias())
                })
                .map(|(_, j)| j.clone())
                .collect();
            Frame::Branch { alias, base, joins: kept, select, filter, group, group_filter, order, limit, offset }
        }
        Frame::Segment { alias, base, fields } => {
            Frame::Segment { alias, base: Box::new(drop_unused_outer_joins(*base)), fields }
        }
        other @ (Frame::Scalar { .. } | Frame::Leaf { .. }) => other,
    }
}

#[allow(clippy::too_many_arguments)]
fn external_references(
    select: &[(String, Phrase)],
    filter: &Option<Phrase>,
    group: &[Phrase],
    group_filter: &Option<Phrase>,
    order: &[(Phrase, bool)],
    base: &Frame,
    joins: &[FrameJoin],
    exclude_index: usize,
) -> HashSet<String> {
    let mut refs = HashSet::new();
    for (_, phrase) in select {
        collect_phrase_aliases(phrase, &mut refs);
    }
    if let Some(phrase) = filter {
        collect_phrase_aliases(phrase, &mut refs);
    }
    for phrase in group {
        collect_phrase_aliases(phrase, &mut refs);
    }
    if let Some(phrase) = group_filter {
        collect_phrase_aliases(phrase, &mut refs);
    }
    for (phrase, _) in order {
        collect_phrase_aliases(phrase, &mut refs);
    }
    collect_frame_phrase_aliases(base, &mut refs);
    for (index, join) in joins.iter().enumerate() {
        if index == exclude_index {
            continue;
        }
        collect_phrase_aliases(&join.condition, &mut refs);
        collect_frame_phrase_aliases(&join.frame, &mut refs);
    }
    refs
}

fn collect_frame_phrase_aliases(frame: &Frame, out: &mut HashSet<String>) {
    match frame {
        Frame::Scalar { .. } | Frame::Leaf { .. } => {}
        Frame::Branch { base, joins, select, filter, group, group_filter, order, .. } => {
            collect_frame_phrase_aliases(base, out);
            for join in joins {
                collect_phrase_aliases(&join.condition, out);
                collect_frame_phrase_aliases(&join.frame, out);
            }
            for (_, phrase) in select {
                collect_phrase_aliases(phrase, out);
            }
            if let Some(phrase) = filter {
                collect_phrase_aliases(phrase, out);
            }
            for phrase in group {
                collect_phrase_aliases(phrase, out);
            }
            if let Some(phrase) = group_filter {
                collect_phrase_aliases(phrase, out);
            }
            for (phrase, _) in order {
                collect_phrase_aliases(phrase, out);
            }
        }
        Frame::Segment { base, fields, .. } => {
            collect_frame_phrase_aliases(base, out);
            for (_, phrase) in fields {
                collect_phrase_aliases(phrase, out);
            }
        }
    }
}

fn collect_phrase_aliases(phrase: &Phrase, out: &mut HashSet<String>) {
    match phrase {
        Phrase::Literal { .. } => {}
        Phrase::Column { frame_alias, .. } => {
            out.insert(frame_alias.clone());
        }
        Phrase::Formula { args, .. } => {
            for arg in args {
                collect_phrase_aliases(arg, out);
            }
        }
        Phrase::Cast { base, .. } => collect_phrase_aliases(base, out),
        Phrase::AggregateSubquery { frame, .. } | Phrase::JsonListSubquery { frame, .. } => {
            collect_frame_phrase_aliases(frame, out);
        }
    }
}

fn constant_fold_frame(frame: Frame) -> Frame {
    match frame {
        Frame::Scalar { alias } => Frame::Scalar { alias },
        Frame::Leaf { alias, table } => Frame::Leaf { alias, table },
        Frame::Branch { alias, base, joins, select, filter, group, group_filter, order, limit, offset } => {
            Frame::Branch {
                alias,
                base: Box::new(constant_fold_frame(*base)),
                joins: joins.into_iter().map(|j| FrameJoin { frame: constant_fold_frame(j.frame), condition: constant_fold_phrase(j.condition), ..j }).collect(),
                select: select.into_iter().map(|(n, p)| (n, constant_fold_phrase(p))).collect(),
                filter: filter.map(constant_fold_phrase),
                group: group.into_iter().map(constant_fold_phrase).collect(),
                group_filter: group_filter.map(constant_fold_phrase),
                order: order.into_iter().map(|(p, asc)| (constant_fold_phrase(p), asc)).collect(),
                limit,
                offset,
            }
        }
        Frame::Segment { alias, base, fields } => Frame::Segment {
            alias,
            base: Box::new(constant_fold_frame(*base)),
            fields: fields.into_iter().map(|(n, p)| (n, constant_fold_phrase(p))).collect(),
        },
    }
}

fn constant_fold_phrase(phrase: Phrase) -> Phrase {
    match phrase {
        Phrase::Formula { name, args, domain } => {
            let args: Vec<Phrase> = args.into_iter().map(constant_fold_phrase).collect();
            match (name.as_str(), args.as_slice()) {
                ("coalesce", [single]) => single.clone(),
                ("&", [a, b]) if is_literal_bool(a, true) => b.clone(),
                ("&", [a, b]) if is_literal_bool(b, true) => a.clone(),
                ("|", [a, b]) if is_literal_bool(a, false) => b.clone(),
                ("|", [a, b]) if is_literal_bool(b, false) => a.clone(),
                _ => Phrase::Formula { name, args, domain },
            }
        }
        Phrase::Cast { base, target } => Phrase::Cast { base: Box::new(constant_fold_phrase(*base)), target },
        Phrase::AggregateSubquery { name, frame } => {
            Phrase::AggregateSubquery { name, frame: Box::new(constant_fold_frame(*frame)) }
        }
        Phrase::JsonListSubquery { frame, fields } => {
            Phrase::JsonListSubquery { frame: Box::new(constant_fold_frame(*frame)), fields }
        }
        other @ (Phrase::Literal { .. } | Phrase::Column { .. }) => other,
    }
}

fn is_literal_bool(phrase: &Phrase, value: bool) -> bool {
    matches!(phrase, Phrase::Literal { text, domain: crate::domain::Domain::Boolean } if text == if value { "true" } else { "false" })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Domain;

    fn bool_literal(text: &str) -> Phrase {
        Phrase::Literal { text: text.to_string(), domain: Domain::Boolean }
    }

    fn col(alias: &str) -> Phrase {
        Phrase::Column { frame_alias: alias.to_string(), column: 0, domain: Domain::Boolean }
    }

    #[test]
    fn folds_and_with_a_true_literal_operand() {
        let phrase = Phrase::Formula { name: "&".into(), args: vec![bool_literal("true"), col("school")], domain: Domain::Boolean };
        let folded = constant_fold_phrase(phrase);
        assert!(matches!(folded, Phrase::Column { .. }));
    }

    #[test]
    fn folds_single_argument_coalesce_away() {
        let phrase = Phrase::Formula { name: "coalesce".into(), args: vec![col("school")], domain: Domain::Boolean };
        let folded = constant_fold_phrase(phrase);
        assert!(matches!(folded, Phrase::Column { .. }));
    }

    #[test]
    fn drops_an_unreferenced_left_join() {
        let unused_leaf = Frame::Leaf { alias: "unused".into(), table: 1 };
        let branch = Frame::Branch {
            alias: "school".into(),
            base: Box::new(Frame::Leaf { alias: "school".into(), table: 0 }),
            joins: vec![FrameJoin { frame: unused_leaf, condition: bool_literal("true"), is_outer: true }],
            select: vec![("code".into(), col("school"))],
            filter: None,
            group: vec![],
            group_filter: None,
            order: vec![],
            limit: None,
            offset: None,
        };
        let reduced = reduce_frame(branch);
        match reduced {
            Frame::Branch { joins, .. } => assert!(joins.is_empty()),
            other => panic!("expected Branch frame, got {other:?}"),
        }
    }

    #[test]
    fn keeps_a_left_join_whose_alias_is_selected() {
        let referenced_leaf = Frame::Leaf { alias: "department".into(), table: 1 };
        let branch = Frame::Branch {
            alias: "school".into(),
            base: Box::new(Frame::Leaf { alias: "school".into(), table: 0 }),
            joins: vec![FrameJoin { frame: referenced_leaf, condition: bool_literal("true"), is_outer: true }],
            select: vec![("department_code".into(), col("department"))],
            filter: None,
            group: vec![],
            group_filter: None,
            order: vec![],
            limit: None,
            offset: None,
        };
        let reduced = reduce_frame(branch);
        match reduced {
            Frame::Branch { joins, .. } => assert_eq!(joins.len(), 1),
            other => panic!("expected Branch frame, got {other:?}"),
        }
    }
}
