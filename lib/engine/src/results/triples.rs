use crate::results::QuerySolutionStream;
use crate::sparql::error::QueryEvaluationError;
use futures::{Stream, StreamExt};
use kgsql_logical::{PatternTerm, StatementPattern};
use kgsql_model::{BlankNode, Term, Triple};
use rustc_hash::{FxHashMap, FxHashSet};
use sparesults::QuerySolution;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

/// A stream over the triples that compose a graph solution.
///
/// Every solution instantiates the whole template. Blank nodes of the template are replaced by
/// fresh blank nodes per solution and triples without blank nodes are only emitted once.
pub struct QueryTripleStream {
    template: Vec<StatementPattern>,
    inner: QuerySolutionStream,
    buffered_results: Vec<Triple>,
    already_emitted_results: FxHashSet<Triple>,
    bnodes: FxHashMap<BlankNode, BlankNode>,
}

impl QueryTripleStream {
    pub fn new(template: Vec<StatementPattern>, inner: QuerySolutionStream) -> Self {
        Self {
            template,
            inner,
            buffered_results: Vec::new(),
            already_emitted_results: FxHashSet::default(),
            bnodes: FxHashMap::default(),
        }
    }

    pub async fn try_collect_to_vec(mut self) -> Result<Vec<Triple>, QueryEvaluationError> {
        let mut result = Vec::new();
        while let Some(triple) = self.next().await {
            result.push(triple?);
        }
        Ok(result)
    }

    fn poll_inner(&mut self, cx: &mut Context<'_>) -> Poll<Option<Result<Triple, QueryEvaluationError>>> {
        loop {
            if let Some(triple) = self.buffered_results.pop() {
                return Poll::Ready(Some(Ok(triple)));
            }

            let solution = match ready!(self.inner.poll_next_unpin(cx)) {
                None => return Poll::Ready(None),
                Some(Ok(solution)) => solution,
                Some(Err(error)) => return Poll::Ready(Some(Err(error))),
            };

            let mut instantiated = instantiate(&self.template, &solution, &mut self.bnodes);
            self.bnodes.clear();
            // Emitted in template order once popped.
            instantiated.reverse();
            for triple in instantiated {
                let new_triple = triple.subject.is_blank_node()
                    || triple.object.is_blank_node()
                    || self.already_emitted_results.insert(triple.clone());
                if new_triple {
                    self.buffered_results.push(triple);
                }
            }
        }
    }
}

/// Instantiates `template` with the bindings of `solution`.
///
/// Patterns with an unbound variable, a literal subject or a non-IRI predicate produce no
/// triple.
pub(crate) fn instantiate(
    template: &[StatementPattern],
    solution: &QuerySolution,
    bnodes: &mut FxHashMap<BlankNode, BlankNode>,
) -> Vec<Triple> {
    template
        .iter()
        .filter_map(|pattern| {
            let subject = template_value(&pattern.subject, solution, bnodes)?
                .try_into()
                .ok()?;
            let predicate = match template_value(&pattern.predicate, solution, bnodes)? {
                Term::NamedNode(nn) => nn,
                _ => return None,
            };
            let object = template_value(&pattern.object, solution, bnodes)?;
            Some(Triple {
                subject,
                predicate,
                object,
            })
        })
        .collect()
}

fn template_value(
    term: &PatternTerm,
    solution: &QuerySolution,
    bnodes: &mut FxHashMap<BlankNode, BlankNode>,
) -> Option<Term> {
    match term {
        PatternTerm::Bound(Term::BlankNode(bnode)) => Some(
            bnodes
                .entry(bnode.clone())
                .or_insert_with(BlankNode::default)
                .clone()
                .into(),
        ),
        PatternTerm::Bound(term) => Some(term.clone()),
        PatternTerm::Variable(v) => solution.get(v).cloned(),
    }
}

impl Stream for QueryTripleStream {
    type Item = Result<Triple, QueryEvaluationError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.poll_inner(cx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let (_, max) = self.inner.size_hint();
        (0, max.map(|v| v.saturating_mul(self.template.len())))
    }
}
