use crate::results::{instantiate, QuerySolution};
use crate::sparql::error::QueryEvaluationError;
use crate::sparql::eval::{bind_parameters, decode_row, set_statement_timeout};
use crate::sparql::UpdateOptions;
use kgsql_common::{CompileError, StorageError};
use kgsql_encoding::SchemaHandle;
use kgsql_logical::{GraphPatternRewriter, PatternTerm, StatementPattern};
use kgsql_model::{BlankNode, GraphScope, NamedNode, Subject, Term, Triple, Variable};
use kgsql_sql::SqlCompiler;
use kgsql_storage::writer::{self, RoutedRows};
use kgsql_storage::{commit, PgStorage};
use rustc_hash::FxHashMap;
use spargebra::algebra::{GraphPattern, GraphTarget};
use spargebra::term::{
    GraphName, GraphNamePattern, GroundQuad, GroundQuadPattern, GroundSubject, GroundTerm,
    GroundTermPattern, NamedNodePattern, Quad, QuadPattern, TermPattern,
};
use spargebra::{GraphUpdateOperation, Update};
use std::sync::Arc;
use std::time::Duration;

/// Executes the operations of `update` in order. Statements without an explicit graph go to
/// `scope`.
///
/// Every operation runs in its own transaction. A failing operation is rolled back completely
/// and the following operations are not executed.
#[tracing::instrument(skip_all, fields(graph = %scope, operations = update.operations.len()))]
pub async fn evaluate_update(
    storage: &PgStorage,
    scope: &GraphScope,
    update: &Update,
    options: &UpdateOptions,
) -> Result<(), QueryEvaluationError> {
    let timeout = options.timeout.or(storage.config().statement_timeout);
    for operation in &update.operations {
        match operation {
            GraphUpdateOperation::InsertData { data } => {
                let mut bnodes = FxHashMap::default();
                let triples = data
                    .iter()
                    .map(|quad| data_triple(quad, scope, &mut bnodes))
                    .collect::<Result<Vec<_>, _>>()?;
                let schema = storage.ensure_graph(scope).await?;
                write(storage, &schema, &[], &triples, timeout).await?;
            }
            GraphUpdateOperation::DeleteData { data } => {
                let triples = data
                    .iter()
                    .map(|quad| ground_triple(quad, scope))
                    .collect::<Result<Vec<_>, _>>()?;
                if let Some(schema) = storage.graph(scope).await? {
                    write(storage, &schema, &triples, &[], timeout).await?;
                }
            }
            GraphUpdateOperation::DeleteInsert {
                delete,
                insert,
                using,
                pattern,
            } => {
                if using.is_some() {
                    return Err(unsupported("USING clauses; updates are scoped to one graph"));
                }
                let delete = delete
                    .iter()
                    .map(|pattern| delete_template(pattern, scope))
                    .collect::<Result<Vec<_>, _>>()?;
                let insert = insert
                    .iter()
                    .map(|pattern| insert_template(pattern, scope))
                    .collect::<Result<Vec<_>, _>>()?;
                delete_insert(storage, scope, &delete, &insert, pattern, timeout).await?;
            }
            GraphUpdateOperation::Load { .. } => {
                return Err(unsupported("LOAD operations; use the bulk loader"));
            }
            GraphUpdateOperation::Clear { silent, graph } => {
                for target in targets(storage, graph, *silent).await? {
                    storage.clear_graph(&target).await?;
                }
            }
            GraphUpdateOperation::Create { silent, graph } => {
                let created = storage
                    .create_graph(&GraphScope::Named(graph.clone()))
                    .await?;
                if !created && !silent {
                    return Err(QueryEvaluationError::GraphAlreadyExists(graph.clone()));
                }
            }
            GraphUpdateOperation::Drop { silent, graph } => {
                for target in targets(storage, graph, *silent).await? {
                    // The default graph always exists. Dropping it removes its statements.
                    if target.is_default() {
                        storage.clear_graph(&target).await?;
                    } else {
                        storage.drop_graph(&target).await?;
                    }
                }
            }
        }
    }
    Ok(())
}

/// Evaluates the pattern and applies the instantiated templates inside one transaction.
async fn delete_insert(
    storage: &PgStorage,
    scope: &GraphScope,
    delete: &[StatementPattern],
    insert: &[StatementPattern],
    pattern: &GraphPattern,
    timeout: Option<Duration>,
) -> Result<(), QueryEvaluationError> {
    let plan = GraphPatternRewriter::new(scope.clone()).rewrite(pattern)?;
    // Only an INSERT template can add statements, so only then is a missing graph created.
    let schema = if insert.is_empty() {
        match storage.graph(scope).await? {
            Some(schema) => schema,
            None => {
                tracing::debug!("Nothing to delete from a graph that does not exist");
                return Ok(());
            }
        }
    } else {
        storage.ensure_graph(scope).await?
    };
    let compiled = SqlCompiler::new(&schema, storage.cache()).compile_select(&plan)?;

    let mut tx = storage.pool().begin().await?;
    if let Some(timeout) = timeout {
        set_statement_timeout(&mut tx, timeout).await?;
    }

    let mut solutions = Vec::new();
    if !compiled.statically_empty {
        let variables: Arc<[Variable]> = compiled.variables.into();
        let rows = bind_parameters(&compiled.sql, &compiled.parameters)
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| StorageError::database("evaluating the WHERE clause of an update", e))?;
        for row in &rows {
            solutions.push(decode_row(row, &variables, storage.cache())?);
        }
    }

    let (deleted, inserted) = instantiate_all(delete, insert, &solutions);
    let removed = writer::delete(&mut tx, &schema, &RoutedRows::route(&deleted, storage.cache()))
        .await?;
    let added = writer::insert(&mut tx, &schema, &RoutedRows::route(&inserted, storage.cache()))
        .await?;
    commit(tx, "an update").await?;
    tracing::debug!(solutions = solutions.len(), removed, added, "Applied DELETE/INSERT");
    Ok(())
}

fn instantiate_all(
    delete: &[StatementPattern],
    insert: &[StatementPattern],
    solutions: &[QuerySolution],
) -> (Vec<Triple>, Vec<Triple>) {
    let mut deleted = Vec::new();
    let mut inserted = Vec::new();
    let mut bnodes = FxHashMap::default();
    for solution in solutions {
        deleted.extend(instantiate(delete, solution, &mut bnodes));
        inserted.extend(instantiate(insert, solution, &mut bnodes));
        bnodes.clear();
    }
    (deleted, inserted)
}

/// Deletes, then inserts, in one transaction.
async fn write(
    storage: &PgStorage,
    schema: &SchemaHandle,
    delete: &[Triple],
    insert: &[Triple],
    timeout: Option<Duration>,
) -> Result<(), QueryEvaluationError> {
    let mut tx = storage.pool().begin().await?;
    if let Some(timeout) = timeout {
        set_statement_timeout(&mut tx, timeout).await?;
    }
    let removed = writer::delete(&mut tx, schema, &RoutedRows::route(delete, storage.cache()))
        .await?;
    let added = writer::insert(&mut tx, schema, &RoutedRows::route(insert, storage.cache()))
        .await?;
    commit(tx, "an update").await?;
    tracing::debug!(removed, added, "Applied data update");
    Ok(())
}

/// The graphs a `CLEAR` or `DROP` applies to.
async fn targets(
    storage: &PgStorage,
    target: &GraphTarget,
    silent: bool,
) -> Result<Vec<GraphScope>, QueryEvaluationError> {
    let existing = storage.graphs().await?;
    Ok(match target {
        GraphTarget::NamedNode(graph) => {
            let scope = GraphScope::Named(graph.clone());
            if existing.contains(&scope) {
                vec![scope]
            } else if silent {
                Vec::new()
            } else {
                return Err(QueryEvaluationError::GraphDoesNotExist(graph.clone()));
            }
        }
        GraphTarget::DefaultGraph => existing
            .into_iter()
            .filter(GraphScope::is_default)
            .collect(),
        GraphTarget::NamedGraphs => existing.into_iter().filter(|g| !g.is_default()).collect(),
        GraphTarget::AllGraphs => existing,
    })
}

fn unsupported(what: &str) -> QueryEvaluationError {
    CompileError::UnsupportedQueryShape(what.to_owned()).into()
}

fn check_graph(graph: &GraphName, scope: &GraphScope) -> Result<(), QueryEvaluationError> {
    match graph {
        GraphName::DefaultGraph => Ok(()),
        GraphName::NamedNode(nn) if scope_is(scope, nn) => Ok(()),
        GraphName::NamedNode(nn) => Err(unsupported(&format!(
            "statements for graph {nn} in an update of graph {scope}"
        ))),
    }
}

fn check_graph_pattern(
    graph: &GraphNamePattern,
    scope: &GraphScope,
) -> Result<(), QueryEvaluationError> {
    match graph {
        GraphNamePattern::DefaultGraph => Ok(()),
        GraphNamePattern::NamedNode(nn) if scope_is(scope, nn) => Ok(()),
        GraphNamePattern::NamedNode(nn) => Err(unsupported(&format!(
            "templates for graph {nn} in an update of graph {scope}"
        ))),
        GraphNamePattern::Variable(v) => Err(unsupported(&format!("graph variable {v} in templates"))),
    }
}

fn scope_is(scope: &GraphScope, graph: &NamedNode) -> bool {
    matches!(scope, GraphScope::Named(nn) if nn == graph)
}

/// A statement of `INSERT DATA`. Blank nodes are renamed once per operation.
fn data_triple(
    quad: &Quad,
    scope: &GraphScope,
    bnodes: &mut FxHashMap<BlankNode, BlankNode>,
) -> Result<Triple, QueryEvaluationError> {
    check_graph(&quad.graph_name, scope)?;
    let mut rename = |term: Term| match term {
        Term::BlankNode(bnode) => bnodes.entry(bnode).or_default().clone().into(),
        term => term,
    };
    let subject: Subject = rename(quad.subject.clone().into())
        .try_into()
        .map_err(|_| QueryEvaluationError::InternalError("invalid INSERT DATA subject".to_owned()))?;
    let object = rename(quad.object.clone());
    Ok(Triple::new(subject, quad.predicate.clone(), object))
}

/// A statement of `DELETE DATA`.
fn ground_triple(quad: &GroundQuad, scope: &GraphScope) -> Result<Triple, QueryEvaluationError> {
    check_graph(&quad.graph_name, scope)?;
    let subject = match &quad.subject {
        GroundSubject::NamedNode(nn) => nn.clone(),
        #[allow(unreachable_patterns)]
        _ => return Err(unsupported("quoted triples")),
    };
    let object: Term = match &quad.object {
        GroundTerm::NamedNode(nn) => nn.clone().into(),
        GroundTerm::Literal(literal) => literal.clone().into(),
        #[allow(unreachable_patterns)]
        _ => return Err(unsupported("quoted triples")),
    };
    Ok(Triple::new(subject, quad.predicate.clone(), object))
}

fn delete_template(
    pattern: &GroundQuadPattern,
    scope: &GraphScope,
) -> Result<StatementPattern, QueryEvaluationError> {
    check_graph_pattern(&pattern.graph_name, scope)?;
    Ok(StatementPattern {
        subject: ground_term_pattern(&pattern.subject)?,
        predicate: named_node_pattern(&pattern.predicate),
        object: ground_term_pattern(&pattern.object)?,
    })
}

fn insert_template(
    pattern: &QuadPattern,
    scope: &GraphScope,
) -> Result<StatementPattern, QueryEvaluationError> {
    check_graph_pattern(&pattern.graph_name, scope)?;
    Ok(StatementPattern {
        subject: term_pattern(&pattern.subject)?,
        predicate: named_node_pattern(&pattern.predicate),
        object: term_pattern(&pattern.object)?,
    })
}

fn named_node_pattern(pattern: &NamedNodePattern) -> PatternTerm {
    match pattern {
        NamedNodePattern::NamedNode(nn) => PatternTerm::Bound(nn.clone().into()),
        NamedNodePattern::Variable(v) => PatternTerm::Variable(v.clone()),
    }
}

fn ground_term_pattern(pattern: &GroundTermPattern) -> Result<PatternTerm, QueryEvaluationError> {
    Ok(match pattern {
        GroundTermPattern::NamedNode(nn) => PatternTerm::Bound(nn.clone().into()),
        GroundTermPattern::Literal(literal) => PatternTerm::Bound(literal.clone().into()),
        GroundTermPattern::Variable(v) => PatternTerm::Variable(v.clone()),
        #[allow(unreachable_patterns)]
        _ => return Err(unsupported("quoted triple patterns")),
    })
}

/// Blank nodes stay bound so that [instantiate] renames them per solution.
fn term_pattern(pattern: &TermPattern) -> Result<PatternTerm, QueryEvaluationError> {
    Ok(match pattern {
        TermPattern::NamedNode(nn) => PatternTerm::Bound(nn.clone().into()),
        TermPattern::BlankNode(bnode) => PatternTerm::Bound(bnode.clone().into()),
        TermPattern::Literal(literal) => PatternTerm::Bound(literal.clone().into()),
        TermPattern::Variable(v) => PatternTerm::Variable(v.clone()),
        #[allow(unreachable_patterns)]
        _ => return Err(unsupported("quoted triple patterns")),
    })
}
