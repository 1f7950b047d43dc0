use datafusion::arrow::array::{Array, ArrayRef, StringArray};
use datafusion::arrow::compute::cast;
use datafusion::arrow::datatypes::{DataType, Field, Schema};
use datafusion::arrow::record_batch::RecordBatch;
use datafusion::prelude::SessionContext;
use kgsql_encoding::{classify, encode, DirectCodec, SchemaHandle, TableKind};
use kgsql_logical::LogicalQuery;
use kgsql_model::vocab::xsd;
use kgsql_model::{GraphScope, Literal, NamedNode, Term, Triple};
use kgsql_sql::{compile_query, CompiledQuery};
use spargebra::Query;
use std::sync::Arc;

pub const PREFIXES: &str = "PREFIX ex: <http://example.com/>\n\
     PREFIX xsd: <http://www.w3.org/2001/XMLSchema#>\n";

pub fn scope() -> GraphScope {
    GraphScope::named("http://example.com/graph").unwrap()
}

fn ex(local: &str) -> NamedNode {
    NamedNode::new_unchecked(format!("http://example.com/{local}"))
}

fn integer(value: i64) -> Term {
    Literal::from(value).into()
}

/// A small graph of two people, a robot and a device with serial numbers beyond the precision
/// of a double.
pub fn statements() -> Vec<Triple> {
    let rdf_type = NamedNode::new_unchecked("http://www.w3.org/1999/02/22-rdf-syntax-ns#type");
    vec![
        Triple::new(ex("alice"), rdf_type.clone(), ex("Person")),
        Triple::new(ex("alice"), ex("name"), Literal::new_simple_literal("Alice")),
        Triple::new(ex("alice"), ex("age"), integer(30)),
        Triple::new(ex("alice"), ex("knows"), ex("bob")),
        Triple::new(
            ex("alice"),
            ex("mood"),
            Literal::new_language_tagged_literal_unchecked("happy today", "en"),
        ),
        Triple::new(ex("bob"), rdf_type.clone(), ex("Person")),
        Triple::new(ex("bob"), ex("name"), Literal::new_simple_literal("Bob")),
        Triple::new(ex("bob"), ex("age"), integer(9)),
        Triple::new(ex("carol"), rdf_type, ex("Robot")),
        Triple::new(ex("carol"), ex("name"), Literal::new_simple_literal("Carol")),
        Triple::new(ex("carol"), ex("age"), integer(100)),
        Triple::new(ex("carol"), ex("mood"), Literal::new_simple_literal("Happy")),
        Triple::new(
            ex("carol"),
            ex("serial"),
            Literal::new_typed_literal("09007199254740993", xsd::INTEGER),
        ),
        Triple::new(ex("carol"), ex("score"), integer(5)),
        Triple::new(ex("dave"), ex("serial"), integer(9_007_199_254_740_992)),
        Triple::new(ex("dave"), ex("score"), Literal::new_typed_literal("abc", xsd::INTEGER)),
    ]
}

pub fn compile(query: &str) -> CompiledQuery {
    let query = Query::parse(&format!("{PREFIXES}{query}"), None).unwrap();
    let schema = SchemaHandle::new(scope());
    let query = LogicalQuery::try_new(&query, &scope()).unwrap();
    compile_query(&query, &schema, &DirectCodec).unwrap()
}

/// Loads [statements] into in-memory tables shaped like the statement tables.
async fn context() -> SessionContext {
    let schema = SchemaHandle::new(scope());
    let ctx = SessionContext::new();
    for kind in TableKind::ALL {
        let columns = SchemaHandle::columns(kind);
        let mut values: Vec<Vec<String>> = vec![Vec::new(); columns.len()];
        for triple in statements() {
            let object = triple.object.as_ref();
            if classify(triple.predicate.as_ref(), object) != kind {
                continue;
            }
            let subject = encode(triple.subject.as_ref().into());
            let encoded = encode(object);
            for (i, column) in columns.iter().enumerate() {
                values[i].push(match *column {
                    "subject" => subject.value.clone(),
                    "predicate" => triple.predicate.as_str().to_owned(),
                    "object" => encoded.value.clone(),
                    "datatype" => encoded.datatype.clone().unwrap_or_default(),
                    "language" => encoded.stored_language().to_owned(),
                    _ => schema.graph_id().to_owned(),
                });
            }
        }
        let fields = columns
            .iter()
            .map(|c| Field::new(*c, DataType::Utf8, false))
            .collect::<Vec<_>>();
        let arrays = values
            .into_iter()
            .map(|v| Arc::new(StringArray::from(v)) as ArrayRef)
            .collect::<Vec<_>>();
        let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays).unwrap();
        ctx.register_batch(&schema.table_name(kind), batch).unwrap();
    }
    ctx
}

/// Replaces the positional parameters with quoted literals.
pub fn inline_parameters(query: &CompiledQuery) -> String {
    let mut sql = query.sql.clone();
    for (i, value) in query.parameters.iter().enumerate().rev() {
        let literal = format!("'{}'", value.replace('\'', "''"));
        sql = sql.replace(&format!("${}", i + 1), &literal);
    }
    sql
}

/// Runs a query and returns its solutions. Each solution lists its terms in variable order.
pub async fn execute(query: &str) -> Vec<Vec<Option<String>>> {
    let compiled = compile(query);
    let ctx = context().await;
    let batches = ctx
        .sql(&inline_parameters(&compiled))
        .await
        .unwrap()
        .collect()
        .await
        .unwrap();

    let mut solutions = Vec::new();
    for batch in batches {
        let columns = batch
            .columns()
            .iter()
            .map(|c| cast(c, &DataType::Utf8).unwrap())
            .collect::<Vec<_>>();
        let columns = columns
            .iter()
            .map(|c| c.as_any().downcast_ref::<StringArray>().unwrap())
            .collect::<Vec<_>>();
        for row in 0..batch.num_rows() {
            let cell = |i: usize| {
                let column: &StringArray = columns[i];
                (!column.is_null(row)).then(|| column.value(row))
            };
            let solution = (0..compiled.variables.len())
                .map(|i| {
                    cell(3 * i).map(|value| {
                        kgsql_encoding::decode(value, cell(3 * i + 1), cell(3 * i + 2))
                            .unwrap()
                            .to_string()
                    })
                })
                .collect();
            solutions.push(solution);
        }
    }
    solutions
}

/// Like [execute] but ignores the order of the solutions.
pub async fn execute_unordered(query: &str) -> Vec<Vec<Option<String>>> {
    let mut solutions = execute(query).await;
    solutions.sort();
    solutions
}

/// Whether an `ASK` query has a solution.
pub async fn ask(query: &str) -> bool {
    let compiled = compile(query);
    let ctx = context().await;
    let batches = ctx
        .sql(&inline_parameters(&compiled))
        .await
        .unwrap()
        .collect()
        .await
        .unwrap();
    batches.iter().map(RecordBatch::num_rows).sum::<usize>() > 0
}

pub fn iri(local: &str) -> Option<String> {
    Some(format!("<http://example.com/{local}>"))
}

pub fn typed(value: &str, datatype: &str) -> Option<String> {
    Some(format!(
        "\"{value}\"^^<http://www.w3.org/2001/XMLSchema#{datatype}>"
    ))
}

pub fn plain(value: &str) -> Option<String> {
    Some(format!("\"{value}\""))
}
