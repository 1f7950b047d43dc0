use crate::fragment::{column_alias, Scope};
use crate::sql_text::{
    escape_like, in_list, quote, DATE_TIME_TYPES, DECIMAL_LEXICAL, DOUBLE_LEXICAL,
    INTEGER_LEXICAL, INTEGER_TYPES, NULL_TEXT, NUMERIC_TYPES,
};
use crate::SqlCompiler;
use kgsql_common::{unsupported_err, CompileResult};
use kgsql_encoding::StorableField;
use kgsql_logical::{ArithmeticOp, CompareOp, PlanExpression, PlanFunction, UnaryOp};
use kgsql_model::vocab::{rdf, xsd};
use kgsql_model::{Term, Variable};

/// What is statically known about the type of a term expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KnownType {
    /// An IRI or a blank node.
    Resource,
    Integer,
    /// `xsd:decimal` that is not an integer.
    Decimal,
    /// `xsd:double` or `xsd:float`.
    Float,
    /// `xsd:string` or `rdf:langString`.
    String,
    Boolean,
    DateTime,
    OtherLiteral,
}

impl KnownType {
    fn of(term: &Term) -> Self {
        match term {
            Term::NamedNode(_) | Term::BlankNode(_) => KnownType::Resource,
            Term::Literal(literal) => {
                let datatype = literal.datatype().as_str();
                if INTEGER_TYPES.contains(&datatype) {
                    KnownType::Integer
                } else if datatype == xsd::DECIMAL.as_str() {
                    KnownType::Decimal
                } else if NUMERIC_TYPES.contains(&datatype) {
                    KnownType::Float
                } else if literal.datatype() == xsd::STRING || literal.datatype() == rdf::LANG_STRING
                {
                    KnownType::String
                } else if literal.datatype() == xsd::BOOLEAN {
                    KnownType::Boolean
                } else if DATE_TIME_TYPES.contains(&datatype) {
                    KnownType::DateTime
                } else {
                    KnownType::OtherLiteral
                }
            }
        }
    }

    fn is_numeric(self) -> bool {
        matches!(self, KnownType::Integer | KnownType::Decimal | KnownType::Float)
    }
}

/// The SQL expressions for the three columns of a term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TermSql {
    pub value: String,
    pub datatype: String,
    pub language: String,
    pub known: Option<KnownType>,
    /// The value can never be `NULL`.
    pub constant: bool,
}

impl TermSql {
    pub fn null() -> Self {
        Self {
            value: NULL_TEXT.to_owned(),
            datatype: NULL_TEXT.to_owned(),
            language: NULL_TEXT.to_owned(),
            known: None,
            constant: false,
        }
    }

    pub fn columns(alias: &str, slot: usize) -> Self {
        Self {
            value: format!("{alias}.{}", column_alias(slot, StorableField::Value)),
            datatype: format!("{alias}.{}", column_alias(slot, StorableField::DataType)),
            language: format!("{alias}.{}", column_alias(slot, StorableField::Language)),
            known: None,
            constant: false,
        }
    }

    /// A literal of the fixed type `datatype` whose lexical form is `value`.
    fn typed(value: String, datatype: &str, known: KnownType) -> Self {
        Self {
            datatype: format!("CASE WHEN ({value}) IS NULL THEN {NULL_TEXT} ELSE {} END", quote(datatype)),
            value,
            language: NULL_TEXT.to_owned(),
            known: Some(known),
            constant: false,
        }
    }

    /// An `xsd:boolean` literal from a SQL boolean.
    pub fn boolean(condition: &str) -> Self {
        Self::typed(
            format!("CASE WHEN {condition} THEN 'true' WHEN NOT ({condition}) THEN 'false' END"),
            xsd::BOOLEAN.as_str(),
            KnownType::Boolean,
        )
    }

    /// Replaces the three columns with `CASE WHEN {condition} THEN column END`.
    fn when(&self, condition: &str) -> Self {
        Self {
            value: format!("CASE WHEN {condition} THEN {} END", self.value),
            datatype: format!("CASE WHEN {condition} THEN {} END", self.datatype),
            language: format!("CASE WHEN {condition} THEN {} END", self.language),
            known: self.known,
            constant: false,
        }
    }
}

/// The result of compiling an expression. Conversions happen lazily on demand.
#[derive(Debug, Clone)]
pub(crate) enum SqlExpr {
    /// A SQL boolean where `NULL` represents an evaluation error.
    Bool(String),
    Term(TermSql),
}

/// The outcome of a type test that may be decided at compile time.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Test {
    Always,
    Never,
    Runtime(String),
}

impl Test {
    fn and(self, other: Test) -> Test {
        match (self, other) {
            (Test::Never, _) | (_, Test::Never) => Test::Never,
            (Test::Always, t) | (t, Test::Always) => t,
            (Test::Runtime(a), Test::Runtime(b)) => Test::Runtime(format!("{a} AND {b}")),
        }
    }

    fn sql(&self) -> String {
        match self {
            Test::Always => "TRUE".to_owned(),
            Test::Never => "FALSE".to_owned(),
            Test::Runtime(sql) => sql.clone(),
        }
    }
}

fn type_test(term: &TermSql, accepts: fn(KnownType) -> bool, datatypes: &[&str]) -> Test {
    match term.known {
        Some(known) if accepts(known) => Test::Always,
        Some(_) => Test::Never,
        None => Test::Runtime(in_list(&term.datatype, datatypes)),
    }
}

fn is_numeric(term: &TermSql) -> Test {
    type_test(term, KnownType::is_numeric, NUMERIC_TYPES)
}

fn is_integer(term: &TermSql) -> Test {
    type_test(term, |k| k == KnownType::Integer, INTEGER_TYPES)
}

fn is_integer_or_decimal(term: &TermSql) -> Test {
    let mut datatypes = INTEGER_TYPES.to_vec();
    datatypes.push(xsd::DECIMAL.as_str());
    match term.known {
        Some(KnownType::Integer | KnownType::Decimal) => Test::Always,
        Some(_) => Test::Never,
        None => Test::Runtime(in_list(&term.datatype, &datatypes)),
    }
}

fn is_string(term: &TermSql) -> Test {
    type_test(
        term,
        |k| k == KnownType::String,
        &[xsd::STRING.as_str(), rdf::LANG_STRING.as_str()],
    )
}

fn is_date_time(term: &TermSql) -> Test {
    type_test(term, |k| k == KnownType::DateTime, DATE_TIME_TYPES)
}

fn is_boolean(term: &TermSql) -> Test {
    type_test(term, |k| k == KnownType::Boolean, &[xsd::BOOLEAN.as_str()])
}

/// `CAST(value AS sql_type)` if `value` matches `lexical`, `NULL` otherwise, so a malformed
/// lexical form is an evaluation error instead of a failed statement.
fn checked_cast(value: &str, lexical: &str, sql_type: &str) -> String {
    format!("CASE WHEN {value} ~ {lexical} THEN CAST({value} AS {sql_type}) END")
}

pub(crate) fn double(value: &str) -> String {
    checked_cast(value, DOUBLE_LEXICAL, "DOUBLE PRECISION")
}

/// The exact value of an integer or decimal.
fn decimal(value: &str) -> String {
    checked_cast(value, DECIMAL_LEXICAL, "NUMERIC")
}

fn bigint(value: &str) -> String {
    checked_cast(value, INTEGER_LEXICAL, "BIGINT")
}

/// Structural term equality.
pub(crate) fn term_equal(a: &TermSql, b: &TermSql) -> String {
    format!(
        "({} = {} AND {} IS NOT DISTINCT FROM {} AND {} IS NOT DISTINCT FROM {})",
        a.value, b.value, a.datatype, b.datatype, a.language, b.language
    )
}

/// Builds `CASE WHEN test THEN result ... END` from guarded branches, pruning branches that can
/// never apply. Returns `None` if no branch applies.
fn case_of(branches: Vec<(Test, String)>, otherwise: Option<String>) -> Option<String> {
    let mut whens = Vec::new();
    for (test, result) in branches {
        match test {
            Test::Never => {}
            Test::Always => {
                if whens.is_empty() {
                    return Some(result);
                }
                return Some(format!("CASE {} ELSE {result} END", whens.join(" ")));
            }
            Test::Runtime(condition) => whens.push(format!("WHEN {condition} THEN {result}")),
        }
    }
    match (whens.is_empty(), otherwise) {
        (true, otherwise) => otherwise,
        (false, Some(otherwise)) => Some(format!("CASE {} ELSE {otherwise} END", whens.join(" "))),
        (false, None) => Some(format!("CASE {} END", whens.join(" "))),
    }
}

/// A `LIKE` pattern for a text predicate with a constant argument.
enum LikeShape {
    Contains,
    StartsWith,
    EndsWith,
}

impl SqlCompiler<'_> {
    pub(crate) fn compile_expression(
        &mut self,
        expression: &PlanExpression,
        scope: &Scope,
    ) -> CompileResult<SqlExpr> {
        Ok(match expression {
            PlanExpression::Constant(term) => SqlExpr::Term(self.constant(term)),
            PlanExpression::Variable(variable) => SqlExpr::Term(
                scope.get(variable).cloned().unwrap_or_else(TermSql::null),
            ),
            PlanExpression::Or(a, b) => {
                let (a, b) = (self.compile_bool(a, scope)?, self.compile_bool(b, scope)?);
                SqlExpr::Bool(format!("({a} OR {b})"))
            }
            PlanExpression::And(a, b) => {
                let (a, b) = (self.compile_bool(a, scope)?, self.compile_bool(b, scope)?);
                SqlExpr::Bool(format!("({a} AND {b})"))
            }
            PlanExpression::Not(inner) => {
                SqlExpr::Bool(format!("(NOT {})", self.compile_bool(inner, scope)?))
            }
            PlanExpression::Compare(op, a, b) => {
                let (a, b) = (self.compile_term(a, scope)?, self.compile_term(b, scope)?);
                SqlExpr::Bool(compare(*op, &a, &b))
            }
            PlanExpression::SameTerm(a, b) => {
                let (a, b) = (self.compile_term(a, scope)?, self.compile_term(b, scope)?);
                SqlExpr::Bool(term_equal(&a, &b))
            }
            PlanExpression::In(needle, list) => {
                let needle = self.compile_term(needle, scope)?;
                let mut alternatives = Vec::with_capacity(list.len());
                for candidate in list {
                    let candidate = self.compile_term(candidate, scope)?;
                    alternatives.push(compare(CompareOp::Eq, &needle, &candidate));
                }
                if alternatives.is_empty() {
                    SqlExpr::Bool("FALSE".to_owned())
                } else {
                    SqlExpr::Bool(format!("({})", alternatives.join(" OR ")))
                }
            }
            PlanExpression::Arithmetic(op, a, b) => {
                let (a, b) = (self.compile_term(a, scope)?, self.compile_term(b, scope)?);
                SqlExpr::Term(arithmetic(*op, &a, &b))
            }
            PlanExpression::Unary(op, inner) => {
                let inner = self.compile_term(inner, scope)?;
                SqlExpr::Term(unary(*op, &inner))
            }
            PlanExpression::Bound(variable) => SqlExpr::Bool(match scope.get(variable) {
                Some(term) => format!("({} IS NOT NULL)", term.value),
                None => "FALSE".to_owned(),
            }),
            PlanExpression::If(condition, a, b) => {
                let condition = self.compile_bool(condition, scope)?;
                let (a, b) = (self.compile_term(a, scope)?, self.compile_term(b, scope)?);
                let pick = |x: &str, y: &str| {
                    format!("CASE WHEN {condition} THEN {x} WHEN NOT ({condition}) THEN {y} END")
                };
                SqlExpr::Term(TermSql {
                    value: pick(&a.value, &b.value),
                    datatype: pick(&a.datatype, &b.datatype),
                    language: pick(&a.language, &b.language),
                    known: if a.known == b.known { a.known } else { None },
                    constant: false,
                })
            }
            PlanExpression::Coalesce(list) => {
                let terms = list
                    .iter()
                    .map(|e| self.compile_term(e, scope))
                    .collect::<CompileResult<Vec<_>>>()?;
                SqlExpr::Term(coalesce(&terms))
            }
            PlanExpression::Exists(pattern) => SqlExpr::Bool(self.compile_exists(pattern, scope)?),
            PlanExpression::Function(function, args) => self.compile_function(*function, args, scope)?,
        })
    }

    pub(crate) fn compile_bool(
        &mut self,
        expression: &PlanExpression,
        scope: &Scope,
    ) -> CompileResult<String> {
        Ok(match self.compile_expression(expression, scope)? {
            SqlExpr::Bool(sql) => sql,
            SqlExpr::Term(term) => effective_boolean_value(&term),
        })
    }

    pub(crate) fn compile_term(
        &mut self,
        expression: &PlanExpression,
        scope: &Scope,
    ) -> CompileResult<TermSql> {
        Ok(match self.compile_expression(expression, scope)? {
            SqlExpr::Bool(sql) => TermSql::boolean(&sql),
            SqlExpr::Term(term) => term,
        })
    }

    /// A bound term. All three columns are parameters.
    pub(crate) fn constant(&mut self, term: &Term) -> TermSql {
        let value = self.codec.encode(term.as_ref());
        TermSql {
            value: self.params.text(&value.value),
            datatype: match &value.datatype {
                Some(datatype) => self.params.text(datatype),
                None => NULL_TEXT.to_owned(),
            },
            language: match &value.language {
                Some(language) => self.params.text(language),
                None => NULL_TEXT.to_owned(),
            },
            known: Some(KnownType::of(term)),
            constant: true,
        }
    }

    fn compile_function(
        &mut self,
        function: PlanFunction,
        args: &[PlanExpression],
        scope: &Scope,
    ) -> CompileResult<SqlExpr> {
        match function {
            PlanFunction::Contains => {
                self.compile_text_predicate(LikeShape::Contains, &args[0], &args[1], scope)
            }
            PlanFunction::StrStarts => {
                self.compile_text_predicate(LikeShape::StartsWith, &args[0], &args[1], scope)
            }
            PlanFunction::StrEnds => {
                self.compile_text_predicate(LikeShape::EndsWith, &args[0], &args[1], scope)
            }
            PlanFunction::Regex => self.compile_regex(args, scope),
            _ => {
                let term = self.compile_term(&args[0], scope)?;
                Ok(unary_function(function, &term))
            }
        }
    }

    /// `CONTAINS`, `STRSTARTS` and `STRENDS`.
    ///
    /// A constant needle becomes a `LIKE` pattern so that the trigram index on the literal table
    /// can serve it. `CONTAINS(LCASE(x), "c")` becomes `x ILIKE '%c%'`.
    fn compile_text_predicate(
        &mut self,
        shape: LikeShape,
        haystack: &PlanExpression,
        needle: &PlanExpression,
        scope: &Scope,
    ) -> CompileResult<SqlExpr> {
        if let Some(Term::Literal(literal)) = needle.as_constant() {
            if literal.datatype() == xsd::STRING || literal.datatype() == rdf::LANG_STRING {
                let (haystack, operator, text) = match haystack {
                    PlanExpression::Function(PlanFunction::LCase, inner) => {
                        (&inner[0], "ILIKE", literal.value().to_lowercase())
                    }
                    _ => (haystack, "LIKE", literal.value().to_owned()),
                };
                let escaped = escape_like(&text);
                let pattern = match shape {
                    LikeShape::Contains => format!("%{escaped}%"),
                    LikeShape::StartsWith => format!("{escaped}%"),
                    LikeShape::EndsWith => format!("%{escaped}"),
                };
                let haystack = self.compile_term(haystack, scope)?;
                let pattern = self.params.text(&pattern);
                let predicate = format!("{} {operator} {pattern}", haystack.value);
                return Ok(SqlExpr::Bool(guard(is_string(&haystack), predicate)));
            }
        }

        let haystack = self.compile_term(haystack, scope)?;
        let needle = self.compile_term(needle, scope)?;
        let (h, n) = (&haystack.value, &needle.value);
        let predicate = match shape {
            LikeShape::Contains => format!("strpos({h}, {n}) > 0"),
            LikeShape::StartsWith => format!("left({h}, char_length({n})) = {n}"),
            LikeShape::EndsWith => format!("right({h}, char_length({n})) = {n}"),
        };
        Ok(SqlExpr::Bool(guard(
            is_string(&haystack).and(is_string(&needle)),
            predicate,
        )))
    }

    /// `REGEX(text, pattern [, flags])` with the flags `i` and `q`.
    fn compile_regex(&mut self, args: &[PlanExpression], scope: &Scope) -> CompileResult<SqlExpr> {
        let flags = match args.get(2) {
            None => String::new(),
            Some(PlanExpression::Constant(Term::Literal(flags))) => flags.value().to_owned(),
            Some(other) => return unsupported_err!("REGEX flags must be a constant, found {other}"),
        };
        let mut case_insensitive = false;
        let mut literal_mode = false;
        for flag in flags.chars() {
            match flag {
                'i' => case_insensitive = true,
                'q' => literal_mode = true,
                _ => return unsupported_err!("REGEX flag {flag:?}"),
            }
        }

        if literal_mode {
            if let Some(Term::Literal(pattern)) = args[1].as_constant() {
                let text = self.compile_term(&args[0], scope)?;
                let pattern = self.params.text(&format!("%{}%", escape_like(pattern.value())));
                let operator = if case_insensitive { "ILIKE" } else { "LIKE" };
                let predicate = format!("{} {operator} {pattern}", text.value);
                return Ok(SqlExpr::Bool(guard(is_string(&text), predicate)));
            }
            let text = self.compile_term(&args[0], scope)?;
            let pattern = self.compile_term(&args[1], scope)?;
            let predicate = if case_insensitive {
                format!("strpos(lower({}), lower({})) > 0", text.value, pattern.value)
            } else {
                format!("strpos({}, {}) > 0", text.value, pattern.value)
            };
            return Ok(SqlExpr::Bool(guard(is_string(&text), predicate)));
        }

        let text = self.compile_term(&args[0], scope)?;
        let pattern = self.compile_term(&args[1], scope)?;
        let operator = if case_insensitive { "~*" } else { "~" };
        let predicate = format!("{} {operator} {}", text.value, pattern.value);
        Ok(SqlExpr::Bool(guard(is_string(&text), predicate)))
    }

    /// A correlated `EXISTS` over a pattern. Variables bound by the outer solution restrict the
    /// inner pattern.
    fn compile_exists(
        &mut self,
        pattern: &kgsql_logical::QueryPlanNode,
        scope: &Scope,
    ) -> CompileResult<String> {
        let inner = self.compile_node(pattern)?;
        if inner.empty {
            return Ok("FALSE".to_owned());
        }
        let alias = self.next_alias();
        let mut conditions = Vec::new();
        for binding in &inner.bindings {
            if let Some(outer) = scope.get(&binding.variable) {
                let inner_term = TermSql::columns(&alias, binding.slot);
                let mut alternatives = Vec::new();
                if !outer.constant {
                    alternatives.push(format!("{} IS NULL", outer.value));
                }
                if binding.nullable {
                    alternatives.push(format!("{} IS NULL", inner_term.value));
                }
                alternatives.push(term_equal(outer, &inner_term));
                conditions.push(format!("({})", alternatives.join(" OR ")));
            }
        }
        let filter = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };
        Ok(format!(
            "EXISTS (SELECT 1 FROM ({}) AS {alias}{filter})",
            inner.sql
        ))
    }
}

/// `test AND predicate`, keeping a plain `predicate` when the test always holds.
///
/// The conjunction leaves the predicate visible to the planner, which can then use an index for
/// it.
fn guard(test: Test, predicate: String) -> String {
    match test {
        Test::Always => predicate,
        Test::Never => "CAST(NULL AS BOOLEAN)".to_owned(),
        Test::Runtime(condition) => format!("({condition} AND {predicate})"),
    }
}

/// The effective boolean value of a term. `NULL` if it has none.
pub(crate) fn effective_boolean_value(term: &TermSql) -> String {
    let v = &term.value;
    case_of(
        vec![
            (is_boolean(term), format!("{v} IN ('true', '1')")),
            (is_string(term), format!("char_length({v}) > 0")),
            (is_numeric(term), format!("{} <> 0", double(v))),
        ],
        None,
    )
    .unwrap_or_else(|| "CAST(NULL AS BOOLEAN)".to_owned())
}

/// Value comparison with numeric, string and date awareness. Equality falls back to term
/// equality for all other terms.
fn compare(op: CompareOp, a: &TermSql, b: &TermSql) -> String {
    let symbol = op.symbol();
    let (av, bv) = (&a.value, &b.value);
    let same_type = |test: Test| match (a.known, b.known) {
        (Some(_), Some(_)) => test,
        _ => test.and(Test::Runtime(format!("{} = {}", a.datatype, b.datatype))),
    };
    let string_test = match is_string(a).and(is_string(b)) {
        Test::Never => Test::Never,
        test => test.and(Test::Runtime(format!(
            "{} = {} AND {} IS NOT DISTINCT FROM {}",
            a.datatype, b.datatype, a.language, b.language
        ))),
    };
    let branches = vec![
        (
            is_integer_or_decimal(a).and(is_integer_or_decimal(b)),
            format!("{} {symbol} {}", decimal(av), decimal(bv)),
        ),
        (
            is_numeric(a).and(is_numeric(b)),
            format!("{} {symbol} {}", double(av), double(bv)),
        ),
        (string_test, format!("{av} {symbol} {bv}")),
        (
            same_type(is_date_time(a).and(is_date_time(b))),
            format!(
                "CAST({av} AS TIMESTAMP WITH TIME ZONE) {symbol} CAST({bv} AS TIMESTAMP WITH TIME ZONE)"
            ),
        ),
        (
            is_boolean(a).and(is_boolean(b)),
            format!("({av} IN ('true', '1')) {symbol} ({bv} IN ('true', '1'))"),
        ),
    ];
    let otherwise = (op == CompareOp::Eq).then(|| term_equal(a, b));
    let body = case_of(branches, otherwise).unwrap_or_else(|| "CAST(NULL AS BOOLEAN)".to_owned());
    if a.constant && b.constant || !body.starts_with("CASE") {
        return body;
    }
    let mut nullable = Vec::new();
    if !a.constant {
        nullable.push(format!("{av} IS NULL"));
    }
    if !b.constant {
        nullable.push(format!("{bv} IS NULL"));
    }
    format!(
        "CASE WHEN {} THEN CAST(NULL AS BOOLEAN) ELSE {body} END",
        nullable.join(" OR ")
    )
}

fn arithmetic(op: ArithmeticOp, a: &TermSql, b: &TermSql) -> TermSql {
    let symbol = op.symbol();
    let both_integer = is_integer(a).and(is_integer(b));
    let both_decimal = is_integer_or_decimal(a).and(is_integer_or_decimal(b));
    let both_numeric = is_numeric(a).and(is_numeric(b));
    let divisor = if op == ArithmeticOp::Divide {
        format!("NULLIF({}, 0)", double(&b.value))
    } else {
        double(&b.value)
    };
    let integer_result = op != ArithmeticOp::Divide;

    let value = case_of(
        vec![
            (
                if integer_result { both_integer.clone() } else { Test::Never },
                format!(
                    "CAST({} {symbol} {} AS TEXT)",
                    bigint(&a.value),
                    bigint(&b.value)
                ),
            ),
            (
                both_numeric.clone(),
                format!("CAST({} {symbol} {divisor} AS TEXT)", double(&a.value)),
            ),
        ],
        None,
    );
    let datatype = case_of(
        vec![
            (
                if integer_result { both_integer.clone() } else { Test::Never },
                quote(xsd::INTEGER.as_str()),
            ),
            (both_decimal.clone(), quote(xsd::DECIMAL.as_str())),
            (both_numeric.clone(), quote(xsd::DOUBLE.as_str())),
        ],
        None,
    );
    let known = match (&both_integer, &both_decimal, &both_numeric) {
        (Test::Always, _, _) if integer_result => Some(KnownType::Integer),
        (_, Test::Always, _) => Some(KnownType::Decimal),
        (_, _, Test::Always) => Some(KnownType::Float),
        _ => None,
    };
    match (value, datatype) {
        (Some(value), Some(datatype)) => TermSql {
            value,
            datatype,
            language: NULL_TEXT.to_owned(),
            known,
            constant: false,
        },
        _ => TermSql::null(),
    }
}

fn unary(op: UnaryOp, term: &TermSql) -> TermSql {
    let value = match op {
        UnaryOp::Plus => case_of(vec![(is_numeric(term), term.value.clone())], None),
        UnaryOp::Minus => case_of(
            vec![
                (is_integer(term), format!("CAST(-{} AS TEXT)", bigint(&term.value))),
                (is_numeric(term), format!("CAST(-{} AS TEXT)", double(&term.value))),
            ],
            None,
        ),
    };
    let datatype = case_of(vec![(is_numeric(term), term.datatype.clone())], None);
    match (value, datatype) {
        (Some(value), Some(datatype)) => TermSql {
            value,
            datatype,
            language: NULL_TEXT.to_owned(),
            known: term.known,
            constant: false,
        },
        _ => TermSql::null(),
    }
}

fn coalesce(terms: &[TermSql]) -> TermSql {
    match terms.first() {
        None => return TermSql::null(),
        Some(first) if first.constant => return first.clone(),
        Some(_) => {}
    }
    let pick = |column: fn(&TermSql) -> &String| {
        let whens = terms
            .iter()
            .map(|t| format!("WHEN {} IS NOT NULL THEN {}", t.value, column(t)))
            .collect::<Vec<_>>();
        format!("CASE {} END", whens.join(" "))
    };
    let known = terms[0].known;
    TermSql {
        value: pick(|t| &t.value),
        datatype: pick(|t| &t.datatype),
        language: pick(|t| &t.language),
        known: if terms.iter().all(|t| t.known == known) {
            known
        } else {
            None
        },
        constant: false,
    }
}

fn unary_function(function: PlanFunction, term: &TermSql) -> SqlExpr {
    let v = &term.value;
    let dt = &term.datatype;
    let is_blank_node = format!("({dt} IS NULL AND substr({v}, 1, 2) = '_:')");
    let not_null = |sql: String| format!("CASE WHEN {v} IS NULL THEN CAST(NULL AS BOOLEAN) ELSE {sql} END");
    match function {
        PlanFunction::Str => {
            SqlExpr::Term(TermSql::typed(
                format!("CASE WHEN NOT {is_blank_node} THEN {v} END"),
                xsd::STRING.as_str(),
                KnownType::String,
            ))
        }
        PlanFunction::Lang => SqlExpr::Term(TermSql::typed(
            format!(
                "CASE WHEN {dt} IS NOT NULL THEN COALESCE({}, '') END",
                term.language
            ),
            xsd::STRING.as_str(),
            KnownType::String,
        )),
        PlanFunction::Datatype => SqlExpr::Term(TermSql {
            value: dt.clone(),
            datatype: NULL_TEXT.to_owned(),
            language: NULL_TEXT.to_owned(),
            known: Some(KnownType::Resource),
            constant: false,
        }),
        PlanFunction::StrLen => SqlExpr::Term(TermSql::typed(
            match is_string(term) {
                Test::Never => NULL_TEXT.to_owned(),
                test => format!("CASE WHEN {} THEN CAST(char_length({v}) AS TEXT) END", test.sql()),
            },
            xsd::INTEGER.as_str(),
            KnownType::Integer,
        )),
        PlanFunction::UCase | PlanFunction::LCase => {
            let function = if function == PlanFunction::UCase {
                "upper"
            } else {
                "lower"
            };
            match is_string(term) {
                Test::Never => SqlExpr::Term(TermSql::null()),
                Test::Always => SqlExpr::Term(TermSql {
                    value: format!("{function}({v})"),
                    ..term.clone()
                }),
                Test::Runtime(condition) => {
                    let mut result = term.when(&condition);
                    result.value = format!("CASE WHEN {condition} THEN {function}({v}) END");
                    result.known = Some(KnownType::String);
                    SqlExpr::Term(result)
                }
            }
        }
        PlanFunction::IsIri => SqlExpr::Bool(not_null(format!("NOT {is_blank_node} AND {dt} IS NULL"))),
        PlanFunction::IsBlank => SqlExpr::Bool(not_null(is_blank_node)),
        PlanFunction::IsLiteral => SqlExpr::Bool(not_null(format!("{dt} IS NOT NULL"))),
        PlanFunction::IsNumeric => SqlExpr::Bool(not_null(match is_numeric(term) {
            Test::Runtime(condition) => format!("COALESCE({condition}, FALSE)"),
            test => test.sql(),
        })),
        PlanFunction::Contains
        | PlanFunction::StrStarts
        | PlanFunction::StrEnds
        | PlanFunction::Regex => SqlExpr::Term(TermSql::null()),
    }
}

/// The ordering keys of a term: kind (unbound, blank node, IRI, literal), numeric value, exact
/// value of integers and decimals, and lexical value.
///
/// Rounding to a double never reverses the order of two values, so the exact value only breaks
/// the ties of the double key.
pub(crate) fn order_keys(term: &TermSql, descending: bool) -> [String; 4] {
    let direction = if descending { "DESC" } else { "ASC" };
    let (v, dt) = (&term.value, &term.datatype);
    let kind = format!(
        "CASE WHEN {v} IS NULL THEN 0 WHEN {dt} IS NULL AND substr({v}, 1, 2) = '_:' THEN 1 \
         WHEN {dt} IS NULL THEN 2 ELSE 3 END"
    );
    let numeric = match is_numeric(term) {
        Test::Always => double(v),
        Test::Never => "CAST(NULL AS DOUBLE PRECISION)".to_owned(),
        Test::Runtime(condition) => format!("CASE WHEN {condition} THEN {} END", double(v)),
    };
    let exact = match is_integer_or_decimal(term) {
        Test::Always => decimal(v),
        Test::Never => "CAST(NULL AS NUMERIC)".to_owned(),
        Test::Runtime(condition) => format!("CASE WHEN {condition} THEN {} END", decimal(v)),
    };
    [
        format!("{kind} {direction}"),
        format!("{numeric} {direction}"),
        format!("{exact} {direction}"),
        format!("{v} {direction}"),
    ]
}

/// Whether `expression` only reads variables accepted by `visible`.
pub(crate) fn only_reads(expression: &PlanExpression, visible: &dyn Fn(&Variable) -> bool) -> bool {
    match expression {
        PlanExpression::Constant(_) => true,
        PlanExpression::Variable(v) | PlanExpression::Bound(v) => visible(v),
        PlanExpression::Or(a, b)
        | PlanExpression::And(a, b)
        | PlanExpression::Compare(_, a, b)
        | PlanExpression::SameTerm(a, b)
        | PlanExpression::Arithmetic(_, a, b) => only_reads(a, visible) && only_reads(b, visible),
        PlanExpression::Not(a) | PlanExpression::Unary(_, a) => only_reads(a, visible),
        PlanExpression::In(a, list) => {
            only_reads(a, visible) && list.iter().all(|e| only_reads(e, visible))
        }
        PlanExpression::If(a, b, c) => {
            only_reads(a, visible) && only_reads(b, visible) && only_reads(c, visible)
        }
        PlanExpression::Coalesce(list) | PlanExpression::Function(_, list) => {
            list.iter().all(|e| only_reads(e, visible))
        }
        PlanExpression::Exists(_) => false,
    }
}

pub(crate) fn is_numeric_sql(term: &TermSql) -> String {
    is_numeric(term).sql()
}

pub(crate) fn is_integer_sql(term: &TermSql) -> String {
    is_integer(term).sql()
}

pub(crate) fn is_integer_or_decimal_sql(term: &TermSql) -> String {
    is_integer_or_decimal(term).sql()
}
