//! Formula surface syntax: `formula_v1`
//!
//! ```text
//! formula    := body "||" binding ("," binding)*
//! binding    := ident "in" domain
//! subformula := ident "(" ident ("," ident)* ")" ":=" body
//! body       := implies ("<->" implies)*
//! implies    := or ("->" implies)?
//! or         := and ("|" and)*
//! and        := unary ("&" unary)*
//! unary      := "!" unary | quantifier | atom
//! quantifier := ("A" | "E") ident "in" (domain | term) "." body
//! atom       := "(" body ")" | term cmp term | call | "true" | "false"
//! ```
//!
//! Quantifier bodies extend as far to the right as possible. A single `|` is
//! disjunction; `||` separates the body from the outer bindings.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char as pchar, digit1, multispace0, multispace1},
    combinator::{all_consuming, map, not, opt, recognize},
    error::{Error as NomError, ErrorKind},
    multi::{separated_list0, separated_list1},
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};
use thiserror::Error;

use crate::ast::{
    Binding, CmpOp, Connective, Domain, DomainExpr, Expr, FormulaDecl, Quantifier,
    SubformulaDecl, Term,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormulaParseError {
    #[error("syntax error at offset {offset} (near `{near}`): expected {expected}")]
    Syntax {
        offset: usize,
        near: String,
        expected: &'static str,
    },
    #[error("outer variable `{0}` is bound more than once")]
    DuplicateBinding(String),
    #[error("subformula `{name}` declares parameter `{param}` twice")]
    DuplicateParameter { name: String, param: String },
}

// ============================================================================
// Entry points
// ============================================================================

pub fn parse_formula(text: &str) -> Result<FormulaDecl, FormulaParseError> {
    let decl = finish(
        text,
        all_consuming(terminated(formula, multispace0))(text),
        "`<body> || <var> in <domain>, ...`",
    )?;
    for (i, b) in decl.bindings.iter().enumerate() {
        if decl.bindings[..i].iter().any(|prev| prev.var == b.var) {
            return Err(FormulaParseError::DuplicateBinding(b.var.clone()));
        }
    }
    Ok(decl)
}

pub fn parse_body(text: &str) -> Result<Expr, FormulaParseError> {
    finish(
        text,
        all_consuming(terminated(body, multispace0))(text),
        "a boolean expression",
    )
}

pub fn parse_subformula(text: &str) -> Result<SubformulaDecl, FormulaParseError> {
    let decl = finish(
        text,
        all_consuming(terminated(subformula, multispace0))(text),
        "`<name>(<param>, ...) := <body>`",
    )?;
    for (i, p) in decl.params.iter().enumerate() {
        if decl.params[..i].contains(p) {
            return Err(FormulaParseError::DuplicateParameter {
                name: decl.name.clone(),
                param: p.clone(),
            });
        }
    }
    Ok(decl)
}

fn finish<T>(
    text: &str,
    result: IResult<&str, T>,
    expected: &'static str,
) -> Result<T, FormulaParseError> {
    match result {
        Ok((_, value)) => Ok(value),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            let offset = text.len() - e.input.len();
            Err(FormulaParseError::Syntax {
                offset,
                near: e.input.chars().take(24).collect(),
                expected,
            })
        }
        Err(nom::Err::Incomplete(_)) => Err(FormulaParseError::Syntax {
            offset: text.len(),
            near: String::new(),
            expected,
        }),
    }
}

// ============================================================================
// Lexical helpers
// ============================================================================

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn ident(input: &str) -> IResult<&str, &str> {
    recognize(pair(take_while1(is_ident_start), take_while(is_ident_continue)))(input)
}

fn keyword<'a>(kw: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    terminated(tag(kw), not(take_while1(is_ident_continue)))
}

fn ws<'a, O>(
    inner: impl FnMut(&'a str) -> IResult<&'a str, O>,
) -> impl FnMut(&'a str) -> IResult<&'a str, O> {
    preceded(multispace0, inner)
}

fn reject<T>(input: &str, kind: ErrorKind) -> IResult<&str, T> {
    Err(nom::Err::Error(NomError::new(input, kind)))
}

// ============================================================================
// Terms
// ============================================================================

fn term(input: &str) -> IResult<&str, Term> {
    ws(alt((string_lit, number_lit, call_or_var)))(input)
}

fn string_lit(input: &str) -> IResult<&str, Term> {
    map(
        delimited(pchar('"'), take_while(|c| c != '"'), pchar('"')),
        |s: &str| Term::Str(s.to_string()),
    )(input)
}

fn number_lit(input: &str) -> IResult<&str, Term> {
    let (rest, text) = recognize(tuple((
        opt(pchar('-')),
        digit1,
        opt(pair(pchar('.'), digit1)),
    )))(input)?;
    if text.contains('.') {
        match text.parse::<f64>() {
            Ok(v) => Ok((rest, Term::Float(v))),
            Err(_) => Err(nom::Err::Failure(NomError::new(input, ErrorKind::Float))),
        }
    } else {
        match text.parse::<i64>() {
            Ok(v) => Ok((rest, Term::Int(v))),
            Err(_) => Err(nom::Err::Failure(NomError::new(input, ErrorKind::Digit))),
        }
    }
}

fn call_or_var(input: &str) -> IResult<&str, Term> {
    let (input, name) = ident(input)?;
    let (input, args) = opt(delimited(
        ws(pchar('(')),
        separated_list0(ws(pchar(',')), term),
        ws(pchar(')')),
    ))(input)?;
    let term = match (name, args) {
        (_, Some(args)) => Term::Call {
            name: name.to_string(),
            args,
        },
        ("true", None) => Term::Bool(true),
        ("false", None) => Term::Bool(false),
        (_, None) => Term::Var(name.to_string()),
    };
    Ok((input, term))
}

// ============================================================================
// Bodies
// ============================================================================

fn body(input: &str) -> IResult<&str, Expr> {
    let (mut input, mut lhs) = implies(input)?;
    loop {
        let Ok((rest, _)) = ws(tag::<&str, &str, NomError<&str>>("<->"))(input) else {
            return Ok((input, lhs));
        };
        let (rest, rhs) = implies(rest)?;
        lhs = connective(Connective::Iff, lhs, rhs);
        input = rest;
    }
}

fn implies(input: &str) -> IResult<&str, Expr> {
    let (input, lhs) = disjunction(input)?;
    match ws(tag::<&str, &str, NomError<&str>>("->"))(input) {
        Ok((rest, _)) => {
            let (rest, rhs) = implies(rest)?;
            Ok((rest, connective(Connective::Implies, lhs, rhs)))
        }
        Err(_) => Ok((input, lhs)),
    }
}

fn disjunction(input: &str) -> IResult<&str, Expr> {
    let (mut input, mut lhs) = conjunction(input)?;
    loop {
        let Ok((rest, _)) = ws(terminated(
            pchar::<&str, NomError<&str>>('|'),
            not(pchar('|')),
        ))(input) else {
            return Ok((input, lhs));
        };
        let (rest, rhs) = conjunction(rest)?;
        lhs = connective(Connective::Or, lhs, rhs);
        input = rest;
    }
}

fn conjunction(input: &str) -> IResult<&str, Expr> {
    let (mut input, mut lhs) = unary(input)?;
    loop {
        let Ok((rest, _)) = ws(pchar::<&str, NomError<&str>>('&'))(input) else {
            return Ok((input, lhs));
        };
        let (rest, rhs) = unary(rest)?;
        lhs = connective(Connective::And, lhs, rhs);
        input = rest;
    }
}

fn connective(op: Connective, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Connective {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

fn unary(input: &str) -> IResult<&str, Expr> {
    ws(alt((negation, quantifier, atom)))(input)
}

fn negation(input: &str) -> IResult<&str, Expr> {
    let (input, _) = terminated(pchar('!'), not(pchar('=')))(input)?;
    let (input, inner) = unary(input)?;
    Ok((input, Expr::Not(Box::new(inner))))
}

fn quantifier(input: &str) -> IResult<&str, Expr> {
    let (input, quantifier) = alt((
        map(terminated(tag("A"), multispace1), |_| Quantifier::ForAll),
        map(terminated(tag("E"), multispace1), |_| Quantifier::Exists),
    ))(input)?;
    let (input, var) = ws(ident)(input)?;
    let (input, _) = preceded(multispace1, keyword("in"))(input)?;
    let (input, range) = term(input)?;
    let (input, _) = ws(pchar('.'))(input)?;
    let (input, body) = body(input)?;

    let domain = match range {
        Term::Var(name) => match Domain::from_keyword(&name) {
            Some(d) => DomainExpr::Named(d),
            None => DomainExpr::Term(Term::Var(name)),
        },
        other => DomainExpr::Term(other),
    };
    Ok((
        input,
        Expr::Quantifier {
            quantifier,
            var: var.to_string(),
            domain,
            body: Box::new(body),
        },
    ))
}

fn atom(input: &str) -> IResult<&str, Expr> {
    alt((parenthesized, comparison, predicate))(input)
}

fn parenthesized(input: &str) -> IResult<&str, Expr> {
    delimited(pchar('('), body, ws(pchar(')')))(input)
}

fn cmp_op(input: &str) -> IResult<&str, CmpOp> {
    alt((
        map(tag("!="), |_| CmpOp::Ne),
        map(tag("<="), |_| CmpOp::Le),
        map(tag(">="), |_| CmpOp::Ge),
        map(terminated(tag("<"), not(pchar('-'))), |_| CmpOp::Lt),
        map(tag(">"), |_| CmpOp::Gt),
        map(tag("="), |_| CmpOp::Eq),
    ))(input)
}

fn comparison(input: &str) -> IResult<&str, Expr> {
    let (input, lhs) = term(input)?;
    let (input, op) = ws(cmp_op)(input)?;
    let (input, rhs) = term(input)?;
    Ok((input, Expr::Compare { op, lhs, rhs }))
}

fn predicate(input: &str) -> IResult<&str, Expr> {
    let (rest, t) = term(input)?;
    match t {
        Term::Call { name, args } => Ok((rest, Expr::Predicate { name, args })),
        Term::Bool(b) => Ok((rest, Expr::Literal(b))),
        _ => reject(input, ErrorKind::Verify),
    }
}

// ============================================================================
// Declarations
// ============================================================================

fn binding(input: &str) -> IResult<&str, Binding> {
    let (input, var) = ws(ident)(input)?;
    let (input, _) = preceded(multispace1, keyword("in"))(input)?;
    let (rest, dom) = ws(ident)(input)?;
    match Domain::from_keyword(dom) {
        Some(domain) => Ok((
            rest,
            Binding {
                var: var.to_string(),
                domain,
            },
        )),
        None => reject(input, ErrorKind::Tag),
    }
}

fn formula(input: &str) -> IResult<&str, FormulaDecl> {
    let (input, body) = body(input)?;
    let (input, _) = ws(tag("||"))(input)?;
    let (input, bindings) = separated_list1(ws(pchar(',')), binding)(input)?;
    Ok((input, FormulaDecl { body, bindings }))
}

fn subformula(input: &str) -> IResult<&str, SubformulaDecl> {
    let (input, name) = ws(ident)(input)?;
    let (input, params) = delimited(
        ws(pchar('(')),
        separated_list1(ws(pchar(',')), ws(ident)),
        ws(pchar(')')),
    )(input)?;
    let (input, _) = ws(tag(":="))(input)?;
    let (input, body) = body(input)?;
    Ok((
        input,
        SubformulaDecl {
            name: name.to_string(),
            params: params.into_iter().map(str::to_string).collect(),
            body,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str) -> Term {
        Term::Var(name.to_string())
    }

    fn call(name: &str, args: Vec<Term>) -> Term {
        Term::Call {
            name: name.to_string(),
            args,
        }
    }

    #[test]
    fn parses_existence_rule_with_term_domain() {
        let decl = parse_formula("A r in traffic_signs(l). traffic_sign_exists(r) || l in L")
            .expect("parse");
        assert_eq!(
            decl.bindings,
            vec![Binding {
                var: "l".to_string(),
                domain: Domain::Lanelets
            }]
        );
        assert_eq!(
            decl.body,
            Expr::Quantifier {
                quantifier: Quantifier::ForAll,
                var: "r".to_string(),
                domain: DomainExpr::Term(call("traffic_signs", vec![var("l")])),
                body: Box::new(Expr::Predicate {
                    name: "traffic_sign_exists".to_string(),
                    args: vec![var("r")],
                }),
            }
        );
    }

    #[test]
    fn single_bar_is_disjunction_double_bar_is_binding_separator() {
        let decl = parse_formula("p(x) | q(x) || x in M").expect("parse");
        assert!(matches!(
            decl.body,
            Expr::Connective {
                op: Connective::Or,
                ..
            }
        ));
        assert_eq!(decl.bindings[0].domain, Domain::All);
    }

    #[test]
    fn implication_is_right_associative() {
        let e = parse_body("a(x) -> b(x) -> c(x)").expect("parse");
        let Expr::Connective { op, rhs, .. } = e else {
            panic!("expected connective");
        };
        assert_eq!(op, Connective::Implies);
        assert!(matches!(
            *rhs,
            Expr::Connective {
                op: Connective::Implies,
                ..
            }
        ));
    }

    #[test]
    fn conjunction_binds_tighter_than_disjunction() {
        let e = parse_body("a(x) | b(x) & c(x)").expect("parse");
        let Expr::Connective { op, rhs, .. } = e else {
            panic!("expected connective");
        };
        assert_eq!(op, Connective::Or);
        assert!(matches!(
            *rhs,
            Expr::Connective {
                op: Connective::And,
                ..
            }
        ));
    }

    #[test]
    fn comparison_operators_do_not_swallow_iff() {
        let e = parse_body("p(x) <-> size(x) < 2").expect("parse");
        let Expr::Connective { op, rhs, .. } = e else {
            panic!("expected connective");
        };
        assert_eq!(op, Connective::Iff);
        assert_eq!(
            *rhs,
            Expr::Compare {
                op: CmpOp::Lt,
                lhs: call("size", vec![var("x")]),
                rhs: Term::Int(2),
            }
        );
    }

    #[test]
    fn negated_inequality_and_negation() {
        let e = parse_body("!x != y").expect("parse");
        assert_eq!(
            e,
            Expr::Not(Box::new(Expr::Compare {
                op: CmpOp::Ne,
                lhs: var("x"),
                rhs: var("y"),
            }))
        );
    }

    #[test]
    fn quantifier_body_extends_right() {
        let e = parse_body("p(a) & E y in L. q(y) | r(y)").expect("parse");
        let Expr::Connective { op, rhs, .. } = e else {
            panic!("expected connective");
        };
        assert_eq!(op, Connective::And);
        let Expr::Quantifier { body, .. } = *rhs else {
            panic!("expected quantifier");
        };
        assert!(matches!(
            *body,
            Expr::Connective {
                op: Connective::Or,
                ..
            }
        ));
    }

    #[test]
    fn literals() {
        let e = parse_body("at(xs, 0) = -1.5 & name(x) = \"green\" & true").expect("parse");
        let rendered = e.to_string();
        assert!(rendered.contains("-1.5"), "{rendered}");
        assert!(rendered.contains("\"green\""), "{rendered}");
    }

    #[test]
    fn parses_subformula() {
        let decl = parse_subformula("linked(a, b) := contains(successors(a), lanelet_id(b))")
            .expect("parse");
        assert_eq!(decl.name, "linked");
        assert_eq!(decl.params, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn rejects_unknown_domain_keyword() {
        let err = parse_formula("p(x) || x in Lanes").expect_err("should fail");
        assert!(matches!(err, FormulaParseError::Syntax { .. }), "{err}");
    }

    #[test]
    fn rejects_duplicate_binding() {
        let err = parse_formula("p(x) || x in L, x in TS").expect_err("should fail");
        assert_eq!(err, FormulaParseError::DuplicateBinding("x".to_string()));
    }

    #[test]
    fn rejects_missing_bindings() {
        assert!(parse_formula("p(x)").is_err());
        assert!(parse_formula("p(x) ||").is_err());
    }

    #[test]
    fn rejects_bare_variable_as_predicate() {
        assert!(parse_body("x & p(x)").is_err());
    }

    #[test]
    fn free_vars_exclude_quantified() {
        let e = parse_body("A k in L. contains(predecessors(l), lanelet_id(k))").expect("parse");
        assert_eq!(e.free_vars(), vec!["l".to_string()]);
    }
}
