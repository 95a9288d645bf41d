//! Formelsprache für Messwerte und Koordinaten von Parameterkurven.
//!
//! Unterstützt `+ - * / ^`, Klammern, die Konstanten `pi` und `e`, den Kurvenparameter `t`,
//! Funktionen (`sin`, `cos`, `tan`, `asin`, `acos`, `atan`, `sqrt`, `exp`, `ln`, `abs`)
//! und Variablen, die auf Namen anderer Messwert-Nodes verweisen (z.B. `M1`).
//! Ableitungen nach `t` werden symbolisch gebildet.

use anyhow::{anyhow, Context as _};
use std::fmt;
use winnow::{
    ascii::{digit0, digit1, multispace0},
    combinator::{alt, cut_err, delimited, eof, opt, preceded, repeat, terminated},
    error::{AddContext, ContextError, ErrMode, ModalResult},
    stream::{LocatingSlice, Location, Stream},
    token::{one_of, take_while},
    Parser as _,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Function {
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sqrt,
    Exp,
    Ln,
    Abs,
    /// Nur intern als Ableitung von `abs`
    Sign,
}

impl Function {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "sin" => Function::Sin,
            "cos" => Function::Cos,
            "tan" => Function::Tan,
            "asin" => Function::Asin,
            "acos" => Function::Acos,
            "atan" => Function::Atan,
            "sqrt" => Function::Sqrt,
            "exp" => Function::Exp,
            "ln" => Function::Ln,
            "abs" => Function::Abs,
            "sign" => Function::Sign,
            _ => return None,
        })
    }

    fn name(self) -> &'static str {
        match self {
            Function::Sin => "sin",
            Function::Cos => "cos",
            Function::Tan => "tan",
            Function::Asin => "asin",
            Function::Acos => "acos",
            Function::Atan => "atan",
            Function::Sqrt => "sqrt",
            Function::Exp => "exp",
            Function::Ln => "ln",
            Function::Abs => "abs",
            Function::Sign => "sign",
        }
    }

    fn apply(self, x: f64) -> f64 {
        match self {
            Function::Sin => x.sin(),
            Function::Cos => x.cos(),
            Function::Tan => x.tan(),
            Function::Asin => x.asin(),
            Function::Acos => x.acos(),
            Function::Atan => x.atan(),
            Function::Sqrt => x.sqrt(),
            Function::Exp => x.exp(),
            Function::Ln => x.ln(),
            Function::Abs => x.abs(),
            Function::Sign => {
                if x > 0.0 {
                    1.0
                } else if x < 0.0 {
                    -1.0
                } else {
                    0.0
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Number(f64),
    Parameter,
    Variable(String),
    Neg(Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Call(Function, Box<Expr>),
}

impl Expr {
    fn evaluate(&self, t: f64, lookup: &dyn Fn(&str) -> Option<f64>) -> anyhow::Result<f64> {
        Ok(match self {
            Expr::Number(value) => *value,
            Expr::Parameter => t,
            Expr::Variable(name) => {
                lookup(name).with_context(|| format!("Unbekannte Variable '{name}'"))?
            }
            Expr::Neg(inner) => -inner.evaluate(t, lookup)?,
            Expr::Binary(op, lhs, rhs) => {
                let a = lhs.evaluate(t, lookup)?;
                let b = rhs.evaluate(t, lookup)?;
                match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    BinaryOp::Mul => a * b,
                    BinaryOp::Div => a / b,
                    BinaryOp::Pow => a.powf(b),
                }
            }
            Expr::Call(function, arg) => function.apply(arg.evaluate(t, lookup)?),
        })
    }

    fn contains_parameter(&self) -> bool {
        match self {
            Expr::Number(_) | Expr::Variable(_) => false,
            Expr::Parameter => true,
            Expr::Neg(inner) | Expr::Call(_, inner) => inner.contains_parameter(),
            Expr::Binary(_, lhs, rhs) => lhs.contains_parameter() || rhs.contains_parameter(),
        }
    }

    fn collect_variables(&self, out: &mut Vec<String>) {
        match self {
            Expr::Variable(name) => out.push(name.clone()),
            Expr::Number(_) | Expr::Parameter => {}
            Expr::Neg(inner) | Expr::Call(_, inner) => inner.collect_variables(out),
            Expr::Binary(_, lhs, rhs) => {
                lhs.collect_variables(out);
                rhs.collect_variables(out);
            }
        }
    }

    fn is_number(&self, value: f64) -> bool {
        matches!(self, Expr::Number(v) if *v == value)
    }

    /// Symbolische Ableitung nach `t`.
    fn derivative(&self) -> Expr {
        match self {
            Expr::Number(_) | Expr::Variable(_) => Expr::Number(0.0),
            Expr::Parameter => Expr::Number(1.0),
            Expr::Neg(inner) => neg(inner.derivative()),
            Expr::Binary(op, u, v) => {
                let (u, v) = (u.as_ref(), v.as_ref());
                match op {
                    BinaryOp::Add => add(u.derivative(), v.derivative()),
                    BinaryOp::Sub => sub(u.derivative(), v.derivative()),
                    BinaryOp::Mul => add(
                        mul(u.derivative(), v.clone()),
                        mul(u.clone(), v.derivative()),
                    ),
                    BinaryOp::Div => div(
                        sub(
                            mul(u.derivative(), v.clone()),
                            mul(u.clone(), v.derivative()),
                        ),
                        pow(v.clone(), Expr::Number(2.0)),
                    ),
                    BinaryOp::Pow if !v.contains_parameter() => mul(
                        mul(v.clone(), pow(u.clone(), sub(v.clone(), Expr::Number(1.0)))),
                        u.derivative(),
                    ),
                    BinaryOp::Pow => mul(
                        self.clone(),
                        add(
                            mul(v.derivative(), call(Function::Ln, u.clone())),
                            div(mul(v.clone(), u.derivative()), u.clone()),
                        ),
                    ),
                }
            }
            Expr::Call(function, arg) => {
                let inner = arg.as_ref().clone();
                let outer = match function {
                    Function::Sin => call(Function::Cos, inner),
                    Function::Cos => neg(call(Function::Sin, inner)),
                    Function::Tan => div(
                        Expr::Number(1.0),
                        pow(call(Function::Cos, inner), Expr::Number(2.0)),
                    ),
                    Function::Asin => div(
                        Expr::Number(1.0),
                        call(
                            Function::Sqrt,
                            sub(Expr::Number(1.0), pow(inner, Expr::Number(2.0))),
                        ),
                    ),
                    Function::Acos => neg(div(
                        Expr::Number(1.0),
                        call(
                            Function::Sqrt,
                            sub(Expr::Number(1.0), pow(inner, Expr::Number(2.0))),
                        ),
                    )),
                    Function::Atan => div(
                        Expr::Number(1.0),
                        add(Expr::Number(1.0), pow(inner, Expr::Number(2.0))),
                    ),
                    Function::Sqrt => div(
                        Expr::Number(1.0),
                        mul(Expr::Number(2.0), call(Function::Sqrt, inner)),
                    ),
                    Function::Exp => call(Function::Exp, inner),
                    Function::Ln => div(Expr::Number(1.0), inner),
                    Function::Abs => call(Function::Sign, inner),
                    Function::Sign => Expr::Number(0.0),
                };
                mul(outer, arg.derivative())
            }
        }
    }
}

// ── Vereinfachende Konstruktoren (halten Ableitungen klein) ──────────

fn add(a: Expr, b: Expr) -> Expr {
    match (&a, &b) {
        (Expr::Number(x), Expr::Number(y)) => Expr::Number(x + y),
        _ if a.is_number(0.0) => b,
        _ if b.is_number(0.0) => a,
        _ => Expr::Binary(BinaryOp::Add, Box::new(a), Box::new(b)),
    }
}

fn sub(a: Expr, b: Expr) -> Expr {
    match (&a, &b) {
        (Expr::Number(x), Expr::Number(y)) => Expr::Number(x - y),
        _ if b.is_number(0.0) => a,
        _ if a.is_number(0.0) => neg(b),
        _ => Expr::Binary(BinaryOp::Sub, Box::new(a), Box::new(b)),
    }
}

fn mul(a: Expr, b: Expr) -> Expr {
    match (&a, &b) {
        (Expr::Number(x), Expr::Number(y)) => Expr::Number(x * y),
        _ if a.is_number(0.0) || b.is_number(0.0) => Expr::Number(0.0),
        _ if a.is_number(1.0) => b,
        _ if b.is_number(1.0) => a,
        _ => Expr::Binary(BinaryOp::Mul, Box::new(a), Box::new(b)),
    }
}

fn div(a: Expr, b: Expr) -> Expr {
    if a.is_number(0.0) {
        return Expr::Number(0.0);
    }
    if b.is_number(1.0) {
        return a;
    }
    Expr::Binary(BinaryOp::Div, Box::new(a), Box::new(b))
}

fn pow(a: Expr, b: Expr) -> Expr {
    if b.is_number(1.0) {
        return a;
    }
    if b.is_number(0.0) {
        return Expr::Number(1.0);
    }
    Expr::Binary(BinaryOp::Pow, Box::new(a), Box::new(b))
}

fn neg(a: Expr) -> Expr {
    match a {
        Expr::Number(x) => Expr::Number(-x),
        Expr::Neg(inner) => *inner,
        other => Expr::Neg(Box::new(other)),
    }
}

fn call(function: Function, arg: Expr) -> Expr {
    Expr::Call(function, Box::new(arg))
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(value) => write!(f, "{value}"),
            Expr::Parameter => write!(f, "t"),
            Expr::Variable(name) => write!(f, "{name}"),
            Expr::Neg(inner) => write!(f, "-({inner})"),
            Expr::Binary(op, lhs, rhs) => {
                let symbol = match op {
                    BinaryOp::Add => "+",
                    BinaryOp::Sub => "-",
                    BinaryOp::Mul => "*",
                    BinaryOp::Div => "/",
                    BinaryOp::Pow => "^",
                };
                write!(f, "({lhs} {symbol} {rhs})")
            }
            Expr::Call(function, arg) => write!(f, "{}({arg})", function.name()),
        }
    }
}

// ── Parser (winnow) ──────────────────────────────────────────────────

/// Kontext für Parserfehler
#[derive(Debug, Clone, PartialEq, Eq)]
enum Context {
    /// Was gerade geparst wird
    Label(&'static str),
    /// Aufruf einer nicht unterstützten Funktion
    UnknownFunction(String),
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Context::Label(label) => write!(f, "{label} erwartet"),
            Context::UnknownFunction(name) => write!(f, "unbekannte Funktion '{name}'"),
        }
    }
}

type Input<'a> = LocatingSlice<&'a str>;
type IResult<O> = ModalResult<O, ContextError<Context>>;

/// Optionale Leerzeichen
fn ws(input: &mut Input<'_>) -> IResult<()> {
    multispace0.void().parse_next(input)
}

/// Dezimalzahl mit optionalem Exponenten; `2e` bleibt `2` gefolgt von der Konstante `e`.
fn number(input: &mut Input<'_>) -> IResult<f64> {
    (
        alt((
            (digit1, opt(('.', digit0))).void(),
            ('.', digit1).void(),
        )),
        opt((one_of(['e', 'E']), opt(one_of(['+', '-'])), digit1)),
    )
        .take()
        .try_map(str::parse::<f64>)
        .context(Context::Label("Zahl"))
        .parse_next(input)
}

fn identifier<'a>(input: &mut Input<'a>) -> IResult<&'a str> {
    (
        one_of(|c: char| c.is_alphabetic() || c == '_'),
        take_while(0.., |c: char| c.is_alphanumeric() || c == '_'),
    )
        .take()
        .context(Context::Label("Name"))
        .parse_next(input)
}

fn named_value(name: &str) -> Expr {
    match name {
        "t" => Expr::Parameter,
        "pi" => Expr::Number(std::f64::consts::PI),
        "e" => Expr::Number(std::f64::consts::E),
        _ => Expr::Variable(name.to_string()),
    }
}

/// Name, optional gefolgt von einer Argumentklammer.
fn call_or_name(input: &mut Input<'_>) -> IResult<Expr> {
    let start = input.checkpoint();
    let name = identifier.parse_next(input)?;
    let argument = opt(preceded(
        (ws, '('),
        cut_err(terminated(expression, (ws, ')')))
            .context(Context::Label("schließende Klammer")),
    ))
    .parse_next(input)?;

    let Some(argument) = argument else {
        return Ok(named_value(name));
    };
    match Function::from_name(name) {
        Some(function) => Ok(call(function, argument)),
        None => Err(ErrMode::Cut(ContextError::new().add_context(
            input,
            &start,
            Context::UnknownFunction(name.to_string()),
        ))),
    }
}

fn primary(input: &mut Input<'_>) -> IResult<Expr> {
    preceded(
        ws,
        alt((
            number.map(Expr::Number),
            delimited(('(', ws), cut_err(expression), cut_err((ws, ')')))
                .context(Context::Label("Klammerausdruck")),
            call_or_name,
        )),
    )
    .context(Context::Label("Operand"))
    .parse_next(input)
}

/// Potenz ist rechtsassoziativ und bindet stärker als ein vorangestelltes Minus.
fn power(input: &mut Input<'_>) -> IResult<Expr> {
    let base = primary.parse_next(input)?;
    let exponent = opt(preceded((ws, '^'), cut_err(unary))).parse_next(input)?;
    Ok(match exponent {
        Some(exponent) => Expr::Binary(BinaryOp::Pow, Box::new(base), Box::new(exponent)),
        None => base,
    })
}

fn unary(input: &mut Input<'_>) -> IResult<Expr> {
    preceded(
        ws,
        alt((
            preceded('-', cut_err(unary)).map(|inner| Expr::Neg(Box::new(inner))),
            preceded('+', cut_err(unary)),
            power,
        )),
    )
    .parse_next(input)
}

fn fold_binary(first: Expr, rest: Vec<(BinaryOp, Expr)>) -> Expr {
    rest.into_iter()
        .fold(first, |lhs, (op, rhs)| Expr::Binary(op, Box::new(lhs), Box::new(rhs)))
}

fn term(input: &mut Input<'_>) -> IResult<Expr> {
    let first = unary.parse_next(input)?;
    let rest: Vec<(BinaryOp, Expr)> = repeat(
        0..,
        (
            preceded(
                ws,
                alt(('*'.value(BinaryOp::Mul), '/'.value(BinaryOp::Div))),
            ),
            cut_err(unary),
        ),
    )
    .parse_next(input)?;
    Ok(fold_binary(first, rest))
}

fn expression(input: &mut Input<'_>) -> IResult<Expr> {
    let first = term.parse_next(input)?;
    let rest: Vec<(BinaryOp, Expr)> = repeat(
        0..,
        (
            preceded(
                ws,
                alt(('+'.value(BinaryOp::Add), '-'.value(BinaryOp::Sub))),
            ),
            cut_err(term),
        ),
    )
    .parse_next(input)?;
    Ok(fold_binary(first, rest))
}

/// Vollständige Formel: nach dem Ausdruck darf nur noch Leerraum folgen.
fn formula(input: &mut Input<'_>) -> IResult<Expr> {
    terminated(
        expression,
        (ws, eof).context(Context::Label("Ende der Formel")),
    )
    .parse_next(input)
}

/// Wandelt einen winnow-Fehler in eine lesbare Meldung.
fn describe_error(err: ErrMode<ContextError<Context>>) -> String {
    let context_error = match err {
        ErrMode::Backtrack(ctx) | ErrMode::Cut(ctx) => ctx,
        ErrMode::Incomplete(_) => ContextError::new(),
    };
    let messages: Vec<String> = context_error.context().map(ToString::to_string).collect();
    if messages.is_empty() {
        "unerwartetes Zeichen".to_string()
    } else {
        messages.join(", ")
    }
}

/// Eine geparste Formel samt Quelltext.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    source: String,
    expr: Expr,
}

impl Formula {
    /// Parst eine Formel. Fehler enthalten die Quelle als Kontext.
    pub fn parse(source: &str) -> anyhow::Result<Self> {
        let mut input = LocatingSlice::new(source);
        let expr = formula.parse_next(&mut input).map_err(|err| {
            anyhow!(
                "Formel '{source}' ist ungültig: {} (Position {})",
                describe_error(err),
                input.current_token_start()
            )
        })?;
        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    /// Konstante Formel.
    pub fn constant(value: f64) -> Self {
        Self {
            source: value.to_string(),
            expr: Expr::Number(value),
        }
    }

    /// Ursprünglicher Quelltext.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Wertet die Formel für den Kurvenparameter `t` aus.
    ///
    /// `lookup` löst Variablennamen auf; unbekannte Namen liefern einen Fehler.
    pub fn evaluate(&self, t: f64, lookup: &dyn Fn(&str) -> Option<f64>) -> anyhow::Result<f64> {
        self.expr.evaluate(t, lookup)
    }

    /// Symbolische Ableitung nach `t`.
    pub fn derivative(&self) -> Formula {
        let expr = self.expr.derivative();
        Formula {
            source: expr.to_string(),
            expr,
        }
    }

    /// Alle referenzierten Variablennamen (sortiert, ohne Duplikate).
    pub fn variables(&self) -> Vec<String> {
        let mut names = Vec::new();
        self.expr.collect_variables(&mut names);
        names.sort();
        names.dedup();
        names
    }

    /// `true`, wenn die Formel vom Kurvenparameter `t` abhängt.
    pub fn depends_on_parameter(&self) -> bool {
        self.expr.contains_parameter()
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn no_vars(_: &str) -> Option<f64> {
        None
    }

    fn eval(source: &str, t: f64) -> f64 {
        Formula::parse(source)
            .expect("Formel gültig")
            .evaluate(t, &no_vars)
            .expect("auswertbar")
    }

    #[test]
    fn operator_precedence() {
        assert_abs_diff_eq!(eval("2+3*4^2", 0.0), 50.0);
        assert_abs_diff_eq!(eval("-2^2", 0.0), -4.0);
        assert_abs_diff_eq!(eval("2^3^2", 0.0), 512.0);
        assert_abs_diff_eq!(eval("(1 - 3) / 4", 0.0), -0.5);
        assert_abs_diff_eq!(eval("2^-1", 0.0), 0.5);
    }

    #[test]
    fn constants_functions_and_parameter() {
        assert_abs_diff_eq!(eval("sin(t)^2 + cos(t)^2", 0.7), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(eval("cos(pi)", 0.0), -1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(eval("ln(e)", 0.0), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(eval("1.5e2 + t", 1.0), 151.0);
        assert_abs_diff_eq!(eval("2*e", 0.0), 2.0 * std::f64::consts::E);
    }

    #[test]
    fn variables_resolve_through_lookup() {
        let formula = Formula::parse("M1 * 2 + M2").expect("gültig");
        assert_eq!(formula.variables(), vec!["M1".to_string(), "M2".to_string()]);

        let lookup = |name: &str| match name {
            "M1" => Some(3.0),
            "M2" => Some(0.5),
            _ => None,
        };
        assert_abs_diff_eq!(formula.evaluate(0.0, &lookup).expect("auswertbar"), 6.5);
    }

    #[test]
    fn unknown_variable_is_an_error() {
        let formula = Formula::parse("M7 + 1").expect("gültig");
        assert!(formula.evaluate(0.0, &no_vars).is_err());
    }

    #[test]
    fn syntax_errors_are_reported() {
        for source in ["", "sin(", "3 +", "foo(2)", "2 $ 3", "(1", "1 2"] {
            assert!(Formula::parse(source).is_err(), "'{source}' muss scheitern");
        }
    }

    #[test]
    fn error_message_names_unknown_function() {
        let message = format!("{:#}", Formula::parse("2 * foo(t)").unwrap_err());
        assert!(message.contains("unbekannte Funktion 'foo'"), "{message}");
    }

    #[test]
    fn whitespace_and_exponent_edge_cases() {
        assert_abs_diff_eq!(eval("  sin ( t )  *  2 ", 0.0), 0.0);
        assert_abs_diff_eq!(eval(".5 + 1.", 0.0), 1.5);
        assert_abs_diff_eq!(eval("2E-1", 0.0), 0.2);
        // `2e` ohne Exponentenziffern ist Zahl gefolgt von Konstante, also ungültig
        assert!(Formula::parse("2e").is_err());
    }

    #[test]
    fn printed_derivative_parses_again() {
        let formula = Formula::parse("t^-2 - sin(M1 * t) / (1 + t)").expect("gültig");
        let derivative = formula.derivative();
        let reparsed = Formula::parse(derivative.source()).expect("Ableitung parsebar");
        let lookup = |_: &str| Some(0.7);
        assert_abs_diff_eq!(
            reparsed.evaluate(1.3, &lookup).unwrap(),
            derivative.evaluate(1.3, &lookup).unwrap(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn derivative_matches_central_difference() {
        let sources = [
            "sin(t)*cos(2*t)",
            "t^3 - 2*t",
            "exp(t/3) / (1 + t^2)",
            "sqrt(1 + t^2)",
            "atan(t) + ln(2 + sin(t))",
            "2^t",
            "abs(t - 0.2)",
        ];
        let h = 1e-6;
        for source in sources {
            let formula = Formula::parse(source).expect("gültig");
            let derivative = formula.derivative();
            for &t in &[0.3, 0.9, 1.7] {
                let numeric = (formula.evaluate(t + h, &no_vars).unwrap()
                    - formula.evaluate(t - h, &no_vars).unwrap())
                    / (2.0 * h);
                let symbolic = derivative.evaluate(t, &no_vars).unwrap();
                assert_abs_diff_eq!(symbolic, numeric, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn derivative_of_parameter_free_formula_is_zero() {
        let formula = Formula::parse("M1 * 3 + 4").expect("gültig");
        assert!(!formula.depends_on_parameter());
        let derivative = formula.derivative();
        assert_eq!(derivative.evaluate(1.0, &no_vars).unwrap(), 0.0);
    }
}
