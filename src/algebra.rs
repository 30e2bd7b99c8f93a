//! # Algebraic expressions on analytical features
//!
//! [`Track::eval`] evaluates statements such as `"v = 3.6 * D{s} / D{t}"` on the AF
//! columns of a track.
//!
//! ## Grammar
//!
//! | Element           | Syntax                                   | Meaning                                   |
//! |-------------------|------------------------------------------|-------------------------------------------|
//! | operand           | AF name, virtual column, number          | `x, y, z, t, idx, speed, 3.6, 1e-3`       |
//! | arithmetic        | `+ - * / % ^` (`**` = `^`)               | elementwise, `NaN` on division by zero    |
//! | comparison        | `< >`                                    | `1` / `0` indicator columns               |
//! | shift             | `a >> k`, `a << k`                       | rigid shift by `k` samples                |
//! | convolution       | `a ! b`, `a .* b`                        | centered FFT convolution                  |
//! | function call     | `NAME(arg)` or `NAME{arg}`               | unary operators, reducers, binary ops     |
//! | derivative        | `a'`, `a''`                              | `D{a} / D{t}`, applied once per quote     |
//! | assignment        | `A = expr`, `A op= expr`                 | create or update AF `A`, right-to-left    |
//!
//! Precedence, from the tightest: `'`, unary minus, `^` (right-associative),
//! `* / % ! .*`, `+ -`, `< > << >>`, assignment.
//!
//! A scalar operand broadcasts against a column; reducers (`AVG`, `MAX`, ...) return
//! scalars. `s` stands for the curvilinear abscissa when the track has no AF named `s`.
//!
//! ## Evaluation
//!
//! The infix token stream is converted to RPN by the shunting-yard algorithm. The RPN
//! stack is then walked, every intermediate column being stored on the track as a
//! temporary AF `#k`; temporaries are removed before returning, even on error.
use log::debug;

use crate::constants::is_reserved;
use crate::operator::{BinaryOperator, BinaryReducer, ScalarOperator, UnaryOperator, UnaryReducer};
use crate::track::Track;
use crate::track_errors::TrackError;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Op {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Lt,
    Gt,
    ShiftRight,
    ShiftLeft,
    Conv,
    Neg,
}

impl Op {
    fn precedence(&self) -> u8 {
        match self {
            Op::Lt | Op::Gt | Op::ShiftLeft | Op::ShiftRight => 1,
            Op::Add | Op::Sub => 2,
            Op::Mul | Op::Div | Op::Mod | Op::Conv => 3,
            Op::Pow => 4,
            Op::Neg => 5,
        }
    }

    fn right_associative(&self) -> bool {
        matches!(self, Op::Pow | Op::Neg)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Ident(String),
    Op(Op),
    Open,
    Close,
    Comma,
    Prime,
    /// `=` or a compound `op=`
    Assign(Option<Op>),
}

#[derive(Debug, Clone, PartialEq)]
enum Rpn {
    Num(f64),
    Var(String),
    Op(Op),
    Call(String, usize),
    Prime,
}

fn parse_error(expr: &str, msg: impl std::fmt::Display) -> TrackError {
    TrackError::ParseError(format!("{msg} in expression {expr:?}"))
}

fn tokenize(expr: &str) -> Result<Vec<Token>, TrackError> {
    let chars: Vec<char> = expr.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    let next_is = |i: usize, c: char| chars.get(i + 1) == Some(&c);

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if c.is_ascii_digit() || (c == '.' && chars.get(i + 1).is_some_and(char::is_ascii_digit)) {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                let mut j = i + 1;
                if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                    j += 1;
                }
                if j < chars.len() && chars[j].is_ascii_digit() {
                    i = j;
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                }
            }
            let literal: String = chars[start..i].iter().collect();
            let value = literal
                .parse::<f64>()
                .map_err(|_| parse_error(expr, format!("bad number {literal:?}")))?;
            tokens.push(Token::Num(value));
            continue;
        }
        if c.is_alphabetic() || c == '_' || c == '@' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '@') {
                i += 1;
            }
            tokens.push(Token::Ident(chars[start..i].iter().collect()));
            continue;
        }

        let (token, width) = match c {
            '(' | '{' => (Token::Open, 1),
            ')' | '}' => (Token::Close, 1),
            ',' => (Token::Comma, 1),
            '\'' => (Token::Prime, 1),
            '=' if next_is(i, '=') => return Err(parse_error(expr, "'==' is not an operator")),
            '=' => (Token::Assign(None), 1),
            '*' if next_is(i, '*') => {
                if chars.get(i + 2) == Some(&'=') {
                    (Token::Assign(Some(Op::Pow)), 3)
                } else {
                    (Token::Op(Op::Pow), 2)
                }
            }
            '.' if next_is(i, '*') => (Token::Op(Op::Conv), 2),
            '<' if next_is(i, '<') => (Token::Op(Op::ShiftLeft), 2),
            '>' if next_is(i, '>') => (Token::Op(Op::ShiftRight), 2),
            _ => {
                let op = match c {
                    '+' => Op::Add,
                    '-' => Op::Sub,
                    '*' => Op::Mul,
                    '/' => Op::Div,
                    '%' => Op::Mod,
                    '^' => Op::Pow,
                    '!' => Op::Conv,
                    '<' => Op::Lt,
                    '>' => Op::Gt,
                    _ => return Err(parse_error(expr, format!("unexpected character {c:?}"))),
                };
                if next_is(i, '=') && !matches!(op, Op::Lt | Op::Gt) {
                    (Token::Assign(Some(op)), 2)
                } else {
                    (Token::Op(op), 1)
                }
            }
        };
        tokens.push(token);
        i += width;
    }
    Ok(tokens)
}

enum Pending {
    Op(Op),
    Open,
    /// Function name and number of arguments seen so far
    Func(String, usize),
}

/// Shunting-yard conversion of an assignment-free token stream.
fn to_rpn(expr: &str, tokens: &[Token]) -> Result<Vec<Rpn>, TrackError> {
    let mut output = Vec::new();
    let mut stack: Vec<Pending> = Vec::new();
    let mut expect_operand = true;
    let mut i = 0;

    while i < tokens.len() {
        match &tokens[i] {
            Token::Num(v) => {
                if !expect_operand {
                    return Err(parse_error(expr, "missing operator"));
                }
                output.push(Rpn::Num(*v));
                expect_operand = false;
            }
            Token::Ident(name) => {
                if !expect_operand {
                    return Err(parse_error(expr, "missing operator"));
                }
                if tokens.get(i + 1) == Some(&Token::Open) {
                    stack.push(Pending::Func(name.clone(), 1));
                    stack.push(Pending::Open);
                    i += 1;
                } else {
                    output.push(Rpn::Var(name.clone()));
                    expect_operand = false;
                }
            }
            Token::Open => {
                if !expect_operand {
                    return Err(parse_error(expr, "missing operator"));
                }
                stack.push(Pending::Open);
            }
            Token::Comma => {
                loop {
                    match stack.pop() {
                        Some(Pending::Op(op)) => output.push(Rpn::Op(op)),
                        Some(Pending::Open) => break,
                        _ => return Err(parse_error(expr, "misplaced ','")),
                    }
                }
                match stack.last_mut() {
                    Some(Pending::Func(_, n)) => *n += 1,
                    _ => return Err(parse_error(expr, "',' outside a function call")),
                }
                stack.push(Pending::Open);
                expect_operand = true;
            }
            Token::Close => {
                if expect_operand {
                    return Err(parse_error(expr, "missing operand before ')'"));
                }
                loop {
                    match stack.pop() {
                        Some(Pending::Op(op)) => output.push(Rpn::Op(op)),
                        Some(Pending::Open) => break,
                        _ => return Err(parse_error(expr, "unbalanced ')'")),
                    }
                }
                if matches!(stack.last(), Some(Pending::Func(..))) {
                    if let Some(Pending::Func(name, n)) = stack.pop() {
                        output.push(Rpn::Call(name, n));
                    }
                }
            }
            Token::Prime => {
                if expect_operand {
                    return Err(parse_error(expr, "derivative quote without operand"));
                }
                output.push(Rpn::Prime);
            }
            Token::Op(op) => {
                let op = match (op, expect_operand) {
                    (Op::Sub, true) => Op::Neg,
                    (Op::Add, true) => {
                        i += 1;
                        continue;
                    }
                    (_, true) => return Err(parse_error(expr, format!("missing operand before {op:?}"))),
                    (op, false) => *op,
                };
                if op != Op::Neg {
                    while let Some(Pending::Op(top)) = stack.last() {
                        let p = top.precedence();
                        if p > op.precedence() || (p == op.precedence() && !op.right_associative()) {
                            output.push(Rpn::Op(*top));
                            stack.pop();
                        } else {
                            break;
                        }
                    }
                }
                stack.push(Pending::Op(op));
                expect_operand = true;
            }
            Token::Assign(_) => return Err(parse_error(expr, "misplaced assignment")),
        }
        i += 1;
    }
    if expect_operand {
        return Err(parse_error(expr, "incomplete expression"));
    }
    while let Some(p) = stack.pop() {
        match p {
            Pending::Op(op) => output.push(Rpn::Op(op)),
            _ => return Err(parse_error(expr, "unbalanced '('")),
        }
    }
    Ok(output)
}

#[derive(Debug, Clone, PartialEq)]
enum Operand {
    /// An AF of the track, stored, virtual or temporary
    Feature(String),
    Scalar(f64),
}

fn scalar_operator(op: Op, reflected: bool) -> Option<ScalarOperator> {
    use ScalarOperator::*;
    Some(match (op, reflected) {
        (Op::Add, false) => Add,
        (Op::Sub, false) => Subtract,
        (Op::Mul | Op::Conv, false) => Multiply,
        (Op::Div, false) => Divide,
        (Op::Pow, false) => Power,
        (Op::Mod, false) => Modulo,
        (Op::Lt, false) => Below,
        (Op::Gt, false) => Above,
        (Op::Add, true) => RAdd,
        (Op::Sub, true) => RSubtract,
        (Op::Mul | Op::Conv, true) => RMultiply,
        (Op::Div, true) => RDivide,
        (Op::Pow, true) => RPower,
        (Op::Mod, true) => RModulo,
        (Op::Lt, true) => RBelow,
        (Op::Gt, true) => RAbove,
        _ => return None,
    })
}

fn binary_operator(op: Op) -> Option<BinaryOperator> {
    use BinaryOperator::*;
    Some(match op {
        Op::Add => Addition,
        Op::Sub => Subtraction,
        Op::Mul => Multiplication,
        Op::Div => Division,
        Op::Pow => Power,
        Op::Mod => Modulo,
        Op::Lt => Below,
        Op::Gt => Above,
        Op::Conv => Convolution,
        _ => return None,
    })
}

fn binary_reducer(name: &str) -> Option<BinaryReducer> {
    use BinaryReducer::*;
    Some(match name.to_ascii_lowercase().as_str() {
        "cov" | "covariance" => Covariance,
        "correlation" => Correlation,
        "l0" => L0Diff,
        "l1" => L1Diff,
        "l2" => L2Diff,
        "linf" => LInfDiff,
        "equals" => Equal,
        _ => return None,
    })
}

struct Evaluator<'t> {
    expr: &'t str,
    track: &'t mut Track,
    temporaries: Vec<String>,
    counter: usize,
}

impl Evaluator<'_> {
    fn temporary(&mut self, column: Vec<f64>) -> Result<Operand, TrackError> {
        let mut name = format!("#{}", self.counter);
        while self.track.has_analytical_feature(&name) {
            self.counter += 1;
            name = format!("#{}", self.counter);
        }
        self.counter += 1;
        self.track.create_analytical_feature(&name, column)?;
        self.temporaries.push(name.clone());
        Ok(Operand::Feature(name))
    }

    fn column(&self, operand: &Operand) -> Result<Vec<f64>, TrackError> {
        match operand {
            Operand::Feature(name) => self.track.get_analytical_feature(name),
            Operand::Scalar(s) => Ok(vec![*s; self.track.size()]),
        }
    }

    fn variable(&mut self, name: &str) -> Result<Operand, TrackError> {
        if is_reserved(name) || self.track.has_analytical_feature(name) {
            return Ok(Operand::Feature(name.to_string()));
        }
        if name == "s" {
            let s = self.track.abs_curv_column()?;
            return self.temporary(s);
        }
        Err(TrackError::UnknownFeature(name.to_string()))
    }

    fn binary(&mut self, op: Op, a: Operand, b: Operand) -> Result<Operand, TrackError> {
        if matches!(op, Op::ShiftLeft | Op::ShiftRight) {
            let Operand::Scalar(k) = b else {
                return Err(parse_error(self.expr, "shift amount must be a scalar"));
            };
            let k = if op == Op::ShiftLeft { -k } else { k };
            return match a {
                Operand::Scalar(_) => Ok(a),
                Operand::Feature(_) => {
                    let shifted = ScalarOperator::Shift.apply(&self.column(&a)?, k);
                    self.temporary(shifted)
                }
            };
        }
        match (&a, &b) {
            (Operand::Scalar(x), Operand::Scalar(y)) => {
                let sop = scalar_operator(op, false)
                    .ok_or_else(|| parse_error(self.expr, format!("bad operator {op:?}")))?;
                Ok(Operand::Scalar(sop.apply(&[*x], *y)[0]))
            }
            (Operand::Feature(_), Operand::Scalar(s)) | (Operand::Scalar(s), Operand::Feature(_)) => {
                let reflected = matches!(a, Operand::Scalar(_));
                let column = if reflected { self.column(&b)? } else { self.column(&a)? };
                let sop = scalar_operator(op, reflected)
                    .ok_or_else(|| parse_error(self.expr, format!("bad operator {op:?}")))?;
                let out = sop.apply(&column, *s);
                self.temporary(out)
            }
            (Operand::Feature(_), Operand::Feature(_)) => {
                let bop = binary_operator(op)
                    .ok_or_else(|| parse_error(self.expr, format!("bad operator {op:?}")))?;
                let out = bop.apply(&self.column(&a)?, &self.column(&b)?)?;
                self.temporary(out)
            }
        }
    }

    fn derivative(&mut self, a: Operand) -> Result<Operand, TrackError> {
        let dx = UnaryOperator::Differentiator.apply(&self.column(&a)?);
        let dt = UnaryOperator::Differentiator.apply(&self.track.get_t());
        let out = BinaryOperator::Division.apply(&dx, &dt)?;
        self.temporary(out)
    }

    fn call(&mut self, name: &str, mut args: Vec<Operand>) -> Result<Operand, TrackError> {
        match args.len() {
            1 => {
                let column = self.column(&args[0])?;
                if let Some(op) = UnaryOperator::from_name(name) {
                    return self.temporary(op.apply(&column));
                }
                if let Some(r) = UnaryReducer::from_name(name) {
                    return Ok(Operand::Scalar(r.reduce(&column)));
                }
            }
            2 => {
                let lower = name.to_ascii_lowercase();
                if lower == "shift" || lower == "shift_circular" {
                    let (Some(Operand::Scalar(k)), Some(x)) = (args.pop(), args.pop()) else {
                        return Err(parse_error(self.expr, format!("{name} needs a scalar shift")));
                    };
                    let k = k.round() as isize;
                    let op = if lower == "shift" {
                        UnaryOperator::Shift(k)
                    } else {
                        UnaryOperator::ShiftCircular(k)
                    };
                    let out = op.apply(&self.column(&x)?);
                    return self.temporary(out);
                }
                let (x, y) = (self.column(&args[0])?, self.column(&args[1])?);
                if let Some(op) = BinaryOperator::from_name(name) {
                    let out = op.apply(&x, &y)?;
                    return self.temporary(out);
                }
                if let Some(r) = binary_reducer(name) {
                    return Ok(Operand::Scalar(r.reduce(&x, &y)?));
                }
            }
            _ => {}
        }
        Err(TrackError::UnknownFunction(format!("{name}/{}", args.len())))
    }

    fn run(&mut self, rpn: &[Rpn]) -> Result<Vec<f64>, TrackError> {
        let mut stack: Vec<Operand> = Vec::new();
        let expr = self.expr;
        let underflow = move || parse_error(expr, "operand stack underflow");
        for item in rpn {
            let value = match item {
                Rpn::Num(v) => Operand::Scalar(*v),
                Rpn::Var(name) => self.variable(name)?,
                Rpn::Op(Op::Neg) => match stack.pop().ok_or_else(underflow)? {
                    Operand::Scalar(s) => Operand::Scalar(-s),
                    a => {
                        let out = UnaryOperator::Inverter.apply(&self.column(&a)?);
                        self.temporary(out)?
                    }
                },
                Rpn::Op(op) => {
                    let b = stack.pop().ok_or_else(underflow)?;
                    let a = stack.pop().ok_or_else(underflow)?;
                    self.binary(*op, a, b)?
                }
                Rpn::Prime => {
                    let a = stack.pop().ok_or_else(underflow)?;
                    self.derivative(a)?
                }
                Rpn::Call(name, n) => {
                    if stack.len() < *n {
                        return Err(underflow());
                    }
                    let args = stack.split_off(stack.len() - n);
                    self.call(name, args)?
                }
            };
            stack.push(value);
        }
        match (stack.pop(), stack.is_empty()) {
            (Some(result), true) => self.column(&result),
            _ => Err(parse_error(self.expr, "dangling operands")),
        }
    }

    fn cleanup(&mut self) {
        for name in std::mem::take(&mut self.temporaries) {
            if let Err(e) = self.track.remove_analytical_feature(&name) {
                debug!("temporary {name} already gone: {e}");
            }
        }
    }
}

/// Compile an assignment-free expression to RPN.
fn compile(expr: &str, tokens: &[Token]) -> Result<Vec<Rpn>, TrackError> {
    if tokens.is_empty() {
        return Err(parse_error(expr, "empty expression"));
    }
    to_rpn(expr, tokens)
}

impl Track {
    /// Evaluate an algebraic statement.
    ///
    /// Arguments
    /// ---------
    /// * `expr` – a pure expression (`"a + 2*b"`) or one or more assignments
    ///   (`"c = a + b"`, `"c += 1"`, `"p = q = x'"`).
    ///
    /// Return
    /// ------
    /// * the value of the expression, one value per observation; for an assignment
    ///   chain, the value stored in the leftmost target.
    ///
    /// Errors
    /// ------
    /// * [`TrackError::ParseError`] on a malformed expression,
    /// * [`TrackError::UnknownFeature`] / [`TrackError::UnknownFunction`] on unknown names,
    /// * [`TrackError::ReservedFeature`] when assigning to a virtual column.
    pub fn eval(&mut self, expr: &str) -> Result<Vec<f64>, TrackError> {
        let tokens = tokenize(expr)?;

        // leading `NAME =` / `NAME op=` pairs
        let mut targets: Vec<(String, Option<Op>)> = Vec::new();
        let mut start = 0;
        while let (Some(Token::Ident(name)), Some(Token::Assign(op))) =
            (tokens.get(start), tokens.get(start + 1))
        {
            targets.push((name.clone(), *op));
            start += 2;
        }
        let rpn = compile(expr, &tokens[start..])?;
        debug!("{expr:?} -> {} RPN items, {} targets", rpn.len(), targets.len());

        let mut evaluator = Evaluator {
            expr,
            track: self,
            temporaries: Vec::new(),
            counter: 0,
        };
        let result = evaluator.run(&rpn);
        evaluator.cleanup();
        let mut value = result?;

        for (name, op) in targets.iter().rev() {
            if let Some(op) = op {
                let current = self.get_analytical_feature(name)?;
                let bop = binary_operator(*op)
                    .ok_or_else(|| parse_error(expr, format!("bad compound operator {op:?}")))?;
                value = bop.apply(&current, &value)?;
            }
            self.set_analytical_feature(name, value.clone())?;
        }
        Ok(value)
    }
}

#[cfg(test)]
mod algebra_test {
    use super::*;
    use crate::track::enu_track;
    use approx::assert_abs_diff_eq;

    fn track() -> Track {
        let mut t = enu_track(&[(0., 0., 0.), (2., 1., 0.), (4., 2., 0.), (6., 3., 0.)], 2.0);
        t.create_analytical_feature("a", vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        t.create_analytical_feature("b", vec![4.0, 0.0, 2.0, 1.0]).unwrap();
        t
    }

    #[test]
    fn test_tokenize() {
        let tokens = tokenize("v=3.6*D{s}/x'**2e1").unwrap();
        assert_eq!(tokens[0], Token::Ident("v".into()));
        assert_eq!(tokens[1], Token::Assign(None));
        assert_eq!(tokens[2], Token::Num(3.6));
        assert!(tokens.contains(&Token::Prime));
        assert!(tokens.contains(&Token::Op(Op::Pow)));
        assert_eq!(tokens.last(), Some(&Token::Num(20.0)));
        assert_eq!(tokenize("a += b").unwrap()[1], Token::Assign(Some(Op::Add)));
        assert!(tokenize("a $ b").is_err());
    }

    #[test]
    fn test_precedence() {
        let mut t = track();
        assert_eq!(t.eval("a + b * 2").unwrap(), vec![9.0, 2.0, 7.0, 6.0]);
        assert_eq!(t.eval("(a + b) * 2").unwrap(), vec![10.0, 4.0, 10.0, 10.0]);
        assert_eq!(t.eval("2 ^ 3 ^ 2").unwrap(), vec![512.0; 4]);
        assert_eq!(t.eval("-a + 1").unwrap(), vec![0.0, -1.0, -2.0, -3.0]);
        assert_eq!(t.eval("a > 2").unwrap(), vec![0.0, 0.0, 1.0, 1.0]);
        assert_eq!(t.eval("10 - a").unwrap(), vec![9.0, 8.0, 7.0, 6.0]);
    }

    #[test]
    fn test_division_by_zero_is_nan() {
        let mut t = track();
        let r = t.eval("a / b").unwrap();
        assert!(r[1].is_nan());
        assert_eq!(r[3], 4.0);
    }

    #[test]
    fn test_assignment_and_compound() {
        let mut t = track();
        t.eval("c = a + b").unwrap();
        assert_eq!(t.get_analytical_feature("c").unwrap(), vec![5.0, 2.0, 5.0, 5.0]);
        t.eval("c += 1").unwrap();
        assert_eq!(t.get_analytical_feature("c").unwrap(), vec![6.0, 3.0, 6.0, 6.0]);
        t.eval("p = q = a * 2").unwrap();
        assert_eq!(t.get_analytical_feature("p").unwrap(), t.get_analytical_feature("q").unwrap());
        assert!(matches!(t.eval("x = a"), Err(TrackError::ReservedFeature(_))));
    }

    #[test]
    fn test_pure_expression_leaves_track_unchanged() {
        let mut t = track();
        let names = t.feature_names().to_vec();
        t.eval("abs(a - AVG(a)) * D{b} + s").unwrap();
        assert_eq!(t.feature_names(), names.as_slice());
        assert!(t.eval("a + nope").is_err());
        assert_eq!(t.feature_names(), names.as_slice());
    }

    #[test]
    fn test_functions() {
        let mut t = track();
        let d = t.eval("a - AVG(a)").unwrap();
        assert_eq!(d, vec![-1.5, -0.5, 0.5, 1.5]);
        let sh = t.eval("a >> 1").unwrap();
        assert!(sh[0].is_nan());
        assert_eq!(&sh[1..], &[1.0, 2.0, 3.0]);
        assert_eq!(t.eval("shift_circular(a, 1)").unwrap(), vec![4.0, 1.0, 2.0, 3.0]);
        assert_eq!(t.eval("quad(a, a)").unwrap()[2], (18.0f64).sqrt());
        assert_eq!(t.eval("l1(a, b)").unwrap(), vec![9.0; 4]);
        assert_eq!(
            t.eval("foo(a)"),
            Err(TrackError::UnknownFunction("foo/1".into()))
        );
    }

    #[test]
    fn test_derivatives() {
        let mut t = track();
        // x moves 2 m every 2 s
        let v = t.eval("x'").unwrap();
        assert!(v[0].is_nan());
        assert_eq!(&v[1..], &[1.0, 1.0, 1.0]);
        let acc = t.eval("x''").unwrap();
        assert_eq!(&acc[2..], &[0.0, 0.0]);
        let s = t.eval("v = 3.6 * D{s} / D{t}").unwrap();
        for w in &s[1..] {
            assert_abs_diff_eq!(*w, 3.6 * 5f64.sqrt() / 2.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_parse_errors() {
        let mut t = track();
        for bad in ["a +", "(a", "a)", "a b", "", "* a", "a >> b", "a == b"] {
            assert!(
                matches!(t.eval(bad), Err(TrackError::ParseError(_))),
                "{bad:?} should not parse"
            );
        }
    }
}
