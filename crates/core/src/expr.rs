//! Evaluation of literal and source parameters.
//!
//! Two grammars share one tokenizer:
//! - literals: numbers, strings, `True`/`False`/`None`, lists, tuples, sets and dicts of
//!   literals (a leading sign is allowed on numbers)
//! - source: literals combined with arithmetic, following the usual precedence
//!   (`**` binds tighter than unary minus, which binds tighter than `*`, `/`, `//`, `%`,
//!   which bind tighter than `+`, `-`)
//!
//! Names are never looked up, so nothing outside the expression text can be reached.

use crate::value::Value;

/// Largest sequence a `*` repetition may produce.
const MAX_REPEAT_LEN: usize = 1 << 20;

/// Deepest nesting of containers, parentheses and unary signs.
const MAX_DEPTH: usize = 100;

#[derive(Clone, Copy, Debug, PartialEq)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

impl BinOp {
    fn precedence(self) -> u8 {
        match self {
            Self::Add | Self::Sub => 1,
            Self::Mul | Self::Div | Self::FloorDiv | Self::Mod => 2,
            Self::Pow => 3,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    Op(BinOp),
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    End,
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&ch) = chars.peek() {
        match ch {
            ' ' | '\t' | '\n' | '\r' => {
                chars.next();
            }
            '0'..='9' | '.' => {
                let mut number = String::new();
                let mut is_float = false;
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_digit() || c == '_' {
                        if c != '_' {
                            number.push(c);
                        }
                        chars.next();
                    } else if c == '.' && !is_float {
                        is_float = true;
                        number.push(c);
                        chars.next();
                    } else if (c == 'e' || c == 'E') && !number.contains(['e', 'E']) {
                        is_float = true;
                        number.push(c);
                        chars.next();
                        if let Some(&sign) = chars.peek() {
                            if sign == '+' || sign == '-' {
                                number.push(sign);
                                chars.next();
                            }
                        }
                    } else {
                        break;
                    }
                }
                if is_float {
                    let value: f64 = number
                        .parse()
                        .map_err(|_| format!("invalid number: {number}"))?;
                    tokens.push(Token::Float(value));
                } else {
                    let value: i64 = number
                        .parse()
                        .map_err(|_| format!("integer literal out of range: {number}"))?;
                    tokens.push(Token::Int(value));
                }
            }
            '\'' | '"' => {
                chars.next();
                let mut text = String::new();
                let mut terminated = false;
                while let Some(c) = chars.next() {
                    if c == ch {
                        terminated = true;
                        break;
                    }
                    if c == '\\' {
                        match chars.next() {
                            Some('n') => text.push('\n'),
                            Some('t') => text.push('\t'),
                            Some('r') => text.push('\r'),
                            Some('0') => text.push('\0'),
                            Some(escaped @ ('\\' | '\'' | '"')) => text.push(escaped),
                            Some(other) => {
                                text.push('\\');
                                text.push(other);
                            }
                            None => break,
                        }
                    } else {
                        text.push(c);
                    }
                }
                if !terminated {
                    return Err("unterminated string literal".into());
                }
                tokens.push(Token::Str(text));
            }
            'a'..='z' | 'A'..='Z' | '_' => {
                let mut ident = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        ident.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident));
            }
            '+' => {
                chars.next();
                tokens.push(Token::Op(BinOp::Add));
            }
            '-' => {
                chars.next();
                tokens.push(Token::Op(BinOp::Sub));
            }
            '*' => {
                chars.next();
                if chars.peek() == Some(&'*') {
                    chars.next();
                    tokens.push(Token::Op(BinOp::Pow));
                } else {
                    tokens.push(Token::Op(BinOp::Mul));
                }
            }
            '/' => {
                chars.next();
                if chars.peek() == Some(&'/') {
                    chars.next();
                    tokens.push(Token::Op(BinOp::FloorDiv));
                } else {
                    tokens.push(Token::Op(BinOp::Div));
                }
            }
            '%' => {
                chars.next();
                tokens.push(Token::Op(BinOp::Mod));
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '[' => {
                chars.next();
                tokens.push(Token::LBracket);
            }
            ']' => {
                chars.next();
                tokens.push(Token::RBracket);
            }
            '{' => {
                chars.next();
                tokens.push(Token::LBrace);
            }
            '}' => {
                chars.next();
                tokens.push(Token::RBrace);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            ':' => {
                chars.next();
                tokens.push(Token::Colon);
            }
            _ => return Err(format!("unexpected character: '{ch}'")),
        }
    }

    tokens.push(Token::End);
    Ok(tokens)
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Mode {
    Literal,
    Source,
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    mode: Mode,
    depth: usize,
}

impl Parser {
    fn new(input: &str, mode: Mode) -> Result<Self, String> {
        Ok(Self {
            tokens: tokenize(input)?,
            pos: 0,
            mode,
            depth: 0,
        })
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::End)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: &Token) -> Result<(), String> {
        if self.peek() == expected {
            self.advance();
            Ok(())
        } else {
            Err(format!("expected {expected:?}, found {:?}", self.peek()))
        }
    }

    fn parse_complete(&mut self) -> Result<Value, String> {
        let value = self.parse_value()?;
        match self.peek() {
            Token::End => Ok(value),
            Token::Op(_) if self.mode == Mode::Literal => {
                Err("operators are not allowed in literals".into())
            }
            other => Err(format!("unexpected token: {other:?}")),
        }
    }

    /// Runs `parse` one nesting level deeper, failing instead of exhausting the stack.
    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, String>,
    ) -> Result<T, String> {
        if self.depth >= MAX_DEPTH {
            return Err("expression nested too deeply".into());
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn parse_value(&mut self) -> Result<Value, String> {
        self.nested(|parser| match parser.mode {
            Mode::Literal => parser.parse_signed_literal(),
            Mode::Source => parser.parse_expr(0),
        })
    }

    fn parse_signed_literal(&mut self) -> Result<Value, String> {
        match self.peek() {
            Token::Op(op @ (BinOp::Add | BinOp::Sub)) => {
                let op = *op;
                self.advance();
                let operand = match self.advance() {
                    Token::Int(value) => Value::Int(value),
                    Token::Float(value) => Value::Float(value),
                    other => return Err(format!("a sign must precede a number, found {other:?}")),
                };
                if op == BinOp::Sub {
                    negate(operand)
                } else {
                    Ok(operand)
                }
            }
            _ => self.parse_atom(),
        }
    }

    /// Precedence climbing over the left associative operators.
    fn parse_expr(&mut self, min_prec: u8) -> Result<Value, String> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match self.peek() {
                Token::Op(op) if *op != BinOp::Pow => *op,
                _ => break,
            };

            let prec = op.precedence();
            if prec < min_prec {
                break;
            }

            self.advance();
            let right = self.parse_expr(prec + 1)?;
            left = binary(op, left, right)?;
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Value, String> {
        match self.peek() {
            Token::Op(BinOp::Sub) => {
                self.advance();
                negate(self.nested(Self::parse_unary)?)
            }
            Token::Op(BinOp::Add) => {
                self.advance();
                let operand = self.nested(Self::parse_unary)?;
                numeric(&operand)
                    .map(Number::into_value)
                    .ok_or_else(|| format!("bad operand for unary +: {}", operand.type_name()))
            }
            _ => self.parse_power(),
        }
    }

    fn parse_power(&mut self) -> Result<Value, String> {
        let base = self.parse_atom()?;
        if matches!(self.peek(), Token::Op(BinOp::Pow)) {
            self.advance();
            // Right associative, and the exponent may carry its own sign: 2 ** -1.
            let exponent = self.nested(Self::parse_unary)?;
            return binary(BinOp::Pow, base, exponent);
        }
        Ok(base)
    }

    fn parse_atom(&mut self) -> Result<Value, String> {
        match self.advance() {
            Token::Int(value) => Ok(Value::Int(value)),
            Token::Float(value) => Ok(Value::Float(value)),
            Token::Str(value) => Ok(Value::Str(value)),
            Token::Ident(name) => match name.as_str() {
                "True" => Ok(Value::Bool(true)),
                "False" => Ok(Value::Bool(false)),
                "None" => Ok(Value::None),
                _ => Err(format!("name `{name}` is not allowed")),
            },
            Token::LParen => {
                if matches!(self.peek(), Token::RParen) {
                    self.advance();
                    return Ok(Value::Tuple(Vec::new()));
                }
                let first = self.parse_value()?;
                if matches!(self.peek(), Token::RParen) {
                    self.advance();
                    return Ok(first);
                }
                self.expect(&Token::Comma)?;
                let mut items = vec![first];
                items.extend(self.parse_items(&Token::RParen)?);
                Ok(Value::Tuple(items))
            }
            Token::LBracket => Ok(Value::List(self.parse_items(&Token::RBracket)?)),
            Token::LBrace => self.parse_braced(),
            Token::End => Err("unexpected end of expression".into()),
            other => Err(format!("unexpected token: {other:?}")),
        }
    }

    /// Comma separated values up to and including `close`; a trailing comma is allowed.
    fn parse_items(&mut self, close: &Token) -> Result<Vec<Value>, String> {
        let mut items = Vec::new();
        loop {
            if self.peek() == close {
                self.advance();
                return Ok(items);
            }
            items.push(self.parse_value()?);
            if self.peek() == close {
                continue;
            }
            self.expect(&Token::Comma)?;
        }
    }

    /// A dict or a set; `{}` is an empty dict.
    fn parse_braced(&mut self) -> Result<Value, String> {
        if matches!(self.peek(), Token::RBrace) {
            self.advance();
            return Ok(Value::Dict(Vec::new()));
        }

        let first = self.parse_value()?;
        if !matches!(self.peek(), Token::Colon) {
            let mut items = vec![first];
            if !matches!(self.peek(), Token::RBrace) {
                self.expect(&Token::Comma)?;
            }
            for item in self.parse_items(&Token::RBrace)? {
                if !items.contains(&item) {
                    items.push(item);
                }
            }
            return Ok(Value::Set(items));
        }

        self.advance();
        let mut entries = vec![(first, self.parse_value()?)];
        loop {
            match self.advance() {
                Token::RBrace => break,
                Token::Comma => {
                    if matches!(self.peek(), Token::RBrace) {
                        self.advance();
                        break;
                    }
                    let key = self.parse_value()?;
                    self.expect(&Token::Colon)?;
                    let value = self.parse_value()?;
                    match entries.iter_mut().find(|(existing, _)| *existing == key) {
                        Some(entry) => entry.1 = value,
                        None => entries.push((key, value)),
                    }
                }
                other => return Err(format!("unexpected token in dict: {other:?}")),
            }
        }
        Ok(Value::Dict(entries))
    }
}

#[derive(Clone, Copy)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    #[allow(clippy::cast_precision_loss)]
    fn as_f64(self) -> f64 {
        match self {
            Self::Int(value) => value as f64,
            Self::Float(value) => value,
        }
    }

    fn into_value(self) -> Value {
        match self {
            Self::Int(value) => Value::Int(value),
            Self::Float(value) => Value::Float(value),
        }
    }
}

fn numeric(value: &Value) -> Option<Number> {
    match value {
        Value::Bool(value) => Some(Number::Int(i64::from(*value))),
        Value::Int(value) => Some(Number::Int(*value)),
        Value::Float(value) => Some(Number::Float(*value)),
        _ => None,
    }
}

fn negate(value: Value) -> Result<Value, String> {
    match numeric(&value) {
        Some(Number::Int(value)) => value
            .checked_neg()
            .map(Value::Int)
            .ok_or_else(|| "integer overflow".to_string()),
        Some(Number::Float(value)) => Ok(Value::Float(-value)),
        None => Err(format!("bad operand for unary -: {}", value.type_name())),
    }
}

fn repeat(items: &[Value], times: i64) -> Result<Vec<Value>, String> {
    let times = usize::try_from(times).unwrap_or(0);
    if items.len().saturating_mul(times) > MAX_REPEAT_LEN {
        return Err("repetition result is too large".into());
    }
    let mut repeated = Vec::with_capacity(items.len() * times);
    for _ in 0..times {
        repeated.extend_from_slice(items);
    }
    Ok(repeated)
}

fn repeat_str(text: &str, times: i64) -> Result<String, String> {
    let times = usize::try_from(times).unwrap_or(0);
    if text.len().saturating_mul(times) > MAX_REPEAT_LEN {
        return Err("repetition result is too large".into());
    }
    Ok(text.repeat(times))
}

fn binary(op: BinOp, left: Value, right: Value) -> Result<Value, String> {
    match (op, &left, &right) {
        (BinOp::Add, Value::Str(a), Value::Str(b)) => return Ok(Value::Str(format!("{a}{b}"))),
        (BinOp::Add, Value::List(a), Value::List(b)) => {
            return Ok(Value::List(a.iter().chain(b).cloned().collect()))
        }
        (BinOp::Add, Value::Tuple(a), Value::Tuple(b)) => {
            return Ok(Value::Tuple(a.iter().chain(b).cloned().collect()))
        }
        (BinOp::Mul, Value::Str(text), Value::Int(times))
        | (BinOp::Mul, Value::Int(times), Value::Str(text)) => {
            return Ok(Value::Str(repeat_str(text, *times)?))
        }
        (BinOp::Mul, Value::List(items), Value::Int(times))
        | (BinOp::Mul, Value::Int(times), Value::List(items)) => {
            return Ok(Value::List(repeat(items, *times)?))
        }
        (BinOp::Mul, Value::Tuple(items), Value::Int(times))
        | (BinOp::Mul, Value::Int(times), Value::Tuple(items)) => {
            return Ok(Value::Tuple(repeat(items, *times)?))
        }
        _ => {}
    }

    let (Some(a), Some(b)) = (numeric(&left), numeric(&right)) else {
        return Err(format!(
            "unsupported operand types for {op:?}: {} and {}",
            left.type_name(),
            right.type_name()
        ));
    };

    match (a, b) {
        (Number::Int(a), Number::Int(b)) => integer_binary(op, a, b),
        _ => float_binary(op, a.as_f64(), b.as_f64()),
    }
}

fn integer_binary(op: BinOp, a: i64, b: i64) -> Result<Value, String> {
    let overflow = || "integer overflow".to_string();
    match op {
        BinOp::Add => a.checked_add(b).map(Value::Int).ok_or_else(overflow),
        BinOp::Sub => a.checked_sub(b).map(Value::Int).ok_or_else(overflow),
        BinOp::Mul => a.checked_mul(b).map(Value::Int).ok_or_else(overflow),
        #[allow(clippy::cast_precision_loss)]
        BinOp::Div => float_binary(op, a as f64, b as f64),
        BinOp::FloorDiv | BinOp::Mod if b == 0 => Err("division by zero".into()),
        BinOp::FloorDiv => {
            let quotient = a.checked_div(b).ok_or_else(overflow)?;
            let floored = if a % b != 0 && ((a < 0) != (b < 0)) {
                quotient - 1
            } else {
                quotient
            };
            Ok(Value::Int(floored))
        }
        BinOp::Mod => {
            let remainder = a.checked_rem(b).ok_or_else(overflow)?;
            let floored = if remainder != 0 && ((remainder < 0) != (b < 0)) {
                remainder + b
            } else {
                remainder
            };
            Ok(Value::Int(floored))
        }
        BinOp::Pow => match u32::try_from(b) {
            Ok(exponent) => a.checked_pow(exponent).map(Value::Int).ok_or_else(overflow),
            #[allow(clippy::cast_precision_loss)]
            Err(_) => float_binary(op, a as f64, b as f64),
        },
    }
}

fn float_binary(op: BinOp, a: f64, b: f64) -> Result<Value, String> {
    let zero_division = matches!(op, BinOp::Div | BinOp::FloorDiv | BinOp::Mod) && b == 0.0;
    if zero_division {
        return Err("division by zero".into());
    }

    let result = match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div => a / b,
        BinOp::FloorDiv => (a / b).floor(),
        BinOp::Mod => a - b * (a / b).floor(),
        BinOp::Pow => {
            if a == 0.0 && b < 0.0 {
                return Err("zero cannot be raised to a negative power".into());
            }
            a.powf(b)
        }
    };
    Ok(Value::Float(result))
}

/// Parses a literal constant expression such as `[3, 1, 5]` or `{'a': (1, 2.5)}`.
///
/// # Errors
///
/// Returns a description of the problem when the text is not a literal.
pub fn eval_literal(source: &str) -> Result<Value, String> {
    Parser::new(source, Mode::Literal)?.parse_complete()
}

/// Evaluates restricted arithmetic over literals such as `2 + 5` or `'ab' * 2`.
///
/// # Errors
///
/// Returns a description of the problem when the text does not evaluate.
pub fn eval_source(source: &str) -> Result<Value, String> {
    Parser::new(source, Mode::Source)?.parse_complete()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_scalars() {
        assert_eq!(eval_literal("42"), Ok(Value::Int(42)));
        assert_eq!(eval_literal("-1.5"), Ok(Value::Float(-1.5)));
        assert_eq!(eval_literal("1e3"), Ok(Value::Float(1000.0)));
        assert_eq!(eval_literal("'a'"), Ok(Value::from("a")));
        assert_eq!(eval_literal("\"it's\""), Ok(Value::from("it's")));
        assert_eq!(eval_literal("True"), Ok(Value::Bool(true)));
        assert_eq!(eval_literal("None"), Ok(Value::None));
    }

    #[test]
    fn test_literal_containers() {
        assert_eq!(
            eval_literal("[3, 1, 5]"),
            Ok(Value::List(vec![Value::Int(3), Value::Int(1), Value::Int(5)]))
        );
        assert_eq!(eval_literal("(1,)"), Ok(Value::Tuple(vec![Value::Int(1)])));
        assert_eq!(eval_literal("(1)"), Ok(Value::Int(1)));
        assert_eq!(eval_literal("()"), Ok(Value::Tuple(vec![])));
        assert_eq!(eval_literal("{}"), Ok(Value::Dict(vec![])));
        assert_eq!(
            eval_literal("{1, 1, 2}"),
            Ok(Value::Set(vec![Value::Int(1), Value::Int(2)]))
        );
        assert_eq!(
            eval_literal("{'a': [1, 2], 'b': None,}"),
            Ok(Value::Dict(vec![
                (Value::from("a"), Value::List(vec![Value::Int(1), Value::Int(2)])),
                (Value::from("b"), Value::None),
            ]))
        );
    }

    #[test]
    fn test_literal_rejects_expressions() {
        assert!(eval_literal("a").is_err());
        assert!(eval_literal("b").is_err());
        assert!(eval_literal("2 + 3").is_err());
        assert!(eval_literal("print(1)").is_err());
        assert!(eval_literal("[1, 2").is_err());
        assert!(eval_literal("'open").is_err());
        assert!(eval_literal("").is_err());
    }

    #[test]
    fn test_source_arithmetic() {
        assert_eq!(eval_source(" 2 + 5 "), Ok(Value::Int(7)));
        assert_eq!(eval_source("2 + 3 * 4"), Ok(Value::Int(14)));
        assert_eq!(eval_source("(2 + 3) * 4"), Ok(Value::Int(20)));
        assert_eq!(eval_source("10 - 4 - 3"), Ok(Value::Int(3)));
        assert_eq!(eval_source("2 ** 3 ** 2"), Ok(Value::Int(512)));
        assert_eq!(eval_source("-2 ** 2"), Ok(Value::Int(-4)));
        assert_eq!(eval_source("2 ** -1"), Ok(Value::Float(0.5)));
        assert_eq!(eval_source("7 / 2"), Ok(Value::Float(3.5)));
        assert_eq!(eval_source("-7 // 2"), Ok(Value::Int(-4)));
        assert_eq!(eval_source("-7 % 3"), Ok(Value::Int(2)));
        assert_eq!(eval_source("1 + 0.5"), Ok(Value::Float(1.5)));
    }

    #[test]
    fn test_source_sequences() {
        assert_eq!(eval_source("'ab' * 2"), Ok(Value::from("abab")));
        assert_eq!(eval_source("'a' + 'b'"), Ok(Value::from("ab")));
        assert_eq!(
            eval_source("[1] + [2]"),
            Ok(Value::List(vec![Value::Int(1), Value::Int(2)]))
        );
        assert_eq!(
            eval_source("[1 + 1, 3]"),
            Ok(Value::List(vec![Value::Int(2), Value::Int(3)]))
        );
        assert_eq!(
            eval_source("[1] * 3"),
            Ok(Value::List(vec![Value::Int(1), Value::Int(1), Value::Int(1)]))
        );
        assert_eq!(
            eval_source("2 * (1,)"),
            Ok(Value::Tuple(vec![Value::Int(1), Value::Int(1)]))
        );
        assert_eq!(
            eval_source("(1,) * 2"),
            Ok(Value::Tuple(vec![Value::Int(1), Value::Int(1)]))
        );
        assert_eq!(eval_source("[1, 2] * 0"), Ok(Value::List(vec![])));
        assert_eq!(eval_source("[1] * -1"), Ok(Value::List(vec![])));
    }

    #[test]
    fn test_nesting_limit() {
        let shallow = "[".repeat(10) + &"]".repeat(10);
        assert!(eval_literal(&shallow).is_ok());
        assert!(eval_source(&shallow).is_ok());
        assert_eq!(eval_source(&("-".repeat(10) + "1")), Ok(Value::Int(1)));

        let deep = "[".repeat(200_000) + &"]".repeat(200_000);
        assert!(eval_literal(&deep).is_err());
        assert!(eval_source(&deep).is_err());

        let parens = "(".repeat(200_000) + "1" + &")".repeat(200_000);
        assert!(eval_source(&parens).is_err());

        let signs = "-".repeat(200_000) + "1";
        assert!(eval_source(&signs).is_err());

        let powers = vec!["2"; 200_000].join(" ** ");
        assert!(eval_source(&powers).is_err());
    }

    #[test]
    fn test_source_rejects() {
        assert!(eval_source("a").is_err());
        assert!(eval_source("2 + 5 5").is_err());
        assert!(eval_source("1 / 0").is_err());
        assert!(eval_source("1 % 0").is_err());
        assert!(eval_source("'a' - 'b'").is_err());
        assert!(eval_source("__import__('os')").is_err());
        assert!(eval_source("9223372036854775807 + 1").is_err());
        assert!(eval_source("'a' * 100000000").is_err());
    }
}
