//! Dice formulas such as `2d6 + @atk.mod` or `(1d8 + 4) * 0.5`.
//!
//! A formula is parsed once into a small expression tree and can then be
//! evaluated any number of times against a binding map and an injected RNG.
//! Standard precedence applies: `*` and `/` bind tighter than `+` and `-`,
//! and dice terms are plain operands.

use crate::core::error::{EngineError, Result};
use std::collections::HashMap;
use std::fmt;

const MAX_DICE_PER_TERM: u32 = 1000;
const MAX_FACES: u32 = 1000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Op {
    Add,
    Sub,
    Mul,
    Div,
}

impl Op {
    fn symbol(&self) -> &'static str {
        match self {
            Op::Add => "+",
            Op::Sub => "-",
            Op::Mul => "*",
            Op::Div => "/",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Node {
    Number(f64),
    Dice { count: u32, faces: u32 },
    Binding(String),
    Neg(Box<Node>),
    Group(Box<Node>),
    Binary { op: Op, lhs: Box<Node>, rhs: Box<Node> },
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Number(f64),
    Die,
    Binding(String),
    Op(Op),
    Open,
    Close,
}

/// Results of one `NdM` term, in roll order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiceGroup {
    pub count: u32,
    pub faces: u32,
    pub results: Vec<u32>,
}

impl DiceGroup {
    pub fn sum(&self) -> u64 {
        self.results.iter().map(|r| u64::from(*r)).sum()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DiceOutcome {
    /// `raw_total` floored to an integer.
    pub total: i32,
    pub raw_total: f64,
    pub groups: Vec<DiceGroup>,
}

impl DiceOutcome {
    pub fn first_group(&self) -> Option<&DiceGroup> {
        self.groups.first()
    }

    /// First die of the first group, if any dice were rolled.
    pub fn first_die(&self) -> Option<u32> {
        self.first_group().and_then(|g| g.results.first().copied())
    }

    /// True when the first die of the first group landed on its top face.
    pub fn natural_max(&self) -> bool {
        match self.first_group() {
            Some(group) => group.results.first().is_some_and(|r| *r == group.faces),
            None => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DiceExpression {
    root: Node,
}

impl DiceExpression {
    pub fn parse(formula: &str) -> Result<Self> {
        let tokens = tokenize(formula)?;
        if tokens.is_empty() {
            return Err(EngineError::parse(formula, "empty formula"));
        }
        let mut parser = Parser {
            formula,
            tokens: &tokens,
            pos: 0,
        };
        let root = parser.expression()?;
        if parser.pos != tokens.len() {
            return Err(EngineError::parse(formula, "unexpected trailing input"));
        }
        Ok(Self { root })
    }

    /// Rolls the formula. With `maximize` every die shows its top face and no
    /// RNG draws are made.
    pub fn evaluate(
        &self,
        bindings: &HashMap<String, f64>,
        rng: &mut dyn FnMut() -> f64,
        maximize: bool,
    ) -> Result<DiceOutcome> {
        let mut groups = Vec::new();
        let mut ctx = EvalContext {
            bindings,
            rng,
            maximize,
            groups: &mut groups,
        };
        let raw_total = eval_node(&self.root, &mut ctx)?;
        Ok(DiceOutcome {
            total: raw_total.floor() as i32,
            raw_total,
            groups,
        })
    }

    /// Expected value of the formula: each die counts as `(faces + 1) / 2`.
    pub fn average(&self, bindings: &HashMap<String, f64>) -> Result<f64> {
        average_node(&self.root, bindings)
    }

    /// Adds `delta` dice to the first dice term, never going below zero dice.
    /// Returns false when the formula has no dice term.
    pub fn adjust_first_dice_count(&mut self, delta: i32) -> bool {
        match first_dice_mut(&mut self.root) {
            Some(count) => {
                let next = (*count as i64 + delta as i64).clamp(0, MAX_DICE_PER_TERM as i64);
                *count = next as u32;
                true
            }
            None => false,
        }
    }

    pub fn dice_terms(&self) -> Vec<(u32, u32)> {
        let mut out = Vec::new();
        collect_dice(&self.root, &mut out);
        out
    }

    /// Fails on the first `@name` missing from `bindings`.
    pub fn check_bindings(&self, bindings: &HashMap<String, f64>) -> Result<()> {
        let mut names = Vec::new();
        collect_bindings(&self.root, &mut names);
        match names.into_iter().find(|name| !bindings.contains_key(*name)) {
            Some(missing) => Err(EngineError::UnknownBinding(missing.to_string())),
            None => Ok(()),
        }
    }
}

impl fmt::Display for DiceExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_node(&self.root, f)
    }
}

/// Parses and rolls in one go.
pub fn roll(
    formula: &str,
    bindings: &HashMap<String, f64>,
    rng: &mut dyn FnMut() -> f64,
    maximize: bool,
) -> Result<DiceOutcome> {
    DiceExpression::parse(formula)?.evaluate(bindings, rng, maximize)
}

/// One die with `faces` sides from a `[0, 1)` sample.
pub fn roll_die(faces: u32, rng: &mut dyn FnMut() -> f64) -> u32 {
    if faces == 0 {
        return 0;
    }
    let sample = rng().clamp(0.0, 1.0);
    ((sample * faces as f64).floor() as u32 + 1).min(faces)
}

fn tokenize(formula: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = formula.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '+' => {
                tokens.push(Token::Op(Op::Add));
                i += 1;
            }
            '-' => {
                tokens.push(Token::Op(Op::Sub));
                i += 1;
            }
            '*' => {
                tokens.push(Token::Op(Op::Mul));
                i += 1;
            }
            '/' => {
                tokens.push(Token::Op(Op::Div));
                i += 1;
            }
            '(' => {
                tokens.push(Token::Open);
                i += 1;
            }
            ')' => {
                tokens.push(Token::Close);
                i += 1;
            }
            'd' | 'D' => {
                tokens.push(Token::Die);
                i += 1;
            }
            '@' => {
                let start = i + 1;
                let mut end = start;
                while end < chars.len()
                    && (chars[end].is_ascii_alphanumeric() || chars[end] == '_' || chars[end] == '.')
                {
                    end += 1;
                }
                let name: String = chars[start..end].iter().collect();
                let name = name.trim_end_matches('.').to_string();
                if name.is_empty() {
                    return Err(EngineError::parse(formula, "empty binding name"));
                }
                tokens.push(Token::Binding(name));
                i = end;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let value: f64 = text
                    .parse()
                    .map_err(|_| EngineError::parse(formula, format!("bad number '{}'", text)))?;
                tokens.push(Token::Number(value));
            }
            other => {
                return Err(EngineError::parse(formula, format!("unexpected character '{}'", other)));
            }
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    formula: &'a str,
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn error(&self, reason: impl Into<String>) -> EngineError {
        EngineError::parse(self.formula, reason)
    }

    fn expression(&mut self) -> Result<Node> {
        let mut lhs = self.term()?;
        while let Some(Token::Op(op @ (Op::Add | Op::Sub))) = self.peek() {
            let op = *op;
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Node::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Node> {
        let mut lhs = self.factor()?;
        while let Some(Token::Op(op @ (Op::Mul | Op::Div))) = self.peek() {
            let op = *op;
            self.pos += 1;
            let rhs = self.factor()?;
            lhs = Node::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn factor(&mut self) -> Result<Node> {
        match self.peek() {
            Some(Token::Op(Op::Sub)) => {
                self.pos += 1;
                Ok(Node::Neg(Box::new(self.factor()?)))
            }
            Some(Token::Op(Op::Add)) => {
                self.pos += 1;
                self.factor()
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Node> {
        match self.next().cloned() {
            Some(Token::Number(value)) => {
                if matches!(self.peek(), Some(Token::Die)) {
                    if value.fract() != 0.0 || value < 0.0 {
                        return Err(self.error("dice count must be a whole number"));
                    }
                    self.pos += 1;
                    return self.dice(value as u32);
                }
                Ok(Node::Number(value))
            }
            Some(Token::Die) => self.dice(1),
            Some(Token::Binding(name)) => Ok(Node::Binding(name)),
            Some(Token::Open) => {
                let inner = self.expression()?;
                match self.next() {
                    Some(Token::Close) => Ok(Node::Group(Box::new(inner))),
                    _ => Err(self.error("missing closing parenthesis")),
                }
            }
            Some(other) => Err(self.error(format!("unexpected token {:?}", other))),
            None => Err(self.error("unexpected end of formula")),
        }
    }

    fn dice(&mut self, count: u32) -> Result<Node> {
        let faces = match self.next() {
            Some(Token::Number(faces)) if faces.fract() == 0.0 && *faces >= 1.0 => *faces,
            _ => return Err(self.error("dice need a positive whole number of faces")),
        };
        if faces > MAX_FACES as f64 {
            return Err(self.error(format!("dice have at most {} faces", MAX_FACES)));
        }
        let faces = faces as u32;
        if count > MAX_DICE_PER_TERM {
            return Err(self.error(format!("more than {} dice in one term", MAX_DICE_PER_TERM)));
        }
        Ok(Node::Dice { count, faces })
    }
}

struct EvalContext<'a, 'r> {
    bindings: &'a HashMap<String, f64>,
    rng: &'r mut dyn FnMut() -> f64,
    maximize: bool,
    groups: &'a mut Vec<DiceGroup>,
}

fn lookup(bindings: &HashMap<String, f64>, name: &str) -> Result<f64> {
    bindings
        .get(name)
        .copied()
        .ok_or_else(|| EngineError::UnknownBinding(name.to_string()))
}

fn apply_op(op: Op, lhs: f64, rhs: f64) -> Result<f64> {
    match op {
        Op::Add => Ok(lhs + rhs),
        Op::Sub => Ok(lhs - rhs),
        Op::Mul => Ok(lhs * rhs),
        Op::Div => {
            if rhs == 0.0 {
                Err(EngineError::Input("division by zero in dice formula".to_string()))
            } else {
                Ok(lhs / rhs)
            }
        }
    }
}

fn eval_node(node: &Node, ctx: &mut EvalContext<'_, '_>) -> Result<f64> {
    match node {
        Node::Number(value) => Ok(*value),
        Node::Binding(name) => lookup(ctx.bindings, name),
        Node::Dice { count, faces } => {
            let results: Vec<u32> = (0..*count)
                .map(|_| {
                    if ctx.maximize {
                        *faces
                    } else {
                        roll_die(*faces, ctx.rng)
                    }
                })
                .collect();
            let group = DiceGroup {
                count: *count,
                faces: *faces,
                results,
            };
            let sum = group.sum();
            ctx.groups.push(group);
            Ok(sum as f64)
        }
        Node::Neg(inner) => Ok(-eval_node(inner, ctx)?),
        Node::Group(inner) => eval_node(inner, ctx),
        Node::Binary { op, lhs, rhs } => {
            let lhs = eval_node(lhs, ctx)?;
            let rhs = eval_node(rhs, ctx)?;
            apply_op(*op, lhs, rhs)
        }
    }
}

fn average_node(node: &Node, bindings: &HashMap<String, f64>) -> Result<f64> {
    match node {
        Node::Number(value) => Ok(*value),
        Node::Binding(name) => lookup(bindings, name),
        Node::Dice { count, faces } => Ok(*count as f64 * (*faces as f64 + 1.0) / 2.0),
        Node::Neg(inner) => Ok(-average_node(inner, bindings)?),
        Node::Group(inner) => average_node(inner, bindings),
        Node::Binary { op, lhs, rhs } => {
            apply_op(*op, average_node(lhs, bindings)?, average_node(rhs, bindings)?)
        }
    }
}

fn first_dice_mut(node: &mut Node) -> Option<&mut u32> {
    match node {
        Node::Dice { count, .. } => Some(count),
        Node::Neg(inner) | Node::Group(inner) => first_dice_mut(inner),
        Node::Binary { lhs, rhs, .. } => match first_dice_mut(lhs) {
            Some(count) => Some(count),
            None => first_dice_mut(rhs),
        },
        Node::Number(_) | Node::Binding(_) => None,
    }
}

fn collect_dice(node: &Node, out: &mut Vec<(u32, u32)>) {
    match node {
        Node::Dice { count, faces } => out.push((*count, *faces)),
        Node::Neg(inner) | Node::Group(inner) => collect_dice(inner, out),
        Node::Binary { lhs, rhs, .. } => {
            collect_dice(lhs, out);
            collect_dice(rhs, out);
        }
        Node::Number(_) | Node::Binding(_) => {}
    }
}

fn collect_bindings<'n>(node: &'n Node, out: &mut Vec<&'n str>) {
    match node {
        Node::Binding(name) => out.push(name),
        Node::Neg(inner) | Node::Group(inner) => collect_bindings(inner, out),
        Node::Binary { lhs, rhs, .. } => {
            collect_bindings(lhs, out);
            collect_bindings(rhs, out);
        }
        Node::Number(_) | Node::Dice { .. } => {}
    }
}

fn write_node(node: &Node, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match node {
        Node::Number(value) => {
            if value.fract() == 0.0 {
                write!(f, "{}", *value as i64)
            } else {
                write!(f, "{}", value)
            }
        }
        Node::Dice { count, faces } => write!(f, "{}d{}", count, faces),
        Node::Binding(name) => write!(f, "@{}", name),
        Node::Neg(inner) => {
            f.write_str("-")?;
            write_node(inner, f)
        }
        Node::Group(inner) => {
            f.write_str("(")?;
            write_node(inner, f)?;
            f.write_str(")")
        }
        Node::Binary { op, lhs, rhs } => {
            write_node(lhs, f)?;
            write!(f, " {} ", op.symbol())?;
            write_node(rhs, f)
        }
    }
}
