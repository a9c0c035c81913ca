use crate::traits::ScalarMap;
use std::cell::RefCell;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EquationError {
    #[error("invalid number literal '{0}'")]
    InvalidNumber(String),
    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),
    #[error("unexpected token {0}")]
    UnexpectedToken(String),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("expected ')'")]
    UnclosedParen,
    #[error("unknown variable or parameter '{0}'")]
    UnknownName(String),
    #[error("unknown function '{0}'")]
    UnknownFunction(String),
    #[error("{names} parameter names given for {values} values")]
    ParamCountMismatch { names: usize, values: usize },
}

/// Instructions for the stack machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OpCode {
    LoadConst(f64),
    /// Pushes the state variable.
    LoadVar,
    LoadParam(usize),
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Neg,
    Call(Function),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Sin,
    Cos,
    Exp,
    Ln,
    Sqrt,
    Abs,
}

impl Function {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "sin" => Some(Function::Sin),
            "cos" => Some(Function::Cos),
            "exp" => Some(Function::Exp),
            "ln" => Some(Function::Ln),
            "sqrt" => Some(Function::Sqrt),
            "abs" => Some(Function::Abs),
            _ => None,
        }
    }

    fn eval(self, a: f64) -> f64 {
        match self {
            Function::Sin => a.sin(),
            Function::Cos => a.cos(),
            Function::Exp => a.exp(),
            Function::Ln => a.ln(),
            Function::Sqrt => a.sqrt(),
            Function::Abs => a.abs(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bytecode {
    pub ops: Vec<OpCode>,
}

/// Stack-based Virtual Machine for evaluating equations.
///
/// The compiler only emits balanced programs; an empty program, or a
/// parameter slot with no bound value, evaluates to NaN.
pub struct VM;

impl VM {
    pub fn execute(bytecode: &Bytecode, x: f64, params: &[f64], stack: &mut Vec<f64>) -> f64 {
        stack.clear();

        for op in &bytecode.ops {
            let value = match *op {
                OpCode::LoadConst(val) => val,
                OpCode::LoadVar => x,
                OpCode::LoadParam(idx) => params.get(idx).copied().unwrap_or(f64::NAN),
                OpCode::Neg => -pop(stack),
                OpCode::Call(func) => func.eval(pop(stack)),
                OpCode::Add => {
                    let (a, b) = pop_pair(stack);
                    a + b
                }
                OpCode::Sub => {
                    let (a, b) = pop_pair(stack);
                    a - b
                }
                OpCode::Mul => {
                    let (a, b) = pop_pair(stack);
                    a * b
                }
                OpCode::Div => {
                    let (a, b) = pop_pair(stack);
                    a / b
                }
                OpCode::Pow => {
                    let (a, b) = pop_pair(stack);
                    a.powf(b)
                }
            };
            stack.push(value);
        }

        pop(stack)
    }
}

fn pop(stack: &mut Vec<f64>) -> f64 {
    stack.pop().unwrap_or(f64::NAN)
}

/// Pops top two values (b, a) and returns them as (a, b).
fn pop_pair(stack: &mut Vec<f64>) -> (f64, f64) {
    let b = pop(stack);
    let a = pop(stack);
    (a, b)
}

// --- AST & Parser ---

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Name(String),
    Binary(Box<Expr>, BinaryOp, Box<Expr>),
    Neg(Box<Expr>),
    Call(String, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

/// Resolves names in an `Expr` to the state variable or parameter slots.
pub struct Compiler {
    var_name: String,
    param_map: HashMap<String, usize>,
}

impl Compiler {
    pub fn new(var_name: &str, param_names: &[String]) -> Self {
        let param_map = param_names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        Self {
            var_name: var_name.to_string(),
            param_map,
        }
    }

    pub fn compile(&self, expr: &Expr) -> Result<Bytecode, EquationError> {
        let mut ops = Vec::new();
        self.compile_recursive(expr, &mut ops)?;
        Ok(Bytecode { ops })
    }

    fn compile_recursive(&self, expr: &Expr, ops: &mut Vec<OpCode>) -> Result<(), EquationError> {
        match expr {
            Expr::Number(n) => ops.push(OpCode::LoadConst(*n)),
            Expr::Name(name) if *name == self.var_name => ops.push(OpCode::LoadVar),
            Expr::Name(name) => match self.param_map.get(name) {
                Some(&idx) => ops.push(OpCode::LoadParam(idx)),
                None => return Err(EquationError::UnknownName(name.clone())),
            },
            Expr::Binary(left, op, right) => {
                self.compile_recursive(left, ops)?;
                self.compile_recursive(right, ops)?;
                ops.push(match op {
                    BinaryOp::Add => OpCode::Add,
                    BinaryOp::Sub => OpCode::Sub,
                    BinaryOp::Mul => OpCode::Mul,
                    BinaryOp::Div => OpCode::Div,
                    BinaryOp::Pow => OpCode::Pow,
                });
            }
            Expr::Neg(operand) => {
                self.compile_recursive(operand, ops)?;
                ops.push(OpCode::Neg);
            }
            Expr::Call(name, arg) => {
                let func = Function::from_name(name)
                    .ok_or_else(|| EquationError::UnknownFunction(name.clone()))?;
                self.compile_recursive(arg, ops)?;
                ops.push(OpCode::Call(func));
            }
        }
        Ok(())
    }
}

/// Parses an infix expression.
///
/// Precedence from loosest: `+ -`, `* /`, unary minus, `^` (right
/// associative), then numbers, names, calls and parentheses.
pub fn parse(input: &str) -> Result<Expr, EquationError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_sum()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(EquationError::UnexpectedToken(format!("{token:?}"))),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Identifier(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, EquationError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c.is_ascii_digit() || c == '.' {
            let mut literal = String::new();
            while let Some(&d) = chars.peek() {
                let exponent_sign =
                    (d == '-' || d == '+') && literal.ends_with(|e: char| e == 'e' || e == 'E');
                if d.is_ascii_digit() || d == '.' || d == 'e' || d == 'E' || exponent_sign {
                    literal.push(d);
                    chars.next();
                } else {
                    break;
                }
            }
            let value = literal
                .parse()
                .map_err(|_| EquationError::InvalidNumber(literal.clone()))?;
            tokens.push(Token::Number(value));
        } else if c.is_alphabetic() || c == '_' {
            let mut ident = String::new();
            while let Some(&d) = chars.peek() {
                if d.is_alphanumeric() || d == '_' {
                    ident.push(d);
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token::Identifier(ident));
        } else {
            tokens.push(match c {
                '+' => Token::Plus,
                '-' => Token::Minus,
                '*' => Token::Star,
                '/' => Token::Slash,
                '^' => Token::Caret,
                '(' => Token::LParen,
                ')' => Token::RParen,
                other => return Err(EquationError::UnexpectedChar(other)),
            });
            chars.next();
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn consume(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn parse_sum(&mut self) -> Result<Expr, EquationError> {
        let mut left = self.parse_product()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.consume();
            let right = self.parse_product()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn parse_product(&mut self) -> Result<Expr, EquationError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => break,
            };
            self.consume();
            let right = self.parse_unary()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, EquationError> {
        if let Some(Token::Minus) = self.peek() {
            self.consume();
            let operand = self.parse_unary()?;
            return Ok(Expr::Neg(Box::new(operand)));
        }
        self.parse_power()
    }

    fn parse_power(&mut self) -> Result<Expr, EquationError> {
        let base = self.parse_primary()?;
        if let Some(Token::Caret) = self.peek() {
            self.consume();
            // -x^2 == -(x^2), but x^-2 is allowed.
            let exponent = self.parse_unary()?;
            return Ok(Expr::Binary(Box::new(base), BinaryOp::Pow, Box::new(exponent)));
        }
        Ok(base)
    }

    fn parse_primary(&mut self) -> Result<Expr, EquationError> {
        match self.consume() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Identifier(name)) => {
                if let Some(Token::LParen) = self.peek() {
                    self.consume();
                    let arg = self.parse_sum()?;
                    self.expect_rparen()?;
                    Ok(Expr::Call(name, Box::new(arg)))
                } else {
                    Ok(Expr::Name(name))
                }
            }
            Some(Token::LParen) => {
                let expr = self.parse_sum()?;
                self.expect_rparen()?;
                Ok(expr)
            }
            Some(token) => Err(EquationError::UnexpectedToken(format!("{token:?}"))),
            None => Err(EquationError::UnexpectedEnd),
        }
    }

    fn expect_rparen(&mut self) -> Result<(), EquationError> {
        match self.consume() {
            Some(Token::RParen) => Ok(()),
            _ => Err(EquationError::UnclosedParen),
        }
    }
}

// --- Equation ---

/// A compiled one-variable expression with bound parameter values.
///
/// Parameters play the role of extra arguments to the map or derivative:
/// `r * x * (1 - x)` with `r = 2.5` is the logistic map.
pub struct Equation {
    code: Bytecode,
    params: Vec<f64>,
    // Interior mutability for VM stack to avoid allocation in apply.
    // This makes the equation !Sync.
    stack: RefCell<Vec<f64>>,
}

impl Equation {
    pub fn new(code: Bytecode, params: Vec<f64>) -> Self {
        Self {
            code,
            params,
            stack: RefCell::new(Vec::with_capacity(16)),
        }
    }

    pub fn compile(
        source: &str,
        var_name: &str,
        param_names: &[String],
        params: Vec<f64>,
    ) -> Result<Self, EquationError> {
        if param_names.len() != params.len() {
            return Err(EquationError::ParamCountMismatch {
                names: param_names.len(),
                values: params.len(),
            });
        }
        let expr = parse(source)?;
        let code = Compiler::new(var_name, param_names).compile(&expr)?;
        Ok(Self::new(code, params))
    }

    pub fn params(&self) -> &[f64] {
        &self.params
    }

    /// Replaces the bound values. The count must match the parameters the
    /// equation was built with.
    pub fn set_params(&mut self, params: Vec<f64>) -> Result<(), EquationError> {
        if params.len() != self.params.len() {
            return Err(EquationError::ParamCountMismatch {
                names: self.params.len(),
                values: params.len(),
            });
        }
        self.params = params;
        Ok(())
    }
}

impl ScalarMap for Equation {
    fn apply(&self, x: f64) -> f64 {
        let mut stack = self.stack.borrow_mut();
        VM::execute(&self.code, x, &self.params, &mut stack)
    }
}
