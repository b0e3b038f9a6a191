//! Software evaluator for the shader subset the assembler emits.
//!
//! Covers uniform and sampler declarations, helper functions, scoped local
//! declarations, swizzled assignments, `if`/`else`, vector and matrix
//! constructors, the arithmetic built-ins and nearest/linear texture
//! lookups. GLSL and Cg spellings are both accepted. All arithmetic runs
//! in `f32`, like the hardware the shader targets.

use std::collections::HashMap;
use std::fmt;
use vfx_colorops::gpu::{GpuShaderCreator, GpuTexture, TextureDimensions};
use vfx_lut::Interpolation;

// ============================================================================
// Values
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Scalar(f32),
    Vector(Vec<f32>),
    /// Columns.
    Matrix([[f32; 4]; 4]),
}

impl Value {
    fn scalar(&self) -> Result<f32, String> {
        match self {
            Value::Scalar(v) => Ok(*v),
            Value::Vector(v) if v.len() == 1 => Ok(v[0]),
            other => Err(format!("expected a scalar, found {other:?}")),
        }
    }

    fn truth(&self) -> Result<bool, String> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(format!("expected a condition, found {other:?}")),
        }
    }

    fn components(&self) -> Result<Vec<f32>, String> {
        match self {
            Value::Scalar(v) => Ok(vec![*v]),
            Value::Vector(v) => Ok(v.clone()),
            other => Err(format!("expected a scalar or vector, found {other:?}")),
        }
    }

    fn from_components(mut c: Vec<f32>) -> Value {
        if c.len() == 1 { Value::Scalar(c.remove(0)) } else { Value::Vector(c) }
    }
}

/// Applies `f` per component, broadcasting scalars against vectors.
fn zip2(a: &Value, b: &Value, f: impl Fn(f32, f32) -> f32) -> Result<Value, String> {
    let (x, y) = (a.components()?, b.components()?);
    let n = x.len().max(y.len());
    if x.len() != n && x.len() != 1 || y.len() != n && y.len() != 1 {
        return Err(format!("size mismatch: {} vs {}", x.len(), y.len()));
    }
    let at = |v: &[f32], i: usize| if v.len() == 1 { v[0] } else { v[i] };
    Ok(Value::from_components((0..n).map(|i| f(at(&x, i), at(&y, i))).collect()))
}

fn zip3(a: &Value, b: &Value, c: &Value, f: impl Fn(f32, f32, f32) -> f32) -> Result<Value, String> {
    let (x, y, z) = (a.components()?, b.components()?, c.components()?);
    let n = x.len().max(y.len()).max(z.len());
    for v in [&x, &y, &z] {
        if v.len() != n && v.len() != 1 {
            return Err(format!("size mismatch in ternary built-in: {} vs {n}", v.len()));
        }
    }
    let at = |v: &[f32], i: usize| if v.len() == 1 { v[0] } else { v[i] };
    Ok(Value::from_components(
        (0..n).map(|i| f(at(&x, i), at(&y, i), at(&z, i))).collect(),
    ))
}

fn map1(a: &Value, f: impl Fn(f32) -> f32) -> Result<Value, String> {
    Ok(Value::from_components(a.components()?.into_iter().map(f).collect()))
}

fn swizzle_index(c: char) -> Result<usize, String> {
    match c {
        'x' | 'r' => Ok(0),
        'y' | 'g' => Ok(1),
        'z' | 'b' => Ok(2),
        'w' | 'a' => Ok(3),
        _ => Err(format!("bad swizzle component {c}")),
    }
}

// ============================================================================
// Lexer
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Number(f32),
    Punct(&'static str),
}

const PUNCTS: [&str; 21] = [
    "==", "!=", "<=", ">=", "&&", "||", "+", "-", "*", "/", "(", ")", "{", "}", ",", ";", "=",
    ".", "<", ">", "!",
];

fn tokenize(src: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            tokens.push(Token::Ident(chars[start..i].iter().collect()));
        } else if c.is_ascii_digit()
            || (c == '.' && chars.get(i + 1).is_some_and(|d| d.is_ascii_digit()))
        {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                i += 1;
                if i < chars.len() && (chars[i] == '-' || chars[i] == '+') {
                    i += 1;
                }
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
            }
            let text: String = chars[start..i].iter().collect();
            let value = text
                .parse::<f32>()
                .map_err(|e| format!("bad number {text}: {e}"))?;
            tokens.push(Token::Number(value));
        } else {
            let rest: String = chars[i..chars.len().min(i + 2)].iter().collect();
            let punct = PUNCTS
                .iter()
                .find(|p| rest.starts_with(**p))
                .ok_or_else(|| format!("unexpected character {c:?}"))?;
            tokens.push(Token::Punct(*punct));
            i += punct.len();
        }
    }
    Ok(tokens)
}

// ============================================================================
// Syntax tree
// ============================================================================

#[derive(Debug, Clone)]
enum Expr {
    Num(f32),
    Var(String),
    Neg(Box<Expr>),
    Not(Box<Expr>),
    Binary(&'static str, Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
    Swizzle(Box<Expr>, String),
}

#[derive(Debug, Clone)]
enum Stmt {
    Decl(String, Expr),
    Assign(String, Option<String>, Expr),
    If(Expr, Vec<Stmt>, Option<Vec<Stmt>>),
    Block(Vec<Stmt>),
    Return(Expr),
}

#[derive(Debug, Clone)]
struct Function {
    params: Vec<String>,
    body: Vec<Stmt>,
}

const TYPES: [&str; 10] = [
    "float", "vec2", "vec3", "vec4", "mat4", "float2", "float3", "float4", "float4x4", "bool",
];

fn is_type(name: &str) -> bool {
    TYPES.contains(&name)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Result<Token, String> {
        let t = self.tokens.get(self.pos).cloned().ok_or("unexpected end of shader")?;
        self.pos += 1;
        Ok(t)
    }

    fn is_punct(&self, p: &str) -> bool {
        matches!(self.peek(), Some(Token::Punct(q)) if *q == p)
    }

    fn eat(&mut self, p: &str) -> bool {
        if self.is_punct(p) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, p: &str) -> Result<(), String> {
        if self.eat(p) {
            Ok(())
        } else {
            Err(format!("expected {p:?}, found {:?}", self.peek()))
        }
    }

    fn ident(&mut self) -> Result<String, String> {
        match self.next()? {
            Token::Ident(s) => Ok(s),
            other => Err(format!("expected identifier, found {other:?}")),
        }
    }

    fn is_ident(&self, name: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(s)) if s == name)
    }

    // statements

    fn block(&mut self) -> Result<Vec<Stmt>, String> {
        self.expect("{")?;
        let mut stmts = Vec::new();
        while !self.eat("}") {
            stmts.push(self.statement()?);
        }
        Ok(stmts)
    }

    fn branch(&mut self) -> Result<Vec<Stmt>, String> {
        if self.is_punct("{") {
            self.block()
        } else {
            Ok(vec![self.statement()?])
        }
    }

    fn statement(&mut self) -> Result<Stmt, String> {
        if self.is_punct("{") {
            return Ok(Stmt::Block(self.block()?));
        }
        if self.is_ident("if") {
            self.pos += 1;
            self.expect("(")?;
            let cond = self.expr()?;
            self.expect(")")?;
            let then = self.branch()?;
            let otherwise = if self.is_ident("else") {
                self.pos += 1;
                Some(self.branch()?)
            } else {
                None
            };
            return Ok(Stmt::If(cond, then, otherwise));
        }
        if self.is_ident("return") {
            self.pos += 1;
            let e = self.expr()?;
            self.expect(";")?;
            return Ok(Stmt::Return(e));
        }
        let first = self.ident()?;
        if is_type(&first) {
            let name = self.ident()?;
            self.expect("=")?;
            let e = self.expr()?;
            self.expect(";")?;
            return Ok(Stmt::Decl(name, e));
        }
        let swizzle = if self.eat(".") { Some(self.ident()?) } else { None };
        self.expect("=")?;
        let e = self.expr()?;
        self.expect(";")?;
        Ok(Stmt::Assign(first, swizzle, e))
    }

    // expressions, lowest precedence first

    fn expr(&mut self) -> Result<Expr, String> {
        self.binary_level(0)
    }

    fn binary_level(&mut self, level: usize) -> Result<Expr, String> {
        const LEVELS: [&[&str]; 6] = [
            &["||"],
            &["&&"],
            &["==", "!="],
            &["<", ">", "<=", ">="],
            &["+", "-"],
            &["*", "/"],
        ];
        if level == LEVELS.len() {
            return self.unary();
        }
        let mut lhs = self.binary_level(level + 1)?;
        loop {
            let op = LEVELS[level].iter().find(|op| self.is_punct(op)).copied();
            let Some(op) = op else { break };
            self.pos += 1;
            let rhs = self.binary_level(level + 1)?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, String> {
        if self.eat("-") {
            return Ok(Expr::Neg(Box::new(self.unary()?)));
        }
        if self.eat("!") {
            return Ok(Expr::Not(Box::new(self.unary()?)));
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr, String> {
        let mut e = self.primary()?;
        while self.eat(".") {
            e = Expr::Swizzle(Box::new(e), self.ident()?);
        }
        Ok(e)
    }

    fn primary(&mut self) -> Result<Expr, String> {
        match self.next()? {
            Token::Number(v) => Ok(Expr::Num(v)),
            Token::Punct("(") => {
                let e = self.expr()?;
                self.expect(")")?;
                Ok(e)
            }
            Token::Ident(name) => {
                if self.eat("(") {
                    let mut args = Vec::new();
                    if !self.eat(")") {
                        loop {
                            args.push(self.expr()?);
                            if self.eat(")") {
                                break;
                            }
                            self.expect(",")?;
                        }
                    }
                    Ok(Expr::Call(name, args))
                } else {
                    Ok(Expr::Var(name))
                }
            }
            other => Err(format!("unexpected token {other:?}")),
        }
    }
}

// ============================================================================
// Program
// ============================================================================

/// A parsed shader bound to the textures and uniform values of its creator.
pub struct Shader {
    entry: String,
    functions: HashMap<String, Function>,
    textures: HashMap<String, GpuTexture>,
    uniforms: HashMap<String, f32>,
}

impl fmt::Debug for Shader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shader")
            .field("entry", &self.entry)
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .field("textures", &self.textures.keys().collect::<Vec<_>>())
            .field("uniforms", &self.uniforms)
            .finish()
    }
}

enum Flow {
    Next,
    Return(Value),
}

impl Shader {
    /// Parses the creator's text; uniforms take their current values.
    pub fn from_creator(creator: &GpuShaderCreator) -> Result<Self, String> {
        let mut shader = Self::parse(creator.shader_text(), creator.function_name())?;
        for t in creator.textures() {
            if !shader.textures.contains_key(&t.name) {
                return Err(format!("texture {} has no sampler declaration", t.name));
            }
            shader.textures.insert(t.name.clone(), t.clone());
        }
        for u in creator.uniforms() {
            if !shader.uniforms.contains_key(&u.name) {
                return Err(format!("uniform {} is not declared", u.name));
            }
            shader.uniforms.insert(u.name.clone(), u.value() as f32);
        }
        Ok(shader)
    }

    fn parse(text: &str, entry: &str) -> Result<Self, String> {
        let mut p = Parser {
            tokens: tokenize(text)?,
            pos: 0,
        };
        let mut shader = Shader {
            entry: entry.to_string(),
            functions: HashMap::new(),
            textures: HashMap::new(),
            uniforms: HashMap::new(),
        };
        while p.peek().is_some() {
            if p.is_ident("uniform") {
                p.pos += 1;
                let ty = p.ident()?;
                let name = p.ident()?;
                p.expect(";")?;
                match ty.as_str() {
                    "sampler2D" | "sampler3D" => {
                        // placeholder until the creator's texture is bound
                        shader.textures.insert(
                            name.clone(),
                            GpuTexture {
                                name,
                                dimensions: if ty == "sampler2D" {
                                    TextureDimensions::Tex2D
                                } else {
                                    TextureDimensions::Tex3D
                                },
                                width: 0,
                                height: 0,
                                depth: 0,
                                channels: 0,
                                interpolation: Interpolation::Nearest,
                                data: Vec::new(),
                            },
                        );
                    }
                    "float" => {
                        shader.uniforms.insert(name, 0.0);
                    }
                    other => return Err(format!("unsupported uniform type {other}")),
                }
                continue;
            }
            let ret = p.ident()?;
            if !is_type(&ret) {
                return Err(format!("expected a return type, found {ret}"));
            }
            let name = p.ident()?;
            p.expect("(")?;
            let mut params = Vec::new();
            if !p.eat(")") {
                loop {
                    let ty = p.ident()?;
                    if !is_type(&ty) {
                        return Err(format!("bad parameter type {ty}"));
                    }
                    params.push(p.ident()?);
                    if p.eat(")") {
                        break;
                    }
                    p.expect(",")?;
                }
            }
            let body = p.block()?;
            shader.functions.insert(name, Function { params, body });
        }
        if !shader.functions.contains_key(entry) {
            return Err(format!("entry function {entry} not found"));
        }
        Ok(shader)
    }

    /// Number of texture samplers declared.
    pub fn sampler_count(&self) -> usize {
        self.textures.len()
    }

    /// Runs the entry function on one RGBA pixel.
    pub fn eval(&self, pixel: [f32; 4]) -> Result<[f32; 4], String> {
        let arg = Value::Vector(pixel.to_vec());
        let out = self.call_user(&self.entry, vec![arg])?.components()?;
        out.try_into()
            .map_err(|v: Vec<f32>| format!("entry returned {} components", v.len()))
    }

    fn call_user(&self, name: &str, args: Vec<Value>) -> Result<Value, String> {
        let f = &self.functions[name];
        if f.params.len() != args.len() {
            return Err(format!("{name} takes {} arguments", f.params.len()));
        }
        let mut scopes = vec![f.params.iter().cloned().zip(args).collect::<HashMap<_, _>>()];
        match self.run_block(&f.body, &mut scopes)? {
            Flow::Return(v) => Ok(v),
            Flow::Next => Err(format!("{name} does not return")),
        }
    }

    fn run_block(
        &self,
        stmts: &[Stmt],
        scopes: &mut Vec<HashMap<String, Value>>,
    ) -> Result<Flow, String> {
        scopes.push(HashMap::new());
        let mut flow = Flow::Next;
        for s in stmts {
            flow = self.run(s, scopes)?;
            if matches!(flow, Flow::Return(_)) {
                break;
            }
        }
        scopes.pop();
        Ok(flow)
    }

    fn run(&self, stmt: &Stmt, scopes: &mut Vec<HashMap<String, Value>>) -> Result<Flow, String> {
        match stmt {
            Stmt::Decl(name, e) => {
                let v = self.eval_expr(e, scopes)?;
                let top = scopes.last_mut().ok_or("no scope")?;
                if top.contains_key(name) {
                    return Err(format!("{name} redeclared in the same scope"));
                }
                top.insert(name.clone(), v);
            }
            Stmt::Assign(name, swizzle, e) => {
                let v = self.eval_expr(e, scopes)?;
                let slot = scopes
                    .iter_mut()
                    .rev()
                    .find_map(|s| s.get_mut(name))
                    .ok_or_else(|| format!("assignment to undeclared {name}"))?;
                match swizzle {
                    None => *slot = v,
                    Some(sw) => {
                        let Value::Vector(target) = slot else {
                            return Err(format!("swizzled assignment to non-vector {name}"));
                        };
                        let src = v.components()?;
                        if src.len() != sw.len() {
                            return Err(format!("{name}.{sw} assigned {} components", src.len()));
                        }
                        for (c, value) in sw.chars().zip(src) {
                            let i = swizzle_index(c)?;
                            *target.get_mut(i).ok_or("swizzle out of range")? = value;
                        }
                    }
                }
            }
            Stmt::If(cond, then, otherwise) => {
                if self.eval_expr(cond, scopes)?.truth()? {
                    return self.run_block(then, scopes);
                } else if let Some(o) = otherwise {
                    return self.run_block(o, scopes);
                }
            }
            Stmt::Block(b) => return self.run_block(b, scopes),
            Stmt::Return(e) => return Ok(Flow::Return(self.eval_expr(e, scopes)?)),
        }
        Ok(Flow::Next)
    }

    fn eval_expr(&self, e: &Expr, scopes: &[HashMap<String, Value>]) -> Result<Value, String> {
        Ok(match e {
            Expr::Num(v) => Value::Scalar(*v),
            Expr::Var(name) => {
                if let Some(v) = scopes.iter().rev().find_map(|s| s.get(name)) {
                    v.clone()
                } else if let Some(u) = self.uniforms.get(name) {
                    Value::Scalar(*u)
                } else {
                    return Err(format!("unknown variable {name}"));
                }
            }
            Expr::Neg(a) => map1(&self.eval_expr(a, scopes)?, |x| -x)?,
            Expr::Not(a) => Value::Bool(!self.eval_expr(a, scopes)?.truth()?),
            Expr::Swizzle(a, sw) => {
                let v = self.eval_expr(a, scopes)?.components()?;
                let picked = sw
                    .chars()
                    .map(|c| {
                        swizzle_index(c).and_then(|i| {
                            v.get(i).copied().ok_or_else(|| format!("swizzle .{sw} out of range"))
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Value::from_components(picked)
            }
            Expr::Binary(op, a, b) => {
                let (a, b) = (self.eval_expr(a, scopes)?, self.eval_expr(b, scopes)?);
                self.binary(op, &a, &b)?
            }
            Expr::Call(name, args) if is_texture_fn(name) => {
                let [Expr::Var(sampler), coords] = args.as_slice() else {
                    return Err(format!("{name} expects a sampler and coordinates"));
                };
                let tex = self
                    .textures
                    .get(sampler)
                    .ok_or_else(|| format!("unknown sampler {sampler}"))?;
                let coords = self.eval_expr(coords, scopes)?.components()?;
                Value::Vector(sample(name, tex, &coords)?)
            }
            Expr::Call(name, args) => {
                let args = args
                    .iter()
                    .map(|a| self.eval_expr(a, scopes))
                    .collect::<Result<Vec<_>, _>>()?;
                if self.functions.contains_key(name.as_str()) {
                    self.call_user(name, args)?
                } else {
                    self.builtin(name, &args)?
                }
            }
        })
    }

    fn binary(&self, op: &str, a: &Value, b: &Value) -> Result<Value, String> {
        if op == "*" {
            if let (Value::Matrix(cols), Value::Vector(v)) = (a, b) {
                return mat_vec(cols, v);
            }
        }
        let cmp = |f: fn(f32, f32) -> bool| -> Result<Value, String> {
            Ok(Value::Bool(f(a.scalar()?, b.scalar()?)))
        };
        match op {
            "+" => zip2(a, b, |x, y| x + y),
            "-" => zip2(a, b, |x, y| x - y),
            "*" => zip2(a, b, |x, y| x * y),
            "/" => zip2(a, b, |x, y| x / y),
            "<" => cmp(|x, y| x < y),
            ">" => cmp(|x, y| x > y),
            "<=" => cmp(|x, y| x <= y),
            ">=" => cmp(|x, y| x >= y),
            "==" => cmp(|x, y| x == y),
            "!=" => cmp(|x, y| x != y),
            "&&" => Ok(Value::Bool(a.truth()? && b.truth()?)),
            "||" => Ok(Value::Bool(a.truth()? || b.truth()?)),
            other => Err(format!("unsupported operator {other}")),
        }
    }

    fn builtin(&self, name: &str, args: &[Value]) -> Result<Value, String> {
        let arity = |n: usize| -> Result<(), String> {
            if args.len() == n {
                Ok(())
            } else {
                Err(format!("{name} takes {n} arguments, got {}", args.len()))
            }
        };
        match name {
            "float" => {
                arity(1)?;
                Ok(Value::Scalar(args[0].scalar()?))
            }
            "vec2" | "vec3" | "vec4" | "float2" | "float3" | "float4" => {
                let n = name
                    .chars()
                    .last()
                    .and_then(|c| c.to_digit(10))
                    .ok_or("bad vector type")? as usize;
                let mut c = Vec::with_capacity(n);
                for a in args {
                    c.extend(a.components()?);
                }
                if c.len() == 1 {
                    c = vec![c[0]; n];
                }
                if c.len() != n {
                    return Err(format!("{name} built from {} components", c.len()));
                }
                Ok(Value::Vector(c))
            }
            "mat4" | "float4x4" => {
                let mut c = Vec::with_capacity(16);
                for a in args {
                    c.extend(a.components()?);
                }
                if c.len() != 16 {
                    return Err(format!("{name} built from {} components", c.len()));
                }
                let mut m = [[0.0f32; 4]; 4];
                for (i, v) in c.into_iter().enumerate() {
                    if name == "mat4" {
                        m[i / 4][i % 4] = v;
                    } else {
                        // float4x4 lists rows
                        m[i % 4][i / 4] = v;
                    }
                }
                Ok(Value::Matrix(m))
            }
            "mul" => {
                arity(2)?;
                match (&args[0], &args[1]) {
                    (Value::Matrix(cols), Value::Vector(v)) => mat_vec(cols, v),
                    _ => Err("mul expects a matrix and a vector".into()),
                }
            }
            "abs" => {
                arity(1)?;
                map1(&args[0], f32::abs)
            }
            "sign" => {
                arity(1)?;
                map1(&args[0], |x| {
                    if x > 0.0 {
                        1.0
                    } else if x < 0.0 {
                        -1.0
                    } else {
                        0.0
                    }
                })
            }
            "floor" => {
                arity(1)?;
                map1(&args[0], f32::floor)
            }
            "fract" | "frac" => {
                arity(1)?;
                map1(&args[0], |x| x - x.floor())
            }
            "exp" => {
                arity(1)?;
                map1(&args[0], f32::exp)
            }
            "exp2" => {
                arity(1)?;
                map1(&args[0], f32::exp2)
            }
            "log" => {
                arity(1)?;
                map1(&args[0], f32::ln)
            }
            "log2" => {
                arity(1)?;
                map1(&args[0], f32::log2)
            }
            "pow" => {
                arity(2)?;
                zip2(&args[0], &args[1], f32::powf)
            }
            // GLSL min/max return the other operand for a NaN argument
            // on most hardware; f32::min/max do the same.
            "min" => {
                arity(2)?;
                zip2(&args[0], &args[1], f32::min)
            }
            "max" => {
                arity(2)?;
                zip2(&args[0], &args[1], f32::max)
            }
            "clamp" => {
                arity(3)?;
                zip3(&args[0], &args[1], &args[2], |x, lo, hi| x.max(lo).min(hi))
            }
            "step" => {
                arity(2)?;
                zip2(&args[0], &args[1], |edge, x| if x < edge { 0.0 } else { 1.0 })
            }
            "mix" | "lerp" => {
                arity(3)?;
                zip3(&args[0], &args[1], &args[2], |a, b, t| a + (b - a) * t)
            }
            "dot" => {
                arity(2)?;
                let (a, b) = (args[0].components()?, args[1].components()?);
                if a.len() != b.len() {
                    return Err("dot of different sizes".into());
                }
                Ok(Value::Scalar(a.iter().zip(&b).map(|(x, y)| x * y).sum()))
            }
            other => Err(format!("unsupported built-in {other}")),
        }
    }
}

fn mat_vec(cols: &[[f32; 4]; 4], v: &[f32]) -> Result<Value, String> {
    if v.len() != 4 {
        return Err(format!("matrix times vector of {}", v.len()));
    }
    let mut out = vec![0.0f32; 4];
    for (c, col) in cols.iter().enumerate() {
        for (r, o) in out.iter_mut().enumerate() {
            *o += col[r] * v[c];
        }
    }
    Ok(Value::Vector(out))
}

// ============================================================================
// Textures
// ============================================================================

fn is_texture_fn(name: &str) -> bool {
    matches!(name, "texture" | "texture2D" | "texture3D" | "tex2D" | "tex3D")
}

/// Filtered lookup with clamp-to-edge addressing; texel centers sit at
/// `(i + 0.5) / size`.
fn sample(func: &str, tex: &GpuTexture, coords: &[f32]) -> Result<Vec<f32>, String> {
    let dims = match tex.dimensions {
        TextureDimensions::Tex2D => 2,
        TextureDimensions::Tex3D => 3,
    };
    let expected = match func {
        "texture2D" | "tex2D" => 2,
        "texture3D" | "tex3D" => 3,
        _ => dims,
    };
    if expected != dims || coords.len() != dims {
        return Err(format!(
            "{func} on a {dims}D texture {} with {} coordinates",
            tex.name,
            coords.len()
        ));
    }
    if tex.data.is_empty() {
        return Err(format!("texture {} has no data", tex.name));
    }
    let size = [tex.width, tex.height, tex.depth];
    let mut out = vec![0.0f32; tex.channels];
    match tex.interpolation {
        Interpolation::Nearest => {
            let mut idx = [0isize; 3];
            for d in 0..dims {
                idx[d] = (coords[d] * size[d] as f32).floor() as isize;
            }
            out.copy_from_slice(tex.texel(idx[0], idx[1], idx[2]));
        }
        _ => {
            let mut base = [0isize; 3];
            let mut frac = [0.0f32; 3];
            for d in 0..dims {
                let x = coords[d] * size[d] as f32 - 0.5;
                let f = x.floor();
                base[d] = f as isize;
                frac[d] = x - f;
            }
            let corners = 1usize << dims;
            for corner in 0..corners {
                let mut weight = 1.0f32;
                let mut idx = base;
                for d in 0..dims {
                    if corner >> d & 1 == 1 {
                        idx[d] += 1;
                        weight *= frac[d];
                    } else {
                        weight *= 1.0 - frac[d];
                    }
                }
                if weight == 0.0 {
                    continue;
                }
                for (o, v) in out.iter_mut().zip(tex.texel(idx[0], idx[1], idx[2])) {
                    *o += weight * v;
                }
            }
        }
    }
    out.resize(4, 1.0);
    Ok(out)
}
