//! Tree‑walking evaluator.
//!
//! Statements produce a [`Flow`] so that `return`, `break` and `continue`
//! travel up the Rust stack as ordinary values; only genuine failures use the
//! `Err` side of [`Result`].

use std::cell::RefCell;
use std::collections::HashMap;
use std::mem;
use std::rc::Rc;

use log::{debug, info, trace};

use crate::environment::{EnvRef, Environment};
use crate::error::{LoxError, Result};
use crate::expr::{Expr, ExprId, ExprKind, LiteralValue};
use crate::native;
use crate::resolver::Bindings;
use crate::stack::ensure_sufficient_stack;
use crate::stmt::{FunctionDecl, Stmt};
use crate::token::{Token, TokenType};
use crate::value::{LoxClass, LoxFunction, LoxInstance, NativeFunction, Value};

/// Deepest chain of nested Lox calls before giving up with "Stack overflow.".
/// The native stack grows on demand, so this only bounds runaway recursion.
const MAX_CALL_DEPTH: usize = 5_000;

/// Outcome of executing one statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal,
    Return(Value),
    Break,
    Continue,
}

/// Receives every line the program prints.
pub type OutputSink = Box<dyn FnMut(&str)>;

pub struct Interpreter {
    globals: EnvRef,
    environment: EnvRef,
    /// Distances for every resolved unit run so far.
    locals: Bindings,
    output: OutputSink,
    call_depth: usize,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Interpreter printing to stdout.
    pub fn new() -> Self {
        Self::with_output(|line: &str| println!("{}", line))
    }

    /// Interpreter handing each printed line to `sink`.
    pub fn with_output<F>(sink: F) -> Self
    where
        F: FnMut(&str) + 'static,
    {
        info!("Initializing Interpreter");

        let globals: EnvRef = Rc::new(RefCell::new(Environment::new()));

        let mut interpreter = Interpreter {
            environment: Rc::clone(&globals),
            globals,
            locals: Bindings::default(),
            output: Box::new(sink),
            call_depth: 0,
        };

        for builtin in native::builtins() {
            interpreter.define_native(builtin);
        }

        interpreter
    }

    pub fn define_native(&mut self, native: NativeFunction) {
        debug!("Defining native function '{}'", native.name);

        self.globals
            .borrow_mut()
            .define(native.name, Value::Native(Rc::new(native)));
    }

    /// Adopt the resolver's distances for code about to run.
    pub fn add_bindings(&mut self, bindings: Bindings) {
        self.locals.extend(bindings);
    }

    /// Every name currently bound in the global environment.
    pub fn global_names(&self) -> Vec<String> {
        self.globals
            .borrow()
            .names()
            .map(str::to_string)
            .collect()
    }

    /// Evaluate a lone expression and print its value unless it is `nil`.
    pub fn interpret_single(&mut self, expr: &Expr) -> Result<()> {
        let value: Value = self.evaluate(expr)?;
        self.echo(&value);
        Ok(())
    }

    /// Run a program.  Top‑level expression statements echo their value.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<()> {
        debug!("Interpreting {} statements", statements.len());

        for stmt in statements {
            match stmt {
                Stmt::Expression(expr) => {
                    let value: Value = self.evaluate(expr)?;
                    self.echo(&value);
                }
                _ => {
                    // break/continue/return cannot escape a resolved program
                    self.execute(stmt)?;
                }
            }
        }

        info!("Interpretation completed successfully");
        Ok(())
    }

    fn echo(&mut self, value: &Value) {
        if *value != Value::Nil {
            self.emit(&value.to_string());
        }
    }

    fn emit(&mut self, line: &str) {
        (self.output)(line);
    }

    // ── statements ──────────────────────────────────────────────────────────

    pub fn execute(&mut self, stmt: &Stmt) -> Result<Flow> {
        ensure_sufficient_stack(|| self.execute_stmt(stmt))
    }

    fn execute_stmt(&mut self, stmt: &Stmt) -> Result<Flow> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(Flow::Normal)
            }

            Stmt::Print(expr) => {
                let value: Value = self.evaluate(expr)?;
                self.emit(&value.to_string());
                Ok(Flow::Normal)
            }

            Stmt::Var { name, initializer } => {
                let value: Value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("Defining variable '{}' = {}", name.lexeme, value);

                self.environment.borrow_mut().define(&name.lexeme, value);
                Ok(Flow::Normal)
            }

            Stmt::Block(statements) => {
                let env: EnvRef = Environment::child_of(&self.environment);
                self.execute_block(statements, env)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_stmt) = else_branch {
                    self.execute(else_stmt)
                } else {
                    Ok(Flow::Normal)
                }
            }

            Stmt::While {
                condition,
                body,
                increment,
            } => {
                while self.evaluate(condition)?.is_truthy() {
                    match self.execute(body)? {
                        Flow::Break => break,
                        Flow::Normal | Flow::Continue => {}
                        ret @ Flow::Return(_) => return Ok(ret),
                    }

                    if let Some(inc) = increment {
                        self.evaluate(inc)?;
                    }
                }

                Ok(Flow::Normal)
            }

            Stmt::Function(decl) => {
                debug!("Defining function '{}'", decl.name());

                let function = LoxFunction::new(Rc::clone(decl), Rc::clone(&self.environment), false);

                self.environment
                    .borrow_mut()
                    .define(decl.name(), Value::Function(Rc::new(function)));
                Ok(Flow::Normal)
            }

            Stmt::Return { value, .. } => {
                let value: Value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                Ok(Flow::Return(value))
            }

            Stmt::Class {
                name,
                superclass,
                methods,
                static_methods,
            } => {
                self.declare_class(name, superclass.as_ref(), methods, static_methods)?;
                Ok(Flow::Normal)
            }

            Stmt::Break(_) => Ok(Flow::Break),

            Stmt::Continue(_) => Ok(Flow::Continue),
        }
    }

    /// Run `statements` inside `env`, restoring the current environment
    /// afterwards whether they succeed or fail.
    pub fn execute_block(&mut self, statements: &[Stmt], env: EnvRef) -> Result<Flow> {
        let previous: EnvRef = mem::replace(&mut self.environment, env);

        let result: Result<Flow> = self.execute_all(statements);

        self.environment = previous;
        result
    }

    fn execute_all(&mut self, statements: &[Stmt]) -> Result<Flow> {
        for stmt in statements {
            match self.execute(stmt)? {
                Flow::Normal => {}
                signal => return Ok(signal),
            }
        }
        Ok(Flow::Normal)
    }

    fn declare_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
        static_methods: &[Rc<FunctionDecl>],
    ) -> Result<()> {
        debug!("Declaring class '{}'", name.lexeme);

        let parent: Option<Rc<LoxClass>> = match superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Class(class) => Some(class),
                _ => {
                    let token: &Token = match &expr.kind {
                        ExprKind::Variable(token) => token,
                        _ => name,
                    };
                    return Err(LoxError::runtime(token, "Superclass must be a class."));
                }
            },
            None => None,
        };

        self.environment
            .borrow_mut()
            .define(&name.lexeme, Value::Nil);

        // methods of a subclass see `super` one environment out from `this`
        let method_env: EnvRef = match &parent {
            Some(class) => {
                let env: EnvRef = Environment::child_of(&self.environment);
                env.borrow_mut()
                    .define("super", Value::Class(Rc::clone(class)));
                env
            }
            None => Rc::clone(&self.environment),
        };

        let methods: HashMap<String, Rc<LoxFunction>> = methods
            .iter()
            .map(|decl| {
                let function = LoxFunction::new(
                    Rc::clone(decl),
                    Rc::clone(&method_env),
                    decl.name() == "init",
                );
                (decl.name().to_string(), Rc::new(function))
            })
            .collect();

        let static_methods: HashMap<String, Rc<LoxFunction>> = static_methods
            .iter()
            .map(|decl| {
                let function = LoxFunction::new(Rc::clone(decl), Rc::clone(&self.environment), false);
                (decl.name().to_string(), Rc::new(function))
            })
            .collect();

        let class = LoxClass::new(name.lexeme.clone(), parent, methods, static_methods);

        self.environment
            .borrow_mut()
            .assign(name, Value::Class(Rc::new(class)))
    }

    // ── expressions ─────────────────────────────────────────────────────────

    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        ensure_sufficient_stack(|| self.evaluate_expr(expr))
    }

    fn evaluate_expr(&mut self, expr: &Expr) -> Result<Value> {
        trace!("Evaluating {} {:?}", expr.id, expr.kind);

        match &expr.kind {
            ExprKind::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::String(s.clone()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            ExprKind::Grouping(inner) => self.evaluate(inner),

            ExprKind::Variable(name) => self.look_up_variable(name, expr.id),

            ExprKind::This(keyword) => self.look_up_variable(keyword, expr.id),

            ExprKind::Assign { name, value } => {
                let value: Value = self.evaluate(value)?;

                match self.locals.get(expr.id) {
                    Some(distance) => {
                        if !Environment::assign_at(
                            &self.environment,
                            distance,
                            &name.lexeme,
                            value.clone(),
                        ) {
                            return Err(unresolved(name));
                        }
                    }
                    None => self.globals.borrow_mut().assign(name, value.clone())?,
                }

                Ok(value)
            }

            ExprKind::Unary { operator, right } => {
                let right: Value = self.evaluate(right)?;

                match operator.token_type {
                    TokenType::MINUS => match right {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        _ => Err(LoxError::runtime(operator, "Operand must be a number.")),
                    },
                    TokenType::BANG => Ok(Value::Bool(!right.is_truthy())),
                    _ => Err(LoxError::runtime(operator, "Invalid unary operator.")),
                }
            }

            ExprKind::Binary {
                left,
                operator,
                right,
            } => {
                let left: Value = self.evaluate(left)?;
                let right: Value = self.evaluate(right)?;
                binary(operator, left, right)
            }

            ExprKind::Logical {
                left,
                operator,
                right,
            } => {
                let left: Value = self.evaluate(left)?;

                let short_circuit: bool = match operator.token_type {
                    TokenType::OR => left.is_truthy(),
                    _ => !left.is_truthy(),
                };

                if short_circuit {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }

            ExprKind::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.evaluate(then_branch)
                } else {
                    self.evaluate(else_branch)
                }
            }

            ExprKind::Comma { left, right } => {
                self.evaluate(left)?;
                self.evaluate(right)
            }

            ExprKind::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee: Value = self.evaluate(callee)?;

                let mut args: Vec<Value> = Vec::with_capacity(arguments.len());
                for arg in arguments {
                    args.push(self.evaluate(arg)?);
                }

                self.invoke_callable(&callee, paren, args)
            }

            ExprKind::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => self.get_property(&instance, name),

                Value::Class(class) => match class.find_static_method(&name.lexeme) {
                    Some(method) if method.is_getter() => {
                        self.call_function(&method, name, Vec::new())
                    }
                    Some(method) => Ok(Value::Function(method)),
                    None => Err(undefined_property(name)),
                },

                _ => Err(LoxError::runtime(name, "Only instances have properties.")),
            },

            ExprKind::Set {
                object,
                name,
                value,
            } => {
                let Value::Instance(instance) = self.evaluate(object)? else {
                    return Err(LoxError::runtime(name, "Only instances have fields."));
                };

                let value: Value = self.evaluate(value)?;
                instance.borrow_mut().set(&name.lexeme, value.clone());
                Ok(value)
            }

            ExprKind::Super { keyword, method } => {
                let distance: usize = self.locals.get(expr.id).ok_or_else(|| unresolved(keyword))?;

                let superclass: Value = Environment::get_at(&self.environment, distance, "super")
                    .ok_or_else(|| unresolved(keyword))?;

                let receiver: Value = distance
                    .checked_sub(1)
                    .and_then(|d| Environment::get_at(&self.environment, d, "this"))
                    .ok_or_else(|| unresolved(keyword))?;

                let Value::Class(superclass) = superclass else {
                    return Err(LoxError::runtime(keyword, "Superclass must be a class."));
                };

                let found: Rc<LoxFunction> = superclass
                    .find_method(&method.lexeme)
                    .ok_or_else(|| undefined_property(method))?;

                let bound = Rc::new(found.bind(receiver));

                if bound.is_getter() {
                    self.call_function(&bound, method, Vec::new())
                } else {
                    Ok(Value::Function(bound))
                }
            }

            ExprKind::Lambda(decl) => {
                let function = LoxFunction::new(Rc::clone(decl), Rc::clone(&self.environment), false);
                Ok(Value::Function(Rc::new(function)))
            }
        }
    }

    fn look_up_variable(&self, name: &Token, id: ExprId) -> Result<Value> {
        match self.locals.get(id) {
            Some(distance) => Environment::get_at(&self.environment, distance, &name.lexeme)
                .ok_or_else(|| unresolved(name)),
            None => self.globals.borrow().get(name),
        }
    }

    /// Fields shadow methods; getters run on access, other methods come back
    /// bound to the instance.
    fn get_property(&mut self, instance: &Rc<RefCell<LoxInstance>>, name: &Token) -> Result<Value> {
        if let Some(value) = instance.borrow().field(&name.lexeme) {
            return Ok(value);
        }

        let class: Rc<LoxClass> = Rc::clone(&instance.borrow().class);

        let method: Rc<LoxFunction> = class
            .find_method(&name.lexeme)
            .ok_or_else(|| undefined_property(name))?;

        let bound = Rc::new(method.bind(Value::Instance(Rc::clone(instance))));

        if bound.is_getter() {
            debug!("Invoking getter '{}'", name.lexeme);
            self.call_function(&bound, name, Vec::new())
        } else {
            Ok(Value::Function(bound))
        }
    }

    // ── calls ───────────────────────────────────────────────────────────────

    fn invoke_callable(&mut self, callee: &Value, paren: &Token, args: Vec<Value>) -> Result<Value> {
        let arity: usize = match callee {
            Value::Native(native) => native.arity,
            Value::Function(function) => function.arity(),
            Value::Class(class) => class.arity(),
            _ => {
                return Err(LoxError::runtime(
                    paren,
                    "Can only call functions and classes.",
                ))
            }
        };

        if args.len() != arity {
            return Err(LoxError::runtime(
                paren,
                format!("Expected {} arguments but got {}.", arity, args.len()),
            ));
        }

        match callee {
            Value::Native(native) => {
                debug!("Calling native function '{}'", native.name);
                (native.func)(self, &args).map_err(|message| LoxError::runtime(paren, message))
            }

            Value::Function(function) => self.call_function(function, paren, args),

            Value::Class(class) => self.instantiate(class, paren, args),

            _ => Err(LoxError::runtime(
                paren,
                "Can only call functions and classes.",
            )),
        }
    }

    /// Run a user function's body in a fresh environment holding its
    /// parameters.  Initializers always produce their receiver.  `site` is
    /// the token errors raised by the call itself are reported at.
    pub fn call_function(
        &mut self,
        function: &LoxFunction,
        site: &Token,
        args: Vec<Value>,
    ) -> Result<Value> {
        debug!("Calling <fn {}> with {} argument(s)", function.name(), args.len());

        if self.call_depth >= MAX_CALL_DEPTH {
            return Err(LoxError::runtime(site, "Stack overflow."));
        }

        let env: EnvRef = Environment::child_of(&function.closure);
        for (param, arg) in function.declaration.params.iter().zip(args) {
            env.borrow_mut().define(&param.lexeme, arg);
        }

        self.call_depth += 1;
        let result: Result<Flow> =
            ensure_sufficient_stack(|| self.execute_block(&function.declaration.body, env));
        self.call_depth -= 1;

        let flow: Flow = result?;

        if function.is_initializer {
            return Environment::get_at(&function.closure, 0, "this")
                .ok_or_else(|| LoxError::runtime(site, "Initializer has no receiver."));
        }

        match flow {
            Flow::Return(value) => Ok(value),
            _ => Ok(Value::Nil),
        }
    }

    fn instantiate(&mut self, class: &Rc<LoxClass>, site: &Token, args: Vec<Value>) -> Result<Value> {
        debug!("Instantiating class '{}'", class.name);

        let instance = Value::Instance(Rc::new(RefCell::new(LoxInstance::new(Rc::clone(class)))));

        if let Some(init) = class.find_method("init") {
            let bound: LoxFunction = init.bind(instance.clone());
            self.call_function(&bound, site, args)?;
        }

        Ok(instance)
    }
}

// ── operators ───────────────────────────────────────────────────────────────

fn binary(operator: &Token, left: Value, right: Value) -> Result<Value> {
    use TokenType::*;

    match operator.token_type {
        PLUS => match (left, right) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
            (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
            (Value::String(a), b @ Value::Number(_)) => Ok(Value::String(format!("{}{}", a, b))),
            (a @ Value::Number(_), Value::String(b)) => Ok(Value::String(format!("{}{}", a, b))),
            _ => Err(LoxError::runtime(operator, "Invalid operands.")),
        },

        MINUS => numbers(operator, &left, &right).map(|(a, b)| Value::Number(a - b)),

        STAR => numbers(operator, &left, &right).map(|(a, b)| Value::Number(a * b)),

        SLASH | PERCENT => {
            let (a, b) = numbers(operator, &left, &right)?;

            if b == 0.0 {
                return Err(LoxError::runtime(operator, "Cannot divide by zero."));
            }

            Ok(Value::Number(if operator.token_type == SLASH {
                a / b
            } else {
                a % b
            }))
        }

        GREATER => numbers(operator, &left, &right).map(|(a, b)| Value::Bool(a > b)),

        GREATER_EQUAL => numbers(operator, &left, &right).map(|(a, b)| Value::Bool(a >= b)),

        LESS => numbers(operator, &left, &right).map(|(a, b)| Value::Bool(a < b)),

        LESS_EQUAL => numbers(operator, &left, &right).map(|(a, b)| Value::Bool(a <= b)),

        EQUAL_EQUAL => Ok(Value::Bool(left == right)),

        BANG_EQUAL => Ok(Value::Bool(left != right)),

        _ => Err(LoxError::runtime(operator, "Invalid binary operator.")),
    }
}

fn numbers(operator: &Token, left: &Value, right: &Value) -> Result<(f64, f64)> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => Err(LoxError::runtime(operator, "Operands must be numbers.")),
    }
}

fn undefined_property(name: &Token) -> LoxError {
    LoxError::runtime(name, format!("Undefined property '{}'.", name.lexeme))
}

/// The resolver promised a binding that the live environment chain lacks.
fn unresolved(name: &Token) -> LoxError {
    LoxError::runtime(
        name,
        format!("Internal error: '{}' is not where it was resolved.", name.lexeme),
    )
}
