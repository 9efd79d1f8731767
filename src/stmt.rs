use std::rc::Rc;

use crate::expr::Expr;
use crate::token::Token;

/// Parameters and body shared by named functions, lambdas and methods.
///
/// Held behind `Rc` so every closure created from the declaration points at
/// the same body instead of copying it.
#[derive(Debug)]
pub struct FunctionDecl {
    /// `None` for lambdas.
    pub name: Option<Token>,

    /// Parameter name tokens (arity ≤ 255).
    pub params: Vec<Token>,

    pub body: Vec<Stmt>,

    /// Declared without a parameter list (`area { ... }`): invoked on access.
    pub is_getter: bool,
}

impl FunctionDecl {
    pub fn name(&self) -> &str {
        self.name.as_ref().map_or("lambda", |t| t.lexeme.as_str())
    }
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Expression(Expr),

    Print(Expr),

    Var {
        name: Token,
        initializer: Option<Expr>,
    },

    Block(Vec<Stmt>),

    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    /// `for` loops arrive here desugared, their increment kept apart so that
    /// `continue` still runs it.
    While {
        condition: Expr,
        body: Box<Stmt>,
        increment: Option<Expr>,
    },

    Function(Rc<FunctionDecl>),

    Return {
        keyword: Token,
        value: Option<Expr>,
    },

    Class {
        name: Token,
        /// Always an `ExprKind::Variable`.
        superclass: Option<Expr>,
        methods: Vec<Rc<FunctionDecl>>,
        static_methods: Vec<Rc<FunctionDecl>>,
    },

    Break(Token),

    Continue(Token),
}
