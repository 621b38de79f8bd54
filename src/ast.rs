//! Syntax tree of generated target programs.
//!
//! The tree builder produces these nodes once; feature detectors traverse
//! them through the borrowed [`Node`] view and the unparser prints them back.

#[derive(Debug, PartialEq, Clone)]
pub enum Expression {
    /// Decimal digits as written in the source, any length.
    Integer(String),
    Float(f64),
    String(String),
    Boolean(bool),
    NoneLiteral,
    Name(String),
    List(Vec<Expression>),
    Tuple(Vec<Expression>),
    Set(Vec<Expression>),
    Dict(Vec<(Expression, Expression)>),
    Subscript {
        object: Box<Expression>,
        index: Box<Expression>,
    },
    Attribute {
        object: Box<Expression>,
        name: String,
    },
    BinaryOp {
        left: Box<Expression>,
        op: BinaryOperator,
        right: Box<Expression>,
    },
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expression>,
    },
    BoolOp {
        left: Box<Expression>,
        op: BoolOperator,
        right: Box<Expression>,
    },
    /// Chained comparison such as `a < b <= c`.
    Compare {
        left: Box<Expression>,
        comparisons: Vec<(CompareOperator, Expression)>,
    },
    Call {
        callee: Box<Expression>,
        args: Vec<Expression>,
    },
}

impl Expression {
    pub fn name(&self) -> Option<&str> {
        match self {
            Expression::Name(name) => Some(name),
            _ => None,
        }
    }

    /// Name of the called function when the callee is a plain name.
    pub fn call_name(&self) -> Option<&str> {
        match self {
            Expression::Call { callee, .. } => callee.name(),
            _ => None,
        }
    }

    /// True when `name` occurs anywhere inside this expression.
    pub fn mentions(&self, name: &str) -> bool {
        Node::Expression(self)
            .walk()
            .any(|node| matches!(node, Node::Expression(Expression::Name(n)) if n == name))
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

impl BinaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::FloorDiv => "//",
            BinaryOperator::Mod => "%",
            BinaryOperator::Pow => "**",
        }
    }

    pub fn is_division(self) -> bool {
        matches!(self, BinaryOperator::Div | BinaryOperator::FloorDiv)
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum UnaryOperator {
    Neg,
    Pos,
    Not,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum BoolOperator {
    And,
    Or,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum CompareOperator {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    In,
    NotIn,
    Is,
    IsNot,
}

impl CompareOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOperator::Eq => "==",
            CompareOperator::NotEq => "!=",
            CompareOperator::Lt => "<",
            CompareOperator::LtE => "<=",
            CompareOperator::Gt => ">",
            CompareOperator::GtE => ">=",
            CompareOperator::In => "in",
            CompareOperator::NotIn => "not in",
            CompareOperator::Is => "is",
            CompareOperator::IsNot => "is not",
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum Statement {
    FunctionDef {
        name: String,
        params: Vec<String>,
        body: Vec<Statement>,
    },
    Assign {
        target: AssignTarget,
        value: Expression,
    },
    AugAssign {
        target: AssignTarget,
        op: BinaryOperator,
        value: Expression,
    },
    While {
        condition: Expression,
        body: Vec<Statement>,
    },
    For {
        target: String,
        iterable: Expression,
        body: Vec<Statement>,
    },
    /// `elif` chains nest as a single `If` in `else_body`.
    If {
        condition: Expression,
        then_body: Vec<Statement>,
        else_body: Vec<Statement>,
    },
    Return(Option<Expression>),
    Break,
    Continue,
    Pass,
    Expr(Expression),
}

impl Statement {
    pub fn is_loop(&self) -> bool {
        matches!(self, Statement::While { .. } | Statement::For { .. })
    }

    /// Name bound by a plain `name = value` assignment.
    pub fn assigned_name(&self) -> Option<&str> {
        match self {
            Statement::Assign {
                target: AssignTarget::Name(name),
                ..
            } => Some(name),
            _ => None,
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum AssignTarget {
    Name(String),
    Index {
        object: Expression,
        index: Expression,
    },
    Attribute {
        object: Expression,
        name: String,
    },
}

#[derive(Debug, PartialEq, Clone, Default)]
pub struct Module {
    pub body: Vec<Statement>,
}

impl Module {
    pub fn walk(&self) -> Walk<'_> {
        Node::Module(self).walk()
    }
}

/// Borrowed view over any node of a [`Module`].
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    Module(&'a Module),
    Statement(&'a Statement),
    Expression(&'a Expression),
}

impl<'a> Node<'a> {
    pub fn statement(self) -> Option<&'a Statement> {
        match self {
            Node::Statement(statement) => Some(statement),
            _ => None,
        }
    }

    pub fn expression(self) -> Option<&'a Expression> {
        match self {
            Node::Expression(expression) => Some(expression),
            _ => None,
        }
    }

    /// Direct children in source order.
    pub fn children(self) -> Vec<Node<'a>> {
        let mut children = Vec::new();
        match self {
            Node::Module(module) => push_statements(&mut children, &module.body),
            Node::Statement(statement) => match statement {
                Statement::FunctionDef { body, .. } => push_statements(&mut children, body),
                Statement::Assign { target, value } | Statement::AugAssign { target, value, .. } => {
                    match target {
                        AssignTarget::Name(_) => {}
                        AssignTarget::Index { object, index } => {
                            children.push(Node::Expression(object));
                            children.push(Node::Expression(index));
                        }
                        AssignTarget::Attribute { object, .. } => {
                            children.push(Node::Expression(object));
                        }
                    }
                    children.push(Node::Expression(value));
                }
                Statement::While { condition, body } => {
                    children.push(Node::Expression(condition));
                    push_statements(&mut children, body);
                }
                Statement::For { iterable, body, .. } => {
                    children.push(Node::Expression(iterable));
                    push_statements(&mut children, body);
                }
                Statement::If {
                    condition,
                    then_body,
                    else_body,
                } => {
                    children.push(Node::Expression(condition));
                    push_statements(&mut children, then_body);
                    push_statements(&mut children, else_body);
                }
                Statement::Return(Some(value)) | Statement::Expr(value) => {
                    children.push(Node::Expression(value));
                }
                Statement::Return(None)
                | Statement::Break
                | Statement::Continue
                | Statement::Pass => {}
            },
            Node::Expression(expression) => match expression {
                Expression::Integer(_)
                | Expression::Float(_)
                | Expression::String(_)
                | Expression::Boolean(_)
                | Expression::NoneLiteral
                | Expression::Name(_) => {}
                Expression::List(items) | Expression::Tuple(items) | Expression::Set(items) => {
                    children.extend(items.iter().map(Node::Expression));
                }
                Expression::Dict(entries) => {
                    for (key, value) in entries {
                        children.push(Node::Expression(key));
                        children.push(Node::Expression(value));
                    }
                }
                Expression::Subscript { object, index } => {
                    children.push(Node::Expression(object));
                    children.push(Node::Expression(index));
                }
                Expression::Attribute { object, .. } => children.push(Node::Expression(object)),
                Expression::BinaryOp { left, right, .. } | Expression::BoolOp { left, right, .. } => {
                    children.push(Node::Expression(left));
                    children.push(Node::Expression(right));
                }
                Expression::UnaryOp { operand, .. } => children.push(Node::Expression(operand)),
                Expression::Compare { left, comparisons } => {
                    children.push(Node::Expression(left));
                    children.extend(comparisons.iter().map(|(_, right)| Node::Expression(right)));
                }
                Expression::Call { callee, args } => {
                    children.push(Node::Expression(callee));
                    children.extend(args.iter().map(Node::Expression));
                }
            },
        }
        children
    }

    /// Pre-order traversal starting at (and including) this node.
    pub fn walk(self) -> Walk<'a> {
        Walk { stack: vec![self] }
    }
}

fn push_statements<'a>(children: &mut Vec<Node<'a>>, statements: &'a [Statement]) {
    children.extend(statements.iter().map(Node::Statement));
}

pub struct Walk<'a> {
    stack: Vec<Node<'a>>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = Node<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children().into_iter().rev());
        Some(node)
    }
}
