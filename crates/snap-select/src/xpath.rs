//! XPath 1.0 subset
//!
//! Location paths over every axis except `namespace`, predicates (positional
//! and boolean), unions, the comparison/boolean/additive operators and the
//! core string and node-set functions. Results of [`XPath::select`] are the
//! element nodes of the final node-set in document order.

use std::collections::HashMap;

use snap_dom::{DomTree, NodeData, NodeId};

use crate::SelectorError;

/// Compiled XPath expression
#[derive(Debug, Clone)]
pub struct XPath {
    source: String,
    expr: Expr,
}

impl XPath {
    /// Parse an expression
    pub fn parse(source: &str) -> Result<Self, SelectorError> {
        let tokens = Lexer::new(source).tokenize()?;
        let mut parser = Parser {
            source,
            tokens,
            pos: 0,
        };
        let expr = parser.parse_expr()?;
        if parser.pos != parser.tokens.len() {
            return Err(parser.error("unexpected trailing input"));
        }
        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    /// Expression text as written
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate against `context`, returning matched elements in document order
    pub fn select(&self, tree: &DomTree, context: NodeId) -> Result<Vec<NodeId>, SelectorError> {
        let eval = Evaluator::new(tree, &self.source);
        let ctx = Context {
            node: XNode::Node(context),
            position: 1,
            size: 1,
        };
        match eval.eval(&self.expr, &ctx)? {
            Value::Nodes(nodes) => Ok(nodes
                .into_iter()
                .filter_map(|n| match n {
                    XNode::Node(id) if tree.element(id).is_some() => Some(id),
                    _ => None,
                })
                .collect()),
            _ => Err(eval.error("expression does not select nodes")),
        }
    }
}

// ============================================================================
// LEXER
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Slash,
    DoubleSlash,
    Dot,
    DotDot,
    At,
    Star,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Comma,
    Pipe,
    DoubleColon,
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Name(String),
    Literal(String),
    Number(f64),
}

struct Lexer<'a> {
    source: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
        }
    }

    fn error(&self, reason: &str) -> SelectorError {
        SelectorError::InvalidXPath {
            expression: self.source.to_string(),
            reason: reason.to_string(),
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.chars.peek().map(|(_, c)| *c) == Some(expected) {
            self.chars.next();
            true
        } else {
            false
        }
    }

    fn tokenize(mut self) -> Result<Vec<Token>, SelectorError> {
        let mut tokens = Vec::new();
        while let Some((start, ch)) = self.chars.next() {
            let token = match ch {
                c if c.is_whitespace() => continue,
                '/' => {
                    if self.eat('/') {
                        Token::DoubleSlash
                    } else {
                        Token::Slash
                    }
                }
                '.' => {
                    if self.eat('.') {
                        Token::DotDot
                    } else if self.chars.peek().is_some_and(|(_, c)| c.is_ascii_digit()) {
                        self.number(start)?
                    } else {
                        Token::Dot
                    }
                }
                '@' => Token::At,
                '*' => Token::Star,
                '[' => Token::LBracket,
                ']' => Token::RBracket,
                '(' => Token::LParen,
                ')' => Token::RParen,
                ',' => Token::Comma,
                '|' => Token::Pipe,
                '+' => Token::Plus,
                '-' => Token::Minus,
                '=' => Token::Eq,
                ':' if self.eat(':') => Token::DoubleColon,
                '!' if self.eat('=') => Token::NotEq,
                '<' => {
                    if self.eat('=') {
                        Token::Le
                    } else {
                        Token::Lt
                    }
                }
                '>' => {
                    if self.eat('=') {
                        Token::Ge
                    } else {
                        Token::Gt
                    }
                }
                '"' | '\'' => {
                    let mut literal = String::new();
                    loop {
                        match self.chars.next() {
                            Some((_, c)) if c == ch => break,
                            Some((_, c)) => literal.push(c),
                            None => return Err(self.error("unterminated string literal")),
                        }
                    }
                    Token::Literal(literal)
                }
                c if c.is_ascii_digit() => self.number(start)?,
                c if c.is_alphabetic() || c == '_' => {
                    let mut end = start + c.len_utf8();
                    while let Some(&(idx, c)) = self.chars.peek() {
                        let continues = c.is_alphanumeric()
                            || matches!(c, '_' | '-' | '.')
                            || (c == ':' && !self.source[idx..].starts_with("::"));
                        if !continues {
                            break;
                        }
                        end = idx + c.len_utf8();
                        self.chars.next();
                    }
                    Token::Name(self.source[start..end].to_string())
                }
                _ => return Err(self.error("unexpected character")),
            };
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn number(&mut self, start: usize) -> Result<Token, SelectorError> {
        let mut end = start + 1;
        while let Some(&(idx, c)) = self.chars.peek() {
            if !(c.is_ascii_digit() || c == '.') {
                break;
            }
            end = idx + 1;
            self.chars.next();
        }
        self.source[start..end]
            .parse::<f64>()
            .map(Token::Number)
            .map_err(|_| self.error("malformed number"))
    }
}

// ============================================================================
// AST + PARSER
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
enum CmpOp {
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    Parent,
    Ancestor,
    AncestorOrSelf,
    SelfAxis,
    FollowingSibling,
    PrecedingSibling,
    Following,
    Preceding,
    Attribute,
}

impl Axis {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "child" => Self::Child,
            "descendant" => Self::Descendant,
            "descendant-or-self" => Self::DescendantOrSelf,
            "parent" => Self::Parent,
            "ancestor" => Self::Ancestor,
            "ancestor-or-self" => Self::AncestorOrSelf,
            "self" => Self::SelfAxis,
            "following-sibling" => Self::FollowingSibling,
            "preceding-sibling" => Self::PrecedingSibling,
            "following" => Self::Following,
            "preceding" => Self::Preceding,
            "attribute" => Self::Attribute,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
enum NodeTest {
    Name(String),
    Any,
    Text,
    Node,
    Comment,
}

#[derive(Debug, Clone)]
struct Step {
    axis: Axis,
    test: NodeTest,
    predicates: Vec<Expr>,
}

impl Step {
    fn descendant_or_self() -> Self {
        Self {
            axis: Axis::DescendantOrSelf,
            test: NodeTest::Node,
            predicates: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
enum Expr {
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Compare(CmpOp, Box<Expr>, Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Neg(Box<Expr>),
    Union(Box<Expr>, Box<Expr>),
    Literal(String),
    Number(f64),
    Function(String, Vec<Expr>),
    /// Location path; `absolute` starts at the document node
    Path { absolute: bool, steps: Vec<Step> },
    /// Primary expression with predicates, optionally followed by steps
    Filter {
        primary: Box<Expr>,
        predicates: Vec<Expr>,
        steps: Vec<Step>,
    },
}

const FUNCTIONS: &[&str] = &[
    "last", "position", "count", "string", "concat", "contains", "starts-with", "ends-with",
    "normalize-space", "string-length", "not", "true", "false", "boolean", "number", "name",
    "local-name", "translate",
];

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser<'_> {
    fn error(&self, reason: &str) -> SelectorError {
        SelectorError::InvalidXPath {
            expression: self.source.to_string(),
            reason: reason.to_string(),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expect(&mut self, token: Token, what: &str) -> Result<(), SelectorError> {
        if self.peek() == Some(&token) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected {what}")))
        }
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Name(n)) if n == keyword)
    }

    fn parse_expr(&mut self) -> Result<Expr, SelectorError> {
        let mut left = self.parse_and()?;
        while self.peek_keyword("or") {
            self.pos += 1;
            left = Expr::Or(Box::new(left), Box::new(self.parse_and()?));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, SelectorError> {
        let mut left = self.parse_equality()?;
        while self.peek_keyword("and") {
            self.pos += 1;
            left = Expr::And(Box::new(left), Box::new(self.parse_equality()?));
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, SelectorError> {
        let mut left = self.parse_relational()?;
        loop {
            let op = match self.peek() {
                Some(Token::Eq) => CmpOp::Eq,
                Some(Token::NotEq) => CmpOp::NotEq,
                _ => return Ok(left),
            };
            self.pos += 1;
            left = Expr::Compare(op, Box::new(left), Box::new(self.parse_relational()?));
        }
    }

    fn parse_relational(&mut self) -> Result<Expr, SelectorError> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                Some(Token::Lt) => CmpOp::Lt,
                Some(Token::Le) => CmpOp::Le,
                Some(Token::Gt) => CmpOp::Gt,
                Some(Token::Ge) => CmpOp::Ge,
                _ => return Ok(left),
            };
            self.pos += 1;
            left = Expr::Compare(op, Box::new(left), Box::new(self.parse_additive()?));
        }
    }

    fn parse_additive(&mut self) -> Result<Expr, SelectorError> {
        let mut left = self.parse_unary()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.pos += 1;
                    left = Expr::Add(Box::new(left), Box::new(self.parse_unary()?));
                }
                Some(Token::Minus) => {
                    self.pos += 1;
                    left = Expr::Sub(Box::new(left), Box::new(self.parse_unary()?));
                }
                _ => return Ok(left),
            }
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, SelectorError> {
        if self.peek() == Some(&Token::Minus) {
            self.pos += 1;
            return Ok(Expr::Neg(Box::new(self.parse_unary()?)));
        }
        self.parse_union()
    }

    fn parse_union(&mut self) -> Result<Expr, SelectorError> {
        let mut left = self.parse_path()?;
        while self.peek() == Some(&Token::Pipe) {
            self.pos += 1;
            left = Expr::Union(Box::new(left), Box::new(self.parse_path()?));
        }
        Ok(left)
    }

    fn is_step_start(&self) -> bool {
        matches!(
            self.peek(),
            Some(Token::Name(_) | Token::Star | Token::Dot | Token::DotDot | Token::At)
        )
    }

    fn parse_path(&mut self) -> Result<Expr, SelectorError> {
        match self.peek() {
            Some(Token::Slash) => {
                self.pos += 1;
                let mut steps = Vec::new();
                if self.is_step_start() {
                    self.parse_relative_steps(&mut steps)?;
                }
                Ok(Expr::Path { absolute: true, steps })
            }
            Some(Token::DoubleSlash) => {
                self.pos += 1;
                let mut steps = vec![Step::descendant_or_self()];
                self.parse_relative_steps(&mut steps)?;
                Ok(Expr::Path { absolute: true, steps })
            }
            Some(Token::Literal(_) | Token::Number(_) | Token::LParen) => self.parse_filter(),
            Some(Token::Name(name))
                if self.peek_at(1) == Some(&Token::LParen)
                    && !matches!(name.as_str(), "text" | "node" | "comment") =>
            {
                self.parse_filter()
            }
            _ if self.is_step_start() => {
                let mut steps = Vec::new();
                self.parse_relative_steps(&mut steps)?;
                Ok(Expr::Path { absolute: false, steps })
            }
            _ => Err(self.error("expected expression")),
        }
    }

    fn parse_filter(&mut self) -> Result<Expr, SelectorError> {
        let primary = self.parse_primary()?;
        let predicates = self.parse_predicates()?;
        let mut steps = Vec::new();
        match self.peek() {
            Some(Token::Slash) => {
                self.pos += 1;
                self.parse_relative_steps(&mut steps)?;
            }
            Some(Token::DoubleSlash) => {
                self.pos += 1;
                steps.push(Step::descendant_or_self());
                self.parse_relative_steps(&mut steps)?;
            }
            _ => {}
        }
        if predicates.is_empty() && steps.is_empty() {
            return Ok(primary);
        }
        Ok(Expr::Filter {
            primary: Box::new(primary),
            predicates,
            steps,
        })
    }

    fn parse_primary(&mut self) -> Result<Expr, SelectorError> {
        match self.advance() {
            Some(Token::Literal(s)) => Ok(Expr::Literal(s)),
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::LParen) => {
                let inner = self.parse_expr()?;
                self.expect(Token::RParen, "')'")?;
                Ok(inner)
            }
            Some(Token::Name(name)) => {
                if !FUNCTIONS.contains(&name.as_str()) {
                    return Err(self.error(&format!("unknown function {name}()")));
                }
                self.expect(Token::LParen, "'('")?;
                let mut args = Vec::new();
                if self.peek() != Some(&Token::RParen) {
                    loop {
                        args.push(self.parse_expr()?);
                        if self.peek() == Some(&Token::Comma) {
                            self.pos += 1;
                        } else {
                            break;
                        }
                    }
                }
                self.expect(Token::RParen, "')'")?;
                Ok(Expr::Function(name, args))
            }
            _ => Err(self.error("expected expression")),
        }
    }

    fn parse_relative_steps(&mut self, steps: &mut Vec<Step>) -> Result<(), SelectorError> {
        loop {
            steps.push(self.parse_step()?);
            match self.peek() {
                Some(Token::Slash) => self.pos += 1,
                Some(Token::DoubleSlash) => {
                    self.pos += 1;
                    steps.push(Step::descendant_or_self());
                }
                _ => return Ok(()),
            }
        }
    }

    fn parse_step(&mut self) -> Result<Step, SelectorError> {
        match self.peek() {
            Some(Token::Dot) => {
                self.pos += 1;
                return Ok(Step {
                    axis: Axis::SelfAxis,
                    test: NodeTest::Node,
                    predicates: Vec::new(),
                });
            }
            Some(Token::DotDot) => {
                self.pos += 1;
                return Ok(Step {
                    axis: Axis::Parent,
                    test: NodeTest::Node,
                    predicates: Vec::new(),
                });
            }
            _ => {}
        }

        let axis = if self.peek() == Some(&Token::At) {
            self.pos += 1;
            Axis::Attribute
        } else if let (Some(Token::Name(name)), Some(Token::DoubleColon)) = (self.peek(), self.peek_at(1)) {
            let axis = Axis::from_name(name).ok_or_else(|| self.error(&format!("unknown axis {name}")))?;
            self.pos += 2;
            axis
        } else {
            Axis::Child
        };

        let test = match self.advance() {
            Some(Token::Star) => NodeTest::Any,
            Some(Token::Name(name)) => {
                let typed = match name.as_str() {
                    "text" => Some(NodeTest::Text),
                    "node" => Some(NodeTest::Node),
                    "comment" => Some(NodeTest::Comment),
                    _ => None,
                };
                match typed {
                    Some(test) if self.peek() == Some(&Token::LParen) => {
                        self.pos += 1;
                        self.expect(Token::RParen, "')'")?;
                        test
                    }
                    _ => NodeTest::Name(name),
                }
            }
            _ => return Err(self.error("expected node test")),
        };

        let predicates = self.parse_predicates()?;
        Ok(Step { axis, test, predicates })
    }

    fn parse_predicates(&mut self) -> Result<Vec<Expr>, SelectorError> {
        let mut predicates = Vec::new();
        while self.peek() == Some(&Token::LBracket) {
            self.pos += 1;
            predicates.push(self.parse_expr()?);
            self.expect(Token::RBracket, "']'")?;
        }
        Ok(predicates)
    }
}

// ============================================================================
// EVALUATION
// ============================================================================

/// Node in an XPath node-set; attributes are addressed by owner and index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum XNode {
    Node(NodeId),
    Attr(NodeId, usize),
}

impl XNode {
    fn owner(self) -> NodeId {
        match self {
            XNode::Node(id) | XNode::Attr(id, _) => id,
        }
    }
}

#[derive(Debug, Clone)]
enum Value {
    Nodes(Vec<XNode>),
    Str(String),
    Num(f64),
    Bool(bool),
}

struct Context {
    node: XNode,
    position: usize,
    size: usize,
}

struct Evaluator<'a> {
    tree: &'a DomTree,
    source: &'a str,
    order: HashMap<NodeId, usize>,
    preorder: Vec<NodeId>,
}

impl<'a> Evaluator<'a> {
    fn new(tree: &'a DomTree, source: &'a str) -> Self {
        let preorder: Vec<NodeId> = std::iter::once(tree.root())
            .chain(tree.descendants(tree.root()))
            .collect();
        let order = preorder.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        Self {
            tree,
            source,
            order,
            preorder,
        }
    }

    fn error(&self, reason: &str) -> SelectorError {
        SelectorError::InvalidXPath {
            expression: self.source.to_string(),
            reason: reason.to_string(),
        }
    }

    fn sort_key(&self, node: XNode) -> (usize, usize) {
        let base = self.order.get(&node.owner()).copied().unwrap_or(usize::MAX);
        match node {
            XNode::Node(_) => (base, 0),
            XNode::Attr(_, i) => (base, i + 1),
        }
    }

    fn document_order(&self, mut nodes: Vec<XNode>) -> Vec<XNode> {
        nodes.sort_by_key(|n| self.sort_key(*n));
        nodes.dedup();
        nodes
    }

    fn eval(&self, expr: &Expr, ctx: &Context) -> Result<Value, SelectorError> {
        Ok(match expr {
            Expr::Or(a, b) => Value::Bool(self.boolean(&self.eval(a, ctx)?) || self.boolean(&self.eval(b, ctx)?)),
            Expr::And(a, b) => Value::Bool(self.boolean(&self.eval(a, ctx)?) && self.boolean(&self.eval(b, ctx)?)),
            Expr::Compare(op, a, b) => Value::Bool(self.compare(*op, &self.eval(a, ctx)?, &self.eval(b, ctx)?)),
            Expr::Add(a, b) => Value::Num(self.number(&self.eval(a, ctx)?) + self.number(&self.eval(b, ctx)?)),
            Expr::Sub(a, b) => Value::Num(self.number(&self.eval(a, ctx)?) - self.number(&self.eval(b, ctx)?)),
            Expr::Neg(a) => Value::Num(-self.number(&self.eval(a, ctx)?)),
            Expr::Union(a, b) => {
                let mut nodes = self.node_set(self.eval(a, ctx)?)?;
                nodes.extend(self.node_set(self.eval(b, ctx)?)?);
                Value::Nodes(self.document_order(nodes))
            }
            Expr::Literal(s) => Value::Str(s.clone()),
            Expr::Number(n) => Value::Num(*n),
            Expr::Function(name, args) => self.call(name, args, ctx)?,
            Expr::Path { absolute, steps } => {
                let start = if *absolute {
                    XNode::Node(self.tree.root())
                } else {
                    ctx.node
                };
                Value::Nodes(self.walk(vec![start], steps)?)
            }
            Expr::Filter { primary, predicates, steps } => {
                let mut nodes = self.node_set(self.eval(primary, ctx)?)?;
                for predicate in predicates {
                    nodes = self.filter(nodes, predicate)?;
                }
                Value::Nodes(self.walk(nodes, steps)?)
            }
        })
    }

    fn node_set(&self, value: Value) -> Result<Vec<XNode>, SelectorError> {
        match value {
            Value::Nodes(nodes) => Ok(nodes),
            _ => Err(self.error("expected a node-set")),
        }
    }

    fn walk(&self, mut current: Vec<XNode>, steps: &[Step]) -> Result<Vec<XNode>, SelectorError> {
        for step in steps {
            let mut next = Vec::new();
            for node in &current {
                let mut candidates: Vec<XNode> = self
                    .axis(*node, step.axis)
                    .into_iter()
                    .filter(|n| self.test(*n, &step.test, step.axis))
                    .collect();
                for predicate in &step.predicates {
                    candidates = self.filter(candidates, predicate)?;
                }
                next.extend(candidates);
            }
            current = self.document_order(next);
        }
        Ok(current)
    }

    fn filter(&self, nodes: Vec<XNode>, predicate: &Expr) -> Result<Vec<XNode>, SelectorError> {
        let size = nodes.len();
        let mut kept = Vec::new();
        for (i, node) in nodes.into_iter().enumerate() {
            let ctx = Context {
                node,
                position: i + 1,
                size,
            };
            let keep = match self.eval(predicate, &ctx)? {
                Value::Num(n) => n == (i + 1) as f64,
                other => self.boolean(&other),
            };
            if keep {
                kept.push(node);
            }
        }
        Ok(kept)
    }

    /// Nodes along an axis; reverse axes are returned nearest first
    fn axis(&self, node: XNode, axis: Axis) -> Vec<XNode> {
        let tree = self.tree;
        let XNode::Node(id) = node else {
            let owner = node.owner();
            return match axis {
                Axis::SelfAxis => vec![node],
                Axis::Parent => vec![XNode::Node(owner)],
                Axis::Ancestor | Axis::AncestorOrSelf => {
                    let mut out = if axis == Axis::AncestorOrSelf { vec![node] } else { Vec::new() };
                    out.push(XNode::Node(owner));
                    out.extend(tree.ancestors(owner).map(XNode::Node));
                    out
                }
                _ => Vec::new(),
            };
        };

        match axis {
            Axis::Child => tree.children(id).map(|(c, _)| XNode::Node(c)).collect(),
            Axis::Descendant => tree.descendants(id).map(XNode::Node).collect(),
            Axis::DescendantOrSelf => std::iter::once(id)
                .chain(tree.descendants(id))
                .map(XNode::Node)
                .collect(),
            Axis::Parent => {
                let parent = tree.parent(id);
                if parent.is_valid() { vec![XNode::Node(parent)] } else { Vec::new() }
            }
            Axis::Ancestor => tree.ancestors(id).map(XNode::Node).collect(),
            Axis::AncestorOrSelf => std::iter::once(id)
                .chain(tree.ancestors(id))
                .map(XNode::Node)
                .collect(),
            Axis::SelfAxis => vec![node],
            Axis::FollowingSibling => {
                let mut out = Vec::new();
                let mut cur = tree.get(id).map(|n| n.next_sibling).unwrap_or(NodeId::NONE);
                while let Some(n) = tree.get(cur) {
                    out.push(XNode::Node(cur));
                    cur = n.next_sibling;
                }
                out
            }
            Axis::PrecedingSibling => {
                let mut out = Vec::new();
                let mut cur = tree.get(id).map(|n| n.prev_sibling).unwrap_or(NodeId::NONE);
                while let Some(n) = tree.get(cur) {
                    out.push(XNode::Node(cur));
                    cur = n.prev_sibling;
                }
                out
            }
            Axis::Following => {
                let Some(&start) = self.order.get(&id) else { return Vec::new() };
                self.preorder[start + 1..]
                    .iter()
                    .filter(|n| !tree.is_descendant_of(**n, id))
                    .map(|n| XNode::Node(*n))
                    .collect()
            }
            Axis::Preceding => {
                let Some(&start) = self.order.get(&id) else { return Vec::new() };
                self.preorder[..start]
                    .iter()
                    .rev()
                    .filter(|n| !tree.is_descendant_of(id, **n))
                    .map(|n| XNode::Node(*n))
                    .collect()
            }
            Axis::Attribute => tree
                .element(id)
                .map(|el| (0..el.attrs.len()).map(|i| XNode::Attr(id, i)).collect())
                .unwrap_or_default(),
        }
    }

    fn test(&self, node: XNode, test: &NodeTest, axis: Axis) -> bool {
        let tree = self.tree;
        match node {
            XNode::Attr(owner, i) => {
                if axis != Axis::Attribute && axis != Axis::SelfAxis && axis != Axis::AncestorOrSelf {
                    return matches!(test, NodeTest::Node);
                }
                let Some(attr) = tree.element(owner).and_then(|e| e.attrs.get(i)) else {
                    return false;
                };
                match test {
                    NodeTest::Name(name) => attr.name.eq_ignore_ascii_case(name),
                    NodeTest::Any | NodeTest::Node => true,
                    NodeTest::Text | NodeTest::Comment => false,
                }
            }
            XNode::Node(id) => {
                if axis == Axis::Attribute {
                    return false;
                }
                let Some(n) = tree.get(id) else { return false };
                match test {
                    NodeTest::Name(name) => n.as_element().is_some_and(|e| e.is(name)),
                    NodeTest::Any => n.is_element(),
                    NodeTest::Text => n.is_text(),
                    NodeTest::Comment => matches!(n.data, NodeData::Comment(_)),
                    NodeTest::Node => true,
                }
            }
        }
    }

    fn string_value(&self, node: XNode) -> String {
        let tree = self.tree;
        match node {
            XNode::Attr(owner, i) => tree
                .element(owner)
                .and_then(|e| e.attrs.get(i))
                .map(|a| a.value.clone())
                .unwrap_or_default(),
            XNode::Node(id) => match tree.get(id).map(|n| &n.data) {
                Some(NodeData::Text(t)) | Some(NodeData::Comment(t)) => t.clone(),
                Some(NodeData::Element(_)) | Some(NodeData::Document) => tree
                    .descendants(id)
                    .filter_map(|d| tree.get(d).and_then(|n| n.as_text()))
                    .collect(),
                _ => String::new(),
            },
        }
    }

    fn string(&self, value: &Value) -> String {
        match value {
            Value::Nodes(nodes) => nodes.first().map(|n| self.string_value(*n)).unwrap_or_default(),
            Value::Str(s) => s.clone(),
            Value::Num(n) => format_number(*n),
            Value::Bool(b) => b.to_string(),
        }
    }

    fn number(&self, value: &Value) -> f64 {
        match value {
            Value::Num(n) => *n,
            Value::Bool(b) => {
                if *b { 1.0 } else { 0.0 }
            }
            other => self.string(other).trim().parse::<f64>().unwrap_or(f64::NAN),
        }
    }

    fn boolean(&self, value: &Value) -> bool {
        match value {
            Value::Nodes(nodes) => !nodes.is_empty(),
            Value::Str(s) => !s.is_empty(),
            Value::Num(n) => *n != 0.0 && !n.is_nan(),
            Value::Bool(b) => *b,
        }
    }

    fn compare(&self, op: CmpOp, a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Nodes(xs), Value::Nodes(ys)) => xs.iter().any(|x| {
                let sx = self.string_value(*x);
                ys.iter()
                    .any(|y| compare_atoms(op, &Value::Str(sx.clone()), &Value::Str(self.string_value(*y)), self))
            }),
            (Value::Nodes(xs), other) => {
                if let Value::Bool(_) = other {
                    return compare_atoms(op, &Value::Bool(!xs.is_empty()), other, self);
                }
                xs.iter()
                    .any(|x| compare_atoms(op, &Value::Str(self.string_value(*x)), other, self))
            }
            (other, Value::Nodes(ys)) => {
                if let Value::Bool(_) = other {
                    return compare_atoms(op, other, &Value::Bool(!ys.is_empty()), self);
                }
                ys.iter()
                    .any(|y| compare_atoms(op, other, &Value::Str(self.string_value(*y)), self))
            }
            _ => compare_atoms(op, a, b, self),
        }
    }

    fn call(&self, name: &str, args: &[Expr], ctx: &Context) -> Result<Value, SelectorError> {
        let arg = |i: usize| -> Result<Value, SelectorError> {
            match args.get(i) {
                Some(expr) => self.eval(expr, ctx),
                None => Err(self.error(&format!("{name}() is missing an argument"))),
            }
        };
        let arg_or_context = |i: usize| -> Result<Value, SelectorError> {
            if args.len() > i {
                arg(i)
            } else {
                Ok(Value::Nodes(vec![ctx.node]))
            }
        };

        Ok(match name {
            "last" => Value::Num(ctx.size as f64),
            "position" => Value::Num(ctx.position as f64),
            "count" => Value::Num(self.node_set(arg(0)?)?.len() as f64),
            "string" => Value::Str(self.string(&arg_or_context(0)?)),
            "concat" => {
                let mut out = String::new();
                for i in 0..args.len() {
                    out.push_str(&self.string(&arg(i)?));
                }
                Value::Str(out)
            }
            "contains" => Value::Bool(self.string(&arg(0)?).contains(&self.string(&arg(1)?))),
            "starts-with" => Value::Bool(self.string(&arg(0)?).starts_with(&self.string(&arg(1)?))),
            "ends-with" => Value::Bool(self.string(&arg(0)?).ends_with(&self.string(&arg(1)?))),
            "normalize-space" => Value::Str(snap_dom::normalize_whitespace(&self.string(&arg_or_context(0)?))),
            "string-length" => Value::Num(self.string(&arg_or_context(0)?).chars().count() as f64),
            "translate" => {
                let source = self.string(&arg(0)?);
                let from: Vec<char> = self.string(&arg(1)?).chars().collect();
                let to: Vec<char> = self.string(&arg(2)?).chars().collect();
                Value::Str(
                    source
                        .chars()
                        .filter_map(|c| match from.iter().position(|f| *f == c) {
                            Some(i) => to.get(i).copied(),
                            None => Some(c),
                        })
                        .collect(),
                )
            }
            "not" => Value::Bool(!self.boolean(&arg(0)?)),
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            "boolean" => Value::Bool(self.boolean(&arg(0)?)),
            "number" => Value::Num(self.number(&arg_or_context(0)?)),
            "name" | "local-name" => {
                let nodes = self.node_set(arg_or_context(0)?)?;
                let name = match nodes.first() {
                    Some(XNode::Node(id)) => self.tree.tag_name(*id).unwrap_or("").to_string(),
                    Some(XNode::Attr(owner, i)) => self
                        .tree
                        .element(*owner)
                        .and_then(|e| e.attrs.get(*i))
                        .map(|a| a.name.clone())
                        .unwrap_or_default(),
                    None => String::new(),
                };
                Value::Str(name)
            }
            _ => return Err(self.error(&format!("unknown function {name}()"))),
        })
    }
}

fn compare_atoms(op: CmpOp, a: &Value, b: &Value, eval: &Evaluator<'_>) -> bool {
    match op {
        CmpOp::Eq | CmpOp::NotEq => {
            let equal = match (a, b) {
                (Value::Bool(_), _) | (_, Value::Bool(_)) => eval.boolean(a) == eval.boolean(b),
                (Value::Num(_), _) | (_, Value::Num(_)) => eval.number(a) == eval.number(b),
                _ => eval.string(a) == eval.string(b),
            };
            if op == CmpOp::Eq { equal } else { !equal }
        }
        CmpOp::Lt => eval.number(a) < eval.number(b),
        CmpOp::Le => eval.number(a) <= eval.number(b),
        CmpOp::Gt => eval.number(a) > eval.number(b),
        CmpOp::Ge => eval.number(a) >= eval.number(b),
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity".to_string() } else { "-Infinity".to_string() }
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}
