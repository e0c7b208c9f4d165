/// An identifier occurrence, with its 1-based source position.
#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
    pub name: String,
    pub line: usize,
    pub column: usize,
    /// Array-index expression applied directly to the name: `a[i]`.
    pub index: Option<Box<Node>>,
}

impl Identifier {
    pub fn new(name: impl Into<String>, line: usize, column: usize) -> Self {
        Identifier {
            name: name.into(),
            line,
            column,
            index: None,
        }
    }
}

/// `target = value`. Chained assignments nest through `value`.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub target: Identifier,
    pub value: Box<Node>,
    pub start_line: usize,
    pub end_line: usize,
}

/// `def name(params) { body }` or `def name(params) = expr;`
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Node>,
    pub start_line: usize,
    /// Last line of the signature (or of the whole definition for the `=` form).
    pub end_line: usize,
    /// Line of the closing brace, when the body is braced.
    pub body_end_line: Option<usize>,
}

/// An AST node of the block language.
///
/// The set of shapes is closed: operators are lowered to calls of reserved
/// operator functions (see [`crate::operators`]), so analyses only ever match
/// on the variants below.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    // Literals
    Number(f64),
    String(String),
    Boolean(bool),
    Null,

    // References
    Identifier(Identifier),

    // Compound expressions
    /// `{a, b}` or `[a, b]`
    List(Vec<Node>),
    /// Indexing a non-identifier base: `f(x)[0]`, `a[1][2]`
    Index {
        base: Box<Node>,
        index: Box<Node>,
    },
    /// `name(args)`
    Call {
        name: String,
        args: Vec<Node>,
    },
    /// `target.call(args)`; `call` is always a [`Node::Call`].
    DotCall {
        target: Box<Node>,
        call: Box<Node>,
    },
    /// `condition ? true_branch : false_branch`
    Conditional {
        condition: Box<Node>,
        true_branch: Box<Node>,
        false_branch: Box<Node>,
    },
    /// `start..end` or `start..end..step`
    Range {
        start: Box<Node>,
        end: Box<Node>,
        step: Option<Box<Node>>,
    },

    // Statements
    Assignment(Assignment),
    FunctionDef(FunctionDef),
}

impl Node {
    /// Short name of the node shape, for diagnostics.
    pub fn shape(&self) -> &'static str {
        match self {
            Node::Number(_) => "number literal",
            Node::String(_) => "string literal",
            Node::Boolean(_) => "boolean literal",
            Node::Null => "null literal",
            Node::Identifier(_) => "identifier",
            Node::List(_) => "list literal",
            Node::Index { .. } => "index expression",
            Node::Call { .. } => "function call",
            Node::DotCall { .. } => "dotted call",
            Node::Conditional { .. } => "inline conditional",
            Node::Range { .. } => "range expression",
            Node::Assignment(_) => "assignment",
            Node::FunctionDef(_) => "function definition",
        }
    }

    /// Direct sub-nodes, in source order.
    pub fn children(&self) -> Vec<&Node> {
        match self {
            Node::Number(_) | Node::String(_) | Node::Boolean(_) | Node::Null => Vec::new(),
            Node::Identifier(id) => id.index.as_deref().into_iter().collect(),
            Node::List(items) => items.iter().collect(),
            Node::Index { base, index } => vec![base.as_ref(), index.as_ref()],
            Node::Call { args, .. } => args.iter().collect(),
            Node::DotCall { target, call } => vec![target.as_ref(), call.as_ref()],
            Node::Conditional {
                condition,
                true_branch,
                false_branch,
            } => vec![condition.as_ref(), true_branch.as_ref(), false_branch.as_ref()],
            Node::Range { start, end, step } => {
                let mut children = vec![start.as_ref(), end.as_ref()];
                children.extend(step.as_deref());
                children
            }
            Node::Assignment(assignment) => vec![assignment.value.as_ref()],
            Node::FunctionDef(function) => function.body.iter().collect(),
        }
    }

    /// Number of nodes on the longest path down from this one. Walks the tree
    /// with an explicit stack, so any depth can be measured.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut pending = vec![(self, 1)];
        while let Some((node, depth)) = pending.pop() {
            deepest = deepest.max(depth);
            pending.extend(node.children().into_iter().map(|child| (child, depth + 1)));
        }
        deepest
    }

    /// Build `name = value` on the given line, as a code generator would.
    pub fn assign(name: impl Into<String>, value: Node, line: usize) -> Node {
        Node::Assignment(Assignment {
            target: Identifier::new(name, line, 1),
            value: Box::new(value),
            start_line: line,
            end_line: line,
        })
    }
}
