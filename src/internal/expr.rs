use crate::internal::value::Value;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

// ========================================================================= //

/// A `WHERE` condition on the rows of a table.
///
/// Conditions are built from column references and literals with the
/// comparison methods (`eq`, `lt`, ...), null tests, and the logical
/// connectives.  A comparison in which either side is null, or in which an
/// integer meets a string, is false.
#[derive(Clone, Debug)]
pub struct Expr {
    node: Node,
}

impl Expr {
    fn compare(self, op: CmpOp, rhs: Expr) -> Expr {
        Expr { node: Node::Compare(op, Box::new(self.node), Box::new(rhs.node)) }
    }

    /// Returns an expression for the value of the named column.
    pub fn col<S: Into<String>>(column_name: S) -> Expr {
        Expr { node: Node::Column(column_name.into()) }
    }

    /// Returns a null literal.
    pub fn null() -> Expr {
        Expr { node: Node::Literal(Value::Null) }
    }

    /// Returns an integer literal.
    pub fn integer(integer: i32) -> Expr {
        Expr { node: Node::Literal(Value::Int(integer)) }
    }

    /// Returns a string literal.
    pub fn string<S: Into<String>>(string: S) -> Expr {
        Expr { node: Node::Literal(Value::Str(string.into())) }
    }

    /// True if both sides hold equal values.
    pub fn eq(self, rhs: Expr) -> Expr {
        self.compare(CmpOp::Eq, rhs)
    }

    /// True if both sides hold values of the same type that differ.
    pub fn ne(self, rhs: Expr) -> Expr {
        self.compare(CmpOp::Ne, rhs)
    }

    /// True if the left side is strictly less than the right side.
    pub fn lt(self, rhs: Expr) -> Expr {
        self.compare(CmpOp::Lt, rhs)
    }

    /// True if the left side is less than or equal to the right side.
    pub fn le(self, rhs: Expr) -> Expr {
        self.compare(CmpOp::Le, rhs)
    }

    /// True if the left side is strictly greater than the right side.
    pub fn gt(self, rhs: Expr) -> Expr {
        self.compare(CmpOp::Gt, rhs)
    }

    /// True if the left side is greater than or equal to the right side.
    pub fn ge(self, rhs: Expr) -> Expr {
        self.compare(CmpOp::Ge, rhs)
    }

    /// True if the expression is null (`IS NULL`).
    pub fn is_null(self) -> Expr {
        Expr { node: Node::NullTest(Box::new(self.node), true) }
    }

    /// True if the expression is not null (`IS NOT NULL`).
    pub fn is_not_null(self) -> Expr {
        Expr { node: Node::NullTest(Box::new(self.node), false) }
    }

    /// True if both conditions hold.
    pub fn and(self, rhs: Expr) -> Expr {
        Expr {
            node: Node::Logic(Logic::And,
                              Box::new(self.node),
                              Box::new(rhs.node)),
        }
    }

    /// True if either condition holds.
    pub fn or(self, rhs: Expr) -> Expr {
        Expr {
            node: Node::Logic(Logic::Or, Box::new(self.node), Box::new(rhs.node)),
        }
    }

    /// True if the condition does not hold.
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Expr {
        Expr { node: Node::Not(Box::new(self.node)) }
    }

    /// Tests the condition against one row, using `lookup` to get the value
    /// of each referenced column.  A bare column or literal holds when it is
    /// a nonzero integer or a nonempty string.
    pub fn matches<F: Fn(&str) -> Value>(&self, lookup: &F) -> bool {
        self.node.test(lookup)
    }

    /// Returns the names of all columns the condition refers to.
    pub fn column_names(&self) -> HashSet<&str> {
        let mut names = HashSet::new();
        self.node.collect_columns(&mut names);
        names
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        self.node.write(formatter, 0)
    }
}

// ========================================================================= //

#[derive(Clone, Debug)]
enum Node {
    Literal(Value),
    Column(String),
    Compare(CmpOp, Box<Node>, Box<Node>),
    NullTest(Box<Node>, bool),
    Logic(Logic, Box<Node>, Box<Node>),
    Not(Box<Node>),
}

impl Node {
    fn value(&self, lookup: &dyn Fn(&str) -> Value) -> Value {
        match self {
            Node::Literal(value) => value.clone(),
            Node::Column(name) => lookup(name),
            other => Value::from_bool(other.test(lookup)),
        }
    }

    fn test(&self, lookup: &dyn Fn(&str) -> Value) -> bool {
        match self {
            Node::Literal(_) | Node::Column(_) => {
                self.value(lookup).to_bool()
            }
            Node::Compare(op, lhs, rhs) => {
                let lhs = lhs.value(lookup);
                let rhs = rhs.value(lookup);
                let ordering = match (&lhs, &rhs) {
                    (Value::Int(a), Value::Int(b)) => a.cmp(b),
                    (Value::Str(a), Value::Str(b)) => a.cmp(b),
                    _ => return false,
                };
                op.holds(ordering)
            }
            Node::NullTest(arg, want_null) => {
                arg.value(lookup).is_null() == *want_null
            }
            Node::Logic(Logic::And, lhs, rhs) => {
                lhs.test(lookup) && rhs.test(lookup)
            }
            Node::Logic(Logic::Or, lhs, rhs) => {
                lhs.test(lookup) || rhs.test(lookup)
            }
            Node::Not(arg) => !arg.test(lookup),
        }
    }

    fn collect_columns<'a>(&'a self, names: &mut HashSet<&'a str>) {
        match self {
            Node::Literal(_) => {}
            Node::Column(name) => {
                names.insert(name.as_str());
            }
            Node::NullTest(arg, _) | Node::Not(arg) => {
                arg.collect_columns(names)
            }
            Node::Compare(_, lhs, rhs) | Node::Logic(_, lhs, rhs) => {
                lhs.collect_columns(names);
                rhs.collect_columns(names);
            }
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Node::Logic(Logic::Or, _, _) => 1,
            Node::Logic(Logic::And, _, _) => 2,
            Node::Not(_) => 3,
            Node::Compare(..) | Node::NullTest(..) => 4,
            Node::Literal(_) | Node::Column(_) => 5,
        }
    }

    fn write(&self, formatter: &mut fmt::Formatter, outer: u8)
             -> fmt::Result {
        let prec = self.precedence();
        if prec < outer {
            formatter.write_str("(")?;
        }
        match self {
            Node::Literal(value) => formatter.write_str(&value.to_sql())?,
            Node::Column(name) => write!(formatter, "`{}`", name)?,
            Node::Compare(op, lhs, rhs) => {
                lhs.write(formatter, prec + 1)?;
                write!(formatter, " {} ", op.symbol())?;
                rhs.write(formatter, prec + 1)?;
            }
            Node::NullTest(arg, want_null) => {
                arg.write(formatter, prec + 1)?;
                formatter.write_str(if *want_null {
                    " IS NULL"
                } else {
                    " IS NOT NULL"
                })?;
            }
            Node::Logic(logic, lhs, rhs) => {
                lhs.write(formatter, prec)?;
                formatter.write_str(match logic {
                    Logic::And => " AND ",
                    Logic::Or => " OR ",
                })?;
                rhs.write(formatter, prec + 1)?;
            }
            Node::Not(arg) => {
                formatter.write_str("NOT ")?;
                arg.write(formatter, prec)?;
            }
        }
        if prec < outer {
            formatter.write_str(")")?;
        }
        Ok(())
    }
}

// ========================================================================= //

#[derive(Clone, Copy, Debug)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    fn holds(self, ordering: Ordering) -> bool {
        match self {
            CmpOp::Eq => ordering == Ordering::Equal,
            CmpOp::Ne => ordering != Ordering::Equal,
            CmpOp::Lt => ordering == Ordering::Less,
            CmpOp::Le => ordering != Ordering::Greater,
            CmpOp::Gt => ordering == Ordering::Greater,
            CmpOp::Ge => ordering != Ordering::Less,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::Ne => "<>",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Logic {
    And,
    Or,
}

// ========================================================================= //


// ========================================================================= //
