//! Three-address intermediate representation of method bodies.
//!
//! Statements are addressed by their position in the body ([`StmtId`]); jumps
//! name the target position directly.

use std::collections::HashSet;
use std::fmt::{self, Display, Formatter};

use crate::error::{Error, Result};
use crate::types::{Sort, StmtId};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Object(String),
    Array(Box<Type>),
}

impl Type {
    pub fn object(class: &str) -> Self {
        Type::Object(class.to_string())
    }

    pub fn array(element: Type) -> Self {
        Type::Array(Box::new(element))
    }

    pub fn sort(&self) -> Sort {
        match self {
            Type::Boolean => Sort::Bool,
            Type::Byte | Type::Char | Type::Short | Type::Int | Type::Long => Sort::Int,
            Type::Object(_) | Type::Array(_) => Sort::Object,
        }
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Type::Boolean => f.write_str("boolean"),
            Type::Byte => f.write_str("byte"),
            Type::Char => f.write_str("char"),
            Type::Short => f.write_str("short"),
            Type::Int => f.write_str("int"),
            Type::Long => f.write_str("long"),
            Type::Object(class) => f.write_str(class),
            Type::Array(element) => write!(f, "{}[]", element),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Local(String),
    Int(i64),
    Bool(bool),
    Null,
}

impl Operand {
    pub fn local(name: &str) -> Self {
        Operand::Local(name.to_string())
    }

    fn local_name(&self) -> Option<&str> {
        match self {
            Operand::Local(name) => Some(name),
            _ => None,
        }
    }
}

impl Display for Operand {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Local(name) => f.write_str(name),
            Operand::Int(n) => write!(f, "{}", n),
            Operand::Bool(b) => write!(f, "{}", b),
            Operand::Null => f.write_str("null"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinOp {
    fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    fn symbol(self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rvalue {
    Use(Operand),
    Neg(Operand),
    Binary(BinOp, Operand, Operand),
    Compare(CmpOp, Operand, Operand),
}

impl Rvalue {
    fn operands(&self) -> Vec<&Operand> {
        match self {
            Rvalue::Use(a) | Rvalue::Neg(a) => vec![a],
            Rvalue::Binary(_, a, b) | Rvalue::Compare(_, a, b) => vec![a, b],
        }
    }
}

impl Display for Rvalue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Rvalue::Use(a) => write!(f, "{}", a),
            Rvalue::Neg(a) => write!(f, "-{}", a),
            Rvalue::Binary(op, a, b) => write!(f, "{} {} {}", a, op.symbol(), b),
            Rvalue::Compare(op, a, b) => write!(f, "{} {} {}", a, op.symbol(), b),
        }
    }
}

/// Branch condition of an `if` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub op: CmpOp,
    pub lhs: Operand,
    pub rhs: Operand,
}

impl Condition {
    pub fn new(op: CmpOp, lhs: Operand, rhs: Operand) -> Self {
        Self { op, lhs, rhs }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRef {
    pub class: String,
    pub name: String,
    pub ty: Type,
}

impl FieldRef {
    pub fn new(class: &str, name: &str, ty: Type) -> Self {
        Self {
            class: class.to_string(),
            name: name.to_string(),
            ty,
        }
    }

    /// Identifier of the field as a heap location component, e.g. `Node.next`.
    pub fn id(&self) -> String {
        format!("{}.{}", self.class, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodRef {
    pub class: String,
    pub name: String,
    pub params: Vec<Type>,
    /// `None` for `void`.
    pub ret: Option<Type>,
}

impl MethodRef {
    pub fn new(class: &str, name: &str, params: Vec<Type>, ret: Option<Type>) -> Self {
        Self {
            class: class.to_string(),
            name: name.to_string(),
            params,
            ret,
        }
    }

    /// Full signature, e.g. `<java.lang.Math: int abs(int)>`.
    pub fn signature(&self) -> String {
        format!("<{}: {}>", self.class, sub_signature(&self.name, &self.params, self.ret.as_ref()))
    }
}

fn sub_signature(name: &str, params: &[Type], ret: Option<&Type>) -> String {
    let params: Vec<String> = params.iter().map(|t| t.to_string()).collect();
    let ret = ret.map_or_else(|| "void".to_string(), |t| t.to_string());
    format!("{} {}({})", ret, name, params.join(","))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvokeKind {
    Static,
    Virtual(Operand),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    Assign {
        lhs: String,
        rhs: Rvalue,
    },
    ReadField {
        lhs: String,
        base: Operand,
        field: FieldRef,
    },
    WriteField {
        base: Operand,
        field: FieldRef,
        value: Operand,
    },
    ReadArray {
        lhs: String,
        array: Operand,
        index: Operand,
    },
    WriteArray {
        array: Operand,
        index: Operand,
        value: Operand,
    },
    ArrayLength {
        lhs: String,
        array: Operand,
    },
    Invoke {
        lhs: Option<String>,
        kind: InvokeKind,
        method: MethodRef,
        args: Vec<Operand>,
    },
    If {
        cond: Condition,
        target: StmtId,
    },
    Goto(StmtId),
    Nop,
    Return(Option<Operand>),
    Throw(Operand),
    /// Statement kind the analysis does not model, kept for its text.
    Other(String),
}

impl Stmt {
    pub fn assign(lhs: &str, rhs: Rvalue) -> Self {
        Stmt::Assign {
            lhs: lhs.to_string(),
            rhs,
        }
    }

    pub fn branch(op: CmpOp, lhs: Operand, rhs: Operand, target: usize) -> Self {
        Stmt::If {
            cond: Condition::new(op, lhs, rhs),
            target: StmtId::new(target),
        }
    }

    pub fn goto(target: usize) -> Self {
        Stmt::Goto(StmtId::new(target))
    }

    /// Whether control never continues past this statement inside the method.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stmt::Return(_) | Stmt::Throw(_))
    }

    /// Jump target, for `if` and `goto`.
    pub fn target(&self) -> Option<StmtId> {
        match self {
            Stmt::If { target, .. } | Stmt::Goto(target) => Some(*target),
            _ => None,
        }
    }

    /// Local variable written by this statement.
    pub fn defined_local(&self) -> Option<&str> {
        match self {
            Stmt::Assign { lhs, .. }
            | Stmt::ReadField { lhs, .. }
            | Stmt::ReadArray { lhs, .. }
            | Stmt::ArrayLength { lhs, .. } => Some(lhs),
            Stmt::Invoke { lhs, .. } => lhs.as_deref(),
            _ => None,
        }
    }

    /// Local variables read by this statement.
    pub fn used_locals(&self) -> Vec<&str> {
        let operands: Vec<&Operand> = match self {
            Stmt::Assign { rhs, .. } => rhs.operands(),
            Stmt::ReadField { base, .. } => vec![base],
            Stmt::WriteField { base, value, .. } => vec![base, value],
            Stmt::ReadArray { array, index, .. } => vec![array, index],
            Stmt::WriteArray { array, index, value } => vec![array, index, value],
            Stmt::ArrayLength { array, .. } => vec![array],
            Stmt::Invoke { kind, args, .. } => {
                let mut ops: Vec<&Operand> = args.iter().collect();
                if let InvokeKind::Virtual(receiver) = kind {
                    ops.insert(0, receiver);
                }
                ops
            }
            Stmt::If { cond, .. } => vec![&cond.lhs, &cond.rhs],
            Stmt::Return(Some(value)) | Stmt::Throw(value) => vec![value],
            Stmt::Goto(_) | Stmt::Nop | Stmt::Return(None) | Stmt::Other(_) => Vec::new(),
        };
        operands.into_iter().filter_map(Operand::local_name).collect()
    }
}

impl Display for Stmt {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Stmt::Assign { lhs, rhs } => write!(f, "{} = {}", lhs, rhs),
            Stmt::ReadField { lhs, base, field } => write!(f, "{} = {}.{}", lhs, base, field.id()),
            Stmt::WriteField { base, field, value } => {
                write!(f, "{}.{} = {}", base, field.id(), value)
            }
            Stmt::ReadArray { lhs, array, index } => write!(f, "{} = {}[{}]", lhs, array, index),
            Stmt::WriteArray { array, index, value } => {
                write!(f, "{}[{}] = {}", array, index, value)
            }
            Stmt::ArrayLength { lhs, array } => write!(f, "{} = lengthof {}", lhs, array),
            Stmt::Invoke {
                lhs,
                kind,
                method,
                args,
            } => {
                if let Some(lhs) = lhs {
                    write!(f, "{} = ", lhs)?;
                }
                let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                match kind {
                    InvokeKind::Static => write!(f, "staticinvoke ")?,
                    InvokeKind::Virtual(receiver) => write!(f, "virtualinvoke {}.", receiver)?,
                }
                write!(f, "{}({})", method.signature(), args.join(", "))
            }
            Stmt::If { cond, target } => write!(
                f,
                "if {} {} {} goto {}",
                cond.lhs,
                cond.op.symbol(),
                cond.rhs,
                target.index()
            ),
            Stmt::Goto(target) => write!(f, "goto {}", target.index()),
            Stmt::Nop => f.write_str("nop"),
            Stmt::Return(Some(value)) => write!(f, "return {}", value),
            Stmt::Return(None) => f.write_str("return"),
            Stmt::Throw(value) => write!(f, "throw {}", value),
            Stmt::Other(text) => f.write_str(text),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Method {
    pub class: String,
    pub name: String,
    pub params: Vec<(String, Type)>,
    pub locals: Vec<(String, Type)>,
    /// `None` for `void`.
    pub ret: Option<Type>,
    pub body: Vec<Stmt>,
}

impl Method {
    pub fn builder(class: &str, name: &str) -> MethodBuilder {
        MethodBuilder::new(class, name)
    }

    /// Sub-signature used to look the method up, e.g. `int count(int)`.
    pub fn signature(&self) -> String {
        let params: Vec<Type> = self.params.iter().map(|(_, t)| t.clone()).collect();
        sub_signature(&self.name, &params, self.ret.as_ref())
    }

    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.body[id.index()]
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Check jump targets, declared locals, return values and termination.
    pub fn validate(&self) -> Result<()> {
        if self.body.is_empty() {
            return Err(Error::EmptyBody);
        }
        let declared: HashSet<&str> = self
            .params
            .iter()
            .chain(self.locals.iter())
            .map(|(name, _)| name.as_str())
            .collect();

        for (i, stmt) in self.body.iter().enumerate() {
            let id = StmtId::new(i);
            if let Some(target) = stmt.target() {
                if target.index() >= self.body.len() {
                    return Err(Error::InvalidJumpTarget { stmt: id, target });
                }
            }
            for name in stmt.defined_local().into_iter().chain(stmt.used_locals()) {
                if !declared.contains(name) {
                    return Err(Error::UndeclaredLocal {
                        stmt: id,
                        name: name.to_string(),
                    });
                }
            }
            if let Stmt::Return(value) = stmt {
                if value.is_some() != self.ret.is_some() {
                    return Err(Error::ReturnMismatch { stmt: id });
                }
            }
            let falls_through = !stmt.is_terminal() && !matches!(stmt, Stmt::Goto(_));
            if falls_through && i + 1 == self.body.len() {
                return Err(Error::MissingTerminator { stmt: id });
            }
        }
        Ok(())
    }
}

/// Incremental construction of a [`Method`].
#[derive(Debug, Clone)]
pub struct MethodBuilder {
    method: Method,
}

impl MethodBuilder {
    pub fn new(class: &str, name: &str) -> Self {
        Self {
            method: Method {
                class: class.to_string(),
                name: name.to_string(),
                params: Vec::new(),
                locals: Vec::new(),
                ret: None,
                body: Vec::new(),
            },
        }
    }

    pub fn param(mut self, name: &str, ty: Type) -> Self {
        self.method.params.push((name.to_string(), ty));
        self
    }

    pub fn local(mut self, name: &str, ty: Type) -> Self {
        self.method.locals.push((name.to_string(), ty));
        self
    }

    pub fn returns(mut self, ty: Type) -> Self {
        self.method.ret = Some(ty);
        self
    }

    pub fn stmt(mut self, stmt: Stmt) -> Self {
        self.method.body.push(stmt);
        self
    }

    pub fn stmts(mut self, stmts: impl IntoIterator<Item = Stmt>) -> Self {
        self.method.body.extend(stmts);
        self
    }

    /// Finish the method, validating its body.
    pub fn build(self) -> Result<Method> {
        self.method.validate()?;
        Ok(self.method)
    }
}

/// A set of methods, looked up by class name and sub-signature.
#[derive(Debug, Clone, Default)]
pub struct Program {
    methods: Vec<Method>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, method: Method) {
        self.methods.push(method);
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    pub fn find(&self, class: &str, signature: &str) -> Result<&Method> {
        self.methods
            .iter()
            .find(|m| m.class == class && m.signature() == signature)
            .ok_or_else(|| Error::MethodNotFound {
                class: class.to_string(),
                signature: signature.to_string(),
            })
    }
}

impl FromIterator<Method> for Program {
    fn from_iter<I: IntoIterator<Item = Method>>(iter: I) -> Self {
        Self {
            methods: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local(name: &str) -> Operand {
        Operand::local(name)
    }

    fn abs_method() -> MethodBuilder {
        Method::builder("Demo", "abs")
            .param("x", Type::Int)
            .returns(Type::Int)
            .stmt(Stmt::branch(CmpOp::Ge, local("x"), Operand::Int(0), 3))
            .stmt(Stmt::assign("x", Rvalue::Neg(local("x"))))
            .stmt(Stmt::goto(3))
            .stmt(Stmt::Return(Some(local("x"))))
    }

    #[test]
    fn test_signatures() {
        let m = abs_method().build().unwrap();
        assert_eq!(m.signature(), "int abs(int)");
        let callee = MethodRef::new(
            "java.lang.Math",
            "max",
            vec![Type::Int, Type::Int],
            Some(Type::Int),
        );
        assert_eq!(callee.signature(), "<java.lang.Math: int max(int,int)>");
        let arr = MethodRef::new("A", "fill", vec![Type::array(Type::Int)], None);
        assert_eq!(arr.signature(), "<A: void fill(int[])>");
    }

    #[test]
    fn test_validate_jump_target() {
        let err = Method::builder("Demo", "f")
            .stmt(Stmt::goto(5))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            Error::InvalidJumpTarget {
                stmt: StmtId::new(0),
                target: StmtId::new(5)
            }
        );
    }

    #[test]
    fn test_validate_locals() {
        let err = Method::builder("Demo", "f")
            .stmt(Stmt::assign("y", Rvalue::Use(Operand::Int(1))))
            .stmt(Stmt::Return(None))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::UndeclaredLocal { ref name, .. } if name == "y"));
    }

    #[test]
    fn test_validate_termination_and_returns() {
        assert_eq!(
            Method::builder("Demo", "f").build().unwrap_err(),
            Error::EmptyBody
        );
        let err = Method::builder("Demo", "f")
            .stmt(Stmt::Nop)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::MissingTerminator { .. }));
        let err = Method::builder("Demo", "f")
            .stmt(Stmt::Return(Some(Operand::Int(1))))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::ReturnMismatch { .. }));
    }

    #[test]
    fn test_display() {
        let m = abs_method().build().unwrap();
        let text: Vec<String> = m.body.iter().map(|s| s.to_string()).collect();
        assert_eq!(text, vec!["if x >= 0 goto 3", "x = -x", "goto 3", "return x"]);

        let call = Stmt::Invoke {
            lhs: Some("r".into()),
            kind: InvokeKind::Virtual(local("o")),
            method: MethodRef::new("A", "get", vec![], Some(Type::Int)),
            args: vec![],
        };
        assert_eq!(call.to_string(), "r = virtualinvoke o.<A: int get()>()");
    }

    #[test]
    fn test_program_lookup() {
        let program: Program = [abs_method().build().unwrap()].into_iter().collect();
        assert!(program.find("Demo", "int abs(int)").is_ok());
        assert_eq!(
            program.find("Demo", "int abs(long)").unwrap_err(),
            Error::MethodNotFound {
                class: "Demo".into(),
                signature: "int abs(long)".into()
            }
        );
    }
}
