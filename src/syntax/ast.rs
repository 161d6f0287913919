//! The [`Syntax`] concrete syntax tree (§3.5): an immutable algebraic data
//! type whose variants correspond one-to-one with grammar productions.

use crate::syntax::Span;

#[derive(Debug, Clone, PartialEq)]
pub struct Syntax {
    pub kind: SyntaxKind,
    pub span: Span,
}

impl Syntax {
    pub fn new(kind: SyntaxKind, span: Span) -> Syntax {
        Syntax { kind, span }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyntaxKind {
    /// The empty query, `/`.
    Void,
    /// `/` standing alone as a no-op flow operator.
    Skip,
    Assign {
        lhs: Box<Syntax>,
        rhs: Box<Syntax>,
    },
    Specify {
        larms: Vec<Syntax>,
        rarms: Option<Vec<Syntax>>,
    },
    Function {
        id: String,
        args: Vec<Syntax>,
    },
    Pipe {
        id: String,
        larm: Box<Syntax>,
        rarms: Vec<Syntax>,
        is_flow: bool,
        is_open: bool,
    },
    Operator {
        sym: String,
        left: Box<Syntax>,
        right: Box<Syntax>,
    },
    Prefix {
        sym: String,
        arm: Box<Syntax>,
    },
    Filter {
        base: Box<Syntax>,
        predicate: Box<Syntax>,
    },
    Project {
        base: Box<Syntax>,
        kernel: Box<Syntax>,
    },
    Attach {
        base: Box<Syntax>,
        arm: Box<Syntax>,
    },
    Detach {
        base: Box<Syntax>,
    },
    Collect {
        base: Box<Syntax>,
    },
    Compose {
        left: Box<Syntax>,
        right: Box<Syntax>,
    },
    Unpack {
        base: Box<Syntax>,
        index: Option<usize>,
    },
    Lift {
        base: Box<Syntax>,
    },
    Group {
        base: Box<Syntax>,
    },
    Select {
        base: Box<Syntax>,
        record: Box<Syntax>,
    },
    Locate {
        base: Box<Syntax>,
        identity: Box<Syntax>,
    },
    Record {
        arms: Vec<Syntax>,
    },
    List {
        arms: Vec<Syntax>,
    },
    Identity {
        arms: Vec<Syntax>,
        is_hard: bool,
    },
    Reference {
        id: String,
    },
    Identifier {
        text: String,
    },
    String {
        text: String,
    },
    Label {
        text: String,
    },
    Integer {
        text: String,
    },
    Decimal {
        text: String,
    },
    Float {
        text: String,
    },
    /// Postfix `+`/`-` direction decorator.
    Direction {
        base: Box<Syntax>,
        is_ascending: bool,
    },
    /// `*` wild selection.
    WildSelection,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_nodes_carry_their_span() {
        let node = Syntax::new(SyntaxKind::Void, Span::new(0, 1));
        assert_eq!(node.span, Span::new(0, 1));
    }
}
