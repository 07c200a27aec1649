//! Position-indexed containment tree over CIR nodes.
//!
//! Spans are kept per level in disjoint sorted order; overlapping spans are
//! resolved into parent/child levels. By input invariant any two spans are
//! either disjoint or in strict containment; partial overlap is a contract
//! violation that fails hard in development builds and degrades to a sibling
//! insert in release builds (the caller records a diagnostic).

use crate::cir::{Function, Node, Span};

/// Outcome of an insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// The span partially overlapped an existing one; it was attached as a
    /// sibling and the containment invariant no longer holds around it.
    PartialOverlap,
}

/// Containment tree mapping token positions to the innermost covering value.
#[derive(Debug, Clone)]
pub struct SpanIndex<T> {
    root: Level<T>,
}

#[derive(Debug, Clone)]
struct Level<T> {
    cells: Vec<Cell<T>>,
}

#[derive(Debug, Clone)]
struct Cell<T> {
    span: Span,
    value: T,
    children: Option<Box<Level<T>>>,
}

impl<T> Cell<T> {
    fn new(span: Span, value: T) -> Self {
        Self {
            span,
            value,
            children: None,
        }
    }

    fn children_mut(&mut self) -> &mut Level<T> {
        self.children.get_or_insert_with(|| {
            Box::new(Level { cells: Vec::new() })
        })
    }
}

impl<T> Default for SpanIndex<T> {
    fn default() -> Self {
        Self {
            root: Level { cells: Vec::new() },
        }
    }
}

impl<T> SpanIndex<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value for `span`, resolving containment against existing
    /// entries.
    pub fn insert(&mut self, span: Span, value: T) -> InsertOutcome {
        self.root.insert(span, value)
    }

    /// The innermost value whose span covers `pos`, or none when no
    /// top-level span covers it.
    pub fn find(&self, pos: usize) -> Option<&T> {
        self.root.find(pos)
    }

    pub fn is_empty(&self) -> bool {
        self.root.cells.is_empty()
    }
}

impl<T> Level<T> {
    fn insert(&mut self, span: Span, value: T) -> InsertOutcome {
        let idx = self.cells.partition_point(|c| c.span.end < span.start);

        // No overlap at this level: plain sibling.
        if idx >= self.cells.len() || self.cells[idx].span.start > span.end {
            self.cells.insert(idx, Cell::new(span, value));
            return InsertOutcome::Inserted;
        }

        if self.cells[idx].span.contains(&span) {
            // Subspan of an existing node: descend.
            return self.cells[idx].children_mut().insert(span, value);
        }

        if span.contains(&self.cells[idx].span) {
            // Superspan: adopt every contained sibling as a child.
            let mut end = idx;
            while end < self.cells.len() && span.contains(&self.cells[end].span) {
                end += 1;
            }
            if end < self.cells.len() && self.cells[end].span.start <= span.end {
                return self.degrade_to_sibling(span, value);
            }
            let adopted: Vec<Cell<T>> = self.cells.drain(idx..end).collect();
            let mut cell = Cell::new(span, value);
            cell.children = Some(Box::new(Level { cells: adopted }));
            self.cells.insert(idx, cell);
            return InsertOutcome::Inserted;
        }

        self.degrade_to_sibling(span, value)
    }

    fn degrade_to_sibling(&mut self, span: Span, value: T) -> InsertOutcome {
        debug_assert!(false, "partial-overlap spans are not supported");
        let at = self.cells.partition_point(|c| c.span.start < span.start);
        self.cells.insert(at, Cell::new(span, value));
        InsertOutcome::PartialOverlap
    }

    fn find(&self, pos: usize) -> Option<&T> {
        let idx = self.cells.partition_point(|c| c.span.end < pos);
        let cell = self.cells.get(idx)?;
        if !cell.span.covers(pos) {
            return None;
        }
        match &cell.children {
            Some(children) => children.find(pos).or(Some(&cell.value)),
            None => Some(&cell.value),
        }
    }
}

/// Index every node of a translated function, outer nodes first so nested
/// statements land as children of their conditionals.
pub fn index_function(function: &Function) -> SpanIndex<Node> {
    let mut index = SpanIndex::new();
    fn add(index: &mut SpanIndex<Node>, nodes: &[Node]) {
        for node in nodes {
            index.insert(node.span(), node.clone());
            if let Node::If(iff) = node {
                add(index, &iff.then);
                add(index, &iff.els);
            }
        }
    }
    add(&mut index, &function.nodes);
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(start: usize, end: usize) -> Span {
        Span::new(start, end)
    }

    #[test]
    fn test_empty_index_finds_nothing() {
        let index: SpanIndex<&str> = SpanIndex::new();
        assert_eq!(index.find(0), None);
    }

    #[test]
    fn test_depth_pattern() {
        let mut index = SpanIndex::new();
        index.insert(span(0, 200), "ground");
        assert_eq!(index.find(10), Some(&"ground"));

        index.insert(span(10, 90), "mid1");
        index.insert(span(20, 30), "mid11");
        index.insert(span(40, 80), "mid12");
        index.insert(span(85, 88), "mid13");
        index.insert(span(110, 190), "mid2");
        index.insert(span(120, 130), "mid21");

        let cases: &[(usize, Option<&str>)] = &[
            (0, Some("ground")),
            (5, Some("ground")),
            (200, Some("ground")),
            (90, Some("mid1")),
            (25, Some("mid11")),
            (41, Some("mid12")),
            (79, Some("mid12")),
            (86, Some("mid13")),
            (100, Some("ground")),
            (115, Some("mid2")),
            (125, Some("mid21")),
            (201, None),
        ];
        for (pos, want) in cases {
            assert_eq!(index.find(*pos), want.as_ref(), "at position {pos}");
        }
    }

    #[test]
    fn test_late_superspan_adopts_existing_roots() {
        let mut index = SpanIndex::new();
        index.insert(span(10, 90), "ground");
        index.insert(span(20, 30), "inner");
        // A wider span arriving after its children.
        index.insert(span(0, 300), "underground");

        assert_eq!(index.find(5), Some(&"underground"));
        assert_eq!(index.find(250), Some(&"underground"));
        assert_eq!(index.find(50), Some(&"ground"));
        assert_eq!(index.find(25), Some(&"inner"));
    }

    #[test]
    fn test_superspan_adopts_multiple_siblings() {
        let mut index = SpanIndex::new();
        index.insert(span(10, 20), "a");
        index.insert(span(30, 40), "b");
        index.insert(span(50, 60), "c");
        index.insert(span(5, 45), "outer");

        assert_eq!(index.find(15), Some(&"a"));
        assert_eq!(index.find(35), Some(&"b"));
        assert_eq!(index.find(25), Some(&"outer"));
        assert_eq!(index.find(55), Some(&"c"));
        assert_eq!(index.find(70), None);
    }

    #[test]
    fn test_equal_spans_nest() {
        let mut index = SpanIndex::new();
        index.insert(span(10, 20), "first");
        index.insert(span(10, 20), "second");
        // The later equal span nests under the earlier one; lookups return
        // the innermost entry.
        assert_eq!(index.find(15), Some(&"second"));
    }

    #[test]
    #[should_panic(expected = "partial-overlap")]
    fn test_partial_overlap_fails_in_development() {
        let mut index = SpanIndex::new();
        index.insert(span(10, 30), "a");
        index.insert(span(20, 40), "b");
    }

    #[test]
    fn test_index_function_returns_innermost_node() {
        use crate::cir::{Assign, Cond, If, Node, Position, Return, Source};

        let assign = Node::Assign(Assign {
            pos: Position::default(),
            span: span(10, 40),
            name: "err".to_string(),
            source: Source::Nil,
            discarded: false,
        });
        let ret = Node::Return(Return {
            pos: Position::default(),
            span: span(60, 80),
            name: "err".to_string(),
        });
        let iff = Node::If(If {
            pos: Position::default(),
            span: span(50, 100),
            cond: Cond::NotNil("err".to_string()),
            then: vec![ret],
            els: vec![],
        });
        let function = Function {
            name: "f".to_string(),
            returns_error: true,
            nodes: vec![assign, iff],
        };

        let index = index_function(&function);
        assert!(matches!(index.find(15), Some(Node::Assign(_))));
        assert!(matches!(index.find(55), Some(Node::If(_))));
        assert!(matches!(index.find(70), Some(Node::Return(_))));
        assert_eq!(index.find(45), None);
    }
}
