/// A source location: file ID + byte offset range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Span {
    pub file_id: u16,
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(file_id: u16, start: u32, end: u32) -> Self {
        Self {
            file_id,
            start,
            end,
        }
    }

    pub fn dummy() -> Self {
        Self {
            file_id: 0,
            start: 0,
            end: 0,
        }
    }

    pub fn merge(self, other: Span) -> Span {
        debug_assert_eq!(self.file_id, other.file_id);
        Span {
            file_id: self.file_id,
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// True when `other` lies entirely inside this span.
    pub fn contains(self, other: Span) -> bool {
        self.file_id == other.file_id && self.start <= other.start && other.end <= self.end
    }

    pub fn range(self) -> std::ops::Range<usize> {
        self.start as usize..self.end as usize
    }
}

/// A value annotated with its source span.
#[derive(Clone, Debug)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }

    pub fn dummy(node: T) -> Self {
        Self {
            node,
            span: Span::dummy(),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Spanned<U> {
        Spanned {
            node: f(self.node),
            span: self.span,
        }
    }
}

impl<T: PartialEq> PartialEq for Spanned<T> {
    /// Spans are positional metadata; two nodes are equal when their contents are.
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_takes_outer_bounds() {
        let a = Span::new(0, 4, 9);
        let b = Span::new(0, 2, 6);
        assert_eq!(a.merge(b), Span::new(0, 2, 9));
    }

    #[test]
    fn test_contains() {
        let outer = Span::new(0, 10, 50);
        assert!(outer.contains(Span::new(0, 10, 50)));
        assert!(outer.contains(Span::new(0, 20, 21)));
        assert!(!outer.contains(Span::new(0, 5, 21)));
        assert!(!outer.contains(Span::new(1, 20, 21)));
    }

    #[test]
    fn test_spanned_eq_ignores_span() {
        let a = Spanned::new("x".to_string(), Span::new(0, 1, 2));
        let b = Spanned::new("x".to_string(), Span::new(0, 7, 8));
        assert_eq!(a, b);
    }
}
