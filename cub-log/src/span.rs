/// Span identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SpanId(pub u64);

/// A named execution context (a pipeline phase, a run)
#[derive(Clone, Debug, PartialEq)]
pub struct Span {
    pub id: SpanId,
    pub name: &'static str,
}

impl Span {
    pub const fn new(id: SpanId, name: &'static str) -> Self {
        Span { id, name }
    }
}
