//! Untyped block tree, the intermediate form between text and model.

/// A pair's right-hand side: either a quoted string or a bare token
/// (number, keyword). The distinction survives so the writer can be
/// byte-faithful.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairValue {
    Quoted(String),
    Bare(String),
}

impl PairValue {
    pub fn text(&self) -> &str {
        match self {
            PairValue::Quoted(s) | PairValue::Bare(s) => s,
        }
    }
}

/// One `name { ... }` block.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub name: String,
    pub pairs: Vec<(String, PairValue)>,
    pub children: Vec<Block>,
    /// `(x,y)` entries of a `points` block.
    pub points: Vec<(i32, i32)>,
    /// Bare list items (legacy color-map tables and the like).
    pub values: Vec<String>,
}

impl Block {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn pair(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.text())
    }

    pub fn child(&self, name: &str) -> Option<&Block> {
        self.children.iter().find(|block| block.name == name)
    }

    pub fn children_named<'b>(&'b self, name: &'b str) -> impl Iterator<Item = &'b Block> {
        self.children.iter().filter(move |block| block.name == name)
    }

    /// Indexed child blocks like `pen[0]`, `trace[2]`, in index order.
    pub fn indexed_children(&self, stem: &str) -> Vec<&Block> {
        let mut found: Vec<(usize, &Block)> = self
            .children
            .iter()
            .filter_map(|block| {
                let rest = block.name.strip_prefix(stem)?;
                let index = rest
                    .strip_prefix('[')?
                    .strip_suffix(']')?
                    .parse::<usize>()
                    .ok()?;
                Some((index, block))
            })
            .collect();
        found.sort_by_key(|(index, _)| *index);
        found.into_iter().map(|(_, block)| block).collect()
    }
}
