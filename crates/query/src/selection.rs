//! Parser for selection expressions such as `id,name,category(id,name)`.
//!
//! Top-level tokens are comma separated. A token of the form `table(cols)` or
//! `table!inner(cols)` embeds a related table; anything else is a column of
//! the main table. Malformed tokens (for example an unclosed parenthesis) are
//! kept as plain columns and left for the database to reject.

/// An embedded relation requested in a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationSpec {
    /// Name of the related table.
    pub table: String,

    /// Raw selection expression for the related table.
    pub columns: String,

    /// Whether main rows without a matching related row are excluded.
    pub inner: bool,
}

/// A parsed selection expression.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Columns of the main table, in order.
    pub columns: Vec<String>,

    /// Embedded relations, in declaration order.
    pub relations: Vec<RelationSpec>,
}

impl Selection {
    /// Parses a selection expression.
    #[must_use]
    pub fn parse(expr: &str) -> Self {
        let mut selection = Self::default();

        for token in split_top_level(expr) {
            if let Some(relation) = parse_relation(token) {
                selection.relations.push(relation);
            } else {
                selection.columns.push(token.to_string());
            }
        }

        selection
    }

    /// True when every column of the main table is selected, either through
    /// `*` or because no column was named.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.columns.is_empty() || self.columns.iter().any(|column| column == "*")
    }

    /// True when `column` is part of the selected output.
    #[must_use]
    pub fn includes(&self, column: &str) -> bool {
        self.is_wildcard() || self.columns.iter().any(|c| c == column)
    }
}

fn split_top_level(expr: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, ch) in expr.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                tokens.push(&expr[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    tokens.push(&expr[start..]);

    tokens.into_iter().map(str::trim).filter(|token| !token.is_empty()).collect()
}

fn parse_relation(token: &str) -> Option<RelationSpec> {
    let open = token.find('(')?;
    let inner_cols = token.strip_suffix(')')?.get(open + 1..)?;

    let name = token[..open].trim();
    let (table, inner) =
        name.strip_suffix("!inner").map_or((name, false), |table| (table.trim(), true));

    if table.is_empty() {
        return None;
    }

    Some(RelationSpec {
        table: table.to_string(),
        columns: inner_cols.trim().to_string(),
        inner,
    })
}
