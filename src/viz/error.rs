use thiserror::Error;

/// Input-shape violations detected before anything is drawn.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChartError {
    #[error("{what} must have the same length (got {left} and {right})")]
    LengthMismatch {
        what: &'static str,
        left: usize,
        right: usize,
    },

    #[error("X and Y must contain data (series {series}: x={x} y={y})")]
    EmptySeries { series: String, x: usize, y: usize },

    #[error("{entity} has no value for category {category}")]
    MissingCategory { entity: String, category: String },

    #[error("group {0} has no values")]
    EmptyGroup(String),

    #[error("Not more than two layers supported (got {0})")]
    TooManyLayers(usize),

    #[error("{what}: {colors} colors for {items} items")]
    ColorCountMismatch {
        what: &'static str,
        colors: usize,
        items: usize,
    },

    #[error("X data and relative names must have the same length: x={x} tags={tags}")]
    TagCountMismatch { x: usize, tags: usize },

    #[error("link refers to unknown node {0}")]
    UnknownNode(String),

    #[error("Please provide at least one component")]
    NoTabs,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layer_error_message() {
        assert_eq!(
            ChartError::TooManyLayers(3).to_string(),
            "Not more than two layers supported (got 3)"
        );
    }
}
