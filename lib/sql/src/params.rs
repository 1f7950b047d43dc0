use rustc_hash::FxHashMap;

/// The positional parameters of a statement.
///
/// Every parameter is bound as text. Equal values share one placeholder.
#[derive(Debug, Default, Clone)]
pub struct SqlParameters {
    values: Vec<String>,
    positions: FxHashMap<String, usize>,
}

impl SqlParameters {
    /// Returns the placeholder (`$1`, `$2`, ...) for `value`.
    pub fn placeholder(&mut self, value: &str) -> String {
        let position = match self.positions.get(value) {
            Some(position) => *position,
            None => {
                self.values.push(value.to_owned());
                let position = self.values.len();
                self.positions.insert(value.to_owned(), position);
                position
            }
        };
        format!("${position}")
    }

    /// A placeholder usable in any expression position.
    pub fn text(&mut self, value: &str) -> String {
        format!("CAST({} AS TEXT)", self.placeholder(value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_values(self) -> Vec<String> {
        self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_values_share_a_placeholder() {
        let mut params = SqlParameters::default();
        assert_eq!(params.placeholder("a"), "$1");
        assert_eq!(params.placeholder("b"), "$2");
        assert_eq!(params.placeholder("a"), "$1");
        assert_eq!(params.text("b"), "CAST($2 AS TEXT)");
        assert_eq!(params.into_values(), vec!["a".to_owned(), "b".to_owned()]);
    }
}
