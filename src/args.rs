//! Arguments extracted from a matched command
//!
//! Captures are kept as text, in placeholder order. The typed accessors
//! parse them on demand so a handler bound to
//! `vset /camera/[uint]/fov [float]` can read `args.uint(0)?` and
//! `args.float(1)?` without repeating the parsing rules.

use dispatch_types::TypeSpecifier;

use crate::error::CommandError;

/// Ordered arguments passed to a command handler
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandArgs {
    values: Vec<String>,
}

impl CommandArgs {
    pub fn new(values: Vec<String>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw text of argument `index`
    pub fn get(&self, index: usize) -> Option<&str> {
        self.values.get(index).map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(String::as_str)
    }

    pub fn into_vec(self) -> Vec<String> {
        self.values
    }

    /// Argument `index` as text
    pub fn str(&self, index: usize) -> Result<&str, CommandError> {
        self.get(index).ok_or(CommandError::MissingArgument { index })
    }

    /// Argument `index` parsed as an unsigned integer
    pub fn uint(&self, index: usize) -> Result<u64, CommandError> {
        let value = self.str(index)?;
        value.parse().map_err(|_| CommandError::InvalidArgument {
            index,
            expected: TypeSpecifier::UInt,
            value: value.to_string(),
        })
    }

    /// Argument `index` parsed as a float
    pub fn float(&self, index: usize) -> Result<f64, CommandError> {
        let value = self.str(index)?;
        value.parse().map_err(|_| CommandError::InvalidArgument {
            index,
            expected: TypeSpecifier::Float,
            value: value.to_string(),
        })
    }
}

impl From<Vec<String>> for CommandArgs {
    fn from(values: Vec<String>) -> Self {
        Self::new(values)
    }
}

impl<'a> IntoIterator for &'a CommandArgs {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> CommandArgs {
        CommandArgs::new(values.iter().map(|v| v.to_string()).collect())
    }

    #[test]
    fn test_typed_accessors() {
        let args = args(&["Chair", "42", "-3.14", "+.5"]);
        assert_eq!(args.str(0).unwrap(), "Chair");
        assert_eq!(args.uint(1).unwrap(), 42);
        assert!((args.float(2).unwrap() + 3.14).abs() < f64::EPSILON);
        assert!((args.float(3).unwrap() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_missing_argument() {
        let args = args(&["only"]);
        assert_eq!(args.uint(3), Err(CommandError::MissingArgument { index: 3 }));
    }

    #[test]
    fn test_empty_uint_is_invalid() {
        // `[uint]` matches zero digits, which is not a number.
        let args = args(&[""]);
        assert_eq!(
            args.uint(0),
            Err(CommandError::InvalidArgument {
                index: 0,
                expected: TypeSpecifier::UInt,
                value: String::new(),
            })
        );
    }

    #[test]
    fn test_iteration_order() {
        let args = args(&["a", "b", "c"]);
        assert_eq!(args.iter().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(args.len(), 3);
    }
}
