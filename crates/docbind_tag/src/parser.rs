//! Annotation string parser.

use crate::error::{TagError, TagResult};

/// A single parsed definition, e.g. `index(unique)` or
/// `referenceOne(targetDocument=books)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    /// Definition name, normalized to lowercase.
    pub name: String,
    /// Parameters in declaration order.
    pub params: Vec<Param>,
}

/// A `key` or `key=value` parameter inside a definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    /// Parameter key, preserved verbatim.
    pub key: String,
    /// Parameter value; empty for bare keys such as `unique`.
    pub value: String,
}

/// Parse an annotation string into its definitions.
///
/// An empty or all-whitespace string yields an empty vector.
///
/// # Errors
///
/// Returns an error if the string does not follow the annotation grammar.
pub fn parse(input: &str) -> TagResult<Vec<Definition>> {
    Parser::new(input).parse()
}

/// An annotation string parser.
///
/// The parser walks the input byte-by-byte. Names, keys and values are
/// runs of characters delimited by the structural characters
/// `( ) , = ;` and whitespace.
pub struct Parser<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    /// Create a new parser over the given annotation string.
    pub fn new(input: &'a str) -> Self {
        Self {
            data: input.as_bytes(),
            pos: 0,
        }
    }

    /// Parse all definitions.
    ///
    /// # Errors
    ///
    /// Returns an error on malformed input; a trailing `;` is tolerated.
    pub fn parse(&mut self) -> TagResult<Vec<Definition>> {
        let mut definitions = Vec::new();
        loop {
            self.skip_whitespace();
            if self.is_empty() {
                return Ok(definitions);
            }
            definitions.push(self.parse_definition()?);
            self.skip_whitespace();
            match self.peek() {
                None => return Ok(definitions),
                Some(b';') => {
                    self.pos += 1;
                }
                Some(other) => {
                    return Err(TagError::unexpected_char(
                        self.pos,
                        other as char,
                        "';' or end of annotation",
                    ))
                }
            }
        }
    }

    fn parse_definition(&mut self) -> TagResult<Definition> {
        let name = self.read_word("definition name")?;
        self.skip_whitespace();

        let mut params = Vec::new();
        if self.peek() == Some(b'(') {
            self.pos += 1;
            self.skip_whitespace();
            if self.peek() == Some(b')') {
                self.pos += 1;
            } else {
                loop {
                    params.push(self.parse_param()?);
                    self.skip_whitespace();
                    match self.next_byte()? {
                        b',' => continue,
                        b')' => break,
                        other => {
                            return Err(TagError::unexpected_char(
                                self.pos - 1,
                                other as char,
                                "',' or ')'",
                            ))
                        }
                    }
                }
            }
        }

        Ok(Definition {
            name: name.to_lowercase(),
            params,
        })
    }

    fn parse_param(&mut self) -> TagResult<Param> {
        self.skip_whitespace();
        let key = self.read_word("parameter key")?;
        self.skip_whitespace();

        // A bare key (e.g. `unique`) carries no value.
        if self.peek() != Some(b'=') {
            return Ok(Param {
                key,
                value: String::new(),
            });
        }
        self.pos += 1;
        self.skip_whitespace();

        let value_pos = self.pos;
        let value = self.read_word("parameter value").map_err(|_| {
            // An '=' with nothing after it is an empty value, not EOF.
            TagError::empty_value(value_pos, key.clone())
        })?;
        Ok(Param { key, value })
    }

    /// Reads a run of non-structural characters.
    fn read_word(&mut self, expected: &'static str) -> TagResult<String> {
        let start = self.pos;
        while let Some(byte) = self.peek() {
            if Self::is_structural(byte) || byte.is_ascii_whitespace() {
                break;
            }
            self.pos += 1;
        }
        if self.pos == start {
            return match self.peek() {
                Some(byte) => Err(TagError::unexpected_char(
                    self.pos,
                    byte as char,
                    expected,
                )),
                None => Err(TagError::UnexpectedEof),
            };
        }
        // Annotation strings come from source-level tags, which are UTF-8.
        Ok(String::from_utf8_lossy(&self.data[start..self.pos]).into_owned())
    }

    fn is_structural(byte: u8) -> bool {
        matches!(byte, b'(' | b')' | b',' | b'=' | b';')
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    #[inline]
    fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    #[inline]
    fn next_byte(&mut self) -> TagResult<u8> {
        let byte = self.peek().ok_or(TagError::UnexpectedEof)?;
        self.pos += 1;
        Ok(byte)
    }

    fn skip_whitespace(&mut self) {
        while let Some(byte) = self.peek() {
            if !byte.is_ascii_whitespace() {
                break;
            }
            self.pos += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(name: &str, params: &[(&str, &str)]) -> Definition {
        Definition {
            name: name.to_string(),
            params: params
                .iter()
                .map(|(k, v)| Param {
                    key: (*k).to_string(),
                    value: (*v).to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn empty_input() {
        assert_eq!(parse("").unwrap(), vec![]);
        assert_eq!(parse("   \t ").unwrap(), vec![]);
    }

    #[test]
    fn bare_name() {
        assert_eq!(parse("id").unwrap(), vec![def("id", &[])]);
    }

    #[test]
    fn name_with_empty_parens() {
        assert_eq!(parse("omitempty()").unwrap(), vec![def("omitempty", &[])]);
    }

    #[test]
    fn single_param() {
        assert_eq!(
            parse("referenceOne(targetDocument=books)").unwrap(),
            vec![def("referenceone", &[("targetDocument", "books")])]
        );
    }

    #[test]
    fn bare_param() {
        assert_eq!(
            parse("index(unique)").unwrap(),
            vec![def("index", &[("unique", "")])]
        );
    }

    #[test]
    fn multiple_params() {
        assert_eq!(
            parse("referenceMany(targetDocument=books, cascade=persist, load=eager)").unwrap(),
            vec![def(
                "referencemany",
                &[
                    ("targetDocument", "books"),
                    ("cascade", "persist"),
                    ("load", "eager")
                ]
            )]
        );
    }

    #[test]
    fn multiple_definitions() {
        assert_eq!(
            parse("id; index(unique); composite").unwrap(),
            vec![
                def("id", &[]),
                def("index", &[("unique", "")]),
                def("composite", &[]),
            ]
        );
    }

    #[test]
    fn trailing_semicolon() {
        assert_eq!(
            parse("omitempty;").unwrap(),
            vec![def("omitempty", &[])]
        );
    }

    #[test]
    fn whitespace_insensitive() {
        assert_eq!(
            parse("  referenceMany ( targetDocument = books , cascade = all )  ").unwrap(),
            vec![def(
                "referencemany",
                &[("targetDocument", "books"), ("cascade", "all")]
            )]
        );
    }

    #[test]
    fn names_lowercased_values_preserved() {
        let defs = parse("ReferenceOne(MappedBy=Author)").unwrap();
        assert_eq!(defs[0].name, "referenceone");
        assert_eq!(defs[0].params[0].key, "MappedBy");
        assert_eq!(defs[0].params[0].value, "Author");
    }

    #[test]
    fn unclosed_parens() {
        assert_eq!(
            parse("index(unique").unwrap_err(),
            TagError::UnexpectedEof
        );
    }

    #[test]
    fn empty_value_rejected() {
        assert!(matches!(
            parse("referenceOne(targetDocument=)").unwrap_err(),
            TagError::EmptyValue { .. }
        ));
    }

    #[test]
    fn garbage_between_definitions() {
        assert!(matches!(
            parse("id index").unwrap_err(),
            TagError::UnexpectedChar { .. }
        ));
    }
}
