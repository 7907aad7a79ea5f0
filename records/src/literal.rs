use std::fmt;

/// One element of a bracketed sequence literal like `['Home', 'Work']` or `[12, 13]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Atom {
    Int(i64),
    Str(String),
}

impl Atom {
    /// Integers become their decimal form, strings are kept verbatim.
    pub fn into_symbol(self) -> String {
        match self {
            Atom::Int(x) => x.to_string(),
            Atom::Str(x) => x,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Problem {
    Empty,
    ExpectedOpen(char),
    ExpectedAtom(char),
    ExpectedSeparator(char),
    UnterminatedList,
    UnterminatedString,
    BadEscape(char),
    BareWord(String),
    IntOutOfRange(String),
    ExpectedInt,
    Negative(i64),
    TrailingInput,
}

/// Where and why a sequence literal failed to parse. `offset` is a byte offset into the input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LiteralError {
    pub offset: usize,
    pub problem: Problem,
}

impl fmt::Display for LiteralError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bad sequence literal at byte {}: ", self.offset)?;
        match &self.problem {
            Problem::Empty => write!(f, "empty input"),
            Problem::ExpectedOpen(c) => write!(f, "expected '[' or '(', found {c:?}"),
            Problem::ExpectedAtom(c) => write!(f, "expected a value, found {c:?}"),
            Problem::ExpectedSeparator(c) => write!(f, "expected ',' or a closing bracket, found {c:?}"),
            Problem::UnterminatedList => write!(f, "missing closing bracket"),
            Problem::UnterminatedString => write!(f, "unterminated string"),
            Problem::BadEscape(c) => write!(f, "unsupported escape \\{c}"),
            Problem::BareWord(w) => write!(f, "unquoted non-integer {w:?}"),
            Problem::IntOutOfRange(w) => write!(f, "integer {w} out of range"),
            Problem::ExpectedInt => write!(f, "expected an integer, found a string"),
            Problem::Negative(x) => write!(f, "expected a non-negative integer, found {x}"),
            Problem::TrailingInput => write!(f, "unexpected input after the closing bracket"),
        }
    }
}

impl std::error::Error for LiteralError {}

/// Parses a bracketed, comma-separated list of integers and quoted strings. Both `[...]` and
/// `(...)` are accepted, as is a trailing comma. Nothing is evaluated.
pub fn parse_list(input: &str) -> Result<Vec<Atom>, LiteralError> {
    Ok(parse_spanned(input)?
        .into_iter()
        .map(|(_, atom)| atom)
        .collect())
}

/// Parses a list of integers, every one of which has to be a valid index (non-negative).
pub fn parse_indices(input: &str) -> Result<Vec<usize>, LiteralError> {
    let mut result = Vec::new();
    for (offset, atom) in parse_spanned(input)? {
        match atom {
            Atom::Int(x) if x >= 0 => result.push(x as usize),
            Atom::Int(x) => {
                return Err(LiteralError {
                    offset,
                    problem: Problem::Negative(x),
                })
            }
            Atom::Str(_) => {
                return Err(LiteralError {
                    offset,
                    problem: Problem::ExpectedInt,
                })
            }
        }
    }
    Ok(result)
}

/// Parses a list of mixed integers and strings into symbol form.
pub fn parse_symbols(input: &str) -> Result<Vec<String>, LiteralError> {
    Ok(parse_list(input)?
        .into_iter()
        .map(Atom::into_symbol)
        .collect())
}

/// The inverse of `parse_indices`: `[1, 2, 3]`.
pub fn format_ints<T: fmt::Display>(values: &[T]) -> String {
    let parts: Vec<String> = values.iter().map(|x| x.to_string()).collect();
    format!("[{}]", parts.join(", "))
}

/// The inverse of `parse_symbols` for string lists: `['a', 'b']`.
pub fn format_strs<S: AsRef<str>>(values: &[S]) -> String {
    let parts: Vec<String> = values
        .iter()
        .map(|x| {
            let escaped = x.as_ref().replace('\\', "\\\\").replace('\'', "\\'");
            format!("'{escaped}'")
        })
        .collect();
    format!("[{}]", parts.join(", "))
}

fn parse_spanned(input: &str) -> Result<Vec<(usize, Atom)>, LiteralError> {
    let mut parser = Parser { input, pos: 0 };
    parser.skip_ws();
    let close = match parser.peek() {
        Some('[') => ']',
        Some('(') => ')',
        Some(c) => return Err(parser.error(Problem::ExpectedOpen(c))),
        None => return Err(parser.error(Problem::Empty)),
    };
    parser.bump();

    let mut atoms = Vec::new();
    loop {
        parser.skip_ws();
        match parser.peek() {
            None => return Err(parser.error(Problem::UnterminatedList)),
            Some(c) if c == close => {
                parser.bump();
                break;
            }
            _ => {}
        }

        let start = parser.pos;
        atoms.push((start, parser.atom(close)?));

        parser.skip_ws();
        match parser.peek() {
            Some(',') => parser.bump(),
            Some(c) if c == close => {
                parser.bump();
                break;
            }
            Some(c) => return Err(parser.error(Problem::ExpectedSeparator(c))),
            None => return Err(parser.error(Problem::UnterminatedList)),
        }
    }

    parser.skip_ws();
    if parser.peek().is_some() {
        return Err(parser.error(Problem::TrailingInput));
    }
    Ok(atoms)
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    fn error(&self, problem: Problem) -> LiteralError {
        LiteralError {
            offset: self.pos,
            problem,
        }
    }

    fn atom(&mut self, close: char) -> Result<Atom, LiteralError> {
        match self.peek() {
            Some(q) if q == '\'' || q == '"' => self.string(q),
            Some(c) if c == ',' || c == close => Err(self.error(Problem::ExpectedAtom(c))),
            _ => {
                let start = self.pos;
                while let Some(c) = self.peek() {
                    if c == ',' || c == close || c.is_whitespace() {
                        break;
                    }
                    self.bump();
                }
                let word = &self.input[start..self.pos];
                if let Ok(x) = word.parse::<i64>() {
                    return Ok(Atom::Int(x));
                }
                let digits = word.strip_prefix('-').unwrap_or(word);
                let problem = if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
                    Problem::IntOutOfRange(word.to_string())
                } else {
                    Problem::BareWord(word.to_string())
                };
                Err(LiteralError {
                    offset: start,
                    problem,
                })
            }
        }
    }

    fn string(&mut self, quote: char) -> Result<Atom, LiteralError> {
        let start = self.pos;
        self.bump();
        let mut value = String::new();
        loop {
            match self.peek() {
                None => {
                    return Err(LiteralError {
                        offset: start,
                        problem: Problem::UnterminatedString,
                    })
                }
                Some('\\') => {
                    self.bump();
                    let escaped = match self.peek() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some(c) if c == '\\' || c == '\'' || c == '"' => c,
                        Some(c) => return Err(self.error(Problem::BadEscape(c))),
                        None => {
                            return Err(LiteralError {
                                offset: start,
                                problem: Problem::UnterminatedString,
                            })
                        }
                    };
                    value.push(escaped);
                    self.bump();
                }
                Some(c) if c == quote => {
                    self.bump();
                    return Ok(Atom::Str(value));
                }
                Some(c) => {
                    value.push(c);
                    self.bump();
                }
            }
        }
    }
}
