use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::calibration::CalibrationModel;

/// Name of the setting holding the 4x4 disparity-to-depth matrix.
pub const Q_MATRIX_KEY: &str = "Q_Matrix";
/// Legacy name of the [`Q_MATRIX_KEY`] setting.
pub const Q_MATRIX_LEGACY_KEY: &str = "name";
/// Name of the setting holding the 2x2 color camera matrix.
pub const COLOR_MATRIX_KEY: &str = "Color_camera_Matrix";
/// Name of the setting holding the 4x4 depth-to-color transform.
pub const ROTATION_TRANSLATION_KEY: &str = "Rotation_Translation_Matrix";

/// Error types for the calibration reader.
#[derive(Debug, thiserror::Error)]
pub enum CalibrationError {
    /// Error reading the calibration file
    #[error("Failed to read calibration file")]
    Io(#[from] std::io::Error),

    /// Syntax error in a libconfig file
    #[error("Parse error at line {line}: {msg}")]
    Parse {
        /// Line of the error, starting at 1.
        line: usize,
        /// Description of the error.
        msg: String,
    },

    /// A required setting is missing
    #[error("No '{0}' setting in calibration file")]
    MissingKey(&'static str),

    /// A matrix setting has the wrong number of entries
    #[error("Setting '{key}' has {got} values, expected {expected}")]
    WrongValueCount {
        /// The setting name.
        key: &'static str,
        /// The number of entries of the matrix.
        expected: usize,
        /// The number of entries found.
        got: usize,
    },

    /// A matrix entry is not a number
    #[error("Setting '{key}' has a non-numeric entry '{value}'")]
    InvalidNumber {
        /// The setting name.
        key: &'static str,
        /// The offending entry.
        value: String,
    },

    /// A matrix setting is neither a string nor a list of numbers
    #[error("Setting '{0}' must be a string or a list of numbers")]
    UnsupportedValue(&'static str),

    /// Error decoding a JSON calibration file
    #[error("Failed to decode JSON calibration file")]
    Json(#[from] serde_json::Error),

    /// Unsupported calibration file extension
    #[error("Unsupported calibration file extension. Got:{0}")]
    UnsupportedExtension(String),
}

/// The value of a matrix setting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MatrixValue {
    /// Comma separated row-major entries, e.g. `"1,0,0,1"`.
    Text(String),
    /// Row-major entries.
    Values(Vec<f64>),
}

impl MatrixValue {
    fn values<const N: usize>(&self, key: &'static str) -> Result<[f64; N], CalibrationError> {
        let values = match self {
            MatrixValue::Values(values) => values.clone(),
            MatrixValue::Text(text) => {
                let text = text.trim();
                // a single trailing separator is allowed
                let text = text.strip_suffix(',').unwrap_or(text);
                text.split(',')
                    .map(|token| {
                        let token = token.trim();
                        token
                            .parse::<f64>()
                            .map_err(|_| CalibrationError::InvalidNumber {
                                key,
                                value: token.to_string(),
                            })
                    })
                    .collect::<Result<Vec<_>, _>>()?
            }
        };

        let got = values.len();
        values
            .try_into()
            .map_err(|_| CalibrationError::WrongValueCount {
                key,
                expected: N,
                got,
            })
    }
}

/// The settings of a calibration file, before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationFile {
    /// The row-major 4x4 disparity-to-depth matrix.
    #[serde(rename = "Q_Matrix", alias = "name", default)]
    pub q_matrix: Option<MatrixValue>,

    /// The row-major 2x2 color camera matrix.
    #[serde(rename = "Color_camera_Matrix", default)]
    pub color_camera_matrix: Option<MatrixValue>,

    /// The row-major 4x4 depth-to-color transform.
    #[serde(rename = "Rotation_Translation_Matrix", default)]
    pub rotation_translation_matrix: Option<MatrixValue>,
}

impl CalibrationFile {
    /// Validate the settings and build the calibration model.
    ///
    /// `Q_Matrix` is required. The two color settings are optional, but both are
    /// needed for the model to carry a color calibration.
    pub fn into_model(self) -> Result<CalibrationModel, CalibrationError> {
        let q = self
            .q_matrix
            .ok_or(CalibrationError::MissingKey(Q_MATRIX_KEY))?
            .values::<16>(Q_MATRIX_KEY)?;

        let color_matrix = self
            .color_camera_matrix
            .map(|m| m.values::<4>(COLOR_MATRIX_KEY))
            .transpose()?;

        let rotation_translation = self
            .rotation_translation_matrix
            .map(|m| m.values::<16>(ROTATION_TRANSLATION_KEY))
            .transpose()?;

        if color_matrix.is_some() != rotation_translation.is_some() {
            log::warn!(
                "'{COLOR_MATRIX_KEY}' and '{ROTATION_TRANSLATION_KEY}' must both be set \
                 to colorize, ignoring the color calibration"
            );
        }

        Ok(CalibrationModel::from_matrices(
            rows4(&q),
            color_matrix.map(|m| [[m[0], m[1]], [m[2], m[3]]]),
            rotation_translation.map(|m| rows4(&m)),
        ))
    }
}

fn rows4(m: &[f64; 16]) -> [[f64; 4]; 4] {
    std::array::from_fn(|row| std::array::from_fn(|col| m[row * 4 + col]))
}

/// Read a calibration file.
///
/// # Arguments
///
/// * `path` - Path to a libconfig file (`.cfg`, `.conf`, `.txt` or no extension)
///   or to a `.json` file.
///
/// # Returns
///
/// The validated calibration model.
pub fn read_calibration(path: impl AsRef<Path>) -> Result<CalibrationModel, CalibrationError> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase());

    match ext.as_deref() {
        Some("json") => read_calibration_json(path),
        None | Some("cfg") | Some("conf") | Some("txt") => {
            let text = std::fs::read_to_string(path)?;
            parse_calibration_str(&text)?.into_model()
        }
        Some(ext) => Err(CalibrationError::UnsupportedExtension(ext.to_string())),
    }
}

/// Read a JSON calibration file with the same setting names as the libconfig format.
pub fn read_calibration_json(path: impl AsRef<Path>) -> Result<CalibrationModel, CalibrationError> {
    let file = std::fs::File::open(path)?;
    let settings: CalibrationFile = serde_json::from_reader(std::io::BufReader::new(file))?;
    settings.into_model()
}

/// Parse the text of a libconfig calibration file.
///
/// Only top-level settings are looked up. Other settings, groups and lists are parsed
/// and ignored.
///
/// Example:
///
/// ```
/// use depthcloud_3d::io::config::parse_calibration_str;
///
/// let text = r#"
///     ## disparity-to-depth
///     Q_Matrix = "1,0,0,-320, 0,1,0,-240, 0,0,0,525, 0,0,8.3,0";
/// "#;
/// let model = parse_calibration_str(text).unwrap().into_model().unwrap();
/// assert_eq!(model.reprojection.f, 525.0);
/// assert!(model.color.is_none());
/// ```
pub fn parse_calibration_str(text: &str) -> Result<CalibrationFile, CalibrationError> {
    let tokens = tokenize(text)?;
    let mut parser = Parser { tokens, pos: 0 };
    let settings = parser.parse_settings(false)?;

    let take = |key: &'static str| -> Result<Option<MatrixValue>, CalibrationError> {
        settings
            .get(key)
            .map(|value| value.to_matrix(key))
            .transpose()
    };

    let q_matrix = match take(Q_MATRIX_KEY)? {
        Some(q) => Some(q),
        None => take(Q_MATRIX_LEGACY_KEY)?,
    };

    Ok(CalibrationFile {
        q_matrix,
        color_camera_matrix: take(COLOR_MATRIX_KEY)?,
        rotation_translation_matrix: take(ROTATION_TRANSLATION_KEY)?,
    })
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Number(String),
    Punct(char),
}

fn tokenize(text: &str) -> Result<Vec<(Token, usize)>, CalibrationError> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();
    let mut line = 1;

    let parse_err = |line: usize, msg: &str| CalibrationError::Parse {
        line,
        msg: msg.to_string(),
    };

    while let Some(c) = chars.next() {
        match c {
            '\n' => line += 1,
            c if c.is_whitespace() => {}
            '#' => {
                while chars.next_if(|&c| c != '\n').is_some() {}
            }
            '/' if chars.peek() == Some(&'/') => {
                while chars.next_if(|&c| c != '\n').is_some() {}
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let start = line;
                let mut prev = '\0';
                loop {
                    match chars.next() {
                        Some('/') if prev == '*' => break,
                        Some(c) => {
                            if c == '\n' {
                                line += 1;
                            }
                            prev = c;
                        }
                        None => return Err(parse_err(start, "unterminated comment")),
                    }
                }
            }
            '"' => {
                let start = line;
                let mut s = String::new();
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some('n') => s.push('\n'),
                            Some('t') => s.push('\t'),
                            Some('r') => s.push('\r'),
                            Some('f') => s.push('\u{c}'),
                            Some(c @ ('\\' | '"')) => s.push(c),
                            _ => return Err(parse_err(line, "invalid escape sequence")),
                        },
                        Some(c) => {
                            if c == '\n' {
                                line += 1;
                            }
                            s.push(c);
                        }
                        None => return Err(parse_err(start, "unterminated string")),
                    }
                }
                tokens.push((Token::Str(s), start));
            }
            '=' | ':' | ';' | ',' | '[' | ']' | '(' | ')' | '{' | '}' => {
                tokens.push((Token::Punct(c), line));
            }
            c if c.is_ascii_alphabetic() || c == '*' => {
                let mut s = String::from(c);
                while let Some(c) =
                    chars.next_if(|&c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '*'))
                {
                    s.push(c);
                }
                tokens.push((Token::Ident(s), line));
            }
            c if c.is_ascii_digit() || matches!(c, '+' | '-' | '.') => {
                let mut s = String::from(c);
                while let Some(c) =
                    chars.next_if(|&c| c.is_ascii_alphanumeric() || matches!(c, '.' | '+' | '-'))
                {
                    s.push(c);
                }
                tokens.push((Token::Number(s), line));
            }
            c => return Err(parse_err(line, &format!("unexpected character '{c}'"))),
        }
    }

    Ok(tokens)
}

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Str(String),
    Number(String),
    Bool,
    List(Vec<Value>),
    Group,
}

impl Value {
    fn to_matrix(&self, key: &'static str) -> Result<MatrixValue, CalibrationError> {
        match self {
            Value::Str(s) => Ok(MatrixValue::Text(s.clone())),
            Value::List(items) => items
                .iter()
                .map(|item| match item {
                    Value::Number(n) => parse_number(n).ok_or(CalibrationError::InvalidNumber {
                        key,
                        value: n.clone(),
                    }),
                    _ => Err(CalibrationError::UnsupportedValue(key)),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(MatrixValue::Values),
            _ => Err(CalibrationError::UnsupportedValue(key)),
        }
    }
}

/// Parse a libconfig number: float, decimal or hexadecimal integer, optional `L` suffix.
fn parse_number(s: &str) -> Option<f64> {
    let s = s.strip_suffix("LL").or_else(|| s.strip_suffix('L')).unwrap_or(s);
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16).ok().map(|v| v as f64);
    }
    s.parse::<f64>().ok()
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(1, |(_, line)| *line)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(t, _)| t.clone());
        self.pos += 1;
        token
    }

    fn error(&self, msg: impl Into<String>) -> CalibrationError {
        CalibrationError::Parse {
            line: self.line(),
            msg: msg.into(),
        }
    }

    fn parse_settings(&mut self, in_group: bool) -> Result<HashMap<String, Value>, CalibrationError> {
        let mut settings = HashMap::new();

        loop {
            match self.peek() {
                None if in_group => return Err(self.error("unterminated group")),
                None => return Ok(settings),
                Some(Token::Punct('}')) if in_group => {
                    self.next();
                    return Ok(settings);
                }
                _ => {}
            }

            let line = self.line();
            let Some(Token::Ident(name)) = self.next() else {
                return Err(CalibrationError::Parse {
                    line,
                    msg: "expected a setting name".to_string(),
                });
            };

            match self.next() {
                Some(Token::Punct('=' | ':')) => {}
                _ => return Err(self.error(format!("expected '=' or ':' after '{name}'"))),
            }

            let value = self.parse_value()?;

            if let Some(Token::Punct(';' | ',')) = self.peek() {
                self.next();
            }

            if settings.insert(name.clone(), value).is_some() {
                return Err(CalibrationError::Parse {
                    line,
                    msg: format!("duplicate setting '{name}'"),
                });
            }
        }
    }

    fn parse_value(&mut self) -> Result<Value, CalibrationError> {
        match self.next() {
            Some(Token::Str(mut s)) => {
                // adjacent string literals are concatenated
                while let Some(Token::Str(next)) = self.peek() {
                    s.push_str(next);
                    self.next();
                }
                Ok(Value::Str(s))
            }
            Some(Token::Number(n)) => Ok(Value::Number(n)),
            Some(Token::Ident(ident)) if ident.eq_ignore_ascii_case("true") => Ok(Value::Bool),
            Some(Token::Ident(ident)) if ident.eq_ignore_ascii_case("false") => Ok(Value::Bool),
            Some(Token::Punct('{')) => {
                self.parse_settings(true)?;
                Ok(Value::Group)
            }
            Some(Token::Punct(open @ ('[' | '('))) => {
                let close = if open == '[' { ']' } else { ')' };
                let mut items = Vec::new();
                loop {
                    if self.peek() == Some(&Token::Punct(close)) {
                        self.next();
                        return Ok(Value::List(items));
                    }
                    items.push(self.parse_value()?);
                    match self.next() {
                        Some(Token::Punct(',')) => {}
                        Some(Token::Punct(c)) if c == close => return Ok(Value::List(items)),
                        _ => return Err(self.error(format!("expected ',' or '{close}'"))),
                    }
                }
            }
            _ => Err(self.error("expected a value")),
        }
    }
}
