//! Parsers for SVG transform lists and mesh stop edge paths
//!
//! Both parsers are best-effort: a malformed transform token or edge command
//! is reported as an error for that token only, and processing continues so a
//! partially broken gradient still renders whatever is well-formed.
use crate::{Point, Scalar, Transform, PI};
use std::{
    fmt,
    io::{Cursor, Read},
};

/// Transform tokens carry at most 6 arguments (`matrix`); anything longer is
/// malformed.
const TRANSFORM_ARGS_MAX: usize = 6;

struct Parser<I> {
    input: I,
    input_buffer: Option<u8>,
}

impl<I: Read> Parser<I> {
    fn new(input: I) -> Self {
        Self {
            input,
            input_buffer: None,
        }
    }

    // consume single byte from the input
    fn parse_byte(&mut self) -> Result<Option<u8>, SvgParserError> {
        match self.input_buffer.take() {
            None => {
                let mut byte = [0; 1];
                if self.input.read(&mut byte)? != 0 {
                    Ok(Some(byte[0]))
                } else {
                    Ok(None)
                }
            }
            byte => Ok(byte),
        }
    }

    // put byte into input buffer, at most one byte is cached
    fn unparse_byte(&mut self, byte: u8) {
        debug_assert!(self.input_buffer.is_none());
        self.input_buffer = Some(byte);
    }

    // consume input while `pred` predicate is true
    fn parse_while(
        &mut self,
        mut pred: impl FnMut(u8) -> bool,
        mut proc: impl FnMut(u8),
    ) -> Result<usize, SvgParserError> {
        let mut count = 0;
        loop {
            let byte = match self.parse_byte()? {
                None => break,
                Some(byte) => byte,
            };
            if !pred(byte) {
                self.unparse_byte(byte);
                break;
            }
            count += 1;
            proc(byte);
        }
        Ok(count)
    }

    // consume at most one byte from the input, if predicate returns true
    fn parse_once(
        &mut self,
        pred: impl FnOnce(u8) -> bool,
        proc: impl FnOnce(u8),
    ) -> Result<bool, SvgParserError> {
        let byte = match self.parse_byte()? {
            None => return Ok(false),
            Some(byte) => byte,
        };
        if pred(byte) {
            proc(byte);
            Ok(true)
        } else {
            self.unparse_byte(byte);
            Ok(false)
        }
    }

    // consume separators from the input
    fn parse_separators(&mut self) -> Result<(), SvgParserError> {
        loop {
            let byte = match self.parse_byte()? {
                None => break,
                Some(byte) => byte,
            };
            if !matches!(byte, b' ' | b'\t' | b'\r' | b'\n' | b',') {
                self.unparse_byte(byte);
                break;
            }
        }
        Ok(())
    }

    // parse single scalar value from the input
    fn parse_scalar(&mut self) -> Result<Scalar, SvgParserError> {
        self.parse_separators()?;

        let mut mantissa: i64 = 0;
        let mut exponent: i64 = 0;
        let mut sign = 1;

        fn push_digit(value: &mut i64, byte: u8) {
            let digit = byte - b'0';
            *value = value.wrapping_mul(10).wrapping_add(digit as i64);
        }

        self.parse_once(
            |byte| matches!(byte, b'-' | b'+'),
            |byte| {
                if byte == b'-' {
                    sign = -1
                }
            },
        )?;
        let whole = self.parse_while(
            |byte| byte.is_ascii_digit(),
            |byte| push_digit(&mut mantissa, byte),
        )?;
        let matches_dot = self.parse_once(|byte| matches!(byte, b'.'), |_| {})?;
        let frac = if matches_dot {
            self.parse_while(
                |byte| byte.is_ascii_digit(),
                |byte| {
                    push_digit(&mut mantissa, byte);
                    exponent -= 1;
                },
            )?
        } else {
            0
        };
        mantissa *= sign;

        if whole + frac == 0 {
            return Err(SvgParserError::InvalidScalar);
        }

        let matches_exp = self.parse_once(|byte| matches!(byte, b'e' | b'E'), |_| {})?;
        if matches_exp {
            let mut sci: i64 = 0;
            let mut sci_sign = 1;
            self.parse_once(
                |byte| matches!(byte, b'-' | b'+'),
                |byte| {
                    if byte == b'-' {
                        sci_sign = -1
                    }
                },
            )?;
            if self.parse_while(
                |byte| byte.is_ascii_digit(),
                |byte| push_digit(&mut sci, byte),
            )? == 0
            {
                return Err(SvgParserError::InvalidScalar);
            }
            exponent = exponent.wrapping_add(sci_sign * sci)
        }

        let ten: Scalar = 10.0;
        Ok((mantissa as Scalar) * ten.powi(exponent as i32))
    }
}

/// Parser for an SVG transform-list string
///
/// Yields one composed `Transform` per `name(args...)` token. Tokens are
/// independent: an error for one token does not poison the rest of the list.
pub struct TransformListParser<I> {
    parser: Parser<I>,
}

impl<I: Read> TransformListParser<I> {
    pub fn new(input: I) -> Self {
        Self {
            parser: Parser::new(input),
        }
    }

    fn parse_ident(&mut self) -> Result<String, SvgParserError> {
        let mut name = String::new();
        self.parser.parse_while(
            |byte| byte.is_ascii_alphabetic(),
            |byte| name.push(byte as char),
        )?;
        Ok(name)
    }

    // consume everything up to and including the closing bracket
    fn skip_token(&mut self) -> Result<(), SvgParserError> {
        self.parser.parse_while(|byte| byte != b')', |_| {})?;
        self.parser.parse_once(|byte| byte == b')', |_| {})?;
        Ok(())
    }

    // parse `(arg, arg, ...)` returning the number of arguments collected
    fn parse_args(&mut self, args: &mut [Scalar]) -> Result<usize, SvgParserError> {
        self.parser.parse_separators()?;
        if !self.parser.parse_once(|byte| byte == b'(', |_| {})? {
            return Err(SvgParserError::BracketExpected);
        }
        let mut count = 0;
        loop {
            self.parser.parse_separators()?;
            if self.parser.parse_once(|byte| byte == b')', |_| {})? {
                return Ok(count);
            }
            let value = match self.parser.parse_scalar() {
                Ok(value) => value,
                Err(error) => {
                    self.skip_token()?;
                    return Err(error);
                }
            };
            if count >= args.len() {
                self.skip_token()?;
                return Err(SvgParserError::TransformArgs);
            }
            args[count] = value;
            count += 1;
        }
    }

    /// Parse single transform token, `None` indicates end of input
    pub fn parse_token(&mut self) -> Result<Option<Transform>, SvgParserError> {
        self.parser.parse_separators()?;
        match self.parser.parse_byte()? {
            None => return Ok(None),
            Some(byte) => self.parser.unparse_byte(byte),
        }

        let name = self.parse_ident()?;
        if name.is_empty() {
            // not a token name, consume the byte so the next parse attempt
            // starts past it
            let byte = match self.parser.parse_byte()? {
                None => return Ok(None),
                Some(byte) => byte,
            };
            return Err(SvgParserError::UnknownTransform((byte as char).to_string()));
        }
        let mut args = [0.0; TRANSFORM_ARGS_MAX];
        let count = self.parse_args(&mut args)?;
        let deg2rad = |deg: Scalar| deg * PI / 180.0;

        let tr = match (name.as_str(), count) {
            ("translate", 2) => Transform::new_translate(args[0], args[1]),
            // ty is never defaulted, a lone tx is an error
            ("translate", _) => return Err(SvgParserError::TransformArgs),
            ("scale", 1) => Transform::new_scale(args[0], args[0]),
            ("scale", 2) => Transform::new_scale(args[0], args[1]),
            ("scale", _) => return Err(SvgParserError::TransformArgs),
            ("rotate", 1) => Transform::new_rotate(deg2rad(args[0])),
            ("rotate", 3) => {
                Transform::new_rotate_around(deg2rad(args[0]), (args[1], args[2]))
            }
            ("rotate", _) => return Err(SvgParserError::TransformArgs),
            ("skewX", 1) => Transform::new_skew_x(deg2rad(args[0])),
            ("skewY", 1) => Transform::new_skew_y(deg2rad(args[0])),
            ("skewX", _) | ("skewY", _) => return Err(SvgParserError::TransformArgs),
            ("matrix", 6) => {
                Transform::new(args[0], args[2], args[4], args[1], args[3], args[5])
            }
            ("matrix", _) => return Err(SvgParserError::TransformArgs),
            _ => return Err(SvgParserError::UnknownTransform(name)),
        };
        Ok(Some(tr))
    }
}

impl<I: Read> Iterator for TransformListParser<I> {
    type Item = Result<Transform, SvgParserError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.parse_token().transpose()
    }
}

/// Compose a transform list left-to-right, collecting per-token errors
///
/// Malformed tokens fall back to identity, the rest of the list still
/// contributes. This mirrors how browsers keep rendering a gradient whose
/// `gradientTransform` is partially broken.
pub fn parse_transform_list(text: &str) -> (Transform, Vec<SvgParserError>) {
    let mut tr = Transform::identity();
    let mut errors = Vec::new();
    for token in TransformListParser::new(Cursor::new(text)) {
        match token {
            Ok(token) => tr = tr * token,
            Err(error) => {
                tracing::warn!("transform token skipped: {}", error);
                errors.push(error);
            }
        }
    }
    (tr, errors)
}

/// One parsed mesh stop `path` attribute
///
/// `l`/`L` carries the single line endpoint, `c`/`C` the three remaining
/// cubic control points. Lowercase commands are relative to the edge start.
#[derive(Debug, Clone, PartialEq)]
pub enum EdgePath {
    Line { relative: bool, point: Point },
    Cubic { relative: bool, points: [Point; 3] },
}

impl EdgePath {
    /// Parse a stop `path` attribute
    pub fn parse(text: &str) -> Result<Self, SvgParserError> {
        let mut parser = Parser::new(Cursor::new(text));
        parser.parse_separators()?;
        let cmd = match parser.parse_byte()? {
            None => return Err(SvgParserError::InvalidScalar),
            Some(cmd) => cmd,
        };
        let mut parse_point = || -> Result<Point, SvgParserError> {
            Ok(Point::new(parser.parse_scalar()?, parser.parse_scalar()?))
        };
        match cmd {
            b'l' | b'L' => Ok(EdgePath::Line {
                relative: cmd == b'l',
                point: parse_point()?,
            }),
            b'c' | b'C' => Ok(EdgePath::Cubic {
                relative: cmd == b'c',
                points: [parse_point()?, parse_point()?, parse_point()?],
            }),
            cmd => Err(SvgParserError::InvalidEdgeCmd(cmd as char)),
        }
    }
}

/// Error while parsing transform lists or edge paths
#[derive(Debug)]
pub enum SvgParserError {
    /// Failed to parse scalar value
    InvalidScalar,
    /// Transform token with the wrong number of arguments
    TransformArgs,
    /// Transform token with an unrecognized name
    UnknownTransform(String),
    /// Edge path command other than l/L/c/C
    InvalidEdgeCmd(char),
    /// Opening/closing bracket expected
    BracketExpected,
    /// IO error propagated while reading input stream
    IoError(std::io::Error),
}

impl fmt::Display for SvgParserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SvgParserError::InvalidScalar => write!(f, "invalid scalar value"),
            SvgParserError::TransformArgs => {
                write!(f, "wrong number of arguments for transform")
            }
            SvgParserError::UnknownTransform(name) => {
                write!(f, "unknown transform type: {:?}", name)
            }
            SvgParserError::InvalidEdgeCmd(cmd) => {
                write!(f, "invalid edge path command: {:?}", cmd)
            }
            SvgParserError::BracketExpected => write!(f, "bracket expected"),
            SvgParserError::IoError(error) => write!(f, "{}", error),
        }
    }
}

impl From<std::io::Error> for SvgParserError {
    fn from(error: std::io::Error) -> Self {
        Self::IoError(error)
    }
}

impl From<SvgParserError> for std::io::Error {
    fn from(error: SvgParserError) -> Self {
        match error {
            SvgParserError::IoError(error) => error,
            _ => Self::new(std::io::ErrorKind::InvalidData, error),
        }
    }
}

impl std::error::Error for SvgParserError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_approx_eq;

    #[test]
    fn test_parse_scalar() -> Result<(), SvgParserError> {
        let mut parser = Parser::new(Cursor::new("1 .22e0.32 3.21e-3-1.24 1e4"));
        assert_approx_eq!(parser.parse_scalar()?, 1.0);
        assert_approx_eq!(parser.parse_scalar()?, 0.22);
        assert_approx_eq!(parser.parse_scalar()?, 0.32);
        assert_approx_eq!(parser.parse_scalar()?, 3.21e-3);
        assert_approx_eq!(parser.parse_scalar()?, -1.24);
        assert_approx_eq!(parser.parse_scalar()?, 1e4);
        Ok(())
    }

    #[test]
    fn test_composition_order() {
        let (tr, errors) = parse_transform_list("translate(10,0) scale(2)");
        assert!(errors.is_empty());
        // scale is applied to the point first, translation is unscaled
        let p = tr.apply(Point::new(0.0, 0.0));
        assert_approx_eq!(p.x(), 10.0);
        assert_approx_eq!(p.y(), 0.0);
        let p = tr.apply(Point::new(1.0, 0.0));
        assert_approx_eq!(p.x(), 12.0);
        assert_approx_eq!(p.y(), 0.0);
    }

    #[test]
    fn test_translate_requires_two_args() {
        let (tr, errors) = parse_transform_list("translate(5) scale(2,3)");
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], SvgParserError::TransformArgs));
        // the broken token falls back to identity, scale still applies
        let p = tr.apply(Point::new(1.0, 1.0));
        assert_approx_eq!(p.x(), 2.0);
        assert_approx_eq!(p.y(), 3.0);
    }

    #[test]
    fn test_trailing_garbage() {
        // a stray non-token byte is consumed, reported once, and the parse
        // reaches end of input
        let (tr, errors) = parse_transform_list("translate(10,20) @");
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], SvgParserError::UnknownTransform(_)));
        let p = tr.apply(Point::new(0.0, 0.0));
        assert_approx_eq!(p.x(), 10.0);
        assert_approx_eq!(p.y(), 20.0);
    }

    #[test]
    fn test_token_without_brackets() {
        // "translate" with no argument list, then the stray "5"; both are
        // reported and the rest of the list still applies
        let (tr, errors) = parse_transform_list("translate 5 scale(2)");
        assert_eq!(errors.len(), 2);
        assert!(matches!(errors[0], SvgParserError::BracketExpected));
        assert!(matches!(errors[1], SvgParserError::UnknownTransform(_)));
        let p = tr.apply(Point::new(1.0, 1.0));
        assert_approx_eq!(p.x(), 2.0);
        assert_approx_eq!(p.y(), 2.0);

        // a bare name at end of input terminates too
        let (_, errors) = parse_transform_list("translate");
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], SvgParserError::BracketExpected));
    }

    #[test]
    fn test_unknown_transform() {
        let (tr, errors) = parse_transform_list("frobnicate(1,2) translate(1,2)");
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            SvgParserError::UnknownTransform(name) if name == "frobnicate"
        ));
        let p = tr.apply(Point::new(0.0, 0.0));
        assert_approx_eq!(p.x(), 1.0);
        assert_approx_eq!(p.y(), 2.0);
    }

    #[test]
    fn test_rotate_around() {
        let (tr, errors) = parse_transform_list("rotate(180, 1, 1)");
        assert!(errors.is_empty());
        let p = tr.apply(Point::new(2.0, 1.0));
        assert_approx_eq!(p.x(), 0.0, 1e-12);
        assert_approx_eq!(p.y(), 1.0, 1e-12);
    }

    #[test]
    fn test_matrix_and_skew() {
        let (tr, errors) = parse_transform_list("matrix(1 0 0 1 7 -3)");
        assert!(errors.is_empty());
        let p = tr.apply(Point::new(0.0, 0.0));
        assert_approx_eq!(p.x(), 7.0);
        assert_approx_eq!(p.y(), -3.0);

        let (tr, errors) = parse_transform_list("skewX(45)");
        assert!(errors.is_empty());
        let p = tr.apply(Point::new(0.0, 1.0));
        assert_approx_eq!(p.x(), 1.0, 1e-12);
        assert_approx_eq!(p.y(), 1.0);
    }

    #[test]
    fn test_edge_path() -> Result<(), SvgParserError> {
        assert_eq!(
            EdgePath::parse("l 10,0")?,
            EdgePath::Line {
                relative: true,
                point: Point::new(10.0, 0.0),
            }
        );
        assert_eq!(
            EdgePath::parse("C 1,2 3,4 5,6")?,
            EdgePath::Cubic {
                relative: false,
                points: [
                    Point::new(1.0, 2.0),
                    Point::new(3.0, 4.0),
                    Point::new(5.0, 6.0)
                ],
            }
        );
        assert!(matches!(
            EdgePath::parse("q 1,2 3,4"),
            Err(SvgParserError::InvalidEdgeCmd('q'))
        ));
        assert!(matches!(
            EdgePath::parse("c 1,2 3,4"),
            Err(SvgParserError::InvalidScalar)
        ));
        Ok(())
    }
}
