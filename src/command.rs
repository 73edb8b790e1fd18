// Copyright 2026 Locha Mesh Developers <contact@locha.io>
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Commands
//!
//! Python statements executed by the board. Every argument that ends up in
//! a statement goes through validation or escaping here, so a path or a
//! payload can never inject code or raw REPL control bytes.

use std::fmt;

use crate::{config::Vocabulary, Error, Result};

/// One statement to execute on the board.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Command(String);

impl Command {
    /// A statement taken as is, without any validation.
    pub fn raw<S: Into<String>>(text: S) -> Self {
        Command(text.into())
    }

    /// `from <module> import *`
    pub fn import(vocabulary: &Vocabulary) -> Result<Self> {
        check_module(&vocabulary.module)?;

        Ok(Command(format!("from {} import *", vocabulary.module)))
    }

    /// `<var> = <class>('<path>')`, creates the receiver for `path`.
    pub fn open(vocabulary: &Vocabulary, path: &str) -> Result<Self> {
        check_ident(&vocabulary.variable)?;
        check_ident(&vocabulary.class)?;

        Ok(Command(format!(
            "{} = {}({})",
            vocabulary.variable,
            vocabulary.class,
            quote(path)
        )))
    }

    /// `<var>.<write>('<chunk>')`, `encoded` must be base64.
    pub fn write(vocabulary: &Vocabulary, encoded: &str) -> Result<Self> {
        check_ident(&vocabulary.variable)?;
        check_ident(&vocabulary.write_method)?;
        check_base64(encoded)?;

        Ok(Command(format!(
            "{}.{}('{}')",
            vocabulary.variable, vocabulary.write_method, encoded
        )))
    }

    /// `<var>.<close>()`
    pub fn close(vocabulary: &Vocabulary) -> Result<Self> {
        check_ident(&vocabulary.variable)?;
        check_ident(&vocabulary.close_method)?;

        Ok(Command(format!(
            "{}.{}()",
            vocabulary.variable, vocabulary.close_method
        )))
    }

    /// `print(<var>.<digest>)`
    pub fn print_digest(vocabulary: &Vocabulary) -> Result<Self> {
        check_ident(&vocabulary.variable)?;
        check_ident(&vocabulary.digest_attr)?;

        Ok(Command(format!(
            "print({}.{})",
            vocabulary.variable, vocabulary.digest_attr
        )))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(&self.0)
    }
}

fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => (),
        _ => return false,
    }

    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn check_ident(s: &str) -> Result<()> {
    if !is_ident(s) {
        return Err(Error::InvalidCommand(format!(
            "`{}` is not a valid identifier",
            s
        )));
    }

    Ok(())
}

fn check_module(s: &str) -> Result<()> {
    if !s.split('.').all(is_ident) {
        return Err(Error::InvalidCommand(format!(
            "`{}` is not a valid module path",
            s
        )));
    }

    Ok(())
}

fn check_base64(s: &str) -> Result<()> {
    if s.is_empty() {
        return Err(Error::InvalidCommand("empty chunk".to_owned()));
    }

    let valid = s
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'='));
    if !valid {
        return Err(Error::InvalidCommand(
            "chunk is not base64 encoded".to_owned(),
        ));
    }

    Ok(())
}

/// Render `s` as a single quoted Python string literal.
///
/// Control characters are always escaped, the board would otherwise act on
/// them before the statement is complete.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('\'');

    out
}

/// Inverse of [`quote`]: recover the string of a single or double quoted
/// literal. Only the escapes `quote` produces, plus `\n`, `\r`, `\t` and
/// `\"`, are understood.
pub fn parse_literal(literal: &str) -> Option<String> {
    let quote_char = literal.chars().next()?;
    if !matches!(quote_char, '\'' | '"')
        || literal.len() < 2
        || !literal.ends_with(quote_char)
    {
        return None;
    }

    let body = &literal[1..literal.len() - 1];
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c == quote_char {
            return None;
        }
        if c != '\\' {
            out.push(c);
            continue;
        }

        match chars.next()? {
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            '"' => out.push('"'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'x' => {
                let hex: String = chars.by_ref().take(2).collect();
                let value = u32::from_str_radix(&hex, 16).ok()?;
                out.push(std::char::from_u32(value)?);
            }
            _ => return None,
        }
    }

    Some(out)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default_vocabulary() {
        let v = Vocabulary::default();

        assert_eq!(
            Command::import(&v).unwrap().as_str(),
            "from ttboard.util.file_xfer import *"
        );
        assert_eq!(
            Command::open(&v, "/data/out.bin").unwrap().as_str(),
            "f = FileWriter('/data/out.bin')"
        );
        assert_eq!(
            Command::write(&v, "aGVsbG8=").unwrap().as_str(),
            "f.w('aGVsbG8=')"
        );
        assert_eq!(Command::close(&v).unwrap().as_str(), "f.close()");
        assert_eq!(
            Command::print_digest(&v).unwrap().as_str(),
            "print(f.digest)"
        );
    }

    #[test]
    fn test_quote_escapes_control_bytes() {
        let quoted = quote("/tmp/it's\\\x04\x03\r\n.bin");
        assert_eq!(quoted, "'/tmp/it\\'s\\\\\\x04\\x03\\x0d\\x0a.bin'");
        assert!(!quoted.bytes().any(|b| b < 0x20));
    }

    #[test]
    fn test_parse_literal_inverts_quote() {
        for s in &["/a/b/c.bin", "it's", "back\\slash", "\x01\x04ctl", "ñandú"] {
            assert_eq!(parse_literal(&quote(s)).as_deref(), Some(*s));
        }
        assert_eq!(parse_literal("\"dq\"").as_deref(), Some("dq"));
        assert_eq!(parse_literal("'unterminated"), None);
        assert_eq!(parse_literal("'a'b'"), None);
    }

    #[test]
    fn test_rejects_injection() {
        let v = Vocabulary::default();

        assert!(matches!(
            Command::write(&v, "abc'); import os; os.remove('x"),
            Err(Error::InvalidCommand(_))
        ));
        assert!(matches!(Command::write(&v, ""), Err(Error::InvalidCommand(_))));

        let evil = Vocabulary {
            variable: "f; import os".to_owned(),
            ..Vocabulary::default()
        };
        assert!(Command::close(&evil).is_err());

        let evil = Vocabulary {
            module: "os import *; x".to_owned(),
            ..Vocabulary::default()
        };
        assert!(Command::import(&evil).is_err());
    }
}
