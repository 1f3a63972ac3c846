use std::io::{self, Read};
use ucl_codec::scanner::{READ_BUFFER_SIZE, Scanner, Token, TokenKind};
use ucl_codec::{LexError, UclError};

fn scan<R: Read>(reader: R) -> Result<Vec<Token>, UclError> {
    let mut scanner = Scanner::new(reader);
    let mut all = Vec::new();
    while let Some(tokens) = scanner.next_tokens()? {
        all.extend(tokens);
    }
    Ok(all)
}

fn texts(input: &str) -> Vec<String> {
    scan(input.as_bytes())
        .unwrap()
        .into_iter()
        .filter(|t| !t.kind.is_comment())
        .map(|t| t.into_string().unwrap())
        .collect()
}

/// Hands out at most `step` bytes per read
struct Trickle<'a> {
    data: &'a [u8],
    step: usize,
}

impl Read for Trickle<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.step.min(buf.len()).min(self.data.len());
        buf[..n].copy_from_slice(&self.data[..n]);
        self.data = &self.data[n..];
        Ok(n)
    }
}

/// Fails with `Interrupted` once before every successful read
struct Flaky<'a> {
    data: &'a [u8],
    interrupt: bool,
}

impl Read for Flaky<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.interrupt = !self.interrupt;
        if self.interrupt {
            return Err(io::Error::new(io::ErrorKind::Interrupted, "retry"));
        }
        let n = buf.len().min(self.data.len());
        buf[..n].copy_from_slice(&self.data[..n]);
        self.data = &self.data[n..];
        Ok(n)
    }
}

struct Broken;

impl Read for Broken {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::other("disk on fire"))
    }
}

#[cfg(test)]
mod scanner_tests {
    use super::*;

    const DOCUMENT: &str = r#"
# service definition
service "web" {
    listen = 80;
    hosts [ "a.example", 'b.example' ];
    match /^api/;
    banner <<EOT
welcome
EOT
}
"#;

    #[test]
    fn test_document_token_stream() {
        assert_eq!(
            texts(DOCUMENT),
            vec![
                "service", "web", "{", "listen", "=", "80", ";", "hosts", "[", "a.example", ",",
                "b.example", "]", ";", "match", "/^api/", ";", "banner", "welcome", "}",
            ]
        );
    }

    #[test]
    fn test_document_token_kinds() {
        let kinds: Vec<TokenKind> = scan(DOCUMENT.as_bytes())
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect();
        assert_eq!(kinds[0], TokenKind::HashComment);
        assert_eq!(kinds[2], TokenKind::DoubleQuoted);
        assert!(kinds.contains(&TokenKind::SingleQuoted));
        assert!(kinds.contains(&TokenKind::SlashLiteral));
        assert!(kinds.contains(&TokenKind::MultilineString));
        assert_eq!(kinds.last(), Some(&TokenKind::BraceClose));
    }

    #[test]
    fn test_token_lines() {
        let tokens = scan("a 1;\nb 2;\n\nc 3;".as_bytes()).unwrap();
        let lines: Vec<(String, usize)> = tokens
            .into_iter()
            .filter(|t| t.kind == TokenKind::Tag)
            .map(|t| (t.as_str().unwrap().to_string(), t.line))
            .collect();
        assert_eq!(
            lines,
            vec![
                ("a".to_string(), 1),
                ("1".to_string(), 1),
                ("b".to_string(), 2),
                ("2".to_string(), 2),
                ("c".to_string(), 4),
                ("3".to_string(), 4),
            ]
        );
    }

    #[test]
    fn test_read_size_does_not_change_tokens() {
        let expected = texts(DOCUMENT);
        for step in [1, 2, 3, 7, 64] {
            let tokens = scan(Trickle {
                data: DOCUMENT.as_bytes(),
                step,
            })
            .unwrap();
            let got: Vec<String> = tokens
                .into_iter()
                .filter(|t| !t.kind.is_comment())
                .map(|t| t.into_string().unwrap())
                .collect();
            assert_eq!(got, expected, "read step {}", step);
        }
    }

    #[test]
    fn test_quoted_string_across_buffer_boundary() {
        let mut input = format!("pad \"{}\";\n", "x".repeat(READ_BUFFER_SIZE - 12));
        input.push_str("k \"one\\ttwo \\\"three\\\"\";\n");
        let tokens = texts(&input);
        assert_eq!(tokens[3], "k");
        assert_eq!(tokens[4], "one\ttwo \"three\"");
    }

    #[test]
    fn test_heredoc_across_buffer_boundary() {
        let mut input = format!("pad \"{}\";\n", "x".repeat(READ_BUFFER_SIZE - 20));
        input.push_str("text <<END\nfirst line\nsecond line\nEND\nafter 1;\n");
        let tokens = texts(&input);
        assert_eq!(tokens[3], "text");
        assert_eq!(tokens[4], "first line\nsecond line");
        assert_eq!(tokens[5], "after");
    }

    #[test]
    fn test_interrupted_reads_are_retried() {
        let tokens = scan(Flaky {
            data: b"a 1; b 2;",
            interrupt: false,
        })
        .unwrap();
        assert_eq!(tokens.len(), 6);
    }

    #[test]
    fn test_reader_error_is_io_error() {
        let err = scan(Broken).unwrap_err();
        assert!(matches!(err, UclError::Io(_)));
    }

    #[test]
    fn test_depth_follows_scopes() {
        let mut scanner = Scanner::new("a { b [ c ] }".as_bytes());
        let mut max_depth = 0;
        while scanner.next_tokens().unwrap().is_some() {
            max_depth = max_depth.max(scanner.depth());
        }
        assert_eq!(max_depth, 2);
        assert_eq!(scanner.depth(), 0);
    }

    #[test]
    fn test_comma_in_top_level_bareword() {
        assert_eq!(texts("list a,b,c;"), vec!["list", "a,b,c", ";"]);
    }

    #[test]
    fn test_array_values_split_on_commas() {
        assert_eq!(
            texts("l [a b, c]"),
            vec!["l", "[", "a", "b", ",", "c", "]"]
        );
    }

    #[test]
    fn test_crlf_heredoc() {
        assert_eq!(texts("k <<EOT\r\nline\r\nEOT\r\n"), vec!["k", "line"]);
    }

    #[test]
    fn test_invalid_utf8_in_quote() {
        let err = scan(&b"k \"\xff\";"[..]).unwrap_err();
        assert!(matches!(err, UclError::Lex(LexError::InvalidUtf8 { line: 1 })));
    }

    #[test]
    fn test_mismatched_bracket_reports_line() {
        let err = scan("a [\n  1,\n  2\n}".as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            UclError::Lex(LexError::MisplacedCloser { closer: '}', line: 4 })
        ));
    }
}
