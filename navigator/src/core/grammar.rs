//! Tokenizer and grammar rules for instruction lines.
//!
//! A line is split into [`Token`]s, then matched against [`RULES`] in priority
//! order. The first rule whose pattern covers the whole line decides the
//! [`Instruction`]; the order is part of the contract because some lines fit
//! more than one rule.
//
//  Lexical items:
//
//      Word     ::= [A-Za-z]+            (keywords compare case-insensitively)
//      Integer  ::= '-'? [0-9]+          (fits in i64)
//      Quoted   ::= '"' [^"]* '"' | '\'' [^']* '\''
//      Symbols  ::= '(' | ')' | ','
//
//  Whitespace separates tokens and is otherwise discarded.

use std::iter::Peekable;
use std::str::Chars;

use crate::core::error::CompileError;
use crate::core::types::{Coord, Heading, Turn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Word(String),
    Integer(i64),
    Quoted(String),
    LParen,
    RParen,
    Comma,
}

/// One classified instruction line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// `start at (X, Y)`; coordinates are not yet range-checked.
    Start(Coord),
    /// `go until you reach landmark "NAME"`
    GoToLandmark(String),
    /// `go|move <direction> N blocks`
    MoveWithDirection { heading: Heading, blocks: u64 },
    /// `go|move N blocks`
    MoveContinue { blocks: u64 },
    /// `turn left|right`
    Turn(Turn),
}

pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            chars: src.chars().peekable(),
        }
    }

    fn consume_while<F: Fn(char) -> bool>(&mut self, pred: F, buf: &mut String) {
        while let Some(&c) = self.chars.peek() {
            if !pred(c) {
                break;
            }
            buf.push(c);
            self.chars.next();
        }
    }

    fn read_word(&mut self, first: char) -> String {
        let mut word = String::from(first);
        self.consume_while(|c| c.is_ascii_alphabetic(), &mut word);
        word
    }

    fn read_integer(&mut self, first: char) -> Result<i64, CompileError> {
        let mut digits = String::from(first);
        self.consume_while(|c| c.is_ascii_digit(), &mut digits);
        if digits == "-" {
            return Err(CompileError::malformed("'-' must be followed by digits"));
        }
        digits
            .parse()
            .map_err(|_| CompileError::malformed(format!("integer {digits} is out of range")))
    }

    fn read_quoted(&mut self, quote: char) -> Result<String, CompileError> {
        let mut text = String::new();
        for c in self.chars.by_ref() {
            if c == quote {
                return Ok(text);
            }
            text.push(c);
        }
        Err(CompileError::malformed(format!("no closing {quote} found")))
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token, CompileError>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.chars.next_if(|c| c.is_whitespace()).is_some() {}

        let ch = self.chars.next()?;
        let token = match ch {
            '(' => Ok(Token::LParen),
            ')' => Ok(Token::RParen),
            ',' => Ok(Token::Comma),
            '"' | '\'' => self.read_quoted(ch).map(Token::Quoted),
            c if c == '-' || c.is_ascii_digit() => self.read_integer(c).map(Token::Integer),
            c if c.is_ascii_alphabetic() => Ok(Token::Word(self.read_word(c))),
            other => Err(CompileError::malformed(format!(
                "unexpected character {other:?}"
            ))),
        };
        Some(token)
    }
}

pub fn tokenize(line: &str) -> Result<Vec<Token>, CompileError> {
    Lexer::new(line).collect()
}

/// A grammar rule: `None` when the pattern does not match, otherwise the
/// instruction (or a value error found inside a matching line).
type Rule = fn(&[Token]) -> Option<Result<Instruction, CompileError>>;

/// Rules in priority order, most specific first.
pub const RULES: [(&str, Rule); 5] = [
    ("start", start_rule),
    ("landmark", landmark_rule),
    ("directed move", directed_move_rule),
    ("move", move_rule),
    ("turn", turn_rule),
];

/// Classify one line. `line_no` is the 0-based position in the batch; `start`
/// is only accepted on line 0.
pub fn classify(line: &str, line_no: usize) -> Result<Instruction, CompileError> {
    let tokens = tokenize(line)?;
    let instruction = RULES
        .iter()
        .find_map(|(_, rule)| rule(&tokens))
        .unwrap_or_else(|| Err(CompileError::malformed("unrecognized instruction")))?;

    if matches!(instruction, Instruction::Start(_)) && line_no != 0 {
        return Err(CompileError::malformed(
            "`start at` is only allowed as the first instruction",
        ));
    }
    Ok(instruction)
}

fn is_keyword(token: &Token, keyword: &str) -> bool {
    matches!(token, Token::Word(word) if word.eq_ignore_ascii_case(keyword))
}

fn is_move_verb(token: &Token) -> bool {
    is_keyword(token, "go") || is_keyword(token, "move")
}

fn block_count(n: i64) -> Result<u64, CompileError> {
    u64::try_from(n)
        .map_err(|_| CompileError::malformed(format!("block count {n} must not be negative")))
}

fn start_rule(tokens: &[Token]) -> Option<Result<Instruction, CompileError>> {
    match tokens {
        [
            start,
            at,
            Token::LParen,
            Token::Integer(x),
            Token::Comma,
            Token::Integer(y),
            Token::RParen,
        ] if is_keyword(start, "start") && is_keyword(at, "at") => {
            Some(Ok(Instruction::Start(Coord::new(*x, *y))))
        }
        _ => None,
    }
}

fn landmark_rule(tokens: &[Token]) -> Option<Result<Instruction, CompileError>> {
    match tokens {
        [go, until, you, reach, landmark, Token::Quoted(name)]
            if is_keyword(go, "go")
                && is_keyword(until, "until")
                && is_keyword(you, "you")
                && is_keyword(reach, "reach")
                && is_keyword(landmark, "landmark") =>
        {
            Some(Ok(Instruction::GoToLandmark(name.clone())))
        }
        _ => None,
    }
}

fn directed_move_rule(tokens: &[Token]) -> Option<Result<Instruction, CompileError>> {
    match tokens {
        [verb, Token::Word(direction), Token::Integer(n), blocks]
            if is_move_verb(verb) && is_keyword(blocks, "blocks") =>
        {
            let heading = Heading::from_word(direction)?;
            Some(block_count(*n).map(|blocks| Instruction::MoveWithDirection { heading, blocks }))
        }
        _ => None,
    }
}

fn move_rule(tokens: &[Token]) -> Option<Result<Instruction, CompileError>> {
    match tokens {
        [verb, Token::Integer(n), blocks] if is_move_verb(verb) && is_keyword(blocks, "blocks") => {
            Some(block_count(*n).map(|blocks| Instruction::MoveContinue { blocks }))
        }
        _ => None,
    }
}

fn turn_rule(tokens: &[Token]) -> Option<Result<Instruction, CompileError>> {
    match tokens {
        [turn, side] if is_keyword(turn, "turn") => {
            if is_keyword(side, "left") {
                Some(Ok(Instruction::Turn(Turn::Left)))
            } else if is_keyword(side, "right") {
                Some(Ok(Instruction::Turn(Turn::Right)))
            } else {
                None
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenisation() {
        let test_cases = vec![
            (
                "start at (245, 161)",
                vec![
                    Token::Word("start".into()),
                    Token::Word("at".into()),
                    Token::LParen,
                    Token::Integer(245),
                    Token::Comma,
                    Token::Integer(161),
                    Token::RParen,
                ],
            ),
            (
                "go until you reach landmark \"Independence Square\"",
                vec![
                    Token::Word("go".into()),
                    Token::Word("until".into()),
                    Token::Word("you".into()),
                    Token::Word("reach".into()),
                    Token::Word("landmark".into()),
                    Token::Quoted("Independence Square".into()),
                ],
            ),
            (
                "Move West -3 blocks",
                vec![
                    Token::Word("Move".into()),
                    Token::Word("West".into()),
                    Token::Integer(-3),
                    Token::Word("blocks".into()),
                ],
            ),
        ];

        for (src, expected) in test_cases {
            let tokens = tokenize(src).expect("tokenize");
            assert_eq!(tokens, expected);
        }
    }

    #[test]
    fn lexer_rejects_stray_characters_and_open_quotes() {
        assert!(matches!(
            tokenize("go 5 blocks!"),
            Err(CompileError::MalformedInstruction { .. })
        ));
        assert!(matches!(
            tokenize("go until you reach landmark \"Square"),
            Err(CompileError::MalformedInstruction { .. })
        ));
        assert!(matches!(
            tokenize("start at (-, 3)"),
            Err(CompileError::MalformedInstruction { .. })
        ));
    }

    #[test]
    fn classify_each_rule() {
        assert_eq!(
            classify("Start at (3,4)", 0),
            Ok(Instruction::Start(Coord::new(3, 4)))
        );
        assert_eq!(
            classify("go until you reach landmark 'Old Mill'", 1),
            Ok(Instruction::GoToLandmark("Old Mill".to_string()))
        );
        assert_eq!(
            classify("move north 12 blocks", 1),
            Ok(Instruction::MoveWithDirection {
                heading: Heading::North,
                blocks: 12
            })
        );
        assert_eq!(
            classify("Go 7 Blocks", 1),
            Ok(Instruction::MoveContinue { blocks: 7 })
        );
        assert_eq!(
            classify("TURN left", 1),
            Ok(Instruction::Turn(Turn::Left))
        );
    }

    #[test]
    fn start_is_only_legal_on_first_line() {
        assert!(matches!(
            classify("start at (1, 1)", 3),
            Err(CompileError::MalformedInstruction { .. })
        ));
    }

    #[test]
    fn negative_start_coordinates_are_classified_not_rejected() {
        assert_eq!(
            classify("start at (-1, 4)", 0),
            Ok(Instruction::Start(Coord::new(-1, 4)))
        );
    }

    #[test]
    fn negative_block_count_is_malformed() {
        assert!(matches!(
            classify("go West -5 blocks", 1),
            Err(CompileError::MalformedInstruction { .. })
        ));
        assert!(matches!(
            classify("go -5 blocks", 1),
            Err(CompileError::MalformedInstruction { .. })
        ));
    }

    #[test]
    fn unknown_direction_word_is_malformed() {
        assert!(matches!(
            classify("go Up 5 blocks", 1),
            Err(CompileError::MalformedInstruction { .. })
        ));
        assert!(matches!(
            classify("turn around", 1),
            Err(CompileError::MalformedInstruction { .. })
        ));
    }

    #[test]
    fn unrecognized_lines_are_malformed() {
        for line in ["fly 5 blocks", "go West blocks", "go until landmark \"X\"", ""] {
            assert!(
                matches!(
                    classify(line, 1),
                    Err(CompileError::MalformedInstruction { .. })
                ),
                "{line:?} should be malformed"
            );
        }
    }

    #[test]
    fn rules_are_listed_in_priority_order() {
        let names: Vec<&str> = RULES.iter().map(|(name, _)| *name).collect();
        assert_eq!(
            names,
            vec!["start", "landmark", "directed move", "move", "turn"]
        );
    }
}
