use crate::token::{Token, Tokenizer};

fn lex(src: &str) -> Vec<Token> {
    Tokenizer::new(src)
        .tokenize()
        .unwrap()
        .into_iter()
        .map(|(t, _)| t)
        .collect()
}

#[test]
fn numbers_and_operators() {
    assert_eq!(
        lex("1 + 2.5 * 3"),
        vec![
            Token::Int(1),
            Token::Add,
            Token::Float(2.5),
            Token::Mul,
            Token::Int(3)
        ]
    );
    assert_eq!(lex("2 ** 3"), vec![Token::Int(2), Token::Pow, Token::Int(3)]);
    assert_eq!(lex("2 ^ 3"), vec![Token::Int(2), Token::Pow, Token::Int(3)]);
}

#[test]
fn comparisons() {
    assert_eq!(
        lex("a <= b == c != d"),
        vec![
            Token::Id("a".into()),
            Token::Le,
            Token::Id("b".into()),
            Token::Eq,
            Token::Id("c".into()),
            Token::Ne,
            Token::Id("d".into()),
        ]
    );
}

#[test]
fn dice_forms() {
    assert_eq!(
        lex("3d6"),
        vec![Token::Int(3), Token::Dice, Token::Int(6)]
    );
    assert_eq!(lex("d20"), vec![Token::Dice, Token::Int(20)]);
    assert_eq!(
        lex("4d6kh3"),
        vec![
            Token::Int(4),
            Token::Dice,
            Token::Int(6),
            Token::KeepHigh,
            Token::Int(3)
        ]
    );
    assert_eq!(
        lex("2d10kl1"),
        vec![
            Token::Int(2),
            Token::Dice,
            Token::Int(10),
            Token::KeepLow,
            Token::Int(1)
        ]
    );
    // Bare default-faces roll: 'd' not glued to a digit is still the dice
    // operator when it stands alone.
    assert_eq!(lex("3d"), vec![Token::Int(3), Token::Dice]);
    assert_eq!(
        lex("3d(2+4)"),
        vec![
            Token::Int(3),
            Token::Dice,
            Token::LParen,
            Token::Int(2),
            Token::Add,
            Token::Int(4),
            Token::RParen
        ]
    );
}

#[test]
fn dice_lookalike_identifiers_stay_identifiers() {
    assert_eq!(lex("dx"), vec![Token::Id("dx".into())]);
    assert_eq!(lex("khan"), vec![Token::Id("khan".into())]);
    assert_eq!(lex("drop"), vec![Token::Id("drop".into())]);
}

#[test]
fn strings_and_escapes() {
    assert_eq!(lex(r#""ab""#), vec![Token::Str("ab".into())]);
    assert_eq!(lex(r#"'a b'"#), vec![Token::Str("a b".into())]);
    assert_eq!(lex(r#""a\n\"b""#), vec![Token::Str("a\n\"b".into())]);
}

#[test]
fn keywords() {
    assert_eq!(
        lex("func undefined null"),
        vec![Token::Func, Token::Undefined, Token::Null]
    );
}

#[test]
fn float_needs_digit_after_dot() {
    // "1." followed by a name is attribute access, not a float literal.
    assert_eq!(
        lex("1.x"),
        vec![Token::Int(1), Token::Dot, Token::Id("x".into())]
    );
}

#[test]
fn errors_carry_offsets() {
    let err = Tokenizer::new("1 + @").tokenize().unwrap_err();
    assert_eq!(err.offset, 4);
    assert!(Tokenizer::new("\"open").tokenize().is_err());
}
